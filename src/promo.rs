//! Promotion engine: the pastor two-for-one rule.
//!
//! On Mondays and Wednesdays the promo item is charged at ceil(qty / 2) —
//! pay for half, rounded up, so 1 taco still costs 1 and 3 cost 2. The rule
//! lives here, isolated from rendering, so billing, receipts and on-screen
//! "pay N" badges all agree. Callers pass the evaluation date explicitly;
//! nothing in this module reads the system clock.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

use crate::catalog::{unit_price, PriceList};
use crate::money::Cents;

/// The single catalog item the two-for-one promotion applies to.
pub const PROMO_ITEM_ID: &str = "taco_pastor";

/// True on Mondays and Wednesdays (local calendar date).
pub fn is_promo_day(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Mon | Weekday::Wed)
}

/// One computed order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineTotal {
    /// Unit price in cents (0 when the price list has no entry).
    pub unit: Cents,
    /// Units actually billed after the promo rule.
    pub charged_qty: u32,
    /// `charged_qty * unit`, cents.
    pub total: Cents,
}

/// Price a single order line.
pub fn compute_line(item_id: &str, qty: u32, prices: &PriceList, promo_active: bool) -> LineTotal {
    let unit = unit_price(prices, item_id);
    let charged_qty = if promo_active && item_id == PROMO_ITEM_ID {
        qty.div_ceil(2)
    } else {
        qty
    };
    LineTotal {
        unit,
        charged_qty,
        total: unit * Cents::from(charged_qty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_prices;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_promo_days() {
        // 2024-01-01 was a Monday
        assert!(is_promo_day(date(2024, 1, 1)));
        assert!(!is_promo_day(date(2024, 1, 2))); // Tuesday
        assert!(is_promo_day(date(2024, 1, 3))); // Wednesday
        assert!(!is_promo_day(date(2024, 1, 4))); // Thursday
        assert!(!is_promo_day(date(2024, 1, 6))); // Saturday
        assert!(!is_promo_day(date(2024, 1, 7))); // Sunday
    }

    #[test]
    fn test_charged_qty_ceil_half() {
        let prices = default_prices();
        let expected = [(1, 1), (2, 1), (3, 2), (4, 2), (5, 3)];
        for (qty, charged) in expected {
            let line = compute_line(PROMO_ITEM_ID, qty, &prices, true);
            assert_eq!(line.charged_qty, charged, "qty {qty}");
        }
    }

    #[test]
    fn test_promo_monday_pastor_scenario() {
        // catalog has pastor at $17.00; order of 5 on a promo day
        let prices = default_prices();
        let line = compute_line(PROMO_ITEM_ID, 5, &prices, true);
        assert_eq!(line.unit, 1700);
        assert_eq!(line.charged_qty, 3);
        assert_eq!(line.total, 5100);
    }

    #[test]
    fn test_non_promo_item_charged_in_full() {
        let prices = default_prices();
        for qty in 1..=5 {
            let line = compute_line("refresco", qty, &prices, true);
            assert_eq!(line.charged_qty, qty);
            assert_eq!(line.total, 2700 * Cents::from(qty));
        }
    }

    #[test]
    fn test_promo_item_off_day_charged_in_full() {
        let prices = default_prices();
        let line = compute_line(PROMO_ITEM_ID, 5, &prices, false);
        assert_eq!(line.charged_qty, 5);
        assert_eq!(line.total, 8500);
    }

    #[test]
    fn test_zero_qty_and_missing_price() {
        let prices = default_prices();
        let line = compute_line(PROMO_ITEM_ID, 0, &prices, true);
        assert_eq!(line.charged_qty, 0);
        assert_eq!(line.total, 0);

        let line = compute_line("unpriced_item", 3, &prices, false);
        assert_eq!(line.unit, 0);
        assert_eq!(line.total, 0);
    }
}
