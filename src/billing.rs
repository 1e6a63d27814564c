//! Billing calculator: per-table totals, the live grand total, and the
//! friend-split ledger.
//!
//! Everything here is a pure function of state plus an explicit
//! `promo_active` flag, so the same numbers show up on screen, on the
//! receipt, and in the daily report.

use serde::Serialize;

use crate::catalog::PriceList;
use crate::money::Cents;
use crate::promo::compute_line;
use crate::table::Table;

/// Subtotal (cents) of a table's order, promo rule applied per line.
/// Summation over a map is order-independent.
pub fn table_total(table: &Table, prices: &PriceList, promo_active: bool) -> Cents {
    table
        .order
        .iter()
        .map(|(item_id, qty)| compute_line(item_id, *qty, prices, promo_active).total)
        .sum()
}

/// Sum of subtotals across all open tables. Charged tables are excluded
/// even though they still carry an order.
pub fn grand_total_active(tables: &[Table], prices: &PriceList, promo_active: bool) -> Cents {
    tables
        .iter()
        .filter(|t| !t.charged)
        .map(|t| table_total(t, prices, promo_active))
        .sum()
}

/// One participant's standing in a shared table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FriendBalance {
    pub name: String,
    /// Cents this friend has put in across all rounds.
    pub paid: Cents,
    /// Equal share of subtotal + tip, cents (floor of total / n).
    pub should_pay: Cents,
    /// `paid - should_pay`: positive means overpaid, negative still owes.
    pub balance: Cents,
}

/// Split subtotal + tip equally across the participants of a table.
///
/// Participants are the explicit `friends` plus every distinct round payer,
/// deduplicated case-insensitively with first-seen casing kept. An empty
/// participant set yields an empty result.
pub fn friend_balances(table: &Table, prices: &PriceList, promo_active: bool) -> Vec<FriendBalance> {
    let mut names: Vec<String> = Vec::new();
    for candidate in table
        .friends
        .iter()
        .chain(table.rounds.iter().map(|r| &r.payer))
    {
        let lower = candidate.to_lowercase();
        if !names.iter().any(|n| n.to_lowercase() == lower) {
            names.push(candidate.clone());
        }
    }
    if names.is_empty() {
        return Vec::new();
    }

    let total = table_total(table, prices, promo_active) + table.tip;
    let should_pay = total / names.len() as Cents;

    names
        .into_iter()
        .map(|name| {
            let lower = name.to_lowercase();
            let paid: Cents = table
                .rounds
                .iter()
                .filter(|r| r.payer.to_lowercase() == lower)
                .map(|r| r.amount)
                .sum();
            FriendBalance {
                name,
                paid,
                should_pay,
                balance: paid - should_pay,
            }
        })
        .collect()
}
