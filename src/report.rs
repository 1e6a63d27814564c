//! Reporting engine: daily sales summary and the monthly trend timeline.
//!
//! The daily window is `[local midnight, midnight + 24h)` of the instant the
//! caller passes in; nothing here reads the system clock, so report
//! boundaries are deterministic in tests. Report totals apply the promo rule
//! as of the report date, the same flag the billing path uses.

use chrono::{DateTime, Datelike, Local, LocalResult, NaiveTime, TimeZone, Timelike};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::billing::table_total;
use crate::catalog::PriceList;
use crate::money::Cents;
use crate::promo::compute_line;
use crate::table::Table;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// An open table created today, annotated with its live total — revenue
/// still outstanding for the day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnpaidTable {
    pub table_id: String,
    pub name: String,
    pub total: Cents,
}

/// Aggregated sales for one calendar day.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DailyReport {
    /// Sum of order subtotals over tables paid today, cents.
    pub total_subtotals: Cents,
    /// Sum of tips over tables paid today, cents.
    pub total_tips: Cents,
    pub tables_count: usize,
    /// Item id -> units sold across today's paid tables.
    pub item_counts: BTreeMap<String, u32>,
    /// Item id -> revenue (cents) across today's paid tables.
    pub item_revenue: BTreeMap<String, Cents>,
    /// Open tables created today, with live totals.
    pub unpaid_tables_today: Vec<UnpaidTable>,
}

/// One month of the trailing timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthBucket {
    /// `YYYY-MM`.
    pub label: String,
    pub total: Cents,
    pub tips: Cents,
    pub tables_count: usize,
}

/// Unix millis of local midnight for the day containing `now`.
///
/// When the local timezone skips midnight (DST spring-forward in zones that
/// shift at 00:00), fall back to subtracting the elapsed time-of-day.
fn day_start_ms(now: DateTime<Local>) -> i64 {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    match midnight.and_local_timezone(Local) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.timestamp_millis(),
        LocalResult::None => {
            now.timestamp_millis() - i64::from(now.time().num_seconds_from_midnight()) * 1000
        }
    }
}

/// Build the sales summary for the day containing `now`.
pub fn daily_report(
    tables: &[Table],
    prices: &PriceList,
    now: DateTime<Local>,
    promo_active: bool,
) -> DailyReport {
    let start = day_start_ms(now);
    let end = start + DAY_MS;
    let paid_today = |t: &&Table| {
        t.charged
            && t.paid_at
                .map(|ts| ts >= start && ts < end)
                .unwrap_or(false)
    };

    let mut report = DailyReport::default();
    for table in tables.iter().filter(paid_today) {
        report.total_subtotals += table_total(table, prices, promo_active);
        report.total_tips += table.tip;
        report.tables_count += 1;
        for (item_id, qty) in &table.order {
            let line = compute_line(item_id, *qty, prices, promo_active);
            *report.item_counts.entry(item_id.clone()).or_insert(0) += qty;
            *report.item_revenue.entry(item_id.clone()).or_insert(0) += line.total;
        }
    }

    report.unpaid_tables_today = tables
        .iter()
        .filter(|t| !t.charged && t.created_at >= start && t.created_at < end)
        .map(|t| UnpaidTable {
            table_id: t.id.clone(),
            name: t.name.clone(),
            total: table_total(t, prices, promo_active),
        })
        .collect();

    report
}

/// Year/month pair `months_back` months before the month of `now`
/// (0 = current month).
fn month_before(now: DateTime<Local>, months_back: u32) -> (i32, u32) {
    let months0 = now.year() * 12 + now.month0() as i32 - months_back as i32;
    (months0.div_euclid(12), months0.rem_euclid(12) as u32 + 1)
}

/// Bucket charged tables by calendar month of `paid_at` for the trailing
/// `months_back` months (minimum 1, the current month). Months with no
/// activity still appear with zero values, oldest first.
pub fn monthly_timeline(
    tables: &[Table],
    prices: &PriceList,
    now: DateTime<Local>,
    months_back: u32,
    promo_active: bool,
) -> Vec<MonthBucket> {
    let months_back = months_back.max(1);
    let mut buckets: Vec<MonthBucket> = (0..months_back)
        .rev()
        .map(|back| {
            let (year, month) = month_before(now, back);
            MonthBucket {
                label: format!("{year:04}-{month:02}"),
                total: 0,
                tips: 0,
                tables_count: 0,
            }
        })
        .collect();

    for table in tables.iter().filter(|t| t.charged) {
        let Some(paid_at) = table.paid_at else {
            continue;
        };
        let Some(paid) = Local.timestamp_millis_opt(paid_at).single() else {
            continue;
        };
        let label = format!("{:04}-{:02}", paid.year(), paid.month());
        if let Some(bucket) = buckets.iter_mut().find(|b| b.label == label) {
            bucket.total += table_total(table, prices, promo_active);
            bucket.tips += table.tip;
            bucket.tables_count += 1;
        }
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use crate::table::{close_table, create_table, set_qty};

    fn local(y: i32, m: u32, d: u32, h: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .single()
            .expect("unambiguous local time")
    }

    fn ms(dt: DateTime<Local>) -> i64 {
        dt.timestamp_millis()
    }

    #[test]
    fn test_daily_report_aggregates_paid_today() {
        let now = local(2024, 1, 2, 20); // a Tuesday, promo off
        let mut state = AppState::default();

        let a = create_table(&mut state, "A", "", ms(local(2024, 1, 2, 12))).unwrap();
        set_qty(&mut state, &a, "taco_pastor", 3).unwrap();
        close_table(&mut state, &a, 500, ms(local(2024, 1, 2, 14))).unwrap();

        let b = create_table(&mut state, "B", "", ms(local(2024, 1, 2, 13))).unwrap();
        set_qty(&mut state, &b, "taco_pastor", 2).unwrap();
        set_qty(&mut state, &b, "cerveza", 1).unwrap();
        close_table(&mut state, &b, 0, ms(local(2024, 1, 2, 15))).unwrap();

        let report = daily_report(&state.tables, &state.prices, now, false);
        assert_eq!(report.tables_count, 2);
        assert_eq!(report.total_subtotals, 5 * 1700 + 3500);
        assert_eq!(report.total_tips, 500);
        assert_eq!(report.item_counts["taco_pastor"], 5);
        assert_eq!(report.item_counts["cerveza"], 1);
        assert_eq!(report.item_revenue["taco_pastor"], 5 * 1700);
        assert_eq!(report.item_revenue["cerveza"], 3500);
    }

    #[test]
    fn test_daily_report_excludes_yesterday() {
        let now = local(2024, 1, 2, 20);
        let mut state = AppState::default();
        let a = create_table(&mut state, "A", "", ms(local(2024, 1, 1, 12))).unwrap();
        set_qty(&mut state, &a, "cerveza", 2).unwrap();
        // charged yesterday: still charged, but outside today's window
        close_table(&mut state, &a, 100, ms(local(2024, 1, 1, 23))).unwrap();

        let report = daily_report(&state.tables, &state.prices, now, false);
        assert_eq!(report.tables_count, 0);
        assert_eq!(report.total_subtotals, 0);
        assert!(report.item_counts.is_empty());
    }

    #[test]
    fn test_daily_report_lists_unpaid_today() {
        let now = local(2024, 1, 2, 20);
        let mut state = AppState::default();
        let open_today = create_table(&mut state, "Abierta", "", ms(local(2024, 1, 2, 19))).unwrap();
        set_qty(&mut state, &open_today, "gringas", 1).unwrap();
        // opened yesterday, still unpaid: not "today's" outstanding revenue
        create_table(&mut state, "Vieja", "", ms(local(2024, 1, 1, 19))).unwrap();

        let report = daily_report(&state.tables, &state.prices, now, false);
        assert_eq!(report.unpaid_tables_today.len(), 1);
        let unpaid = &report.unpaid_tables_today[0];
        assert_eq!(unpaid.table_id, open_today);
        assert_eq!(unpaid.name, "Abierta");
        assert_eq!(unpaid.total, 8000);
    }

    #[test]
    fn test_monthly_timeline_dense_and_sorted() {
        let now = local(2024, 3, 15, 12);
        let mut state = AppState::default();

        let a = create_table(&mut state, "A", "", ms(local(2024, 1, 10, 12))).unwrap();
        set_qty(&mut state, &a, "cerveza", 1).unwrap();
        close_table(&mut state, &a, 200, ms(local(2024, 1, 10, 14))).unwrap();

        let b = create_table(&mut state, "B", "", ms(local(2024, 3, 1, 12))).unwrap();
        set_qty(&mut state, &b, "refresco", 1).unwrap();
        close_table(&mut state, &b, 0, ms(local(2024, 3, 1, 13))).unwrap();

        let timeline = monthly_timeline(&state.tables, &state.prices, now, 3, false);
        let labels: Vec<&str> = timeline.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["2024-01", "2024-02", "2024-03"]);

        assert_eq!(timeline[0].total, 3500);
        assert_eq!(timeline[0].tips, 200);
        assert_eq!(timeline[0].tables_count, 1);
        // February had no activity but still appears
        assert_eq!(timeline[1].tables_count, 0);
        assert_eq!(timeline[1].total, 0);
        assert_eq!(timeline[2].total, 2700);
    }

    #[test]
    fn test_monthly_timeline_crosses_year_boundary() {
        let now = local(2024, 1, 20, 12);
        let timeline = monthly_timeline(&[], &PriceList::new(), now, 4, false);
        let labels: Vec<&str> = timeline.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["2023-10", "2023-11", "2023-12", "2024-01"]);
    }

    #[test]
    fn test_day_start_is_local_midnight() {
        let now = local(2024, 5, 7, 17);
        let start = day_start_ms(now);
        assert_eq!(start, ms(local(2024, 5, 7, 0)));
    }
}
