//! Top-level application object for the Taqueria POS.
//!
//! `Pos` owns the single `AppState` plus the SQLite handle and is the only
//! entry point the presentation layer calls. Every mutation forwards to the
//! core, then persists the whole state; a failed save is logged and the
//! in-memory state remains authoritative (durability is best-effort, not
//! transactional). Each operation captures the clock once and threads it
//! through, so timestamps and report windows stay self-consistent.

use chrono::{DateTime, Local};
use std::path::Path;
use tracing::error;

use crate::billing::{self, FriendBalance};
use crate::catalog::{self, Category};
use crate::db::{self, DbState};
use crate::error::CoreResult;
use crate::money::Cents;
use crate::presets::{self, QuickPreset, TableTemplate};
use crate::promo::{self, LineTotal};
use crate::report::{self, DailyReport, MonthBucket};
use crate::state::AppState;
use crate::table;

pub struct Pos {
    state: AppState,
    db: DbState,
}

impl Pos {
    /// Open (or create) the database under `data_dir` and load the state.
    pub fn open(data_dir: &Path) -> Result<Self, String> {
        let db = db::init(data_dir)?;
        let state = db::load_state(&db);
        Ok(Pos { state, db })
    }

    /// Fully in-memory instance; state is lost when dropped.
    pub fn open_in_memory() -> Result<Self, String> {
        let db = db::init_in_memory()?;
        let state = db::load_state(&db);
        Ok(Pos { state, db })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Discard the in-memory state and reload from the store.
    pub fn reload(&mut self) {
        self.state = db::load_state(&self.db);
    }

    /// Best-effort persist. Failures are logged, never propagated: the
    /// session continues on the in-memory state until the next save lands.
    fn persist(&self) {
        if let Err(e) = db::save_state(&self.db, &self.state) {
            error!("persist failed, continuing with in-memory state: {e}");
        }
    }

    fn mutate<T>(&mut self, op: impl FnOnce(&mut AppState) -> CoreResult<T>) -> CoreResult<T> {
        let result = op(&mut self.state)?;
        self.persist();
        Ok(result)
    }

    // -----------------------------------------------------------------------
    // Reads (pure, clock captured once per call)
    // -----------------------------------------------------------------------

    pub fn promo_active(&self, now: DateTime<Local>) -> bool {
        promo::is_promo_day(now.date_naive())
    }

    pub fn compute_line(&self, item_id: &str, qty: u32, now: DateTime<Local>) -> LineTotal {
        promo::compute_line(item_id, qty, &self.state.prices, self.promo_active(now))
    }

    pub fn table_total(&self, table_id: &str, now: DateTime<Local>) -> Option<Cents> {
        let promo = self.promo_active(now);
        self.state
            .table(table_id)
            .map(|t| billing::table_total(t, &self.state.prices, promo))
    }

    pub fn grand_total_active(&self, now: DateTime<Local>) -> Cents {
        billing::grand_total_active(&self.state.tables, &self.state.prices, self.promo_active(now))
    }

    pub fn friend_balances(&self, table_id: &str, now: DateTime<Local>) -> Vec<FriendBalance> {
        let promo = self.promo_active(now);
        self.state
            .table(table_id)
            .map(|t| billing::friend_balances(t, &self.state.prices, promo))
            .unwrap_or_default()
    }

    pub fn daily_report(&self, now: DateTime<Local>) -> DailyReport {
        report::daily_report(
            &self.state.tables,
            &self.state.prices,
            now,
            self.promo_active(now),
        )
    }

    pub fn monthly_timeline(&self, now: DateTime<Local>, months_back: u32) -> Vec<MonthBucket> {
        report::monthly_timeline(
            &self.state.tables,
            &self.state.prices,
            now,
            months_back,
            self.promo_active(now),
        )
    }

    // -----------------------------------------------------------------------
    // Table lifecycle
    // -----------------------------------------------------------------------

    pub fn create_table(&mut self, name: &str, note: &str) -> CoreResult<String> {
        let now_ms = Local::now().timestamp_millis();
        self.mutate(|s| table::create_table(s, name, note, now_ms))
    }

    pub fn create_table_from_template(&mut self, template_id: &str) -> CoreResult<Option<String>> {
        let now_ms = Local::now().timestamp_millis();
        self.mutate(|s| table::create_table_from_template(s, template_id, now_ms))
    }

    pub fn change_qty(&mut self, table_id: &str, item_id: &str, delta: i32) -> CoreResult<()> {
        self.mutate(|s| table::change_qty(s, table_id, item_id, delta))
    }

    pub fn set_qty(&mut self, table_id: &str, item_id: &str, qty: u32) -> CoreResult<()> {
        self.mutate(|s| table::set_qty(s, table_id, item_id, qty))
    }

    pub fn clear_order(&mut self, table_id: &str) {
        table::clear_order(&mut self.state, table_id);
        self.persist();
    }

    pub fn close_table(&mut self, table_id: &str, tip: Cents) -> CoreResult<()> {
        let now_ms = Local::now().timestamp_millis();
        self.mutate(|s| table::close_table(s, table_id, tip, now_ms))
    }

    pub fn reopen_table(&mut self, table_id: &str) {
        table::reopen_table(&mut self.state, table_id);
        self.persist();
    }

    pub fn delete_table(&mut self, table_id: &str) {
        table::delete_table(&mut self.state, table_id);
        self.persist();
    }

    pub fn close_all_tables(&mut self) -> usize {
        let now_ms = Local::now().timestamp_millis();
        let closed = table::close_all_tables(&mut self.state, now_ms);
        self.persist();
        closed
    }

    pub fn add_round(&mut self, table_id: &str, payer: &str, amount: Cents) -> CoreResult<()> {
        self.mutate(|s| table::add_round(s, table_id, payer, amount))
    }

    pub fn add_friend(&mut self, table_id: &str, name: &str) -> CoreResult<()> {
        self.mutate(|s| table::add_friend(s, table_id, name))
    }

    pub fn remove_friend(&mut self, table_id: &str, name: &str) {
        table::remove_friend(&mut self.state, table_id, name);
        self.persist();
    }

    // -----------------------------------------------------------------------
    // Catalog
    // -----------------------------------------------------------------------

    pub fn add_item(
        &mut self,
        label: &str,
        category: Category,
        emoji: &str,
        price: Cents,
    ) -> CoreResult<String> {
        self.mutate(|s| catalog::add_item(s, label, category, emoji, price))
    }

    pub fn update_item(
        &mut self,
        item_id: &str,
        label: &str,
        category: Category,
        emoji: &str,
    ) -> CoreResult<()> {
        self.mutate(|s| catalog::update_item(s, item_id, label, category, emoji))
    }

    pub fn delete_item(&mut self, item_id: &str) -> CoreResult<()> {
        self.mutate(|s| catalog::delete_item(s, item_id))
    }

    pub fn set_price(&mut self, item_id: &str, price: Cents) -> CoreResult<()> {
        self.mutate(|s| catalog::set_price(s, item_id, price))
    }

    pub fn set_promo_enabled(&mut self, enabled: bool) {
        catalog::set_promo_enabled(&mut self.state, enabled);
        self.persist();
    }

    // -----------------------------------------------------------------------
    // Presets / templates / UI prefs
    // -----------------------------------------------------------------------

    pub fn upsert_preset(&mut self, preset: QuickPreset) -> CoreResult<()> {
        self.mutate(|s| presets::upsert_preset(s, preset))
    }

    pub fn delete_preset(&mut self, preset_id: &str) {
        presets::delete_preset(&mut self.state, preset_id);
        self.persist();
    }

    pub fn reset_presets(&mut self) {
        presets::reset_presets(&mut self.state);
        self.persist();
    }

    pub fn apply_preset(&mut self, table_id: &str, preset_id: &str) -> CoreResult<()> {
        self.mutate(|s| presets::apply_preset(s, table_id, preset_id))
    }

    pub fn upsert_template(&mut self, template: TableTemplate) -> CoreResult<()> {
        self.mutate(|s| presets::upsert_template(s, template))
    }

    pub fn delete_template(&mut self, template_id: &str) {
        presets::delete_template(&mut self.state, template_id);
        self.persist();
    }

    pub fn set_ui_prefs(&mut self, dense: bool, high_contrast: bool) {
        self.state.ui_prefs.dense = dense;
        self.state.ui_prefs.high_contrast = high_contrast;
        self.persist();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutations_persist_and_reload() {
        let mut pos = Pos::open_in_memory().expect("open");
        let id = pos.create_table("Mesa 7", "").unwrap();
        pos.set_qty(&id, "taco_pastor", 4).unwrap();
        pos.set_promo_enabled(true);

        // drop the in-memory state, reload from the store
        pos.reload();
        let table = pos.state().table(&id).expect("table survived reload");
        assert_eq!(table.order["taco_pastor"], 4);
        assert!(pos.state().promo_enabled);
    }

    #[test]
    fn test_failed_validation_does_not_mutate() {
        let mut pos = Pos::open_in_memory().expect("open");
        assert!(pos.create_table("   ", "").is_err());
        pos.reload();
        assert!(pos.state().tables.is_empty());
    }

    #[test]
    fn test_close_and_report_through_app() {
        let now = Local::now();
        let mut pos = Pos::open_in_memory().expect("open");
        let id = pos.create_table("Mesa 1", "").unwrap();
        pos.set_qty(&id, "cerveza", 2).unwrap();
        assert_eq!(pos.grand_total_active(now), 7000);

        pos.close_table(&id, 500).unwrap();
        assert_eq!(pos.grand_total_active(now), 0);

        let report = pos.daily_report(now);
        assert_eq!(report.tables_count, 1);
        assert_eq!(report.total_subtotals, 7000);
        assert_eq!(report.total_tips, 500);
    }

    #[test]
    fn test_compute_line_uses_current_prices() {
        let mut pos = Pos::open_in_memory().expect("open");
        pos.set_price("refresco", 3000).unwrap();
        let line = pos.compute_line("refresco", 2, Local::now());
        assert_eq!(line.unit, 3000);
        assert_eq!(line.total, 6000);
    }

    #[test]
    fn test_ui_prefs_round_trip() {
        let mut pos = Pos::open_in_memory().expect("open");
        pos.set_ui_prefs(true, false);
        pos.reload();
        assert!(pos.state().ui_prefs.dense);
        assert!(!pos.state().ui_prefs.high_contrast);
    }
}
