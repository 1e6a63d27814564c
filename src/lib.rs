//! Taqueria POS - computation core
//!
//! Tracks open tables and their orders, prices them under the pastor
//! two-for-one promotion, records payments and tips (with optional
//! bill-splitting rounds), and aggregates daily and monthly sales reports.
//! The presentation layer calls the `Pos` application object and renders
//! whatever comes back; rendering, printing and offline caching live
//! elsewhere.

use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod billing;
mod catalog;
mod db;
mod error;
mod money;
mod presets;
mod promo;
mod report;
mod state;
mod table;

pub use app::Pos;
pub use billing::{friend_balances, grand_total_active, table_total, FriendBalance};
pub use catalog::{
    add_item, base_items, default_prices, delete_item, display_label, set_price,
    set_promo_enabled, unit_price, update_item, CatalogItem, Category, PriceList,
};
pub use db::{init as init_db, init_in_memory, load_state, save_state, DbState};
pub use error::{CoreError, CoreResult};
pub use money::{cents_from_pesos, fmt_money, pesos_from_cents, Cents};
pub use presets::{
    apply_preset, default_presets, delete_preset, delete_template, reset_presets, upsert_preset,
    upsert_template, QuickPreset, TableTemplate,
};
pub use promo::{compute_line, is_promo_day, LineTotal, PROMO_ITEM_ID};
pub use report::{daily_report, monthly_timeline, DailyReport, MonthBucket, UnpaidTable};
pub use state::{AppState, UiPrefs};
pub use table::{
    add_friend, add_round, change_qty, clear_order, close_all_tables, close_table, create_table,
    create_table_from_template, delete_table, remove_friend, reopen_table, set_qty, Round, Table,
};

/// Initialize structured logging (console, plus a rolling daily file when a
/// log directory is given). Call once at startup; a second call is an error
/// from the subscriber registry, so embedders that already install their own
/// subscriber should skip this.
pub fn init_logging(log_dir: Option<&Path>) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,taqueria_pos_lib=debug"));

    let console_layer = fmt::layer().with_target(true);
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).ok();
            let file_appender = tracing_appender::rolling::daily(dir, "pos");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true);
            registry.with(file_layer).init();
            // Keep the guard alive for the lifetime of the app — dropping it
            // flushes logs. We leak it intentionally since the app runs until
            // process exit.
            std::mem::forget(guard);
        }
        None => registry.init(),
    }

    tracing::info!("Taqueria POS core v{}", env!("CARGO_PKG_VERSION"));
}
