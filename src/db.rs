//! Local SQLite persistence layer for the Taqueria POS.
//!
//! The whole application state is stored as one JSON record per logical key
//! (`items`, `prices`, `promo_enabled`, `tables`, `quick_presets`,
//! `table_templates`, `ui_prefs`) in the `app_state` table. Provides schema
//! migrations, record helpers, and whole-state load/save.
//!
//! Durability is best-effort: `load_state` never fails (bad records fall
//! back to defaults) and callers treat `save_state` errors as non-fatal —
//! the in-memory state stays authoritative for the session.

use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

use crate::money::cents_from_pesos;
use crate::state::AppState;

/// Managed state holding the database connection.
pub struct DbState {
    pub conn: Mutex<Connection>,
    pub db_path: PathBuf,
}

/// Current schema version. Bump when adding new migrations.
const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Logical keys, one persisted JSON record each.
pub const KEY_ITEMS: &str = "items";
pub const KEY_PRICES: &str = "prices";
pub const KEY_PROMO_ENABLED: &str = "promo_enabled";
pub const KEY_TABLES: &str = "tables";
pub const KEY_QUICK_PRESETS: &str = "quick_presets";
pub const KEY_TABLE_TEMPLATES: &str = "table_templates";
pub const KEY_UI_PREFS: &str = "ui_prefs";

/// Initialize the database at `{data_dir}/pos.db`.
///
/// Creates the directory if needed, opens the connection, sets pragmas,
/// and runs any pending migrations. On corruption or open failure,
/// deletes the file and retries once.
pub fn init(data_dir: &Path) -> Result<DbState, String> {
    fs::create_dir_all(data_dir).map_err(|e| format!("Failed to create data dir: {e}"))?;

    let db_path = data_dir.join("pos.db");
    info!("Opening database at {}", db_path.display());

    let conn = match open_and_configure(&db_path) {
        Ok(c) => c,
        Err(first_err) => {
            warn!(
                "Database open failed ({}), deleting and retrying once",
                first_err
            );
            if db_path.exists() {
                let _ = fs::remove_file(&db_path);
                // Also remove WAL/SHM files if present
                let wal = db_path.with_extension("db-wal");
                let shm = db_path.with_extension("db-shm");
                let _ = fs::remove_file(&wal);
                let _ = fs::remove_file(&shm);
            }
            open_and_configure(&db_path)
                .map_err(|e| format!("Database open failed after retry: {e}"))?
        }
    };

    run_migrations(&conn)?;

    info!("Database initialized (schema v{CURRENT_SCHEMA_VERSION})");

    Ok(DbState {
        conn: Mutex::new(conn),
        db_path,
    })
}

/// In-memory database, used by tests and by callers that only want the
/// computation layer without a durable store.
pub fn init_in_memory() -> Result<DbState, String> {
    let conn = Connection::open_in_memory().map_err(|e| format!("sqlite open: {e}"))?;
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )
    .map_err(|e| format!("pragma setup: {e}"))?;
    run_migrations(&conn)?;
    Ok(DbState {
        conn: Mutex::new(conn),
        db_path: PathBuf::from(":memory:"),
    })
}

/// Open the database file and apply pragmas.
fn open_and_configure(path: &Path) -> Result<Connection, String> {
    let conn = Connection::open(path).map_err(|e| format!("sqlite open: {e}"))?;

    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )
    .map_err(|e| format!("pragma setup: {e}"))?;

    Ok(conn)
}

// ---------------------------------------------------------------------------
// Migrations
// ---------------------------------------------------------------------------

/// Run all pending migrations up to `CURRENT_SCHEMA_VERSION`.
fn run_migrations(conn: &Connection) -> Result<(), String> {
    // Ensure schema_version table exists first
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| format!("create schema_version: {e}"))?;

    let current: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current >= CURRENT_SCHEMA_VERSION {
        info!("Database schema up to date (v{current})");
        return Ok(());
    }

    info!("Migrating database from v{current} to v{CURRENT_SCHEMA_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }
    if current < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn record_version(conn: &Connection, version: i32) -> Result<(), String> {
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        params![version],
    )
    .map_err(|e| format!("record schema v{version}: {e}"))?;
    Ok(())
}

/// v1: the key-value state table.
fn migrate_v1(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| format!("migrate v1: {e}"))?;
    record_version(conn, 1)
}

/// v2: import of legacy browser-era records.
///
/// The original web app kept everything in localStorage under `tacos_*`
/// keys with camelCase fields and float peso amounts, and at one point
/// renamed `tacos_tables` to `tacos_tables_v2`. This migration folds all of
/// that into the current shape once: new key names, snake_case table fields,
/// integer cents, and empty `rounds`/`friends` ledgers.
fn migrate_v2(conn: &Connection) -> Result<(), String> {
    if let Some(raw) = get_record(conn, "tacos_items") {
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => set_record(conn, KEY_ITEMS, &legacy_items_to_v2(&value).to_string())?,
            Err(e) => warn!("migrate v2: unreadable tacos_items, dropping: {e}"),
        }
    }
    if let Some(raw) = get_record(conn, "tacos_prices") {
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => set_record(conn, KEY_PRICES, &legacy_prices_to_v2(&value).to_string())?,
            Err(e) => warn!("migrate v2: unreadable tacos_prices, dropping: {e}"),
        }
    }
    if let Some(raw) = get_record(conn, "tacos_promoEnabled") {
        let enabled = serde_json::from_str::<bool>(&raw).unwrap_or(false);
        set_record(conn, KEY_PROMO_ENABLED, &enabled.to_string())?;
    }
    // The one-off tables rename: the _v2 record wins when both exist.
    let legacy_tables =
        get_record(conn, "tacos_tables_v2").or_else(|| get_record(conn, "tacos_tables"));
    if let Some(raw) = legacy_tables {
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => set_record(conn, KEY_TABLES, &legacy_tables_to_v2(&value).to_string())?,
            Err(e) => warn!("migrate v2: unreadable legacy tables, dropping: {e}"),
        }
    }

    conn.execute("DELETE FROM app_state WHERE key LIKE 'tacos_%'", [])
        .map_err(|e| format!("migrate v2 cleanup: {e}"))?;

    record_version(conn, 2)
}

/// Legacy items were `{id, label, base}`; add category (guessed from the
/// id) and an empty emoji.
fn legacy_items_to_v2(value: &serde_json::Value) -> serde_json::Value {
    let items = value.as_array().cloned().unwrap_or_default();
    let converted: Vec<serde_json::Value> = items
        .iter()
        .filter_map(|item| {
            let id = item.get("id")?.as_str()?.to_string();
            let label = item
                .get("label")
                .and_then(|l| l.as_str())
                .unwrap_or(&id)
                .to_string();
            let base = item.get("base").and_then(|b| b.as_bool()).unwrap_or(false);
            let category = if id.starts_with("taco") || id == "gringas" {
                "tacos"
            } else if id == "refresco" || id == "cerveza" {
                "bebidas"
            } else {
                "otros"
            };
            Some(serde_json::json!({
                "id": id,
                "label": label,
                "category": category,
                "emoji": "",
                "base": base,
            }))
        })
        .collect();
    serde_json::Value::Array(converted)
}

/// Legacy prices were float pesos; convert to integer cents.
fn legacy_prices_to_v2(value: &serde_json::Value) -> serde_json::Value {
    let mut out = serde_json::Map::new();
    if let Some(map) = value.as_object() {
        for (id, price) in map {
            let pesos = price.as_f64().unwrap_or(0.0).max(0.0);
            out.insert(id.clone(), serde_json::json!(cents_from_pesos(pesos)));
        }
    }
    serde_json::Value::Object(out)
}

/// Legacy tables used camelCase fields and float peso tips.
fn legacy_tables_to_v2(value: &serde_json::Value) -> serde_json::Value {
    let tables = value.as_array().cloned().unwrap_or_default();
    let converted: Vec<serde_json::Value> = tables
        .iter()
        .filter_map(|t| {
            let id = t.get("id")?.as_str()?.to_string();
            let order = t.get("order").cloned().unwrap_or(serde_json::json!({}));
            Some(serde_json::json!({
                "id": id,
                "name": t.get("name").and_then(|v| v.as_str()).unwrap_or(""),
                "note": t.get("note").and_then(|v| v.as_str()).unwrap_or(""),
                "order": order,
                "charged": t.get("charged").and_then(|v| v.as_bool()).unwrap_or(false),
                "created_at": t.get("createdAt").and_then(|v| v.as_i64()).unwrap_or(0),
                "paid_at": t.get("paidAt").and_then(|v| v.as_i64()),
                "open_duration_ms": t.get("openDurationMs").and_then(|v| v.as_i64()),
                "tip": cents_from_pesos(t.get("tip").and_then(|v| v.as_f64()).unwrap_or(0.0)),
                "rounds": [],
                "friends": [],
            }))
        })
        .collect();
    serde_json::Value::Array(converted)
}

// ---------------------------------------------------------------------------
// Record helpers
// ---------------------------------------------------------------------------

/// Read one raw record. Returns `None` when the key is absent.
pub fn get_record(conn: &Connection, key: &str) -> Option<String> {
    conn.query_row(
        "SELECT value FROM app_state WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .ok()
}

/// Write one raw record.
pub fn set_record(conn: &Connection, key: &str, value: &str) -> Result<(), String> {
    conn.execute(
        "INSERT INTO app_state (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value],
    )
    .map_err(|e| format!("set app_state[{key}]: {e}"))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Whole-state load / save
// ---------------------------------------------------------------------------

/// Parse one record into a field, falling back to the default already in
/// `target` when the key is missing or the JSON does not parse.
fn load_field<T: serde::de::DeserializeOwned>(conn: &Connection, key: &str, target: &mut T) {
    let Some(raw) = get_record(conn, key) else {
        return;
    };
    match serde_json::from_str::<T>(&raw) {
        Ok(value) => *target = value,
        Err(e) => warn!("app_state[{key}] unreadable, keeping default: {e}"),
    }
}

/// Load the full application state. Never fails: missing or unreadable
/// records keep their defaults, and base catalog entries are merged in.
pub fn load_state(db: &DbState) -> AppState {
    let mut state = AppState::default();
    let Ok(conn) = db.conn.lock() else {
        warn!("load_state: connection lock poisoned, starting from defaults");
        return state;
    };
    load_field(&conn, KEY_ITEMS, &mut state.items);
    load_field(&conn, KEY_PRICES, &mut state.prices);
    load_field(&conn, KEY_PROMO_ENABLED, &mut state.promo_enabled);
    load_field(&conn, KEY_TABLES, &mut state.tables);
    load_field(&conn, KEY_QUICK_PRESETS, &mut state.quick_presets);
    load_field(&conn, KEY_TABLE_TEMPLATES, &mut state.table_templates);
    load_field(&conn, KEY_UI_PREFS, &mut state.ui_prefs);
    drop(conn);

    state.ensure_base_entries();
    state
}

fn to_json<T: serde::Serialize>(key: &str, value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("serialize {key}: {e}"))
}

/// Persist the full application state, all keys in one transaction.
pub fn save_state(db: &DbState, state: &AppState) -> Result<(), String> {
    let mut conn = db.conn.lock().map_err(|e| e.to_string())?;
    let tx = conn.transaction().map_err(|e| format!("begin save: {e}"))?;
    let records = [
        (KEY_ITEMS, to_json(KEY_ITEMS, &state.items)?),
        (KEY_PRICES, to_json(KEY_PRICES, &state.prices)?),
        (
            KEY_PROMO_ENABLED,
            to_json(KEY_PROMO_ENABLED, &state.promo_enabled)?,
        ),
        (KEY_TABLES, to_json(KEY_TABLES, &state.tables)?),
        (
            KEY_QUICK_PRESETS,
            to_json(KEY_QUICK_PRESETS, &state.quick_presets)?,
        ),
        (
            KEY_TABLE_TEMPLATES,
            to_json(KEY_TABLE_TEMPLATES, &state.table_templates)?,
        ),
        (KEY_UI_PREFS, to_json(KEY_UI_PREFS, &state.ui_prefs)?),
    ];
    for (key, value) in &records {
        set_record(&tx, key, value)?;
    }
    tx.commit().map_err(|e| format!("commit save: {e}"))?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn run_migrations_for_test(conn: &Connection) {
    run_migrations(conn).expect("migrations");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> DbState {
        init_in_memory().expect("open in-memory db")
    }

    #[test]
    fn test_fresh_db_loads_defaults() {
        let db = test_db();
        let state = load_state(&db);
        assert_eq!(state.items.len(), 8);
        assert_eq!(state.prices["taco_pastor"], 1700);
        assert!(state.tables.is_empty());
        assert!(!state.quick_presets.is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let db = test_db();
        let mut state = AppState::default();
        let id = crate::table::create_table(&mut state, "Mesa 4", "terraza", 1_000).unwrap();
        crate::table::set_qty(&mut state, &id, "taco_pastor", 3).unwrap();
        state.promo_enabled = true;
        state.ui_prefs.dense = true;

        save_state(&db, &state).expect("save");
        let loaded = load_state(&db);
        assert_eq!(loaded.tables, state.tables);
        assert!(loaded.promo_enabled);
        assert!(loaded.ui_prefs.dense);
        assert_eq!(loaded.prices, state.prices);
    }

    #[test]
    fn test_unreadable_record_keeps_default() {
        let db = test_db();
        {
            let conn = db.conn.lock().unwrap();
            set_record(&conn, KEY_TABLES, "{not json").unwrap();
            set_record(&conn, KEY_PROMO_ENABLED, "true").unwrap();
        }
        let state = load_state(&db);
        assert!(state.tables.is_empty());
        assert!(state.promo_enabled);
    }

    #[test]
    fn test_load_merges_missing_base_items() {
        let db = test_db();
        {
            let conn = db.conn.lock().unwrap();
            // A catalog record missing most of the base menu
            set_record(
                &conn,
                KEY_ITEMS,
                r#"[{"id":"custom_x","label":"Agua","category":"bebidas","emoji":"","base":false}]"#,
            )
            .unwrap();
            set_record(&conn, KEY_PRICES, r#"{"custom_x":1500}"#).unwrap();
        }
        let state = load_state(&db);
        assert!(state.has_item("custom_x"));
        assert!(state.has_item("taco_pastor"));
        assert_eq!(state.prices["taco_pastor"], 1700);
        assert_eq!(state.prices["custom_x"], 1500);
    }

    #[test]
    fn test_migrate_v2_converts_legacy_records() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT DEFAULT (datetime('now'))
            );",
        )
        .unwrap();
        migrate_v1(&conn).unwrap();

        set_record(
            &conn,
            "tacos_items",
            r#"[{"id":"taco_pastor","label":"Taco de Pastor","base":true},
                {"id":"custom_agua","label":"Agua fresca","base":false}]"#,
        )
        .unwrap();
        set_record(
            &conn,
            "tacos_prices",
            r#"{"taco_pastor":17.0,"custom_agua":22.5}"#,
        )
        .unwrap();
        set_record(&conn, "tacos_promoEnabled", "true").unwrap();
        // both table records exist: the _v2 rename wins
        set_record(&conn, "tacos_tables", r#"[]"#).unwrap();
        set_record(
            &conn,
            "tacos_tables_v2",
            r#"[{"id":"id_abc","name":"Mesa 1","note":"","order":{"taco_pastor":5},
                 "charged":true,"paidAt":1700000300000,"createdAt":1700000000000,
                 "openDurationMs":300000,"tip":10.5}]"#,
        )
        .unwrap();

        run_migrations_for_test(&conn);

        let db = DbState {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        };
        let state = load_state(&db);

        assert_eq!(state.prices["custom_agua"], 2250);
        let agua = state.item("custom_agua").unwrap();
        assert_eq!(agua.label, "Agua fresca");
        assert!(state.promo_enabled);

        assert_eq!(state.tables.len(), 1);
        let table = &state.tables[0];
        assert_eq!(table.id, "id_abc");
        assert!(table.charged);
        assert_eq!(table.paid_at, Some(1_700_000_300_000));
        assert_eq!(table.open_duration_ms, Some(300_000));
        assert_eq!(table.tip, 1050);
        assert_eq!(table.order["taco_pastor"], 5);
        assert!(table.rounds.is_empty());

        // legacy keys are gone
        let conn = db.conn.lock().unwrap();
        assert!(get_record(&conn, "tacos_items").is_none());
        assert!(get_record(&conn, "tacos_tables_v2").is_none());
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let db = test_db();
        let conn = db.conn.lock().unwrap();
        run_migrations_for_test(&conn);
        run_migrations_for_test(&conn);
        let version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }
}
