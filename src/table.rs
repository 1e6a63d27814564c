//! Table model and lifecycle for the Taqueria POS.
//!
//! A table is one customer tab: an order (item id -> quantity), a
//! charged/open flag, timestamps, a tip, and a bill-splitting ledger of
//! rounds paid by named friends. Order mutations are only legal while the
//! table is open; the charged guard is enforced here even though the UI is
//! expected to disable those controls.
//!
//! Every function that stamps a timestamp takes `now_ms` explicitly so
//! tests can pin the clock and report windows stay self-consistent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Cents;
use crate::state::AppState;

/// One partial payment toward a shared table, attributed to a named friend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub payer: String,
    pub amount: Cents,
}

/// One customer tab, from creation to payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub note: String,
    /// Item id -> quantity. An absent key means zero; quantities never
    /// persist as zero (removing the last unit deletes the key).
    #[serde(default)]
    pub order: BTreeMap<String, u32>,
    /// false = open/active, true = closed/paid.
    #[serde(default)]
    pub charged: bool,
    /// Unix millis, set at creation, immutable.
    pub created_at: i64,
    /// Unix millis, stamped when the table is charged; cleared on reopen.
    #[serde(default)]
    pub paid_at: Option<i64>,
    /// `paid_at - created_at`, computed once at close time.
    #[serde(default)]
    pub open_duration_ms: Option<i64>,
    /// Cents; meaningful only while `charged` is true.
    #[serde(default)]
    pub tip: Cents,
    #[serde(default)]
    pub rounds: Vec<Round>,
    /// Participants beyond those implied by `rounds`.
    #[serde(default)]
    pub friends: Vec<String>,
}

impl Table {
    fn new(name: String, note: String, now_ms: i64) -> Self {
        Table {
            id: Uuid::new_v4().to_string(),
            name,
            note,
            order: BTreeMap::new(),
            charged: false,
            created_at: now_ms,
            paid_at: None,
            open_duration_ms: None,
            tip: 0,
            rounds: Vec::new(),
            friends: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Create a new open table. Returns the generated table id.
pub fn create_table(state: &mut AppState, name: &str, note: &str, now_ms: i64) -> CoreResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::validation("table name must not be empty"));
    }
    let table = Table::new(name.to_string(), note.trim().to_string(), now_ms);
    let id = table.id.clone();
    state.tables.push(table);
    Ok(id)
}

/// Instantiate a table from a stored template.
///
/// Order entries referencing items no longer in the catalog are dropped at
/// instantiation. Returns `Ok(None)` when the template id does not exist.
pub fn create_table_from_template(
    state: &mut AppState,
    template_id: &str,
    now_ms: i64,
) -> CoreResult<Option<String>> {
    let Some(template) = state
        .table_templates
        .iter()
        .find(|t| t.id == template_id)
        .cloned()
    else {
        debug!(template_id, "create_table_from_template: unknown template");
        return Ok(None);
    };

    let mut table = Table::new(template.name.clone(), template.note.clone(), now_ms);
    for (item_id, qty) in &template.order {
        if *qty == 0 {
            continue;
        }
        if state.has_item(item_id) {
            table.order.insert(item_id.clone(), *qty);
        } else {
            debug!(item_id, "template references deleted item, dropping line");
        }
    }
    let id = table.id.clone();
    state.tables.push(table);
    Ok(Some(id))
}

// ---------------------------------------------------------------------------
// Order mutations (open tables only)
// ---------------------------------------------------------------------------

/// Fetch a table for order mutation. Missing or charged tables yield `None`
/// and the caller treats the mutation as a silent no-op.
fn open_table_mut<'a>(state: &'a mut AppState, table_id: &str) -> Option<&'a mut Table> {
    match state.table_mut(table_id) {
        Some(t) if t.charged => {
            debug!(table_id, "order mutation on charged table refused");
            None
        }
        Some(t) => Some(t),
        None => {
            debug!(table_id, "order mutation on unknown table ignored");
            None
        }
    }
}

/// Add `delta` units of an item to an open table's order (negative removes).
/// Quantities clamp at zero and the key is dropped when it reaches zero.
pub fn change_qty(state: &mut AppState, table_id: &str, item_id: &str, delta: i32) -> CoreResult<()> {
    if delta > 0 && !state.has_item(item_id) {
        return Err(CoreError::UnknownItem(item_id.to_string()));
    }
    let Some(table) = open_table_mut(state, table_id) else {
        return Ok(());
    };
    let current = table.order.get(item_id).copied().unwrap_or(0) as i64;
    let next = (current + i64::from(delta)).max(0) as u32;
    if next == 0 {
        table.order.remove(item_id);
    } else {
        table.order.insert(item_id.to_string(), next);
    }
    Ok(())
}

/// Set the exact quantity of an item on an open table. Zero removes the line.
pub fn set_qty(state: &mut AppState, table_id: &str, item_id: &str, qty: u32) -> CoreResult<()> {
    if qty > 0 && !state.has_item(item_id) {
        return Err(CoreError::UnknownItem(item_id.to_string()));
    }
    let Some(table) = open_table_mut(state, table_id) else {
        return Ok(());
    };
    if qty == 0 {
        table.order.remove(item_id);
    } else {
        table.order.insert(item_id.to_string(), qty);
    }
    Ok(())
}

/// Reset an open table's order to empty.
pub fn clear_order(state: &mut AppState, table_id: &str) {
    if let Some(table) = open_table_mut(state, table_id) {
        table.order.clear();
    }
}

// ---------------------------------------------------------------------------
// Lifecycle transitions
// ---------------------------------------------------------------------------

/// Close (charge) a table: stamps `paid_at`, computes `open_duration_ms`
/// once, records the tip. Already-charged and unknown tables are a no-op.
pub fn close_table(state: &mut AppState, table_id: &str, tip: Cents, now_ms: i64) -> CoreResult<()> {
    if tip < 0 {
        return Err(CoreError::validation("tip must not be negative"));
    }
    let Some(table) = state.table_mut(table_id) else {
        debug!(table_id, "close_table: unknown table, ignoring");
        return Ok(());
    };
    if table.charged {
        debug!(table_id, "close_table: already charged, ignoring");
        return Ok(());
    }
    table.charged = true;
    table.paid_at = Some(now_ms);
    table.open_duration_ms = Some(now_ms - table.created_at);
    table.tip = tip;
    Ok(())
}

/// Reopen a charged table: clears `paid_at`, `open_duration_ms` and the tip;
/// the order and the rounds ledger stay untouched.
pub fn reopen_table(state: &mut AppState, table_id: &str) {
    let Some(table) = state.table_mut(table_id) else {
        debug!(table_id, "reopen_table: unknown table, ignoring");
        return;
    };
    if !table.charged {
        debug!(table_id, "reopen_table: table is already open, ignoring");
        return;
    }
    table.charged = false;
    table.paid_at = None;
    table.open_duration_ms = None;
    table.tip = 0;
}

/// Remove a table permanently. The confirmation prompt lives in the UI.
pub fn delete_table(state: &mut AppState, table_id: &str) {
    state.tables.retain(|t| t.id != table_id);
}

/// Close every active table at once with no tip (end-of-night sweep).
/// Returns how many tables were closed.
pub fn close_all_tables(state: &mut AppState, now_ms: i64) -> usize {
    let mut closed = 0;
    for table in state.tables.iter_mut().filter(|t| !t.charged) {
        table.charged = true;
        table.paid_at = Some(now_ms);
        table.open_duration_ms = Some(now_ms - table.created_at);
        table.tip = 0;
        closed += 1;
    }
    closed
}

// ---------------------------------------------------------------------------
// Bill splitting
// ---------------------------------------------------------------------------

/// Record a partial payment by a named friend. Rounds may be added while the
/// table is open or after it is charged; they never touch the order.
pub fn add_round(state: &mut AppState, table_id: &str, payer: &str, amount: Cents) -> CoreResult<()> {
    let payer = payer.trim();
    if payer.is_empty() {
        return Err(CoreError::validation("round payer must not be empty"));
    }
    if amount <= 0 {
        return Err(CoreError::validation("round amount must be positive"));
    }
    let Some(table) = state.table_mut(table_id) else {
        debug!(table_id, "add_round: unknown table, ignoring");
        return Ok(());
    };
    table.rounds.push(Round {
        payer: payer.to_string(),
        amount,
    });
    Ok(())
}

/// Add a named participant to the split. Duplicates (case-insensitive) are
/// ignored.
pub fn add_friend(state: &mut AppState, table_id: &str, name: &str) -> CoreResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::validation("friend name must not be empty"));
    }
    let Some(table) = state.table_mut(table_id) else {
        debug!(table_id, "add_friend: unknown table, ignoring");
        return Ok(());
    };
    let lower = name.to_lowercase();
    if table.friends.iter().any(|f| f.to_lowercase() == lower) {
        return Ok(());
    }
    table.friends.push(name.to_string());
    Ok(())
}

/// Remove a participant by name (case-insensitive).
pub fn remove_friend(state: &mut AppState, table_id: &str, name: &str) {
    let Some(table) = state.table_mut(table_id) else {
        return;
    };
    let lower = name.trim().to_lowercase();
    table.friends.retain(|f| f.to_lowercase() != lower);
}
