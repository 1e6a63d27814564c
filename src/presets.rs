//! Quick presets and table templates.
//!
//! A quick preset adds N units of one item to the current table in a single
//! tap ("5 al pastor"). A table template is a named starter order used to
//! open a table pre-filled ("Pareja ventana"). Both live in the persisted
//! application state next to the catalog.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::state::AppState;
use crate::table;

/// One-tap shortcut: add `qty` units of `item_id` to the current table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickPreset {
    pub id: String,
    pub label: String,
    pub item_id: String,
    pub qty: u32,
}

/// Named starter order used to instantiate a new table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableTemplate {
    pub id: String,
    pub label: String,
    pub name: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub order: BTreeMap<String, u32>,
}

fn preset(label: &str, item_id: &str, qty: u32) -> QuickPreset {
    QuickPreset {
        id: Uuid::new_v4().to_string(),
        label: label.to_string(),
        item_id: item_id.to_string(),
        qty,
    }
}

/// The quick-add shortcuts a fresh installation starts with.
pub fn default_presets() -> Vec<QuickPreset> {
    vec![
        preset("5 al pastor", "taco_pastor", 5),
        preset("Orden de gringas", "gringas", 1),
        preset("Refresco", "refresco", 1),
        preset("Cerveza", "cerveza", 1),
    ]
}

// ---------------------------------------------------------------------------
// Quick preset mutations
// ---------------------------------------------------------------------------

/// Insert or update a quick preset. The referenced item must exist and the
/// quantity must be at least 1.
pub fn upsert_preset(state: &mut AppState, preset: QuickPreset) -> CoreResult<()> {
    if preset.qty == 0 {
        return Err(CoreError::validation("preset qty must be at least 1"));
    }
    if !state.has_item(&preset.item_id) {
        return Err(CoreError::UnknownItem(preset.item_id));
    }
    match state.quick_presets.iter_mut().find(|p| p.id == preset.id) {
        Some(existing) => *existing = preset,
        None => state.quick_presets.push(preset),
    }
    Ok(())
}

pub fn delete_preset(state: &mut AppState, preset_id: &str) {
    state.quick_presets.retain(|p| p.id != preset_id);
}

/// Restore the default quick presets, discarding any customization.
pub fn reset_presets(state: &mut AppState) {
    state.quick_presets = default_presets();
}

/// Apply a preset to a table: adds `qty` units of the preset's item.
///
/// An unknown preset or table id is a silent no-op; a preset whose item has
/// been deleted from the catalog is a validation error the UI surfaces.
pub fn apply_preset(state: &mut AppState, table_id: &str, preset_id: &str) -> CoreResult<()> {
    let Some(preset) = state
        .quick_presets
        .iter()
        .find(|p| p.id == preset_id)
        .cloned()
    else {
        debug!(preset_id, "apply_preset: unknown preset, ignoring");
        return Ok(());
    };
    if !state.has_item(&preset.item_id) {
        return Err(CoreError::validation(format!(
            "preset '{}' references a deleted item",
            preset.label
        )));
    }
    let delta = i32::try_from(preset.qty).unwrap_or(i32::MAX);
    table::change_qty(state, table_id, &preset.item_id, delta)
}

// ---------------------------------------------------------------------------
// Table template mutations
// ---------------------------------------------------------------------------

/// Insert or update a table template.
///
/// The template name (used for the instantiated table) must be non-empty and
/// every order line needs a positive quantity; item ids are not checked here
/// because instantiation drops orphans.
pub fn upsert_template(state: &mut AppState, template: TableTemplate) -> CoreResult<()> {
    if template.name.trim().is_empty() {
        return Err(CoreError::validation("template name must not be empty"));
    }
    if template.order.values().any(|&qty| qty == 0) {
        return Err(CoreError::validation(
            "template order quantities must be positive",
        ));
    }
    match state
        .table_templates
        .iter_mut()
        .find(|t| t.id == template.id)
    {
        Some(existing) => *existing = template,
        None => state.table_templates.push(template),
    }
    Ok(())
}

pub fn delete_template(state: &mut AppState, template_id: &str) {
    state.table_templates.retain(|t| t.id != template_id);
}
