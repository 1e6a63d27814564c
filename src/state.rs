//! The single persisted application state.
//!
//! Everything the POS knows — catalog, prices, tables, presets, templates,
//! the promo override and the UI prefs — lives in one `AppState` value owned
//! by the application object. Core functions take it explicitly instead of
//! reaching for a global, so every test can build a fresh state.

use serde::{Deserialize, Serialize};

use crate::catalog::{self, CatalogItem, PriceList};
use crate::presets::{self, QuickPreset, TableTemplate};
use crate::table::Table;

/// Presentation-only flags, persisted for continuity across sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiPrefs {
    #[serde(default)]
    pub dense: bool,
    #[serde(default)]
    pub high_contrast: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default)]
    pub items: Vec<CatalogItem>,
    #[serde(default)]
    pub prices: PriceList,
    /// Manual promo override. Stored and surfaced but not consulted by
    /// billing; the Monday/Wednesday schedule is the active gate.
    #[serde(default)]
    pub promo_enabled: bool,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub quick_presets: Vec<QuickPreset>,
    #[serde(default)]
    pub table_templates: Vec<TableTemplate>,
    #[serde(default)]
    pub ui_prefs: UiPrefs,
}

impl Default for AppState {
    fn default() -> Self {
        AppState {
            items: catalog::base_items(),
            prices: catalog::default_prices(),
            promo_enabled: false,
            tables: Vec::new(),
            quick_presets: presets::default_presets(),
            table_templates: Vec::new(),
            ui_prefs: UiPrefs::default(),
        }
    }
}

impl AppState {
    /// Merge in any base item or default price that a loaded state is
    /// missing. Loaded data wins; this only fills gaps, so an installation
    /// that renamed nothing but predates a new base item still gets it.
    pub fn ensure_base_entries(&mut self) {
        let defaults = catalog::default_prices();
        for base in catalog::base_items() {
            if !self.items.iter().any(|i| i.id == base.id) {
                self.items.insert(0, base.clone());
            }
            if !self.prices.contains_key(&base.id) {
                self.prices
                    .insert(base.id.clone(), defaults.get(&base.id).copied().unwrap_or(0));
            }
        }
    }

    pub fn table(&self, table_id: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == table_id)
    }

    pub fn table_mut(&mut self, table_id: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.id == table_id)
    }

    pub fn item(&self, item_id: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn has_item(&self, item_id: &str) -> bool {
        self.item(item_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_seeded() {
        let state = AppState::default();
        assert_eq!(state.items.len(), 8);
        assert!(state.items.iter().all(|i| i.base));
        assert!(!state.quick_presets.is_empty());
        assert!(state.tables.is_empty());
        assert!(!state.promo_enabled);
    }

    #[test]
    fn test_ensure_base_entries_fills_gaps() {
        let mut state = AppState::default();
        state.items.retain(|i| i.id != "taco_pastor");
        state.prices.remove("taco_pastor");
        state.prices.remove("cerveza");

        state.ensure_base_entries();
        assert!(state.has_item("taco_pastor"));
        assert_eq!(state.prices["taco_pastor"], 1700);
        assert_eq!(state.prices["cerveza"], 3500);
    }

    #[test]
    fn test_ensure_base_entries_keeps_loaded_values() {
        let mut state = AppState::default();
        state.prices.insert("taco_pastor".to_string(), 2000);
        state.ensure_base_entries();
        assert_eq!(state.prices["taco_pastor"], 2000);
    }
}
