//! Catalog and price list for the Taqueria POS.
//!
//! The catalog is the set of sellable items; the price list maps item ids to
//! unit prices in cents. Eight base items ship with the app and cannot be
//! deleted. Orders may reference ids that have since left the catalog — that
//! is tolerated (the UI falls back to showing the raw id), so nothing here
//! validates orders retroactively.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Cents;
use crate::state::AppState;

/// Menu section an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tacos,
    Bebidas,
    Postres,
    Otros,
}

/// One sellable item. `base` items are the fixed house menu and survive
/// every delete attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub label: String,
    pub category: Category,
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub base: bool,
}

/// Unit prices in cents, keyed by item id. A missing entry reads as 0.
pub type PriceList = BTreeMap<String, Cents>;

fn base_item(id: &str, label: &str, category: Category, emoji: &str) -> CatalogItem {
    CatalogItem {
        id: id.to_string(),
        label: label.to_string(),
        category,
        emoji: emoji.to_string(),
        base: true,
    }
}

/// The eight house items every installation starts with.
pub fn base_items() -> Vec<CatalogItem> {
    vec![
        base_item("taco_pastor", "Taco de Pastor", Category::Tacos, "🌮"),
        base_item("taco_suadero", "Taco de Suadero", Category::Tacos, "🌮"),
        base_item("taco_carbon", "Taco al Carbón", Category::Tacos, "🌮"),
        base_item("taco_tripa", "Taco de Tripa", Category::Tacos, "🌮"),
        base_item("taco_cabeza", "Taco de Cabeza", Category::Tacos, "🌮"),
        base_item("gringas", "Gringas", Category::Tacos, "🫓"),
        base_item("refresco", "Refresco", Category::Bebidas, "🥤"),
        base_item("cerveza", "Cerveza", Category::Bebidas, "🍺"),
    ]
}

/// Default prices (cents) for the base items.
pub fn default_prices() -> PriceList {
    [
        ("taco_pastor", 1700),
        ("taco_suadero", 1700),
        ("taco_carbon", 4000),
        ("taco_tripa", 1800),
        ("taco_cabeza", 1700),
        ("gringas", 8000),
        ("refresco", 2700),
        ("cerveza", 3500),
    ]
    .into_iter()
    .map(|(id, cents)| (id.to_string(), cents))
    .collect()
}

/// Unit price for an item, 0 when the price list has no entry.
pub fn unit_price(prices: &PriceList, item_id: &str) -> Cents {
    prices.get(item_id).copied().unwrap_or(0)
}

/// Display label for an item id. Orphaned order lines (item deleted after
/// being ordered) fall back to the raw id instead of erroring.
pub fn display_label(items: &[CatalogItem], item_id: &str) -> String {
    items
        .iter()
        .find(|i| i.id == item_id)
        .map(|i| i.label.clone())
        .unwrap_or_else(|| item_id.to_string())
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// Add a new custom item to the catalog with an initial price.
///
/// Returns the generated item id.
pub fn add_item(
    state: &mut AppState,
    label: &str,
    category: Category,
    emoji: &str,
    price: Cents,
) -> CoreResult<String> {
    let label = label.trim();
    if label.is_empty() {
        return Err(CoreError::validation("item label must not be empty"));
    }
    if price < 0 {
        return Err(CoreError::validation("price must not be negative"));
    }

    let id = format!("custom_{}", Uuid::new_v4());
    state.items.push(CatalogItem {
        id: id.clone(),
        label: label.to_string(),
        category,
        emoji: emoji.to_string(),
        base: false,
    });
    state.prices.insert(id.clone(), price);
    Ok(id)
}

/// Update label/category/emoji of an existing item. Unknown ids are a
/// silent no-op (stale UI events must not crash the session).
pub fn update_item(
    state: &mut AppState,
    item_id: &str,
    label: &str,
    category: Category,
    emoji: &str,
) -> CoreResult<()> {
    let label = label.trim();
    if label.is_empty() {
        return Err(CoreError::validation("item label must not be empty"));
    }
    match state.items.iter_mut().find(|i| i.id == item_id) {
        Some(item) => {
            item.label = label.to_string();
            item.category = category;
            item.emoji = emoji.to_string();
        }
        None => debug!(item_id, "update_item: unknown item, ignoring"),
    }
    Ok(())
}

/// Delete a non-base item and its price entry.
///
/// Base items are protected; deleting one is a validation error. A missing
/// id is a silent no-op. Open-table order lines that still reference the
/// deleted id are left alone and degrade to a raw-id label.
pub fn delete_item(state: &mut AppState, item_id: &str) -> CoreResult<()> {
    let Some(item) = state.items.iter().find(|i| i.id == item_id) else {
        debug!(item_id, "delete_item: unknown item, ignoring");
        return Ok(());
    };
    if item.base {
        return Err(CoreError::validation(format!(
            "base item '{item_id}' cannot be deleted"
        )));
    }
    state.items.retain(|i| i.id != item_id);
    state.prices.remove(item_id);
    Ok(())
}

/// Set the unit price (cents) of a catalog item.
pub fn set_price(state: &mut AppState, item_id: &str, price: Cents) -> CoreResult<()> {
    if price < 0 {
        return Err(CoreError::validation("price must not be negative"));
    }
    if !state.has_item(item_id) {
        return Err(CoreError::UnknownItem(item_id.to_string()));
    }
    state.prices.insert(item_id.to_string(), price);
    Ok(())
}

/// Flip the manual promo override. Stored and surfaced, but not consulted by
/// the billing path; the Monday/Wednesday schedule governs pricing.
pub fn set_promo_enabled(state: &mut AppState, enabled: bool) {
    state.promo_enabled = enabled;
}
