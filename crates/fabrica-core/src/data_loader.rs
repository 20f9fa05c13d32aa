//! Data-driven catalog loading from JSON.
//!
//! Feature-gated behind `data-loader`. Provides JSON deserialization into
//! [`CatalogBuilder`] for item and recipe data defined in data files.

use crate::catalog::{CatalogBuilder, CatalogError, ItemKind, RecipeEntry, Tier};
use crate::fixed::Minutes;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("unknown item reference: {0}")]
    UnknownItemRef(String),
    #[error("unknown item kind: {0}")]
    UnknownKind(String),
    #[error("unknown tier: {0}")]
    UnknownTier(String),
}

// ---------------------------------------------------------------------------
// JSON data structures
// ---------------------------------------------------------------------------

/// Top-level catalog data structure for JSON deserialization.
#[derive(Debug, serde::Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub items: Vec<ItemData>,
    #[serde(default)]
    pub recipes: Vec<RecipeData>,
}

/// JSON representation of an item type.
#[derive(Debug, serde::Deserialize)]
pub struct ItemData {
    pub name: String,
    pub kind: String, // "ore", "catalyst", "product", "element"
    #[serde(default)]
    pub tier: Option<String>, // "basic".."exotic", defaults to basic
}

/// JSON representation of a recipe.
#[derive(Debug, serde::Deserialize)]
pub struct RecipeData {
    pub product: RecipeEntryData,
    pub time: f64, // minutes per craft
    #[serde(default)]
    pub ingredients: Vec<RecipeEntryData>,
    #[serde(default)]
    pub byproducts: Vec<RecipeEntryData>,
}

/// JSON representation of a recipe product/ingredient/byproduct entry.
#[derive(Debug, serde::Deserialize)]
pub struct RecipeEntryData {
    pub item: String, // references item by name
    pub quantity: u32,
}

// ---------------------------------------------------------------------------
// Loading functions
// ---------------------------------------------------------------------------

/// Load a catalog builder from a JSON string.
pub fn load_catalog_json(json: &str) -> Result<CatalogBuilder, DataLoadError> {
    let data: CatalogData = serde_json::from_str(json)?;
    build_catalog(data)
}

/// Load a catalog builder from JSON bytes.
pub fn load_catalog_json_bytes(bytes: &[u8]) -> Result<CatalogBuilder, DataLoadError> {
    let data: CatalogData = serde_json::from_slice(bytes)?;
    build_catalog(data)
}

fn parse_kind(kind: &str) -> Result<ItemKind, DataLoadError> {
    match kind {
        "ore" => Ok(ItemKind::Ore),
        "catalyst" => Ok(ItemKind::Catalyst),
        "product" => Ok(ItemKind::Product),
        "element" => Ok(ItemKind::Element),
        other => Err(DataLoadError::UnknownKind(other.to_string())),
    }
}

fn parse_tier(tier: Option<&str>) -> Result<Tier, DataLoadError> {
    match tier {
        None | Some("basic") => Ok(Tier::Basic),
        Some("uncommon") => Ok(Tier::Uncommon),
        Some("advanced") => Ok(Tier::Advanced),
        Some("rare") => Ok(Tier::Rare),
        Some("exotic") => Ok(Tier::Exotic),
        Some(other) => Err(DataLoadError::UnknownTier(other.to_string())),
    }
}

fn build_catalog(data: CatalogData) -> Result<CatalogBuilder, DataLoadError> {
    let mut builder = CatalogBuilder::new();

    // Phase 1: Register all items
    for item in &data.items {
        let kind = parse_kind(&item.kind)?;
        let tier = parse_tier(item.tier.as_deref())?;
        builder.register_item(&item.name, kind, tier);
    }

    // Phase 2: Register all recipes (resolve item refs by name)
    for recipe in &data.recipes {
        let product = resolve_entry(&builder, &recipe.product)?;
        let mut ingredients = Vec::new();
        for entry in &recipe.ingredients {
            ingredients.push(resolve_entry(&builder, entry)?);
        }
        let mut byproducts = Vec::new();
        for entry in &recipe.byproducts {
            byproducts.push(resolve_entry(&builder, entry)?);
        }
        builder.register_recipe(
            product,
            Minutes::from_num(recipe.time),
            ingredients,
            byproducts,
        );
    }

    Ok(builder)
}

fn resolve_entry(
    builder: &CatalogBuilder,
    entry: &RecipeEntryData,
) -> Result<RecipeEntry, DataLoadError> {
    let item = builder
        .item_id(&entry.item)
        .ok_or_else(|| DataLoadError::UnknownItemRef(entry.item.clone()))?;
    Ok(RecipeEntry {
        item,
        quantity: entry.quantity,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
