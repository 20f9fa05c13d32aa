use crate::error::PlanError;
use crate::fixed::{Fixed64, Minutes, Rate};
use crate::id::{ItemId, RecipeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Item definitions
// ---------------------------------------------------------------------------

/// Classification of an item. Ores are raw and have no recipe; everything
/// else is craftable via exactly one recipe. Catalysts are consumed by a
/// recipe but regenerated as a byproduct, so they loop instead of being
/// endlessly reproduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Ore,
    Catalyst,
    Product,
    Element,
}

/// Rarity tier of an item. Carried as metadata; the planner never branches
/// on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Basic,
    Uncommon,
    Advanced,
    Rare,
    Exotic,
}

/// An item type definition in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDef {
    pub name: String,
    pub kind: ItemKind,
    pub tier: Tier,
}

// ---------------------------------------------------------------------------
// Recipe definitions
// ---------------------------------------------------------------------------

/// A recipe ingredient, product, or byproduct entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeEntry {
    pub item: ItemId,
    pub quantity: u32,
}

/// A recipe definition. The product entry names the single primary output;
/// byproducts are secondary outputs that land in the same output container
/// and are reclaimed after planning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDef {
    pub product: RecipeEntry,
    pub time: Minutes,
    pub ingredients: Vec<RecipeEntry>,
    pub byproducts: Vec<RecipeEntry>,
}

impl RecipeDef {
    /// Units of the primary product per minute.
    pub fn product_rate(&self) -> Rate {
        self.rate_of(self.product.quantity)
    }

    /// Units per minute for a quantity consumed or produced per craft.
    pub fn rate_of(&self, quantity: u32) -> Rate {
        Fixed64::from_num(quantity) / self.time
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid item reference: {0:?}")]
    InvalidItemRef(ItemId),
    #[error("craftable item {0:?} has no recipe")]
    MissingRecipeFor(ItemId),
    #[error("item {0:?} has more than one recipe")]
    DuplicateRecipe(ItemId),
    #[error("ore {0:?} cannot have a recipe")]
    OreWithRecipe(ItemId),
    #[error("recipe for {0:?} has non-positive craft time")]
    NonPositiveTime(ItemId),
}

/// Builder for constructing an immutable Catalog.
/// Register items, then recipes, then finalize with `build()`.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    items: Vec<ItemDef>,
    item_name_to_id: HashMap<String, ItemId>,
    recipes: Vec<RecipeDef>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item type. Returns its ID.
    pub fn register_item(&mut self, name: &str, kind: ItemKind, tier: Tier) -> ItemId {
        let id = ItemId(self.items.len() as u32);
        self.items.push(ItemDef {
            name: name.to_string(),
            kind,
            tier,
        });
        self.item_name_to_id.insert(name.to_string(), id);
        id
    }

    pub fn register_ore(&mut self, name: &str, tier: Tier) -> ItemId {
        self.register_item(name, ItemKind::Ore, tier)
    }

    pub fn register_catalyst(&mut self, name: &str, tier: Tier) -> ItemId {
        self.register_item(name, ItemKind::Catalyst, tier)
    }

    pub fn register_product(&mut self, name: &str, tier: Tier) -> ItemId {
        self.register_item(name, ItemKind::Product, tier)
    }

    pub fn register_element(&mut self, name: &str, tier: Tier) -> ItemId {
        self.register_item(name, ItemKind::Element, tier)
    }

    /// Register the single recipe producing `product`. Returns its ID.
    pub fn register_recipe(
        &mut self,
        product: RecipeEntry,
        time: Minutes,
        ingredients: Vec<RecipeEntry>,
        byproducts: Vec<RecipeEntry>,
    ) -> RecipeId {
        let id = RecipeId(self.recipes.len() as u32);
        self.recipes.push(RecipeDef {
            product,
            time,
            ingredients,
            byproducts,
        });
        id
    }

    /// Lookup item type ID by name.
    pub fn item_id(&self, name: &str) -> Option<ItemId> {
        self.item_name_to_id.get(name).copied()
    }

    /// Finalize and build the immutable catalog.
    ///
    /// Validates that every referenced item exists, every craftable item
    /// has exactly one recipe, no ore has one, and craft times are positive.
    pub fn build(self) -> Result<Catalog, CatalogError> {
        let mut recipe_by_product: HashMap<ItemId, RecipeId> = HashMap::new();

        for (idx, recipe) in self.recipes.iter().enumerate() {
            let entries = std::iter::once(&recipe.product)
                .chain(recipe.ingredients.iter())
                .chain(recipe.byproducts.iter());
            for entry in entries {
                if entry.item.0 as usize >= self.items.len() {
                    return Err(CatalogError::InvalidItemRef(entry.item));
                }
            }
            if recipe.time <= Minutes::ZERO {
                return Err(CatalogError::NonPositiveTime(recipe.product.item));
            }
            let product = recipe.product.item;
            if self.items[product.0 as usize].kind == ItemKind::Ore {
                return Err(CatalogError::OreWithRecipe(product));
            }
            if recipe_by_product
                .insert(product, RecipeId(idx as u32))
                .is_some()
            {
                return Err(CatalogError::DuplicateRecipe(product));
            }
        }

        let mut catalysts = Vec::new();
        for (idx, item) in self.items.iter().enumerate() {
            let id = ItemId(idx as u32);
            if item.kind != ItemKind::Ore && !recipe_by_product.contains_key(&id) {
                return Err(CatalogError::MissingRecipeFor(id));
            }
            if item.kind == ItemKind::Catalyst {
                catalysts.push(id);
            }
        }

        Ok(Catalog {
            items: self.items,
            item_name_to_id: self.item_name_to_id,
            recipes: self.recipes,
            recipe_by_product,
            catalysts,
        })
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable item/recipe catalog. Frozen after build(). Thread-safe to share.
#[derive(Debug)]
pub struct Catalog {
    items: Vec<ItemDef>,
    item_name_to_id: HashMap<String, ItemId>,
    recipes: Vec<RecipeDef>,
    recipe_by_product: HashMap<ItemId, RecipeId>,
    catalysts: Vec<ItemId>,
}

impl Catalog {
    pub fn item(&self, id: ItemId) -> Option<&ItemDef> {
        self.items.get(id.0 as usize)
    }

    pub fn item_id(&self, name: &str) -> Option<ItemId> {
        self.item_name_to_id.get(name).copied()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_ore(&self, id: ItemId) -> bool {
        self.item(id).map(|i| i.kind == ItemKind::Ore).unwrap_or(false)
    }

    pub fn is_catalyst(&self, id: ItemId) -> bool {
        self.item(id)
            .map(|i| i.kind == ItemKind::Catalyst)
            .unwrap_or(false)
    }

    /// Every non-ore item is craftable and resolves to exactly one recipe.
    pub fn is_craftable(&self, id: ItemId) -> bool {
        self.item(id).map(|i| i.kind != ItemKind::Ore).unwrap_or(false)
    }

    /// The fixed catalyst item set, in ascending `ItemId` order.
    pub fn catalysts(&self) -> &[ItemId] {
        &self.catalysts
    }

    /// The single recipe producing `item`. Fatal for ores and unknown items:
    /// the planner only ever asks for craftables.
    pub fn recipe_for(&self, item: ItemId) -> Result<&RecipeDef, PlanError> {
        self.recipe_by_product
            .get(&item)
            .and_then(|id| self.recipes.get(id.0 as usize))
            .ok_or(PlanError::MissingRecipe { item })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes(v: u32) -> Minutes {
        Minutes::from_num(v)
    }

    fn entry(item: ItemId, quantity: u32) -> RecipeEntry {
        RecipeEntry { item, quantity }
    }

    fn setup_builder() -> CatalogBuilder {
        let mut b = CatalogBuilder::new();
        let bauxite = b.register_ore("bauxite", Tier::Basic);
        let aluminium = b.register_product("aluminium", Tier::Basic);
        b.register_recipe(entry(aluminium, 2), minutes(1), vec![entry(bauxite, 4)], vec![]);
        b
    }

    #[test]
    fn register_and_build() {
        let cat = setup_builder().build().unwrap();
        assert_eq!(cat.item_count(), 2);
        let aluminium = cat.item_id("aluminium").unwrap();
        assert!(cat.is_craftable(aluminium));
        assert!(cat.recipe_for(aluminium).is_ok());
    }

    #[test]
    fn classification_predicates() {
        let mut b = setup_builder();
        let hydrogen = b.register_catalyst("hydrogen", Tier::Basic);
        let quartz = b.register_ore("quartz", Tier::Basic);
        b.register_recipe(entry(hydrogen, 1), minutes(1), vec![entry(quartz, 1)], vec![]);
        let cat = b.build().unwrap();

        assert!(cat.is_ore(cat.item_id("bauxite").unwrap()));
        assert!(!cat.is_craftable(cat.item_id("bauxite").unwrap()));
        assert!(cat.is_catalyst(hydrogen));
        assert_eq!(cat.catalysts(), &[hydrogen]);
    }

    #[test]
    fn recipe_rates() {
        let cat = setup_builder().build().unwrap();
        let aluminium = cat.item_id("aluminium").unwrap();
        let recipe = cat.recipe_for(aluminium).unwrap();
        assert_eq!(recipe.product_rate(), Fixed64::from_num(2));
        assert_eq!(recipe.rate_of(4), Fixed64::from_num(4));
    }

    #[test]
    fn ore_has_no_recipe() {
        let cat = setup_builder().build().unwrap();
        let bauxite = cat.item_id("bauxite").unwrap();
        assert!(matches!(
            cat.recipe_for(bauxite),
            Err(PlanError::MissingRecipe { item }) if item == bauxite
        ));
    }

    #[test]
    fn craftable_without_recipe_fails_build() {
        let mut b = CatalogBuilder::new();
        b.register_product("orphan", Tier::Basic);
        assert!(matches!(b.build(), Err(CatalogError::MissingRecipeFor(_))));
    }

    #[test]
    fn duplicate_recipe_fails_build() {
        let mut b = setup_builder();
        let bauxite = b.item_id("bauxite").unwrap();
        let aluminium = b.item_id("aluminium").unwrap();
        b.register_recipe(entry(aluminium, 1), minutes(2), vec![entry(bauxite, 1)], vec![]);
        assert!(matches!(b.build(), Err(CatalogError::DuplicateRecipe(_))));
    }

    #[test]
    fn invalid_item_ref_fails_build() {
        let mut b = CatalogBuilder::new();
        let thing = b.register_product("thing", Tier::Basic);
        b.register_recipe(entry(thing, 1), minutes(1), vec![entry(ItemId(999), 1)], vec![]);
        assert!(matches!(b.build(), Err(CatalogError::InvalidItemRef(_))));
    }

    #[test]
    fn ore_with_recipe_fails_build() {
        let mut b = CatalogBuilder::new();
        let bauxite = b.register_ore("bauxite", Tier::Basic);
        b.register_recipe(entry(bauxite, 1), minutes(1), vec![], vec![]);
        assert!(matches!(b.build(), Err(CatalogError::OreWithRecipe(_))));
    }

    #[test]
    fn non_positive_time_fails_build() {
        let mut b = CatalogBuilder::new();
        let thing = b.register_product("thing", Tier::Basic);
        b.register_recipe(entry(thing, 1), Minutes::ZERO, vec![], vec![]);
        assert!(matches!(b.build(), Err(CatalogError::NonPositiveTime(_))));
    }

    #[test]
    fn empty_catalog_builds() {
        let cat = CatalogBuilder::new().build().unwrap();
        assert_eq!(cat.item_count(), 0);
        assert!(cat.catalysts().is_empty());
    }
}
