//! Shared test helpers for integration tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests and integration tests (via the `test-utils`
//! feature).

use crate::catalog::{Catalog, CatalogBuilder, RecipeEntry, Tier};
use crate::factory::Requirement;
use crate::fixed::{Fixed64, Minutes};
use crate::id::ItemId;
use std::collections::BTreeMap;

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Demand helper
// ===========================================================================

/// Build a requirement map from `(item, count, maintain)` triples.
pub fn demand(entries: &[(ItemId, u32, u64)]) -> BTreeMap<ItemId, Requirement> {
    entries
        .iter()
        .map(|&(item, count, maintain)| (item, Requirement { count, maintain }))
        .collect()
}

// ===========================================================================
// Fixture economy
// ===========================================================================

/// A small but complete economy exercising every planner feature.
///
/// Raw ores feed single-ingredient smelting products, which feed a wide
/// assembly recipe with nine distinct-quantity ingredients. Refined iron
/// sheds slag as a reclaimable byproduct, and polycarbonate circulates a
/// catalyst. All craft times are one minute, so per-craft quantities read
/// directly as rates.
///
/// Items, with per-craft recipe quantities:
///
/// - ores: `bauxite`, `hematite`, `coal`, `quartz`
/// - `catalyst_a` (catalyst): 1 from 1 quartz
/// - `aluminium`: 1 from 2 bauxite
/// - `iron`: 1 from 2 hematite
/// - `carbon`: 1 from 1 coal
/// - `silicon`: 1 from 1 quartz
/// - `slag`: 1 from 1 hematite
/// - `screw`: 1 from 2 iron
/// - `plate`: 1 from 3 aluminium
/// - `refined_iron`: 1 from 2 hematite, byproduct 1 slag
/// - `polycarbonate`: 1 from 2 carbon + 1 catalyst_a, byproduct 1 catalyst_a
/// - `assembly_unit`: 1 from silicon 1, screw 2, plate 3, aluminium 4,
///   iron 5, carbon 6, slag 7, bauxite 8, hematite 9
pub fn fixture_catalog() -> Catalog {
    let mut b = CatalogBuilder::new();

    let bauxite = b.register_ore("bauxite", Tier::Basic);
    let hematite = b.register_ore("hematite", Tier::Basic);
    let coal = b.register_ore("coal", Tier::Basic);
    let quartz = b.register_ore("quartz", Tier::Basic);

    let catalyst_a = b.register_catalyst("catalyst_a", Tier::Uncommon);
    let aluminium = b.register_product("aluminium", Tier::Basic);
    let iron = b.register_product("iron", Tier::Basic);
    let carbon = b.register_product("carbon", Tier::Basic);
    let silicon = b.register_product("silicon", Tier::Basic);
    let slag = b.register_product("slag", Tier::Basic);
    let screw = b.register_product("screw", Tier::Uncommon);
    let plate = b.register_product("plate", Tier::Uncommon);
    let refined_iron = b.register_product("refined_iron", Tier::Uncommon);
    let polycarbonate = b.register_product("polycarbonate", Tier::Advanced);
    let assembly_unit = b.register_product("assembly_unit", Tier::Rare);

    let one = Minutes::from_num(1);
    let e = |item, quantity| RecipeEntry { item, quantity };

    b.register_recipe(e(catalyst_a, 1), one, vec![e(quartz, 1)], vec![]);
    b.register_recipe(e(aluminium, 1), one, vec![e(bauxite, 2)], vec![]);
    b.register_recipe(e(iron, 1), one, vec![e(hematite, 2)], vec![]);
    b.register_recipe(e(carbon, 1), one, vec![e(coal, 1)], vec![]);
    b.register_recipe(e(silicon, 1), one, vec![e(quartz, 1)], vec![]);
    b.register_recipe(e(slag, 1), one, vec![e(hematite, 1)], vec![]);
    b.register_recipe(e(screw, 1), one, vec![e(iron, 2)], vec![]);
    b.register_recipe(e(plate, 1), one, vec![e(aluminium, 3)], vec![]);
    b.register_recipe(
        e(refined_iron, 1),
        one,
        vec![e(hematite, 2)],
        vec![e(slag, 1)],
    );
    b.register_recipe(
        e(polycarbonate, 1),
        one,
        vec![e(carbon, 2), e(catalyst_a, 1)],
        vec![e(catalyst_a, 1)],
    );
    b.register_recipe(
        e(assembly_unit, 1),
        one,
        vec![
            e(silicon, 1),
            e(screw, 2),
            e(plate, 3),
            e(aluminium, 4),
            e(iron, 5),
            e(carbon, 6),
            e(slag, 7),
            e(bauxite, 8),
            e(hematite, 9),
        ],
        vec![],
    );

    b.build().expect("fixture catalog is valid")
}
