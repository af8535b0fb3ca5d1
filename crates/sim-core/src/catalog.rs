//! Static catalog data: ingredients, vendors, recipes, and stages.
//!
//! The catalog is validated up front (cross-references included) so the
//! running engine can treat lookups that fail as programmer errors rather
//! than gameplay outcomes.

use crate::error::ValidationError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key identifying an ingredient, e.g. "flour".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IngredientKey(pub String);

impl IngredientKey {
    /// Convenience constructor from any string-like value.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl fmt::Display for IngredientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key identifying a finished product, e.g. "sourdough".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductKey(pub String);

impl ProductKey {
    /// Convenience constructor from any string-like value.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for a supplier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VendorId(pub String);

impl VendorId {
    /// Convenience constructor from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supply-side grouping used by the market simulator.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SupplyCategory {
    /// Flours and grains.
    Grains,
    /// Butter, milk, eggs, cream.
    Dairy,
    /// Fruit and vegetables.
    Produce,
    /// Sugar, honey, syrups.
    Sweeteners,
    /// Spices, chocolate, flavorings.
    Specialty,
}

impl SupplyCategory {
    /// All categories, for exhaustive iteration.
    pub const ALL: [SupplyCategory; 5] = [
        SupplyCategory::Grains,
        SupplyCategory::Dairy,
        SupplyCategory::Produce,
        SupplyCategory::Sweeteners,
        SupplyCategory::Specialty,
    ];
}

/// A purchasable perishable ingredient.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ingredient {
    /// Catalog key.
    pub key: IngredientKey,
    /// Display name.
    pub name: String,
    /// Market category for supply-level pricing.
    pub category: SupplyCategory,
    /// Quality at purchase before the vendor multiplier, in [0, 100].
    pub base_quality: f64,
    /// Linear quality loss per day in storage (> 0).
    pub decay_rate: f64,
    /// Reference unit price before market adjustments.
    pub base_price: Decimal,
}

/// A supplier with a quality and price profile.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vendor {
    /// Vendor identifier.
    pub id: VendorId,
    /// Display name.
    pub name: String,
    /// Multiplier applied to ingredient base quality on purchase.
    pub quality_multiplier: f64,
    /// Multiplier applied to the market price when quoting this vendor.
    pub price_multiplier: f64,
}

/// Named phases of the production pipeline.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum StageKind {
    Prep,
    Mixing,
    Shaping,
    Baking,
    Cooling,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageKind::Prep => "prep",
            StageKind::Mixing => "mixing",
            StageKind::Shaping => "shaping",
            StageKind::Baking => "baking",
            StageKind::Cooling => "cooling",
        };
        f.write_str(s)
    }
}

/// One step of a recipe's pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// Which phase this is.
    pub kind: StageKind,
    /// Nominal duration in simulated minutes (> 0).
    pub duration_min: f64,
    /// Skill level the stage is balanced for, in [0, 100].
    pub skill_requirement: f64,
    /// Whether the stage occupies an oven slot while in progress.
    pub requires_oven: bool,
    /// Multiplicative quality contribution applied on completion.
    pub quality_impact: f64,
}

impl Stage {
    /// Stage with explicit parameters; `requires_oven` defaults from the kind.
    pub fn new(kind: StageKind, duration_min: f64, skill_requirement: f64, quality_impact: f64) -> Self {
        Self {
            kind,
            duration_min,
            skill_requirement,
            requires_oven: kind == StageKind::Baking,
            quality_impact,
        }
    }
}

/// The standard prep→mixing→shaping→baking→cooling pipeline.
pub fn default_stages() -> Vec<Stage> {
    vec![
        Stage::new(StageKind::Prep, 15.0, 20.0, 0.99),
        Stage::new(StageKind::Mixing, 20.0, 40.0, 0.98),
        Stage::new(StageKind::Shaping, 15.0, 50.0, 0.98),
        Stage::new(StageKind::Baking, 30.0, 60.0, 0.97),
        Stage::new(StageKind::Cooling, 20.0, 10.0, 1.0),
    ]
}

/// A product recipe: ingredient requirements per unit plus a stage pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Recipe {
    /// Product this recipe yields.
    pub key: ProductKey,
    /// Display name.
    pub name: String,
    /// Ingredient quantities consumed per produced unit.
    pub ingredients: Vec<(IngredientKey, f64)>,
    /// List price per unit at full quality.
    pub list_price: Decimal,
    /// Ordered pipeline; defaults to `default_stages` when not overridden.
    pub stages: Vec<Stage>,
}

impl Recipe {
    /// Recipe with the standard stage pipeline.
    pub fn new(key: impl Into<String>, name: impl Into<String>, list_price: Decimal) -> Self {
        Self {
            key: ProductKey::new(key),
            name: name.into(),
            ingredients: Vec::new(),
            list_price,
            stages: default_stages(),
        }
    }

    /// Add an ingredient requirement per produced unit.
    pub fn with_ingredient(mut self, key: impl Into<String>, per_unit: f64) -> Self {
        self.ingredients.push((IngredientKey::new(key), per_unit));
        self
    }

    /// Replace the stage pipeline.
    pub fn with_stages(mut self, stages: Vec<Stage>) -> Self {
        self.stages = stages;
        self
    }

    /// Total requirement for producing `quantity` units.
    pub fn requirements(&self, quantity: f64) -> Vec<(IngredientKey, f64)> {
        self.ingredients
            .iter()
            .map(|(key, per_unit)| (key.clone(), per_unit * quantity))
            .collect()
    }
}

/// Full static catalog the engine runs against.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Catalog {
    /// Ingredients by key.
    pub ingredients: BTreeMap<IngredientKey, Ingredient>,
    /// Vendors by id.
    pub vendors: BTreeMap<VendorId, Vendor>,
    /// Recipes by product key.
    pub recipes: BTreeMap<ProductKey, Recipe>,
}

impl Catalog {
    /// Empty catalog.
    pub fn empty() -> Self {
        Self {
            ingredients: BTreeMap::new(),
            vendors: BTreeMap::new(),
            recipes: BTreeMap::new(),
        }
    }

    /// The stock bakery world: staple ingredients, three vendors, four recipes.
    pub fn standard() -> Self {
        let mut catalog = Self::empty();
        let ingredients = [
            ("flour", "Wheat flour", SupplyCategory::Grains, 90.0, 2.0, Decimal::new(250, 2)),
            ("yeast", "Baker's yeast", SupplyCategory::Grains, 85.0, 5.0, Decimal::new(120, 2)),
            ("butter", "Butter", SupplyCategory::Dairy, 92.0, 4.0, Decimal::new(450, 2)),
            ("eggs", "Eggs", SupplyCategory::Dairy, 88.0, 6.0, Decimal::new(320, 2)),
            ("milk", "Whole milk", SupplyCategory::Dairy, 90.0, 8.0, Decimal::new(180, 2)),
            ("sugar", "Cane sugar", SupplyCategory::Sweeteners, 95.0, 1.0, Decimal::new(210, 2)),
            ("apples", "Apples", SupplyCategory::Produce, 85.0, 7.0, Decimal::new(280, 2)),
            ("chocolate", "Dark chocolate", SupplyCategory::Specialty, 93.0, 2.0, Decimal::new(780, 2)),
            ("cinnamon", "Cinnamon", SupplyCategory::Specialty, 90.0, 1.0, Decimal::new(540, 2)),
        ];
        for (key, name, category, base_quality, decay_rate, base_price) in ingredients {
            catalog.ingredients.insert(
                IngredientKey::new(key),
                Ingredient {
                    key: IngredientKey::new(key),
                    name: name.to_string(),
                    category,
                    base_quality,
                    decay_rate,
                    base_price,
                },
            );
        }

        let vendors = [
            ("discount-depot", "Discount Depot", 0.85, 0.8),
            ("city-wholesale", "City Wholesale", 1.0, 1.0),
            ("artisan-farms", "Artisan Farms", 1.1, 1.3),
        ];
        for (id, name, quality_multiplier, price_multiplier) in vendors {
            catalog.vendors.insert(
                VendorId::new(id),
                Vendor {
                    id: VendorId::new(id),
                    name: name.to_string(),
                    quality_multiplier,
                    price_multiplier,
                },
            );
        }

        let bread = Recipe::new("bread", "Country loaf", Decimal::new(650, 2))
            .with_ingredient("flour", 0.5)
            .with_ingredient("yeast", 0.02)
            .with_ingredient("milk", 0.1);
        let croissant = Recipe::new("croissant", "Croissant", Decimal::new(380, 2))
            .with_ingredient("flour", 0.15)
            .with_ingredient("butter", 0.12)
            .with_ingredient("yeast", 0.01)
            .with_stages(vec![
                Stage::new(StageKind::Prep, 25.0, 40.0, 0.99),
                Stage::new(StageKind::Mixing, 20.0, 55.0, 0.98),
                Stage::new(StageKind::Shaping, 30.0, 70.0, 0.97),
                Stage::new(StageKind::Baking, 22.0, 65.0, 0.97),
                Stage::new(StageKind::Cooling, 10.0, 10.0, 1.0),
            ]);
        let chocolate_cake = Recipe::new("chocolate-cake", "Chocolate cake", Decimal::new(2400, 2))
            .with_ingredient("flour", 0.3)
            .with_ingredient("sugar", 0.25)
            .with_ingredient("eggs", 0.3)
            .with_ingredient("butter", 0.2)
            .with_ingredient("chocolate", 0.25);
        let cinnamon_roll = Recipe::new("cinnamon-roll", "Cinnamon roll", Decimal::new(420, 2))
            .with_ingredient("flour", 0.2)
            .with_ingredient("sugar", 0.1)
            .with_ingredient("butter", 0.08)
            .with_ingredient("cinnamon", 0.02)
            .with_ingredient("yeast", 0.01);
        for recipe in [bread, croissant, chocolate_cake, cinnamon_roll] {
            catalog.recipes.insert(recipe.key.clone(), recipe);
        }

        catalog
    }

    /// Validate all entries and cross-references.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for ingredient in self.ingredients.values() {
            if ingredient.key.0.trim().is_empty() || ingredient.name.trim().is_empty() {
                return Err(ValidationError::EmptyName);
            }
            if !(0.0..=100.0).contains(&ingredient.base_quality) {
                return Err(ValidationError::InvalidQuality);
            }
            if !(ingredient.decay_rate > 0.0) || !ingredient.decay_rate.is_finite() {
                return Err(ValidationError::NonPositiveDuration);
            }
            if ingredient.base_price < Decimal::ZERO {
                return Err(ValidationError::NegativeMoney);
            }
        }
        for vendor in self.vendors.values() {
            if vendor.id.0.trim().is_empty() {
                return Err(ValidationError::EmptyName);
            }
            if !(vendor.quality_multiplier > 0.0) || !(vendor.price_multiplier > 0.0) {
                return Err(ValidationError::NonPositiveDuration);
            }
        }
        for recipe in self.recipes.values() {
            if recipe.key.0.trim().is_empty() || recipe.name.trim().is_empty() {
                return Err(ValidationError::EmptyName);
            }
            if recipe.list_price < Decimal::ZERO {
                return Err(ValidationError::NegativeMoney);
            }
            if recipe.stages.is_empty() {
                return Err(ValidationError::NonPositiveDuration);
            }
            for stage in &recipe.stages {
                if !(stage.duration_min > 0.0) || !stage.duration_min.is_finite() {
                    return Err(ValidationError::NonPositiveDuration);
                }
                if !(0.0..=100.0).contains(&stage.skill_requirement) {
                    return Err(ValidationError::InvalidQuality);
                }
            }
            for (key, per_unit) in &recipe.ingredients {
                if !(*per_unit > 0.0) || !per_unit.is_finite() {
                    return Err(ValidationError::NonPositiveDuration);
                }
                if !self.ingredients.contains_key(key) {
                    return Err(ValidationError::UnknownIngredient(key.0.clone()));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_validates() {
        let catalog = Catalog::standard();
        catalog.validate().unwrap();
        assert!(catalog.ingredients.contains_key(&IngredientKey::new("flour")));
        assert!(catalog.recipes.contains_key(&ProductKey::new("bread")));
    }

    #[test]
    fn recipe_with_unknown_ingredient_rejected() {
        let mut catalog = Catalog::standard();
        let bad = Recipe::new("mystery-pie", "Mystery pie", Decimal::new(100, 2))
            .with_ingredient("unobtainium", 1.0);
        catalog.recipes.insert(bad.key.clone(), bad);
        assert_eq!(
            catalog.validate(),
            Err(ValidationError::UnknownIngredient("unobtainium".to_string()))
        );
    }

    #[test]
    fn requirements_scale_with_quantity() {
        let catalog = Catalog::standard();
        let bread = &catalog.recipes[&ProductKey::new("bread")];
        let reqs = bread.requirements(10.0);
        let flour = reqs
            .iter()
            .find(|(k, _)| k == &IngredientKey::new("flour"))
            .unwrap();
        assert!((flour.1 - 5.0).abs() < 1e-9);
    }

    #[test]
    fn only_baking_needs_an_oven_by_default() {
        let stages = default_stages();
        let oven_stages: Vec<_> = stages.iter().filter(|s| s.requires_oven).collect();
        assert_eq!(oven_stages.len(), 1);
        assert_eq!(oven_stages[0].kind, StageKind::Baking);
    }

    #[test]
    fn serde_roundtrip_catalog() {
        let catalog = Catalog::standard();
        let s = serde_json::to_string(&catalog).unwrap();
        let back: Catalog = serde_json::from_str(&s).unwrap();
        back.validate().unwrap();
        assert_eq!(back.ingredients.len(), catalog.ingredients.len());
        assert_eq!(back.recipes.len(), catalog.recipes.len());
    }
}
