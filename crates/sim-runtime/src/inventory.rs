//! Batch-tracked inventory ledger for ingredients and finished products.
//!
//! Batches are kept oldest-first per key, so FIFO consumption and sale are
//! a front-to-back drain. Quality queries are quantity-weighted averages;
//! empty stock reads as full quality so callers never divide by zero
//! stock. Ingredients decay linearly per day; products lose 10% of their
//! quality per day.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{Catalog, IngredientKey, ProductKey, SimError, VendorId};
use sim_econ::quality_price_multiplier;
use std::collections::BTreeMap;

/// Multiplicative per-day quality retention for product batches.
pub const PRODUCT_DECAY_FACTOR: f64 = 0.9;

/// Batches below this residual quantity are pruned.
const QUANTITY_EPSILON: f64 = 1e-9;

/// One purchased lot of an ingredient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IngredientBatch {
    /// Remaining quantity (>= 0; pruned at zero).
    pub quantity: f64,
    /// Quality in [0, 100].
    pub quality: f64,
    /// Day the batch was purchased.
    pub purchase_day: u32,
    /// Vendor the batch came from.
    pub vendor: VendorId,
    /// Unit cost paid.
    pub unit_cost: Decimal,
}

/// One baked lot of a product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductBatch {
    /// Remaining quantity (>= 0; pruned at zero).
    pub quantity: f64,
    /// Quality in [0, 100].
    pub quality: f64,
    /// Day the batch finished baking.
    pub bake_day: u32,
    /// Weighted ingredient quality that went into the batch.
    pub ingredient_quality: f64,
    /// Cost basis per unit.
    pub unit_cost: Decimal,
}

/// Result of an all-or-nothing ingredient consumption.
#[derive(Clone, Debug, PartialEq)]
pub struct ConsumeOutcome {
    /// Quantity-weighted average quality across everything consumed.
    pub avg_quality: f64,
    /// Total cost basis of the consumed quantities.
    pub total_cost: Decimal,
}

/// Result of a FIFO product sale.
#[derive(Clone, Debug, PartialEq)]
pub struct SaleOutcome {
    /// Revenue after the quality price ladder, rounded to cents.
    pub revenue: Decimal,
    /// Cost of goods sold, rounded to cents.
    pub cogs: Decimal,
    /// Quantity-weighted average quality of the units sold.
    pub avg_quality: f64,
}

/// What a day of decay removed or flagged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecayReport {
    /// Ingredient batches that reached quality zero, by key and quantity.
    pub spoiled_ingredients: Vec<(IngredientKey, f64)>,
    /// Product quantities now under the stale threshold (still in stock).
    pub stale_products: Vec<(ProductKey, f64)>,
}

/// Batch-tracked storage; the sole owner of all batch lists.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InventoryLedger {
    ingredients: BTreeMap<IngredientKey, Vec<IngredientBatch>>,
    products: BTreeMap<ProductKey, Vec<ProductBatch>>,
    sold_today: BTreeMap<ProductKey, f64>,
    /// Ingredient batches at or below this quality are not usable stock.
    usable_floor: f64,
}

fn dec(value: f64) -> Result<Decimal, SimError> {
    Decimal::from_f64(value).ok_or(SimError::NonFinite)
}

fn weighted_quality<'a, I>(batches: I) -> f64
where
    I: IntoIterator<Item = (&'a f64, &'a f64)>,
{
    let mut total = 0.0;
    let mut weighted = 0.0;
    for (quantity, quality) in batches {
        total += quantity;
        weighted += quantity * quality;
    }
    if total <= 0.0 {
        100.0
    } else {
        weighted / total
    }
}

impl InventoryLedger {
    /// Empty ledger with the given usable-quality floor for ingredients.
    pub fn new(usable_floor: f64) -> Self {
        Self {
            ingredients: BTreeMap::new(),
            products: BTreeMap::new(),
            sold_today: BTreeMap::new(),
            usable_floor,
        }
    }

    /// Append a purchased batch; returns the new weighted average quality
    /// for the ingredient.
    pub fn add_ingredient_batch(
        &mut self,
        key: IngredientKey,
        quantity: f64,
        quality: f64,
        purchase_day: u32,
        vendor: VendorId,
        unit_cost: Decimal,
    ) -> f64 {
        let batches = self.ingredients.entry(key).or_default();
        batches.push(IngredientBatch {
            quantity,
            quality: quality.clamp(0.0, 100.0),
            purchase_day,
            vendor,
            unit_cost,
        });
        weighted_quality(batches.iter().map(|b| (&b.quantity, &b.quality)))
    }

    /// Deposit a finished product batch. Called by the production
    /// scheduler on final-stage completion; bake days arrive monotonic.
    pub fn add_product_batch(
        &mut self,
        key: ProductKey,
        quantity: f64,
        quality: f64,
        bake_day: u32,
        ingredient_quality: f64,
        unit_cost: Decimal,
    ) {
        self.products.entry(key).or_default().push(ProductBatch {
            quantity,
            quality: quality.clamp(0.0, 100.0),
            bake_day,
            ingredient_quality,
            unit_cost,
        });
    }

    /// Total quantity of an ingredient across batches.
    pub fn ingredient_stock(&self, key: &IngredientKey) -> f64 {
        self.ingredients
            .get(key)
            .map(|batches| batches.iter().map(|b| b.quantity).sum())
            .unwrap_or(0.0)
    }

    /// Quantity of an ingredient counting only usable batches.
    pub fn usable_ingredient_stock(&self, key: &IngredientKey) -> f64 {
        self.ingredients
            .get(key)
            .map(|batches| {
                batches
                    .iter()
                    .filter(|b| b.quality > self.usable_floor)
                    .map(|b| b.quantity)
                    .sum()
            })
            .unwrap_or(0.0)
    }

    /// Total quantity of a product across batches.
    pub fn product_stock(&self, key: &ProductKey) -> f64 {
        self.products
            .get(key)
            .map(|batches| batches.iter().map(|b| b.quantity).sum())
            .unwrap_or(0.0)
    }

    /// Weighted average ingredient quality; 100 when no stock exists.
    pub fn ingredient_quality(&self, key: &IngredientKey) -> f64 {
        weighted_quality(
            self.ingredients
                .get(key)
                .into_iter()
                .flatten()
                .map(|b| (&b.quantity, &b.quality)),
        )
    }

    /// Weighted average product quality; 100 when no stock exists.
    pub fn product_quality(&self, key: &ProductKey) -> f64 {
        weighted_quality(
            self.products
                .get(key)
                .into_iter()
                .flatten()
                .map(|b| (&b.quantity, &b.quality)),
        )
    }

    /// Products with positive stock, in key order.
    pub fn stocked_products(&self) -> Vec<ProductKey> {
        self.products
            .iter()
            .filter(|(_, batches)| batches.iter().map(|b| b.quantity).sum::<f64>() > 0.0)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Units of a product sold since the last daily reset.
    pub fn sold_today(&self, key: &ProductKey) -> f64 {
        self.sold_today.get(key).copied().unwrap_or(0.0)
    }

    /// Shortfalls against a requirement list, using usable stock only.
    /// Empty when everything is covered.
    pub fn missing_for(&self, requirements: &[(IngredientKey, f64)]) -> Vec<(IngredientKey, f64)> {
        requirements
            .iter()
            .filter_map(|(key, amount)| {
                let usable = self.usable_ingredient_stock(key);
                if usable + QUANTITY_EPSILON < *amount {
                    Some((key.clone(), amount - usable))
                } else {
                    None
                }
            })
            .collect()
    }

    /// All-or-nothing FIFO consumption. Verifies every requirement against
    /// usable stock before touching anything; on failure names the first
    /// short ingredient and leaves the ledger unchanged.
    pub fn consume(
        &mut self,
        requirements: &[(IngredientKey, f64)],
    ) -> Result<ConsumeOutcome, SimError> {
        for (key, amount) in requirements {
            if !(*amount > 0.0) || !amount.is_finite() {
                return Err(SimError::InvalidQuantity);
            }
            if self.usable_ingredient_stock(key) + QUANTITY_EPSILON < *amount {
                return Err(SimError::InsufficientStock(key.0.clone()));
            }
        }

        let mut consumed_total = 0.0;
        let mut consumed_weighted = 0.0;
        let mut total_cost = Decimal::ZERO;
        let usable_floor = self.usable_floor;

        for (key, amount) in requirements {
            let batches = self
                .ingredients
                .get_mut(key)
                .ok_or_else(|| SimError::InsufficientStock(key.0.clone()))?;
            let mut remaining = *amount;
            for batch in batches.iter_mut() {
                if remaining <= QUANTITY_EPSILON {
                    break;
                }
                if batch.quality <= usable_floor {
                    continue;
                }
                let take = remaining.min(batch.quantity);
                batch.quantity -= take;
                remaining -= take;
                consumed_total += take;
                consumed_weighted += take * batch.quality;
                total_cost += batch.unit_cost * dec(take)?;
            }
            batches.retain(|b| b.quantity > QUANTITY_EPSILON);
        }

        let avg_quality = if consumed_total <= 0.0 {
            100.0
        } else {
            consumed_weighted / consumed_total
        };
        Ok(ConsumeOutcome {
            avg_quality,
            total_cost: total_cost.round_dp(2),
        })
    }

    /// FIFO product sale at a quality-adjusted unit price. Each batch is
    /// priced through the quality ladder; batches under the sellable floor
    /// contribute zero revenue but still leave the shelf.
    pub fn sell(
        &mut self,
        key: &ProductKey,
        quantity: f64,
        list_price: Decimal,
    ) -> Result<SaleOutcome, SimError> {
        if !(quantity > 0.0) || !quantity.is_finite() {
            return Err(SimError::InvalidQuantity);
        }
        if self.product_stock(key) + QUANTITY_EPSILON < quantity {
            return Err(SimError::InsufficientStock(key.0.clone()));
        }

        let batches = self
            .products
            .get_mut(key)
            .ok_or_else(|| SimError::InsufficientStock(key.0.clone()))?;
        let mut remaining = quantity;
        let mut revenue = Decimal::ZERO;
        let mut cogs = Decimal::ZERO;
        let mut sold_weighted = 0.0;

        for batch in batches.iter_mut() {
            if remaining <= QUANTITY_EPSILON {
                break;
            }
            let take = remaining.min(batch.quantity);
            batch.quantity -= take;
            remaining -= take;
            sold_weighted += take * batch.quality;
            let ladder = quality_price_multiplier(batch.quality);
            revenue += list_price * dec(ladder * take)?;
            cogs += batch.unit_cost * dec(take)?;
        }
        batches.retain(|b| b.quantity > QUANTITY_EPSILON);

        *self.sold_today.entry(key.clone()).or_insert(0.0) += quantity;
        Ok(SaleOutcome {
            revenue: revenue.round_dp(2),
            cogs: cogs.round_dp(2),
            avg_quality: sold_weighted / quantity,
        })
    }

    /// Apply one day of decay: linear `decay_rate` for ingredients with
    /// spoiled (quality <= 0) batches removed and reported exactly once;
    /// multiplicative retention for products, with quantities now under
    /// `stale_threshold` flagged for discard.
    pub fn decay_day(&mut self, catalog: &Catalog, stale_threshold: f64) -> DecayReport {
        let mut report = DecayReport::default();

        for (key, batches) in self.ingredients.iter_mut() {
            let rate = catalog
                .ingredients
                .get(key)
                .map(|i| i.decay_rate)
                .unwrap_or(0.0);
            let mut spoiled = 0.0;
            for batch in batches.iter_mut() {
                batch.quality -= rate;
                if batch.quality <= 0.0 {
                    spoiled += batch.quantity;
                }
            }
            batches.retain(|b| b.quality > 0.0);
            if spoiled > 0.0 {
                tracing::debug!(target: "inventory", ingredient = %key, quantity = spoiled, "spoiled");
                report.spoiled_ingredients.push((key.clone(), spoiled));
            }
        }
        self.ingredients.retain(|_, batches| !batches.is_empty());

        for (key, batches) in self.products.iter_mut() {
            let mut stale = 0.0;
            for batch in batches.iter_mut() {
                batch.quality *= PRODUCT_DECAY_FACTOR;
                if batch.quality < stale_threshold {
                    stale += batch.quantity;
                }
            }
            if stale > 0.0 {
                report.stale_products.push((key.clone(), stale));
            }
        }

        report
    }

    /// Remove product batches past their age limit or under the quality
    /// threshold; returns discarded quantities per key.
    pub fn discard_spoiled(
        &mut self,
        current_day: u32,
        max_age_days: u32,
        quality_threshold: f64,
    ) -> Vec<(ProductKey, f64)> {
        let mut discarded = Vec::new();
        for (key, batches) in self.products.iter_mut() {
            let mut removed = 0.0;
            batches.retain(|batch| {
                let age = current_day.saturating_sub(batch.bake_day);
                if age > max_age_days || batch.quality < quality_threshold {
                    removed += batch.quantity;
                    false
                } else {
                    true
                }
            });
            if removed > 0.0 {
                tracing::debug!(target: "inventory", product = %key, quantity = removed, "discarded");
                discarded.push((key.clone(), removed));
            }
        }
        self.products.retain(|_, batches| !batches.is_empty());
        discarded
    }

    /// Clear per-day sale counters.
    pub fn reset_daily(&mut self) {
        self.sold_today.clear();
    }

    /// Ingredient batch lists as ordered pairs for snapshots.
    pub fn ingredient_pairs(&self) -> Vec<(IngredientKey, Vec<IngredientBatch>)> {
        self.ingredients
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Product batch lists as ordered pairs for snapshots.
    pub fn product_pairs(&self) -> Vec<(ProductKey, Vec<ProductBatch>)> {
        self.products
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Rebuild from snapshot pair lists.
    pub fn from_pairs(
        ingredients: Vec<(IngredientKey, Vec<IngredientBatch>)>,
        products: Vec<(ProductKey, Vec<ProductBatch>)>,
        usable_floor: f64,
    ) -> Self {
        Self {
            ingredients: ingredients.into_iter().collect(),
            products: products.into_iter().collect(),
            sold_today: BTreeMap::new(),
            usable_floor,
        }
    }
}
