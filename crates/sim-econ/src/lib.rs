#![deny(warnings)]

//! Market simulator: the daily stochastic process behind ingredient prices
//! and customer willingness.
//!
//! State advances once per simulated day via bounded random walks over
//! inflation trend and rate, per-category supply levels with seasonal
//! bias, and per-ingredient price trends, plus a small catalog of
//! time-limited market events. Prices derive from that state through a
//! fixed linear form: abundance (`supply > 1`) lowers price, scarcity
//! raises it, never an inverse curve.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{
    season_for_day, Catalog, Ingredient, IngredientKey, Season, SupplyCategory, Vendor,
};
use std::collections::BTreeMap;
use thiserror::Error;

/// Daily inflation-trend step bound.
const INFLATION_TREND_STEP: f64 = 0.001;
/// Inflation trend clamp.
const INFLATION_TREND_RANGE: (f64, f64) = (-0.01, 0.01);
/// Annualized inflation rate clamp.
const INFLATION_RATE_RANGE: (f64, f64) = (-0.05, 0.15);
/// Daily supply-level step bound.
const SUPPLY_STEP: f64 = 0.05;
/// Supply level clamp.
const SUPPLY_RANGE: (f64, f64) = (0.5, 1.5);
/// Daily ingredient-trend step bound.
const TREND_STEP: f64 = 0.025;
/// Ingredient trend clamp.
const TREND_RANGE: (f64, f64) = (0.7, 1.4);
/// Daily probability of a new market event while below the cap.
const EVENT_SPAWN_PROB: f64 = 0.08;
/// Maximum concurrent market events.
const MAX_ACTIVE_EVENTS: usize = 3;

/// Errors produced by pricing helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// A numeric conversion to `Decimal` produced a non-finite value.
    #[error("non-finite numeric conversion")]
    NonFinite,
}

/// A time-limited market disturbance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketEvent {
    /// Human-readable name.
    pub name: String,
    /// Remaining days; evicted at zero.
    pub days_remaining: u32,
    /// Price multipliers applied to affected categories.
    pub category_multipliers: Vec<(SupplyCategory, f64)>,
    /// Multiplier on customer willingness-to-pay while active.
    pub willingness_multiplier: f64,
}

/// Serializable market state; the RNG stream lives outside it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    /// Annualized inflation rate, clamped to [-0.05, 0.15].
    pub inflation_rate: f64,
    /// Daily drift of the rate, clamped to [-0.01, 0.01].
    pub inflation_trend: f64,
    /// Cumulative multiplier; compounds `rate / 365` each day.
    pub inflation_index: f64,
    /// Supply level per category, clamped to [0.5, 1.5].
    pub supply_levels: BTreeMap<SupplyCategory, f64>,
    /// Per-ingredient price trend, clamped to [0.7, 1.4].
    pub ingredient_trends: BTreeMap<IngredientKey, f64>,
    /// Active events, newest last.
    pub active_events: Vec<MarketEvent>,
}

impl MarketState {
    /// Neutral state: everything at 1.0, a mild opening inflation rate.
    pub fn neutral(catalog: &Catalog) -> Self {
        Self {
            inflation_rate: 0.03,
            inflation_trend: 0.0,
            inflation_index: 1.0,
            supply_levels: SupplyCategory::ALL.iter().map(|c| (*c, 1.0)).collect(),
            ingredient_trends: catalog
                .ingredients
                .keys()
                .map(|k| (k.clone(), 1.0))
                .collect(),
            active_events: Vec::new(),
        }
    }
}

/// The market simulator: serializable state plus a seeded RNG stream.
#[derive(Clone, Debug)]
pub struct Market {
    state: MarketState,
    rng: ChaCha8Rng,
}

impl Market {
    /// Neutral market with a seeded RNG stream.
    pub fn new(catalog: &Catalog, seed: u64) -> Self {
        Self {
            state: MarketState::neutral(catalog),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Rebuild from a snapshot state; the RNG stream restarts from `seed`.
    pub fn from_state(state: MarketState, seed: u64) -> Self {
        Self {
            state,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Read-only view of the current state.
    pub fn state(&self) -> &MarketState {
        &self.state
    }

    /// Advance the stochastic state by one day.
    pub fn daily_step(&mut self, day: u32) {
        let state = &mut self.state;

        let trend_step = self
            .rng
            .gen_range(-INFLATION_TREND_STEP..=INFLATION_TREND_STEP);
        state.inflation_trend = (state.inflation_trend + trend_step)
            .clamp(INFLATION_TREND_RANGE.0, INFLATION_TREND_RANGE.1);
        state.inflation_rate = (state.inflation_rate + state.inflation_trend)
            .clamp(INFLATION_RATE_RANGE.0, INFLATION_RATE_RANGE.1);
        state.inflation_index *= 1.0 + state.inflation_rate / 365.0;

        let season = season_for_day(day);
        for category in SupplyCategory::ALL {
            let level = state.supply_levels.entry(category).or_insert(1.0);
            let step = self.rng.gen_range(-SUPPLY_STEP..=SUPPLY_STEP);
            *level = (*level + step + seasonal_bias(category, season))
                .clamp(SUPPLY_RANGE.0, SUPPLY_RANGE.1);
        }

        for trend in state.ingredient_trends.values_mut() {
            let step = self.rng.gen_range(-TREND_STEP..=TREND_STEP);
            *trend = (*trend + step).clamp(TREND_RANGE.0, TREND_RANGE.1);
        }

        for event in &mut state.active_events {
            event.days_remaining = event.days_remaining.saturating_sub(1);
        }
        let before = state.active_events.len();
        state.active_events.retain(|e| e.days_remaining > 0);
        if before != state.active_events.len() {
            tracing::debug!(target: "market", day, remaining = state.active_events.len(), "events expired");
        }

        if state.active_events.len() < MAX_ACTIVE_EVENTS
            && self.rng.gen_bool(EVENT_SPAWN_PROB)
        {
            let templates = event_templates();
            let pick = self.rng.gen_range(0..templates.len());
            let event = templates[pick].clone();
            tracing::info!(target: "market", day, event = %event.name, days = event.days_remaining, "market event begins");
            state.active_events.push(event);
        }
    }

    /// Market price for an ingredient, rounded to cents:
    /// `base × inflation_index × (2 − supply) × trend × Π event multipliers`.
    pub fn price(&self, ingredient: &Ingredient) -> Result<Decimal, EconError> {
        let supply = self
            .state
            .supply_levels
            .get(&ingredient.category)
            .copied()
            .unwrap_or(1.0);
        let trend = self
            .state
            .ingredient_trends
            .get(&ingredient.key)
            .copied()
            .unwrap_or(1.0);
        let event_factor: f64 = self
            .state
            .active_events
            .iter()
            .flat_map(|e| e.category_multipliers.iter())
            .filter(|(category, _)| *category == ingredient.category)
            .map(|(_, multiplier)| multiplier)
            .product();

        let factor = self.state.inflation_index * (2.0 - supply) * trend * event_factor;
        if !factor.is_finite() {
            return Err(EconError::NonFinite);
        }
        let factor = Decimal::from_f64(factor).ok_or(EconError::NonFinite)?;
        Ok((ingredient.base_price * factor).round_dp(2))
    }

    /// Vendor quote: the market price scaled by the vendor's premium or
    /// discount, rounded to cents.
    pub fn vendor_quote(&self, ingredient: &Ingredient, vendor: &Vendor) -> Result<Decimal, EconError> {
        let quote = self.price(ingredient)?;
        let multiplier =
            Decimal::from_f64(vendor.price_multiplier).ok_or(EconError::NonFinite)?;
        Ok((quote * multiplier).round_dp(2))
    }

    /// Combined willingness-to-pay multiplier from active events.
    pub fn willingness_multiplier(&self) -> f64 {
        self.state
            .active_events
            .iter()
            .map(|e| e.willingness_multiplier)
            .product()
    }
}

/// Deterministic seasonal pressure on a category's supply walk.
pub fn seasonal_bias(category: SupplyCategory, season: Season) -> f64 {
    match (category, season) {
        (SupplyCategory::Produce, Season::Summer) => 0.05,
        (SupplyCategory::Produce, Season::Winter) => -0.05,
        (SupplyCategory::Grains, Season::Autumn) => 0.03,
        (SupplyCategory::Dairy, Season::Summer) => -0.02,
        _ => 0.0,
    }
}

/// Quality price ladder for product sales: full list price only above 85,
/// stepped discounts below, unsellable under 30.
pub fn quality_price_multiplier(quality: f64) -> f64 {
    if quality >= 85.0 {
        1.0
    } else if quality >= 70.0 {
        0.9
    } else if quality >= 50.0 {
        0.75
    } else if quality >= 30.0 {
        0.5
    } else {
        0.0
    }
}

/// The fixed catalog of market disturbances the daily step can draw from.
fn event_templates() -> Vec<MarketEvent> {
    vec![
        MarketEvent {
            name: "Flour shortage".to_string(),
            days_remaining: 5,
            category_multipliers: vec![(SupplyCategory::Grains, 1.35)],
            willingness_multiplier: 1.0,
        },
        MarketEvent {
            name: "Harvest glut".to_string(),
            days_remaining: 4,
            category_multipliers: vec![(SupplyCategory::Produce, 0.75)],
            willingness_multiplier: 1.0,
        },
        MarketEvent {
            name: "Dairy surplus".to_string(),
            days_remaining: 4,
            category_multipliers: vec![(SupplyCategory::Dairy, 0.8)],
            willingness_multiplier: 1.0,
        },
        MarketEvent {
            name: "Food festival".to_string(),
            days_remaining: 3,
            category_multipliers: Vec::new(),
            willingness_multiplier: 1.25,
        },
        MarketEvent {
            name: "Local recession".to_string(),
            days_remaining: 6,
            category_multipliers: Vec::new(),
            willingness_multiplier: 0.85,
        },
        MarketEvent {
            name: "Cocoa squeeze".to_string(),
            days_remaining: 7,
            category_multipliers: vec![(SupplyCategory::Specialty, 1.4)],
            willingness_multiplier: 1.0,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::VendorId;

    fn flour(catalog: &Catalog) -> &Ingredient {
        &catalog.ingredients[&IngredientKey::new("flour")]
    }

    #[test]
    fn neutral_market_prices_at_base() {
        let catalog = Catalog::standard();
        let market = Market::new(&catalog, 1);
        let price = market.price(flour(&catalog)).unwrap();
        assert_eq!(price, flour(&catalog).base_price);
    }

    #[test]
    fn supply_moves_price_linearly() {
        let catalog = Catalog::standard();
        let mut market = Market::new(&catalog, 1);
        market
            .state
            .supply_levels
            .insert(SupplyCategory::Grains, 1.5);
        let abundant = market.price(flour(&catalog)).unwrap();
        market
            .state
            .supply_levels
            .insert(SupplyCategory::Grains, 0.5);
        let scarce = market.price(flour(&catalog)).unwrap();
        // (2 - 1.5) = 0.5x vs (2 - 0.5) = 1.5x: exactly 3x apart.
        assert_eq!(scarce, abundant * Decimal::from(3));
    }

    #[test]
    fn event_multiplier_applies_to_matching_category_only() {
        let catalog = Catalog::standard();
        let mut market = Market::new(&catalog, 1);
        market.state.active_events.push(MarketEvent {
            name: "Flour shortage".to_string(),
            days_remaining: 5,
            category_multipliers: vec![(SupplyCategory::Grains, 1.35)],
            willingness_multiplier: 1.0,
        });
        let flour_price = market.price(flour(&catalog)).unwrap();
        let expected = (flour(&catalog).base_price * Decimal::new(135, 2)).round_dp(2);
        assert_eq!(flour_price, expected);

        let butter = &catalog.ingredients[&IngredientKey::new("butter")];
        assert_eq!(market.price(butter).unwrap(), butter.base_price);
    }

    #[test]
    fn events_expire_and_are_evicted() {
        let catalog = Catalog::standard();
        let mut market = Market::new(&catalog, 1);
        market.state.active_events.push(MarketEvent {
            name: "Food festival".to_string(),
            days_remaining: 2,
            category_multipliers: Vec::new(),
            willingness_multiplier: 1.25,
        });
        market.daily_step(1);
        assert!(market
            .state()
            .active_events
            .iter()
            .any(|e| e.name == "Food festival" && e.days_remaining == 1));
        market.daily_step(2);
        // The expired event is gone; anything left was freshly spawned.
        assert!(market
            .state()
            .active_events
            .iter()
            .all(|e| e.days_remaining > 0));
        assert!(!market
            .state()
            .active_events
            .iter()
            .any(|e| e.name == "Food festival" && e.days_remaining == 1));
    }

    #[test]
    fn vendor_quote_scales_price() {
        let catalog = Catalog::standard();
        let market = Market::new(&catalog, 1);
        let vendor = &catalog.vendors[&VendorId::new("artisan-farms")];
        let quote = market.vendor_quote(flour(&catalog), vendor).unwrap();
        let expected = (flour(&catalog).base_price * Decimal::new(13, 1)).round_dp(2);
        assert_eq!(quote, expected);
    }

    #[test]
    fn quality_ladder_thresholds() {
        assert_eq!(quality_price_multiplier(100.0), 1.0);
        assert_eq!(quality_price_multiplier(85.0), 1.0);
        assert_eq!(quality_price_multiplier(84.9), 0.9);
        assert_eq!(quality_price_multiplier(70.0), 0.9);
        assert_eq!(quality_price_multiplier(50.0), 0.75);
        assert_eq!(quality_price_multiplier(30.0), 0.5);
        assert_eq!(quality_price_multiplier(29.9), 0.0);
    }

    #[test]
    fn same_seed_same_walk() {
        let catalog = Catalog::standard();
        let mut a = Market::new(&catalog, 99);
        let mut b = Market::new(&catalog, 99);
        for day in 1..=30 {
            a.daily_step(day);
            b.daily_step(day);
        }
        assert_eq!(a.state(), b.state());
    }

    proptest! {
        #[test]
        fn walks_respect_clamps(seed in 0u64..5000) {
            let catalog = Catalog::standard();
            let mut market = Market::new(&catalog, seed);
            for day in 1..=120 {
                market.daily_step(day);
            }
            let state = market.state();
            prop_assert!((INFLATION_TREND_RANGE.0..=INFLATION_TREND_RANGE.1)
                .contains(&state.inflation_trend));
            prop_assert!((INFLATION_RATE_RANGE.0..=INFLATION_RATE_RANGE.1)
                .contains(&state.inflation_rate));
            for level in state.supply_levels.values() {
                prop_assert!((SUPPLY_RANGE.0..=SUPPLY_RANGE.1).contains(level));
            }
            for trend in state.ingredient_trends.values() {
                prop_assert!((TREND_RANGE.0..=TREND_RANGE.1).contains(trend));
            }
            prop_assert!(state.active_events.len() <= MAX_ACTIVE_EVENTS);
        }

        #[test]
        fn price_strictly_decreases_in_supply(low in 0.5f64..0.99, gap in 0.01f64..0.5) {
            let catalog = Catalog::standard();
            let mut market = Market::new(&catalog, 7);
            let high = (low + gap).min(1.5);
            market.state.supply_levels.insert(SupplyCategory::Grains, low);
            let scarce = market.price(flour(&catalog)).unwrap();
            market.state.supply_levels.insert(SupplyCategory::Grains, high);
            let abundant = market.price(flour(&catalog)).unwrap();
            prop_assert!(scarce > abundant);
        }
    }
}
