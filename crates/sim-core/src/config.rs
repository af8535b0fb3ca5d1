//! Simulation configuration and scenario files.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Tunable parameters for one simulation run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for all deterministic RNG streams.
    pub rng_seed: u64,
    /// Opening cash balance.
    pub starting_cash: Decimal,
    /// Concurrent oven slots; gates the baking stage.
    pub oven_capacity: u32,
    /// Maximum in-flight production items.
    pub max_queue_items: usize,
    /// Global production speed multiplier.
    pub speed_multiplier: f64,
    /// Ingredient batches at or below this quality do not count as usable
    /// stock for consumption.
    pub ingredient_usable_floor: f64,
    /// Product batches under this quality are flagged stale and discarded.
    pub product_stale_threshold: f64,
    /// Product batches older than this many days are discarded.
    pub product_max_age_days: u32,
    /// Rent, utilities, and sundries charged at each day close.
    pub daily_overhead: Decimal,
    /// Chance an arriving customer is new rather than a returning one.
    pub new_customer_share: f64,
    /// Days without a visit before a customer is marked inactive.
    pub inactivity_days: u32,
    /// Staff hired when the simulation starts.
    pub starting_staff: Vec<StaffSpec>,
}

/// One pre-hired employee in a scenario.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StaffSpec {
    /// Display name.
    pub name: String,
    /// Skill level in [0, 100].
    pub skill: f64,
    /// Wage charged per day.
    pub daily_wage: Decimal,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rng_seed: 42,
            starting_cash: Decimal::new(50_000_00, 2),
            oven_capacity: 2,
            max_queue_items: 12,
            speed_multiplier: 1.0,
            ingredient_usable_floor: 15.0,
            product_stale_threshold: 35.0,
            product_max_age_days: 3,
            daily_overhead: Decimal::new(180_00, 2),
            new_customer_share: 0.4,
            inactivity_days: 14,
            starting_staff: vec![
                StaffSpec {
                    name: "Head baker".to_string(),
                    skill: 68.0,
                    daily_wage: Decimal::new(140_00, 2),
                },
                StaffSpec {
                    name: "Apprentice".to_string(),
                    skill: 42.0,
                    daily_wage: Decimal::new(95_00, 2),
                },
            ],
        }
    }
}

/// A YAML-loadable run description for the headless CLI.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Days to simulate.
    pub days: u32,
    /// Engine configuration.
    pub sim: SimConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            days: 14,
            sim: SimConfig::default(),
        }
    }
}
