#![deny(warnings)]

//! Core domain models and invariants for the bakery simulation.
//!
//! This crate defines the serializable types shared across the engine:
//! clock, catalog (ingredients, vendors, recipes, stages), customer and
//! staff records, and configuration, together with validation helpers
//! that guarantee basic invariants before a world is run.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod customer;
pub mod error;
pub mod staff;

pub use catalog::{
    Catalog, Ingredient, IngredientKey, ProductKey, Recipe, Stage, StageKind, SupplyCategory,
    Vendor, VendorId,
};
pub use clock::{season_for_day, Clock, Season, CLOSING_MINUTE, MINUTES_PER_DAY, OPENING_MINUTE};
pub use config::{ScenarioConfig, SimConfig, StaffSpec};
pub use customer::{Customer, CustomerId, CustomerSegment, LoyaltyTier, Personality, PurchaseRecord};
pub use error::{SimError, ValidationError};
pub use staff::{Employee, EmployeeId, StaffRoster};
