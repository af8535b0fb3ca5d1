//! Error taxonomy for the simulation.
//!
//! Business conditions (short stock, short cash, full oven queue) are
//! ordinary gameplay outcomes and travel as `Err` values; only corrupted
//! catalogs or persisted state escalate through `ValidationError`.

use rust_decimal::Decimal;
use thiserror::Error;

/// Expected business failures returned by engine operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// A purchase or charge exceeds available cash.
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds {
        /// Amount the operation required.
        needed: Decimal,
        /// Cash on hand at the time of the attempt.
        available: Decimal,
    },
    /// A consume or sale exceeds usable stock; names the first short resource.
    #[error("insufficient stock of {0}")]
    InsufficientStock(String),
    /// Production queue is full, or an oven is required at start and none is free.
    #[error("production capacity exceeded")]
    CapacityExceeded,
    /// Quantities must be strictly positive and finite.
    #[error("quantity must be positive and finite")]
    InvalidQuantity,
    /// Unknown recipe, ingredient, vendor, customer, or production item.
    #[error("not found: {0}")]
    NotFound(String),
    /// A numeric conversion produced a non-finite value.
    #[error("non-finite numeric value encountered")]
    NonFinite,
}

/// Validation errors for catalog and configuration invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Quality values live in [0, 100].
    #[error("quality must be within [0,100]")]
    InvalidQuality,
    /// Prices and costs must be non-negative.
    #[error("negative monetary value is invalid")]
    NegativeMoney,
    /// Durations and rates must be strictly positive.
    #[error("duration or rate must be > 0")]
    NonPositiveDuration,
    /// A recipe references an ingredient missing from the catalog.
    #[error("unknown ingredient in recipe: {0}")]
    UnknownIngredient(String),
    /// Names and keys must be non-empty.
    #[error("empty name or key")]
    EmptyName,
    /// Duplicate key in a catalog table.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
}
