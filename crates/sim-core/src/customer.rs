//! Customer records and their pure update rules.
//!
//! Stochastic behavior (spawning, incident rolls, arrival timing) lives in
//! the runtime crate; everything here is deterministic arithmetic over one
//! record so the rules can be tested in isolation.

use crate::catalog::ProductKey;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Bounded history length for purchase and satisfaction logs.
const HISTORY_CAP: usize = 50;

/// Arena id for a customer; monotonically increasing, never reused.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CustomerId(pub u64);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "customer-{}", self.0)
    }
}

/// Spending-profile segment a customer belongs to.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum CustomerSegment {
    Budget,
    Mainstream,
    Premium,
    Foodie,
}

impl CustomerSegment {
    /// All segments, for exhaustive iteration.
    pub const ALL: [CustomerSegment; 4] = [
        CustomerSegment::Budget,
        CustomerSegment::Mainstream,
        CustomerSegment::Premium,
        CustomerSegment::Foodie,
    ];

    /// Baseline willingness-to-pay multiplier against the reference price.
    pub fn willingness_multiplier(self) -> f64 {
        match self {
            CustomerSegment::Budget => 0.7,
            CustomerSegment::Mainstream => 1.0,
            CustomerSegment::Premium => 1.5,
            CustomerSegment::Foodie => 1.8,
        }
    }

    /// Weight in the spawn distribution.
    pub fn spawn_weight(self) -> f64 {
        match self {
            CustomerSegment::Budget => 0.3,
            CustomerSegment::Mainstream => 0.4,
            CustomerSegment::Premium => 0.2,
            CustomerSegment::Foodie => 0.1,
        }
    }
}

/// Ordinal loyalty classification, recomputed after every update.
///
/// There is no ratchet: a tier can demote when satisfaction drops, which
/// rewards sustained quality rather than past performance.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum LoyaltyTier {
    New,
    Regular,
    Loyal,
    Vip,
}

impl LoyaltyTier {
    /// Evaluate the tier from current visit count and satisfaction.
    /// Thresholds are checked top-down; the most senior match wins. The
    /// Regular gate sits at 50 so a soured high-tier customer lands on
    /// Regular, not New; only sustained dissatisfaction below 50 strips
    /// the visit history of all weight.
    pub fn evaluate(visits: u32, satisfaction: f64) -> Self {
        if visits >= 20 && satisfaction >= 85.0 {
            LoyaltyTier::Vip
        } else if visits >= 10 && satisfaction >= 75.0 {
            LoyaltyTier::Loyal
        } else if visits >= 3 && satisfaction >= 50.0 {
            LoyaltyTier::Regular
        } else {
            LoyaltyTier::New
        }
    }
}

/// Personality axes, each in [0, 1].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    pub patience: f64,
    pub chattiness: f64,
    pub impulsiveness: f64,
    pub flexibility: f64,
    pub moodiness: f64,
}

/// One logged purchase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    /// Day of the purchase.
    pub day: u32,
    /// Product bought.
    pub product: ProductKey,
    /// Units bought.
    pub quantity: f64,
    /// Price paid in total.
    pub paid: Decimal,
    /// Delivered quality in [0, 100].
    pub quality: f64,
}

/// A simulated customer with path-dependent state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Customer {
    /// Stable arena id.
    pub id: CustomerId,
    /// Spending segment.
    pub segment: CustomerSegment,
    /// Personality vector.
    pub personality: Personality,
    /// Per-product preference weights in [0, 1].
    pub preferences: BTreeMap<ProductKey, f64>,
    /// Sensitivity to price, in [0.5, 1.5].
    pub price_elasticity: f64,
    /// How much delivered quality moves willingness, in [0.3, 0.9].
    pub quality_weight: f64,
    /// Current mood in [0, 100].
    pub mood: f64,
    /// Completed visits.
    pub visits: u32,
    /// Lifetime spend.
    pub total_spent: Decimal,
    /// Bounded purchase log, newest last.
    pub purchase_history: Vec<PurchaseRecord>,
    /// Bounded satisfaction samples, newest last.
    pub satisfaction_history: Vec<f64>,
    /// Running satisfaction in [0, 100].
    pub satisfaction: f64,
    /// Trust score in [0, 100]; lost faster than gained.
    pub trust: f64,
    /// Current loyalty tier.
    pub loyalty: LoyaltyTier,
    /// Modeled probability of returning, in [0, 1].
    pub return_probability: f64,
    /// Day of the most recent visit.
    pub last_visit_day: u32,
    /// Cleared after prolonged non-return; never hard-deleted.
    pub active: bool,
    /// Logged positive incident count.
    pub compliments: u32,
    /// Logged negative incident count.
    pub complaints: u32,
}

impl Customer {
    /// Blend a discrete event score into satisfaction: `0.7·old + 0.3·score`,
    /// clamped to [0, 100]. Used for purchase events.
    pub fn blend_satisfaction(&mut self, event_score: f64) {
        self.satisfaction = (self.satisfaction * 0.7 + event_score * 0.3).clamp(0.0, 100.0);
        self.push_satisfaction_sample();
        self.refresh_return_probability();
    }

    /// Incremental satisfaction update: clamped delta-add. Used for incidents
    /// and other small nudges.
    pub fn nudge_satisfaction(&mut self, delta: f64) {
        self.satisfaction = (self.satisfaction + delta).clamp(0.0, 100.0);
        self.push_satisfaction_sample();
        self.refresh_return_probability();
    }

    /// Asymmetric trust update: gains scaled ×0.5, losses scaled ×0.8.
    pub fn adjust_trust(&mut self, delta: f64) {
        let scaled = if delta >= 0.0 { delta * 0.5 } else { delta * 0.8 };
        self.trust = (self.trust + scaled).clamp(0.0, 100.0);
    }

    /// Recompute `return_probability` from satisfaction.
    pub fn refresh_return_probability(&mut self) {
        self.return_probability = 0.3 + 0.6 * (self.satisfaction / 100.0);
    }

    /// The complement of `return_probability`.
    pub fn churn_risk(&self) -> f64 {
        1.0 - self.return_probability
    }

    /// Recompute the loyalty tier from current state. May demote.
    pub fn refresh_loyalty(&mut self) {
        self.loyalty = LoyaltyTier::evaluate(self.visits, self.satisfaction);
    }

    /// Append a purchase to the bounded history and update aggregates.
    pub fn log_purchase(&mut self, record: PurchaseRecord) {
        self.visits += 1;
        self.total_spent += record.paid;
        self.last_visit_day = record.day;
        self.active = true;
        self.purchase_history.push(record);
        if self.purchase_history.len() > HISTORY_CAP {
            self.purchase_history.remove(0);
        }
    }

    fn push_satisfaction_sample(&mut self) {
        self.satisfaction_history.push(self.satisfaction);
        if self.satisfaction_history.len() > HISTORY_CAP {
            self.satisfaction_history.remove(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_customer() -> Customer {
        Customer {
            id: CustomerId(1),
            segment: CustomerSegment::Mainstream,
            personality: Personality {
                patience: 0.5,
                chattiness: 0.5,
                impulsiveness: 0.5,
                flexibility: 0.5,
                moodiness: 0.5,
            },
            preferences: BTreeMap::new(),
            price_elasticity: 1.0,
            quality_weight: 0.5,
            mood: 60.0,
            visits: 0,
            total_spent: Decimal::ZERO,
            purchase_history: Vec::new(),
            satisfaction_history: Vec::new(),
            satisfaction: 70.0,
            trust: 50.0,
            loyalty: LoyaltyTier::New,
            return_probability: 0.72,
            last_visit_day: 0,
            active: true,
            compliments: 0,
            complaints: 0,
        }
    }

    #[test]
    fn blend_moves_toward_event_score() {
        let mut c = sample_customer();
        c.blend_satisfaction(100.0);
        assert!((c.satisfaction - 79.0).abs() < 1e-9);
    }

    #[test]
    fn trust_asymmetry() {
        let mut c = sample_customer();
        c.adjust_trust(10.0);
        assert!((c.trust - 55.0).abs() < 1e-9);
        c.adjust_trust(-10.0);
        assert!((c.trust - 47.0).abs() < 1e-9);
    }

    #[test]
    fn return_probability_formula() {
        let mut c = sample_customer();
        c.satisfaction = 100.0;
        c.refresh_return_probability();
        assert!((c.return_probability - 0.9).abs() < 1e-9);
        assert!((c.churn_risk() - 0.1).abs() < 1e-9);
        c.satisfaction = 0.0;
        c.refresh_return_probability();
        assert!((c.return_probability - 0.3).abs() < 1e-9);
    }

    #[test]
    fn vip_demotes_without_hysteresis() {
        let mut c = sample_customer();
        c.visits = 25;
        c.satisfaction = 90.0;
        c.refresh_loyalty();
        assert_eq!(c.loyalty, LoyaltyTier::Vip);
        c.satisfaction = 60.0;
        c.refresh_loyalty();
        assert_eq!(c.loyalty, LoyaltyTier::Regular);
    }

    #[test]
    fn tier_thresholds_top_down() {
        assert_eq!(LoyaltyTier::evaluate(20, 85.0), LoyaltyTier::Vip);
        assert_eq!(LoyaltyTier::evaluate(20, 80.0), LoyaltyTier::Loyal);
        assert_eq!(LoyaltyTier::evaluate(10, 75.0), LoyaltyTier::Loyal);
        assert_eq!(LoyaltyTier::evaluate(3, 65.0), LoyaltyTier::Regular);
        assert_eq!(LoyaltyTier::evaluate(25, 60.0), LoyaltyTier::Regular);
        assert_eq!(LoyaltyTier::evaluate(25, 49.0), LoyaltyTier::New);
        assert_eq!(LoyaltyTier::evaluate(2, 99.0), LoyaltyTier::New);
        assert_eq!(LoyaltyTier::evaluate(100, 10.0), LoyaltyTier::New);
    }

    #[test]
    fn history_is_bounded() {
        let mut c = sample_customer();
        for day in 0..200 {
            c.log_purchase(PurchaseRecord {
                day,
                product: ProductKey::new("bread"),
                quantity: 1.0,
                paid: Decimal::ONE,
                quality: 80.0,
            });
        }
        assert_eq!(c.purchase_history.len(), HISTORY_CAP);
        assert_eq!(c.visits, 200);
    }

    proptest! {
        #[test]
        fn satisfaction_stays_clamped(start in 0.0f64..100.0, score in -500.0f64..500.0) {
            let mut c = sample_customer();
            c.satisfaction = start;
            c.blend_satisfaction(score);
            prop_assert!((0.0..=100.0).contains(&c.satisfaction));
            c.nudge_satisfaction(score);
            prop_assert!((0.0..=100.0).contains(&c.satisfaction));
        }

        #[test]
        fn trust_stays_clamped(start in 0.0f64..100.0, delta in -500.0f64..500.0) {
            let mut c = sample_customer();
            c.trust = start;
            c.adjust_trust(delta);
            prop_assert!((0.0..=100.0).contains(&c.trust));
        }
    }
}
