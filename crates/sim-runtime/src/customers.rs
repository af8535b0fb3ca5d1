//! Customer population: spawning, purchase decisions, incidents, and the
//! daily refresh.
//!
//! The pure per-customer arithmetic lives in `sim_core::customer`; this
//! module owns the arena and everything that needs randomness. All rolls
//! draw from the caller's RNG so a seeded run replays exactly.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use sim_core::{
    Catalog, Customer, CustomerId, CustomerSegment, LoyaltyTier, Personality, ProductKey,
    PurchaseRecord, Recipe,
};
use std::collections::BTreeMap;

/// Satisfaction score a purchase contributes, derived from delivered quality.
fn purchase_event_score(quality: f64) -> f64 {
    quality.clamp(0.0, 100.0)
}

/// A behavioral incident rolled after a purchase.
#[derive(Clone, Debug, PartialEq)]
pub enum Incident {
    /// Delivered quality was poor; satisfaction and trust take a hit.
    QualityComplaint,
    /// Price-sensitive customer grumbles about the bill.
    PriceComplaint,
    /// Inflexible customer worries about ingredients; trust dips.
    AllergyConcern,
    /// A great interaction; satisfaction and trust rise.
    ExceptionalService,
    /// Delighted customer spreads the word; future arrivals get a nudge.
    ViralMoment,
    /// Chatty customer asks for a custom add-on, paying extra.
    SpecialRequest { extra_revenue: Decimal },
}

/// Outcome of the post-purchase incident roll.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IncidentOutcome {
    /// Incidents that fired, in roll order.
    pub incidents: Vec<Incident>,
    /// Additional revenue from special requests.
    pub extra_revenue: Decimal,
    /// Extra walk-in arrivals earned for tomorrow (viral moments).
    pub bonus_arrivals: u32,
}

/// Arena of customers keyed by id. Ids are never reused; departed
/// customers are deactivated, not removed.
#[derive(Clone, Debug, Default)]
pub struct CustomerBook {
    customers: BTreeMap<CustomerId, Customer>,
    next_id: u64,
}

impl CustomerBook {
    /// Empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of customers ever spawned.
    pub fn len(&self) -> usize {
        self.customers.len()
    }

    /// True when no customer has been spawned yet.
    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }

    /// Look up a customer.
    pub fn get(&self, id: CustomerId) -> Option<&Customer> {
        self.customers.get(&id)
    }

    /// Mutable lookup.
    pub fn get_mut(&mut self, id: CustomerId) -> Option<&mut Customer> {
        self.customers.get_mut(&id)
    }

    /// Iterate all customers in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Customer> {
        self.customers.values()
    }

    /// Active customers only.
    pub fn active(&self) -> impl Iterator<Item = &Customer> {
        self.customers.values().filter(|c| c.active)
    }

    /// Spawn a new customer with randomized personality, preferences, and
    /// sensitivities. The segment is drawn from the weighted distribution
    /// unless the caller pins one.
    pub fn spawn(
        &mut self,
        catalog: &Catalog,
        day: u32,
        segment: Option<CustomerSegment>,
        rng: &mut ChaCha8Rng,
    ) -> CustomerId {
        self.next_id += 1;
        let id = CustomerId(self.next_id);
        let segment = segment.unwrap_or_else(|| draw_segment(rng));
        let personality = Personality {
            patience: rng.gen_range(0.0..=1.0),
            chattiness: rng.gen_range(0.0..=1.0),
            impulsiveness: rng.gen_range(0.0..=1.0),
            flexibility: rng.gen_range(0.0..=1.0),
            moodiness: rng.gen_range(0.0..=1.0),
        };
        let mut preferences = BTreeMap::new();
        for key in catalog.recipes.keys() {
            preferences.insert(key.clone(), rng.gen_range(0.0..=1.0));
        }
        let customer = Customer {
            id,
            segment,
            personality,
            preferences,
            price_elasticity: rng.gen_range(0.5..=1.5),
            quality_weight: rng.gen_range(0.3..=0.9),
            mood: rng.gen_range(40.0..=80.0),
            visits: 0,
            total_spent: Decimal::ZERO,
            purchase_history: Vec::new(),
            satisfaction_history: Vec::new(),
            satisfaction: 70.0,
            trust: 50.0,
            loyalty: LoyaltyTier::New,
            return_probability: 0.72,
            last_visit_day: day,
            active: true,
            compliments: 0,
            complaints: 0,
        };
        tracing::debug!(target: "customers", customer = %id, ?segment, "customer spawned");
        self.customers.insert(id, customer);
        id
    }

    /// Whether the customer would buy `recipe` at `asking_price` given the
    /// delivered quality on the shelf. Pure threshold check; the stochastic
    /// part is which customer shows up, not what they decide.
    pub fn purchase_decision(
        customer: &Customer,
        recipe: &Recipe,
        asking_price: Decimal,
        shelf_quality: f64,
        willingness_multiplier: f64,
    ) -> bool {
        let reference = decimal_to_f64(recipe.list_price);
        let quality_term = 0.8 + 0.4 * (shelf_quality / 100.0) * customer.quality_weight;
        let max_willing = reference
            * customer.segment.willingness_multiplier()
            * quality_term
            * willingness_multiplier;
        decimal_to_f64(asking_price) <= max_willing.max(0.0)
    }

    /// Record a completed sale: history, satisfaction blend from quality,
    /// asymmetric trust shift, and a loyalty re-evaluation.
    pub fn record_purchase(
        &mut self,
        id: CustomerId,
        day: u32,
        product: &ProductKey,
        quantity: f64,
        paid: Decimal,
        quality: f64,
    ) {
        let Some(customer) = self.customers.get_mut(&id) else {
            return;
        };
        customer.log_purchase(PurchaseRecord {
            day,
            product: product.clone(),
            quantity,
            paid,
            quality,
        });
        customer.blend_satisfaction(purchase_event_score(quality));
        customer.adjust_trust((quality - 70.0) / 5.0);
        customer.refresh_loyalty();
    }

    /// Roll the incident table for a purchase. Each incident has a gate on
    /// customer state and an independent probability; several can fire on
    /// the same visit.
    pub fn roll_incidents(
        &mut self,
        id: CustomerId,
        quality: f64,
        paid: Decimal,
        rng: &mut ChaCha8Rng,
    ) -> IncidentOutcome {
        let mut outcome = IncidentOutcome::default();
        let Some(customer) = self.customers.get_mut(&id) else {
            return outcome;
        };

        if quality < 60.0 && rng.gen_bool(0.25) {
            customer.nudge_satisfaction(-8.0);
            customer.adjust_trust(-5.0);
            customer.complaints += 1;
            outcome.incidents.push(Incident::QualityComplaint);
        }
        if customer.price_elasticity > 1.0 && rng.gen_bool(0.2) {
            customer.nudge_satisfaction(-4.0);
            customer.complaints += 1;
            outcome.incidents.push(Incident::PriceComplaint);
        }
        if customer.personality.flexibility < 0.3 && rng.gen_bool(0.05) {
            customer.adjust_trust(-3.0);
            customer.complaints += 1;
            outcome.incidents.push(Incident::AllergyConcern);
        }
        if customer.mood > 70.0 && rng.gen_bool(0.1) {
            customer.nudge_satisfaction(6.0);
            customer.adjust_trust(4.0);
            customer.compliments += 1;
            outcome.incidents.push(Incident::ExceptionalService);
        }
        if customer.satisfaction > 85.0 && rng.gen_bool(0.02) {
            customer.compliments += 1;
            outcome.bonus_arrivals += 2;
            outcome.incidents.push(Incident::ViralMoment);
        }
        if customer.personality.chattiness > 0.7 && rng.gen_bool(0.08) {
            let extra = (paid * Decimal::new(25, 2)).round_dp(2);
            outcome.extra_revenue += extra;
            outcome
                .incidents
                .push(Incident::SpecialRequest { extra_revenue: extra });
        }

        if !outcome.incidents.is_empty() {
            tracing::debug!(
                target: "customers",
                customer = %id,
                count = outcome.incidents.len(),
                "incidents rolled"
            );
        }
        outcome
    }

    /// End-of-day pass: mood drifts scaled by moodiness, return
    /// probabilities refresh, and customers silent past the inactivity
    /// window are deactivated (never deleted).
    pub fn daily_refresh(&mut self, day: u32, inactivity_days: u32, rng: &mut ChaCha8Rng) {
        let mut deactivated = 0u32;
        for customer in self.customers.values_mut() {
            let drift = rng.gen_range(-5.0..=5.0) * customer.personality.moodiness;
            customer.mood = (customer.mood + drift).clamp(0.0, 100.0);
            customer.refresh_return_probability();
            if customer.active && day.saturating_sub(customer.last_visit_day) > inactivity_days {
                customer.active = false;
                deactivated += 1;
            }
        }
        if deactivated > 0 {
            tracing::debug!(target: "customers", deactivated, day, "customers went inactive");
        }
    }

    /// Pick a returning active customer weighted by return probability, if
    /// the book has any.
    pub fn pick_returning(&self, rng: &mut ChaCha8Rng) -> Option<CustomerId> {
        let candidates: Vec<(&CustomerId, f64)> = self
            .customers
            .iter()
            .filter(|(_, c)| c.active && c.visits > 0)
            .map(|(id, c)| (id, c.return_probability))
            .collect();
        let total: f64 = candidates.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return None;
        }
        let mut roll = rng.gen_range(0.0..total);
        for (id, weight) in &candidates {
            roll -= weight;
            if roll <= 0.0 {
                return Some(**id);
            }
        }
        candidates.last().map(|(id, _)| **id)
    }

    /// Export for snapshots.
    pub fn to_pairs(&self) -> Vec<(CustomerId, Customer)> {
        self.customers
            .iter()
            .map(|(id, c)| (*id, c.clone()))
            .collect()
    }

    /// Rebuild from a snapshot.
    pub fn from_pairs(pairs: Vec<(CustomerId, Customer)>) -> Self {
        let next_id = pairs.iter().map(|(id, _)| id.0).max().unwrap_or(0);
        Self {
            customers: pairs.into_iter().collect(),
            next_id,
        }
    }
}

/// Cumulative-weight draw over the segment distribution.
fn draw_segment(rng: &mut ChaCha8Rng) -> CustomerSegment {
    let total: f64 = CustomerSegment::ALL.iter().map(|s| s.spawn_weight()).sum();
    let mut roll = rng.gen_range(0.0..total);
    for segment in CustomerSegment::ALL {
        roll -= segment.spawn_weight();
        if roll <= 0.0 {
            return segment;
        }
    }
    CustomerSegment::Mainstream
}

fn decimal_to_f64(value: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    value.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use sim_core::Catalog;

    fn rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    #[test]
    fn spawn_fills_preferences_for_every_product() {
        let catalog = Catalog::standard();
        let mut book = CustomerBook::new();
        let mut rng = rng(7);
        let id = book.spawn(&catalog, 1, None, &mut rng);
        let customer = book.get(id).unwrap();
        assert_eq!(customer.preferences.len(), catalog.recipes.len());
        assert!((0.5..=1.5).contains(&customer.price_elasticity));
        assert!((0.3..=0.9).contains(&customer.quality_weight));
        assert_eq!(customer.loyalty, LoyaltyTier::New);
    }

    #[test]
    fn segment_draw_covers_all_segments() {
        let mut rng = rng(11);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..500 {
            seen.insert(format!("{:?}", draw_segment(&mut rng)));
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn budget_customers_balk_where_foodies_buy() {
        let catalog = Catalog::standard();
        let mut book = CustomerBook::new();
        let mut rng = rng(3);
        let id = book.spawn(&catalog, 1, None, &mut rng);
        let recipe = &catalog.recipes[&ProductKey::new("chocolate-cake")];

        let mut budget = book.get(id).unwrap().clone();
        budget.segment = CustomerSegment::Budget;
        budget.price_elasticity = 1.0;
        let mut foodie = budget.clone();
        foodie.segment = CustomerSegment::Foodie;

        // Asking 30% over list: inside a foodie's ceiling, outside a
        // budget shopper's.
        let asking = recipe.list_price * Decimal::new(130, 2);
        assert!(!CustomerBook::purchase_decision(
            &budget, recipe, asking, 90.0, 1.0
        ));
        assert!(CustomerBook::purchase_decision(
            &foodie, recipe, asking, 90.0, 1.0
        ));
    }

    #[test]
    fn higher_quality_raises_the_ceiling() {
        let catalog = Catalog::standard();
        let mut book = CustomerBook::new();
        let mut rng = rng(5);
        let id = book.spawn(&catalog, 1, None, &mut rng);
        let mut customer = book.get(id).unwrap().clone();
        customer.segment = CustomerSegment::Mainstream;
        customer.price_elasticity = 1.0;
        customer.quality_weight = 0.9;
        let recipe = &catalog.recipes[&ProductKey::new("bread")];

        // Just above the low-quality ceiling but below the high-quality one.
        let asking = recipe.list_price * Decimal::new(110, 2);
        assert!(!CustomerBook::purchase_decision(
            &customer, recipe, asking, 10.0, 1.0
        ));
        assert!(CustomerBook::purchase_decision(
            &customer, recipe, asking, 100.0, 1.0
        ));
    }

    #[test]
    fn elasticity_does_not_shrink_the_willingness_ceiling() {
        let catalog = Catalog::standard();
        let mut book = CustomerBook::new();
        let mut rng = rng(29);
        let id = book.spawn(&catalog, 1, None, &mut rng);
        let mut customer = book.get(id).unwrap().clone();
        customer.segment = CustomerSegment::Mainstream;
        customer.quality_weight = 0.5;
        customer.price_elasticity = 1.5;
        let recipe = &catalog.recipes[&ProductKey::new("bread")];

        // Ceiling at quality 90: 6.50 × 1.0 × (0.8 + 0.4 × 0.9 × 0.5) = 6.37.
        assert!(CustomerBook::purchase_decision(
            &customer,
            recipe,
            Decimal::new(630, 2),
            90.0,
            1.0
        ));
        assert!(!CustomerBook::purchase_decision(
            &customer,
            recipe,
            Decimal::new(650, 2),
            90.0,
            1.0
        ));
    }

    #[test]
    fn record_purchase_updates_loyalty_and_trust() {
        let catalog = Catalog::standard();
        let mut book = CustomerBook::new();
        let mut rng = rng(9);
        let id = book.spawn(&catalog, 1, None, &mut rng);
        let bread = ProductKey::new("bread");

        for day in 1..=12 {
            book.record_purchase(id, day, &bread, 1.0, Decimal::new(650, 2), 95.0);
        }
        let customer = book.get(id).unwrap();
        assert_eq!(customer.visits, 12);
        // Repeated high-quality purchases pull satisfaction toward 95 and
        // trust upward; 12 visits at that level is Loyal territory.
        assert!(customer.satisfaction > 85.0);
        assert!(customer.trust > 50.0);
        assert_eq!(customer.loyalty, LoyaltyTier::Loyal);
        assert_eq!(customer.total_spent, Decimal::new(7800, 2));
    }

    #[test]
    fn poor_quality_erodes_trust_faster_than_good_quality_builds_it() {
        let catalog = Catalog::standard();
        let mut book = CustomerBook::new();
        let mut rng = rng(13);
        let id = book.spawn(&catalog, 1, None, &mut rng);
        let bread = ProductKey::new("bread");
        let start = book.get(id).unwrap().trust;

        book.record_purchase(id, 1, &bread, 1.0, Decimal::ONE, 80.0);
        let gained = book.get(id).unwrap().trust - start;
        book.record_purchase(id, 2, &bread, 1.0, Decimal::ONE, 60.0);
        let after_loss = book.get(id).unwrap().trust;
        // Same 10-point distance from the neutral quality of 70, but the
        // loss outweighs the gain.
        assert!(after_loss < start + gained);
        assert!(after_loss < start);
    }

    #[test]
    fn inactivity_deactivates_but_keeps_the_record() {
        let catalog = Catalog::standard();
        let mut book = CustomerBook::new();
        let mut r = rng(17);
        let id = book.spawn(&catalog, 1, None, &mut r);
        book.record_purchase(id, 1, &ProductKey::new("bread"), 1.0, Decimal::ONE, 80.0);

        book.daily_refresh(10, 14, &mut r);
        assert!(book.get(id).unwrap().active);
        book.daily_refresh(20, 14, &mut r);
        let customer = book.get(id).unwrap();
        assert!(!customer.active);
        assert_eq!(customer.visits, 1);
    }

    #[test]
    fn special_request_pays_extra() {
        let catalog = Catalog::standard();
        let mut book = CustomerBook::new();
        let mut r = rng(1);
        let id = book.spawn(&catalog, 1, None, &mut r);
        book.get_mut(id).unwrap().personality.chattiness = 1.0;

        // With p = 0.08 per roll, 200 independent rolls fire well beyond
        // doubt for a fixed seed.
        let mut extra = Decimal::ZERO;
        for _ in 0..200 {
            let outcome = book.roll_incidents(id, 80.0, Decimal::new(1000, 2), &mut r);
            extra += outcome.extra_revenue;
        }
        assert!(extra > Decimal::ZERO);
    }

    #[test]
    fn snapshot_pairs_round_trip() {
        let catalog = Catalog::standard();
        let mut book = CustomerBook::new();
        let mut r = rng(23);
        for _ in 0..5 {
            book.spawn(&catalog, 1, None, &mut r);
        }
        let restored = CustomerBook::from_pairs(book.to_pairs());
        assert_eq!(restored.len(), 5);
        let next = restored.clone().spawn(&catalog, 2, None, &mut r);
        assert_eq!(next, CustomerId(6));
    }
}
