//! Finite-capacity multi-stage production pipeline.
//!
//! Items move through their recipe's stage list accruing progress in
//! simulated minutes. Oven-requiring stages are gated by a counting
//! semaphore over `oven_capacity`; items that cannot acquire a slot sit
//! in `waiting_for_oven` and accrue nothing that tick. Employee skill
//! relative to a stage's requirement scales both speed and the stage's
//! multiplicative quality contribution, bounded to [0.7, 1.1]; working
//! unassigned is a flat penalty, not a block.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{
    EmployeeId, IngredientKey, ProductKey, Recipe, SimError, Stage, StaffRoster,
};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::inventory::InventoryLedger;

/// Skill factor bounds for speed and quality scaling.
const SKILL_FACTOR_RANGE: (f64, f64) = (0.7, 1.1);
/// Effective factor for items progressing without an assigned employee.
const UNASSIGNED_FACTOR: f64 = 0.75;
/// Assignment score penalty per concurrent assignment.
const WORKLOAD_PENALTY: f64 = 3.0;

/// Identifier for an in-flight production item.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item-{}", self.0)
    }
}

/// Errors from starting production.
#[derive(Debug, Error, PartialEq)]
pub enum StartError {
    /// One or more ingredients are short; carries the full shortfall list.
    /// Nothing was consumed.
    #[error("missing ingredients for production")]
    MissingIngredients(Vec<(IngredientKey, f64)>),
    /// Any other business failure (queue full, invalid quantity, ...).
    #[error(transparent)]
    Sim(#[from] SimError),
}

/// One queued batch moving through its stages.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductionItem {
    /// Stable item id.
    pub id: ItemId,
    /// Product being made.
    pub recipe: ProductKey,
    /// Units in the batch.
    pub quantity: f64,
    /// Ordered stage list copied from the recipe at start time.
    pub stages: Vec<Stage>,
    /// Index of the stage currently in progress.
    pub stage_index: usize,
    /// Minutes accumulated in the current stage.
    pub progress: f64,
    /// Weighted quality of the consumed ingredients.
    pub ingredient_quality: f64,
    /// Technique quality; starts at 100, scaled per completed stage.
    pub prep_quality: f64,
    /// Cost basis of the consumed ingredients.
    pub ingredient_cost: Decimal,
    /// Currently assigned employee, re-resolved against the roster each
    /// tick; a stale id degrades to unassigned.
    pub assigned_employee: Option<EmployeeId>,
    /// Whether the item currently holds an oven slot.
    pub has_oven_slot: bool,
    /// Set while the current stage needs an oven and none is free.
    pub waiting_for_oven: bool,
}

impl ProductionItem {
    /// The stage currently in progress, if any remain.
    pub fn current_stage(&self) -> Option<&Stage> {
        self.stages.get(self.stage_index)
    }

    fn finished(&self) -> bool {
        self.stage_index >= self.stages.len()
    }
}

/// A batch that completed its final stage this tick.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletedBatch {
    /// Item that finished.
    pub item_id: ItemId,
    /// Product key.
    pub recipe: ProductKey,
    /// Units produced.
    pub quantity: f64,
    /// Final quality: 0.4 × ingredient + 0.6 × technique.
    pub quality: f64,
}

/// The oven-slot-limited production queue.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductionScheduler {
    queue: Vec<ProductionItem>,
    next_id: u64,
    oven_capacity: u32,
    oven_in_use: u32,
    speed_multiplier: f64,
    max_queue_items: usize,
}

/// Speed/quality factor for a skill level against a stage requirement.
pub fn skill_factor(skill: f64, requirement: f64) -> f64 {
    (1.0 + (skill - requirement) / 250.0).clamp(SKILL_FACTOR_RANGE.0, SKILL_FACTOR_RANGE.1)
}

impl ProductionScheduler {
    /// Empty queue with the given oven capacity and global speed.
    pub fn new(oven_capacity: u32, speed_multiplier: f64, max_queue_items: usize) -> Self {
        Self {
            queue: Vec::new(),
            next_id: 0,
            oven_capacity,
            oven_in_use: 0,
            speed_multiplier,
            max_queue_items,
        }
    }

    /// In-flight items, oldest first.
    pub fn items(&self) -> &[ProductionItem] {
        &self.queue
    }

    /// Oven slots currently held.
    pub fn oven_in_use(&self) -> u32 {
        self.oven_in_use
    }

    /// Configured oven capacity.
    pub fn oven_capacity(&self) -> u32 {
        self.oven_capacity
    }

    /// Start a batch: reserves ingredients atomically and enqueues the
    /// item. On a shortage the full missing list is returned and nothing
    /// is consumed. `CapacityExceeded` covers a full queue and recipes
    /// whose *first* stage needs an oven when none is free; mid-pipeline
    /// oven pressure is the non-error `waiting_for_oven` state.
    pub fn start(
        &mut self,
        recipe: &Recipe,
        quantity: f64,
        inventory: &mut InventoryLedger,
        staff: &StaffRoster,
    ) -> Result<ItemId, StartError> {
        if !(quantity > 0.0) || !quantity.is_finite() {
            return Err(SimError::InvalidQuantity.into());
        }
        if self.queue.len() >= self.max_queue_items {
            return Err(SimError::CapacityExceeded.into());
        }
        let first_stage = recipe
            .stages
            .first()
            .ok_or_else(|| SimError::NotFound(recipe.key.0.clone()))?;
        if first_stage.requires_oven && self.oven_in_use >= self.oven_capacity {
            return Err(SimError::CapacityExceeded.into());
        }

        let requirements = recipe.requirements(quantity);
        let missing = inventory.missing_for(&requirements);
        if !missing.is_empty() {
            return Err(StartError::MissingIngredients(missing));
        }
        let consumed = inventory.consume(&requirements)?;

        self.next_id += 1;
        let id = ItemId(self.next_id);
        let workload = self.workload_by_employee();
        let assigned = best_employee(first_stage, staff, &workload);
        let holds_oven = first_stage.requires_oven;
        if holds_oven {
            self.oven_in_use += 1;
        }
        tracing::debug!(
            target: "production",
            item = %id,
            recipe = %recipe.key,
            quantity,
            ingredient_quality = consumed.avg_quality,
            "production started"
        );
        self.queue.push(ProductionItem {
            id,
            recipe: recipe.key.clone(),
            quantity,
            stages: recipe.stages.clone(),
            stage_index: 0,
            progress: 0.0,
            ingredient_quality: consumed.avg_quality,
            prep_quality: 100.0,
            ingredient_cost: consumed.total_cost,
            assigned_employee: assigned,
            has_oven_slot: holds_oven,
            waiting_for_oven: false,
        });
        Ok(id)
    }

    /// Cancel an in-flight item. Consumed ingredients are forfeited, the
    /// cost stays sunk, and a held oven slot is released.
    pub fn cancel(&mut self, id: ItemId) -> Result<(), SimError> {
        let index = self
            .queue
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| SimError::NotFound(format!("{id}")))?;
        let item = self.queue.remove(index);
        if item.has_oven_slot {
            self.oven_in_use -= 1;
        }
        tracing::debug!(target: "production", item = %id, "production cancelled");
        Ok(())
    }

    /// Advance all in-flight items by `delta_minutes`. Completed final
    /// stages deposit product batches into the inventory ledger and the
    /// finished items are returned.
    ///
    /// All items progress against a snapshot of employee factors taken
    /// before any mutation, so no item observes another item's update
    /// from the same tick.
    pub fn tick(
        &mut self,
        delta_minutes: f64,
        day: u32,
        staff: &mut StaffRoster,
        inventory: &mut InventoryLedger,
    ) -> Vec<CompletedBatch> {
        if delta_minutes <= 0.0 {
            return Vec::new();
        }

        // Oven acquisition pass: items whose current stage needs an oven
        // grab free slots in queue order.
        for item in self.queue.iter_mut() {
            let Some(stage) = item.stages.get(item.stage_index) else {
                continue;
            };
            if stage.requires_oven && !item.has_oven_slot {
                if self.oven_in_use < self.oven_capacity {
                    self.oven_in_use += 1;
                    item.has_oven_slot = true;
                    item.waiting_for_oven = false;
                } else {
                    item.waiting_for_oven = true;
                }
            } else {
                item.waiting_for_oven = false;
            }
        }

        // Consistent snapshot of per-item factors for this tick.
        let factors: Vec<f64> = self
            .queue
            .iter()
            .map(|item| {
                let Some(stage) = item.current_stage() else {
                    return UNASSIGNED_FACTOR;
                };
                item.assigned_employee
                    .and_then(|id| staff.get(id))
                    .map(|e| skill_factor(e.skill, stage.skill_requirement))
                    .unwrap_or(UNASSIGNED_FACTOR)
            })
            .collect();

        let mut completed = Vec::new();
        let mut released_slots = 0u32;
        let mut fatigue_minutes: BTreeMap<EmployeeId, f64> = BTreeMap::new();
        let workload = self.workload_by_employee();

        for (item, factor) in self.queue.iter_mut().zip(factors) {
            if item.finished() || item.waiting_for_oven {
                continue;
            }
            // A fired employee's id no longer resolves; degrade gracefully.
            if let Some(id) = item.assigned_employee {
                if staff.get(id).is_none() {
                    item.assigned_employee = None;
                }
            }
            let mut budget = delta_minutes * self.speed_multiplier * factor;
            if let Some(id) = item.assigned_employee {
                *fatigue_minutes.entry(id).or_insert(0.0) += delta_minutes;
            }

            while budget > 0.0 {
                let Some(stage) = item.stages.get(item.stage_index).cloned() else {
                    break;
                };
                let needed = stage.duration_min - item.progress;
                if budget < needed {
                    item.progress += budget;
                    break;
                }
                budget -= needed;
                item.progress = 0.0;

                // Stage complete: quality contribution, slot release,
                // reassignment for the next stage.
                let quality_mult = (stage.quality_impact * factor).min(1.05);
                item.prep_quality = (item.prep_quality * quality_mult).clamp(0.0, 100.0);
                if stage.requires_oven && item.has_oven_slot {
                    item.has_oven_slot = false;
                    released_slots += 1;
                }
                item.stage_index += 1;

                if let Some(next) = item.stages.get(item.stage_index) {
                    item.assigned_employee = best_employee(next, staff, &workload);
                    // The next stage may need an oven; wait for the next
                    // tick's acquisition pass rather than jumping the queue.
                    if next.requires_oven {
                        break;
                    }
                } else {
                    let quality =
                        0.4 * item.ingredient_quality + 0.6 * item.prep_quality;
                    let unit_cost = if item.quantity > 0.0 {
                        (item.ingredient_cost
                            / Decimal::from_f64_retain(item.quantity)
                                .unwrap_or(Decimal::ONE))
                        .round_dp(2)
                    } else {
                        Decimal::ZERO
                    };
                    inventory.add_product_batch(
                        item.recipe.clone(),
                        item.quantity,
                        quality,
                        day,
                        item.ingredient_quality,
                        unit_cost,
                    );
                    tracing::info!(
                        target: "production",
                        item = %item.id,
                        recipe = %item.recipe,
                        quantity = item.quantity,
                        quality,
                        "batch completed"
                    );
                    completed.push(CompletedBatch {
                        item_id: item.id,
                        recipe: item.recipe.clone(),
                        quantity: item.quantity,
                        quality,
                    });
                    break;
                }
            }
        }

        self.oven_in_use -= released_slots;
        self.queue.retain(|item| !item.finished());

        for (id, minutes) in fatigue_minutes {
            if let Some(employee) = staff.get_mut(id) {
                employee.add_work_fatigue(minutes);
            }
        }

        completed
    }

    fn workload_by_employee(&self) -> BTreeMap<EmployeeId, u32> {
        let mut workload = BTreeMap::new();
        for item in &self.queue {
            if let Some(id) = item.assigned_employee {
                *workload.entry(id).or_insert(0) += 1;
            }
        }
        workload
    }

    /// Export the queue for snapshots.
    pub fn queue_items(&self) -> Vec<ProductionItem> {
        self.queue.clone()
    }

    /// Rebuild from a snapshot queue.
    pub fn from_items(
        items: Vec<ProductionItem>,
        oven_capacity: u32,
        speed_multiplier: f64,
        max_queue_items: usize,
    ) -> Self {
        let next_id = items.iter().map(|i| i.id.0).max().unwrap_or(0);
        let oven_in_use = items.iter().filter(|i| i.has_oven_slot).count() as u32;
        Self {
            queue: items,
            next_id,
            oven_capacity,
            oven_in_use,
            speed_multiplier,
            max_queue_items,
        }
    }
}

/// Greedy best-fit assignment: among available (non-fatigued) staff,
/// highest score of skill match, workload penalty, and happiness bonus.
/// Deterministic; ties fall to the lowest id via stable iteration order.
fn best_employee(
    stage: &Stage,
    staff: &StaffRoster,
    workload: &BTreeMap<EmployeeId, u32>,
) -> Option<EmployeeId> {
    let mut best: Option<(f64, EmployeeId)> = None;
    for employee in staff.iter() {
        if !employee.available() {
            continue;
        }
        let match_bonus = 10.0 - (employee.skill - stage.skill_requirement).abs() / 10.0;
        let load = workload.get(&employee.id).copied().unwrap_or(0) as f64;
        let score = match_bonus - WORKLOAD_PENALTY * load + employee.happiness / 50.0;
        if best.map(|(s, _)| score > s).unwrap_or(true) {
            best = Some((score, employee.id));
        }
    }
    best.map(|(_, id)| id)
}
