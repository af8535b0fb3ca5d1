//! Staff records and the roster that owns them.
//!
//! Production items hold an `EmployeeId`, never a live reference; the
//! roster is re-consulted every tick so an externally fired employee
//! degrades an item to unassigned instead of faulting.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Fatigue level at and above which an employee is unavailable for new work.
pub const FATIGUE_LIMIT: f64 = 80.0;

/// Stable staff id; monotonically increasing, never reused.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EmployeeId(pub u64);

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "employee-{}", self.0)
    }
}

/// A bakery employee.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Employee {
    /// Stable id.
    pub id: EmployeeId,
    /// Display name.
    pub name: String,
    /// Skill level in [0, 100].
    pub skill: f64,
    /// Fatigue in [0, 100]; at `FATIGUE_LIMIT` the employee sits out.
    pub fatigue: f64,
    /// Happiness in [0, 100]; feeds the assignment score.
    pub happiness: f64,
    /// Wage charged at each day close.
    pub daily_wage: Decimal,
}

impl Employee {
    /// Whether the employee can take a new assignment.
    pub fn available(&self) -> bool {
        self.fatigue < FATIGUE_LIMIT
    }

    /// Accrue fatigue from `minutes` of stage work.
    pub fn add_work_fatigue(&mut self, minutes: f64) {
        self.fatigue = (self.fatigue + minutes / 12.0).clamp(0.0, 100.0);
    }

    /// Overnight recovery applied at day close.
    pub fn rest(&mut self) {
        self.fatigue = (self.fatigue - 45.0).max(0.0);
        // Overworked days wear on morale; light days restore it.
        if self.fatigue > 30.0 {
            self.happiness = (self.happiness - 2.0).max(0.0);
        } else {
            self.happiness = (self.happiness + 1.0).min(100.0);
        }
    }
}

/// Arena of employees keyed by stable id.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StaffRoster {
    employees: BTreeMap<EmployeeId, Employee>,
    next_id: u64,
}

impl StaffRoster {
    /// Empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hire a new employee; returns the assigned id.
    pub fn hire(
        &mut self,
        name: impl Into<String>,
        skill: f64,
        daily_wage: Decimal,
    ) -> EmployeeId {
        self.next_id += 1;
        let id = EmployeeId(self.next_id);
        self.employees.insert(
            id,
            Employee {
                id,
                name: name.into(),
                skill: skill.clamp(0.0, 100.0),
                fatigue: 0.0,
                happiness: 70.0,
                daily_wage,
            },
        );
        id
    }

    /// Remove an employee. Items holding the id degrade to unassigned.
    pub fn fire(&mut self, id: EmployeeId) -> Option<Employee> {
        self.employees.remove(&id)
    }

    /// Look up an employee by id.
    pub fn get(&self, id: EmployeeId) -> Option<&Employee> {
        self.employees.get(&id)
    }

    /// Mutable lookup by id.
    pub fn get_mut(&mut self, id: EmployeeId) -> Option<&mut Employee> {
        self.employees.get_mut(&id)
    }

    /// Iterate all employees in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Employee> {
        self.employees.values()
    }

    /// Number of employees on the roster.
    pub fn len(&self) -> usize {
        self.employees.len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.employees.is_empty()
    }

    /// Total daily wages owed.
    pub fn daily_wages(&self) -> Decimal {
        self.employees.values().map(|e| e.daily_wage).sum()
    }

    /// Overnight recovery for everyone.
    pub fn rest_all(&mut self) {
        for employee in self.employees.values_mut() {
            employee.rest();
        }
    }

    /// Export as an ordered pair list for snapshots.
    pub fn to_pairs(&self) -> Vec<(EmployeeId, Employee)> {
        self.employees
            .iter()
            .map(|(id, e)| (*id, e.clone()))
            .collect()
    }

    /// Rebuild from a snapshot pair list.
    pub fn from_pairs(pairs: Vec<(EmployeeId, Employee)>) -> Self {
        let next_id = pairs.iter().map(|(id, _)| id.0).max().unwrap_or(0);
        Self {
            employees: pairs.into_iter().collect(),
            next_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hire_assigns_monotonic_ids() {
        let mut roster = StaffRoster::new();
        let a = roster.hire("Ana", 60.0, Decimal::new(12000, 2));
        let b = roster.hire("Ben", 40.0, Decimal::new(9000, 2));
        assert!(b > a);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.daily_wages(), Decimal::new(21000, 2));
    }

    #[test]
    fn fired_employee_resolves_to_none() {
        let mut roster = StaffRoster::new();
        let id = roster.hire("Ana", 60.0, Decimal::ONE);
        assert!(roster.get(id).is_some());
        roster.fire(id);
        assert!(roster.get(id).is_none());
    }

    #[test]
    fn fatigue_gates_availability_and_rest_recovers() {
        let mut roster = StaffRoster::new();
        let id = roster.hire("Ana", 60.0, Decimal::ONE);
        let employee = roster.get_mut(id).unwrap();
        employee.add_work_fatigue(12.0 * 85.0);
        assert!(!roster.get(id).unwrap().available());
        roster.rest_all();
        roster.rest_all();
        assert!(roster.get(id).unwrap().available());
    }

    #[test]
    fn snapshot_pairs_roundtrip_preserves_next_id() {
        let mut roster = StaffRoster::new();
        roster.hire("Ana", 60.0, Decimal::ONE);
        let id = roster.hire("Ben", 40.0, Decimal::ONE);
        let mut back = StaffRoster::from_pairs(roster.to_pairs());
        let new_id = back.hire("Cyn", 50.0, Decimal::ONE);
        assert!(new_id > id);
    }
}
