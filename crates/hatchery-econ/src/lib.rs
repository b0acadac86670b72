#![deny(warnings)]

//! Labor economics: the worker roster, quarterly labor capacity, wages and
//! the specialist labor-cost blend for Hatchery Tycoon.
//!
//! This module provides:
//! - A bounded, hiring-ordered roster with LIFO release
//! - Labor capacity and payroll derived from the roster
//! - The specialist discount applied when a batch is maintained by experts

use hatchery_core::{HatcheryConfig, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

/// Errors produced by roster changes. A rejected batch leaves the roster untouched.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RosterError {
    /// Hiring the batch would exceed the roster maximum.
    #[error("cannot hire {requested} workers, only {vacancies} vacancies")]
    TooMany { requested: usize, vacancies: usize },
    /// Worker names must not be blank.
    #[error("worker name must not be blank")]
    EmptyName,
    /// Names are unique within the roster.
    #[error("worker {0} is already employed")]
    DuplicateName(String),
}

/// A hiring request: who to hire and what, if anything, they specialise in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWorker {
    pub name: String,
    #[serde(default)]
    pub specialisation: Option<ProductId>,
}

impl NewWorker {
    pub fn generalist(name: &str) -> Self {
        Self {
            name: name.to_string(),
            specialisation: None,
        }
    }

    pub fn specialist(name: &str, product: &str) -> Self {
        Self {
            name: name.to_string(),
            specialisation: Some(ProductId::from(product)),
        }
    }
}

/// An employed worker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub name: String,
    /// Product this worker is expert in, if any.
    pub specialisation: Option<ProductId>,
    /// Fixed wage paid at the end of every quarter.
    pub quarterly_wage: Decimal,
}

impl Worker {
    pub fn is_specialised_for(&self, product: &ProductId) -> bool {
        self.specialisation.as_ref() == Some(product)
    }
}

/// Workers in hiring order. The most recently hired worker is released first.
#[derive(Clone, Debug, PartialEq)]
pub struct Roster {
    workers: Vec<Worker>,
    min: usize,
    max: usize,
    quarterly_wage: Decimal,
}

impl Roster {
    /// Empty roster. It must be staffed to at least `min` before operating.
    pub fn new(min: usize, max: usize, quarterly_wage: Decimal) -> Self {
        Self {
            workers: Vec::new(),
            min,
            max,
            quarterly_wage,
        }
    }

    pub fn from_config(cfg: &HatcheryConfig) -> Self {
        Self::new(cfg.min_workers, cfg.max_workers, cfg.quarterly_wage())
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Whether the roster size lies within `[min, max]`.
    pub fn is_staffed(&self) -> bool {
        (self.min..=self.max).contains(&self.workers.len())
    }

    /// Number of workers specialised in `product`.
    pub fn specialists_for(&self, product: &ProductId) -> usize {
        self.workers
            .iter()
            .filter(|w| w.is_specialised_for(product))
            .count()
    }

    /// Hire a batch of workers, all or nothing.
    ///
    /// The whole batch is rejected when it would push the roster above its
    /// maximum, or when any name is blank or already taken (on the roster or
    /// earlier in the same batch). Returns the hired names in order.
    pub fn hire(&mut self, batch: Vec<NewWorker>) -> Result<Vec<String>, RosterError> {
        let vacancies = self.max.saturating_sub(self.workers.len());
        if batch.len() > vacancies {
            return Err(RosterError::TooMany {
                requested: batch.len(),
                vacancies,
            });
        }
        let mut names: BTreeSet<&str> = self.workers.iter().map(|w| w.name.as_str()).collect();
        for w in &batch {
            let name = w.name.trim();
            if name.is_empty() {
                return Err(RosterError::EmptyName);
            }
            if !names.insert(name) {
                return Err(RosterError::DuplicateName(name.to_string()));
            }
        }

        let mut hired = Vec::with_capacity(batch.len());
        for w in batch {
            let name = w.name.trim().to_string();
            debug!(worker = %name, specialisation = ?w.specialisation, "hired");
            hired.push(name.clone());
            self.workers.push(Worker {
                name,
                specialisation: w.specialisation,
                quarterly_wage: self.quarterly_wage,
            });
        }
        Ok(hired)
    }

    /// Release up to `count` workers, most recently hired first.
    ///
    /// Stops once the roster reaches its minimum and returns the names of the
    /// workers actually released.
    pub fn release(&mut self, count: usize) -> Vec<String> {
        let mut released = Vec::new();
        while released.len() < count && self.workers.len() > self.min {
            if let Some(w) = self.workers.pop() {
                debug!(worker = %w.name, "released");
                released.push(w.name);
            }
        }
        released
    }
}

/// One line of the quarterly payroll.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WagePayment {
    pub name: String,
    pub amount: Decimal,
}

/// Wages owed for a quarter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payroll {
    pub total: Decimal,
    pub per_worker: Vec<WagePayment>,
}

/// Labor capacity and wage rules.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaborPool {
    /// Labor-weeks one worker provides per quarter.
    pub labor_weeks_per_worker: Decimal,
}

impl LaborPool {
    pub fn new(labor_weeks_per_worker: Decimal) -> Self {
        Self {
            labor_weeks_per_worker,
        }
    }

    pub fn from_config(cfg: &HatcheryConfig) -> Self {
        Self::new(cfg.labor_weeks_per_worker)
    }

    /// Total labor-weeks available to `worker_count` workers in a quarter.
    pub fn total_capacity(&self, worker_count: usize) -> Decimal {
        Decimal::from(worker_count) * self.labor_weeks_per_worker
    }

    /// Sum of every worker's quarterly wage.
    pub fn total_wages(&self, roster: &Roster) -> Decimal {
        roster.workers().iter().map(|w| w.quarterly_wage).sum()
    }

    /// Itemised payroll in hiring order.
    pub fn payroll(&self, roster: &Roster) -> Payroll {
        let per_worker = roster
            .workers()
            .iter()
            .map(|w| WagePayment {
                name: w.name.clone(),
                amount: w.quarterly_wage,
            })
            .collect();
        Payroll {
            total: self.total_wages(roster),
            per_worker,
        }
    }
}

/// Labor needed to maintain a batch, after the specialist discount.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaborCost {
    /// Labor-weeks the batch would need without specialists.
    pub base: Decimal,
    /// Labor-weeks actually charged.
    pub actual: Decimal,
    /// Units covered by specialist time (may be fractional, capped at the batch size).
    pub specialist_units: Decimal,
}

impl LaborCost {
    /// Whether the whole batch received the specialist discount.
    pub fn fully_discounted(&self, quantity: u32) -> bool {
        self.specialist_units >= Decimal::from(quantity)
    }
}

/// Apply the 2/3 specialist discount to `weeks`.
fn discounted(weeks: Decimal) -> Decimal {
    weeks * Decimal::TWO / Decimal::from(3)
}

/// Labor cost of maintaining `quantity` units given `specialist_capacity`
/// labor-weeks of expert time.
///
/// Specialists work at two thirds of the regular time cost, so their raw
/// capacity converts 3:2 into regular maintenance-time equivalents. When that
/// covers the batch, the whole batch costs `base * 2/3`; otherwise the covered
/// share is discounted and the remainder is charged at the regular rate.
///
/// Example:
/// let c = labor_cost(Decimal::ONE, 9, Decimal::new(9, 0));
/// assert_eq!(c.actual, Decimal::new(6, 0));
pub fn labor_cost(weeks_per_unit: Decimal, quantity: u32, specialist_capacity: Decimal) -> LaborCost {
    let qty = Decimal::from(quantity);
    let base = weeks_per_unit * qty;
    if quantity == 0 || weeks_per_unit.is_zero() {
        return LaborCost {
            base,
            actual: Decimal::ZERO,
            specialist_units: qty,
        };
    }
    let equivalent = specialist_capacity * Decimal::from(3) / Decimal::TWO;
    match equivalent.checked_div(weeks_per_unit) {
        Some(max_specialist_units) if max_specialist_units < qty => {
            let specialist_time = discounted(max_specialist_units * weeks_per_unit);
            let regular_time = (qty - max_specialist_units) * weeks_per_unit;
            LaborCost {
                base,
                actual: specialist_time + regular_time,
                specialist_units: max_specialist_units,
            }
        }
        // A quotient too large for Decimal covers any batch.
        _ => LaborCost {
            base,
            actual: discounted(base),
            specialist_units: qty,
        },
    }
}
