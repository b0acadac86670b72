#![deny(warnings)]

//! Quarter orchestration for Hatchery Tycoon.
//!
//! [`Hatchery`] owns the ledger, roster, warehouse and the labor left in the
//! current quarter. It arbitrates sale requests against labor and stock,
//! settles wages, fixed and storage costs, and closes each quarter with
//! depreciation and a restock that may end in bankruptcy.

use hatchery_core::{
    validate_config, validate_reference, HatcheryConfig, ProductId, ReferenceData, ResourceKind,
    SupplierId, ValidationError,
};
use hatchery_econ::{labor_cost, LaborPool, NewWorker, Payroll, Roster, RosterError, Worker};
use hatchery_warehouse::{
    Inventory, InventoryError, InventorySnapshot, RestockOutcome, StorageCost,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Where the hatchery is in its quarterly cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Between quarters; the roster may change.
    Idle,
    /// Quarter started; sales and settlements are accepted.
    Trading,
    /// Restock could not be funded. Terminal.
    Bankrupt,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => f.write_str("between quarters"),
            Phase::Trading => f.write_str("trading"),
            Phase::Bankrupt => f.write_str("bankrupt"),
        }
    }
}

/// End-of-quarter charges that may be settled once per quarter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Settlement {
    Wages,
    FixedCosts,
    Storage,
}

impl fmt::Display for Settlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Settlement::Wages => f.write_str("wages"),
            Settlement::FixedCosts => f.write_str("fixed costs"),
            Settlement::Storage => f.write_str("storage"),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum HatcheryError {
    #[error("unknown product: {0}")]
    UnknownProduct(ProductId),
    #[error("unknown supplier: {0}")]
    UnknownSupplier(SupplierId),
    #[error("unknown specialisation: {0}")]
    UnknownSpecialisation(ProductId),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error("cannot {operation} while {phase}")]
    PhaseViolation {
        operation: &'static str,
        phase: Phase,
    },
    #[error("roster of {workers} is outside [{min}, {max}]")]
    Understaffed {
        workers: usize,
        min: usize,
        max: usize,
    },
    #[error("{0} already settled this quarter")]
    AlreadySettled(Settlement),
    #[error("hatchery is bankrupt")]
    Bankrupt,
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Labor shortfall for a sale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaborGap {
    pub required: Decimal,
    pub available: Decimal,
}

/// Resource shortfall for a sale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceGap {
    pub resource: ResourceKind,
    pub required: Decimal,
    pub available: Decimal,
}

/// Result of a sale request.
///
/// Insufficiency variants carry the quantity that was evaluated (the request
/// capped at demand) so the caller can retry with less.
#[derive(Clone, Debug, PartialEq)]
pub enum SaleOutcome {
    Success {
        product: ProductId,
        quantity: u32,
        revenue: Decimal,
        labor: Decimal,
    },
    Skipped {
        product: ProductId,
    },
    Error(HatcheryError),
    InsufficientLabor {
        product: ProductId,
        quantity: u32,
        labor: LaborGap,
    },
    InsufficientResources {
        product: ProductId,
        quantity: u32,
        resources: Vec<ResourceGap>,
    },
    InsufficientLaborAndResources {
        product: ProductId,
        quantity: u32,
        labor: LaborGap,
        resources: Vec<ResourceGap>,
    },
}

impl SaleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SaleOutcome::Success { .. })
    }

    /// Whether the request failed for lack of labor or stock.
    pub fn is_insufficient(&self) -> bool {
        matches!(
            self,
            SaleOutcome::InsufficientLabor { .. }
                | SaleOutcome::InsufficientResources { .. }
                | SaleOutcome::InsufficientLaborAndResources { .. }
        )
    }
}

/// Units sold of one product during a quarter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductSales {
    pub product: ProductId,
    pub quantity: u32,
    pub revenue: Decimal,
}

/// Income and expenses of one closed quarter, with the warehouse and roster
/// as they stood after the restock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuarterSummary {
    pub quarter: u32,
    pub opening_cash: Decimal,
    pub revenue: Decimal,
    pub sales: Vec<ProductSales>,
    pub wages: Decimal,
    pub fixed_costs: Decimal,
    pub storage_costs: Decimal,
    pub restock_cost: Decimal,
    pub total_expenses: Decimal,
    pub closing_cash: Decimal,
    pub restock: RestockOutcome,
    pub inventory: InventorySnapshot,
    pub workers: Vec<String>,
}

#[derive(Clone, Debug, Default)]
struct QuarterBook {
    opening_cash: Decimal,
    sales: Vec<ProductSales>,
    wages: Option<Decimal>,
    fixed_costs: Option<Decimal>,
    storage: Option<Decimal>,
}

impl QuarterBook {
    fn record_sale(&mut self, product: &ProductId, quantity: u32, revenue: Decimal) {
        match self.sales.iter_mut().find(|s| &s.product == product) {
            Some(s) => {
                s.quantity += quantity;
                s.revenue += revenue;
            }
            None => self.sales.push(ProductSales {
                product: product.clone(),
                quantity,
                revenue,
            }),
        }
    }
}

/// A sale that passed every check and is ready to commit.
struct SalePlan {
    product: ProductId,
    quantity: u32,
    labor: Decimal,
    needs: Vec<(ResourceKind, Decimal)>,
    revenue: Decimal,
}

/// The hatchery business.
#[derive(Clone, Debug)]
pub struct Hatchery {
    config: HatcheryConfig,
    reference: ReferenceData,
    pool: LaborPool,
    roster: Roster,
    inventory: Inventory,
    cash: Decimal,
    available_labor: Decimal,
    phase: Phase,
    quarter: u32,
    book: QuarterBook,
}

impl Hatchery {
    /// A hatchery with validated tables, a full warehouse and no staff.
    pub fn new(config: HatcheryConfig, reference: ReferenceData) -> Result<Self, HatcheryError> {
        validate_config(&config)?;
        validate_reference(&reference)?;
        Ok(Self::assemble(config, reference))
    }

    /// A hatchery using the published tables and default business constants.
    pub fn with_defaults() -> Self {
        Self::assemble(HatcheryConfig::default(), ReferenceData::default_tables())
    }

    fn assemble(config: HatcheryConfig, reference: ReferenceData) -> Self {
        let cash = config.starting_cash;
        Self {
            pool: LaborPool::from_config(&config),
            roster: Roster::from_config(&config),
            inventory: Inventory::full(&reference.warehouse),
            cash,
            available_labor: Decimal::ZERO,
            phase: Phase::Idle,
            quarter: 1,
            book: QuarterBook {
                opening_cash: cash,
                ..QuarterBook::default()
            },
            config,
            reference,
        }
    }

    pub fn config(&self) -> &HatcheryConfig {
        &self.config
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn cash_balance(&self) -> Decimal {
        self.cash
    }

    pub fn workers(&self) -> &[Worker] {
        self.roster.workers()
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn inventory_snapshot(&self) -> InventorySnapshot {
        self.inventory.snapshot()
    }

    /// Labor-weeks left in the current quarter.
    pub fn available_labor(&self) -> Decimal {
        self.available_labor
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of the quarter in progress, or of the next one to start.
    pub fn quarter(&self) -> u32 {
        self.quarter
    }

    fn require(&self, operation: &'static str, allowed: Phase) -> Result<(), HatcheryError> {
        match self.phase {
            Phase::Bankrupt => Err(HatcheryError::Bankrupt),
            p if p == allowed => Ok(()),
            p => Err(HatcheryError::PhaseViolation {
                operation,
                phase: p,
            }),
        }
    }

    /// Hire a batch of workers between quarters, all or nothing.
    pub fn add_workers(&mut self, batch: Vec<NewWorker>) -> Result<Vec<String>, HatcheryError> {
        self.require("hire workers", Phase::Idle)?;
        for w in &batch {
            if let Some(p) = &w.specialisation {
                if self.reference.product(p).is_none() {
                    return Err(HatcheryError::UnknownSpecialisation(p.clone()));
                }
            }
        }
        let hired = self.roster.hire(batch)?;
        info!(quarter = self.quarter, ?hired, "hired workers");
        Ok(hired)
    }

    /// Let go of up to `count` workers between quarters, most recently hired
    /// first, never dropping below the roster minimum.
    pub fn remove_workers(&mut self, count: usize) -> Result<Vec<String>, HatcheryError> {
        self.require("release workers", Phase::Idle)?;
        let released = self.roster.release(count);
        if released.len() < count {
            debug!(
                requested = count,
                released = released.len(),
                "roster minimum reached"
            );
        }
        info!(quarter = self.quarter, ?released, "released workers");
        Ok(released)
    }

    /// Open the quarter and reset available labor from the roster.
    pub fn start_quarter(&mut self) -> Result<Decimal, HatcheryError> {
        self.require("start a quarter", Phase::Idle)?;
        if !self.roster.is_staffed() {
            return Err(HatcheryError::Understaffed {
                workers: self.roster.len(),
                min: self.roster.min(),
                max: self.roster.max(),
            });
        }
        self.available_labor = self.pool.total_capacity(self.roster.len());
        self.phase = Phase::Trading;
        self.book = QuarterBook {
            opening_cash: self.cash,
            ..QuarterBook::default()
        };
        info!(
            quarter = self.quarter,
            workers = self.roster.len(),
            labor = %self.available_labor,
            "quarter started"
        );
        Ok(self.available_labor)
    }

    fn assess(&self, product: &ProductId, requested: u32) -> Result<SalePlan, SaleOutcome> {
        if let Err(e) = self.require("sell", Phase::Trading) {
            return Err(SaleOutcome::Error(e));
        }
        let (Some(quote), Some(spec)) = (
            self.reference.quote(product),
            self.reference.product(product),
        ) else {
            return Err(SaleOutcome::Error(HatcheryError::UnknownProduct(
                product.clone(),
            )));
        };
        let quantity = requested.min(quote.demand);
        if quantity == 0 {
            return Err(SaleOutcome::Skipped {
                product: product.clone(),
            });
        }

        let specialist_capacity = self
            .pool
            .total_capacity(self.roster.specialists_for(product));
        let cost = labor_cost(spec.maintenance_weeks(), quantity, specialist_capacity);
        let labor_short = self.available_labor < cost.actual;

        let needs = spec.resource_needs(quantity);
        let gaps: Vec<ResourceGap> = needs
            .iter()
            .filter_map(|(resource, required)| {
                let available = self.inventory.availability(resource).unwrap_or(Decimal::ZERO);
                (available < *required).then(|| ResourceGap {
                    resource: resource.clone(),
                    required: *required,
                    available,
                })
            })
            .collect();

        let labor = LaborGap {
            required: cost.actual,
            available: self.available_labor,
        };
        let product = product.clone();
        match (labor_short, gaps.is_empty()) {
            (true, false) => Err(SaleOutcome::InsufficientLaborAndResources {
                product,
                quantity,
                labor,
                resources: gaps,
            }),
            (true, true) => Err(SaleOutcome::InsufficientLabor {
                product,
                quantity,
                labor,
            }),
            (false, false) => Err(SaleOutcome::InsufficientResources {
                product,
                quantity,
                resources: gaps,
            }),
            (false, true) => Ok(SalePlan {
                product,
                quantity,
                labor: cost.actual,
                needs,
                revenue: quote.price * Decimal::from(quantity),
            }),
        }
    }

    /// Evaluate a sale without committing it.
    pub fn quote_sale(&self, product: &ProductId, requested: u32) -> SaleOutcome {
        match self.assess(product, requested) {
            Ok(plan) => SaleOutcome::Success {
                product: plan.product,
                quantity: plan.quantity,
                revenue: plan.revenue,
                labor: plan.labor,
            },
            Err(outcome) => outcome,
        }
    }

    /// Sell up to `requested` units of `product`, capped at customer demand.
    ///
    /// The sale commits only when both labor and every resource suffice;
    /// otherwise nothing changes and the shortfall is reported. The quantity
    /// is never reduced automatically.
    pub fn attempt_sale(&mut self, product: &ProductId, requested: u32) -> SaleOutcome {
        let plan = match self.assess(product, requested) {
            Ok(plan) => plan,
            Err(outcome) => {
                debug!(%product, requested, ?outcome, "sale not committed");
                return outcome;
            }
        };

        let mut staged = self.inventory.clone();
        for (resource, amount) in &plan.needs {
            if let Err(e) = staged.deduct(resource, *amount) {
                return SaleOutcome::Error(e.into());
            }
        }
        self.inventory = staged;
        self.available_labor -= plan.labor;
        self.cash += plan.revenue;
        self.book
            .record_sale(&plan.product, plan.quantity, plan.revenue);
        info!(
            product = %plan.product,
            quantity = plan.quantity,
            revenue = %plan.revenue,
            labor = %plan.labor,
            "sale committed"
        );
        SaleOutcome::Success {
            product: plan.product,
            quantity: plan.quantity,
            revenue: plan.revenue,
            labor: plan.labor,
        }
    }

    /// Largest quantity of `product`, up to demand, that would commit right now.
    ///
    /// Returns `None` for an unknown product or outside a trading quarter.
    pub fn max_fulfillable(&self, product: &ProductId) -> Option<u32> {
        if self.phase != Phase::Trading {
            return None;
        }
        let demand = self.reference.quote(product)?.demand;
        // Labor and stock needs grow with quantity, so feasibility is monotone.
        let (mut lo, mut hi) = (0u32, demand);
        while lo < hi {
            let mid = lo + (hi - lo + 1) / 2;
            if self.assess(product, mid).is_ok() {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        Some(lo)
    }

    fn settle(&mut self, which: Settlement) -> Result<(), HatcheryError> {
        self.require("settle costs", Phase::Trading)?;
        let done = match which {
            Settlement::Wages => self.book.wages.is_some(),
            Settlement::FixedCosts => self.book.fixed_costs.is_some(),
            Settlement::Storage => self.book.storage.is_some(),
        };
        if done {
            return Err(HatcheryError::AlreadySettled(which));
        }
        Ok(())
    }

    /// Pay every worker their quarterly wage.
    pub fn pay_workers(&mut self) -> Result<Payroll, HatcheryError> {
        self.settle(Settlement::Wages)?;
        let payroll = self.pool.payroll(&self.roster);
        self.cash -= payroll.total;
        self.book.wages = Some(payroll.total);
        info!(total = %payroll.total, cash = %self.cash, "paid workers");
        Ok(payroll)
    }

    /// Pay rent and utilities for the quarter.
    pub fn settle_fixed_costs(&mut self) -> Result<Decimal, HatcheryError> {
        self.settle(Settlement::FixedCosts)?;
        let cost = self.config.fixed_quarterly_cost;
        self.cash -= cost;
        self.book.fixed_costs = Some(cost);
        info!(%cost, cash = %self.cash, "paid fixed costs");
        Ok(cost)
    }

    /// Current storage bill; does not charge it.
    pub fn storage_cost(&self) -> StorageCost {
        self.inventory.storage_cost()
    }

    /// Charge the storage bill for stock currently held.
    pub fn settle_storage(&mut self) -> Result<StorageCost, HatcheryError> {
        self.settle(Settlement::Storage)?;
        let cost = self.inventory.storage_cost();
        self.cash -= cost.total;
        self.book.storage = Some(cost.total);
        info!(total = %cost.total, cash = %self.cash, "paid storage");
        Ok(cost)
    }

    /// Refill the warehouse from `supplier` with the cash on hand.
    ///
    /// On bankruptcy the ledger is set to the cash left at the failure point,
    /// debt included, restocks made before that point are kept, and the
    /// hatchery stops trading for good.
    pub fn restock(&mut self, supplier: &SupplierId) -> Result<RestockOutcome, HatcheryError> {
        if self.phase == Phase::Bankrupt {
            return Err(HatcheryError::Bankrupt);
        }
        let prices = self
            .reference
            .supplier(supplier)
            .ok_or_else(|| HatcheryError::UnknownSupplier(supplier.clone()))?;
        let outcome = self.inventory.restock_to_full(prices, self.cash);
        match &outcome {
            RestockOutcome::Restocked { total_cost, .. } => {
                self.cash -= *total_cost;
            }
            RestockOutcome::Bankrupt(b) => {
                self.cash = b.cash_remaining;
                self.phase = Phase::Bankrupt;
                warn!(
                    quarter = self.quarter,
                    resource = %b.resource,
                    tier = %b.tier,
                    needed = %b.cost_needed,
                    cash = %b.cash_remaining,
                    "bankrupt while restocking"
                );
            }
        }
        Ok(outcome)
    }

    /// Close the quarter: depreciate stock, then restock from `supplier`.
    ///
    /// An unknown supplier is rejected before anything changes.
    pub fn close_quarter(&mut self, supplier: &SupplierId) -> Result<RestockOutcome, HatcheryError> {
        self.require("close a quarter", Phase::Trading)?;
        if self.reference.supplier(supplier).is_none() {
            return Err(HatcheryError::UnknownSupplier(supplier.clone()));
        }
        self.inventory.apply_depreciation();
        let outcome = self.restock(supplier)?;
        if !outcome.is_bankrupt() {
            info!(quarter = self.quarter, cash = %self.cash, "quarter closed");
            self.phase = Phase::Idle;
            self.quarter += 1;
        }
        self.available_labor = Decimal::ZERO;
        Ok(outcome)
    }

    /// Settle outstanding wages, fixed and storage costs, then close the
    /// quarter with `supplier` and summarise it.
    pub fn run_quarter_close(&mut self, supplier: &SupplierId) -> Result<QuarterSummary, HatcheryError> {
        self.require("close a quarter", Phase::Trading)?;
        if self.reference.supplier(supplier).is_none() {
            return Err(HatcheryError::UnknownSupplier(supplier.clone()));
        }
        if self.book.wages.is_none() {
            self.pay_workers()?;
        }
        if self.book.fixed_costs.is_none() {
            self.settle_fixed_costs()?;
        }
        if self.book.storage.is_none() {
            self.settle_storage()?;
        }
        let quarter = self.quarter;
        let restock = self.close_quarter(supplier)?;
        let restock_cost = match &restock {
            RestockOutcome::Restocked { total_cost, .. } => *total_cost,
            RestockOutcome::Bankrupt(b) => b.spent,
        };

        let book = std::mem::take(&mut self.book);
        let wages = book.wages.unwrap_or_default();
        let fixed_costs = book.fixed_costs.unwrap_or_default();
        let storage_costs = book.storage.unwrap_or_default();
        let revenue = book.sales.iter().map(|s| s.revenue).sum();
        self.book.opening_cash = self.cash;
        Ok(QuarterSummary {
            quarter,
            opening_cash: book.opening_cash,
            revenue,
            sales: book.sales,
            wages,
            fixed_costs,
            storage_costs,
            restock_cost,
            total_expenses: wages + fixed_costs + storage_costs + restock_cost,
            closing_cash: self.cash,
            restock,
            inventory: self.inventory.snapshot(),
            workers: self.roster.workers().iter().map(|w| w.name.clone()).collect(),
        })
    }
}

impl Default for Hatchery {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hatchery_core::{
        MarketQuote, ProductSpec, ResourceCatalog, ResourceNeed, ResourcePrice, StorageSpec,
        SupplierPriceList, Tier, WarehouseSpec,
    };
    use proptest::prelude::*;

    fn d(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    fn pid(s: &str) -> ProductId {
        ProductId::from(s)
    }

    /// One product needing one labor-week and one feed per unit, demand 20.
    fn small_tables(feed_capacity: i64) -> ReferenceData {
        ReferenceData {
            catalog: ResourceCatalog::new(vec![ProductSpec {
                id: pid("Guppy"),
                consumption: vec![ResourceNeed {
                    resource: ResourceKind::from("feed"),
                    per_unit: Decimal::ONE,
                }],
                maintenance_days: d(5),
            }]),
            market: vec![MarketQuote {
                product: pid("Guppy"),
                demand: 20,
                price: d(10),
            }],
            suppliers: vec![SupplierPriceList {
                id: SupplierId::from("Feedco"),
                prices: vec![ResourcePrice {
                    resource: ResourceKind::from("feed"),
                    unit_price: Decimal::ONE,
                }],
            }],
            warehouse: WarehouseSpec {
                resources: vec![StorageSpec {
                    resource: ResourceKind::from("feed"),
                    primary_capacity: d(feed_capacity),
                    secondary_capacity: Decimal::ZERO,
                    depreciation_rate: Decimal::ZERO,
                    unit_storage_cost: Decimal::ZERO,
                }],
            },
        }
    }

    fn staffed(reference: ReferenceData, workers: Vec<NewWorker>) -> Hatchery {
        let mut h = Hatchery::new(HatcheryConfig::default(), reference).unwrap();
        h.add_workers(workers).unwrap();
        h.start_quarter().unwrap();
        h
    }

    #[test]
    fn unknown_product_is_an_error_outcome() {
        let mut h = staffed(small_tables(100), vec![NewWorker::generalist("Ann")]);
        assert_eq!(
            h.attempt_sale(&pid("Shark"), 3),
            SaleOutcome::Error(HatcheryError::UnknownProduct(pid("Shark")))
        );
    }

    #[test]
    fn zero_request_is_skipped() {
        let mut h = staffed(small_tables(100), vec![NewWorker::generalist("Ann")]);
        assert_eq!(
            h.attempt_sale(&pid("Guppy"), 0),
            SaleOutcome::Skipped { product: pid("Guppy") }
        );
        assert_eq!(h.cash_balance(), d(10_000));
    }

    #[test]
    fn request_is_capped_at_demand() {
        let mut h = staffed(
            small_tables(100),
            vec![NewWorker::generalist("A"), NewWorker::generalist("B"), NewWorker::generalist("C")],
        );
        match h.attempt_sale(&pid("Guppy"), 500) {
            SaleOutcome::Success { quantity, revenue, .. } => {
                assert_eq!(quantity, 20);
                assert_eq!(revenue, d(200));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(h.available_labor(), d(7));
        assert_eq!(h.inventory().availability(&ResourceKind::from("feed")), Some(d(80)));
    }

    #[test]
    fn two_generalists_lack_labor_for_twenty() {
        let mut h = staffed(
            small_tables(100),
            vec![NewWorker::generalist("A"), NewWorker::generalist("B")],
        );
        let before = h.inventory_snapshot();
        assert_eq!(
            h.attempt_sale(&pid("Guppy"), 20),
            SaleOutcome::InsufficientLabor {
                product: pid("Guppy"),
                quantity: 20,
                labor: LaborGap {
                    required: d(20),
                    available: d(18),
                },
            }
        );
        assert_eq!(h.inventory_snapshot(), before);
        assert_eq!(h.available_labor(), d(18));
        assert_eq!(h.cash_balance(), d(10_000));
    }

    #[test]
    fn specialist_discounts_labor() {
        let mut h = staffed(small_tables(100), vec![NewWorker::specialist("Sue", "Guppy")]);
        match h.attempt_sale(&pid("Guppy"), 9) {
            SaleOutcome::Success { labor, .. } => assert_eq!(labor, d(6)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(h.available_labor(), d(3));
    }

    #[test]
    fn resource_and_labor_shortages_are_reported_together() {
        let mut h = staffed(small_tables(5), vec![NewWorker::generalist("Ann")]);
        match h.attempt_sale(&pid("Guppy"), 12) {
            SaleOutcome::InsufficientLaborAndResources {
                labor, resources, ..
            } => {
                assert_eq!(labor.required, d(12));
                assert_eq!(resources.len(), 1);
                assert_eq!(resources[0].required, d(12));
                assert_eq!(resources[0].available, d(5));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            h.attempt_sale(&pid("Guppy"), 6),
            SaleOutcome::InsufficientResources { .. }
        ));
        assert!(h.attempt_sale(&pid("Guppy"), 5).is_success());
    }

    #[test]
    fn max_fulfillable_finds_binding_constraint() {
        let h = staffed(small_tables(15), vec![NewWorker::generalist("Ann")]);
        // labor allows 9, stock allows 15
        assert_eq!(h.max_fulfillable(&pid("Guppy")), Some(9));
        assert_eq!(h.max_fulfillable(&pid("Shark")), None);
        assert!(h.quote_sale(&pid("Guppy"), 9).is_success());
        assert!(h.quote_sale(&pid("Guppy"), 10).is_insufficient());
        assert_eq!(h.available_labor(), d(9));
    }

    #[test]
    fn sales_require_an_open_quarter() {
        let mut h = Hatchery::new(HatcheryConfig::default(), small_tables(100)).unwrap();
        h.add_workers(vec![NewWorker::generalist("Ann")]).unwrap();
        assert_eq!(
            h.attempt_sale(&pid("Guppy"), 1),
            SaleOutcome::Error(HatcheryError::PhaseViolation {
                operation: "sell",
                phase: Phase::Idle,
            })
        );
        h.start_quarter().unwrap();
        assert!(matches!(
            h.add_workers(vec![NewWorker::generalist("Bob")]),
            Err(HatcheryError::PhaseViolation { .. })
        ));
        assert!(matches!(
            h.remove_workers(1),
            Err(HatcheryError::PhaseViolation { .. })
        ));
    }

    #[test]
    fn empty_roster_cannot_start() {
        let mut h = Hatchery::with_defaults();
        assert_eq!(
            h.start_quarter(),
            Err(HatcheryError::Understaffed {
                workers: 0,
                min: 1,
                max: 5
            })
        );
    }

    #[test]
    fn unknown_specialisation_rejects_batch() {
        let mut h = Hatchery::with_defaults();
        assert_eq!(
            h.add_workers(vec![
                NewWorker::generalist("Ann"),
                NewWorker::specialist("Bob", "Shark"),
            ]),
            Err(HatcheryError::UnknownSpecialisation(pid("Shark")))
        );
        assert!(h.workers().is_empty());
    }

    #[test]
    fn settlements_happen_once_per_quarter() {
        let mut h = Hatchery::with_defaults();
        h.add_workers(vec![NewWorker::generalist("Ann"), NewWorker::generalist("Bob")])
            .unwrap();
        h.start_quarter().unwrap();
        let payroll = h.pay_workers().unwrap();
        assert_eq!(payroll.total, d(12_000));
        assert_eq!(
            h.pay_workers(),
            Err(HatcheryError::AlreadySettled(Settlement::Wages))
        );
        assert_eq!(h.settle_fixed_costs().unwrap(), d(1_500));
        assert_eq!(h.cash_balance(), d(-3_500));
    }

    #[test]
    fn close_quarter_rejects_unknown_supplier_without_depreciating() {
        let mut h = staffed(ReferenceData::default_tables(), vec![NewWorker::generalist("Ann")]);
        let before = h.inventory_snapshot();
        assert_eq!(
            h.close_quarter(&SupplierId::from("Nobody")),
            Err(HatcheryError::UnknownSupplier(SupplierId::from("Nobody")))
        );
        assert_eq!(h.inventory_snapshot(), before);
        assert_eq!(h.phase(), Phase::Trading);
    }

    #[test]
    fn full_quarter_balances_the_ledger() {
        let mut h = staffed(ReferenceData::default_tables(), vec![NewWorker::generalist("Ann")]);
        assert!(h.attempt_sale(&pid("Timpani Snapper"), 10).is_success());
        let summary = h
            .run_quarter_close(&SupplierId::from("Slippery Lakes"))
            .unwrap();
        assert_eq!(summary.quarter, 1);
        assert_eq!(summary.revenue, d(3_500));
        assert_eq!(summary.wages, d(6_000));
        assert_eq!(summary.fixed_costs, d(1_500));
        assert_eq!(
            summary.closing_cash,
            summary.opening_cash + summary.revenue - summary.total_expenses
        );
        assert_eq!(h.cash_balance(), summary.closing_cash);
        assert_eq!(h.phase(), Phase::Idle);
        assert_eq!(h.quarter(), 2);
        for level in h.inventory_snapshot().resources {
            assert_eq!(level.primary.quantity, level.primary.capacity);
            assert_eq!(level.secondary.quantity, level.secondary.capacity);
        }
    }

    #[test]
    fn bankruptcy_keeps_debt_and_is_terminal() {
        let mut h = staffed(small_tables(100), vec![NewWorker::generalist("Ann")]);
        assert!(h.attempt_sale(&pid("Guppy"), 9).is_success());
        h.pay_workers().unwrap();
        h.settle_fixed_costs().unwrap();
        // 10000 + 90 - 6000 - 1500 leaves 2590, enough for 9 feed.
        let out = h.close_quarter(&SupplierId::from("Feedco")).unwrap();
        assert!(!out.is_bankrupt());
        h.start_quarter().unwrap();
        h.pay_workers().unwrap();
        h.settle_fixed_costs().unwrap();
        assert!(h.cash_balance() < Decimal::ZERO);
        assert!(h.attempt_sale(&pid("Guppy"), 1).is_success());
        let owed = h.cash_balance();
        match h.close_quarter(&SupplierId::from("Feedco")).unwrap() {
            RestockOutcome::Bankrupt(b) => {
                assert_eq!(b.resource, ResourceKind::from("feed"));
                assert_eq!(b.tier, Tier::Primary);
                assert_eq!(b.cash_remaining, owed);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(h.cash_balance(), owed);
        assert_eq!(h.phase(), Phase::Bankrupt);
        assert_eq!(h.start_quarter(), Err(HatcheryError::Bankrupt));
        assert_eq!(
            h.attempt_sale(&pid("Guppy"), 1),
            SaleOutcome::Error(HatcheryError::Bankrupt)
        );
        assert_eq!(
            h.restock(&SupplierId::from("Feedco")),
            Err(HatcheryError::Bankrupt)
        );
    }

    #[test]
    fn bankruptcy_with_cash_left_keeps_it() {
        let mut tables = small_tables(100);
        tables.suppliers[0].prices[0].unit_price = d(20);
        let config = HatcheryConfig {
            starting_cash: d(5),
            weekly_wage: Decimal::ZERO,
            fixed_quarterly_cost: Decimal::ZERO,
            ..HatcheryConfig::default()
        };
        let mut h = Hatchery::new(config, tables).unwrap();
        h.add_workers(vec![NewWorker::generalist("Ann")]).unwrap();
        h.start_quarter().unwrap();
        assert!(h.attempt_sale(&pid("Guppy"), 9).is_success());
        // refilling 9 feed at 20 costs 180 against 95 on hand
        let summary = h.run_quarter_close(&SupplierId::from("Feedco")).unwrap();
        match &summary.restock {
            RestockOutcome::Bankrupt(b) => {
                assert_eq!(b.cost_needed, d(180));
                assert_eq!(b.cash_remaining, d(95));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(h.cash_balance(), d(95));
        assert_eq!(summary.closing_cash, d(95));
        assert_eq!(summary.restock_cost, Decimal::ZERO);
        assert_eq!(
            summary.closing_cash,
            summary.opening_cash + summary.revenue - summary.total_expenses
        );
        assert_eq!(h.phase(), Phase::Bankrupt);
    }

    #[test]
    fn bankrupt_quarter_summary_still_balances() {
        let mut h = staffed(
            ReferenceData::default_tables(),
            vec![NewWorker::generalist("Ann"), NewWorker::generalist("Bob")],
        );
        let summary = h
            .run_quarter_close(&SupplierId::from("Scaly Wholesaler"))
            .unwrap();
        assert!(summary.restock.is_bankrupt());
        assert_eq!(summary.opening_cash, d(10_000));
        assert_eq!(summary.total_expenses, d(14_403));
        assert_eq!(summary.closing_cash, d(-4_403));
        assert_eq!(
            summary.closing_cash,
            summary.opening_cash + summary.revenue - summary.total_expenses
        );
        assert_eq!(h.cash_balance(), summary.closing_cash);
    }

    #[test]
    fn summary_reports_stock_and_roster_at_close() {
        let mut h = staffed(
            ReferenceData::default_tables(),
            vec![NewWorker::generalist("Ann"), NewWorker::specialist("Sue", "Modal Bass")],
        );
        assert!(h.attempt_sale(&pid("Modal Bass"), 5).is_success());
        let summary = h
            .run_quarter_close(&SupplierId::from("Slippery Lakes"))
            .unwrap();
        assert_eq!(summary.workers, ["Ann", "Sue"]);
        assert_eq!(summary.inventory, h.inventory_snapshot());
        assert_eq!(summary.inventory.resources.len(), 3);
    }

    #[test]
    fn error_outcomes_can_be_cloned() {
        let mut h = staffed(small_tables(100), vec![NewWorker::generalist("Ann")]);
        let outcome = h.attempt_sale(&pid("Shark"), 1);
        let copy = outcome.clone();
        assert_eq!(copy, outcome);
        assert!(matches!(copy, SaleOutcome::Error(HatcheryError::UnknownProduct(_))));
    }

    #[test]
    fn summary_serialises_to_json() {
        let mut h = staffed(ReferenceData::default_tables(), vec![NewWorker::generalist("Ann")]);
        let summary = h
            .run_quarter_close(&SupplierId::from("Scaly Wholesaler"))
            .unwrap();
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"status\":\"restocked\""));
        let back: QuarterSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
    }

    proptest! {
        #[test]
        fn rejected_sales_change_nothing(workers in 1usize..=5, qty in 0u32..60, feed in 0i64..40) {
            let batch = (0..workers).map(|i| NewWorker::generalist(&format!("w{i}"))).collect();
            let mut h = staffed(small_tables(40), batch);
            h.inventory.set_levels(&ResourceKind::from("feed"), d(feed), Decimal::ZERO).unwrap();
            let cash = h.cash_balance();
            let labor = h.available_labor();
            let stock = h.inventory_snapshot();
            let outcome = h.attempt_sale(&pid("Guppy"), qty);
            if outcome.is_success() {
                prop_assert!(h.cash_balance() > cash);
                prop_assert!(h.available_labor() <= labor);
                prop_assert!(h.available_labor() >= Decimal::ZERO);
            } else {
                prop_assert_eq!(h.cash_balance(), cash);
                prop_assert_eq!(h.available_labor(), labor);
                prop_assert_eq!(h.inventory_snapshot(), stock);
            }
        }
    }
}
