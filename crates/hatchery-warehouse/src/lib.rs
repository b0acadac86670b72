#![deny(warnings)]

//! Two-tier warehouse for perishable hatchery resources.
//!
//! Every resource kind is held in a primary and a secondary tier with
//! independent capacities. Deductions drain primary before secondary,
//! depreciation shrinks both tiers once per quarter, and restocking refills
//! tiers to capacity against a cash budget until the money runs out.

use hatchery_core::{ResourceKind, StorageSpec, SupplierPriceList, Tier, WarehouseSpec};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Not enough of a resource across both tiers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceShortage {
    pub resource: ResourceKind,
    /// Amount missing: requested minus available.
    pub needed: Decimal,
    /// Amount on hand across both tiers.
    pub available: Decimal,
}

/// Errors produced by inventory operations. None of them mutate stock.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum InventoryError {
    #[error("unknown resource: {0}")]
    UnknownResource(ResourceKind),
    #[error("cannot deduct a negative amount ({amount}) of {resource}")]
    NegativeAmount {
        resource: ResourceKind,
        amount: Decimal,
    },
    #[error("insufficient {}: need {} more, {} available", .0.resource, .0.needed, .0.available)]
    Shortage(ResourceShortage),
}

/// Unit prices the warehouse pays when restocking.
pub trait PriceSource {
    /// Price per unit of `resource`, or `None` when it is not offered.
    fn unit_price(&self, resource: &ResourceKind) -> Option<Decimal>;
}

impl PriceSource for SupplierPriceList {
    fn unit_price(&self, resource: &ResourceKind) -> Option<Decimal> {
        self.price_of(resource)
    }
}

impl PriceSource for BTreeMap<ResourceKind, Decimal> {
    fn unit_price(&self, resource: &ResourceKind) -> Option<Decimal> {
        self.get(resource).copied()
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Stock {
    spec: StorageSpec,
    primary: Decimal,
    secondary: Decimal,
}

impl Stock {
    fn available(&self) -> Decimal {
        self.primary + self.secondary
    }

    fn level(&self, tier: Tier) -> Decimal {
        match tier {
            Tier::Primary => self.primary,
            Tier::Secondary => self.secondary,
        }
    }

    fn level_mut(&mut self, tier: Tier) -> &mut Decimal {
        match tier {
            Tier::Primary => &mut self.primary,
            Tier::Secondary => &mut self.secondary,
        }
    }
}

/// Quantity and capacity of one tier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierLevel {
    pub quantity: Decimal,
    pub capacity: Decimal,
}

/// Both tiers of one resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceLevel {
    pub resource: ResourceKind,
    pub primary: TierLevel,
    pub secondary: TierLevel,
}

/// Point-in-time copy of the warehouse, in declaration order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub resources: Vec<ResourceLevel>,
}

/// Storage cost of one resource, per tier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceStorageCost {
    pub resource: ResourceKind,
    pub primary: Decimal,
    pub secondary: Decimal,
}

/// Quarterly storage bill.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorageCost {
    pub per_resource: Vec<ResourceStorageCost>,
    pub total: Decimal,
}

/// Restock could not be paid for. Tiers filled before this point stay filled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bankruptcy {
    pub resource: ResourceKind,
    pub tier: Tier,
    /// Cost of filling the tier that could not be paid for.
    pub cost_needed: Decimal,
    /// Cash left after the restocks that did go through.
    pub cash_remaining: Decimal,
    /// Amount spent on restocks before the abort.
    pub spent: Decimal,
}

/// Result of a full restock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RestockOutcome {
    Restocked {
        total_cost: Decimal,
        cash_remaining: Decimal,
    },
    Bankrupt(Bankruptcy),
}

impl RestockOutcome {
    pub fn is_bankrupt(&self) -> bool {
        matches!(self, RestockOutcome::Bankrupt(_))
    }
}

/// The hatchery warehouse.
#[derive(Clone, Debug, PartialEq)]
pub struct Inventory {
    stocks: Vec<Stock>,
}

impl Inventory {
    /// A warehouse with every tier filled to capacity.
    pub fn full(spec: &WarehouseSpec) -> Self {
        let stocks = spec
            .resources
            .iter()
            .map(|s| Stock {
                spec: s.clone(),
                primary: s.primary_capacity,
                secondary: s.secondary_capacity,
            })
            .collect();
        Self { stocks }
    }

    /// A warehouse with every tier empty.
    pub fn empty(spec: &WarehouseSpec) -> Self {
        let mut inv = Self::full(spec);
        for s in &mut inv.stocks {
            s.primary = Decimal::ZERO;
            s.secondary = Decimal::ZERO;
        }
        inv
    }

    fn stock(&self, resource: &ResourceKind) -> Option<&Stock> {
        self.stocks.iter().find(|s| &s.spec.resource == resource)
    }

    fn stock_mut(&mut self, resource: &ResourceKind) -> Result<&mut Stock, InventoryError> {
        self.stocks
            .iter_mut()
            .find(|s| &s.spec.resource == resource)
            .ok_or_else(|| InventoryError::UnknownResource(resource.clone()))
    }

    /// Resource kinds in declaration order.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceKind> {
        self.stocks.iter().map(|s| &s.spec.resource)
    }

    /// Overwrite both tier levels of a resource, clamped into `[0, capacity]`.
    pub fn set_levels(
        &mut self,
        resource: &ResourceKind,
        primary: Decimal,
        secondary: Decimal,
    ) -> Result<(), InventoryError> {
        let s = self.stock_mut(resource)?;
        s.primary = primary.clamp(Decimal::ZERO, s.spec.primary_capacity);
        s.secondary = secondary.clamp(Decimal::ZERO, s.spec.secondary_capacity);
        Ok(())
    }

    pub fn quantity(&self, resource: &ResourceKind, tier: Tier) -> Option<Decimal> {
        self.stock(resource).map(|s| s.level(tier))
    }

    pub fn capacity(&self, resource: &ResourceKind, tier: Tier) -> Option<Decimal> {
        self.stock(resource).map(|s| s.spec.capacity(tier))
    }

    /// Stock on hand across both tiers, or `None` for an unknown resource.
    pub fn availability(&self, resource: &ResourceKind) -> Option<Decimal> {
        self.stock(resource).map(Stock::available)
    }

    /// Remove `amount` of `resource`, primary tier first.
    ///
    /// All or nothing: when both tiers together hold less than `amount` the
    /// shortage is reported and neither tier changes.
    pub fn deduct(&mut self, resource: &ResourceKind, amount: Decimal) -> Result<(), InventoryError> {
        if amount < Decimal::ZERO {
            return Err(InventoryError::NegativeAmount {
                resource: resource.clone(),
                amount,
            });
        }
        let s = self.stock_mut(resource)?;
        let available = s.available();
        if available < amount {
            return Err(InventoryError::Shortage(ResourceShortage {
                resource: resource.clone(),
                needed: amount - available,
                available,
            }));
        }
        let from_primary = amount.min(s.primary);
        s.primary -= from_primary;
        s.secondary = (s.secondary - (amount - from_primary)).max(Decimal::ZERO);
        debug!(%resource, %amount, primary = %s.primary, secondary = %s.secondary, "deducted");
        Ok(())
    }

    /// Shrink every tier by its resource's depreciation rate, rounding to whole units.
    ///
    /// Rounding never lifts a tier above its capacity, which matters when a
    /// capacity is fractional.
    pub fn apply_depreciation(&mut self) {
        for s in &mut self.stocks {
            let keep = Decimal::ONE - s.spec.depreciation_rate;
            for tier in Tier::ALL {
                let capacity = s.spec.capacity(tier);
                let level = s.level_mut(tier);
                *level = (*level * keep).round().clamp(Decimal::ZERO, capacity);
            }
        }
        debug!("applied depreciation");
    }

    /// Storage cost of current stock per resource and tier.
    pub fn storage_cost(&self) -> StorageCost {
        let per_resource: Vec<ResourceStorageCost> = self
            .stocks
            .iter()
            .map(|s| ResourceStorageCost {
                resource: s.spec.resource.clone(),
                primary: s.spec.unit_storage_cost * s.primary,
                secondary: s.spec.unit_storage_cost * s.secondary,
            })
            .collect();
        let total = per_resource.iter().map(|c| c.primary + c.secondary).sum();
        StorageCost {
            per_resource,
            total,
        }
    }

    /// Refill every tier to capacity, paying from `available_cash`.
    ///
    /// Resources are visited in declaration order, primary tier before
    /// secondary. Resources the price source does not quote are skipped. The
    /// first tier whose cost exceeds the remaining cash aborts the whole
    /// operation; tiers already refilled are kept.
    pub fn restock_to_full<P: PriceSource + ?Sized>(
        &mut self,
        prices: &P,
        available_cash: Decimal,
    ) -> RestockOutcome {
        let mut cash = available_cash;
        let mut spent = Decimal::ZERO;
        for s in &mut self.stocks {
            let Some(price) = prices.unit_price(&s.spec.resource) else {
                debug!(resource = %s.spec.resource, "no quote, skipping restock");
                continue;
            };
            for tier in Tier::ALL {
                let capacity = s.spec.capacity(tier);
                // An overflowing bill is unaffordable at any cash level.
                let cost = price
                    .checked_mul(capacity - s.level(tier))
                    .unwrap_or(Decimal::MAX);
                if cash < cost {
                    warn!(
                        resource = %s.spec.resource,
                        %tier,
                        %cost,
                        %cash,
                        "restock unaffordable"
                    );
                    return RestockOutcome::Bankrupt(Bankruptcy {
                        resource: s.spec.resource.clone(),
                        tier,
                        cost_needed: cost,
                        cash_remaining: cash,
                        spent,
                    });
                }
                *s.level_mut(tier) = capacity;
                cash -= cost;
                spent += cost;
            }
        }
        info!(total_cost = %spent, cash_remaining = %cash, "restocked to full");
        RestockOutcome::Restocked {
            total_cost: spent,
            cash_remaining: cash,
        }
    }

    pub fn snapshot(&self) -> InventorySnapshot {
        let resources = self
            .stocks
            .iter()
            .map(|s| ResourceLevel {
                resource: s.spec.resource.clone(),
                primary: TierLevel {
                    quantity: s.primary,
                    capacity: s.spec.primary_capacity,
                },
                secondary: TierLevel {
                    quantity: s.secondary,
                    capacity: s.spec.secondary_capacity,
                },
            })
            .collect();
        InventorySnapshot { resources }
    }
}
