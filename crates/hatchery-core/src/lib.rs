#![deny(warnings)]

//! Core reference data and invariants for Hatchery Tycoon.
//!
//! This crate defines the read-only tables the simulation consumes (species
//! resource coefficients, customer demand, supplier price lists, warehouse
//! tiers) together with the business configuration and validation helpers.
//! Tables are plain values injected into the engine, so tests can swap in
//! alternate data.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Working days in one labor-week; maintenance times are quoted in days.
pub const WORKING_DAYS_PER_WEEK: i64 = 5;
/// Labor-weeks each worker provides per quarter.
pub const LABOR_WEEKS_PER_WORKER: i64 = 9;
/// Weekly wage per worker.
pub const WEEKLY_WAGE: i64 = 500;
/// Paid weeks per quarter.
pub const WAGE_WEEKS_PER_QUARTER: i64 = 12;
/// Smallest roster the hatchery may operate with.
pub const MIN_WORKERS: usize = 1;
/// Largest roster the hatchery may employ.
pub const MAX_WORKERS: usize = 5;
/// Rent and utilities charged every quarter.
pub const FIXED_QUARTERLY_COST: i64 = 1500;
/// Opening cash balance.
pub const STARTING_CASH: i64 = 10_000;
/// Longest simulation the business rules allow, in quarters.
pub const MAX_QUARTERS: u32 = 8;
/// Largest price, quantity, coefficient or balance accepted from tables and config.
pub const MAX_TABLE_VALUE: i64 = 1_000_000_000_000;
/// Largest quarterly demand accepted for a product.
pub const MAX_DEMAND: u32 = 1_000_000;

/// Identifier of a sellable product (a fish species), e.g. "Clef Fins".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

/// Identifier of a raw resource kind, e.g. "fertiliser".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKind(pub String);

/// Identifier of a supplier, e.g. "Slippery Lakes".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplierId(pub String);

macro_rules! string_id {
    ($ty:ident) => {
        impl $ty {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(s: &str) -> Self {
                $ty(s.to_string())
            }
        }
    };
}

string_id!(ProductId);
string_id!(ResourceKind);
string_id!(SupplierId);

/// Storage tier of the warehouse. Primary is always drawn down first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Primary,
    Secondary,
}

impl Tier {
    /// Tiers in draw-down and restock order.
    pub const ALL: [Tier; 2] = [Tier::Primary, Tier::Secondary];
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Primary => f.write_str("primary"),
            Tier::Secondary => f.write_str("secondary"),
        }
    }
}

/// Amount of one resource consumed per unit of product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceNeed {
    pub resource: ResourceKind,
    pub per_unit: Decimal,
}

/// Static production data for one product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductSpec {
    pub id: ProductId,
    /// Resource consumption per unit, in declaration order.
    pub consumption: Vec<ResourceNeed>,
    /// Maintenance time per unit in working days.
    pub maintenance_days: Decimal,
}

impl ProductSpec {
    /// Labor-weeks required per unit.
    pub fn maintenance_weeks(&self) -> Decimal {
        self.maintenance_days / Decimal::from(WORKING_DAYS_PER_WEEK)
    }

    /// Labor-weeks required for `quantity` units, before any specialist discount.
    pub fn maintenance_for(&self, quantity: u32) -> Decimal {
        self.maintenance_weeks() * Decimal::from(quantity)
    }

    /// Total resource needs for `quantity` units, in declaration order.
    pub fn resource_needs(&self, quantity: u32) -> Vec<(ResourceKind, Decimal)> {
        let q = Decimal::from(quantity);
        self.consumption
            .iter()
            .map(|n| (n.resource.clone(), n.per_unit * q))
            .collect()
    }
}

/// Per-product resource coefficients, keyed by product id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceCatalog {
    products: Vec<ProductSpec>,
}

impl ResourceCatalog {
    pub fn new(products: Vec<ProductSpec>) -> Self {
        Self { products }
    }

    pub fn get(&self, id: &ProductId) -> Option<&ProductSpec> {
        self.products.iter().find(|p| &p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProductSpec> {
        self.products.iter()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Quarterly customer demand and unit price for a product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub product: ProductId,
    /// Maximum units customers take per quarter.
    pub demand: u32,
    pub price: Decimal,
}

/// Unit price a supplier charges for one resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourcePrice {
    pub resource: ResourceKind,
    pub unit_price: Decimal,
}

/// A supplier's price list. Resources it does not quote cannot be bought from it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupplierPriceList {
    pub id: SupplierId,
    pub prices: Vec<ResourcePrice>,
}

impl SupplierPriceList {
    pub fn price_of(&self, resource: &ResourceKind) -> Option<Decimal> {
        self.prices
            .iter()
            .find(|p| &p.resource == resource)
            .map(|p| p.unit_price)
    }
}

/// Storage parameters for one resource kind across both tiers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorageSpec {
    pub resource: ResourceKind,
    pub primary_capacity: Decimal,
    pub secondary_capacity: Decimal,
    /// Fraction of stock lost per quarter, in [0, 1].
    pub depreciation_rate: Decimal,
    /// Storage cost per unit held per quarter.
    pub unit_storage_cost: Decimal,
}

impl StorageSpec {
    pub fn capacity(&self, tier: Tier) -> Decimal {
        match tier {
            Tier::Primary => self.primary_capacity,
            Tier::Secondary => self.secondary_capacity,
        }
    }
}

/// Warehouse layout. Declaration order is the iteration order used by restocking.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WarehouseSpec {
    pub resources: Vec<StorageSpec>,
}

impl WarehouseSpec {
    pub fn get(&self, resource: &ResourceKind) -> Option<&StorageSpec> {
        self.resources.iter().find(|r| &r.resource == resource)
    }
}

/// All static tables the simulation reads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    pub catalog: ResourceCatalog,
    pub market: Vec<MarketQuote>,
    pub suppliers: Vec<SupplierPriceList>,
    pub warehouse: WarehouseSpec,
}

impl ReferenceData {
    pub fn product(&self, id: &ProductId) -> Option<&ProductSpec> {
        self.catalog.get(id)
    }

    pub fn quote(&self, id: &ProductId) -> Option<&MarketQuote> {
        self.market.iter().find(|q| &q.product == id)
    }

    pub fn supplier(&self, id: &SupplierId) -> Option<&SupplierPriceList> {
        self.suppliers.iter().find(|s| &s.id == id)
    }

    /// Supplier ids in declaration order.
    pub fn supplier_ids(&self) -> impl Iterator<Item = &SupplierId> {
        self.suppliers.iter().map(|s| &s.id)
    }

    /// Parse tables from YAML and validate them.
    pub fn from_yaml_str(text: &str) -> Result<Self, LoadError> {
        let data: ReferenceData =
            serde_yaml::from_str(text).map_err(|e| LoadError::Parse(e.to_string()))?;
        validate_reference(&data)?;
        debug!(
            products = data.catalog.len(),
            suppliers = data.suppliers.len(),
            resources = data.warehouse.resources.len(),
            "loaded reference data"
        );
        Ok(data)
    }

    /// The hatchery's published tables.
    pub fn default_tables() -> Self {
        fn product(id: &str, fert: i64, feed: i64, salt: i64, days_tenths: i64) -> ProductSpec {
            ProductSpec {
                id: ProductId::from(id),
                consumption: vec![
                    need("fertiliser", Decimal::new(fert, 0)),
                    need("feed", Decimal::new(feed, 0)),
                    need("salt", Decimal::new(salt, 0)),
                ],
                maintenance_days: Decimal::new(days_tenths, 1),
            }
        }
        fn need(resource: &str, per_unit: Decimal) -> ResourceNeed {
            ResourceNeed {
                resource: ResourceKind::from(resource),
                per_unit,
            }
        }
        fn quote(id: &str, demand: u32, price: i64) -> MarketQuote {
            MarketQuote {
                product: ProductId::from(id),
                demand,
                price: Decimal::new(price, 0),
            }
        }
        fn price(resource: &str, unit_price: Decimal) -> ResourcePrice {
            ResourcePrice {
                resource: ResourceKind::from(resource),
                unit_price,
            }
        }
        fn storage(
            resource: &str,
            primary: i64,
            secondary: i64,
            rate: Decimal,
            cost: Decimal,
        ) -> StorageSpec {
            StorageSpec {
                resource: ResourceKind::from(resource),
                primary_capacity: Decimal::new(primary, 0),
                secondary_capacity: Decimal::new(secondary, 0),
                depreciation_rate: rate,
                unit_storage_cost: cost,
            }
        }

        ReferenceData {
            catalog: ResourceCatalog::new(vec![
                product("Clef Fins", 100, 12, 2, 20),
                product("Timpani Snapper", 50, 9, 2, 10),
                product("Andalusian Brim", 90, 6, 2, 5),
                product("Plagal Cod", 100, 10, 2, 20),
                product("Fugue Flounder", 200, 12, 2, 25),
                product("Modal Bass", 300, 12, 6, 30),
            ]),
            market: vec![
                quote("Clef Fins", 25, 250),
                quote("Timpani Snapper", 10, 350),
                quote("Andalusian Brim", 15, 250),
                quote("Plagal Cod", 20, 400),
                quote("Fugue Flounder", 30, 550),
                quote("Modal Bass", 50, 500),
            ],
            suppliers: vec![
                SupplierPriceList {
                    id: SupplierId::from("Slippery Lakes"),
                    prices: vec![
                        // 0.30 per litre; fertiliser is stocked in ml
                        price("fertiliser", Decimal::new(3, 4)),
                        price("feed", Decimal::new(1, 1)),
                        price("salt", Decimal::new(5, 2)),
                    ],
                },
                SupplierPriceList {
                    id: SupplierId::from("Scaly Wholesaler"),
                    prices: vec![
                        price("fertiliser", Decimal::new(2, 4)),
                        price("feed", Decimal::new(4, 1)),
                        price("salt", Decimal::new(25, 2)),
                    ],
                },
            ],
            warehouse: WarehouseSpec {
                resources: vec![
                    storage(
                        "fertiliser",
                        20_000,
                        10_000,
                        Decimal::new(4, 1),
                        Decimal::new(1, 4),
                    ),
                    storage("feed", 400, 200, Decimal::new(1, 1), Decimal::ONE),
                    storage("salt", 200, 100, Decimal::ZERO, Decimal::ONE),
                ],
            },
        }
    }
}

/// Business constants for one hatchery run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HatcheryConfig {
    /// Display name of the hatchery.
    pub name: String,
    pub starting_cash: Decimal,
    pub weekly_wage: Decimal,
    pub wage_weeks_per_quarter: Decimal,
    pub labor_weeks_per_worker: Decimal,
    pub min_workers: usize,
    pub max_workers: usize,
    pub fixed_quarterly_cost: Decimal,
    /// Longest run a scenario may request.
    pub max_quarters: u32,
}

impl Default for HatcheryConfig {
    fn default() -> Self {
        Self {
            name: "Eastaboga".to_string(),
            starting_cash: Decimal::from(STARTING_CASH),
            weekly_wage: Decimal::from(WEEKLY_WAGE),
            wage_weeks_per_quarter: Decimal::from(WAGE_WEEKS_PER_QUARTER),
            labor_weeks_per_worker: Decimal::from(LABOR_WEEKS_PER_WORKER),
            min_workers: MIN_WORKERS,
            max_workers: MAX_WORKERS,
            fixed_quarterly_cost: Decimal::from(FIXED_QUARTERLY_COST),
            max_quarters: MAX_QUARTERS,
        }
    }
}

impl HatcheryConfig {
    /// Wage one worker earns per quarter.
    pub fn quarterly_wage(&self) -> Decimal {
        self.weekly_wage * self.wage_weeks_per_quarter
    }
}

/// Validation errors for reference data and configuration.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Identifier must not be blank.
    #[error("blank identifier")]
    BlankId,
    /// Identifier declared twice in the same table.
    #[error("duplicate identifier: {0}")]
    DuplicateId(String),
    /// Quantities, capacities and coefficients must be non-negative.
    #[error("negative quantity for {0}")]
    NegativeQuantity(String),
    /// Prices and costs must be non-negative.
    #[error("negative monetary value for {0}")]
    NegativeMoney(String),
    /// Depreciation rate must be within [0, 1].
    #[error("depreciation rate for {0} must be within [0,1]")]
    InvalidRate(String),
    /// A table refers to a product the catalog does not define.
    #[error("unknown product: {0}")]
    UnknownProduct(String),
    /// A product consumes a resource the warehouse cannot store.
    #[error("product {product} consumes unstored resource {resource}")]
    UnstoredResource { product: String, resource: String },
    /// Value too large for the simulation's arithmetic.
    #[error("value for {0} exceeds the supported range")]
    OutOfRange(String),
    /// Roster bounds must satisfy 0 < min <= max.
    #[error("invalid roster bounds [{min}, {max}]")]
    RosterBounds { min: usize, max: usize },
}

/// Failure to load tables from text.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum LoadError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

fn within_range(v: Decimal) -> bool {
    v <= Decimal::from(MAX_TABLE_VALUE)
}

fn check_id(id: &str, seen: &mut BTreeSet<String>) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::BlankId);
    }
    if !seen.insert(id.to_string()) {
        return Err(ValidationError::DuplicateId(id.to_string()));
    }
    Ok(())
}

/// Validate a product's coefficients.
pub fn validate_product(p: &ProductSpec) -> Result<(), ValidationError> {
    if p.maintenance_days < Decimal::ZERO {
        return Err(ValidationError::NegativeQuantity(p.id.0.clone()));
    }
    if !within_range(p.maintenance_days) {
        return Err(ValidationError::OutOfRange(p.id.0.clone()));
    }
    let mut seen = BTreeSet::new();
    for need in &p.consumption {
        check_id(need.resource.as_str(), &mut seen)?;
        if need.per_unit < Decimal::ZERO {
            return Err(ValidationError::NegativeQuantity(format!(
                "{}/{}",
                p.id, need.resource
            )));
        }
        if !within_range(need.per_unit) {
            return Err(ValidationError::OutOfRange(format!(
                "{}/{}",
                p.id, need.resource
            )));
        }
    }
    Ok(())
}

/// Validate one resource's storage parameters.
pub fn validate_storage(s: &StorageSpec) -> Result<(), ValidationError> {
    if s.primary_capacity < Decimal::ZERO || s.secondary_capacity < Decimal::ZERO {
        return Err(ValidationError::NegativeQuantity(s.resource.0.clone()));
    }
    if s.depreciation_rate < Decimal::ZERO || s.depreciation_rate > Decimal::ONE {
        return Err(ValidationError::InvalidRate(s.resource.0.clone()));
    }
    if s.unit_storage_cost < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney(s.resource.0.clone()));
    }
    if [s.primary_capacity, s.secondary_capacity, s.unit_storage_cost]
        .into_iter()
        .any(|v| !within_range(v))
    {
        return Err(ValidationError::OutOfRange(s.resource.0.clone()));
    }
    Ok(())
}

/// Validate a supplier's price list.
pub fn validate_supplier(s: &SupplierPriceList) -> Result<(), ValidationError> {
    let mut seen = BTreeSet::new();
    for p in &s.prices {
        check_id(p.resource.as_str(), &mut seen)?;
        if p.unit_price < Decimal::ZERO {
            return Err(ValidationError::NegativeMoney(format!(
                "{}/{}",
                s.id, p.resource
            )));
        }
        if !within_range(p.unit_price) {
            return Err(ValidationError::OutOfRange(format!(
                "{}/{}",
                s.id, p.resource
            )));
        }
    }
    Ok(())
}

/// Validate all tables, including cross-references between them.
pub fn validate_reference(data: &ReferenceData) -> Result<(), ValidationError> {
    let mut resources = BTreeSet::new();
    for s in &data.warehouse.resources {
        check_id(s.resource.as_str(), &mut resources)?;
        validate_storage(s)?;
    }

    let mut products = BTreeSet::new();
    for p in data.catalog.iter() {
        check_id(p.id.as_str(), &mut products)?;
        validate_product(p)?;
        for need in &p.consumption {
            if !resources.contains(need.resource.as_str()) {
                return Err(ValidationError::UnstoredResource {
                    product: p.id.0.clone(),
                    resource: need.resource.0.clone(),
                });
            }
        }
    }

    let mut quoted = BTreeSet::new();
    for q in &data.market {
        if !products.contains(q.product.as_str()) {
            return Err(ValidationError::UnknownProduct(q.product.0.clone()));
        }
        check_id(q.product.as_str(), &mut quoted)?;
        if q.price < Decimal::ZERO {
            return Err(ValidationError::NegativeMoney(q.product.0.clone()));
        }
        if !within_range(q.price) || q.demand > MAX_DEMAND {
            return Err(ValidationError::OutOfRange(q.product.0.clone()));
        }
    }

    let mut suppliers = BTreeSet::new();
    for s in &data.suppliers {
        check_id(s.id.as_str(), &mut suppliers)?;
        validate_supplier(s)?;
    }
    Ok(())
}

/// Validate business constants.
pub fn validate_config(c: &HatcheryConfig) -> Result<(), ValidationError> {
    if c.min_workers == 0 || c.min_workers > c.max_workers {
        return Err(ValidationError::RosterBounds {
            min: c.min_workers,
            max: c.max_workers,
        });
    }
    if c.starting_cash < Decimal::ZERO
        || c.weekly_wage < Decimal::ZERO
        || c.fixed_quarterly_cost < Decimal::ZERO
    {
        return Err(ValidationError::NegativeMoney("config".to_string()));
    }
    if c.wage_weeks_per_quarter < Decimal::ZERO || c.labor_weeks_per_worker < Decimal::ZERO {
        return Err(ValidationError::NegativeQuantity("config".to_string()));
    }
    if [
        c.starting_cash,
        c.weekly_wage,
        c.fixed_quarterly_cost,
        c.wage_weeks_per_quarter,
        c.labor_weeks_per_worker,
    ]
    .into_iter()
    .any(|v| !within_range(v))
    {
        return Err(ValidationError::OutOfRange("config".to_string()));
    }
    Ok(())
}
