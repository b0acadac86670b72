#![deny(warnings)]

//! Headless scenario runner: hires staff, sells, and closes quarters until
//! the scenario ends or the hatchery goes bankrupt.

use anyhow::{bail, Context, Result};
use hatchery_core::{HatcheryConfig, ProductId, ReferenceData, SupplierId};
use hatchery_econ::NewWorker;
use hatchery_runtime::{Hatchery, QuarterSummary, SaleOutcome};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    scenario: Option<String>,
    tables: Option<String>,
    quarters: Option<u32>,
    json: bool,
    version: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--scenario" => args.scenario = it.next(),
            "--tables" => args.tables = it.next(),
            "--quarters" => {
                let raw = it.next().context("--quarters needs a value")?;
                let n = raw
                    .parse()
                    .with_context(|| format!("bad quarter count {raw:?}"))?;
                args.quarters = Some(n);
            }
            "--json" => args.json = true,
            "--version" => args.version = true,
            other => warn!(arg = other, "ignoring unknown argument"),
        }
    }
    Ok(args)
}

/// What happens in one quarter of a scenario.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
struct QuarterPlan {
    hire: Vec<NewWorker>,
    release: usize,
    sales: BTreeMap<ProductId, u32>,
    supplier: Option<SupplierId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Scenario {
    config: HatcheryConfig,
    quarters: Vec<QuarterPlan>,
}

fn default_scenario() -> Scenario {
    fn sales(orders: &[(&str, u32)]) -> BTreeMap<ProductId, u32> {
        orders
            .iter()
            .map(|(p, q)| (ProductId::from(*p), *q))
            .collect()
    }
    let orders: [(&str, u32); 3] = [("Fugue Flounder", 15), ("Modal Bass", 25), ("Plagal Cod", 10)];
    Scenario {
        config: HatcheryConfig::default(),
        quarters: vec![
            QuarterPlan {
                hire: vec![
                    NewWorker::specialist("Ana", "Modal Bass"),
                    NewWorker::generalist("Bo"),
                    NewWorker::generalist("Cy"),
                ],
                sales: sales(&orders),
                supplier: Some(SupplierId::from("Slippery Lakes")),
                ..QuarterPlan::default()
            },
            QuarterPlan {
                sales: sales(&orders),
                supplier: Some(SupplierId::from("Scaly Wholesaler")),
                ..QuarterPlan::default()
            },
        ],
    }
}

fn load_scenario(path: Option<&str>) -> Result<Scenario> {
    let Some(path) = path else {
        return Ok(default_scenario());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing scenario {path}"))
}

fn load_tables(path: Option<&str>) -> Result<ReferenceData> {
    let Some(path) = path else {
        return Ok(ReferenceData::default_tables());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    ReferenceData::from_yaml_str(&text).with_context(|| format!("loading tables {path}"))
}

/// Sell as much of each order as possible, falling back once to the largest
/// quantity that would go through.
fn sell(hatchery: &mut Hatchery, sales: &BTreeMap<ProductId, u32>) {
    for (product, &qty) in sales {
        let outcome = hatchery.attempt_sale(product, qty);
        if !outcome.is_insufficient() {
            if let SaleOutcome::Error(e) = &outcome {
                warn!(%product, error = %e, "sale rejected");
            }
            continue;
        }
        match hatchery.max_fulfillable(product) {
            Some(fallback) if fallback > 0 => {
                info!(%product, requested = qty, fallback, "retrying with reduced quantity");
                let retry = hatchery.attempt_sale(product, fallback);
                if !retry.is_success() {
                    warn!(%product, ?retry, "reduced sale failed");
                }
            }
            _ => info!(%product, requested = qty, "nothing sellable, skipped"),
        }
    }
}

fn run(args: &Args) -> Result<Vec<QuarterSummary>> {
    let scenario = load_scenario(args.scenario.as_deref())?;
    let reference = load_tables(args.tables.as_deref())?;
    let max = scenario.config.max_quarters;
    let quarters = args.quarters.unwrap_or(max);
    if quarters == 0 || quarters > max {
        bail!("quarter count must be within 1..={max}, got {quarters}");
    }
    let fallback_supplier = reference
        .supplier_ids()
        .next()
        .cloned()
        .context("reference tables list no suppliers")?;

    let mut hatchery = Hatchery::new(scenario.config, reference)?;
    info!(name = %hatchery.config().name, quarters, "opening hatchery");

    let mut summaries = Vec::new();
    let mut last = QuarterPlan::default();
    for q in 0..quarters as usize {
        // Quarters past the end of the scenario repeat its last orders.
        let plan = match scenario.quarters.get(q) {
            Some(plan) => plan.clone(),
            None => QuarterPlan {
                hire: Vec::new(),
                release: 0,
                ..last.clone()
            },
        };
        if !plan.hire.is_empty() {
            hatchery.add_workers(plan.hire.clone())?;
        }
        if plan.release > 0 {
            hatchery.remove_workers(plan.release)?;
        }
        hatchery.start_quarter()?;
        sell(&mut hatchery, &plan.sales);
        let supplier = plan.supplier.clone().unwrap_or_else(|| fallback_supplier.clone());
        let summary = hatchery.run_quarter_close(&supplier)?;
        let bankrupt = summary.restock.is_bankrupt();
        summaries.push(summary);
        if bankrupt {
            warn!(quarter = q + 1, "hatchery went bankrupt");
            break;
        }
        last = plan;
    }
    Ok(summaries)
}

fn print_report(summaries: &[QuarterSummary]) {
    for s in summaries {
        let units: u32 = s.sales.iter().map(|p| p.quantity).sum();
        println!(
            "Q{} | units: {} | revenue: {} | wages: {} | fixed: {} | storage: {} | restock: {} | cash: {} -> {}{}",
            s.quarter,
            units,
            s.revenue.round_dp(2),
            s.wages.round_dp(2),
            s.fixed_costs.round_dp(2),
            s.storage_costs.round_dp(2),
            s.restock_cost.round_dp(2),
            s.opening_cash.round_dp(2),
            s.closing_cash.round_dp(2),
            if s.restock.is_bankrupt() { " | BANKRUPT" } else { "" },
        );
        for p in &s.sales {
            println!("    {}: {} units for {}", p.product, p.quantity, p.revenue.round_dp(2));
        }
    }
    let profit: Decimal = summaries.iter().map(|s| s.revenue - s.total_expenses).sum();
    println!(
        "Quarters run: {} | net result: {}",
        summaries.len(),
        profit.round_dp(2)
    );
    if let Some(last) = summaries.last() {
        println!("Workers: {}", last.workers.join(", "));
        for r in &last.inventory.resources {
            println!(
                "    {}: primary {}/{} | secondary {}/{}",
                r.resource,
                r.primary.quantity,
                r.primary.capacity,
                r.secondary.quantity,
                r.secondary.capacity
            );
        }
    }
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    if args.version {
        println!(
            "hatchery {} ({})",
            env!("CARGO_PKG_VERSION"),
            env!("HATCHERY_GIT_SHA")
        );
        return Ok(());
    }
    info!(?args, "starting scenario runner");

    let summaries = run(&args)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        print_report(&summaries);
    }
    Ok(())
}
