#![deny(warnings)]

//! Headless CLI: runs a scenario for N days under a simple restock-and-bake
//! policy and prints per-day and final KPIs.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sim_core::{Catalog, ScenarioConfig, VendorId, MINUTES_PER_DAY};
use sim_runtime::Bakery;
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Units of each product the policy tries to have ready every day.
const DAILY_BAKE_TARGET: f64 = 10.0;
/// Ingredient headroom bought beyond the day's exact requirements.
const RESTOCK_HEADROOM: f64 = 1.1;

struct Args {
    scenario: Option<PathBuf>,
    days: Option<u32>,
    seed: Option<u64>,
    save: Option<PathBuf>,
}

fn parse_args() -> Args {
    let mut args = Args {
        scenario: None,
        days: None,
        seed: None,
        save: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--scenario" => args.scenario = it.next().map(PathBuf::from),
            "--days" => args.days = it.next().and_then(|s| s.parse().ok()),
            "--seed" => args.seed = it.next().and_then(|s| s.parse().ok()),
            "--save" => args.save = it.next().map(PathBuf::from),
            _ => {}
        }
    }
    args
}

fn load_scenario(args: &Args) -> Result<ScenarioConfig> {
    let mut scenario = match &args.scenario {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading scenario {}", path.display()))?;
            serde_yaml::from_str(&text)
                .with_context(|| format!("parsing scenario {}", path.display()))?
        }
        None => ScenarioConfig::default(),
    };
    if let Some(days) = args.days {
        scenario.days = days;
    }
    if let Some(seed) = args.seed {
        scenario.sim.rng_seed = seed;
    }
    Ok(scenario)
}

/// Buy whatever today's bake plan is short of, with a little headroom.
/// The mid-tier vendor keeps delivered quality at catalog base.
fn restock(bakery: &mut Bakery) {
    let vendor = VendorId::new("city-wholesale");
    let plan: Vec<_> = bakery
        .catalog()
        .recipes
        .values()
        .flat_map(|recipe| recipe.requirements(DAILY_BAKE_TARGET))
        .collect();
    for (key, amount) in plan {
        let usable = bakery.inventory().usable_ingredient_stock(&key);
        if usable >= amount {
            continue;
        }
        let buy = (amount - usable) * RESTOCK_HEADROOM;
        if let Err(err) = bakery.purchase_ingredient(&key, &vendor, buy) {
            warn!(ingredient = %key, error = %err, "restock skipped");
        }
    }
}

/// Queue one batch of every recipe; oven pressure and queue limits are
/// the scheduler's problem.
fn bake(bakery: &mut Bakery) {
    let products: Vec<_> = bakery.catalog().recipes.keys().cloned().collect();
    for product in products {
        if let Err(err) = bakery.start_production(&product, DAILY_BAKE_TARGET) {
            warn!(product = %product, error = %err, "bake skipped");
        }
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    let scenario = load_scenario(&args)?;
    info!(
        days = scenario.days,
        seed = scenario.sim.rng_seed,
        sha = env!("GIT_SHA"),
        "starting bakery run"
    );

    let mut bakery = Bakery::new(Catalog::standard(), scenario.sim.clone())?;
    for _ in 0..scenario.days {
        restock(&mut bakery);
        bake(&mut bakery);
        bakery.advance_time(MINUTES_PER_DAY);
        let summary = bakery.end_day();
        println!(
            "day {:>3} | revenue: ${} | profit: ${} | sold: {:.0} | missed: {} | cash: ${}",
            summary.day,
            summary.revenue,
            summary.profit,
            summary.units_sold,
            summary.missed_customers,
            summary.closing_cash
        );
    }

    let stats = bakery.finance().all_time().clone();
    let avg_revenue = if stats.days_operated > 0 {
        (stats.total_revenue / Decimal::from(stats.days_operated)).round_dp(2)
    } else {
        Decimal::ZERO
    };
    println!(
        "KPI | days: {} | revenue: ${} | profit: ${} | avg/day: ${} | transactions: {} | missed: {} | customers: {}",
        stats.days_operated,
        stats.total_revenue,
        stats.total_profit(),
        avg_revenue,
        stats.total_transactions,
        stats.total_missed_customers,
        bakery.customers().len()
    );

    if let Some(path) = &args.save {
        persistence::save_to_path(&bakery.snapshot(), path)?;
        println!("saved snapshot to {}", path.display());
    }

    Ok(())
}
