//! LRC Tradeoff CLI
//!
//! Inspect placements, encode/decode graphs and repair costs of Azure-style
//! LRC schemes, and verify decode plans end to end on synthetic stripes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        lrc-tradeoff CLI                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐       │
//! │  │   Policy /   │───▶│  LrcScheme   │───▶│  Executor /  │       │
//! │  │  Inline Args │    │   (plans)    │    │    Cost      │       │
//! │  └──────────────┘    └──────────────┘    └──────────────┘       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lrc_tradeoff::ec::cost::RepairCost;
use lrc_tradeoff::ec::StripeBuffers;
use lrc_tradeoff::lrc::{
    check_single_domain_tolerance, measure_average_cost, plan_cost, tradeoff_curve, Approach,
    DecodePlan, LrcScheme, SchemeKind,
};
use lrc_tradeoff::{metrics, PolicyRegistry};

// =============================================================================
// CLI Arguments
// =============================================================================

/// LRC Tradeoff - fault-domain aware LRC repair and maintenance planning
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    scheme: SchemeArgs,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Print Prometheus metrics after the command
    #[arg(long, global = true)]
    metrics: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,
}

#[derive(clap::Args, Debug)]
struct SchemeArgs {
    /// YAML policy file
    #[arg(long, env = "LRC_POLICY_FILE", global = true, requires = "policy_id")]
    policy_file: Option<String>,

    /// Policy id inside the policy file
    #[arg(long, env = "LRC_POLICY_ID", global = true)]
    policy_id: Option<String>,

    /// Scheme class (flat, tradeoff, opt-repair, opt-maintenance)
    #[arg(long, default_value = "tradeoff", global = true)]
    scheme: SchemeKind,

    /// Data blocks
    #[arg(long, default_value = "9", global = true)]
    k: usize,

    /// Local parity blocks
    #[arg(long, default_value = "3", global = true)]
    l: usize,

    /// Global parity blocks
    #[arg(long, default_value = "3", global = true)]
    g: usize,

    /// Clustering granularity (tradeoff only)
    #[arg(long, default_value = "0", global = true)]
    eta: usize,

    /// Decode approach (repair, maintenance)
    #[arg(long, default_value = "repair", global = true)]
    approach: Approach,

    /// Sub-packetization
    #[arg(long, default_value = "1", global = true)]
    w: usize,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the fault-domain layout
    Place,

    /// Show the encode graph
    Encode,

    /// Plan the recovery of one block
    Decode {
        /// Block to recover
        #[arg(long)]
        failed: usize,

        /// Available blocks (default: derived from the approach)
        #[arg(long, value_delimiter = ',')]
        available: Option<Vec<usize>>,
    },

    /// Encode a synthetic stripe, lose blocks, decode and compare
    Verify {
        /// Block to recover; every data block when omitted
        #[arg(long)]
        failed: Option<usize>,

        /// Bytes per block
        #[arg(long, default_value = "4096")]
        block_size: usize,

        /// Seed for the synthetic data
        #[arg(long, default_value = "1")]
        seed: u64,
    },

    /// Closed-form ADC/AMC for every eta of (k, l, g)
    Tradeoff,

    /// Measured average repair/maintenance cost of the scheme
    Cost,
}

// =============================================================================
// Main
// =============================================================================

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    let scheme = build_scheme(&args.scheme)?;
    info!(scheme = %scheme.name(), approach = %scheme.approach(), "scheme ready");

    match &args.command {
        Command::Place => cmd_place(&scheme, args.json)?,
        Command::Encode => emit(args.json, &scheme.encode()?, |g| {
            g.nodes()
                .iter()
                .map(|n| format!("{} <- {:?} * {:?}", n.target, n.sources, n.coefficients))
                .collect::<Vec<_>>()
                .join("\n")
        })?,
        Command::Decode { failed, available } => {
            cmd_decode(&scheme, *failed, available.clone(), args.json)?
        }
        Command::Verify {
            failed,
            block_size,
            seed,
        } => cmd_verify(&scheme, *failed, *block_size, *seed)?,
        Command::Tradeoff => {
            let curve = tradeoff_curve(scheme.k(), scheme.l(), scheme.g())?;
            emit(args.json, &curve, |curve| {
                curve
                    .iter()
                    .map(|p| format!("eta = {}, ADC = {}, AMC = {:.4}", p.eta, p.adc, p.amc))
                    .collect::<Vec<_>>()
                    .join("\n")
            })?
        }
        Command::Cost => {
            let avg = measure_average_cost(&scheme)?;
            emit(args.json, &avg, |a| {
                format!(
                    "{}: blocks read {:.4}, fault domains touched {:.4}, bandwidth {:.4}",
                    a.approach, a.blocks_read, a.domains_touched, a.normalized_bandwidth
                )
            })?
        }
    }

    if args.metrics {
        print!("{}", metrics::render()?);
    }

    Ok(())
}

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

// =============================================================================
// Scheme Selection
// =============================================================================

fn build_scheme(args: &SchemeArgs) -> anyhow::Result<LrcScheme> {
    if let Some(id) = &args.policy_id {
        let path = args
            .policy_file
            .as_deref()
            .context("--policy-id needs --policy-file")?;
        let registry = PolicyRegistry::load(path)
            .with_context(|| format!("loading policy file {}", path))?;
        return registry
            .create_scheme(id)
            .with_context(|| format!("creating scheme for policy {}", id));
    }

    let (l, g) = (args.l.to_string(), args.g.to_string());
    let approach = args.approach.code().to_string();
    let params = match args.scheme {
        SchemeKind::Flat => vec![l, g],
        SchemeKind::Tradeoff => vec![l, g, args.eta.to_string(), approach],
        SchemeKind::OptimizedRepair | SchemeKind::OptimizedMaintenance => vec![l, g, approach],
    };
    let n = args.k + args.l + args.g;

    Ok(LrcScheme::construct(args.scheme, n, args.k, args.w, -1, &params)?)
}

// =============================================================================
// Commands
// =============================================================================

fn emit<T, F>(json: bool, value: &T, text: F) -> anyhow::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text(value));
    }
    Ok(())
}

fn cmd_place(scheme: &LrcScheme, json: bool) -> anyhow::Result<()> {
    let groups = scheme.place();
    let tolerant = check_single_domain_tolerance(&groups, scheme.k(), scheme.l(), scheme.g());

    #[derive(Serialize)]
    struct PlaceReport {
        scheme: String,
        groups: Vec<Vec<usize>>,
        single_domain_tolerant: bool,
    }

    let report = PlaceReport {
        scheme: scheme.name(),
        groups,
        single_domain_tolerant: tolerant.is_ok(),
    };
    emit(json, &report, |r| {
        let mut lines = vec![format!("{} ({} fault domains)", r.scheme, r.groups.len())];
        lines.extend(
            r.groups
                .iter()
                .enumerate()
                .map(|(i, g)| format!("  domain {}: {:?}", i, g)),
        );
        if let Err(e) = &tolerant {
            lines.push(format!("  warning: {}", e));
        }
        lines.join("\n")
    })
}

/// Blocks that survive losing `f` under the scheme's approach
fn default_available(scheme: &LrcScheme, f: usize) -> Vec<usize> {
    let groups = scheme.place();
    let lost: Vec<usize> = match scheme.approach() {
        Approach::Maintenance if scheme.kind() != SchemeKind::Flat => groups
            .into_iter()
            .find(|g| g.contains(&f))
            .unwrap_or_else(|| vec![f]),
        _ => vec![f],
    };
    (0..scheme.n()).filter(|i| !lost.contains(i)).collect()
}

fn cmd_decode(
    scheme: &LrcScheme,
    failed: usize,
    available: Option<Vec<usize>>,
    json: bool,
) -> anyhow::Result<()> {
    let available = available.unwrap_or_else(|| default_available(scheme, failed));
    let plan = scheme.plan_decode(&available, &[failed])?;
    let cost = plan_cost(scheme, &plan.graph);

    #[derive(Serialize)]
    struct DecodeReport<'a> {
        plan: &'a DecodePlan,
        cost: &'a RepairCost,
    }

    emit(json, &DecodeReport { plan: &plan, cost: &cost }, |r| {
        let mut lines = vec![format!("strategy: {}", r.plan.strategy)];
        if let Ok(order) = r.plan.graph.topological_order() {
            for target in order {
                if let Some(n) = r.plan.graph.node(target) {
                    lines.push(format!(
                        "  {} <- {:?} * {:?}",
                        n.target, n.sources, n.coefficients
                    ));
                }
            }
        }
        lines.push(format!(
            "reads: {} blocks, {} sub-packets, {} disk seeks, {} fault domains, bandwidth {:.4}",
            r.cost.blocks_read,
            r.cost.packets_read,
            r.cost.disk_seeks(),
            r.cost.racks_touched,
            r.cost.normalized_bandwidth
        ));
        lines.join("\n")
    })
}

/// Encoded stripe over seeded random data blocks
fn synthetic_stripe(
    scheme: &LrcScheme,
    block_size: usize,
    seed: u64,
) -> anyhow::Result<StripeBuffers> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut stripe = StripeBuffers::new(block_size);
    for i in 0..scheme.k() {
        let mut block = vec![0u8; block_size];
        rng.fill(&mut block[..]);
        stripe.insert(i, block)?;
    }
    scheme.encode_stripe(&mut stripe)?;
    Ok(stripe)
}

fn cmd_verify(
    scheme: &LrcScheme,
    failed: Option<usize>,
    block_size: usize,
    seed: u64,
) -> anyhow::Result<()> {
    let original = synthetic_stripe(scheme, block_size, seed)?;

    let targets: Vec<usize> = match failed {
        Some(f) => vec![f],
        None => (0..scheme.k()).collect(),
    };

    for f in targets {
        let available = default_available(scheme, f);
        let mut stripe = original.clone();
        for i in (0..scheme.n()).filter(|i| !available.contains(i)) {
            stripe.remove(i);
        }

        let plan = scheme.plan_decode(&available, &[f])?;
        scheme.apply(&plan.graph, &mut stripe)?;

        if stripe.get(f) != original.get(f) {
            bail!("block {} decoded incorrectly with {}", f, plan.strategy);
        }
        println!("block {}: ok ({})", f, plan.strategy);
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_stripe_is_seeded() {
        let scheme = LrcScheme::tradeoff(9, 3, 3, 1, Approach::Maintenance).unwrap();
        let a = synthetic_stripe(&scheme, 128, 7).unwrap();
        let b = synthetic_stripe(&scheme, 128, 7).unwrap();
        let c = synthetic_stripe(&scheme, 128, 8).unwrap();

        assert_eq!(a.indices(), (0..scheme.n()).collect::<Vec<_>>());
        for i in 0..scheme.n() {
            assert_eq!(a.get(i), b.get(i));
        }
        assert_ne!(a.get(0), c.get(0));
    }

    #[test]
    fn test_verify_every_data_block() {
        let scheme = LrcScheme::tradeoff(9, 3, 3, 1, Approach::Maintenance).unwrap();
        cmd_verify(&scheme, None, 64, 42).unwrap();

        let flat = LrcScheme::flat(9, 3, 3).unwrap();
        cmd_verify(&flat, Some(13), 64, 42).unwrap();
    }
}
