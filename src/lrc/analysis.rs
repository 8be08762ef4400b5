//! Tradeoff Analysis
//!
//! Closed-form and measured costs used to pick `eta`:
//!
//! - **ADC** (average degraded-read cost): fault domains other than the
//!   failed block's own that a single-block repair reads from, averaged over
//!   data blocks.
//! - **AMC** (average maintenance cost): blocks read to serve a data block
//!   whose whole fault domain is offline, averaged over data blocks.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::ec::cost::RepairCost;
use crate::ec::dag::EcDag;
use crate::error::{Error, Result};
use crate::lrc::generator::validate_code_shape;
use crate::lrc::placement::{max_eta, residing_group, Group};
use crate::lrc::scheme::{Approach, LrcScheme};

/// Closed-form costs of one `eta`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradeoffPoint {
    pub eta: usize,
    pub adc: f64,
    pub amc: f64,
}

/// ADC/AMC for every `eta` in `0..=ceil(b/(g+1))`
pub fn tradeoff_curve(k: usize, l: usize, g: usize) -> Result<Vec<TradeoffPoint>> {
    validate_code_shape(k, l, g)?;
    let b = k / l;
    let eta_max = max_eta(b, g);
    let (lf, gf, bf) = (l as f64, g as f64, b as f64);

    let points = (0..=eta_max)
        .map(|eta| {
            let ef = eta as f64;
            if eta == eta_max && b % (g + 1) != 0 {
                let delta = eta_max as f64;
                let sigma = delta * lf;
                let r = (b % (g + 1)) as f64;
                let amc = ((delta - 1.0) * (gf + 1.0) * (sigma * gf + delta - 1.0)
                    + r * sigma * r)
                    / bf;
                TradeoffPoint {
                    eta,
                    adc: delta - 1.0,
                    amc,
                }
            } else {
                TradeoffPoint {
                    eta,
                    adc: bf - gf * ef,
                    amc: (lf - gf - 1.0) * (gf + 1.0) * gf / bf * ef * ef + gf * gf * ef + bf,
                }
            }
        })
        .collect();

    Ok(points)
}

/// Check that losing any one fault domain stays within the code's tolerance:
/// a domain spanning `i` local groups may hold at most `g + i` blocks
pub fn check_single_domain_tolerance(groups: &[Group], k: usize, l: usize, g: usize) -> Result<()> {
    validate_code_shape(k, l, g)?;
    let b = k / l;

    for (pos, rack) in groups.iter().enumerate() {
        let spanned: BTreeSet<usize> = rack
            .iter()
            .filter_map(|&blk| {
                if blk < k {
                    Some(blk / b)
                } else if blk < k + l {
                    Some(blk - k)
                } else {
                    None
                }
            })
            .collect();

        if rack.len() > g + spanned.len() {
            return Err(Error::Config(format!(
                "fault domain {} holds {} blocks but spans only {} local groups (limit {})",
                pos,
                rack.len(),
                spanned.len(),
                g + spanned.len()
            )));
        }
    }

    Ok(())
}

/// Measured cost of a scheme averaged over its data blocks
#[derive(Debug, Clone, Serialize)]
pub struct AverageCost {
    pub approach: Approach,
    /// Mean distinct blocks read
    pub blocks_read: f64,
    /// Mean fault domains read from, excluding the failed block's own
    pub domains_touched: f64,
    /// Mean sub-packets read relative to `k * w`
    pub normalized_bandwidth: f64,
}

/// Read cost of one decode graph at the scheme's sub-packetization
pub fn plan_cost(scheme: &LrcScheme, graph: &EcDag) -> RepairCost {
    let w = scheme.w();
    let symbols = graph
        .inputs()
        .into_iter()
        .filter(|&blk| blk < scheme.n())
        .flat_map(|blk| blk * w..(blk + 1) * w);
    RepairCost::from_symbols(symbols, scheme.n(), scheme.k(), w, &scheme.place())
}

/// Decode every data block under the scheme's approach and average the cost.
///
/// Repair treats every other block as available; maintenance treats every
/// block outside the failed block's domain as available.
pub fn measure_average_cost(scheme: &LrcScheme) -> Result<AverageCost> {
    let groups = scheme.place();
    let approach = scheme.approach();
    let (mut blocks, mut domains, mut bandwidth) = (0usize, 0usize, 0f64);

    for f in 0..scheme.k() {
        let home = residing_group(&groups, f)
            .ok_or_else(|| Error::InvalidRequest(format!("block {} is not placed", f)))?;
        let available: Vec<usize> = match approach {
            Approach::Repair => (0..scheme.n()).filter(|&i| i != f).collect(),
            Approach::Maintenance => (0..scheme.n())
                .filter(|i| !groups[home].contains(i))
                .collect(),
        };

        let graph = scheme.decode(&available, &[f])?;
        let cost = plan_cost(scheme, &graph);
        let touched: BTreeSet<usize> = cost
            .reads
            .iter()
            .filter_map(|r| residing_group(&groups, r.node))
            .filter(|&pos| pos != home)
            .collect();

        blocks += cost.blocks_read;
        domains += touched.len();
        bandwidth += cost.normalized_bandwidth;
    }

    let k = scheme.k() as f64;
    let avg = AverageCost {
        approach,
        blocks_read: blocks as f64 / k,
        domains_touched: domains as f64 / k,
        normalized_bandwidth: bandwidth / k,
    };
    debug!(scheme = %scheme.name(), ?avg, "measured average cost");
    Ok(avg)
}

// =============================================================================
// Tests
// =============================================================================
