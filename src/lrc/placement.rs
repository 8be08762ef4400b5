//! Placement Model
//!
//! Partitions the n block indices of a stripe into fault domains ("racks").
//! Downstream logic addresses racks by position, so every strategy is a pure
//! function of its parameters and returns racks in a stable order.

use serde::Serialize;

use crate::error::{Error, Result};

/// One fault domain: block indices that fail together
pub type Group = Vec<usize>;

/// Hand-tuned repair-optimal layout for Azure-LRC(10,2,2)
pub const OPT_REPAIR_10_2_2: &[&[usize]] = &[
    &[0, 1, 2],
    &[3, 4, 10],
    &[5, 6, 7],
    &[8, 9, 11],
    &[12, 13],
];

/// Hand-tuned maintenance-optimal layout for Azure-LRC(10,2,2): one data
/// block of each local group per rack, then local parities, then globals
pub const OPT_MAINTENANCE_10_2_2: &[&[usize]] = &[
    &[0, 5],
    &[1, 6],
    &[2, 7],
    &[3, 8],
    &[4, 9],
    &[10, 11],
    &[12, 13],
];

/// Placement strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Placement {
    /// Every block is its own fault domain
    Flat { n: usize },
    /// Fixed lookup table
    HandTuned(&'static [&'static [usize]]),
    /// Locality-aware clustering controlled by `eta`
    Tunable {
        k: usize,
        l: usize,
        g: usize,
        eta: usize,
    },
}

impl Placement {
    /// Compute the ordered list of fault domains
    pub fn place(&self) -> Vec<Group> {
        match *self {
            Placement::Flat { n } => (0..n).map(|i| vec![i]).collect(),
            Placement::HandTuned(table) => table.iter().map(|g| g.to_vec()).collect(),
            Placement::Tunable { k, l, g, eta } => place_tunable(k, l, g, eta),
        }
    }
}

/// Largest useful `eta`: clusters needed to cover one local group
pub fn max_eta(b: usize, g: usize) -> usize {
    b.div_ceil(g + 1)
}

/// Whether the local parity of each group joins its last, partial cluster
/// instead of the collocated local-parity rack
pub fn parity_in_cluster(b: usize, g: usize, eta: usize) -> bool {
    eta * (g + 1) >= b && b % (g + 1) != 0
}

fn place_tunable(k: usize, l: usize, g: usize, eta: usize) -> Vec<Group> {
    let b = k / l;
    let cluster = g + 1;
    let clusters = eta.min(max_eta(b, g));
    let mut groups = Vec::new();

    // Clusters of up to g+1 blocks per local group, one rack each
    for lg in 0..l {
        for cl in 0..clusters {
            let start = lg * b + cl * cluster;
            let end = (start + cluster).min((lg + 1) * b);
            let mut rack: Group = (start..end).collect();
            if end - start < cluster {
                rack.push(k + lg);
            }
            groups.push(rack);
        }
    }

    // Leftover data blocks, one per local group in each rack
    if eta * cluster < b {
        for idx in 0..(b - eta * cluster) {
            groups.push((0..l).map(|lg| lg * b + eta * cluster + idx).collect());
        }
    }

    if !parity_in_cluster(b, g, eta) {
        groups.push((0..l).map(|lg| k + lg).collect());
    }

    groups.push((0..g).map(|i| k + l + i).collect());
    groups
}

/// Position of the rack holding `block`
pub fn residing_group(groups: &[Group], block: usize) -> Option<usize> {
    groups.iter().position(|g| g.contains(&block))
}

/// Check that `groups` covers `[0, n)` exactly once
pub fn validate_partition(groups: &[Group], n: usize) -> Result<()> {
    let mut seen = vec![false; n];
    for block in groups.iter().flatten().copied() {
        if block >= n {
            return Err(Error::Config(format!(
                "placement references block {} outside [0, {})",
                block, n
            )));
        }
        if std::mem::replace(&mut seen[block], true) {
            return Err(Error::Config(format!(
                "placement lists block {} more than once",
                block
            )));
        }
    }
    if let Some(missing) = seen.iter().position(|s| !s) {
        return Err(Error::Config(format!(
            "placement omits block {}",
            missing
        )));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
