//! Repair Cost Accounting
//!
//! Measures what a plan reads from storage: sub-packets per node, disk seeks
//! (runs of consecutive sub-packet offsets on one node), fault domains
//! touched, and bandwidth normalised against reading k whole blocks.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// Reads issued against one storage node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeReads {
    /// Block (node) index
    pub node: usize,
    /// Sub-packet offsets read, ascending
    pub packets: Vec<usize>,
    /// Number of contiguous read runs
    pub disk_seeks: usize,
}

/// Aggregate read cost of one plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairCost {
    /// Per-node reads, only for nodes that are read
    pub reads: Vec<NodeReads>,
    /// Total sub-packets read
    pub packets_read: usize,
    /// Distinct nodes read
    pub blocks_read: usize,
    /// Distinct fault domains holding at least one read node
    pub racks_touched: usize,
    /// `packets_read / (k * w)`
    pub normalized_bandwidth: f64,
}

impl RepairCost {
    /// Cost of reading the given symbol indices.
    ///
    /// Symbol `s` lives on node `s / w` at offset `s % w`; symbols at or past
    /// `n * w` are virtual and cost nothing.
    pub fn from_symbols<I>(symbols: I, n: usize, k: usize, w: usize, groups: &[Vec<usize>]) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let w = w.max(1);
        let mut per_node: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
        for s in symbols.into_iter().filter(|&s| s < n * w) {
            per_node.entry(s / w).or_default().insert(s % w);
        }

        let reads: Vec<NodeReads> = per_node
            .into_iter()
            .map(|(node, offsets)| {
                let packets: Vec<usize> = offsets.into_iter().collect();
                NodeReads {
                    node,
                    disk_seeks: count_runs(&packets),
                    packets,
                }
            })
            .collect();

        let racks: BTreeSet<usize> = reads
            .iter()
            .filter_map(|r| groups.iter().position(|g| g.contains(&r.node)))
            .collect();

        let packets_read: usize = reads.iter().map(|r| r.packets.len()).sum();
        let normalized_bandwidth = if k == 0 {
            0.0
        } else {
            packets_read as f64 / (k * w) as f64
        };

        Self {
            blocks_read: reads.len(),
            racks_touched: racks.len(),
            packets_read,
            normalized_bandwidth,
            reads,
        }
    }

    /// Total disk seeks across all nodes
    pub fn disk_seeks(&self) -> usize {
        self.reads.iter().map(|r| r.disk_seeks).sum()
    }
}

/// Number of maximal runs of consecutive values in a sorted slice
fn count_runs(sorted: &[usize]) -> usize {
    match sorted.first() {
        None => 0,
        Some(_) => 1 + sorted.windows(2).filter(|w| w[1] != w[0] + 1).count(),
    }
}

// =============================================================================
// Tests
// =============================================================================
