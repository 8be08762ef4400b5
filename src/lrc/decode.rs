//! Decode Strategy Selection
//!
//! Classifies a single-block failure request and builds its recovery graph.
//!
//! ```text
//!   failed.len() > 1 ──────────────────────────▶ UnsupportedMultiFailure
//!   approach = repair ─────────────────────────▶ single repair
//!   approach = maintenance
//!     ├─ domain member still available ────────▶ MaintenancePreconditionViolated
//!     ├─ f is a parity block ──────────────────▶ UnsupportedParityMaintenance
//!     ├─ no sibling of f's local group lost ───▶ local maintenance
//!     └─ otherwise ────────────────────────────▶ global maintenance
//! ```

use std::fmt;

use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::ec::dag::EcDag;
use crate::error::{Error, Result};
use crate::lrc::placement::{residing_group, Group};
use crate::lrc::scheme::{Approach, LrcScheme, SchemeKind};
use crate::metrics;

/// Reconstruction algorithm chosen for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeStrategy {
    /// One block lost; local parity or full global row
    SingleRepair,
    /// Whole domain lost, but no sibling of the target's local group
    LocalMaintenance,
    /// Whole domain lost together with other members of the target's group
    GlobalMaintenance,
}

impl DecodeStrategy {
    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodeStrategy::SingleRepair => "single_repair",
            DecodeStrategy::LocalMaintenance => "local_maintenance",
            DecodeStrategy::GlobalMaintenance => "global_maintenance",
        }
    }
}

impl fmt::Display for DecodeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recovery graph together with how it was derived
#[derive(Debug, Clone, Serialize)]
pub struct DecodePlan {
    pub strategy: DecodeStrategy,
    pub graph: EcDag,
}

impl LrcScheme {
    /// Build the recovery graph for `failed` given the `available` blocks
    pub fn decode(&self, available: &[usize], failed: &[usize]) -> Result<EcDag> {
        self.plan_decode(available, failed).map(|plan| plan.graph)
    }

    /// Build the recovery graph and report the strategy used
    #[instrument(skip(self, available), fields(scheme = %self.name()))]
    pub fn plan_decode(&self, available: &[usize], failed: &[usize]) -> Result<DecodePlan> {
        let name = self.name();
        match self.select_and_build(available, failed) {
            Ok(plan) => {
                info!(
                    strategy = %plan.strategy,
                    nodes = plan.graph.len(),
                    "planned decode"
                );
                metrics::record_plan(&name, plan.strategy.as_str());
                Ok(plan)
            }
            Err(e) => {
                if matches!(e, Error::RecoverySystemInvariantViolation(_)) {
                    error!(error = %e, ?failed, ?available, "decode failed");
                } else {
                    warn!(error = %e, ?failed, "decode rejected");
                }
                metrics::record_failure(&name, &e);
                Err(e)
            }
        }
    }

    fn select_and_build(&self, available: &[usize], failed: &[usize]) -> Result<DecodePlan> {
        let f = match failed {
            [] => return Err(Error::InvalidRequest("no failed block given".to_string())),
            [f] => *f,
            _ => {
                return Err(Error::UnsupportedMultiFailure {
                    failed: failed.to_vec(),
                })
            }
        };
        if let Some(&bad) = failed.iter().chain(available).find(|&&i| i >= self.n()) {
            return Err(Error::InvalidRequest(format!(
                "block index {} outside [0, {})",
                bad,
                self.n()
            )));
        }

        if self.kind() == SchemeKind::Flat || self.approach() == Approach::Repair {
            return Ok(DecodePlan {
                strategy: DecodeStrategy::SingleRepair,
                graph: self.repair_single(f)?,
            });
        }

        let groups = self.place();
        let rack = rack_of(&groups, f)?;
        let alive = alive_domain_members(rack, available, f);
        if !alive.is_empty() {
            return Err(Error::MaintenancePreconditionViolated { index: f, alive });
        }
        if f >= self.k() {
            return Err(Error::UnsupportedParityMaintenance { index: f });
        }

        let lg = f / self.b();
        let sibling_lost = rack
            .iter()
            .any(|&blk| blk != f && self.local_group_of(blk) == Some(lg));
        debug!(rack = ?rack, local_group = lg, sibling_lost, "classified failed domain");

        if sibling_lost {
            Ok(DecodePlan {
                strategy: DecodeStrategy::GlobalMaintenance,
                graph: self.decode_global_maintenance(&groups, rack, &[f])?,
            })
        } else {
            let mut graph = EcDag::new();
            self.join_local_repair(&mut graph, f)?;
            Ok(DecodePlan {
                strategy: DecodeStrategy::LocalMaintenance,
                graph,
            })
        }
    }

    /// Whether `f` is a data block and every other member of its fault
    /// domain is absent from `available`
    pub fn check_maintenance_constraints(&self, available: &[usize], f: usize) -> bool {
        if f >= self.k() {
            return false;
        }
        let groups = self.place();
        match residing_group(&groups, f) {
            Some(pos) => alive_domain_members(&groups[pos], available, f).is_empty(),
            None => false,
        }
    }

    /// Single-block recovery ignoring placement
    fn repair_single(&self, f: usize) -> Result<EcDag> {
        let mut graph = EcDag::new();
        let (k, l, b) = (self.k(), self.l(), self.b());

        if f < k {
            self.join_local_repair(&mut graph, f)?;
        } else if f < k + l {
            let lg = f - k;
            let sources: Vec<usize> = (lg * b..(lg + 1) * b).collect();
            let coefficients = vec![1; sources.len()];
            graph.join(f, sources, coefficients)?;
        } else {
            let generator = self.fresh_generator()?;
            graph.join(f, (0..k).collect(), generator.row(f).to_vec())?;
        }

        Ok(graph)
    }

    /// XOR of a data block's local-group siblings and the group's parity
    fn join_local_repair(&self, graph: &mut EcDag, f: usize) -> Result<()> {
        let b = self.b();
        let lg = f / b;
        let mut sources: Vec<usize> = (lg * b..(lg + 1) * b).filter(|&i| i != f).collect();
        sources.push(self.k() + lg);
        let coefficients = vec![1; sources.len()];
        graph.join(f, sources, coefficients)
    }
}

fn rack_of(groups: &[Group], f: usize) -> Result<&Group> {
    residing_group(groups, f)
        .map(|pos| &groups[pos])
        .ok_or_else(|| Error::InvalidRequest(format!("block {} is not placed", f)))
}

fn alive_domain_members(rack: &[usize], available: &[usize], f: usize) -> Vec<usize> {
    rack.iter()
        .copied()
        .filter(|&blk| blk != f && available.contains(&blk))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn outside(scheme: &LrcScheme, f: usize) -> Vec<usize> {
        let groups = scheme.place();
        let rack = rack_of(&groups, f).unwrap().clone();
        (0..scheme.n()).filter(|i| !rack.contains(i)).collect()
    }

    // =========================================================================
    // Selector
    // =========================================================================

    #[test]
    fn test_rejects_multi_failure() {
        let s = LrcScheme::flat(9, 3, 3).unwrap();
        assert_matches!(
            s.decode(&[], &[0, 1]),
            Err(Error::UnsupportedMultiFailure { failed }) if failed == vec![0, 1]
        );
    }

    #[test]
    fn test_rejects_empty_and_out_of_range() {
        let s = LrcScheme::flat(9, 3, 3).unwrap();
        assert_matches!(s.decode(&[], &[]), Err(Error::InvalidRequest(_)));
        assert_matches!(s.decode(&[], &[15]), Err(Error::InvalidRequest(_)));
        assert_matches!(s.decode(&[99], &[0]), Err(Error::InvalidRequest(_)));
    }

    #[test]
    fn test_maintenance_precondition() {
        let s = LrcScheme::tradeoff(9, 3, 3, 1, Approach::Maintenance).unwrap();
        assert!(s.check_maintenance_constraints(&outside(&s, 0), 0));
        assert!(!s.check_maintenance_constraints(&[1, 3, 4], 0));
        // parity blocks never qualify, even with their domain down
        assert!(!s.check_maintenance_constraints(&outside(&s, 9), 9));
        assert!(!s.check_maintenance_constraints(&outside(&s, 13), 13));
        assert_matches!(
            s.decode(&[2, 5], &[0]),
            Err(Error::MaintenancePreconditionViolated { index: 0, alive }) if alive == vec![2]
        );
    }

    #[test]
    fn test_parity_maintenance_unsupported() {
        let s = LrcScheme::tradeoff(9, 3, 3, 1, Approach::Maintenance).unwrap();
        assert_matches!(
            s.decode(&outside(&s, 12), &[12]),
            Err(Error::UnsupportedParityMaintenance { index: 12 })
        );
    }

    #[test]
    fn test_repair_ignores_placement() {
        let s = LrcScheme::tradeoff(9, 3, 3, 1, Approach::Repair).unwrap();
        let plan = s.plan_decode(&[1, 2], &[0]).unwrap();
        assert_eq!(plan.strategy, DecodeStrategy::SingleRepair);
    }

    // =========================================================================
    // Single Repair
    // =========================================================================

    #[test]
    fn test_repair_data_block() {
        let s = LrcScheme::flat(9, 3, 3).unwrap();
        let g = s.decode(&[], &[4]).unwrap();
        assert_eq!(g.len(), 1);
        let node = g.node(4).unwrap();
        assert_eq!(node.sources, vec![3, 5, 10]);
        assert_eq!(node.coefficients, vec![1, 1, 1]);
    }

    #[test]
    fn test_repair_local_parity() {
        let s = LrcScheme::flat(9, 3, 3).unwrap();
        let g = s.decode(&[], &[11]).unwrap();
        let node = g.node(11).unwrap();
        assert_eq!(node.sources, vec![6, 7, 8]);
        assert_eq!(node.coefficients, vec![1, 1, 1]);
    }

    #[test]
    fn test_repair_global_parity() {
        let s = LrcScheme::flat(9, 3, 3).unwrap();
        let g = s.decode(&[], &[13]).unwrap();
        let node = g.node(13).unwrap();
        assert_eq!(node.sources, (0..9).collect::<Vec<_>>());
        assert_eq!(node.coefficients, s.generator().row(13).to_vec());
    }

    // =========================================================================
    // Maintenance Classification
    // =========================================================================

    #[test]
    fn test_local_maintenance() {
        // eta = 0: rack {0,3,6} holds one block of each local group
        let s = LrcScheme::tradeoff(9, 3, 3, 0, Approach::Maintenance).unwrap();
        let plan = s.plan_decode(&outside(&s, 3), &[3]).unwrap();
        assert_eq!(plan.strategy, DecodeStrategy::LocalMaintenance);
        let node = plan.graph.node(3).unwrap();
        assert_eq!(node.sources, vec![4, 5, 10]);
    }

    #[test]
    fn test_global_maintenance_selected() {
        let s = LrcScheme::tradeoff(9, 3, 3, 1, Approach::Maintenance).unwrap();
        let plan = s.plan_decode(&outside(&s, 0), &[0]).unwrap();
        assert_eq!(plan.strategy, DecodeStrategy::GlobalMaintenance);
    }

    #[test]
    fn test_opt_maintenance_is_always_local() {
        let s = LrcScheme::optimized_maintenance(Approach::Maintenance).unwrap();
        for f in 0..10 {
            let plan = s.plan_decode(&outside(&s, f), &[f]).unwrap();
            assert_eq!(plan.strategy, DecodeStrategy::LocalMaintenance);
        }
    }
}
