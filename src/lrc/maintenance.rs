//! Global Maintenance
//!
//! When a fault domain takes out two or more members of one local group, the
//! local parity alone cannot restore them. Every lost data block of the
//! domain is then recovered together:
//!
//! 1. Each surviving relation that spans the domain is rewritten as a
//!    *virtual symbol*: a combination of surviving blocks equal to a known
//!    combination of the lost data blocks.
//! 2. Those known combinations form a square recovery matrix `R` with
//!    `R · lost = virtual`.
//! 3. `R⁻¹` expresses each lost block over the virtual symbols.
//!
//! Virtual symbols are graph nodes numbered from `n` upward and exist only
//! inside the graph that created them.

use tracing::{debug, instrument, trace, warn};

use crate::ec::dag::EcDag;
use crate::ec::galois::invert_matrix;
use crate::ec::matrix::Matrix;
use crate::error::{Error, Result};
use crate::lrc::placement::Group;
use crate::lrc::scheme::LrcScheme;
use crate::metrics;

/// One virtual symbol and the lost-block combination it equals
#[derive(Debug, Clone, PartialEq, Eq)]
struct Equation {
    sources: Vec<usize>,
    coefficients: Vec<u8>,
    /// Coefficients over the lost data blocks, in `lost` order
    row: Vec<u8>,
}

/// Square linear system mapping virtual symbols to lost data blocks
#[derive(Debug, Clone)]
struct RecoverySystem {
    lost: Vec<usize>,
    equations: Vec<Equation>,
}

impl RecoverySystem {
    fn matrix(&self) -> Result<Matrix> {
        Matrix::from_rows(self.equations.iter().map(|e| e.row.clone()).collect()).ok_or_else(
            || Error::RecoverySystemInvariantViolation("ragged recovery matrix".to_string()),
        )
    }
}

impl LrcScheme {
    /// Recover every lost data block of fault domain `domain` (by position
    /// in [`LrcScheme::place`]) with the global maintenance system
    #[instrument(skip(self), fields(scheme = %self.name()))]
    pub fn recover_fault_domain(&self, domain: usize) -> Result<EcDag> {
        let groups = self.place();
        let rack = groups.get(domain).ok_or_else(|| {
            Error::InvalidRequest(format!(
                "fault domain {} outside [0, {})",
                domain,
                groups.len()
            ))
        })?;
        let lost: Vec<usize> = rack.iter().copied().filter(|&b| b < self.k()).collect();
        if lost.is_empty() {
            return Err(Error::InvalidRequest(format!(
                "fault domain {} holds no data blocks",
                domain
            )));
        }
        self.decode_global_maintenance(&groups, rack, &lost)
    }

    /// Build the recovery graph for `targets`, all data blocks of `rack`
    pub(crate) fn decode_global_maintenance(
        &self,
        groups: &[Group],
        rack: &[usize],
        targets: &[usize],
    ) -> Result<EcDag> {
        let generator = self.fresh_generator()?;
        let system = self.build_recovery_system(&generator, rack)?;
        let m = system.lost.len();

        let recovery = system.matrix()?;
        trace!(matrix = ?recovery, "recovery matrix");
        let inverse = invert_matrix(&recovery).map_err(|e| {
            Error::RecoverySystemInvariantViolation(format!(
                "recovery matrix for domain {:?} is not invertible: {}",
                rack, e
            ))
        })?;
        trace!(matrix = ?inverse, "inverted recovery matrix");

        let n = self.n();
        let mut graph = EcDag::new();
        for (i, eq) in system.equations.iter().enumerate() {
            graph.join(n + i, eq.sources.clone(), eq.coefficients.clone())?;
        }

        let virtuals: Vec<usize> = (n..n + m).collect();
        for &target in targets {
            let pos = system.lost.iter().position(|&b| b == target).ok_or_else(|| {
                Error::InvalidRequest(format!(
                    "block {} is not a lost data block of domain {:?}",
                    target, rack
                ))
            })?;
            graph.join(target, virtuals.clone(), inverse.row(pos).to_vec())?;
        }

        debug!(
            domains = groups.len(),
            lost = ?system.lost,
            virtual_symbols = m,
            "built global maintenance graph"
        );
        metrics::record_virtual_symbols(&self.name(), m);

        Ok(graph)
    }

    /// Derive one equation per lost data block of `rack`
    fn build_recovery_system(&self, generator: &Matrix, rack: &[usize]) -> Result<RecoverySystem> {
        let (k, l, b) = (self.k(), self.l(), self.b());

        let lost: Vec<usize> = (0..k).filter(|d| rack.contains(d)).collect();
        let survivors: Vec<usize> = (0..k).filter(|d| !rack.contains(d)).collect();

        let mut members: Vec<Vec<usize>> = vec![Vec::new(); l];
        for &blk in rack {
            if let Some(lg) = self.local_group_of(blk) {
                members[lg].push(blk);
            }
        }

        let mut globals = (k + l..self.n()).filter(|p| !rack.contains(p));
        let mut equations = Vec::with_capacity(lost.len());

        for (lg, lost_in_group) in members.iter().enumerate() {
            let parity = k + lg;
            match lost_in_group.as_slice() {
                [] => {}
                [only] if *only >= k => {
                    // lone local parity: no data of this group to recover
                }
                [only] => {
                    let mut sources: Vec<usize> =
                        (lg * b..(lg + 1) * b).filter(|d| d != only).collect();
                    sources.push(parity);
                    equations.push(Equation {
                        coefficients: vec![1; sources.len()],
                        sources,
                        row: lost.iter().map(|d| u8::from(d == only)).collect(),
                    });
                }
                many => {
                    for _ in 1..many.len() {
                        let p = globals.next().ok_or_else(|| {
                            warn!(rack = ?rack, local_group = lg, "out of global parities");
                            Error::RecoverySystemInvariantViolation(format!(
                                "local group {} needs more than {} global parities outside domain {:?}",
                                lg,
                                self.g(),
                                rack
                            ))
                        })?;
                        let mut sources = survivors.clone();
                        let mut coefficients = generator.gather(p, &survivors);
                        sources.push(p);
                        coefficients.push(1);
                        equations.push(Equation {
                            sources,
                            coefficients,
                            row: generator.gather(p, &lost),
                        });
                    }

                    if !many.contains(&parity) {
                        let mut sources: Vec<usize> =
                            (lg * b..(lg + 1) * b).filter(|d| !rack.contains(d)).collect();
                        sources.push(parity);
                        equations.push(Equation {
                            coefficients: vec![1; sources.len()],
                            sources,
                            row: lost.iter().map(|&d| u8::from(d / b == lg)).collect(),
                        });
                    }
                }
            }
        }

        if equations.len() != lost.len() {
            return Err(Error::RecoverySystemInvariantViolation(format!(
                "domain {:?} yields {} equations for {} lost data blocks",
                rack,
                equations.len(),
                lost.len()
            )));
        }

        Ok(RecoverySystem { lost, equations })
    }
}

// =============================================================================
// Tests
// =============================================================================
