//! LRC Scheme Construction and Encoding
//!
//! A scheme is one of a closed set of variants sharing the same generator
//! matrix construction and differing in placement and decode strategy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::ec::dag::EcDag;
use crate::ec::executor::{execute_graph, StripeBuffers};
use crate::ec::matrix::Matrix;
use crate::error::{Error, Result};
use crate::lrc::generator::{generator_matrix, validate_code_shape};
use crate::lrc::placement::{
    max_eta, validate_partition, Group, Placement, OPT_MAINTENANCE_10_2_2, OPT_REPAIR_10_2_2,
};

// =============================================================================
// Scheme Kind
// =============================================================================

/// The fixed set of LRC scheme variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemeKind {
    /// No fault-domain grouping; single-block repair only
    Flat,
    /// Tunable placement trading repair cost against maintenance cost
    Tradeoff,
    /// Hand-tuned repair-optimal placement for (10,2,2)
    OptimizedRepair,
    /// Hand-tuned maintenance-optimal placement for (10,2,2)
    OptimizedMaintenance,
}

impl SchemeKind {
    /// Class name used in policy files
    pub fn class_name(&self) -> &'static str {
        match self {
            SchemeKind::Flat => "AzureLRCFlat",
            SchemeKind::Tradeoff => "AzureLRCTradeoff",
            SchemeKind::OptimizedRepair => "AzureLRCOptR1022",
            SchemeKind::OptimizedMaintenance => "AzureLRCOptM1022",
        }
    }

    /// Names of the positional string parameters this variant expects
    pub fn param_names(&self) -> &'static [&'static str] {
        match self {
            SchemeKind::Flat => &["l", "g"],
            SchemeKind::Tradeoff => &["l", "g", "eta", "approach"],
            SchemeKind::OptimizedRepair | SchemeKind::OptimizedMaintenance => {
                &["l", "g", "approach"]
            }
        }
    }
}

impl fmt::Display for SchemeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

impl FromStr for SchemeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "azurelrcflat" | "flat" => Ok(SchemeKind::Flat),
            "azurelrctradeoff" | "tradeoff" => Ok(SchemeKind::Tradeoff),
            "azurelrcoptr1022" | "opt-repair" => Ok(SchemeKind::OptimizedRepair),
            "azurelrcoptm1022" | "opt-maintenance" => Ok(SchemeKind::OptimizedMaintenance),
            _ => Err(Error::Config(format!("unrecognized scheme class: {}", s))),
        }
    }
}

// =============================================================================
// Approach
// =============================================================================

/// How single-block decode requests are interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Approach {
    /// Unplanned loss of one block; placement is ignored
    #[default]
    Repair,
    /// Planned loss of the block's whole fault domain
    Maintenance,
}

impl Approach {
    /// Decode the numeric approach code used in policy parameters
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(Approach::Repair),
            1 => Ok(Approach::Maintenance),
            other => Err(Error::UnsupportedApproach { approach: other }),
        }
    }

    /// Numeric code of this approach
    pub fn code(&self) -> i64 {
        match self {
            Approach::Repair => 0,
            Approach::Maintenance => 1,
        }
    }
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Approach::Repair => write!(f, "repair"),
            Approach::Maintenance => write!(f, "maintenance"),
        }
    }
}

impl FromStr for Approach {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "repair" | "r" | "0" => Ok(Approach::Repair),
            "maintenance" | "m" | "1" => Ok(Approach::Maintenance),
            _ => Err(Error::Config(format!("unrecognized approach: {}", s))),
        }
    }
}

// =============================================================================
// Scheme
// =============================================================================

/// A constructed LRC scheme instance
#[derive(Debug, Clone, Serialize)]
pub struct LrcScheme {
    kind: SchemeKind,
    n: usize,
    k: usize,
    w: usize,
    opt: i32,
    l: usize,
    g: usize,
    eta: Option<usize>,
    approach: Approach,
    placement: Placement,
    #[serde(skip)]
    generator: Matrix,
}

impl LrcScheme {
    /// Construct a scheme from policy-style arguments.
    ///
    /// `params` holds the variant's positional parameters as strings (see
    /// [`SchemeKind::param_names`]). Parameter count is checked before any
    /// parsing or matrix allocation.
    #[instrument(skip(params), fields(params = ?params))]
    pub fn construct(
        kind: SchemeKind,
        n: usize,
        k: usize,
        w: usize,
        opt: i32,
        params: &[String],
    ) -> Result<Self> {
        let names = kind.param_names();
        if params.len() != names.len() {
            return Err(Error::Config(format!(
                "{} expects {} params ({}), got {}",
                kind,
                names.len(),
                names.join(","),
                params.len()
            )));
        }

        let values = params
            .iter()
            .zip(names)
            .map(|(raw, name)| parse_param(name, raw))
            .collect::<Result<Vec<i64>>>()?;

        let l = non_negative("l", values[0])?;
        let g = non_negative("g", values[1])?;
        let (eta, approach) = match kind {
            SchemeKind::Flat => (None, Approach::Repair),
            SchemeKind::Tradeoff => (
                Some(non_negative("eta", values[2])?),
                Approach::from_code(values[3])?,
            ),
            SchemeKind::OptimizedRepair | SchemeKind::OptimizedMaintenance => {
                (None, Approach::from_code(values[2])?)
            }
        };

        Self::build(kind, n, k, w, opt, l, g, eta, approach)
    }

    /// Flat LRC: every block is its own fault domain
    pub fn flat(k: usize, l: usize, g: usize) -> Result<Self> {
        Self::build(SchemeKind::Flat, k + l + g, k, 1, -1, l, g, None, Approach::Repair)
    }

    /// Tunable-placement LRC
    pub fn tradeoff(k: usize, l: usize, g: usize, eta: usize, approach: Approach) -> Result<Self> {
        Self::build(
            SchemeKind::Tradeoff,
            k + l + g,
            k,
            1,
            -1,
            l,
            g,
            Some(eta),
            approach,
        )
    }

    /// Hand-tuned repair-optimal Azure-LRC(10,2,2)
    pub fn optimized_repair(approach: Approach) -> Result<Self> {
        Self::build(SchemeKind::OptimizedRepair, 14, 10, 1, -1, 2, 2, None, approach)
    }

    /// Hand-tuned maintenance-optimal Azure-LRC(10,2,2)
    pub fn optimized_maintenance(approach: Approach) -> Result<Self> {
        Self::build(
            SchemeKind::OptimizedMaintenance,
            14,
            10,
            1,
            -1,
            2,
            2,
            None,
            approach,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        kind: SchemeKind,
        n: usize,
        k: usize,
        w: usize,
        opt: i32,
        l: usize,
        g: usize,
        eta: Option<usize>,
        approach: Approach,
    ) -> Result<Self> {
        validate_code_shape(k, l, g)?;
        if n != k + l + g {
            return Err(Error::Config(format!(
                "n={} does not equal k+l+g={}",
                n,
                k + l + g
            )));
        }
        if w == 0 {
            return Err(Error::Config("w must be greater than 0".to_string()));
        }
        let b = k / l;

        let placement = match kind {
            SchemeKind::Flat => Placement::Flat { n },
            SchemeKind::Tradeoff => {
                let eta = eta.unwrap_or(0);
                if g == 0 {
                    return Err(Error::Config(
                        "tradeoff placement needs at least one global parity".to_string(),
                    ));
                }
                if eta > max_eta(b, g) {
                    return Err(Error::Config(format!(
                        "eta={} exceeds ceil(b/(g+1))={}",
                        eta,
                        max_eta(b, g)
                    )));
                }
                Placement::Tunable { k, l, g, eta }
            }
            SchemeKind::OptimizedRepair | SchemeKind::OptimizedMaintenance => {
                if (k, l, g) != (10, 2, 2) {
                    return Err(Error::Config(format!(
                        "{} is only defined for (k,l,g)=(10,2,2), got ({},{},{})",
                        kind, k, l, g
                    )));
                }
                if kind == SchemeKind::OptimizedRepair {
                    Placement::HandTuned(OPT_REPAIR_10_2_2)
                } else {
                    Placement::HandTuned(OPT_MAINTENANCE_10_2_2)
                }
            }
        };
        validate_partition(&placement.place(), n)?;

        let generator = generator_matrix(k, l, g)?;

        let scheme = Self {
            kind,
            n,
            k,
            w,
            opt,
            l,
            g,
            eta,
            approach,
            placement,
            generator,
        };

        debug!(scheme = %scheme.name(), generator = ?scheme.generator, "constructed scheme");
        debug!(scheme = %scheme.name(), groups = ?scheme.place(), "placement");

        Ok(scheme)
    }

    /// Variant of this scheme
    pub fn kind(&self) -> SchemeKind {
        self.kind
    }

    /// Total blocks per stripe
    pub fn n(&self) -> usize {
        self.n
    }

    /// Data blocks per stripe
    pub fn k(&self) -> usize {
        self.k
    }

    /// Sub-packetization of the enclosing framework
    pub fn w(&self) -> usize {
        self.w
    }

    /// Opaque optimization level passed through from the policy
    pub fn opt(&self) -> i32 {
        self.opt
    }

    /// Local parity blocks
    pub fn l(&self) -> usize {
        self.l
    }

    /// Global parity blocks
    pub fn g(&self) -> usize {
        self.g
    }

    /// Data blocks per local group
    pub fn b(&self) -> usize {
        self.k / self.l
    }

    /// Clustering granularity (tradeoff variant only)
    pub fn eta(&self) -> Option<usize> {
        self.eta
    }

    /// Decode approach
    pub fn approach(&self) -> Approach {
        self.approach
    }

    /// Placement strategy
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// The generator matrix built at construction
    pub fn generator(&self) -> &Matrix {
        &self.generator
    }

    /// Regenerate the generator matrix into a fresh buffer
    pub(crate) fn fresh_generator(&self) -> Result<Matrix> {
        generator_matrix(self.k, self.l, self.g)
    }

    /// Human-readable identifier for logs and metrics
    pub fn name(&self) -> String {
        match self.eta {
            Some(eta) => format!(
                "{}({},{},{},eta={})",
                self.kind, self.k, self.l, self.g, eta
            ),
            None => format!("{}({},{},{})", self.kind, self.k, self.l, self.g),
        }
    }

    /// Ordered fault domains of one stripe
    pub fn place(&self) -> Vec<Group> {
        self.placement.place()
    }

    /// Local group of a data or local-parity block; `None` for global parity
    pub fn local_group_of(&self, block: usize) -> Option<usize> {
        if block < self.k {
            Some(block / self.b())
        } else if block < self.k + self.l {
            Some(block - self.k)
        } else {
            None
        }
    }

    /// Build the encode graph: one node per parity block over all data
    /// blocks, co-scheduled as a single batch
    #[instrument(skip(self), fields(scheme = %self.name()))]
    pub fn encode(&self) -> Result<EcDag> {
        let mut dag = EcDag::new();
        let data: Vec<usize> = (0..self.k).collect();
        let parities: Vec<usize> = (self.k..self.n).collect();

        for &p in &parities {
            dag.join(p, data.clone(), self.generator.row(p).to_vec())?;
        }
        if parities.len() > 1 {
            dag.bind(&parities)?;
        }

        debug!(nodes = dag.len(), "built encode graph");
        Ok(dag)
    }

    /// Fill in every parity block of `stripe` from its data blocks
    pub fn encode_stripe(&self, stripe: &mut StripeBuffers) -> Result<()> {
        execute_graph(&self.encode()?, stripe, self.n)
    }

    /// Evaluate a decode graph against `stripe`, writing recovered blocks
    pub fn apply(&self, graph: &EcDag, stripe: &mut StripeBuffers) -> Result<()> {
        execute_graph(graph, stripe, self.n)
    }
}

fn parse_param(name: &str, raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|e| Error::Config(format!("param {}={:?} is not an integer: {}", name, raw, e)))
}

fn non_negative(name: &str, value: i64) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| Error::Config(format!("param {} must be non-negative, got {}", name, value)))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn params(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_construct_tradeoff() {
        let s = LrcScheme::construct(SchemeKind::Tradeoff, 15, 9, 1, -1, &params(&["3", "3", "1", "1"]))
            .unwrap();
        assert_eq!(s.b(), 3);
        assert_eq!(s.eta(), Some(1));
        assert_eq!(s.approach(), Approach::Maintenance);
        assert_eq!(s.place().len(), 4);
    }

    #[test]
    fn test_construct_param_count() {
        let err = LrcScheme::construct(SchemeKind::Flat, 14, 10, 1, -1, &params(&["2"])).unwrap_err();
        assert_matches!(err, Error::Config(_));
        let err = LrcScheme::construct(SchemeKind::Tradeoff, 15, 9, 1, -1, &params(&["3", "3", "1"]))
            .unwrap_err();
        assert_matches!(err, Error::Config(_));
    }

    #[test]
    fn test_construct_rejects_bad_values() {
        let s = |p: &[&str]| LrcScheme::construct(SchemeKind::Tradeoff, 15, 9, 1, -1, &params(p));
        assert_matches!(s(&["x", "3", "1", "0"]), Err(Error::Config(_)));
        assert_matches!(s(&["3", "-3", "1", "0"]), Err(Error::Config(_)));
        assert_matches!(s(&["3", "3", "2", "0"]), Err(Error::Config(_)));
        assert_matches!(s(&["3", "3", "1", "7"]), Err(Error::UnsupportedApproach { approach: 7 }));
        // n mismatch
        assert_matches!(
            LrcScheme::construct(SchemeKind::Tradeoff, 16, 9, 1, -1, &params(&["3", "3", "1", "0"])),
            Err(Error::Config(_))
        );
        // l does not divide k
        assert_matches!(
            LrcScheme::construct(SchemeKind::Flat, 14, 10, 1, -1, &params(&["3", "1"])),
            Err(Error::Config(_))
        );
    }

    #[test]
    fn test_hand_tuned_requires_10_2_2() {
        assert_matches!(
            LrcScheme::construct(SchemeKind::OptimizedRepair, 15, 9, 1, -1, &params(&["3", "3", "0"])),
            Err(Error::Config(_))
        );
        let s = LrcScheme::construct(SchemeKind::OptimizedRepair, 14, 10, 1, -1, &params(&["2", "2", "1"]))
            .unwrap();
        assert_eq!(s.place()[1], vec![3, 4, 10]);
    }

    #[test]
    fn test_scheme_kind_parsing() {
        assert_eq!("AzureLRCTradeoff".parse::<SchemeKind>().unwrap(), SchemeKind::Tradeoff);
        assert_eq!("opt-maintenance".parse::<SchemeKind>().unwrap(), SchemeKind::OptimizedMaintenance);
        assert!("RSCONV".parse::<SchemeKind>().is_err());
        assert_eq!(SchemeKind::OptimizedRepair.to_string(), "AzureLRCOptR1022");
    }

    #[test]
    fn test_approach_codes() {
        assert_eq!(Approach::from_code(0).unwrap(), Approach::Repair);
        assert_eq!(Approach::from_code(1).unwrap(), Approach::Maintenance);
        assert_matches!(Approach::from_code(2), Err(Error::UnsupportedApproach { approach: 2 }));
        assert_eq!("m".parse::<Approach>().unwrap(), Approach::Maintenance);
        assert_eq!(Approach::Maintenance.code(), 1);
    }

    #[test]
    fn test_local_group_of() {
        let s = LrcScheme::flat(9, 3, 3).unwrap();
        assert_eq!(s.local_group_of(4), Some(1));
        assert_eq!(s.local_group_of(11), Some(2));
        assert_eq!(s.local_group_of(12), None);
    }

    #[test]
    fn test_encode_graph() {
        let s = LrcScheme::tradeoff(9, 3, 3, 1, Approach::Repair).unwrap();
        let dag = s.encode().unwrap();
        assert_eq!(dag.len(), 6);
        assert_eq!(dag.bindings(), &[vec![9, 10, 11, 12, 13, 14]]);
        let node = dag.node(10).unwrap();
        assert_eq!(node.sources, (0..9).collect::<Vec<_>>());
        assert_eq!(node.coefficients, vec![0, 0, 0, 1, 1, 1, 0, 0, 0]);
        assert_eq!(dag.lower().unwrap().len(), 1);
    }

    #[test]
    fn test_encode_single_parity_is_unbound() {
        let s = LrcScheme::flat(2, 1, 0).unwrap();
        let dag = s.encode().unwrap();
        assert_eq!(dag.len(), 1);
        assert!(dag.bindings().is_empty());
    }

    #[test]
    fn test_encode_stripe_local_parity_is_xor() {
        let s = LrcScheme::flat(4, 2, 1).unwrap();
        let mut stripe = StripeBuffers::new(2);
        for (i, block) in [[1u8, 2], [4, 8], [16, 32], [64, 128]].into_iter().enumerate() {
            stripe.insert(i, block.to_vec()).unwrap();
        }
        s.encode_stripe(&mut stripe).unwrap();
        assert_eq!(stripe.get(4).unwrap(), &[5, 10]);
        assert_eq!(stripe.get(5).unwrap(), &[80, 160]);
        assert!(stripe.contains(6));
    }

    #[test]
    fn test_fresh_generator_matches() {
        let s = LrcScheme::optimized_maintenance(Approach::Maintenance).unwrap();
        assert_eq!(&s.fresh_generator().unwrap(), s.generator());
    }
}
