//! LRC Integration Tests
//!
//! End-to-end tests: construct → encode → lose blocks → plan → execute →
//! compare, across every scheme variant.

use assert_matches::assert_matches;
use tempfile::tempdir;

use lrc_tradeoff::ec::StripeBuffers;
use lrc_tradeoff::lrc::{measure_average_cost, plan_cost};
use lrc_tradeoff::{
    metrics, Approach, DecodeStrategy, Error, LrcScheme, PolicyRegistry, SchemeKind,
};

const BLOCK_SIZE: usize = 64;

fn params(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Deterministic stripe with distinct bytes per block
fn encoded_stripe(scheme: &LrcScheme) -> StripeBuffers {
    let mut stripe = StripeBuffers::new(BLOCK_SIZE);
    for i in 0..scheme.k() {
        let block = (0..BLOCK_SIZE)
            .map(|j| (i * 37 + j * 11 + 5) as u8)
            .collect();
        stripe.insert(i, block).expect("insert data block");
    }
    scheme.encode_stripe(&mut stripe).expect("encode stripe");
    stripe
}

/// Drop `lost` from a copy of `original`, decode `f` and compare
fn roundtrip(scheme: &LrcScheme, original: &StripeBuffers, lost: &[usize], f: usize) -> DecodeStrategy {
    let mut stripe = original.clone();
    for &i in lost {
        stripe.remove(i);
    }
    let available = stripe.indices();
    let plan = scheme
        .plan_decode(&available, &[f])
        .unwrap_or_else(|e| panic!("decode {} failed: {}", f, e));
    scheme.apply(&plan.graph, &mut stripe).expect("execute plan");
    assert_eq!(stripe.get(f), original.get(f), "block {} mismatch", f);
    plan.strategy
}

fn domain_of(scheme: &LrcScheme, f: usize) -> Vec<usize> {
    scheme
        .place()
        .into_iter()
        .find(|g| g.contains(&f))
        .expect("block is placed")
}

// =============================================================================
// Azure-LRC(9,3,3) Scenario
// =============================================================================

#[test]
fn test_repair_of_block_zero() {
    let scheme = LrcScheme::construct(
        SchemeKind::Tradeoff,
        15,
        9,
        1,
        -1,
        &params(&["3", "3", "1", "0"]),
    )
    .expect("construct");

    let encode = scheme.encode().expect("encode graph");
    assert_eq!(encode.len(), 6);

    let available: Vec<usize> = (1..15).collect();
    let graph = scheme.decode(&available, &[0]).expect("decode");
    assert_eq!(graph.len(), 1);
    let node = graph.node(0).expect("node for block 0");
    assert_eq!(node.sources, vec![1, 2, 9]);
    assert_eq!(node.coefficients, vec![1, 1, 1]);
}

#[test]
fn test_maintenance_of_block_zero_uses_global_parities() {
    let scheme = LrcScheme::tradeoff(9, 3, 3, 1, Approach::Maintenance).expect("construct");
    assert_eq!(domain_of(&scheme, 0), vec![0, 1, 2, 9]);

    let available: Vec<usize> = (3..15).filter(|&i| i != 9).collect();
    let plan = scheme.plan_decode(&available, &[0]).expect("plan");
    assert_eq!(plan.strategy, DecodeStrategy::GlobalMaintenance);

    let n = scheme.n();
    let node = plan.graph.node(0).expect("node for block 0");
    assert!(node.sources.iter().all(|&s| s >= n));
    // one virtual symbol per lost data block
    assert_eq!(node.sources, vec![n, n + 1, n + 2]);

    let virtual_inputs: Vec<usize> = plan
        .graph
        .nodes()
        .iter()
        .filter(|v| v.target >= n)
        .flat_map(|v| v.sources.iter().copied())
        .filter(|&s| s >= 9 + 3)
        .collect();
    assert!(!virtual_inputs.is_empty(), "no global parity consumed");

    let original = encoded_stripe(&scheme);
    roundtrip(&scheme, &original, &[0, 1, 2, 9], 0);
}

// =============================================================================
// Roundtrips Across Variants
// =============================================================================

#[test]
fn test_flat_repairs_every_block() {
    let scheme = LrcScheme::flat(9, 3, 3).expect("construct");
    let original = encoded_stripe(&scheme);
    for f in 0..scheme.n() {
        assert_eq!(roundtrip(&scheme, &original, &[f], f), DecodeStrategy::SingleRepair);
    }
}

#[test]
fn test_opt_repair_roundtrips() {
    let repair = LrcScheme::optimized_repair(Approach::Repair).expect("construct");
    let original = encoded_stripe(&repair);
    for f in 0..repair.n() {
        roundtrip(&repair, &original, &[f], f);
    }

    let maintenance = LrcScheme::optimized_repair(Approach::Maintenance).expect("construct");
    for f in 0..maintenance.k() {
        let lost = domain_of(&maintenance, f);
        assert_eq!(
            roundtrip(&maintenance, &original, &lost, f),
            DecodeStrategy::GlobalMaintenance
        );
    }
}

#[test]
fn test_opt_maintenance_roundtrips() {
    let scheme = LrcScheme::optimized_maintenance(Approach::Maintenance).expect("construct");
    let original = encoded_stripe(&scheme);
    for f in 0..scheme.k() {
        let lost = domain_of(&scheme, f);
        assert_eq!(
            roundtrip(&scheme, &original, &lost, f),
            DecodeStrategy::LocalMaintenance
        );
    }
}

#[test]
fn test_tradeoff_roundtrips_for_every_eta() {
    for eta in 0..=2 {
        let scheme = LrcScheme::tradeoff(12, 2, 2, eta, Approach::Maintenance).expect("construct");
        let original = encoded_stripe(&scheme);
        for f in 0..scheme.k() {
            let lost = domain_of(&scheme, f);
            roundtrip(&scheme, &original, &lost, f);
        }
    }
}

#[test]
fn test_fault_domain_recovery_restores_all_lost_blocks() {
    let scheme = LrcScheme::optimized_repair(Approach::Maintenance).expect("construct");
    let original = encoded_stripe(&scheme);

    let mut stripe = original.clone();
    for blk in [0, 1, 2] {
        stripe.remove(blk);
    }
    let graph = scheme.recover_fault_domain(0).expect("domain recovery");
    scheme.apply(&graph, &mut stripe).expect("execute");
    for blk in [0, 1, 2] {
        assert_eq!(stripe.get(blk), original.get(blk));
    }
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_invalid_param_count() {
    let err = LrcScheme::construct(SchemeKind::Flat, 15, 9, 1, -1, &params(&["3"])).unwrap_err();
    assert_matches!(err, Error::Config(_));
}

#[test]
fn test_decode_errors() {
    let scheme = LrcScheme::tradeoff(9, 3, 3, 1, Approach::Maintenance).expect("construct");
    let outside: Vec<usize> = (3..15).filter(|&i| i != 9).collect();

    assert_matches!(
        scheme.decode(&outside, &[0, 1]),
        Err(Error::UnsupportedMultiFailure { .. })
    );
    assert_matches!(
        scheme.decode(&(1..15).collect::<Vec<_>>(), &[0]),
        Err(Error::MaintenancePreconditionViolated { index: 0, .. })
    );
    assert_matches!(
        scheme.decode(&(0..12).collect::<Vec<_>>(), &[13]),
        Err(Error::UnsupportedParityMaintenance { index: 13 })
    );
    assert_matches!(
        LrcScheme::construct(SchemeKind::Tradeoff, 15, 9, 1, -1, &params(&["3", "3", "1", "2"])),
        Err(Error::UnsupportedApproach { approach: 2 })
    );
}

// =============================================================================
// Policies, Cost and Metrics
// =============================================================================

#[test]
fn test_policy_file_end_to_end() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("policies.yaml");
    std::fs::write(
        &path,
        r#"
policies:
  - id: azure-lrc-10-2-2-opt-m
    classname: AzureLRCOptM1022
    n: 14
    k: 10
    param: ["2", "2", "1"]
"#,
    )
    .expect("write policy file");

    let registry = PolicyRegistry::load(&path).expect("load");
    let scheme = registry
        .create_scheme("azure-lrc-10-2-2-opt-m")
        .expect("create scheme");
    assert_eq!(scheme.place().len(), 7);

    let avg = measure_average_cost(&scheme).expect("measure");
    assert!((avg.blocks_read - 5.0).abs() < 1e-9);
}

#[test]
fn test_plan_cost_counts_racks() {
    let scheme = LrcScheme::optimized_repair(Approach::Repair).expect("construct");
    let graph = scheme.decode(&[], &[3]).expect("decode");
    // sources 0,1,2,4,10 live in domains {0,1,2} and {3,4,10}
    let cost = plan_cost(&scheme, &graph);
    assert_eq!(cost.blocks_read, 5);
    assert_eq!(cost.racks_touched, 2);
}

#[test]
fn test_metrics_are_recorded() {
    let scheme = LrcScheme::flat(4, 2, 1).expect("construct");
    scheme.decode(&[], &[0]).expect("decode");
    scheme.decode(&[], &[0, 1]).unwrap_err();

    let text = metrics::render().expect("render");
    assert!(text.contains("lrc_decode_plans_total"));
    assert!(text.contains("lrc_decode_failures_total"));
}
