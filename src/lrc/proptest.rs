//! Property-Based Tests for LRC Schemes
//!
//! # Test Properties
//!
//! 1. **Placement**: every layout partitions `[0, n)` and is stable
//! 2. **Generator**: identity and local rows, bit-identical regeneration
//! 3. **Repair Roundtrip**: encode → lose one block → decode → compare
//! 4. **Maintenance Roundtrip**: encode → lose a whole fault domain →
//!    decode each data block → compare
//! 5. **Preconditions**: any surviving domain member rejects maintenance

#![cfg(test)]

use proptest::prelude::*;

use super::analysis::{check_single_domain_tolerance, measure_average_cost, tradeoff_curve};
use super::generator::generator_matrix;
use super::placement::{max_eta, validate_partition, Placement};
use super::scheme::{Approach, LrcScheme};
use crate::ec::executor::StripeBuffers;
use crate::error::Error;

const BLOCK_SIZE: usize = 16;

// =============================================================================
// Property Strategies
// =============================================================================

/// (k, l, g) with l | k: l in 1..=4, b in 1..=6, g in 1..=3
fn code_shape_strategy() -> impl Strategy<Value = (usize, usize, usize)> {
    (1usize..=4, 1usize..=6, 1usize..=3).prop_map(|(l, b, g)| (l * b, l, g))
}

/// Code shape plus an in-range eta
fn tradeoff_strategy() -> impl Strategy<Value = (usize, usize, usize, usize)> {
    code_shape_strategy().prop_flat_map(|(k, l, g)| {
        let eta_max = max_eta(k / l, g);
        (Just(k), Just(l), Just(g), 0..=eta_max)
    })
}

/// Tradeoff parameters with random stripe contents
fn stripe_strategy() -> impl Strategy<Value = ((usize, usize, usize, usize), Vec<u8>)> {
    tradeoff_strategy().prop_flat_map(|params| {
        let k = params.0;
        (
            Just(params),
            prop::collection::vec(any::<u8>(), k * BLOCK_SIZE),
        )
    })
}

fn encoded_stripe(scheme: &LrcScheme, data: &[u8]) -> StripeBuffers {
    let mut stripe = StripeBuffers::new(BLOCK_SIZE);
    for (i, chunk) in data.chunks(BLOCK_SIZE).enumerate() {
        stripe.insert(i, chunk.to_vec()).unwrap();
    }
    scheme.encode_stripe(&mut stripe).unwrap();
    stripe
}

// =============================================================================
// Placement and Generator Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: tunable placement is an exact, stable partition.
    #[test]
    fn prop_tunable_placement_partitions((k, l, g, eta) in tradeoff_strategy()) {
        let placement = Placement::Tunable { k, l, g, eta };
        let first = placement.place();
        validate_partition(&first, k + l + g)?;
        prop_assert_eq!(first, placement.place());
    }

    /// Property: tunable placement survives any single fault domain.
    #[test]
    fn prop_tunable_placement_tolerates_one_domain((k, l, g, eta) in tradeoff_strategy()) {
        let groups = Placement::Tunable { k, l, g, eta }.place();
        check_single_domain_tolerance(&groups, k, l, g)?;
    }

    /// Property: generator rows follow the systematic LRC layout.
    #[test]
    fn prop_generator_structure((k, l, g) in code_shape_strategy()) {
        let m = generator_matrix(k, l, g)?;
        let b = k / l;
        for r in 0..k {
            for c in 0..k {
                prop_assert_eq!(m[(r, c)], u8::from(r == c));
            }
        }
        for i in 0..l {
            for c in 0..k {
                prop_assert_eq!(m[(k + i, c)], u8::from(c / b == i));
            }
        }
        prop_assert_eq!(m, generator_matrix(k, l, g)?);
    }
}

// =============================================================================
// Roundtrip Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: any single lost block is restored by its repair graph.
    #[test]
    fn prop_repair_roundtrip(((k, l, g, eta), data) in stripe_strategy(), pick in any::<prop::sample::Index>()) {
        let scheme = LrcScheme::tradeoff(k, l, g, eta, Approach::Repair)?;
        let f = pick.index(scheme.n());
        let original = encoded_stripe(&scheme, &data);

        let mut stripe = original.clone();
        stripe.remove(f);
        let available = stripe.indices();
        let graph = scheme.decode(&available, &[f])?;
        prop_assert_eq!(graph.len(), 1);
        scheme.apply(&graph, &mut stripe)?;

        prop_assert_eq!(stripe.get(f), original.get(f));
    }

    /// Property: every data block is restored when its whole domain is down.
    #[test]
    fn prop_maintenance_roundtrip(((k, l, g, eta), data) in stripe_strategy()) {
        let scheme = LrcScheme::tradeoff(k, l, g, eta, Approach::Maintenance)?;
        let original = encoded_stripe(&scheme, &data);
        let groups = scheme.place();

        for f in 0..k {
            let rack = groups.iter().find(|r| r.contains(&f)).unwrap();
            let mut stripe = original.clone();
            for blk in rack {
                stripe.remove(*blk);
            }
            let available = stripe.indices();
            prop_assert!(scheme.check_maintenance_constraints(&available, f));

            let graph = scheme.decode(&available, &[f])?;
            prop_assert!(graph.inputs().iter().all(|i| available.contains(i)));
            scheme.apply(&graph, &mut stripe)?;
            prop_assert_eq!(stripe.get(f), original.get(f));
            prop_assert!(stripe.indices().iter().all(|&i| i < scheme.n()));
        }
    }

    /// Property: whole-domain recovery restores every lost data block.
    #[test]
    fn prop_fault_domain_recovery(((k, l, g, eta), data) in stripe_strategy()) {
        let scheme = LrcScheme::tradeoff(k, l, g, eta, Approach::Maintenance)?;
        let original = encoded_stripe(&scheme, &data);

        for (pos, rack) in scheme.place().iter().enumerate() {
            if rack.iter().all(|&b| b >= k) {
                continue;
            }
            let mut stripe = original.clone();
            for blk in rack {
                stripe.remove(*blk);
            }
            let graph = scheme.recover_fault_domain(pos)?;
            scheme.apply(&graph, &mut stripe)?;
            for &blk in rack.iter().filter(|&&b| b < k) {
                prop_assert_eq!(stripe.get(blk), original.get(blk));
            }
        }
    }
}

// =============================================================================
// Precondition and Cost Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: a surviving member of the failed domain blocks maintenance.
    #[test]
    fn prop_precondition_detects_live_members((k, l, g, eta) in tradeoff_strategy(), pick in any::<prop::sample::Index>()) {
        let scheme = LrcScheme::tradeoff(k, l, g, eta, Approach::Maintenance)?;
        let f = pick.index(k);
        let groups = scheme.place();
        let rack = groups.iter().find(|r| r.contains(&f)).unwrap();

        if let Some(&alive) = rack.iter().find(|&&b| b != f) {
            let mut available: Vec<usize> = (0..scheme.n()).filter(|i| !rack.contains(i)).collect();
            available.push(alive);
            prop_assert!(!scheme.check_maintenance_constraints(&available, f));
            let is_precondition_error = matches!(
                scheme.decode(&available, &[f]),
                Err(Error::MaintenancePreconditionViolated { .. })
            );
            prop_assert!(is_precondition_error);
        }
    }

    /// Property: measured cross-domain repair reads equal the closed-form ADC.
    #[test]
    fn prop_measured_repair_cost_matches_curve((k, l, g, eta) in tradeoff_strategy()) {
        let scheme = LrcScheme::tradeoff(k, l, g, eta, Approach::Repair)?;
        let measured = measure_average_cost(&scheme)?;
        let point = tradeoff_curve(k, l, g)?[eta];
        prop_assert!((measured.domains_touched - point.adc).abs() < 1e-9);
    }
}
