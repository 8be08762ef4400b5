//! Azure-style Locally Repairable Codes
//!
//! Scheme construction, placement over fault domains, and the decode
//! planners that turn a failure into a dependency graph.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              LrcScheme                                   │
//! │           (Flat | Tradeoff | OptimizedRepair | OptimizedMaintenance)     │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                          │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────────────────┐ │
//! │  │  Generator   │   │  Placement   │   │        Decode Selector        │ │
//! │  │  (n x k)     │   │  (racks)     │   │ repair │ local │ global maint │ │
//! │  └──────┬───────┘   └──────┬───────┘   └──────────────┬───────────────┘ │
//! │         │                  │                          │                  │
//! │         └─────── encode ───┴──────── decode ──────────┘                  │
//! │                              │                                           │
//! │                              ▼                                           │
//! │                     EcDag (ec::dag) ──▶ executor / cost                  │
//! │                                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use lrc_tradeoff::lrc::{Approach, DecodeStrategy, LrcScheme};
//!
//! let scheme = LrcScheme::tradeoff(9, 3, 3, 1, Approach::Maintenance).unwrap();
//! assert_eq!(scheme.place()[0], vec![0, 1, 2, 9]);
//!
//! let available: Vec<usize> = (3..15).filter(|&i| i != 9).collect();
//! let plan = scheme.plan_decode(&available, &[0]).unwrap();
//! assert_eq!(plan.strategy, DecodeStrategy::GlobalMaintenance);
//! ```

pub mod analysis;
pub mod decode;
pub mod generator;
pub mod maintenance;
pub mod placement;
pub mod scheme;

mod proptest;

pub use analysis::{
    check_single_domain_tolerance, measure_average_cost, plan_cost, tradeoff_curve, AverageCost,
    TradeoffPoint,
};
pub use decode::{DecodePlan, DecodeStrategy};
pub use generator::generator_matrix;
pub use placement::{Group, Placement};
pub use scheme::{Approach, LrcScheme, SchemeKind};
