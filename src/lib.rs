//! LRC Tradeoff - Locally Repairable Code Planning
//!
//! Azure-style LRC(k, l, g) schemes over GF(2^8) with fault-domain aware
//! placement. Given a failure, a scheme plans the cheapest set of linear
//! combinations that restores the lost block and returns it as a dependency
//! graph for an executor.
//!
//! # Architecture
//!
//! ```text
//! Policy (YAML) → LrcScheme → encode / decode → EcDag → executor / cost
//! ```
//!
//! # Modules
//!
//! - [`ec`] - Field arithmetic, matrices, dependency graphs, execution, cost
//! - [`error`] - Error types
//! - [`lrc`] - Scheme construction, placement and decode planning
//! - [`metrics`] - Prometheus counters for decode planning
//! - [`policy`] - YAML policy registry

pub mod ec;
pub mod error;
pub mod lrc;
pub mod metrics;
pub mod policy;

// Re-export commonly used types
pub use ec::{EcDag, StripeBuffers};
pub use error::{Error, Result};
pub use lrc::{Approach, DecodePlan, DecodeStrategy, LrcScheme, SchemeKind};
pub use policy::{EcPolicy, PolicyRegistry};
