//! Erasure Coding Plumbing
//!
//! Code-agnostic building blocks shared by every LRC scheme.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Erasure Coding Plumbing                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                          │
//! │  ┌──────────────┐    ┌──────────────┐    ┌───────────────────────────┐  │
//! │  │   GF(2^8)    │    │    Matrix    │    │   Dependency Graph        │  │
//! │  │  Primitives  │    │  (row-major) │    │   (join / bind / lower)   │  │
//! │  └──────────────┘    └──────────────┘    └───────────────────────────┘  │
//! │         │                   │                         │                  │
//! │         └───────────────────┼─────────────────────────┘                  │
//! │                             │                                            │
//! │                   ┌─────────┴─────────┐                                  │
//! │                   │ Executor / Cost   │                                  │
//! │                   └───────────────────┘                                  │
//! │                                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - **GF(2^8) Primitives** (`galois.rs`): scalar division, Gauss-Jordan
//!   inversion and batched multiply-accumulate over byte buffers.
//! - **Matrix** (`matrix.rs`): owned row-major matrices with 2-D indexing.
//! - **Dependency Graph** (`dag.rs`): linear-combination nodes, co-scheduled
//!   bindings, topological ordering and lowering into compute tasks.
//! - **Executor** (`executor.rs`): evaluates compute tasks over stripe buffers.
//! - **Cost** (`cost.rs`): read accounting for a plan.

pub mod cost;
pub mod dag;
pub mod executor;
pub mod galois;
pub mod matrix;

pub use cost::RepairCost;
pub use dag::{ComputeTask, EcDag, LinearNode};
pub use executor::{execute_graph, execute_tasks, StripeBuffers};
pub use matrix::Matrix;
