//! Error types for LRC planning and execution

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing schemes, planning decodes, or
/// executing planned graphs
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Policy file parse error
    #[error("Failed to parse policy file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid scheme configuration (parameter count, divisibility, ranges)
    #[error("Configuration error: {0}")]
    Config(String),

    // =========================================================================
    // Decode Errors
    // =========================================================================
    /// More than one block requested at the single-failure entry point
    #[error("Multi-block recovery is not supported: failed blocks {failed:?}")]
    UnsupportedMultiFailure { failed: Vec<usize> },

    /// Maintenance was requested for a parity block
    #[error("Maintenance of parity block {index} is not supported")]
    UnsupportedParityMaintenance { index: usize },

    /// Unknown repair/maintenance approach code
    #[error("Unsupported decode approach: {approach}")]
    UnsupportedApproach { approach: i64 },

    /// Other members of the failed block's fault domain are still available
    #[error("Maintenance precondition violated for block {index}: fault domain members {alive:?} are still available")]
    MaintenancePreconditionViolated { index: usize, alive: Vec<usize> },

    /// The synthesized recovery system is not square or not solvable
    #[error("Recovery system invariant violated: {0}")]
    RecoverySystemInvariantViolation(String),

    /// Malformed decode request (empty failure set, out of range index)
    #[error("Invalid decode request: {0}")]
    InvalidRequest(String),

    // =========================================================================
    // Field Arithmetic Errors
    // =========================================================================
    /// Matrix inversion hit a zero pivot
    #[error("Matrix of size {size} is singular over GF(2^8)")]
    SingularMatrix { size: usize },

    /// Division by the zero element
    #[error("Division by zero in GF(2^8)")]
    DivisionByZero,

    // =========================================================================
    // Graph / Execution Errors
    // =========================================================================
    /// Malformed dependency graph (duplicate targets, cycles, arity mismatch)
    #[error("Dependency graph error: {0}")]
    Graph(String),

    /// A task needed a block buffer that was neither supplied nor computed
    #[error("Block {index} is not available for computation")]
    MissingBlock { index: usize },

    /// Buffers handed to a kernel disagree on length
    #[error("Buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Metric registration or encoding failed
    #[error("Metrics error: {0}")]
    Metrics(String),
}

impl Error {
    /// Short machine-friendly reason label, used for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Yaml(_) => "yaml",
            Error::Config(_) => "config",
            Error::UnsupportedMultiFailure { .. } => "unsupported_multi_failure",
            Error::UnsupportedParityMaintenance { .. } => "unsupported_parity_maintenance",
            Error::UnsupportedApproach { .. } => "unsupported_approach",
            Error::MaintenancePreconditionViolated { .. } => "maintenance_precondition",
            Error::RecoverySystemInvariantViolation(_) => "recovery_system_invariant",
            Error::InvalidRequest(_) => "invalid_request",
            Error::SingularMatrix { .. } => "singular_matrix",
            Error::DivisionByZero => "division_by_zero",
            Error::Graph(_) => "graph",
            Error::MissingBlock { .. } => "missing_block",
            Error::BufferSizeMismatch { .. } => "buffer_size_mismatch",
            Error::Metrics(_) => "metrics",
        }
    }
}
