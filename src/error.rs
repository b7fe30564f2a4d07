//! Engine error types.
//!
//! Covers lifecycle misuse (`NotInitialized`, `AlreadyRunning`), input
//! problems (`InvalidInstance`, `InvalidConfig`), cooperative cancellation,
//! and persistence failures. Evaluation failures inside a batch are *not*
//! represented here: a candidate whose evaluation panics is replaced by a
//! sentinel solution with infinite fitness so the search can continue.

use thiserror::Error;

/// Errors surfaced by the optimization engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An operation required a problem instance, but none is set.
    #[error("no problem instance has been initialized")]
    NotInitialized,

    /// A run or step mode was requested while a run is in progress.
    #[error("an optimization run is already in progress")]
    AlreadyRunning,

    /// The problem instance failed validation (cycle, dangling reference).
    #[error("invalid problem instance: {0}")]
    InvalidInstance(String),

    /// A configuration value is out of range or violates a derived constraint.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The run was cancelled cooperatively. Not a failure.
    #[error("the run was cancelled")]
    Cancelled,

    /// Serializing a solution export failed.
    #[error("export failed: {0}")]
    Export(String),

    /// Parsing or validating an imported solution failed.
    #[error("import failed: {0}")]
    Import(String),
}

/// Convenience alias for engine results.
pub type EngineResult<T> = Result<T, EngineError>;
