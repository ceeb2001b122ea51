//! The single error type shared by every mining engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MineError {
    /// A projection or tree allocation would exceed the configured memory budget.
    #[error("memory budget exceeded: requested {requested} bytes, {available} available")]
    BudgetExceeded { requested: usize, available: usize },

    /// The run was cancelled through its `CancelToken`.
    #[error("mining aborted")]
    Aborted,

    /// The reporter could not accept a pattern.
    #[error("reporter failed: {0}")]
    Report(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid transaction data: {0}")]
    Data(String),

    /// A distribution could not be set up for a significance test.
    #[error("statistics error: {0}")]
    Stats(String),

    #[error("configuration parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MineError>;
