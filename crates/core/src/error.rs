use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LaeError {
    #[error("Dimension mismatch: {0}")]
    Dimension(String),

    #[error("Orientation mismatch: {0}")]
    Orientation(String),

    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Ragged matrix: row {row} has {found} columns, expected {expected}")]
    RaggedMatrix {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Operator {operator} expects {expected} operands, got {found}")]
    Arity {
        operator: String,
        expected: String,
        found: usize,
    },

    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Node not found: {0}")]
    NodeNotFound(usize),

    #[error("Node {0} is not a resolved matrix")]
    NotAMatrix(usize),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Worker pool has been shut down")]
    PoolShutDown,

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("{failed} of {submitted} tasks failed: {first}")]
    TaskFailed {
        submitted: usize,
        failed: usize,
        first: String,
    },

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for LaeError {
    fn from(e: serde_json::Error) -> Self {
        LaeError::Json(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LaeError>;
