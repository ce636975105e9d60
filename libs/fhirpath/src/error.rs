//! Error types for FHIRPath evaluation

use tessera_format::FormatError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("Unknown function: {name}/{arity}")]
    UnknownFunction { name: String, arity: usize },

    #[error("Wrong number of arguments for {name}: expected {expected}, got {actual}")]
    WrongArity {
        name: String,
        expected: String,
        actual: usize,
    },

    #[error("Expected a single item, got {0}")]
    NotSingleton(usize),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    #[error("Evaluation exceeded the maximum depth of {0}")]
    DepthExceeded(usize),

    #[error(transparent)]
    Format(#[from] FormatError),
}

impl Error {
    /// Everything except input-format failures is raised while walking an expression.
    pub fn is_evaluation_error(&self) -> bool {
        !matches!(self, Error::Format(_))
    }
}
