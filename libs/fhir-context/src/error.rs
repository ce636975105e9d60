//! Error types for FHIR type metadata

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Duplicate type definition: {0}")]
    DuplicateType(String),

    #[error("Invalid cardinality: {0}")]
    InvalidCardinality(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
