//! Error types for format adapters

use std::fmt;
use thiserror::Error;

/// Line/column of a diagnostic inside the source text.
///
/// Formats without positional metadata (Turtle) report [`Position::UNKNOWN`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub line: i64,
    pub column: i64,
}

impl Position {
    pub const UNKNOWN: Position = Position {
        line: -1,
        column: -1,
    };

    pub fn new(line: i64, column: i64) -> Self {
        Self { line, column }
    }

    pub fn is_known(&self) -> bool {
        self.line >= 0 && self.column >= 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_known() {
            write!(f, "{}:{}", self.line, self.column)
        } else {
            f.write_str("unknown position")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Cannot parse xml: {message} ({position})")]
    Xml { message: String, position: Position },

    #[error("Cannot parse turtle: {0}")]
    Turtle(String),

    #[error("Cannot parse json: {0}")]
    Json(String),

    #[error("Unable to determine resource type: no subject is marked as tree root")]
    MissingRoot,

    #[error("Unable to determine resource type: {0} subjects are marked as tree root")]
    AmbiguousRoot(usize),

    #[error("Unable to determine resource type: root carries no type statement")]
    MissingRootType,

    #[error("Unable to determine resource type: {0} is not a FHIR type")]
    UnrecognizedType(String),

    #[error("Element at {location} has no known type")]
    UnknownType { location: String },

    #[error("Invalid predicate {predicate}: {reason}")]
    InvalidPredicate { predicate: String, reason: String },
}

impl FormatError {
    pub fn position(&self) -> Position {
        match self {
            FormatError::Xml { position, .. } => *position,
            _ => Position::UNKNOWN,
        }
    }
}

pub type Result<T> = std::result::Result<T, FormatError>;
