//! Format-agnostic navigation over FHIR resources.
//!
//! Each serialization gets an adapter that parses the text into an owned document
//! and hands out [`ElementNavigator`] cursors over it:
//! - [`XmlDocument`]: document form, backed by `roxmltree`.
//! - [`TurtleDocument`]: graph form (FHIR RDF), backed by `oxttl`/`oxrdf`.
//! - [`JsonDocument`]: the FHIR JSON mapping, backed by `serde_json`.
//!
//! Consumers only see the navigator contract, so the same FHIRPath evaluation runs
//! unchanged over every format.

pub mod error;
pub mod json;
pub mod navigator;
pub mod turtle;
pub mod xml;

pub use error::{FormatError, Position, Result};
pub use json::{JsonDocument, JsonNavigator};
pub use navigator::{ElementNavigator, Member, Members, NodeRef};
pub use turtle::{
    parse_predicate, PredicateName, TurtleDocument, TurtleNavigator, TurtleReaderOptions,
};
pub use xml::{XmlDocument, XmlNavigator, XmlReaderOptions};
