//! FHIR type metadata for element navigation
//!
//! Provides a trait-based interface for looking up which members exist on which
//! FHIR types, whether they are primitive, and how often they may repeat. Navigator
//! adapters consult it to infer the type of child nodes, the evaluator consults it
//! for strict path validation.

pub mod error;
pub mod metadata;

pub use error::{Error, Result};
pub use metadata::{
    Cardinality, InMemoryMetadataProvider, MaxOccurs, MemberInfo, ModelMetadataProvider,
    TypeInfo, TypeKind,
};
