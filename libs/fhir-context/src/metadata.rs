use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Structural kind of a FHIR type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Primitive,
    Complex,
    Resource,
}

/// Upper bound of a member's cardinality (`1`, `5`, `*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

impl TryFrom<String> for MaxOccurs {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        if value == "*" {
            return Ok(MaxOccurs::Unbounded);
        }
        value
            .parse::<u32>()
            .map(MaxOccurs::Bounded)
            .map_err(|_| Error::InvalidCardinality(value))
    }
}

impl From<MaxOccurs> for String {
    fn from(value: MaxOccurs) -> Self {
        value.to_string()
    }
}

impl fmt::Display for MaxOccurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxOccurs::Bounded(n) => write!(f, "{}", n),
            MaxOccurs::Unbounded => f.write_str("*"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cardinality {
    #[serde(default)]
    pub min: u32,
    pub max: MaxOccurs,
}

impl Cardinality {
    pub const OPTIONAL: Cardinality = Cardinality {
        min: 0,
        max: MaxOccurs::Bounded(1),
    };

    pub const REPEATING: Cardinality = Cardinality {
        min: 0,
        max: MaxOccurs::Unbounded,
    };
}

impl Default for Cardinality {
    fn default() -> Self {
        Cardinality::OPTIONAL
    }
}

/// A member (element) declared on a FHIR type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    /// Declared name; for choice elements this is the name without the `[x]` suffix.
    pub name: String,
    /// Allowed type names (more than one for choice elements).
    pub types: Vec<String>,
    #[serde(default)]
    pub choice: bool,
    #[serde(default)]
    pub cardinality: Cardinality,
}

impl MemberInfo {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: vec![type_name.into()],
            choice: false,
            cardinality: Cardinality::default(),
        }
    }

    pub fn choice(name: impl Into<String>, types: &[&str]) -> Self {
        Self {
            name: name.into(),
            types: types.iter().map(|t| t.to_string()).collect(),
            choice: true,
            cardinality: Cardinality::default(),
        }
    }

    pub fn repeating(mut self) -> Self {
        self.cardinality = Cardinality::REPEATING;
        self
    }

    pub fn is_collection(&self) -> bool {
        match self.cardinality.max {
            MaxOccurs::Unbounded => true,
            MaxOccurs::Bounded(n) => n > 1,
        }
    }

    /// The single declared type, if the member is not polymorphic.
    pub fn type_name(&self) -> Option<&str> {
        match self.types.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }

    /// Match a concrete element name (`valueString`) against this choice element (`value`)
    /// and narrow it to the selected alternative.
    fn resolve_choice(&self, element_name: &str) -> Option<MemberInfo> {
        if !self.choice {
            return None;
        }
        let suffix = element_name.strip_prefix(self.name.as_str())?;
        if suffix.is_empty() {
            return None;
        }
        let selected = self
            .types
            .iter()
            .find(|t| capitalize(t) == suffix)?
            .clone();
        Some(MemberInfo {
            name: element_name.to_string(),
            types: vec![selected],
            choice: false,
            cardinality: self.cardinality,
        })
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Structural metadata for one FHIR type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeInfo {
    pub name: String,
    pub kind: TypeKind,
    #[serde(default)]
    pub members: Vec<MemberInfo>,
}

impl TypeInfo {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            members: Vec::new(),
        }
    }

    pub fn with_member(mut self, member: MemberInfo) -> Self {
        self.members.push(member);
        self
    }
}

/// Lookup service resolving (type, member) pairs to structural metadata.
///
/// Implementations are expected to be cheap to query; navigators call
/// `member()` once per child node they type.
pub trait ModelMetadataProvider: Send + Sync {
    fn type_info(&self, type_name: &str) -> Option<&TypeInfo>;

    /// Resolve a member of a type, including choice elements (`value[x]`).
    fn member(&self, type_name: &str, member_name: &str) -> Option<MemberInfo> {
        let info = self.type_info(type_name)?;
        if let Some(exact) = info.members.iter().find(|m| m.name == member_name) {
            return Some(exact.clone());
        }
        info.members
            .iter()
            .find_map(|m| m.resolve_choice(member_name))
    }

    fn is_resource(&self, type_name: &str) -> bool {
        self.type_info(type_name)
            .is_some_and(|info| info.kind == TypeKind::Resource)
    }

    /// Primitive types are either declared as such or, when unknown, follow the
    /// FHIR naming rule (primitive type names start with a lowercase letter).
    fn is_primitive(&self, type_name: &str) -> bool {
        match self.type_info(type_name) {
            Some(info) => info.kind == TypeKind::Primitive,
            None => type_name.starts_with(|c: char| c.is_ascii_lowercase()),
        }
    }
}

/// Metadata provider backed by a hash map of type definitions.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetadataProvider {
    types: HashMap<String, TypeInfo>,
}

impl InMemoryMetadataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON array of type definitions:
    ///
    /// ```json
    /// [{ "name": "Patient", "kind": "resource",
    ///    "members": [{ "name": "active", "types": ["boolean"] }] }]
    /// ```
    pub fn from_json(input: &str) -> Result<Self> {
        let definitions: Vec<TypeInfo> = serde_json::from_str(input)?;
        let mut provider = Self::new();
        for definition in definitions {
            provider.insert(definition)?;
        }
        Ok(provider)
    }

    pub fn insert(&mut self, info: TypeInfo) -> Result<()> {
        if self.types.contains_key(&info.name) {
            return Err(Error::DuplicateType(info.name));
        }
        self.types.insert(info.name.clone(), info);
        Ok(())
    }

    /// Builder-style insert; a later definition replaces an earlier one.
    pub fn with_type(mut self, info: TypeInfo) -> Self {
        self.types.insert(info.name.clone(), info);
        self
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl ModelMetadataProvider for InMemoryMetadataProvider {
    fn type_info(&self, type_name: &str) -> Option<&TypeInfo> {
        self.types.get(type_name)
    }
}
