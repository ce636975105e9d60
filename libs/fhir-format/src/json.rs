//! JSON document adapter
//!
//! Follows the FHIR JSON mapping:
//! - The root type is the `resourceType` property.
//! - Arrays are repeated members; `null` items without metadata are skipped.
//! - Primitive metadata (`id`, `extension`) travels in `_field` entries and shows up
//!   as members of the primitive node, even when the primitive has no value.

use crate::error::{FormatError, Result};
use crate::navigator::{ElementNavigator, Member, Members, NodeRef, SiblingCounter};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use tessera_context::ModelMetadataProvider;

pub struct JsonDocument {
    value: Value,
    resource_type: String,
    metadata: Option<Arc<dyn ModelMetadataProvider>>,
}

impl JsonDocument {
    pub fn parse(input: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(input).map_err(|e| FormatError::Json(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let resource_type = value
            .as_object()
            .ok_or_else(|| FormatError::Json("expected a JSON object for the resource".into()))?
            .get("resourceType")
            .and_then(Value::as_str)
            .ok_or(FormatError::MissingRootType)?
            .to_string();

        tracing::debug!(resource_type = %resource_type, "parsed json resource");

        Ok(Self {
            value,
            resource_type,
            metadata: None,
        })
    }

    pub fn with_metadata(mut self, metadata: Arc<dyn ModelMetadataProvider>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn resource_type_name(&self) -> &str {
        &self.resource_type
    }

    pub fn root(&self) -> JsonNavigator<'_> {
        JsonNavigator {
            document: self,
            name: &self.resource_type,
            value: Some(&self.value),
            meta: None,
            type_name: Some(Cow::Borrowed(&self.resource_type)),
            location: self.resource_type.clone(),
        }
    }

    pub fn root_node(&self) -> NodeRef<'_> {
        Rc::new(self.root())
    }

    fn member_type<'a>(
        &'a self,
        parent_type: Option<&str>,
        name: &str,
        value: Option<&'a Value>,
    ) -> Option<Cow<'a, str>> {
        if let Some(resource_type) = value
            .and_then(Value::as_object)
            .and_then(|obj| obj.get("resourceType"))
            .and_then(Value::as_str)
        {
            return Some(Cow::Borrowed(resource_type));
        }
        let metadata = self.metadata.as_deref()?;
        let info = metadata.member(parent_type?, name)?;
        info.type_name().map(|t| Cow::Owned(t.to_string()))
    }
}

impl fmt::Debug for JsonDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonDocument")
            .field("resource_type", &self.resource_type)
            .field("has_metadata", &self.metadata.is_some())
            .finish()
    }
}

#[derive(Clone)]
pub struct JsonNavigator<'a> {
    document: &'a JsonDocument,
    name: &'a str,
    value: Option<&'a Value>,
    /// The `_name` companion object of a primitive.
    meta: Option<&'a Value>,
    type_name: Option<Cow<'a, str>>,
    location: String,
}

impl<'a> JsonNavigator<'a> {
    /// Properties that become members: the object itself, or the primitive's metadata.
    fn properties(&self) -> Option<&'a Map<String, Value>> {
        match self.value {
            Some(Value::Object(obj)) => Some(obj),
            _ => self.meta.and_then(Value::as_object),
        }
    }
}

/// Expand one property (plus its `_name` companion) into (value, meta) items.
fn expand<'a>(
    value: Option<&'a Value>,
    meta: Option<&'a Value>,
) -> Vec<(Option<&'a Value>, Option<&'a Value>)> {
    let present = |v: Option<&'a Value>| v.filter(|v| !v.is_null());

    match (value, meta) {
        (Some(Value::Array(items)), meta) => {
            let metas = meta.and_then(Value::as_array);
            items
                .iter()
                .enumerate()
                .map(|(idx, item)| (present(Some(item)), present(metas.and_then(|m| m.get(idx)))))
                .filter(|(v, m)| v.is_some() || m.is_some())
                .collect()
        }
        // Metadata-only repeating primitive.
        (None, Some(Value::Array(metas))) => metas
            .iter()
            .filter(|m| !m.is_null())
            .map(|m| (None, Some(m)))
            .collect(),
        (value, meta) => match (present(value), present(meta)) {
            (None, None) => Vec::new(),
            pair => vec![pair],
        },
    }
}

impl<'a> ElementNavigator<'a> for JsonNavigator<'a> {
    fn name(&self) -> &str {
        self.name
    }

    fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    fn members(&self) -> Members<'a> {
        let Some(properties) = self.properties() else {
            return Box::new(std::iter::empty());
        };
        let is_object = matches!(self.value, Some(Value::Object(_)));

        let mut entries: Vec<(&'a str, Option<&'a Value>, Option<&'a Value>)> = Vec::new();
        for (key, value) in properties {
            if key == "resourceType" && is_object {
                continue;
            }
            if let Some(plain) = key.strip_prefix('_') {
                if is_object && !properties.contains_key(plain) {
                    for (v, m) in expand(None, Some(value)) {
                        entries.push((plain, v, m));
                    }
                }
                continue;
            }
            let meta = if is_object {
                properties.get(&format!("_{}", key))
            } else {
                None
            };
            for (v, m) in expand(Some(value), meta) {
                entries.push((key.as_str(), v, m));
            }
        }

        let document = self.document;
        let parent_type = self.type_name.clone();
        let parent_location = self.location.clone();
        let mut counter = SiblingCounter::default();
        Box::new(entries.into_iter().map(move |(name, value, meta)| {
            let child = JsonNavigator {
                document,
                name,
                value,
                meta,
                type_name: document.member_type(parent_type.as_deref(), name, value),
                location: counter.location(&parent_location, name),
            };
            Member {
                name: name.to_string(),
                node: Rc::new(child) as NodeRef<'a>,
            }
        }))
    }

    fn primitive_value(&self) -> Option<Cow<'a, str>> {
        match self.value? {
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            // Numbers keep their written form (`1.50`) under `arbitrary_precision`.
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            _ => None,
        }
    }

    fn location(&self) -> &str {
        &self.location
    }
}

impl fmt::Debug for JsonNavigator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonNavigator")
            .field("location", &self.location)
            .field("type_name", &self.type_name)
            .finish()
    }
}
