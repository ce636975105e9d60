//! Document-form adapter: FHIR XML
//!
//! Follows the FHIR XML representation rules:
//! - The root element name is the resource type.
//! - Primitive values live in the `value` attribute.
//! - Other attributes (`id`, `url`) are primitive members of their element.
//! - Resources nested in elements (`contained`, `entry.resource`) are wrapped in an
//!   element named after the resource type.
//! - Narrative `div` elements are XHTML and keep their raw markup as value.

use crate::error::{FormatError, Position, Result};
use crate::navigator::{ElementNavigator, Member, Members, NodeRef, SiblingCounter};
use roxmltree::{Attribute, Document, Node, ParsingOptions};
use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use tessera_context::ModelMetadataProvider;

const FHIR_NS: &str = "http://hl7.org/fhir";
const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

#[derive(Debug, Clone, Default)]
pub struct XmlReaderOptions {
    /// Accept documents carrying a DTD. Prohibited by default.
    pub allow_dtd: bool,
}

/// A parsed FHIR XML document; owns the element arena its navigators point into.
pub struct XmlDocument<'input> {
    source: &'input str,
    document: Document<'input>,
    metadata: Option<Arc<dyn ModelMetadataProvider>>,
}

impl<'input> XmlDocument<'input> {
    pub fn parse(source: &'input str) -> Result<Self> {
        Self::parse_with_options(source, &XmlReaderOptions::default())
    }

    pub fn parse_with_options(source: &'input str, options: &XmlReaderOptions) -> Result<Self> {
        let parsing = ParsingOptions {
            allow_dtd: options.allow_dtd,
            ..ParsingOptions::default()
        };
        let document =
            Document::parse_with_options(source, parsing).map_err(|e| FormatError::Xml {
                message: e.to_string(),
                position: Position::new(e.pos().row as i64, e.pos().col as i64),
            })?;

        let root = document.root_element();
        if root.tag_name().namespace() != Some(FHIR_NS) {
            tracing::debug!(
                root = root.tag_name().name(),
                "xml root element is not in the FHIR namespace"
            );
        }

        Ok(Self {
            source,
            document,
            metadata: None,
        })
    }

    /// Use a metadata provider to infer the type of child elements.
    pub fn with_metadata(mut self, metadata: Arc<dyn ModelMetadataProvider>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn root(&self) -> XmlNavigator<'_, 'input> {
        let node = self.document.root_element();
        let name = node.tag_name().name();
        XmlNavigator {
            document: self,
            cursor: Cursor::Element(node),
            name,
            type_name: Some(Cow::Borrowed(name)),
            location: name.to_string(),
        }
    }

    pub fn root_node(&self) -> NodeRef<'_> {
        Rc::new(self.root())
    }

    fn member_type<'a>(&'a self, parent_type: Option<&str>, name: &str) -> Option<Cow<'a, str>> {
        let metadata = self.metadata.as_deref()?;
        let member = metadata.member(parent_type?, name)?;
        member.type_name().map(|t| Cow::Owned(t.to_string()))
    }
}

impl fmt::Debug for XmlDocument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlDocument")
            .field("root", &self.document.root_element().tag_name().name())
            .field("has_metadata", &self.metadata.is_some())
            .finish()
    }
}

#[derive(Clone, Copy)]
enum Cursor<'a, 'input: 'a> {
    Element(Node<'a, 'input>),
    Attribute {
        owner: Node<'a, 'input>,
        value: &'a str,
    },
}

#[derive(Clone)]
pub struct XmlNavigator<'a, 'input: 'a> {
    document: &'a XmlDocument<'input>,
    cursor: Cursor<'a, 'input>,
    name: &'a str,
    type_name: Option<Cow<'a, str>>,
    location: String,
}

impl<'a, 'input: 'a> XmlNavigator<'a, 'input> {
    fn child(
        document: &'a XmlDocument<'input>,
        parent_type: Option<&str>,
        name: &'a str,
        cursor: Cursor<'a, 'input>,
        location: String,
    ) -> Self {
        let (cursor, type_name) = match cursor {
            Cursor::Element(node) => match contained_resource(node) {
                Some(resource) => (
                    Cursor::Element(resource),
                    Some(Cow::Borrowed(resource.tag_name().name())),
                ),
                None => (cursor, document.member_type(parent_type, name)),
            },
            Cursor::Attribute { .. } => (
                cursor,
                document
                    .member_type(parent_type, name)
                    .or_else(|| attribute_type(name).map(Cow::Borrowed)),
            ),
        };

        Self {
            document,
            cursor,
            name,
            type_name,
            location,
        }
    }
}

impl<'a, 'input: 'a> ElementNavigator<'a> for XmlNavigator<'a, 'input> {
    fn name(&self) -> &str {
        self.name
    }

    fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    fn members(&self) -> Members<'a> {
        let node = match self.cursor {
            Cursor::Element(node) if !is_xhtml(node) => node,
            _ => return Box::new(std::iter::empty()),
        };

        let document = self.document;
        let parent_location = self.location.clone();
        let parent_type = self.type_name.clone();
        let mut counter = SiblingCounter::default();

        let attributes = node
            .attributes()
            .filter(is_member_attribute)
            .map(move |attr| {
                (
                    attr.name(),
                    Cursor::Attribute {
                        owner: node,
                        value: attr.value(),
                    },
                )
            });
        let elements = node
            .children()
            .filter(|child| child.is_element())
            .map(|child| (child.tag_name().name(), Cursor::Element(child)));

        Box::new(attributes.chain(elements).map(move |(name, cursor)| {
            let location = counter.location(&parent_location, name);
            let child = XmlNavigator::child(document, parent_type.as_deref(), name, cursor, location);
            Member {
                name: name.to_string(),
                node: Rc::new(child) as NodeRef<'a>,
            }
        }))
    }

    fn primitive_value(&self) -> Option<Cow<'a, str>> {
        match self.cursor {
            Cursor::Attribute { value, .. } => Some(Cow::Borrowed(value)),
            Cursor::Element(node) if is_xhtml(node) => {
                Some(Cow::Borrowed(&self.document.source[node.range()]))
            }
            Cursor::Element(node) => node.attribute("value").map(Cow::Borrowed),
        }
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn position(&self) -> Position {
        let node = match self.cursor {
            Cursor::Element(node) => node,
            Cursor::Attribute { owner, .. } => owner,
        };
        let pos = self.document.document.text_pos_at(node.range().start);
        Position::new(pos.row as i64, pos.col as i64)
    }
}

impl fmt::Debug for XmlNavigator<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlNavigator")
            .field("location", &self.location)
            .field("type_name", &self.type_name)
            .finish()
    }
}

fn is_xhtml(node: Node) -> bool {
    node.tag_name().namespace() == Some(XHTML_NS)
}

/// `value` carries the primitive itself; schema attributes are format bookkeeping.
fn is_member_attribute(attr: &Attribute) -> bool {
    attr.name() != "value" && attr.namespace() != Some(XSI_NS)
}

fn attribute_type(name: &str) -> Option<&'static str> {
    match name {
        "id" => Some("string"),
        "url" => Some("uri"),
        _ => None,
    }
}

/// An element whose only content is a single resource element, e.g. `<contained><Patient/></contained>`.
fn contained_resource<'a, 'input>(node: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    if node.has_attribute("value") {
        return None;
    }
    let mut children = node.children().filter(|child| child.is_element());
    let resource = children.next()?;
    if children.next().is_some() {
        return None;
    }
    resource
        .tag_name()
        .name()
        .starts_with(|c: char| c.is_ascii_uppercase())
        .then_some(resource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_context::{InMemoryMetadataProvider, MemberInfo, TypeInfo, TypeKind};

    const PATIENT: &str = r#"<Patient xmlns="http://hl7.org/fhir">
        <id value="pat-1"/>
        <active value="true"/>
        <name id="n1">
            <family value="Everyman"/>
            <given value="Adam"/>
            <given value="Bert"/>
        </name>
    </Patient>"#;

    fn names(node: &dyn ElementNavigator<'_>) -> Vec<String> {
        node.members().map(|m| m.name).collect()
    }

    #[test]
    fn root_type_comes_from_element_name() {
        let doc = XmlDocument::parse(PATIENT).unwrap();
        let root = doc.root();
        assert_eq!(root.resource_type_name().unwrap(), "Patient");
        assert_eq!(root.location(), "Patient");
        assert_eq!(names(&root), vec!["id", "active", "name"]);
    }

    #[test]
    fn attributes_become_members_except_value() {
        let doc = XmlDocument::parse(PATIENT).unwrap();
        let name = doc.root().children("name").next().unwrap().node;
        assert_eq!(names(name.as_ref()), vec!["id", "family", "given", "given"]);

        let id = name.children("id").next().unwrap().node;
        assert_eq!(id.primitive_value().as_deref(), Some("n1"));
        assert_eq!(id.type_name(), Some("string"));
    }

    #[test]
    fn locations_index_repeating_members() {
        let doc = XmlDocument::parse(PATIENT).unwrap();
        let name = doc.root().children("name").next().unwrap().node;
        let given: Vec<String> = name
            .children("given")
            .map(|m| m.node.location().to_string())
            .collect();
        assert_eq!(given, vec!["Patient.name[0].given[0]", "Patient.name[0].given[1]"]);
    }

    #[test]
    fn members_are_rederived_on_each_call() {
        let doc = XmlDocument::parse(PATIENT).unwrap();
        let root = doc.root();
        assert_eq!(names(&root), names(&root));
    }

    #[test]
    fn child_types_come_from_metadata() {
        let metadata = InMemoryMetadataProvider::new().with_type(
            TypeInfo::new("Patient", TypeKind::Resource)
                .with_member(MemberInfo::new("active", "boolean"))
                .with_member(MemberInfo::new("name", "HumanName").repeating()),
        );
        let doc = XmlDocument::parse(PATIENT)
            .unwrap()
            .with_metadata(Arc::new(metadata));
        let root = doc.root();
        let types: Vec<Option<String>> = root
            .members()
            .map(|m| m.node.type_name().map(str::to_string))
            .collect();
        assert_eq!(
            types,
            vec![None, Some("boolean".to_string()), Some("HumanName".to_string())]
        );
    }

    #[test]
    fn contained_resources_are_unwrapped() {
        let xml = r#"<Observation xmlns="http://hl7.org/fhir">
            <contained>
                <Patient><id value="p1"/></Patient>
            </contained>
        </Observation>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        let contained = doc.root().children("contained").next().unwrap();
        assert_eq!(contained.name, "contained");
        assert_eq!(contained.node.type_name(), Some("Patient"));
        assert_eq!(names(contained.node.as_ref()), vec!["id"]);
    }

    #[test]
    fn narrative_div_keeps_markup() {
        let xml = r#"<Patient xmlns="http://hl7.org/fhir"><text><status value="generated"/><div xmlns="http://www.w3.org/1999/xhtml"><p>Hi</p></div></text></Patient>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        let text = doc.root().children("text").next().unwrap().node;
        let div = text.children("div").next().unwrap().node;
        let markup = div.primitive_value().unwrap();
        assert!(markup.starts_with("<div"));
        assert!(markup.contains("<p>Hi</p>"));
        assert_eq!(div.members().count(), 0);
    }

    #[test]
    fn schema_attributes_are_not_members() {
        let xml = r#"<Patient xmlns="http://hl7.org/fhir" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://hl7.org/fhir patient.xsd"><active value="true"/></Patient>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        assert_eq!(names(&doc.root()), vec!["active"]);
    }

    #[test]
    fn malformed_xml_reports_position() {
        let err = XmlDocument::parse("<Patient xmlns=\"http://hl7.org/fhir\">\n  <id value=\"x\"\n</Patient>")
            .unwrap_err();
        assert!(matches!(err, FormatError::Xml { .. }));
        assert!(err.to_string().starts_with("Cannot parse xml"));
        assert!(err.position().is_known());
    }

    #[test]
    fn dtd_is_prohibited_by_default() {
        let xml = r#"<?xml version="1.0"?><!DOCTYPE Patient [<!ENTITY x "y">]><Patient xmlns="http://hl7.org/fhir"/>"#;
        assert!(XmlDocument::parse(xml).is_err());
        let allowed = XmlDocument::parse_with_options(xml, &XmlReaderOptions { allow_dtd: true });
        assert!(allowed.is_ok());
    }

    #[test]
    fn element_positions_are_reported() {
        let doc = XmlDocument::parse(PATIENT).unwrap();
        let active = doc.root().children("active").next().unwrap().node;
        assert_eq!(active.position().line, 3);
    }
}
