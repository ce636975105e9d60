//! Graph-form adapter: FHIR RDF (Turtle)
//!
//! A Turtle document is a set of statements, not a tree, so the tree is
//! reconstructed on demand:
//! - The root is the single subject carrying `fhir:nodeRole fhir:treeRoot`; its
//!   `rdf:type` names the resource type.
//! - Predicates are `fhir:Type.member`; the last segment of the member becomes the
//!   child name, so backbone paths (`fhir:Patient.contact.gender`) read as `gender`.
//! - `fhir:index`, `fhir:nodeRole` and `fhir:reference` are RDF bookkeeping and never
//!   surface as members; `fhir:value` carries the primitive value of a node.
//!
//! The parsed statements live in an arena owned by [`TurtleDocument`]; navigators are
//! cursors holding a term id into it.

use crate::error::{FormatError, Result};
use crate::navigator::{ElementNavigator, Member, Members, NodeRef, SiblingCounter};
use oxrdf::{NamedNode, Term, Triple};
use oxttl::TurtleParser;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use tessera_context::ModelMetadataProvider;

pub const FHIR_NS: &str = "http://hl7.org/fhir/";
const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const FHIR_NODE_ROLE: &str = "http://hl7.org/fhir/nodeRole";
const FHIR_TREE_ROOT: &str = "http://hl7.org/fhir/treeRoot";
const FHIR_VALUE: &str = "http://hl7.org/fhir/value";
const FHIR_INDEX: &str = "http://hl7.org/fhir/index";

/// Member names that only exist to encode the tree in RDF.
pub const RESERVED_MEMBERS: [&str; 3] = ["index", "nodeRole", "reference"];

/// Base types that declare inherited members (`fhir:Element.id`); they never name
/// the concrete type of the node carrying the predicate.
const BASE_TYPES: [&str; 4] = ["Element", "BackboneElement", "Resource", "DomainResource"];

/// Type and member encoded in a FHIR predicate IRI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredicateName<'p> {
    /// `Patient` in `fhir:Patient.active`; absent for undotted predicates like `fhir:value`.
    pub owner_type: Option<&'p str>,
    pub member: &'p str,
}

impl<'p> PredicateName<'p> {
    pub fn is_reserved(&self) -> bool {
        RESERVED_MEMBERS.contains(&self.member)
    }

    fn is_value_relation(&self) -> bool {
        self.owner_type.is_none() && self.member == "value"
    }

    /// Element name as the other formats spell it: the last segment of a backbone
    /// path (`contact` in `Patient.contact`, `gender` in `Patient.contact.gender`).
    pub fn element_name(&self) -> &'p str {
        self.member.rsplit('.').next().unwrap_or(self.member)
    }

    /// The owning type, when it is the concrete type of the node the predicate
    /// hangs off. Backbone paths and inherited base-type members say nothing about it.
    fn concrete_owner(&self) -> Option<&'p str> {
        self.owner_type
            .filter(|owner| !self.member.contains('.') && !BASE_TYPES.contains(owner))
    }
}

/// Split a predicate IRI into owning type and member name.
///
/// Only the segment after the last `/` is considered; the owning type ends at the
/// first `.` of that segment.
pub fn parse_predicate(iri: &str) -> Result<PredicateName<'_>> {
    let invalid = |reason: &str| FormatError::InvalidPredicate {
        predicate: iri.to_string(),
        reason: reason.to_string(),
    };

    if !iri.starts_with(FHIR_NS) {
        return Err(invalid("outside the FHIR namespace"));
    }
    let local = &iri[iri.rfind('/').map_or(0, |idx| idx + 1)..];

    match local.split_once('.') {
        Some((owner, member)) if !owner.is_empty() && !member.is_empty() => Ok(PredicateName {
            owner_type: Some(owner),
            member,
        }),
        Some(_) => Err(invalid("empty type or member segment")),
        None if local.is_empty() => Err(invalid("empty member name")),
        None => Ok(PredicateName {
            owner_type: None,
            member: local,
        }),
    }
}

/// Resource type named by a type IRI (`http://hl7.org/fhir/Patient` → `Patient`).
fn parse_type_iri(iri: &str) -> Result<&str> {
    let name = iri
        .strip_prefix(FHIR_NS)
        .map(|rest| &rest[rest.rfind('/').map_or(0, |idx| idx + 1)..])
        .filter(|name| !name.is_empty());
    name.ok_or_else(|| FormatError::UnrecognizedType(iri.to_string()))
}

#[derive(Debug, Clone, Default)]
pub struct TurtleReaderOptions {
    /// Base IRI used to resolve relative IRIs in the document.
    pub base_iri: Option<String>,
}

type TermId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Statement {
    subject: TermId,
    predicate: TermId,
    object: TermId,
}

/// Interned statement arena with a subject index.
#[derive(Debug, Default)]
struct Graph {
    terms: Vec<Term>,
    term_ids: HashMap<Term, TermId>,
    statements: Vec<Statement>,
    by_subject: HashMap<TermId, Vec<usize>>,
}

impl Graph {
    fn from_triples(triples: impl IntoIterator<Item = Triple>) -> Self {
        let mut graph = Graph::default();
        let mut seen = HashSet::new();
        for triple in triples {
            let statement = Statement {
                subject: graph.intern(triple.subject.into()),
                predicate: graph.intern(triple.predicate.into()),
                object: graph.intern(triple.object),
            };
            if seen.insert(statement) {
                graph
                    .by_subject
                    .entry(statement.subject)
                    .or_default()
                    .push(graph.statements.len());
                graph.statements.push(statement);
            }
        }
        graph
    }

    fn intern(&mut self, term: Term) -> TermId {
        if let Some(id) = self.term_ids.get(&term) {
            return *id;
        }
        let id = self.terms.len();
        self.terms.push(term.clone());
        self.term_ids.insert(term, id);
        id
    }

    fn iri_id(&self, iri: &str) -> Option<TermId> {
        let term = Term::NamedNode(NamedNode::new_unchecked(iri));
        self.term_ids.get(&term).copied()
    }

    fn iri(&self, id: TermId) -> Option<&str> {
        match &self.terms[id] {
            Term::NamedNode(node) => Some(node.as_str()),
            _ => None,
        }
    }

    fn about(&self, subject: TermId) -> impl Iterator<Item = &Statement> + '_ {
        self.by_subject
            .get(&subject)
            .into_iter()
            .flatten()
            .map(move |idx| &self.statements[*idx])
    }

    fn first_object(&self, subject: TermId, predicate_iri: &str) -> Option<TermId> {
        let predicate = self.iri_id(predicate_iri)?;
        self.about(subject)
            .find(|s| s.predicate == predicate)
            .map(|s| s.object)
    }

    /// Lexical form of a term; literal datatypes and language tags are dropped.
    fn lexical(&self, id: TermId) -> Option<&str> {
        match &self.terms[id] {
            Term::Literal(literal) => Some(literal.value()),
            Term::NamedNode(node) => Some(node.as_str()),
            Term::BlankNode(node) => Some(node.as_str()),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    /// Locate the tree root and its resource type.
    fn discover_root(&self) -> Result<(TermId, &str)> {
        let roots: Vec<TermId> = match (self.iri_id(FHIR_NODE_ROLE), self.iri_id(FHIR_TREE_ROOT)) {
            (Some(role), Some(tree_root)) => self
                .statements
                .iter()
                .filter(|s| s.predicate == role && s.object == tree_root)
                .map(|s| s.subject)
                .collect(),
            _ => Vec::new(),
        };

        let root = match roots.as_slice() {
            [] => return Err(FormatError::MissingRoot),
            [root] => *root,
            many => return Err(FormatError::AmbiguousRoot(many.len())),
        };

        let type_term = self
            .first_object(root, RDF_TYPE)
            .ok_or(FormatError::MissingRootType)?;
        let type_iri = self
            .iri(type_term)
            .ok_or_else(|| FormatError::UnrecognizedType(self.terms[type_term].to_string()))?;
        Ok((root, parse_type_iri(type_iri)?))
    }
}

/// A parsed Turtle document with a discovered tree root.
pub struct TurtleDocument {
    graph: Graph,
    root: TermId,
    root_type: String,
    metadata: Option<Arc<dyn ModelMetadataProvider>>,
}

impl TurtleDocument {
    pub fn parse(input: &str) -> Result<Self> {
        Self::parse_with_options(input, &TurtleReaderOptions::default())
    }

    pub fn parse_with_options(input: &str, options: &TurtleReaderOptions) -> Result<Self> {
        let mut parser = TurtleParser::new();
        if let Some(base_iri) = &options.base_iri {
            parser = parser
                .with_base_iri(base_iri.as_str())
                .map_err(|e| FormatError::Turtle(e.to_string()))?;
        }

        let triples = parser
            .for_slice(input.as_bytes())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| FormatError::Turtle(e.to_string()))?;

        Self::from_triples(triples)
    }

    /// Build a document from statements parsed elsewhere.
    pub fn from_triples(triples: impl IntoIterator<Item = Triple>) -> Result<Self> {
        let graph = Graph::from_triples(triples);
        let (root, root_type) = graph.discover_root()?;
        let root_type = root_type.to_string();

        tracing::debug!(
            root_type = %root_type,
            statements = graph.statements.len(),
            "discovered turtle tree root"
        );

        Ok(Self {
            graph,
            root,
            root_type,
            metadata: None,
        })
    }

    /// Use a metadata provider to type primitive children.
    pub fn with_metadata(mut self, metadata: Arc<dyn ModelMetadataProvider>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn resource_type_name(&self) -> &str {
        &self.root_type
    }

    /// Number of distinct statements in the graph.
    pub fn len(&self) -> usize {
        self.graph.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.statements.is_empty()
    }

    pub fn root(&self) -> TurtleNavigator<'_> {
        TurtleNavigator {
            document: self,
            term: self.root,
            name: &self.root_type,
            declaring_type: None,
            type_name: Some(Cow::Borrowed(&self.root_type)),
            location: self.root_type.clone(),
        }
    }

    pub fn root_node(&self) -> NodeRef<'_> {
        Rc::new(self.root())
    }

    /// Type of a child node: a FHIR `rdf:type` of its own, else the metadata for
    /// (declaring type, member), else the concrete owner of its own predicates.
    fn infer_type<'a>(
        &'a self,
        term: TermId,
        declaring_type: Option<&str>,
        member: &str,
    ) -> Option<Cow<'a, str>> {
        let graph = &self.graph;
        if let Some(rdf_type) = graph.iri_id(RDF_TYPE) {
            let explicit = graph
                .about(term)
                .filter(|statement| statement.predicate == rdf_type)
                .find_map(|statement| parse_type_iri(graph.iri(statement.object)?).ok());
            if let Some(type_name) = explicit {
                return Some(Cow::Borrowed(type_name));
            }
        }

        let declared = self.metadata.as_deref().and_then(|metadata| {
            let info = metadata.member(declaring_type?, member)?;
            info.type_name().map(str::to_string)
        });
        if let Some(type_name) = declared {
            return Some(Cow::Owned(type_name));
        }

        graph
            .about(term)
            .find_map(|statement| {
                let iri = graph.iri(statement.predicate)?;
                parse_predicate(iri).ok()?.concrete_owner()
            })
            .map(Cow::Borrowed)
    }

    /// `fhir:index` of a list item, used to order repeating members.
    fn list_index(&self, term: TermId) -> Option<i64> {
        let index = self.graph.first_object(term, FHIR_INDEX)?;
        self.graph.lexical(index)?.parse().ok()
    }
}

impl fmt::Debug for TurtleDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurtleDocument")
            .field("root_type", &self.root_type)
            .field("statements", &self.graph.statements.len())
            .field("has_metadata", &self.metadata.is_some())
            .finish()
    }
}

#[derive(Clone)]
pub struct TurtleNavigator<'a> {
    document: &'a TurtleDocument,
    term: TermId,
    name: &'a str,
    declaring_type: Option<&'a str>,
    type_name: Option<Cow<'a, str>>,
    location: String,
}

impl<'a> TurtleNavigator<'a> {
    /// Owning type taken from the predicate this node was reached through.
    pub fn declaring_type(&self) -> Option<&'a str> {
        self.declaring_type
    }
}

struct MemberEntry<'a> {
    position: usize,
    predicate: PredicateName<'a>,
    object: TermId,
    list_index: Option<i64>,
}

impl<'a> ElementNavigator<'a> for TurtleNavigator<'a> {
    fn name(&self) -> &str {
        self.name
    }

    fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    fn members(&self) -> Members<'a> {
        let document = self.document;
        let graph = &document.graph;

        let mut entries: Vec<MemberEntry<'a>> = graph
            .about(self.term)
            .enumerate()
            .filter_map(|(position, statement)| {
                let predicate = parse_predicate(graph.iri(statement.predicate)?).ok()?;
                if predicate.is_reserved() || predicate.is_value_relation() {
                    return None;
                }
                Some(MemberEntry {
                    position,
                    predicate,
                    object: statement.object,
                    list_index: document.list_index(statement.object),
                })
            })
            .collect();

        // Repeating members keep the rank of their first statement; items are
        // ordered by fhir:index, unindexed items last in statement order.
        let mut rank: HashMap<&'a str, usize> = HashMap::new();
        for entry in &entries {
            let next = rank.len();
            rank.entry(entry.predicate.element_name()).or_insert(next);
        }
        entries.sort_by_key(|entry| {
            (
                rank[entry.predicate.element_name()],
                entry.list_index.is_none(),
                entry.list_index,
                entry.position,
            )
        });

        let parent_location = self.location.clone();
        let mut counter = SiblingCounter::default();
        Box::new(entries.into_iter().map(move |entry| {
            let name = entry.predicate.element_name();
            let declaring_type = entry.predicate.owner_type;
            let child = TurtleNavigator {
                document,
                term: entry.object,
                name,
                declaring_type,
                type_name: document.infer_type(entry.object, declaring_type, entry.predicate.member),
                location: counter.location(&parent_location, name),
            };
            Member {
                name: name.to_string(),
                node: Rc::new(child) as NodeRef<'a>,
            }
        }))
    }

    fn primitive_value(&self) -> Option<Cow<'a, str>> {
        let graph = &self.document.graph;
        let value = match &graph.terms[self.term] {
            Term::Literal(literal) => Some(literal.value()),
            _ => match graph.first_object(self.term, FHIR_VALUE) {
                Some(object) => graph.lexical(object),
                None => {
                    tracing::trace!(location = %self.location, "node has no fhir:value relation");
                    None
                }
            },
        };
        value.map(Cow::Borrowed)
    }

    fn location(&self) -> &str {
        &self.location
    }
}

impl fmt::Debug for TurtleNavigator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurtleNavigator")
            .field("location", &self.location)
            .field("type_name", &self.type_name)
            .field("declaring_type", &self.declaring_type)
            .finish()
    }
}
