//! Uniform navigator contract shared by every format adapter
//!
//! A navigator is a lightweight cursor into a parsed document owned by its adapter
//! (`XmlDocument`, `TurtleDocument`, `JsonDocument`). Cursors borrow the document for
//! `'a` and are created lazily: asking for `members()` re-derives the children from
//! the underlying representation each time instead of caching a pre-built tree.

use crate::error::{FormatError, Position, Result};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a navigator node borrowing a document for `'a`.
pub type NodeRef<'a> = Rc<dyn ElementNavigator<'a> + 'a>;

/// Lazy sequence of named children.
pub type Members<'a> = Box<dyn Iterator<Item = Member<'a>> + 'a>;

/// A named child of a navigator node. Names repeat for repeating elements.
#[derive(Clone)]
pub struct Member<'a> {
    pub name: String,
    pub node: NodeRef<'a>,
}

impl fmt::Debug for Member<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("location", &self.node.location())
            .finish()
    }
}

pub trait ElementNavigator<'a>: fmt::Debug {
    /// Name under which this node was reached; the type name for a root.
    fn name(&self) -> &str;

    /// Type of this node, when the format (or the metadata provider) can tell.
    fn type_name(&self) -> Option<&str>;

    fn resource_type_name(&self) -> Result<&str> {
        self.type_name().ok_or_else(|| FormatError::UnknownType {
            location: self.location().to_string(),
        })
    }

    /// Children in a stable, format-defined order.
    fn members(&self) -> Members<'a>;

    /// Scalar content of a primitive node, `None` for complex nodes.
    fn primitive_value(&self) -> Option<Cow<'a, str>>;

    /// FHIRPath-style location, e.g. `Patient.name[0].given[1]`.
    fn location(&self) -> &str;

    fn position(&self) -> Position {
        Position::UNKNOWN
    }

    fn children(&self, name: &str) -> Members<'a> {
        let name = name.to_string();
        Box::new(self.members().filter(move |member| member.name == name))
    }
}

/// Assigns `[n]` indices to repeated member names while enumerating children.
#[derive(Debug, Default)]
pub(crate) struct SiblingCounter {
    seen: HashMap<String, usize>,
}

impl SiblingCounter {
    pub(crate) fn location(&mut self, parent: &str, name: &str) -> String {
        let index = self.seen.entry(name.to_string()).or_insert(0);
        let location = format!("{}.{}[{}]", parent, name, index);
        *index += 1;
        location
    }
}
