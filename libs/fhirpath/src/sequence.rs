//! Lazy result sequences
//!
//! A [`Sequence`] is a recipe for producing items, not a buffer: every call to
//! [`Sequence::iter`] re-derives the items from scratch, so a sequence can be consumed
//! partially (short-circuiting) and restarted without hidden state. Small eager results
//! are kept in a shared `SmallVec`.

use crate::error::{Error, Result};
use crate::value::Value;
use smallvec::SmallVec;
use std::fmt;
use std::rc::Rc;
use tessera_format::NodeRef;

/// One element of a result: a navigator node or a computed value.
#[derive(Clone)]
pub enum Item<'a> {
    Node(NodeRef<'a>),
    Value(Value),
}

impl<'a> Item<'a> {
    pub fn as_node(&self) -> Option<&NodeRef<'a>> {
        match self {
            Item::Node(node) => Some(node),
            Item::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Item::Value(value) => Some(value),
            Item::Node(_) => None,
        }
    }

    /// Scalar view of the item. Primitive nodes are typed by their type name
    /// (untyped nodes read as strings); complex nodes have no scalar form.
    pub fn to_value(&self) -> Result<Option<Value>> {
        match self {
            Item::Value(value) => Ok(Some(value.clone())),
            Item::Node(node) => {
                let Some(text) = node.primitive_value() else {
                    return Ok(None);
                };
                match node.type_name() {
                    Some(type_name) => Value::from_fhir_primitive(type_name, &text).map(Some),
                    None => Ok(Some(Value::string(text.as_ref()))),
                }
            }
        }
    }

    /// Scalar view, failing for complex nodes.
    pub fn require_value(&self) -> Result<Value> {
        self.to_value()?.ok_or_else(|| {
            Error::TypeError(format!("{} has no primitive value", self.describe()))
        })
    }

    /// Boolean reading of the item; untyped nodes holding `true`/`false` count as booleans.
    pub fn as_boolean(&self) -> Result<Option<bool>> {
        if let Item::Node(node) = self {
            if node.type_name().is_none() {
                return Ok(match node.primitive_value().as_deref() {
                    Some("true") => Some(true),
                    Some("false") => Some(false),
                    _ => None,
                });
            }
        }
        Ok(self.to_value()?.and_then(|value| value.as_bool()))
    }

    /// FHIRPath equality between two items.
    pub fn equals(&self, other: &Item<'a>) -> Result<Option<bool>> {
        match (self, other) {
            (Item::Node(left), Item::Node(right))
                if left.primitive_value().is_none() || right.primitive_value().is_none() =>
            {
                Ok(Some(deep_equals(left, right)))
            }
            _ => match (self.to_value()?, other.to_value()?) {
                (Some(left), Some(right)) => Ok(left.equals(&right)),
                _ => Ok(Some(false)),
            },
        }
    }

    fn describe(&self) -> String {
        match self {
            Item::Node(node) => node.location().to_string(),
            Item::Value(value) => value.to_string(),
        }
    }
}

/// Structural equality of two complex nodes: same member names in order, same values.
fn deep_equals(left: &NodeRef<'_>, right: &NodeRef<'_>) -> bool {
    if left.primitive_value() != right.primitive_value() {
        return false;
    }
    let mut left_members = left.members();
    let mut right_members = right.members();
    loop {
        match (left_members.next(), right_members.next()) {
            (None, None) => return true,
            (Some(l), Some(r)) if l.name == r.name && deep_equals(&l.node, &r.node) => {}
            _ => return false,
        }
    }
}

impl PartialEq for Item<'_> {
    /// Identity for nodes (same location, same value), structural for values.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Item::Node(l), Item::Node(r)) => {
                l.location() == r.location() && l.primitive_value() == r.primitive_value()
            }
            (Item::Value(l), Item::Value(r)) => l == r,
            _ => false,
        }
    }
}

impl fmt::Debug for Item<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Node(node) => f.debug_tuple("Node").field(&node.location()).finish(),
            Item::Value(value) => f.debug_tuple("Value").field(value.data()).finish(),
        }
    }
}

impl<'a> From<NodeRef<'a>> for Item<'a> {
    fn from(node: NodeRef<'a>) -> Self {
        Item::Node(node)
    }
}

impl From<Value> for Item<'_> {
    fn from(value: Value) -> Self {
        Item::Value(value)
    }
}

/// Fallible item stream produced by one pass over a sequence.
pub type Items<'a> = Box<dyn Iterator<Item = Result<Item<'a>>> + 'a>;

#[derive(Clone)]
pub struct Sequence<'a> {
    inner: SequenceInner<'a>,
}

#[derive(Clone)]
enum SequenceInner<'a> {
    Materialized(Rc<SmallVec<[Item<'a>; 4]>>),
    Lazy(Rc<dyn Fn() -> Items<'a> + 'a>),
}

impl<'a> Sequence<'a> {
    pub fn empty() -> Self {
        Self::from_items(std::iter::empty())
    }

    pub fn singleton(item: impl Into<Item<'a>>) -> Self {
        Self::from_items(std::iter::once(item.into()))
    }

    pub fn from_items(items: impl IntoIterator<Item = Item<'a>>) -> Self {
        Self {
            inner: SequenceInner::Materialized(Rc::new(items.into_iter().collect())),
        }
    }

    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self::from_items(values.into_iter().map(Item::Value))
    }

    /// A sequence whose items are produced by calling `produce` on every pass.
    pub fn lazy<F>(produce: F) -> Self
    where
        F: Fn() -> Items<'a> + 'a,
    {
        Self {
            inner: SequenceInner::Lazy(Rc::new(produce)),
        }
    }

    /// Sequence of at most one item computed on every pass.
    pub fn deferred_item<F>(compute: F) -> Self
    where
        F: Fn() -> Result<Option<Item<'a>>> + 'a,
    {
        Self::lazy(move || Box::new(compute().transpose().into_iter()))
    }

    pub fn deferred_value<F>(compute: F) -> Self
    where
        F: Fn() -> Result<Option<Value>> + 'a,
    {
        Self::deferred_item(move || compute().map(|value| value.map(Item::Value)))
    }

    /// Start a fresh pass over the items.
    pub fn iter(&self) -> Items<'a> {
        match &self.inner {
            SequenceInner::Materialized(items) => {
                let items = Rc::clone(items);
                Box::new((0..items.len()).map(move |idx| Ok(items[idx].clone())))
            }
            SequenceInner::Lazy(produce) => (**produce)(),
        }
    }

    pub fn is_materialized(&self) -> bool {
        matches!(self.inner, SequenceInner::Materialized(_))
    }

    /// Concatenate sequences in order; empty parts leave no gaps.
    pub fn concat(parts: Vec<Sequence<'a>>) -> Self {
        match parts.len() {
            0 => Self::empty(),
            1 => parts.into_iter().next().unwrap_or_else(Self::empty),
            _ => {
                let parts = Rc::new(parts);
                Self::lazy(move || {
                    let parts = Rc::clone(&parts);
                    Box::new((0..parts.len()).flat_map(move |idx| parts[idx].iter()))
                })
            }
        }
    }

    /// Replace each item by a sequence. Errors from `f` are yielded as items.
    pub fn flat_map<F>(self, f: F) -> Self
    where
        F: Fn(Item<'a>) -> Result<Sequence<'a>> + 'a,
    {
        let f = Rc::new(f);
        Self::lazy(move || {
            let f = Rc::clone(&f);
            Box::new(self.iter().flat_map(move |item| -> Items<'a> {
                match item.and_then(|item| (*f)(item)) {
                    Ok(sequence) => sequence.iter(),
                    Err(e) => Box::new(std::iter::once(Err(e))),
                }
            }))
        })
    }

    pub fn filter_map<F>(self, f: F) -> Self
    where
        F: Fn(Item<'a>) -> Result<Option<Item<'a>>> + 'a,
    {
        let f = Rc::new(f);
        Self::lazy(move || {
            let f = Rc::clone(&f);
            Box::new(
                self.iter()
                    .filter_map(move |item| item.and_then(|item| (*f)(item)).transpose()),
            )
        })
    }

    /// Pull only the first item.
    pub fn exists(&self) -> Result<bool> {
        Ok(self.iter().next().transpose()?.is_some())
    }

    pub fn first(&self) -> Result<Option<Item<'a>>> {
        self.iter().next().transpose()
    }

    /// The only item, `None` when empty, `NotSingleton` for more than one.
    pub fn single(&self) -> Result<Option<Item<'a>>> {
        let mut items = self.iter();
        let Some(first) = items.next().transpose()? else {
            return Ok(None);
        };
        let mut count = 1;
        for item in items {
            item?;
            count += 1;
        }
        if count > 1 {
            return Err(Error::NotSingleton(count));
        }
        Ok(Some(first))
    }

    /// Singleton evaluation to a scalar value.
    pub fn scalar(&self) -> Result<Option<Value>> {
        match self.single()? {
            Some(item) => item.require_value().map(Some),
            None => Ok(None),
        }
    }

    /// Singleton evaluation in a boolean context: empty is unknown, a lone boolean is
    /// itself, any other lone item is true.
    pub fn boolean(&self) -> Result<Option<bool>> {
        match self.single()? {
            Some(item) => Ok(Some(item.as_boolean()?.unwrap_or(true))),
            None => Ok(None),
        }
    }

    pub fn to_vec(&self) -> Result<Vec<Item<'a>>> {
        self.iter().collect()
    }

    pub fn count(&self) -> Result<usize> {
        let mut count = 0;
        for item in self.iter() {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// Evaluate once and keep the items.
    pub fn materialize(&self) -> Result<Self> {
        if self.is_materialized() {
            return Ok(self.clone());
        }
        Ok(Self::from_items(self.to_vec()?))
    }

    /// Scalar values of every item; complex nodes are rejected.
    pub fn values(&self) -> Result<Vec<Value>> {
        self.iter()
            .map(|item| item.and_then(|item| item.require_value()))
            .collect()
    }
}

impl Default for Sequence<'_> {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Sequence<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            SequenceInner::Materialized(items) => f.debug_list().entries(items.iter()).finish(),
            SequenceInner::Lazy(_) => f.write_str("Sequence(<lazy>)"),
        }
    }
}
