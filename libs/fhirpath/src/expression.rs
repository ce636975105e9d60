//! Expression tree
//!
//! The tree handed over by a path-language parser. It is immutable and closed: every
//! algorithm walking it implements [`ExpressionVisitor`](crate::visitor::ExpressionVisitor),
//! and adding a variant forces every visitor to handle it.
//!
//! Path navigation is expressed as calls to `builtin.children(name)`; indexers as
//! `builtin.item(index)`. Operators are functions named by their symbol (`=`, `|`, `and`).

use crate::value::{PrimitiveType, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Constant(ConstantExpression),
    FunctionCall(FunctionCallExpression),
    VariableRef(VariableRefExpression),
    NewNodeListInit(NewNodeListInitExpression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantExpression {
    pub value: Value,
}

impl ConstantExpression {
    pub fn primitive_type(&self) -> PrimitiveType {
        self.value.primitive_type()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallExpression {
    /// Receiver; `None` means the current focus (`$this`).
    pub focus: Option<Box<Expression>>,
    pub name: String,
    /// Passed to the function unevaluated.
    pub arguments: Vec<Expression>,
}

impl FunctionCallExpression {
    pub fn arity(&self) -> usize {
        self.arguments.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableRefExpression {
    /// As written: `%resource`, `$this`, `%vs-administrative-gender`, ...
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNodeListInitExpression {
    pub contents: Vec<Expression>,
}

pub const CHILDREN_FUNCTION: &str = "builtin.children";
pub const ITEM_FUNCTION: &str = "builtin.item";

pub fn constant(value: impl Into<Value>) -> Expression {
    Expression::Constant(ConstantExpression {
        value: value.into(),
    })
}

/// Call on the implicit focus.
pub fn call(name: impl Into<String>, arguments: Vec<Expression>) -> Expression {
    Expression::FunctionCall(FunctionCallExpression {
        focus: None,
        name: name.into(),
        arguments,
    })
}

/// Call on an explicit receiver: `focus.name(arguments)`.
pub fn method(focus: Expression, name: impl Into<String>, arguments: Vec<Expression>) -> Expression {
    Expression::FunctionCall(FunctionCallExpression {
        focus: Some(Box::new(focus)),
        name: name.into(),
        arguments,
    })
}

pub fn variable(name: impl Into<String>) -> Expression {
    Expression::VariableRef(VariableRefExpression { name: name.into() })
}

pub fn list(contents: Vec<Expression>) -> Expression {
    Expression::NewNodeListInit(NewNodeListInitExpression { contents })
}

/// Child navigation from the implicit focus.
pub fn child(name: &str) -> Expression {
    call(CHILDREN_FUNCTION, vec![constant(name)])
}

/// `a.b.c` as nested child navigations from the implicit focus.
pub fn path(segments: &[&str]) -> Expression {
    let mut segments = segments.iter();
    let Some(first) = segments.next() else {
        return variable("$this");
    };
    segments.fold(child(first), |focus, segment| {
        method(focus, CHILDREN_FUNCTION, vec![constant(*segment)])
    })
}

impl Expression {
    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        1 + match self {
            Expression::Constant(_) | Expression::VariableRef(_) => 0,
            Expression::FunctionCall(call) => {
                call.focus.as_deref().map_or(0, Expression::size)
                    + call.arguments.iter().map(Expression::size).sum::<usize>()
            }
            Expression::NewNodeListInit(list) => list.contents.iter().map(Expression::size).sum(),
        }
    }
}
