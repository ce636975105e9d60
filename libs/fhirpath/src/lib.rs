//! FHIRPath evaluation over format-agnostic navigators
//!
//! This crate evaluates pre-parsed FHIRPath expression trees against any
//! [`ElementNavigator`](tessera_format::ElementNavigator): XML documents, Turtle
//! graphs and JSON resources all look the same to the evaluator.
//!
//! # Architecture Overview
//!
//! ```text
//! Expression tree (built by a parser elsewhere)
//!      |
//! Evaluator (ExpressionVisitor) + Environment
//!      |
//! FunctionRegistry -> function rules (arguments passed unevaluated)
//!      |
//! Lazy, restartable result Sequence
//! ```
//!
//! Every algorithm over the tree ([`Evaluator`], [`ExpressionPrinter`],
//! [`ReferenceCollector`]) implements [`ExpressionVisitor`]; the tree itself is a
//! closed enum, so adding a variant is a compile error in every visitor.

pub mod analysis;
pub mod engine;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod expression;
mod functions;
pub mod printer;
pub mod registry;
pub mod sequence;
mod temporal_parse;
pub mod value;
pub mod visitor;

// Re-export main types
pub use analysis::ReferenceCollector;
pub use engine::Engine;
pub use environment::Environment;
pub use error::{Error, Result};
pub use evaluator::{DeferredArgument, EvalOptions, Evaluator, Invocation};
pub use expression::{
    ConstantExpression, Expression, FunctionCallExpression, NewNodeListInitExpression,
    VariableRefExpression,
};
pub use printer::ExpressionPrinter;
pub use registry::{FunctionRegistry, FunctionRule};
pub use sequence::{Item, Items, Sequence};
pub use value::{PrimitiveType, Value, ValueData};
pub use visitor::ExpressionVisitor;
