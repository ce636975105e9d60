//! Main FHIRPath engine
//!
//! Bundles a function registry, an optional metadata provider and evaluation
//! options, and evaluates pre-built expression trees against navigator nodes or
//! raw XML, Turtle and JSON text.

use crate::environment::Environment;
use crate::error::Result;
use crate::evaluator::{EvalOptions, Evaluator, Invocation};
use crate::expression::Expression;
use crate::registry::FunctionRegistry;
use crate::sequence::Sequence;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use tessera_context::ModelMetadataProvider;
use tessera_format::{JsonDocument, NodeRef, TurtleDocument, XmlDocument};

/// Main FHIRPath engine
///
/// The engine itself is immutable once configured and can be shared between
/// threads; every evaluation builds its own environment.
#[derive(Clone)]
pub struct Engine {
    registry: Arc<FunctionRegistry>,
    metadata: Option<Arc<dyn ModelMetadataProvider>>,
    options: EvalOptions,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Engine with the builtin functions and no metadata.
    pub fn new() -> Self {
        Self::with_registry(FunctionRegistry::with_builtins())
    }

    pub fn with_registry(registry: FunctionRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            metadata: None,
            options: EvalOptions::default(),
        }
    }

    /// Metadata used for child type inference when parsing text and for strict
    /// path validation.
    pub fn with_metadata(mut self, metadata: Arc<dyn ModelMetadataProvider>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    /// Add or replace a function rule.
    pub fn register<F>(&mut self, name: impl Into<String>, arity: usize, rule: F) -> &mut Self
    where
        F: for<'a> Fn(Invocation<'a>) -> Result<Sequence<'a>> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.registry).register(name, arity, rule);
        self
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn metadata(&self) -> Option<&Arc<dyn ModelMetadataProvider>> {
        self.metadata.as_ref()
    }

    pub fn options(&self) -> EvalOptions {
        self.options
    }

    /// Root environment for evaluating against a single resource node.
    pub fn environment<'a>(&self, root: NodeRef<'a>) -> Environment<'a> {
        Environment::for_node(root)
    }

    /// Evaluate an expression in a caller-built environment.
    ///
    /// The result is lazy: errors raised while producing items surface when the
    /// sequence is consumed.
    pub fn evaluate<'a>(&'a self, expr: &'a Expression, env: Environment<'a>) -> Result<Sequence<'a>> {
        Evaluator::new(&self.registry, env)
            .with_metadata(self.metadata.as_deref())
            .with_options(self.options)
            .evaluate(expr)
    }

    pub fn evaluate_node<'a>(&'a self, expr: &'a Expression, root: NodeRef<'a>) -> Result<Sequence<'a>> {
        self.evaluate(expr, self.environment(root))
    }

    /// Parse an XML resource and evaluate against it.
    pub fn evaluate_xml(&self, expr: &Expression, xml: &str) -> Result<Vec<Value>> {
        let mut document = XmlDocument::parse(xml)?;
        if let Some(metadata) = &self.metadata {
            document = document.with_metadata(Arc::clone(metadata));
        }
        tracing::debug!(format = "xml", expression = %expr, "evaluating");
        let values = self.evaluate_node(expr, document.root_node())?.values();
        values
    }

    /// Parse a Turtle resource and evaluate against its tree root.
    pub fn evaluate_turtle(&self, expr: &Expression, turtle: &str) -> Result<Vec<Value>> {
        let mut document = TurtleDocument::parse(turtle)?;
        if let Some(metadata) = &self.metadata {
            document = document.with_metadata(Arc::clone(metadata));
        }
        tracing::debug!(
            format = "turtle",
            statements = document.len(),
            expression = %expr,
            "evaluating"
        );
        let values = self.evaluate_node(expr, document.root_node())?.values();
        values
    }

    /// Parse a JSON resource and evaluate against it.
    pub fn evaluate_json(&self, expr: &Expression, json: &str) -> Result<Vec<Value>> {
        let mut document = JsonDocument::parse(json)?;
        if let Some(metadata) = &self.metadata {
            document = document.with_metadata(Arc::clone(metadata));
        }
        tracing::debug!(format = "json", expression = %expr, "evaluating");
        let values = self.evaluate_node(expr, document.root_node())?.values();
        values
    }

    /// Verify that every function an expression calls is registered with a
    /// matching arity, without evaluating it.
    pub fn check(&self, expr: &Expression) -> Result<()> {
        self.registry.check(expr)
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("functions", &self.registry.len())
            .field("has_metadata", &self.metadata.is_some())
            .field("options", &self.options)
            .finish()
    }
}
