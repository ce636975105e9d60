//! Tree-walking evaluator
//!
//! [`Evaluator`] is the visitor that executes an expression against an environment.
//! Function arguments are not evaluated here: the function rule receives them as
//! expressions through an [`Invocation`] and decides when, how often and in which
//! scope to evaluate them.

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::expression::{
    ConstantExpression, Expression, FunctionCallExpression, NewNodeListInitExpression,
    VariableRefExpression,
};
use crate::registry::FunctionRegistry;
use crate::sequence::{Item, Sequence};
use crate::value::Value;
use crate::visitor::ExpressionVisitor;
use std::fmt;
use tessera_context::ModelMetadataProvider;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EvalOptions {
    /// Maximum nesting of function calls and list constructions; `None` is unbounded.
    pub max_depth: Option<usize>,
    /// If `true`, navigating to a member the metadata does not declare is an error.
    pub strict: bool,
}

#[derive(Clone)]
pub struct Evaluator<'a> {
    registry: &'a FunctionRegistry,
    metadata: Option<&'a dyn ModelMetadataProvider>,
    env: Environment<'a>,
    options: EvalOptions,
    depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(registry: &'a FunctionRegistry, env: Environment<'a>) -> Self {
        Self {
            registry,
            metadata: None,
            env,
            options: EvalOptions::default(),
            depth: 0,
        }
    }

    pub fn with_metadata(mut self, metadata: Option<&'a dyn ModelMetadataProvider>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    pub fn environment(&self) -> &Environment<'a> {
        &self.env
    }

    pub fn evaluate(&self, expr: &'a Expression) -> Result<Sequence<'a>> {
        expr.accept(&mut self.clone())
    }

    /// Same evaluator, different scope.
    fn scoped(&self, env: Environment<'a>) -> Self {
        Self {
            env,
            ..self.clone()
        }
    }

    fn descend(&self) -> Result<Self> {
        let depth = self.depth + 1;
        if let Some(max_depth) = self.options.max_depth {
            if depth > max_depth {
                return Err(Error::DepthExceeded(max_depth));
            }
        }
        Ok(Self {
            depth,
            ..self.clone()
        })
    }
}

impl fmt::Debug for Evaluator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("env", &self.env)
            .field("options", &self.options)
            .field("depth", &self.depth)
            .finish()
    }
}

impl<'a> ExpressionVisitor<'a, Result<Sequence<'a>>> for Evaluator<'a> {
    fn visit_constant(&mut self, expr: &'a ConstantExpression) -> Result<Sequence<'a>> {
        Ok(Sequence::singleton(expr.value.clone()))
    }

    fn visit_function_call(&mut self, expr: &'a FunctionCallExpression) -> Result<Sequence<'a>> {
        let inner = self.descend()?;
        let focus = match expr.focus.as_deref() {
            Some(focus) => inner.evaluate(focus)?,
            None => self.env.focus().clone(),
        };

        let rule = self.registry.resolve(&expr.name, expr.arity())?;
        tracing::trace!(
            function = %expr.name,
            arity = expr.arity(),
            depth = inner.depth,
            "dispatching function"
        );

        (**rule)(Invocation {
            call: expr,
            focus,
            evaluator: inner,
        })
    }

    fn visit_variable_ref(&mut self, expr: &'a VariableRefExpression) -> Result<Sequence<'a>> {
        self.env.resolve(&expr.name)
    }

    fn visit_new_node_list_init(
        &mut self,
        expr: &'a NewNodeListInitExpression,
    ) -> Result<Sequence<'a>> {
        let inner = self.descend()?;
        let parts = expr
            .contents
            .iter()
            .map(|item| inner.evaluate(item))
            .collect::<Result<Vec<_>>>()?;
        Ok(Sequence::concat(parts))
    }
}

/// Everything a function rule gets to see about one call.
pub struct Invocation<'a> {
    call: &'a FunctionCallExpression,
    focus: Sequence<'a>,
    evaluator: Evaluator<'a>,
}

impl<'a> Invocation<'a> {
    pub fn name(&self) -> &'a str {
        &self.call.name
    }

    /// The evaluated receiver (or the implicit focus).
    pub fn focus(&self) -> &Sequence<'a> {
        &self.focus
    }

    /// Unevaluated argument expressions.
    pub fn arguments(&self) -> &'a [Expression] {
        &self.call.arguments
    }

    /// Scope the call appears in; arguments are evaluated here unless a rule says otherwise.
    pub fn environment(&self) -> &Environment<'a> {
        &self.evaluator.env
    }

    pub fn metadata(&self) -> Option<&'a dyn ModelMetadataProvider> {
        self.evaluator.metadata
    }

    pub fn options(&self) -> EvalOptions {
        self.evaluator.options
    }

    fn expression(&self, index: usize) -> Result<&'a Expression> {
        self.call.arguments.get(index).ok_or_else(|| {
            Error::EvaluationError(format!(
                "{} has no argument at position {}",
                self.call.name, index
            ))
        })
    }

    /// Evaluate an argument in the calling scope.
    pub fn argument(&self, index: usize) -> Result<Sequence<'a>> {
        self.evaluator.evaluate(self.expression(index)?)
    }

    /// Evaluate an argument in a scope chosen by the rule.
    pub fn argument_in(&self, index: usize, env: Environment<'a>) -> Result<Sequence<'a>> {
        self.evaluator.scoped(env).evaluate(self.expression(index)?)
    }

    pub fn argument_scalar(&self, index: usize) -> Result<Option<Value>> {
        self.argument(index)?.scalar()
    }

    /// An argument that can be evaluated later, e.g. once per focus item inside a lazy
    /// sequence.
    pub fn deferred(&self, index: usize) -> Result<DeferredArgument<'a>> {
        Ok(DeferredArgument {
            expr: self.expression(index)?,
            evaluator: self.evaluator.clone(),
        })
    }

    pub fn into_focus(self) -> Sequence<'a> {
        self.focus
    }
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("name", &self.call.name)
            .field("arity", &self.call.arity())
            .field("focus", &self.focus)
            .finish()
    }
}

#[derive(Clone)]
pub struct DeferredArgument<'a> {
    expr: &'a Expression,
    evaluator: Evaluator<'a>,
}

impl<'a> DeferredArgument<'a> {
    pub fn expression(&self) -> &'a Expression {
        self.expr
    }

    /// Evaluate in the scope of the call it was taken from.
    pub fn evaluate_here(&self) -> Result<Sequence<'a>> {
        self.evaluator.evaluate(self.expr)
    }

    pub fn evaluate(&self, env: &Environment<'a>) -> Result<Sequence<'a>> {
        self.evaluator.scoped(env.clone()).evaluate(self.expr)
    }

    /// Evaluate with `$this` bound to one focus item.
    pub fn evaluate_for(&self, item: Item<'a>, index: usize) -> Result<Sequence<'a>> {
        self.evaluate(&self.evaluator.env.with_iteration(item, index))
    }
}

impl fmt::Debug for DeferredArgument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DeferredArgument").field(&self.expr).finish()
    }
}
