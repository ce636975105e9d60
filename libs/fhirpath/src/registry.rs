//! Function registry
//!
//! Maps a function name and arity to its evaluation rule. Lookups happen during
//! evaluation; a miss is an error, never a silent empty result.

use crate::analysis::ReferenceCollector;
use crate::error::{Error, Result};
use crate::evaluator::Invocation;
use crate::expression::Expression;
use crate::functions;
use crate::sequence::Sequence;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Evaluation rule for one (name, arity) pair.
pub type FunctionRule =
    Arc<dyn for<'a> Fn(Invocation<'a>) -> Result<Sequence<'a>> + Send + Sync>;

#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, BTreeMap<usize, FunctionRule>>,
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the structural builtins (navigation, existence,
    /// filtering, subsetting, boolean logic, equality).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        functions::register_builtins(&mut registry);
        registry
    }

    /// Register a rule, replacing any previous rule for the same name and arity.
    pub fn register<F>(&mut self, name: impl Into<String>, arity: usize, rule: F) -> &mut Self
    where
        F: for<'a> Fn(Invocation<'a>) -> Result<Sequence<'a>> + Send + Sync + 'static,
    {
        self.functions
            .entry(name.into())
            .or_default()
            .insert(arity, Arc::new(rule));
        self
    }

    pub fn contains(&self, name: &str, arity: usize) -> bool {
        self.functions
            .get(name)
            .is_some_and(|overloads| overloads.contains_key(&arity))
    }

    pub fn resolve(&self, name: &str, arity: usize) -> Result<&FunctionRule> {
        let overloads = self
            .functions
            .get(name)
            .ok_or_else(|| Error::UnknownFunction {
                name: name.to_string(),
                arity,
            })?;

        overloads.get(&arity).ok_or_else(|| {
            let expected: Vec<String> = overloads.keys().map(|a| a.to_string()).collect();
            Error::WrongArity {
                name: name.to_string(),
                expected: expected.join(" or "),
                actual: arity,
            }
        })
    }

    /// Verify that every function the expression calls is registered.
    pub fn check(&self, expr: &Expression) -> Result<()> {
        let references = ReferenceCollector::collect(expr);
        for (name, arity) in &references.functions {
            self.resolve(name, *arity)?;
        }
        Ok(())
    }

    /// Registered names with their arities, sorted by name.
    pub fn signatures(&self) -> Vec<(&str, usize)> {
        let mut signatures: Vec<(&str, usize)> = self
            .functions
            .iter()
            .flat_map(|(name, overloads)| overloads.keys().map(move |arity| (name.as_str(), *arity)))
            .collect();
        signatures.sort_unstable();
        signatures
    }

    pub fn len(&self) -> usize {
        self.functions.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.signatures())
            .finish()
    }
}
