//! Shared utilities for builtin function rules.

use crate::error::{Error, Result};
use crate::evaluator::Invocation;
use crate::sequence::{Item, Sequence};

/// Evaluate a string-valued argument such as a member or type name.
pub(super) fn string_argument(inv: &Invocation<'_>, index: usize) -> Result<String> {
    match inv.argument_scalar(index)? {
        Some(value) => value.as_str().map(str::to_string).ok_or_else(|| {
            Error::TypeError(format!(
                "{}() expects a string argument, got {}",
                inv.name(),
                value
            ))
        }),
        None => Err(Error::TypeError(format!(
            "{}() expects a string argument, got an empty collection",
            inv.name()
        ))),
    }
}

pub(super) fn integer_argument(inv: &Invocation<'_>, index: usize) -> Result<Option<i64>> {
    match inv.argument_scalar(index)? {
        Some(value) => value.as_integer().map(Some).ok_or_else(|| {
            Error::TypeError(format!(
                "{}() expects an integer argument, got {}",
                inv.name(),
                value
            ))
        }),
        None => Ok(None),
    }
}

/// Set membership under FHIRPath equality.
pub(super) fn contains_item<'a>(items: &[Item<'a>], candidate: &Item<'a>) -> Result<bool> {
    for item in items {
        if item.equals(candidate)? == Some(true) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Items of a sequence with duplicates removed, first occurrence kept.
pub(super) fn distinct_items<'a>(sequences: &[Sequence<'a>]) -> Result<Vec<Item<'a>>> {
    let mut items = Vec::new();
    for sequence in sequences {
        for item in sequence.iter() {
            let item = item?;
            if !contains_item(&items, &item)? {
                items.push(item);
            }
        }
    }
    Ok(items)
}

#[cfg(test)]
pub(super) mod testing {
    use crate::environment::Environment;
    use crate::error::Result;
    use crate::evaluator::Evaluator;
    use crate::expression::Expression;
    use crate::registry::FunctionRegistry;
    use crate::sequence::Sequence;
    use crate::value::Value;

    pub fn eval<'a>(
        registry: &'a FunctionRegistry,
        root: Sequence<'a>,
        expr: &'a Expression,
    ) -> Result<Sequence<'a>> {
        Evaluator::new(registry, Environment::new(root)).evaluate(expr)
    }

    /// Evaluate and render every item by its scalar form.
    pub fn eval_strings<'a>(
        registry: &'a FunctionRegistry,
        root: Sequence<'a>,
        expr: &'a Expression,
    ) -> Result<Vec<String>> {
        Ok(eval(registry, root, expr)?
            .values()?
            .iter()
            .map(Value::to_string)
            .collect())
    }
}
