//! Equality operators and collection union.

use crate::error::Result;
use crate::evaluator::Invocation;
use crate::sequence::{Items, Sequence};
use crate::value::Value;

use super::helpers;

/// FHIRPath `=`: empty when either side is empty, `false` for different sizes,
/// otherwise item-wise equality in order. Any incomparable pair makes the result empty.
fn sequences_equal<'a>(left: &Sequence<'a>, right: &Sequence<'a>) -> Result<Option<bool>> {
    let left = left.to_vec()?;
    let right = right.to_vec()?;
    if left.is_empty() || right.is_empty() {
        return Ok(None);
    }
    if left.len() != right.len() {
        return Ok(Some(false));
    }

    let mut result = Some(true);
    for (l, r) in left.iter().zip(right.iter()) {
        match l.equals(r)? {
            Some(true) => {}
            Some(false) => return Ok(Some(false)),
            None => result = None,
        }
    }
    Ok(result)
}

pub fn equal<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    let left = inv.deferred(0)?;
    let right = inv.deferred(1)?;
    Ok(Sequence::deferred_value(move || {
        let verdict = sequences_equal(&left.evaluate_here()?, &right.evaluate_here()?)?;
        Ok(verdict.map(Value::boolean))
    }))
}

pub fn not_equal<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    let left = inv.deferred(0)?;
    let right = inv.deferred(1)?;
    Ok(Sequence::deferred_value(move || {
        let verdict = sequences_equal(&left.evaluate_here()?, &right.evaluate_here()?)?;
        Ok(verdict.map(|equal| Value::boolean(!equal)))
    }))
}

/// `a | b`: both operands merged in order with duplicates removed.
pub fn union_func<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    let left = inv.deferred(0)?;
    let right = inv.deferred(1)?;
    Ok(Sequence::lazy(move || -> Items<'a> {
        let merged = left
            .evaluate_here()
            .and_then(|l| Ok((l, right.evaluate_here()?)))
            .and_then(|(l, r)| helpers::distinct_items(&[l, r]));
        match merged {
            Ok(items) => Box::new(items.into_iter().map(Ok)),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::super::helpers::testing::eval_strings;
    use crate::expression::{call, child, constant, list, method, Expression};
    use crate::registry::FunctionRegistry;
    use crate::sequence::Sequence;
    use crate::value::{PrimitiveType, Value};
    use rust_decimal::Decimal;
    use tessera_format::JsonDocument;

    fn run(expr: &Expression) -> Vec<String> {
        let registry = FunctionRegistry::with_builtins();
        eval_strings(&registry, Sequence::empty(), expr).unwrap()
    }

    #[test]
    fn equality_of_singletons_and_lists() {
        assert_eq!(run(&call("=", vec![constant(1i64), constant(1i64)])), vec!["true"]);
        assert_eq!(
            run(&call("=", vec![constant(1i64), constant(Decimal::new(10, 1))])),
            vec!["true"]
        );
        assert_eq!(run(&call("!=", vec![constant("a"), constant("b")])), vec!["true"]);
        assert!(run(&call("=", vec![list(vec![]), constant(1i64)])).is_empty());

        let pair = || list(vec![constant(1i64), constant(2i64)]);
        assert_eq!(run(&call("=", vec![pair(), pair()])), vec!["true"]);
        assert_eq!(run(&call("=", vec![pair(), constant(1i64)])), vec!["false"]);
    }

    #[test]
    fn incomparable_precisions_are_unknown() {
        let year = Value::parse(PrimitiveType::Date, "2024").unwrap();
        let day = Value::parse(PrimitiveType::Date, "2024-01-01").unwrap();
        assert!(run(&call("=", vec![constant(year), constant(day)])).is_empty());
    }

    #[test]
    fn union_removes_duplicates() {
        let left = list(vec![constant(1i64), constant(2i64), constant(2i64)]);
        let right = list(vec![constant(3i64), constant(1i64)]);
        assert_eq!(run(&call("|", vec![left, right])), vec!["1", "2", "3"]);
    }

    #[test]
    fn complex_nodes_compare_structurally() {
        let doc = JsonDocument::parse(
            r#"{"resourceType": "Patient",
                "name": [{"family": "Doe"}, {"family": "Doe"}, {"family": "Roe"}]}"#,
        )
        .unwrap();
        let registry = FunctionRegistry::with_builtins();
        let root = || Sequence::singleton(doc.root_node());
        let name = |i: i64| method(child("name"), "builtin.item", vec![constant(i)]);

        let same = call("=", vec![name(0), name(1)]);
        assert_eq!(eval_strings(&registry, root(), &same).unwrap(), vec!["true"]);

        let different = call("=", vec![name(0), name(2)]);
        assert_eq!(eval_strings(&registry, root(), &different).unwrap(), vec!["false"]);
    }
}
