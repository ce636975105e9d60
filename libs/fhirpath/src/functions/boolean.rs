//! Boolean logic: `not()`, `and`, `or` and `iif()`.
//!
//! `and` and `or` follow three-valued logic where an empty operand is unknown.
//! The right operand is only evaluated when the left one does not decide the result.

use crate::error::Result;
use crate::evaluator::Invocation;
use crate::sequence::Sequence;
use crate::value::Value;

pub fn not<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    let focus = inv.into_focus();
    Ok(Sequence::deferred_value(move || {
        Ok(focus.boolean()?.map(|b| Value::boolean(!b)))
    }))
}

pub fn and<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    let left = inv.deferred(0)?;
    let right = inv.deferred(1)?;
    Ok(Sequence::deferred_value(move || {
        let lhs = left.evaluate_here()?.boolean()?;
        if lhs == Some(false) {
            return Ok(Some(Value::boolean(false)));
        }
        let rhs = right.evaluate_here()?.boolean()?;
        Ok(match (lhs, rhs) {
            (_, Some(false)) => Some(Value::boolean(false)),
            (Some(true), Some(true)) => Some(Value::boolean(true)),
            _ => None,
        })
    }))
}

pub fn or<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    let left = inv.deferred(0)?;
    let right = inv.deferred(1)?;
    Ok(Sequence::deferred_value(move || {
        let lhs = left.evaluate_here()?.boolean()?;
        if lhs == Some(true) {
            return Ok(Some(Value::boolean(true)));
        }
        let rhs = right.evaluate_here()?.boolean()?;
        Ok(match (lhs, rhs) {
            (_, Some(true)) => Some(Value::boolean(true)),
            (Some(false), Some(false)) => Some(Value::boolean(false)),
            _ => None,
        })
    }))
}

/// `iif(criterion, true-result [, otherwise-result])`: only the chosen branch is
/// evaluated; an empty criterion selects the otherwise branch.
pub fn iif<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    let criterion = inv.argument(0)?.boolean()?;
    if criterion == Some(true) {
        inv.argument(1)
    } else if inv.arguments().len() > 2 {
        inv.argument(2)
    } else {
        Ok(Sequence::empty())
    }
}
