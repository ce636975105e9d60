//! Existence functions: `empty()`, `exists()`, `all()` and `count()`.
//!
//! Results are computed when the returned sequence is consumed; `exists()` pulls
//! at most one item from its input.

use crate::error::Result;
use crate::evaluator::Invocation;
use crate::sequence::Sequence;
use crate::value::Value;

use super::filtering;

pub fn empty<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    let focus = inv.into_focus();
    Ok(Sequence::deferred_value(move || {
        Ok(Some(Value::boolean(!focus.exists()?)))
    }))
}

pub fn exists<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    let focus = inv.into_focus();
    Ok(Sequence::deferred_value(move || {
        Ok(Some(Value::boolean(focus.exists()?)))
    }))
}

/// `exists(criteria)` is `where(criteria).exists()`.
pub fn exists_where<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    let matching = filtering::filter(inv.focus().clone(), inv.deferred(0)?);
    Ok(Sequence::deferred_value(move || {
        Ok(Some(Value::boolean(matching.exists()?)))
    }))
}

/// True when the criteria holds for every item; vacuously true on empty input.
pub fn all<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    let criteria = inv.deferred(0)?;
    let focus = inv.into_focus();
    Ok(Sequence::deferred_value(move || {
        for (index, item) in focus.iter().enumerate() {
            if criteria.evaluate_for(item?, index)?.boolean()? != Some(true) {
                return Ok(Some(Value::boolean(false)));
            }
        }
        Ok(Some(Value::boolean(true)))
    }))
}

pub fn count<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    let focus = inv.into_focus();
    Ok(Sequence::deferred_value(move || {
        Ok(Some(Value::integer(focus.count()? as i64)))
    }))
}
