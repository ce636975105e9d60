//! Filtering functions for FHIRPath.
//!
//! This module implements collection filtering and projection: `where()`,
//! `select()` and `ofType()`. Criteria and projections are evaluated once per
//! input item with `$this` and `$index` bound to that item.

use crate::error::Result;
use crate::evaluator::{DeferredArgument, Invocation};
use crate::sequence::{Item, Items, Sequence};

use super::helpers;

/// Items for which `criteria` evaluates to `true`; empty or `false` drops the item.
pub(super) fn filter<'a>(focus: Sequence<'a>, criteria: DeferredArgument<'a>) -> Sequence<'a> {
    Sequence::lazy(move || {
        let criteria = criteria.clone();
        Box::new(
            focus
                .iter()
                .enumerate()
                .filter_map(move |(index, item)| {
                    item.and_then(|item| {
                        let verdict = criteria.evaluate_for(item.clone(), index)?.boolean()?;
                        Ok((verdict == Some(true)).then_some(item))
                    })
                    .transpose()
                }),
        )
    })
}

pub fn where_func<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    let criteria = inv.deferred(0)?;
    Ok(filter(inv.into_focus(), criteria))
}

pub fn select_func<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    let projection = inv.deferred(0)?;
    let focus = inv.into_focus();
    Ok(Sequence::lazy(move || {
        let projection = projection.clone();
        Box::new(
            focus
                .iter()
                .enumerate()
                .flat_map(move |(index, item)| -> Items<'a> {
                    match item.and_then(|item| projection.evaluate_for(item, index)) {
                        Ok(projected) => projected.iter(),
                        Err(e) => Box::new(std::iter::once(Err(e))),
                    }
                }),
        )
    }))
}

/// `ofType(name)`: nodes whose type name matches, values whose system type matches.
/// Names may be qualified with `FHIR.` or `System.`.
pub fn of_type<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    let wanted = helpers::string_argument(&inv, 0)?;
    Ok(inv
        .into_focus()
        .filter_map(move |item| Ok(is_of_type(&item, &wanted).then_some(item))))
}

fn is_of_type(item: &Item<'_>, wanted: &str) -> bool {
    match item {
        Item::Node(node) => {
            let wanted = wanted.strip_prefix("FHIR.").unwrap_or(wanted);
            node.type_name() == Some(wanted)
        }
        Item::Value(value) => {
            let wanted = wanted.strip_prefix("System.").unwrap_or(wanted);
            value.primitive_type().name() == wanted
        }
    }
}
