//! Subsetting functions: `first()`, `last()`, `single()` and `tail()`.

use crate::error::Result;
use crate::evaluator::Invocation;
use crate::sequence::Sequence;

pub fn first<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    let focus = inv.into_focus();
    Ok(Sequence::lazy(move || Box::new(focus.iter().take(1))))
}

pub fn last<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    let focus = inv.into_focus();
    Ok(Sequence::deferred_item(move || {
        let mut last = None;
        for item in focus.iter() {
            last = Some(item?);
        }
        Ok(last)
    }))
}

/// The only item of the input; more than one is an error.
pub fn single<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    let focus = inv.into_focus();
    Ok(Sequence::deferred_item(move || focus.single()))
}

/// Everything but the first item. An error in the first item is still reported.
pub fn tail<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    let focus = inv.into_focus();
    Ok(Sequence::lazy(move || {
        Box::new(
            focus
                .iter()
                .enumerate()
                .filter(|(position, item)| *position > 0 || item.is_err())
                .map(|(_, item)| item),
        )
    }))
}
