//! Builtin function rules
//!
//! Only the structural core lives here: navigation, existence, filtering,
//! subsetting, boolean logic and equality. Everything else is registered by the
//! embedding application through [`FunctionRegistry::register`].

mod boolean;
mod combining;
mod existence;
mod filtering;
mod helpers;
mod navigation;
mod subsetting;

use crate::expression::{CHILDREN_FUNCTION, ITEM_FUNCTION};
use crate::registry::FunctionRegistry;

pub(crate) fn register_builtins(registry: &mut FunctionRegistry) {
    registry
        // Navigation
        .register(CHILDREN_FUNCTION, 1, navigation::children_named)
        .register(ITEM_FUNCTION, 1, navigation::item)
        .register("children", 0, navigation::children)
        .register("descendants", 0, navigation::descendants)
        // Existence
        .register("empty", 0, existence::empty)
        .register("exists", 0, existence::exists)
        .register("exists", 1, existence::exists_where)
        .register("all", 1, existence::all)
        .register("count", 0, existence::count)
        // Filtering and projection
        .register("where", 1, filtering::where_func)
        .register("select", 1, filtering::select_func)
        .register("ofType", 1, filtering::of_type)
        // Subsetting
        .register("first", 0, subsetting::first)
        .register("last", 0, subsetting::last)
        .register("single", 0, subsetting::single)
        .register("tail", 0, subsetting::tail)
        // Boolean logic
        .register("not", 0, boolean::not)
        .register("and", 2, boolean::and)
        .register("or", 2, boolean::or)
        .register("iif", 2, boolean::iif)
        .register("iif", 3, boolean::iif)
        // Equality and union
        .register("=", 2, combining::equal)
        .register("!=", 2, combining::not_equal)
        .register("|", 2, combining::union_func);
}
