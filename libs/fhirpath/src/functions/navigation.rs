//! Navigation functions: path steps, `children()`, `descendants()` and indexers.

use crate::error::{Error, Result};
use crate::evaluator::Invocation;
use crate::sequence::{Item, Items, Sequence};
use tessera_format::NodeRef;

use super::helpers;

/// `builtin.children(name)`: one path step.
///
/// A step naming the type of a root resource (`Patient.name` evaluated on a
/// Patient) selects the resource itself.
pub fn children_named<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    let name = helpers::string_argument(&inv, 0)?;
    let metadata = inv.metadata();
    let strict = inv.options().strict;

    Ok(inv.into_focus().flat_map(move |item| {
        let Item::Node(node) = item else {
            return Ok(Sequence::empty());
        };

        if is_root(&node) && node.type_name() == Some(name.as_str()) {
            return Ok(Sequence::singleton(node));
        }

        if strict {
            if let (Some(metadata), Some(type_name)) = (metadata, node.type_name()) {
                if metadata.type_info(type_name).is_some()
                    && metadata.member(type_name, &name).is_none()
                {
                    return Err(Error::EvaluationError(format!(
                        "{} has no member named '{}' (at {})",
                        type_name,
                        name,
                        node.location()
                    )));
                }
            }
        }

        let name = name.clone();
        Ok(Sequence::lazy(move || {
            Box::new(node.children(&name).map(|member| Ok(Item::Node(member.node))))
        }))
    }))
}

fn is_root(node: &NodeRef<'_>) -> bool {
    node.location() == node.name()
}

/// `children()`: every member of every focus node.
pub fn children<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    Ok(inv.into_focus().flat_map(|item| {
        let Item::Node(node) = item else {
            return Ok(Sequence::empty());
        };
        Ok(Sequence::lazy(move || {
            Box::new(node.members().map(|member| Ok(Item::Node(member.node))))
        }))
    }))
}

/// `descendants()`: members, their members and so on, in depth-first pre-order.
pub fn descendants<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    Ok(inv.into_focus().flat_map(|item| {
        let Item::Node(node) = item else {
            return Ok(Sequence::empty());
        };
        Ok(Sequence::lazy(move || descendants_of(&node)))
    }))
}

fn descendants_of<'a>(node: &NodeRef<'a>) -> Items<'a> {
    Box::new(node.members().flat_map(|member| {
        let below = descendants_of(&member.node);
        std::iter::once(Ok(Item::Node(member.node))).chain(below)
    }))
}

/// `builtin.item(index)`: zero-based indexer. Out of range and negative indices
/// yield an empty result.
pub fn item<'a>(inv: Invocation<'a>) -> Result<Sequence<'a>> {
    let Some(index) = helpers::integer_argument(&inv, 0)? else {
        return Ok(Sequence::empty());
    };
    let Ok(index) = usize::try_from(index) else {
        return Ok(Sequence::empty());
    };

    let focus = inv.into_focus();
    Ok(Sequence::lazy(move || {
        Box::new(
            focus
                .iter()
                .enumerate()
                .filter(move |(position, item)| *position == index || item.is_err())
                .map(|(_, item)| item)
                .take(1),
        )
    }))
}

#[cfg(test)]
mod tests {
    use super::super::helpers::testing::{eval, eval_strings};
    use crate::error::Error;
    use crate::evaluator::{EvalOptions, Evaluator};
    use crate::environment::Environment;
    use crate::expression::{call, child, constant, method, path, ITEM_FUNCTION};
    use crate::registry::FunctionRegistry;
    use crate::sequence::Sequence;
    use std::sync::Arc;
    use tessera_context::{InMemoryMetadataProvider, MemberInfo, TypeInfo, TypeKind};
    use tessera_format::JsonDocument;

    const PATIENT: &str = r#"{
        "resourceType": "Patient",
        "name": [
            {"family": "Chalmers", "given": ["Peter", "James"]},
            {"family": "Windsor", "given": ["Jim"]}
        ],
        "active": true
    }"#;

    #[test]
    fn path_steps_flatten_repeats() {
        let doc = JsonDocument::parse(PATIENT).unwrap();
        let registry = FunctionRegistry::with_builtins();
        let expr = path(&["name", "given"]);
        let given = eval_strings(&registry, Sequence::singleton(doc.root_node()), &expr).unwrap();
        assert_eq!(given, vec!["Peter", "James", "Jim"]);
    }

    #[test]
    fn leading_type_name_selects_the_root() {
        let doc = JsonDocument::parse(PATIENT).unwrap();
        let registry = FunctionRegistry::with_builtins();
        let expr = path(&["Patient", "name", "family"]);
        let family = eval_strings(&registry, Sequence::singleton(doc.root_node()), &expr).unwrap();
        assert_eq!(family, vec!["Chalmers", "Windsor"]);

        let wrong = path(&["Observation", "name"]);
        let result = eval(&registry, Sequence::singleton(doc.root_node()), &wrong).unwrap();
        assert_eq!(result.count().unwrap(), 0);
    }

    #[test]
    fn indexer_picks_one_item() {
        let doc = JsonDocument::parse(PATIENT).unwrap();
        let registry = FunctionRegistry::with_builtins();
        let root = || Sequence::singleton(doc.root_node());

        let second = method(path(&["name", "given"]), ITEM_FUNCTION, vec![constant(1i64)]);
        assert_eq!(eval_strings(&registry, root(), &second).unwrap(), vec!["James"]);

        let beyond = method(path(&["name", "given"]), ITEM_FUNCTION, vec![constant(7i64)]);
        assert_eq!(eval(&registry, root(), &beyond).unwrap().count().unwrap(), 0);

        let negative = method(child("name"), ITEM_FUNCTION, vec![constant(-1i64)]);
        assert_eq!(eval(&registry, root(), &negative).unwrap().count().unwrap(), 0);
    }

    #[test]
    fn children_and_descendants() {
        let doc = JsonDocument::parse(PATIENT).unwrap();
        let registry = FunctionRegistry::with_builtins();
        let root = || Sequence::singleton(doc.root_node());

        let children = call("children", vec![]);
        assert_eq!(eval(&registry, root(), &children).unwrap().count().unwrap(), 3);

        let descendants = call("descendants", vec![]);
        let all = eval(&registry, root(), &descendants).unwrap().to_vec().unwrap();
        let locations: Vec<String> = all
            .iter()
            .filter_map(|item| item.as_node().map(|node| node.location().to_string()))
            .collect();
        assert_eq!(
            locations,
            vec![
                "Patient.name[0]",
                "Patient.name[0].family[0]",
                "Patient.name[0].given[0]",
                "Patient.name[0].given[1]",
                "Patient.name[1]",
                "Patient.name[1].family[0]",
                "Patient.name[1].given[0]",
                "Patient.active[0]",
            ]
        );
    }

    #[test]
    fn strict_mode_rejects_undeclared_members() {
        let metadata = Arc::new(
            InMemoryMetadataProvider::new()
                .with_type(
                    TypeInfo::new("Patient", TypeKind::Resource)
                        .with_member(MemberInfo::new("active", "boolean")),
                ),
        );
        let doc = JsonDocument::parse(PATIENT).unwrap().with_metadata(metadata.clone());
        let registry = FunctionRegistry::with_builtins();
        let expr = child("nmae");
        let env = Environment::for_node(doc.root_node());

        let lenient = Evaluator::new(&registry, env.clone())
            .with_metadata(Some(metadata.as_ref()))
            .evaluate(&expr)
            .unwrap();
        assert_eq!(lenient.count().unwrap(), 0);

        let strict = Evaluator::new(&registry, env)
            .with_metadata(Some(metadata.as_ref()))
            .with_options(EvalOptions {
                strict: true,
                ..EvalOptions::default()
            })
            .evaluate(&expr)
            .unwrap();
        assert!(matches!(strict.to_vec(), Err(Error::EvaluationError(_))));
    }
}
