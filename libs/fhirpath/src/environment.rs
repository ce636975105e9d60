//! Evaluation environment
//!
//! An environment is an immutable chain of scopes. Entering a nested scope (an
//! iteration inside `where`, a user variable) produces a new environment pointing at
//! its parent; nothing is ever mutated, so closures captured by lazy sequences keep
//! seeing the bindings that were current when they were created.

use crate::error::{Error, Result};
use crate::sequence::{Item, Sequence};
use crate::value::Value;
use std::fmt;
use std::rc::Rc;
use tessera_format::NodeRef;

const VALUE_SET_BASE: &str = "http://hl7.org/fhir/ValueSet/";
const EXTENSION_BASE: &str = "http://hl7.org/fhir/StructureDefinition/";

/// Terminology constants available in every environment.
fn well_known_constant(name: &str) -> Option<String> {
    match name {
        "sct" => Some("http://snomed.info/sct".to_string()),
        "loinc" => Some("http://loinc.org".to_string()),
        "ucum" => Some("http://unitsofmeasure.org".to_string()),
        _ => {
            if let Some(id) = name.strip_prefix("vs-").filter(|id| !id.is_empty()) {
                Some(format!("{}{}", VALUE_SET_BASE, id))
            } else {
                name.strip_prefix("ext-")
                    .filter(|id| !id.is_empty())
                    .map(|id| format!("{}{}", EXTENSION_BASE, id))
            }
        }
    }
}

#[derive(Clone)]
struct Slots<'a> {
    focus: Sequence<'a>,
    context: Sequence<'a>,
    resource: Sequence<'a>,
    root_resource: Sequence<'a>,
    index: Option<usize>,
    total: Option<Sequence<'a>>,
}

struct Scope<'a> {
    parent: Option<Environment<'a>>,
    slots: Slots<'a>,
    variable: Option<(String, Sequence<'a>)>,
}

#[derive(Clone)]
pub struct Environment<'a> {
    scope: Rc<Scope<'a>>,
}

impl<'a> Environment<'a> {
    /// Root scope: the input is the focus, `%context`, `%resource` and `%rootResource`.
    pub fn new(root: Sequence<'a>) -> Self {
        Self {
            scope: Rc::new(Scope {
                parent: None,
                slots: Slots {
                    focus: root.clone(),
                    context: root.clone(),
                    resource: root.clone(),
                    root_resource: root,
                    index: None,
                    total: None,
                },
                variable: None,
            }),
        }
    }

    pub fn for_node(root: NodeRef<'a>) -> Self {
        Self::new(Sequence::singleton(root))
    }

    fn extend(&self, slots: Slots<'a>, variable: Option<(String, Sequence<'a>)>) -> Self {
        Self {
            scope: Rc::new(Scope {
                parent: Some(self.clone()),
                slots,
                variable,
            }),
        }
    }

    fn with_slots(&self, update: impl FnOnce(&mut Slots<'a>)) -> Self {
        let mut slots = self.scope.slots.clone();
        update(&mut slots);
        self.extend(slots, None)
    }

    /// Bind a user variable; a leading `%` is ignored.
    pub fn with_variable(&self, name: &str, value: Sequence<'a>) -> Self {
        let name = name.strip_prefix('%').unwrap_or(name).to_string();
        self.extend(self.scope.slots.clone(), Some((name, value)))
    }

    pub fn with_focus(&self, focus: Sequence<'a>) -> Self {
        self.with_slots(|slots| slots.focus = focus)
    }

    /// Scope for one element of an iterating function: `$this` and `$index`.
    pub fn with_iteration(&self, item: Item<'a>, index: usize) -> Self {
        self.with_slots(|slots| {
            slots.focus = Sequence::singleton(item);
            slots.index = Some(index);
        })
    }

    pub fn with_total(&self, total: Sequence<'a>) -> Self {
        self.with_slots(|slots| slots.total = Some(total))
    }

    pub fn with_resource(&self, resource: Sequence<'a>) -> Self {
        self.with_slots(|slots| slots.resource = resource)
    }

    pub fn with_root_resource(&self, root_resource: Sequence<'a>) -> Self {
        self.with_slots(|slots| slots.root_resource = root_resource)
    }

    /// The implicit receiver of unqualified function calls (`$this`).
    pub fn focus(&self) -> &Sequence<'a> {
        &self.scope.slots.focus
    }

    pub fn index(&self) -> Option<usize> {
        self.scope.slots.index
    }

    fn lookup_variable(&self, name: &str) -> Option<&Sequence<'a>> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some((bound, value)) = &env.scope.variable {
                if bound == name {
                    return Some(value);
                }
            }
            scope = env.scope.parent.as_ref();
        }
        None
    }

    /// Resolve a variable reference as written (`$this`, `%resource`, `%vs-...`).
    pub fn resolve(&self, name: &str) -> Result<Sequence<'a>> {
        let slots = &self.scope.slots;
        match name {
            "$this" => return Ok(slots.focus.clone()),
            "$index" => {
                return slots
                    .index
                    .map(|index| Sequence::singleton(Value::integer(index as i64)))
                    .ok_or_else(|| Error::UndefinedVariable(name.to_string()))
            }
            "$total" => {
                return slots
                    .total
                    .clone()
                    .ok_or_else(|| Error::UndefinedVariable(name.to_string()))
            }
            _ => {}
        }

        let key = name.strip_prefix('%').unwrap_or(name);
        if let Some(value) = self.lookup_variable(key) {
            return Ok(value.clone());
        }

        match key {
            "context" => Ok(slots.context.clone()),
            "resource" => Ok(slots.resource.clone()),
            "rootResource" => Ok(slots.root_resource.clone()),
            _ => well_known_constant(key)
                .map(|uri| Sequence::singleton(Value::string(uri)))
                .ok_or_else(|| Error::UndefinedVariable(name.to_string())),
        }
    }
}

impl fmt::Debug for Environment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut variables = Vec::new();
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some((name, _)) = &env.scope.variable {
                variables.push(name.as_str());
            }
            scope = env.scope.parent.as_ref();
        }
        f.debug_struct("Environment")
            .field("focus", &self.scope.slots.focus)
            .field("index", &self.scope.slots.index)
            .field("variables", &variables)
            .finish()
    }
}
