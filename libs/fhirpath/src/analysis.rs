//! Static analysis over expression trees.

use crate::expression::{
    ConstantExpression, Expression, FunctionCallExpression, NewNodeListInitExpression,
    VariableRefExpression,
};
use crate::visitor::ExpressionVisitor;

/// Collects the functions (name, arity) and variables an expression references, in
/// order of first appearance (receivers before arguments).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReferenceCollector {
    pub functions: Vec<(String, usize)>,
    pub variables: Vec<String>,
}

impl ReferenceCollector {
    pub fn collect(expr: &Expression) -> Self {
        let mut collector = Self::default();
        expr.accept(&mut collector);
        collector
    }
}

impl<'e> ExpressionVisitor<'e, ()> for ReferenceCollector {
    fn visit_constant(&mut self, _expr: &'e ConstantExpression) {}

    fn visit_function_call(&mut self, expr: &'e FunctionCallExpression) {
        if let Some(focus) = expr.focus.as_deref() {
            focus.accept(self);
        }
        let key = (expr.name.clone(), expr.arity());
        if !self.functions.contains(&key) {
            self.functions.push(key);
        }
        for argument in &expr.arguments {
            argument.accept(self);
        }
    }

    fn visit_variable_ref(&mut self, expr: &'e VariableRefExpression) {
        if !self.variables.contains(&expr.name) {
            self.variables.push(expr.name.clone());
        }
    }

    fn visit_new_node_list_init(&mut self, expr: &'e NewNodeListInitExpression) {
        for item in &expr.contents {
            item.accept(self);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{call, constant, list, method, path, variable};

    #[test]
    fn collects_functions_and_variables_once() {
        let expr = list(vec![
            method(path(&["name"]), "where", vec![call("exists", vec![])]),
            call("=", vec![variable("%resource"), variable("%resource")]),
            constant(1i64),
        ]);
        let refs = ReferenceCollector::collect(&expr);
        assert_eq!(
            refs.functions,
            vec![
                ("builtin.children".to_string(), 1),
                ("where".to_string(), 1),
                ("exists".to_string(), 0),
                ("=".to_string(), 2),
            ]
        );
        assert_eq!(refs.variables, vec!["%resource".to_string()]);
    }
}
