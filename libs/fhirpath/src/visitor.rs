//! Double-dispatch walking over [`Expression`] trees.

use crate::expression::{
    ConstantExpression, Expression, FunctionCallExpression, NewNodeListInitExpression,
    VariableRefExpression,
};

/// One operation per expression variant, returning a caller-chosen `T`.
///
/// `'e` is the lifetime of the tree being walked; visitors that hand out borrows of
/// the tree (the evaluator's deferred arguments) rely on it.
pub trait ExpressionVisitor<'e, T> {
    fn visit_constant(&mut self, expr: &'e ConstantExpression) -> T;
    fn visit_function_call(&mut self, expr: &'e FunctionCallExpression) -> T;
    fn visit_variable_ref(&mut self, expr: &'e VariableRefExpression) -> T;
    fn visit_new_node_list_init(&mut self, expr: &'e NewNodeListInitExpression) -> T;
}

impl Expression {
    pub fn accept<'e, T, V>(&'e self, visitor: &mut V) -> T
    where
        V: ExpressionVisitor<'e, T> + ?Sized,
    {
        match self {
            Expression::Constant(expr) => visitor.visit_constant(expr),
            Expression::FunctionCall(expr) => visitor.visit_function_call(expr),
            Expression::VariableRef(expr) => visitor.visit_variable_ref(expr),
            Expression::NewNodeListInit(expr) => visitor.visit_new_node_list_init(expr),
        }
    }
}
