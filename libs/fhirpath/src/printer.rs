//! Render expression trees back to FHIRPath-like text.

use crate::expression::{
    ConstantExpression, Expression, FunctionCallExpression, NewNodeListInitExpression,
    VariableRefExpression, CHILDREN_FUNCTION, ITEM_FUNCTION,
};
use crate::value::ValueData;
use crate::visitor::ExpressionVisitor;
use std::fmt;

const INFIX_OPERATORS: &[&str] = &[
    "=", "!=", "~", "!~", "<", ">", "<=", ">=", "|", "+", "-", "*", "/", "&", "and", "or", "xor",
    "implies", "in", "contains", "is", "as", "div", "mod",
];

/// Produces source text for a tree; used by `Display for Expression`.
#[derive(Debug, Default)]
pub struct ExpressionPrinter;

impl ExpressionPrinter {
    pub fn print(expr: &Expression) -> String {
        expr.accept(&mut ExpressionPrinter)
    }

    fn receiver(&mut self, call: &FunctionCallExpression) -> Option<String> {
        call.focus.as_deref().map(|focus| focus.accept(self))
    }
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

impl<'e> ExpressionVisitor<'e, String> for ExpressionPrinter {
    fn visit_constant(&mut self, expr: &'e ConstantExpression) -> String {
        let value = &expr.value;
        match value.data() {
            ValueData::String(s) => quote(s),
            ValueData::Date { .. } | ValueData::DateTime { .. } => format!("@{}", value),
            ValueData::Time { .. } => format!("@T{}", value),
            _ => value.to_string(),
        }
    }

    fn visit_function_call(&mut self, expr: &'e FunctionCallExpression) -> String {
        let receiver = self.receiver(expr);
        let arguments: Vec<String> = expr.arguments.iter().map(|a| a.accept(self)).collect();

        match (expr.name.as_str(), receiver, arguments.as_slice()) {
            (CHILDREN_FUNCTION, receiver, [_]) => {
                let name = match &expr.arguments[0] {
                    Expression::Constant(ConstantExpression { value }) => value.to_string(),
                    _ => return format!("{}({})", CHILDREN_FUNCTION, arguments[0]),
                };
                match receiver {
                    Some(receiver) => format!("{}.{}", receiver, name),
                    None => name,
                }
            }
            (ITEM_FUNCTION, Some(receiver), [index]) => format!("{}[{}]", receiver, index),
            (operator, None, [left, right]) if INFIX_OPERATORS.contains(&operator) => {
                format!("({} {} {})", left, operator, right)
            }
            (name, Some(receiver), arguments) => {
                format!("{}.{}({})", receiver, name, arguments.join(", "))
            }
            (name, None, arguments) => format!("{}({})", name, arguments.join(", ")),
        }
    }

    fn visit_variable_ref(&mut self, expr: &'e VariableRefExpression) -> String {
        if expr.name.starts_with(['%', '$']) {
            expr.name.clone()
        } else {
            format!("%{}", expr.name)
        }
    }

    fn visit_new_node_list_init(&mut self, expr: &'e NewNodeListInitExpression) -> String {
        let items: Vec<String> = expr.contents.iter().map(|e| e.accept(self)).collect();
        format!("{{{}}}", items.join(", "))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&ExpressionPrinter::print(self))
    }
}
