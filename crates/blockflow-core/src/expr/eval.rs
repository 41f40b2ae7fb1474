//! Tree-walking evaluation of parsed expressions.

use std::collections::{BTreeMap, HashMap};

use super::{BinaryOp, EvalError, Expr};
use crate::value::Value;

/// Name lookup used while evaluating identifiers.
///
/// Identifiers resolve against the scope only; there are no builtins.
pub trait Scope {
    /// Returns the value bound to `name`, if any.
    fn lookup(&self, name: &str) -> Option<&Value>;
}

impl Scope for BTreeMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl<S: std::hash::BuildHasher> Scope for HashMap<String, Value, S> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

/// A scope with no bindings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyScope;

impl Scope for EmptyScope {
    fn lookup(&self, _name: &str) -> Option<&Value> {
        None
    }
}

/// Evaluates `expr` against `scope`.
pub fn evaluate(expr: &Expr, scope: &dyn Scope) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Ident(name) => scope
            .lookup(name)
            .cloned()
            .ok_or_else(|| EvalError::UnknownIdentifier { name: name.clone() }),
        Expr::Neg(inner) => match evaluate(inner, scope)? {
            Value::Number(n) => Ok(Value::Number(-n)),
            other => Err(EvalError::InvalidOperand {
                op: "-",
                operand: other.type_name(),
            }),
        },
        Expr::Pos(inner) => match evaluate(inner, scope)? {
            Value::Number(n) => Ok(Value::Number(n)),
            other => Err(EvalError::InvalidOperand {
                op: "+",
                operand: other.type_name(),
            }),
        },
        Expr::List(items) => items
            .iter()
            .map(|item| evaluate(item, scope))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Expr::Binary { op, lhs, rhs } => {
            let lhs = evaluate(lhs, scope)?;
            let rhs = evaluate(rhs, scope)?;
            apply(*op, lhs, rhs)
        }
    }
}

fn apply(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    match (op, lhs, rhs) {
        (BinaryOp::Add, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
        (BinaryOp::Add, Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a))
        }
        (BinaryOp::Sub, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
        (BinaryOp::Mul, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
        (BinaryOp::Div, Value::Number(_), Value::Number(b)) if b == 0.0 => {
            Err(EvalError::DivisionByZero)
        }
        (BinaryOp::Div, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
        (op, lhs, rhs) => Err(EvalError::TypeMismatch {
            op: op.symbol(),
            lhs: lhs.type_name(),
            rhs: rhs.type_name(),
        }),
    }
}
