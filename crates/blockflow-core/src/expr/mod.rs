//! The parameter expression language.
//!
//! Parameter values are short expressions over literals and the ids of
//! evaluatable blocks. The language is deliberately small: numbers, quoted
//! strings, booleans, bracketed lists, the four arithmetic operators, unary
//! sign and parentheses. `+` also concatenates strings and lists.
//!
//! ```
//! use std::collections::BTreeMap;
//! use blockflow_core::expr::{evaluate, parse};
//! use blockflow_core::Value;
//!
//! let mut scope = BTreeMap::new();
//! scope.insert("samp_rate".to_string(), Value::Number(32000.0));
//! let expr = parse("samp_rate / 2").unwrap();
//! assert_eq!(evaluate(&expr, &scope).unwrap(), Value::Number(16000.0));
//! ```

mod eval;
mod lexer;
mod parser;

pub use eval::{EmptyScope, Scope, evaluate};
pub use lexer::scan_identifiers;
pub use parser::parse;

use thiserror::Error;

use crate::value::Value;

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value.
    Literal(Value),
    /// A reference to a namespace entry.
    Ident(String),
    /// Unary minus.
    Neg(Box<Expr>),
    /// Unary plus.
    Pos(Box<Expr>),
    /// A bracketed list.
    List(Vec<Expr>),
    /// A binary arithmetic operation.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Collects the identifiers referenced by this tree, in source order.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Ident(name) => out.push(name),
            Expr::Neg(inner) | Expr::Pos(inner) => inner.collect_identifiers(out),
            Expr::List(items) => {
                for item in items {
                    item.collect_identifiers(out);
                }
            }
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_identifiers(out);
                rhs.collect_identifiers(out);
            }
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

impl BinaryOp {
    /// Source spelling of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

/// Syntax error in an expression. Positions are byte offsets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    /// The expression contains no tokens.
    #[error("empty expression")]
    Empty,
    /// A character that starts no token.
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar {
        /// Byte offset.
        pos: usize,
        /// The offending character.
        ch: char,
    },
    /// A quote with no matching closing quote.
    #[error("unterminated string literal starting at position {pos}")]
    UnterminatedString {
        /// Byte offset of the opening quote.
        pos: usize,
    },
    /// A numeric literal that does not parse.
    #[error("invalid number '{text}' at position {pos}")]
    InvalidNumber {
        /// Byte offset.
        pos: usize,
        /// Literal text.
        text: String,
    },
    /// A token the grammar does not allow here.
    #[error("unexpected '{found}' at position {pos}")]
    UnexpectedToken {
        /// Byte offset.
        pos: usize,
        /// Description of the token found.
        found: String,
    },
    /// Input ended while more was expected.
    #[error("unexpected end of expression")]
    UnexpectedEnd,
}

/// Failure to evaluate an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// The expression does not parse.
    #[error("syntax error: {0}")]
    Syntax(#[from] ExprError),
    /// An identifier that is not in the namespace.
    #[error("unknown identifier '{name}'")]
    UnknownIdentifier {
        /// The identifier.
        name: String,
    },
    /// A binary operator applied to unsupported operand types.
    #[error("cannot apply '{op}' to {lhs} and {rhs}")]
    TypeMismatch {
        /// Operator spelling.
        op: &'static str,
        /// Left operand type.
        lhs: &'static str,
        /// Right operand type.
        rhs: &'static str,
    },
    /// A unary operator applied to a non-number.
    #[error("cannot apply unary '{op}' to {operand}")]
    InvalidOperand {
        /// Operator spelling.
        op: &'static str,
        /// Operand type.
        operand: &'static str,
    },
    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_in_source_order() {
        let expr = parse("b * [a, c] - -b").unwrap();
        assert_eq!(expr.identifiers(), vec!["b", "a", "c", "b"]);
    }

    #[test]
    fn test_error_display() {
        let err = EvalError::from(ExprError::UnexpectedChar { pos: 3, ch: '%' });
        assert_eq!(
            err.to_string(),
            "syntax error: unexpected character '%' at position 3"
        );
        assert_eq!(
            EvalError::UnknownIdentifier { name: "x".into() }.to_string(),
            "unknown identifier 'x'"
        );
    }
}
