//! Recursive-descent parser producing [`Expr`] trees.
//!
//! Grammar (whitespace is insignificant):
//!
//! ```text
//! expr    ::= term ( ('+' | '-') term )*
//! term    ::= unary ( ('*' | '/') unary )*
//! unary   ::= ('-' | '+') unary | primary
//! primary ::= NUMBER | STRING | 'true' | 'false' | IDENT
//!           | '(' expr ')'
//!           | '[' ( expr ( ',' expr )* ','? )? ']'
//! ```

use super::lexer::{Token, TokenKind, tokenize};
use super::{BinaryOp, Expr, ExprError};
use crate::value::Value;

/// Parses an expression string into an AST.
pub fn parse(text: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr()?;
    if let Some(token) = parser.peek() {
        return Err(ExprError::UnexpectedToken {
            pos: token.pos,
            found: token.kind.describe(),
        });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ExprError> {
        match self.advance() {
            Some(token) if &token.kind == kind => Ok(()),
            Some(token) => Err(ExprError::UnexpectedToken {
                pos: token.pos,
                found: token.kind.describe(),
            }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    /// `expr ::= term ( ('+' | '-') term )*`
    fn parse_expr(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    /// `term ::= unary ( ('*' | '/') unary )*`
    fn parse_term(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    /// `unary ::= ('-' | '+') unary | primary`
    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        match self.peek_kind() {
            Some(TokenKind::Minus) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.parse_unary()?)))
            }
            Some(TokenKind::Plus) => {
                self.pos += 1;
                Ok(Expr::Pos(Box::new(self.parse_unary()?)))
            }
            _ => self.parse_primary(),
        }
    }

    /// `primary ::= NUMBER | STRING | IDENT | '(' expr ')' | list`
    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        let token = self.advance().ok_or(ExprError::UnexpectedEnd)?;
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            TokenKind::Str(s) => Ok(Expr::Literal(Value::Str(s))),
            TokenKind::Ident(name) => Ok(match name.as_str() {
                "true" | "True" => Expr::Literal(Value::Bool(true)),
                "false" | "False" => Expr::Literal(Value::Bool(false)),
                _ => Expr::Ident(name),
            }),
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => self.parse_list(),
            other => Err(ExprError::UnexpectedToken {
                pos: token.pos,
                found: other.describe(),
            }),
        }
    }

    /// `list ::= '[' ( expr ( ',' expr )* ','? )? ']'` (opening bracket consumed)
    fn parse_list(&mut self) -> Result<Expr, ExprError> {
        let mut items = Vec::new();
        loop {
            if self.peek_kind() == Some(&TokenKind::RBracket) {
                self.pos += 1;
                return Ok(Expr::List(items));
            }
            items.push(self.parse_expr()?);
            match self.advance() {
                Some(Token {
                    kind: TokenKind::Comma,
                    ..
                }) => {}
                Some(Token {
                    kind: TokenKind::RBracket,
                    ..
                }) => return Ok(Expr::List(items)),
                Some(token) => {
                    return Err(ExprError::UnexpectedToken {
                        pos: token.pos,
                        found: token.kind.describe(),
                    });
                }
                None => return Err(ExprError::UnexpectedEnd),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Literal(Value::Number(n)))
    }

    #[test]
    fn test_precedence_binds_multiplication_tighter() {
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                lhs: num(1.0),
                rhs: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    lhs: num(2.0),
                    rhs: num(3.0),
                }),
            }
        );
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        let expr = parse("8 - 4 - 2").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Sub,
                lhs: Box::new(Expr::Binary {
                    op: BinaryOp::Sub,
                    lhs: num(8.0),
                    rhs: num(4.0),
                }),
                rhs: num(2.0),
            }
        );
    }

    #[test]
    fn test_parses_lists_with_trailing_comma() {
        assert_eq!(
            parse("[1, 2,]").unwrap(),
            Expr::List(vec![*num(1.0), *num(2.0)])
        );
        assert_eq!(parse("[]").unwrap(), Expr::List(vec![]));
    }

    #[test]
    fn test_parses_booleans_and_identifiers() {
        assert_eq!(parse("true").unwrap(), Expr::Literal(Value::Bool(true)));
        assert_eq!(parse("samp_rate").unwrap(), Expr::Ident("samp_rate".into()));
    }

    #[test]
    fn test_empty_expression_is_an_error() {
        assert_eq!(parse("   "), Err(ExprError::Empty));
    }

    #[test]
    fn test_unbalanced_parenthesis_is_an_error() {
        assert_eq!(parse("(1 + 2"), Err(ExprError::UnexpectedEnd));
        assert!(matches!(
            parse("1 + 2)"),
            Err(ExprError::UnexpectedToken { pos: 5, .. })
        ));
    }

    #[test]
    fn test_dangling_operator_is_an_error() {
        assert_eq!(parse("1 +"), Err(ExprError::UnexpectedEnd));
        assert!(matches!(
            parse("1 * * 2"),
            Err(ExprError::UnexpectedToken { pos: 4, .. })
        ));
    }

    #[test]
    fn test_juxtaposed_operands_are_an_error() {
        assert!(matches!(
            parse("a b"),
            Err(ExprError::UnexpectedToken { pos: 2, .. })
        ));
    }
}
