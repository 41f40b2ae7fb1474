//! Tokenizer for parameter expressions, plus a tolerant identifier scanner.
//!
//! Two entry points share the same lexical rules:
//!
//! - [`tokenize`] is strict and feeds the parser.
//! - [`scan_identifiers`] never fails. It is used for dependency extraction,
//!   where an expression may be half-typed or not evaluable at all, and only
//!   identifier tokens at token boundaries matter.

use super::ExprError;

/// A lexical token with the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub pos: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

impl TokenKind {
    pub(crate) fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => n.to_string(),
            TokenKind::Str(s) => format!("{s:?}"),
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Plus => "+".to_string(),
            TokenKind::Minus => "-".to_string(),
            TokenKind::Star => "*".to_string(),
            TokenKind::Slash => "/".to_string(),
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
            TokenKind::LBracket => "[".to_string(),
            TokenKind::RBracket => "]".to_string(),
            TokenKind::Comma => ",".to_string(),
        }
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Byte cursor over the expression text.
struct Cursor<'a> {
    text: &'a str,
    input: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            input: text.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Consumes an identifier starting at the cursor and returns it.
    fn identifier(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        &self.text[start..self.pos]
    }

    /// Consumes a numeric literal: decimal with optional fraction and
    /// exponent, or `0x` hexadecimal. Returns the literal text.
    fn number(&mut self) -> &'a str {
        let start = self.pos;
        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x' | b'X')) {
            self.pos += 2;
            while self.peek().is_some_and(|b| b.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            return &self.text[start..self.pos];
        }
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some(b'.') {
            self.pos += 1;
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some(b'+' | b'-')));
            if self.peek_at(1 + sign).is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1 + sign;
                while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }
        // Trailing identifier characters (e.g. `1k`) belong to the literal so
        // they are never mistaken for a separate identifier.
        while self.peek().is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        &self.text[start..self.pos]
    }

    /// Consumes a quoted string. Returns the unescaped contents, or `None` if
    /// the literal is unterminated (the cursor is then at end of input).
    fn string(&mut self) -> Option<String> {
        let quote = self.peek()?;
        self.pos += 1;
        let mut out = String::new();
        let mut segment_start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'\\' {
                out.push_str(&self.text[segment_start..self.pos]);
                let escaped = self.text[self.pos + 1..].chars().next();
                match escaped {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(ch) => out.push(ch),
                    None => {}
                }
                self.pos += 1 + escaped.map_or(0, char::len_utf8);
                segment_start = self.pos;
                continue;
            }
            if b == quote {
                out.push_str(&self.text[segment_start..self.pos]);
                self.pos += 1;
                return Some(out);
            }
            self.pos += 1;
        }
        None
    }
}

fn parse_number(text: &str, pos: usize) -> Result<f64, ExprError> {
    let invalid = || ExprError::InvalidNumber {
        pos,
        text: text.to_string(),
    };
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16)
            .map(|n| n as f64)
            .map_err(|_| invalid());
    }
    text.parse::<f64>().map_err(|_| invalid())
}

/// Splits an expression into tokens.
pub(crate) fn tokenize(text: &str) -> Result<Vec<Token>, ExprError> {
    let mut cursor = Cursor::new(text);
    let mut tokens = Vec::new();

    loop {
        cursor.skip_ws();
        let pos = cursor.pos;
        let Some(b) = cursor.peek() else {
            break;
        };

        let kind = match b {
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b',' => TokenKind::Comma,
            b'"' | b'\'' => {
                let contents = cursor
                    .string()
                    .ok_or(ExprError::UnterminatedString { pos })?;
                tokens.push(Token {
                    kind: TokenKind::Str(contents),
                    pos,
                });
                continue;
            }
            b if b.is_ascii_digit()
                || (b == b'.' && cursor.peek_at(1).is_some_and(|n| n.is_ascii_digit())) =>
            {
                let literal = cursor.number();
                tokens.push(Token {
                    kind: TokenKind::Number(parse_number(literal, pos)?),
                    pos,
                });
                continue;
            }
            b if is_ident_start(b) => {
                let name = cursor.identifier();
                tokens.push(Token {
                    kind: TokenKind::Ident(name.to_string()),
                    pos,
                });
                continue;
            }
            _ => {
                let ch = text[pos..].chars().next().unwrap_or('?');
                return Err(ExprError::UnexpectedChar { pos, ch });
            }
        };
        cursor.pos += 1;
        tokens.push(Token { kind, pos });
    }

    Ok(tokens)
}

/// Returns every identifier token in `text`, in order of appearance.
///
/// Never fails: string literals (even unterminated ones) are skipped, numeric
/// literals swallow their suffixes, and identifiers directly preceded by `.`
/// are attribute accesses and are not reported.
pub fn scan_identifiers(text: &str) -> Vec<&str> {
    let mut cursor = Cursor::new(text);
    let mut found = Vec::new();
    let mut prev: Option<u8> = None;

    while let Some(b) = cursor.peek() {
        match b {
            b'"' | b'\'' => {
                if cursor.string().is_none() {
                    break;
                }
                prev = Some(b);
            }
            b if b.is_ascii_digit() => {
                cursor.number();
                prev = Some(b'0');
            }
            b if is_ident_start(b) => {
                let name = cursor.identifier();
                if prev != Some(b'.') {
                    found.push(name);
                }
                prev = Some(b'a');
            }
            b if b.is_ascii_whitespace() => {
                cursor.pos += 1;
            }
            _ => {
                // Multi-byte characters are skipped as a whole.
                let len = text[cursor.pos..].chars().next().map_or(1, char::len_utf8);
                cursor.pos += len;
                prev = Some(b);
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenizes_arithmetic() {
        assert_eq!(
            kinds("v1 + 2*(x-0.5)"),
            vec![
                TokenKind::Ident("v1".into()),
                TokenKind::Plus,
                TokenKind::Number(2.0),
                TokenKind::Star,
                TokenKind::LParen,
                TokenKind::Ident("x".into()),
                TokenKind::Minus,
                TokenKind::Number(0.5),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_tokenizes_exponents_and_hex() {
        assert_eq!(kinds("1e6"), vec![TokenKind::Number(1e6)]);
        assert_eq!(kinds("2.5E-3"), vec![TokenKind::Number(2.5e-3)]);
        assert_eq!(kinds("0x1f"), vec![TokenKind::Number(31.0)]);
        assert_eq!(kinds(".5"), vec![TokenKind::Number(0.5)]);
    }

    #[test]
    fn test_number_with_suffix_is_invalid() {
        assert!(matches!(
            tokenize("10k"),
            Err(ExprError::InvalidNumber { pos: 0, .. })
        ));
    }

    #[test]
    fn test_strings_unescape() {
        assert_eq!(kinds(r#""a\"b""#), vec![TokenKind::Str("a\"b".into())]);
        assert_eq!(kinds("'it'"), vec![TokenKind::Str("it".into())]);
    }

    #[test]
    fn test_multibyte_escape() {
        assert_eq!(kinds(r"'caf\é'"), vec![TokenKind::Str("café".into())]);
        assert_eq!(kinds(r"'\日本' + x").len(), 3);
        assert_eq!(scan_identifiers(r"'\é' + v1"), vec!["v1"]);
        assert_eq!(
            tokenize(r"'\é"),
            Err(ExprError::UnterminatedString { pos: 0 })
        );
    }

    #[test]
    fn test_unterminated_string_is_reported() {
        assert_eq!(
            tokenize("1 + 'abc"),
            Err(ExprError::UnterminatedString { pos: 4 })
        );
    }

    #[test]
    fn test_unexpected_character_is_reported() {
        assert_eq!(
            tokenize("a % b"),
            Err(ExprError::UnexpectedChar { pos: 2, ch: '%' })
        );
    }

    #[test]
    fn test_scan_skips_string_contents() {
        assert_eq!(scan_identifiers("'v1 is ' + v2"), vec!["v2"]);
        assert_eq!(scan_identifiers("\"unterminated v1"), Vec::<&str>::new());
    }

    #[test]
    fn test_scan_respects_token_boundaries() {
        assert_eq!(scan_identifiers("v10 + xv1 + v1_b"), vec!["v10", "xv1", "v1_b"]);
        assert_eq!(scan_identifiers("1e6 + 0x1f"), Vec::<&str>::new());
    }

    #[test]
    fn test_scan_ignores_attribute_access() {
        assert_eq!(scan_identifiers("math.pi * radius"), vec!["math", "radius"]);
    }

    #[test]
    fn test_scan_tolerates_garbage() {
        assert_eq!(scan_identifiers("foo(%$ bar]] ü baz"), vec!["foo", "bar", "baz"]);
    }
}
