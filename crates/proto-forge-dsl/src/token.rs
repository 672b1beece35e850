use std::fmt;

use logos::Logos;
use proto_forge_core::Location;

/// Shapes the scanner recognizes with a single regex match.
///
/// Whitespace, comments and unterminated strings are handled by the
/// tokenizer itself; this classifier only ever sees input positioned at the
/// start of a token.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RawToken {
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,

    /// Decimal, `0x` hex or leading-zero octal.
    #[regex(r"[0-9]+")]
    #[regex(r"0[xX][0-9A-Fa-f]+")]
    Integer,

    /// A number with a decimal point, optionally followed by an exponent.
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?")]
    Float,

    /// A single- or double-quoted string closed on the same line.
    #[regex(r#""([^"\\\n]|\\[^\n])*""#)]
    #[regex(r#"'([^'\\\n]|\\[^\n])*'"#)]
    String,
}

/// Kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Placeholder current token before the first `advance`.
    Start,
    /// End of input. Reached once and never left.
    End,
    Identifier,
    Integer,
    Float,
    String,
    /// Any other single character.
    Symbol,
}

impl TokenKind {
    /// Returns a human-readable description of this token kind.
    pub fn description(self) -> &'static str {
        match self {
            Self::Start => "start of input",
            Self::End => "end of input",
            Self::Identifier => "identifier",
            Self::Integer => "integer literal",
            Self::Float => "float literal",
            Self::String => "string literal",
            Self::Symbol => "symbol",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A token with its position and the comments attributed to it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Exact source text, including quotes for strings.
    pub text: String,
    /// Decoded contents of a string literal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub line: usize,
    pub column: usize,
    pub end_column: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leading_comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailing_comment: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub detached_comments: Vec<String>,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Self {
        let text = text.into();
        let end_column = column + text.chars().count();
        Self {
            kind,
            text,
            value: None,
            line,
            column,
            end_column,
            leading_comment: None,
            trailing_comment: None,
            detached_comments: Vec::new(),
        }
    }

    pub fn location(&self) -> Location {
        Location::new(self.line, self.column)
    }

    /// True for a non-string token whose text is exactly `text`.
    pub fn is(&self, text: &str) -> bool {
        self.kind != TokenKind::String && self.text == text
    }

    /// How the token is named in an error message.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Start | TokenKind::End => self.kind.description().to_string(),
            TokenKind::String => self.text.clone(),
            _ => format!("\"{}\"", self.text),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.location(), self.kind)?;
        if !self.text.is_empty() {
            write!(f, " {}", self.text)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Classifies one whole token; `None` if it does not match in full.
    fn classify(input: &str) -> Option<RawToken> {
        let mut lexer = RawToken::lexer(input);
        match lexer.next() {
            Some(Ok(raw)) if lexer.span().end == input.len() => Some(raw),
            _ => None,
        }
    }

    #[test]
    fn identifiers() {
        for input in ["foo", "_bar", "Baz9", "int32"] {
            assert_eq!(classify(input), Some(RawToken::Identifier), "{input}");
        }
    }

    #[test]
    fn integers() {
        for input in ["0", "42", "0x1F", "0XaB", "0777"] {
            assert_eq!(classify(input), Some(RawToken::Integer), "{input}");
        }
    }

    #[test]
    fn floats() {
        for input in ["1.5", "1.", ".5", "1.0e10", "2.5E-3", ".5e+2"] {
            assert_eq!(classify(input), Some(RawToken::Float), "{input}");
        }
    }

    #[test]
    fn strings() {
        for input in [r#""hello""#, "'single'", r#""with \"escape\"""#, r#""""#] {
            assert_eq!(classify(input), Some(RawToken::String), "{input}");
        }
    }

    #[test]
    fn strings_do_not_cross_lines() {
        assert_eq!(classify("\"abc\ndef\""), None);
        assert!(RawToken::lexer("\"abc").next().map_or(true, |r| r.is_err()));
    }

    #[test]
    fn number_then_identifier_splits() {
        let mut lexer = RawToken::lexer("123abc");
        assert_eq!(lexer.next(), Some(Ok(RawToken::Integer)));
        assert_eq!(lexer.slice(), "123");
    }

    #[test]
    fn token_helpers() {
        let token = Token::new(TokenKind::Symbol, "{", 2, 4);
        assert_eq!(token.end_column, 5);
        assert!(token.is("{"));
        assert_eq!(token.describe(), "\"{\"");
        assert_eq!(token.location(), Location::new(2, 4));

        let string = Token::new(TokenKind::String, "\"{\"", 0, 0);
        assert!(!string.is("{"));
        assert_eq!(string.describe(), "\"{\"");

        let end = Token::new(TokenKind::End, "", 9, 0);
        assert_eq!(end.describe(), "end of input");
    }
}
