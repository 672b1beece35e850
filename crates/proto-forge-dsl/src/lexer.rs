//! Tokenizer for schema source text.
//!
//! Besides splitting the input into tokens, the tokenizer attributes every
//! comment to a neighbouring token: a comment on the same line as a token
//! trails it, a comment block directly above a token leads it, and comment
//! blocks separated from both by blank lines are kept as detached comments
//! of the next token.

use logos::Logos;
use tracing::trace;

use crate::error::{Diagnostic, Diagnostics, DslError, ErrorCollector};
use crate::token::{RawToken, Token, TokenKind};

/// How backslash escapes inside string literals are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscapeDecoding {
    /// Decodes `\n \t \r \\ \" \'`; any other escaped character stands for
    /// itself.
    #[default]
    Passthrough,
    /// Additionally decodes `\a \b \f \v \?`, octal `\NNN`, hex `\xNN` and
    /// Unicode `\uNNNN` / `\UNNNNNNNN` escapes.
    Full,
}

/// Tokenizer settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexerOptions {
    pub escapes: EscapeDecoding,
}

/// Pull-based tokenizer with a one-token lookbehind.
///
/// The current token starts as [`TokenKind::Start`]; each [`advance`]
/// moves it to [`previous`](Self::previous) and scans the next one.
/// Errors go to the collector `C` and scanning always continues.
///
/// [`advance`]: Self::advance
pub struct Tokenizer<'src, C: ErrorCollector> {
    source: &'src str,
    pos: usize,
    line: usize,
    column: usize,
    current: Token,
    previous: Token,
    collector: C,
    options: LexerOptions,
    error_count: usize,
}

/// What follows the cursor when it sits on a possible comment.
enum CommentStart {
    Line,
    Block,
    None,
}

/// Where the attribution scan is relative to the previous token.
enum ScanState {
    /// Still on the line of the previous token.
    SameLine,
    /// On a later line, collecting comments for the next token.
    FollowingLines,
    /// After a block comment followed by more text on the same line.
    /// Further whitespace and comments are skipped and attach to nothing.
    Discarding,
    /// Positioned at the next token.
    Done,
}

/// Buffers comments while the tokenizer moves between two tokens and decides
/// which of them trail the previous token, which are detached and which
/// lead the next one.
struct CommentCollector {
    buffer: String,
    has_comment: bool,
    is_line_comment: bool,
    can_attach_to_prev: bool,
    trailing: Option<String>,
    detached: Vec<String>,
}

impl CommentCollector {
    fn new(can_attach_to_prev: bool) -> Self {
        Self {
            buffer: String::new(),
            has_comment: false,
            is_line_comment: false,
            can_attach_to_prev,
            trailing: None,
            detached: Vec::new(),
        }
    }

    /// Buffer for a line comment. Consecutive line comments share one
    /// buffer; a block comment before them is flushed first.
    fn line_buffer(&mut self) -> &mut String {
        if self.has_comment && !self.is_line_comment {
            self.flush();
        }
        self.has_comment = true;
        self.is_line_comment = true;
        &mut self.buffer
    }

    /// Buffer for a block comment. Block comments never merge.
    fn block_buffer(&mut self) -> &mut String {
        if self.has_comment {
            self.flush();
        }
        self.has_comment = true;
        self.is_line_comment = false;
        &mut self.buffer
    }

    fn clear_buffer(&mut self) {
        self.buffer.clear();
        self.has_comment = false;
    }

    /// Emits the buffered comment as trailing (if still allowed) or detached.
    fn flush(&mut self) {
        if !self.has_comment {
            return;
        }
        let text = std::mem::take(&mut self.buffer);
        if self.can_attach_to_prev {
            self.trailing = Some(text);
            self.can_attach_to_prev = false;
        } else {
            self.detached.push(text);
        }
        self.has_comment = false;
    }

    fn detach_from_prev(&mut self) {
        self.can_attach_to_prev = false;
    }

    /// Splits into (trailing of previous, detached, leading of next).
    fn finish(self) -> (Option<String>, Vec<String>, Option<String>) {
        let leading = self.has_comment.then_some(self.buffer);
        (self.trailing, self.detached, leading)
    }
}

fn is_horizontal_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\u{0b}' | '\u{0c}')
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<'src, C: ErrorCollector> Tokenizer<'src, C> {
    pub fn new(source: &'src str, collector: C) -> Self {
        Self::with_options(source, collector, LexerOptions::default())
    }

    pub fn with_options(source: &'src str, collector: C, options: LexerOptions) -> Self {
        Self {
            source,
            pos: 0,
            line: 0,
            column: 0,
            current: Token::new(TokenKind::Start, "", 0, 0),
            previous: Token::new(TokenKind::Start, "", 0, 0),
            collector,
            options,
            error_count: 0,
        }
    }

    pub fn current(&self) -> &Token {
        &self.current
    }

    pub fn previous(&self) -> &Token {
        &self.previous
    }

    /// Errors reported so far, by the tokenizer or through
    /// [`report_error`](Self::report_error).
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn into_collector(self) -> C {
        self.collector
    }

    /// Forwards an error to the collector and counts it.
    pub fn report_error(&mut self, line: usize, column: usize, message: &str) {
        self.error_count += 1;
        self.collector.record_error(line, column, message);
    }

    pub fn report_warning(&mut self, line: usize, column: usize, message: &str) {
        self.collector.record_warning(line, column, message);
    }

    fn error_here(&mut self, error: DslError) {
        let (line, column) = (self.line, self.column);
        self.report_error(line, column, &error.to_string());
    }

    /// Moves to the next token, attributing the comments in between.
    /// Returns `false` once the current token is [`TokenKind::End`].
    pub fn advance(&mut self) -> bool {
        if self.current.kind == TokenKind::End {
            return false;
        }
        let at_start = self.current.kind == TokenKind::Start;
        let after_block_delimiter = self.current.is("{") || self.current.is("}");
        self.previous = std::mem::replace(
            &mut self.current,
            Token::new(TokenKind::End, "", self.line, self.column),
        );

        let mut comments = CommentCollector::new(!at_start);
        let mut state = if at_start {
            ScanState::FollowingLines
        } else {
            ScanState::SameLine
        };

        let mut next = loop {
            match state {
                ScanState::SameLine => {
                    self.skip_horizontal_whitespace();
                    match self.comment_start() {
                        CommentStart::Line => {
                            self.read_line_comment(comments.line_buffer());
                            comments.flush();
                            state = ScanState::FollowingLines;
                        }
                        CommentStart::Block => {
                            self.read_block_comment(comments.block_buffer());
                            self.skip_horizontal_whitespace();
                            if self.try_consume('\n') {
                                comments.flush();
                                state = ScanState::FollowingLines;
                            } else {
                                comments.clear_buffer();
                                state = ScanState::Discarding;
                            }
                        }
                        CommentStart::None => {
                            if self.try_consume('\n') {
                                if after_block_delimiter {
                                    comments.detach_from_prev();
                                }
                                state = ScanState::FollowingLines;
                            } else {
                                state = ScanState::Done;
                            }
                        }
                    }
                }
                ScanState::FollowingLines => {
                    self.skip_horizontal_whitespace();
                    match self.comment_start() {
                        CommentStart::Line => self.read_line_comment(comments.line_buffer()),
                        CommentStart::Block => {
                            self.read_block_comment(comments.block_buffer());
                            self.skip_horizontal_whitespace();
                            self.try_consume('\n');
                        }
                        CommentStart::None => {
                            if self.try_consume('\n') {
                                comments.flush();
                                comments.detach_from_prev();
                            } else {
                                state = ScanState::Done;
                            }
                        }
                    }
                }
                ScanState::Discarding => {
                    self.skip_horizontal_whitespace();
                    if self.try_consume('\n') {
                        continue;
                    }
                    let mut discarded = String::new();
                    match self.comment_start() {
                        CommentStart::Line => self.read_line_comment(&mut discarded),
                        CommentStart::Block => self.read_block_comment(&mut discarded),
                        CommentStart::None => state = ScanState::Done,
                    }
                }
                ScanState::Done => {
                    let token = self.read_token();
                    if token.kind == TokenKind::End
                        || token.is("}")
                        || token.is("]")
                        || token.is(")")
                    {
                        // Closing tokens never carry a leading comment.
                        comments.flush();
                    }
                    break token;
                }
            }
        };

        let (trailing, detached, leading) = comments.finish();
        self.previous.trailing_comment = trailing;
        next.detached_comments = detached;
        next.leading_comment = leading;
        trace!(token = %next, "scanned token");
        self.current = next;
        true
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.source[self.pos..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn try_consume(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_horizontal_whitespace(&mut self) {
        while self.peek().is_some_and(is_horizontal_whitespace) {
            self.bump();
        }
    }

    /// Consumes `//` or `/*` if present. A lone `/` is left in place so it
    /// is scanned as a symbol.
    fn comment_start(&mut self) -> CommentStart {
        if self.peek() != Some('/') {
            return CommentStart::None;
        }
        match self.peek_second() {
            Some('/') => {
                self.bump();
                self.bump();
                CommentStart::Line
            }
            Some('*') => {
                self.bump();
                self.bump();
                CommentStart::Block
            }
            _ => CommentStart::None,
        }
    }

    /// Reads the rest of a `//` comment including its newline, dropping
    /// one leading space.
    fn read_line_comment(&mut self, out: &mut String) {
        self.try_consume(' ');
        while let Some(c) = self.bump() {
            out.push(c);
            if c == '\n' {
                break;
            }
        }
    }

    /// Reads the body of a `/* */` comment. On continuation lines the
    /// leading whitespace, one `*` and one space are dropped.
    fn read_block_comment(&mut self, out: &mut String) {
        let (start_line, start_column) = (self.line, self.column.saturating_sub(2));
        let mut raw = String::new();
        loop {
            match self.peek() {
                None => {
                    self.error_here(DslError::UnterminatedBlockComment);
                    self.report_error(start_line, start_column, "  comment started here");
                    break;
                }
                Some('*') if self.peek_second() == Some('/') => {
                    self.bump();
                    self.bump();
                    break;
                }
                Some('/') if self.peek_second() == Some('*') => {
                    self.error_here(DslError::NestedBlockComment);
                    raw.push('/');
                    self.bump();
                }
                Some(c) => {
                    raw.push(c);
                    self.bump();
                }
            }
        }

        for (i, line) in raw.split('\n').enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let mut rest = line;
            if i > 0 {
                rest = rest.trim_start_matches(is_horizontal_whitespace);
                rest = rest.strip_prefix('*').unwrap_or(rest);
            }
            rest = rest.strip_prefix(' ').unwrap_or(rest);
            out.push_str(rest);
        }
    }

    /// Scans one token at the cursor. Never fails: anything unrecognized
    /// becomes a one-character symbol.
    fn read_token(&mut self) -> Token {
        let (line, column, start) = (self.line, self.column, self.pos);
        let Some(first) = self.peek() else {
            return Token::new(TokenKind::End, "", line, column);
        };

        let mut raw = RawToken::lexer(&self.source[start..]);
        let classified = match raw.next() {
            Some(Ok(kind)) => Some((kind, raw.span().end)),
            _ => None,
        };

        match classified {
            Some((kind, len)) => {
                let text = &self.source[start..start + len];
                for _ in text.chars() {
                    self.bump();
                }
                let kind = match kind {
                    RawToken::Identifier => TokenKind::Identifier,
                    RawToken::Integer => TokenKind::Integer,
                    RawToken::Float => TokenKind::Float,
                    RawToken::String => TokenKind::String,
                };
                if matches!(kind, TokenKind::Integer | TokenKind::Float)
                    && self.peek().is_some_and(is_identifier_char)
                {
                    self.error_here(DslError::NumberFollowedByIdentifier);
                }
                let mut token = Token::new(kind, text, line, column);
                if kind == TokenKind::String {
                    token.value = Some(unescape(&text[1..text.len() - 1], self.options.escapes));
                }
                token
            }
            None if first == '"' || first == '\'' => self.read_unterminated_string(first),
            None => {
                self.bump();
                if first.is_control() && first != '\n' {
                    self.report_error(
                        line,
                        column,
                        &DslError::InvalidControlCharacter(first).to_string(),
                    );
                }
                Token::new(TokenKind::Symbol, first.to_string(), line, column)
            }
        }
    }

    /// Recovers from a string with no closing quote on its line: reports
    /// the error and yields what was read.
    fn read_unterminated_string(&mut self, quote: char) -> Token {
        let (line, column, start) = (self.line, self.column, self.pos);
        self.bump();
        loop {
            match self.peek() {
                None => {
                    self.error_here(DslError::UnterminatedString);
                    break;
                }
                Some('\n') => {
                    self.error_here(DslError::MultilineString);
                    break;
                }
                Some('\\') => {
                    self.bump();
                    if self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        let text = &self.source[start..self.pos];
        let body = text[quote.len_utf8()..].strip_suffix(quote).unwrap_or(&text[1..]);
        let mut token = Token::new(TokenKind::String, text, line, column);
        token.value = Some(unescape(body, self.options.escapes));
        token
    }
}

/// Decodes the escapes in the body of a string literal.
pub fn unescape(body: &str, mode: EscapeDecoding) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escaped) = chars.next() else {
            out.push('\\');
            break;
        };
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\\' | '"' | '\'' => out.push(escaped),
            _ if mode == EscapeDecoding::Passthrough => out.push(escaped),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'v' => out.push('\u{0b}'),
            '?' => out.push('?'),
            '0'..='7' => {
                let mut value = escaped.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            'x' | 'X' => push_hex_escape(&mut out, &mut chars, escaped, 2),
            'u' => push_hex_escape(&mut out, &mut chars, escaped, 4),
            'U' => push_hex_escape(&mut out, &mut chars, escaped, 8),
            other => out.push(other),
        }
    }
    out
}

fn push_hex_escape(
    out: &mut String,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    escaped: char,
    max_digits: usize,
) {
    let mut value = 0u32;
    let mut digits = 0;
    while digits < max_digits {
        match chars.peek().and_then(|c| c.to_digit(16)) {
            Some(d) => {
                value = value.saturating_mul(16).saturating_add(d);
                chars.next();
                digits += 1;
            }
            None => break,
        }
    }
    if digits == 0 {
        out.push(escaped);
    } else {
        out.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
    }
}

/// Tokenizes a whole source text. The returned tokens end with
/// [`TokenKind::End`] and keep their attributed comments.
///
/// # Errors
///
/// Returns every diagnostic recorded if any of them is an error.
pub fn tokenize(source: &str, options: LexerOptions) -> Result<Vec<Token>, Vec<Diagnostic>> {
    let mut tokenizer = Tokenizer::with_options(source, Diagnostics::new(), options);
    let tokens = collect_tokens(&mut tokenizer);
    let diagnostics = tokenizer.into_collector();
    if diagnostics.has_errors() {
        Err(diagnostics.into_vec())
    } else {
        Ok(tokens)
    }
}

/// Drains a tokenizer. A token's trailing comment is only known once the
/// following token has been scanned, so it is copied back after each step.
fn collect_tokens<C: ErrorCollector>(tokenizer: &mut Tokenizer<'_, C>) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    while tokenizer.advance() {
        if let Some(last) = tokens.last_mut() {
            last.trailing_comment = tokenizer.previous().trailing_comment.clone();
        }
        tokens.push(tokenizer.current().clone());
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> (Vec<Token>, Diagnostics) {
        let mut tokenizer = Tokenizer::new(source, Diagnostics::new());
        let tokens = collect_tokens(&mut tokenizer);
        (tokens, tokenizer.into_collector())
    }

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn tokenize_simple_message() {
        let (tokens, diags) = scan("message Foo { int32 x = 1; }");
        assert!(diags.is_empty());
        assert_eq!(
            texts(&tokens),
            ["message", "Foo", "{", "int32", "x", "=", "1", ";", "}", ""]
        );
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[2].kind, TokenKind::Symbol);
        assert_eq!(tokens[6].kind, TokenKind::Integer);
        assert_eq!(tokens.last().unwrap().kind, TokenKind::End);
    }

    #[test]
    fn positions_are_zero_based() {
        let (tokens, _) = scan("foo\n  bar");
        assert_eq!((tokens[0].line, tokens[0].column, tokens[0].end_column), (0, 0, 3));
        assert_eq!((tokens[1].line, tokens[1].column), (1, 2));
    }

    #[test]
    fn tab_counts_as_one_column() {
        let (tokens, _) = scan("\tfoo");
        assert_eq!(tokens[0].column, 1);
    }

    #[test]
    fn end_is_sticky() {
        let mut tokenizer = Tokenizer::new("x", Diagnostics::new());
        assert!(tokenizer.advance());
        assert!(tokenizer.advance());
        assert_eq!(tokenizer.current().kind, TokenKind::End);
        assert!(!tokenizer.advance());
        assert!(!tokenizer.advance());
        assert_eq!(tokenizer.current().kind, TokenKind::End);
    }

    #[test]
    fn numbers() {
        let (tokens, diags) = scan("1 0x1F 017 1.5 .5 1.0e3");
        assert!(diags.is_empty());
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            [
                TokenKind::Integer,
                TokenKind::Integer,
                TokenKind::Integer,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn number_followed_by_identifier_is_error() {
        let (tokens, diags) = scan("123abc");
        assert_eq!(texts(&tokens), ["123", "abc", ""]);
        let errors: Vec<_> = diags.errors().collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("need space between number and identifier"));
    }

    #[test]
    fn exponent_needs_decimal_point() {
        let (tokens, diags) = scan("1e3");
        assert_eq!(tokens[0].kind, TokenKind::Integer);
        assert_eq!(tokens[1].text, "e3");
        assert_eq!(diags.errors().count(), 1);
    }

    #[test]
    fn strings_are_decoded() {
        let (tokens, diags) = scan(r#""a\tb\"c" 'it\'s' "\q""#);
        assert!(diags.is_empty());
        assert_eq!(tokens[0].text, r#""a\tb\"c""#);
        assert_eq!(tokens[0].value.as_deref(), Some("a\tb\"c"));
        assert_eq!(tokens[1].value.as_deref(), Some("it's"));
        assert_eq!(tokens[2].value.as_deref(), Some("q"));
    }

    #[test]
    fn full_escape_decoding() {
        assert_eq!(unescape(r"\101\x42é\a?", EscapeDecoding::Full), "AB\u{e9}\u{07}?");
        assert_eq!(unescape(r"\101", EscapeDecoding::Passthrough), "101");
        assert_eq!(unescape(r"\x", EscapeDecoding::Full), "x");
        assert_eq!(unescape("trailing\\", EscapeDecoding::Full), "trailing\\");
    }

    #[test]
    fn unterminated_string_recovers() {
        let (tokens, diags) = scan("\"abc\nfoo");
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].value.as_deref(), Some("abc"));
        assert_eq!(tokens[1].text, "foo");
        assert_eq!(diags.errors().count(), 1);

        let (tokens, diags) = scan("\"abc");
        assert_eq!(tokens[0].value.as_deref(), Some("abc"));
        assert!(diags.errors().next().unwrap().message.contains("end of string"));
    }

    #[test]
    fn lone_slash_is_symbol() {
        let (tokens, diags) = scan("a / b");
        assert!(diags.is_empty());
        assert_eq!(texts(&tokens), ["a", "/", "b", ""]);
        assert_eq!(tokens[1].kind, TokenKind::Symbol);
        assert_eq!(tokens[1].column, 2);
    }

    #[test]
    fn stray_characters_are_symbols() {
        let (tokens, diags) = scan("# @");
        assert!(diags.is_empty());
        assert_eq!(texts(&tokens), ["#", "@", ""]);
    }

    #[test]
    fn control_character_reported() {
        let (tokens, diags) = scan("a\u{1}b");
        assert_eq!(texts(&tokens), ["a", "\u{1}", "b", ""]);
        assert_eq!(diags.errors().count(), 1);
    }

    #[test]
    fn trailing_comment_on_same_line() {
        let (tokens, _) = scan("ident // trail\nnext");
        assert_eq!(tokens[0].trailing_comment.as_deref(), Some("trail\n"));
        assert_eq!(tokens[1].leading_comment, None);
        assert!(tokens[1].detached_comments.is_empty());
    }

    #[test]
    fn leading_and_detached_comments() {
        let (tokens, _) = scan("// a\n\n// b\nfoo");
        assert_eq!(tokens[0].text, "foo");
        assert_eq!(tokens[0].detached_comments, ["a\n"]);
        assert_eq!(tokens[0].leading_comment.as_deref(), Some("b\n"));
    }

    #[test]
    fn consecutive_line_comments_merge() {
        let (tokens, _) = scan("// a\n// b\nfoo");
        assert_eq!(tokens[0].leading_comment.as_deref(), Some("a\nb\n"));
    }

    #[test]
    fn comment_below_token_then_blank_line_trails() {
        let (tokens, _) = scan("foo;\n// about foo\n\nbar");
        assert_eq!(tokens[1].text, ";");
        assert_eq!(tokens[1].trailing_comment.as_deref(), Some("about foo\n"));
        assert_eq!(tokens[2].leading_comment, None);
    }

    #[test]
    fn open_brace_does_not_take_next_line_comment() {
        let (tokens, _) = scan("message M {\n  // doc\n\n  int32 x");
        let brace = &tokens[2];
        assert_eq!(brace.text, "{");
        assert_eq!(brace.trailing_comment, None);
        assert_eq!(tokens[3].detached_comments, ["doc\n"]);
    }

    #[test]
    fn closing_tokens_never_lead() {
        let (tokens, _) = scan("x;\n\n// dangling\n}");
        let close = tokens.iter().find(|t| t.is("}")).unwrap();
        assert_eq!(close.leading_comment, None);
        assert_eq!(close.detached_comments, ["dangling\n"]);
    }

    #[test]
    fn comments_before_end_are_detached() {
        let (tokens, _) = scan("// only a comment\n");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::End);
        assert_eq!(tokens[0].detached_comments, ["only a comment\n"]);
    }

    #[test]
    fn block_comments() {
        let (tokens, _) = scan("/* lead */\nfoo /* inline */ bar /* trail */\n");
        assert_eq!(tokens[0].leading_comment.as_deref(), Some("lead "));
        assert_eq!(tokens[1].text, "bar");
        assert_eq!(tokens[1].leading_comment, None);
        assert_eq!(tokens[1].trailing_comment.as_deref(), Some("trail "));
    }

    #[test]
    fn comments_after_inline_block_comment_attach_nowhere() {
        let (tokens, diags) = scan("foo /* a */ // b\nbar");
        assert!(diags.is_empty());
        assert_eq!(texts(&tokens), ["foo", "bar", ""]);
        assert_eq!(tokens[0].trailing_comment, None);
        assert_eq!(tokens[1].leading_comment, None);
        assert!(tokens[1].detached_comments.is_empty());

        let (tokens, diags) = scan("foo /* a */ /* b */ bar");
        assert!(diags.is_empty());
        assert_eq!(texts(&tokens), ["foo", "bar", ""]);
        assert_eq!(tokens[0].trailing_comment, None);
        assert_eq!(tokens[1].leading_comment, None);
    }

    #[test]
    fn tokenize_keeps_trailing_comments() {
        let tokens = tokenize("ident // trail\nnext", LexerOptions::default()).unwrap();
        assert_eq!(tokens[0].trailing_comment.as_deref(), Some("trail\n"));
        assert_eq!(tokens[1].trailing_comment, None);
    }

    #[test]
    fn block_comment_continuation_lines() {
        let (tokens, _) = scan("/*\n * one\n * two\n */\nfoo");
        assert_eq!(tokens[0].leading_comment.as_deref(), Some("\none\ntwo\n"));
    }

    #[test]
    fn block_comment_then_line_comment_are_separate() {
        let (tokens, _) = scan("/* a */\n// b\nfoo");
        assert_eq!(tokens[0].detached_comments, ["a "]);
        assert_eq!(tokens[0].leading_comment.as_deref(), Some("b\n"));
    }

    #[test]
    fn unterminated_block_comment() {
        let (tokens, diags) = scan("foo /* never closed");
        assert_eq!(tokens.last().unwrap().kind, TokenKind::End);
        assert!(diags
            .errors()
            .any(|d| d.message.contains("end-of-file inside block comment")));
    }

    #[test]
    fn tokenize_reports_errors() {
        assert_eq!(tokenize("foo bar", LexerOptions::default()).unwrap().len(), 3);
        let errors = tokenize("1x", LexerOptions::default()).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn error_count_includes_forwarded_errors() {
        let mut tokenizer = Tokenizer::new("", Diagnostics::new());
        tokenizer.report_error(0, 0, "from the parser");
        tokenizer.report_warning(0, 0, "not counted");
        assert_eq!(tokenizer.error_count(), 1);
        assert_eq!(tokenizer.into_collector().len(), 2);
    }
}
