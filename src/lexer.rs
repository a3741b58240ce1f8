use std::{
    iter::Peekable,
    num::{ParseFloatError, ParseIntError},
    str::Chars,
};

use crate::{
    token::{Span, Token, TokenKind, KEYWORDS},
    util::BreakableIteratorExt,
};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 8_192;

/// A convenience function that eagerly lexes the whole input, up to (and
/// including) the end-of-file token.
pub fn lex_in_new(src: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY.min(src.len() + 1));
    tokens.extend(Lexer::new(src).up_to(Token::is_eof));
    tokens
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Error {
    UnexpectedChar(char),
    UnclosedString,
    UnknownEscape(char),
    UnclosedComment,
    /// A `#Y` without a matching `#X`.
    UnopenedComment,
    /// A number with a decimal point which is not followed by a digit.
    MalformedFloat,
    /// A number immediately followed by an identifier character, as in `12ab`.
    InvalidNumberSuffix,
}

/// The FAP lexer.
///
/// Tokens are scanned on demand: each call to [`Iterator::next`] scans exactly
/// one token. Whitespace and comments are skipped. Once the input is exhausted
/// the lexer keeps producing [`TokenKind::Eof`] tokens, hence callers which
/// collect should stop with [`BreakableIteratorExt::up_to`].
///
/// Errors are produced in-band, as [`TokenKind::Error`] tokens.
pub struct Lexer<'src> {
    src: &'src str,
    iter: Peekable<Chars<'src>>,
    cursor: usize,
    current_lo: usize,
    exhausted: bool,
    doc: DocState,
    /// Span to use for the next produced token instead of the marked bounds.
    span_override: Option<Span>,
}

/// Tracks the `@None <text>` directive, whose trailing text is a single token.
#[derive(Copy, Clone, PartialEq, Eq)]
enum DocState {
    Idle,
    AfterAt,
    AfterNone,
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let kind = loop {
            if let Some(kind) = self.scan_token_kind() {
                break kind;
            }
        };
        self.doc = match (self.doc, kind) {
            (_, TokenKind::At) => DocState::AfterAt,
            (DocState::AfterAt, TokenKind::None) => DocState::AfterNone,
            _ => DocState::Idle,
        };
        let span = self.span_override.take().unwrap_or_else(|| self.span());
        Some(Token::new(kind, span))
    }
}

impl<'src> Lexer<'src> {
    /// Constructs a new lexer with the default state.
    pub fn new(src: &'src str) -> Lexer<'src> {
        Lexer {
            src,
            iter: src.chars().peekable(),
            cursor: 0,
            current_lo: 0,
            exhausted: false,
            doc: DocState::Idle,
            span_override: None,
        }
    }

    /// Tries to scan the current character. Returns `None` for trivia.
    fn scan_token_kind(&mut self) -> Option<TokenKind> {
        if self.doc == DocState::AfterNone {
            return Some(self.doc_text());
        }
        let kind = match self.mark_advance() {
            '\0' if self.exhausted => TokenKind::Eof,
            '+' => TokenKind::Plus,
            '-' => match self.peek() {
                '>' => self.advance_with(TokenKind::Arrow),
                _ => TokenKind::Minus,
            },
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '=' => match self.peek() {
                '=' => self.advance_with(TokenKind::EqEq),
                _ => TokenKind::Assign,
            },
            '!' => match self.peek() {
                '=' => self.advance_with(TokenKind::NotEq),
                _ => TokenKind::Error(Error::UnexpectedChar('!')),
            },
            '<' => match self.peek() {
                '=' => self.advance_with(TokenKind::LessEq),
                _ => TokenKind::Less,
            },
            '>' => match self.peek() {
                '=' => self.advance_with(TokenKind::GreaterEq),
                _ => TokenKind::Greater,
            },
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '@' => TokenKind::At,
            quote @ ('"' | '\'') => self.string(quote),
            '#' => return self.comment(),
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier_or_keyword(),
            c if c.is_ascii_digit() => self.number(),
            c if c.is_whitespace() => {
                self.whitespace();
                return None;
            }
            c => TokenKind::Error(Error::UnexpectedChar(c)),
        };
        Some(kind)
    }

    /// Lexes a string token delimited by `quote`.
    ///
    /// Like identifiers, string tokens only record their bounds. Escape
    /// sequences are validated here but only resolved when the literal is
    /// extracted (see [`extract::escaped_string`]), so that strings without
    /// escapes never allocate an intermediate buffer.
    fn string(&mut self, quote: char) -> TokenKind {
        let mut has_escaped = false;
        let mut bad_escape = None;
        loop {
            let (current, current_span) = self.advance_with_span();
            match current {
                '\0' if self.exhausted => return TokenKind::Error(Error::UnclosedString),
                // Strings can't span lines. The error covers the string up to
                // the line break.
                '\n' => {
                    let span = Span::new_of_bounds(self.current_lo..current_span.lo);
                    self.span_override = Some(span);
                    return TokenKind::Error(Error::UnclosedString);
                }
                '\\' => {
                    has_escaped = true;
                    let (escaped, escaped_span) = self.advance_with_span();
                    match escaped {
                        'n' | 't' | '"' | '\'' | '\\' => (),
                        '\0' if self.exhausted => {
                            return TokenKind::Error(Error::UnclosedString);
                        }
                        '\n' => {
                            let span = Span::new_of_bounds(self.current_lo..escaped_span.lo);
                            self.span_override = Some(span);
                            return TokenKind::Error(Error::UnclosedString);
                        }
                        other => {
                            bad_escape.get_or_insert((other, current_span.to(escaped_span)));
                        }
                    }
                }
                c if c == quote => break,
                _ => (),
            }
        }
        if let Some((escaped, span)) = bad_escape {
            self.span_override = Some(span);
            return TokenKind::Error(Error::UnknownEscape(escaped));
        }
        if has_escaped {
            TokenKind::EscapedString
        } else {
            TokenKind::String
        }
    }

    fn identifier_or_keyword(&mut self) -> TokenKind {
        while is_identifier_suffix(self.peek()) {
            self.advance();
        }
        KEYWORDS
            .get(self.substr())
            .copied()
            .unwrap_or(TokenKind::Identifier)
    }

    fn number(&mut self) -> TokenKind {
        self.digits();
        let mut kind = TokenKind::IntLiteral;
        if self.peek() == '.' {
            self.advance();
            if !self.peek().is_ascii_digit() {
                return TokenKind::Error(Error::MalformedFloat);
            }
            self.digits();
            kind = TokenKind::FloatLiteral;
        }
        if is_identifier_suffix(self.peek()) {
            while is_identifier_suffix(self.peek()) {
                self.advance();
            }
            return TokenKind::Error(Error::InvalidNumberSuffix);
        }
        kind
    }

    fn digits(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
    }

    fn whitespace(&mut self) {
        while self.peek().is_whitespace() && !self.at_end() {
            self.advance();
        }
    }

    /// Skips a comment. `#X` opens a block comment, closed by `#Y`; any other
    /// `#` comments out the rest of the line. A `#Y` outside of a block
    /// comment is an error.
    fn comment(&mut self) -> Option<TokenKind> {
        if self.peek() == 'Y' {
            self.advance();
            return Some(TokenKind::Error(Error::UnopenedComment));
        }
        if self.peek() == 'X' {
            self.advance();
            loop {
                match self.advance() {
                    '\0' if self.exhausted => {
                        return Some(TokenKind::Error(Error::UnclosedComment));
                    }
                    '#' if self.peek() == 'Y' => {
                        self.advance();
                        return None;
                    }
                    _ => continue,
                }
            }
        }
        while !self.at_end() && self.peek() != '\n' {
            self.advance();
        }
        None
    }

    /// Scans the free-form text of a module doc, up to the end of the line.
    /// Surrounding blanks are not part of the token.
    fn doc_text(&mut self) -> TokenKind {
        while matches!(self.peek(), ' ' | '\t') {
            self.advance();
        }
        self.current_lo = self.cursor;
        while !self.at_end() && self.peek() != '\n' {
            self.advance();
        }
        let text = self.substr();
        let trimmed = text.trim_end();
        let len = u32::try_from(trimmed.len()).unwrap();
        self.span_override = Some(Span::new_of_length(self.current_lo, len));
        TokenKind::DocText
    }
}

impl Lexer<'_> {
    /// Starts a new token "mark" and advances the iterator.
    fn mark_advance(&mut self) -> char {
        self.current_lo = self.cursor;
        self.advance()
    }

    /// Returns the next character and advances the iterator. Returns `'\0'`
    /// (and marks the lexer as exhausted) at the end of the input.
    fn advance(&mut self) -> char {
        match self.iter.next() {
            Some(c) => {
                self.cursor += c.len_utf8();
                c
            }
            None => {
                self.exhausted = true;
                '\0'
            }
        }
    }

    /// Advances and returns the provided value.
    fn advance_with<T>(&mut self, value: T) -> T {
        self.advance();
        value
    }

    /// Returns the next character (with its span) and advances the iterator.
    fn advance_with_span(&mut self) -> (char, Span) {
        let lo = self.cursor;
        let char = self.advance();
        (char, Span::new_of_bounds(lo..self.cursor))
    }

    /// Returns the next character without advancing the iterator.
    fn peek(&mut self) -> char {
        self.iter.peek().copied().unwrap_or('\0')
    }

    fn at_end(&mut self) -> bool {
        self.iter.peek().is_none()
    }

    /// Returns the current span.
    fn span(&self) -> Span {
        Span::new_of_bounds(self.current_lo..self.cursor)
    }

    /// Returns the substring of the current marked bounds.
    fn substr(&self) -> &str {
        self.span().substr(self.src)
    }
}

fn is_identifier_suffix(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub mod extract {
    use super::*;

    pub fn int(token: Token, src: &str) -> Result<i64, ParseIntError> {
        debug_assert_eq!(token.kind, TokenKind::IntLiteral);
        token.span().substr(src).parse()
    }

    pub fn float(token: Token, src: &str) -> Result<f64, ParseFloatError> {
        debug_assert_eq!(token.kind, TokenKind::FloatLiteral);
        token.span().substr(src).parse()
    }

    pub fn ident(token: Token, src: &str) -> &str {
        debug_assert_eq!(token.kind, TokenKind::Identifier);
        token.span().substr(src)
    }

    pub fn string(token: Token, src: &str) -> Box<str> {
        debug_assert_eq!(token.kind, TokenKind::String);
        let s = token.span().offset(1, -1).substr(src);
        s.to_string().into_boxed_str()
    }

    pub fn escaped_string(token: Token, src: &str) -> Box<str> {
        debug_assert_eq!(token.kind, TokenKind::EscapedString);
        let s = token.span().offset(1, -1).substr(src);
        perform_escape(s).into_boxed_str()
    }

    pub fn doc_text(token: Token, src: &str) -> Box<str> {
        debug_assert_eq!(token.kind, TokenKind::DocText);
        token.span().substr(src).to_string().into_boxed_str()
    }
}

/// Resolves escape sequences. The lexer already rejected unknown ones.
fn perform_escape(raw: &str) -> String {
    let mut buf = String::with_capacity(raw.len());
    let mut escaped = false;
    for char in raw.chars() {
        let char = match (escaped, char) {
            (true, 'n') => '\n',
            (true, 't') => '\t',
            (false, '\\') => {
                escaped = true;
                continue;
            }
            (_, char) => char,
        };
        escaped = false;
        buf.push(char);
    }
    // This function is only called if the string token contains at least one
    // escape sequence
    debug_assert!(buf.len() < raw.len(), "original string MUST be greater");
    buf
}
