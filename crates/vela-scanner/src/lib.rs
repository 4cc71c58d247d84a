// SPDX-License-Identifier: GPL-3.0-or-later

//! Byte-level tokenizer for the L scripting language.
//!
//! The scanner is a non-restartable lazy sequence: [`Scanner::scan_token`]
//! is called repeatedly by the compiler until it returns [`TokenKind::Eof`],
//! after which every further call keeps returning `Eof`. Tokens borrow their
//! lexeme directly out of the source buffer, so the source must outlive the
//! scanner and every token it produces.

#[cfg(test)]
mod scanner_test;

/// The kind of a scanned token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Single-character tokens.
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,

    // One or two character tokens.
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Literals.
    Identifier,
    String,
    Number,

    // Keywords.
    And,
    Class,
    Else,
    False,
    For,
    Fun,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    /// A scan error. The lexeme is a static diagnostic message rather than a
    /// source span.
    Error,
    Eof,
}

/// A single scanned token, borrowing its lexeme from the source buffer.
#[derive(Debug, Clone, Copy)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub lexeme: &'src str,
    pub line: u32,
}

impl<'src> Token<'src> {
    /// Synthesizes a token not backed by any real source span, used by the
    /// compiler to manufacture implicit identifiers (`this`, the empty name
    /// of a top-level script function, the reserved `super` local).
    #[must_use]
    pub const fn synthetic(lexeme: &'src str) -> Self {
        Token { kind: TokenKind::Identifier, lexeme, line: 0 }
    }
}

/// Scans `source` byte-by-byte, producing one token per [`Scanner::scan_token`] call.
pub struct Scanner<'src> {
    source: &'src str,
    start: usize,
    current: usize,
    line: u32,
}

impl<'src> Scanner<'src> {
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Scanner { source, start: 0, current: 0, line: 1 }
    }

    /// Scans and returns the next token. Returns `Eof` forever once the
    /// source is exhausted.
    pub fn scan_token(&mut self) -> Token<'src> {
        self.skip_whitespace();
        self.start = self.current;

        if self.is_at_end() {
            return self.make_token(TokenKind::Eof);
        }

        let c = self.advance();

        if is_alpha(c) {
            return self.identifier();
        }
        if c.is_ascii_digit() {
            return self.number();
        }

        match c {
            '(' => self.make_token(TokenKind::LeftParen),
            ')' => self.make_token(TokenKind::RightParen),
            '{' => self.make_token(TokenKind::LeftBrace),
            '}' => self.make_token(TokenKind::RightBrace),
            ';' => self.make_token(TokenKind::Semicolon),
            ',' => self.make_token(TokenKind::Comma),
            '.' => self.make_token(TokenKind::Dot),
            '-' => self.make_token(TokenKind::Minus),
            '+' => self.make_token(TokenKind::Plus),
            '/' => self.make_token(TokenKind::Slash),
            '*' => self.make_token(TokenKind::Star),
            '!' => {
                let kind = if self.matches('=') { TokenKind::BangEqual } else { TokenKind::Bang };
                self.make_token(kind)
            }
            '=' => {
                let kind = if self.matches('=') { TokenKind::EqualEqual } else { TokenKind::Equal };
                self.make_token(kind)
            }
            '<' => {
                let kind = if self.matches('=') { TokenKind::LessEqual } else { TokenKind::Less };
                self.make_token(kind)
            }
            '>' => {
                let kind =
                    if self.matches('=') { TokenKind::GreaterEqual } else { TokenKind::Greater };
                self.make_token(kind)
            }
            '"' => self.string(),
            _ => self.error_token("Unexpected character."),
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn peek(&self) -> char {
        self.source[self.current..].chars().next().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        let mut chars = self.source[self.current..].chars();
        chars.next();
        chars.next().unwrap_or('\0')
    }

    fn advance(&mut self) -> char {
        let c = self.peek();
        self.current += c.len_utf8();
        c
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.peek() != expected {
            return false;
        }
        self.current += expected.len_utf8();
        true
    }

    fn make_token(&self, kind: TokenKind) -> Token<'src> {
        Token { kind, lexeme: &self.source[self.start..self.current], line: self.line }
    }

    fn error_token(&self, message: &'static str) -> Token<'src> {
        Token { kind: TokenKind::Error, lexeme: message, line: self.line }
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                ' ' | '\r' | '\t' => {
                    self.advance();
                }
                '\n' => {
                    self.line += 1;
                    self.advance();
                }
                '/' if self.peek_next() == '/' => {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn string(&mut self) -> Token<'src> {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            return self.error_token("Unterminated string.");
        }

        self.advance(); // closing quote
        self.make_token(TokenKind::String)
    }

    fn number(&mut self) -> Token<'src> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance(); // consume '.'
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        self.make_token(TokenKind::Number)
    }

    fn identifier(&mut self) -> Token<'src> {
        while is_alpha(self.peek()) || self.peek().is_ascii_digit() {
            self.advance();
        }
        self.make_token(self.identifier_kind())
    }

    /// Keyword recognition: a trie over the first one or two letters, then a
    /// straight comparison of the remainder.
    fn identifier_kind(&self) -> TokenKind {
        let text = &self.source[self.start..self.current];
        let bytes = text.as_bytes();

        match bytes.first() {
            Some(b'a') => self.keyword_rest(text, 1, "nd", TokenKind::And),
            Some(b'c') => self.keyword_rest(text, 1, "lass", TokenKind::Class),
            Some(b'e') => self.keyword_rest(text, 1, "lse", TokenKind::Else),
            Some(b'f') if bytes.len() > 1 => match bytes[1] {
                b'a' => self.keyword_rest(text, 2, "lse", TokenKind::False),
                b'o' => self.keyword_rest(text, 2, "r", TokenKind::For),
                b'u' => self.keyword_rest(text, 2, "n", TokenKind::Fun),
                _ => TokenKind::Identifier,
            },
            Some(b'i') => self.keyword_rest(text, 1, "f", TokenKind::If),
            Some(b'n') => self.keyword_rest(text, 1, "il", TokenKind::Nil),
            Some(b'o') => self.keyword_rest(text, 1, "r", TokenKind::Or),
            Some(b'p') => self.keyword_rest(text, 1, "rint", TokenKind::Print),
            Some(b'r') => self.keyword_rest(text, 1, "eturn", TokenKind::Return),
            Some(b's') => self.keyword_rest(text, 1, "uper", TokenKind::Super),
            Some(b't') if bytes.len() > 1 => match bytes[1] {
                b'h' => self.keyword_rest(text, 2, "is", TokenKind::This),
                b'r' => self.keyword_rest(text, 2, "ue", TokenKind::True),
                _ => TokenKind::Identifier,
            },
            Some(b'v') => self.keyword_rest(text, 1, "ar", TokenKind::Var),
            Some(b'w') => self.keyword_rest(text, 1, "hile", TokenKind::While),
            _ => TokenKind::Identifier,
        }
    }

    fn keyword_rest(
        &self,
        text: &str,
        start: usize,
        rest: &str,
        kind: TokenKind,
    ) -> TokenKind {
        if &text[start..] == rest { kind } else { TokenKind::Identifier }
    }
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}
