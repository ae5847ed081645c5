//! JavaScript / TypeScript tokenizer
//!
//! Produces a flat token list without whitespace or comments. Each token
//! records whether a line break preceded it, which the statement splitter
//! uses for automatic semicolon insertion.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Punct,
    Str,
    Template,
    Regex,
    Number,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub newline_before: bool,
}

impl Token {
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end]
    }

    pub fn is(&self, src: &str, text: &str) -> bool {
        self.text(src) == text
    }

    pub fn is_ident(&self, src: &str, text: &str) -> bool {
        self.kind == TokenKind::Ident && self.text(src) == text
    }

    pub fn is_punct(&self, src: &str, text: &str) -> bool {
        self.kind == TokenKind::Punct && self.text(src) == text
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct LexError {
    pub line: usize,
    pub message: String,
}

/// Multi-character punctuators, longest first
const PUNCTUATORS: &[&str] = &[
    "...", "===", "!==", "**=", "&&=", "||=", "??=", "=>", "==", "!=", "<=", ">=", "&&", "||",
    "??", "?.", "++", "--", "+=", "-=", "*=", "%=", "&=", "|=", "^=", "**",
];

/// Keywords after which `/` starts a regular expression
const REGEX_PREFIX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

pub fn tokenize(src: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(src).run()
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    newline: bool,
    tokens: Vec<Token>,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80 || b == b'\\'
}

fn is_ident_part(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
            newline: false,
            tokens: Vec::new(),
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn error(&self, line: usize, message: &str) -> LexError {
        LexError {
            line,
            message: message.to_string(),
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize, line: usize) {
        self.tokens.push(Token {
            kind,
            start,
            end: self.pos,
            line,
            newline_before: self.newline,
        });
        self.newline = false;
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        // A leading BOM or shebang line is not source.
        if self.src.starts_with('\u{feff}') {
            self.pos = 3;
        }
        if self.src[self.pos..].starts_with("#!") {
            while let Some(b) = self.peek(0) {
                if b == b'\n' {
                    break;
                }
                self.pos += 1;
            }
        }

        while let Some(b) = self.peek(0) {
            let start = self.pos;
            let line = self.line;
            match b {
                b'\n' => {
                    self.line += 1;
                    self.newline = true;
                    self.pos += 1;
                }
                b' ' | b'\t' | b'\r' | 0x0b | 0x0c => self.pos += 1,
                b'/' if self.peek(1) == Some(b'/') => self.skip_line_comment(),
                b'/' if self.peek(1) == Some(b'*') => self.skip_block_comment()?,
                b'\'' | b'"' => {
                    self.skip_string(b)?;
                    self.push(TokenKind::Str, start, line);
                }
                b'`' => {
                    self.skip_template()?;
                    self.push(TokenKind::Template, start, line);
                }
                b'0'..=b'9' => {
                    self.skip_number(start);
                    self.push(TokenKind::Number, start, line);
                }
                b'.' if self.peek(1).is_some_and(|c| c.is_ascii_digit()) => {
                    self.skip_number(start);
                    self.push(TokenKind::Number, start, line);
                }
                b'/' if self.regex_allowed() && self.try_regex() => {
                    self.push(TokenKind::Regex, start, line);
                }
                _ if is_ident_start(b) => {
                    self.skip_ident();
                    self.push(TokenKind::Ident, start, line);
                }
                _ => {
                    self.skip_punct();
                    self.push(TokenKind::Punct, start, line);
                }
            }
        }
        Ok(self.tokens)
    }

    fn skip_line_comment(&mut self) {
        while let Some(b) = self.peek(0) {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let line = self.line;
        self.pos += 2;
        loop {
            match self.peek(0) {
                None => return Err(self.error(line, "unterminated block comment")),
                Some(b'*') if self.peek(1) == Some(b'/') => {
                    self.pos += 2;
                    return Ok(());
                }
                Some(b'\n') => {
                    self.line += 1;
                    self.newline = true;
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn skip_string(&mut self, quote: u8) -> Result<(), LexError> {
        let line = self.line;
        self.pos += 1;
        loop {
            match self.peek(0) {
                None | Some(b'\n') => return Err(self.error(line, "unterminated string literal")),
                Some(b'\\') => {
                    if self.peek(1) == Some(b'\n') {
                        self.line += 1;
                    }
                    self.pos += 2;
                }
                Some(b) if b == quote => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Skip a template literal including nested `${ ... }` expressions.
    fn skip_template(&mut self) -> Result<(), LexError> {
        let line = self.line;
        self.pos += 1;
        loop {
            match self.peek(0) {
                None => return Err(self.error(line, "unterminated template literal")),
                Some(b'\\') => {
                    if self.peek(1) == Some(b'\n') {
                        self.line += 1;
                    }
                    self.pos += 2;
                }
                Some(b'`') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(b'$') if self.peek(1) == Some(b'{') => {
                    self.pos += 2;
                    self.skip_template_expression()?;
                }
                Some(b'\n') => {
                    self.line += 1;
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn skip_template_expression(&mut self) -> Result<(), LexError> {
        let line = self.line;
        let mut depth = 0usize;
        loop {
            match self.peek(0) {
                None => return Err(self.error(line, "unterminated template expression")),
                Some(b'{') => {
                    depth += 1;
                    self.pos += 1;
                }
                Some(b'}') => {
                    self.pos += 1;
                    if depth == 0 {
                        return Ok(());
                    }
                    depth -= 1;
                }
                Some(q @ (b'\'' | b'"')) => self.skip_string(q)?,
                Some(b'`') => self.skip_template()?,
                Some(b'/') if self.peek(1) == Some(b'/') => self.skip_line_comment(),
                Some(b'/') if self.peek(1) == Some(b'*') => {
                    let newline = self.newline;
                    self.skip_block_comment()?;
                    self.newline = newline;
                }
                Some(b'\n') => {
                    self.line += 1;
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn skip_number(&mut self, start: usize) {
        let hex = matches!(&self.bytes[start..], [b'0', b'x' | b'X', ..]);
        while let Some(b) = self.peek(0) {
            let exponent_sign = (b == b'+' || b == b'-')
                && !hex
                && matches!(self.bytes.get(self.pos.wrapping_sub(1)), Some(b'e' | b'E'));
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn skip_ident(&mut self) {
        while let Some(b) = self.peek(0) {
            if is_ident_part(b) {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn skip_punct(&mut self) {
        let rest = &self.src[self.pos..];
        for p in PUNCTUATORS {
            if rest.starts_with(p) {
                // `?.5` is a conditional followed by a number
                if *p == "?." && rest.as_bytes().get(2).is_some_and(|c| c.is_ascii_digit()) {
                    break;
                }
                self.pos += p.len();
                return;
            }
        }
        let width = rest.chars().next().map(char::len_utf8).unwrap_or(1);
        self.pos += width;
    }

    fn regex_allowed(&self) -> bool {
        let Some(prev) = self.tokens.last() else {
            return true;
        };
        let text = prev.text(self.src);
        match prev.kind {
            TokenKind::Punct => !matches!(text, ")" | "]" | "}" | "++" | "--"),
            TokenKind::Ident => REGEX_PREFIX_KEYWORDS.contains(&text),
            _ => false,
        }
    }

    /// Consume a regex literal; on a line break, leave `/` to the punctuator path.
    fn try_regex(&mut self) -> bool {
        let mut i = self.pos + 1;
        let mut in_class = false;
        loop {
            match self.bytes.get(i) {
                None | Some(b'\n') => return false,
                Some(b'\\') => i += 2,
                Some(b'[') => {
                    in_class = true;
                    i += 1;
                }
                Some(b']') => {
                    in_class = false;
                    i += 1;
                }
                Some(b'/') if !in_class => {
                    i += 1;
                    break;
                }
                Some(_) => i += 1,
            }
        }
        while self.bytes.get(i).is_some_and(|b| b.is_ascii_alphabetic()) {
            i += 1;
        }
        self.pos = i;
        true
    }
}
