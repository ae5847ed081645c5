//! Token navigation shared by the scanner, the TypeScript eraser and the
//! declaration extractor: bracket matching, statement boundaries, binding
//! patterns and type extents.

use super::lexer::{Token, TokenKind};

/// Keywords that may prefix a type operand
const TYPE_PREFIXES: &[&str] = &[
    "typeof", "keyof", "readonly", "unique", "infer", "asserts", "abstract", "new",
];

/// Identifiers that continue an expression or declaration across a line break
const CONTINUATION_WORDS: &[&str] = &[
    "extends", "implements", "as", "satisfies", "instanceof", "in", "of", "from",
];

/// Punctuators that continue an expression across a line break
const CONTINUATION_PUNCT: &[&str] = &[
    ".", "?.", "(", "[", ",", "=", "=>", "+", "-", "*", "/", "%", "**", "|", "&", "^", "||",
    "&&", "??", "?", ":", "<", ">", "<=", ">=", "==", "===", "!=", "!==", "+=", "-=", "*=",
    "%=", "&=", "|=", "^=", "**=", "&&=", "||=", "??=",
];

#[derive(Clone, Copy)]
pub struct Cursor<'a> {
    pub src: &'a str,
    pub tokens: &'a [Token],
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str, tokens: &'a [Token]) -> Self {
        Self { src, tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&'a Token> {
        self.tokens.get(i)
    }

    pub fn text(&self, i: usize) -> &'a str {
        self.tokens.get(i).map(|t| t.text(self.src)).unwrap_or("")
    }

    pub fn kind(&self, i: usize) -> Option<TokenKind> {
        self.tokens.get(i).map(|t| t.kind)
    }

    pub fn is(&self, i: usize, text: &str) -> bool {
        self.tokens
            .get(i)
            .is_some_and(|t| t.kind == TokenKind::Punct && t.text(self.src) == text)
    }

    pub fn is_ident(&self, i: usize, text: &str) -> bool {
        self.tokens
            .get(i)
            .is_some_and(|t| t.kind == TokenKind::Ident && t.text(self.src) == text)
    }

    pub fn is_any_ident(&self, i: usize) -> bool {
        self.kind(i) == Some(TokenKind::Ident)
    }

    pub fn newline_before(&self, i: usize) -> bool {
        self.tokens.get(i).is_some_and(|t| t.newline_before)
    }

    pub fn line(&self, i: usize) -> usize {
        self.tokens
            .get(i)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    /// Byte offset where token `i` starts (source length past the end)
    pub fn start(&self, i: usize) -> usize {
        self.tokens.get(i).map(|t| t.start).unwrap_or(self.src.len())
    }

    /// Byte offset where token `i` ends
    pub fn end(&self, i: usize) -> usize {
        self.tokens.get(i).map(|t| t.end).unwrap_or(self.src.len())
    }

    /// Source text covering tokens `from..to`
    pub fn slice(&self, from: usize, to: usize) -> &'a str {
        if from >= to || from >= self.tokens.len() {
            return "";
        }
        &self.src[self.start(from)..self.end(to - 1)]
    }

    /// Unquoted value of a string token
    pub fn string_value(&self, i: usize) -> Option<String> {
        let token = self.tokens.get(i)?;
        if token.kind != TokenKind::Str {
            return None;
        }
        let raw = token.text(self.src);
        Some(unescape(&raw[1..raw.len() - 1]))
    }

    fn is_opener(&self, i: usize) -> bool {
        self.is(i, "(") || self.is(i, "[") || self.is(i, "{")
    }

    fn is_closer(&self, i: usize) -> bool {
        self.is(i, ")") || self.is(i, "]") || self.is(i, "}")
    }

    /// Index of the bracket closing the one at `open`
    pub fn matching(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for i in open..self.tokens.len() {
            if self.is_opener(i) {
                depth += 1;
            } else if self.is_closer(i) {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
        }
        None
    }

    /// Index of the `>` closing a type argument/parameter list at `open`
    pub fn matching_angle(&self, open: usize) -> Option<usize> {
        let mut angle = 0usize;
        let mut depth = 0usize;
        for i in open..self.tokens.len() {
            if self.is_opener(i) {
                depth += 1;
            } else if self.is_closer(i) {
                depth = depth.checked_sub(1)?;
            } else if depth == 0 {
                if self.is(i, "<") {
                    angle += 1;
                } else if self.is(i, ">") {
                    angle -= 1;
                    if angle == 0 {
                        return Some(i);
                    }
                } else if self.is(i, ";") {
                    return None;
                }
            }
        }
        None
    }

    fn ends_expression(&self, i: usize) -> bool {
        match self.kind(i) {
            Some(TokenKind::Punct) => matches!(self.text(i), ")" | "]" | "}" | "++" | "--"),
            Some(_) => true,
            None => false,
        }
    }

    fn continues_expression(&self, i: usize) -> bool {
        match self.kind(i) {
            Some(TokenKind::Punct) => CONTINUATION_PUNCT.contains(&self.text(i)),
            Some(TokenKind::Template) => true,
            Some(TokenKind::Ident) => CONTINUATION_WORDS.contains(&self.text(i)),
            _ => false,
        }
    }

    /// Whether a line break before `i` terminates the statement in progress
    pub fn asi_break(&self, i: usize) -> bool {
        i > 0
            && self.newline_before(i)
            && self.ends_expression(i - 1)
            && !self.continues_expression(i)
    }

    /// Exclusive end of the statement starting at `start`.
    ///
    /// A statement ends after a depth-0 `;`, before a depth-0 line break that
    /// ASI would terminate at, or before a closer that leaves the enclosing block.
    pub fn statement_end(&self, start: usize) -> usize {
        let mut depth = 0usize;
        let mut i = start;
        while i < self.tokens.len() {
            if i > start && depth == 0 && self.asi_break(i) {
                return i;
            }
            if self.is_opener(i) {
                depth += 1;
            } else if self.is_closer(i) {
                if depth == 0 {
                    return i;
                }
                depth -= 1;
            } else if depth == 0 && self.is(i, ";") {
                return i + 1;
            }
            i += 1;
        }
        self.tokens.len()
    }

    /// Index of the first depth-0 `,`, `;`, closer or ASI boundary at or after `i`.
    pub fn skip_expression(&self, i: usize) -> usize {
        let start = i;
        let mut depth = 0usize;
        let mut j = i;
        while j < self.tokens.len() {
            if j > start && depth == 0 && self.asi_break(j) {
                return j;
            }
            if self.is_opener(j) {
                depth += 1;
            } else if self.is_closer(j) {
                if depth == 0 {
                    return j;
                }
                depth -= 1;
            } else if depth == 0 && (self.is(j, ",") || self.is(j, ";")) {
                return j;
            }
            j += 1;
        }
        self.tokens.len()
    }

    /// Parse a binding pattern at `i`, collecting bound names.
    ///
    /// Returns the index after the pattern.
    pub fn binding_names(&self, i: usize, names: &mut Vec<String>) -> usize {
        if i >= self.tokens.len() {
            return i;
        }
        if self.is(i, "[") {
            let mut j = i + 1;
            while j < self.tokens.len() {
                if self.is(j, "]") {
                    return j + 1;
                }
                if self.is(j, ",") {
                    j += 1;
                    continue;
                }
                if self.is(j, "...") {
                    j += 1;
                }
                let next = self.binding_names(j, names);
                j = if self.is(next, "=") {
                    self.skip_expression(next + 1)
                } else {
                    next
                };
                if !self.is(j, ",") && !self.is(j, "]") {
                    j += 1;
                }
            }
            return j;
        }
        if self.is(i, "{") {
            let mut j = i + 1;
            while j < self.tokens.len() {
                if self.is(j, "}") {
                    return j + 1;
                }
                if self.is(j, ",") {
                    j += 1;
                    continue;
                }
                if self.is(j, "...") {
                    j = self.binding_names(j + 1, names);
                    continue;
                }
                let key = j;
                j = if self.is(j, "[") {
                    self.matching(j).map(|c| c + 1).unwrap_or(self.tokens.len())
                } else {
                    j + 1
                };
                if self.is(j, ":") {
                    j = self.binding_names(j + 1, names);
                } else if self.is_any_ident(key) {
                    names.push(self.text(key).to_string());
                }
                if self.is(j, "=") {
                    j = self.skip_expression(j + 1);
                }
                if !self.is(j, ",") && !self.is(j, "}") && j < self.tokens.len() {
                    j += 1;
                }
            }
            return j;
        }
        if self.is_any_ident(i) {
            names.push(self.text(i).to_string());
        }
        i + 1
    }

    /// Skip a TypeScript type starting at `i`; returns the index after it.
    pub fn skip_type(&self, i: usize) -> usize {
        let mut j = i;
        if self.is(j, "|") || self.is(j, "&") {
            j += 1;
        }
        j = self.skip_type_operand(j);
        loop {
            if self.is(j, "|") || self.is(j, "&") {
                j = self.skip_type_operand(j + 1);
            } else if self.is_ident(j, "extends") && !self.newline_before(j) {
                j = self.skip_type_operand(j + 1);
                if self.is(j, "?") {
                    j = self.skip_type(j + 1);
                    if self.is(j, ":") {
                        j = self.skip_type(j + 1);
                    }
                }
            } else {
                return j;
            }
        }
    }

    fn skip_type_operand(&self, i: usize) -> usize {
        let mut j = i;
        while self.is_any_ident(j)
            && TYPE_PREFIXES.contains(&self.text(j))
            && (self.is_any_ident(j + 1)
                || self.is(j + 1, "(")
                || self.is(j + 1, "[")
                || self.is(j + 1, "{")
                || self.is(j + 1, "<"))
        {
            j += 1;
        }

        if self.is(j, "<") {
            // generic function type: <T>(arg: T) => R
            j = self.matching_angle(j).map(|c| c + 1).unwrap_or(j + 1);
        }

        match self.kind(j) {
            Some(TokenKind::Punct) if self.is(j, "(") => {
                j = self.matching(j).map(|c| c + 1).unwrap_or(self.tokens.len());
                if self.is(j, "=>") {
                    return self.skip_type(j + 1);
                }
            }
            Some(TokenKind::Punct) if self.is(j, "[") || self.is(j, "{") => {
                j = self.matching(j).map(|c| c + 1).unwrap_or(self.tokens.len());
            }
            Some(TokenKind::Punct) if self.is(j, "-") && self.kind(j + 1) == Some(TokenKind::Number) => {
                j += 2;
            }
            Some(TokenKind::Str | TokenKind::Number | TokenKind::Template) => j += 1,
            Some(TokenKind::Ident) => {
                j += 1;
                while self.is(j, ".") && self.is_any_ident(j + 1) {
                    j += 2;
                }
                if self.is_ident(j, "is") && !self.newline_before(j) {
                    return self.skip_type(j + 1);
                }
            }
            _ => return j,
        }

        loop {
            if self.is(j, "<") && !self.newline_before(j) {
                match self.matching_angle(j) {
                    Some(close) => j = close + 1,
                    None => return j,
                }
            } else if self.is(j, "[") && !self.newline_before(j) {
                j = self.matching(j).map(|c| c + 1).unwrap_or(self.tokens.len());
            } else {
                return j;
            }
        }
    }
}

/// Resolve the common escapes of a JS string literal body
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\n') | None => {}
            Some(other) => out.push(other),
        }
    }
    out
}
