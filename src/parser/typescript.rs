//! TypeScript erasure
//!
//! Computes the byte spans to delete so a TypeScript module body becomes
//! plain JavaScript: declarations with no runtime meaning, annotations,
//! type parameters and arguments, casts, non-null assertions and access
//! modifiers. Constructor parameter properties become assignments.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::cursor::Cursor;
use super::lexer::{LexError, TokenKind};
use super::Edit;

/// Modifiers with no runtime meaning
const TS_MODIFIERS: &[&str] = &["public", "private", "protected", "readonly", "override"];

/// Class member modifiers, runtime and TypeScript-only
const MEMBER_MODIFIERS: &[&str] = &[
    "public", "private", "protected", "readonly", "override", "declare", "abstract", "static",
    "async", "get", "set", "accessor",
];

/// Identifiers that never precede a call's type arguments or a non-null `!`
const KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await", "if", "while", "for", "switch", "catch", "with", "function",
    "class", "const", "let", "var", "export", "import", "default", "extends",
];

/// Words whose `(...) {` is a statement, not a method
const BLOCK_KEYWORDS: &[&str] = &["if", "while", "for", "switch", "catch", "with", "function"];

#[derive(Debug, Default)]
pub struct Erasure {
    /// Sorted, non-overlapping
    pub edits: Vec<Edit>,
    /// Top-level names declared only as types (`interface`, `type`, `declare`)
    pub type_names: HashSet<String>,
}

pub fn erase(cur: Cursor<'_>) -> Result<Erasure, LexError> {
    let mut eraser = Eraser {
        cur,
        spans: BTreeMap::new(),
        ends: HashMap::new(),
        bytes: Vec::new(),
        inserts: Vec::new(),
        params_done: HashSet::new(),
        type_names: HashSet::new(),
    };
    eraser.run()?;
    Ok(eraser.finish())
}

struct Eraser<'a> {
    cur: Cursor<'a>,
    /// Erased token ranges, start -> exclusive end
    spans: BTreeMap<usize, usize>,
    /// Exclusive end -> start, to look through erased tokens
    ends: HashMap<usize, usize>,
    /// Extra byte ranges (whitespace next to erased words)
    bytes: Vec<(usize, usize)>,
    inserts: Vec<Edit>,
    params_done: HashSet<usize>,
    type_names: HashSet<String>,
}

impl<'a> Eraser<'a> {
    fn error(&self, i: usize, message: &str) -> LexError {
        LexError {
            line: self.cur.line(i),
            message: message.to_string(),
        }
    }

    fn erase(&mut self, from: usize, to: usize) {
        if to <= from {
            return;
        }
        let end = self.spans.get(&from).map_or(to, |e| (*e).max(to));
        self.spans.insert(from, end);
        self.ends.insert(end, from);
    }

    /// Erase a single word together with the whitespace after it
    fn erase_word(&mut self, i: usize) {
        self.erase(i, i + 1);
        let end = if i + 1 < self.cur.len() {
            self.cur.start(i + 1)
        } else {
            self.cur.end(i)
        };
        self.bytes.push((self.cur.start(i), end));
    }

    /// Index of the last token before `i` that survives erasure
    fn prev_kept(&self, i: usize) -> Option<usize> {
        let mut p = i;
        while let Some(&from) = self.ends.get(&p) {
            if from >= p {
                break;
            }
            p = from;
        }
        p.checked_sub(1)
    }

    fn is_keyword(&self, i: usize) -> bool {
        self.cur.is_any_ident(i) && KEYWORDS.contains(&self.cur.text(i))
    }

    fn statement_start(&self, i: usize) -> bool {
        let cur = self.cur;
        if i == 0 {
            return true;
        }
        if cur.is_ident(i - 1, "export") {
            return true;
        }
        if cur.is_ident(i - 1, "default") && i >= 2 && cur.is_ident(i - 2, "export") {
            return true;
        }
        cur.is(i - 1, ";")
            || cur.is(i - 1, "}")
            || cur.is(i - 1, "{")
            || (cur.newline_before(i) && !cur.is(i - 1, ".") && !cur.is(i - 1, "?."))
    }

    fn run(&mut self) -> Result<(), LexError> {
        let cur = self.cur;
        let mut depth = 0usize;
        let mut i = 0;
        while i < cur.len() {
            if let Some(&to) = self.spans.get(&i) {
                i = to;
                continue;
            }
            if self.statement_start(i) {
                if let Some(next) = self.declaration(i, depth == 0)? {
                    i = next;
                    continue;
                }
            }

            match cur.kind(i) {
                Some(TokenKind::Ident) => match cur.text(i) {
                    "function" => self.function(i),
                    "class" => self.class(i),
                    "const" | "let" | "var" => self.declarators(i + 1),
                    "as" | "satisfies" => self.cast(i),
                    _ => {}
                },
                Some(TokenKind::Punct) => match cur.text(i) {
                    "!" => self.non_null(i),
                    "(" => self.parens(i),
                    "<" => self.type_arguments(i),
                    "{" => depth += 1,
                    "}" => depth = depth.saturating_sub(1),
                    _ => {}
                },
                _ => {}
            }
            i += 1;
        }
        Ok(())
    }

    /// Statements with no runtime meaning; returns where to resume.
    fn declaration(&mut self, i: usize, top_level: bool) -> Result<Option<usize>, LexError> {
        let cur = self.cur;
        let word = cur.text(i);
        if !cur.is_any_ident(i) {
            return Ok(None);
        }
        match word {
            "interface" if cur.is_any_ident(i + 1) => {
                let mut j = i + 2;
                while j < cur.len() && !cur.is(j, "{") {
                    j = if cur.is(j, "<") {
                        cur.matching_angle(j).map(|c| c + 1).unwrap_or(j + 1)
                    } else {
                        j + 1
                    };
                }
                let end = cur
                    .matching(j)
                    .map(|c| c + 1)
                    .ok_or_else(|| self.error(i, "unterminated interface"))?;
                if top_level {
                    self.type_names.insert(cur.text(i + 1).to_string());
                }
                self.erase(i, end);
                Ok(Some(end))
            }
            "type" if cur.is_any_ident(i + 1) && (cur.is(i + 2, "=") || cur.is(i + 2, "<")) => {
                let mut j = i + 2;
                if cur.is(j, "<") {
                    j = cur.matching_angle(j).map(|c| c + 1).unwrap_or(j + 1);
                }
                if !cur.is(j, "=") {
                    return Err(self.error(i, "malformed type alias"));
                }
                let mut end = cur.skip_type(j + 1);
                if end == j + 1 {
                    end = cur.statement_end(i);
                } else if cur.is(end, ";") {
                    end += 1;
                }
                if top_level {
                    self.type_names.insert(cur.text(i + 1).to_string());
                }
                self.erase(i, end);
                Ok(Some(end))
            }
            "declare" if cur.is_any_ident(i + 1) && !cur.newline_before(i + 1) => {
                let end = cur.statement_end(i);
                if top_level {
                    let mut k = i + 1;
                    if cur.is_ident(k, "abstract") || cur.is_ident(k, "async") {
                        k += 1;
                    }
                    let mut names = Vec::new();
                    match cur.text(k) {
                        "const" | "let" | "var" => {
                            cur.binding_names(k + 1, &mut names);
                        }
                        "function" | "class" | "enum" | "namespace" | "module" | "interface"
                        | "type" => {
                            if cur.is_any_ident(k + 1) {
                                names.push(cur.text(k + 1).to_string());
                            }
                        }
                        _ => {}
                    }
                    self.type_names.extend(names);
                }
                self.erase(i, end);
                Ok(Some(end))
            }
            "abstract" if cur.is_ident(i + 1, "class") => {
                self.erase_word(i);
                Ok(Some(i + 1))
            }
            "enum" if cur.is_any_ident(i + 1) => {
                Err(self.error(i, "enum declarations are not supported"))
            }
            "const" if cur.is_ident(i + 1, "enum") => {
                Err(self.error(i, "enum declarations are not supported"))
            }
            "namespace" | "module" if cur.is_any_ident(i + 1) && cur.is(i + 2, "{") => {
                Err(self.error(i, "runtime namespaces are not supported"))
            }
            _ => Ok(None),
        }
    }

    fn function(&mut self, i: usize) {
        let cur = self.cur;
        let decl_start = if i > 0 && cur.is_ident(i - 1, "async") { i - 1 } else { i };
        let declaration = self.statement_start(decl_start);

        let mut j = i + 1;
        if cur.is(j, "*") {
            j += 1;
        }
        if cur.is_any_ident(j) {
            j += 1;
        }
        if cur.is(j, "<") {
            if let Some(close) = cur.matching_angle(j) {
                self.erase(j, close + 1);
                j = close + 1;
            }
        }
        if !cur.is(j, "(") {
            return;
        }
        let Some(close) = cur.matching(j) else {
            return;
        };
        self.params(j, close, false);
        let mut k = close + 1;
        if cur.is(k, ":") {
            let t = cur.skip_type(k + 1);
            self.erase(k, t);
            k = t;
        }
        if !cur.is(k, "{") && declaration {
            // overload signature
            let end = if cur.is(k, ";") { k + 1 } else { k };
            self.erase(decl_start, end);
        }
    }

    /// Annotations inside a parameter list `open..close`
    fn params(&mut self, open: usize, close: usize, constructor: bool) -> Vec<String> {
        let cur = self.cur;
        self.params_done.insert(open);
        let mut properties = Vec::new();
        let mut j = open + 1;
        while j < close {
            let item = j;
            let mut modified = false;
            if constructor {
                while cur.is_any_ident(j)
                    && TS_MODIFIERS.contains(&cur.text(j))
                    && (cur.is_any_ident(j + 1) || cur.is(j + 1, "{") || cur.is(j + 1, "["))
                {
                    self.erase_word(j);
                    modified = true;
                    j += 1;
                }
            }

            if cur.is_ident(j, "this") && cur.is(j + 1, ":") {
                let end = cur.skip_expression(j);
                let end = if cur.is(end, ",") { end + 1 } else { end };
                self.erase(item, end);
                j = end;
                continue;
            }

            if cur.is(j, "...") {
                j += 1;
            }
            let mut names = Vec::new();
            let mut p = cur.binding_names(j, &mut names);
            if cur.is(p, "?") {
                self.erase(p, p + 1);
                p += 1;
            }
            if cur.is(p, ":") {
                let t = cur.skip_type(p + 1);
                self.erase(p, t);
                p = t;
            }
            if modified && names.len() == 1 {
                properties.extend(names);
            }
            j = cur.skip_expression(p);
            if cur.is(j, ",") {
                j += 1;
            } else if j == item {
                j += 1;
            }
        }
        properties
    }

    fn class(&mut self, i: usize) {
        let cur = self.cur;
        let mut j = i + 1;
        if cur.is_any_ident(j) && !cur.is_ident(j, "extends") && !cur.is_ident(j, "implements") {
            j += 1;
        }
        if cur.is(j, "<") {
            if let Some(close) = cur.matching_angle(j) {
                self.erase(j, close + 1);
                j = close + 1;
            }
        }

        // heritage clauses up to the body
        let mut body = None;
        let mut depth = 0usize;
        while j < cur.len() {
            if depth == 0 && cur.is(j, "{") {
                body = Some(j);
                break;
            }
            if cur.is(j, "(") || cur.is(j, "[") {
                depth += 1;
            } else if cur.is(j, ")") || cur.is(j, "]") {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && cur.is(j, "<") {
                if let Some(close) = cur.matching_angle(j) {
                    if cur.is(close + 1, "{") || cur.is_ident(close + 1, "implements") {
                        self.erase(j, close + 1);
                        j = close + 1;
                        continue;
                    }
                }
            } else if depth == 0 && cur.is_ident(j, "implements") {
                let mut k = j;
                while k < cur.len() && !cur.is(k, "{") {
                    k = if cur.is(k, "<") {
                        cur.matching_angle(k).map(|c| c + 1).unwrap_or(k + 1)
                    } else {
                        k + 1
                    };
                }
                self.erase(j, k);
                j = k;
                continue;
            }
            j += 1;
        }

        let Some(open) = body else {
            return;
        };
        if let Some(close) = cur.matching(open) {
            self.members(open, close);
        }
    }

    fn members(&mut self, open: usize, close: usize) {
        let cur = self.cur;
        let mut m = open + 1;
        while m < close {
            if cur.is(m, ";") {
                m += 1;
                continue;
            }
            let start = m;
            let mut removed = false;

            while cur.is_any_ident(m)
                && MEMBER_MODIFIERS.contains(&cur.text(m))
                && !(cur.is(m + 1, "(")
                    || cur.is(m + 1, "=")
                    || cur.is(m + 1, ";")
                    || cur.is(m + 1, ":")
                    || cur.is(m + 1, "?")
                    || cur.is(m + 1, "!")
                    || cur.is(m + 1, "<")
                    || cur.is(m + 1, "}")
                    || cur.newline_before(m + 1))
            {
                let word = cur.text(m);
                if TS_MODIFIERS.contains(&word) {
                    self.erase_word(m);
                } else if word == "declare" || word == "abstract" {
                    removed = true;
                }
                m += 1;
            }

            if cur.is_ident(m, "static") && cur.is(m + 1, "{") {
                m = cur.matching(m + 1).map(|c| c + 1).unwrap_or(close);
                continue;
            }
            if cur.is(m, "*") {
                m += 1;
            }

            // index signature: [key: string]: T
            if cur.is(m, "[") && cur.is_any_ident(m + 1) && cur.is(m + 2, ":") {
                let bracket = cur.matching(m).unwrap_or(close);
                let mut end = bracket + 1;
                if cur.is(end, ":") {
                    end = cur.skip_type(end + 1);
                }
                if cur.is(end, ";") {
                    end += 1;
                }
                self.erase(start, end);
                m = end.max(m + 1);
                continue;
            }

            let name = m;
            if cur.is(m, "[") {
                m = cur.matching(m).map(|c| c + 1).unwrap_or(close);
            } else if cur.is(m, "#") {
                m += 2;
            } else {
                m += 1;
            }
            if cur.is(m, "?") || cur.is(m, "!") {
                self.erase(m, m + 1);
                m += 1;
            }
            if cur.is(m, "<") {
                if let Some(c) = cur.matching_angle(m) {
                    self.erase(m, c + 1);
                    m = c + 1;
                }
            }

            if cur.is(m, "(") {
                let Some(pclose) = cur.matching(m) else {
                    return;
                };
                let constructor = cur.is_ident(name, "constructor");
                let properties = self.params(m, pclose, constructor);
                let mut k = pclose + 1;
                if cur.is(k, ":") {
                    let t = cur.skip_type(k + 1);
                    self.erase(k, t);
                    k = t;
                }
                if cur.is(k, "{") && !removed {
                    let bclose = cur.matching(k).unwrap_or(close);
                    if !properties.is_empty() {
                        self.parameter_properties(k, bclose, &properties);
                    }
                    m = bclose + 1;
                } else {
                    let mut end = if cur.is(k, "{") {
                        cur.matching(k).map(|c| c + 1).unwrap_or(close)
                    } else {
                        k
                    };
                    if cur.is(end, ";") {
                        end += 1;
                    }
                    self.erase(start, end);
                    m = end;
                }
            } else {
                let mut k = m;
                if cur.is(k, ":") {
                    let t = cur.skip_type(k + 1);
                    self.erase(k, t);
                    k = t;
                }
                if cur.is(k, "=") {
                    k = cur.skip_expression(k + 1);
                }
                if cur.is(k, ";") || cur.is(k, ",") {
                    k += 1;
                }
                if removed {
                    self.erase(start, k);
                }
                m = k;
            }
            if m <= start {
                m = start + 1;
            }
        }
    }

    /// `constructor(private a)` assigns `this.a = a` after `super(...)` or first
    fn parameter_properties(&mut self, open: usize, close: usize, names: &[String]) {
        let cur = self.cur;
        let mut at = cur.end(open);
        let mut depth = 0usize;
        for k in open + 1..close {
            if cur.is(k, "{") || cur.is(k, "(") || cur.is(k, "[") {
                depth += 1;
            } else if cur.is(k, "}") || cur.is(k, ")") || cur.is(k, "]") {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && cur.is_ident(k, "super") && cur.is(k + 1, "(") {
                let end = cur.statement_end(k);
                at = cur.end(end.saturating_sub(1));
                break;
            }
        }
        let text: String = names
            .iter()
            .map(|n| format!(" this.{n} = {n};"))
            .collect();
        self.inserts.push(Edit {
            start: at,
            end: at,
            text,
        });
    }

    fn declarators(&mut self, from: usize) {
        let cur = self.cur;
        let mut j = from;
        loop {
            let mut names = Vec::new();
            let mut p = cur.binding_names(j, &mut names);
            if cur.is(p, "!") && cur.is(p + 1, ":") {
                self.erase(p, p + 1);
                p += 1;
            }
            if cur.is(p, ":") {
                let t = cur.skip_type(p + 1);
                self.erase(p, t);
                p = t;
            }
            let k = if cur.is(p, "=") {
                cur.skip_expression(p + 1)
            } else {
                p
            };
            if cur.is(k, ",") && k > j {
                j = k + 1;
            } else {
                break;
            }
        }
    }

    fn cast(&mut self, i: usize) {
        let cur = self.cur;
        let Some(prev) = self.prev_kept(i) else {
            return;
        };
        let ends_expression = match cur.kind(prev) {
            Some(TokenKind::Ident) => !self.is_keyword(prev),
            Some(TokenKind::Punct) => matches!(cur.text(prev), ")" | "]" | "}"),
            Some(_) => true,
            None => false,
        };
        let starts_type = match cur.kind(i + 1) {
            Some(TokenKind::Ident | TokenKind::Str | TokenKind::Number | TokenKind::Template) => true,
            Some(TokenKind::Punct) => matches!(cur.text(i + 1), "{" | "(" | "[" | "-"),
            _ => false,
        };
        if ends_expression && starts_type {
            let end = cur.skip_type(i + 1);
            self.erase(i, end);
            // the space before `as` goes too
            self.bytes.push((cur.end(i - 1), cur.end(end - 1)));
        }
    }

    fn non_null(&mut self, i: usize) {
        let cur = self.cur;
        if i == 0 {
            return;
        }
        let (Some(prev), Some(this)) = (cur.get(i - 1), cur.get(i)) else {
            return;
        };
        if prev.end != this.start {
            return;
        }
        let operand = match prev.kind {
            TokenKind::Ident => !self.is_keyword(i - 1),
            TokenKind::Punct => matches!(cur.text(i - 1), ")" | "]"),
            _ => false,
        };
        let follows = i + 1 >= cur.len()
            || cur.newline_before(i + 1)
            || matches!(
                cur.text(i + 1),
                "." | "?." | ")" | "]" | "}" | ";" | "," | "[" | "(" | "=" | ":"
            ) && cur.kind(i + 1) == Some(TokenKind::Punct);
        if operand && follows {
            self.erase(i, i + 1);
        }
    }

    fn parens(&mut self, i: usize) {
        let cur = self.cur;
        if self.params_done.contains(&i) {
            return;
        }
        let Some(close) = cur.matching(i) else {
            return;
        };
        if cur.is(close + 1, "=>") {
            self.params(i, close, false);
            return;
        }

        let prev = self.prev_kept(i);
        let method_like = prev.is_some_and(|p| match cur.kind(p) {
            Some(TokenKind::Ident) => {
                !BLOCK_KEYWORDS.contains(&cur.text(p)) && !(p > 0 && cur.is(p - 1, "."))
            }
            Some(TokenKind::Str) => true,
            Some(TokenKind::Punct) => cur.is(p, "]"),
            _ => false,
        });

        if cur.is(close + 1, ":") && !prev.is_some_and(|p| cur.is(p, "?")) {
            let t = cur.skip_type(close + 2);
            if cur.is(t, "=>") || (method_like && cur.is(t, "{")) {
                self.params(i, close, false);
                self.erase(close + 1, t);
            }
        } else if method_like && cur.is(close + 1, "{") {
            self.params(i, close, false);
        }
    }

    fn type_arguments(&mut self, i: usize) {
        let cur = self.cur;
        if i == 0 || cur.newline_before(i) {
            return;
        }
        let prev = i - 1;
        let callee = match cur.kind(prev) {
            Some(TokenKind::Ident) => !self.is_keyword(prev),
            Some(TokenKind::Punct) => matches!(cur.text(prev), ")" | "]"),
            _ => false,
        };
        if !callee {
            return;
        }
        let Some(close) = cur.matching_angle(i) else {
            return;
        };
        let constructed = prev >= 1 && cur.is_ident(prev - 1, "new");
        let called = cur.is(close + 1, "(") || cur.kind(close + 1) == Some(TokenKind::Template);
        if !called && !constructed {
            return;
        }
        let type_ish = (i + 1..close).all(|k| match cur.kind(k) {
            Some(TokenKind::Punct) => matches!(
                cur.text(k),
                "," | "." | "[" | "]" | "{" | "}" | "(" | ")" | ":" | ";" | "|" | "&" | "<"
                    | ">" | "=>" | "?" | "..." | "-"
            ),
            Some(TokenKind::Regex) => false,
            Some(_) => true,
            None => false,
        });
        if type_ish {
            self.erase(i, close + 1);
        }
    }

    fn finish(self) -> Erasure {
        let cur = self.cur;
        let mut ranges: Vec<(usize, usize)> = self
            .spans
            .iter()
            .map(|(from, to)| (cur.start(*from), cur.end(to - 1)))
            .chain(self.bytes.iter().copied())
            .collect();
        ranges.sort();

        let mut merged: Vec<(usize, usize)> = Vec::new();
        for (start, end) in ranges {
            match merged.last_mut() {
                Some(last) if start <= last.1 => last.1 = last.1.max(end),
                _ => merged.push((start, end)),
            }
        }

        let mut edits: Vec<Edit> = merged
            .into_iter()
            .map(|(start, end)| Edit {
                start,
                end,
                text: String::new(),
            })
            .collect();
        edits.extend(self.inserts);
        edits.sort_by_key(|e| (e.start, e.end));

        Erasure {
            edits,
            type_names: self.type_names,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::apply_edits;
    use super::super::lexer::tokenize;
    use super::*;

    fn strip(src: &str) -> String {
        let tokens = tokenize(src).unwrap();
        let erasure = erase(Cursor::new(src, &tokens)).unwrap();
        apply_edits(src, &erasure.edits)
    }

    fn squash(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn removes_type_declarations() {
        let src = "interface A { x: number }\ntype B = string | number;\ndeclare const c: number;\nconst d = 1;";
        assert_eq!(strip(src).trim(), "const d = 1;");
    }

    #[test]
    fn records_top_level_type_names() {
        let src = "interface Props { a: string }\ntype Id = string\nfunction f() { type Local = number }";
        let tokens = tokenize(src).unwrap();
        let erasure = erase(Cursor::new(src, &tokens)).unwrap();
        assert!(erasure.type_names.contains("Props"));
        assert!(erasure.type_names.contains("Id"));
        assert!(!erasure.type_names.contains("Local"));
    }

    #[test]
    fn strips_variable_annotations() {
        assert_eq!(
            squash(&strip("const a: number = 1, b: Map<string, L.Marker> = new Map<string, L.Marker>();")),
            "const a = 1, b = new Map();"
        );
        assert_eq!(squash(&strip("let el!: HTMLElement;")), "let el;");
    }

    #[test]
    fn strips_function_signatures() {
        let src = "function f<T>(a: T, b?: number, ...rest: string[]): T { return a }";
        assert_eq!(squash(&strip(src)), "function f(a, b, ...rest) { return a }");
    }

    #[test]
    fn removes_overloads() {
        let src = "function f(a: string): void;\nfunction f(a: any) {}";
        assert_eq!(squash(&strip(src)), "function f(a) {}");
    }

    #[test]
    fn strips_arrow_functions() {
        let src = "const g = (a: number, { b }: Opts): string => `${a}${b}`;";
        assert_eq!(squash(&strip(src)), "const g = (a, { b }) => `${a}${b}`;");
        let src = "const h = async (e: L.LeafletEvent) => { await e }";
        assert_eq!(squash(&strip(src)), "const h = async (e) => { await e }");
    }

    #[test]
    fn strips_casts_and_non_null() {
        let src = "const m = (map as L.Map)!.getCenter(); const o = { a: 1 } as const; x!.y = el!;";
        assert_eq!(
            squash(&strip(src)),
            "const m = (map).getCenter(); const o = { a: 1 }; x.y = el;"
        );
        assert_eq!(squash(&strip("const ok = a !== b && !c;")), "const ok = a !== b && !c;");
    }

    #[test]
    fn strips_call_type_arguments() {
        let src = "const r = ref<L.Map | null>(null); const c = a < b && c > (d);";
        assert_eq!(squash(&strip(src)), "const r = ref(null); const c = a < b && c > (d);");
    }

    #[test]
    fn strips_class_members() {
        let src = r#"abstract class Layer<T> extends Base<T> implements Visible, Named {
  private readonly map: L.Map;
  declare extra: string;
  count = 0;
  name?: string;
  [key: string]: unknown;
  abstract draw(): void;
  constructor(private el: HTMLElement, public zoom: number) {
    super();
  }
  get size(): number { return 1 }
  protected update<K>(key: K): void {}
}"#;
        let out = squash(&strip(src));
        assert_eq!(
            out,
            "class Layer extends Base { map; count = 0; name; constructor(el, zoom) { super(); this.el = el; this.zoom = zoom; } get size() { return 1 } update(key) {} }"
        );
    }

    #[test]
    fn strips_object_method_annotations() {
        let src = "export default defineComponent({ setup(props: Props, ctx): Ctx { return {} }, data() { return { a: 1 } } })";
        assert_eq!(
            squash(&strip(src)),
            "export default defineComponent({ setup(props, ctx) { return {} }, data() { return { a: 1 } } })"
        );
    }

    #[test]
    fn leaves_plain_javascript_alone() {
        let src = "if (a) { b(c ? d : e) }\nconst o = { a: 1, b: [2, 3] };\nfor (const x of xs) {}\nlabel: while (x) break label;";
        assert_eq!(strip(src), src);
    }

    #[test]
    fn conditional_with_parenthesised_branch_is_not_an_arrow() {
        let src = "const v = ok ? (a) : b;";
        assert_eq!(strip(src), src);
    }

    #[test]
    fn enums_are_rejected() {
        let src = "enum Color { Red }";
        let tokens = tokenize(src).unwrap();
        let err = erase(Cursor::new(src, &tokens)).unwrap_err();
        assert!(err.message.contains("enum"));
    }
}
