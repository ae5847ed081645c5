//! Module scanner
//!
//! Finds every top-level `import` / `export` statement and every dynamic
//! `import("...")`, records what they bind, and produces the rewrites that
//! strip module syntax out of the module body.

use super::cursor::Cursor;
use super::lexer::{LexError, TokenKind};
use super::Edit;

/// Local name given to an anonymous or expression default export
pub const DEFAULT_LOCAL: &str = "__default_export";

/// What an import binding (or re-export) refers to in the source module
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Imported {
    Default,
    Namespace,
    Named(String),
}

impl Imported {
    fn from_name(name: String) -> Self {
        if name == "default" {
            Imported::Default
        } else {
            Imported::Named(name)
        }
    }

    /// Export name looked up in the source module, if any
    pub fn export_name(&self) -> Option<&str> {
        match self {
            Imported::Default => Some("default"),
            Imported::Named(name) => Some(name),
            Imported::Namespace => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub imported: Imported,
    pub local: String,
    pub type_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    pub specifier: String,
    pub bindings: Vec<ImportBinding>,
    /// `import type ...`, or every binding elided as type-only
    pub type_only: bool,
    pub line: usize,
    pub start: usize,
}

impl ImportDecl {
    /// Runtime bindings (type-only ones removed)
    pub fn value_bindings(&self) -> impl Iterator<Item = &ImportBinding> {
        self.bindings.iter().filter(|b| !b.type_only)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportEntry {
    /// `export const a`, `export { a as b }`, `export default ...`
    Local {
        exported: String,
        local: String,
        type_only: bool,
    },
    /// `export { a as b } from "m"`, `export * as ns from "m"`
    ReExport {
        exported: String,
        imported: Imported,
        specifier: String,
        type_only: bool,
    },
    /// `export * from "m"`
    Star { specifier: String, type_only: bool },
}

impl ExportEntry {
    pub fn exported(&self) -> Option<&str> {
        match self {
            ExportEntry::Local { exported, .. } | ExportEntry::ReExport { exported, .. } => {
                Some(exported)
            }
            ExportEntry::Star { .. } => None,
        }
    }

    pub fn specifier(&self) -> Option<&str> {
        match self {
            ExportEntry::Local { .. } => None,
            ExportEntry::ReExport { specifier, .. } | ExportEntry::Star { specifier, .. } => {
                Some(specifier)
            }
        }
    }

    pub fn is_type_only(&self) -> bool {
        match self {
            ExportEntry::Local { type_only, .. }
            | ExportEntry::ReExport { type_only, .. }
            | ExportEntry::Star { type_only, .. } => *type_only,
        }
    }
}

/// `import("specifier")` with a string literal argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicImport {
    pub specifier: String,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    /// Appears inside a type position (`typeof import("./x")`)
    pub type_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleRecord {
    pub imports: Vec<ImportDecl>,
    pub exports: Vec<ExportEntry>,
    pub dynamic_imports: Vec<DynamicImport>,
    /// Removal of module syntax from the body, sorted by position
    pub rewrites: Vec<Edit>,
    /// Source positions of re-export statements, parallel to `exports`
    pub export_starts: Vec<usize>,
}

impl ModuleRecord {
    /// Specifiers of runtime static dependencies, in statement order
    pub fn requests(&self) -> Vec<&str> {
        let mut ordered: Vec<(usize, &str)> = self
            .imports
            .iter()
            .filter(|d| !d.type_only)
            .map(|d| (d.start, d.specifier.as_str()))
            .collect();
        for (entry, start) in self.exports.iter().zip(&self.export_starts) {
            if let Some(spec) = entry.specifier() {
                if !entry.is_type_only() {
                    ordered.push((*start, spec));
                }
            }
        }
        ordered.sort_by_key(|(start, _)| *start);

        let mut seen = std::collections::HashSet::new();
        ordered
            .into_iter()
            .map(|(_, spec)| spec)
            .filter(|spec| seen.insert(*spec))
            .collect()
    }

    /// Every specifier the module mentions, type-only ones included:
    /// static ones in statement order, then dynamic ones
    pub fn all_specifiers(&self) -> Vec<&str> {
        let mut ordered: Vec<(usize, &str)> = self
            .imports
            .iter()
            .map(|d| (d.start, d.specifier.as_str()))
            .collect();
        for (entry, start) in self.exports.iter().zip(&self.export_starts) {
            if let Some(spec) = entry.specifier() {
                ordered.push((*start, spec));
            }
        }
        ordered.sort_by_key(|(start, _)| *start);

        let mut seen = std::collections::HashSet::new();
        ordered
            .into_iter()
            .map(|(_, spec)| spec)
            .chain(self.dynamic_imports.iter().map(|d| d.specifier.as_str()))
            .filter(|spec| seen.insert(*spec))
            .collect()
    }

    /// Whether any runtime statement or dynamic import uses `specifier`
    pub fn used_at_runtime(&self, specifier: &str) -> bool {
        self.requests().contains(&specifier)
            || self
                .dynamic_imports
                .iter()
                .any(|d| !d.type_only && d.specifier == specifier)
    }
}

/// Scan a tokenized module.
pub fn scan(cur: Cursor<'_>) -> Result<ModuleRecord, LexError> {
    let mut scanner = Scanner {
        cur,
        record: ModuleRecord::default(),
    };
    scanner.run()?;
    scanner.record.rewrites.sort_by_key(|e| e.start);
    Ok(scanner.record)
}

struct Scanner<'a> {
    cur: Cursor<'a>,
    record: ModuleRecord,
}

impl<'a> Scanner<'a> {
    fn error(&self, i: usize, message: impl Into<String>) -> LexError {
        LexError {
            line: self.cur.line(i),
            message: message.into(),
        }
    }

    fn remove(&mut self, from: usize, to: usize) {
        self.replace(from, to, String::new());
    }

    /// Replace tokens `from..to`; whitespace after the last one is kept
    fn replace(&mut self, from: usize, to: usize, text: String) {
        let start = self.cur.start(from);
        let end = if to > from { self.cur.end(to - 1) } else { start };
        self.record.rewrites.push(Edit { start, end, text });
    }

    /// Replace from token `from` up to where token `to` begins
    fn replace_prefix(&mut self, from: usize, to: usize, text: String) {
        let start = self.cur.start(from);
        let end = self.cur.start(to);
        self.record.rewrites.push(Edit { start, end, text });
    }

    fn statement_start(&self, i: usize) -> bool {
        i == 0
            || self.cur.is(i - 1, ";")
            || self.cur.is(i - 1, "}")
            || (self.cur.newline_before(i) && !self.cur.is(i - 1, "."))
    }

    fn run(&mut self) -> Result<(), LexError> {
        let cur = self.cur;
        let mut depth = 0usize;
        let mut i = 0;
        while i < cur.len() {
            if cur.is(i, "(") || cur.is(i, "[") || cur.is(i, "{") {
                depth += 1;
            } else if cur.is(i, ")") || cur.is(i, "]") || cur.is(i, "}") {
                depth = depth.saturating_sub(1);
            } else if cur.is_ident(i, "import") && !(i > 0 && (cur.is(i - 1, ".") || cur.is(i - 1, "?."))) {
                if cur.is(i + 1, "(") {
                    self.dynamic_import(i);
                } else if depth == 0 && !cur.is(i + 1, ".") && self.statement_start(i) {
                    i = self.import_statement(i)?;
                    continue;
                }
            } else if cur.is_ident(i, "export") && depth == 0 && self.statement_start(i) {
                i = self.export_statement(i)?;
                continue;
            }
            i += 1;
        }
        Ok(())
    }

    fn dynamic_import(&mut self, i: usize) {
        let cur = self.cur;
        if cur.kind(i + 2) == Some(TokenKind::Str) && cur.is(i + 3, ")") {
            if let Some(specifier) = cur.string_value(i + 2) {
                self.record.dynamic_imports.push(DynamicImport {
                    specifier,
                    start: cur.start(i),
                    end: cur.end(i + 3),
                    line: cur.line(i),
                    type_only: i > 0 && cur.is_ident(i - 1, "typeof"),
                });
            }
        }
    }

    /// End of a `from "x"` clause, including import attributes and `;`
    fn clause_end(&self, spec: usize) -> usize {
        let cur = self.cur;
        let mut end = spec + 1;
        if (cur.is_ident(end, "with") || cur.is_ident(end, "assert"))
            && !cur.newline_before(end)
            && cur.is(end + 1, "{")
        {
            end = cur.matching(end + 1).map(|c| c + 1).unwrap_or(end);
        }
        if cur.is(end, ";") {
            end += 1;
        }
        end
    }

    fn expect_string(&self, i: usize, what: &str) -> Result<String, LexError> {
        self.cur
            .string_value(i)
            .ok_or_else(|| self.error(i, format!("malformed {}: expected a module specifier", what)))
    }

    fn import_statement(&mut self, i: usize) -> Result<usize, LexError> {
        let cur = self.cur;
        let line = cur.line(i);
        let mut j = i + 1;

        // `import x = require("y")` and `import A = B.C`
        if cur.is_any_ident(j) && cur.is(j + 1, "=") {
            return Err(self.error(i, "import assignments are not supported"));
        }

        let mut type_only = false;
        if cur.is_ident(j, "type")
            && !cur.is(j + 1, ",")
            && !cur.is_ident(j + 1, "from")
            && !cur.is(j + 1, "=")
        {
            type_only = true;
            j += 1;
        }

        if cur.kind(j) == Some(TokenKind::Str) {
            let specifier = self.expect_string(j, "import")?;
            let end = self.clause_end(j);
            self.record.imports.push(ImportDecl {
                specifier,
                bindings: Vec::new(),
                type_only,
                line,
                start: cur.start(i),
            });
            self.remove(i, end);
            return Ok(end);
        }

        let mut bindings = Vec::new();
        if cur.is_any_ident(j) && !cur.is_ident(j, "from") || (cur.is_ident(j, "from") && cur.is_ident(j + 1, "from")) {
            bindings.push(ImportBinding {
                imported: Imported::Default,
                local: cur.text(j).to_string(),
                type_only,
            });
            j += 1;
            if cur.is(j, ",") {
                j += 1;
            }
        }
        if cur.is(j, "*") {
            if !cur.is_ident(j + 1, "as") || !cur.is_any_ident(j + 2) {
                return Err(self.error(j, "malformed namespace import"));
            }
            bindings.push(ImportBinding {
                imported: Imported::Namespace,
                local: cur.text(j + 2).to_string(),
                type_only,
            });
            j += 3;
        } else if cur.is(j, "{") {
            let close = cur
                .matching(j)
                .ok_or_else(|| self.error(j, "unterminated import list"))?;
            for item in self.list_items(j + 1, close)? {
                bindings.push(ImportBinding {
                    imported: Imported::from_name(item.name),
                    local: item.alias,
                    type_only: type_only || item.type_only,
                });
            }
            j = close + 1;
        }

        if !cur.is_ident(j, "from") || bindings.is_empty() {
            return Err(self.error(j, "malformed import statement"));
        }
        let specifier = self.expect_string(j + 1, "import")?;
        let end = self.clause_end(j + 1);

        self.record.imports.push(ImportDecl {
            specifier,
            bindings,
            type_only,
            line,
            start: cur.start(i),
        });
        self.remove(i, end);
        Ok(end)
    }

    /// Items of a `{ a, b as c, type d }` list between `from..to`
    fn list_items(&self, from: usize, to: usize) -> Result<Vec<ListItem>, LexError> {
        let cur = self.cur;
        let mut items = Vec::new();
        let mut j = from;
        while j < to {
            if cur.is(j, ",") {
                j += 1;
                continue;
            }
            let mut k = j;
            while k < to && !cur.is(k, ",") {
                k += 1;
            }
            // tokens j..k form one item
            let mut parts: Vec<usize> = (j..k).collect();
            let mut type_only = false;
            if parts.len() >= 2
                && cur.is_ident(parts[0], "type")
                && (parts.len() == 2 || (parts.len() == 4 && cur.is_ident(parts[2], "as")))
            {
                type_only = true;
                parts.remove(0);
            }
            let name_of = |idx: usize| -> Option<String> {
                match cur.kind(idx) {
                    Some(TokenKind::Ident) => Some(cur.text(idx).to_string()),
                    Some(TokenKind::Str) => cur.string_value(idx),
                    _ => None,
                }
            };
            let (name, alias) = match parts.as_slice() {
                [n] => {
                    let name = name_of(*n).ok_or_else(|| self.error(*n, "malformed specifier list"))?;
                    (name.clone(), name)
                }
                [n, as_kw, a] if cur.is_ident(*as_kw, "as") => (
                    name_of(*n).ok_or_else(|| self.error(*n, "malformed specifier list"))?,
                    name_of(*a).ok_or_else(|| self.error(*a, "malformed specifier list"))?,
                ),
                _ => return Err(self.error(j, "malformed specifier list")),
            };
            items.push(ListItem {
                name,
                alias,
                type_only,
            });
            j = k;
        }
        Ok(items)
    }

    fn push_export(&mut self, entry: ExportEntry, at: usize) {
        self.record.exports.push(entry);
        self.record.export_starts.push(self.cur.start(at));
    }

    fn export_statement(&mut self, i: usize) -> Result<usize, LexError> {
        let cur = self.cur;
        let j = i + 1;

        if cur.is(j, "=") {
            return Err(self.error(i, "`export =` is not supported"));
        }
        if cur.is_ident(j, "import") {
            return Err(self.error(i, "`export import` is not supported"));
        }
        if cur.is_ident(j, "as") && cur.is_ident(j + 1, "namespace") {
            let end = cur.statement_end(i);
            self.remove(i, end);
            return Ok(end);
        }

        // export type { ... } / export type * from
        let list_type_only = cur.is_ident(j, "type") && (cur.is(j + 1, "{") || cur.is(j + 1, "*"));
        let k = if list_type_only { j + 1 } else { j };

        if cur.is(k, "*") {
            let (entry, spec) = if cur.is_ident(k + 1, "as") {
                let exported = match cur.kind(k + 2) {
                    Some(TokenKind::Str) => cur.string_value(k + 2),
                    Some(TokenKind::Ident) => Some(cur.text(k + 2).to_string()),
                    _ => None,
                }
                .ok_or_else(|| self.error(k, "malformed `export * as`"))?;
                if !cur.is_ident(k + 3, "from") {
                    return Err(self.error(k, "malformed `export * as`"));
                }
                let specifier = self.expect_string(k + 4, "export")?;
                (
                    ExportEntry::ReExport {
                        exported,
                        imported: Imported::Namespace,
                        specifier,
                        type_only: list_type_only,
                    },
                    k + 4,
                )
            } else {
                if !cur.is_ident(k + 1, "from") {
                    return Err(self.error(k, "malformed `export *`"));
                }
                let specifier = self.expect_string(k + 2, "export")?;
                (
                    ExportEntry::Star {
                        specifier,
                        type_only: list_type_only,
                    },
                    k + 2,
                )
            };
            let end = self.clause_end(spec);
            self.push_export(entry, i);
            self.remove(i, end);
            return Ok(end);
        }

        if cur.is(k, "{") {
            let close = cur
                .matching(k)
                .ok_or_else(|| self.error(k, "unterminated export list"))?;
            let items = self.list_items(k + 1, close)?;
            let (end, specifier) = if cur.is_ident(close + 1, "from") {
                let spec = self.expect_string(close + 2, "export")?;
                (self.clause_end(close + 2), Some(spec))
            } else if cur.is(close + 1, ";") {
                (close + 2, None)
            } else {
                (close + 1, None)
            };
            for item in items {
                let type_only = list_type_only || item.type_only;
                let entry = match &specifier {
                    Some(spec) => ExportEntry::ReExport {
                        exported: item.alias,
                        imported: Imported::from_name(item.name),
                        specifier: spec.clone(),
                        type_only,
                    },
                    None => ExportEntry::Local {
                        exported: item.alias,
                        local: item.name,
                        type_only,
                    },
                };
                self.push_export(entry, i);
            }
            self.remove(i, end);
            return Ok(end);
        }

        if cur.is_ident(j, "default") {
            return self.export_default(i);
        }

        self.export_declaration(i, j)
    }

    fn export_default(&mut self, i: usize) -> Result<usize, LexError> {
        let cur = self.cur;
        let d = i + 2;
        let mut k = d;
        if cur.is_ident(k, "async") && cur.is_ident(k + 1, "function") {
            k += 1;
        }
        if cur.is_ident(k, "abstract") && cur.is_ident(k + 1, "class") {
            k += 1;
        }

        if cur.is_ident(k, "interface") && cur.is_any_ident(k + 1) {
            let name = cur.text(k + 1).to_string();
            self.push_export(
                ExportEntry::Local {
                    exported: "default".into(),
                    local: name,
                    type_only: true,
                },
                i,
            );
            self.replace_prefix(i, d, String::new());
            return Ok(d);
        }

        let named = if cur.is_ident(k, "function") {
            let name_at = if cur.is(k + 1, "*") { k + 2 } else { k + 1 };
            cur.is_any_ident(name_at).then_some(name_at)
        } else if cur.is_ident(k, "class") {
            (cur.is_any_ident(k + 1) && !cur.is_ident(k + 1, "extends") && !cur.is_ident(k + 1, "implements"))
                .then_some(k + 1)
        } else {
            None
        };

        match named {
            Some(name_at) => {
                self.push_export(
                    ExportEntry::Local {
                        exported: "default".into(),
                        local: cur.text(name_at).to_string(),
                        type_only: false,
                    },
                    i,
                );
                self.replace_prefix(i, d, String::new());
            }
            None => {
                self.push_export(
                    ExportEntry::Local {
                        exported: "default".into(),
                        local: DEFAULT_LOCAL.into(),
                        type_only: false,
                    },
                    i,
                );
                self.replace_prefix(i, d, format!("const {} = ", DEFAULT_LOCAL));
            }
        }
        Ok(d)
    }

    fn export_declaration(&mut self, i: usize, j: usize) -> Result<usize, LexError> {
        let cur = self.cur;
        let mut k = j;
        let mut declared = false;
        if cur.is_ident(k, "declare") {
            declared = true;
            k += 1;
        }
        if cur.is_ident(k, "abstract") {
            k += 1;
        }
        if cur.is_ident(k, "async") {
            k += 1;
        }

        let keyword = cur.text(k);
        let mut names = Vec::new();
        let mut type_only = declared;
        match keyword {
            "const" | "let" | "var" => {
                if cur.is_ident(k + 1, "enum") {
                    return Err(self.error(k, "enum declarations are not supported"));
                }
                self.declarator_names(k + 1, &mut names);
            }
            "function" => {
                let name_at = if cur.is(k + 1, "*") { k + 2 } else { k + 1 };
                if !cur.is_any_ident(name_at) {
                    return Err(self.error(k, "exported function needs a name"));
                }
                names.push(cur.text(name_at).to_string());
            }
            "class" => {
                if !cur.is_any_ident(k + 1) {
                    return Err(self.error(k, "exported class needs a name"));
                }
                names.push(cur.text(k + 1).to_string());
            }
            "interface" | "type" if cur.is_any_ident(k + 1) => {
                type_only = true;
                names.push(cur.text(k + 1).to_string());
            }
            "enum" => return Err(self.error(k, "enum declarations are not supported")),
            "namespace" | "module" if declared => {
                type_only = true;
                if cur.is_any_ident(k + 1) {
                    names.push(cur.text(k + 1).to_string());
                }
            }
            "namespace" | "module" => {
                return Err(self.error(k, "runtime namespaces are not supported"))
            }
            _ => return Err(self.error(i, "malformed export statement")),
        }

        for name in names {
            self.push_export(
                ExportEntry::Local {
                    exported: name.clone(),
                    local: name,
                    type_only,
                },
                i,
            );
        }
        self.replace_prefix(i, j, String::new());
        Ok(j)
    }

    /// Names bound by `a = 1, { b, c } = d` after a declaration keyword
    fn declarator_names(&self, from: usize, names: &mut Vec<String>) {
        let cur = self.cur;
        let mut j = from;
        loop {
            j = cur.binding_names(j, names);
            if cur.is(j, "!") {
                j += 1;
            }
            if cur.is(j, ":") {
                j = cur.skip_type(j + 1);
            }
            if cur.is(j, "=") {
                j = cur.skip_expression(j + 1);
            }
            if cur.is(j, ",") {
                j += 1;
            } else {
                break;
            }
        }
    }
}

struct ListItem {
    name: String,
    alias: String,
    type_only: bool,
}
