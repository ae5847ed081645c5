//! Declarations of a single module
//!
//! Reads the original source of a TypeScript module and keeps only what a
//! declaration file may contain: types are copied, functions and methods lose
//! their bodies, variables keep their annotation or an inferred primitive
//! type. Imports and exports become namespace aliases.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{BuildWarning, TypeExtractionError};
use crate::external::is_identifier;
use crate::graph::{GraphModule, ModuleGraph, Target};
use crate::parser::{tokenize, Cursor, ExportEntry, Imported, SourceKind, TokenKind, DEFAULT_LOCAL};

/// Member name the default export is declared under
pub const DEFAULT_MEMBER: &str = "__default";

/// Type of a Vue component's default export
pub const COMPONENT_TYPE: &str = "import(\"vue\").DefineComponent<{}, {}, any>";

const CLASS_MODIFIERS: &[&str] = &[
    "public", "private", "protected", "static", "readonly", "abstract", "declare", "override",
    "async", "accessor",
];

const PARAMETER_MODIFIERS: &[&str] = &["public", "private", "protected", "readonly", "override"];

pub fn namespace(idx: usize) -> String {
    format!("__pk_m{}", idx)
}

pub fn external_namespace(ext: usize) -> String {
    format!("__pk_x{}", ext)
}

pub fn external_default(ext: usize) -> String {
    format!("__pk_x{}_default", ext)
}

fn member(name: &str) -> &str {
    if name == "default" {
        DEFAULT_MEMBER
    } else {
        name
    }
}

/// Externals the merged file has to import
#[derive(Debug, Default)]
pub struct ExternalUsage {
    pub namespaces: BTreeSet<usize>,
    pub defaults: BTreeSet<usize>,
}

#[derive(Debug, Default)]
pub struct Extracted {
    pub lines: Vec<String>,
    pub warnings: Vec<BuildWarning>,
}

/// Declarations for module `idx`, as lines of a `declare namespace` body.
pub fn extract(graph: &ModuleGraph, idx: usize, usage: &mut ExternalUsage) -> Extracted {
    let module = &graph.modules[idx];

    let mut list_names: HashMap<String, Vec<String>> = HashMap::new();
    for entry in &module.parsed.record.exports {
        if let ExportEntry::Local { exported, local, .. } = entry {
            list_names
                .entry(local.clone())
                .or_default()
                .push(member(exported).to_string());
        }
    }

    let mut extractor = Extractor {
        graph,
        module,
        usage,
        out: Extracted::default(),
        exported: HashSet::new(),
        list_names,
        aliases: HashMap::new(),
        overloads: HashSet::new(),
    };

    let tokens = if module.parsed.typed {
        tokenize(&module.parsed.code).ok()
    } else {
        None
    };
    match &tokens {
        Some(tokens) => {
            extractor.imports();
            extractor.walk(Cursor::new(&module.parsed.code, tokens));
        }
        None => extractor.untyped(),
    }
    extractor.exports();
    extractor.out
}

struct Extractor<'a> {
    graph: &'a ModuleGraph,
    module: &'a GraphModule,
    usage: &'a mut ExternalUsage,
    out: Extracted,
    /// Members already declared with `export`
    exported: HashSet<String>,
    /// Local name -> names it is exported under
    list_names: HashMap<String, Vec<String>>,
    /// Imported local -> (line index, entity) of its `import x = ...` alias
    aliases: HashMap<String, (usize, String)>,
    overloads: HashSet<String>,
}

impl Extractor<'_> {
    fn line(&mut self, line: String) {
        self.out.lines.push(line);
    }

    fn warn(&mut self, symbol: &str, reason: &str) {
        if !self.module.parsed.typed {
            return;
        }
        self.out
            .warnings
            .push(BuildWarning::TypeExtraction(TypeExtractionError {
                module: self.module.id.clone(),
                symbol: symbol.to_string(),
                reason: reason.to_string(),
            }));
    }

    /// Turn the import alias `name` into an exported one if it refers to `entity`.
    ///
    /// Returns whether `name` is taken by an import alias at all.
    fn promote_alias(&mut self, name: &str, entity: Option<&str>) -> bool {
        let Some((line, aliased)) = self.aliases.get(name) else {
            return false;
        };
        if entity.map_or(true, |e| e == aliased.as_str()) {
            self.out.lines[*line] = format!("export import {} = {};", name, aliased);
            self.exported.insert(name.to_string());
        }
        true
    }

    /// Export names that cannot be a namespace member are left out
    fn exportable(&mut self, name: &str) -> bool {
        if is_identifier(name) {
            return true;
        }
        self.warn(name, "export name is not an identifier");
        false
    }

    /// Whether a declaration of `name` is exported, recording it if so
    fn export_decl(&mut self, name: &str, exported: bool) -> &'static str {
        let listed = self
            .list_names
            .get(name)
            .is_some_and(|names| names.iter().any(|n| n == name));
        if exported || listed {
            self.exported.insert(name.to_string());
            "export "
        } else {
            ""
        }
    }

    /// Entity name for a binding imported from `specifier`
    fn reference(&mut self, specifier: &str, imported: &Imported) -> Option<String> {
        match self.module.target(specifier)? {
            Target::Internal(target) => {
                if self.graph.modules[target].parsed.kind == SourceKind::Css {
                    return None;
                }
                let ns = namespace(target);
                Some(match imported {
                    Imported::Namespace => ns,
                    Imported::Default => format!("{}.{}", ns, DEFAULT_MEMBER),
                    Imported::Named(name) => format!("{}.{}", ns, name),
                })
            }
            Target::External(ext) => Some(match imported {
                Imported::Namespace => {
                    self.usage.namespaces.insert(ext);
                    external_namespace(ext)
                }
                Imported::Default => {
                    self.usage.defaults.insert(ext);
                    external_default(ext)
                }
                Imported::Named(name) => {
                    self.usage.namespaces.insert(ext);
                    format!("{}.{}", external_namespace(ext), name)
                }
            }),
        }
    }

    fn imports(&mut self) {
        let record = &self.module.parsed.record;
        for decl in &record.imports {
            for binding in &decl.bindings {
                // `export { a } from` already declares `a` under the same name
                let re_exported = record.exports.iter().any(|e| {
                    matches!(e, ExportEntry::ReExport { exported, imported, specifier, .. }
                        if exported == &binding.local && imported == &binding.imported && specifier == &decl.specifier)
                });
                if re_exported {
                    continue;
                }
                match self.reference(&decl.specifier, &binding.imported) {
                    Some(entity) => {
                        self.line(format!("import {} = {};", binding.local, entity));
                        self.aliases
                            .insert(binding.local.clone(), (self.out.lines.len() - 1, entity));
                    }
                    None => self.line(format!("type {} = any;", binding.local)),
                }
            }
        }
    }

    /// JavaScript, JSON and script-less components: every value is `any`
    fn untyped(&mut self) {
        let entries: Vec<String> = self
            .module
            .parsed
            .record
            .exports
            .iter()
            .filter_map(|e| match e {
                ExportEntry::Local {
                    exported,
                    type_only: false,
                    ..
                } if is_identifier(member(exported)) => Some(member(exported).to_string()),
                _ => None,
            })
            .collect();
        for name in entries {
            let ty = if name == DEFAULT_MEMBER && self.module.parsed.kind == SourceKind::Vue {
                COMPONENT_TYPE
            } else {
                "any"
            };
            self.line(format!("export const {}: {};", name, ty));
            self.exported.insert(name);
        }
    }

    fn exports(&mut self) {
        let entries = self.module.parsed.record.exports.clone();
        for entry in &entries {
            match entry {
                ExportEntry::Local { exported, local, .. } => {
                    let name = member(exported).to_string();
                    if self.exported.contains(&name) || !self.module.parsed.typed || !self.exportable(&name) {
                        continue;
                    }
                    if name == *local && self.promote_alias(&name, None) {
                        continue;
                    }
                    let target = match self.aliases.get(local) {
                        Some((_, entity)) => entity.clone(),
                        None => local.clone(),
                    };
                    self.line(format!("export import {} = {};", name, target));
                    self.exported.insert(name);
                }
                ExportEntry::ReExport {
                    exported,
                    imported,
                    specifier,
                    ..
                } => {
                    let name = member(exported).to_string();
                    if self.exported.contains(&name) || !self.exportable(&name) {
                        continue;
                    }
                    let entity = self.reference(specifier, imported);
                    if self.promote_alias(&name, entity.as_deref()) {
                        continue;
                    }
                    let line = match entity {
                        Some(entity) => format!("export import {} = {};", name, entity),
                        None => format!("export type {} = any;", name),
                    };
                    self.line(line);
                    self.exported.insert(name);
                }
                ExportEntry::Star { .. } => {}
            }
        }

        for entry in &entries {
            if let ExportEntry::Star { specifier, .. } = entry {
                if let Some(Target::Internal(target)) = self.module.target(specifier) {
                    for name in super::surface_names(self.graph, target) {
                        if name == "default" || self.exported.contains(&name) || !is_identifier(&name) {
                            continue;
                        }
                        let entity = format!("{}.{}", namespace(target), name);
                        if self.promote_alias(&name, Some(entity.as_str())) {
                            continue;
                        }
                        self.line(format!("export import {} = {};", name, entity));
                        self.exported.insert(name);
                    }
                }
            }
        }
    }

    fn walk(&mut self, cur: Cursor<'_>) {
        let mut i = 0;
        while i < cur.len() {
            let end = cur.statement_end(i).max(i + 1);
            self.statement(cur, i, end);
            i = end;
        }
    }

    fn statement(&mut self, cur: Cursor<'_>, i: usize, end: usize) {
        if cur.is_ident(i, "import") && !cur.is(i + 1, "(") && !cur.is(i + 1, ".") {
            return;
        }
        if !cur.is_ident(i, "export") {
            self.declaration(cur, i, end, false);
            return;
        }
        if cur.is_ident(i + 1, "default") {
            self.export_default(cur, i + 2, end);
            return;
        }
        let list = cur.is(i + 1, "{") || cur.is(i + 1, "*");
        let type_list = cur.is_ident(i + 1, "type") && (cur.is(i + 2, "{") || cur.is(i + 2, "*"));
        if !list && !type_list {
            self.declaration(cur, i + 1, end, true);
        }
    }

    fn declaration(&mut self, cur: Cursor<'_>, from: usize, end: usize, exported: bool) {
        let mut k = from;
        if cur.is_ident(k, "declare") {
            k += 1;
        }
        match cur.text(k) {
            "interface" if cur.is_any_ident(k + 1) => self.copy(cur, k, end, exported),
            "type" if cur.is_any_ident(k + 1) && !cur.is(k + 1, "{") => self.copy(cur, k, end, exported),
            "namespace" | "module" if cur.is_any_ident(k + 1) && k > from => self.copy(cur, k, end, exported),
            "abstract" if cur.is_ident(k + 1, "class") => self.class(cur, k, end, exported, None),
            "class" => self.class(cur, k, end, exported, None),
            "async" if cur.is_ident(k + 1, "function") => self.function(cur, k, exported, None),
            "function" => self.function(cur, k, exported, None),
            "const" | "let" | "var" if cur.kind(k) == Some(TokenKind::Ident) => {
                self.variables(cur, k, end, exported)
            }
            _ => {}
        }
    }

    /// Copy a type-level declaration as written
    fn copy(&mut self, cur: Cursor<'_>, k: usize, end: usize, exported: bool) {
        let name = cur.text(k + 1).to_string();
        let prefix = self.export_decl(&name, exported);
        let mut text = cur.slice(k, end).trim_end().to_string();
        if !text.ends_with(';') && !text.ends_with('}') {
            text.push(';');
        }
        self.line(format!("{}{}", prefix, text));
    }

    fn export_default(&mut self, cur: Cursor<'_>, d: usize, end: usize) {
        let mut k = d;
        if cur.is_ident(k, "async") || cur.is_ident(k, "abstract") {
            k += 1;
        }
        let named = cur.is_any_ident(k + 1)
            && !cur.is_ident(k + 1, "extends")
            && !cur.is_ident(k + 1, "implements");

        if cur.is_ident(k, "interface") || ((cur.is_ident(k, "function") || cur.is_ident(k, "class")) && named) {
            let name_at = if cur.is(k + 1, "*") { k + 2 } else { k + 1 };
            let name = cur.text(name_at).to_string();
            self.declaration(cur, d, end, false);
            self.line(format!("export import {} = {};", DEFAULT_MEMBER, name));
            self.exported.insert(DEFAULT_MEMBER.to_string());
            return;
        }
        if cur.is_ident(k, "function") {
            self.function(cur, d, true, Some(DEFAULT_MEMBER));
            return;
        }
        if cur.is_ident(k, "class") {
            self.class(cur, d, end, true, Some(DEFAULT_MEMBER));
            return;
        }

        let expr_end = if cur.is(end - 1, ";") { end - 1 } else { end };
        if expr_end == d + 1 && cur.is_any_ident(d) {
            self.line(format!("export import {} = {};", DEFAULT_MEMBER, cur.text(d)));
            self.exported.insert(DEFAULT_MEMBER.to_string());
            return;
        }

        let ty = match self.infer(cur, d, expr_end, "default") {
            Some(ty) => ty,
            None if self.module.parsed.kind == SourceKind::Vue => COMPONENT_TYPE.to_string(),
            None => {
                self.warn("default", "cannot infer the type of the default export");
                "any".to_string()
            }
        };
        self.line(format!("export const {}: {};", DEFAULT_MEMBER, ty));
        self.exported.insert(DEFAULT_MEMBER.to_string());
    }

    fn function(&mut self, cur: Cursor<'_>, k: usize, exported: bool, name_override: Option<&str>) {
        let mut j = k;
        let is_async = cur.is_ident(j, "async");
        if is_async {
            j += 1;
        }
        j += 1;
        let generator = cur.is(j, "*");
        if generator {
            j += 1;
        }
        let name = match name_override {
            Some(name) => {
                if cur.is_any_ident(j) {
                    j += 1;
                }
                name.to_string()
            }
            None if cur.is_any_ident(j) => {
                j += 1;
                cur.text(j - 1).to_string()
            }
            None => return,
        };

        let type_params = self.type_params(cur, &mut j);
        if !cur.is(j, "(") {
            return;
        }
        let Some(close) = cur.matching(j) else {
            return;
        };
        let (params, _) = self.params(cur, j, close, &name);
        let mut after = close + 1;
        let annotated = if cur.is(after, ":") {
            let type_end = cur.skip_type(after + 1);
            let ty = cur.slice(after + 1, type_end).to_string();
            after = type_end;
            Some(ty)
        } else {
            None
        };

        let has_body = cur.is(after, "{");
        if !has_body {
            self.overloads.insert(name.clone());
        } else if self.overloads.contains(&name) {
            return;
        }

        let ret = match annotated {
            Some(ty) => ty,
            None if has_body && !generator => match cur.matching(after) {
                Some(body_end) => self.body_return(cur, after, body_end, is_async, &name),
                None => "any".to_string(),
            },
            None => {
                self.warn(&name, "missing return type annotation");
                "any".to_string()
            }
        };

        let prefix = self.export_decl(&name, exported);
        self.line(format!(
            "{}function {}{}({}): {};",
            prefix, name, type_params, params, ret
        ));
    }

    fn type_params(&self, cur: Cursor<'_>, j: &mut usize) -> String {
        if !cur.is(*j, "<") {
            return String::new();
        }
        match cur.matching_angle(*j) {
            Some(close) => {
                let text = cur.slice(*j, close + 1).to_string();
                *j = close + 1;
                text
            }
            None => String::new(),
        }
    }

    /// Return type of an unannotated body: `void` when nothing is returned
    fn body_return(&mut self, cur: Cursor<'_>, open: usize, close: usize, is_async: bool, symbol: &str) -> String {
        let returns_value = (open + 1..close).any(|t| {
            cur.is_ident(t, "return") && !cur.is(t + 1, ";") && !cur.is(t + 1, "}") && !cur.newline_before(t + 1)
        });
        if returns_value {
            self.warn(symbol, "missing return type annotation");
            return if is_async { "Promise<any>" } else { "any" }.to_string();
        }
        if is_async { "Promise<void>" } else { "void" }.to_string()
    }

    /// Parameter list without initializers or modifiers.
    ///
    /// Also returns the parameter properties a constructor declares.
    fn params(&mut self, cur: Cursor<'_>, open: usize, close: usize, symbol: &str) -> (String, Vec<String>) {
        let mut parts = Vec::new();
        let mut depth = 0usize;
        let mut start = open + 1;
        let mut t = open + 1;
        while t < close {
            match cur.text(t) {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                "<" if depth == 0 => {
                    if let Some(c) = cur.matching_angle(t) {
                        t = c;
                    }
                }
                "," if depth == 0 => {
                    parts.push((start, t));
                    start = t + 1;
                }
                _ => {}
            }
            t += 1;
        }
        if start < close {
            parts.push((start, close));
        }

        let mut rendered = Vec::new();
        let mut properties = Vec::new();
        for (n, (from, to)) in parts.into_iter().enumerate() {
            let mut a = from;
            let mut modifiers = Vec::new();
            while a + 1 < to
                && PARAMETER_MODIFIERS.contains(&cur.text(a))
                && (cur.is_any_ident(a + 1) || cur.is(a + 1, "{") || cur.is(a + 1, "["))
            {
                if cur.text(a) != "override" {
                    modifiers.push(cur.text(a));
                }
                a += 1;
            }

            let (mut eq, mut colon) = (None, None);
            let mut d = 0usize;
            for t in a..to {
                match cur.text(t) {
                    "(" | "[" | "{" => d += 1,
                    ")" | "]" | "}" => d = d.saturating_sub(1),
                    ":" if d == 0 && colon.is_none() && eq.is_none() => colon = Some(t),
                    "=" if d == 0 && eq.is_none() => eq = Some(t),
                    _ => {}
                }
            }
            let pre_end = eq.unwrap_or(to);
            let name_end = colon.unwrap_or(pre_end);
            let raw = cur.slice(a, name_end);
            let optional = raw.ends_with('?') || eq.is_some();
            let raw = raw.trim_end_matches('?').trim();
            let rest = raw.starts_with("...");
            let bare = raw.trim_start_matches("...");
            let name = if bare.starts_with('{') || bare.starts_with('[') {
                format!("{}arg{}", if rest { "..." } else { "" }, n)
            } else {
                raw.to_string()
            };

            let ty = match (colon, eq) {
                (Some(c), _) => cur.slice(c + 1, pre_end).to_string(),
                (None, Some(e)) => self
                    .infer(cur, e + 1, to, symbol)
                    .unwrap_or_else(|| "any".to_string()),
                (None, None) if rest => "any[]".to_string(),
                (None, None) => "any".to_string(),
            };
            let mark = if optional && !rest { "?" } else { "" };
            rendered.push(format!("{}{}: {}", name, mark, ty));

            if !modifiers.is_empty() {
                if modifiers.contains(&"private") {
                    properties.push(format!("private {};", name));
                } else {
                    properties.push(format!("{} {}{}: {};", modifiers.join(" "), name, mark, ty));
                }
            }
        }
        (rendered.join(", "), properties)
    }

    fn class(&mut self, cur: Cursor<'_>, k: usize, end: usize, exported: bool, name_override: Option<&str>) {
        let mut j = k;
        let is_abstract = cur.is_ident(j, "abstract");
        if is_abstract {
            j += 1;
        }
        j += 1;
        let named = cur.is_any_ident(j) && !cur.is_ident(j, "extends") && !cur.is_ident(j, "implements");
        let name = match (name_override, named) {
            (Some(name), named) => {
                if named {
                    j += 1;
                }
                name.to_string()
            }
            (None, true) => {
                j += 1;
                cur.text(j - 1).to_string()
            }
            (None, false) => return,
        };

        let mut open = j;
        while open < end && !cur.is(open, "{") {
            open = match cur.text(open) {
                "(" | "[" => cur.matching(open).map(|c| c + 1).unwrap_or(end),
                "<" => cur.matching_angle(open).map(|c| c + 1).unwrap_or(open + 1),
                _ => open + 1,
            };
        }
        let Some(close) = cur.matching(open) else {
            return;
        };
        let heritage = cur.slice(j, open);
        let heritage = match heritage.chars().next() {
            None => String::new(),
            Some('<') => heritage.to_string(),
            Some(_) => format!(" {}", heritage),
        };

        let members = self.members(cur, open + 1, close, &name);
        let prefix = self.export_decl(&name, exported);
        let mut lines = vec![format!(
            "{}{}class {}{} {{",
            prefix,
            if is_abstract { "abstract " } else { "" },
            name,
            heritage
        )];
        lines.extend(members.into_iter().map(|m| format!("    {}", m)));
        lines.push("}".to_string());
        self.line(lines.join("\n"));
    }

    fn members(&mut self, cur: Cursor<'_>, from: usize, to: usize, class: &str) -> Vec<String> {
        let mut lines = Vec::new();
        let mut declared: HashSet<String> = HashSet::new();
        let mut bodiless: HashSet<String> = HashSet::new();
        let mut j = from;

        while j < to {
            if cur.is(j, ";") {
                j += 1;
                continue;
            }
            let member_start = j;

            let mut modifiers = Vec::new();
            let mut private = false;
            while CLASS_MODIFIERS.contains(&cur.text(j))
                && cur.kind(j) == Some(TokenKind::Ident)
                && !matches!(cur.text(j + 1), "(" | ":" | "=" | ";" | "?" | "!" | "<" | "}")
            {
                match cur.text(j) {
                    "private" => private = true,
                    "public" | "protected" | "static" | "readonly" | "abstract" => modifiers.push(cur.text(j)),
                    _ => {}
                }
                j += 1;
            }

            if modifiers.contains(&"static") && cur.is(j, "{") {
                j = cur.matching(j).map(|c| c + 1).unwrap_or(to);
                continue;
            }

            let accessor = if (cur.is_ident(j, "get") || cur.is_ident(j, "set"))
                && !matches!(cur.text(j + 1), "(" | ":" | "=" | ";" | "?" | "<" | "}")
            {
                j += 1;
                Some(cur.text(j - 1))
            } else {
                None
            };
            if cur.is(j, "*") {
                j += 1;
            }

            if cur.is(j, "[") {
                let Some(bracket) = cur.matching(j) else {
                    break;
                };
                if cur.is_any_ident(j + 1) && cur.is(j + 2, ":") && cur.is(bracket + 1, ":") {
                    let type_end = cur.skip_type(bracket + 2);
                    lines.push(format!("{};", cur.slice(member_start, type_end)));
                    j = type_end;
                } else {
                    j = skip_member(cur, bracket + 1, to);
                }
                continue;
            }

            let name = cur.text(j).to_string();
            if name.starts_with('#') || name.is_empty() {
                j = skip_member(cur, j + 1, to);
                continue;
            }
            j += 1;
            let mut optional = false;
            if cur.is(j, "?") {
                optional = true;
                j += 1;
            }
            if cur.is(j, "!") {
                j += 1;
            }
            let mark = if optional { "?" } else { "" };
            let symbol = format!("{}.{}", class, name);
            let mods = if modifiers.is_empty() {
                String::new()
            } else {
                format!("{} ", modifiers.join(" "))
            };

            if cur.is(j, "<") || cur.is(j, "(") {
                let type_params = self.type_params(cur, &mut j);
                let Some(close) = cur.matching(j).filter(|_| cur.is(j, "(")) else {
                    break;
                };
                let (params, properties) = self.params(cur, j, close, &symbol);
                let mut after = close + 1;
                let annotated = if cur.is(after, ":") {
                    let type_end = cur.skip_type(after + 1);
                    let ty = cur.slice(after + 1, type_end).to_string();
                    after = type_end;
                    Some(ty)
                } else {
                    None
                };
                let body_end = if cur.is(after, "{") {
                    cur.matching(after)
                } else {
                    None
                };
                j = match body_end {
                    Some(c) => c + 1,
                    None if cur.is(after, ";") => after + 1,
                    None => after,
                };

                if body_end.is_none() {
                    bodiless.insert(name.clone());
                } else if bodiless.contains(&name) && accessor.is_none() {
                    continue;
                }

                if private {
                    if declared.insert(name.clone()) {
                        lines.push(format!("{}private {};", mods, name));
                    }
                    continue;
                }
                if name == "constructor" {
                    lines.extend(properties);
                    lines.push(format!("constructor({});", params));
                    continue;
                }
                match accessor {
                    Some("set") => lines.push(format!("{}set {}({});", mods, name, params)),
                    Some(_) => {
                        let ret = annotated.unwrap_or_else(|| {
                            self.warn(&symbol, "missing getter type annotation");
                            "any".to_string()
                        });
                        lines.push(format!("{}get {}(): {};", mods, name, ret));
                    }
                    None => {
                        let ret = match (annotated, body_end) {
                            (Some(ty), _) => ty,
                            (None, Some(c)) => self.body_return(cur, after, c, false, &symbol),
                            (None, None) => "any".to_string(),
                        };
                        lines.push(format!("{}{}{}{}({}): {};", mods, name, mark, type_params, params, ret));
                    }
                }
                continue;
            }

            let mut ty = None;
            if cur.is(j, ":") {
                let type_end = cur.skip_type(j + 1);
                ty = Some(cur.slice(j + 1, type_end).to_string());
                j = type_end;
            }
            if cur.is(j, "=") {
                let init_end = cur.skip_expression(j + 1);
                if ty.is_none() {
                    ty = Some(self.infer(cur, j + 1, init_end, &symbol).unwrap_or_else(|| {
                        self.warn(&symbol, "cannot infer the type of the initializer");
                        "any".to_string()
                    }));
                }
                j = init_end;
            }
            if cur.is(j, ";") || cur.is(j, ",") {
                j += 1;
            }
            if j == member_start {
                j += 1;
            }

            if private {
                lines.push(format!("{}private {};", mods, name));
            } else {
                let ty = ty.unwrap_or_else(|| "any".to_string());
                lines.push(format!("{}{}{}: {};", mods, name, mark, ty));
            }
        }
        lines
    }

    fn variables(&mut self, cur: Cursor<'_>, k: usize, end: usize, exported: bool) {
        let keyword = cur.text(k).to_string();
        let mut j = k + 1;
        while j < end {
            if cur.is_any_ident(j) && !cur.is(j, "{") && !cur.is(j, "[") {
                let name = cur.text(j).to_string();
                j += 1;
                if cur.is(j, "!") {
                    j += 1;
                }
                let mut ty = None;
                if cur.is(j, ":") {
                    let type_end = cur.skip_type(j + 1);
                    ty = Some(cur.slice(j + 1, type_end).to_string());
                    j = type_end;
                }
                if cur.is(j, "=") {
                    let init_end = cur.skip_expression(j + 1);
                    if ty.is_none() {
                        ty = Some(self.initializer_type(cur, j + 1, init_end, &name));
                    }
                    j = init_end;
                }
                let prefix = self.export_decl(&name, exported);
                let ty = ty.unwrap_or_else(|| "any".to_string());
                self.line(format!("{}{} {}: {};", prefix, keyword, name, ty));
            } else {
                let mut names = Vec::new();
                j = cur.binding_names(j, &mut names);
                if cur.is(j, ":") {
                    j = cur.skip_type(j + 1);
                }
                if cur.is(j, "=") {
                    j = cur.skip_expression(j + 1);
                }
                for name in names {
                    self.warn(&name, "destructured declarations are typed any");
                    let prefix = self.export_decl(&name, exported);
                    self.line(format!("{}{} {}: any;", prefix, keyword, name));
                }
            }
            if cur.is(j, ",") {
                j += 1;
            } else {
                break;
            }
        }
    }

    fn initializer_type(&mut self, cur: Cursor<'_>, from: usize, to: usize, name: &str) -> String {
        if let Some(ty) = self.infer(cur, from, to, name) {
            return ty;
        }
        if name == DEFAULT_LOCAL && self.module.parsed.kind == SourceKind::Vue {
            return COMPONENT_TYPE.to_string();
        }
        self.warn(name, "cannot infer the type of the initializer");
        "any".to_string()
    }

    /// Type of the expression `from..to`, when it is evident
    fn infer(&mut self, cur: Cursor<'_>, from: usize, to: usize, symbol: &str) -> Option<String> {
        if from >= to {
            return None;
        }

        let mut depth = 0usize;
        let mut cast = None;
        for t in from..to {
            match cur.text(t) {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                "as" | "satisfies" if depth == 0 && cur.kind(t) == Some(TokenKind::Ident) && t > from => {
                    cast = Some(t)
                }
                _ => {}
            }
        }
        if let Some(t) = cast {
            let target = cur.slice(t + 1, to);
            if cur.is_ident(t, "satisfies") || target == "const" {
                return self.infer(cur, from, t, symbol);
            }
            return Some(target.to_string());
        }

        if to == from + 1 {
            return match cur.kind(from)? {
                TokenKind::Number => Some("number".into()),
                TokenKind::Str | TokenKind::Template => Some("string".into()),
                TokenKind::Regex => Some("RegExp".into()),
                TokenKind::Ident if matches!(cur.text(from), "true" | "false") => Some("boolean".into()),
                _ => None,
            };
        }
        if cur.is(from, "-") && to == from + 2 && cur.kind(from + 1) == Some(TokenKind::Number) {
            return Some("number".into());
        }
        if cur.is(from, "!") {
            return Some("boolean".into());
        }

        if cur.is_ident(from, "new") {
            let mut j = from + 1;
            while cur.is_any_ident(j) && (cur.is(j + 1, ".") || !cur.is_any_ident(j + 1)) {
                if cur.is(j + 1, ".") {
                    j += 2;
                } else {
                    j += 1;
                    break;
                }
            }
            let mut ty = cur.slice(from + 1, j).to_string();
            ty.push_str(&self.type_params(cur, &mut j));
            if cur.is(j, "(") && cur.matching(j) == Some(to - 1) && !ty.is_empty() {
                return Some(ty);
            }
            return None;
        }

        if cur.is(from, "[") && cur.matching(from) == Some(to - 1) {
            return array_type(cur, from + 1, to - 1);
        }

        self.function_type(cur, from, to, symbol)
    }

    /// `(a: T) => R` for arrow functions and function expressions
    fn function_type(&mut self, cur: Cursor<'_>, from: usize, to: usize, symbol: &str) -> Option<String> {
        let mut j = from;
        let is_async = cur.is_ident(j, "async") && !cur.is(j + 1, "=>");
        if is_async {
            j += 1;
        }
        if cur.is_ident(j, "function") {
            j += 1;
            if cur.is(j, "*") {
                return None;
            }
            if cur.is_any_ident(j) && !cur.is(j, "(") {
                j += 1;
            }
        }

        let type_params = self.type_params(cur, &mut j);
        let (params, after_params) = if cur.is(j, "(") {
            let close = cur.matching(j)?;
            (self.params(cur, j, close, symbol).0, close + 1)
        } else if cur.is_any_ident(j) && cur.is(j + 1, "=>") {
            (format!("{}: any", cur.text(j)), j + 1)
        } else {
            return None;
        };

        let mut k = after_params;
        let annotated = if cur.is(k, ":") {
            let type_end = cur.skip_type(k + 1);
            let ty = cur.slice(k + 1, type_end).to_string();
            k = type_end;
            Some(ty)
        } else {
            None
        };
        if cur.is(k, "=>") {
            k += 1;
        }
        if k >= to {
            return None;
        }

        let ret = match annotated {
            Some(ty) => ty,
            None if cur.is(k, "{") => {
                let close = cur.matching(k)?;
                self.body_return(cur, k, close, is_async, symbol)
            }
            None => match self.infer(cur, k, to, symbol) {
                Some(ty) if is_async => format!("Promise<{}>", ty),
                Some(ty) => ty,
                None => {
                    self.warn(symbol, "missing return type annotation");
                    if is_async { "Promise<any>" } else { "any" }.to_string()
                }
            },
        };
        Some(format!("{}({}) => {}", type_params, params, ret))
    }
}

fn array_type(cur: Cursor<'_>, from: usize, to: usize) -> Option<String> {
    if from == to {
        return Some("any[]".into());
    }
    let mut element: Option<&str> = None;
    let mut t = from;
    while t < to {
        let ty = match cur.kind(t)? {
            TokenKind::Number => "number",
            TokenKind::Str | TokenKind::Template => "string",
            TokenKind::Ident if matches!(cur.text(t), "true" | "false") => "boolean",
            _ => return None,
        };
        if element.is_some_and(|e| e != ty) {
            return None;
        }
        element = Some(ty);
        t += 1;
        if t < to {
            if !cur.is(t, ",") {
                return None;
            }
            t += 1;
        }
    }
    element.map(|e| format!("{}[]", e))
}

/// Skip the rest of a class member starting after its key
fn skip_member(cur: Cursor<'_>, from: usize, to: usize) -> usize {
    let mut j = from;
    while j < to {
        match cur.text(j) {
            ";" => return j + 1,
            "(" | "[" => j = cur.matching(j).map(|c| c + 1).unwrap_or(to),
            "{" => return cur.matching(j).map(|c| c + 1).unwrap_or(to),
            "=" => {
                let end = cur.skip_expression(j + 1);
                return if cur.is(end, ";") { end + 1 } else { end.max(j + 1) };
            }
            _ => j += 1,
        }
    }
    to
}
