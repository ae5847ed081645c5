//! Source parsing
//!
//! Turns one source file into a [`ParsedModule`]: the module body, its
//! import/export record, and the edits that strip module syntax and
//! TypeScript from the body. Emitters apply the edits; the declaration pass
//! reads the untouched source.

pub mod cursor;
pub mod lexer;
pub mod scanner;
pub mod sfc;
pub mod typescript;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::{BuildWarning, PackError, PackResult};

pub use cursor::Cursor;
pub use lexer::{tokenize, LexError, Token, TokenKind};
pub use scanner::{
    DynamicImport, ExportEntry, ImportBinding, ImportDecl, Imported, ModuleRecord, DEFAULT_LOCAL,
};

/// Replace `start..end` of a source text with `text`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Edit {
    fn overlaps(&self, other: &Edit) -> bool {
        if self.start == self.end {
            return other.start < self.start && self.start < other.end;
        }
        self.start < other.end && other.start < self.end
    }
}

/// Apply sorted edits; an edit starting inside an earlier one is skipped.
pub fn apply_edits(src: &str, edits: &[Edit]) -> String {
    let mut out = String::with_capacity(src.len());
    let mut pos = 0;
    for edit in edits {
        if edit.start < pos {
            continue;
        }
        out.push_str(&src[pos..edit.start]);
        out.push_str(&edit.text);
        pos = edit.end;
    }
    out.push_str(&src[pos..]);
    out
}

/// What kind of source a module file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Js,
    Ts,
    Vue,
    Json,
    Css,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        match ext {
            "ts" | "mts" | "cts" | "tsx" => SourceKind::Ts,
            "vue" => SourceKind::Vue,
            "json" => SourceKind::Json,
            "css" | "scss" | "sass" | "less" => SourceKind::Css,
            _ => SourceKind::Js,
        }
    }

    /// Whether the module contributes code to the bundles
    pub fn is_runtime(self) -> bool {
        !matches!(self, SourceKind::Css)
    }
}

/// A module ready for emission and declaration extraction
#[derive(Debug, Clone)]
pub struct ParsedModule {
    pub kind: SourceKind,
    /// Source carries TypeScript syntax
    pub typed: bool,
    /// Script body the edits apply to
    pub code: String,
    pub record: ModuleRecord,
    pub edits: Vec<Edit>,
    /// Vue `<template>` markup attached to the default export
    pub template: Option<String>,
    /// Stylesheets contributed by this module
    pub styles: Vec<String>,
    /// Top-level names declared only as types
    pub type_names: HashSet<String>,
    pub warnings: Vec<BuildWarning>,
}

impl ParsedModule {
    fn empty(kind: SourceKind) -> Self {
        Self {
            kind,
            typed: false,
            code: String::new(),
            record: ModuleRecord::default(),
            edits: Vec::new(),
            template: None,
            styles: Vec::new(),
            type_names: HashSet::new(),
            warnings: Vec::new(),
        }
    }

    /// Module body with module syntax and types stripped, plus `extra` edits
    pub fn body(&self, extra: Vec<Edit>) -> String {
        if extra.is_empty() {
            return apply_edits(&self.code, &self.edits);
        }
        let mut edits = self.edits.clone();
        edits.extend(extra);
        edits.sort_by_key(|e| (e.start, e.end));
        apply_edits(&self.code, &edits)
    }

    /// Local name bound to the default export, if the module has one
    pub fn default_local(&self) -> Option<&str> {
        self.record.exports.iter().find_map(|e| match e {
            ExportEntry::Local {
                exported,
                local,
                type_only: false,
            } if exported == "default" => Some(local.as_str()),
            _ => None,
        })
    }
}

fn syntax_error(id: &str, offset: usize, err: LexError) -> PackError {
    PackError::parse(id, err.line + offset, err.message)
}

/// Parse one module's source text.
pub fn parse_module(id: &str, kind: SourceKind, text: &str) -> PackResult<ParsedModule> {
    match kind {
        SourceKind::Json => parse_json(id, text),
        SourceKind::Css => {
            let mut module = ParsedModule::empty(kind);
            module.styles.push(text.to_string());
            Ok(module)
        }
        SourceKind::Vue => parse_vue(id, text),
        SourceKind::Js | SourceKind::Ts => parse_script(id, kind, text, kind == SourceKind::Ts, 0),
    }
}

fn parse_json(id: &str, text: &str) -> PackResult<ParsedModule> {
    if let Err(e) = serde_json::from_str::<serde_json::Value>(text) {
        return Err(PackError::parse(id, e.line(), format!("invalid JSON: {}", e)));
    }
    let mut module = ParsedModule::empty(SourceKind::Json);
    module.code = format!("const {} = {};\n", DEFAULT_LOCAL, text.trim());
    module.record.exports.push(ExportEntry::Local {
        exported: "default".into(),
        local: DEFAULT_LOCAL.into(),
        type_only: false,
    });
    module.record.export_starts.push(0);
    Ok(module)
}

fn parse_vue(id: &str, text: &str) -> PackResult<ParsedModule> {
    let sfc = sfc::split(text).map_err(|e| syntax_error(id, 0, e))?;

    if let Some(setup) = &sfc.script_setup {
        return Err(PackError::parse(
            id,
            setup.line,
            "<script setup> is not supported; use a <script> block with defineComponent",
        ));
    }

    let mut module = match &sfc.script {
        Some(script) => {
            let typed = matches!(script.lang(), Some("ts" | "tsx"));
            parse_script(id, SourceKind::Vue, &script.content, typed, script.line - 1)?
        }
        None => ParsedModule::empty(SourceKind::Vue),
    };

    if module.default_local().is_none() {
        module
            .code
            .push_str(&format!("\nconst {} = {{}};\n", DEFAULT_LOCAL));
        module.record.exports.push(ExportEntry::Local {
            exported: "default".into(),
            local: DEFAULT_LOCAL.into(),
            type_only: false,
        });
        module.record.export_starts.push(module.code.len());
    }

    module.template = sfc.template.map(|t| t.content.trim().to_string());

    for style in sfc.styles {
        if style.has("scoped") {
            module.warnings.push(BuildWarning::Unsupported {
                module: id.to_string(),
                message: "scoped styles are emitted unscoped".into(),
            });
        }
        if let Some(lang) = style.lang().filter(|l| *l != "css") {
            module.warnings.push(BuildWarning::Unsupported {
                module: id.to_string(),
                message: format!("<style lang=\"{}\"> is copied without preprocessing", lang),
            });
        }
        module.styles.push(style.content.trim().to_string());
    }
    Ok(module)
}

fn parse_script(
    id: &str,
    kind: SourceKind,
    code: &str,
    typed: bool,
    line_offset: usize,
) -> PackResult<ParsedModule> {
    let tokens = tokenize(code).map_err(|e| syntax_error(id, line_offset, e))?;
    let cur = Cursor::new(code, &tokens);

    let mut record = scanner::scan(cur).map_err(|e| syntax_error(id, line_offset, e))?;
    let erasure = if typed {
        typescript::erase(cur).map_err(|e| syntax_error(id, line_offset, e))?
    } else {
        typescript::Erasure::default()
    };

    // Erasures never cut into module syntax rewrites.
    let kept: Vec<Edit> = erasure
        .edits
        .iter()
        .filter(|e| !record.rewrites.iter().any(|r| e.overlaps(r) || r.overlaps(e)))
        .cloned()
        .collect();

    for dynamic in &mut record.dynamic_imports {
        if kept
            .iter()
            .any(|e| e.start <= dynamic.start && dynamic.end <= e.end && e.start < e.end)
        {
            dynamic.type_only = true;
        }
    }

    let mut edits = std::mem::take(&mut record.rewrites);
    edits.extend(kept);
    edits.sort_by_key(|e| (e.start, e.end));

    link_local_exports(&mut record, &erasure.type_names);
    if typed {
        let referenced = referenced_names(cur, &edits);
        elide_type_imports(&mut record, &referenced);
    }
    dedup_exports(&mut record);

    let mut module = ParsedModule::empty(kind);
    module.typed = typed;
    module.code = code.to_string();
    module.record = record;
    module.edits = edits;
    module.type_names = erasure.type_names;
    Ok(module)
}

/// `import { a } from "m"; export { a }` re-exports `a` from `m`;
/// exports of type-only names are type-only.
fn link_local_exports(record: &mut ModuleRecord, type_names: &HashSet<String>) {
    let mut imported: HashMap<&str, (&ImportDecl, &ImportBinding)> = HashMap::new();
    for decl in &record.imports {
        for binding in &decl.bindings {
            imported.insert(binding.local.as_str(), (decl, binding));
        }
    }

    let linked: Vec<ExportEntry> = record
        .exports
        .iter()
        .map(|entry| match entry {
            ExportEntry::Local {
                exported,
                local,
                type_only,
            } => match imported.get(local.as_str()) {
                Some((decl, binding)) => ExportEntry::ReExport {
                    exported: exported.clone(),
                    imported: binding.imported.clone(),
                    specifier: decl.specifier.clone(),
                    type_only: *type_only || decl.type_only || binding.type_only,
                },
                None => ExportEntry::Local {
                    exported: exported.clone(),
                    local: local.clone(),
                    type_only: *type_only || type_names.contains(local),
                },
            },
            other => other.clone(),
        })
        .collect();
    record.exports = linked;
}

/// Identifiers the stripped body still mentions
fn referenced_names(cur: Cursor<'_>, edits: &[Edit]) -> HashSet<String> {
    let removed: Vec<(usize, usize)> = edits
        .iter()
        .filter(|e| e.start < e.end)
        .map(|e| (e.start, e.end))
        .collect();

    let mut names = HashSet::new();
    let mut r = 0;
    for (i, token) in cur.tokens.iter().enumerate() {
        while r < removed.len() && removed[r].1 <= token.start {
            r += 1;
        }
        if r < removed.len() && removed[r].0 <= token.start {
            continue;
        }
        if token.kind != TokenKind::Ident {
            continue;
        }
        if i > 0 && (cur.is(i - 1, ".") || cur.is(i - 1, "?.")) {
            continue;
        }
        names.insert(cur.text(i).to_string());
    }
    names
}

/// Drop import bindings only used as types
fn elide_type_imports(record: &mut ModuleRecord, referenced: &HashSet<String>) {
    let reexported: HashSet<(String, Imported)> = record
        .exports
        .iter()
        .filter_map(|e| match e {
            ExportEntry::ReExport {
                specifier,
                imported,
                type_only: false,
                ..
            } => Some((specifier.clone(), imported.clone())),
            _ => None,
        })
        .collect();

    for decl in &mut record.imports {
        if decl.type_only || decl.bindings.is_empty() {
            continue;
        }
        for binding in &mut decl.bindings {
            if !binding.type_only
                && !referenced.contains(&binding.local)
                && !reexported.contains(&(decl.specifier.clone(), binding.imported.clone()))
            {
                binding.type_only = true;
            }
        }
        decl.type_only = decl.bindings.iter().all(|b| b.type_only);
    }
}

fn dedup_exports(record: &mut ModuleRecord) {
    let mut seen = HashSet::new();
    let mut exports = Vec::new();
    let mut starts = Vec::new();
    for (entry, start) in record.exports.drain(..).zip(record.export_starts.drain(..)) {
        if let Some(name) = entry.exported() {
            if !seen.insert(name.to_string()) {
                continue;
            }
        }
        exports.push(entry);
        starts.push(start);
    }
    record.exports = exports;
    record.export_starts = starts;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ts(src: &str) -> ParsedModule {
        parse_module("src/test.ts", SourceKind::Ts, src).unwrap()
    }

    #[test]
    fn source_kinds_from_extension() {
        assert_eq!(SourceKind::from_path(Path::new("a/b.ts")), SourceKind::Ts);
        assert_eq!(SourceKind::from_path(Path::new("LMap.vue")), SourceKind::Vue);
        assert_eq!(SourceKind::from_path(Path::new("x.json")), SourceKind::Json);
        assert_eq!(SourceKind::from_path(Path::new("leaflet.css")), SourceKind::Css);
        assert_eq!(SourceKind::from_path(Path::new("index.mjs")), SourceKind::Js);
    }

    #[test]
    fn type_only_imports_are_elided() {
        let module = parse_ts(
            "import { ref, Ref } from 'vue';\nimport L from 'leaflet';\nexport const r: Ref<number> = ref(1);\n",
        );
        let vue = &module.record.imports[0];
        assert!(!vue.type_only);
        assert!(!vue.bindings[0].type_only);
        assert!(vue.bindings[1].type_only);
        assert!(module.record.imports[1].type_only);
        assert_eq!(module.body(Vec::new()).trim(), "const r = ref(1);");
    }

    #[test]
    fn re_exported_import_becomes_re_export() {
        let module = parse_ts("import { LMap } from './components';\nexport { LMap };\n");
        assert_eq!(
            module.record.exports[0],
            ExportEntry::ReExport {
                exported: "LMap".into(),
                imported: Imported::Named("LMap".into()),
                specifier: "./components".into(),
                type_only: false,
            }
        );
        assert!(!module.record.imports[0].type_only);
    }

    #[test]
    fn exported_interfaces_are_type_only() {
        let module = parse_ts("interface Options { zoom: number }\nexport { Options };\nexport const a = 1;");
        assert!(module.record.exports[0].is_type_only());
        assert!(!module.record.exports[1].is_type_only());
    }

    #[test]
    fn casts_inside_export_lists_are_left_to_the_scanner() {
        let module = parse_ts("const a = 1;\nexport { a as b };");
        assert_eq!(module.body(Vec::new()).trim(), "const a = 1;");
    }

    #[test]
    fn overloads_export_once() {
        let module = parse_ts("export function f(a: string): void;\nexport function f(a: any) {}\n");
        assert_eq!(module.record.exports.len(), 1);
        assert_eq!(module.body(Vec::new()).trim(), "function f(a) {}");
    }

    #[test]
    fn json_modules_export_default() {
        let module = parse_module("src/data.json", SourceKind::Json, "{\"a\": [1, 2]}\n").unwrap();
        assert_eq!(module.default_local(), Some(DEFAULT_LOCAL));
        assert_eq!(module.body(Vec::new()), "const __default_export = {\"a\": [1, 2]};\n");

        let err = parse_module("src/bad.json", SourceKind::Json, "{\n\"a\": }").unwrap_err();
        assert_eq!(err.kind(), "parse");
    }

    #[test]
    fn vue_component_parts() {
        let src = "<template><div/></template>\n<script lang=\"ts\">\nimport { defineComponent } from 'vue';\nexport default defineComponent({ props: { zoom: Number as PropType<number> } });\n</script>\n<style>.a{}</style>\n";
        let module = parse_module("src/LMap.vue", SourceKind::Vue, src).unwrap();
        assert!(module.typed);
        assert_eq!(module.template.as_deref(), Some("<div/>"));
        assert_eq!(module.styles, vec![".a{}"]);
        assert_eq!(module.default_local(), Some(DEFAULT_LOCAL));
        assert!(module.body(Vec::new()).contains("zoom: Number }"));
    }

    #[test]
    fn vue_template_only_component_gets_default_export() {
        let module = parse_module("src/Empty.vue", SourceKind::Vue, "<template><p>hi</p></template>").unwrap();
        assert_eq!(module.default_local(), Some(DEFAULT_LOCAL));
        assert!(module.body(Vec::new()).contains("const __default_export = {};"));
    }

    #[test]
    fn script_setup_is_a_parse_error() {
        let err = parse_module("src/A.vue", SourceKind::Vue, "<script setup>\nconst a = 1\n</script>")
            .unwrap_err();
        assert_eq!(err.kind(), "parse");
        assert!(err.to_string().contains("script setup"));
    }

    #[test]
    fn syntax_error_lines_are_file_relative() {
        let err = parse_module("src/A.vue", SourceKind::Vue, "<template></template>\n<script>\nconst a = 'x\n</script>")
            .unwrap_err();
        assert!(err.to_string().contains("src/A.vue:3"), "{}", err);
    }
}
