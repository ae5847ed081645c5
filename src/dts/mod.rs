//! Declaration file generation
//!
//! Every script module becomes a `declare namespace`; imports and exports are
//! `import x = ...` aliases between namespaces, so names never collide across
//! modules. The file's own surface re-exports the entry namespace.

mod extract;

use std::collections::HashSet;
use std::fmt::Write as _;

use tracing::debug;

use crate::emit::quote;
use crate::error::BuildWarning;
use crate::external::is_identifier;
use crate::graph::{ModuleGraph, Target};
use crate::parser::{ExportEntry, SourceKind};

pub use extract::{COMPONENT_TYPE, DEFAULT_MEMBER};
use extract::{external_default, external_namespace, extract, namespace, ExternalUsage};

/// The merged declaration file and the symbols whose types fell back to `any`
#[derive(Debug, Clone, Default)]
pub struct Declarations {
    pub text: String,
    pub warnings: Vec<BuildWarning>,
}

/// Build the declaration file for the whole graph.
pub fn declarations(graph: &ModuleGraph) -> Declarations {
    let mut usage = ExternalUsage::default();
    let mut warnings = Vec::new();
    let mut blocks = Vec::new();

    for (idx, module) in graph.modules.iter().enumerate() {
        if module.parsed.kind == SourceKind::Css {
            continue;
        }
        let extracted = extract(graph, idx, &mut usage);
        debug!(module = %module.id, lines = extracted.lines.len(), "declarations extracted");
        warnings.extend(extracted.warnings);
        blocks.push((idx, &module.id, extracted.lines));
    }

    let mut out = String::new();
    for &ext in &usage.namespaces {
        let _ = writeln!(
            out,
            "import * as {} from {};",
            external_namespace(ext),
            quote(&graph.externals[ext].specifier)
        );
    }
    for &ext in &usage.defaults {
        let _ = writeln!(
            out,
            "import {} from {};",
            external_default(ext),
            quote(&graph.externals[ext].specifier)
        );
    }
    if !out.is_empty() {
        out.push('\n');
    }

    for (idx, id, lines) in blocks {
        let _ = writeln!(out, "// {}", id);
        let _ = writeln!(out, "declare namespace {} {{", namespace(idx));
        for line in lines {
            for part in line.lines() {
                let _ = writeln!(out, "    {}", part);
            }
        }
        out.push_str("}\n\n");
    }

    let entry = namespace(0);
    let names = surface_names(graph, 0);
    let mut exported_any = false;
    for name in &names {
        if name == "default" || !is_identifier(name) {
            continue;
        }
        let _ = writeln!(out, "export import {} = {}.{};", name, entry, name);
        exported_any = true;
    }
    if names.iter().any(|n| n == "default") {
        let _ = writeln!(out, "import __pk_default = {}.{};", entry, DEFAULT_MEMBER);
        out.push_str("export default __pk_default;\n");
        exported_any = true;
    }
    for ext in graph.external_stars(0) {
        let _ = writeln!(out, "export * from {};", quote(&graph.externals[ext].specifier));
        exported_any = true;
    }
    if !exported_any {
        out.push_str("export {};\n");
    }

    Declarations { text: out, warnings }
}

/// Every name a module exports, types included, stars expanded through
/// internal modules. `default` only comes from the module itself.
pub fn surface_names(graph: &ModuleGraph, idx: usize) -> Vec<String> {
    let mut names = Vec::new();
    let mut seen = HashSet::new();
    collect_surface(graph, idx, true, &mut names, &mut seen, &mut HashSet::new());
    names
}

fn collect_surface(
    graph: &ModuleGraph,
    idx: usize,
    include_default: bool,
    names: &mut Vec<String>,
    seen: &mut HashSet<String>,
    visited: &mut HashSet<usize>,
) {
    if !visited.insert(idx) {
        return;
    }
    let module = &graph.modules[idx];
    for entry in &module.parsed.record.exports {
        if let Some(name) = entry.exported() {
            if (name != "default" || include_default) && seen.insert(name.to_string()) {
                names.push(name.to_string());
            }
        }
    }
    for entry in &module.parsed.record.exports {
        if let ExportEntry::Star { specifier, .. } = entry {
            if let Some(Target::Internal(target)) = module.target(specifier) {
                collect_surface(graph, target, false, names, seen, visited);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::tests::graph_of;

    fn dts(files: &[(&str, &str)]) -> Declarations {
        declarations(&graph_of(files))
    }

    #[test]
    fn types_survive_and_bodies_do_not() {
        let out = dts(&[(
            "src/index.ts",
            "export interface Options {\n  zoom: number\n}\nexport type Id = string | number;\nexport function init(el: HTMLElement, opts?: Options): void {\n  el.id = 'x';\n}\nexport const version = '1.0';\n",
        )]);
        assert!(out.text.contains("    export interface Options {\n      zoom: number\n    }\n"));
        assert!(out.text.contains("    export type Id = string | number;\n"));
        assert!(out.text.contains("    export function init(el: HTMLElement, opts?: Options): void;\n"));
        assert!(out.text.contains("    export const version: string;\n"));
        assert!(!out.text.contains("el.id"));
        assert!(out.text.contains("export import Options = __pk_m0.Options;\n"));
        assert!(out.text.contains("export import init = __pk_m0.init;\n"));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn imports_become_namespace_aliases() {
        let out = dts(&[
            ("src/index.ts", "import type { Map } from 'leaflet';\nimport { Point } from './point';\nexport function center(map: Map): Point {\n  return map.center;\n}\n"),
            ("src/point.ts", "export class Point {\n  constructor(public x: number, private y = 0) {}\n  get length(): number { return this.x; }\n  #secret = 1;\n}\n"),
        ]);
        assert!(out.text.starts_with("import * as __pk_x0 from \"leaflet\";\n\n"));
        assert!(out.text.contains("    import Map = __pk_x0.Map;\n"));
        assert!(out.text.contains("    import Point = __pk_m1.Point;\n"));
        assert!(out.text.contains(
            "    export class Point {\n        public x: number;\n        private y;\n        constructor(x: number, y?: number);\n        get length(): number;\n    }\n"
        ));
        assert!(!out.text.contains("secret"));
    }

    #[test]
    fn defaults_and_stars_reach_the_surface() {
        let out = dts(&[
            ("src/index.ts", "export * from './layers';\nexport * from 'leaflet';\nexport default function install(app: any): void {}\n"),
            ("src/layers.ts", "export type Layer = { id: number };\nexport const count = 3;\n"),
        ]);
        assert!(out.text.contains("    function install(app: any): void;\n    export import __default = install;\n"));
        assert!(out.text.contains("    export import Layer = __pk_m1.Layer;\n"));
        assert!(out.text.contains("export import count = __pk_m0.count;\n"));
        assert!(out.text.contains("import __pk_default = __pk_m0.__default;\nexport default __pk_default;\n"));
        assert!(out.text.ends_with("export * from \"leaflet\";\n"));
    }

    #[test]
    fn uninferable_types_warn_and_fall_back_to_any() {
        let out = dts(&[(
            "src/index.ts",
            "const base = compute();\nexport const size = base * 2;\nexport const ok = [1, 2];\nexport const make = (n: number) => new Map();\n",
        )]);
        assert!(out.text.contains("    export const size: any;\n"));
        assert!(out.text.contains("    export const ok: number[];\n"));
        assert!(out.text.contains("    export const make: (n: number) => Map;\n"));
        let symbols: Vec<String> = out
            .warnings
            .iter()
            .map(|w| match w {
                BuildWarning::TypeExtraction(e) => e.symbol.clone(),
                other => panic!("unexpected warning {:?}", other),
            })
            .collect();
        assert_eq!(symbols, vec!["base", "size"]);
    }

    #[test]
    fn javascript_exports_are_any_without_warnings() {
        let out = dts(&[
            ("src/index.ts", "export { helper } from './util.js';\n"),
            ("src/util.js", "export function helper(a) { return a; }\n"),
        ]);
        assert!(out.text.contains("    export const helper: any;\n"));
        assert!(out.text.contains("    export import helper = __pk_m1.helper;\n"));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn imported_names_that_are_also_star_exported_are_declared_once() {
        let out = dts(&[
            ("src/index.ts", "import { useZoom, Options } from './util';\nexport * from './util';\nexport function setup(o: Options): void {\n  useZoom(o);\n}\n"),
            ("src/util.ts", "export interface Options {\n  zoom: number\n}\nexport function useZoom(o: Options): void {}\n"),
        ]);
        assert!(out.text.contains("    export import useZoom = __pk_m1.useZoom;\n"));
        assert!(out.text.contains("    export import Options = __pk_m1.Options;\n"));
        assert!(!out.text.contains("    import Options = "));
        assert!(!out.text.contains("    import useZoom = "));
        assert_eq!(out.text.matches("Options = __pk_m1.Options;").count(), 1);
    }

    #[test]
    fn imported_names_exported_by_list_are_declared_once() {
        let out = dts(&[
            ("src/index.ts", "import { debounce, throttle } from './util';\nexport { debounce, throttle as limit };\n"),
            ("src/util.ts", "export function debounce(ms: number): void {}\nexport function throttle(ms: number): void {}\n"),
        ]);
        assert!(out.text.contains("    export import debounce = __pk_m1.debounce;\n"));
        assert!(!out.text.contains("    import debounce = "));
        assert!(out.text.contains("    export import limit = __pk_m1.throttle;\n"));
        assert!(!out.text.contains("debounce = debounce"));
    }

    #[test]
    fn string_export_names_are_skipped() {
        let out = dts(&[
            ("src/index.ts", "export * from './names';\nexport const a = 1;\n"),
            ("src/names.ts", "const b = 2;\nexport { b as \"string-name\", b };\n"),
        ]);
        assert!(!out.text.contains("string-name"));
        assert!(out.text.contains("export import b = __pk_m0.b;\n"));
        assert!(out.warnings.iter().any(|w| matches!(
            w,
            BuildWarning::TypeExtraction(e) if e.symbol == "string-name"
        )));
    }

    #[test]
    fn empty_entry_still_is_a_module() {
        let out = dts(&[("src/index.ts", "console.log('side effect');\n")]);
        assert!(out.text.ends_with("export {};\n"));
    }
}
