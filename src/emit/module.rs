//! Inlined module functions
//!
//! Every runtime module becomes `function (__exports) { ... }` in the
//! `__pk_modules` table. Imports turn into reads from `__pk_require` (internal)
//! or from the bundle-level external bindings, exports into getters on
//! `__exports`. The module body itself is kept as written.

use std::fmt::Write as _;

use crate::external::is_identifier;
use crate::graph::{GraphModule, Target};
use crate::models::ModuleFormat;
use crate::parser::{Edit, ExportEntry, Imported};

use super::{quote, Bundle};

/// Bundle-level variable holding an external module
pub fn external_var(ext: usize) -> String {
    format!("__pk_ext_{}", ext)
}

/// The `__pk_modules` table for a bundle
pub fn render_modules(bundle: &Bundle<'_>, format: ModuleFormat) -> String {
    let mut out = String::from("const __pk_modules = [\n");
    for (idx, module) in bundle.graph.runtime_modules() {
        let _ = writeln!(out, "// {}", module.id);
        out.push_str("function (__exports) {\n");
        out.push_str(&render_module(bundle, idx, module, format));
        out.push_str("},\n");
    }
    out.push_str("];\n");
    out
}

fn render_module(bundle: &Bundle<'_>, idx: usize, module: &GraphModule, format: ModuleFormat) -> String {
    let mut out = String::new();
    out.push_str(&export_getters(bundle, idx, module));
    out.push_str(&import_prologue(bundle, module));

    let body = module.parsed.body(dynamic_imports(bundle, module, format));
    out.push_str(&body);
    if !body.is_empty() && !body.ends_with('\n') {
        out.push('\n');
    }

    if let (Some(template), Some(local)) = (&module.parsed.template, module.parsed.default_local()) {
        let _ = writeln!(out, "__pk_template({}, {});", local, quote(template));
    }
    out
}

fn property(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        quote(name)
    }
}

fn export_getters(bundle: &Bundle<'_>, idx: usize, module: &GraphModule) -> String {
    let graph = bundle.graph;
    let mut getters = Vec::new();

    for entry in &module.parsed.record.exports {
        if entry.is_type_only() {
            continue;
        }
        let read = match entry {
            ExportEntry::Local { local, .. } => local.clone(),
            ExportEntry::ReExport {
                exported,
                imported,
                specifier,
                ..
            } => {
                if !graph.resolve_export(idx, exported).is_value() {
                    continue;
                }
                match module.target(specifier) {
                    Some(Target::Internal(target)) => match graph.slot(target) {
                        Some(slot) => match imported.export_name() {
                            Some(name) => format!("__pk_require({})[{}]", slot, quote(name)),
                            None => format!("__pk_require({})", slot),
                        },
                        None => continue,
                    },
                    Some(Target::External(ext)) => {
                        let var = external_var(ext);
                        match imported {
                            Imported::Default => format!("__pk_default({})", var),
                            Imported::Namespace => var,
                            Imported::Named(name) => format!("{}[{}]", var, quote(name)),
                        }
                    }
                    None => continue,
                }
            }
            ExportEntry::Star { .. } => continue,
        };
        if let Some(exported) = entry.exported() {
            getters.push(format!("  {}: () => {}", quote(exported), read));
        }
    }

    if getters.is_empty() {
        return String::new();
    }
    format!("__pk_export(__exports, {{\n{}\n}});\n", getters.join(",\n"))
}

fn import_prologue(bundle: &Bundle<'_>, module: &GraphModule) -> String {
    let record = &module.parsed.record;
    let mut out = String::new();
    let mut counter = 0;

    for specifier in record.requests() {
        let Some(target) = module.target(specifier) else {
            continue;
        };
        let bindings: Vec<_> = record
            .imports
            .iter()
            .filter(|d| d.specifier == specifier && !d.type_only)
            .flat_map(|d| d.value_bindings())
            .collect();
        let stars = record
            .exports
            .iter()
            .filter(|e| matches!(e, ExportEntry::Star { specifier: s, type_only: false } if s == specifier))
            .count();

        let source = match target {
            Target::Internal(target) => {
                let Some(slot) = bundle.graph.slot(target) else {
                    continue;
                };
                if bindings.is_empty() && stars == 0 {
                    let _ = writeln!(out, "__pk_require({});", slot);
                    continue;
                }
                let var = format!("__d{}", counter);
                counter += 1;
                let _ = writeln!(out, "const {} = __pk_require({});", var, slot);
                var
            }
            Target::External(ext) => external_var(ext),
        };
        let external = matches!(target, Target::External(_));

        for _ in 0..stars {
            let _ = writeln!(out, "__pk_reexport(__exports, {});", source);
        }

        let mut destructured = Vec::new();
        for binding in bindings {
            match &binding.imported {
                Imported::Namespace => {
                    let _ = writeln!(out, "const {} = {};", binding.local, source);
                }
                Imported::Default if external => {
                    let _ = writeln!(out, "const {} = __pk_default({});", binding.local, source);
                }
                Imported::Default => destructured.push(format!("default: {}", binding.local)),
                Imported::Named(name) if name == &binding.local => destructured.push(name.clone()),
                Imported::Named(name) => {
                    destructured.push(format!("{}: {}", property(name), binding.local))
                }
            }
        }
        if !destructured.is_empty() {
            let _ = writeln!(out, "const {{ {} }} = {};", destructured.join(", "), source);
        }
    }
    out
}

fn dynamic_imports(bundle: &Bundle<'_>, module: &GraphModule, format: ModuleFormat) -> Vec<Edit> {
    let graph = bundle.graph;
    module
        .parsed
        .record
        .dynamic_imports
        .iter()
        .filter(|d| !d.type_only)
        .filter_map(|dynamic| {
            let text = match module.target(&dynamic.specifier)? {
                Target::Internal(target) => match graph.slot(target) {
                    Some(slot) => format!("Promise.resolve().then(() => __pk_require({}))", slot),
                    None => "Promise.resolve({})".to_string(),
                },
                Target::External(ext) => match format {
                    ModuleFormat::Es => return None,
                    ModuleFormat::Cjs => format!(
                        "Promise.resolve().then(() => require({}))",
                        quote(&graph.externals[ext].specifier)
                    ),
                    ModuleFormat::Umd => format!("Promise.resolve({})", external_var(ext)),
                },
            };
            Some(Edit {
                start: dynamic.start,
                end: dynamic.end,
                text,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::tests::{bundle_for, graph_of};

    #[test]
    fn internal_imports_read_from_require() {
        let graph = graph_of(&[
            (
                "src/index.ts",
                "import { a as b, c } from './a';\nimport * as ns from './a';\nexport const sum = b + c + ns.a;\n",
            ),
            ("src/a.ts", "export const a = 1;\nexport const c = 2;\n"),
        ]);
        let bundle = bundle_for(&graph);
        let out = render_modules(&bundle, ModuleFormat::Es);

        assert!(out.starts_with("const __pk_modules = [\n// src/index.ts\nfunction (__exports) {\n"));
        assert!(out.contains("__pk_export(__exports, {\n  \"sum\": () => sum\n});\n"));
        assert!(out.contains("const __d0 = __pk_require(1);\nconst ns = __d0;\nconst { a: b, c } = __d0;\n"));
        assert!(out.contains("const sum = b + c + ns.a;"));
        assert!(out.contains("// src/a.ts\n"));
    }

    #[test]
    fn external_bindings_use_bundle_variables() {
        let graph = graph_of(&[(
            "src/index.ts",
            "import L, { marker } from 'leaflet';\nimport * as vue from 'vue';\nexport { tileLayer } from 'leaflet';\nexport const m = () => [L, marker, vue];\n",
        )]);
        let bundle = bundle_for(&graph);
        let out = render_modules(&bundle, ModuleFormat::Cjs);

        assert!(out.contains("\"tileLayer\": () => __pk_ext_0[\"tileLayer\"]"));
        assert!(out.contains("const L = __pk_default(__pk_ext_0);\nconst { marker } = __pk_ext_0;\n"));
        assert!(out.contains("const vue = __pk_ext_1;\n"));
    }

    #[test]
    fn re_exports_are_lazy_getters() {
        let graph = graph_of(&[
            (
                "src/index.ts",
                "export { default as LMap } from './LMap.vue';\nexport * from './utils';\nexport type { Options } from './utils';\n",
            ),
            ("src/LMap.vue", "<template><div/></template>\n<script>\nexport default { name: 'LMap' };\n</script>\n"),
            ("src/utils.ts", "export const debounce = () => {};\nexport interface Options {}\n"),
        ]);
        let bundle = bundle_for(&graph);
        let out = render_modules(&bundle, ModuleFormat::Es);

        assert!(out.contains("\"LMap\": () => __pk_require(1)[\"default\"]"));
        assert!(out.contains("__pk_require(1);\nconst __d0 = __pk_require(2);\n__pk_reexport(__exports, __d0);\n"));
        assert!(!out.contains("Options"));
        assert!(out.contains("__pk_template(__default_export, \"<div/>\");"));
    }

    #[test]
    fn dynamic_imports_per_format() {
        let graph = graph_of(&[
            (
                "src/index.ts",
                "export const load = () => import('./lazy');\nexport const lib = () => import('leaflet');\n",
            ),
            ("src/lazy.ts", "export const x = 1;\n"),
        ]);
        let bundle = bundle_for(&graph);

        let es = render_modules(&bundle, ModuleFormat::Es);
        assert!(es.contains("const load = () => Promise.resolve().then(() => __pk_require(1));"));
        assert!(es.contains("const lib = () => import('leaflet');"));

        let cjs = render_modules(&bundle, ModuleFormat::Cjs);
        assert!(cjs.contains("Promise.resolve().then(() => require(\"leaflet\"))"));

        let umd = render_modules(&bundle, ModuleFormat::Umd);
        assert!(umd.contains("const lib = () => Promise.resolve(__pk_ext_0);"));
    }
}
