//! UMD output
//!
//! Rollup-style loader shim: CommonJS when `exports` and `module` exist, AMD
//! when `define.amd` does, otherwise externals are read from globals and the
//! library is assigned to `global["<name>"]`.

use std::fmt::Write as _;

use crate::error::{PackError, PackResult};
use crate::models::ModuleFormat;

use super::module::external_var;
use super::{bundle_body, quote, Bundle, FormatEmitter};

pub struct UmdEmitter;

/// Loader inputs for one external
struct Dependency<'a> {
    specifier: &'a str,
    /// Factory parameter and global, absent for side-effect imports
    binding: Option<(String, &'a str)>,
}

impl UmdEmitter {
    fn dependencies<'a>(bundle: &'a Bundle<'_>) -> PackResult<Vec<Dependency<'a>>> {
        let mut bound = Vec::new();
        let mut side_effects = Vec::new();
        for (ext, external) in bundle.graph.runtime_externals() {
            if external.is_bound() {
                let global = bundle
                    .globals
                    .get(ext)
                    .and_then(|g| g.as_deref())
                    .ok_or_else(|| {
                        PackError::configuration(format!(
                            "UMD output needs a global name for external '{}'",
                            external.specifier
                        ))
                    })?;
                bound.push(Dependency {
                    specifier: &external.specifier,
                    binding: Some((external_var(ext), global)),
                });
            } else {
                side_effects.push(Dependency {
                    specifier: &external.specifier,
                    binding: None,
                });
            }
        }
        bound.extend(side_effects);
        Ok(bound)
    }

    fn shim_head(global_name: &str, deps: &[Dependency<'_>]) -> String {
        let requires: String = deps
            .iter()
            .map(|d| format!(", require({})", quote(d.specifier)))
            .collect();
        let amd: String = deps.iter().map(|d| format!(", {}", quote(d.specifier))).collect();
        let globals: String = deps
            .iter()
            .filter_map(|d| d.binding.as_ref())
            .map(|(_, global)| format!(", global.{}", global))
            .collect();
        let params: String = deps
            .iter()
            .filter_map(|d| d.binding.as_ref())
            .map(|(param, _)| format!(", {}", param))
            .collect();

        let mut out = String::new();
        out.push_str("(function (global, factory) {\n");
        let _ = writeln!(
            out,
            "  typeof exports === 'object' && typeof module !== 'undefined' ? factory(exports{}) :",
            requires
        );
        let _ = writeln!(
            out,
            "  typeof define === 'function' && define.amd ? define([\"exports\"{}], factory) :",
            amd
        );
        let _ = writeln!(
            out,
            "  (global = typeof globalThis !== 'undefined' ? globalThis : global || self, factory(global[{}] = {{}}{}));",
            quote(global_name),
            globals
        );
        let _ = writeln!(out, "}})(this, (function (exports{}) {{ 'use strict';", params);
        out
    }
}

impl FormatEmitter for UmdEmitter {
    fn format(&self) -> ModuleFormat {
        ModuleFormat::Umd
    }

    fn emit(&self, bundle: &Bundle<'_>) -> PackResult<String> {
        let deps = Self::dependencies(bundle)?;

        let mut out = bundle.banner_lines();
        out.push_str(&Self::shim_head(bundle.identity.umd_global(), &deps));
        out.push('\n');
        out.push_str(&bundle_body(bundle, ModuleFormat::Umd)?);
        out.push_str("__pk_publish(exports, __pk_entry);\n");
        out.push_str("\n}));\n");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::tests::{bundle_for, graph_of};

    #[test]
    fn shim_reads_globals_in_factory_order() {
        let deps = vec![
            Dependency {
                specifier: "vue",
                binding: Some(("__pk_ext_0".to_string(), "Vue")),
            },
            Dependency {
                specifier: "leaflet",
                binding: Some(("__pk_ext_1".to_string(), "L")),
            },
            Dependency {
                specifier: "leaflet/dist/leaflet.css",
                binding: None,
            },
        ];
        insta::assert_snapshot!(UmdEmitter::shim_head("vue-leaflet", &deps), @r###"
(function (global, factory) {
  typeof exports === 'object' && typeof module !== 'undefined' ? factory(exports, require("vue"), require("leaflet"), require("leaflet/dist/leaflet.css")) :
  typeof define === 'function' && define.amd ? define(["exports", "vue", "leaflet", "leaflet/dist/leaflet.css"], factory) :
  (global = typeof globalThis !== 'undefined' ? globalThis : global || self, factory(global["vue-leaflet"] = {}, global.Vue, global.L));
})(this, (function (exports, __pk_ext_0, __pk_ext_1) { 'use strict';
"###);
    }

    #[test]
    fn umd_bundle_never_inlines_externals() {
        let graph = graph_of(&[(
            "src/index.ts",
            "import { marker } from 'leaflet/src/layer';\nimport L from 'leaflet';\nexport const m = () => [marker, L];\n",
        )]);
        let out = UmdEmitter.emit(&bundle_for(&graph)).unwrap();

        assert!(out.contains("factory(global[\"vue-leaflet\"] = {}, global.L, global.L)"));
        assert!(out.contains("const { marker } = __pk_ext_0;"));
        assert!(out.contains("const L = __pk_default(__pk_ext_1);"));
        assert!(out.ends_with("__pk_publish(exports, __pk_entry);\n\n}));\n"));
    }

    #[test]
    fn missing_global_is_configuration_error() {
        let graph = graph_of(&[("src/index.ts", "import { ref } from 'vue';\nexport const r = ref(0);\n")]);
        let mut bundle = bundle_for(&graph);
        bundle.globals = vec![None];
        let err = UmdEmitter.emit(&bundle).unwrap_err();
        assert_eq!(err.kind(), "configuration");
        assert!(err.to_string().contains("'vue'"));
    }
}
