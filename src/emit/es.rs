//! ES module output

use std::fmt::Write as _;

use crate::error::PackResult;
use crate::external::is_identifier;
use crate::models::ModuleFormat;

use super::module::external_var;
use super::{bundle_body, quote, Bundle, FormatEmitter};

/// Native `import` for externals, static named exports for the entry
pub struct EsEmitter;

impl FormatEmitter for EsEmitter {
    fn format(&self) -> ModuleFormat {
        ModuleFormat::Es
    }

    fn emit(&self, bundle: &Bundle<'_>) -> PackResult<String> {
        let graph = bundle.graph;
        let mut out = bundle.banner_lines();

        let mut imports = String::new();
        for (ext, external) in graph.externals.iter().enumerate().filter(|(_, e)| e.runtime) {
            if external.bound {
                let _ = writeln!(
                    imports,
                    "import * as {} from {};",
                    external_var(ext),
                    quote(&external.specifier)
                );
            } else {
                let _ = writeln!(imports, "import {};", quote(&external.specifier));
            }
        }
        if !imports.is_empty() {
            out.push_str(&imports);
            out.push('\n');
        }

        out.push_str(&bundle_body(bundle, ModuleFormat::Es)?);

        let names = graph.export_names(0);
        let mut specifiers = Vec::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            let _ = writeln!(out, "const __pk_e{} = __pk_entry[{}];", i, quote(name));
            let exported = if is_identifier(name) { name.clone() } else { quote(name) };
            specifiers.push(format!("__pk_e{} as {}", i, exported));
        }
        if !specifiers.is_empty() {
            let _ = writeln!(out, "export {{ {} }};", specifiers.join(", "));
        }
        for ext in graph.external_stars(0) {
            let _ = writeln!(out, "export * from {};", quote(&graph.externals[ext].specifier));
        }
        Ok(out)
    }
}
