//! CommonJS output

use std::fmt::Write as _;

use crate::error::PackResult;
use crate::models::ModuleFormat;

use super::module::external_var;
use super::{bundle_body, quote, Bundle, FormatEmitter};

/// `require` for externals, entry exports published on `exports`
pub struct CjsEmitter;

impl FormatEmitter for CjsEmitter {
    fn format(&self) -> ModuleFormat {
        ModuleFormat::Cjs
    }

    fn emit(&self, bundle: &Bundle<'_>) -> PackResult<String> {
        let mut out = bundle.banner_lines();
        out.push_str("'use strict';\n\n");

        let mut requires = String::new();
        for (ext, external) in bundle.graph.externals.iter().enumerate().filter(|(_, e)| e.runtime) {
            if external.bound {
                let _ = writeln!(
                    requires,
                    "const {} = require({});",
                    external_var(ext),
                    quote(&external.specifier)
                );
            } else {
                let _ = writeln!(requires, "require({});", quote(&external.specifier));
            }
        }
        if !requires.is_empty() {
            out.push_str(&requires);
            out.push('\n');
        }

        out.push_str(&bundle_body(bundle, ModuleFormat::Cjs)?);
        out.push_str("__pk_publish(exports, __pk_entry);\n");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::tests::{bundle_for, graph_of};

    #[test]
    fn cjs_bundle_layout() {
        let graph = graph_of(&[
            ("src/index.ts", "import { h } from 'vue';\nimport './style.css';\nexport const render = () => h('div');\n"),
            ("src/style.css", ".a { color: red; }\n"),
        ]);
        let out = CjsEmitter.emit(&bundle_for(&graph)).unwrap();

        assert!(out.starts_with("'use strict';\n\nconst __pk_ext_0 = require(\"vue\");\n\nconst __pk_cache = [];\n"));
        assert!(out.ends_with("const __pk_entry = __pk_require(0);\n__pk_publish(exports, __pk_entry);\n"));
        assert!(!out.contains("color: red"));
        assert!(!out.contains("import "));
    }
}
