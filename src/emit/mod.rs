//! Per-format code generation
//!
//! Every format shares the module table and loader; a [`FormatEmitter`] only
//! decides how externals are loaded and how the entry's exports are published.

mod cjs;
mod es;
pub mod module;
pub mod runtime;
mod umd;

pub use cjs::CjsEmitter;
pub use es::EsEmitter;
pub use umd::UmdEmitter;

use crate::error::{PackError, PackResult};
use crate::graph::ModuleGraph;
use crate::models::{LibraryIdentity, ModuleFormat};

/// Everything an emitter reads; shared by all formats of one build
#[derive(Debug, Clone)]
pub struct Bundle<'a> {
    pub graph: &'a ModuleGraph,
    pub identity: &'a LibraryIdentity,
    pub banner: Option<&'a str>,
    /// UMD global per external, indexed like `graph.externals`
    pub globals: Vec<Option<String>>,
}

impl Bundle<'_> {
    /// Bundle slot of the entry module
    pub fn entry_slot(&self) -> PackResult<usize> {
        self.graph
            .slot(0)
            .ok_or_else(|| PackError::configuration("the entry module contributes no code"))
    }

    fn banner_lines(&self) -> String {
        match self.banner {
            Some(banner) if !banner.trim().is_empty() => format!("{}\n", banner.trim_end()),
            _ => String::new(),
        }
    }
}

/// One output module format
pub trait FormatEmitter: Send + Sync {
    fn format(&self) -> ModuleFormat;

    /// Render the complete artifact text
    fn emit(&self, bundle: &Bundle<'_>) -> PackResult<String>;
}

/// Emitter for a format tag
pub fn emitter_for(format: ModuleFormat) -> Box<dyn FormatEmitter> {
    match format {
        ModuleFormat::Es => Box::new(EsEmitter),
        ModuleFormat::Cjs => Box::new(CjsEmitter),
        ModuleFormat::Umd => Box::new(UmdEmitter),
    }
}

/// JavaScript string literal
pub fn quote(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

/// Loader, module table and entry evaluation; the part every format shares
fn bundle_body(bundle: &Bundle<'_>, format: ModuleFormat) -> PackResult<String> {
    let entry = bundle.entry_slot()?;
    let mut out = String::from(runtime::RUNTIME);
    out.push_str(&module::render_modules(bundle, format));
    out.push_str(&format!("const __pk_entry = __pk_require({});\n", entry));
    Ok(out)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Config;
    use crate::fs::MemoryFs;
    use crate::plan::BuildPlan;
    use std::path::Path;
    use std::sync::OnceLock;

    fn identity() -> &'static LibraryIdentity {
        static IDENTITY: OnceLock<LibraryIdentity> = OnceLock::new();
        IDENTITY.get_or_init(|| LibraryIdentity::new("vue-leaflet", "{name}.{format}.js", None).unwrap())
    }

    /// Graph over in-memory files under `/p`, entry `src/index.ts`
    pub fn graph_of(files: &[(&str, &str)]) -> ModuleGraph {
        let fs = files
            .iter()
            .fold(MemoryFs::new(), |fs, (path, content)| fs.with(Path::new("/p").join(path), content));
        let plan = BuildPlan::from_config(&Config::default(), Path::new("/p")).unwrap();
        ModuleGraph::build(&plan, &fs).unwrap()
    }

    pub fn bundle_for(graph: &ModuleGraph) -> Bundle<'_> {
        let globals = graph
            .externals
            .iter()
            .map(|e| match e.specifier.as_str() {
                "vue" => Some("Vue".to_string()),
                s if s == "leaflet" || s.starts_with("leaflet/") => Some("L".to_string()),
                _ => None,
            })
            .collect();
        Bundle {
            graph,
            identity: identity(),
            banner: None,
            globals,
        }
    }

    #[test]
    fn emitters_match_their_tags() {
        for format in ModuleFormat::all() {
            assert_eq!(emitter_for(format).format(), format);
        }
    }

    #[test]
    fn quoting_escapes() {
        assert_eq!(quote("a\"b\n"), r#""a\"b\n""#);
        assert_eq!(quote("vue-leaflet"), "\"vue-leaflet\"");
    }
}
