//! Import specifier resolution
//!
//! Maps internal specifiers (aliases, relative and absolute paths, bare
//! packages under `node_modules`) to files. External specifiers never reach
//! the resolver; the graph classifies them first.

use std::path::{Component, Path, PathBuf};

use crate::error::{PackError, PackResult};
use crate::fs::SourceFs;
use crate::plan::BuildPlan;

/// TypeScript sources may be imported with the extension they compile to
const COMPILED_EXTENSIONS: &[(&str, &str)] = &[
    ("js", "ts"),
    ("jsx", "tsx"),
    ("mjs", "mts"),
    ("cjs", "cts"),
];

pub struct Resolver<'a> {
    plan: &'a BuildPlan,
    fs: &'a dyn SourceFs,
}

impl<'a> Resolver<'a> {
    pub fn new(plan: &'a BuildPlan, fs: &'a dyn SourceFs) -> Self {
        Self { plan, fs }
    }

    /// Locate the library entry module.
    pub fn resolve_entry(&self) -> PackResult<PathBuf> {
        let specifier = &self.plan.entry.specifier;
        let base = match self.plan.aliases.expand(specifier) {
            Some(path) => path,
            None => self.plan.root.join(specifier),
        };
        self.probe(&normalize(&base))
            .ok_or_else(|| PackError::Resolution {
                specifier: specifier.clone(),
                importer: None,
            })
    }

    /// Resolve `specifier` as imported from the file `importer`.
    pub fn resolve(&self, specifier: &str, importer: &Path) -> Option<PathBuf> {
        if let Some(path) = self.plan.aliases.expand(specifier) {
            return self.probe(&normalize(&path));
        }

        let dir = importer.parent().unwrap_or(&self.plan.root);
        if specifier.starts_with("./") || specifier.starts_with("../") || specifier == "." || specifier == ".." {
            return self.probe(&normalize(&dir.join(specifier)));
        }
        if Path::new(specifier).is_absolute() {
            return self.probe(&normalize(Path::new(specifier)));
        }
        self.resolve_package(specifier, dir)
    }

    /// Project-relative, forward-slash id of a resolved file
    pub fn module_id(&self, path: &Path) -> String {
        module_id(&self.plan.root, path)
    }

    fn resolve_package(&self, specifier: &str, from: &Path) -> Option<PathBuf> {
        let (package, subpath) = split_package(specifier)?;

        let mut dir = Some(from);
        while let Some(current) = dir {
            let package_dir = current.join("node_modules").join(package);
            if self.fs.is_dir(&package_dir) {
                return match subpath {
                    Some(sub) => self.probe(&normalize(&package_dir.join(sub))),
                    None => self.package_main(&package_dir),
                };
            }
            if current == self.plan.root || !current.starts_with(&self.plan.root) {
                break;
            }
            dir = current.parent();
        }
        None
    }

    /// `module`, then `main`, then `index.*`
    fn package_main(&self, package_dir: &Path) -> Option<PathBuf> {
        let manifest = self
            .fs
            .read_to_string(&package_dir.join("package.json"))
            .ok()
            .and_then(|text| serde_json::from_str::<serde_json::Value>(&text).ok());

        if let Some(manifest) = manifest {
            for field in ["module", "main"] {
                if let Some(main) = manifest.get(field).and_then(|v| v.as_str()) {
                    if let Some(found) = self.probe(&normalize(&package_dir.join(main))) {
                        return Some(found);
                    }
                }
            }
        }
        self.probe(&package_dir.join("index"))
    }

    /// Exact file, compiled-extension swap, appended extensions, directory
    /// index, then a sibling declaration file.
    fn probe(&self, base: &Path) -> Option<PathBuf> {
        if self.fs.is_file(base) {
            return Some(base.to_path_buf());
        }

        if let Some(ext) = base.extension().and_then(|e| e.to_str()) {
            for (compiled, source) in COMPILED_EXTENSIONS {
                if ext == *compiled {
                    let swapped = base.with_extension(source);
                    if self.fs.is_file(&swapped) {
                        return Some(swapped);
                    }
                }
            }
        }

        for ext in &self.plan.extensions {
            let candidate = with_suffix(base, ext);
            if self.fs.is_file(&candidate) {
                return Some(candidate);
            }
        }

        if self.fs.is_dir(base) {
            for ext in &self.plan.extensions {
                let candidate = base.join(format!("index{}", ext));
                if self.fs.is_file(&candidate) {
                    return Some(candidate);
                }
            }
        }

        let declaration = with_suffix(base, ".d.ts");
        self.fs.is_file(&declaration).then_some(declaration)
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// `@scope/pkg/sub/path` -> (`@scope/pkg`, `sub/path`)
fn split_package(specifier: &str) -> Option<(&str, Option<&str>)> {
    let segments = if specifier.starts_with('@') { 2 } else { 1 };
    let mut end = 0;
    for _ in 0..segments {
        let rest = &specifier[end..];
        match rest.find('/') {
            Some(slash) => end += slash + 1,
            None => {
                end = specifier.len() + 1;
                break;
            }
        }
    }

    let package = specifier.get(..end.saturating_sub(1))?;
    if package.is_empty() || (segments == 2 && !package.contains('/')) {
        return None;
    }
    let subpath = specifier.get(end..).filter(|s| !s.is_empty());
    Some((package, subpath))
}

/// Lexically resolve `.` and `..` components
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

pub fn module_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .filter(|c| c != "/")
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::fs::MemoryFs;

    fn plan() -> BuildPlan {
        BuildPlan::from_config(&Config::default(), Path::new("/p")).unwrap()
    }

    fn project() -> MemoryFs {
        MemoryFs::new()
            .with("/p/src/index.ts", "")
            .with("/p/src/utils.ts", "")
            .with("/p/src/components/index.ts", "")
            .with("/p/src/components/LMap.vue", "")
            .with("/p/src/data.json", "")
            .with("/p/src/types.d.ts", "")
            .with("/p/node_modules/tiny-emitter/package.json", r#"{"main": "dist/index.js"}"#)
            .with("/p/node_modules/tiny-emitter/dist/index.js", "")
            .with("/p/node_modules/@scope/pkg/index.mjs", "")
            .with("/p/node_modules/@scope/pkg/sub/x.js", "")
    }

    #[test]
    fn entry_resolves_through_alias() {
        let plan = plan();
        let fs = project();
        let resolver = Resolver::new(&plan, &fs);
        assert_eq!(resolver.resolve_entry().unwrap(), PathBuf::from("/p/src/index.ts"));
    }

    #[test]
    fn missing_entry_is_resolution_error() {
        let plan = plan();
        let fs = MemoryFs::new();
        let err = Resolver::new(&plan, &fs).resolve_entry().unwrap_err();
        assert!(matches!(err, PackError::Resolution { importer: None, .. }));
    }

    #[test]
    fn relative_and_alias_imports() {
        let plan = plan();
        let fs = project();
        let resolver = Resolver::new(&plan, &fs);
        let index = Path::new("/p/src/index.ts");

        assert_eq!(resolver.resolve("./utils", index), Some(PathBuf::from("/p/src/utils.ts")));
        assert_eq!(resolver.resolve("./utils.js", index), Some(PathBuf::from("/p/src/utils.ts")));
        assert_eq!(
            resolver.resolve("./components", index),
            Some(PathBuf::from("/p/src/components/index.ts"))
        );
        assert_eq!(
            resolver.resolve("@src/components/LMap.vue", index),
            Some(PathBuf::from("/p/src/components/LMap.vue"))
        );
        assert_eq!(
            resolver.resolve("../utils", Path::new("/p/src/components/LMap.vue")),
            Some(PathBuf::from("/p/src/utils.ts"))
        );
        assert_eq!(resolver.resolve("./data.json", index), Some(PathBuf::from("/p/src/data.json")));
        assert_eq!(resolver.resolve("./types", index), Some(PathBuf::from("/p/src/types.d.ts")));
        assert_eq!(resolver.resolve("./nope", index), None);
    }

    #[test]
    fn bare_packages_come_from_node_modules() {
        let plan = plan();
        let fs = project();
        let resolver = Resolver::new(&plan, &fs);
        let from = Path::new("/p/src/components/LMap.vue");

        assert_eq!(
            resolver.resolve("tiny-emitter", from),
            Some(PathBuf::from("/p/node_modules/tiny-emitter/dist/index.js"))
        );
        assert_eq!(
            resolver.resolve("@scope/pkg", from),
            Some(PathBuf::from("/p/node_modules/@scope/pkg/index.mjs"))
        );
        assert_eq!(
            resolver.resolve("@scope/pkg/sub/x", from),
            Some(PathBuf::from("/p/node_modules/@scope/pkg/sub/x.js"))
        );
        assert_eq!(resolver.resolve("missing-pkg", from), None);
    }

    #[test]
    fn package_names_split() {
        assert_eq!(split_package("vue"), Some(("vue", None)));
        assert_eq!(split_package("leaflet/dist/x.css"), Some(("leaflet", Some("dist/x.css"))));
        assert_eq!(split_package("@vue/shared"), Some(("@vue/shared", None)));
        assert_eq!(split_package("@vue/shared/x"), Some(("@vue/shared", Some("x"))));
        assert_eq!(split_package("@vue"), None);
    }

    #[test]
    fn ids_are_root_relative() {
        assert_eq!(
            module_id(Path::new("/p"), &normalize(Path::new("/p/src/./a/../b.ts"))),
            "src/b.ts"
        );
    }
}
