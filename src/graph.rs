//! Import graph
//!
//! Discovers every internal module reachable from the entry (breadth-first,
//! in import order, entry first), classifies each specifier as internal or
//! external, and answers export-surface questions for the emitters.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::{BuildWarning, PackError, PackResult, TypeExtractionError};
use crate::fs::SourceFs;
use crate::parser::{parse_module, ExportEntry, Imported, ParsedModule, SourceKind};
use crate::plan::BuildPlan;
use crate::resolver::Resolver;

/// Where a specifier leads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Internal(usize),
    External(usize),
}

#[derive(Debug, Clone)]
pub struct GraphModule {
    pub id: String,
    pub path: PathBuf,
    pub parsed: ParsedModule,
    /// Resolved specifiers; type-only imports that failed to resolve are absent
    pub links: BTreeMap<String, Target>,
    /// Reachable from the entry through runtime imports
    pub runtime: bool,
}

impl GraphModule {
    pub fn target(&self, specifier: &str) -> Option<Target> {
        self.links.get(specifier).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalModule {
    pub specifier: String,
    /// Ids of the modules importing it, in discovery order
    pub importers: Vec<String>,
    /// Statically imported by runtime code
    pub runtime: bool,
    /// Runtime code reads bindings from it
    pub bound: bool,
    /// Dynamically imported by runtime code
    pub dynamic: bool,
}

impl ExternalModule {
    /// Needs a value in every format (and a global in UMD)
    pub fn is_bound(&self) -> bool {
        self.bound || self.dynamic
    }
}

/// Where an exported name comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOrigin {
    /// A runtime value declared in the module
    Value(usize),
    /// Only a type exists under that name
    Type,
    /// Read from an external module at runtime
    External(usize),
    Missing,
}

impl ExportOrigin {
    pub fn is_value(self) -> bool {
        matches!(self, ExportOrigin::Value(_) | ExportOrigin::External(_))
    }
}

#[derive(Debug, Clone)]
pub struct ModuleGraph {
    pub modules: Vec<GraphModule>,
    pub externals: Vec<ExternalModule>,
    pub warnings: Vec<BuildWarning>,
    slots: Vec<Option<usize>>,
}

impl ModuleGraph {
    /// Read, parse and link every module reachable from the entry.
    pub fn build(plan: &BuildPlan, fs: &dyn SourceFs) -> PackResult<Self> {
        let resolver = Resolver::new(plan, fs);
        let entry = resolver.resolve_entry()?;

        let mut graph = ModuleGraph {
            modules: Vec::new(),
            externals: Vec::new(),
            warnings: Vec::new(),
            slots: Vec::new(),
        };
        let mut by_path: HashMap<PathBuf, usize> = HashMap::new();
        let mut by_specifier: HashMap<String, usize> = HashMap::new();
        let mut queue = VecDeque::new();

        graph.push_module(&resolver, fs, entry.clone())?;
        by_path.insert(entry, 0);
        queue.push_back(0);

        while let Some(idx) = queue.pop_front() {
            let path = graph.modules[idx].path.clone();
            let id = graph.modules[idx].id.clone();
            let specifiers: Vec<String> = graph.modules[idx]
                .parsed
                .record
                .all_specifiers()
                .into_iter()
                .map(String::from)
                .collect();

            for specifier in specifiers {
                let target = if plan.externals.is_external(&specifier) {
                    let ext = *by_specifier.entry(specifier.clone()).or_insert_with(|| {
                        graph.externals.push(ExternalModule {
                            specifier: specifier.clone(),
                            importers: Vec::new(),
                            runtime: false,
                            bound: false,
                            dynamic: false,
                        });
                        graph.externals.len() - 1
                    });
                    graph.externals[ext].importers.push(id.clone());
                    Target::External(ext)
                } else {
                    match resolver.resolve(&specifier, &path) {
                        Some(resolved) => match by_path.get(&resolved).copied() {
                            Some(existing) => Target::Internal(existing),
                            None => {
                                let next = graph.push_module(&resolver, fs, resolved.clone())?;
                                by_path.insert(resolved, next);
                                queue.push_back(next);
                                Target::Internal(next)
                            }
                        },
                        None if graph.modules[idx].parsed.record.used_at_runtime(&specifier) => {
                            return Err(PackError::Resolution {
                                specifier,
                                importer: Some(id),
                            });
                        }
                        None => {
                            graph.warnings.push(BuildWarning::TypeExtraction(TypeExtractionError {
                                module: id.clone(),
                                symbol: specifier.clone(),
                                reason: "type-only import cannot be resolved".into(),
                            }));
                            continue;
                        }
                    }
                };
                graph.modules[idx].links.insert(specifier, target);
            }
        }

        if !graph.modules[0].parsed.kind.is_runtime() {
            return Err(PackError::configuration(format!(
                "entry {} is not a script module",
                graph.modules[0].id
            )));
        }

        graph.mark_runtime();
        graph.detect_cycles();
        graph.check_re_exports();

        info!(
            modules = graph.modules.len(),
            externals = graph.externals.len(),
            "Module graph resolved"
        );
        Ok(graph)
    }

    fn push_module(&mut self, resolver: &Resolver<'_>, fs: &dyn SourceFs, path: PathBuf) -> PackResult<usize> {
        let id = resolver.module_id(&path);
        let text = fs
            .read_to_string(&path)
            .map_err(|source| PackError::Unreadable {
                path: path.clone(),
                source,
            })?;
        let mut parsed = parse_module(&id, SourceKind::from_path(&path), &text)?;
        self.warnings.append(&mut parsed.warnings);
        debug!(module = %id, kind = ?parsed.kind, "Parsed module");

        self.modules.push(GraphModule {
            id,
            path,
            parsed,
            links: BTreeMap::new(),
            runtime: false,
        });
        Ok(self.modules.len() - 1)
    }

    /// Runtime edges: value imports, re-exports and dynamic imports
    fn runtime_edges(&self, idx: usize) -> Vec<(Target, EdgeKind)> {
        let module = &self.modules[idx];
        let record = &module.parsed.record;
        let mut edges = Vec::new();

        for specifier in record.requests() {
            if let Some(target) = module.target(specifier) {
                let binds = record
                    .imports
                    .iter()
                    .any(|d| d.specifier == specifier && d.value_bindings().next().is_some())
                    || record
                        .exports
                        .iter()
                        .any(|e| !e.is_type_only() && e.specifier() == Some(specifier));
                let kind = if binds { EdgeKind::Bound } else { EdgeKind::SideEffect };
                edges.push((target, kind));
            }
        }
        for dynamic in record.dynamic_imports.iter().filter(|d| !d.type_only) {
            if let Some(target) = module.target(&dynamic.specifier) {
                edges.push((target, EdgeKind::Dynamic));
            }
        }
        edges
    }

    fn mark_runtime(&mut self) {
        let mut stack = vec![0];
        self.modules[0].runtime = true;
        while let Some(idx) = stack.pop() {
            for (target, kind) in self.runtime_edges(idx) {
                match target {
                    Target::Internal(next) => {
                        if !self.modules[next].runtime {
                            self.modules[next].runtime = true;
                            stack.push(next);
                        }
                    }
                    Target::External(ext) => {
                        let external = &mut self.externals[ext];
                        match kind {
                            EdgeKind::Bound => {
                                external.runtime = true;
                                external.bound = true;
                            }
                            EdgeKind::SideEffect => external.runtime = true,
                            EdgeKind::Dynamic => external.dynamic = true,
                        }
                    }
                }
            }
        }

        let mut next = 0;
        self.slots = self
            .modules
            .iter()
            .map(|m| {
                (m.runtime && m.parsed.kind.is_runtime()).then(|| {
                    next += 1;
                    next - 1
                })
            })
            .collect();
    }

    fn detect_cycles(&mut self) {
        let mut seen: BTreeSet<Vec<String>> = BTreeSet::new();
        let mut done = vec![false; self.modules.len()];
        let mut path: Vec<usize> = Vec::new();
        self.visit(0, &mut path, &mut done, &mut seen);

        for cycle in seen {
            self.warnings.push(BuildWarning::CircularImport { cycle });
        }
    }

    fn visit(&self, idx: usize, path: &mut Vec<usize>, done: &mut [bool], seen: &mut BTreeSet<Vec<String>>) {
        if let Some(pos) = path.iter().position(|p| *p == idx) {
            let members = &path[pos..];
            let rotate = members
                .iter()
                .enumerate()
                .min_by_key(|(_, m)| self.modules[**m].id.as_str())
                .map(|(i, _)| i)
                .unwrap_or(0);
            let mut cycle: Vec<String> = members[rotate..]
                .iter()
                .chain(&members[..rotate])
                .map(|m| self.modules[*m].id.clone())
                .collect();
            cycle.push(cycle[0].clone());
            seen.insert(cycle);
            return;
        }
        if done[idx] {
            return;
        }

        path.push(idx);
        for (target, kind) in self.runtime_edges(idx) {
            if let (Target::Internal(next), EdgeKind::Bound | EdgeKind::SideEffect) = (target, kind) {
                self.visit(next, path, done, seen);
            }
        }
        path.pop();
        done[idx] = true;
    }

    /// Named re-exports must name something the target exports
    fn check_re_exports(&mut self) {
        let mut warnings = Vec::new();
        for module in self.modules.iter().filter(|m| m.runtime) {
            for entry in &module.parsed.record.exports {
                let ExportEntry::ReExport {
                    imported,
                    specifier,
                    type_only: false,
                    ..
                } = entry
                else {
                    continue;
                };
                let Some(name) = imported.export_name() else {
                    continue;
                };
                if let Some(Target::Internal(target)) = module.target(specifier) {
                    if self.resolve_export(target, name) == ExportOrigin::Missing {
                        warnings.push(BuildWarning::Unsupported {
                            module: module.id.clone(),
                            message: format!("'{}' is not exported by {}", name, self.modules[target].id),
                        });
                    }
                }
            }
        }
        self.warnings.extend(warnings);
    }

    /// Position of a module inside the bundle, if it contributes code
    pub fn slot(&self, idx: usize) -> Option<usize> {
        self.slots.get(idx).copied().flatten()
    }

    /// Modules contributing code, in bundle order
    pub fn runtime_modules(&self) -> impl Iterator<Item = (usize, &GraphModule)> {
        self.modules
            .iter()
            .enumerate()
            .filter(|(idx, _)| self.slot(*idx).is_some())
    }

    /// Externals the bundles load, in discovery order
    pub fn runtime_externals(&self) -> impl Iterator<Item = (usize, &ExternalModule)> {
        self.externals
            .iter()
            .enumerate()
            .filter(|(_, e)| e.runtime || e.dynamic)
    }

    /// Stylesheets of runtime modules, in discovery order
    pub fn styles(&self) -> Vec<&str> {
        self.modules
            .iter()
            .filter(|m| m.runtime)
            .flat_map(|m| m.parsed.styles.iter().map(String::as_str))
            .filter(|s| !s.trim().is_empty())
            .collect()
    }

    /// Follow `name` through re-exports and `export *`.
    pub fn resolve_export(&self, idx: usize, name: &str) -> ExportOrigin {
        self.resolve_export_in(idx, name, &mut HashSet::new())
    }

    fn resolve_export_in(&self, idx: usize, name: &str, visited: &mut HashSet<usize>) -> ExportOrigin {
        if !visited.insert(idx) {
            return ExportOrigin::Missing;
        }
        let module = &self.modules[idx];

        for entry in &module.parsed.record.exports {
            match entry {
                ExportEntry::Local {
                    exported,
                    type_only,
                    ..
                } if exported == name => {
                    return if *type_only {
                        ExportOrigin::Type
                    } else {
                        ExportOrigin::Value(idx)
                    };
                }
                ExportEntry::ReExport {
                    exported,
                    imported,
                    specifier,
                    type_only,
                } if exported == name => {
                    if *type_only {
                        return ExportOrigin::Type;
                    }
                    return match (module.target(specifier), imported) {
                        (None, _) => ExportOrigin::Type,
                        (Some(Target::External(ext)), _) => ExportOrigin::External(ext),
                        (Some(Target::Internal(target)), Imported::Namespace) => ExportOrigin::Value(target),
                        (Some(Target::Internal(target)), Imported::Default) => {
                            self.resolve_export_in(target, "default", visited)
                        }
                        (Some(Target::Internal(target)), Imported::Named(inner)) => {
                            self.resolve_export_in(target, inner, visited)
                        }
                    };
                }
                _ => {}
            }
        }

        if name == "default" {
            return ExportOrigin::Missing;
        }

        let mut external_star = None;
        for entry in &module.parsed.record.exports {
            if let ExportEntry::Star {
                specifier,
                type_only: false,
            } = entry
            {
                match module.target(specifier) {
                    Some(Target::Internal(target)) => {
                        let origin = self.resolve_export_in(target, name, visited);
                        if origin != ExportOrigin::Missing {
                            return origin;
                        }
                    }
                    Some(Target::External(ext)) => {
                        external_star.get_or_insert(ext);
                    }
                    None => {}
                }
            }
        }
        match external_star {
            Some(ext) => ExportOrigin::External(ext),
            None => ExportOrigin::Missing,
        }
    }

    /// Value export names of a module, stars expanded through internal modules
    pub fn export_names(&self, idx: usize) -> Vec<String> {
        let mut names = Vec::new();
        let mut seen = HashSet::new();
        self.collect_names(idx, true, &mut names, &mut seen, &mut HashSet::new());
        names
    }

    fn collect_names(
        &self,
        idx: usize,
        include_default: bool,
        names: &mut Vec<String>,
        seen: &mut HashSet<String>,
        visited: &mut HashSet<usize>,
    ) {
        if !visited.insert(idx) {
            return;
        }
        let module = &self.modules[idx];
        for entry in &module.parsed.record.exports {
            if let Some(name) = entry.exported() {
                if (name != "default" || include_default)
                    && !entry.is_type_only()
                    && self.resolve_export(idx, name).is_value()
                    && seen.insert(name.to_string())
                {
                    names.push(name.to_string());
                }
            }
        }
        for entry in &module.parsed.record.exports {
            if let ExportEntry::Star {
                specifier,
                type_only: false,
            } = entry
            {
                if let Some(Target::Internal(target)) = module.target(specifier) {
                    self.collect_names(target, false, names, seen, visited);
                }
            }
        }
    }

    /// Externals whose whole surface `idx` re-exports through `export *`
    pub fn external_stars(&self, idx: usize) -> Vec<usize> {
        let mut found = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![idx];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let module = &self.modules[current];
            for entry in &module.parsed.record.exports {
                if let ExportEntry::Star {
                    specifier,
                    type_only: false,
                } = entry
                {
                    match module.target(specifier) {
                        Some(Target::Internal(target)) => stack.push(target),
                        Some(Target::External(ext)) if !found.contains(&ext) => found.push(ext),
                        _ => {}
                    }
                }
            }
        }
        found.sort_unstable();
        found
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeKind {
    Bound,
    SideEffect,
    Dynamic,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::fs::MemoryFs;
    use std::path::Path;

    fn plan() -> BuildPlan {
        BuildPlan::from_config(&Config::default(), Path::new("/p")).unwrap()
    }

    fn build(fs: &MemoryFs) -> PackResult<ModuleGraph> {
        ModuleGraph::build(&plan(), fs)
    }

    fn ids(graph: &ModuleGraph) -> Vec<&str> {
        graph.modules.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn discovers_modules_breadth_first() {
        let fs = MemoryFs::new()
            .with("/p/src/index.ts", "import { a } from './a';\nexport * from './b';\nexport { a };\n")
            .with("/p/src/a.ts", "import { c } from './c';\nexport const a = c;\n")
            .with("/p/src/b.ts", "export const b = 2;\n")
            .with("/p/src/c.ts", "export const c = 3;\n");
        let graph = build(&fs).unwrap();

        assert_eq!(ids(&graph), vec!["src/index.ts", "src/a.ts", "src/b.ts", "src/c.ts"]);
        assert_eq!(graph.modules[0].target("./a"), Some(Target::Internal(1)));
        assert_eq!(graph.slot(3), Some(3));
        assert_eq!(graph.export_names(0), vec!["a", "b"]);
        assert!(graph.warnings.is_empty());
    }

    #[test]
    fn externals_are_not_read() {
        let fs = MemoryFs::new().with(
            "/p/src/index.ts",
            "import { ref } from 'vue';\nimport L from 'leaflet';\nimport 'leaflet/dist/leaflet.css';\nexport const m = L.map(ref(1));\n",
        );
        let graph = build(&fs).unwrap();

        assert_eq!(graph.modules.len(), 1);
        let specs: Vec<&str> = graph.externals.iter().map(|e| e.specifier.as_str()).collect();
        assert_eq!(specs, vec!["vue", "leaflet", "leaflet/dist/leaflet.css"]);
        assert!(graph.externals[0].is_bound());
        assert!(graph.externals[2].runtime);
        assert!(!graph.externals[2].is_bound());
        assert_eq!(graph.externals[1].importers, vec!["src/index.ts"]);
    }

    #[test]
    fn unresolved_runtime_import_fails() {
        let fs = MemoryFs::new().with("/p/src/index.ts", "import { x } from './missing';\nconsole.log(x);\n");
        let err = build(&fs).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot resolve './missing' imported from src/index.ts"
        );
    }

    #[test]
    fn unresolved_type_import_warns() {
        let fs = MemoryFs::new().with(
            "/p/src/index.ts",
            "import type { Options } from './missing';\nexport const o: Options | null = null;\n",
        );
        let graph = build(&fs).unwrap();
        assert_eq!(graph.warnings.len(), 1);
        assert!(matches!(graph.warnings[0], BuildWarning::TypeExtraction(_)));
    }

    #[test]
    fn type_only_modules_are_not_bundled() {
        let fs = MemoryFs::new()
            .with(
                "/p/src/index.ts",
                "import type { Options } from './types';\nexport { Options } from './types';\nexport const zoom: Options = { zoom: 1 };\n",
            )
            .with("/p/src/types.ts", "export interface Options { zoom: number }\n");
        let graph = build(&fs).unwrap();

        assert!(graph.modules[0].runtime);
        assert!(graph.modules[1].runtime);
        assert_eq!(graph.resolve_export(0, "Options"), ExportOrigin::Type);
        assert_eq!(graph.export_names(0), vec!["zoom"]);
    }

    #[test]
    fn cycles_are_reported_once() {
        let fs = MemoryFs::new()
            .with("/p/src/index.ts", "import { b } from './b';\nexport const a = () => b;\n")
            .with("/p/src/b.ts", "import { a } from './index';\nexport const b = () => a;\n");
        let graph = build(&fs).unwrap();

        assert_eq!(
            graph.warnings,
            vec![BuildWarning::CircularImport {
                cycle: vec!["src/b.ts".into(), "src/index.ts".into(), "src/b.ts".into()],
            }]
        );
    }

    #[test]
    fn external_star_supplies_unknown_names() {
        let fs = MemoryFs::new()
            .with("/p/src/index.ts", "export * from './reexports';\nexport const own = 1;\n")
            .with("/p/src/reexports.ts", "export * from 'leaflet';\n");
        let graph = build(&fs).unwrap();

        assert_eq!(graph.external_stars(0), vec![0]);
        assert_eq!(graph.resolve_export(0, "marker"), ExportOrigin::External(0));
        assert_eq!(graph.resolve_export(0, "own"), ExportOrigin::Value(0));
        assert_eq!(graph.resolve_export(0, "default"), ExportOrigin::Missing);
    }

    #[test]
    fn styles_and_components() {
        let fs = MemoryFs::new()
            .with("/p/src/index.ts", "import './base.css';\nexport { default as LMap } from './LMap.vue';\n")
            .with("/p/src/base.css", ".leaflet { z-index: 0; }\n")
            .with("/p/src/LMap.vue", "<template><div/></template>\n<style>.map{}</style>\n");
        let graph = build(&fs).unwrap();

        assert_eq!(graph.styles(), vec![".leaflet { z-index: 0; }\n", ".map{}"]);
        assert_eq!(graph.slot(1), None);
        assert_eq!(graph.slot(2), Some(1));
        assert_eq!(graph.export_names(0), vec!["LMap"]);
    }

    #[test]
    fn css_entry_is_rejected() {
        let mut config = Config::default();
        config.lib.entry = "@src/index.css".into();
        let plan = BuildPlan::from_config(&config, Path::new("/p")).unwrap();
        let fs = MemoryFs::new().with("/p/src/index.css", "a{}");
        let err = ModuleGraph::build(&plan, &fs).unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }
}
