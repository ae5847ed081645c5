//! The library packager
//!
//! `build` is pure: graph, bundles and declarations are computed in memory
//! (formats and the declaration pass in parallel). `write` emits them.

use std::path::PathBuf;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::dts::declarations;
use crate::emit::{emitter_for, Bundle};
use crate::error::{BuildWarning, PackError, PackResult};
use crate::fs::{LocalFs, SourceFs};
use crate::graph::ModuleGraph;
use crate::models::{Artifact, ArtifactKind, ModuleFormat};
use crate::plan::BuildPlan;
use crate::writer::{self, ArtifactEntry, Manifest};

/// Artifacts of one build, not yet written
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub artifacts: Vec<Artifact>,
    pub warnings: Vec<BuildWarning>,
}

/// Everything validated before code generation
#[derive(Debug, Clone)]
pub struct Analysis {
    pub graph: ModuleGraph,
    /// UMD global per external, indexed like `graph.externals`
    pub globals: Vec<Option<String>>,
    pub warnings: Vec<BuildWarning>,
}

/// What a completed build wrote
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub out_dir: PathBuf,
    pub artifacts: Vec<ArtifactEntry>,
    pub warnings: Vec<BuildWarning>,
}

pub struct Packager<'a> {
    plan: &'a BuildPlan,
    fs: &'a dyn SourceFs,
}

impl<'a> Packager<'a> {
    pub fn new(plan: &'a BuildPlan) -> Self {
        Self { plan, fs: &LocalFs }
    }

    /// Read sources through `fs` instead of the local disk
    pub fn with_fs(plan: &'a BuildPlan, fs: &'a dyn SourceFs) -> Self {
        Self { plan, fs }
    }

    /// Resolve and analyse the import graph only
    pub fn graph(&self) -> PackResult<ModuleGraph> {
        ModuleGraph::build(self.plan, self.fs)
    }

    /// Resolve the graph and the UMD globals it needs
    pub fn analyse(&self) -> PackResult<Analysis> {
        let graph = self.graph()?;
        let mut warnings = graph.warnings.clone();
        let globals = self.globals(&graph, &mut warnings)?;
        Ok(Analysis {
            graph,
            globals,
            warnings,
        })
    }

    pub fn build(&self) -> PackResult<BuildOutput> {
        let plan = self.plan;
        let Analysis {
            graph,
            globals,
            mut warnings,
        } = self.analyse()?;
        let bundle = Bundle {
            graph: &graph,
            identity: &plan.identity,
            banner: plan.banner.as_deref(),
            globals,
        };

        let formats = plan.formats.as_slice();
        let (code, dts) = rayon::join(
            || {
                formats
                    .par_iter()
                    .map(|format| {
                        let content = emitter_for(*format).emit(&bundle)?;
                        Ok(Artifact::new(
                            plan.identity.artifact_name(*format),
                            ArtifactKind::Code(*format),
                            content,
                        ))
                    })
                    .collect::<PackResult<Vec<_>>>()
            },
            || plan.dts_file.as_ref().map(|file| (file, declarations(&graph))),
        );

        let mut artifacts = code?;
        if let Some((file, dts)) = dts {
            warnings.extend(dts.warnings);
            artifacts.push(Artifact::new(file.as_str(), ArtifactKind::Declarations, dts.text));
        }

        let styles = graph.styles();
        if !styles.is_empty() {
            let mut css = styles.join("\n");
            if !css.ends_with('\n') {
                css.push('\n');
            }
            artifacts.push(Artifact::new(plan.css_file.as_str(), ArtifactKind::Stylesheet, css));
        }

        for warning in &warnings {
            warn!("{}", warning);
        }

        if plan.manifest {
            let manifest = Manifest {
                name: plan.identity.name(),
                externals: graph.externals.iter().map(|e| e.specifier.as_str()).collect(),
                globals: plan.globals.iter().collect(),
                artifacts: artifacts.iter().map(ArtifactEntry::of).collect(),
                warnings: writer::warning_lines(&warnings),
            };
            artifacts.push(manifest.to_artifact(&plan.manifest_name())?);
        }

        info!(
            modules = graph.modules.len(),
            externals = graph.externals.len(),
            artifacts = artifacts.len(),
            "build complete"
        );
        Ok(BuildOutput { artifacts, warnings })
    }

    /// Write a finished build into the output directory
    pub fn write(&self, output: BuildOutput) -> PackResult<BuildReport> {
        let plan = self.plan;
        writer::write_artifacts(
            &plan.out_dir,
            &output.artifacts,
            &plan.manifest_name(),
            plan.empty_out_dir,
        )?;
        info!(out_dir = %plan.out_dir.display(), "artifacts written");
        Ok(BuildReport {
            out_dir: plan.out_dir.clone(),
            artifacts: output.artifacts.iter().map(ArtifactEntry::of).collect(),
            warnings: output.warnings,
        })
    }

    pub fn run(&self) -> PackResult<BuildReport> {
        let output = self.build()?;
        self.write(output)
    }

    /// UMD globals for the externals the bundles bind, indexed like
    /// `graph.externals`. Empty unless UMD is requested.
    fn globals(&self, graph: &ModuleGraph, warnings: &mut Vec<BuildWarning>) -> PackResult<Vec<Option<String>>> {
        if !self.plan.formats.contains(ModuleFormat::Umd) {
            return Ok(vec![None; graph.externals.len()]);
        }
        let mut globals = Vec::with_capacity(graph.externals.len());
        for external in &graph.externals {
            if !external.is_bound() {
                globals.push(None);
                continue;
            }
            let binding = self.plan.globals.binding_for(&external.specifier).ok_or_else(|| {
                PackError::configuration(format!(
                    "UMD output needs a global name for external '{}' (imported from {})",
                    external.specifier,
                    external.importers.join(", ")
                ))
            })?;
            if binding.guessed {
                warnings.push(BuildWarning::GuessedGlobal {
                    specifier: external.specifier.clone(),
                    global: binding.global.clone(),
                });
            }
            globals.push(Some(binding.global));
        }
        Ok(globals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::fs::MemoryFs;
    use std::path::Path;

    fn fixture() -> MemoryFs {
        MemoryFs::new()
            .with("/p/src/index.ts", "import { h } from 'vue';\nimport { marker } from 'leaflet/src/layer';\nimport Map from './LMap.vue';\nexport { Map };\nexport const render = () => h('div', marker);\n")
            .with("/p/src/LMap.vue", "<template><div class=\"map\"></div></template>\n<script lang=\"ts\">\nexport default { name: 'LMap' };\n</script>\n<style>.map { height: 100%; }</style>\n")
    }

    fn plan(config: &Config) -> BuildPlan {
        BuildPlan::from_config(config, Path::new("/p")).unwrap()
    }

    #[test]
    fn build_produces_every_artifact() {
        let plan = plan(&Config::default());
        let fs = fixture();
        let output = Packager::with_fs(&plan, &fs).build().unwrap();

        let names: Vec<&str> = output.artifacts.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "vue-leaflet.es.js",
                "vue-leaflet.cjs.js",
                "vue-leaflet.umd.js",
                "index.d.ts",
                "style.css",
                "vue-leaflet.manifest.json"
            ]
        );
        let umd = &output.artifacts[2].content;
        assert!(umd.contains("global.Vue, global.L"));
        assert!(output.warnings.iter().any(|w| matches!(
            w,
            BuildWarning::GuessedGlobal { specifier, global } if specifier == "leaflet/src/layer" && global == "L"
        )));
    }

    #[test]
    fn build_is_deterministic() {
        let plan = plan(&Config::default());
        let fs = fixture();
        let first = Packager::with_fs(&plan, &fs).build().unwrap();
        let second = Packager::with_fs(&plan, &fs).build().unwrap();
        assert_eq!(first.artifacts, second.artifacts);
    }

    #[test]
    fn unmapped_bound_external_fails_before_emission() {
        let mut config = Config::default();
        config.external.modules.push("lodash".into());
        config.output.globals.insert("lodash".into(), "_".into());
        let mut plan = plan(&config);
        plan.globals = crate::external::GlobalNameMap::new(Default::default());
        let fs = MemoryFs::new().with("/p/src/index.ts", "import { debounce } from 'lodash';\nexport const d = debounce;\n");

        let err = Packager::with_fs(&plan, &fs).build().unwrap_err();
        assert_eq!(err.kind(), "configuration");
        assert!(err.to_string().contains("'lodash'"));
    }

    #[test]
    fn formats_without_umd_need_no_globals() {
        let mut config = Config::default();
        config.lib.formats = vec!["es".into()];
        config.output.globals.clear();
        let plan = plan(&config);
        let fs = fixture();
        let output = Packager::with_fs(&plan, &fs).build().unwrap();
        assert_eq!(output.artifacts[0].kind, ArtifactKind::Code(ModuleFormat::Es));
        assert!(!output.warnings.iter().any(|w| matches!(w, BuildWarning::GuessedGlobal { .. })));
    }
}
