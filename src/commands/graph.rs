use anyhow::Result;
use serde::Serialize;

use packlet::graph::{ModuleGraph, Target};
use packlet::packager::Packager;

use crate::cli::ProjectArgs;

use super::load_plan;

#[derive(Serialize)]
struct GraphView<'a> {
    modules: Vec<ModuleView<'a>>,
    externals: Vec<ExternalView<'a>>,
}

#[derive(Serialize)]
struct ModuleView<'a> {
    id: &'a str,
    runtime: bool,
    imports: Vec<ImportView<'a>>,
}

#[derive(Serialize)]
struct ImportView<'a> {
    specifier: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    module: Option<&'a str>,
    external: bool,
}

#[derive(Serialize)]
struct ExternalView<'a> {
    specifier: &'a str,
    importers: &'a [String],
}

fn view(graph: &ModuleGraph) -> GraphView<'_> {
    let modules = graph
        .modules
        .iter()
        .map(|m| ModuleView {
            id: &m.id,
            runtime: m.runtime,
            imports: m
                .links
                .iter()
                .map(|(specifier, target)| match target {
                    Target::Internal(idx) => ImportView {
                        specifier,
                        module: Some(&graph.modules[*idx].id),
                        external: false,
                    },
                    Target::External(_) => ImportView {
                        specifier,
                        module: None,
                        external: true,
                    },
                })
                .collect(),
        })
        .collect();
    let externals = graph
        .externals
        .iter()
        .map(|e| ExternalView {
            specifier: &e.specifier,
            importers: &e.importers,
        })
        .collect();
    GraphView { modules, externals }
}

/// Print internal modules with their imports and externals with their importers
pub fn cmd_graph(project: ProjectArgs, json: bool) -> Result<()> {
    let (plan, _) = load_plan(&project, |_| {})?;
    let graph = Packager::new(&plan).graph()?;
    let view = view(&graph);

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    for module in &view.modules {
        let marker = if module.runtime { "" } else { " (types only)" };
        println!("{}{}", module.id, marker);
        for import in &module.imports {
            match import.module {
                Some(id) => println!("  -> {} ({})", import.specifier, id),
                None => println!("  -> {} [external]", import.specifier),
            }
        }
    }
    if !view.externals.is_empty() {
        println!();
        println!("externals:");
        for external in &view.externals {
            println!("  {} <- {}", external.specifier, external.importers.join(", "));
        }
    }
    Ok(())
}
