use anyhow::Result;
use serde::Serialize;

use packlet::packager::Packager;

use crate::cli::ProjectArgs;

use super::{load_plan, print_warnings};

#[derive(Serialize)]
struct CheckReport<'a> {
    ok: bool,
    modules: usize,
    externals: Vec<&'a str>,
    formats: Vec<&'static str>,
    warnings: Vec<String>,
}

/// Validate configuration, resolve the graph and the UMD globals; write nothing
pub fn cmd_check(project: ProjectArgs, json: bool) -> Result<()> {
    let (plan, mut warnings) = load_plan(&project, |_| {})?;
    let analysis = Packager::new(&plan).analyse()?;
    warnings.extend(analysis.warnings.iter().cloned());

    if json {
        let report = CheckReport {
            ok: true,
            modules: analysis.graph.modules.len(),
            externals: analysis
                .graph
                .externals
                .iter()
                .map(|e| e.specifier.as_str())
                .collect(),
            formats: plan.formats.as_slice().iter().map(|f| f.tag()).collect(),
            warnings: warnings.iter().map(ToString::to_string).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_warnings(&warnings);
    println!(
        "✓ {}: {} modules, {} externals, formats {}",
        plan.identity.name(),
        analysis.graph.modules.len(),
        analysis.graph.externals.len(),
        plan.formats
            .as_slice()
            .iter()
            .map(|f| f.tag())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}
