use std::path::PathBuf;

use anyhow::Result;

use packlet::packager::{BuildReport, Packager};

use crate::cli::ProjectArgs;

use super::{display_path, load_plan, print_warnings};

pub struct BuildArgs {
    pub project: ProjectArgs,
    pub out_dir: Option<PathBuf>,
    pub formats: Option<Vec<String>>,
    pub no_dts: bool,
    pub watch: bool,
}

pub fn cmd_build(args: BuildArgs, json: bool) -> Result<()> {
    let (plan, config_warnings) = load_plan(&args.project, |config| {
        if let Some(dir) = args.out_dir {
            config.output.dir = dir;
        }
        if let Some(formats) = args.formats {
            config.formats_override(formats);
        }
        if args.no_dts {
            config.dts.enabled = false;
        }
    })?;

    if args.watch {
        if !json {
            print_warnings(&config_warnings);
        }
        return super::watch::cmd_watch(&plan, json);
    }

    let mut report = Packager::new(&plan).run()?;
    report.warnings.splice(0..0, config_warnings);
    print_report(&report, &plan.root, json)
}

pub(crate) fn print_report(report: &BuildReport, root: &std::path::Path, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for artifact in &report.artifacts {
        let path = report.out_dir.join(&artifact.file);
        println!("✓ {}  {} bytes", display_path(&path, root), artifact.bytes);
    }
    print_warnings(&report.warnings);
    if report.warnings.is_empty() {
        println!("built {} artifacts", report.artifacts.len());
    } else {
        println!(
            "built {} artifacts with {} warning(s)",
            report.artifacts.len(),
            report.warnings.len()
        );
    }
    Ok(())
}
