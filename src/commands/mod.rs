//! Subcommand implementations for the `packlet` binary

pub mod build;
pub mod check;
pub mod graph;
pub mod init;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use packlet::config::{load_project, Config};
use packlet::error::BuildWarning;
use packlet::plan::BuildPlan;

use crate::cli::ProjectArgs;

/// Project root from `--root`, else the current directory
pub(crate) fn project_root(root: Option<&Path>) -> Result<PathBuf> {
    let root = match root {
        Some(root) => root.to_path_buf(),
        None => std::env::current_dir().context("cannot determine the current directory")?,
    };
    Ok(root.canonicalize().unwrap_or(root))
}

/// Load config (file, env, then `adjust` for CLI flags) and validate it
pub(crate) fn load_plan(
    project: &ProjectArgs,
    adjust: impl FnOnce(&mut Config),
) -> Result<(BuildPlan, Vec<BuildWarning>)> {
    let root = project_root(project.root.as_deref())?;
    let (mut config, warnings) = load_project(&root, project.config.as_deref())?;
    adjust(&mut config);
    let plan = BuildPlan::from_config(&config, &root)?;
    Ok((plan, warnings))
}

pub(crate) fn print_warnings(warnings: &[BuildWarning]) {
    for warning in warnings {
        eprintln!("warning: {}", warning);
    }
}

/// Path relative to `root` for display
pub(crate) fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
