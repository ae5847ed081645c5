//! packlet CLI - library packager
//!
//! Usage: packlet <COMMAND>
//!
//! Commands:
//!   build   Build ES, CommonJS and UMD bundles plus index.d.ts
//!   check   Validate configuration and resolve the module graph
//!   graph   Print the resolved module graph
//!   init    Write a starter packlet.toml

mod cli;
mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::build::BuildArgs;
use packlet::error::PackError;
use packlet::exit_codes::exit_code_for_anyhow;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json);

    let json = cli.json;
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err, json);
            ExitCode::from(exit_code_for_anyhow(&err) as u8)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Build {
            project,
            out_dir,
            format,
            no_dts,
            watch,
        } => commands::build::cmd_build(
            BuildArgs {
                project,
                out_dir,
                formats: format,
                no_dts,
                watch,
            },
            cli.json,
        ),
        Commands::Check { project } => commands::check::cmd_check(project, cli.json),
        Commands::Graph { project } => commands::graph::cmd_graph(project, cli.json),
        Commands::Init { root, name, force } => {
            commands::init::cmd_init(root.as_deref(), name, force, cli.json)
        }
    }
}

/// Logs go to stderr; `PACKLET_LOG` overrides the `-v` level
fn init_tracing(verbose: u8, json: bool) {
    let level = match verbose {
        0 => "error",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("PACKLET_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("packlet={}", level)));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn report_error(err: &anyhow::Error, json: bool) {
    if json {
        let kind = err
            .downcast_ref::<PackError>()
            .map(PackError::kind)
            .unwrap_or("other");
        eprintln!(
            "{}",
            serde_json::json!({ "error": { "kind": kind, "message": format!("{:#}", err) } })
        );
    } else {
        eprintln!("error: {:#}", err);
    }
}
