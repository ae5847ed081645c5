use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// packlet - bundle a component library into ES, CommonJS and UMD artifacts
#[derive(Parser, Debug)]
#[command(name = "packlet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Machine-readable output (JSON report, NDJSON watch events and logs)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the project and its configuration live
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Project root (defaults to the current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Config file, relative to the root (defaults to packlet.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the configured formats and the declaration file
    Build {
        #[command(flatten)]
        project: ProjectArgs,

        /// Output directory (overrides [output].dir)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Formats to build, comma separated (es, cjs, umd)
        #[arg(short, long, value_delimiter = ',')]
        format: Option<Vec<String>>,

        /// Skip the declaration file
        #[arg(long)]
        no_dts: bool,

        /// Rebuild when sources change
        #[arg(short, long)]
        watch: bool,
    },

    /// Validate configuration and resolve the module graph without writing
    Check {
        #[command(flatten)]
        project: ProjectArgs,
    },

    /// Print the resolved module graph
    Graph {
        #[command(flatten)]
        project: ProjectArgs,
    },

    /// Write a starter packlet.toml
    Init {
        /// Project root (defaults to the current directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Library name (defaults to the root directory name)
        #[arg(long)]
        name: Option<String>,

        /// Overwrite an existing packlet.toml
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_flags_parse() {
        let cli = Cli::try_parse_from([
            "packlet", "-vv", "build", "--format", "es,umd", "--no-dts", "--out-dir", "lib",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Build {
                format,
                no_dts,
                out_dir,
                watch,
                ..
            } => {
                assert_eq!(format, Some(vec!["es".to_string(), "umd".to_string()]));
                assert!(no_dts);
                assert!(!watch);
                assert_eq!(out_dir, Some(PathBuf::from("lib")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn json_is_global() {
        let cli = Cli::try_parse_from(["packlet", "check", "--json", "--root", "/p"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Check { project } => assert_eq!(project.root, Some(PathBuf::from("/p"))),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn command_is_required() {
        assert!(Cli::try_parse_from(["packlet"]).is_err());
    }
}
