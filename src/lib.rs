//! packlet - library packager
//!
//! Bundles a component library (TypeScript, JavaScript, Vue single-file
//! components, JSON, CSS) from one entry module into ES module, CommonJS and
//! UMD artifacts plus a merged declaration file. Configured externals (the
//! host framework and mapping library) are never bundled.

pub mod config;
pub mod dts;
pub mod emit;
pub mod error;
pub mod exit_codes;
pub mod external;
pub mod fs;
pub mod graph;
pub mod models;
pub mod packager;
pub mod parser;
pub mod plan;
pub mod resolver;
pub mod watcher;
pub mod writer;

// Re-exports for convenience
pub use config::Config;
pub use error::{BuildWarning, PackError, PackResult, TypeExtractionError};
pub use external::{ExternalMatcher, GlobalNameMap, ModuleClass};
pub use models::{Artifact, ArtifactKind, FormatSet, LibraryIdentity, ModuleFormat};
pub use packager::{BuildOutput, BuildReport, Packager};
pub use plan::BuildPlan;

/// Build every configured artifact and write it to the output directory.
pub fn build(plan: &BuildPlan) -> PackResult<BuildReport> {
    Packager::new(plan).run()
}
