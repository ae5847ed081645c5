//! Configuration module for packlet
//!
//! Configuration hierarchy:
//! 1. CLI flags (highest priority)
//! 2. Environment variables (PACKLET_*)
//! 3. Project config (`packlet.toml`)
//! 4. Built-in defaults, mirroring the vue-leaflet layout (lowest priority)

mod loader;
mod types;

pub use loader::{load_project, load_with_warnings, with_env_overrides, CONFIG_FILE};
pub use types::{Config, DtsConfig, ExternalConfig, LibConfig, OutputConfig, ResolveConfig};
