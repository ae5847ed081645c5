//! Configuration loading and environment overrides

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BuildWarning, PackError, PackResult};

use super::types::Config;

/// Default config file name at the project root
pub const CONFIG_FILE: &str = "packlet.toml";

/// Load configuration and collect unknown keys as warnings.
pub fn load_with_warnings(path: &Path) -> PackResult<(Config, Vec<BuildWarning>)> {
    let content = fs::read_to_string(path)?;

    let mut unknown_paths: Vec<String> = Vec::new();
    let deserializer = toml::de::Deserializer::new(&content);

    let config: Config = serde_ignored::deserialize(deserializer, |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| PackError::InvalidConfig {
        file: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let warnings = unknown_paths
        .into_iter()
        .map(|key| BuildWarning::UnknownConfigKey {
            key,
            file: path.to_path_buf(),
        })
        .collect();

    Ok((config, warnings))
}

/// Load the project config if present, otherwise defaults; env overrides applied.
///
/// An explicitly named config file that does not exist is a configuration error.
pub fn load_project(
    root: &Path,
    explicit: Option<&Path>,
) -> PackResult<(Config, Vec<BuildWarning>)> {
    let path = match explicit {
        Some(p) if p.is_absolute() => p.to_path_buf(),
        Some(p) => root.join(p),
        None => root.join(CONFIG_FILE),
    };

    if !path.exists() {
        if explicit.is_some() {
            return Err(PackError::configuration(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok((with_env_overrides(Config::default()), Vec::new()));
    }

    tracing::debug!(path = %path.display(), "loading config");
    let (config, warnings) = load_with_warnings(&path)?;
    Ok((with_env_overrides(config), warnings))
}

/// Apply environment variable overrides (PACKLET_* prefix)
pub fn with_env_overrides(mut config: Config) -> Config {
    // PACKLET_OUT_DIR
    if let Ok(dir) = std::env::var("PACKLET_OUT_DIR") {
        if !dir.trim().is_empty() {
            config.output.dir = PathBuf::from(dir);
        }
    }

    // PACKLET_FORMATS (comma-separated, validated later with the rest)
    if let Ok(formats) = std::env::var("PACKLET_FORMATS") {
        let parsed: Vec<String> = formats
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if !parsed.is_empty() {
            config.formats_override(parsed);
        }
    }

    // PACKLET_DTS
    if let Ok(val) = std::env::var("PACKLET_DTS") {
        config.dts.enabled = val.to_lowercase() != "false" && val != "0";
    }

    config
}

impl Config {
    /// Load a config file without env overrides
    pub fn load(path: &Path) -> PackResult<Config> {
        load_with_warnings(path).map(|(config, _)| config)
    }

    pub fn formats_override(&mut self, formats: Vec<String>) {
        self.lib.formats = formats;
    }

    /// Starter `packlet.toml` written by `packlet init`
    pub fn template(name: &str) -> String {
        format!(
            r#"# packlet build configuration

[lib]
name = "{name}"
entry = "@src/index.ts"
formats = ["es", "cjs", "umd"]
file_name = "{{name}}.{{format}}.js"

[resolve.alias]
"@src" = "src"

[external]
# Left to the consumer instead of being bundled
modules = ["vue", "leaflet"]
patterns = ["^leaflet/.*"]

[output]
dir = "dist"

[output.globals]
# Global variables the UMD build reads externals from
vue = "Vue"
leaflet = "L"

[dts]
enabled = true
file = "index.d.ts"
"#
        )
    }
}
