//! Configuration types (`packlet.toml`)

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// `[lib]` section: what is being packaged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibConfig {
    /// Library name, used for file names and the UMD global
    #[serde(default = "default_name")]
    pub name: String,

    /// Entry module, relative to the project root or through an alias
    #[serde(default = "default_entry")]
    pub entry: String,

    /// Output formats, in emission order
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,

    /// File-name template for code artifacts
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Override for the UMD global (defaults to `name`)
    #[serde(default)]
    pub global_name: Option<String>,
}

impl Default for LibConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            entry: default_entry(),
            formats: default_formats(),
            file_name: default_file_name(),
            global_name: None,
        }
    }
}

fn default_name() -> String {
    "vue-leaflet".to_string()
}

fn default_entry() -> String {
    "@src/index.ts".to_string()
}

fn default_formats() -> Vec<String> {
    vec!["es".to_string(), "cjs".to_string(), "umd".to_string()]
}

fn default_file_name() -> String {
    "{name}.{format}.js".to_string()
}

/// `[resolve]` section: how import specifiers map to files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveConfig {
    /// Alias prefix -> directory relative to the project root
    #[serde(default = "default_alias")]
    pub alias: BTreeMap<String, String>,

    /// Extensions probed for extension-less specifiers, in order
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            alias: default_alias(),
            extensions: default_extensions(),
        }
    }
}

fn default_alias() -> BTreeMap<String, String> {
    BTreeMap::from([("@src".to_string(), "src".to_string())])
}

fn default_extensions() -> Vec<String> {
    [".mjs", ".js", ".mts", ".ts", ".json", ".vue"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// `[external]` section: imports left to the consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalConfig {
    /// Exact module names
    #[serde(default = "default_external_modules")]
    pub modules: Vec<String>,

    /// Regular expressions (or `name/*` prefixes) matched against specifiers
    #[serde(default = "default_external_patterns")]
    pub patterns: Vec<String>,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            modules: default_external_modules(),
            patterns: default_external_patterns(),
        }
    }
}

fn default_external_modules() -> Vec<String> {
    vec!["vue".to_string(), "leaflet".to_string()]
}

fn default_external_patterns() -> Vec<String> {
    vec!["^leaflet/.*".to_string()]
}

/// `[output]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_out_dir")]
    pub dir: PathBuf,

    /// UMD globals: external module name -> global variable
    #[serde(default = "default_globals")]
    pub globals: BTreeMap<String, String>,

    /// Text placed at the top of every code artifact
    #[serde(default)]
    pub banner: Option<String>,

    /// File name of the extracted stylesheet
    #[serde(default = "default_css_file")]
    pub css_file: String,

    /// Remove artifacts listed in the previous manifest before writing
    #[serde(default = "default_true")]
    pub empty_out_dir: bool,

    /// Write `<name>.manifest.json`
    #[serde(default = "default_true")]
    pub manifest: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_out_dir(),
            globals: default_globals(),
            banner: None,
            css_file: default_css_file(),
            empty_out_dir: true,
            manifest: true,
        }
    }
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_globals() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("vue".to_string(), "Vue".to_string()),
        ("leaflet".to_string(), "L".to_string()),
    ])
}

fn default_css_file() -> String {
    "style.css".to_string()
}

fn default_true() -> bool {
    true
}

/// `[dts]` section: merged type declarations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DtsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_dts_file")]
    pub file: String,
}

impl Default for DtsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file: default_dts_file(),
        }
    }
}

fn default_dts_file() -> String {
    "index.d.ts".to_string()
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub lib: LibConfig,

    #[serde(default)]
    pub resolve: ResolveConfig,

    #[serde(default)]
    pub external: ExternalConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub dts: DtsConfig,
}
