//! Error types for packlet
//!
//! Fatal build errors use `thiserror`. Declaration-pass problems are not
//! errors: they surface as [`BuildWarning`]s next to a successful build.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Result type alias for packlet operations
pub type PackResult<T> = Result<T, PackError>;

/// Main error type for packlet operations
#[derive(Error, Debug)]
pub enum PackError {
    /// Entry point or internal import could not be located
    #[error("cannot resolve '{specifier}'{}", importer_suffix(.importer))]
    Resolution {
        specifier: String,
        importer: Option<String>,
    },

    /// Source file exists but could not be read
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid or incomplete build configuration
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Source text the module scanner cannot handle
    #[error("parse error in {file}:{line}: {message}")]
    Parse {
        file: String,
        line: usize,
        message: String,
    },

    /// Config file is not valid TOML or has mistyped values
    #[error("invalid config file {file}: {message}")]
    InvalidConfig { file: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error (JSON modules, manifests)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File watcher failure
    #[error("watch error: {0}")]
    Watch(String),

    /// Another packlet process holds the output directory lock
    #[error("output directory {path} is locked by another build")]
    Locked { path: PathBuf },
}

fn importer_suffix(importer: &Option<String>) -> String {
    match importer {
        Some(from) => format!(" imported from {}", from),
        None => " (entry point)".to_string(),
    }
}

impl PackError {
    pub fn configuration(message: impl Into<String>) -> Self {
        PackError::Configuration {
            message: message.into(),
        }
    }

    pub fn parse(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        PackError::Parse {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    /// Stable machine-readable class name used in JSON output
    pub fn kind(&self) -> &'static str {
        match self {
            PackError::Resolution { .. } | PackError::Unreadable { .. } => "resolution",
            PackError::Configuration { .. } | PackError::InvalidConfig { .. } => "configuration",
            PackError::Parse { .. } => "parse",
            PackError::Locked { .. } => "locked",
            PackError::Io(_) | PackError::Json(_) | PackError::Watch(_) => "io",
        }
    }
}

/// A declaration could not be resolved or inferred.
///
/// Reported as a warning; code artifacts are still emitted.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{module}: cannot extract type of '{symbol}': {reason}")]
pub struct TypeExtractionError {
    pub module: String,
    pub symbol: String,
    pub reason: String,
}

/// Non-fatal diagnostics collected during a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildWarning {
    TypeExtraction(TypeExtractionError),
    CircularImport {
        cycle: Vec<String>,
    },
    GuessedGlobal {
        specifier: String,
        global: String,
    },
    UnknownConfigKey {
        key: String,
        file: PathBuf,
    },
    Unsupported {
        module: String,
        message: String,
    },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildWarning::TypeExtraction(err) => write!(f, "{}", err),
            BuildWarning::CircularImport { cycle } => {
                write!(f, "circular import: {}", cycle.join(" -> "))
            }
            BuildWarning::GuessedGlobal { specifier, global } => write!(
                f,
                "no global configured for '{}', using '{}' for the UMD build",
                specifier, global
            ),
            BuildWarning::UnknownConfigKey { key, file } => {
                write!(f, "unknown config key '{}' in {}", key, file.display())
            }
            BuildWarning::Unsupported { module, message } => write!(f, "{}: {}", module, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_resolution_entry() {
        let err = PackError::Resolution {
            specifier: "@src/index.ts".to_string(),
            importer: None,
        };
        assert_eq!(err.to_string(), "cannot resolve '@src/index.ts' (entry point)");
    }

    #[test]
    fn test_error_display_resolution_import() {
        let err = PackError::Resolution {
            specifier: "./missing".to_string(),
            importer: Some("src/index.ts".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "cannot resolve './missing' imported from src/index.ts"
        );
    }

    #[test]
    fn test_error_kind_classes() {
        assert_eq!(PackError::configuration("x").kind(), "configuration");
        assert_eq!(PackError::parse("a.ts", 1, "x").kind(), "parse");
    }

    #[test]
    fn test_type_extraction_display() {
        let warning = BuildWarning::TypeExtraction(TypeExtractionError {
            module: "src/map.ts".to_string(),
            symbol: "center".to_string(),
            reason: "missing annotation".to_string(),
        });
        assert_eq!(
            warning.to_string(),
            "src/map.ts: cannot extract type of 'center': missing annotation"
        );
    }
}
