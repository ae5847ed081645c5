//! Core data models for packlet
//!
//! Build-time descriptors and output values:
//! - `ModuleFormat` / `FormatSet`: the bundle formats to emit
//! - `LibraryIdentity`: library name, file names and UMD global
//! - `Artifact`: one emitted file, with its `ContentHash`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PackError, PackResult};

/// Module format of a code artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    /// Native ES module (`import` / `export`)
    Es,
    /// CommonJS (`require` / `module.exports`)
    Cjs,
    /// Universal module definition (CommonJS, AMD or globals)
    Umd,
}

impl ModuleFormat {
    /// Tag used in file names and configuration
    pub fn tag(self) -> &'static str {
        match self {
            ModuleFormat::Es => "es",
            ModuleFormat::Cjs => "cjs",
            ModuleFormat::Umd => "umd",
        }
    }

    pub fn all() -> [ModuleFormat; 3] {
        [ModuleFormat::Es, ModuleFormat::Cjs, ModuleFormat::Umd]
    }
}

impl fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ModuleFormat {
    type Err = PackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "es" | "esm" => Ok(ModuleFormat::Es),
            "cjs" | "commonjs" => Ok(ModuleFormat::Cjs),
            "umd" => Ok(ModuleFormat::Umd),
            other => Err(PackError::configuration(format!(
                "unknown format '{}' (expected one of: es, cjs, umd)",
                other
            ))),
        }
    }
}

/// Ordered, de-duplicated, non-empty set of formats
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSet(Vec<ModuleFormat>);

impl FormatSet {
    /// Parse format tags in order, dropping later duplicates
    pub fn parse<S: AsRef<str>>(tags: &[S]) -> PackResult<Self> {
        let mut formats = Vec::new();
        for tag in tags {
            let format: ModuleFormat = tag.as_ref().parse()?;
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        if formats.is_empty() {
            return Err(PackError::configuration(
                "at least one output format is required",
            ));
        }
        Ok(Self(formats))
    }

    pub fn contains(&self, format: ModuleFormat) -> bool {
        self.0.contains(&format)
    }

    pub fn as_slice(&self) -> &[ModuleFormat] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Library name plus the naming rules derived from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryIdentity {
    name: String,
    file_name: String,
    global_name: Option<String>,
}

impl LibraryIdentity {
    /// Placeholder replaced by the library name in file-name templates
    pub const NAME_PLACEHOLDER: &'static str = "{name}";
    /// Placeholder replaced by the format tag in file-name templates
    pub const FORMAT_PLACEHOLDER: &'static str = "{format}";

    pub fn new(
        name: impl Into<String>,
        file_name: impl Into<String>,
        global_name: Option<String>,
    ) -> PackResult<Self> {
        let name = name.into();
        let file_name = file_name.into();

        if name.trim().is_empty() {
            return Err(PackError::configuration("lib.name must not be empty"));
        }
        if name.contains(['/', '\\']) {
            return Err(PackError::configuration(format!(
                "lib.name '{}' must not contain path separators",
                name
            )));
        }
        if file_name.contains(['/', '\\']) {
            return Err(PackError::configuration(format!(
                "lib.file_name '{}' must be a plain file name",
                file_name
            )));
        }

        Ok(Self {
            name,
            file_name,
            global_name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name of the code artifact for `format`
    pub fn artifact_name(&self, format: ModuleFormat) -> String {
        self.file_name
            .replace(Self::NAME_PLACEHOLDER, &self.name)
            .replace(Self::FORMAT_PLACEHOLDER, format.tag())
    }

    /// Whether distinct formats map to distinct file names
    pub fn names_formats(&self) -> bool {
        self.file_name.contains(Self::FORMAT_PLACEHOLDER)
    }

    /// Property of the global object the UMD build assigns the library to
    pub fn umd_global(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.name)
    }
}

/// Content hash value object (`sha256:<hex>`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContentHash(String);

impl ContentHash {
    pub const PREFIX: &'static str = "sha256:";

    pub fn from_content(content: &str) -> Self {
        use sha2::{Digest, Sha256};
        let hash = Sha256::digest(content.as_bytes());
        Self(format!("{}{:x}", Self::PREFIX, hash))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What an artifact contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "format")]
pub enum ArtifactKind {
    Code(ModuleFormat),
    Declarations,
    Stylesheet,
    Manifest,
}

/// One file produced by a build, held in memory until written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub kind: ArtifactKind,
    pub content: String,
}

impl Artifact {
    pub fn new(file_name: impl Into<String>, kind: ArtifactKind, content: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            kind,
            content: content.into(),
        }
    }

    pub fn hash(&self) -> ContentHash {
        ContentHash::from_content(&self.content)
    }
}
