//! Build plan: validated, immutable build descriptors
//!
//! Every configuration problem surfaces here as `ConfigurationError`, before
//! the import graph is read or any code is generated.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{PackError, PackResult};
use crate::external::{ExternalMatcher, GlobalNameMap};
use crate::models::{FormatSet, LibraryIdentity, ModuleFormat};

/// The single library entry module, as written in configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDescriptor {
    pub specifier: String,
}

/// Alias prefix -> absolute directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable(BTreeMap<String, PathBuf>);

impl AliasTable {
    pub fn new(root: &Path, aliases: &BTreeMap<String, String>) -> PackResult<Self> {
        let mut table = BTreeMap::new();
        for (alias, dir) in aliases {
            if alias.is_empty() || alias.ends_with('/') {
                return Err(PackError::configuration(format!(
                    "invalid alias '{}': aliases are non-empty and have no trailing '/'",
                    alias
                )));
            }
            table.insert(alias.clone(), root.join(dir));
        }
        Ok(Self(table))
    }

    /// Expand an aliased specifier; the longest matching alias wins.
    pub fn expand(&self, specifier: &str) -> Option<PathBuf> {
        self.0
            .iter()
            .filter_map(|(alias, dir)| {
                if specifier == alias {
                    Some((alias.len(), dir.clone()))
                } else {
                    specifier
                        .strip_prefix(alias.as_str())
                        .and_then(|rest| rest.strip_prefix('/'))
                        .map(|rest| (alias.len(), dir.join(rest)))
                }
            })
            .max_by_key(|(len, _)| *len)
            .map(|(_, path)| path)
    }

    pub fn dirs(&self) -> impl Iterator<Item = &Path> {
        self.0.values().map(PathBuf::as_path)
    }
}

/// Everything a build needs, validated
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub root: PathBuf,
    pub entry: EntryDescriptor,
    pub formats: FormatSet,
    pub externals: ExternalMatcher,
    pub globals: GlobalNameMap,
    pub identity: LibraryIdentity,
    pub aliases: AliasTable,
    pub extensions: Vec<String>,
    pub out_dir: PathBuf,
    pub banner: Option<String>,
    pub css_file: String,
    pub dts_file: Option<String>,
    pub empty_out_dir: bool,
    pub manifest: bool,
}

impl BuildPlan {
    /// Validate `config` against the project `root`.
    pub fn from_config(config: &Config, root: &Path) -> PackResult<Self> {
        let entry = config.lib.entry.trim();
        if entry.is_empty() {
            return Err(PackError::configuration("lib.entry must not be empty"));
        }

        let formats = FormatSet::parse(&config.lib.formats)?;
        let identity = LibraryIdentity::new(
            config.lib.name.trim(),
            config.lib.file_name.trim(),
            config.lib.global_name.clone(),
        )?;

        if formats.len() > 1 && !identity.names_formats() {
            return Err(PackError::configuration(format!(
                "lib.file_name '{}' must contain {{format}} when several formats are built",
                config.lib.file_name
            )));
        }

        let externals = ExternalMatcher::new(&config.external.modules, &config.external.patterns)?;
        let globals = GlobalNameMap::new(config.output.globals.clone());
        if formats.contains(ModuleFormat::Umd) {
            globals.validate(&externals)?;
        }

        let aliases = AliasTable::new(root, &config.resolve.alias)?;

        let mut extensions = Vec::new();
        for ext in &config.resolve.extensions {
            let ext = ext.trim();
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(PackError::configuration(format!(
                    "resolve.extensions entry '{}' must look like '.ts'",
                    ext
                )));
            }
            extensions.push(ext.to_string());
        }

        let dts_file = if config.dts.enabled {
            let file = config.dts.file.trim();
            if !file.ends_with(".d.ts") {
                return Err(PackError::configuration(format!(
                    "dts.file '{}' must end with .d.ts",
                    file
                )));
            }
            Some(file.to_string())
        } else {
            None
        };

        let mut names: Vec<String> = formats
            .as_slice()
            .iter()
            .map(|f| identity.artifact_name(*f))
            .collect();
        names.extend(dts_file.clone());
        names.push(config.output.css_file.clone());
        if config.output.manifest {
            names.push(format!("{}.manifest.json", identity.name()));
        }
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        if sorted.len() != names.len() {
            return Err(PackError::configuration(format!(
                "output file names collide: {}",
                names.join(", ")
            )));
        }

        let out_dir = if config.output.dir.is_absolute() {
            config.output.dir.clone()
        } else {
            root.join(&config.output.dir)
        };

        Ok(Self {
            root: root.to_path_buf(),
            entry: EntryDescriptor {
                specifier: entry.to_string(),
            },
            formats,
            externals,
            globals,
            identity,
            aliases,
            extensions,
            out_dir,
            banner: config.output.banner.clone(),
            css_file: config.output.css_file.clone(),
            dts_file,
            empty_out_dir: config.output.empty_out_dir,
            manifest: config.output.manifest,
        })
    }

    pub fn manifest_name(&self) -> String {
        format!("{}.manifest.json", self.identity.name())
    }
}
