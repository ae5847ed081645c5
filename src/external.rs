//! External dependency classification and UMD global names
//!
//! Classification is a pure function of the import specifier: exact module
//! names first, then patterns. Nothing here touches the file system.

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::{PackError, PackResult};

/// Whether an import is bundled or left to the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleClass {
    Internal,
    External,
}

/// Matches specifiers against the external dependency list
#[derive(Debug, Clone)]
pub struct ExternalMatcher {
    modules: Vec<String>,
    patterns: Vec<Regex>,
}

impl ExternalMatcher {
    /// Build a matcher; an invalid pattern is a configuration error.
    ///
    /// A pattern of the form `name/*` is shorthand for `^name/.*`.
    pub fn new(modules: &[String], patterns: &[String]) -> PackResult<Self> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let source = match pattern.strip_suffix("/*") {
                Some(prefix) if !prefix.is_empty() && !prefix.contains(['^', '$', '(']) => {
                    format!("^{}/.*", regex::escape(prefix))
                }
                _ => pattern.clone(),
            };
            let regex = Regex::new(&source).map_err(|e| {
                PackError::configuration(format!("invalid external pattern '{}': {}", pattern, e))
            })?;
            compiled.push(regex);
        }

        let mut seen = std::collections::BTreeSet::new();
        let modules: Vec<String> = modules
            .iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty() && seen.insert(m.clone()))
            .collect();

        Ok(Self {
            modules,
            patterns: compiled,
        })
    }

    /// Exact-name externals, in configuration order
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|r| r.as_str())
    }

    pub fn classify(&self, specifier: &str) -> ModuleClass {
        if self.is_exact(specifier) || self.patterns.iter().any(|p| p.is_match(specifier)) {
            ModuleClass::External
        } else {
            ModuleClass::Internal
        }
    }

    pub fn is_external(&self, specifier: &str) -> bool {
        self.classify(specifier) == ModuleClass::External
    }

    pub fn is_exact(&self, specifier: &str) -> bool {
        self.modules.iter().any(|m| m == specifier)
    }
}

/// Where the UMD build reads an external from when no module loader exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalBinding {
    pub global: String,
    /// Borrowed from the enclosing package's mapping rather than configured
    pub guessed: bool,
}

/// External module name -> global variable name (UMD only)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalNameMap(BTreeMap<String, String>);

impl GlobalNameMap {
    pub fn new(globals: BTreeMap<String, String>) -> Self {
        Self(globals)
    }

    pub fn get(&self, module: &str) -> Option<&str> {
        self.0.get(module).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Fail fast when an exact-name external has no global mapping.
    pub fn validate(&self, matcher: &ExternalMatcher) -> PackResult<()> {
        let missing: Vec<&str> = matcher
            .modules()
            .iter()
            .filter(|m| !self.0.contains_key(*m))
            .map(String::as_str)
            .collect();

        if !missing.is_empty() {
            return Err(PackError::configuration(format!(
                "UMD output needs a global name for external {}: add it under [output.globals]",
                missing
                    .iter()
                    .map(|m| format!("'{}'", m))
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        for (module, global) in &self.0 {
            if !is_global_path(global) {
                return Err(PackError::configuration(format!(
                    "global name '{}' for '{}' is not a valid identifier path",
                    global, module
                )));
            }
        }
        Ok(())
    }

    /// Global for an imported specifier.
    ///
    /// Sub-path imports (`leaflet/x`) fall back to the longest mapped package
    /// prefix and are marked as guessed.
    pub fn binding_for(&self, specifier: &str) -> Option<GlobalBinding> {
        if let Some(global) = self.0.get(specifier) {
            return Some(GlobalBinding {
                global: global.clone(),
                guessed: false,
            });
        }

        let mut prefix = specifier;
        while let Some(idx) = prefix.rfind('/') {
            prefix = &prefix[..idx];
            if let Some(global) = self.0.get(prefix) {
                return Some(GlobalBinding {
                    global: global.clone(),
                    guessed: true,
                });
            }
        }
        None
    }
}

/// `Vue`, `L`, `window.Vue`, `$` are valid; `2d`, `a-b`, `a..b` are not.
pub fn is_global_path(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_identifier)
}

pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
