//! Init command - write a starter packlet.toml
//!
//! The template reproduces the vue-leaflet layout: `@src` alias, Vue and
//! Leaflet kept external, all three formats and a declaration file.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::json;

use packlet::config::{Config, CONFIG_FILE};

use super::project_root;

pub fn cmd_init(root: Option<&Path>, name: Option<String>, force: bool, json: bool) -> Result<()> {
    let root = project_root(root)?;
    let path = root.join(CONFIG_FILE);
    if path.exists() && !force {
        bail!(packlet::error::PackError::configuration(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    let name = name
        .or_else(|| {
            root.file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "library".to_string());

    fs::create_dir_all(&root).with_context(|| format!("cannot create {}", root.display()))?;
    fs::write(&path, Config::template(&name))
        .with_context(|| format!("cannot write {}", path.display()))?;

    if json {
        println!("{}", json!({ "created": path.display().to_string(), "name": name }));
    } else {
        println!("✓ created {} for '{}'", path.display(), name);
    }
    Ok(())
}
