//! Artifact emission
//!
//! Artifacts are complete in memory before anything touches the output
//! directory. Each file is written through a temp file in the same directory
//! and renamed into place; an advisory lock keeps two builds from interleaving.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{BuildWarning, PackError, PackResult};
use crate::models::{Artifact, ArtifactKind};

/// Lock file created in the output directory while writing
pub const LOCK_FILE: &str = ".packlet.lock";

/// One artifact as recorded in the manifest and the build report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactEntry {
    pub file: String,
    pub kind: ArtifactKind,
    pub bytes: usize,
    pub hash: String,
}

impl ArtifactEntry {
    pub fn of(artifact: &Artifact) -> Self {
        Self {
            file: artifact.file_name.clone(),
            kind: artifact.kind,
            bytes: artifact.content.len(),
            hash: artifact.hash().to_string(),
        }
    }
}

/// `<name>.manifest.json`; no timestamps so rebuilds are byte-identical
#[derive(Debug, Clone, Serialize)]
pub struct Manifest<'a> {
    pub name: &'a str,
    pub externals: Vec<&'a str>,
    pub globals: BTreeMap<&'a str, &'a str>,
    pub artifacts: Vec<ArtifactEntry>,
    pub warnings: Vec<String>,
}

impl Manifest<'_> {
    pub fn to_artifact(&self, file_name: &str) -> PackResult<Artifact> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        Ok(Artifact::new(file_name, ArtifactKind::Manifest, content))
    }
}

pub fn warning_lines(warnings: &[BuildWarning]) -> Vec<String> {
    warnings.iter().map(ToString::to_string).collect()
}

/// The part of a previous manifest `empty_out_dir` needs
#[derive(Debug, Default, Deserialize)]
struct PreviousManifest {
    #[serde(default)]
    artifacts: Vec<PreviousArtifact>,
}

#[derive(Debug, Deserialize)]
struct PreviousArtifact {
    file: String,
}

/// Write every artifact into `out_dir`.
///
/// With `empty_out_dir`, files listed in the previous manifest are removed
/// first; files packlet did not produce are left alone.
pub fn write_artifacts(
    out_dir: &Path,
    artifacts: &[Artifact],
    manifest_name: &str,
    empty_out_dir: bool,
) -> PackResult<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;

    // Kept between builds so every build locks the same inode
    let lock_file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(out_dir.join(LOCK_FILE))?;
    lock_file
        .try_lock_exclusive()
        .map_err(|_| PackError::Locked {
            path: out_dir.to_path_buf(),
        })?;

    let result = write_locked(out_dir, artifacts, manifest_name, empty_out_dir);

    let _ = lock_file.unlock();
    result
}

fn write_locked(
    out_dir: &Path,
    artifacts: &[Artifact],
    manifest_name: &str,
    empty_out_dir: bool,
) -> PackResult<Vec<PathBuf>> {
    if empty_out_dir {
        for file in previous_artifacts(&out_dir.join(manifest_name)) {
            let path = out_dir.join(&file);
            if path.is_file() {
                tracing::debug!(file = %file, "removing previous artifact");
                fs::remove_file(&path)?;
            }
        }
    }

    let mut written = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let path = out_dir.join(&artifact.file_name);
        atomic_write(&path, artifact.content.as_bytes())?;
        tracing::debug!(path = %path.display(), bytes = artifact.content.len(), "wrote artifact");
        written.push(path);
    }
    Ok(written)
}

/// Plain file names listed in a manifest; anything with a path is ignored
fn previous_artifacts(manifest: &Path) -> Vec<String> {
    let Ok(content) = fs::read_to_string(manifest) else {
        return Vec::new();
    };
    let previous: PreviousManifest = serde_json::from_str(&content).unwrap_or_default();
    previous
        .artifacts
        .into_iter()
        .map(|a| a.file)
        .filter(|f| !f.is_empty() && !f.contains(['/', '\\']) && f != "." && f != "..")
        .collect()
}

/// Write `content` to `path` atomically (temp file + rename)
pub fn atomic_write(path: &Path, content: &[u8]) -> PackResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content)?;
    temp.flush()?;
    temp.persist(path).map_err(|e| PackError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModuleFormat;
    use tempfile::tempdir;

    fn artifacts() -> Vec<Artifact> {
        vec![
            Artifact::new("lib.es.js", ArtifactKind::Code(ModuleFormat::Es), "export {};\n"),
            Artifact::new("index.d.ts", ArtifactKind::Declarations, "export {};\n"),
        ]
    }

    #[test]
    fn writes_all_artifacts_and_releases_the_lock() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("dist");

        let written = write_artifacts(&out, &artifacts(), "lib.manifest.json", false).unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(fs::read_to_string(out.join("lib.es.js")).unwrap(), "export {};\n");

        let lock = fs::File::open(out.join(LOCK_FILE)).unwrap();
        assert!(lock.try_lock_exclusive().is_ok());
        lock.unlock().unwrap();
    }

    #[test]
    fn held_lock_fails_the_write_and_keeps_the_lock_file() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("dist");
        write_artifacts(&out, &artifacts(), "lib.manifest.json", false).unwrap();

        let holder = fs::File::open(out.join(LOCK_FILE)).unwrap();
        holder.try_lock_exclusive().unwrap();
        let err = write_artifacts(&out, &artifacts(), "lib.manifest.json", false).unwrap_err();
        assert!(matches!(err, PackError::Locked { .. }));
        assert!(out.join(LOCK_FILE).exists());

        holder.unlock().unwrap();
        assert!(write_artifacts(&out, &artifacts(), "lib.manifest.json", false).is_ok());
        assert!(out.join(LOCK_FILE).exists());
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.js");
        fs::write(&path, "old").unwrap();

        atomic_write(&path, b"new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn empty_out_dir_removes_only_listed_files() {
        let dir = tempdir().unwrap();
        let out = dir.path();
        fs::write(out.join("old.umd.js"), "x").unwrap();
        fs::write(out.join("keep.txt"), "x").unwrap();
        fs::write(
            out.join("lib.manifest.json"),
            r#"{"artifacts":[{"file":"old.umd.js"},{"file":"../escape.js"}]}"#,
        )
        .unwrap();

        write_artifacts(out, &artifacts(), "lib.manifest.json", true).unwrap();

        assert!(!out.join("old.umd.js").exists());
        assert!(out.join("keep.txt").exists());
        assert!(out.join("lib.es.js").exists());
    }

    #[test]
    fn manifest_is_deterministic() {
        let entries: Vec<ArtifactEntry> = artifacts().iter().map(ArtifactEntry::of).collect();
        let manifest = Manifest {
            name: "lib",
            externals: vec!["vue"],
            globals: BTreeMap::from([("vue", "Vue")]),
            artifacts: entries,
            warnings: Vec::new(),
        };
        let first = manifest.to_artifact("lib.manifest.json").unwrap();
        let second = manifest.to_artifact("lib.manifest.json").unwrap();
        assert_eq!(first, second);
        assert!(first.content.contains("\"hash\": \"sha256:"));
        assert!(first.content.contains("\"type\": \"code\""));
    }
}
