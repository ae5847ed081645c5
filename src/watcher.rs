//! Rebuild on change (`packlet build --watch`)
//!
//! - Debouncing (100ms)
//! - Content-hash filter so editor touch/auto-save noise does not rebuild
//! - Graceful Ctrl+C shutdown through the shared `running` flag
//! - NDJSON events for CI

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;

use crate::error::{PackError, PackResult};
use crate::models::ContentHash;
use crate::packager::BuildReport;

pub const DEBOUNCE_MS: u64 = 100;

/// What to watch
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Directories watched recursively
    pub roots: Vec<PathBuf>,
    /// Changes under these paths never trigger a rebuild (the output directory)
    pub ignore: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WatchEvent {
    WatchStarted { roots: Vec<String> },
    FileChanged { path: String },
    BuildStarted,
    BuildComplete { artifacts: usize, warnings: usize },
    Error { message: String },
    Shutdown,
}

impl WatchEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Pending changes, released once the tree has been quiet for `DEBOUNCE_MS`
struct WatcherState {
    pending: HashSet<PathBuf>,
    last_change: Option<Instant>,
}

impl WatcherState {
    fn new() -> Self {
        Self {
            pending: HashSet::new(),
            last_change: None,
        }
    }

    fn add_change(&mut self, path: PathBuf) {
        self.pending.insert(path);
        self.last_change = Some(Instant::now());
    }

    fn should_build(&self) -> bool {
        match self.last_change {
            Some(last) => !self.pending.is_empty() && last.elapsed() >= Duration::from_millis(DEBOUNCE_MS),
            None => false,
        }
    }

    fn take_changes(&mut self) -> Vec<PathBuf> {
        self.last_change = None;
        let mut changes: Vec<PathBuf> = self.pending.drain().collect();
        changes.sort();
        changes
    }
}

/// Only content changes count; access events fire for our own reads.
fn is_content_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

fn is_ignored(path: &Path, ignore: &[PathBuf]) -> bool {
    ignore.iter().any(|dir| path.starts_with(dir))
        || path
            .components()
            .any(|c| c.as_os_str() == "node_modules" || c.as_os_str() == ".git")
}

/// Build once, then rebuild after every settled change until `running` is cleared.
///
/// A failed build is reported through `event_callback` and the loop goes on.
pub fn watch(
    options: &WatchOptions,
    running: Arc<AtomicBool>,
    mut rebuild: impl FnMut() -> PackResult<BuildReport>,
    event_callback: impl Fn(WatchEvent),
) -> PackResult<()> {
    event_callback(WatchEvent::WatchStarted {
        roots: options.roots.iter().map(|r| r.display().to_string()).collect(),
    });
    run_build(&mut rebuild, &event_callback);

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                if !is_content_event(&event.kind) {
                    return;
                }
                for path in event.paths {
                    let _ = tx.send(path);
                }
            }
        },
        Config::default(),
    )
    .map_err(|e| PackError::Watch(e.to_string()))?;

    for root in &options.roots {
        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| PackError::Watch(format!("{}: {}", root.display(), e)))?;
    }

    // notify may report existing files right after registration
    let cooldown_end = Instant::now() + Duration::from_millis(500);
    while Instant::now() < cooldown_end {
        let _ = rx.recv_timeout(Duration::from_millis(50));
    }

    let mut state = WatcherState::new();
    let mut hashes: HashMap<PathBuf, ContentHash> = HashMap::new();

    while running.load(Ordering::SeqCst) {
        if let Ok(path) = rx.recv_timeout(Duration::from_millis(50)) {
            record_change(&mut state, &mut hashes, path, &options.ignore);
        }

        if state.should_build() {
            for path in state.take_changes() {
                event_callback(WatchEvent::FileChanged {
                    path: path.display().to_string(),
                });
            }
            run_build(&mut rebuild, &event_callback);
        }
    }

    event_callback(WatchEvent::Shutdown);
    Ok(())
}

/// Queue `path` unless it is ignored or its content hash is unchanged
fn record_change(
    state: &mut WatcherState,
    hashes: &mut HashMap<PathBuf, ContentHash>,
    path: PathBuf,
    ignore: &[PathBuf],
) {
    if is_ignored(&path, ignore) {
        return;
    }
    let path = path.canonicalize().unwrap_or(path);
    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let hash = ContentHash::from_content(&content);
            if hashes.get(&path) != Some(&hash) {
                hashes.insert(path.clone(), hash);
                state.add_change(path);
            }
        }
        // removed or renamed away
        Err(_) if !path.exists() => {
            hashes.remove(&path);
            state.add_change(path);
        }
        Err(_) => {}
    }
}

fn run_build(rebuild: &mut impl FnMut() -> PackResult<BuildReport>, callback: &impl Fn(WatchEvent)) {
    callback(WatchEvent::BuildStarted);
    match rebuild() {
        Ok(report) => callback(WatchEvent::BuildComplete {
            artifacts: report.artifacts.len(),
            warnings: report.warnings.len(),
        }),
        Err(e) => {
            tracing::error!(error = %e, "rebuild failed");
            callback(WatchEvent::Error {
                message: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debounce_waits_for_quiet_period() {
        let mut state = WatcherState::new();
        assert!(!state.should_build());

        state.add_change(PathBuf::from("src/a.ts"));
        state.add_change(PathBuf::from("src/a.ts"));
        assert!(!state.should_build());

        std::thread::sleep(Duration::from_millis(DEBOUNCE_MS + 20));
        assert!(state.should_build());
        assert_eq!(state.take_changes(), vec![PathBuf::from("src/a.ts")]);
        assert!(!state.should_build());
    }

    #[test]
    fn unchanged_content_is_not_queued_twice() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("index.ts");
        std::fs::write(&file, "export const a = 1;\n").unwrap();

        let mut state = WatcherState::new();
        let mut hashes = HashMap::new();
        record_change(&mut state, &mut hashes, file.clone(), &[]);
        state.take_changes();

        record_change(&mut state, &mut hashes, file.clone(), &[]);
        assert!(state.pending.is_empty());

        std::fs::write(&file, "export const a = 2;\n").unwrap();
        record_change(&mut state, &mut hashes, file, &[]);
        assert_eq!(state.pending.len(), 1);
    }

    #[test]
    fn access_events_are_not_content_changes() {
        use notify::event::{AccessKind, AccessMode, CreateKind, ModifyKind};

        assert!(!is_content_event(&EventKind::Access(AccessKind::Close(AccessMode::Write))));
        assert!(!is_content_event(&EventKind::Access(AccessKind::Open(AccessMode::Any))));
        assert!(is_content_event(&EventKind::Modify(ModifyKind::Any)));
        assert!(is_content_event(&EventKind::Create(CreateKind::File)));
    }

    #[test]
    fn source_edit_triggers_a_rebuild() {
        use std::sync::atomic::AtomicUsize;
        use std::sync::Mutex;

        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("index.ts"), "export const a = 1;\n").unwrap();

        let options = WatchOptions {
            roots: vec![src.clone()],
            ignore: vec![dir.path().join("dist")],
        };
        let running = Arc::new(AtomicBool::new(true));
        let builds = AtomicUsize::new(0);
        let events = Mutex::new(Vec::new());

        let editor = {
            let running = running.clone();
            let file = src.join("index.ts");
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(1500));
                std::fs::write(&file, "export const a = 2;\n").unwrap();
                std::thread::sleep(Duration::from_millis(2500));
                running.store(false, Ordering::SeqCst);
            })
        };

        watch(
            &options,
            running,
            || {
                builds.fetch_add(1, Ordering::SeqCst);
                Ok(BuildReport {
                    out_dir: PathBuf::from("dist"),
                    artifacts: Vec::new(),
                    warnings: Vec::new(),
                })
            },
            |event| events.lock().unwrap().push(event),
        )
        .unwrap();
        editor.join().unwrap();

        let builds = builds.load(Ordering::SeqCst);
        assert!(builds >= 2, "expected a rebuild after the edit, got {} build(s)", builds);
        let events = events.into_inner().unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, WatchEvent::FileChanged { path } if path.ends_with("index.ts"))));
        assert!(matches!(events.last(), Some(WatchEvent::Shutdown)));
    }

    #[test]
    fn output_and_dependency_dirs_are_ignored() {
        let ignore = vec![PathBuf::from("/p/dist")];
        assert!(is_ignored(Path::new("/p/dist/lib.es.js"), &ignore));
        assert!(is_ignored(Path::new("/p/node_modules/vue/index.js"), &ignore));
        assert!(!is_ignored(Path::new("/p/src/index.ts"), &ignore));
    }

    #[test]
    fn events_serialize_as_ndjson() {
        let event = WatchEvent::BuildComplete {
            artifacts: 5,
            warnings: 1,
        };
        assert_eq!(
            event.to_json(),
            r#"{"event":"build_complete","artifacts":5,"warnings":1}"#
        );
        assert_eq!(WatchEvent::Shutdown.to_json(), r#"{"event":"shutdown"}"#);
    }
}
