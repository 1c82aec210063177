//! File watching for live reload.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

/// Events emitted by the file watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Page template or partial was modified
    TemplateModified(PathBuf),

    /// Script source was modified
    ScriptModified(PathBuf),

    /// Stylesheet was modified
    StyleModified(PathBuf),

    /// File was created
    Created(PathBuf),

    /// File was deleted
    Deleted(PathBuf),

    /// Any other modification
    Modified(PathBuf),
}

impl WatchEvent {
    /// Path the event refers to.
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::TemplateModified(p)
            | WatchEvent::ScriptModified(p)
            | WatchEvent::StyleModified(p)
            | WatchEvent::Created(p)
            | WatchEvent::Deleted(p)
            | WatchEvent::Modified(p) => p,
        }
    }
}

/// File watcher for detecting source changes.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Create a new file watcher for the given paths.
    ///
    /// Events under `ignore` (typically the output directory) are dropped so
    /// a rebuild does not trigger another rebuild. Returns the watcher and a
    /// channel to receive events.
    pub fn new(
        paths: &[PathBuf],
        ignore: Option<PathBuf>,
    ) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        for path in paths {
            if path.exists() {
                watcher
                    .watch(path, RecursiveMode::Recursive)
                    .map_err(std::io::Error::other)?;
            } else {
                tracing::debug!("Not watching missing path {}", path.display());
            }
        }

        std::thread::spawn(move || {
            // Editors write several times per save; wait for a quiet period
            // and then flush everything seen during the burst
            let quiet = Duration::from_millis(100);
            let mut pending: Vec<WatchEvent> = Vec::new();

            loop {
                let next = if pending.is_empty() {
                    sync_rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
                } else {
                    sync_rx.recv_timeout(quiet)
                };

                match next {
                    Ok(event) => {
                        let relevant = event
                            .paths
                            .iter()
                            .filter(|p| !is_ignored(p, ignore.as_deref()))
                            .filter_map(|p| classify_event(p, &event.kind));

                        for watch_event in relevant {
                            if !pending.contains(&watch_event) {
                                pending.push(watch_event);
                            }
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        for watch_event in pending.drain(..) {
                            if async_tx.blocking_send(watch_event).is_err() {
                                return;
                            }
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

fn is_ignored(path: &Path, ignore: Option<&Path>) -> bool {
    ignore.is_some_and(|dir| path.starts_with(dir))
}

/// Classify a notify event into a WatchEvent.
fn classify_event(path: &Path, kind: &notify::EventKind) -> Option<WatchEvent> {
    use notify::EventKind;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match kind {
        EventKind::Create(_) => Some(WatchEvent::Created(path.to_path_buf())),
        EventKind::Remove(_) => Some(WatchEvent::Deleted(path.to_path_buf())),
        EventKind::Modify(_) => match ext {
            "html" | "htm" | "ejs" | "j2" | "jinja" => {
                Some(WatchEvent::TemplateModified(path.to_path_buf()))
            }
            "js" | "mjs" => Some(WatchEvent::ScriptModified(path.to_path_buf())),
            "css" => Some(WatchEvent::StyleModified(path.to_path_buf())),
            _ => Some(WatchEvent::Modified(path.to_path_buf())),
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use notify::EventKind;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn classifies_by_extension() {
        let modify = EventKind::Modify(ModifyKind::Any);

        assert_eq!(
            classify_event(Path::new("pages/index.html"), &modify),
            Some(WatchEvent::TemplateModified(PathBuf::from("pages/index.html")))
        );
        assert_eq!(
            classify_event(Path::new("js/index.js"), &modify),
            Some(WatchEvent::ScriptModified(PathBuf::from("js/index.js")))
        );
        assert_eq!(
            classify_event(Path::new("css/index.css"), &modify),
            Some(WatchEvent::StyleModified(PathBuf::from("css/index.css")))
        );
        assert_eq!(
            classify_event(Path::new("assets/logo.png"), &modify),
            Some(WatchEvent::Modified(PathBuf::from("assets/logo.png")))
        );
    }

    #[test]
    fn classifies_create_and_remove() {
        let path = Path::new("pages/new.html");

        assert_eq!(
            classify_event(path, &EventKind::Create(CreateKind::File)),
            Some(WatchEvent::Created(path.to_path_buf()))
        );
        assert_eq!(
            classify_event(path, &EventKind::Remove(RemoveKind::File)),
            Some(WatchEvent::Deleted(path.to_path_buf()))
        );
        assert_eq!(classify_event(path, &EventKind::Any), None);
    }

    #[test]
    fn ignores_output_directory() {
        let out = Path::new("/site/public");

        assert!(is_ignored(Path::new("/site/public/index.html"), Some(out)));
        assert!(!is_ignored(Path::new("/site/src/index.html"), Some(out)));
        assert!(!is_ignored(Path::new("/site/public/index.html"), None));
    }

    #[tokio::test]
    async fn watches_file_changes() {
        let temp = tempdir().unwrap();
        let test_file = temp.path().join("index.html");

        let (watcher, mut rx) = FileWatcher::new(&[temp.path().to_path_buf()], None).unwrap();

        // Give inotify time to set up
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(&test_file, "<p>created</p>").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(3), rx.recv()).await;

        drop(watcher);

        assert!(event.is_ok(), "timeout waiting for file watch event");
        assert!(event.unwrap().is_some(), "channel should not be closed");
    }

    #[tokio::test]
    async fn delivers_changes_made_in_quick_succession() {
        let temp = tempdir().unwrap();

        let (watcher, mut rx) = FileWatcher::new(&[temp.path().to_path_buf()], None).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(temp.path().join("a.html"), "<p>a</p>").unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        fs::write(temp.path().join("b.css"), "p { color: red; }").unwrap();

        let mut seen: Vec<String> = Vec::new();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
        while let Ok(Some(event)) = tokio::time::timeout_at(deadline, rx.recv()).await {
            if let Some(name) = event.path().file_name().and_then(|n| n.to_str()) {
                if !seen.iter().any(|s| s == name) {
                    seen.push(name.to_string());
                }
            }
            if seen.len() == 2 {
                break;
            }
        }

        drop(watcher);

        seen.sort();
        assert_eq!(seen, vec!["a.html", "b.css"]);
    }
}
