use std::path::{Path, PathBuf};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// Events sent from the folder watcher to whoever drives the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    /// One or more todo documents changed on disk (store-relative paths).
    Changed(Vec<PathBuf>),
}

/// Watches the todo folder for changes to markdown documents.
/// Dropping the watcher stops it.
pub struct FolderWatcher {
    _watcher: RecommendedWatcher,
}

/// Keep markdown paths inside `folder`, rewritten relative to `root`.
fn relevant_paths(root: &Path, folder: &Path, paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths
        .into_iter()
        .filter(|p| p.starts_with(folder))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("md"))
        .filter(|p| {
            // editor swap and backup files
            !p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'))
        })
        .filter_map(|p| p.strip_prefix(root).ok().map(Path::to_path_buf))
        .collect()
}

impl FolderWatcher {
    /// Start watching `root/folder`. Events arrive on the returned receiver.
    pub fn start(
        root: &Path,
        folder: &Path,
    ) -> Result<(Self, mpsc::UnboundedReceiver<FileEvent>), notify::Error> {
        let root = root.canonicalize().map_err(notify::Error::io)?;
        let watched = root.join(folder);
        let (tx, rx) = mpsc::unbounded_channel();

        let root_owned = root.clone();
        let folder_owned = watched.clone();
        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(e) => e,
                    Err(e) => {
                        tracing::warn!(error = %e, "watch error");
                        return;
                    }
                };

                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
                    _ => return,
                }

                let relevant = relevant_paths(&root_owned, &folder_owned, event.paths);
                if !relevant.is_empty() {
                    let _ = tx.send(FileEvent::Changed(relevant));
                }
            },
            Config::default(),
        )?;

        watcher.watch(&watched, RecursiveMode::Recursive)?;
        tracing::debug!(folder = %watched.display(), "watching todo folder");
        Ok((FolderWatcher { _watcher: watcher }, rx))
    }
}
