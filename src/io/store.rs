use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::io::recovery::{self, RecoveryEntry};

/// Error type for document storage
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("could not list {path}: {source}")]
    List { path: PathBuf, source: io::Error },
    #[error("no document at {0}")]
    NotFound(PathBuf),
    #[error("a document already exists at {0}")]
    AlreadyExists(PathBuf),
    #[error("storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Where todo documents live. Paths are store-relative keys such as
/// `30_ToDos/home.md`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every markdown document under `folder`, recursively, sorted.
    /// A missing folder is an empty listing.
    async fn list_files(&self, folder: &Path) -> Result<Vec<PathBuf>, StoreError>;

    async fn read_file(&self, path: &Path) -> Result<String, StoreError>;

    /// Create a new document, creating parent folders as needed.
    async fn create_file(&self, path: &Path, text: &str) -> Result<(), StoreError>;

    /// Replace a document's whole contents.
    async fn write_file(&self, path: &Path, text: &str) -> Result<(), StoreError>;

    async fn exists(&self, path: &Path) -> bool;
}

fn is_markdown(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("md")
}

// ---------------------------------------------------------------------------
// Filesystem store
// ---------------------------------------------------------------------------

/// Documents on local disk, rooted at a directory. Writes go through a temp
/// file + rename; a failed write leaves the old file intact and copies the
/// unsaved text into the recovery log.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsStore { root: root.into() }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

/// Run blocking filesystem work off the async worker threads.
async fn blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

fn collect_markdown(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_markdown(root, &path, out)?;
        } else if is_markdown(&path)
            && let Ok(rel) = path.strip_prefix(root)
        {
            out.push(rel.to_path_buf());
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for FsStore {
    async fn list_files(&self, folder: &Path) -> Result<Vec<PathBuf>, StoreError> {
        let root = self.root.clone();
        let dir = self.resolve(folder);
        blocking(move || {
            let mut files = Vec::new();
            if !dir.is_dir() {
                return Ok(files);
            }
            collect_markdown(&root, &dir, &mut files)
                .map_err(|source| StoreError::List { path: dir, source })?;
            files.sort();
            Ok(files)
        })
        .await
    }

    async fn read_file(&self, path: &Path) -> Result<String, StoreError> {
        let key = path.to_path_buf();
        let full = self.resolve(path);
        blocking(move || {
            fs::read_to_string(&full).map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => StoreError::NotFound(key),
                _ => StoreError::Read { path: full, source },
            })
        })
        .await
    }

    async fn create_file(&self, path: &Path, text: &str) -> Result<(), StoreError> {
        let key = path.to_path_buf();
        let full = self.resolve(path);
        let text = text.to_string();
        blocking(move || {
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            let mut file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&full)
                .map_err(|source| match source.kind() {
                    io::ErrorKind::AlreadyExists => StoreError::AlreadyExists(key),
                    _ => StoreError::Write {
                        path: full.clone(),
                        source,
                    },
                })?;
            file.write_all(text.as_bytes())
                .map_err(|source| StoreError::Write { path: full, source })
        })
        .await
    }

    async fn write_file(&self, path: &Path, text: &str) -> Result<(), StoreError> {
        let root = self.root.clone();
        let key = path.to_path_buf();
        let full = self.resolve(path);
        let text = text.to_string();
        blocking(move || {
            if let Err(source) = recovery::atomic_write(&full, text.as_bytes()) {
                tracing::warn!(path = %key.display(), error = %source, "list write failed");
                recovery::log_recovery(
                    &root,
                    RecoveryEntry {
                        timestamp: chrono::Utc::now(),
                        description: "list write failed".to_string(),
                        fields: vec![
                            ("Target".to_string(), key.display().to_string()),
                            ("Error".to_string(), source.to_string()),
                        ],
                        body: text,
                    },
                );
                return Err(StoreError::Write { path: full, source });
            }
            Ok(())
        })
        .await
    }

    async fn exists(&self, path: &Path) -> bool {
        let full = self.resolve(path);
        blocking(move || Ok(full.is_file())).await.unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryInner {
    files: BTreeMap<PathBuf, String>,
    list_calls: usize,
    write_calls: usize,
    fail_writes: bool,
    write_delay: Option<Duration>,
}

/// A document store held in memory. Clones share the same documents, so a
/// test or host can keep a handle to inspect what the controller wrote and
/// to simulate edits made by someone else.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<P, T>(files: impl IntoIterator<Item = (P, T)>) -> Self
    where
        P: Into<PathBuf>,
        T: Into<String>,
    {
        let store = Self::new();
        for (path, text) in files {
            store.insert(path, text);
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put a document in place without going through the trait (an external edit).
    pub fn insert(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.lock().files.insert(path.into(), text.into());
    }

    pub fn remove(&self, path: &Path) -> Option<String> {
        self.lock().files.remove(path)
    }

    pub fn get(&self, path: &Path) -> Option<String> {
        self.lock().files.get(path).cloned()
    }

    /// Number of folder listings served (one per controller load).
    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    pub fn write_calls(&self) -> usize {
        self.lock().write_calls
    }

    /// Make every subsequent write fail without touching the stored text.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Hold every subsequent write open for `delay` before it lands.
    pub fn set_write_delay(&self, delay: Option<Duration>) {
        self.lock().write_delay = delay;
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_files(&self, folder: &Path) -> Result<Vec<PathBuf>, StoreError> {
        let mut inner = self.lock();
        inner.list_calls += 1;
        Ok(inner
            .files
            .keys()
            .filter(|p| p.starts_with(folder) && is_markdown(p))
            .cloned()
            .collect())
    }

    async fn read_file(&self, path: &Path) -> Result<String, StoreError> {
        self.get(path)
            .ok_or_else(|| StoreError::NotFound(path.to_path_buf()))
    }

    async fn create_file(&self, path: &Path, text: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.files.contains_key(path) {
            return Err(StoreError::AlreadyExists(path.to_path_buf()));
        }
        inner.files.insert(path.to_path_buf(), text.to_string());
        Ok(())
    }

    async fn write_file(&self, path: &Path, text: &str) -> Result<(), StoreError> {
        let delay = self.lock().write_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut inner = self.lock();
        inner.write_calls += 1;
        if inner.fail_writes {
            return Err(StoreError::Write {
                path: path.to_path_buf(),
                source: io::Error::other("write rejected"),
            });
        }
        inner.files.insert(path.to_path_buf(), text.to_string());
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        self.lock().files.contains_key(path)
    }
}
