use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::io::recovery;
use crate::model::settings::Settings;

/// File name of the settings document under the store root
pub const SETTINGS_FILE: &str = ".zentodo.toml";

/// Error type for settings persistence
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("could not access {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid settings document: {0}")]
    Edit(#[from] toml_edit::TomlError),
    #[error("settings task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Loads and saves the user's preferences.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> Result<Settings, SettingsError>;
    async fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}

// ---------------------------------------------------------------------------
// TOML file
// ---------------------------------------------------------------------------

/// Settings kept in a TOML file. Saving edits the existing document in place
/// so comments and unknown keys survive.
#[derive(Debug, Clone)]
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    /// The settings file for a store root
    pub fn in_root(root: &Path) -> Self {
        TomlSettingsStore {
            path: root.join(SETTINGS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_settings(path: &Path) -> Result<Settings, SettingsError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(toml::from_str(&text)?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Settings::default()),
        Err(source) => Err(SettingsError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Set a top-level value, keeping any comment attached to the old one.
fn set_value(doc: &mut toml_edit::DocumentMut, key: &str, value: impl Into<toml_edit::Value>) {
    let mut value = value.into();
    if let Some(existing) = doc.get(key).and_then(|item| item.as_value()) {
        *value.decor_mut() = existing.decor().clone();
    }
    doc[key] = toml_edit::Item::Value(value);
}

/// Write every field of `settings` into `doc`, leaving other keys alone.
pub fn apply_settings(doc: &mut toml_edit::DocumentMut, settings: &Settings) {
    set_value(doc, "todo_folder", settings.todo_folder.as_str());
    set_value(doc, "show_completed_by_default", settings.show_completed_by_default);
    set_value(doc, "auto_complete_parent", settings.auto_complete_parent);
    set_value(
        doc,
        "reload_debounce_ms",
        i64::try_from(settings.reload_debounce_ms).unwrap_or(i64::MAX),
    );

    let mut order = toml_edit::Array::new();
    for path in &settings.list_order {
        order.push(path.to_string_lossy().into_owned());
    }
    set_value(doc, "list_order", order);
}

fn write_settings(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    let existing = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let mut doc: toml_edit::DocumentMut = existing.parse()?;
    apply_settings(&mut doc, settings);
    recovery::atomic_write(path, doc.to_string().as_bytes()).map_err(|source| {
        SettingsError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[async_trait]
impl SettingsStore for TomlSettingsStore {
    async fn load(&self) -> Result<Settings, SettingsError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_settings(&path)).await?
    }

    async fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let path = self.path.clone();
        let settings = settings.clone();
        tokio::task::spawn_blocking(move || write_settings(&path, &settings)).await?
    }
}

// ---------------------------------------------------------------------------
// In memory
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemorySettingsInner {
    settings: Settings,
    saves: usize,
}

/// Settings held in memory; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    inner: Arc<Mutex<MemorySettingsInner>>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        MemorySettingsStore {
            inner: Arc::new(Mutex::new(MemorySettingsInner { settings, saves: 0 })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemorySettingsInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> Settings {
        self.lock().settings.clone()
    }

    pub fn save_calls(&self) -> usize {
        self.lock().saves
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Result<Settings, SettingsError> {
        Ok(self.current())
    }

    async fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let mut inner = self.lock();
        inner.settings = settings.clone();
        inner.saves += 1;
        Ok(())
    }
}
