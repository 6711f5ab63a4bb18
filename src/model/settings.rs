use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// User preferences, persisted in `.zentodo.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Folder (relative to the store root) holding the todo documents
    #[serde(default = "default_todo_folder")]
    pub todo_folder: String,
    /// Whether completed tasks are listed without asking
    #[serde(default)]
    pub show_completed_by_default: bool,
    /// Complete a parent when its last open subtask is completed,
    /// and reopen it when one of its subtasks is reopened
    #[serde(default = "default_true")]
    pub auto_complete_parent: bool,
    /// Quiet period after an external change before reloading
    #[serde(default = "default_debounce_ms")]
    pub reload_debounce_ms: u64,
    /// Preferred list order, by document path
    #[serde(default)]
    pub list_order: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            todo_folder: default_todo_folder(),
            show_completed_by_default: false,
            auto_complete_parent: true,
            reload_debounce_ms: default_debounce_ms(),
            list_order: Vec::new(),
        }
    }
}

fn default_todo_folder() -> String {
    "30_ToDos".to_string()
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    300
}
