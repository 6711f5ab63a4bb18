use std::path::PathBuf;

use chrono::NaiveDate;

use crate::model::task::TaskId;

/// Everything a host can ask the controller to do. Task actions apply to the
/// active list; an unknown list or task makes the action a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Make another loaded list the active one.
    SelectList { path: PathBuf },
    /// Create `<folder>/<name>.md` and select it.
    CreateList { name: String },
    /// Replace the persisted list order.
    ReorderLists { order: Vec<PathBuf> },
    AddTask {
        text: String,
        due: Option<NaiveDate>,
    },
    AddSubtask {
        parent: TaskId,
        text: String,
        due: Option<NaiveDate>,
    },
    /// Flip completion, propagating to the direct parent when enabled.
    Toggle { id: TaskId },
    EditText { id: TaskId, text: String },
    SetDueDate { id: TaskId, due: Option<NaiveDate> },
    EditNotes { id: TaskId, notes: String },
    Delete { id: TaskId },
    /// Move one task (with its subtree) into the archive block.
    Archive { id: TaskId },
    /// Move every completed root task into the archive block.
    ArchiveCompleted,
    /// A reorder gesture started; writes wait until it ends.
    BeginDrag,
    /// Drop result: new order for one partition of the siblings under `parent`.
    ReorderTasks {
        parent: Option<TaskId>,
        order: Vec<TaskId>,
    },
    /// The gesture ended without a drop.
    EndDrag,
    /// Write the active list again (retry after a failed write).
    Save,
    /// Re-read every list now.
    Reload,
}

impl Action {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Action::SelectList { .. } => "select_list",
            Action::CreateList { .. } => "create_list",
            Action::ReorderLists { .. } => "reorder_lists",
            Action::AddTask { .. } => "add_task",
            Action::AddSubtask { .. } => "add_subtask",
            Action::Toggle { .. } => "toggle",
            Action::EditText { .. } => "edit_text",
            Action::SetDueDate { .. } => "set_due_date",
            Action::EditNotes { .. } => "edit_notes",
            Action::Delete { .. } => "delete",
            Action::Archive { .. } => "archive",
            Action::ArchiveCompleted => "archive_completed",
            Action::BeginDrag => "begin_drag",
            Action::ReorderTasks { .. } => "reorder_tasks",
            Action::EndDrag => "end_drag",
            Action::Save => "save",
            Action::Reload => "reload",
        }
    }
}
