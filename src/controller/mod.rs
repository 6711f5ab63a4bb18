pub mod action;
pub mod runner;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::time::Instant;

use crate::io::settings_io::{SettingsError, SettingsStore};
use crate::io::store::{DocumentStore, StoreError};
use crate::model::list::TodoList;
use crate::model::settings::Settings;
use crate::model::task::{Task, TaskId};
use crate::ops::{list_ops, task_ops};
use crate::parse::{parse_list, serialize_list, serialize_subtree, strip_annotations};
use crate::util::date;

pub use action::Action;
pub use runner::{ControllerHandle, spawn};

/// Error type for controller operations
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("the controller has stopped")]
    Stopped,
}

// ---------------------------------------------------------------------------
// Phase and guards
// ---------------------------------------------------------------------------

/// What the controller is doing right now, as far as external changes care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// One of our own writes is in flight.
    Saving,
    /// A reorder gesture is open; nothing is written until it ends.
    Dragging,
}

/// Saving/dragging flags shared between the controller and whoever feeds it
/// external-change notifications, so those can be dropped on arrival.
#[derive(Debug, Clone, Default)]
pub struct Guards {
    saving: Arc<AtomicBool>,
    dragging: Arc<AtomicBool>,
}

impl Guards {
    pub fn phase(&self) -> Phase {
        if self.saving.load(Ordering::SeqCst) {
            Phase::Saving
        } else if self.dragging.load(Ordering::SeqCst) {
            Phase::Dragging
        } else {
            Phase::Idle
        }
    }

    /// Whether an external change should be acted on right now.
    pub fn accepts_external(&self) -> bool {
        self.phase() == Phase::Idle
    }

    pub fn begin_drag(&self) {
        self.dragging.store(true, Ordering::SeqCst);
    }

    /// Clear the dragging flag. Returns whether a drag was open.
    pub fn end_drag(&self) -> bool {
        self.dragging.swap(false, Ordering::SeqCst)
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.load(Ordering::SeqCst)
    }

    fn begin_save(&self) -> SaveGuard {
        self.saving.store(true, Ordering::SeqCst);
        SaveGuard(Arc::clone(&self.saving))
    }
}

/// Holds the saving flag up until dropped, whether the write worked or not.
struct SaveGuard(Arc<AtomicBool>);

impl Drop for SaveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// Presentation layer. Called after every load and every mutation.
pub trait ListView: Send {
    fn render(&mut self, lists: &[TodoList], active: Option<&Path>, settings: &Settings);
}

/// No presentation at all.
impl ListView for () {
    fn render(&mut self, _lists: &[TodoList], _active: Option<&Path>, _settings: &Settings) {}
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Owns the loaded lists and is the only thing that mutates them. Every
/// mutation is written back through the document store before the call
/// returns.
pub struct ListController<D, S, V> {
    store: D,
    settings_store: S,
    view: V,
    settings: Settings,
    lists: Vec<TodoList>,
    active: Option<PathBuf>,
    guards: Guards,
    /// Lists whose write was held back by an open drag or failed, keyed
    /// by document path.
    unsaved: BTreeSet<PathBuf>,
    reload_deadline: Option<Instant>,
}

impl<D, S, V> ListController<D, S, V>
where
    D: DocumentStore,
    S: SettingsStore,
    V: ListView,
{
    pub fn new(store: D, settings_store: S, view: V) -> Self {
        ListController {
            store,
            settings_store,
            view,
            settings: Settings::default(),
            lists: Vec::new(),
            active: None,
            guards: Guards::default(),
            unsaved: BTreeSet::new(),
            reload_deadline: None,
        }
    }

    // -- accessors ---------------------------------------------------------

    pub fn lists(&self) -> &[TodoList] {
        &self.lists
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn active_path(&self) -> Option<&Path> {
        self.active.as_deref()
    }

    pub fn active_list(&self) -> Option<&TodoList> {
        let active = self.active.as_ref()?;
        self.lists.iter().find(|l| &l.file_path == active)
    }

    fn active_list_mut(&mut self) -> Option<&mut TodoList> {
        let active = self.active.as_ref()?;
        self.lists.iter_mut().find(|l| &l.file_path == active)
    }

    pub fn guards(&self) -> &Guards {
        &self.guards
    }

    pub fn phase(&self) -> Phase {
        self.guards.phase()
    }

    fn render(&mut self) {
        self.view
            .render(&self.lists, self.active.as_deref(), &self.settings);
    }

    // -- loading -----------------------------------------------------------

    /// Load settings, then every list.
    pub async fn load(&mut self) -> Result<(), ControllerError> {
        self.settings = self.settings_store.load().await?;
        self.reload().await
    }

    /// Re-read every list in the todo folder, replacing what is in memory.
    pub async fn reload(&mut self) -> Result<(), ControllerError> {
        self.reload_deadline = None;
        let folder = PathBuf::from(&self.settings.todo_folder);
        let paths = self.store.list_files(&folder).await?;

        let mut lists = Vec::with_capacity(paths.len());
        for path in paths {
            // keep edits that have not reached the store yet
            if self.unsaved.contains(&path)
                && let Some(list) = self.lists.iter().find(|l| l.file_path == path)
            {
                lists.push(list.clone());
                continue;
            }
            let text = match self.store.read_file(&path).await {
                Ok(text) => text,
                // removed between listing and reading
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => return Err(e.into()),
            };
            let parsed = parse_list(&text);
            lists.push(TodoList {
                file_path: path,
                title: parsed.title,
                tasks: parsed.tasks,
                archived_section: parsed.archived_section,
            });
        }

        list_ops::sort_by_order(&mut lists, &self.settings.list_order);
        self.lists = lists;

        let still_there = self
            .active
            .as_ref()
            .is_some_and(|a| self.lists.iter().any(|l| &l.file_path == a));
        if !still_there {
            self.active = self.lists.first().map(|l| l.file_path.clone());
        }

        if list_ops::prune_order(&mut self.settings.list_order, &self.lists)
            && let Err(e) = self.settings_store.save(&self.settings).await
        {
            tracing::warn!(error = %e, "could not save pruned list order");
        }

        tracing::debug!(lists = self.lists.len(), "lists loaded");
        self.render();
        Ok(())
    }

    // -- dispatch ----------------------------------------------------------

    /// Apply one action. Returns false when the action named something that
    /// is not there (or was otherwise a no-op).
    pub async fn dispatch(&mut self, action: Action) -> Result<bool, ControllerError> {
        tracing::debug!(action = action.name(), "dispatch");
        match action {
            Action::SelectList { path } => Ok(self.select_list(&path)),
            Action::CreateList { name } => self.create_list(&name).await,
            Action::ReorderLists { order } => self.reorder_lists(order).await,
            Action::AddTask { text, due } => self.add_task(&text, due).await,
            Action::AddSubtask { parent, text, due } => self.add_subtask(parent, &text, due).await,
            Action::Toggle { id } => self.toggle(id).await,
            Action::EditText { id, text } => self.edit_text(id, &text).await,
            Action::SetDueDate { id, due } => self.set_due_date(id, due).await,
            Action::EditNotes { id, notes } => self.edit_notes(id, &notes).await,
            Action::Delete { id } => self.delete(id).await,
            Action::Archive { id } => self.archive(id).await,
            Action::ArchiveCompleted => self.archive_completed().await,
            Action::BeginDrag => {
                self.begin_drag();
                Ok(true)
            }
            Action::ReorderTasks { parent, order } => self.reorder_tasks(parent, &order).await,
            Action::EndDrag => self.end_drag().await,
            Action::Save => self.save().await,
            Action::Reload => self.reload().await.map(|()| true),
        }
    }

    // -- lists -------------------------------------------------------------

    pub fn select_list(&mut self, path: &Path) -> bool {
        if !self.lists.iter().any(|l| l.file_path == path) {
            return false;
        }
        self.active = Some(path.to_path_buf());
        self.render();
        true
    }

    /// Create an empty list named `name` in the todo folder and select it.
    /// Names that are blank, hidden, or contain a path separator are refused.
    pub async fn create_list(&mut self, name: &str) -> Result<bool, ControllerError> {
        let name = name.trim();
        if !is_list_name(name) {
            return Ok(false);
        }
        let path = Path::new(&self.settings.todo_folder).join(format!("{}.md", name));
        self.store
            .create_file(&path, &serialize_list(name, &[], None))
            .await?;
        tracing::info!(path = %path.display(), "created list");
        self.active = Some(path);
        self.reload().await?;
        Ok(true)
    }

    /// Persist a new list order. No document is written.
    pub async fn reorder_lists(&mut self, order: Vec<PathBuf>) -> Result<bool, ControllerError> {
        self.settings.list_order = order;
        self.settings_store.save(&self.settings).await?;
        list_ops::sort_by_order(&mut self.lists, &self.settings.list_order);
        self.render();
        Ok(true)
    }

    // -- tasks -------------------------------------------------------------

    pub async fn add_task(
        &mut self,
        text: &str,
        due: Option<NaiveDate>,
    ) -> Result<bool, ControllerError> {
        if text.trim().is_empty() {
            return Ok(false);
        }
        let task = Task::new(text, due);
        self.mutate_active(move |list| {
            list.tasks.push(task);
            true
        })
        .await
    }

    pub async fn add_subtask(
        &mut self,
        parent: TaskId,
        text: &str,
        due: Option<NaiveDate>,
    ) -> Result<bool, ControllerError> {
        if text.trim().is_empty() {
            return Ok(false);
        }
        let task = Task::new(text, due);
        self.mutate_active(move |list| task_ops::add_subtask(&mut list.tasks, parent, task))
            .await
    }

    pub async fn toggle(&mut self, id: TaskId) -> Result<bool, ControllerError> {
        let auto = self.settings.auto_complete_parent;
        let today = date::today();
        self.mutate_active(move |list| task_ops::toggle_task(&mut list.tasks, id, auto, today))
            .await
    }

    pub async fn edit_text(&mut self, id: TaskId, text: &str) -> Result<bool, ControllerError> {
        let text = strip_annotations(text);
        if text.is_empty() {
            return Ok(false);
        }
        self.mutate_active(move |list| match task_ops::find_task_mut(&mut list.tasks, id) {
            Some(task) => {
                task.text = text;
                true
            }
            None => false,
        })
        .await
    }

    pub async fn set_due_date(
        &mut self,
        id: TaskId,
        due: Option<NaiveDate>,
    ) -> Result<bool, ControllerError> {
        self.mutate_active(move |list| match task_ops::find_task_mut(&mut list.tasks, id) {
            Some(task) => {
                task.due_date = due;
                true
            }
            None => false,
        })
        .await
    }

    /// Replace a task's notes. Blank notes clear them.
    pub async fn edit_notes(&mut self, id: TaskId, notes: &str) -> Result<bool, ControllerError> {
        let notes = notes.trim();
        let notes = (!notes.is_empty()).then(|| notes.to_string());
        self.mutate_active(move |list| match task_ops::find_task_mut(&mut list.tasks, id) {
            Some(task) => {
                task.notes = notes;
                true
            }
            None => false,
        })
        .await
    }

    pub async fn delete(&mut self, id: TaskId) -> Result<bool, ControllerError> {
        self.mutate_active(move |list| task_ops::remove_task(&mut list.tasks, id).is_some())
            .await
    }

    /// Move a task and its subtree into the archive block.
    pub async fn archive(&mut self, id: TaskId) -> Result<bool, ControllerError> {
        self.mutate_active(move |list| {
            let Some(task) = task_ops::remove_task(&mut list.tasks, id) else {
                return false;
            };
            list.append_archived(&serialize_subtree(&task));
            true
        })
        .await
    }

    /// Move every completed root task into the archive block.
    pub async fn archive_completed(&mut self) -> Result<bool, ControllerError> {
        self.mutate_active(|list| {
            let done = task_ops::take_completed_roots(&mut list.tasks);
            if done.is_empty() {
                return false;
            }
            let lines: Vec<String> = done.iter().flat_map(serialize_subtree).collect();
            list.append_archived(&lines);
            true
        })
        .await
    }

    // -- drag --------------------------------------------------------------

    pub fn begin_drag(&mut self) {
        self.guards.begin_drag();
    }

    /// Apply a drop and end the gesture, writing once.
    pub async fn reorder_tasks(
        &mut self,
        parent: Option<TaskId>,
        order: &[TaskId],
    ) -> Result<bool, ControllerError> {
        self.guards.end_drag();
        let changed = match self.active_list_mut() {
            Some(list) => task_ops::siblings_mut(&mut list.tasks, parent)
                .is_some_and(|siblings| task_ops::reorder_partition(siblings, order)),
            None => false,
        };
        if changed {
            self.commit().await?;
        } else if !self.unsaved.is_empty() {
            self.flush().await?;
        }
        Ok(changed)
    }

    /// End the gesture without a drop, flushing any write it held back.
    pub async fn end_drag(&mut self) -> Result<bool, ControllerError> {
        let was_dragging = self.guards.end_drag();
        if !self.unsaved.is_empty() {
            self.flush().await?;
        }
        Ok(was_dragging)
    }

    // -- persistence -------------------------------------------------------

    /// Write the active list as it is in memory.
    pub async fn save(&mut self) -> Result<bool, ControllerError> {
        if self.active.is_none() {
            return Ok(false);
        }
        self.commit().await.map(|()| true)
    }

    async fn mutate_active<F>(&mut self, apply: F) -> Result<bool, ControllerError>
    where
        F: FnOnce(&mut TodoList) -> bool,
    {
        let Some(list) = self.active_list_mut() else {
            return Ok(false);
        };
        if !apply(list) {
            return Ok(false);
        }
        self.commit().await.map(|()| true)
    }

    /// Mark the active list unsaved and write every unsaved list, then
    /// render whatever is in memory. While dragging nothing is written.
    async fn commit(&mut self) -> Result<(), ControllerError> {
        if let Some(path) = self.active.clone() {
            self.unsaved.insert(path);
        }
        if self.guards.is_dragging() {
            self.render();
            return Ok(());
        }
        self.flush().await
    }

    /// Write every unsaved list, then render. A failed write leaves that
    /// list and the ones after it unsaved, with memory as mutated, so a
    /// later save can retry.
    async fn flush(&mut self) -> Result<(), ControllerError> {
        let result = self.write_unsaved().await;
        self.render();
        result
    }

    async fn write_unsaved(&mut self) -> Result<(), ControllerError> {
        while let Some(path) = self.unsaved.pop_first() {
            if let Err(e) = self.persist(&path).await {
                self.unsaved.insert(path);
                return Err(e);
            }
        }
        Ok(())
    }

    async fn persist(&mut self, path: &Path) -> Result<(), ControllerError> {
        let Some(list) = self.lists.iter().find(|l| l.file_path == path) else {
            return Ok(());
        };
        let text = serialize_list(&list.title, &list.tasks, list.archived_section.as_deref());

        if !self.store.exists(path).await {
            tracing::warn!(path = %path.display(), "list no longer exists, not saving");
            return Ok(());
        }

        let _saving = self.guards.begin_save();
        self.store.write_file(path, &text).await?;
        tracing::debug!(path = %path.display(), bytes = text.len(), "list saved");
        Ok(())
    }

    // -- external changes --------------------------------------------------

    fn debounce(&self) -> Duration {
        Duration::from_millis(self.settings.reload_debounce_ms)
    }

    /// Note that a document changed outside the controller. Ignored while
    /// saving or dragging; otherwise (re)starts the debounce window.
    /// Returns whether the notification was taken.
    pub fn note_external_change(&mut self, path: &Path) -> bool {
        if !self.guards.accepts_external() {
            tracing::trace!(path = %path.display(), phase = ?self.phase(), "external change ignored");
            return false;
        }
        self.reload_deadline = Some(Instant::now() + self.debounce());
        tracing::trace!(path = %path.display(), "external change, reload scheduled");
        true
    }

    /// When the pending debounced reload is due, if any.
    pub fn reload_deadline(&self) -> Option<Instant> {
        self.reload_deadline
    }

    /// The debounce window elapsed. Reloads unless a drag opened in the
    /// meantime, in which case the window starts over.
    pub async fn fire_reload(&mut self) -> Result<(), ControllerError> {
        if self.guards.is_dragging() {
            self.reload_deadline = Some(Instant::now() + self.debounce());
            return Ok(());
        }
        tracing::debug!("reloading after external change");
        self.reload().await
    }

    /// Drop any pending reload. Nothing is reloaded after this.
    pub fn shutdown(&mut self) {
        self.reload_deadline = None;
    }
}

/// A list name must stay a single file directly inside the todo folder.
fn is_list_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\'])
}
