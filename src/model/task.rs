use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::parse::annotation::strip_annotations;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque task identity. Minted once per node, never reused within the
/// process, and never derived from the task's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(u64);

impl TaskId {
    pub fn fresh() -> TaskId {
        TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A checkbox item and its nested subtasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Display text with every date annotation removed
    pub text: String,
    pub completed: bool,
    pub created_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    /// Present exactly when `completed` is true
    pub done_date: Option<NaiveDate>,
    /// Free text attached to this task, newline separated
    pub notes: Option<String>,
    /// Children in persisted display order
    pub subtasks: Vec<Task>,
    /// Nesting depth (0 = root)
    pub indent_level: usize,
}

impl Task {
    /// Create a fresh incomplete root task. Any date annotations typed into
    /// `text` are stripped so they can't leak into the display text.
    pub fn new(text: &str, due_date: Option<NaiveDate>) -> Self {
        Task {
            id: TaskId::fresh(),
            text: strip_annotations(text),
            completed: false,
            created_date: None,
            due_date,
            done_date: None,
            notes: None,
            subtasks: Vec::new(),
            indent_level: 0,
        }
    }

    /// Mark completed with an explicit done date. Always re-stamps.
    pub fn complete_on(&mut self, day: NaiveDate) {
        self.completed = true;
        self.done_date = Some(day);
    }

    pub fn uncomplete(&mut self) {
        self.completed = false;
        self.done_date = None;
    }

    /// True iff the task has children and every direct child is completed.
    /// A childless task never qualifies.
    pub fn all_subtasks_completed(&self) -> bool {
        !self.subtasks.is_empty() && self.subtasks.iter().all(|t| t.completed)
    }

    /// Re-derive `indent_level` for this node and its descendants.
    pub fn set_depth(&mut self, depth: usize) {
        self.indent_level = depth;
        for sub in &mut self.subtasks {
            sub.set_depth(depth + 1);
        }
    }
}

/// Content equality: identity is deliberately left out so a re-parsed
/// forest compares equal to the one it was serialized from.
impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
            && self.completed == other.completed
            && self.created_date == other.created_date
            && self.due_date == other.due_date
            && self.done_date == other.done_date
            && self.notes == other.notes
            && self.subtasks == other.subtasks
            && self.indent_level == other.indent_level
    }
}

impl Eq for Task {}
