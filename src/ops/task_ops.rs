use chrono::NaiveDate;

use crate::model::task::{Task, TaskId};

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

pub fn find_task(tasks: &[Task], id: TaskId) -> Option<&Task> {
    for task in tasks {
        if task.id == id {
            return Some(task);
        }
        if let Some(found) = find_task(&task.subtasks, id) {
            return Some(found);
        }
    }
    None
}

pub fn find_task_mut(tasks: &mut [Task], id: TaskId) -> Option<&mut Task> {
    for task in tasks.iter_mut() {
        if task.id == id {
            return Some(task);
        }
        if let Some(found) = find_task_mut(&mut task.subtasks, id) {
            return Some(found);
        }
    }
    None
}

/// Locate where a task lives: `Some(None)` for a root task, `Some(Some(p))`
/// for a subtask of `p`, `None` when the id is unknown.
pub fn find_parent(tasks: &[Task], id: TaskId) -> Option<Option<TaskId>> {
    if tasks.iter().any(|t| t.id == id) {
        return Some(None);
    }
    find_parent_below(tasks, id).map(Some)
}

fn find_parent_below(tasks: &[Task], id: TaskId) -> Option<TaskId> {
    for task in tasks {
        if task.subtasks.iter().any(|t| t.id == id) {
            return Some(task.id);
        }
        if let Some(parent) = find_parent_below(&task.subtasks, id) {
            return Some(parent);
        }
    }
    None
}

/// The sibling sequence under `parent`, or the root forest for `None`.
pub fn siblings_mut(tasks: &mut Vec<Task>, parent: Option<TaskId>) -> Option<&mut Vec<Task>> {
    match parent {
        None => Some(tasks),
        Some(pid) => find_task_mut(tasks, pid).map(|p| &mut p.subtasks),
    }
}

// ---------------------------------------------------------------------------
// Structural edits
// ---------------------------------------------------------------------------

/// Append a subtask under `parent`. Returns false if the parent is unknown.
pub fn add_subtask(tasks: &mut [Task], parent: TaskId, mut subtask: Task) -> bool {
    let Some(parent) = find_task_mut(tasks, parent) else {
        return false;
    };
    subtask.set_depth(parent.indent_level + 1);
    parent.subtasks.push(subtask);
    true
}

/// Remove a task (and its subtree) from wherever it sits in the forest.
pub fn remove_task(tasks: &mut Vec<Task>, id: TaskId) -> Option<Task> {
    if let Some(idx) = tasks.iter().position(|t| t.id == id) {
        return Some(tasks.remove(idx));
    }
    tasks
        .iter_mut()
        .find_map(|task| remove_task(&mut task.subtasks, id))
}

/// Remove and return every completed root task, in stored order.
pub fn take_completed_roots(tasks: &mut Vec<Task>) -> Vec<Task> {
    let (done, open): (Vec<Task>, Vec<Task>) = std::mem::take(tasks)
        .into_iter()
        .partition(|t| t.completed);
    *tasks = open;
    done
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// Flip a task's completion. With `auto_complete_parent`, completing the
/// last open subtask completes the parent and reopening a subtask reopens a
/// completed parent. Only the direct parent is affected.
/// Returns false if the task is unknown.
pub fn toggle_task(
    tasks: &mut [Task],
    id: TaskId,
    auto_complete_parent: bool,
    today: NaiveDate,
) -> bool {
    let parent_id = match find_parent(tasks, id) {
        Some(parent) => parent,
        None => return false,
    };

    let Some(task) = find_task_mut(tasks, id) else {
        return false;
    };
    if task.completed {
        task.uncomplete();
    } else {
        task.complete_on(today);
    }
    let now_completed = task.completed;

    if auto_complete_parent
        && let Some(pid) = parent_id
        && let Some(parent) = find_task_mut(tasks, pid)
    {
        if !now_completed && parent.completed {
            parent.uncomplete();
        } else if now_completed && !parent.completed && parent.all_subtasks_completed() {
            parent.complete_on(today);
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Reordering
// ---------------------------------------------------------------------------

/// Rebuild a sibling sequence after one partition was reordered.
///
/// The partition is picked by the completion state of the first id. Ids
/// outside that partition or unknown are skipped; partition members the
/// caller left out keep their relative order after the listed ones. The
/// incomplete partition always precedes the completed one.
/// Returns false if the first id is not among the siblings.
pub fn reorder_partition(siblings: &mut Vec<Task>, ordered: &[TaskId]) -> bool {
    let Some(first) = ordered.first() else {
        return false;
    };
    let Some(reordering_completed) = siblings
        .iter()
        .find(|t| t.id == *first)
        .map(|t| t.completed)
    else {
        return false;
    };

    let (mut group, other): (Vec<Task>, Vec<Task>) = std::mem::take(siblings)
        .into_iter()
        .partition(|t| t.completed == reordering_completed);

    let mut reordered = Vec::with_capacity(group.len());
    for id in ordered {
        if let Some(idx) = group.iter().position(|t| t.id == *id) {
            reordered.push(group.remove(idx));
        }
    }
    reordered.append(&mut group);

    *siblings = if reordering_completed {
        other.into_iter().chain(reordered).collect()
    } else {
        reordered.into_iter().chain(other).collect()
    };
    true
}

// ---------------------------------------------------------------------------
// Positional addressing
// ---------------------------------------------------------------------------

/// Tasks of one sibling group in display order (incomplete, then completed).
pub fn display_order(tasks: &[Task]) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| !t.completed)
        .chain(tasks.iter().filter(|t| t.completed))
        .collect()
}

/// Resolve a 1-based dotted display position like `2.1` to a task id.
pub fn resolve_position(tasks: &[Task], position: &str) -> Option<TaskId> {
    let mut level = tasks;
    let mut found: Option<&Task> = None;
    for part in position.split('.') {
        let n: usize = part.trim().parse().ok()?;
        let task = *display_order(level).get(n.checked_sub(1)?)?;
        level = task.subtasks.as_slice();
        found = Some(task);
    }
    found.map(|t| t.id)
}
