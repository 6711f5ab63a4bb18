use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::list::TodoList;
use crate::model::task::Task;
use crate::ops::task_ops::display_order;
use crate::util::date::{DueStatus, format_date};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ListSummaryJson {
    pub path: String,
    pub title: String,
    pub open: usize,
    pub done: usize,
    pub archived: bool,
}

#[derive(Serialize)]
pub struct ListDetailJson {
    pub path: String,
    pub title: String,
    pub tasks: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct TaskJson {
    pub position: String,
    pub text: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_status: Option<DueStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<TaskJson>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Open and completed counts over the whole tree.
pub fn count_tasks(tasks: &[Task]) -> (usize, usize) {
    tasks.iter().fold((0, 0), |(open, done), task| {
        let (sub_open, sub_done) = count_tasks(&task.subtasks);
        if task.completed {
            (open + sub_open, done + sub_done + 1)
        } else {
            (open + sub_open + 1, done + sub_done)
        }
    })
}

pub fn list_summary_json(list: &TodoList) -> ListSummaryJson {
    let (open, done) = count_tasks(&list.tasks);
    ListSummaryJson {
        path: path_string(&list.file_path),
        title: list.title.clone(),
        open,
        done,
        archived: list.archived_section.is_some(),
    }
}

pub fn task_to_json(task: &Task, position: String, today: NaiveDate) -> TaskJson {
    let subtasks = display_order(&task.subtasks)
        .into_iter()
        .enumerate()
        .map(|(i, sub)| task_to_json(sub, format!("{}.{}", position, i + 1), today))
        .collect();
    TaskJson {
        position,
        text: task.text.clone(),
        completed: task.completed,
        created: task.created_date.map(format_date),
        due: task.due_date.map(format_date),
        due_status: task
            .due_date
            .filter(|_| !task.completed)
            .map(|d| DueStatus::classify(d, today)),
        done: task.done_date.map(format_date),
        notes: task.notes.clone(),
        subtasks,
    }
}

pub fn list_detail_json(list: &TodoList, today: NaiveDate) -> ListDetailJson {
    ListDetailJson {
        path: path_string(&list.file_path),
        title: list.title.clone(),
        tasks: display_order(&list.tasks)
            .into_iter()
            .enumerate()
            .map(|(i, task)| task_to_json(task, (i + 1).to_string(), today))
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// One line per list: position, title, path, and counts.
pub fn format_list_summary(index: usize, list: &TodoList) -> String {
    let (open, done) = count_tasks(&list.tasks);
    format!(
        "{:>2}  {}  ({})  {} open, {} done",
        index + 1,
        list.title,
        list.file_path.display(),
        open,
        done
    )
}

fn due_badge(task: &Task, today: NaiveDate) -> String {
    let Some(due) = task.due_date else {
        return String::new();
    };
    let status = if task.completed {
        ""
    } else {
        match DueStatus::classify(due, today) {
            DueStatus::Overdue => " (overdue)",
            DueStatus::Today => " (today)",
            DueStatus::Upcoming => "",
        }
    };
    format!(" due {}{}", format_date(due), status)
}

/// Format a task, its notes, and its subtasks, indented by depth.
/// Completed subtasks are skipped unless `show_completed`.
pub fn format_task_tree(
    task: &Task,
    position: &str,
    depth: usize,
    today: NaiveDate,
    show_completed: bool,
) -> Vec<String> {
    let indent = "  ".repeat(depth);
    let check = if task.completed { 'x' } else { ' ' };
    let done = task
        .done_date
        .filter(|_| task.completed)
        .map(|d| format!(" done {}", format_date(d)))
        .unwrap_or_default();

    let mut lines = vec![format!(
        "{}{} [{}] {}{}{}",
        indent,
        position,
        check,
        task.text,
        due_badge(task, today),
        done
    )];

    if let Some(ref notes) = task.notes {
        for note in notes.lines() {
            lines.push(format!("{}    | {}", indent, note));
        }
    }

    for (i, sub) in display_order(&task.subtasks).into_iter().enumerate() {
        if sub.completed && !show_completed {
            continue;
        }
        let sub_position = format!("{}.{}", position, i + 1);
        lines.extend(format_task_tree(sub, &sub_position, depth + 1, today, show_completed));
    }
    lines
}

/// Format a whole list: heading, tasks, and a hint about hidden ones.
pub fn format_list(list: &TodoList, today: NaiveDate, show_completed: bool) -> Vec<String> {
    let mut lines = vec![format!("# {}", list.title), String::new()];
    let mut hidden = 0;
    for (i, task) in display_order(&list.tasks).into_iter().enumerate() {
        if task.completed && !show_completed {
            hidden += 1;
            continue;
        }
        lines.extend(format_task_tree(task, &(i + 1).to_string(), 0, today, show_completed));
    }
    if list.tasks.is_empty() {
        lines.push("(no tasks)".to_string());
    }
    if hidden > 0 {
        lines.push(format!("({} completed hidden, use --all)", hidden));
    }
    lines
}
