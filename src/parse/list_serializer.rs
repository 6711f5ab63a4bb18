use crate::model::task::Task;
use crate::parse::annotation::{CREATED_MARKER, DONE_MARKER, DUE_MARKER};
use crate::util::date::format_date;

/// One indent unit per nesting level.
pub const INDENT: &str = "\t";

/// Serialize a whole document. Sibling groups are written incomplete-first,
/// each partition keeping its stored order; the archived block is appended
/// verbatim after a blank line.
pub fn serialize_list(title: &str, tasks: &[Task], archived_section: Option<&str>) -> String {
    let mut lines = vec![format!("# {}", title), String::new()];
    serialize_siblings(tasks, 0, &mut lines);

    let mut out = lines.join("\n");
    out.push('\n');
    if let Some(archived) = archived_section {
        out.push('\n');
        out.push_str(archived);
    }
    out
}

/// Render one task and its subtree as lines rooted at depth 0, for moving
/// into the archive block.
pub fn serialize_subtree(task: &Task) -> Vec<String> {
    let mut lines = Vec::new();
    serialize_task(task, 0, &mut lines);
    lines
}

fn serialize_siblings(tasks: &[Task], depth: usize, lines: &mut Vec<String>) {
    for task in tasks.iter().filter(|t| !t.completed) {
        serialize_task(task, depth, lines);
    }
    for task in tasks.iter().filter(|t| t.completed) {
        serialize_task(task, depth, lines);
    }
}

fn serialize_task(task: &Task, depth: usize, lines: &mut Vec<String>) {
    let indent = INDENT.repeat(depth);
    let check = if task.completed { 'x' } else { ' ' };

    let mut line = format!("{}- [{}] {}", indent, check, task.text);
    if let Some(created) = task.created_date {
        line.push_str(&format!(" {} {}", CREATED_MARKER, format_date(created)));
    }
    if let Some(due) = task.due_date {
        line.push_str(&format!(" {} {}", DUE_MARKER, format_date(due)));
    }
    if task.completed
        && let Some(done) = task.done_date
    {
        line.push_str(&format!(" {} {}", DONE_MARKER, format_date(done)));
    }
    lines.push(line);

    if let Some(ref notes) = task.notes {
        let note_indent = INDENT.repeat(depth + 1);
        for note_line in notes.split('\n') {
            lines.push(format!("{}{}", note_indent, note_line));
        }
    }

    serialize_siblings(&task.subtasks, depth + 1, lines);
}
