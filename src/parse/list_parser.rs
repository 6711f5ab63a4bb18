use crate::model::list::{ARCHIVED_HEADING, DEFAULT_TITLE};
use crate::model::task::{Task, TaskId};
use crate::parse::annotation::extract_annotations;

/// Result of parsing one todo document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedList {
    pub title: String,
    pub tasks: Vec<Task>,
    pub archived_section: Option<String>,
}

/// An open ancestor during tree construction: the node being built and the
/// raw indent of the line it came from.
struct OpenTask {
    task: Task,
    indent: usize,
}

/// Parse a todo document. Never fails: lines that fit no known shape are
/// either attached as notes or dropped.
pub fn parse_list(source: &str) -> ParsedList {
    let (body, archived_section) = split_archived(source);

    let mut title: Option<String> = None;
    let mut seen_checkbox = false;
    let mut roots: Vec<Task> = Vec::new();
    let mut stack: Vec<OpenTask> = Vec::new();

    for line in body.lines() {
        if !seen_checkbox
            && title.is_none()
            && let Some(rest) = line.strip_prefix("# ")
        {
            let rest = rest.trim();
            if !rest.is_empty() {
                title = Some(rest.to_string());
            }
            continue;
        }

        if let Some((indent, completed, rest)) = match_checkbox(line) {
            seen_checkbox = true;

            // Only strict ancestors stay open.
            while stack.last().is_some_and(|open| open.indent >= indent) {
                close_top(&mut stack, &mut roots);
            }

            let (text, dates) = extract_annotations(rest);
            let task = Task {
                id: TaskId::fresh(),
                text,
                completed,
                created_date: dates.created,
                due_date: dates.due,
                done_date: if completed { dates.done } else { None },
                notes: None,
                subtasks: Vec::new(),
                indent_level: stack.len(),
            };
            stack.push(OpenTask { task, indent });
            continue;
        }

        let note = line.trim();
        if note.is_empty() {
            continue;
        }
        let note_indent = count_indent(line);
        if let Some(open) = stack.iter_mut().rev().find(|open| open.indent < note_indent) {
            match &mut open.task.notes {
                Some(notes) => {
                    notes.push('\n');
                    notes.push_str(note);
                }
                None => open.task.notes = Some(note.to_string()),
            }
        }
    }

    while !stack.is_empty() {
        close_top(&mut stack, &mut roots);
    }

    ParsedList {
        title: title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        tasks: roots,
        archived_section,
    }
}

/// Split off everything from the first `\n## Archived` onward.
fn split_archived(source: &str) -> (&str, Option<String>) {
    let marker = format!("\n{}", ARCHIVED_HEADING);
    match source.find(&marker) {
        Some(idx) => (&source[..idx], Some(source[idx + 1..].to_string())),
        None => (source, None),
    }
}

/// Pop the innermost open task and attach it to its parent, or to the roots.
fn close_top(stack: &mut Vec<OpenTask>, roots: &mut Vec<Task>) {
    if let Some(open) = stack.pop() {
        match stack.last_mut() {
            Some(parent) => parent.task.subtasks.push(open.task),
            None => roots.push(open.task),
        }
    }
}

/// Match `<ws>- [c] rest` where `c` is space, `x` or `X`.
/// Returns the indent, completion flag and the remaining text.
fn match_checkbox(line: &str) -> Option<(usize, bool, &str)> {
    let indent = count_indent(line);
    let content = line.trim_start();
    let after_open = content.strip_prefix("- [")?;
    let mut chars = after_open.chars();
    let completed = match chars.next()? {
        ' ' => false,
        'x' | 'X' => true,
        _ => return None,
    };
    let rest = chars.as_str().strip_prefix("] ")?;
    Some((indent, completed, rest))
}

/// Count leading whitespace characters; a tab and a space are one unit each.
fn count_indent(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}
