use std::path::PathBuf;

use serde::Serialize;

use super::task::Task;

/// Heading that opens the opaque archive block at the end of a document.
pub const ARCHIVED_HEADING: &str = "## Archived";

/// Title used when a document has no level-1 heading.
pub const DEFAULT_TITLE: &str = "Untitled";

/// One parsed todo document
#[derive(Debug, Clone, Serialize)]
pub struct TodoList {
    /// Document key in the store (unique)
    pub file_path: PathBuf,
    pub title: String,
    /// Root forest
    pub tasks: Vec<Task>,
    /// Verbatim text from the `## Archived` heading onward, never parsed
    pub archived_section: Option<String>,
}

impl TodoList {
    /// Append rendered task lines to the archive block, creating the
    /// heading on first use. Earlier archived text is never touched.
    pub fn append_archived(&mut self, lines: &[String]) {
        if lines.is_empty() {
            return;
        }
        let block = lines.join("\n");
        match &mut self.archived_section {
            Some(section) => {
                if !section.ends_with('\n') {
                    section.push('\n');
                }
                section.push_str(&block);
                section.push('\n');
            }
            None => {
                self.archived_section = Some(format!("{}\n\n{}\n", ARCHIVED_HEADING, block));
            }
        }
    }
}
