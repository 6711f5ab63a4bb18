use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "zt", about = concat!("zentodo v", env!("CARGO_PKG_VERSION"), " - checkbox lists in plain markdown"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different root directory
    #[arg(short = 'C', long = "root-dir", global = true)]
    pub root_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List all todo lists
    Lists,
    /// Show the tasks of a list
    Show(ShowArgs),
    /// Create a new list
    New(NewArgs),
    /// Add a task to a list
    Add(AddArgs),
    /// Add a subtask
    Sub(SubArgs),
    /// Complete or reopen a task
    Toggle(TaskArgs),
    /// Change task text
    Edit(EditArgs),
    /// Set or clear a due date
    Due(DueArgs),
    /// Set or clear task notes
    Note(NoteArgs),
    /// Delete a task and its subtasks
    Rm(TaskArgs),
    /// Archive one task, or every completed task
    Archive(ArchiveArgs),
    /// Reorder sibling tasks
    Reorder(ReorderArgs),
    /// Set the order of lists
    Order(OrderArgs),
    /// Watch the todo folder and reload on changes
    Watch,
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ShowArgs {
    /// List to show: path, file name, or title (default: first list)
    pub list: Option<String>,
    /// Include completed tasks
    #[arg(long)]
    pub all: bool,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct NewArgs {
    /// List name (becomes the title and the file name)
    pub name: String,
}

#[derive(Args)]
pub struct AddArgs {
    /// List to add to
    pub list: String,
    /// Task text
    pub text: String,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args)]
pub struct SubArgs {
    pub list: String,
    /// Parent task position (e.g. 2 or 2.1)
    pub parent: String,
    /// Subtask text
    pub text: String,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args)]
pub struct TaskArgs {
    pub list: String,
    /// Task position (e.g. 2 or 2.1)
    pub task: String,
}

#[derive(Args)]
pub struct EditArgs {
    pub list: String,
    /// Task position
    pub task: String,
    /// New text
    pub text: String,
}

#[derive(Args)]
pub struct DueArgs {
    pub list: String,
    /// Task position
    pub task: String,
    /// Due date (YYYY-MM-DD); omit to clear
    pub date: Option<String>,
}

#[derive(Args)]
pub struct NoteArgs {
    pub list: String,
    /// Task position
    pub task: String,
    /// Note text; omit to clear
    pub text: Option<String>,
}

#[derive(Args)]
pub struct ArchiveArgs {
    pub list: String,
    /// Task position (default: every completed task)
    pub task: Option<String>,
}

#[derive(Args)]
pub struct ReorderArgs {
    pub list: String,
    /// New order as comma-separated positions within one group, e.g. 3,1,2
    pub order: String,
    /// Reorder the subtasks of this task instead of the top level
    #[arg(long)]
    pub parent: Option<String>,
}

#[derive(Args)]
pub struct OrderArgs {
    /// Lists in the wanted order (path, file name, or title)
    #[arg(required = true)]
    pub lists: Vec<String>,
}
