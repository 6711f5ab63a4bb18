use std::error::Error;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::controller::{self, Action, ListController, ListView};
use crate::io::settings_io::TomlSettingsStore;
use crate::io::store::FsStore;
use crate::io::watcher::{FileEvent, FolderWatcher};
use crate::model::list::TodoList;
use crate::model::settings::Settings;
use crate::model::task::TaskId;
use crate::ops::{list_ops, task_ops};
use crate::util::date::{self, parse_date};

type CmdResult = Result<(), Box<dyn Error>>;

type Controller<V = ()> = ListController<FsStore, TomlSettingsStore, V>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub async fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let root = match cli.root_dir {
        Some(ref dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };
    if !root.is_dir() {
        return Err(format!("cannot use -C path '{}': not a directory", root.display()).into());
    }

    match cli.command {
        // Read commands
        Commands::Lists => cmd_lists(&root, json).await,
        Commands::Show(args) => cmd_show(&root, args, json).await,

        // Write commands
        Commands::New(args) => cmd_new(&root, args).await,
        Commands::Add(args) => cmd_add(&root, args).await,
        Commands::Sub(args) => cmd_sub(&root, args).await,
        Commands::Toggle(args) => cmd_toggle(&root, args).await,
        Commands::Edit(args) => cmd_edit(&root, args).await,
        Commands::Due(args) => cmd_due(&root, args).await,
        Commands::Note(args) => cmd_note(&root, args).await,
        Commands::Rm(args) => cmd_rm(&root, args).await,
        Commands::Archive(args) => cmd_archive(&root, args).await,
        Commands::Reorder(args) => cmd_reorder(&root, args).await,
        Commands::Order(args) => cmd_order(&root, args).await,

        Commands::Watch => cmd_watch(&root).await,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn load_with<V: ListView>(root: &Path, view: V) -> Result<Controller<V>, Box<dyn Error>> {
    let mut controller =
        ListController::new(FsStore::new(root), TomlSettingsStore::in_root(root), view);
    controller.load().await?;
    Ok(controller)
}

async fn load(root: &Path) -> Result<Controller, Box<dyn Error>> {
    load_with(root, ()).await
}

fn list_path(lists: &[TodoList], key: &str) -> Result<PathBuf, Box<dyn Error>> {
    list_ops::find_list(lists, key)
        .map(|l| l.file_path.clone())
        .ok_or_else(|| format!("no list matching '{}'", key).into())
}

/// Load everything and make the list named by `key` the active one.
async fn open_list(root: &Path, key: &str) -> Result<Controller, Box<dyn Error>> {
    let mut controller = load(root).await?;
    let path = list_path(controller.lists(), key)?;
    controller.select_list(&path);
    Ok(controller)
}

/// Resolve a display position (`2`, `2.1`) in the active list.
fn resolve(controller: &Controller, position: &str) -> Result<TaskId, Box<dyn Error>> {
    let list = controller.active_list().ok_or("no list selected")?;
    task_ops::resolve_position(&list.tasks, position)
        .ok_or_else(|| format!("no task at position '{}'", position).into())
}

fn parse_due(value: Option<&str>) -> Result<Option<NaiveDate>, Box<dyn Error>> {
    value
        .map(|s| parse_date(s).ok_or_else(|| format!("invalid date '{}', expected YYYY-MM-DD", s)))
        .transpose()
        .map_err(Into::into)
}

fn active_title(controller: &Controller) -> String {
    controller
        .active_list()
        .map(|l| l.title.clone())
        .unwrap_or_default()
}

fn show_completed(settings: &Settings, all: bool) -> bool {
    all || settings.show_completed_by_default
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

async fn cmd_lists(root: &Path, json: bool) -> CmdResult {
    let controller = load(root).await?;
    let lists = controller.lists();

    if json {
        let results: Vec<ListSummaryJson> = lists.iter().map(list_summary_json).collect();
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if lists.is_empty() {
        println!(
            "No todo lists found. Create one with `zt new <name>`, or add .md files to {}/",
            controller.settings().todo_folder
        );
        return Ok(());
    }
    for (i, list) in lists.iter().enumerate() {
        println!("{}", format_list_summary(i, list));
    }
    Ok(())
}

async fn cmd_show(root: &Path, args: ShowArgs, json: bool) -> CmdResult {
    let controller = match args.list {
        Some(ref key) => open_list(root, key).await?,
        None => load(root).await?,
    };
    let Some(list) = controller.active_list() else {
        println!(
            "No todo lists found. Create one with `zt new <name>`, or add .md files to {}/",
            controller.settings().todo_folder
        );
        return Ok(());
    };
    let today = date::today();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&list_detail_json(list, today))?
        );
        return Ok(());
    }

    let show = show_completed(controller.settings(), args.all);
    for line in format_list(list, today, show) {
        println!("{}", line);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

async fn cmd_new(root: &Path, args: NewArgs) -> CmdResult {
    let mut controller = load(root).await?;
    if !controller
        .dispatch(Action::CreateList { name: args.name })
        .await?
    {
        return Err("invalid list name: it must be non-empty, not start with '.', and contain no path separators".into());
    }
    if let Some(path) = controller.active_path() {
        println!("{}", path.display());
    }
    Ok(())
}

async fn cmd_add(root: &Path, args: AddArgs) -> CmdResult {
    let due = parse_due(args.due.as_deref())?;
    let mut controller = open_list(root, &args.list).await?;
    if !controller
        .dispatch(Action::AddTask {
            text: args.text,
            due,
        })
        .await?
    {
        return Err("task text is empty".into());
    }
    println!("added to {}", active_title(&controller));
    Ok(())
}

async fn cmd_sub(root: &Path, args: SubArgs) -> CmdResult {
    let due = parse_due(args.due.as_deref())?;
    let mut controller = open_list(root, &args.list).await?;
    let parent = resolve(&controller, &args.parent)?;
    if !controller
        .dispatch(Action::AddSubtask {
            parent,
            text: args.text,
            due,
        })
        .await?
    {
        return Err("task text is empty".into());
    }
    println!("added under {}", args.parent);
    Ok(())
}

async fn cmd_toggle(root: &Path, args: TaskArgs) -> CmdResult {
    let mut controller = open_list(root, &args.list).await?;
    let id = resolve(&controller, &args.task)?;
    controller.dispatch(Action::Toggle { id }).await?;

    let completed = controller
        .active_list()
        .and_then(|l| task_ops::find_task(&l.tasks, id))
        .is_some_and(|t| t.completed);
    println!("{}", if completed { "completed" } else { "reopened" });
    Ok(())
}

async fn cmd_edit(root: &Path, args: EditArgs) -> CmdResult {
    let mut controller = open_list(root, &args.list).await?;
    let id = resolve(&controller, &args.task)?;
    if !controller
        .dispatch(Action::EditText {
            id,
            text: args.text,
        })
        .await?
    {
        return Err("task text is empty".into());
    }
    Ok(())
}

async fn cmd_due(root: &Path, args: DueArgs) -> CmdResult {
    let due = parse_due(args.date.as_deref())?;
    let mut controller = open_list(root, &args.list).await?;
    let id = resolve(&controller, &args.task)?;
    controller.dispatch(Action::SetDueDate { id, due }).await?;
    Ok(())
}

async fn cmd_note(root: &Path, args: NoteArgs) -> CmdResult {
    let mut controller = open_list(root, &args.list).await?;
    let id = resolve(&controller, &args.task)?;
    controller
        .dispatch(Action::EditNotes {
            id,
            notes: args.text.unwrap_or_default(),
        })
        .await?;
    Ok(())
}

async fn cmd_rm(root: &Path, args: TaskArgs) -> CmdResult {
    let mut controller = open_list(root, &args.list).await?;
    let id = resolve(&controller, &args.task)?;
    controller.dispatch(Action::Delete { id }).await?;
    Ok(())
}

async fn cmd_archive(root: &Path, args: ArchiveArgs) -> CmdResult {
    let mut controller = open_list(root, &args.list).await?;
    let action = match args.task {
        Some(ref position) => Action::Archive {
            id: resolve(&controller, position)?,
        },
        None => Action::ArchiveCompleted,
    };
    if !controller.dispatch(action).await? {
        println!("nothing to archive");
    }
    Ok(())
}

async fn cmd_reorder(root: &Path, args: ReorderArgs) -> CmdResult {
    let mut controller = open_list(root, &args.list).await?;
    let parent = args
        .parent
        .as_deref()
        .map(|p| resolve(&controller, p))
        .transpose()?;

    let mut order = Vec::new();
    for part in args.order.split(',') {
        let position = match args.parent {
            Some(ref p) => format!("{}.{}", p, part.trim()),
            None => part.trim().to_string(),
        };
        order.push(resolve(&controller, &position)?);
    }

    if !controller
        .dispatch(Action::ReorderTasks { parent, order })
        .await?
    {
        return Err("could not reorder: positions must name siblings in one group".into());
    }
    Ok(())
}

async fn cmd_order(root: &Path, args: OrderArgs) -> CmdResult {
    let mut controller = load(root).await?;
    let mut order = Vec::with_capacity(args.lists.len());
    for key in &args.lists {
        order.push(list_path(controller.lists(), key)?);
    }
    controller.dispatch(Action::ReorderLists { order }).await?;
    for (i, list) in controller.lists().iter().enumerate() {
        println!("{}", format_list_summary(i, list));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Watch
// ---------------------------------------------------------------------------

/// Prints a one-line summary of every list each time the lists are loaded.
struct SummaryView;

impl ListView for SummaryView {
    fn render(&mut self, lists: &[TodoList], _active: Option<&Path>, _settings: &Settings) {
        println!(
            "[{}] {} list(s)",
            chrono::Local::now().format("%H:%M:%S"),
            lists.len()
        );
        for (i, list) in lists.iter().enumerate() {
            println!("{}", format_list_summary(i, list));
        }
    }
}

async fn cmd_watch(root: &Path) -> CmdResult {
    let controller = load_with(root, SummaryView).await?;
    let folder = PathBuf::from(&controller.settings().todo_folder);
    std::fs::create_dir_all(root.join(&folder))?;

    let (_watcher, mut events) = FolderWatcher::start(root, &folder)?;
    let handle = controller::spawn(controller);
    eprintln!("watching {}/ (ctrl-c to stop)", folder.display());

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(FileEvent::Changed(paths)) => {
                    for path in paths {
                        handle.notify_external(path);
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.shutdown().await?;
    Ok(())
}
