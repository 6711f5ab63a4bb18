//! Controller behaviour against in-memory stores: mutations, archiving,
//! reordering, and how external changes are debounced and guarded.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pretty_assertions::assert_eq;
use zentodo::controller::{Action, ControllerError, ListController, Phase, spawn};
use zentodo::io::settings_io::MemorySettingsStore;
use zentodo::io::store::MemoryStore;
use zentodo::model::{Settings, Task, TaskId};

const HOME: &str = "30_ToDos/home.md";
const WORK: &str = "30_ToDos/work.md";

type Controller = ListController<MemoryStore, MemorySettingsStore, ()>;

async fn loaded_with(store: MemoryStore, settings: Settings) -> Controller {
    let mut controller = ListController::new(store, MemorySettingsStore::new(settings), ());
    controller.load().await.unwrap();
    controller
}

async fn loaded(store: MemoryStore) -> Controller {
    loaded_with(store, Settings::default()).await
}

fn find<'a>(tasks: &'a [Task], text: &str) -> Option<&'a Task> {
    tasks.iter().find_map(|t| {
        if t.text == text {
            Some(t)
        } else {
            find(&t.subtasks, text)
        }
    })
}

fn id_of(controller: &Controller, text: &str) -> TaskId {
    find(&controller.active_list().unwrap().tasks, text)
        .unwrap_or_else(|| panic!("no task '{}'", text))
        .id
}

fn completed(controller: &Controller, text: &str) -> bool {
    find(&controller.active_list().unwrap().tasks, text)
        .unwrap()
        .completed
}

fn document(store: &MemoryStore) -> String {
    store.get(Path::new(HOME)).unwrap()
}

// ============================================================================
// Completion
// ============================================================================

#[tokio::test]
async fn completing_all_subtasks_completes_parent() {
    let store = MemoryStore::with_files([(HOME, "# Home\n\n- [ ] Parent\n\t- [ ] One\n\t- [ ] Two\n")]);
    let mut controller = loaded(store).await;
    let one = id_of(&controller, "One");
    let two = id_of(&controller, "Two");

    controller.dispatch(Action::Toggle { id: one }).await.unwrap();
    assert!(!completed(&controller, "Parent"));

    controller.dispatch(Action::Toggle { id: two }).await.unwrap();
    assert!(completed(&controller, "Parent"));

    controller.dispatch(Action::Toggle { id: one }).await.unwrap();
    assert!(!completed(&controller, "Parent"));
    assert!(completed(&controller, "Two"));
}

#[tokio::test]
async fn childless_parent_is_never_auto_completed() {
    let store = MemoryStore::with_files([(HOME, "# Home\n\n- [ ] Alone\n")]);
    let mut controller = loaded(store.clone()).await;
    let alone = id_of(&controller, "Alone");

    controller.dispatch(Action::Toggle { id: alone }).await.unwrap();
    assert!(completed(&controller, "Alone"));
    assert!(document(&store).starts_with("# Home\n\n- [x] Alone ✅ "));
}

#[tokio::test]
async fn propagation_can_be_turned_off() {
    let store = MemoryStore::with_files([(HOME, "# Home\n\n- [ ] Parent\n\t- [ ] Only\n")]);
    let settings = Settings {
        auto_complete_parent: false,
        ..Settings::default()
    };
    let mut controller = loaded_with(store, settings).await;
    let only = id_of(&controller, "Only");

    controller.dispatch(Action::Toggle { id: only }).await.unwrap();
    assert!(completed(&controller, "Only"));
    assert!(!completed(&controller, "Parent"));
}

#[tokio::test]
async fn completed_tasks_are_written_after_open_ones() {
    let store = MemoryStore::with_files([(HOME, "# Home\n\n- [ ] A\n- [ ] B\n")]);
    let mut controller = loaded(store.clone()).await;
    let a = id_of(&controller, "A");

    controller.dispatch(Action::Toggle { id: a }).await.unwrap();
    let text = document(&store);
    assert!(text.starts_with("# Home\n\n- [ ] B\n- [x] A ✅ "));
}

// ============================================================================
// Editing
// ============================================================================

#[tokio::test]
async fn add_subtask_with_due_date() {
    let store = MemoryStore::with_files([(HOME, "# Home\n\n- [ ] Parent\n")]);
    let mut controller = loaded(store.clone()).await;
    let parent = id_of(&controller, "Parent");
    let due = chrono::NaiveDate::from_ymd_opt(2030, 1, 2);

    assert!(
        controller
            .dispatch(Action::AddSubtask {
                parent,
                text: "Child".into(),
                due,
            })
            .await
            .unwrap()
    );
    assert_eq!(
        document(&store),
        "# Home\n\n- [ ] Parent\n\t- [ ] Child 📅 2030-01-02\n"
    );
    assert_eq!(find(&controller.active_list().unwrap().tasks, "Child").unwrap().indent_level, 1);
}

#[tokio::test]
async fn edit_text_due_and_delete() {
    let store = MemoryStore::with_files([(HOME, "# Home\n\n- [ ] A 📅 2030-01-01\n- [ ] B\n")]);
    let mut controller = loaded(store.clone()).await;
    let a = id_of(&controller, "A");
    let b = id_of(&controller, "B");

    controller
        .dispatch(Action::EditText {
            id: a,
            text: "A renamed ✅ 2024-01-01".into(),
        })
        .await
        .unwrap();
    controller
        .dispatch(Action::SetDueDate { id: a, due: None })
        .await
        .unwrap();
    controller.dispatch(Action::Delete { id: b }).await.unwrap();

    assert_eq!(document(&store), "# Home\n\n- [ ] A renamed\n");
    // identity survives edits
    assert_eq!(id_of(&controller, "A renamed"), a);
}

// ============================================================================
// Archiving
// ============================================================================

#[tokio::test]
async fn archiving_twice_appends_below_earlier_block() {
    let store = MemoryStore::with_files([(
        HOME,
        "# Home\n\n- [ ] Open\n- [x] First ✅ 2024-01-01\n\t- [x] Sub ✅ 2024-01-01\n\t\tnote\n- [x] Second ✅ 2024-01-02\n",
    )]);
    let mut controller = loaded(store.clone()).await;

    let first = id_of(&controller, "First");
    controller.dispatch(Action::Archive { id: first }).await.unwrap();
    assert_eq!(
        document(&store),
        "# Home\n\n- [ ] Open\n- [x] Second ✅ 2024-01-02\n\n## Archived\n\n- [x] First ✅ 2024-01-01\n\t- [x] Sub ✅ 2024-01-01\n\t\tnote\n"
    );

    let second = id_of(&controller, "Second");
    controller.dispatch(Action::Archive { id: second }).await.unwrap();
    assert_eq!(
        document(&store),
        "# Home\n\n- [ ] Open\n\n## Archived\n\n- [x] First ✅ 2024-01-01\n\t- [x] Sub ✅ 2024-01-01\n\t\tnote\n- [x] Second ✅ 2024-01-02\n"
    );
    assert_eq!(controller.active_list().unwrap().tasks.len(), 1);
}

#[tokio::test]
async fn archive_completed_takes_completed_roots() {
    let store = MemoryStore::with_files([(
        HOME,
        "# Home\n\n- [ ] Open\n\t- [x] Done child\n- [x] A\n- [x] B\n",
    )]);
    let mut controller = loaded(store.clone()).await;

    assert!(controller.dispatch(Action::ArchiveCompleted).await.unwrap());
    assert_eq!(
        document(&store),
        "# Home\n\n- [ ] Open\n\t- [x] Done child\n\n## Archived\n\n- [x] A\n- [x] B\n"
    );
    assert!(!controller.dispatch(Action::ArchiveCompleted).await.unwrap());
}

// ============================================================================
// Reordering
// ============================================================================

#[tokio::test]
async fn reorder_keeps_completed_partition_last() {
    let store = MemoryStore::with_files([(
        HOME,
        "# Home\n\n- [ ] P\n\t- [ ] A\n\t- [ ] B\n\t- [ ] C\n\t- [x] D\n",
    )]);
    let mut controller = loaded(store.clone()).await;
    let p = id_of(&controller, "P");
    let order = vec![
        id_of(&controller, "C"),
        id_of(&controller, "A"),
        id_of(&controller, "B"),
    ];

    controller.dispatch(Action::BeginDrag).await.unwrap();
    assert!(
        controller
            .dispatch(Action::ReorderTasks {
                parent: Some(p),
                order,
            })
            .await
            .unwrap()
    );
    assert_eq!(controller.phase(), Phase::Idle);
    assert_eq!(
        document(&store),
        "# Home\n\n- [ ] P\n\t- [ ] C\n\t- [ ] A\n\t- [ ] B\n\t- [x] D\n"
    );
}

#[tokio::test]
async fn reorder_lists_only_touches_settings() {
    let store = MemoryStore::with_files([(HOME, "# Home\n"), (WORK, "# Work\n")]);
    let settings = MemorySettingsStore::default();
    let mut controller = ListController::new(store.clone(), settings.clone(), ());
    controller.load().await.unwrap();

    controller
        .dispatch(Action::ReorderLists {
            order: vec![PathBuf::from(WORK), PathBuf::from(HOME)],
        })
        .await
        .unwrap();

    let titles: Vec<&str> = controller.lists().iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["Work", "Home"]);
    assert_eq!(settings.save_calls(), 1);
    assert_eq!(store.write_calls(), 0);
}

// ============================================================================
// Storage failures
// ============================================================================

#[tokio::test]
async fn failed_write_keeps_memory_and_can_be_retried() {
    let store = MemoryStore::with_files([(HOME, "# Home\n\n- [ ] A\n")]);
    let mut controller = loaded(store.clone()).await;

    store.set_fail_writes(true);
    let err = controller
        .dispatch(Action::AddTask {
            text: "B".into(),
            due: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ControllerError::Storage(_)));
    assert_eq!(controller.phase(), Phase::Idle);
    assert_eq!(controller.active_list().unwrap().tasks.len(), 2);
    assert_eq!(document(&store), "# Home\n\n- [ ] A\n");

    store.set_fail_writes(false);
    assert!(controller.dispatch(Action::Save).await.unwrap());
    assert_eq!(document(&store), "# Home\n\n- [ ] A\n- [ ] B\n");
}

// ============================================================================
// External changes
// ============================================================================

#[tokio::test(start_paused = true)]
async fn burst_of_external_changes_reloads_once() {
    let store = MemoryStore::with_files([(HOME, "# Home\n\n- [ ] A\n")]);
    let handle = spawn(loaded(store.clone()).await);
    assert_eq!(store.list_calls(), 1);

    store.insert(HOME, "# Home\n\n- [ ] A\n- [ ] B\n");
    for _ in 0..3 {
        assert!(handle.notify_external(PathBuf::from(HOME)));
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    // last notification at 200ms, window is 300ms
    assert_eq!(store.list_calls(), 1);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(store.list_calls(), 2);

    let lists = handle.lists().await.unwrap();
    assert_eq!(lists[0].tasks.len(), 2);
    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn changes_during_own_save_are_ignored() {
    let store = MemoryStore::with_files([(HOME, "# Home\n\n- [ ] A\n")]);
    let handle = spawn(loaded(store.clone()).await);
    store.set_write_delay(Some(Duration::from_millis(100)));

    let (result, during_save) = tokio::join!(
        handle.dispatch(Action::AddTask {
            text: "B".into(),
            due: None,
        }),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let phase = handle.guards().phase();
            (phase, handle.notify_external(PathBuf::from(HOME)))
        }
    );
    assert!(result.unwrap());
    assert_eq!(during_save, (Phase::Saving, false));
    assert_eq!(handle.guards().phase(), Phase::Idle);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(store.list_calls(), 1);
    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn drag_suppresses_reload_and_defers_writes() {
    let store = MemoryStore::with_files([(HOME, "# Home\n\n- [ ] A\n")]);
    let controller = loaded(store.clone()).await;
    let a = id_of(&controller, "A");
    let handle = spawn(controller);

    handle.begin_drag();
    assert_eq!(handle.guards().phase(), Phase::Dragging);
    assert!(!handle.notify_external(PathBuf::from(HOME)));

    handle
        .dispatch(Action::EditText {
            id: a,
            text: "A moved".into(),
        })
        .await
        .unwrap();
    assert_eq!(store.write_calls(), 0);

    assert!(handle.dispatch(Action::EndDrag).await.unwrap());
    assert_eq!(store.write_calls(), 1);
    assert_eq!(document(&store), "# Home\n\n- [ ] A moved\n");

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(store.list_calls(), 1);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn deferred_write_follows_its_list_across_selection() {
    let store = MemoryStore::with_files([(HOME, "# Home\n\n- [ ] A\n"), (WORK, "# Work\n")]);
    let mut controller = loaded(store.clone()).await;
    assert_eq!(controller.active_path(), Some(Path::new(HOME)));

    controller.begin_drag();
    assert!(controller.add_task("B", None).await.unwrap());
    assert!(controller.select_list(Path::new(WORK)));
    assert!(controller.add_task("Report", None).await.unwrap());
    assert_eq!(store.write_calls(), 0);

    assert!(controller.end_drag().await.unwrap());
    assert_eq!(store.write_calls(), 2);
    assert_eq!(document(&store), "# Home\n\n- [ ] A\n- [ ] B\n");
    assert_eq!(
        store.get(Path::new(WORK)).unwrap(),
        "# Work\n\n- [ ] Report\n"
    );

    controller.reload().await.unwrap();
    assert_eq!(controller.lists()[0].tasks.len(), 2);
}

#[tokio::test]
async fn reload_during_drag_keeps_deferred_edit() {
    let store = MemoryStore::with_files([(HOME, "# Home\n\n- [ ] A\n"), (WORK, "# Work\n")]);
    let mut controller = loaded(store.clone()).await;

    controller.begin_drag();
    assert!(controller.add_task("B", None).await.unwrap());
    assert!(controller.dispatch(Action::Reload).await.unwrap());
    assert_eq!(controller.active_list().unwrap().tasks.len(), 2);

    let work = controller.lists()[1].tasks.len();
    assert_eq!(work, 0);

    let a = id_of(&controller, "A");
    let b = id_of(&controller, "B");
    assert!(
        controller
            .dispatch(Action::ReorderTasks {
                parent: None,
                order: vec![b, a],
            })
            .await
            .unwrap()
    );
    assert_eq!(store.write_calls(), 1);
    assert_eq!(document(&store), "# Home\n\n- [ ] B\n- [ ] A\n");
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_pending_reload() {
    let store = MemoryStore::with_files([(HOME, "# Home\n")]);
    let handle = spawn(loaded(store.clone()).await);

    assert!(handle.notify_external(PathBuf::from(HOME)));
    let controller = handle.shutdown().await.unwrap();
    assert!(controller.reload_deadline().is_none());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(store.list_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn removed_document_drops_out_on_reload() {
    let store = MemoryStore::with_files([(HOME, "# Home\n"), (WORK, "# Work\n")]);
    let handle = spawn(loaded(store.clone()).await);

    store.remove(Path::new(HOME));
    assert!(handle.notify_external(PathBuf::from(HOME)));
    tokio::time::sleep(Duration::from_millis(400)).await;

    let lists = handle.lists().await.unwrap();
    let titles: Vec<&str> = lists.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["Work"]);

    let controller = handle.shutdown().await.unwrap();
    assert_eq!(controller.active_path(), Some(Path::new(WORK)));
}
