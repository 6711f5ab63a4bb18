//! Integration tests for the `zt` CLI.
//!
//! Each test creates a temp root directory, runs `zt` as a subprocess,
//! and verifies stdout and/or file contents.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Get the path to the built `zt` binary.
fn zt_bin() -> PathBuf {
    // cargo test builds to target/debug/
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("zt");
    path
}

/// Create a root with two lists in the default folder.
fn create_test_root(root: &Path) {
    let folder = root.join("30_ToDos");
    fs::create_dir_all(&folder).unwrap();

    fs::write(
        folder.join("home.md"),
        "\
# Home

- [ ] Clean kitchen 📅 2099-03-01
\twipe the counters
\t- [ ] Dishes
\t- [x] Floor ✅ 2024-01-20
- [ ] Call plumber
- [x] Fix door ✅ 2024-01-05
",
    )
    .unwrap();

    fs::write(folder.join("work.md"), "# Work\n\n- [ ] Write report\n").unwrap();
}

/// Run `zt` with the given args in the given directory, returning (stdout, stderr, success).
fn run_zt(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(zt_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run zt");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `zt` expecting success, return stdout.
fn run_zt_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_zt(dir, args);
    if !success {
        panic!(
            "zt {:?} failed:\nstdout: {}\nstderr: {}",
            args, stdout, stderr
        );
    }
    stdout
}

fn read_list(root: &Path, name: &str) -> String {
    fs::read_to_string(root.join("30_ToDos").join(name)).unwrap()
}

// ============================================================================
// Read commands
// ============================================================================

#[test]
fn test_lists_in_order() {
    let dir = TempDir::new().unwrap();
    create_test_root(dir.path());

    let stdout = run_zt_ok(dir.path(), &["lists"]);
    assert_eq!(
        stdout,
        " 1  Home  (30_ToDos/home.md)  3 open, 2 done\n 2  Work  (30_ToDos/work.md)  1 open, 0 done\n"
    );
}

#[test]
fn test_lists_empty_root() {
    let dir = TempDir::new().unwrap();
    let stdout = run_zt_ok(dir.path(), &["lists"]);
    assert!(stdout.contains("No todo lists found"));
}

#[test]
fn test_show_hides_completed() {
    let dir = TempDir::new().unwrap();
    create_test_root(dir.path());

    let stdout = run_zt_ok(dir.path(), &["show", "home"]);
    insta::assert_snapshot!(stdout, @r"
    # Home

    1 [ ] Clean kitchen due 2099-03-01
        | wipe the counters
      1.1 [ ] Dishes
    2 [ ] Call plumber
    (1 completed hidden, use --all)
    ");
}

#[test]
fn test_show_all() {
    let dir = TempDir::new().unwrap();
    create_test_root(dir.path());

    let stdout = run_zt_ok(dir.path(), &["show", "Home", "--all"]);
    assert!(stdout.contains("  1.2 [x] Floor done 2024-01-20"));
    assert!(stdout.contains("3 [x] Fix door done 2024-01-05"));
}

#[test]
fn test_show_json() {
    let dir = TempDir::new().unwrap();
    create_test_root(dir.path());

    let stdout = run_zt_ok(dir.path(), &["show", "home", "--json"]);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["title"], "Home");
    assert_eq!(value["tasks"][0]["text"], "Clean kitchen");
    assert_eq!(value["tasks"][0]["due"], "2099-03-01");
    assert_eq!(value["tasks"][0]["due_status"], "upcoming");
    assert_eq!(value["tasks"][0]["subtasks"][1]["position"], "1.2");
    assert_eq!(value["tasks"][2]["completed"], true);
}

#[test]
fn test_show_unknown_list() {
    let dir = TempDir::new().unwrap();
    create_test_root(dir.path());

    let (_, stderr, success) = run_zt(dir.path(), &["show", "nope"]);
    assert!(!success);
    assert!(stderr.contains("no list matching 'nope'"));
}

// ============================================================================
// Write commands
// ============================================================================

#[test]
fn test_new_then_add() {
    let dir = TempDir::new().unwrap();

    let stdout = run_zt_ok(dir.path(), &["new", "Groceries"]);
    assert_eq!(stdout.trim(), "30_ToDos/Groceries.md");

    run_zt_ok(dir.path(), &["add", "groceries", "Milk", "--due", "2099-01-15"]);
    run_zt_ok(dir.path(), &["add", "groceries", "Bread"]);
    assert_eq!(
        read_list(dir.path(), "Groceries.md"),
        "# Groceries\n\n- [ ] Milk 📅 2099-01-15\n- [ ] Bread\n"
    );
}

#[test]
fn test_new_existing_list_fails() {
    let dir = TempDir::new().unwrap();
    create_test_root(dir.path());

    let (_, stderr, success) = run_zt(dir.path(), &["new", "home"]);
    assert!(!success);
    assert!(stderr.contains("already exists"));
}

#[test]
fn test_new_rejects_path_names() {
    let dir = TempDir::new().unwrap();
    create_test_root(dir.path());

    let (_, stderr, success) = run_zt(dir.path(), &["new", "../../x"]);
    assert!(!success);
    assert!(stderr.contains("invalid list name"));

    let (_, _, success) = run_zt(dir.path(), &["new", "a/b"]);
    assert!(!success);
    assert!(!dir.path().join("30_ToDos/a").exists());
    assert_eq!(fs::read_dir(dir.path().join("30_ToDos")).unwrap().count(), 2);
}

#[test]
fn test_sub_and_toggle_completes_parent() {
    let dir = TempDir::new().unwrap();
    create_test_root(dir.path());

    // 1.1 Dishes is the last open subtask of Clean kitchen
    let stdout = run_zt_ok(dir.path(), &["toggle", "home", "1.1"]);
    assert_eq!(stdout.trim(), "completed");

    let text = read_list(dir.path(), "home.md");
    assert!(text.starts_with("# Home\n\n- [ ] Call plumber\n- [x] Clean kitchen 📅 2099-03-01 ✅ "));

    run_zt_ok(dir.path(), &["sub", "work", "1", "Outline"]);
    assert_eq!(
        read_list(dir.path(), "work.md"),
        "# Work\n\n- [ ] Write report\n\t- [ ] Outline\n"
    );
}

#[test]
fn test_edit_due_note_rm() {
    let dir = TempDir::new().unwrap();
    create_test_root(dir.path());

    run_zt_ok(dir.path(), &["edit", "work", "1", "Write the report"]);
    run_zt_ok(dir.path(), &["due", "work", "1", "2099-12-31"]);
    run_zt_ok(dir.path(), &["note", "work", "1", "two pages\nno more"]);
    assert_eq!(
        read_list(dir.path(), "work.md"),
        "# Work\n\n- [ ] Write the report 📅 2099-12-31\n\ttwo pages\n\tno more\n"
    );

    run_zt_ok(dir.path(), &["due", "work", "1"]);
    run_zt_ok(dir.path(), &["note", "work", "1"]);
    assert_eq!(
        read_list(dir.path(), "work.md"),
        "# Work\n\n- [ ] Write the report\n"
    );

    run_zt_ok(dir.path(), &["rm", "work", "1"]);
    assert_eq!(read_list(dir.path(), "work.md"), "# Work\n\n");
}

#[test]
fn test_invalid_due_date() {
    let dir = TempDir::new().unwrap();
    create_test_root(dir.path());

    let (_, stderr, success) = run_zt(dir.path(), &["due", "work", "1", "2024-02-30"]);
    assert!(!success);
    assert!(stderr.contains("invalid date '2024-02-30'"));
}

#[test]
fn test_archive_completed() {
    let dir = TempDir::new().unwrap();
    create_test_root(dir.path());

    run_zt_ok(dir.path(), &["archive", "home"]);
    let text = read_list(dir.path(), "home.md");
    assert!(text.ends_with("\n## Archived\n\n- [x] Fix door ✅ 2024-01-05\n"));
    assert!(!text.contains("- [x] Fix door ✅ 2024-01-05\n\n## Archived"));

    let stdout = run_zt_ok(dir.path(), &["archive", "home"]);
    assert_eq!(stdout.trim(), "nothing to archive");
}

#[test]
fn test_reorder_tasks() {
    let dir = TempDir::new().unwrap();
    create_test_root(dir.path());

    run_zt_ok(dir.path(), &["reorder", "home", "2,1"]);
    let text = read_list(dir.path(), "home.md");
    assert!(text.starts_with("# Home\n\n- [ ] Call plumber\n- [ ] Clean kitchen"));
    assert!(text.contains("- [x] Fix door"));
}

#[test]
fn test_order_lists_persists() {
    let dir = TempDir::new().unwrap();
    create_test_root(dir.path());

    run_zt_ok(dir.path(), &["order", "work", "home"]);
    let settings = fs::read_to_string(dir.path().join(".zentodo.toml")).unwrap();
    assert!(settings.contains("list_order = [\"30_ToDos/work.md\", \"30_ToDos/home.md\"]"));

    let stdout = run_zt_ok(dir.path(), &["lists"]);
    assert!(stdout.trim_start().starts_with("1  Work"));
}

#[test]
fn test_root_dir_flag() {
    let dir = TempDir::new().unwrap();
    create_test_root(dir.path());
    let elsewhere = TempDir::new().unwrap();

    let root = dir.path().to_str().unwrap();
    let stdout = run_zt_ok(elsewhere.path(), &["-C", root, "show", "work"]);
    assert!(stdout.contains("1 [ ] Write report"));
}
