use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::model::list::TodoList;

/// Stable-sort lists by their position in `order`. Lists missing from the
/// order keep their relative order after all ordered ones.
pub fn sort_by_order(lists: &mut [TodoList], order: &[PathBuf]) {
    if order.is_empty() {
        return;
    }
    lists.sort_by_key(|list| {
        order
            .iter()
            .position(|p| *p == list.file_path)
            .unwrap_or(usize::MAX)
    });
}

/// Drop order entries that no longer name a loaded list.
/// Returns true if anything was removed.
pub fn prune_order(order: &mut Vec<PathBuf>, lists: &[TodoList]) -> bool {
    let valid: HashSet<&Path> = lists.iter().map(|l| l.file_path.as_path()).collect();
    let before = order.len();
    order.retain(|p| valid.contains(p.as_path()));
    order.len() != before
}

/// Find a list by exact path, by file stem (`groceries` for
/// `30_ToDos/groceries.md`), or case-insensitively by title.
pub fn find_list<'a>(lists: &'a [TodoList], key: &str) -> Option<&'a TodoList> {
    let key_path = Path::new(key);
    lists
        .iter()
        .find(|l| l.file_path == key_path)
        .or_else(|| {
            lists
                .iter()
                .find(|l| l.file_path.file_stem().and_then(|s| s.to_str()) == Some(key))
        })
        .or_else(|| lists.iter().find(|l| l.title.eq_ignore_ascii_case(key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(path: &str, title: &str) -> TodoList {
        TodoList {
            file_path: PathBuf::from(path),
            title: title.to_string(),
            tasks: Vec::new(),
            archived_section: None,
        }
    }

    fn paths(lists: &[TodoList]) -> Vec<&str> {
        lists
            .iter()
            .map(|l| l.file_path.to_str().unwrap())
            .collect()
    }

    #[test]
    fn sort_puts_unknown_lists_last() {
        let mut lists = vec![list("d/a.md", "A"), list("d/b.md", "B"), list("d/c.md", "C")];
        sort_by_order(&mut lists, &[PathBuf::from("d/c.md"), PathBuf::from("d/a.md")]);
        assert_eq!(paths(&lists), vec!["d/c.md", "d/a.md", "d/b.md"]);
    }

    #[test]
    fn empty_order_keeps_load_order() {
        let mut lists = vec![list("d/b.md", "B"), list("d/a.md", "A")];
        sort_by_order(&mut lists, &[]);
        assert_eq!(paths(&lists), vec!["d/b.md", "d/a.md"]);
    }

    #[test]
    fn prune_removes_stale_paths() {
        let lists = vec![list("d/a.md", "A")];
        let mut order = vec![PathBuf::from("d/gone.md"), PathBuf::from("d/a.md")];
        assert!(prune_order(&mut order, &lists));
        assert_eq!(order, vec![PathBuf::from("d/a.md")]);
        assert!(!prune_order(&mut order, &lists));
    }

    #[test]
    fn find_by_path_stem_or_title() {
        let lists = vec![list("d/home.md", "Chores"), list("d/work.md", "Work")];
        assert_eq!(find_list(&lists, "d/work.md").unwrap().title, "Work");
        assert_eq!(find_list(&lists, "home").unwrap().title, "Chores");
        assert_eq!(find_list(&lists, "chores").unwrap().title, "Chores");
        assert!(find_list(&lists, "missing").is_none());
    }
}
