// Tests for the directory walker.
//
// These tests verify:
// 1. Entries come out depth-first in sorted order with forward-slash keys
// 2. Pruning a directory skips its whole subtree
// 3. Size and modification time are reported for files
// 4. Root failures are reported at build time
// 5. Followed links are walked unless they lead back to an ancestor
// 6. Keys built from non-UTF-8 names are flagged

use std::fs;
use std::path::Path;

use walk::{WalkBuilder, WalkErrorKind, Walker};

fn keys(walker: Walker) -> Vec<String> {
    walker
        .map(|entry| entry.expect("walker entry").key().to_owned())
        .collect()
}

fn tree(files: &[&str]) -> tempfile::TempDir {
    let temp = tempfile::tempdir().expect("tempdir");
    for file in files {
        let path = temp.path().join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, file.as_bytes()).expect("write file");
    }
    temp
}

// ==================== Ordering ====================

#[test]
fn walk_yields_sorted_depth_first_order() {
    let temp = tree(&["c.txt", "b/inner.txt", "a/z.txt", "a/deep/x.txt"]);
    let walker = WalkBuilder::new(temp.path()).build().expect("build walker");

    assert_eq!(
        keys(walker),
        [
            "a",
            "a/deep",
            "a/deep/x.txt",
            "a/z.txt",
            "b",
            "b/inner.txt",
            "c.txt",
        ]
    );
}

#[test]
fn walk_is_repeatable() {
    let temp = tree(&["one", "two/three", "two/four", "five"]);
    let first = keys(WalkBuilder::new(temp.path()).build().expect("build walker"));
    let second = keys(WalkBuilder::new(temp.path()).build().expect("build walker"));
    assert_eq!(first, second);
}

#[test]
fn empty_root_yields_nothing() {
    let temp = tempfile::tempdir().expect("tempdir");
    let walker = WalkBuilder::new(temp.path()).build().expect("build walker");
    assert!(keys(walker).is_empty());
}

#[test]
fn depth_counts_from_root_children() {
    let temp = tree(&["top.txt", "dir/nested.txt"]);
    let depths: Vec<(String, usize)> = WalkBuilder::new(temp.path())
        .build()
        .expect("build walker")
        .map(|entry| {
            let entry = entry.expect("entry");
            (entry.key().to_owned(), entry.depth())
        })
        .collect();

    assert_eq!(
        depths,
        [
            ("dir".to_owned(), 1),
            ("dir/nested.txt".to_owned(), 2),
            ("top.txt".to_owned(), 1),
        ]
    );
}

// ==================== Pruning ====================

#[test]
fn skip_current_dir_prunes_subtree() {
    let temp = tree(&["keep/a.txt", "skip/b.txt", "skip/deeper/c.txt", "z.txt"]);
    let mut walker = WalkBuilder::new(temp.path()).build().expect("build walker");

    let mut seen = Vec::new();
    while let Some(entry) = walker.next() {
        let entry = entry.expect("entry");
        if entry.key() == "skip" {
            walker.skip_current_dir();
        }
        seen.push(entry.key().to_owned());
    }

    assert_eq!(seen, ["keep", "keep/a.txt", "skip", "z.txt"]);
}

#[test]
fn skip_after_file_is_a_no_op() {
    let temp = tree(&["a.txt", "b/c.txt"]);
    let mut walker = WalkBuilder::new(temp.path()).build().expect("build walker");

    let mut seen = Vec::new();
    while let Some(entry) = walker.next() {
        let entry = entry.expect("entry");
        if entry.is_file() {
            walker.skip_current_dir();
        }
        seen.push(entry.key().to_owned());
    }

    assert_eq!(seen, ["a.txt", "b", "b/c.txt"]);
}

// ==================== Metadata ====================

#[test]
fn files_report_size_and_mtime() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("data.bin"), vec![7_u8; 1024]).expect("write");

    let entry = WalkBuilder::new(temp.path())
        .build()
        .expect("build walker")
        .next()
        .expect("one entry")
        .expect("entry ok");

    assert!(entry.is_file());
    assert!(!entry.is_dir());
    assert_eq!(entry.len(), 1024);
    assert!(entry.modified().is_some());
    assert_eq!(entry.full_path(), temp.path().join("data.bin"));
}

#[cfg(unix)]
#[test]
fn symlinks_are_reported_unresolved_by_default() {
    let temp = tree(&["real/file.txt"]);
    std::os::unix::fs::symlink(temp.path().join("real"), temp.path().join("link"))
        .expect("symlink");

    let entries: Vec<(String, bool)> = WalkBuilder::new(temp.path())
        .build()
        .expect("build walker")
        .map(|entry| {
            let entry = entry.expect("entry");
            (entry.key().to_owned(), entry.is_dir())
        })
        .collect();

    assert_eq!(
        entries,
        [
            ("link".to_owned(), false),
            ("real".to_owned(), true),
            ("real/file.txt".to_owned(), false),
        ]
    );
}

#[cfg(unix)]
#[test]
fn followed_symlink_cycle_is_visited_once() {
    let temp = tree(&["dir/file.txt"]);
    std::os::unix::fs::symlink(temp.path().join("dir"), temp.path().join("dir/loop"))
        .expect("symlink");

    let walker = WalkBuilder::new(temp.path())
        .follow_symlinks(true)
        .build()
        .expect("build walker");

    assert_eq!(keys(walker), ["dir", "dir/file.txt", "dir/loop"]);
}

#[cfg(unix)]
#[test]
fn followed_alias_and_its_target_are_both_walked() {
    let temp = tree(&["shared/x.css"]);
    std::os::unix::fs::symlink(temp.path().join("shared"), temp.path().join("alias"))
        .expect("symlink");

    let walker = WalkBuilder::new(temp.path())
        .follow_symlinks(true)
        .build()
        .expect("build walker");

    assert_eq!(
        keys(walker),
        ["alias", "alias/x.css", "shared", "shared/x.css"]
    );
}

// ==================== Non-UTF-8 names ====================

#[test]
fn utf8_names_are_not_lossy() {
    let temp = tree(&["dir/caf\u{e9}.txt"]);
    let walker = WalkBuilder::new(temp.path()).build().expect("build walker");

    assert!(walker.map(|entry| entry.expect("entry")).all(|entry| !entry.is_lossy()));
}

#[cfg(target_os = "linux")]
#[test]
fn invalid_utf8_names_mark_the_subtree_lossy() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let temp = tree(&["plain.txt"]);
    let bad = temp.path().join(OsStr::from_bytes(b"bad\xff"));
    fs::create_dir(&bad).expect("create dir");
    fs::write(bad.join("inner.txt"), b"x").expect("write file");

    let entries: Vec<(String, bool)> = WalkBuilder::new(temp.path())
        .build()
        .expect("build walker")
        .map(|entry| {
            let entry = entry.expect("entry");
            (entry.key().to_owned(), entry.is_lossy())
        })
        .collect();

    assert_eq!(
        entries,
        [
            ("bad\u{fffd}".to_owned(), true),
            ("bad\u{fffd}/inner.txt".to_owned(), true),
            ("plain.txt".to_owned(), false),
        ]
    );
}

// ==================== Errors ====================

#[test]
fn missing_root_fails_to_build() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().join("absent");
    let error = WalkBuilder::new(&root).build().err().expect("missing root");

    assert!(error.is_root_missing());
    assert!(matches!(error.kind(), WalkErrorKind::RootMetadata { .. }));
    assert_eq!(error.path(), root);
}

#[test]
fn file_root_fails_to_read() {
    let temp = tree(&["plain.txt"]);
    let root = temp.path().join("plain.txt");
    let error = WalkBuilder::new(&root).build().err().expect("file root");

    assert!(!error.is_root_missing());
    assert!(matches!(error.kind(), WalkErrorKind::ReadDir { .. }));
    assert_eq!(error.path(), Path::new(&root));
}
