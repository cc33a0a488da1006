//! Tests for the import-rewrite developer utility.

use marketd::tools::rewrite_imports;

#[test]
fn rewrites_component_files_and_skips_everything_else() {
    let dir = tempfile::tempdir().unwrap();

    std::fs::write(
        dir.path().join("button.tsx"),
        "import { cn } from \"@/lib/utils\";\nexport const Button = () => null;\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("card.tsx"),
        "import * as React from \"react\";\n",
    )
    .unwrap();
    // Wrong suffix — must not be touched even though it contains the alias.
    std::fs::write(dir.path().join("notes.md"), "uses \"@/lib/utils\"\n").unwrap();
    // Subdirectories are out of scope (the scan is non-recursive).
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    std::fs::write(
        dir.path().join("nested").join("inner.tsx"),
        "import { cn } from \"@/lib/utils\";\n",
    )
    .unwrap();

    let summary = rewrite_imports::run(dir.path()).unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.failed, 0);

    let button = std::fs::read_to_string(dir.path().join("button.tsx")).unwrap();
    assert!(button.contains("\"../../lib/utils\""));
    assert!(!button.contains("@/lib/utils"));

    let notes = std::fs::read_to_string(dir.path().join("notes.md")).unwrap();
    assert!(notes.contains("@/lib/utils"));
    let inner = std::fs::read_to_string(dir.path().join("nested").join("inner.tsx")).unwrap();
    assert!(inner.contains("@/lib/utils"));
}

#[test]
fn an_unreadable_file_is_logged_and_the_scan_continues() {
    let dir = tempfile::tempdir().unwrap();

    // Invalid UTF-8 — read_to_string fails on it.
    std::fs::write(dir.path().join("broken.tsx"), [0xff, 0xfe, 0xfa]).unwrap();
    std::fs::write(
        dir.path().join("button.tsx"),
        "import { cn } from \"@/lib/utils\";\n",
    )
    .unwrap();

    let summary = rewrite_imports::run(dir.path()).unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.updated, 1);
}

#[test]
fn missing_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    assert!(rewrite_imports::run(&missing).is_err());
}

#[test]
fn running_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("badge.tsx"),
        "import { cn } from \"@/lib/utils\";\n",
    )
    .unwrap();

    let first = rewrite_imports::run(dir.path()).unwrap();
    assert_eq!(first.updated, 1);

    let second = rewrite_imports::run(dir.path()).unwrap();
    assert_eq!(second.updated, 0);
    assert_eq!(second.unchanged, 1);
}
