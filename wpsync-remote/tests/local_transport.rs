use std::fs;

use tempfile::TempDir;

use wpsync_core::EntryKind;
use wpsync_remote::{BulkTransfer, LocalTransport, RemoteExecutor};

fn path_str(p: &std::path::Path) -> String {
    p.to_string_lossy().into_owned()
}

#[test]
fn missing_directory_lists_as_empty() {
    let tmp = TempDir::new().expect("tmp");
    let mut transport = LocalTransport::new();
    let entries = transport
        .list(&path_str(&tmp.path().join("absent")))
        .expect("list");
    assert!(entries.is_empty());
}

#[test]
fn upload_creates_parents_and_preserves_mtime() {
    let src = TempDir::new().expect("src");
    let dest = TempDir::new().expect("dest");
    let local = src.path().join("style.css");
    fs::write(&local, "body{}").expect("write");

    let mut transport = LocalTransport::new();
    let remote = dest.path().join("assets/css/style.css");
    transport
        .upload(&local, &path_str(&remote), 1_600_000_000)
        .expect("upload");

    let entries = transport.list(&path_str(dest.path())).expect("list");
    let paths: Vec<_> = entries.iter().map(|e| e.relative_path.as_str()).collect();
    assert_eq!(paths, vec!["assets", "assets/css", "assets/css/style.css"]);

    let file = entries.last().unwrap();
    assert_eq!(file.kind, EntryKind::File);
    assert_eq!(file.size, 6);
    assert_eq!(file.modified, 1_600_000_000);
}

#[test]
fn remove_handles_files_directories_and_missing_entries() {
    let dest = TempDir::new().expect("dest");
    fs::create_dir_all(dest.path().join("docs/api")).expect("mkdir");
    fs::write(dest.path().join("docs/api/index.html"), "x").expect("write");
    fs::write(dest.path().join("old.php"), "x").expect("write");

    let mut transport = LocalTransport::new();
    transport
        .remove(&path_str(&dest.path().join("old.php")), EntryKind::File)
        .expect("remove file");
    transport
        .remove(&path_str(&dest.path().join("docs")), EntryKind::Dir)
        .expect("remove dir");
    transport
        .remove(&path_str(&dest.path().join("ghost.php")), EntryKind::File)
        .expect("missing file is fine");

    assert!(transport.list(&path_str(dest.path())).expect("list").is_empty());
}

#[test]
fn execute_reports_exit_status() {
    let mut transport = LocalTransport::new();
    let ok = transport.execute("echo hello").expect("run");
    assert!(ok.success());
    assert_eq!(ok.stdout.trim(), "hello");

    let failed = transport.execute("exit 3").expect("run");
    assert_eq!(failed.status, 3);
}

#[test]
fn symlinks_are_listed_as_links_and_replaced_on_upload() {
    let src = TempDir::new().expect("src");
    let dest = TempDir::new().expect("dest");
    let outside = TempDir::new().expect("outside");
    let victim = outside.path().join("victim.txt");
    fs::write(&victim, "untouched").expect("write");
    std::os::unix::fs::symlink(&victim, dest.path().join("config.php")).expect("symlink");

    let mut transport = LocalTransport::new();
    let entries = transport.list(&path_str(dest.path())).expect("list");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, EntryKind::Symlink);

    let local = src.path().join("config.php");
    fs::write(&local, "<?php").expect("write");
    transport
        .upload(&local, &path_str(&dest.path().join("config.php")), 1_600_000_000)
        .expect("upload");

    assert_eq!(fs::read_to_string(&victim).expect("read"), "untouched");
    let meta = fs::symlink_metadata(dest.path().join("config.php")).expect("stat");
    assert!(meta.file_type().is_file());
    assert_eq!(
        fs::read_to_string(dest.path().join("config.php")).expect("read"),
        "<?php"
    );
}

#[test]
fn unwritable_destination_is_named_in_upload_error() {
    let src = TempDir::new().expect("src");
    let dest = TempDir::new().expect("dest");
    let local = src.path().join("a.txt");
    fs::write(&local, "a").expect("write");
    // a directory where the file should go makes the write side fail
    let remote = dest.path().join("a.txt");
    fs::create_dir_all(&remote).expect("mkdir");

    let err = LocalTransport::new()
        .upload(&local, &path_str(&remote), 0)
        .expect_err("destination is a directory");

    match err {
        wpsync_remote::TransportError::Io { path, .. } => assert_eq!(path, remote),
        other => panic!("unexpected error: {other:?}"),
    }
}
