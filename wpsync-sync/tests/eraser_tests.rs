mod common;

use tempfile::TempDir;

use common::{target, StubTransport, REMOTE_DIR};
use wpsync_sync::{erase_remote, RemoteError};

#[test]
fn dry_run_erase_issues_no_commands() {
    let local = TempDir::new().expect("tmp");
    let mut transport = StubTransport::new().with_file("a.txt", 1, 1);

    let report = erase_remote(&mut transport, &target(local.path()), "docs", true).expect("erase");

    assert!(report.skipped);
    assert_eq!(report.commands_run, 0);
    assert!(transport.commands.is_empty());
    assert_eq!(transport.relative_paths(), vec!["a.txt"]);
}

#[test]
fn erase_runs_three_commands_in_order() {
    let local = TempDir::new().expect("tmp");
    let mut transport = StubTransport::new()
        .with_file("a.txt", 1, 1)
        .with_dir("docs");

    let report = erase_remote(&mut transport, &target(local.path()), "docs", false).expect("erase");

    assert!(!report.skipped);
    assert_eq!(report.commands_run, 3);
    assert!(report.warnings.is_empty());
    assert_eq!(transport.commands[0], format!("rm -rf '{REMOTE_DIR}'/*"));
    assert!(transport.commands[1].contains(".DS_Store"));
    assert_eq!(transport.commands[2], format!("rm -rf '{REMOTE_DIR}/docs'"));
    assert!(transport.relative_paths().is_empty());
}

#[test]
fn primary_failure_is_fatal() {
    let local = TempDir::new().expect("tmp");
    let mut transport = StubTransport::new();
    transport.command_statuses = vec![1];

    let err = erase_remote(&mut transport, &target(local.path()), "docs", false)
        .expect_err("primary failure");

    assert!(matches!(err, RemoteError::EraseFailed { .. }));
    assert_eq!(transport.commands.len(), 1);
}

#[test]
fn secondary_failures_are_warnings() {
    let local = TempDir::new().expect("tmp");
    let mut transport = StubTransport::new();
    transport.command_statuses = vec![0, 1, 1];

    let report = erase_remote(&mut transport, &target(local.path()), "docs", false)
        .expect("secondary failures tolerated");

    assert_eq!(report.commands_run, 3);
    assert_eq!(report.warnings.len(), 2);
    assert_eq!(report.warnings[0].status, 1);
    assert_eq!(report.warnings[1].command, transport.commands[2]);
}

#[test]
fn unreachable_host_is_fatal() {
    let local = TempDir::new().expect("tmp");
    let mut transport = StubTransport::new();
    transport.unreachable = true;

    let err = erase_remote(&mut transport, &target(local.path()), "docs", false)
        .expect_err("unreachable");

    assert!(matches!(err, RemoteError::Unreachable(_)));
}
