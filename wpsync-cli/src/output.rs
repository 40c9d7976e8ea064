//! Human-readable run summary on stdout.

use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use wpsync_core::{Classification, EntryKind, RunOptions, SyncTarget};
use wpsync_sync::{BackupStatus, EraseReport, PipelineError, RunOutcome, SyncReport};

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "change")]
    change: String,
    #[tabled(rename = "kind")]
    kind: &'static str,
    #[tabled(rename = "path")]
    path: String,
    #[tabled(rename = "size")]
    size: String,
}

fn prefix(dry_run: bool) -> &'static str {
    if dry_run {
        "[dry-run] "
    } else {
        ""
    }
}

pub fn print_header(target: &SyncTarget, options: RunOptions) {
    let p = prefix(options.dry_run);
    println!(
        "{p}Deploying {} {}",
        target.project_kind(),
        target.project_name().bold()
    );
    println!("{p}  source:      {}", target.local_root().display());
    println!(
        "{p}  destination: {}:{}",
        target.destination(),
        target.resolved_remote_dir()
    );
}

pub fn print_outcome(outcome: &RunOutcome) {
    let dry_run = outcome.report.dry_run;
    print_backup(&outcome.backup, dry_run);
    if let Some(erase) = &outcome.erase {
        print_erase(erase);
    }
    print_report(&outcome.report);

    let p = prefix(dry_run);
    if !outcome.report.failures.is_empty() {
        println!(
            "{p}{} deployment finished with {} skipped file(s)",
            "!".yellow().bold(),
            outcome.report.failures.len()
        );
    } else if dry_run {
        println!("{p}{} preview complete; nothing was changed", "✓".green().bold());
    } else {
        println!("{p}{} deployment complete", "✓".green().bold());
    }
}

fn print_backup(status: &BackupStatus, dry_run: bool) {
    let p = prefix(dry_run);
    match status {
        BackupStatus::Created(archive) => println!(
            "{p}  backup:      {} ({})",
            archive.file_path.display(),
            human_size(archive.size_bytes)
        ),
        BackupStatus::Failed(reason) => {
            println!("{p}  backup:      {} {reason}", "failed:".yellow())
        }
        BackupStatus::Skipped(reason) => println!("{p}  backup:      skipped ({reason})"),
    }
}

fn print_erase(erase: &EraseReport) {
    println!("  remote:      erased ({} commands)", erase.commands_run);
    for warning in &erase.warnings {
        println!(
            "  {} `{}` exited {}: {}",
            "warning:".yellow(),
            warning.command,
            warning.status,
            warning.stderr
        );
    }
}

/// Change table, per-classification counts and per-file failures.
pub fn print_report(report: &SyncReport) {
    let p = prefix(report.dry_run);
    let rows: Vec<ChangeRow> = report
        .changes()
        .map(|record| ChangeRow {
            change: paint(record.classification),
            kind: match record.kind {
                EntryKind::File => "file",
                EntryKind::Dir => "dir",
                EntryKind::Symlink => "link",
            },
            path: record.relative_path.clone(),
            size: if record.kind.is_dir() {
                "-".to_string()
            } else {
                human_size(record.size_bytes)
            },
        })
        .collect();

    if rows.is_empty() {
        println!("{p}No changes; remote is up to date.");
    } else {
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        for line in table.to_string().lines() {
            println!("{p}{line}");
        }
    }

    println!(
        "{p}{} created, {} updated, {} deleted, {} unchanged ({} to transfer)",
        report.count(Classification::Created),
        report.count(Classification::Updated),
        report.count(Classification::Deleted),
        report.count(Classification::Unchanged),
        human_size(report.bytes_to_transfer()),
    );

    for failure in &report.failures {
        println!(
            "{p}  {} {} {}: {}",
            "skipped".yellow(),
            failure.operation,
            failure.relative_path,
            failure.reason
        );
    }
    if report.cancelled {
        println!("{p}{}", "run cancelled before all changes were applied".yellow());
    }
}

/// Partial report (if any) on stdout, cause on stderr.
pub fn print_failure(err: &PipelineError) {
    if let Some(report) = &err.report {
        print_report(report);
    }
    eprintln!("{} {err}", "error:".red().bold());
    let mut source = std::error::Error::source(&err.kind);
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}

fn paint(classification: Classification) -> String {
    let label = classification.to_string();
    match classification {
        Classification::Created => label.green().to_string(),
        Classification::Updated => label.cyan().to_string(),
        Classification::Deleted => label.red().to_string(),
        Classification::Unchanged => label,
    }
}

fn human_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
