// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand handlers.  Each one is a thin presentation layer over the
// service layer and `PrintService`.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use stapeldruck_bridge::PrinterSubsystem;
use stapeldruck_core::error::{Result, StapeldruckError};
use stapeldruck_core::types::{PrinterDescriptor, PrinterState, TaskId, TaskStatus};
use stapeldruck_core::AppConfig;
use stapeldruck_print::folder::{filter_by_name, list_printable_files, sort_entries};
use stapeldruck_print::{FileEntry, PrintTask, SortOrder, TaskEvent};

use crate::cli::{Cli, Command, PrintArgs};
use crate::services::app_services::AppServices;

/// Printer name used by `--dry-run` when nothing else names one.
const DRY_RUN_PRINTER: &str = "Dry Run";

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let data_dir = cli.data_dir.as_deref();
    match cli.command {
        Command::Printers { watch } => {
            let services = AppServices::init(data_dir)?;
            printers(&services, watch).await
        }
        Command::List {
            folder,
            sort,
            filter,
        } => list(&folder, sort, filter.as_deref()),
        Command::Print(args) => print(data_dir, args).await,
        Command::History { clear } => {
            let services = AppServices::init(data_dir)?;
            history(&services, clear)
        }
    }
}

// -- printers ----------------------------------------------------------------

async fn printers(services: &AppServices, watch: bool) -> Result<ExitCode> {
    let subsystem = services.subsystem();
    let default = blocking(subsystem, |s| s.default_printer()).await?;
    let list = blocking(subsystem, |s| s.list_printers()).await?;

    if list.is_empty() {
        println!("No printers found.");
    }
    for printer in &list {
        let marker = if default.as_deref() == Some(printer.name.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{marker} {:<40} {}", printer.name, describe(printer));
    }

    if !watch {
        return Ok(ExitCode::SUCCESS);
    }

    let period = services.config().printer_refresh();
    let mut last = states(&list);
    info!(secs = period.as_secs(), "watching printer status");
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => return Ok(ExitCode::SUCCESS),
        }

        let list = match blocking(subsystem, |s| s.list_printers()).await {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "printer refresh failed");
                continue;
            }
        };
        let now = states(&list);
        for (name, state) in state_changes(&last, &now) {
            let label = state.map_or("removed", |s| s.label());
            println!("{} {:<40} {}", timestamp(Utc::now()), name, label);
        }
        last = now;
    }
}

fn describe(printer: &PrinterDescriptor) -> String {
    match printer.state() {
        PrinterState::Ready => "ready".into(),
        state => format!("{} (status 0x{:08x})", state.label(), printer.status),
    }
}

fn states(list: &[PrinterDescriptor]) -> BTreeMap<String, PrinterState> {
    list.iter().map(|p| (p.name.clone(), p.state())).collect()
}

/// Printers whose state differs between two polls.  `None` means the printer
/// disappeared.
fn state_changes<'a>(
    last: &'a BTreeMap<String, PrinterState>,
    now: &'a BTreeMap<String, PrinterState>,
) -> Vec<(&'a str, Option<PrinterState>)> {
    let changed = now
        .iter()
        .filter(|(name, state)| last.get(*name) != Some(*state))
        .map(|(name, state)| (name.as_str(), Some(*state)));
    let removed = last
        .keys()
        .filter(|name| !now.contains_key(*name))
        .map(|name| (name.as_str(), None));
    changed.chain(removed).collect()
}

async fn blocking<T, F>(subsystem: &Arc<dyn PrinterSubsystem>, call: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn PrinterSubsystem) -> Result<T> + Send + 'static,
{
    let subsystem = Arc::clone(subsystem);
    tokio::task::spawn_blocking(move || call(subsystem.as_ref()))
        .await
        .map_err(|e| StapeldruckError::Spooler(format!("spooler call aborted: {e}")))?
}

// -- list --------------------------------------------------------------------

fn list(folder: &Path, sort: SortOrder, filter: Option<&str>) -> Result<ExitCode> {
    let mut entries = list_printable_files(folder)?;
    sort_entries(&mut entries, sort);
    let shown = filter_by_name(&entries, filter.unwrap_or_default());

    for entry in &shown {
        println!("{:<50} {:<5} {:>10}", entry.name, entry.extension, human_size(entry.size));
    }
    println!("{} of {} printable files", shown.len(), entries.len());
    Ok(ExitCode::SUCCESS)
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
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

// -- print -------------------------------------------------------------------

async fn print(data_dir: Option<&Path>, args: PrintArgs) -> Result<ExitCode> {
    let selected = select_files(&args)?;

    // A dry run only knows the one printer it was built with, so the
    // configured default never applies to it.
    let (mut services, printer) = if args.dry_run {
        let name = args.printer.clone().unwrap_or_else(|| DRY_RUN_PRINTER.to_string());
        (AppServices::dry_run(data_dir, &name)?, Some(name))
    } else {
        let services = AppServices::init(data_dir)?;
        let printer = match args.printer.clone().or_else(|| services.config().default_printer.clone()) {
            Some(name) => Some(name),
            None => blocking(services.subsystem(), |s| s.default_printer()).await?,
        };
        (services, printer)
    };
    let settings = args.settings(&services.config().default_settings);

    let service = services.start_print_service();
    if let Some(name) = &printer {
        service.select_printer(name.clone());
    }

    let mut events = service.subscribe();
    let ids = match service.submit_batch(selected.iter().map(|e| e.path.clone()), settings.clone()) {
        Ok(ids) => ids,
        Err(e) => {
            service.shutdown().await;
            return Err(e);
        }
    };
    println!(
        "Queued {} file(s) for {} ({} {} {} {}, {} cop{})",
        ids.len(),
        printer.as_deref().unwrap_or("?"),
        settings.paper_size.label(),
        settings.orientation.label(),
        settings.color_mode.label(),
        settings.duplex.label(),
        settings.copies,
        if settings.copies == 1 { "y" } else { "ies" },
    );

    let mut pending: HashSet<TaskId> = ids.iter().copied().collect();
    let mut interrupted = false;
    while !pending.is_empty() {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    report(&event);
                    if event.is_terminal() {
                        pending.remove(&event.task_id);
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    debug!(missed, "progress output fell behind");
                    let finished = service.snapshot().completed;
                    pending.retain(|id| !finished.iter().any(|t| t.id == *id));
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                println!("Interrupted: cancelling remaining tasks");
                for id in &pending {
                    if let Err(e) = service.cancel(*id) {
                        debug!(task = %id, error = %e, "already finished");
                    }
                }
            }
        }
    }

    service.wait_idle().await;
    let snapshot = service.snapshot();
    service.shutdown().await;

    if args.remember {
        let base = services.config().clone();
        let default_printer = if args.dry_run {
            args.printer.or(base.default_printer.clone())
        } else {
            printer
        };
        let config = AppConfig {
            default_printer,
            default_settings: settings,
            ..base
        };
        services.save_config(config)?;
        println!(
            "Saved printer and settings as defaults in {}.",
            services.data_dir().display()
        );
    }

    let finished: Vec<&PrintTask> = snapshot
        .completed
        .iter()
        .filter(|t| ids.contains(&t.id))
        .collect();
    let count = |status: TaskStatus| finished.iter().filter(|t| t.status() == status).count();
    let failed = count(TaskStatus::Failed);
    println!(
        "Done: {} completed, {} failed, {} cancelled",
        count(TaskStatus::Completed),
        failed,
        count(TaskStatus::Cancelled),
    );

    Ok(if failed == 0 && !interrupted {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// The folder entries named on the command line, or all of them for `--all`.
fn select_files(args: &PrintArgs) -> Result<Vec<FileEntry>> {
    let mut entries = list_printable_files(&args.folder)?;

    if args.all {
        sort_entries(&mut entries, args.sort);
        return nonempty(entries);
    }

    let mut selected = Vec::with_capacity(args.files.len());
    for name in &args.files {
        match entries.iter().find(|e| e.name == *name) {
            Some(entry) => selected.push(entry.clone()),
            None => warn!(file = %name, folder = %args.folder.display(), "not a printable file in the folder; skipped"),
        }
    }
    nonempty(selected)
}

fn nonempty(entries: Vec<FileEntry>) -> Result<Vec<FileEntry>> {
    if entries.is_empty() {
        Err(StapeldruckError::NothingSelected)
    } else {
        Ok(entries)
    }
}

fn report(event: &TaskEvent) {
    match event.status {
        TaskStatus::Printing => {
            println!("  {:<6} {:>3}%  {}", event.status.label(), event.progress, event.file_name)
        }
        TaskStatus::Failed => println!(
            "  {:<6}        {}: {}",
            event.status.label(),
            event.file_name,
            event.message.as_deref().unwrap_or("unknown error")
        ),
        _ => println!("  {:<6}        {}", event.status.label(), event.file_name),
    }
}

// -- history -----------------------------------------------------------------

fn history(services: &AppServices, clear: bool) -> Result<ExitCode> {
    let mut queue = services.open_queue();

    if clear {
        let count = queue.completed().len();
        queue.clear_history()?;
        println!("Cleared {count} finished task(s).");
        return Ok(ExitCode::SUCCESS);
    }

    if queue.completed().is_empty() {
        println!("No finished print tasks.");
    }
    for task in queue.completed() {
        let when = task
            .end_time()
            .or(task.start_time())
            .map(timestamp)
            .unwrap_or_else(|| "-".repeat(19));
        let s = &task.settings;
        println!(
            "{when}  {:<6} {:<40} {} {} {} {} x{}{}",
            task.status().label(),
            task.file_name,
            s.paper_size.label(),
            s.orientation.label(),
            s.color_mode.label(),
            s.duplex.label(),
            s.copies,
            if s.page_range.is_empty() {
                String::new()
            } else {
                format!(" pages {}", s.page_range)
            },
        );
        if let Some(message) = task.error_message() {
            println!("{:21}{message}", "");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use stapeldruck_bridge::MemorySpooler;
    use stapeldruck_core::types::PRINTER_STATUS_PAUSED;

    use super::*;

    fn args(folder: &Path, files: &[&str], all: bool) -> PrintArgs {
        PrintArgs {
            folder: folder.to_path_buf(),
            files: files.iter().map(|f| f.to_string()).collect(),
            all,
            sort: SortOrder::SizeDesc,
            printer: None,
            paper: None,
            orientation: None,
            color: None,
            duplex: None,
            copies: None,
            pages: None,
            dry_run: true,
            remember: false,
        }
    }

    fn folder() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("small.txt"), b"1").unwrap();
        fs::write(dir.path().join("big.pdf"), b"123456").unwrap();
        fs::write(dir.path().join("skip.md"), b"123").unwrap();
        dir
    }

    fn names(entries: &[FileEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn all_selects_every_printable_file_in_sort_order() {
        let dir = folder();
        let picked = select_files(&args(dir.path(), &[], true)).unwrap();
        assert_eq!(names(&picked), ["big.pdf", "small.txt"]);
    }

    #[test]
    fn named_files_keep_command_line_order() {
        let dir = folder();
        let picked =
            select_files(&args(dir.path(), &["small.txt", "skip.md", "big.pdf"], false)).unwrap();
        assert_eq!(names(&picked), ["small.txt", "big.pdf"]);
    }

    #[test]
    fn selecting_nothing_is_an_operator_error() {
        let dir = folder();
        let err = select_files(&args(dir.path(), &[], false)).unwrap_err();
        assert!(matches!(err, StapeldruckError::NothingSelected));
        assert!(err.is_operator_error());
    }

    #[test]
    fn empty_folder_argument_is_no_folder() {
        let err = select_files(&args(&PathBuf::new(), &[], true)).unwrap_err();
        assert!(matches!(err, StapeldruckError::NoFolderSelected));
    }

    #[test]
    fn sizes_are_humanised() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dry_run_prints_and_records_history() {
        let data = tempfile::tempdir().unwrap();
        let dir = folder();
        let mut print_args = args(dir.path(), &["big.pdf"], false);
        print_args.copies = Some(2);
        print_args.remember = true;

        let code = print(Some(data.path()), print_args).await.unwrap();
        assert_eq!(code, ExitCode::SUCCESS);

        let services = AppServices::dry_run(Some(data.path()), DRY_RUN_PRINTER).unwrap();
        let queue = services.open_queue();
        assert_eq!(queue.completed().len(), 1);
        assert_eq!(queue.completed()[0].status(), TaskStatus::Completed);
        assert_eq!(queue.completed()[0].settings.copies, 2);
        assert_eq!(services.config().default_printer, None);
        assert_eq!(services.config().default_settings.copies, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dry_run_ignores_configured_default_printer() {
        let data = tempfile::tempdir().unwrap();
        fs::write(
            data.path().join("config.json"),
            r#"{"default_printer":"Office HP"}"#,
        )
        .unwrap();
        let dir = folder();
        let mut print_args = args(dir.path(), &["small.txt"], false);
        print_args.remember = true;

        let code = print(Some(data.path()), print_args).await.unwrap();
        assert_eq!(code, ExitCode::SUCCESS);

        let services = AppServices::dry_run(Some(data.path()), DRY_RUN_PRINTER).unwrap();
        let queue = services.open_queue();
        assert_eq!(queue.completed().len(), 1);
        assert_eq!(queue.completed()[0].status(), TaskStatus::Completed);
        assert_eq!(queue.completed()[0].error_message(), None);
        assert_eq!(
            services.config().default_printer.as_deref(),
            Some("Office HP")
        );
    }

    #[test]
    fn watch_reports_state_changes_and_removals() {
        let spooler = MemorySpooler::with_printers(&["Office", "Lab"]);
        let before = states(&spooler.list_printers().unwrap());
        assert!(state_changes(&before, &before).is_empty());

        spooler.set_status("Office", PRINTER_STATUS_PAUSED);
        let paused = states(&spooler.list_printers().unwrap());
        assert_eq!(
            state_changes(&before, &paused),
            vec![("Office", Some(PrinterState::Paused))]
        );

        let mut gone = paused.clone();
        gone.remove("Lab");
        assert_eq!(state_changes(&paused, &gone), vec![("Lab", None)]);
    }
}
