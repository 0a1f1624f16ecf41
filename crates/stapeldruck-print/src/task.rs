// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print task state machine.
//
//   Waiting -> Printing -> { Completed, Failed, Cancelled }
//                 ^  |
//                 |  v
//                Paused
//
// Terminal states absorb every further call.  Only `PrintQueue` drives
// `start`; the worker reports progress.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use stapeldruck_core::types::{PrintSettings, TaskId, TaskStatus};

/// One file submitted for printing together with its settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintTask {
    pub id: TaskId,
    pub file_path: PathBuf,
    /// Display name, normally the file name component of `file_path`.
    pub file_name: String,
    pub settings: PrintSettings,
    status: TaskStatus,
    /// 0–100.
    progress: u8,
    current_page: u32,
    total_pages: u32,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

impl PrintTask {
    pub fn new(file_path: impl Into<PathBuf>, settings: PrintSettings) -> Self {
        let file_path = file_path.into();
        let file_name = display_name(&file_path);
        Self {
            id: TaskId::new(),
            file_path,
            file_name,
            settings,
            status: TaskStatus::Waiting,
            progress: 0,
            current_page: 0,
            total_pages: 1,
            start_time: None,
            end_time: None,
            error_message: None,
        }
    }

    /// Rebuild a finished task from a history record.
    pub(crate) fn restored(
        file_path: PathBuf,
        file_name: String,
        settings: PrintSettings,
        status: TaskStatus,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
        error_message: Option<String>,
    ) -> Self {
        Self {
            id: TaskId::new(),
            file_path,
            file_name,
            settings,
            status,
            progress: if status == TaskStatus::Completed { 100 } else { 0 },
            current_page: 0,
            total_pages: 1,
            start_time,
            end_time,
            error_message,
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn pages(&self) -> (u32, u32) {
        (self.current_page, self.total_pages)
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Waiting -> Printing.  Records the start time.
    pub(crate) fn start(&mut self) {
        if self.status != TaskStatus::Waiting {
            debug!(task = %self.id, status = ?self.status, "start ignored");
            return;
        }
        self.status = TaskStatus::Printing;
        self.start_time = Some(Utc::now());
    }

    /// Printing -> Paused; anything else is left alone.
    pub fn pause(&mut self) {
        if self.status == TaskStatus::Printing {
            self.status = TaskStatus::Paused;
        }
    }

    /// Paused -> Printing; anything else is left alone.
    pub fn resume(&mut self) {
        if self.status == TaskStatus::Paused {
            self.status = TaskStatus::Printing;
        }
    }

    pub(crate) fn complete(&mut self) {
        if self.guard_terminal("complete") {
            return;
        }
        self.status = TaskStatus::Completed;
        self.progress = 100;
        self.end_time = Some(Utc::now());
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        if self.guard_terminal("fail") {
            return;
        }
        self.status = TaskStatus::Failed;
        self.error_message = Some(message.into());
        self.end_time = Some(Utc::now());
    }

    pub(crate) fn cancel(&mut self) {
        if self.guard_terminal("cancel") {
            return;
        }
        self.status = TaskStatus::Cancelled;
        self.end_time = Some(Utc::now());
    }

    /// Recompute the percentage.  Only applied while Printing.
    pub fn update_progress(&mut self, current_page: u32, total_pages: u32) {
        if self.status != TaskStatus::Printing {
            debug!(task = %self.id, status = ?self.status, "progress update ignored");
            return;
        }
        let total = total_pages.max(1);
        let current = current_page.min(total);
        self.current_page = current;
        self.total_pages = total;
        self.progress = (u64::from(current) * 100 / u64::from(total)) as u8;
    }

    fn guard_terminal(&self, transition: &str) -> bool {
        if self.status.is_terminal() {
            debug!(task = %self.id, status = ?self.status, transition, "task already finished");
            true
        } else {
            false
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> PrintTask {
        PrintTask::new("/docs/report.pdf", PrintSettings::default())
    }

    #[test]
    fn new_task_is_waiting() {
        let t = task();
        assert_eq!(t.status(), TaskStatus::Waiting);
        assert_eq!(t.file_name, "report.pdf");
        assert_eq!(t.progress(), 0);
        assert!(t.start_time().is_none());
    }

    #[test]
    fn start_records_time() {
        let mut t = task();
        t.start();
        assert_eq!(t.status(), TaskStatus::Printing);
        assert!(t.start_time().is_some());
    }

    #[test]
    fn pause_and_resume_only_from_matching_state() {
        let mut t = task();
        t.pause();
        assert_eq!(t.status(), TaskStatus::Waiting);

        t.start();
        t.resume();
        assert_eq!(t.status(), TaskStatus::Printing);
        t.pause();
        assert_eq!(t.status(), TaskStatus::Paused);
        t.pause();
        assert_eq!(t.status(), TaskStatus::Paused);
        t.resume();
        assert_eq!(t.status(), TaskStatus::Printing);
    }

    #[test]
    fn complete_sets_full_progress() {
        let mut t = task();
        t.start();
        t.complete();
        assert_eq!(t.status(), TaskStatus::Completed);
        assert_eq!(t.progress(), 100);
        assert!(t.end_time().is_some());
    }

    #[test]
    fn fail_keeps_message() {
        let mut t = task();
        t.start();
        t.fail("paper jam");
        assert_eq!(t.status(), TaskStatus::Failed);
        assert_eq!(t.error_message(), Some("paper jam"));
    }

    #[test]
    fn paused_task_can_be_cancelled() {
        let mut t = task();
        t.start();
        t.pause();
        t.cancel();
        assert_eq!(t.status(), TaskStatus::Cancelled);
    }

    #[test]
    fn terminal_state_absorbs_everything() {
        let mut t = task();
        t.start();
        t.cancel();
        let end = t.end_time();

        t.complete();
        t.fail("late");
        t.resume();
        t.pause();
        t.start();
        t.update_progress(1, 1);

        assert_eq!(t.status(), TaskStatus::Cancelled);
        assert_eq!(t.end_time(), end);
        assert!(t.error_message().is_none());
        assert_eq!(t.progress(), 0);
    }

    #[test]
    fn progress_only_while_printing() {
        let mut t = task();
        t.update_progress(1, 2);
        assert_eq!(t.progress(), 0);

        t.start();
        t.update_progress(1, 3);
        assert_eq!(t.progress(), 33);
        assert_eq!(t.pages(), (1, 3));

        t.pause();
        t.update_progress(3, 3);
        assert_eq!(t.progress(), 33);
    }

    #[test]
    fn progress_handles_degenerate_totals() {
        let mut t = task();
        t.start();
        t.update_progress(5, 0);
        assert_eq!(t.progress(), 100);
        t.update_progress(9, 4);
        assert_eq!(t.progress(), 100);
        assert_eq!(t.pages(), (4, 4));
    }
}
