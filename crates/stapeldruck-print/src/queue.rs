// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory print queue with a durable history of finished tasks.
//
// Every task lives in exactly one of three places:
//
//   waiting (FIFO)  ->  current (at most one)  ->  completed (append-only)
//
// A waiting task may also jump straight to completed when it is cancelled.
// The completed list is written to the history file after every move into
// it.  The queue itself is not synchronised; `PrintService` wraps it in a
// mutex shared with the worker.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use stapeldruck_core::error::{Result, StapeldruckError};
use stapeldruck_core::types::{TaskId, TaskStatus};

use crate::history;
use crate::task::PrintTask;

/// FIFO print queue serialising work to one active task.
pub struct PrintQueue {
    waiting: VecDeque<PrintTask>,
    current: Option<PrintTask>,
    completed: Vec<PrintTask>,
    history_path: PathBuf,
}

impl PrintQueue {
    /// An empty queue that will persist to `history_path`.  Nothing is read.
    pub fn new(history_path: impl Into<PathBuf>) -> Self {
        Self {
            waiting: VecDeque::new(),
            current: None,
            completed: Vec::new(),
            history_path: history_path.into(),
        }
    }

    /// A queue seeded with the existing history at `history_path`.
    ///
    /// An unreadable or malformed history is logged and treated as empty;
    /// it never prevents startup.
    #[instrument(skip_all, fields(path = %history_path.as_ref().display()))]
    pub fn open(history_path: impl AsRef<Path>) -> Self {
        let mut queue = Self::new(history_path.as_ref());
        match queue.load_history() {
            Ok(count) => info!(count, "print queue opened"),
            Err(e) => warn!(error = %e, "could not load print history; starting empty"),
        }
        queue
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    /// Replace the completed list with the contents of the history file.
    pub fn load_history(&mut self) -> Result<usize> {
        self.completed.clear();
        let tasks = history::load_history(&self.history_path)?;
        self.completed = tasks;
        Ok(self.completed.len())
    }

    /// Overwrite the history file with the completed list.
    pub fn save_history(&self) -> Result<()> {
        history::save_history(&self.history_path, &self.completed)
    }

    /// Persist after a transition.  A write failure is logged and the
    /// transition stands.
    fn persist(&self) {
        if let Err(e) = self.save_history() {
            warn!(error = %e, path = %self.history_path.display(), "failed to save print history");
        }
    }

    /// Append a task to the back of the waiting list.
    pub fn add_task(&mut self, task: PrintTask) -> TaskId {
        let id = task.id;
        debug!(task = %id, file = %task.file_name, "task queued");
        self.waiting.push_back(task);
        id
    }

    /// Promote the oldest waiting task to current and mark it Printing.
    ///
    /// Returns `None` while another task is current or nothing is waiting.
    pub fn start_next_task(&mut self) -> Option<&PrintTask> {
        if self.current.is_some() {
            return None;
        }
        let mut task = self.waiting.pop_front()?;
        task.start();
        info!(task = %task.id, file = %task.file_name, "task started");
        self.current = Some(task);
        self.current.as_ref()
    }

    /// Finish the current task successfully.  No-op without a current task.
    pub fn complete_current_task(&mut self) -> Option<TaskId> {
        let mut task = self.current.take()?;
        task.complete();
        info!(task = %task.id, file = %task.file_name, "task completed");
        Some(self.finish(task))
    }

    /// Finish the current task as failed.  No-op without a current task.
    pub fn fail_current_task(&mut self, message: impl Into<String>) -> Option<TaskId> {
        let mut task = self.current.take()?;
        task.fail(message);
        warn!(
            task = %task.id,
            file = %task.file_name,
            error = task.error_message().unwrap_or_default(),
            "task failed"
        );
        Some(self.finish(task))
    }

    /// Cancel the current task or a waiting one.
    ///
    /// A task that is neither (already finished, or never queued) is
    /// `TaskNotFound`.
    pub fn cancel_task(&mut self, id: TaskId) -> Result<()> {
        let mut task = if self.current.as_ref().is_some_and(|t| t.id == id) {
            self.current.take().ok_or_else(|| not_found(id))?
        } else {
            let index = self
                .waiting
                .iter()
                .position(|t| t.id == id)
                .ok_or_else(|| not_found(id))?;
            self.waiting.remove(index).ok_or_else(|| not_found(id))?
        };

        task.cancel();
        info!(task = %task.id, file = %task.file_name, "task cancelled");
        self.finish(task);
        Ok(())
    }

    /// Pause the current task.  Returns whether anything changed.
    pub fn pause_current_task(&mut self) -> bool {
        match self.current.as_mut() {
            Some(task) if task.status() == TaskStatus::Printing => {
                task.pause();
                info!(task = %task.id, "task paused");
                true
            }
            _ => false,
        }
    }

    /// Resume the current task.  Returns whether anything changed.
    pub fn resume_current_task(&mut self) -> bool {
        match self.current.as_mut() {
            Some(task) if task.status() == TaskStatus::Paused => {
                task.resume();
                info!(task = %task.id, "task resumed");
                true
            }
            _ => false,
        }
    }

    /// Report progress on the current task if it is still `id`.
    pub fn update_progress(&mut self, id: TaskId, current_page: u32, total_pages: u32) -> Option<u8> {
        let task = self.current.as_mut().filter(|t| t.id == id)?;
        task.update_progress(current_page, total_pages);
        Some(task.progress())
    }

    pub fn current(&self) -> Option<&PrintTask> {
        self.current.as_ref()
    }

    pub fn waiting(&self) -> impl ExactSizeIterator<Item = &PrintTask> {
        self.waiting.iter()
    }

    pub fn completed(&self) -> &[PrintTask] {
        &self.completed
    }

    /// Status of a task wherever it currently lives.
    pub fn status_of(&self, id: TaskId) -> Option<TaskStatus> {
        self.current
            .iter()
            .chain(self.waiting.iter())
            .chain(self.completed.iter())
            .find(|t| t.id == id)
            .map(PrintTask::status)
    }

    /// The active (current or waiting) task for `path`, current first.
    pub fn find_by_path(&self, path: &Path) -> Option<TaskId> {
        self.current
            .iter()
            .chain(self.waiting.iter())
            .find(|t| t.file_path == path)
            .map(|t| t.id)
    }

    /// Nothing current and nothing waiting.
    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.waiting.is_empty()
    }

    /// Forget all finished tasks and rewrite the (now empty) history.
    pub fn clear_history(&mut self) -> Result<()> {
        self.completed.clear();
        self.save_history()
    }

    fn finish(&mut self, task: PrintTask) -> TaskId {
        let id = task.id;
        self.completed.push(task);
        self.persist();
        id
    }
}

fn not_found(id: TaskId) -> StapeldruckError {
    StapeldruckError::TaskNotFound(id.to_string())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use stapeldruck_core::types::{DuplexMode, PaperSize, PrintSettings};
    use tempfile::TempDir;

    fn queue() -> (TempDir, PrintQueue) {
        let dir = tempfile::tempdir().expect("tempdir");
        let queue = PrintQueue::new(dir.path().join("print_history.json"));
        (dir, queue)
    }

    fn task(name: &str) -> PrintTask {
        PrintTask::new(format!("/docs/{name}"), PrintSettings::default())
    }

    #[test]
    fn fifo_one_at_a_time() {
        let (_dir, mut q) = queue();
        let a = q.add_task(task("a.pdf"));
        let b = q.add_task(task("b.pdf"));
        let _c = q.add_task(task("c.pdf"));

        assert_eq!(q.start_next_task().map(|t| t.id), Some(a));
        assert!(q.start_next_task().is_none());

        q.complete_current_task();
        assert_eq!(q.start_next_task().map(|t| t.id), Some(b));
    }

    #[test]
    fn unwritable_history_does_not_undo_the_transition() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A directory where the file should be makes every save fail.
        let mut q = PrintQueue::new(dir.path().to_path_buf());
        let id = q.add_task(task("a.pdf"));
        q.start_next_task();

        assert_eq!(q.complete_current_task(), Some(id));
        assert!(q.current().is_none());
        assert_eq!(q.completed().len(), 1);
        assert_eq!(q.completed()[0].status(), TaskStatus::Completed);
        assert!(q.save_history().is_err());
    }

    #[test]
    fn started_task_is_printing_and_current() {
        let (_dir, mut q) = queue();
        let a = q.add_task(task("a.pdf"));
        q.start_next_task();

        let current = q.current().expect("current");
        assert_eq!(current.id, a);
        assert_eq!(current.status(), TaskStatus::Printing);
        assert_eq!(q.waiting().len(), 0);
    }

    #[test]
    fn empty_queue_has_nothing_to_start() {
        let (_dir, mut q) = queue();
        assert!(q.start_next_task().is_none());
        assert!(q.is_idle());
    }

    #[test]
    fn complete_and_fail_move_to_completed_once() {
        let (_dir, mut q) = queue();
        let a = q.add_task(task("a.pdf"));
        let b = q.add_task(task("b.pdf"));

        q.start_next_task();
        assert_eq!(q.complete_current_task(), Some(a));
        assert!(q.current().is_none());

        q.start_next_task();
        assert_eq!(q.fail_current_task("out of paper"), Some(b));
        assert!(q.current().is_none());

        let done = q.completed();
        assert_eq!(done.len(), 2);
        assert_eq!(done.iter().filter(|t| t.id == a).count(), 1);
        assert_eq!(done[0].status(), TaskStatus::Completed);
        assert_eq!(done[1].status(), TaskStatus::Failed);
        assert_eq!(done[1].error_message(), Some("out of paper"));
    }

    #[test]
    fn finishing_without_current_is_a_no_op() {
        let (dir, mut q) = queue();
        assert!(q.complete_current_task().is_none());
        assert!(q.fail_current_task("x").is_none());
        assert!(q.completed().is_empty());
        assert!(!dir.path().join("print_history.json").exists());
    }

    #[test]
    fn cancelling_waiting_task_skips_it() {
        let (_dir, mut q) = queue();
        let a = q.add_task(task("a.pdf"));
        let b = q.add_task(task("b.pdf"));
        let c = q.add_task(task("c.pdf"));

        q.cancel_task(b).expect("cancel waiting");
        assert_eq!(q.status_of(b), Some(TaskStatus::Cancelled));

        assert_eq!(q.start_next_task().map(|t| t.id), Some(a));
        q.complete_current_task();
        assert_eq!(q.start_next_task().map(|t| t.id), Some(c));
        q.complete_current_task();
        assert!(q.start_next_task().is_none());
    }

    #[test]
    fn cancelling_current_task_frees_the_slot() {
        let (_dir, mut q) = queue();
        let a = q.add_task(task("a.pdf"));
        let b = q.add_task(task("b.pdf"));

        q.start_next_task();
        q.cancel_task(a).expect("cancel current");
        assert!(q.current().is_none());
        assert_eq!(q.completed()[0].status(), TaskStatus::Cancelled);
        assert_eq!(q.start_next_task().map(|t| t.id), Some(b));
    }

    #[test]
    fn cancelling_finished_task_is_not_found() {
        let (_dir, mut q) = queue();
        let a = q.add_task(task("a.pdf"));
        q.start_next_task();
        q.complete_current_task();

        assert!(matches!(
            q.cancel_task(a),
            Err(StapeldruckError::TaskNotFound(_))
        ));
        assert!(matches!(
            q.cancel_task(TaskId::new()),
            Err(StapeldruckError::TaskNotFound(_))
        ));
        assert_eq!(q.completed().len(), 1);
        assert_eq!(q.completed()[0].status(), TaskStatus::Completed);
    }

    #[test]
    fn pause_and_resume_forward_to_current() {
        let (_dir, mut q) = queue();
        assert!(!q.pause_current_task());

        q.add_task(task("a.pdf"));
        q.start_next_task();
        assert!(q.pause_current_task());
        assert_eq!(q.current().map(PrintTask::status), Some(TaskStatus::Paused));
        assert!(!q.pause_current_task());
        assert!(q.resume_current_task());
        assert_eq!(q.current().map(PrintTask::status), Some(TaskStatus::Printing));
        assert!(!q.resume_current_task());
    }

    #[test]
    fn paused_task_can_complete() {
        let (_dir, mut q) = queue();
        q.add_task(task("a.pdf"));
        q.start_next_task();
        q.pause_current_task();
        q.complete_current_task();
        assert_eq!(q.completed()[0].status(), TaskStatus::Completed);
    }

    #[test]
    fn progress_targets_only_the_current_task() {
        let (_dir, mut q) = queue();
        let a = q.add_task(task("a.pdf"));
        q.start_next_task();
        assert_eq!(q.update_progress(a, 1, 2), Some(50));
        assert_eq!(q.update_progress(TaskId::new(), 2, 2), None);
    }

    #[test]
    fn find_by_path_prefers_active_tasks() {
        let (_dir, mut q) = queue();
        let a = q.add_task(task("a.pdf"));
        let b = q.add_task(task("b.pdf"));
        q.start_next_task();

        assert_eq!(q.find_by_path(Path::new("/docs/a.pdf")), Some(a));
        assert_eq!(q.find_by_path(Path::new("/docs/b.pdf")), Some(b));
        q.complete_current_task();
        assert_eq!(q.find_by_path(Path::new("/docs/a.pdf")), None);
    }

    #[test]
    fn history_round_trip() {
        let (dir, mut q) = queue();
        let settings = PrintSettings {
            paper_size: PaperSize::Legal,
            duplex: DuplexMode::ShortEdge,
            page_range: "1-3,5,7-9".into(),
            copies: 3,
            ..Default::default()
        };
        q.add_task(PrintTask::new("/docs/a.pdf", settings.clone()));
        let b = q.add_task(task("b.pdf"));
        q.add_task(task("c.pdf"));

        q.start_next_task();
        q.complete_current_task();
        q.cancel_task(b).unwrap();
        q.start_next_task();
        q.fail_current_task("spooler said no");

        let originals: Vec<PrintTask> = q.completed().to_vec();
        let reopened = PrintQueue::open(dir.path().join("print_history.json"));
        let loaded = reopened.completed();

        assert_eq!(loaded.len(), 3);
        assert!(reopened.is_idle());
        for (orig, back) in originals.iter().zip(loaded) {
            assert_eq!(back.file_path, orig.file_path);
            assert_eq!(back.file_name, orig.file_name);
            assert_eq!(back.status(), orig.status());
            assert_eq!(back.settings, orig.settings);
            assert_eq!(back.error_message(), orig.error_message());
            assert_eq!(
                back.start_time().map(|t| t.timestamp()),
                orig.start_time().map(|t| t.timestamp())
            );
            assert_eq!(
                back.end_time().map(|t| t.timestamp()),
                orig.end_time().map(|t| t.timestamp())
            );
        }
        assert_eq!(loaded[0].settings, settings);
        assert_eq!(loaded[1].status(), TaskStatus::Cancelled);
        assert!(loaded[1].start_time().is_none());
        assert_eq!(loaded[2].error_message(), Some("spooler said no"));
    }

    #[test]
    fn loads_completed_entry_into_completed_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("print_history.json");
        fs::write(
            &path,
            r#"[{"file_name":"a.pdf","file_path":"D:/a.pdf","status":"已完成",
                 "start_time":1700000000.5,"end_time":1700000001.5,"error_message":null,
                 "settings":{"paper_size":"A4","orientation":"纵向","page_range":"",
                             "color_mode":"彩色","sides_option":"单面","copies":1}}]"#,
        )
        .unwrap();

        let mut q = PrintQueue::open(&path);
        assert_eq!(q.completed().len(), 1);
        assert_eq!(q.completed()[0].status(), TaskStatus::Completed);
        assert_eq!(q.completed()[0].progress(), 100);
        assert_eq!(q.waiting().len(), 0);
        assert!(q.start_next_task().is_none());
    }

    #[test]
    fn corrupt_history_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("print_history.json");
        fs::write(&path, "not json at all").unwrap();

        let q = PrintQueue::open(&path);
        assert!(q.completed().is_empty());
    }

    #[test]
    fn history_is_rewritten_wholesale() {
        let (dir, mut q) = queue();
        let path = dir.path().join("print_history.json");
        q.add_task(task("a.pdf"));
        q.start_next_task();
        q.complete_current_task();

        let first: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(first.as_array().map(Vec::len), Some(1));
        assert_eq!(first[0]["status"], "已完成");

        q.clear_history().unwrap();
        let cleared: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(cleared.as_array().map(Vec::len), Some(0));
    }
}
