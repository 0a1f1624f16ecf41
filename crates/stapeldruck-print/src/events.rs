// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Progress notifications broadcast to front-ends.

use serde::Serialize;

use stapeldruck_core::types::{TaskId, TaskStatus};

use crate::task::PrintTask;

/// A change in one task's status or progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskEvent {
    pub task_id: TaskId,
    pub file_name: String,
    pub status: TaskStatus,
    /// 0–100.
    pub progress: u8,
    /// Failure reason for `Failed`, otherwise usually `None`.
    pub message: Option<String>,
}

impl TaskEvent {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

impl From<&PrintTask> for TaskEvent {
    fn from(task: &PrintTask) -> Self {
        Self {
            task_id: task.id,
            file_name: task.file_name.clone(),
            status: task.status(),
            progress: task.progress(),
            message: task.error_message().map(str::to_owned),
        }
    }
}
