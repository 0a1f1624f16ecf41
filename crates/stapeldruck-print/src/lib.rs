// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stapeldruck Print: task state machine, FIFO queue with JSON history, and
// the worker that feeds the OS spooler one task at a time.  Front-ends use
// `PrintService`; everything below it is usable on its own for tests and
// tooling.

pub mod events;
pub mod folder;
pub mod history;
pub mod queue;
pub mod service;
pub mod task;
mod worker;

pub use events::TaskEvent;
pub use folder::{FileEntry, SortOrder};
pub use queue::PrintQueue;
pub use service::{PrintService, QueueSnapshot};
pub use task::PrintTask;
