// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The print worker: one tokio task that drains the queue a task at a time.
//
// Every queue mutation bumps a `watch` revision counter.  The worker sleeps
// on that counter when the queue is empty and when the current task is
// paused, so a submit or resume wakes it at once.  Spooler calls block and
// run on the blocking pool.  Cancellation is checked between copies; a copy
// already handed to the spooler finishes.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, instrument};

use stapeldruck_bridge::PrinterSubsystem;
use stapeldruck_core::error::{Result, StapeldruckError};
use stapeldruck_core::types::{TaskId, TaskStatus};

use crate::events::TaskEvent;
use crate::queue::PrintQueue;
use crate::task::PrintTask;

/// State shared between `PrintService` handles and the worker.
pub(crate) struct Shared {
    queue: Mutex<PrintQueue>,
    printer: Mutex<Option<String>>,
    revision: watch::Sender<u64>,
    events: broadcast::Sender<TaskEvent>,
}

impl Shared {
    pub(crate) fn new(queue: PrintQueue, printer: Option<String>, event_capacity: usize) -> Self {
        let (revision, _) = watch::channel(0);
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            queue: Mutex::new(queue),
            printer: Mutex::new(printer),
            revision,
            events,
        }
    }

    pub(crate) fn queue(&self) -> MutexGuard<'_, PrintQueue> {
        self.queue.lock().expect("print queue lock poisoned")
    }

    pub(crate) fn printer(&self) -> Option<String> {
        self.printer.lock().expect("printer lock poisoned").clone()
    }

    pub(crate) fn set_printer(&self, name: Option<String>) {
        *self.printer.lock().expect("printer lock poisoned") = name;
    }

    /// Wake everything waiting on the queue.
    pub(crate) fn bump(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    pub(crate) fn watch(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }

    /// Broadcast an event.  Having no subscribers is fine.
    pub(crate) fn emit(&self, event: TaskEvent) {
        let _ = self.events.send(event);
    }
}

/// How a task run ended when it did not error.
enum Outcome {
    /// Every copy was spooled.
    Printed,
    /// The task stopped being current (cancelled) before all copies went out.
    Withdrawn,
}

pub(crate) struct Worker {
    shared: Arc<Shared>,
    subsystem: Arc<dyn PrinterSubsystem>,
    requeue_delay: Duration,
    revision: watch::Receiver<u64>,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    pub(crate) fn new(
        shared: Arc<Shared>,
        subsystem: Arc<dyn PrinterSubsystem>,
        requeue_delay: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let revision = shared.watch();
        Self {
            shared,
            subsystem,
            requeue_delay,
            revision,
            shutdown,
        }
    }

    fn stopping(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub(crate) async fn run(mut self) {
        info!(backend = self.subsystem.platform_name(), "print worker started");

        while !self.stopping() {
            // Mark the current revision seen before looking, so a submit that
            // lands after the look still wakes us.
            self.revision.borrow_and_update();

            let next = self.shared.queue().start_next_task().cloned();
            let Some(task) = next else {
                if !self.wait_for_change().await {
                    break;
                }
                continue;
            };

            self.shared.emit(TaskEvent::from(&task));
            self.shared.bump();

            let result = self.process(&task).await;
            self.finish(&task, result);

            let delay = self.requeue_delay;
            if !self.idle_for(delay).await {
                break;
            }
        }

        info!("print worker stopped");
    }

    /// Sleep until the queue changes.  `false` means shut down.
    async fn wait_for_change(&mut self) -> bool {
        tokio::select! {
            changed = self.revision.changed() => changed.is_ok(),
            _ = self.shutdown.changed() => false,
        }
    }

    /// Pause between tasks.  `false` means shut down.
    async fn idle_for(&mut self, delay: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = self.shutdown.changed() => false,
        }
    }

    #[instrument(skip_all, fields(task = %task.id, file = %task.file_name))]
    async fn process(&mut self, task: &PrintTask) -> Result<Outcome> {
        let printer = self.shared.printer().ok_or(StapeldruckError::NoPrinterSelected)?;
        let data: Arc<[u8]> = tokio::fs::read(&task.file_path).await?.into();
        debug!(printer = %printer, bytes = data.len(), "document read");

        let settings = task.settings.clone();
        {
            let printer = printer.clone();
            self.blocking(move |s| s.apply_settings(&printer, &settings)).await?;
        }

        let copies = task.settings.copies.max(1);
        for copy in 0..copies {
            if !self.checkpoint(task.id).await? {
                info!(copies_done = copy, "task withdrawn between copies");
                return Ok(Outcome::Withdrawn);
            }

            let job = {
                let printer = printer.clone();
                let data = Arc::clone(&data);
                let name = task.file_name.clone();
                self.blocking(move |s| s.submit_job(&printer, &data, &name)).await?
            };
            debug!(copy = copy + 1, copies, job = %job, "copy spooled");

            let event = {
                let mut queue = self.shared.queue();
                queue
                    .update_progress(task.id, copy + 1, copies)
                    .and_then(|_| queue.current().map(TaskEvent::from))
            };
            if let Some(event) = event {
                self.shared.emit(event);
            }
        }

        Ok(Outcome::Printed)
    }

    /// Gate before each copy.  Waits out a pause; `Ok(false)` when the task
    /// is no longer the one printing.
    async fn checkpoint(&mut self, id: TaskId) -> Result<bool> {
        loop {
            self.revision.borrow_and_update();
            let status = self
                .shared
                .queue()
                .current()
                .filter(|t| t.id == id)
                .map(PrintTask::status);

            match status {
                Some(TaskStatus::Printing) => return Ok(true),
                Some(TaskStatus::Paused) => debug!("waiting for resume"),
                _ => return Ok(false),
            }

            tokio::select! {
                changed = self.revision.changed() => {
                    if changed.is_err() {
                        return Err(StapeldruckError::WorkerStopped);
                    }
                }
                _ = self.shutdown.changed() => return Err(StapeldruckError::WorkerStopped),
            }
        }
    }

    /// Run a spooler call on the blocking pool.
    async fn blocking<T, F>(&self, call: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn PrinterSubsystem) -> Result<T> + Send + 'static,
    {
        let subsystem = Arc::clone(&self.subsystem);
        tokio::task::spawn_blocking(move || call(subsystem.as_ref()))
            .await
            .map_err(|e| StapeldruckError::Spooler(format!("spooler call aborted: {e}")))?
    }

    /// Record the outcome on the queue if the task is still current.
    fn finish(&self, task: &PrintTask, result: Result<Outcome>) {
        let event = {
            let mut queue = self.shared.queue();
            if queue.current().is_none_or(|t| t.id != task.id) {
                None
            } else {
                let finished = match result {
                    Ok(Outcome::Printed) => queue.complete_current_task(),
                    Ok(Outcome::Withdrawn) => None,
                    Err(e) => queue.fail_current_task(e.to_string()),
                };
                finished.and_then(|_| queue.completed().last().map(TaskEvent::from))
            }
        };

        if let Some(event) = event {
            self.shared.emit(event);
        }
        self.shared.bump();
    }
}
