// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Front-end facing print service.
//
// Owns the queue and the worker task.  Every front-end talks to the core
// through this handful of operations and learns about progress from the
// `TaskEvent` broadcast.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use stapeldruck_bridge::PrinterSubsystem;
use stapeldruck_core::config::AppConfig;
use stapeldruck_core::error::{Result, StapeldruckError};
use stapeldruck_core::types::{PrintSettings, PrinterDescriptor, TaskId};

use crate::events::TaskEvent;
use crate::queue::PrintQueue;
use crate::task::PrintTask;
use crate::worker::{Shared, Worker};

/// Event buffer per subscriber.  A slow subscriber that falls further behind
/// sees `RecvError::Lagged`.
const EVENT_CAPACITY: usize = 256;

/// Point-in-time copy of the queue.
#[derive(Debug, Clone, Default)]
pub struct QueueSnapshot {
    pub current: Option<PrintTask>,
    pub waiting: Vec<PrintTask>,
    pub completed: Vec<PrintTask>,
}

impl QueueSnapshot {
    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.waiting.is_empty()
    }
}

/// Handle to the print queue and its worker.
///
/// Must be created inside a tokio runtime.  Dropping the service stops the
/// worker once it next waits; [`shutdown`](Self::shutdown) waits for it.
pub struct PrintService {
    shared: Arc<Shared>,
    subsystem: Arc<dyn PrinterSubsystem>,
    shutdown: watch::Sender<bool>,
    worker: Option<JoinHandle<()>>,
}

impl PrintService {
    /// Start the worker over `queue`.
    ///
    /// The configured default printer, if any, starts out selected.
    pub fn spawn(queue: PrintQueue, subsystem: Arc<dyn PrinterSubsystem>, config: &AppConfig) -> Self {
        let shared = Arc::new(Shared::new(
            queue,
            config.default_printer.clone(),
            EVENT_CAPACITY,
        ));
        let (shutdown, shutdown_rx) = watch::channel(false);

        let worker = Worker::new(
            Arc::clone(&shared),
            Arc::clone(&subsystem),
            config.requeue_delay(),
            shutdown_rx,
        );
        let handle = tokio::spawn(worker.run());

        info!(backend = subsystem.platform_name(), "print service started");
        Self {
            shared,
            subsystem,
            shutdown,
            worker: Some(handle),
        }
    }

    pub fn subsystem(&self) -> &Arc<dyn PrinterSubsystem> {
        &self.subsystem
    }

    /// Enumerate printers on the blocking pool.
    pub async fn printers(&self) -> Result<Vec<PrinterDescriptor>> {
        let subsystem = Arc::clone(&self.subsystem);
        tokio::task::spawn_blocking(move || subsystem.list_printers())
            .await
            .map_err(|e| StapeldruckError::Spooler(format!("printer enumeration aborted: {e}")))?
    }

    /// Choose the printer later tasks are sent to.
    pub fn select_printer(&self, name: impl Into<String>) {
        let name = name.into();
        info!(printer = %name, "printer selected");
        self.shared.set_printer(Some(name));
    }

    pub fn selected_printer(&self) -> Option<String> {
        self.shared.printer()
    }

    /// Queue one file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn submit(&self, path: impl AsRef<Path>, settings: PrintSettings) -> Result<TaskId> {
        self.ensure_ready(&settings)?;
        let id = self.enqueue(PrintTask::new(path.as_ref(), settings));
        self.shared.bump();
        Ok(id)
    }

    /// Queue several files with the same settings, in the given order.
    pub fn submit_batch<I, P>(&self, paths: I, settings: PrintSettings) -> Result<Vec<TaskId>>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        if paths.is_empty() {
            return Err(StapeldruckError::NothingSelected);
        }
        self.ensure_ready(&settings)?;

        let ids = paths
            .into_iter()
            .map(|path| self.enqueue(PrintTask::new(path, settings.clone())))
            .collect::<Vec<_>>();
        info!(count = ids.len(), "batch queued");
        self.shared.bump();
        Ok(ids)
    }

    fn ensure_ready(&self, settings: &PrintSettings) -> Result<()> {
        if self.shared.printer().is_none() {
            return Err(StapeldruckError::NoPrinterSelected);
        }
        settings.validate()
    }

    fn enqueue(&self, task: PrintTask) -> TaskId {
        let event = TaskEvent::from(&task);
        let id = self.shared.queue().add_task(task);
        self.shared.emit(event);
        id
    }

    /// Cancel a waiting or printing task.
    pub fn cancel(&self, id: TaskId) -> Result<()> {
        let event = {
            let mut queue = self.shared.queue();
            queue.cancel_task(id)?;
            queue.completed().last().map(TaskEvent::from)
        };
        if let Some(event) = event {
            self.shared.emit(event);
        }
        self.shared.bump();
        Ok(())
    }

    /// Cancel the active task for `path`.
    pub fn cancel_by_path(&self, path: impl AsRef<Path>) -> Result<TaskId> {
        let path = path.as_ref();
        let id = self
            .shared
            .queue()
            .find_by_path(path)
            .ok_or_else(|| StapeldruckError::TaskNotFound(path.display().to_string()))?;
        self.cancel(id)?;
        Ok(id)
    }

    /// Pause the printing task.  Returns whether a task was paused.
    pub fn pause(&self) -> bool {
        self.toggle(PrintQueue::pause_current_task)
    }

    /// Resume the paused task.  Returns whether a task was resumed.
    pub fn resume(&self) -> bool {
        self.toggle(PrintQueue::resume_current_task)
    }

    fn toggle(&self, transition: fn(&mut PrintQueue) -> bool) -> bool {
        let event = {
            let mut queue = self.shared.queue();
            if !transition(&mut queue) {
                return false;
            }
            queue.current().map(TaskEvent::from)
        };
        if let Some(event) = event {
            self.shared.emit(event);
        }
        self.shared.bump();
        true
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.shared.subscribe()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let queue = self.shared.queue();
        QueueSnapshot {
            current: queue.current().cloned(),
            waiting: queue.waiting().cloned().collect(),
            completed: queue.completed().to_vec(),
        }
    }

    /// Resolve once nothing is printing or waiting.
    pub async fn wait_idle(&self) {
        let mut revision = self.shared.watch();
        loop {
            revision.borrow_and_update();
            if self.shared.queue().is_idle() {
                return;
            }
            if revision.changed().await.is_err() {
                return;
            }
        }
    }

    /// Stop the worker and wait for it to exit.
    ///
    /// A task paused at shutdown is recorded as failed; a copy already in the
    /// spooler is allowed to finish first.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.worker.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "print worker ended abnormally");
            }
        }
        info!("print service stopped");
    }
}
