// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory spooler.
//
// Records every job and every settings application instead of talking to a
// printer.  Backs `--dry-run` and the queue/worker tests.  Failures can be
// injected, and submissions can be held at the spooler door so a test can
// act (pause, cancel) while a copy is "in flight".

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info};

use stapeldruck_core::error::{Result, StapeldruckError};
use stapeldruck_core::types::{PrintSettings, PrinterDescriptor, SpoolJobId};

use crate::traits::PrinterSubsystem;

/// One job accepted by the in-memory spooler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpooledJob {
    pub id: SpoolJobId,
    pub printer: String,
    pub job_name: String,
    pub data: Vec<u8>,
}

#[derive(Default)]
struct MemoryState {
    printers: Vec<PrinterDescriptor>,
    default_printer: Option<String>,
    jobs: Vec<SpooledJob>,
    applied: Vec<(String, PrintSettings)>,
    /// 1-based submission number that fails.
    fail_on_submission: Option<usize>,
    fail_apply: bool,
    /// While set, `submit_job` blocks after being counted.
    held: bool,
    /// Number of `submit_job` calls that have started.
    submissions: usize,
    next_job_id: u32,
}

/// Recording `PrinterSubsystem` used for tests and dry runs.
pub struct MemorySpooler {
    state: Mutex<MemoryState>,
    changed: Condvar,
}

impl MemorySpooler {
    /// A spooler that knows the given printers; the first becomes default.
    pub fn new(printers: Vec<PrinterDescriptor>) -> Self {
        let default_printer = printers.first().map(|p| p.name.clone());
        Self {
            state: Mutex::new(MemoryState {
                printers,
                default_printer,
                next_job_id: 1,
                ..Default::default()
            }),
            changed: Condvar::new(),
        }
    }

    /// Convenience constructor for ready printers with the given names.
    pub fn with_printers(names: &[&str]) -> Self {
        Self::new(names.iter().map(|n| PrinterDescriptor::new(*n, 0)).collect())
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory spooler lock poisoned")
    }

    /// Make the `n`-th call to `submit_job` (1-based) fail.
    pub fn fail_submission(&self, n: usize) {
        self.lock().fail_on_submission = Some(n);
    }

    /// Make every `apply_settings` call fail.
    pub fn fail_apply(&self, fail: bool) {
        self.lock().fail_apply = fail;
    }

    /// Replace the reported status bits of a printer.
    pub fn set_status(&self, printer: &str, status: u32) {
        let mut state = self.lock();
        if let Some(p) = state.printers.iter_mut().find(|p| p.name == printer) {
            p.status = status;
        }
    }

    /// Block subsequent submissions until [`release`](Self::release).
    pub fn hold(&self) {
        self.lock().held = true;
    }

    /// Let held submissions through.
    pub fn release(&self) {
        self.lock().held = false;
        self.changed.notify_all();
    }

    /// Wait until at least `n` submissions have started.  Returns `false` on
    /// timeout.
    pub fn wait_for_submissions(&self, n: usize, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .changed
            .wait_timeout_while(guard, timeout, |s| s.submissions < n)
            .expect("memory spooler lock poisoned");
        guard.submissions >= n
    }

    /// Jobs accepted so far, in submission order.
    pub fn jobs(&self) -> Vec<SpooledJob> {
        self.lock().jobs.clone()
    }

    /// Every `(printer, settings)` pair passed to `apply_settings`.
    pub fn applied_settings(&self) -> Vec<(String, PrintSettings)> {
        self.lock().applied.clone()
    }

    pub fn submission_count(&self) -> usize {
        self.lock().submissions
    }

    fn ensure_known(state: &MemoryState, printer: &str) -> Result<()> {
        if state.printers.iter().any(|p| p.name == printer) {
            Ok(())
        } else {
            Err(StapeldruckError::PrinterNotFound(printer.to_string()))
        }
    }
}

impl PrinterSubsystem for MemorySpooler {
    fn platform_name(&self) -> &str {
        "in-memory spooler"
    }

    fn list_printers(&self) -> Result<Vec<PrinterDescriptor>> {
        Ok(self.lock().printers.clone())
    }

    fn default_printer(&self) -> Result<Option<String>> {
        Ok(self.lock().default_printer.clone())
    }

    fn apply_settings(&self, printer: &str, settings: &PrintSettings) -> Result<()> {
        let mut state = self.lock();
        Self::ensure_known(&state, printer)?;
        if state.fail_apply {
            return Err(StapeldruckError::Spooler(format!(
                "SetPrinter on {printer}: injected failure"
            )));
        }
        state.applied.push((printer.to_string(), settings.clone()));
        debug!(printer, paper = settings.paper_size.label(), "settings recorded");
        Ok(())
    }

    fn submit_job(&self, printer: &str, data: &[u8], job_name: &str) -> Result<SpoolJobId> {
        let mut state = self.lock();
        Self::ensure_known(&state, printer)?;

        state.submissions += 1;
        let attempt = state.submissions;
        self.changed.notify_all();

        while state.held {
            state = self
                .changed
                .wait(state)
                .expect("memory spooler lock poisoned");
        }

        if state.fail_on_submission == Some(attempt) {
            return Err(StapeldruckError::Spooler(format!(
                "WritePrinter on {printer}: injected failure on submission {attempt}"
            )));
        }

        let id = SpoolJobId(state.next_job_id);
        state.next_job_id += 1;
        state.jobs.push(SpooledJob {
            id,
            printer: printer.to_string(),
            job_name: job_name.to_string(),
            data: data.to_vec(),
        });
        info!(printer, job_name, bytes = data.len(), job_id = %id, "raw job spooled (memory)");
        Ok(id)
    }
}
