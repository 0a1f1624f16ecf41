// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic printer subsystem.

use stapeldruck_core::error::Result;
use stapeldruck_core::types::{PrintSettings, PrinterDescriptor, SpoolJobId};

/// Everything the print worker needs from the operating system.
///
/// Implementations are called from blocking worker threads and must be safe
/// to share between them.  Calls may block for as long as the printer driver
/// takes; no timeout is imposed here.
pub trait PrinterSubsystem: Send + Sync {
    /// Human-readable backend name (e.g. "Windows spooler").
    fn platform_name(&self) -> &str;

    /// Enumerate local and connected printers with their raw status bits.
    fn list_printers(&self) -> Result<Vec<PrinterDescriptor>>;

    /// The printer the OS considers default, if any.
    fn default_printer(&self) -> Result<Option<String>>;

    /// Write paper size, orientation, duplex and colour into the printer's
    /// device mode before a task is printed.
    fn apply_settings(&self, printer: &str, settings: &PrintSettings) -> Result<()>;

    /// Submit `data` as exactly one RAW job (one copy).
    ///
    /// A failure at any spooler step is reported as
    /// `StapeldruckError::Spooler` naming that step.
    fn submit_job(&self, printer: &str, data: &[u8], job_name: &str) -> Result<SpoolJobId>;
}
