// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub subsystem for platforms without a supported spooler.
//
// Every operation returns `PlatformUnavailable`; use `MemorySpooler` for dry
// runs instead.

use stapeldruck_core::error::{Result, StapeldruckError};
use stapeldruck_core::types::{PrintSettings, PrinterDescriptor, SpoolJobId};

use crate::traits::PrinterSubsystem;

/// No-op subsystem returned on non-Windows platforms.
pub struct UnavailableSpooler;

impl PrinterSubsystem for UnavailableSpooler {
    fn platform_name(&self) -> &str {
        "unavailable (stub)"
    }

    fn list_printers(&self) -> Result<Vec<PrinterDescriptor>> {
        tracing::warn!("list_printers called on stub subsystem");
        Err(StapeldruckError::PlatformUnavailable)
    }

    fn default_printer(&self) -> Result<Option<String>> {
        Err(StapeldruckError::PlatformUnavailable)
    }

    fn apply_settings(&self, _printer: &str, _settings: &PrintSettings) -> Result<()> {
        Err(StapeldruckError::PlatformUnavailable)
    }

    fn submit_job(&self, _printer: &str, _data: &[u8], _job_name: &str) -> Result<SpoolJobId> {
        tracing::warn!("submit_job called on stub subsystem");
        Err(StapeldruckError::PlatformUnavailable)
    }
}
