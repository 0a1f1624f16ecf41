// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stapeldruck Bridge: the printer subsystem seam.
//
// The queue and worker only ever talk to `PrinterSubsystem`.  Each platform
// provides one implementation; `MemorySpooler` stands in for the OS in tests
// and dry runs.

use std::sync::Arc;

pub mod devmode;
pub mod memory;
pub mod traits;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(not(target_os = "windows"))]
pub mod stub;

pub use memory::MemorySpooler;
pub use traits::PrinterSubsystem;

/// The spooler backend for the operating system we were built for.
pub fn platform_subsystem() -> Arc<dyn PrinterSubsystem> {
    #[cfg(target_os = "windows")]
    {
        Arc::new(windows::WinSpooler::new())
    }
    #[cfg(not(target_os = "windows"))]
    {
        Arc::new(stub::UnavailableSpooler)
    }
}
