// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Stapeldruck.

use thiserror::Error;

/// Top-level error type for all Stapeldruck operations.
#[derive(Debug, Error)]
pub enum StapeldruckError {
    // -- Spooler errors --
    #[error("print spooler error: {0}")]
    Spooler(String),

    #[error("printer not found: {0}")]
    PrinterNotFound(String),

    // -- Operator input --
    #[error("no printer selected")]
    NoPrinterSelected,

    #[error("no folder selected")]
    NoFolderSelected,

    #[error("nothing selected to print")]
    NothingSelected,

    #[error("invalid print setting: {0}")]
    InvalidSetting(String),

    // -- Queue misuse --
    #[error("task not found in queue: {0}")]
    TaskNotFound(String),

    // -- Storage / persistence --
    #[error("print history error: {0}")]
    History(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform / runtime --
    #[error("printing is not available on this platform")]
    PlatformUnavailable,

    #[error("print worker has stopped")]
    WorkerStopped,
}

impl StapeldruckError {
    /// Errors caused by what the operator did (or did not) choose, as opposed
    /// to failures of the system.
    pub fn is_operator_error(&self) -> bool {
        matches!(
            self,
            Self::NoPrinterSelected
                | Self::NoFolderSelected
                | Self::NothingSelected
                | Self::InvalidSetting(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, StapeldruckError>;
