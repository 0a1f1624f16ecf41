// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::PrintSettings;

/// File name of the completed-task history inside the data directory.
pub const DEFAULT_HISTORY_FILE: &str = "print_history.json";

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// History file.  Relative paths are resolved against the data directory.
    pub history_file: PathBuf,
    /// Printer used when none is given on the command line.
    pub default_printer: Option<String>,
    /// Settings applied to files that have no explicit settings.
    pub default_settings: PrintSettings,
    /// Pause between finishing one task and starting the next.
    pub requeue_delay_ms: u64,
    /// Printer status polling period.
    pub printer_refresh_secs: u64,
}

impl AppConfig {
    pub fn requeue_delay(&self) -> Duration {
        Duration::from_millis(self.requeue_delay_ms)
    }

    pub fn printer_refresh(&self) -> Duration {
        Duration::from_secs(self.printer_refresh_secs.max(1))
    }

    /// Absolute history path for the given data directory.
    pub fn history_path(&self, data_dir: &Path) -> PathBuf {
        if self.history_file.is_absolute() {
            self.history_file.clone()
        } else {
            data_dir.join(&self.history_file)
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            history_file: PathBuf::from(DEFAULT_HISTORY_FILE),
            default_printer: None,
            default_settings: PrintSettings::default(),
            requeue_delay_ms: 100,
            printer_refresh_secs: 5,
        }
    }
}
