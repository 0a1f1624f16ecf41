// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: resolves the data directory, loads the config, and
// picks the printer subsystem the commands run against.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use stapeldruck_bridge::{MemorySpooler, PrinterSubsystem, platform_subsystem};
use stapeldruck_core::AppConfig;
use stapeldruck_core::error::Result;
use stapeldruck_print::{PrintQueue, PrintService};
use tracing::{debug, info, warn};

use super::data_dir;

const CONFIG_FILE: &str = "config.json";

/// Everything a command needs from the backend crates.
pub struct AppServices {
    data_dir: PathBuf,
    config: AppConfig,
    subsystem: Arc<dyn PrinterSubsystem>,
}

impl AppServices {
    /// Initialise against the real OS spooler.  Call once per command.
    pub fn init(data_dir: Option<&Path>) -> Result<Self> {
        Self::with_subsystem(data_dir, platform_subsystem())
    }

    /// Initialise against an in-memory spooler that accepts jobs for
    /// `printer` and prints nothing.
    pub fn dry_run(data_dir: Option<&Path>, printer: &str) -> Result<Self> {
        info!(printer, "dry run: jobs are recorded, not printed");
        Self::with_subsystem(data_dir, Arc::new(MemorySpooler::with_printers(&[printer])))
    }

    fn with_subsystem(dir: Option<&Path>, subsystem: Arc<dyn PrinterSubsystem>) -> Result<Self> {
        let data_dir = data_dir::data_dir(dir)?;
        info!(path = %data_dir.display(), backend = subsystem.platform_name(), "initialising app services");

        let config = load_config(&data_dir);
        Ok(Self {
            data_dir,
            config,
            subsystem,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn subsystem(&self) -> &Arc<dyn PrinterSubsystem> {
        &self.subsystem
    }

    pub fn history_path(&self) -> PathBuf {
        self.config.history_path(&self.data_dir)
    }

    /// The queue with its stored history.
    pub fn open_queue(&self) -> PrintQueue {
        PrintQueue::open(self.history_path())
    }

    /// Start the print worker.  Needs a tokio runtime.
    pub fn start_print_service(&self) -> PrintService {
        PrintService::spawn(self.open_queue(), Arc::clone(&self.subsystem), &self.config)
    }

    /// Replace and persist the configuration.
    pub fn save_config(&mut self, config: AppConfig) -> Result<()> {
        persist_config(&self.data_dir, &config)?;
        self.config = config;
        Ok(())
    }
}

/// Read `config.json`.  A missing file is written out with defaults so the
/// operator has something to edit; a malformed one is logged and ignored.
fn load_config(data_dir: &Path) -> AppConfig {
    let path = data_dir.join(CONFIG_FILE);
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let config = AppConfig::default();
            if let Err(e) = persist_config(data_dir, &config) {
                warn!(path = %path.display(), error = %e, "could not write default config");
            }
            return config;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read config; using defaults");
            return AppConfig::default();
        }
    };

    match serde_json::from_str(&data) {
        Ok(config) => {
            debug!(path = %path.display(), "config loaded");
            config
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed config; using defaults");
            AppConfig::default()
        }
    }
}

fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}
