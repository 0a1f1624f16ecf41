// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Completed-task history file.
//
// A flat JSON array, one object per finished task, rewritten in full on
// every save:
//
//   [{ "file_name", "file_path", "status", "start_time", "end_time",
//      "error_message", "settings": { "paper_size", "orientation",
//      "page_range", "color_mode", "sides_option", "copies" } }]
//
// `status` and the settings enums are the localized labels; timestamps are
// float epoch seconds or null.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use stapeldruck_core::error::{Result, StapeldruckError};
use stapeldruck_core::types::{PrintSettings, TaskStatus};

use crate::task::PrintTask;

/// One entry of the history file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub file_name: String,
    pub file_path: PathBuf,
    pub status: TaskStatus,
    #[serde(with = "epoch_seconds")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(with = "epoch_seconds")]
    pub end_time: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub settings: PrintSettings,
}

impl From<&PrintTask> for HistoryRecord {
    fn from(task: &PrintTask) -> Self {
        Self {
            file_name: task.file_name.clone(),
            file_path: task.file_path.clone(),
            status: task.status(),
            start_time: task.start_time(),
            end_time: task.end_time(),
            error_message: task.error_message().map(str::to_owned),
            settings: task.settings.clone(),
        }
    }
}

impl From<HistoryRecord> for PrintTask {
    fn from(record: HistoryRecord) -> Self {
        PrintTask::restored(
            record.file_path,
            record.file_name,
            record.settings,
            record.status,
            record.start_time,
            record.end_time,
            record.error_message,
        )
    }
}

/// Overwrite `path` with the given tasks.
#[instrument(skip_all, fields(path = %path.display(), count = tasks.len()))]
pub fn save_history(path: &Path, tasks: &[PrintTask]) -> Result<()> {
    let records: Vec<HistoryRecord> = tasks.iter().map(HistoryRecord::from).collect();
    let json = serde_json::to_string_pretty(&records)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, json)?;

    debug!("history saved");
    Ok(())
}

/// Read the history file.  A missing file is an empty history.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_history(path: &Path) -> Result<Vec<PrintTask>> {
    if !path.exists() {
        debug!("no history file yet");
        return Ok(Vec::new());
    }

    let data = fs::read_to_string(path)?;
    let records: Vec<HistoryRecord> = serde_json::from_str(&data)
        .map_err(|e| StapeldruckError::History(format!("{}: {e}", path.display())))?;

    debug!(count = records.len(), "history loaded");
    Ok(records.into_iter().map(PrintTask::from).collect())
}

/// `Option<DateTime<Utc>>` as float epoch seconds (`null` for `None`).
mod epoch_seconds {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => {
                let secs = dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_micros()) / 1e6;
                serializer.serialize_f64(secs)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<f64>::deserialize(deserializer)?;
        secs.map(|s| {
            let whole = s.floor();
            let micros = ((s - whole) * 1e6).round() as i64;
            DateTime::<Utc>::from_timestamp(whole as i64, 0)
                .map(|dt| dt + chrono::Duration::microseconds(micros))
                .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {s}")))
        })
        .transpose()
    }
}
