// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware data directory resolution.

use std::path::{Path, PathBuf};

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "STAPELDRUCK_DATA_DIR";

const APP_DIR: &str = "stapeldruck";

/// Resolve the data directory, creating it if needed.
///
/// `explicit` (from `--data-dir`) wins over everything else.
pub fn data_dir(explicit: Option<&Path>) -> std::io::Result<PathBuf> {
    let dir = match explicit {
        Some(dir) => dir.to_path_buf(),
        None => resolve(|key| std::env::var(key).ok()),
    };
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Pick the data directory from environment lookups.
fn resolve(env: impl Fn(&str) -> Option<String>) -> PathBuf {
    let var = |key: &str| env(key).filter(|v| !v.is_empty()).map(PathBuf::from);

    if let Some(dir) = var(DATA_DIR_ENV) {
        return dir;
    }
    if cfg!(target_os = "windows") {
        if let Some(appdata) = var("APPDATA") {
            return appdata.join(APP_DIR);
        }
    }
    if let Some(xdg) = var("XDG_DATA_HOME") {
        return xdg.join(APP_DIR);
    }
    if let Some(home) = var("HOME") {
        return home.join(".local").join("share").join(APP_DIR);
    }
    // Last resort
    std::env::temp_dir().join(APP_DIR)
}
