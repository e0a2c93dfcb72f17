// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution.

use std::path::PathBuf;

use pagekeep_core::error::Result;

const APP_DIR: &str = "pagekeep";

/// The application data directory, created if needed.
///
/// An explicit override wins; otherwise `$XDG_DATA_HOME/pagekeep`, then
/// `~/.local/share/pagekeep`.
pub fn data_dir(override_dir: Option<PathBuf>) -> Result<PathBuf> {
    let dir = override_dir.unwrap_or_else(|| base_dir().join(APP_DIR));
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn base_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg);
    }
    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}
