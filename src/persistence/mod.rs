//! File-backed state for the trade manager.
//!
//! The executor set is written as a JSON list after every tick. Writes go
//! through a temp file and an atomic rename so a crash mid-write can never
//! leave a truncated state file behind.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::execution::ExecutorRecord;
use crate::Result;

/// On-disk shapes we accept. Older deployments persisted a single
/// strategy session as a map; those carry no executor grid and load
/// as empty.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum PersistedState {
    Grid(Vec<ExecutorRecord>),
    LegacySession(HashMap<String, serde_json::Value>),
}

pub fn save_executors(path: &Path, records: &[ExecutorRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(&PersistedState::Grid(records.to_vec()))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;

    tracing::debug!("Persisted {} executors to {:?}", records.len(), path);
    Ok(())
}

/// Load the persisted executor set. A missing file is a normal cold
/// start, not an error.
pub fn load_executors(path: &Path) -> Result<Option<Vec<ExecutorRecord>>> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_str(&json)? {
        PersistedState::Grid(records) => Ok(Some(records)),
        PersistedState::LegacySession(_) => {
            tracing::warn!(
                "State file {:?} holds a legacy session record, ignoring it",
                path
            );
            Ok(Some(Vec::new()))
        }
    }
}

/// Remove the state file. Already-absent is fine.
pub fn clear_state(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
