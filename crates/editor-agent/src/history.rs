//! Append-only operation log under `~/.hookswitch/history.jsonl`.

use std::path::Path;

use hookswitch_core::io::append_line;
use hookswitch_core::{BackendError, BackendResult, HistoryRecord};

pub fn append(path: &Path, record: &HistoryRecord) -> BackendResult<()> {
    let line = serde_json::to_string(record).map_err(|e| BackendError::Other(e.to_string()))?;
    append_line(path, &line).map_err(BackendError::Io)
}

/// Last `limit` records, oldest first. Lines that no longer parse (older
/// schema, manual edits) are skipped with a warning rather than failing the
/// whole read.
pub fn read_recent(path: &Path, limit: usize) -> BackendResult<Vec<HistoryRecord>> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let data = std::fs::read_to_string(path).map_err(BackendError::Io)?;
    let mut records: Vec<HistoryRecord> = Vec::new();
    for line in data.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str(trimmed) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!(error = %e, "skipping unreadable history line"),
        }
    }
    let skip = records.len().saturating_sub(limit);
    Ok(records.split_off(skip))
}

// ─── Tests ────────────────────────────────────────────────────────────────
