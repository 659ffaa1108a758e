//! Durable fetch cursor
//!
//! The checkpoint records the last successfully persisted document's
//! `(date_filed, id)` position in upstream ordering. It only ever moves
//! forward; a crash between "record saved" and "checkpoint advanced" costs
//! at most one harmless re-fetch-and-skip on restart.

use crate::error::{QuerycaseError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Cursor position in upstream `(date_filed, id)` ordering.
///
/// Derived `Ord` compares `date_filed` first, then `last_case_id`, which is
/// exactly the ordering the fetch loop filters against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Checkpoint {
    pub date_filed: NaiveDate,
    pub last_case_id: u64,
}

impl Checkpoint {
    /// A document at `(date, id)` is already covered by this checkpoint
    pub fn covers(&self, date: NaiveDate, id: u64) -> bool {
        (date, id) <= (self.date_filed, self.last_case_id)
    }
}

/// Durable checkpoint store backed by a single JSON file
pub struct CheckpointStore {
    path: PathBuf,
    default: Checkpoint,
}

impl CheckpointStore {
    pub fn new(path: PathBuf, date_floor: NaiveDate) -> Self {
        Self {
            path,
            default: Checkpoint {
                date_filed: date_floor,
                last_case_id: 0,
            },
        }
    }

    /// Read the stored checkpoint.
    ///
    /// Absent or unreadable state falls back to the epoch default so that
    /// ingestion can always start; a corrupt file is logged, never fatal.
    pub fn load(&self) -> Checkpoint {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        "Unreadable checkpoint at {}, starting from default: {}",
                        self.path.display(),
                        e
                    );
                }
                return self.default;
            }
        };

        match serde_json::from_str(&content) {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                tracing::warn!(
                    "Corrupt checkpoint at {}, starting from default: {}",
                    self.path.display(),
                    e
                );
                self.default
            }
        }
    }

    /// Atomically replace the stored checkpoint.
    ///
    /// Must be called only after the corresponding document has been durably
    /// recorded. Writes a temp file and renames it over the target so a crash
    /// mid-write never leaves a torn checkpoint.
    pub fn advance(&self, date_filed: NaiveDate, last_case_id: u64) -> Result<()> {
        let checkpoint = Checkpoint {
            date_filed,
            last_case_id,
        };
        let content =
            serde_json::to_string_pretty(&checkpoint).map_err(|e| QuerycaseError::Json {
                source: e,
                context: "Failed to serialize checkpoint".to_string(),
            })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| QuerycaseError::Io {
            source: e,
            context: format!("Failed to write checkpoint temp file: {}", tmp.display()),
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| QuerycaseError::Io {
            source: e,
            context: format!("Failed to replace checkpoint: {}", self.path.display()),
        })?;

        tracing::debug!(
            "Checkpoint advanced to ({}, {})",
            checkpoint.date_filed,
            checkpoint.last_case_id
        );
        Ok(())
    }
}
