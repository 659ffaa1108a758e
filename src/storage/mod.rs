//! Storage layer for querycase
//!
//! Lays out the data directory and owns the durable per-document JSON record
//! store plus the paths of the raw artifacts, checkpoint, index, and metadata.

use crate::error::{QuerycaseError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Durable per-document record, persisted as `json/<id>.json`
///
/// This is the form a document survives in between fetching and indexing;
/// the raw artifact is deleted as soon as text extraction has run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: u64,
    /// Upstream tolerates absent case names
    pub case_name: Option<String>,
    pub date_filed: NaiveDate,
    pub download_url: String,
    pub opinion_text: String,
}

/// Storage manager that owns the data directory layout
pub struct StorageManager {
    base_path: PathBuf,
    pdf_dir: PathBuf,
    json_dir: PathBuf,
}

impl StorageManager {
    /// Create a new storage manager, creating the directory layout if needed
    pub fn new(base_path: PathBuf) -> Result<Self> {
        let pdf_dir = base_path.join("pdfs");
        let json_dir = base_path.join("json");

        for dir in [&base_path, &pdf_dir, &json_dir] {
            std::fs::create_dir_all(dir).map_err(|e| QuerycaseError::Io {
                source: e,
                context: format!("Failed to create data directory: {}", dir.display()),
            })?;
        }

        Ok(Self {
            base_path,
            pdf_dir,
            json_dir,
        })
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.base_path.join("checkpoint.json")
    }

    pub fn index_path(&self) -> PathBuf {
        self.base_path.join("index.bin")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.base_path.join("metadata.json")
    }

    /// Path of the raw downloaded artifact for a document.
    ///
    /// Everything lands under a `.pdf` name regardless of real content kind;
    /// extraction sniffs the bytes, never the extension.
    pub fn raw_path(&self, id: u64) -> PathBuf {
        self.pdf_dir.join(format!("{id}.pdf"))
    }

    pub fn record_path(&self, id: u64) -> PathBuf {
        self.json_dir.join(format!("{id}.json"))
    }

    pub fn raw_dir(&self) -> &Path {
        &self.pdf_dir
    }

    /// Whether a durable record for this document already exists
    pub fn record_exists(&self, id: u64) -> bool {
        self.record_path(id).exists()
    }

    /// Persist a document record as human-readable UTF-8 JSON
    pub fn save_record(&self, record: &DocumentRecord) -> Result<()> {
        let path = self.record_path(record.id);
        let content = serde_json::to_string_pretty(record).map_err(|e| QuerycaseError::Json {
            source: e,
            context: format!("Failed to serialize record {}", record.id),
        })?;
        std::fs::write(&path, content).map_err(|e| QuerycaseError::Io {
            source: e,
            context: format!("Failed to write record: {}", path.display()),
        })?;
        Ok(())
    }

    pub fn load_record(&self, id: u64) -> Result<DocumentRecord> {
        let path = self.record_path(id);
        let content = std::fs::read_to_string(&path).map_err(|e| QuerycaseError::Io {
            source: e,
            context: format!("Failed to read record: {}", path.display()),
        })?;
        serde_json::from_str(&content).map_err(|e| QuerycaseError::Json {
            source: e,
            context: format!("Failed to parse record: {}", path.display()),
        })
    }

    /// Delete the durable JSON record for a document. Missing file is not an error.
    pub fn delete_record(&self, id: u64) -> Result<()> {
        Self::remove_if_present(&self.record_path(id))
    }

    /// Delete the raw artifact for a document. Missing file is not an error.
    pub fn delete_raw(&self, id: u64) -> Result<()> {
        Self::remove_if_present(&self.raw_path(id))
    }

    fn remove_if_present(path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(QuerycaseError::Io {
                source: e,
                context: format!("Failed to delete: {}", path.display()),
            }),
        }
    }

    /// Document ids with a persisted JSON record (fetched but not yet indexed)
    pub fn pending_record_ids(&self) -> Result<Vec<u64>> {
        let mut ids = Vec::new();
        let entries = std::fs::read_dir(&self.json_dir).map_err(|e| QuerycaseError::Io {
            source: e,
            context: format!("Failed to list record directory: {}", self.json_dir.display()),
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| QuerycaseError::Io {
                source: e,
                context: "Failed to read record directory entry".to_string(),
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if let Ok(id) = stem.parse::<u64>() {
                    ids.push(id);
                }
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// Raw artifact files still on disk, for the standalone conversion pass
    pub fn raw_artifact_ids(&self) -> Result<Vec<u64>> {
        let mut ids = Vec::new();
        let entries = std::fs::read_dir(&self.pdf_dir).map_err(|e| QuerycaseError::Io {
            source: e,
            context: format!("Failed to list raw directory: {}", self.pdf_dir.display()),
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| QuerycaseError::Io {
                source: e,
                context: "Failed to read raw directory entry".to_string(),
            })?;
            if let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) {
                if let Ok(id) = stem.parse::<u64>() {
                    ids.push(id);
                }
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }
}
