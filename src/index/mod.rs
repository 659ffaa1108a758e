//! Vector index and chunk metadata store
//!
//! Two positionally coupled, append-only artifacts: `FlatIndex` holds one
//! fixed-dimension embedding per row, `MetadataStore` holds the provenance
//! entry for the same row. Rows are never edited or deleted; both stores are
//! persisted via temp-file-then-rename so neither file can be observed torn.

use crate::storage::DocumentRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    #[error("Corrupt index file: {0}")]
    Corrupt(String),

    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Metadata error: {0}")]
    Metadata(String),
}

/// A nearest-neighbor hit: index row plus squared Euclidean distance
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f32,
}

/// Append-only flat vector index with exact L2 search.
///
/// Rows are stored contiguously in insertion order; row *i* here corresponds
/// to entry *i* of the metadata store. Search is a linear scan, which is the
/// right trade at this corpus size and keeps row positions stable.
#[derive(Debug, Serialize, Deserialize)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Load an index file, or create a fresh empty index if none exists
    pub fn load_or_create(path: &Path, dimension: usize) -> Result<Self, IndexError> {
        if !path.exists() {
            return Ok(Self::new(dimension));
        }
        let index = Self::load(path)?;
        if index.dimension != dimension {
            return Err(IndexError::InvalidDimension {
                expected: dimension,
                actual: index.dimension,
            });
        }
        Ok(index)
    }

    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let bytes = std::fs::read(path).map_err(|e| IndexError::Io {
            source: e,
            context: format!("Failed to read index: {}", path.display()),
        })?;
        let (index, _): (Self, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
                .map_err(|e| IndexError::Corrupt(e.to_string()))?;
        if index.dimension == 0 || index.data.len() % index.dimension != 0 {
            return Err(IndexError::Corrupt(format!(
                "vector data length {} is not a multiple of dimension {}",
                index.data.len(),
                index.dimension
            )));
        }
        Ok(index)
    }

    /// Persist the index atomically (temp file + rename)
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let bytes = bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| IndexError::Corrupt(e.to_string()))?;
        let tmp = path.with_extension("bin.tmp");
        std::fs::write(&tmp, bytes).map_err(|e| IndexError::Io {
            source: e,
            context: format!("Failed to write index temp file: {}", tmp.display()),
        })?;
        std::fs::rename(&tmp, path).map_err(|e| IndexError::Io {
            source: e,
            context: format!("Failed to replace index: {}", path.display()),
        })?;
        Ok(())
    }

    /// Append vectors in bulk, preserving order
    pub fn append(&mut self, vectors: &[Vec<f32>]) -> Result<(), IndexError> {
        for vector in vectors {
            if vector.len() != self.dimension {
                return Err(IndexError::InvalidDimension {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    /// Number of rows in the index
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Exact k-nearest-neighbor search under squared Euclidean distance.
    ///
    /// Returns up to `k` neighbors sorted by ascending distance; fewer when
    /// the index holds fewer rows. No distance threshold is applied.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut neighbors: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, vector)| Neighbor {
                row,
                distance: squared_l2(query, vector),
            })
            .collect();

        neighbors.sort_unstable_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(k);
        Ok(neighbors)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Provenance entry for one indexed chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub case_id: u64,
    pub case_name: Option<String>,
    pub date_filed: NaiveDate,
    pub download_url: String,
    pub chunk_text: String,
}

impl ChunkMetadata {
    pub fn from_record(record: &DocumentRecord, chunk_text: String) -> Self {
        Self {
            case_id: record.id,
            case_name: record.case_name.clone(),
            date_filed: record.date_filed,
            download_url: record.download_url.clone(),
            chunk_text,
        }
    }
}

/// Ordered metadata list, positionally aligned with `FlatIndex` rows
#[derive(Debug, Default)]
pub struct MetadataStore {
    entries: Vec<ChunkMetadata>,
}

impl MetadataStore {
    /// Load the metadata file, or start empty if none exists
    pub fn load_or_default(path: &Path) -> Result<Self, IndexError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let content = std::fs::read_to_string(path).map_err(|e| IndexError::Io {
            source: e,
            context: format!("Failed to read metadata: {}", path.display()),
        })?;
        let entries: Vec<ChunkMetadata> =
            serde_json::from_str(&content).map_err(|e| IndexError::Metadata(e.to_string()))?;
        Ok(Self { entries })
    }

    /// Persist the metadata list atomically (temp file + rename)
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let content = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| IndexError::Metadata(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| IndexError::Io {
            source: e,
            context: format!("Failed to write metadata temp file: {}", tmp.display()),
        })?;
        std::fs::rename(&tmp, path).map_err(|e| IndexError::Io {
            source: e,
            context: format!("Failed to replace metadata: {}", path.display()),
        })?;
        Ok(())
    }

    pub fn extend(&mut self, entries: Vec<ChunkMetadata>) {
        self.entries.extend(entries);
    }

    pub fn get(&self, row: usize) -> Option<&ChunkMetadata> {
        self.entries.get(row)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
