//! Semantic search over the built index
//!
//! Embeds the query with the same provider used at ingest time, runs exact
//! k-nearest-neighbor lookup, and maps rows back to their provenance entries.

use crate::embedding::EmbeddingProvider;
use crate::error::{QuerycaseError, Result};
use crate::index::{FlatIndex, MetadataStore};
use crate::storage::StorageManager;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

/// One ranked search hit
#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    pub case_id: u64,
    pub case_name: String,
    pub date_filed: NaiveDate,
    pub snippet: String,
    pub link: String,
    /// Squared Euclidean distance; smaller is closer
    pub distance: f32,
}

/// Read-side view over the index and metadata pair
pub struct Searcher {
    provider: Arc<dyn EmbeddingProvider>,
    index: FlatIndex,
    metadata: MetadataStore,
    snippet_chars: usize,
}

impl Searcher {
    /// Open the on-disk index and metadata for querying.
    ///
    /// Unlike ingestion, absence of either file here is an error: there is
    /// nothing to search yet.
    pub fn open(
        storage: &StorageManager,
        provider: Arc<dyn EmbeddingProvider>,
        snippet_chars: usize,
    ) -> Result<Self> {
        let index_path = storage.index_path();
        let metadata_path = storage.metadata_path();
        if !index_path.exists() || !metadata_path.exists() {
            return Err(QuerycaseError::IndexNotFound { path: index_path });
        }

        let index = FlatIndex::load(&index_path)?;
        let metadata = MetadataStore::load(&metadata_path)?;
        if index.len() != metadata.len() {
            tracing::warn!(
                "Index has {} rows but metadata has {} entries; the stores may be desynced",
                index.len(),
                metadata.len()
            );
        }

        Ok(Self {
            provider,
            index,
            metadata,
            snippet_chars,
        })
    }

    /// Return up to `top_k` matches ranked by ascending distance.
    ///
    /// Fewer results come back when the index holds fewer rows; rows without
    /// a metadata entry are silently skipped. No relevance threshold applies.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchMatch>> {
        let query_vector = self.provider.embed(query)?;
        let neighbors = self.index.search(&query_vector, top_k)?;

        let mut matches = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            let Some(entry) = self.metadata.get(neighbor.row) else {
                continue;
            };
            matches.push(SearchMatch {
                case_id: entry.case_id,
                case_name: entry
                    .case_name
                    .clone()
                    .unwrap_or_else(|| "Unnamed Case".to_string()),
                date_filed: entry.date_filed,
                snippet: truncate_chars(&entry.chunk_text, self.snippet_chars),
                link: entry.download_url.clone(),
                distance: neighbor.distance,
            });
        }
        Ok(matches)
    }

    pub fn row_count(&self) -> usize {
        self.index.len()
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("short", 500), "short");
    }
}
