//! Ingestion orchestrator
//!
//! Consumes batches from the fetch loop and drives chunking, embedding, and
//! index/metadata maintenance, then removes the now-redundant intermediate
//! artifacts. Embedding itself is not checkpointed: if a crash lands between
//! the index/metadata persist and cleanup, re-running ingestion over the
//! surviving JSON records will append duplicate rows. Known limitation,
//! inherited from the idempotency boundary sitting at fetch time.

use crate::chunker::chunk_text;
use crate::embedding::EmbeddingProvider;
use crate::error::{QuerycaseError, Result};
use crate::index::{ChunkMetadata, FlatIndex, MetadataStore};
use crate::storage::{DocumentRecord, StorageManager};
use std::sync::Arc;

/// Outcome counters for one ingested batch
#[derive(Debug, Default)]
pub struct IngestStats {
    /// Records that produced chunks
    pub documents: usize,
    /// Chunks embedded and appended to the index
    pub chunks: usize,
    /// Records rejected by the indexing-time length gate
    pub skipped: usize,
}

/// Drives chunk → embed → index/metadata updates for fetched batches
pub struct Ingestor<'a> {
    storage: &'a StorageManager,
    provider: Arc<dyn EmbeddingProvider>,
    chunk_max_words: usize,
    min_index_chars: usize,
    vector_dim: usize,
}

impl<'a> Ingestor<'a> {
    pub fn new(
        storage: &'a StorageManager,
        provider: Arc<dyn EmbeddingProvider>,
        chunk_max_words: usize,
        min_index_chars: usize,
        vector_dim: usize,
    ) -> Result<Self> {
        if provider.dimension() != vector_dim {
            return Err(QuerycaseError::Config(format!(
                "Embedding model {} produces {}-dim vectors but the index is configured for {}",
                provider.model_name(),
                provider.dimension(),
                vector_dim
            )));
        }
        Ok(Self {
            storage,
            provider,
            chunk_max_words,
            min_index_chars,
            vector_dim,
        })
    }

    /// Ingest one batch of fetched documents.
    ///
    /// Records shorter than the indexing-time gate are skipped with their
    /// artifacts left untouched. For every embedded record, the JSON record
    /// and any lingering raw artifact are deleted best-effort afterwards;
    /// a failed deletion is logged, never rolled back. A batch yielding zero
    /// chunks mutates nothing.
    pub fn ingest_batch(&self, batch: &[DocumentRecord]) -> Result<IngestStats> {
        let mut stats = IngestStats::default();
        let mut vectors: Vec<Vec<f32>> = Vec::new();
        let mut entries: Vec<ChunkMetadata> = Vec::new();

        for record in batch {
            // Looser than the fetch-time gate on purpose: records saved
            // under an older policy still get indexed.
            if record.opinion_text.trim().chars().count() < self.min_index_chars {
                tracing::debug!("Not indexing case {}: text below indexing gate", record.id);
                stats.skipped += 1;
                continue;
            }

            let chunks = chunk_text(&record.opinion_text, self.chunk_max_words);
            for chunk in chunks {
                let vector = self.provider.embed(&chunk)?;
                vectors.push(vector);
                entries.push(ChunkMetadata::from_record(record, chunk));
            }
            stats.documents += 1;

            // Promote-to-index, discard-raw lifecycle: the chunks are now the
            // document's surviving form.
            if let Err(e) = self.storage.delete_record(record.id) {
                tracing::warn!("Failed to delete record for case {}: {}", record.id, e);
            }
            if let Err(e) = self.storage.delete_raw(record.id) {
                tracing::warn!("Failed to delete raw artifact for case {}: {}", record.id, e);
            }
        }

        if vectors.is_empty() {
            tracing::info!("No eligible chunks in batch, index unchanged");
            return Ok(stats);
        }

        let index_path = self.storage.index_path();
        let metadata_path = self.storage.metadata_path();

        let mut index = FlatIndex::load_or_create(&index_path, self.vector_dim)?;
        let mut metadata = MetadataStore::load_or_default(&metadata_path)?;

        index.append(&vectors)?;
        metadata.extend(entries);

        // Each write is atomic on its own; a crash between the two renames
        // can still desync the pair, which `status` makes visible.
        index.save(&index_path)?;
        metadata.save(&metadata_path)?;

        stats.chunks = vectors.len();
        tracing::info!(
            "Indexed {} chunks from {} documents ({} rows total)",
            stats.chunks,
            stats.documents,
            index.len()
        );
        Ok(stats)
    }
}
