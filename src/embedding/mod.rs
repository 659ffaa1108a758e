//! Embedding generation
//!
//! `EmbeddingProvider` abstracts over embedding backends so the pipeline and
//! search path share one model instance and tests can inject a double.
mod provider;

pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};
