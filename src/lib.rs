//! querycase - Incremental Case-Law Harvester and Semantic Search
//!
//! Fetches court opinions from a paginated upstream API with a durable,
//! resumable checkpoint, extracts and quality-gates their text, and maintains
//! an append-only vector index (plus a positionally coupled metadata store)
//! over fixed-size chunks of that text.

pub mod checkpoint;
pub mod chunker;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod index;
pub mod ingest;
pub mod quality;
pub mod search;
pub mod storage;

pub use error::{QuerycaseError, Result};
