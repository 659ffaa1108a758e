//! Checkpoint-resumable fetch loop over the upstream opinions API
//!
//! Drives pagination, filters already-processed items against the checkpoint,
//! downloads and extracts each accepted document, gates the text, persists a
//! durable JSON record, and advances the checkpoint. Batches are handed to
//! the caller lazily: `next_batch` suspends exactly at batch boundaries and a
//! fresh run resumes from the checkpoint, never mid-batch.

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::config::Config;
use crate::error::{QuerycaseError, Result};
use crate::extract::{detect_content_kind, TextExtractor};
use crate::quality;
use crate::storage::{DocumentRecord, StorageManager};
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::Deserialize;
use std::collections::VecDeque;
use std::time::Duration;

/// One page of upstream listing results
#[derive(Debug, Deserialize)]
struct ApiPage {
    results: Vec<ApiOpinion>,
    /// Continuation URL; absent or null signals end of pagination
    #[serde(default)]
    next: Option<String>,
}

/// One listing item, tolerant of absent fields at the boundary
#[derive(Debug, Deserialize)]
struct ApiOpinion {
    id: u64,
    #[serde(default)]
    case_name: Option<String>,
    #[serde(default)]
    date_filed: Option<NaiveDate>,
    #[serde(default)]
    download_url: Option<String>,
}

/// HTTP client for the upstream document API
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    court: String,
    page_size: usize,
    retry_backoff: Duration,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(ua) = HeaderValue::from_str(&config.api.user_agent) {
            headers.insert(USER_AGENT, ua);
        }
        if let Ok(token) = std::env::var(&config.api.auth_token_env) {
            match HeaderValue::from_str(&format!("Token {token}")) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => {
                    tracing::warn!(
                        "Value of {} is not a valid header, continuing unauthenticated",
                        config.api.auth_token_env
                    );
                }
            }
        } else {
            tracing::debug!(
                "{} not set, querying upstream unauthenticated",
                config.api.auth_token_env
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.fetch.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api.base_url.clone(),
            court: config.api.court.clone(),
            page_size: config.api.page_size,
            retry_backoff: Duration::from_secs(config.fetch.retry_backoff_secs),
        })
    }

    /// Fetch the first listing page, carrying the filter parameters.
    /// Subsequent pages must go through [`fetch_next_page`](Self::fetch_next_page),
    /// which follows the server-supplied continuation URL verbatim.
    async fn fetch_first_page(&self, date_filed_min: NaiveDate) -> Result<ApiPage> {
        let date_min = date_filed_min.format("%Y-%m-%d").to_string();
        let page_size = self.page_size.to_string();
        let params = [
            ("date_filed_min", date_min.as_str()),
            ("ordering", "date_filed"),
            ("court__contains", self.court.as_str()),
            ("page_size", page_size.as_str()),
        ];
        self.fetch_page_with_retry(&self.base_url, Some(&params)).await
    }

    async fn fetch_next_page(&self, url: &str) -> Result<ApiPage> {
        self.fetch_page_with_retry(url, None).await
    }

    /// Fetch one listing page, retrying after a fixed backoff on any failure.
    ///
    /// There is deliberately no retry ceiling: the loop favors eventual
    /// forward progress over bounded latency.
    async fn fetch_page_with_retry(
        &self,
        url: &str,
        params: Option<&[(&str, &str)]>,
    ) -> Result<ApiPage> {
        loop {
            match self.fetch_page_once(url, params).await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    tracing::warn!(
                        "Page fetch failed ({}), retrying in {}s",
                        e,
                        self.retry_backoff.as_secs()
                    );
                    tokio::time::sleep(self.retry_backoff).await;
                }
            }
        }
    }

    async fn fetch_page_once(&self, url: &str, params: Option<&[(&str, &str)]>) -> Result<ApiPage> {
        let mut request = self.http.get(url);
        if let Some(params) = params {
            request = request.query(params);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(QuerycaseError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.json().await?)
    }

    /// Download one raw artifact, returning its bytes and reported content type
    async fn download(&self, url: &str) -> Result<(Vec<u8>, Option<String>)> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(QuerycaseError::Api {
                status: status.as_u16(),
                body: format!("download failed for {url}"),
            });
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = response.bytes().await?.to_vec();
        Ok((bytes, content_type))
    }
}

enum PageCursor {
    First,
    Next(String),
    Done,
}

/// Lazy, checkpoint-resumable producer of document batches
pub struct FetchLoop<'a> {
    client: ApiClient,
    storage: &'a StorageManager,
    checkpoints: CheckpointStore,
    checkpoint: Checkpoint,
    extractor: TextExtractor,
    batch_size: usize,
    min_text_chars: usize,
    polite_delay: Duration,
    cursor: PageCursor,
    pending: VecDeque<ApiOpinion>,
}

impl<'a> FetchLoop<'a> {
    pub fn new(config: &Config, storage: &'a StorageManager) -> Result<Self> {
        let client = ApiClient::new(config)?;
        let date_floor = NaiveDate::parse_from_str(&config.fetch.date_floor, "%Y-%m-%d")
            .map_err(|_| QuerycaseError::InvalidConfigValue {
                path: "fetch.date_floor".to_string(),
                message: format!("'{}' is not a YYYY-MM-DD date", config.fetch.date_floor),
            })?;
        let checkpoints = CheckpointStore::new(storage.checkpoint_path(), date_floor);
        let checkpoint = checkpoints.load();

        tracing::info!(
            "Fetching documents filed since {} (last id {})",
            checkpoint.date_filed,
            checkpoint.last_case_id
        );

        Ok(Self {
            client,
            storage,
            checkpoints,
            checkpoint,
            extractor: TextExtractor::new(),
            batch_size: config.fetch.batch_size,
            min_text_chars: config.fetch.min_text_chars,
            polite_delay: Duration::from_millis(config.fetch.polite_delay_ms),
            cursor: PageCursor::First,
            pending: VecDeque::new(),
        })
    }

    /// Produce the next batch of persisted documents.
    ///
    /// Returns `Ok(Some(batch))` with up to `batch_size` records, a shorter
    /// final batch when pagination ends, or `Ok(None)` once exhausted. Page
    /// fetch failures retry internally; per-item failures are logged and
    /// skipped, never abort the loop.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<DocumentRecord>>> {
        let mut batch = Vec::new();

        loop {
            while let Some(item) = self.pending.pop_front() {
                if let Some(record) = self.process_item(item).await {
                    batch.push(record);
                    if batch.len() >= self.batch_size {
                        return Ok(Some(batch));
                    }
                }
            }

            let page = match &self.cursor {
                PageCursor::First => self.client.fetch_first_page(self.checkpoint.date_filed).await?,
                PageCursor::Next(url) => {
                    let url = url.clone();
                    self.client.fetch_next_page(&url).await?
                }
                PageCursor::Done => {
                    return Ok(if batch.is_empty() { None } else { Some(batch) });
                }
            };

            tracing::debug!("Fetched page with {} results", page.results.len());
            self.cursor = match page.next {
                Some(url) => PageCursor::Next(url),
                None => PageCursor::Done,
            };
            self.pending.extend(page.results);
        }
    }

    /// Process one listing item end to end.
    ///
    /// Returns the persisted record, or `None` when the item was skipped for
    /// any reason. Only a fully persisted record advances the checkpoint.
    async fn process_item(&mut self, item: ApiOpinion) -> Option<DocumentRecord> {
        let id = item.id;

        let Some(url) = item.download_url else {
            tracing::debug!("Skipping case {id}: no download URL");
            return None;
        };
        let Some(date_filed) = item.date_filed else {
            tracing::debug!("Skipping case {id}: no filed date");
            return None;
        };
        if self.checkpoint.covers(date_filed, id) {
            tracing::debug!("Skipping case {id}: already covered by checkpoint");
            return None;
        }
        if self.storage.record_exists(id) {
            tracing::debug!("Skipping case {id}: record already on disk");
            return None;
        }

        tokio::time::sleep(self.polite_delay).await;

        let (bytes, content_type) = match self.client.download(&url).await {
            Ok(downloaded) => downloaded,
            Err(e) => {
                tracing::warn!("Failed to download case {id}: {e}");
                return None;
            }
        };

        // The raw artifact only exists while extraction runs; the JSON
        // record, not the raw file, is the durable form.
        let raw_path = self.storage.raw_path(id);
        if let Err(e) = std::fs::write(&raw_path, &bytes) {
            tracing::warn!("Failed to write raw artifact for case {id}: {e}");
        }

        let kind = detect_content_kind(&bytes, content_type.as_deref());
        let text = self.extractor.extract(&bytes, kind);

        if let Err(e) = self.storage.delete_raw(id) {
            tracing::warn!("Failed to delete raw artifact for case {id}: {e}");
        }

        if !quality::is_usable_text(&text, self.min_text_chars) {
            tracing::warn!("Skipping case {id}: short or error-page text ({:?})", kind);
            return None;
        }

        let record = DocumentRecord {
            id,
            case_name: item.case_name,
            date_filed,
            download_url: url,
            opinion_text: text,
        };

        if let Err(e) = self.storage.save_record(&record) {
            tracing::warn!("Failed to persist record for case {id}: {e}");
            return None;
        }

        // Record is durable; advancing now means a crash here costs at most
        // one re-fetch-and-skip on restart.
        if let Err(e) = self.checkpoints.advance(date_filed, id) {
            tracing::warn!("Failed to advance checkpoint past case {id}: {e}");
        }
        self.checkpoint = Checkpoint {
            date_filed,
            last_case_id: id,
        };

        tracing::info!("Saved case {id} filed {date_filed}");
        Some(record)
    }
}
