use querycase::checkpoint::CheckpointStore;
use querycase::cli::{Cli, Commands, ConfigAction};
use querycase::config::Config;
use querycase::embedding::{EmbeddingProvider, FastEmbedProvider};
use querycase::error::{QuerycaseError, Result};
use querycase::extract::{detect_content_kind, TextExtractor};
use querycase::fetch::FetchLoop;
use querycase::index::{FlatIndex, MetadataStore};
use querycase::ingest::Ingestor;
use querycase::quality;
use querycase::search::Searcher;
use querycase::storage::{DocumentRecord, StorageManager};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse_args();

    match cli.command {
        Commands::Update {
            max_batches,
            batch_size,
        } => {
            cmd_update(cli.config, max_batches, batch_size).await?;
        }
        Commands::Search { query, top_k, json } => {
            cmd_search(cli.config, &query, top_k, json)?;
        }
        Commands::Convert { min_chars } => {
            cmd_convert(cli.config, min_chars)?;
        }
        Commands::Status => {
            cmd_status(cli.config)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("querycase=info"));

    fmt().with_env_filter(filter).with_target(false).init();
}

async fn cmd_update(
    config_path: Option<std::path::PathBuf>,
    max_batches: Option<usize>,
    batch_size: Option<usize>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(batch_size) = batch_size {
        config.fetch.batch_size = batch_size;
    }
    config.validate()?;

    let storage = open_storage(&config)?;
    let provider: Arc<dyn EmbeddingProvider> =
        Arc::new(FastEmbedProvider::new(&config.embedding.model)?);
    let ingestor = Ingestor::new(
        &storage,
        provider,
        config.index.chunk_max_words,
        config.index.min_index_chars,
        config.index.vector_dim,
    )?;
    let mut fetch_loop = FetchLoop::new(&config, &storage)?;

    let mut batch_count = 0usize;
    let mut total_documents = 0usize;
    let mut total_chunks = 0usize;

    while let Some(batch) = fetch_loop.next_batch().await? {
        batch_count += 1;
        tracing::info!("Processing batch {} with {} cases", batch_count, batch.len());

        let stats = ingestor.ingest_batch(&batch)?;
        total_documents += stats.documents;
        total_chunks += stats.chunks;

        if let Some(max) = max_batches {
            if batch_count >= max {
                tracing::info!("Reached max batch count ({max}), stopping");
                break;
            }
        }
    }

    println!(
        "✓ Update complete: {} batch(es), {} documents, {} chunks indexed",
        batch_count, total_documents, total_chunks
    );
    Ok(())
}

fn cmd_search(
    config_path: Option<std::path::PathBuf>,
    query: &str,
    top_k: Option<usize>,
    json: bool,
) -> Result<()> {
    if query.trim().is_empty() {
        return Err(QuerycaseError::Config("Search query is empty".to_string()));
    }

    let config = load_config(config_path)?;
    let top_k = top_k.unwrap_or(config.search.top_k);

    let storage = open_storage(&config)?;
    let provider: Arc<dyn EmbeddingProvider> =
        Arc::new(FastEmbedProvider::new(&config.embedding.model)?);
    let searcher = Searcher::open(&storage, provider, config.search.snippet_chars)?;

    let matches = searcher.search(query, top_k)?;

    if json {
        let out = serde_json::to_string_pretty(&matches).map_err(|e| QuerycaseError::Json {
            source: e,
            context: "Failed to serialize search results".to_string(),
        })?;
        println!("{out}");
        return Ok(());
    }

    if matches.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, m) in matches.iter().enumerate() {
        println!("\nMatch {}: {} ({})", i + 1, m.case_name, m.date_filed);
        if !m.link.is_empty() {
            println!("  Link: {}", m.link);
        }
        println!("  Snippet: {}…", m.snippet);
    }
    Ok(())
}

/// Recovery pass over raw artifacts that never made it into JSON records.
///
/// Re-extracts text at the looser conversion threshold and writes records
/// with placeholder provenance (the upstream listing data is gone at this
/// point). Raw files are kept; this is a repair tool, not the fetch path.
fn cmd_convert(config_path: Option<std::path::PathBuf>, min_chars: usize) -> Result<()> {
    let config = load_config(config_path)?;
    let storage = open_storage(&config)?;
    let extractor = TextExtractor::new();
    let date_floor = chrono::NaiveDate::parse_from_str(&config.fetch.date_floor, "%Y-%m-%d")
        .map_err(|_| QuerycaseError::InvalidConfigValue {
            path: "fetch.date_floor".to_string(),
            message: format!("'{}' is not a YYYY-MM-DD date", config.fetch.date_floor),
        })?;

    let mut converted = 0usize;
    let mut skipped = 0usize;
    let mut rejected = 0usize;

    for id in storage.raw_artifact_ids()? {
        if storage.record_exists(id) {
            skipped += 1;
            continue;
        }

        let path = storage.raw_path(id);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                rejected += 1;
                continue;
            }
        };

        let kind = detect_content_kind(&bytes, None);
        let text = extractor.extract(&bytes, kind);
        if !quality::is_usable_text(&text, min_chars) {
            tracing::warn!("Skipping artifact {id}: likely error page or too short");
            rejected += 1;
            continue;
        }

        let record = DocumentRecord {
            id,
            case_name: None,
            date_filed: date_floor,
            download_url: String::new(),
            opinion_text: text,
        };
        storage.save_record(&record)?;
        converted += 1;
    }

    println!(
        "✓ Conversion complete: {} converted, {} already had records, {} rejected",
        converted, skipped, rejected
    );
    Ok(())
}

fn cmd_status(config_path: Option<std::path::PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let storage = open_storage(&config)?;

    let date_floor = chrono::NaiveDate::parse_from_str(&config.fetch.date_floor, "%Y-%m-%d")
        .map_err(|_| QuerycaseError::InvalidConfigValue {
            path: "fetch.date_floor".to_string(),
            message: format!("'{}' is not a YYYY-MM-DD date", config.fetch.date_floor),
        })?;
    let checkpoint = CheckpointStore::new(storage.checkpoint_path(), date_floor).load();

    println!("querycase status");
    println!("================");
    println!(
        "\nCheckpoint: {} (last case id {})",
        checkpoint.date_filed, checkpoint.last_case_id
    );

    let index_path = storage.index_path();
    if index_path.exists() {
        let index = FlatIndex::load(&index_path)?;
        let metadata = MetadataStore::load_or_default(&storage.metadata_path())?;
        println!(
            "Index: {} rows, {} metadata entries ({}D)",
            index.len(),
            metadata.len(),
            index.dimension()
        );
        if index.len() != metadata.len() {
            println!("⚠ Index and metadata row counts differ; the stores are desynced");
        }
    } else {
        println!("Index: not built yet");
    }

    let pending = storage.pending_record_ids()?;
    println!("Pending records (fetched, not yet indexed): {}", pending.len());

    Ok(())
}

fn cmd_config(config_path: Option<std::path::PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let toml = toml::to_string_pretty(&config)?;
            println!("{toml}");
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| QuerycaseError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            Config::load(&path)?;
            println!("✓ Configuration is valid");
        }
    }

    Ok(())
}

fn load_config(config_path: Option<std::path::PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'querycase config init' to create one."
        );
        return Ok(Config::default());
    }

    Config::load(&path)
}

fn open_storage(config: &Config) -> Result<StorageManager> {
    let data_dir = expand_path(&config.storage.data_dir)?;
    StorageManager::new(data_dir)
}

fn expand_path(path: &std::path::Path) -> Result<std::path::PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| QuerycaseError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| QuerycaseError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}
