//! Local FAQ vector index.
//!
//! A flat squared-L2 index whose metadata and document ids stay aligned with
//! the stored vectors by position, persisted as a vector file plus a JSON
//! companion, together with the ingestion pipeline that fills it.

pub mod config;
pub mod embeddings;
pub mod flat;
pub mod index;
pub mod ingest;
pub mod persist;
pub mod registry;
pub mod shared;
pub mod store;
pub mod types;


// Re-export commonly used types
pub use flat::FlatL2Store;
pub use index::VectorIndex;
pub use persist::IndexPaths;
pub use registry::ProcessedRegistry;
pub use shared::SharedIndex;
pub use store::VectorStore;
pub use types::{
    ImportStats, IndexState, IndexStats, IndexSummary, IngestOptions, IngestStats, Metadata,
    RemoveReport, SearchHit,
};

use askfaq_core::{AppConfig, AppResult};
use embeddings::{create_provider, embed_all, EmbeddingConfig, EmbeddingProvider};
use ingest::IngestBatch;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Instant;

/// Open the index selected by `config`.
///
/// An existing manifest must agree with the configured dimension and
/// embedding settings.
pub fn open_index(config: &AppConfig) -> AppResult<SharedIndex> {
    config::check_manifest(config)?;
    let base = config::get_index_base(&config.workspace, &config.index_name);
    SharedIndex::open(base, config.dimension)
}

/// Embed chunk files and add them to the index.
///
/// Files whose content hash is already registered are skipped unless
/// `options.force` is set. Re-ingesting a document replaces its entries.
/// A file that fails to read or embed is logged and counted, not fatal.
pub async fn ingest(config: &AppConfig, options: IngestOptions) -> AppResult<IngestStats> {
    let start = Instant::now();

    tracing::info!("Starting ingest into index '{}'", config.index_name);

    config::ensure_manifest(config)?;
    let index = open_index(config)?;

    let embedding_config = EmbeddingConfig::from(&config.embedding);
    let provider = create_provider(&embedding_config)?;

    let registry_path = config::get_registry_path(&config.workspace, &config.index_name);
    let mut registry = ProcessedRegistry::load(&registry_path)?;

    let files = ingest::discover_files(&options.paths)?;
    let mut stats = IngestStats::default();

    for path in &files {
        let hash = match registry::compute_file_hash(path) {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", path, e);
                stats.files_failed += 1;
                continue;
            }
        };

        if registry.is_processed(&hash) && !options.force {
            tracing::debug!("Skipping {:?}: already processed", path);
            stats.files_skipped += 1;
            continue;
        }

        let source = ingest::source_name(&config.workspace, path);
        match ingest_file(
            &index,
            provider.as_ref(),
            embedding_config.batch_size,
            path,
            &source,
        )
        .await
        {
            Ok(outcome) => {
                stats.files_ingested += 1;
                stats.chunks_added += outcome.added;
                stats.chunks_replaced += outcome.replaced;
                for id in &outcome.document_ids {
                    if !stats.document_ids.contains(id) {
                        stats.document_ids.push(id.clone());
                    }
                }
                registry.record(hash, path.clone(), outcome.document_ids);
            }
            Err(e) => {
                tracing::warn!("Failed to ingest {:?}: {}", path, e);
                stats.files_failed += 1;
            }
        }
    }

    if stats.files_ingested > 0 {
        index.save()?;
        registry.save(&registry_path)?;
    }

    stats.duration_secs = start.elapsed().as_secs_f64();

    tracing::info!(
        "Ingest completed: {} files ingested, {} skipped, {} failed, {} chunks in {:.2}s",
        stats.files_ingested,
        stats.files_skipped,
        stats.files_failed,
        stats.chunks_added,
        stats.duration_secs
    );

    Ok(stats)
}

struct FileOutcome {
    added: usize,
    replaced: usize,
    document_ids: Vec<String>,
}

async fn ingest_file(
    index: &SharedIndex,
    provider: &dyn EmbeddingProvider,
    batch_size: usize,
    path: &Path,
    source: &str,
) -> AppResult<FileOutcome> {
    tracing::debug!("Processing file: {:?}", path);

    let chunks = ingest::read_chunk_file(path, source)?;
    let mut texts = Vec::with_capacity(chunks.len());
    let mut metadata = Vec::with_capacity(chunks.len());

    for (i, chunk) in chunks.into_iter().enumerate() {
        let mut fields = chunk.metadata;
        ingest::prepare_metadata(&mut fields, i)?;
        fields
            .entry("text")
            .or_insert_with(|| Value::String(chunk.page_content.clone()));

        texts.push(chunk.page_content);
        metadata.push(fields);
    }

    let vectors = embed_all(provider, &texts, batch_size).await?;

    let mut batch = IngestBatch::new();
    for (vector, fields) in vectors.into_iter().zip(metadata) {
        batch.push(vector, fields)?;
    }

    let document_ids = batch.unique_document_ids();
    let (report, added) = batch.replace_in(index)?;

    tracing::debug!(
        "Processed {:?}: {} chunks added, {} replaced",
        path,
        added,
        report.removed
    );

    Ok(FileOutcome {
        added,
        replaced: report.removed,
        document_ids,
    })
}

/// Add pre-computed embeddings from a JSON file.
///
/// Records without a `source` are attributed to the file they came from.
pub fn import(config: &AppConfig, file: &Path) -> AppResult<ImportStats> {
    tracing::info!("Importing embeddings from {:?} into '{}'", file, config.index_name);

    config::ensure_manifest(config)?;
    let index = open_index(config)?;

    let records = ingest::read_embeddings_file(file)?;
    let fallback_source = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string_lossy().into_owned());

    let mut batch = IngestBatch::new();
    for record in records {
        let (vector, mut fields, _) = record.into_entry();
        fields
            .entry("source")
            .or_insert_with(|| Value::String(fallback_source.clone()));
        batch.push(vector, fields)?;
    }

    let records = batch.len();
    let document_ids = batch.unique_document_ids();
    let (report, _) = batch.replace_in(&index)?;
    index.save()?;

    tracing::info!(
        "Imported {} records for {} documents ({} entries replaced)",
        records,
        document_ids.len(),
        report.removed
    );

    Ok(ImportStats {
        records,
        document_ids,
        chunks_replaced: report.removed,
    })
}

/// Embed `query` and return the `top_k` nearest entries.
pub async fn search(config: &AppConfig, query: &str, top_k: usize) -> AppResult<Vec<SearchHit>> {
    tracing::info!(
        "Searching index '{}' (top-{}) for: {}",
        config.index_name,
        top_k,
        query
    );

    let index = open_index(config)?;
    let provider = create_provider(&EmbeddingConfig::from(&config.embedding))?;
    let vector = provider.embed(query).await?;

    let hits = index.search(&vector, top_k)?;

    tracing::info!(
        "Found {} matches in '{}'",
        hits.iter().filter(|h| h.is_match()).count(),
        config.index_name
    );
    Ok(hits)
}

/// Remove documents from the index and forget them in the registry.
pub fn remove(config: &AppConfig, document_ids: &[String]) -> AppResult<RemoveReport> {
    let index = open_index(config)?;
    let report = index.remove_by_document_ids(document_ids)?;

    if !report.is_noop() {
        index.save()?;
    }

    let registry_path = config::get_registry_path(&config.workspace, &config.index_name);
    let mut registry = ProcessedRegistry::load(&registry_path)?;
    let forgotten: usize = document_ids
        .iter()
        .map(|id| registry.forget_document(id))
        .sum();
    if forgotten > 0 {
        registry.save(&registry_path)?;
    }

    tracing::info!(
        "Removed {} entries for {} document ids ({} registry records updated)",
        report.removed,
        document_ids.len(),
        forgotten
    );
    Ok(report)
}

/// Get statistics for the index selected by `config`.
pub fn stats(config: &AppConfig) -> AppResult<IndexSummary> {
    tracing::info!("Getting stats for index '{}'", config.index_name);

    let index = open_index(config)?;
    let registry_path = config::get_registry_path(&config.workspace, &config.index_name);
    let registry = ProcessedRegistry::load(&registry_path)?;

    let paths = IndexPaths::from_base(index.base());
    let size_bytes = [&paths.vectors, &paths.companion]
        .iter()
        .filter_map(|path| fs::metadata(path).ok())
        .map(|meta| meta.len())
        .sum();

    Ok(IndexSummary {
        index_name: config.index_name.clone(),
        stats: index.stats()?,
        processed_files: registry.len(),
        size_bytes,
    })
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;
    use askfaq_core::config::EmbeddingSettings;
    use askfaq_core::AppError;
    use tempfile::TempDir;

    fn config_in(workspace: &Path) -> AppConfig {
        AppConfig {
            workspace: workspace.to_path_buf(),
            index_name: "test".to_string(),
            dimension: 64,
            embedding: EmbeddingSettings {
                dimensions: 64,
                ..EmbeddingSettings::default()
            },
            ..AppConfig::default()
        }
    }

    fn write_docs(dir: &Path) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join("shipping.txt"),
            "Orders ship within two business days from our warehouse.",
        )
        .unwrap();
        fs::write(
            dir.join("accounts.json"),
            r#"[
                {"page_content": "Reset your password from the login page.",
                 "metadata": {"source": "accounts.md", "doc_id": "accounts"}},
                {"page_content": "Delete your account under settings.",
                 "metadata": {"source": "accounts.md", "doc_id": "accounts"}}
            ]"#,
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_ingest_search_remove() {
        let temp = TempDir::new().unwrap();
        let docs = temp.path().join("docs");
        write_docs(&docs);
        let config = config_in(temp.path());

        let options = IngestOptions {
            paths: vec![docs.clone()],
            force: false,
        };
        let ingested = ingest(&config, options.clone()).await.unwrap();
        assert_eq!(ingested.files_ingested, 2);
        assert_eq!(ingested.chunks_added, 3);
        assert_eq!(ingested.files_failed, 0);

        let again = ingest(&config, options).await.unwrap();
        assert_eq!(again.files_skipped, 2);
        assert_eq!(again.chunks_added, 0);

        let hits = search(&config, "how do I reset my password", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document_id.as_deref(), Some("accounts"));

        let report = remove(&config, &["accounts".to_string()]).unwrap();
        assert_eq!(report.removed, 2);

        let summary = stats(&config).unwrap();
        assert_eq!(summary.stats.entries, 1);
        assert_eq!(summary.processed_files, 1);
        assert!(summary.size_bytes > 0);
    }

    #[tokio::test]
    async fn test_forced_reingest_replaces_entries() {
        let temp = TempDir::new().unwrap();
        let docs = temp.path().join("docs");
        write_docs(&docs);
        let config = config_in(temp.path());

        let options = IngestOptions {
            paths: vec![docs],
            force: true,
        };
        ingest(&config, options.clone()).await.unwrap();
        let reingested = ingest(&config, options).await.unwrap();

        assert_eq!(reingested.chunks_replaced, 3);
        assert_eq!(open_index(&config).unwrap().len().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_bad_file_is_counted_not_fatal() {
        let temp = TempDir::new().unwrap();
        let docs = temp.path().join("docs");
        write_docs(&docs);
        fs::write(docs.join("broken.json"), "{not json").unwrap();
        let config = config_in(temp.path());

        let ingested = ingest(
            &config,
            IngestOptions {
                paths: vec![docs],
                force: false,
            },
        )
        .await
        .unwrap();
        assert_eq!(ingested.files_ingested, 2);
        assert_eq!(ingested.files_failed, 1);
    }

    #[tokio::test]
    async fn test_same_file_name_in_different_directories() {
        let temp = TempDir::new().unwrap();
        let docs = temp.path().join("docs");
        for (dir, text) in [
            ("admissions", "Applications close on the first of March."),
            ("housing", "Dorm rooms are assigned in August."),
        ] {
            fs::create_dir_all(docs.join(dir)).unwrap();
            fs::write(docs.join(dir).join("faq.txt"), text).unwrap();
        }
        let config = config_in(temp.path());

        let ingested = ingest(
            &config,
            IngestOptions {
                paths: vec![docs],
                force: false,
            },
        )
        .await
        .unwrap();
        assert_eq!(ingested.files_ingested, 2);
        assert_eq!(ingested.chunks_added, 2);
        assert_eq!(ingested.chunks_replaced, 0);
        assert_eq!(ingested.document_ids.len(), 2);

        let index = open_index(&config).unwrap();
        assert_eq!(index.len().unwrap(), 2);
        let sources: Vec<Value> = index
            .with_read(|index| {
                index
                    .metadata()
                    .iter()
                    .map(|meta| meta["source"].clone())
                    .collect()
            })
            .unwrap();
        assert_eq!(
            sources,
            vec![
                Value::from("docs/admissions/faq.txt"),
                Value::from("docs/housing/faq.txt")
            ]
        );
    }

    #[tokio::test]
    async fn test_edited_file_keeps_one_registry_record() {
        let temp = TempDir::new().unwrap();
        let docs = temp.path().join("docs");
        write_docs(&docs);
        let config = config_in(temp.path());
        let options = IngestOptions {
            paths: vec![docs.clone()],
            force: false,
        };

        ingest(&config, options.clone()).await.unwrap();
        fs::write(
            docs.join("shipping.txt"),
            "Orders ship within one business day.",
        )
        .unwrap();
        let second = ingest(&config, options).await.unwrap();
        assert_eq!(second.files_ingested, 1);
        assert_eq!(second.files_skipped, 1);
        assert_eq!(second.chunks_replaced, 1);

        let summary = stats(&config).unwrap();
        assert_eq!(summary.processed_files, 2);
        assert_eq!(summary.stats.entries, 3);
    }

    #[test]
    fn test_import_embeddings() {
        let temp = TempDir::new().unwrap();
        let mut config = config_in(temp.path());
        config.dimension = 2;
        config.embedding.dimensions = 2;

        let file = temp.path().join("embeddings.json");
        fs::write(
            &file,
            r#"[
                {"id": "q1", "embedding": [1.0, 0.0], "metadata": {"doc_id": "faq"}},
                {"id": "q2", "embedding": [0.0, 1.0], "metadata": {"doc_id": "faq"}},
                {"id": "q3", "embedding": [1.0, 1.0]}
            ]"#,
        )
        .unwrap();

        let imported = import(&config, &file).unwrap();
        assert_eq!(imported.records, 3);
        assert_eq!(imported.document_ids, vec!["faq", "q3"]);

        let index = open_index(&config).unwrap();
        let hits = index.search(&[1.0, 1.0], 1).unwrap();
        let meta = hits[0].metadata.as_ref().unwrap();
        assert_eq!(meta["source"], serde_json::json!("embeddings.json"));

        // Importing the same file again replaces rather than duplicates
        let again = import(&config, &file).unwrap();
        assert_eq!(again.chunks_replaced, 3);
        assert_eq!(index.len().unwrap(), 3);
        index.reload().unwrap();
        assert_eq!(index.len().unwrap(), 3);
    }

    #[test]
    fn test_changed_dimension_is_refused() {
        let temp = TempDir::new().unwrap();
        let mut config = config_in(temp.path());
        config.dimension = 2;
        config.embedding.dimensions = 2;

        let file = temp.path().join("embeddings.json");
        fs::write(&file, r#"[{"id": "q1", "embedding": [1.0, 0.0]}]"#).unwrap();
        import(&config, &file).unwrap();

        config.dimension = 3;
        config.embedding.dimensions = 3;
        assert!(matches!(
            open_index(&config),
            Err(AppError::DimensionMismatch { .. })
        ));
    }
}
