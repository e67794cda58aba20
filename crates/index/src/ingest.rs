//! Ingestion boundary.
//!
//! Turns chunk files and pre-computed embedding files into the
//! `(vector, metadata, document_id)` triples `VectorIndex::add` takes.
//! Required metadata keys are checked here, never inside the index.

use crate::shared::SharedIndex;
use crate::store::VectorStore;
use crate::types::{Metadata, RemoveReport};
use askfaq_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File extensions `discover_files` accepts.
pub const CHUNK_EXTENSIONS: [&str; 2] = ["json", "txt"];

/// One chunk of text awaiting embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub page_content: String,

    #[serde(default)]
    pub metadata: Metadata,
}

/// One pre-computed embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    #[serde(default)]
    pub id: Option<String>,

    pub embedding: Vec<f32>,

    #[serde(default)]
    pub metadata: Metadata,
}

impl EmbeddingRecord {
    /// Split into vector, metadata and document id.
    ///
    /// The document id is `metadata.doc_id`, else `id`, else a fresh UUID;
    /// whichever is chosen is written back into the metadata.
    pub fn into_entry(self) -> (Vec<f32>, Metadata, String) {
        let mut metadata = self.metadata;

        let document_id = string_field(&metadata, "doc_id")
            .map(str::to_string)
            .or(self.id.filter(|id| !id.is_empty()))
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        metadata.insert("doc_id".to_string(), Value::String(document_id.clone()));
        (self.embedding, metadata, document_id)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChunkFile {
    Many(Vec<ChunkRecord>),
    One(ChunkRecord),
}

/// Derive a stable document id from a source name.
pub fn generate_doc_id(source: &str) -> String {
    format!("{:x}", Sha256::digest(source.as_bytes()))
}

/// Fill in derived metadata for the chunk at `chunk_index` (0-based).
///
/// Requires `source`. Adds `doc_id`, `filename` and a 1-based
/// `chunk_number` when they are absent, and returns the document id.
pub fn prepare_metadata(metadata: &mut Metadata, chunk_index: usize) -> AppResult<String> {
    let source = string_field(metadata, "source")
        .ok_or_else(|| AppError::Ingest("Chunk metadata is missing 'source'".to_string()))?
        .to_string();

    if string_field(metadata, "doc_id").is_none() {
        metadata.insert("doc_id".to_string(), Value::String(generate_doc_id(&source)));
    }

    if !metadata.contains_key("filename") {
        let filename = Path::new(&source)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.clone());
        metadata.insert("filename".to_string(), Value::String(filename));
    }

    metadata
        .entry("chunk_number")
        .or_insert_with(|| Value::from(chunk_index + 1));

    validate_metadata(metadata)?;
    string_field(metadata, "doc_id")
        .map(str::to_string)
        .ok_or_else(|| AppError::Ingest("Chunk metadata is missing 'doc_id'".to_string()))
}

/// Check that `source` and `doc_id` are present as non-empty strings.
pub fn validate_metadata(metadata: &Metadata) -> AppResult<()> {
    for key in ["source", "doc_id"] {
        if string_field(metadata, key).is_none() {
            return Err(AppError::Ingest(format!(
                "Metadata field '{}' must be a non-empty string",
                key
            )));
        }
    }
    Ok(())
}

fn string_field<'a>(metadata: &'a Metadata, key: &str) -> Option<&'a str> {
    metadata
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Read the chunks in a `.json` or `.txt` file.
///
/// JSON files hold one `{page_content, metadata}` object or an array of
/// them. A text file is one chunk whose `source` is `source`.
pub fn read_chunk_file(path: &Path, source: &str) -> AppResult<Vec<ChunkRecord>> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::Ingest(format!("Failed to read {:?}: {}", path, e)))?;

    match extension(path).as_deref() {
        Some("json") => {
            let parsed: ChunkFile = serde_json::from_str(&content).map_err(|e| {
                AppError::Ingest(format!("Failed to parse chunk file {:?}: {}", path, e))
            })?;
            Ok(match parsed {
                ChunkFile::Many(chunks) => chunks,
                ChunkFile::One(chunk) => vec![chunk],
            })
        }
        Some("txt") => {
            let mut metadata = Metadata::new();
            metadata.insert("source".to_string(), Value::String(source.to_string()));
            Ok(vec![ChunkRecord {
                page_content: content,
                metadata,
            }])
        }
        _ => Err(AppError::Ingest(format!(
            "Unsupported chunk file {:?} (expected .json or .txt)",
            path
        ))),
    }
}

/// Read a JSON array of pre-computed embeddings.
pub fn read_embeddings_file(path: &Path) -> AppResult<Vec<EmbeddingRecord>> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::Ingest(format!("Failed to read {:?}: {}", path, e)))?;

    serde_json::from_str(&content)
        .map_err(|e| AppError::Ingest(format!("Failed to parse embeddings file {:?}: {}", path, e)))
}

/// Name a file by its path relative to `root`, or by its full path when it
/// lies outside `root`.
///
/// Both paths are canonicalized when possible so relative and absolute
/// spellings of the same file agree.
pub fn source_name(root: &Path, path: &Path) -> String {
    let root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    let path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

    match path.strip_prefix(&root) {
        Ok(relative) => relative
            .components()
            .map(|part| part.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

/// Expand files and directories into the sorted list of chunk files.
pub fn discover_files(paths: &[PathBuf]) -> AppResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            for entry in WalkDir::new(path).follow_links(false) {
                let entry = entry.map_err(|e| {
                    AppError::Ingest(format!("Failed to walk {:?}: {}", path, e))
                })?;
                if entry.file_type().is_file() && is_chunk_file(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        } else {
            return Err(AppError::Ingest(format!("Path does not exist: {:?}", path)));
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn is_chunk_file(path: &Path) -> bool {
    extension(path).map_or(false, |ext| CHUNK_EXTENSIONS.contains(&ext.as_str()))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

/// Parallel sequences collected before a single `add`.
#[derive(Debug, Default)]
pub struct IngestBatch {
    vectors: Vec<Vec<f32>>,
    metadata: Vec<Metadata>,
    document_ids: Vec<String>,
}

impl IngestBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one entry; its metadata must already carry `source` and `doc_id`.
    pub fn push(&mut self, vector: Vec<f32>, metadata: Metadata) -> AppResult<()> {
        validate_metadata(&metadata)?;
        let document_id = string_field(&metadata, "doc_id")
            .map(str::to_string)
            .ok_or_else(|| AppError::Ingest("Metadata is missing 'doc_id'".to_string()))?;

        self.vectors.push(vector);
        self.metadata.push(metadata);
        self.document_ids.push(document_id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Distinct document ids in first-seen order.
    pub fn unique_document_ids(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for id in &self.document_ids {
            if !seen.contains(id) {
                seen.push(id.clone());
            }
        }
        seen
    }

    pub fn into_parts(self) -> (Vec<Vec<f32>>, Vec<Metadata>, Vec<String>) {
        (self.vectors, self.metadata, self.document_ids)
    }

    /// Replace the batch's documents in `index` with the batch entries.
    pub fn replace_in<S: VectorStore>(
        self,
        index: &SharedIndex<S>,
    ) -> AppResult<(RemoveReport, usize)> {
        let (vectors, metadata, document_ids) = self.into_parts();
        index.replace_documents(&vectors, metadata, document_ids)
    }
}
