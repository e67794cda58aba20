//! Index type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Opaque provenance record attached to every entry (source, chunk number,
/// original text, filename, ...).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// One result slot returned by a k-NN search.
///
/// Slots past the number of stored entries are sentinels: `position` and
/// `metadata` are `None` and `distance` is `f32::MAX`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Position of the entry at search time (not stable across removals)
    pub position: Option<usize>,

    /// Squared L2 distance to the query
    pub distance: f32,

    /// Metadata of the matched entry
    pub metadata: Option<Metadata>,

    /// Document the matched entry belongs to
    pub document_id: Option<String>,
}

impl SearchHit {
    /// Sentinel for a slot with no matching entry.
    pub fn no_match() -> Self {
        Self {
            position: None,
            distance: f32::MAX,
            metadata: None,
            document_id: None,
        }
    }

    /// Whether this slot refers to a stored entry.
    pub fn is_match(&self) -> bool {
        self.position.is_some()
    }
}

/// Lifecycle state of a `VectorIndex`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexState {
    /// Nothing has been added (or loaded) yet
    Empty,

    /// The underlying store exists, possibly with zero entries after removals
    Populated,
}

/// Statistics for an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub dimension: usize,
    pub entries: usize,

    /// Distinct document ids
    pub documents: usize,

    pub state: IndexState,
}

/// Outcome of a removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveReport {
    /// Document ids that were requested for removal
    pub document_ids: Vec<String>,

    /// Number of entries removed (zero when nothing matched)
    pub removed: usize,
}

impl RemoveReport {
    pub fn is_noop(&self) -> bool {
        self.removed == 0
    }
}

/// Options for ingesting chunk files.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Files or directories to ingest
    pub paths: Vec<PathBuf>,

    /// Re-embed files already recorded in the registry
    pub force: bool,
}

/// Outcome of an ingest run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestStats {
    pub files_ingested: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub chunks_added: usize,

    /// Entries dropped because their documents were re-ingested
    pub chunks_replaced: usize,

    pub document_ids: Vec<String>,
    pub duration_secs: f64,
}

/// Outcome of importing pre-computed embeddings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportStats {
    pub records: usize,
    pub document_ids: Vec<String>,
    pub chunks_replaced: usize,
}

/// Statistics for a named index and its workspace files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSummary {
    pub index_name: String,

    #[serde(flatten)]
    pub stats: IndexStats,

    /// Files recorded in the processed-file registry
    pub processed_files: usize,

    /// Size of the vector file plus its companion
    pub size_bytes: u64,
}
