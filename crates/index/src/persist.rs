//! Persistence of an index as a file pair.
//!
//! A base path `P` maps to `P.index` (the serialized vector store) and
//! `P.json` (metadata and document ids in position order). Both files are
//! written to `.tmp` siblings first and renamed into place only after both
//! writes are synced. The companion records the row count and the SHA-256 of
//! the vector file, so a pair torn by a crash between the two renames is
//! refused on load.

use crate::store::VectorStore;
use crate::types::Metadata;
use askfaq_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Locations of the two files that make up a persisted index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPaths {
    pub vectors: PathBuf,
    pub companion: PathBuf,
}

impl IndexPaths {
    /// Derive the file pair from a base path (`faq` -> `faq.index`, `faq.json`).
    pub fn from_base(base: &Path) -> Self {
        Self {
            vectors: with_suffix(base, "index"),
            companion: with_suffix(base, "json"),
        }
    }

    /// Whether either file of the pair exists.
    pub fn any_exists(&self) -> bool {
        self.vectors.exists() || self.companion.exists()
    }
}

/// Companion file contents as read from disk.
///
/// Only `metadata` and `document_ids` are required; the remaining fields are
/// checked when present. `saved_at` is informational and not read back.
#[derive(Debug, Clone, Deserialize)]
struct Companion {
    #[serde(default)]
    dimension: Option<usize>,

    #[serde(default)]
    count: Option<usize>,

    #[serde(default)]
    vectors_sha256: Option<String>,

    metadata: Vec<Metadata>,
    document_ids: Vec<String>,
}

/// Companion file contents as written, borrowing from the index.
#[derive(Serialize)]
struct CompanionRef<'a> {
    dimension: usize,
    count: usize,
    vectors_sha256: String,
    saved_at: DateTime<Utc>,
    metadata: &'a [Metadata],
    document_ids: &'a [String],
}

/// Contents recovered from a file pair.
pub struct Persisted<S> {
    pub store: S,
    pub metadata: Vec<Metadata>,
    pub document_ids: Vec<String>,
}

/// Write the vector store and its companion sequences.
///
/// Fails without touching the existing pair if either temporary write fails.
pub fn write_pair<S: VectorStore>(
    paths: &IndexPaths,
    store: &S,
    metadata: &[Metadata],
    document_ids: &[String],
) -> AppResult<()> {
    if store.len() != metadata.len() || metadata.len() != document_ids.len() {
        return Err(AppError::PersistenceInconsistency(format!(
            "Refusing to save misaligned index: {} vectors, {} metadata, {} document ids",
            store.len(),
            metadata.len(),
            document_ids.len()
        )));
    }

    if let Some(parent) = paths.vectors.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut vector_bytes = Vec::new();
    store.write_to(&mut vector_bytes)?;

    let companion = CompanionRef {
        dimension: store.dimension(),
        count: store.len(),
        vectors_sha256: sha256_hex(&vector_bytes),
        saved_at: Utc::now(),
        metadata,
        document_ids,
    };
    let companion_bytes = serde_json::to_vec_pretty(&companion)?;

    let vectors_tmp = with_suffix(&paths.vectors, "tmp");
    let companion_tmp = with_suffix(&paths.companion, "tmp");

    let staged = write_synced(&vectors_tmp, &vector_bytes)
        .and_then(|_| write_synced(&companion_tmp, &companion_bytes));
    if let Err(e) = staged {
        discard(&vectors_tmp);
        discard(&companion_tmp);
        return Err(e);
    }

    fs::rename(&companion_tmp, &paths.companion).inspect_err(|_| {
        discard(&vectors_tmp);
        discard(&companion_tmp);
    })?;
    fs::rename(&vectors_tmp, &paths.vectors).inspect_err(|_| discard(&vectors_tmp))?;

    tracing::debug!(
        "Wrote {} rows to {:?} and {:?}",
        store.len(),
        paths.vectors,
        paths.companion
    );
    Ok(())
}

/// Read a file pair.
///
/// Returns `None` when neither file exists. A lone file, a checksum or count
/// disagreement, or a malformed file is a `PersistenceInconsistency`; a
/// stored dimension other than `dimension` is a `DimensionMismatch`.
pub fn read_pair<S: VectorStore>(
    paths: &IndexPaths,
    dimension: usize,
) -> AppResult<Option<Persisted<S>>> {
    match (paths.vectors.exists(), paths.companion.exists()) {
        (false, false) => return Ok(None),
        (true, false) => {
            return Err(AppError::PersistenceInconsistency(format!(
                "Vector file {:?} exists but companion {:?} is missing",
                paths.vectors, paths.companion
            )))
        }
        (false, true) => {
            return Err(AppError::PersistenceInconsistency(format!(
                "Companion {:?} exists but vector file {:?} is missing",
                paths.companion, paths.vectors
            )))
        }
        (true, true) => {}
    }

    let vector_bytes = fs::read(&paths.vectors)?;
    let companion_text = fs::read_to_string(&paths.companion)?;
    let companion: Companion = serde_json::from_str(&companion_text).map_err(|e| {
        AppError::PersistenceInconsistency(format!(
            "Companion {:?} is malformed: {}",
            paths.companion, e
        ))
    })?;

    if let Some(expected) = &companion.vectors_sha256 {
        let actual = sha256_hex(&vector_bytes);
        if *expected != actual {
            return Err(AppError::PersistenceInconsistency(format!(
                "Vector file {:?} does not match the checksum recorded in {:?}",
                paths.vectors, paths.companion
            )));
        }
    }

    let store = S::read_from(&mut vector_bytes.as_slice())?;

    if store.dimension() != dimension {
        return Err(AppError::DimensionMismatch {
            expected: dimension,
            actual: store.dimension(),
        });
    }

    if let Some(recorded) = companion.dimension {
        if recorded != store.dimension() {
            return Err(AppError::PersistenceInconsistency(format!(
                "Companion records dimension {} but vector file has {}",
                recorded,
                store.dimension()
            )));
        }
    }

    let rows = store.len();
    let counts_agree = companion.metadata.len() == rows
        && companion.document_ids.len() == rows
        && companion.count.map_or(true, |count| count == rows);
    if !counts_agree {
        return Err(AppError::PersistenceInconsistency(format!(
            "Vector file has {} rows but companion has {} metadata and {} document ids",
            rows,
            companion.metadata.len(),
            companion.document_ids.len()
        )));
    }

    Ok(Some(Persisted {
        store,
        metadata: companion.metadata,
        document_ids: companion.document_ids,
    }))
}

fn write_synced(path: &Path, bytes: &[u8]) -> AppResult<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove temporary file {:?}: {}", path, e);
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
