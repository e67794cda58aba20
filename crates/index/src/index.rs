//! Flat vector index with position-aligned metadata and document ids.
//!
//! The store only knows rows by position. `metadata` and `document_ids` are
//! kept as parallel sequences and every mutation updates all three together,
//! so `store.len() == metadata.len() == document_ids.len()` holds whenever a
//! call returns.

use crate::flat::FlatL2Store;
use crate::persist::{self, IndexPaths};
use crate::store::VectorStore;
use crate::types::{IndexState, IndexStats, Metadata, RemoveReport, SearchHit};
use askfaq_core::{AppError, AppResult};
use std::collections::HashSet;
use std::path::Path;

/// Borrowed view of one stored entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryRef<'a> {
    pub vector: &'a [f32],
    pub metadata: &'a Metadata,
    pub document_id: &'a str,
}

/// Vector index over a flat store.
#[derive(Debug, Clone)]
pub struct VectorIndex<S: VectorStore = FlatL2Store> {
    dimension: usize,
    /// Created lazily on the first non-empty add (or by load)
    store: Option<S>,
    metadata: Vec<Metadata>,
    document_ids: Vec<String>,
}

impl<S: VectorStore> VectorIndex<S> {
    /// Create an empty index for vectors of `dimension` components.
    pub fn new(dimension: usize) -> AppResult<Self> {
        if dimension == 0 {
            return Err(AppError::Index(
                "Index dimension must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            dimension,
            store: None,
            metadata: Vec::new(),
            document_ids: Vec::new(),
        })
    }

    /// Load the file pair at `base`, or start empty if neither file exists.
    pub fn load(base: &Path, dimension: usize) -> AppResult<Self> {
        let mut index = Self::new(dimension)?;
        let paths = IndexPaths::from_base(base);

        match persist::read_pair::<S>(&paths, dimension)? {
            Some(persisted) => {
                index.store = Some(persisted.store);
                index.metadata = persisted.metadata;
                index.document_ids = persisted.document_ids;
                tracing::info!(
                    "Loaded index from {:?}: {} entries, dimension {}",
                    paths.vectors,
                    index.len(),
                    dimension
                );
            }
            None => {
                tracing::info!(
                    "No index at {:?}, starting empty with dimension {}",
                    paths.vectors,
                    dimension
                );
            }
        }

        Ok(index)
    }

    /// Replace this index with the persisted state at `base`.
    ///
    /// On failure the in-memory index is left as it was.
    pub fn reload(&mut self, base: &Path) -> AppResult<()> {
        *self = Self::load(base, self.dimension)?;
        Ok(())
    }

    /// Persist the index to the file pair at `base`.
    pub fn save(&self, base: &Path) -> AppResult<()> {
        let paths = IndexPaths::from_base(base);
        let empty;
        let store = match &self.store {
            Some(store) => store,
            None => {
                empty = S::with_dimension(self.dimension);
                &empty
            }
        };

        persist::write_pair(&paths, store, &self.metadata, &self.document_ids)?;

        tracing::info!("Saved {} entries to {:?}", self.len(), paths.vectors);
        Ok(())
    }

    /// Append entries. The three sequences must have equal length and every
    /// vector must match the index dimension; otherwise nothing is added.
    ///
    /// Returns the number of entries added.
    pub fn add(
        &mut self,
        vectors: &[Vec<f32>],
        metadata: Vec<Metadata>,
        document_ids: Vec<String>,
    ) -> AppResult<usize> {
        self.check_batch(vectors, metadata.len(), document_ids.len())?;

        if vectors.is_empty() {
            return Ok(0);
        }

        let dimension = self.dimension;
        let store = self
            .store
            .get_or_insert_with(|| S::with_dimension(dimension));
        store.append(vectors)?;

        self.metadata.extend(metadata);
        self.document_ids.extend(document_ids);
        self.debug_check_aligned();

        tracing::debug!(
            "Added {} entries (total {})",
            vectors.len(),
            self.document_ids.len()
        );
        Ok(vectors.len())
    }

    /// Drop every entry of the documents in `document_ids`, then append the
    /// new entries. The new entries are validated before anything is removed.
    pub fn replace_documents(
        &mut self,
        vectors: &[Vec<f32>],
        metadata: Vec<Metadata>,
        document_ids: Vec<String>,
    ) -> AppResult<(RemoveReport, usize)> {
        self.check_batch(vectors, metadata.len(), document_ids.len())?;

        let mut replaced: Vec<&str> = Vec::new();
        for id in &document_ids {
            if !replaced.contains(&id.as_str()) {
                replaced.push(id);
            }
        }
        let report = self.remove_by_document_ids(&replaced)?;
        let added = self.add(vectors, metadata, document_ids)?;
        Ok((report, added))
    }

    fn check_batch(
        &self,
        vectors: &[Vec<f32>],
        metadata_len: usize,
        document_ids_len: usize,
    ) -> AppResult<()> {
        if vectors.len() != metadata_len || vectors.len() != document_ids_len {
            return Err(AppError::Index(format!(
                "add requires equal-length inputs: {} vectors, {} metadata, {} document ids",
                vectors.len(),
                metadata_len,
                document_ids_len
            )));
        }

        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }
        Ok(())
    }

    /// Return the `top_k` entries nearest to `query`, smallest squared L2
    /// distance first, ties broken by insertion order.
    ///
    /// When fewer than `top_k` entries are stored the result is padded with
    /// `SearchHit::no_match()` sentinels. An index with no entries returns an
    /// empty list, as does `top_k == 0`.
    pub fn search(&self, query: &[f32], top_k: usize) -> AppResult<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let store = match &self.store {
            Some(store) if !store.is_empty() && top_k > 0 => store,
            _ => return Ok(Vec::new()),
        };

        let mut hits: Vec<SearchHit> = store
            .nearest(query, top_k)
            .into_iter()
            .map(|(position, distance)| self.hit_at(position, distance))
            .collect();

        hits.try_reserve_exact(top_k - hits.len()).map_err(|e| {
            AppError::Index(format!("Cannot pad search results to top_k {}: {}", top_k, e))
        })?;
        hits.resize_with(top_k, SearchHit::no_match);

        tracing::debug!(
            "Search returned {} matches (requested top-{})",
            hits.iter().filter(|h| h.is_match()).count(),
            top_k
        );
        Ok(hits)
    }

    fn hit_at(&self, position: usize, distance: f32) -> SearchHit {
        match (
            self.metadata.get(position),
            self.document_ids.get(position),
        ) {
            (Some(metadata), Some(document_id)) => SearchHit {
                position: Some(position),
                distance,
                metadata: Some(metadata.clone()),
                document_id: Some(document_id.clone()),
            },
            _ => {
                tracing::warn!(
                    "Store returned position {} beyond {} metadata records",
                    position,
                    self.metadata.len()
                );
                SearchHit {
                    distance,
                    ..SearchHit::no_match()
                }
            }
        }
    }

    /// Remove every entry belonging to `document_id`.
    ///
    /// An unknown id is a no-op reported as zero removed entries.
    pub fn remove_by_document_id(&mut self, document_id: &str) -> AppResult<RemoveReport> {
        self.remove_by_document_ids(&[document_id])
    }

    /// Remove every entry belonging to any of `document_ids` in one pass.
    pub fn remove_by_document_ids<T: AsRef<str>>(
        &mut self,
        document_ids: &[T],
    ) -> AppResult<RemoveReport> {
        let targets: HashSet<&str> = document_ids.iter().map(|id| id.as_ref()).collect();
        let requested: Vec<String> = document_ids
            .iter()
            .map(|id| id.as_ref().to_string())
            .collect();

        let keep: Vec<bool> = self
            .document_ids
            .iter()
            .map(|id| !targets.contains(id.as_str()))
            .collect();
        let positions: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter(|(_, kept)| !**kept)
            .map(|(position, _)| position)
            .collect();

        if positions.is_empty() {
            tracing::info!("No entries found for document ids {:?}", requested);
            return Ok(RemoveReport {
                document_ids: requested,
                removed: 0,
            });
        }

        let store = self.store.as_mut().ok_or_else(|| {
            AppError::Index("Document ids present without a vector store".to_string())
        })?;
        let removed = store.remove(&positions)?;

        let mut flags = keep.iter();
        self.metadata.retain(|_| flags.next().copied().unwrap_or(true));
        self.document_ids.retain(|id| !targets.contains(id.as_str()));
        self.debug_check_aligned();

        tracing::info!(
            "Removed {} entries for document ids {:?} ({} remain)",
            removed,
            requested,
            self.len()
        );
        Ok(RemoveReport {
            document_ids: requested,
            removed,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.document_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn state(&self) -> IndexState {
        if self.store.is_some() {
            IndexState::Populated
        } else {
            IndexState::Empty
        }
    }

    /// Borrow the entry at `position`.
    pub fn entry(&self, position: usize) -> Option<EntryRef<'_>> {
        let vector = self.store.as_ref()?.row(position)?;
        Some(EntryRef {
            vector,
            metadata: self.metadata.get(position)?,
            document_id: self.document_ids.get(position)?,
        })
    }

    pub fn document_ids(&self) -> &[String] {
        &self.document_ids
    }

    pub fn metadata(&self) -> &[Metadata] {
        &self.metadata
    }

    pub fn stats(&self) -> IndexStats {
        let documents: HashSet<&str> = self.document_ids.iter().map(String::as_str).collect();
        IndexStats {
            dimension: self.dimension,
            entries: self.len(),
            documents: documents.len(),
            state: self.state(),
        }
    }

    fn debug_check_aligned(&self) {
        debug_assert_eq!(
            self.store.as_ref().map_or(0, |s| s.len()),
            self.metadata.len()
        );
        debug_assert_eq!(self.metadata.len(), self.document_ids.len());
    }
}
