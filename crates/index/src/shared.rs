//! Shared handle for hosts that serve several callers at once.
//!
//! Mutations (`add`, removals, `save`, `reload`) take the write lock; searches
//! and statistics take the read lock, so no search ever observes the parallel
//! sequences mid-update.

use crate::flat::FlatL2Store;
use crate::index::VectorIndex;
use crate::store::VectorStore;
use crate::types::{IndexStats, Metadata, RemoveReport, SearchHit};
use askfaq_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Cloneable handle to one `VectorIndex` and the base path it persists to.
pub struct SharedIndex<S: VectorStore = FlatL2Store> {
    inner: Arc<RwLock<VectorIndex<S>>>,
    base: Arc<PathBuf>,
}

impl<S: VectorStore> Clone for SharedIndex<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            base: Arc::clone(&self.base),
        }
    }
}

impl<S: VectorStore> SharedIndex<S> {
    /// Load the index at `base` (or start empty) and wrap it.
    pub fn open(base: impl Into<PathBuf>, dimension: usize) -> AppResult<Self> {
        let base = base.into();
        let index = VectorIndex::load(&base, dimension)?;
        Ok(Self::from_index(index, base))
    }

    /// Wrap an existing index that persists to `base`.
    pub fn from_index(index: VectorIndex<S>, base: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(index)),
            base: Arc::new(base.into()),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn add(
        &self,
        vectors: &[Vec<f32>],
        metadata: Vec<Metadata>,
        document_ids: Vec<String>,
    ) -> AppResult<usize> {
        self.write()?.add(vectors, metadata, document_ids)
    }

    pub fn replace_documents(
        &self,
        vectors: &[Vec<f32>],
        metadata: Vec<Metadata>,
        document_ids: Vec<String>,
    ) -> AppResult<(RemoveReport, usize)> {
        self.write()?.replace_documents(vectors, metadata, document_ids)
    }

    pub fn search(&self, query: &[f32], top_k: usize) -> AppResult<Vec<SearchHit>> {
        self.read()?.search(query, top_k)
    }

    pub fn remove_by_document_id(&self, document_id: &str) -> AppResult<RemoveReport> {
        self.write()?.remove_by_document_id(document_id)
    }

    pub fn remove_by_document_ids<T: AsRef<str>>(
        &self,
        document_ids: &[T],
    ) -> AppResult<RemoveReport> {
        self.write()?.remove_by_document_ids(document_ids)
    }

    /// Persist to the handle's base path.
    ///
    /// Holds the write lock so no mutation interleaves with the write.
    pub fn save(&self) -> AppResult<()> {
        self.write()?.save(&self.base)
    }

    /// Replace the in-memory index with what is on disk.
    pub fn reload(&self) -> AppResult<()> {
        self.write()?.reload(&self.base)
    }

    pub fn stats(&self) -> AppResult<IndexStats> {
        Ok(self.read()?.stats())
    }

    pub fn len(&self) -> AppResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> AppResult<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Run `f` with shared access to the index.
    pub fn with_read<R>(&self, f: impl FnOnce(&VectorIndex<S>) -> R) -> AppResult<R> {
        let guard = self.read()?;
        Ok(f(&guard))
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, VectorIndex<S>>> {
        self.inner
            .read()
            .map_err(|_| AppError::Index("Index lock poisoned".to_string()))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, VectorIndex<S>>> {
        self.inner
            .write()
            .map_err(|_| AppError::Index("Index lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread;
    use tempfile::TempDir;

    fn meta(doc: &str) -> Metadata {
        let mut m = Metadata::new();
        m.insert("doc_id".to_string(), json!(doc));
        m
    }

    #[test]
    fn test_open_save_reload() {
        let temp = TempDir::new().unwrap();
        let shared: SharedIndex = SharedIndex::open(temp.path().join("faq"), 2).unwrap();

        shared
            .add(&[vec![1.0, 0.0]], vec![meta("a")], vec!["a".to_string()])
            .unwrap();
        shared.save().unwrap();

        shared.remove_by_document_id("a").unwrap();
        assert_eq!(shared.len().unwrap(), 0);

        shared.reload().unwrap();
        assert_eq!(shared.len().unwrap(), 1);
    }

    #[test]
    fn test_concurrent_writers_and_readers_stay_aligned() {
        let shared: SharedIndex = SharedIndex::from_index(VectorIndex::new(2).unwrap(), "unused");

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let handle = shared.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        let doc = format!("doc-{}-{}", w, i % 5);
                        handle
                            .add(&[vec![w as f32, i as f32]], vec![meta(&doc)], vec![doc.clone()])
                            .unwrap();
                        if i % 7 == 0 {
                            handle.remove_by_document_id(&doc).unwrap();
                        }
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..2)
            .map(|_| {
                let handle = shared.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        let hits = handle.search(&[0.0, 0.0], 3).unwrap();
                        for hit in hits.iter().filter(|h| h.is_match()) {
                            let meta = hit.metadata.as_ref().unwrap();
                            assert_eq!(
                                meta.get("doc_id").and_then(|v| v.as_str()),
                                hit.document_id.as_deref()
                            );
                        }
                    }
                })
            })
            .collect();

        for t in writers.into_iter().chain(readers) {
            t.join().unwrap();
        }

        shared
            .with_read(|index| {
                assert_eq!(index.metadata().len(), index.document_ids().len());
                for (meta, id) in index.metadata().iter().zip(index.document_ids()) {
                    assert_eq!(meta.get("doc_id").and_then(|v| v.as_str()), Some(id.as_str()));
                }
            })
            .unwrap();
    }
}
