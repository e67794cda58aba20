//! Storage seam for the nearest-neighbour structure behind `VectorIndex`.
//!
//! The index only ever addresses rows by position. Stores differ in how they
//! delete (compacting in place, rebuilding, bulk remove-by-id), so removal is
//! expressed as a single positional call and the index never depends on which
//! strategy a store uses.

use askfaq_core::AppResult;
use std::io::{Read, Write};

/// Trait for flat vector stores.
///
/// Implementations must support:
/// - Appending rows of a fixed dimension
/// - Exact k-nearest search returning `(position, distance)` pairs
/// - Removing a set of rows by position, keeping the order of the rest
/// - Serializing to and from a byte stream
pub trait VectorStore: Send + Sync {
    /// Create an empty store for vectors of `dimension` components.
    fn with_dimension(dimension: usize) -> Self
    where
        Self: Sized;

    /// Vector dimension.
    fn dimension(&self) -> usize;

    /// Number of stored rows.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append rows at the end. Either every row is appended or none is.
    fn append(&mut self, vectors: &[Vec<f32>]) -> AppResult<()>;

    /// Return up to `k` `(position, distance)` pairs, nearest first, ties
    /// ordered by position.
    fn nearest(&self, query: &[f32], k: usize) -> Vec<(usize, f32)>;

    /// Remove the rows at `positions` (any order, duplicates ignored).
    ///
    /// Returns the number of rows removed. Fails without mutating anything if
    /// a position is out of range.
    fn remove(&mut self, positions: &[usize]) -> AppResult<usize>;

    /// Borrow the row at `position`.
    fn row(&self, position: usize) -> Option<&[f32]>;

    /// Serialize the store.
    fn write_to(&self, writer: &mut dyn Write) -> AppResult<()>;

    /// Deserialize a store written by `write_to`.
    fn read_from(reader: &mut dyn Read) -> AppResult<Self>
    where
        Self: Sized;
}
