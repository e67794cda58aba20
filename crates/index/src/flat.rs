//! Flat (brute-force) squared-L2 store.
//!
//! Rows live in one contiguous row-major buffer. Search scans every row;
//! removal compacts the buffer in a single pass.

use crate::store::VectorStore;
use askfaq_core::{AppError, AppResult};
use std::cmp::Ordering;
use std::io::{ErrorKind, Read, Write};

/// Magic bytes at the start of a persisted flat store.
pub const FLAT_MAGIC: &[u8; 8] = b"AFQFLAT1";

/// On-disk format version.
pub const FLAT_FORMAT_VERSION: u32 = 1;

/// Exact nearest-neighbour store using squared Euclidean distance.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Store {
    dimension: usize,
    /// [v0_d0, v0_d1, ..., v0_dn, v1_d0, ...]
    data: Vec<f32>,
}

impl FlatL2Store {
    fn compare(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
        a.1.total_cmp(&b.1).then(a.0.cmp(&b.0))
    }

    fn check_dimension(&self, vector: &[f32]) -> AppResult<()> {
        if vector.len() != self.dimension {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl VectorStore for FlatL2Store {
    fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    fn append(&mut self, vectors: &[Vec<f32>]) -> AppResult<()> {
        for vector in vectors {
            self.check_dimension(vector)?;
        }

        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    fn nearest(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if k == 0 || self.dimension == 0 || query.len() != self.dimension {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, row)| (position, l2_squared(query, row)))
            .collect();

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, Self::compare);
            scored.truncate(k);
        }
        scored.sort_unstable_by(Self::compare);
        scored
    }

    fn remove(&mut self, positions: &[usize]) -> AppResult<usize> {
        let len = self.len();
        let mut targets = positions.to_vec();
        targets.sort_unstable();
        targets.dedup();

        if let Some(&last) = targets.last() {
            if last >= len {
                return Err(AppError::Index(format!(
                    "Cannot remove position {} from store of {} rows",
                    last, len
                )));
            }
        }
        if targets.is_empty() {
            return Ok(0);
        }

        let mut kept = Vec::with_capacity((len - targets.len()) * self.dimension);
        let mut doomed = targets.iter().copied().peekable();
        for (position, row) in self.data.chunks_exact(self.dimension).enumerate() {
            if doomed.peek() == Some(&position) {
                doomed.next();
                continue;
            }
            kept.extend_from_slice(row);
        }
        self.data = kept;

        Ok(targets.len())
    }

    fn row(&self, position: usize) -> Option<&[f32]> {
        if position >= self.len() {
            return None;
        }
        let start = position * self.dimension;
        self.data.get(start..start + self.dimension)
    }

    fn write_to(&self, writer: &mut dyn Write) -> AppResult<()> {
        let dimension = u32::try_from(self.dimension).map_err(|_| {
            AppError::Index(format!("Dimension {} does not fit the file format", self.dimension))
        })?;

        writer.write_all(FLAT_MAGIC)?;
        writer.write_all(&FLAT_FORMAT_VERSION.to_le_bytes())?;
        writer.write_all(&dimension.to_le_bytes())?;
        writer.write_all(&(self.len() as u64).to_le_bytes())?;
        writer.write_all(&vectors_to_bytes(&self.data))?;
        Ok(())
    }

    fn read_from(reader: &mut dyn Read) -> AppResult<Self> {
        let mut magic = [0u8; 8];
        read_exact(reader, &mut magic, "header")?;
        if &magic != FLAT_MAGIC {
            return Err(AppError::PersistenceInconsistency(
                "Vector file has an unknown format (bad magic)".to_string(),
            ));
        }

        let mut word = [0u8; 4];
        read_exact(reader, &mut word, "version")?;
        let version = u32::from_le_bytes(word);
        if version != FLAT_FORMAT_VERSION {
            return Err(AppError::PersistenceInconsistency(format!(
                "Unsupported vector file version: {}",
                version
            )));
        }

        read_exact(reader, &mut word, "dimension")?;
        let dimension = u32::from_le_bytes(word) as usize;

        let mut long = [0u8; 8];
        read_exact(reader, &mut long, "row count")?;
        let count = u64::from_le_bytes(long);

        let byte_len = usize::try_from(count)
            .ok()
            .and_then(|c| c.checked_mul(dimension))
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| {
                AppError::PersistenceInconsistency(format!(
                    "Vector file declares an impossible size ({} rows of {})",
                    count, dimension
                ))
            })?;

        let mut bytes = Vec::new();
        reader.take(byte_len as u64).read_to_end(&mut bytes)?;
        if bytes.len() != byte_len {
            return Err(AppError::PersistenceInconsistency(format!(
                "Vector file truncated: header declares {} rows of {} but holds {} bytes of data",
                count,
                dimension,
                bytes.len()
            )));
        }

        Ok(Self {
            dimension,
            data: bytes_to_vectors(&bytes),
        })
    }
}

/// Squared Euclidean distance.
pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

fn read_exact(reader: &mut dyn Read, buf: &mut [u8], what: &str) -> AppResult<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            AppError::PersistenceInconsistency(format!("Vector file truncated while reading {}", what))
        } else {
            AppError::Io(e)
        }
    })
}

fn vectors_to_bytes(values: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for &value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn bytes_to_vectors(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
