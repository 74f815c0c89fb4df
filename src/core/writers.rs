//! Batch archive assembly format and compressed npz persistence.
//!
//! One archive holds up to `batch_size` packed samples:
//! - `X` (f64, batch x m x 3), `Y` (i64, batch x m), `M` (bool, batch x m)
//! - `sizes` (u64): the padded per-level node counts
//! - per pyramid level `l`: `G{l}_rows` / `G{l}_cols` / `G{l}_vals` /
//!   `G{l}_ptr` — concatenated COO triplets with per-sample offsets
//! - per level `l` and Chebyshev order `k`: `C{l}_{k}_*` in the same layout
//!
//! The COO-plus-offsets layout exists because npz cannot hold ragged sparse
//! objects; `ptr[i]..ptr[i + 1]` selects sample `i`'s entries.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use ndarray::{Array1, Array2, Array3};
use ndarray_npy::{NpzWriter, WriteNpzError};
use sprs::CsMat;
use thiserror::Error;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create the archive file.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// npz serialization error.
    #[error("npz write error for '{path}': {source}")]
    Npz {
        path: String,
        #[source]
        source: WriteNpzError,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Concatenated sparse COO storage for one field across a batch.
#[derive(Debug, Clone)]
pub struct SparseLevel {
    /// Node count of this level (matrices are size x size).
    pub size: usize,
    pub rows: Vec<u32>,
    pub cols: Vec<u32>,
    pub vals: Vec<f64>,
    /// Per-sample offsets into the triplet arrays, length batch + 1.
    pub ptr: Vec<u64>,
}

impl SparseLevel {
    /// Creates empty storage for matrices of the given size.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            rows: Vec::new(),
            cols: Vec::new(),
            vals: Vec::new(),
            ptr: vec![0],
        }
    }

    /// Appends one sample's matrix.
    pub fn push(&mut self, m: &CsMat<f64>) {
        debug_assert_eq!(m.rows(), self.size);
        for (&v, (i, j)) in m.iter() {
            self.rows.push(i as u32);
            self.cols.push(j as u32);
            self.vals.push(v);
        }
        self.ptr.push(self.rows.len() as u64);
    }

    /// Number of samples appended so far.
    pub fn batch_len(&self) -> usize {
        self.ptr.len() - 1
    }
}

/// Fully assembled batch, ready to persist.
#[derive(Debug, Clone)]
pub struct BatchArchive {
    pub points: Array3<f64>,
    pub labels: Array2<i64>,
    pub mask: Array2<bool>,
    /// Padded node count per pyramid level.
    pub sizes: Vec<u64>,
    /// Pyramid adjacency per level.
    pub graphs: Vec<SparseLevel>,
    /// Chebyshev basis per level, per polynomial order.
    pub bases: Vec<Vec<SparseLevel>>,
}

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

fn add_sparse(
    npz: &mut NpzWriter<BufWriter<File>>,
    prefix: &str,
    level: &SparseLevel,
    path_str: &str,
) -> Result<()> {
    let named = |suffix: &str| format!("{}_{}", prefix, suffix);
    let wrap = |source| WriteError::Npz {
        path: path_str.to_string(),
        source,
    };

    npz.add_array(named("rows"), &Array1::from(level.rows.clone()))
        .map_err(wrap)?;
    npz.add_array(named("cols"), &Array1::from(level.cols.clone()))
        .map_err(wrap)?;
    npz.add_array(named("vals"), &Array1::from(level.vals.clone()))
        .map_err(wrap)?;
    npz.add_array(named("ptr"), &Array1::from(level.ptr.clone()))
        .map_err(wrap)?;
    Ok(())
}

/// Write one batch archive as a compressed npz file.
///
/// The file is only created once the batch is fully assembled, so an aborted
/// run never leaves a partially written batch behind.
pub fn write_batch_npz(path: &Path, batch: &BatchArchive) -> Result<()> {
    ensure_parent_dirs(path)?;

    let path_str = path.display().to_string();
    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path_str.clone(),
        source: e,
    })?;
    let mut npz = NpzWriter::new_compressed(BufWriter::new(file));

    let wrap = |source| WriteError::Npz {
        path: path_str.clone(),
        source,
    };

    npz.add_array("X", &batch.points).map_err(wrap)?;
    npz.add_array("Y", &batch.labels).map_err(wrap)?;
    npz.add_array("M", &batch.mask).map_err(wrap)?;
    npz.add_array("sizes", &Array1::from(batch.sizes.clone()))
        .map_err(wrap)?;

    for (l, level) in batch.graphs.iter().enumerate() {
        add_sparse(&mut npz, &format!("G{}", l), level, &path_str)?;
    }
    for (l, orders) in batch.bases.iter().enumerate() {
        for (k, level) in orders.iter().enumerate() {
            add_sparse(&mut npz, &format!("C{}_{}", l, k), level, &path_str)?;
        }
    }

    npz.finish().map_err(|e| WriteError::Npz {
        path: path_str,
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::TriMat;
    use tempfile::tempdir;

    fn tiny_matrix(n: usize, entries: &[(usize, usize, f64)]) -> CsMat<f64> {
        let mut tri = TriMat::new((n, n));
        for &(i, j, v) in entries {
            tri.add_triplet(i, j, v);
        }
        tri.to_csr()
    }

    fn tiny_batch() -> BatchArchive {
        let mut level0 = SparseLevel::new(4);
        level0.push(&tiny_matrix(4, &[(0, 1, 1.0), (1, 0, 1.0)]));
        level0.push(&tiny_matrix(4, &[(2, 3, 0.5), (3, 2, 0.5)]));

        let mut level1 = SparseLevel::new(2);
        level1.push(&tiny_matrix(2, &[]));
        level1.push(&tiny_matrix(2, &[(0, 1, 2.0)]));

        let mut basis0 = SparseLevel::new(4);
        basis0.push(&CsMat::eye(4));
        basis0.push(&CsMat::eye(4));

        BatchArchive {
            points: Array3::zeros((2, 4, 3)),
            labels: Array2::zeros((2, 4)),
            mask: Array2::from_elem((2, 4), false),
            sizes: vec![4, 2],
            graphs: vec![level0, level1],
            bases: vec![vec![basis0]],
        }
    }

    #[test]
    fn test_sparse_level_offsets() {
        let mut level = SparseLevel::new(4);
        level.push(&tiny_matrix(4, &[(0, 1, 1.0), (1, 0, 1.0)]));
        level.push(&tiny_matrix(4, &[]));
        level.push(&tiny_matrix(4, &[(3, 3, 9.0)]));

        assert_eq!(level.batch_len(), 3);
        assert_eq!(level.ptr, vec![0, 2, 2, 3]);
        assert_eq!(level.vals, vec![1.0, 1.0, 9.0]);
        assert_eq!(level.rows, vec![0, 1, 3]);
    }

    #[test]
    fn test_write_batch_npz() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0.npz");

        write_batch_npz(&path, &tiny_batch()).unwrap();

        let meta = fs::metadata(&path).unwrap();
        assert!(meta.len() > 0);
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Chair").join("0.npz");

        write_batch_npz(&path, &tiny_batch()).unwrap();
        assert!(path.exists());
    }
}
