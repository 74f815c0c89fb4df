//! Fixed-size packing of permuted samples.
//!
//! Downstream training wants every sample at the same shape: `max_points`
//! finest-level nodes with the pyramid halving at each level. This module
//! pads tree-ordered points, labels, and adjacencies up to those targets,
//! derives the real-node mask, and rejects samples that cannot fit.

use ndarray::{Array1, Array2};
use sprs::{CsMat, TriMat};
use thiserror::Error;

/// Errors that can occur during packing.
#[derive(Error, Debug)]
pub enum PackError {
    /// The tree-padded sample is larger than the configured fixed size.
    #[error("{padded} tree-ordered nodes ({real} real) exceed maximum {max}")]
    Oversize {
        real: usize,
        padded: usize,
        max: usize,
    },
}

/// One sample padded to the configured fixed sizes.
#[derive(Debug, Clone)]
pub struct PackedSample {
    /// Padded coordinates, shape (max_points, 3).
    pub points: Array2<f64>,
    /// Zero-indexed labels; 0 marks padding nodes and means "ignore".
    pub labels: Array1<i64>,
    /// True exactly at real-node positions; sums to the true node count.
    pub mask: Array1<bool>,
    /// Pyramid levels resized to max_points, ceil(max_points/2), ...
    pub graphs: Vec<CsMat<f64>>,
}

/// Per-level padded size ladder: `max_points`, then halved (rounded up) once
/// per coarsening level.
pub fn level_sizes(max_points: usize, levels: usize) -> Vec<usize> {
    let mut sizes = Vec::with_capacity(levels + 1);
    let mut target = max_points;
    for _ in 0..=levels {
        sizes.push(target);
        target = (target + 1) / 2;
    }
    sizes
}

/// Resize a sparse adjacency to `target x target`.
///
/// In-range entries are preserved; padding rows and columns stay zero, and
/// out-of-range entries are cropped.
pub fn resize_adjacency(a: &CsMat<f64>, target: usize) -> CsMat<f64> {
    let mut tri = TriMat::new((target, target));
    for (&w, (i, j)) in a.iter() {
        if i < target && j < target {
            tri.add_triplet(i, j, w);
        }
    }
    tri.to_csr()
}

/// Pad a permuted sample to the configured fixed sizes.
///
/// `coords` and `labels` must already be in tree order (padding slots hold
/// zero rows and the reserved 0 label); `graphs` are the tree-ordered pyramid
/// levels. `real_count` is the true node count before padding.
///
/// Labels of real nodes are shifted down by one (input classes are
/// 1-indexed) and the mask marks real-node positions wherever the
/// permutation placed them.
///
/// # Errors
///
/// Returns [`PackError::Oversize`] when the tree-padded node count exceeds
/// `max_points`; the caller skips the sample and logs it.
pub fn pack_sample(
    coords: &[[f64; 3]],
    labels: &[i64],
    graphs: &[CsMat<f64>],
    real_count: usize,
    max_points: usize,
) -> Result<PackedSample, PackError> {
    let padded = coords.len();
    debug_assert_eq!(padded, labels.len());

    if padded > max_points {
        return Err(PackError::Oversize {
            real: real_count,
            padded,
            max: max_points,
        });
    }

    let mut points = Array2::zeros((max_points, 3));
    for (i, c) in coords.iter().enumerate() {
        points[[i, 0]] = c[0];
        points[[i, 1]] = c[1];
        points[[i, 2]] = c[2];
    }

    let mut out_labels = Array1::zeros(max_points);
    let mut mask = Array1::from_elem(max_points, false);
    for (i, &label) in labels.iter().enumerate() {
        if label > 0 {
            out_labels[i] = label - 1;
            mask[i] = true;
        }
    }

    let targets = level_sizes(max_points, graphs.len().saturating_sub(1));
    let graphs = graphs
        .iter()
        .zip(targets.iter())
        .map(|(g, &target)| resize_adjacency(g, target))
        .collect();

    Ok(PackedSample {
        points,
        labels: out_labels,
        mask,
        graphs,
    })
}
