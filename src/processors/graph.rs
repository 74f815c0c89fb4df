//! Weighted k-nearest-neighbor graph construction and graph Laplacians.
//!
//! This module builds the finest-level adjacency matrix from normalized point
//! coordinates using:
//! - `kiddo` KD-tree for O(log n) nearest neighbor queries
//! - a Gaussian kernel whose bandwidth is derived from the neighbor
//!   distances themselves
//! - max-symmetrization so the result is a valid undirected graph
//!
//! It also provides the unnormalized Laplacian and its spectral rescaling
//! used by the Chebyshev basis generator.

use std::collections::HashMap;

use kiddo::{ImmutableKdTree, SquaredEuclidean};
use sprs::{CsMat, TriMat};

/// Assumed upper bound on the Laplacian spectrum used for rescaling.
///
/// A fixed bound of 2.0 replaces an exact eigenvalue computation; the
/// rescaled spectrum then lies approximately in [-1, 1].
pub const LAMBDA_MAX: f64 = 2.0;

/// Build a weighted k-NN adjacency matrix from point coordinates.
///
/// For every point, its `neighbors` nearest neighbors (excluding itself) get
/// an edge weighted by a Gaussian kernel `exp(-d^2 / sigma^2)`, where `sigma`
/// is the mean distance to the farthest requested neighbor across all points.
/// The directed k-NN relation is symmetrized by taking the union of both
/// directions with the maximum weight.
///
/// The neighbor count is clamped to n-1; clouds with fewer than two points
/// yield an empty graph. The result is symmetric with a zero diagonal.
pub fn knn_graph(coords: &[[f64; 3]], neighbors: usize) -> CsMat<f64> {
    let n = coords.len();
    if n <= 1 || neighbors == 0 {
        return TriMat::new((n, n)).to_csr();
    }

    let k = neighbors.min(n - 1);
    let tree: ImmutableKdTree<f64, 3> = ImmutableKdTree::new_from_slice(coords);

    // Squared distances to the k nearest neighbors of every point, self
    // excluded. Query k+1 because the point itself is always returned first.
    let mut neighbor_lists: Vec<Vec<(usize, f64)>> = Vec::with_capacity(n);
    for (i, coord) in coords.iter().enumerate() {
        let found = tree.nearest_n::<SquaredEuclidean>(coord, k + 1);
        let list: Vec<(usize, f64)> = found
            .iter()
            .filter(|nn| nn.item as usize != i)
            .take(k)
            .map(|nn| (nn.item as usize, nn.distance))
            .collect();
        neighbor_lists.push(list);
    }

    // Kernel bandwidth from the farthest requested neighbor distance.
    let mut farthest_sum = 0.0;
    for list in &neighbor_lists {
        if let Some(&(_, d_sq)) = list.last() {
            farthest_sum += d_sq.sqrt();
        }
    }
    let sigma = (farthest_sum / n as f64).max(f64::EPSILON);
    let sigma2 = sigma * sigma;

    // Keep the maximum of the two directed candidate weights per edge.
    let mut edges: HashMap<(usize, usize), f64> = HashMap::with_capacity(n * k);
    for (i, list) in neighbor_lists.iter().enumerate() {
        for &(j, d_sq) in list {
            let w = (-d_sq / sigma2).exp();
            let key = if i < j { (i, j) } else { (j, i) };
            let entry = edges.entry(key).or_insert(0.0);
            if w > *entry {
                *entry = w;
            }
        }
    }

    let mut tri = TriMat::new((n, n));
    for (&(i, j), &w) in &edges {
        tri.add_triplet(i, j, w);
        tri.add_triplet(j, i, w);
    }
    tri.to_csr()
}

/// Per-node weighted degrees (row sums) of an adjacency matrix.
pub fn degrees(a: &CsMat<f64>) -> Vec<f64> {
    a.outer_iterator()
        .map(|row| row.iter().map(|(_, &w)| w).sum())
        .collect()
}

/// Unnormalized graph Laplacian `L = D - A`.
pub fn laplacian(a: &CsMat<f64>) -> CsMat<f64> {
    let n = a.rows();
    let d = degrees(a);

    let mut tri = TriMat::new((n, n));
    for (i, &deg) in d.iter().enumerate() {
        if deg != 0.0 {
            tri.add_triplet(i, i, deg);
        }
    }
    for (&w, (i, j)) in a.iter() {
        if i != j {
            tri.add_triplet(i, j, -w);
        }
    }
    tri.to_csr()
}

/// Rescale a Laplacian so its spectrum approximately lies in [-1, 1].
///
/// Uses the fixed bound [`LAMBDA_MAX`]: `L~ = (2 / lmax) * L - I`, which with
/// lmax = 2 reduces to `L - I`.
pub fn rescale_laplacian(lap: &CsMat<f64>) -> CsMat<f64> {
    let n = lap.rows();
    let scaled = lap.map(|&v| v * (2.0 / LAMBDA_MAX));
    let eye: CsMat<f64> = CsMat::eye(n);
    &scaled - &eye
}
