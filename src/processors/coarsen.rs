//! Graph pyramid construction via greedy weighted matching.
//!
//! This module implements the Graclus-style coarsening used to turn a single
//! k-NN adjacency matrix into a multilevel pyramid:
//!
//! 1. **Matching**: unmatched nodes are visited in ascending index order and
//!    paired with the unmatched neighbor maximizing the normalized-cut score
//!    `w(i, j) / (deg(i) + deg(j))`. This single greedy pass approximates
//!    maximum-weight matching; smallest-index tie-breaking keeps it
//!    deterministic.
//! 2. **Contraction**: coarse edge weights sum all fine edges crossing
//!    between two clusters; intra-cluster edges are dropped.
//! 3. **Tree ordering**: a permutation per level aligns the pyramid so that
//!    coarse node `k` always pools fine nodes `2k` and `2k + 1`, with
//!    synthetic padding nodes filling the sibling slot of singletons.

use sprs::{CsMat, TriMat};

use super::graph::degrees;

/// Bijective node reordering for the finest level, padding slots included.
///
/// `perm[t]` is the source index placed at tree slot `t`; indices at or above
/// the true node count denote synthetic padding nodes with no adjacency.
#[derive(Debug, Clone)]
pub struct Permutation {
    pub perm: Vec<usize>,
    pub inverse: Vec<usize>,
}

impl Permutation {
    /// Builds a permutation and its inverse from a slot -> source map.
    pub fn new(perm: Vec<usize>) -> Self {
        let mut inverse = vec![0usize; perm.len()];
        for (slot, &source) in perm.iter().enumerate() {
            debug_assert!(source < perm.len());
            inverse[source] = slot;
        }
        Self { perm, inverse }
    }

    /// Padded length M of the finest level.
    #[inline]
    pub fn len(&self) -> usize {
        self.perm.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.perm.is_empty()
    }
}

/// One greedy matching pass.
///
/// Returns the fine -> coarse cluster map and the contracted adjacency.
/// Every coarse cluster contains one or two fine nodes; nodes without an
/// unmatched neighbor become singletons.
pub fn coarsen_once(a: &CsMat<f64>) -> (Vec<usize>, CsMat<f64>) {
    let n = a.rows();
    let d = degrees(a);

    const UNMATCHED: usize = usize::MAX;
    let mut cluster = vec![UNMATCHED; n];
    let mut count = 0usize;

    for i in 0..n {
        if cluster[i] != UNMATCHED {
            continue;
        }

        // CSR rows iterate columns in ascending order, so strict improvement
        // ties break toward the smallest neighbor index.
        let mut best: Option<usize> = None;
        let mut best_score = 0.0;
        if let Some(row) = a.outer_view(i) {
            for (j, &w) in row.iter() {
                if j == i || cluster[j] != UNMATCHED || w <= 0.0 {
                    continue;
                }
                let score = w / (d[i] + d[j]);
                if score > best_score {
                    best_score = score;
                    best = Some(j);
                }
            }
        }

        cluster[i] = count;
        if let Some(j) = best {
            cluster[j] = count;
        }
        count += 1;
    }

    let mut tri = TriMat::new((count, count));
    for (&w, (i, j)) in a.iter() {
        let (ci, cj) = (cluster[i], cluster[j]);
        if ci != cj {
            tri.add_triplet(ci, cj, w);
        }
    }

    (cluster, tri.to_csr())
}

/// Repeatedly contract `a` into a pyramid of `levels + 1` graphs.
///
/// Level 0 is the input; each further level is the contraction of the one
/// below. Once a level reaches a single node, further levels stay trivial
/// 1x1 zero matrices.
pub fn build_pyramid(a: &CsMat<f64>, levels: usize) -> (Vec<CsMat<f64>>, Vec<Vec<usize>>) {
    let mut graphs = Vec::with_capacity(levels + 1);
    let mut cluster_maps = Vec::with_capacity(levels);

    graphs.push(a.clone());
    for _ in 0..levels {
        let (map, coarse) = coarsen_once(graphs.last().expect("pyramid is non-empty"));
        cluster_maps.push(map);
        graphs.push(coarse);
    }

    (graphs, cluster_maps)
}

/// Derive per-level tree-order permutations from the cluster map stack.
///
/// Walking coarsest to finest: a cluster with two children places them at
/// adjacent slots, a singleton gets a synthetic sibling, and a synthetic
/// coarse node expands into two synthetic fine nodes. The finest permutation
/// has length `(coarsest count) * 2^levels`, so padded level sizes halve
/// exactly at each step.
///
/// `finest_count` is only used when no coarsening was requested.
pub fn compute_perms(cluster_maps: &[Vec<usize>], finest_count: usize) -> Vec<Vec<usize>> {
    let coarsest = match cluster_maps.last() {
        Some(map) => map.iter().copied().max().map_or(0, |m| m + 1),
        None => return vec![(0..finest_count).collect()],
    };

    let mut perms: Vec<Vec<usize>> = vec![(0..coarsest).collect()];

    for map in cluster_maps.iter().rev() {
        let n_fine = map.len();
        let n_coarse = map.iter().copied().max().map_or(0, |m| m + 1);

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n_coarse];
        for (fine, &c) in map.iter().enumerate() {
            children[c].push(fine);
        }

        let prev = perms.last().expect("perm stack is non-empty");
        let mut next_fake = n_fine;
        let mut perm = Vec::with_capacity(prev.len() * 2);

        for &c in prev {
            let kids: &[usize] = if c < n_coarse { &children[c] } else { &[] };
            match kids {
                [a, b] => {
                    perm.push(*a);
                    perm.push(*b);
                }
                [a] => {
                    perm.push(*a);
                    perm.push(next_fake);
                    next_fake += 1;
                }
                _ => {
                    perm.push(next_fake);
                    perm.push(next_fake + 1);
                    next_fake += 2;
                }
            }
        }

        perms.push(perm);
    }

    perms.reverse();
    perms
}

/// Reorder an adjacency matrix under a tree permutation.
///
/// The output is `M x M` where `M = perm.len()`; rows and columns of
/// synthetic padding nodes stay empty.
pub fn perm_adjacency(a: &CsMat<f64>, perm: &[usize]) -> CsMat<f64> {
    let n = a.rows();
    let m = perm.len();
    debug_assert!(m >= n);

    // slot position of every real source node
    let mut pos = vec![usize::MAX; n];
    for (slot, &source) in perm.iter().enumerate() {
        if source < n {
            pos[source] = slot;
        }
    }

    let mut tri = TriMat::new((m, m));
    for (&w, (i, j)) in a.iter() {
        tri.add_triplet(pos[i], pos[j], w);
    }
    tri.to_csr()
}

/// Reorder point coordinates, filling padding slots with zero rows.
pub fn perm_coords(coords: &[[f64; 3]], perm: &[usize]) -> Vec<[f64; 3]> {
    perm.iter()
        .map(|&source| {
            if source < coords.len() {
                coords[source]
            } else {
                [0.0; 3]
            }
        })
        .collect()
}

/// Reorder labels, assigning the reserved 0 label to padding slots.
pub fn perm_labels(labels: &[i64], perm: &[usize]) -> Vec<i64> {
    perm.iter()
        .map(|&source| if source < labels.len() { labels[source] } else { 0 })
        .collect()
}

/// Coarsen an adjacency matrix into a tree-ordered pyramid.
///
/// Builds the pyramid, derives the per-level permutations, and returns every
/// level already reordered (with padding slots) plus the finest-level
/// [`Permutation`]. This is the entry point the sample pipeline uses.
pub fn coarsen(a: &CsMat<f64>, levels: usize) -> (Vec<CsMat<f64>>, Permutation) {
    let (graphs, cluster_maps) = build_pyramid(a, levels);
    let perms = compute_perms(&cluster_maps, a.rows());

    let permuted: Vec<CsMat<f64>> = graphs
        .iter()
        .zip(perms.iter())
        .map(|(g, p)| perm_adjacency(g, p))
        .collect();

    let finest = perms.into_iter().next().expect("at least one level");
    (permuted, Permutation::new(finest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::graph::knn_graph;
    use approx::assert_abs_diff_eq;

    fn path_graph(n: usize) -> CsMat<f64> {
        let mut tri = TriMat::new((n, n));
        for i in 0..n.saturating_sub(1) {
            tri.add_triplet(i, i + 1, 1.0);
            tri.add_triplet(i + 1, i, 1.0);
        }
        tri.to_csr()
    }

    /// Stride-2 pooling of a tree-ordered adjacency, dropping intra-pair
    /// edges the way contraction drops self-loops.
    fn pool(fine: &CsMat<f64>) -> CsMat<f64> {
        let m = fine.rows() / 2;
        let mut tri = TriMat::new((m, m));
        for (&w, (i, j)) in fine.iter() {
            let (a, b) = (i / 2, j / 2);
            if a != b {
                tri.add_triplet(a, b, w);
            }
        }
        tri.to_csr()
    }

    #[test]
    fn test_coarsen_once_path() {
        let a = path_graph(4);
        let (map, coarse) = coarsen_once(&a);

        // 0 pairs with 1, then 2 pairs with 3.
        assert_eq!(map, vec![0, 0, 1, 1]);
        assert_eq!(coarse.rows(), 2);
        // Only the crossing edge (1, 2) survives.
        assert_eq!(coarse.get(0, 1).copied(), Some(1.0));
        assert_eq!(coarse.get(0, 0), None);
    }

    #[test]
    fn test_coarsen_once_singleton() {
        let a = path_graph(3);
        let (map, coarse) = coarsen_once(&a);

        assert_eq!(map, vec![0, 0, 1]);
        assert_eq!(coarse.rows(), 2);
        assert_eq!(coarse.get(0, 1).copied(), Some(1.0));
    }

    #[test]
    fn test_pyramid_sizes_non_increasing() {
        let coords: Vec<[f64; 3]> = (0..33)
            .map(|i| {
                let t = i as f64 * 0.37;
                [t.sin(), (1.7 * t).cos(), 0.11 * i as f64]
            })
            .collect();
        let a = knn_graph(&coords, 4);
        let (graphs, _) = build_pyramid(&a, 5);

        assert_eq!(graphs.len(), 6);
        for pair in graphs.windows(2) {
            assert!(pair[1].rows() <= pair[0].rows());
        }
    }

    #[test]
    fn test_pyramid_reaches_one() {
        let a = path_graph(16);
        let (graphs, _) = build_pyramid(&a, 10);

        assert_eq!(graphs.last().map(|g| g.rows()), Some(1));
        assert_eq!(graphs.last().map(|g| g.nnz()), Some(0));
        // Trivial levels stay 1x1 once contraction bottoms out.
        assert_eq!(graphs[5].rows(), 1);
    }

    #[test]
    fn test_permutation_is_bijection() {
        let a = path_graph(11);
        let (_, perm) = coarsen(&a, 3);

        let m = perm.len();
        for slot in 0..m {
            assert_eq!(perm.inverse[perm.perm[slot]], slot);
        }

        let mut seen = vec![false; m];
        for &source in &perm.perm {
            assert!(!seen[source], "duplicate source index {}", source);
            seen[source] = true;
        }
    }

    #[test]
    fn test_padded_sizes_halve_exactly() {
        let a = path_graph(13);
        let levels = 3;
        let (graphs, perm) = coarsen(&a, levels);

        assert_eq!(graphs[0].rows(), perm.len());
        for pair in graphs.windows(2) {
            assert_eq!(pair[0].rows(), pair[1].rows() * 2);
        }
    }

    #[test]
    fn test_tree_pooling_invariant() {
        // Each permuted level must be exactly the stride-2 pooled version of
        // the level below it; this is what stride-2 pooling downstream relies
        // on.
        let coords: Vec<[f64; 3]> = (0..25)
            .map(|i| {
                let t = i as f64;
                [(0.9 * t).sin(), (0.4 * t).cos(), 0.05 * t]
            })
            .collect();
        let a = knn_graph(&coords, 3);
        let (graphs, _) = coarsen(&a, 3);

        for pair in graphs.windows(2) {
            let pooled = pool(&pair[0]).to_dense();
            let coarse = pair[1].to_dense();
            assert_eq!(pooled.shape(), coarse.shape());
            for (p, c) in pooled.iter().zip(coarse.iter()) {
                assert_abs_diff_eq!(p, c, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_perm_data_fills_padding() {
        let labels = vec![1, 2, 3];
        let perm = vec![0, 1, 2, 3]; // index 3 is synthetic
        assert_eq!(perm_labels(&labels, &perm), vec![1, 2, 3, 0]);

        let coords = vec![[1.0, 1.0, 1.0], [2.0, 2.0, 2.0], [3.0, 3.0, 3.0]];
        let permuted = perm_coords(&coords, &perm);
        assert_eq!(permuted[3], [0.0, 0.0, 0.0]);
        assert_eq!(permuted[1], [2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_compute_perms_no_levels() {
        let perms = compute_perms(&[], 5);
        assert_eq!(perms, vec![vec![0, 1, 2, 3, 4]]);
    }

    #[test]
    fn test_perm_adjacency_preserves_weights() {
        let a = path_graph(3);
        let perm = vec![2, 0, 1, 3];
        let p = perm_adjacency(&a, &perm);

        assert_eq!(p.rows(), 4);
        // edge (0, 1) lands at slots (1, 2)
        assert_eq!(p.get(1, 2).copied(), Some(1.0));
        // edge (1, 2) lands at slots (2, 0)
        assert_eq!(p.get(2, 0).copied(), Some(1.0));
        // padding row stays empty
        assert!(p.outer_view(3).map(|r| r.nnz() == 0).unwrap_or(true));
    }
}
