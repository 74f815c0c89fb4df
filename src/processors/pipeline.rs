//! Per-sample processing driver, batch assembly, and the per-category
//! dataset pass.
//!
//! One sample's pipeline (normalize -> k-NN graph -> coarsen -> permute ->
//! pack -> Chebyshev bases) is pure and CPU-bound, so the samples of a batch
//! are processed in parallel with `rayon`; order is preserved by `collect`,
//! which keeps every output field of a batch index-aligned to the same
//! source sample. The only serialization point is the final archive write.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use log::{info, warn};
use ndarray::{Array2, Array3};
use rayon::prelude::*;
use sprs::CsMat;

use crate::config::{GraphConfig, PackingConfig};
use crate::core::loaders::{self, PointCloud};
use crate::core::transforms::normalize_unit_cube;
use crate::core::writers::{write_batch_npz, BatchArchive, SparseLevel};
use crate::processors::chebyshev::chebyshev_basis;
use crate::processors::coarsen::{coarsen, perm_coords, perm_labels};
use crate::processors::graph::{knn_graph, laplacian, rescale_laplacian};
use crate::processors::pack::{level_sizes, pack_sample, PackedSample};

/// One fully processed sample: packed arrays plus its spectral bases.
#[derive(Debug, Clone)]
pub struct Sample {
    pub packed: PackedSample,
    /// K+1 Chebyshev matrices per pyramid level.
    pub bases: Vec<Vec<CsMat<f64>>>,
}

/// Per-category processing statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryStats {
    /// Samples that made it into an archive.
    pub packed: usize,
    /// Samples skipped (oversized or degenerate).
    pub rejected: usize,
    /// Archives written.
    pub batches: usize,
}

/// Process one sample through the full graph pipeline.
///
/// Returns `None` (with a warning) for samples that are rejected:
/// degenerate clouds with zero extent on an axis, and clouds whose
/// tree-padded size exceeds the configured maximum. Both are recoverable
/// per-sample conditions; hard input errors are handled by the caller.
pub fn process_sample(
    cloud: &PointCloud,
    labels: &[i64],
    graph_cfg: &GraphConfig,
    packing_cfg: &PackingConfig,
    entry: &str,
) -> Option<Sample> {
    let normalized = match normalize_unit_cube(cloud) {
        Ok(c) => c,
        Err(e) => {
            warn!("{}: {}; skipping sample", entry, e);
            return None;
        }
    };

    let coords = normalized.to_coords();
    let adjacency = knn_graph(&coords, graph_cfg.neighbors);
    let (graphs, perm) = coarsen(&adjacency, graph_cfg.levels);

    let tree_coords = perm_coords(&coords, &perm.perm);
    let tree_labels = perm_labels(labels, &perm.perm);

    let packed = match pack_sample(
        &tree_coords,
        &tree_labels,
        &graphs,
        cloud.len(),
        packing_cfg.max_points,
    ) {
        Ok(p) => p,
        Err(e) => {
            warn!("{}: {}; skipping sample", entry, e);
            return None;
        }
    };

    let bases = packed
        .graphs
        .iter()
        .map(|g| chebyshev_basis(&rescale_laplacian(&laplacian(g)), graph_cfg.order))
        .collect();

    Some(Sample { packed, bases })
}

/// Stack packed samples into one archive along a leading batch dimension.
pub fn assemble_batch(
    samples: &[Sample],
    graph_cfg: &GraphConfig,
    packing_cfg: &PackingConfig,
) -> BatchArchive {
    let b = samples.len();
    let m = packing_cfg.max_points;
    let sizes = level_sizes(m, graph_cfg.levels);

    let mut points = Array3::zeros((b, m, 3));
    let mut labels = Array2::zeros((b, m));
    let mut mask = Array2::from_elem((b, m), false);

    let mut graphs: Vec<SparseLevel> = sizes.iter().map(|&s| SparseLevel::new(s)).collect();
    let mut bases: Vec<Vec<SparseLevel>> = sizes
        .iter()
        .map(|&s| (0..=graph_cfg.order).map(|_| SparseLevel::new(s)).collect())
        .collect();

    for (i, sample) in samples.iter().enumerate() {
        points
            .index_axis_mut(ndarray::Axis(0), i)
            .assign(&sample.packed.points);
        labels
            .index_axis_mut(ndarray::Axis(0), i)
            .assign(&sample.packed.labels);
        mask.index_axis_mut(ndarray::Axis(0), i)
            .assign(&sample.packed.mask);

        for (l, g) in sample.packed.graphs.iter().enumerate() {
            graphs[l].push(g);
        }
        for (l, level_basis) in sample.bases.iter().enumerate() {
            for (k, t) in level_basis.iter().enumerate() {
                bases[l][k].push(t);
            }
        }
    }

    BatchArchive {
        points,
        labels,
        mask,
        sizes: sizes.iter().map(|&s| s as u64).collect(),
        graphs,
        bases,
    }
}

/// Directory layout of one category within a dataset.
#[derive(Debug, Clone)]
pub struct CategoryPaths {
    pub points_dir: PathBuf,
    pub labels_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl CategoryPaths {
    /// Standard layout: `<root>/<dataset>_data/<synset>` for points,
    /// `<root>/<dataset>_label/<synset>` for labels, and
    /// `<root>/<dataset>_npz/<category>` for output archives.
    pub fn new(data_root: &Path, dataset: &str, category: &str, synset: &str) -> Self {
        Self {
            points_dir: data_root.join(format!("{}_data", dataset)).join(synset),
            labels_dir: data_root.join(format!("{}_label", dataset)).join(synset),
            output_dir: data_root.join(format!("{}_npz", dataset)).join(category),
        }
    }
}

/// Process every sample of one category into batch archives.
///
/// Samples are grouped into batches of `batch_size` in sorted entry order;
/// each batch's samples run in parallel, then the archive is written as
/// `<output_dir>/<batch index>.npz`. A missing or malformed input file
/// aborts the whole run rather than soft-skipping, so the provenance of the
/// produced dataset stays unambiguous.
pub fn process_category(
    paths: &CategoryPaths,
    graph_cfg: &GraphConfig,
    packing_cfg: &PackingConfig,
) -> anyhow::Result<CategoryStats> {
    let entries = loaders::list_entries(&paths.points_dir)?;
    if entries.is_empty() {
        bail!("no entries found in {}", paths.points_dir.display());
    }

    let mut stats = CategoryStats::default();

    for (batch_index, chunk) in entries.chunks(packing_cfg.batch_size).enumerate() {
        let outcomes: Vec<Option<Sample>> = chunk
            .par_iter()
            .map(|entry| -> anyhow::Result<Option<Sample>> {
                let points_path = paths.points_dir.join(format!("{}.pts", entry));
                let labels_path = paths.labels_dir.join(format!("{}.seg", entry));
                let (cloud, labels) = loaders::load_sample(&points_path, &labels_path, entry)
                    .with_context(|| format!("failed to load sample '{}'", entry))?;
                Ok(process_sample(
                    &cloud,
                    &labels,
                    graph_cfg,
                    packing_cfg,
                    entry,
                ))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let samples: Vec<Sample> = outcomes.into_iter().flatten().collect();
        stats.rejected += chunk.len() - samples.len();

        if samples.is_empty() {
            warn!(
                "batch {} of {}: all samples rejected, no archive written",
                batch_index,
                paths.output_dir.display()
            );
            continue;
        }

        let archive = assemble_batch(&samples, graph_cfg, packing_cfg);
        let out_path = paths.output_dir.join(format!("{}.npz", batch_index));
        write_batch_npz(&out_path, &archive)?;
        info!(
            "saved {} ({} samples)",
            out_path.display(),
            samples.len()
        );

        stats.packed += samples.len();
        stats.batches += 1;
    }

    Ok(stats)
}
