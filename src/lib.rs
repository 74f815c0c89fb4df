//! Point cloud to coarsened graph preprocessing pipeline.
//!
//! This crate provides tools for:
//! - Loading whitespace-separated point and segmentation label files
//! - Building Gaussian-weighted k-nearest-neighbor graphs
//! - Greedy graph coarsening into a multi-level pyramid with a tree-order
//!   permutation that makes pooling a fixed-stride operation
//! - Chebyshev polynomial bases of the rescaled graph Laplacian
//! - Packing samples to fixed sizes and writing batched npz archives
//!
//! # Example
//!
//! ```no_run
//! use spectral_pipeline::processors::{coarsen, knn_graph};
//!
//! let coords = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
//! let adjacency = knn_graph(&coords, 2);
//! let (pyramid, perm) = coarsen(&adjacency, 2);
//! assert_eq!(pyramid.len(), 3);
//! assert_eq!(perm.perm.len(), pyramid[0].rows());
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;

pub use config::{CategoryTable, GraphConfig, PackingConfig, PipelineConfig};
pub use core::loaders::PointCloud;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
