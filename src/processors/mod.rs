//! Graph construction and coarsening modules.

pub mod chebyshev;
pub mod coarsen;
pub mod graph;
pub mod pack;
pub mod pipeline;

// Re-export key types for convenience
pub use chebyshev::chebyshev_basis;
pub use coarsen::{coarsen, compute_perms, Permutation};
pub use graph::{knn_graph, laplacian, rescale_laplacian, LAMBDA_MAX};
pub use pack::{level_sizes, pack_sample, PackError, PackedSample};
pub use pipeline::{process_category, process_sample, CategoryPaths, CategoryStats, Sample};
