//! Core data types and I/O operations.

pub mod loaders;
pub mod transforms;
pub mod writers;

pub use loaders::{LoaderError, PointCloud};
pub use writers::{write_batch_npz, BatchArchive, SparseLevel, WriteError};
