//! Configuration types for the preprocessing pipeline.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Configuration for neighbor graph and pyramid construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Number of nearest neighbors per point
    #[serde(default = "default_neighbors")]
    pub neighbors: usize,

    /// Number of coarsening levels in the pyramid
    #[serde(default = "default_levels")]
    pub levels: usize,

    /// Order of the Chebyshev polynomial basis
    #[serde(default = "default_order")]
    pub order: usize,
}

fn default_neighbors() -> usize {
    6
}

fn default_levels() -> usize {
    4
}

fn default_order() -> usize {
    5
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            neighbors: default_neighbors(),
            levels: default_levels(),
            order: default_order(),
        }
    }
}

/// Configuration for fixed-size packing and batching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackingConfig {
    /// Maximum number of finest-level nodes per sample
    #[serde(default = "default_max_points")]
    pub max_points: usize,

    /// Number of samples per output archive
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_max_points() -> usize {
    4096
}

fn default_batch_size() -> usize {
    128
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            max_points: default_max_points(),
            batch_size: default_batch_size(),
        }
    }
}

/// Mapping from category names to dataset synset identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTable {
    /// Category name -> synset directory id
    #[serde(default = "default_synsets")]
    pub synsets: HashMap<String, String>,
}

fn default_synsets() -> HashMap<String, String> {
    let pairs = [
        ("Airplane", "02691156"),
        ("Bag", "02773838"),
        ("Cap", "02954340"),
        ("Car", "02958343"),
        ("Chair", "03001627"),
        ("Earphone", "03261776"),
        ("Guitar", "03467517"),
        ("Knife", "03624134"),
        ("Lamp", "03636649"),
        ("Laptop", "03642806"),
        ("Motorbike", "03790512"),
        ("Mug", "03797390"),
        ("Pistol", "03948459"),
        ("Rocket", "04099429"),
        ("Skateboard", "04225987"),
        ("Table", "04379243"),
    ];
    pairs
        .iter()
        .map(|(name, id)| (name.to_string(), id.to_string()))
        .collect()
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self {
            synsets: default_synsets(),
        }
    }
}

impl CategoryTable {
    /// Looks up the synset id for a category name.
    pub fn synset(&self, category: &str) -> Option<&str> {
        self.synsets.get(category).map(|s| s.as_str())
    }

    /// Returns the category names in a stable (sorted) order.
    pub fn sorted_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.synsets.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub graph: GraphConfig,

    #[serde(default)]
    pub packing: PackingConfig,

    #[serde(default)]
    pub categories: CategoryTable,

    /// Root directory containing the `<dataset>_data` / `<dataset>_label` trees
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,
}

fn default_data_root() -> PathBuf {
    PathBuf::from("../data")
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            graph: GraphConfig::default(),
            packing: PackingConfig::default(),
            categories: CategoryTable::default(),
            data_root: default_data_root(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
