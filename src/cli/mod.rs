//! Command-line interface for the spectral preprocessing pipeline.

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Instant;

use crate::processors::pipeline::{process_category, CategoryPaths, CategoryStats};
use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "spectral-pipeline")]
#[command(about = "Point cloud to coarsened graph dataset converter", version)]
pub struct Cli {
    /// Dataset split to process (e.g. train, val, test)
    dataset: String,

    /// Categories to process (defaults to every configured category)
    #[arg(short = 'c', long = "category")]
    categories: Vec<String>,

    /// Root directory holding <dataset>_data and <dataset>_label
    #[arg(long)]
    data_root: Option<PathBuf>,

    /// Number of nearest neighbors per node
    #[arg(short = 'n', long)]
    neighbors: Option<usize>,

    /// Number of coarsening levels
    #[arg(short = 'l', long)]
    levels: Option<usize>,

    /// Chebyshev polynomial order
    #[arg(short = 'k', long)]
    order: Option<usize>,

    /// Fixed node count each sample is padded to
    #[arg(short = 'm', long)]
    max_points: Option<usize>,

    /// Samples per output archive
    #[arg(short = 'b', long)]
    batch_size: Option<usize>,

    /// Path to YAML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.len() > 39 {
            format!("{}...", &value[..36])
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

/// Merge CLI overrides into the loaded configuration.
fn apply_overrides(config: &mut PipelineConfig, cli: &Cli) {
    if let Some(n) = cli.neighbors {
        config.graph.neighbors = n;
    }
    if let Some(l) = cli.levels {
        config.graph.levels = l;
    }
    if let Some(k) = cli.order {
        config.graph.order = k;
    }
    if let Some(m) = cli.max_points {
        config.packing.max_points = m;
    }
    if let Some(b) = cli.batch_size {
        config.packing.batch_size = b;
    }
    if let Some(root) = &cli.data_root {
        config.data_root = root.clone();
    }
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let mut config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}, using defaults",
                    path.display(),
                    e
                );
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };
    apply_overrides(&mut config, &cli);

    let categories = if cli.categories.is_empty() {
        config.categories.sorted_names()
    } else {
        cli.categories.clone()
    };

    // Reject unknown categories before touching the filesystem
    for name in &categories {
        if config.categories.synset(name).is_none() {
            error!("Unknown category: {}", name);
            std::process::exit(1);
        }
    }

    let start = Instant::now();
    let mut totals = CategoryStats::default();
    let mut failed = 0usize;

    for name in &categories {
        let synset = match config.categories.synset(name) {
            Some(s) => s,
            None => continue,
        };
        let paths = CategoryPaths::new(&config.data_root, &cli.dataset, name, synset);

        let spinner = create_spinner(&format!("Processing category {}...", name));
        let result = process_category(&paths, &config.graph, &config.packing);
        spinner.finish_and_clear();

        match result {
            Ok(stats) => {
                println!(
                    "{}: {} samples packed, {} rejected, {} archives",
                    name, stats.packed, stats.rejected, stats.batches
                );
                totals.packed += stats.packed;
                totals.rejected += stats.rejected;
                totals.batches += stats.batches;
            }
            Err(e) => {
                error!("Category {} failed: {:#}", name, e);
                failed += 1;
            }
        }
    }

    print_summary(
        &format!("Dataset '{}' Complete", cli.dataset),
        &[
            ("Categories", categories.len().to_string()),
            ("Samples packed", totals.packed.to_string()),
            ("Samples rejected", totals.rejected.to_string()),
            ("Archives written", totals.batches.to_string()),
            ("Failed categories", failed.to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );

    if failed > 0 {
        std::process::exit(1);
    }
}
