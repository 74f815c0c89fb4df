//! Data loaders for point cloud and segmentation label text files.
//!
//! This module provides parsers for:
//! - `.pts` point files (whitespace-separated floats, one point per line)
//! - `.seg` label files (one 1-indexed integer class per line)
//!
//! Both files of a sample are expected under parallel directories and matched
//! by file stem.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("{path}:{line}: expected at least 3 coordinates, found {found}")]
    ShortRow {
        path: PathBuf,
        line: usize,
        found: usize,
    },

    #[error("{path}:{line}: invalid value '{value}'")]
    ParseError {
        path: PathBuf,
        line: usize,
        value: String,
    },

    #[error("point/label count mismatch for '{entry}': {points} points, {labels} labels")]
    LengthMismatch {
        entry: String,
        points: usize,
        labels: usize,
    },

    #[error("directory not found: {0}")]
    DirectoryNotFound(PathBuf),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Container for 3D point cloud data.
#[derive(Debug, Clone)]
pub struct PointCloud {
    /// X coordinates of all points.
    pub x: Vec<f64>,
    /// Y coordinates of all points.
    pub y: Vec<f64>,
    /// Z coordinates of all points.
    pub z: Vec<f64>,
}

impl PointCloud {
    /// Creates a new empty point cloud.
    pub fn new() -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
        }
    }

    /// Creates a new point cloud with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            z: Vec::with_capacity(capacity),
        }
    }

    /// Creates a new point cloud from coordinate rows.
    pub fn from_coords(coords: &[[f64; 3]]) -> Self {
        let mut cloud = Self::with_capacity(coords.len());
        for c in coords {
            cloud.push(c[0], c[1], c[2]);
        }
        cloud
    }

    /// Returns the number of points in the cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Returns true if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Adds a point to the cloud.
    #[inline]
    pub fn push(&mut self, x: f64, y: f64, z: f64) {
        self.x.push(x);
        self.y.push(y);
        self.z.push(z);
    }

    /// Converts the cloud to a vector of [x, y, z] coordinate arrays.
    pub fn to_coords(&self) -> Vec<[f64; 3]> {
        let n = self.len();
        let mut coords = Vec::with_capacity(n);
        for i in 0..n {
            coords.push([self.x[i], self.y[i], self.z[i]]);
        }
        coords
    }
}

impl Default for PointCloud {
    fn default() -> Self {
        Self::new()
    }
}

/// Load a point cloud from a whitespace-separated text file.
///
/// Each non-empty line holds one point; the first three columns are used as
/// x, y, z and any further columns are ignored.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is empty, or contains a
/// malformed row.
pub fn load_points<P: AsRef<Path>>(path: P) -> Result<PointCloud> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut cloud = PointCloud::with_capacity(4096);

    for (line_idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() < 3 {
            return Err(LoaderError::ShortRow {
                path: path.to_path_buf(),
                line: line_idx + 1,
                found: fields.len(),
            });
        }

        let mut coord = [0.0f64; 3];
        for (axis, field) in fields.iter().take(3).enumerate() {
            coord[axis] = field.parse().map_err(|_| LoaderError::ParseError {
                path: path.to_path_buf(),
                line: line_idx + 1,
                value: field.to_string(),
            })?;
        }
        cloud.push(coord[0], coord[1], coord[2]);
    }

    if cloud.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    Ok(cloud)
}

/// Load segmentation labels from a text file, one integer per line.
///
/// Labels are 1-indexed classes; 0 is reserved for padding nodes downstream.
pub fn load_labels<P: AsRef<Path>>(path: P) -> Result<Vec<i64>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut labels = Vec::with_capacity(4096);

    for (line_idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        // Some label files carry float-formatted integers ("2.0")
        let value: i64 = trimmed
            .parse::<i64>()
            .or_else(|_| trimmed.parse::<f64>().map(|v| v as i64))
            .map_err(|_| LoaderError::ParseError {
                path: path.to_path_buf(),
                line: line_idx + 1,
                value: trimmed.to_string(),
            })?;
        labels.push(value);
    }

    if labels.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    Ok(labels)
}

/// Load the point and label files of one sample and verify their lengths match.
pub fn load_sample(points_path: &Path, labels_path: &Path, entry: &str) -> Result<(PointCloud, Vec<i64>)> {
    let cloud = load_points(points_path)?;
    let labels = load_labels(labels_path)?;

    if cloud.len() != labels.len() {
        return Err(LoaderError::LengthMismatch {
            entry: entry.to_string(),
            points: cloud.len(),
            labels: labels.len(),
        });
    }

    Ok((cloud, labels))
}

/// List sample entry names (file stems) in a directory, sorted.
///
/// Hidden files (leading '.') are skipped, matching the source dataset layout.
pub fn list_entries(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Err(LoaderError::DirectoryNotFound(dir.to_path_buf()));
    }

    let mut entries: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| !n.starts_with('.'))
                    .unwrap_or(false)
        })
        .filter_map(|path| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        })
        .collect();

    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_point_cloud_operations() {
        let mut cloud = PointCloud::new();
        assert!(cloud.is_empty());

        cloud.push(1.0, 2.0, 3.0);
        cloud.push(4.0, 5.0, 6.0);

        assert_eq!(cloud.len(), 2);
        let coords = cloud.to_coords();
        assert_eq!(coords[0], [1.0, 2.0, 3.0]);
        assert_eq!(coords[1], [4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_load_points() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "0.1 0.2 0.3").unwrap();
        writeln!(file, "  1.5\t2.5 3.5  ").unwrap();
        writeln!(file).unwrap();
        file.flush().unwrap();

        let cloud = load_points(file.path())?;
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.x[1], 1.5);
        assert_eq!(cloud.z[0], 0.3);

        Ok(())
    }

    #[test]
    fn test_load_points_short_row() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "0.1 0.2 0.3").unwrap();
        writeln!(file, "0.4 0.5").unwrap();
        file.flush().unwrap();

        let result = load_points(file.path());
        match result {
            Err(LoaderError::ShortRow { line, found, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(found, 2);
            }
            other => panic!("expected ShortRow, got {:?}", other.map(|c| c.len())),
        }
    }

    #[test]
    fn test_load_points_bad_value() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "0.1 oops 0.3").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            load_points(file.path()),
            Err(LoaderError::ParseError { .. })
        ));
    }

    #[test]
    fn test_load_labels() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1").unwrap();
        writeln!(file, "3").unwrap();
        writeln!(file, "2.0").unwrap();
        file.flush().unwrap();

        let labels = load_labels(file.path())?;
        assert_eq!(labels, vec![1, 3, 2]);

        Ok(())
    }

    #[test]
    fn test_load_sample_length_mismatch() {
        let mut pts = NamedTempFile::new().unwrap();
        writeln!(pts, "0 0 0").unwrap();
        writeln!(pts, "1 1 1").unwrap();
        pts.flush().unwrap();

        let mut seg = NamedTempFile::new().unwrap();
        writeln!(seg, "1").unwrap();
        seg.flush().unwrap();

        let result = load_sample(pts.path(), seg.path(), "sample");
        assert!(matches!(result, Err(LoaderError::LengthMismatch { .. })));
    }

    #[test]
    fn test_list_entries_sorted_and_filtered() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.pts"), "0 0 0\n").unwrap();
        std::fs::write(dir.path().join("a.pts"), "0 0 0\n").unwrap();
        std::fs::write(dir.path().join(".hidden.pts"), "0 0 0\n").unwrap();

        let entries = list_entries(dir.path())?;
        assert_eq!(entries, vec!["a".to_string(), "b".to_string()]);

        Ok(())
    }

    #[test]
    fn test_list_entries_missing_dir() {
        let result = list_entries(Path::new("/nonexistent/dir"));
        assert!(matches!(result, Err(LoaderError::DirectoryNotFound(_))));
    }
}
