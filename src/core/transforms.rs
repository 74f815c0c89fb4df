//! Point cloud normalization.
//!
//! Raw coordinates are translated and scaled into the unit cube before any
//! graph construction, so neighbor distances are comparable across samples.

use thiserror::Error;

use super::loaders::PointCloud;

/// Errors that can occur during normalization.
#[derive(Error, Debug)]
pub enum TransformError {
    /// The cloud has zero spatial extent along one axis, which would divide
    /// by zero and propagate non-finite values into the graph stage.
    #[error("degenerate point cloud: zero extent on axis {axis}")]
    DegenerateExtent { axis: usize },

    #[error("non-finite coordinate on axis {axis}")]
    NonFinite { axis: usize },
}

/// Normalize a point cloud into the unit cube.
///
/// Each axis is translated by its minimum and scaled by its maximum after
/// translation, so all coordinates land in [0, 1].
///
/// # Errors
///
/// Returns an error if any axis has zero extent or contains non-finite
/// values; the caller is expected to reject the sample with a diagnostic.
pub fn normalize_unit_cube(cloud: &PointCloud) -> Result<PointCloud, TransformError> {
    let axes = [&cloud.x, &cloud.y, &cloud.z];
    let mut normalized: Vec<Vec<f64>> = Vec::with_capacity(3);

    for (axis, values) in axes.iter().enumerate() {
        if values.iter().any(|v| !v.is_finite()) {
            return Err(TransformError::NonFinite { axis });
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let extent = max - min;

        if extent <= 0.0 {
            return Err(TransformError::DegenerateExtent { axis });
        }

        normalized.push(values.iter().map(|v| (v - min) / extent).collect());
    }

    let mut it = normalized.into_iter();
    Ok(PointCloud {
        x: it.next().unwrap_or_default(),
        y: it.next().unwrap_or_default(),
        z: it.next().unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_normalize_unit_cube() {
        let cloud = PointCloud {
            x: vec![-2.0, 0.0, 2.0],
            y: vec![10.0, 15.0, 20.0],
            z: vec![0.0, 0.5, 1.0],
        };

        let norm = normalize_unit_cube(&cloud).unwrap();

        for axis in [&norm.x, &norm.y, &norm.z] {
            for &v in axis {
                assert!((0.0..=1.0).contains(&v));
            }
            assert_eq!(axis[0], 0.0);
            assert_eq!(axis[2], 1.0);
        }
        assert_abs_diff_eq!(norm.x[1], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_degenerate_axis() {
        let cloud = PointCloud {
            x: vec![0.0, 1.0],
            y: vec![3.0, 3.0], // flat
            z: vec![0.0, 1.0],
        };

        let result = normalize_unit_cube(&cloud);
        match result {
            Err(TransformError::DegenerateExtent { axis }) => assert_eq!(axis, 1),
            other => panic!("expected DegenerateExtent, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn test_normalize_non_finite() {
        let cloud = PointCloud {
            x: vec![0.0, f64::NAN],
            y: vec![0.0, 1.0],
            z: vec![0.0, 1.0],
        };

        assert!(matches!(
            normalize_unit_cube(&cloud),
            Err(TransformError::NonFinite { axis: 0 })
        ));
    }
}
