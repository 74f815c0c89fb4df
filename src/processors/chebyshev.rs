//! Chebyshev polynomial basis of the rescaled graph Laplacian.
//!
//! The basis `T_0..T_K` acts as a set of localized spectral filters for the
//! downstream graph-convolutional model. All products stay in sparse
//! representation; letting the recurrence densify at 4096 nodes would blow up
//! memory for no benefit.

use log::warn;
use sprs::CsMat;

/// Entry magnitude beyond which the recurrence is considered unstable.
///
/// With a correct spectral bound the rescaled Laplacian keeps the recurrence
/// bounded; growth past this threshold indicates a wrong rescaling and is
/// reported, never silently corrected.
const GROWTH_WARN_THRESHOLD: f64 = 1e6;

/// Generate the Chebyshev basis `[T_0, ..., T_K]` of a rescaled Laplacian.
///
/// `T_0 = I`, `T_1 = L~`, and `T_k = 2 * L~ * T_{k-1} - T_{k-2}`. The result
/// always holds `order + 1` matrices of the input's shape.
pub fn chebyshev_basis(l_resc: &CsMat<f64>, order: usize) -> Vec<CsMat<f64>> {
    let n = l_resc.rows();

    let mut basis: Vec<CsMat<f64>> = Vec::with_capacity(order + 1);
    basis.push(CsMat::eye(n));
    if order >= 1 {
        basis.push(l_resc.clone());
    }

    for k in 2..=order {
        let product = l_resc * &basis[k - 1];
        let doubled = product.map(|&v| 2.0 * v);
        let next = &doubled - &basis[k - 2];

        let peak = next
            .iter()
            .map(|(&v, _)| v.abs())
            .fold(0.0f64, f64::max);
        if !peak.is_finite() || peak > GROWTH_WARN_THRESHOLD {
            warn!(
                "Chebyshev recurrence growing at order {}: max |entry| = {:e}; \
                 rescaling bound is likely wrong for this graph",
                k, peak
            );
        }

        basis.push(next);
    }

    basis
}
