use crate::{ensure_count, weighted_centroids, FitError, PointMatch};
use viewreg_core::{is_finite_affine, translation, Affine3};

/// Minimal number of matches for a translation.
pub const TRANSLATION_MIN_MATCHES: usize = 1;

/// Weighted least-squares translation `q ≈ p + t`.
pub fn fit_translation(matches: &[PointMatch]) -> Result<Affine3, FitError> {
    ensure_count(matches, TRANSLATION_MIN_MATCHES)?;
    let (pc, qc, _) = weighted_centroids(matches)?;
    let t = translation(qc - pc);
    if !is_finite_affine(&t) {
        return Err(FitError::NonFinite);
    }
    Ok(t)
}
