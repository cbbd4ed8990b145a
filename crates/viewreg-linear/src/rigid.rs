//! Weighted rigid fit (Kabsch / Umeyama without scale).

use crate::{ensure_count, weighted_centroids, FitError, PointMatch};
use viewreg_core::{affine_from_parts, is_finite_affine, Affine3, Mat3, Real};

/// Minimal number of matches for a rigid transform.
pub const RIGID_MIN_MATCHES: usize = 3;

/// Relative singular-value threshold below which the configuration is
/// considered collinear.
const RANK_EPS: Real = 1e-10;

/// Weighted least-squares rigid transform `q ≈ R p + t`.
///
/// Uses the SVD of the weighted cross-covariance; a negative determinant is
/// corrected by flipping the axis of the smallest singular value, so the
/// result is always a proper rotation.
pub fn fit_rigid(matches: &[PointMatch]) -> Result<Affine3, FitError> {
    ensure_count(matches, RIGID_MIN_MATCHES)?;
    let r = fit_rotation(matches)?;
    let (pc, qc, _) = weighted_centroids(matches)?;
    let t = qc.coords - r * pc.coords;
    let a = affine_from_parts(&r, &t);
    if !is_finite_affine(&a) {
        return Err(FitError::NonFinite);
    }
    Ok(a)
}

/// Rotation part of [`fit_rigid`].
pub fn fit_rotation(matches: &[PointMatch]) -> Result<Mat3, FitError> {
    let (pc, qc, _) = weighted_centroids(matches)?;
    let mut h = Mat3::zeros();
    for m in matches {
        let dp = m.p - pc;
        let dq = m.q - qc;
        h += dp * dq.transpose() * m.w;
    }

    let svd = h.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(FitError::Degenerate);
    };

    let mut s: Vec<(usize, Real)> = svd.singular_values.iter().copied().enumerate().collect();
    s.sort_by(|a, b| b.1.total_cmp(&a.1));
    if s[0].1.is_nan() || s[0].1 <= 0.0 || s[1].1 <= RANK_EPS * s[0].1 {
        return Err(FitError::Degenerate);
    }

    let v = v_t.transpose();
    let mut d = Mat3::identity();
    if (v * u.transpose()).determinant() < 0.0 {
        d[(s[2].0, s[2].0)] = -1.0;
    }
    let r = v * d * u.transpose();
    if !r.iter().all(|x| x.is_finite()) {
        return Err(FitError::NonFinite);
    }
    Ok(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Rotation3, Translation3, UnitQuaternion};
    use viewreg_core::{affine_from_iso, affine_max_abs_diff, Iso3, Pt3};

    fn cube() -> Vec<Pt3> {
        let mut pts = Vec::new();
        for x in [0.0, 10.0] {
            for y in [0.0, 20.0] {
                for z in [0.0, 5.0] {
                    pts.push(Pt3::new(x, y, z));
                }
            }
        }
        pts
    }

    #[test]
    fn recovers_known_rotation_and_translation() {
        let iso = Iso3::from_parts(
            Translation3::new(3.0, -1.0, 7.0),
            UnitQuaternion::from_rotation_matrix(&Rotation3::from_euler_angles(0.3, -0.2, 0.9)),
        );
        let gt = affine_from_iso(&iso);
        let m: Vec<PointMatch> = cube()
            .into_iter()
            .map(|p| PointMatch::new(p, gt.transform_point(&p)))
            .collect();
        let fit = fit_rigid(&m).unwrap();
        assert!(affine_max_abs_diff(&fit, &gt) < 1e-9);
    }

    #[test]
    fn mirrored_targets_still_give_proper_rotation() {
        let m: Vec<PointMatch> = cube()
            .into_iter()
            .map(|p| PointMatch::new(p, Pt3::new(-p.x, p.y, p.z)))
            .collect();
        let r = fit_rotation(&m).unwrap();
        assert!((r.determinant() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let m: Vec<PointMatch> = (0..5)
            .map(|i| {
                let p = Pt3::new(i as f64, 0.0, 0.0);
                PointMatch::new(p, p)
            })
            .collect();
        assert_eq!(fit_rigid(&m), Err(FitError::Degenerate));
    }
}
