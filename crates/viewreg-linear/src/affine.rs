use crate::{ensure_count, weighted_centroids, FitError, PointMatch};
use viewreg_core::{affine_from_parts, is_finite_affine, Affine3, Mat3, Real};

/// Minimal number of matches for a general affine transform.
pub const AFFINE_MIN_MATCHES: usize = 4;

/// Relative conditioning threshold for the source scatter matrix.
const COND_EPS: Real = 1e-12;

/// Weighted least-squares affine transform `q ≈ M p + t`.
///
/// Solves the normal equations on centred coordinates:
/// `M = (Σ w dq dpᵀ) (Σ w dp dpᵀ)⁻¹`, `t = q̄ - M p̄`.
/// Coplanar or collinear sources make the scatter singular and return
/// [`FitError::Degenerate`].
pub fn fit_affine(matches: &[PointMatch]) -> Result<Affine3, FitError> {
    ensure_count(matches, AFFINE_MIN_MATCHES)?;
    let (pc, qc, _) = weighted_centroids(matches)?;

    let mut spp = Mat3::zeros();
    let mut sqp = Mat3::zeros();
    for m in matches {
        let dp = m.p - pc;
        let dq = m.q - qc;
        spp += dp * dp.transpose() * m.w;
        sqp += dq * dp.transpose() * m.w;
    }

    let sv = spp.singular_values();
    let (max, min) = (sv.max(), sv.min());
    if max <= 0.0 || min <= COND_EPS * max {
        return Err(FitError::Degenerate);
    }
    let inv = spp.try_inverse().ok_or(FitError::Degenerate)?;
    let lin = sqp * inv;
    let t = qc.coords - lin * pc.coords;

    let a = affine_from_parts(&lin, &t);
    if !is_finite_affine(&a) {
        return Err(FitError::NonFinite);
    }
    Ok(a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewreg_core::{affine_max_abs_diff, Pt3, Vec3};

    #[test]
    fn recovers_shear_and_scale() {
        let gt = affine_from_parts(
            &Mat3::new(1.1, 0.05, 0.0, -0.02, 0.95, 0.1, 0.0, 0.03, 1.2),
            &Vec3::new(4.0, 5.0, -6.0),
        );
        let m: Vec<PointMatch> = (0..20)
            .map(|i| {
                let p = Pt3::new(
                    (i % 4) as f64 * 10.0,
                    (i / 4) as f64 * 7.0,
                    ((i * 7) % 5) as f64 * 3.0,
                );
                PointMatch::new(p, gt.transform_point(&p))
            })
            .collect();
        let fit = fit_affine(&m).unwrap();
        assert!(affine_max_abs_diff(&fit, &gt) < 1e-9);
    }

    #[test]
    fn coplanar_sources_are_degenerate() {
        let m: Vec<PointMatch> = (0..9)
            .map(|i| {
                let p = Pt3::new((i % 3) as f64, (i / 3) as f64, 0.0);
                PointMatch::new(p, p)
            })
            .collect();
        assert_eq!(fit_affine(&m), Err(FitError::Degenerate));
    }
}
