//! Closed-form, weighted least-squares transform fits.
//!
//! Every fit maps source points `p` onto target points `q` so that
//! `T(p) ≈ q` in the weighted least-squares sense:
//!
//! - [`fit_translation`]: weighted centroid difference,
//! - [`fit_rigid`]: weighted Kabsch with reflection guard,
//! - [`fit_affine`]: weighted normal equations.
//!
//! [`ModelKind`] selects one of them (or a regularized blend) at call time, and
//! [`ransac_fit`] wraps the same models in the generic RANSAC engine from
//! `viewreg-core`.

mod affine;
mod estimators;
mod model;
mod rigid;
mod translation;

pub use affine::*;
pub use estimators::*;
pub use model::*;
pub use rigid::*;
pub use translation::*;

use thiserror::Error;
use viewreg_core::{Pt3, Real};

/// Errors of the closed-form fits.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FitError {
    #[error("need at least {needed} point matches, got {got}")]
    NotEnoughMatches { needed: usize, got: usize },
    #[error("total match weight must be positive")]
    ZeroWeight,
    #[error("point configuration is degenerate for this model")]
    Degenerate,
    #[error("fit produced non-finite coefficients")]
    NonFinite,
    #[error("regularization lambda {0} outside [0, 1]")]
    InvalidLambda(Real),
}

/// A weighted pair `(p, q)` asking for `T(p) ≈ q`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointMatch {
    pub p: Pt3,
    pub q: Pt3,
    pub w: Real,
}

impl PointMatch {
    pub fn new(p: Pt3, q: Pt3) -> Self {
        Self { p, q, w: 1.0 }
    }

    pub fn weighted(p: Pt3, q: Pt3, w: Real) -> Self {
        Self { p, q, w }
    }
}

/// Weighted centroids of sources and targets plus the total weight.
pub(crate) fn weighted_centroids(matches: &[PointMatch]) -> Result<(Pt3, Pt3, Real), FitError> {
    let mut wsum = 0.0;
    let mut pc = nalgebra::Vector3::<Real>::zeros();
    let mut qc = nalgebra::Vector3::<Real>::zeros();
    for m in matches {
        wsum += m.w;
        pc += m.p.coords * m.w;
        qc += m.q.coords * m.w;
    }
    if wsum <= 0.0 || !wsum.is_finite() {
        return Err(FitError::ZeroWeight);
    }
    Ok((Pt3::from(pc / wsum), Pt3::from(qc / wsum), wsum))
}

pub(crate) fn ensure_count(matches: &[PointMatch], needed: usize) -> Result<(), FitError> {
    if matches.len() < needed {
        return Err(FitError::NotEnoughMatches {
            needed,
            got: matches.len(),
        });
    }
    Ok(())
}
