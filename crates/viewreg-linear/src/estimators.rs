//! RANSAC estimators over weighted point matches.

use crate::{BaseModel, FitError, ModelKind, PointMatch};
use log::debug;
use viewreg_core::{ransac, Affine3, Estimator, RansacOptions, RansacResult};

/// Shared implementation of the minimal-sample fit for one model class.
fn sample_fit(model: BaseModel, data: &[PointMatch], idx: &[usize]) -> Option<Affine3> {
    let sample: Vec<PointMatch> = idx.iter().map(|&i| data[i]).collect();
    model.fit(&sample).ok()
}

fn transfer_error(model: &Affine3, m: &PointMatch) -> f64 {
    (model.transform_point(&m.p) - m.q).norm()
}

macro_rules! point_match_estimator {
    ($name:ident, $model:expr) => {
        /// RANSAC estimator for the corresponding [`BaseModel`].
        pub struct $name;

        impl Estimator for $name {
            type Datum = PointMatch;
            type Model = Affine3;

            const MIN_SAMPLES: usize = $model.min_matches_const();

            fn fit(data: &[PointMatch], sample_indices: &[usize]) -> Option<Affine3> {
                sample_fit($model, data, sample_indices)
            }

            fn residual(model: &Affine3, datum: &PointMatch) -> f64 {
                transfer_error(model, datum)
            }

            fn refit(data: &[PointMatch], inliers: &[usize]) -> Option<Affine3> {
                sample_fit($model, data, inliers)
            }
        }
    };
}

impl BaseModel {
    /// `const` variant of [`BaseModel::min_matches`] for estimator constants.
    pub const fn min_matches_const(self) -> usize {
        match self {
            BaseModel::Translation => crate::TRANSLATION_MIN_MATCHES,
            BaseModel::Rigid => crate::RIGID_MIN_MATCHES,
            BaseModel::Affine => crate::AFFINE_MIN_MATCHES,
        }
    }
}

point_match_estimator!(TranslationEstimator, BaseModel::Translation);
point_match_estimator!(RigidEstimator, BaseModel::Rigid);
point_match_estimator!(AffineEstimator, BaseModel::Affine);

/// Robustly fit `kind` to `matches`.
///
/// Minimal samples are drawn with the sampling model of `kind`; for a
/// regularized model the consensus set is refit with the full blend. The
/// returned inlier indices refer to `matches`.
pub fn ransac_fit(
    kind: &ModelKind,
    matches: &[PointMatch],
    opts: &RansacOptions,
) -> Result<RansacResult<Affine3>, FitError> {
    kind.validate()?;
    let mut res = match kind.sampling_model() {
        BaseModel::Translation => ransac::<TranslationEstimator>(matches, opts),
        BaseModel::Rigid => ransac::<RigidEstimator>(matches, opts),
        BaseModel::Affine => ransac::<AffineEstimator>(matches, opts),
    };

    if res.success && matches!(kind, ModelKind::Regularized { .. }) {
        let inliers: Vec<PointMatch> = res.inliers.iter().map(|&i| matches[i]).collect();
        match kind.fit(&inliers) {
            Ok(model) => res.model = Some(model),
            Err(err) => {
                debug!("regularized refit on {} inliers failed: {err}", inliers.len());
                return Ok(RansacResult::default());
            }
        }
    }
    Ok(res)
}
