//! Transformation model classes selectable at call time.

use crate::{
    fit_affine, fit_rigid, fit_translation, FitError, PointMatch, AFFINE_MIN_MATCHES,
    RIGID_MIN_MATCHES, TRANSLATION_MIN_MATCHES,
};
use serde::{Deserialize, Serialize};
use viewreg_core::{affine_blend, is_finite_affine, Affine3, Real};

/// Elementary model classes, all expressible as constrained affine maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseModel {
    Translation,
    Rigid,
    Affine,
}

impl BaseModel {
    pub fn min_matches(self) -> usize {
        match self {
            BaseModel::Translation => TRANSLATION_MIN_MATCHES,
            BaseModel::Rigid => RIGID_MIN_MATCHES,
            BaseModel::Affine => AFFINE_MIN_MATCHES,
        }
    }

    pub fn fit(self, matches: &[PointMatch]) -> Result<Affine3, FitError> {
        match self {
            BaseModel::Translation => fit_translation(matches),
            BaseModel::Rigid => fit_rigid(matches),
            BaseModel::Affine => fit_affine(matches),
        }
    }
}

/// Model class used for per-view transforms.
///
/// `Regularized` fits both `model` and `regularizer` and blends their
/// matrices as `(1 - lambda) * model + lambda * regularizer`, which keeps an
/// affine solution close to a rigid one when matches are sparse.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelKind {
    Translation,
    #[default]
    Rigid,
    Affine,
    Regularized {
        model: BaseModel,
        regularizer: BaseModel,
        lambda: Real,
    },
}

impl From<BaseModel> for ModelKind {
    fn from(b: BaseModel) -> Self {
        match b {
            BaseModel::Translation => ModelKind::Translation,
            BaseModel::Rigid => ModelKind::Rigid,
            BaseModel::Affine => ModelKind::Affine,
        }
    }
}

impl ModelKind {
    /// Reject a `lambda` outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), FitError> {
        if let ModelKind::Regularized { lambda, .. } = *self {
            if !(0.0..=1.0).contains(&lambda) {
                return Err(FitError::InvalidLambda(lambda));
            }
        }
        Ok(())
    }

    /// Model class used to draw minimal RANSAC samples.
    pub fn sampling_model(&self) -> BaseModel {
        match *self {
            ModelKind::Translation => BaseModel::Translation,
            ModelKind::Rigid => BaseModel::Rigid,
            ModelKind::Affine => BaseModel::Affine,
            ModelKind::Regularized { model, .. } => model,
        }
    }

    /// Minimal number of matches for a well-posed fit.
    pub fn min_matches(&self) -> usize {
        match *self {
            ModelKind::Regularized {
                model, regularizer, ..
            } => model.min_matches().max(regularizer.min_matches()),
            _ => self.sampling_model().min_matches(),
        }
    }

    /// Weighted least-squares fit of this model class.
    pub fn fit(&self, matches: &[PointMatch]) -> Result<Affine3, FitError> {
        match *self {
            ModelKind::Regularized {
                model,
                regularizer,
                lambda,
            } => {
                self.validate()?;
                let a = model.fit(matches)?;
                let b = regularizer.fit(matches)?;
                let blended = affine_blend(&a, &b, lambda);
                if !is_finite_affine(&blended) {
                    return Err(FitError::NonFinite);
                }
                Ok(blended)
            }
            _ => self.sampling_model().fit(matches),
        }
    }

    pub fn name(&self) -> String {
        match *self {
            ModelKind::Translation => "translation".to_string(),
            ModelKind::Rigid => "rigid".to_string(),
            ModelKind::Affine => "affine".to_string(),
            ModelKind::Regularized {
                model,
                regularizer,
                lambda,
            } => format!("{model:?} regularized by {regularizer:?} (lambda={lambda})").to_lowercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewreg_core::{affine_linear, Mat3, Pt3, Vec3};

    fn skewed_matches() -> Vec<PointMatch> {
        let lin = Mat3::new(1.2, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        let t = Vec3::new(1.0, 2.0, 3.0);
        (0..12)
            .map(|i| {
                let p = Pt3::new((i % 3) as f64, ((i / 3) % 2) as f64, (i / 6) as f64 * 2.0);
                PointMatch::new(p, Pt3::from(lin * p.coords + t))
            })
            .collect()
    }

    #[test]
    fn min_matches_of_regularized_is_the_stricter_one() {
        let k = ModelKind::Regularized {
            model: BaseModel::Affine,
            regularizer: BaseModel::Translation,
            lambda: 0.1,
        };
        assert_eq!(k.min_matches(), 4);
        assert_eq!(ModelKind::Rigid.min_matches(), 3);
    }

    #[test]
    fn regularized_blend_interpolates_scale() {
        let m = skewed_matches();
        let k = ModelKind::Regularized {
            model: BaseModel::Affine,
            regularizer: BaseModel::Rigid,
            lambda: 0.5,
        };
        let a = k.fit(&m).unwrap();
        let sx = affine_linear(&a)[(0, 0)];
        assert!(sx > 1.0 && sx < 1.2, "blended x scale {sx}");
    }

    #[test]
    fn lambda_out_of_range_is_rejected() {
        let k = ModelKind::Regularized {
            model: BaseModel::Affine,
            regularizer: BaseModel::Rigid,
            lambda: 1.5,
        };
        assert_eq!(k.validate(), Err(FitError::InvalidLambda(1.5)));
        assert!(k.fit(&skewed_matches()).is_err());
    }
}
