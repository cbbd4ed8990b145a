//! Output contract of a pairwise matcher.

use crate::{Affine3, Correspondence, Real};

/// Result of matching one candidate pair.
///
/// `transform` maps the points of the pair's second group onto the first
/// group's points; `error` is the mean inlier residual under that transform.
/// Immutable after construction.
#[derive(Debug, Clone)]
pub struct PairwiseResult {
    inliers: Vec<Correspondence>,
    candidates: Vec<Correspondence>,
    error: Real,
    transform: Affine3,
    weight: Real,
}

impl PairwiseResult {
    /// Build a result, computing the mean inlier residual under `transform`.
    pub fn new(
        candidates: Vec<Correspondence>,
        inliers: Vec<Correspondence>,
        transform: Affine3,
    ) -> Self {
        let error = if inliers.is_empty() {
            Real::INFINITY
        } else {
            inliers.iter().map(|c| c.residual(&transform)).sum::<Real>() / inliers.len() as Real
        };
        Self {
            inliers,
            candidates,
            error,
            transform,
            weight: 1.0,
        }
    }

    /// Attach a confidence weight applied to every constraint built from this
    /// result (default 1.0).
    pub fn with_weight(mut self, weight: Real) -> Self {
        self.weight = weight;
        self
    }

    pub fn inliers(&self) -> &[Correspondence] {
        &self.inliers
    }

    pub fn candidates(&self) -> &[Correspondence] {
        &self.candidates
    }

    pub fn error(&self) -> Real {
        self.error
    }

    pub fn transform(&self) -> &Affine3 {
        &self.transform
    }

    pub fn weight(&self) -> Real {
        self.weight
    }

    pub fn num_inliers(&self) -> usize {
        self.inliers.len()
    }

    /// Inliers over candidates; 0 when there are no candidates.
    pub fn inlier_ratio(&self) -> Real {
        if self.candidates.is_empty() {
            0.0
        } else {
            self.inliers.len() as Real / self.candidates.len() as Real
        }
    }
}
