//! Stopping rules of the global optimizer.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use viewreg_core::Real;

/// Mean error below which the configuration is treated as an exact fit.
pub const EXACT_FIT_ERROR: Real = 1e-12;

/// When to stop relaxing a subset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceCriteria {
    /// Hard iteration cap.
    pub max_iterations: usize,
    /// Window (in iterations) over which improvement is measured.
    pub plateau_width: usize,
    /// Stop once the relative error change over the window drops below this.
    pub min_relative_improvement: Real,
    /// Flag (never fail) subsets whose final mean error exceeds this.
    pub max_allowed_error: Option<Real>,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            plateau_width: 200,
            min_relative_improvement: 1e-5,
            max_allowed_error: Some(5.0),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CriteriaError {
    #[error("max_iterations must be positive")]
    ZeroIterations,
    #[error("plateau_width must be positive")]
    ZeroPlateau,
    #[error("min_relative_improvement must be finite and non-negative, got {0}")]
    BadImprovement(Real),
    #[error("max_allowed_error must be finite and non-negative, got {0}")]
    BadMaxError(Real),
}

impl ConvergenceCriteria {
    pub fn validate(&self) -> Result<(), CriteriaError> {
        if self.max_iterations == 0 {
            return Err(CriteriaError::ZeroIterations);
        }
        if self.plateau_width == 0 {
            return Err(CriteriaError::ZeroPlateau);
        }
        let r = self.min_relative_improvement;
        if !r.is_finite() || r < 0.0 {
            return Err(CriteriaError::BadImprovement(r));
        }
        if let Some(e) = self.max_allowed_error {
            if !e.is_finite() || e < 0.0 {
                return Err(CriteriaError::BadMaxError(e));
            }
        }
        Ok(())
    }

    pub fn exceeds_max_error(&self, error: Real) -> bool {
        self.max_allowed_error.is_some_and(|m| error > m)
    }
}

/// Mean-error history of one optimization run.
#[derive(Debug, Clone, Default)]
pub struct ErrorHistory {
    values: Vec<Real>,
}

impl ErrorHistory {
    pub fn push(&mut self, error: Real) {
        self.values.push(error);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last(&self) -> Option<Real> {
        self.values.last().copied()
    }

    /// `true` once the error has stopped moving over the last `width`
    /// iterations: `|e[n-1-width] - e[n-1]| <= min_rel * e[n-1-width]`.
    ///
    /// Oscillation counts as movement, so an error that goes up and down keeps
    /// the optimizer running until the iteration cap.
    pub fn is_plateau(&self, width: usize, min_rel: Real) -> bool {
        let n = self.values.len();
        if width == 0 || n <= width {
            return false;
        }
        let prev = self.values[n - 1 - width];
        let cur = self.values[n - 1];
        if prev <= EXACT_FIT_ERROR {
            return true;
        }
        (prev - cur).abs() <= min_rel * prev
    }
}
