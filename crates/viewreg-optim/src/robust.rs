use serde::{Deserialize, Serialize};
use viewreg_core::Real;

/// Robust loss kernels for iteratively re-weighted least squares (IRLS).
///
/// Scales are in world units (the same unit as match distances).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RobustKernel {
    /// Pure L2.
    #[default]
    None,
    /// Quadratic up to `delta`, linear beyond.
    Huber { delta: Real },
    /// Cauchy loss with scale `c`.
    Cauchy { c: Real },
}

impl RobustKernel {
    /// IRLS weight `rho'(r) / r` for a residual distance `r`.
    pub fn weight(self, r: Real) -> Real {
        match self {
            RobustKernel::None => 1.0,
            RobustKernel::Huber { delta } => {
                if r <= delta {
                    1.0
                } else {
                    delta / r
                }
            }
            RobustKernel::Cauchy { c } => 1.0 / (1.0 + (r * r) / (c * c)),
        }
    }

    /// `true` if the kernel parameters are usable.
    pub fn is_valid(self) -> bool {
        match self {
            RobustKernel::None => true,
            RobustKernel::Huber { delta } => delta > 0.0 && delta.is_finite(),
            RobustKernel::Cauchy { c } => c > 0.0 && c.is_finite(),
        }
    }
}
