use thiserror::Error;
use viewreg_core::ViewId;
use viewreg_linear::FitError;
use viewreg_optim::{CriteriaError, OptimizeError, RobustKernel};

/// Configuration and run errors of a global registration.
///
/// Everything here is raised before matching or optimization starts, except
/// [`RegistrationError::Cancelled`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistrationError {
    #[error("view {0} is listed more than once")]
    DuplicateView(ViewId),
    #[error("view {0} belongs to more than one group")]
    ViewInTwoGroups(ViewId),
    #[error("group references unknown view {0}")]
    UnknownGroupView(ViewId),
    #[error("policy references unknown view {0}")]
    UnknownPolicyView(ViewId),
    #[error("correspondences reference unknown view {0}")]
    UnknownCorrespondenceView(ViewId),
    #[error("fixed view {view} is not part of subset {subset}")]
    FixedViewOutsideSubset { view: ViewId, subset: usize },
    #[error("reference view {view} is not part of subset {subset}")]
    ReferenceOutsideSubset { view: ViewId, subset: usize },
    #[error("view {0} has a non-finite registration")]
    NonFiniteRegistration(ViewId),
    #[error("view {0} has a non-finite or non-positive size")]
    InvalidViewSize(ViewId),
    #[error("invalid convergence criteria: {0}")]
    InvalidCriteria(#[from] CriteriaError),
    #[error("invalid model: {0}")]
    InvalidModel(#[from] FitError),
    #[error("invalid robust kernel {0:?}")]
    InvalidKernel(RobustKernel),
    #[error("invalid matcher options: {0}")]
    InvalidMatcher(String),
    #[error("invalid link removal thresholds")]
    InvalidLinkRemoval,
    #[error("registration cancelled")]
    Cancelled,
}

impl RegistrationError {
    /// Attribute an optimizer error to subset `subset`.
    pub fn from_optimize(err: OptimizeError, subset: usize) -> Self {
        match err {
            OptimizeError::UnknownFixedView(view) => {
                RegistrationError::FixedViewOutsideSubset { view, subset }
            }
            OptimizeError::InvalidCriteria(e) => RegistrationError::InvalidCriteria(e),
            OptimizeError::InvalidModel(e) => RegistrationError::InvalidModel(e),
            OptimizeError::InvalidKernel(k) => RegistrationError::InvalidKernel(k),
            OptimizeError::InvalidLinkRemoval => RegistrationError::InvalidLinkRemoval,
            OptimizeError::Cancelled => RegistrationError::Cancelled,
        }
    }
}
