use crate::{FixPolicy, MapBackPolicy, MatcherOptions, OverlapConfig, PairFilter, RegistrationError};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use viewreg_core::Real;
use viewreg_linear::ModelKind;
use viewreg_optim::{MapBackModel, OptimizerOptions};

/// Complete configuration of a global registration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    pub pair_filter: PairFilter,
    pub overlap: OverlapConfig,
    /// Minimal separation of merged points when matching grouped views.
    pub group_min_distance: Real,
    pub matcher: MatcherOptions,
    /// Model of the per-view corrections.
    pub model: ModelKind,
    pub optimizer: OptimizerOptions,
    pub fix: FixPolicy,
    pub map_back: MapBackPolicy,
    pub map_back_model: MapBackModel,
    /// Collect per-pair statistics in the output.
    pub pair_statistics: bool,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            pair_filter: PairFilter::default(),
            overlap: OverlapConfig::default(),
            group_min_distance: 5.0,
            matcher: MatcherOptions::default(),
            model: ModelKind::default(),
            optimizer: OptimizerOptions::default(),
            fix: FixPolicy::default(),
            map_back: MapBackPolicy::default(),
            map_back_model: MapBackModel::default(),
            pair_statistics: false,
        }
    }
}

impl RegistrationConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Reject inconsistent settings before any work starts.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        self.matcher.validate()?;
        self.model.validate()?;
        self.optimizer.criteria.validate()?;
        if !self.optimizer.robust.is_valid() {
            return Err(RegistrationError::InvalidKernel(self.optimizer.robust));
        }
        if let Some(lr) = self.optimizer.link_removal {
            let ok = |v: Real| v.is_finite() && v >= 0.0;
            if !ok(lr.relative_threshold) || !ok(lr.absolute_threshold) {
                return Err(RegistrationError::InvalidLinkRemoval);
            }
        }
        if !self.group_min_distance.is_finite() || self.group_min_distance < 0.0 {
            return Err(RegistrationError::InvalidMatcher(format!(
                "group_min_distance must be non-negative, got {}",
                self.group_min_distance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewreg_linear::{BaseModel, FitError};
    use viewreg_optim::{ConvergenceCriteria, CriteriaError};

    #[test]
    fn default_config_is_valid_and_round_trips() {
        let cfg = RegistrationConfig::default();
        cfg.validate().unwrap();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: RegistrationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: RegistrationConfig = serde_json::from_str(
            r#"{ "model": { "type": "translation" }, "fix": "none", "map_back": "first_view" }"#,
        )
        .unwrap();
        assert_eq!(cfg.model, ModelKind::Translation);
        assert_eq!(cfg.fix, FixPolicy::None);
        assert_eq!(cfg.map_back, MapBackPolicy::FirstView);
        assert_eq!(cfg.optimizer.criteria.max_iterations, 10_000);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let cfg = RegistrationConfig {
            model: ModelKind::Regularized {
                model: BaseModel::Affine,
                regularizer: BaseModel::Rigid,
                lambda: -0.1,
            },
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(RegistrationError::InvalidModel(FitError::InvalidLambda(-0.1)))
        );

        let mut cfg = RegistrationConfig::default();
        cfg.optimizer.criteria = ConvergenceCriteria {
            plateau_width: 0,
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(RegistrationError::InvalidCriteria(CriteriaError::ZeroPlateau))
        );
    }
}
