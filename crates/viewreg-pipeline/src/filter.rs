//! Which group pairs are compared at all.

use crate::{Attribute, ViewAttributes};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use viewreg_core::{Group, ViewId};

/// How views of different timepoints are paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimepointStrategy {
    /// Only views of the same timepoint.
    #[default]
    Individual,
    AllToAll,
    /// Timepoints at most `range` apart.
    AllToAllRange { range: u32 },
    /// Same timepoint, or one side in the reference timepoint.
    ReferenceTimepoint { timepoint: u32 },
}

impl TimepointStrategy {
    fn admits(&self, a: u32, b: u32) -> bool {
        match *self {
            TimepointStrategy::Individual => a == b,
            TimepointStrategy::AllToAll => true,
            TimepointStrategy::AllToAllRange { range } => a.abs_diff(b) <= range,
            TimepointStrategy::ReferenceTimepoint { timepoint } => {
                a == b || a == timepoint || b == timepoint
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PairFilter {
    pub timepoints: TimepointStrategy,
    /// Attributes that must differ across the pair, e.g. `[tile]` compares
    /// only different tiles.
    pub require_different: Vec<Attribute>,
}

impl PairFilter {
    /// `true` if some view of `a` and some view of `b` form an admissible
    /// combination. Views missing from `attributes` use default attributes.
    pub fn admits(&self, a: &Group, b: &Group, attributes: &BTreeMap<ViewId, ViewAttributes>) -> bool {
        let attrs = |v: &ViewId| attributes.get(v).copied().unwrap_or_default();
        a.iter().any(|va| {
            b.iter().any(|vb| {
                self.timepoints.admits(va.timepoint, vb.timepoint)
                    && self
                        .require_different
                        .iter()
                        .all(|att| attrs(&va).get(*att) != attrs(&vb).get(*att))
            })
        })
    }
}
