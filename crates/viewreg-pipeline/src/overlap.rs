//! Overlap tests applied to candidate pairs.

use crate::ViewDescription;
use serde::{Deserialize, Serialize};
use viewreg_core::{Pt3, Real};

/// Decides whether two groups can share interest points.
pub trait OverlapTest: Sync {
    fn overlaps(&self, a: &[&ViewDescription], b: &[&ViewDescription]) -> bool;
}

/// Every pair overlaps.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllOverlap;

impl OverlapTest for AllOverlap {
    fn overlaps(&self, _a: &[&ViewDescription], _b: &[&ViewDescription]) -> bool {
        true
    }
}

/// Axis-aligned world boxes of the registered voxel volumes must intersect.
///
/// A group's box is the union of its members' boxes. Views without a known
/// size are assumed to overlap everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundingBoxOverlap {
    /// Extra tolerance added on every side.
    pub margin: Real,
}

fn union_bounds(views: &[&ViewDescription]) -> Option<(Pt3, Pt3)> {
    let mut acc: Option<(Pt3, Pt3)> = None;
    for v in views {
        let (lo, hi) = v.world_bounds()?;
        acc = Some(match acc {
            Some((l, h)) => (l.inf(&lo), h.sup(&hi)),
            None => (lo, hi),
        });
    }
    acc
}

impl OverlapTest for BoundingBoxOverlap {
    fn overlaps(&self, a: &[&ViewDescription], b: &[&ViewDescription]) -> bool {
        let (Some((alo, ahi)), Some((blo, bhi))) = (union_bounds(a), union_bounds(b)) else {
            return true;
        };
        (0..3).all(|k| alo[k] <= bhi[k] + self.margin && blo[k] <= ahi[k] + self.margin)
    }
}

/// Serializable choice of overlap test.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OverlapConfig {
    All,
    #[default]
    BoundingBox,
}

impl OverlapConfig {
    pub fn build(self) -> Box<dyn OverlapTest> {
        match self {
            OverlapConfig::All => Box::new(AllOverlap),
            OverlapConfig::BoundingBox => Box::new(BoundingBoxOverlap::default()),
        }
    }
}
