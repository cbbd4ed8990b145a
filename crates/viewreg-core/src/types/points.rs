//! Interest points and correspondences.
//!
//! Interest points live in their view's local frame. Everything handed to a
//! matcher or the optimizer is in world coordinates, with a back-reference to
//! the view the point came from so grouped matches can be demultiplexed.

use crate::{Affine3, Pt3, Real, ViewId};
use serde::{Deserialize, Serialize};

/// A detected 3D landmark in a view's local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterestPoint {
    /// Identifier unique within the view.
    pub id: u64,
    /// Position in the view's local (voxel) frame.
    pub local: Pt3,
}

impl InterestPoint {
    pub fn new(id: u64, local: Pt3) -> Self {
        Self { id, local }
    }
}

/// An interest point placed in world coordinates, tagged with its origin view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewPoint {
    pub view: ViewId,
    pub id: u64,
    pub world: Pt3,
}

impl ViewPoint {
    /// Place a local interest point into world coordinates using the view's
    /// registration.
    pub fn from_local(view: ViewId, point: &InterestPoint, registration: &Affine3) -> Self {
        Self {
            view,
            id: point.id,
            world: registration.transform_point(&point.local),
        }
    }
}

/// Two points believed to show the same physical feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    pub a: ViewPoint,
    pub b: ViewPoint,
    /// Relative confidence of this correspondence (default 1.0).
    #[serde(default = "default_weight")]
    pub weight: Real,
}

fn default_weight() -> Real {
    1.0
}

impl Correspondence {
    pub fn new(a: ViewPoint, b: ViewPoint) -> Self {
        Self { a, b, weight: 1.0 }
    }

    pub fn with_weight(mut self, weight: Real) -> Self {
        self.weight = weight;
        self
    }

    /// World-space distance between the two points.
    pub fn distance(&self) -> Real {
        (self.a.world - self.b.world).norm()
    }

    /// Distance after mapping the `b` point with `transform`.
    pub fn residual(&self, transform: &Affine3) -> Real {
        (self.a.world - transform.transform_point(&self.b.world)).norm()
    }

    /// Same correspondence with the two sides exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            a: self.b,
            b: self.a,
            weight: self.weight,
        }
    }
}
