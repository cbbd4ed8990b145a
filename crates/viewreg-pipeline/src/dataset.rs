//! Views, their metadata and the JSON dataset format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use viewreg_core::{Affine3, Group, InterestPoint, Pt3, Vec3, ViewId, ViewPoint};

/// Acquisition attributes used by pair filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Tile,
    Channel,
    Illumination,
    Angle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewAttributes {
    pub tile: u32,
    pub channel: u32,
    pub illumination: u32,
    pub angle: u32,
}

impl ViewAttributes {
    pub fn get(&self, attribute: Attribute) -> u32 {
        match attribute {
            Attribute::Tile => self.tile,
            Attribute::Channel => self.channel,
            Attribute::Illumination => self.illumination,
            Attribute::Angle => self.angle,
        }
    }
}

/// One view as seen by the registration: identity, metadata, current
/// registration (local to world) and its interest points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewDescription {
    pub id: ViewId,
    #[serde(default)]
    pub attributes: ViewAttributes,
    /// Voxel box size in local coordinates, if known.
    #[serde(default)]
    pub size: Option<Vec3>,
    #[serde(with = "crate::serde_affine", default = "crate::serde_affine::identity")]
    pub registration: Affine3,
    #[serde(default)]
    pub points: Vec<InterestPoint>,
}

impl ViewDescription {
    pub fn new(id: ViewId, registration: Affine3) -> Self {
        Self {
            id,
            attributes: ViewAttributes::default(),
            size: None,
            registration,
            points: Vec::new(),
        }
    }

    pub fn with_size(mut self, size: Vec3) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_points(mut self, points: Vec<InterestPoint>) -> Self {
        self.points = points;
        self
    }

    pub fn with_attributes(mut self, attributes: ViewAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Interest points in world coordinates, in id order.
    pub fn world_points(&self) -> Vec<ViewPoint> {
        let mut out: Vec<ViewPoint> = self
            .points
            .iter()
            .map(|p| ViewPoint::from_local(self.id, p, &self.registration))
            .collect();
        out.sort_by_key(|p| p.id);
        out
    }

    /// World-space axis-aligned box of the voxel volume, `None` without a size.
    pub fn world_bounds(&self) -> Option<(Pt3, Pt3)> {
        let size = self.size?;
        let mut lo = Pt3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut hi = Pt3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for corner in viewreg_optim::anchor_points(Some(size)) {
            let w = self.registration.transform_point(&corner);
            lo = lo.inf(&w);
            hi = hi.sup(&w);
        }
        Some((lo, hi))
    }
}

/// Precomputed interest-point id matches between two views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairCorrespondences {
    pub a: ViewId,
    pub b: ViewId,
    /// `(id in a, id in b)`.
    pub matches: Vec<(u64, u64)>,
}

/// Everything the CLI reads from its input file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub views: Vec<ViewDescription>,
    pub groups: Vec<Group>,
    /// When non-empty, matching uses these instead of interest-point ids.
    pub correspondences: Vec<PairCorrespondences>,
}

impl Dataset {
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).context("failed to parse dataset JSON")
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dataset {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("invalid dataset {}", path.display()))
    }
}
