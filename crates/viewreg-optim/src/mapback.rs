//! Map-back: re-anchor an optimized subset onto a reference view.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use viewreg_core::{Affine3, Pt3, Vec3, ViewId};
use viewreg_linear::{fit_rigid, fit_translation, FitError, PointMatch};

/// Degrees of freedom restored by map-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapBackModel {
    #[default]
    Translation,
    Rigid,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MapBackError {
    #[error("reference view {0} has no optimized transform")]
    MissingTransform(ViewId),
    #[error("reference view {0} has no registration")]
    MissingRegistration(ViewId),
    #[error("map-back fit failed: {0}")]
    Fit(#[from] FitError),
}

/// Local anchor points of a view: the corners of its voxel box, or the unit
/// cube corners when the size is unknown.
pub fn anchor_points(size: Option<Vec3>) -> Vec<Pt3> {
    let s = size.unwrap_or_else(|| Vec3::new(1.0, 1.0, 1.0));
    let mut out = Vec::with_capacity(8);
    for k in 0..8 {
        out.push(Pt3::new(
            if k & 1 == 0 { 0.0 } else { s.x },
            if k & 2 == 0 { 0.0 } else { s.y },
            if k & 4 == 0 { 0.0 } else { s.z },
        ));
    }
    out
}

/// Transform `M` that moves the optimized reference back onto its original
/// world placement.
///
/// Anchors `p` are local to `reference`; with `q = reg(p)` the fit asks for
/// `M(T_ref(q)) ≈ q`. `None` for `model` means no map-back (identity).
pub fn resolve_map_back(
    optimized: &BTreeMap<ViewId, Affine3>,
    registrations: &BTreeMap<ViewId, Affine3>,
    reference: ViewId,
    model: Option<MapBackModel>,
    anchors: &[Pt3],
) -> Result<Affine3, MapBackError> {
    let Some(model) = model else {
        return Ok(Affine3::identity());
    };
    let t_ref = optimized
        .get(&reference)
        .ok_or(MapBackError::MissingTransform(reference))?;
    let reg = registrations
        .get(&reference)
        .ok_or(MapBackError::MissingRegistration(reference))?;

    let matches: Vec<PointMatch> = anchors
        .iter()
        .map(|p| {
            let q = reg.transform_point(p);
            PointMatch::new(t_ref.transform_point(&q), q)
        })
        .collect();
    let m = match model {
        MapBackModel::Translation => fit_translation(&matches)?,
        MapBackModel::Rigid => fit_rigid(&matches)?,
    };
    Ok(m)
}

/// Pre-concatenate `map_back` onto every optimized transform.
pub fn apply_map_back(
    map_back: &Affine3,
    optimized: &BTreeMap<ViewId, Affine3>,
) -> BTreeMap<ViewId, Affine3> {
    optimized
        .iter()
        .map(|(v, t)| (*v, map_back * t))
        .collect()
}
