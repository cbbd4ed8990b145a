//! Tiles: one mutable transform per view plus the matches that pull on it.

use crate::{PointMatchGraph, RobustKernel};
use std::collections::{BTreeMap, BTreeSet};
use viewreg_core::{is_finite_affine, Affine3, Pt3, Real, ViewId};
use viewreg_linear::{FitError, ModelKind, PointMatch};

/// Match seen from one tile: `p` belongs to this tile, `q` to tile `other`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileMatch {
    pub other: usize,
    pub p: Pt3,
    pub q: Pt3,
    pub w: Real,
}

#[derive(Debug, Clone)]
pub struct Tile {
    pub view: ViewId,
    pub model: Affine3,
    pub matches: Vec<TileMatch>,
    pub fixed: bool,
    pub faulted: bool,
    /// Set once a fit has been accepted for this tile.
    pub updated: bool,
}

impl Tile {
    pub fn is_movable(&self) -> bool {
        !self.fixed && !self.faulted
    }
}

/// Result of one attempted tile update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileUpdate {
    Updated,
    /// Fewer usable matches than the model needs; the transform is kept.
    Skipped,
    /// The fit failed; the tile was reset to identity and marked faulted.
    Faulted,
}

/// All tiles of one subset, in canonical view order.
#[derive(Debug, Clone)]
pub struct TileConfiguration {
    tiles: Vec<Tile>,
}

impl TileConfiguration {
    /// Tiles for every graph view. Views in `fixed` are pinned at identity.
    pub fn from_graph(graph: &PointMatchGraph, fixed: &BTreeSet<ViewId>) -> Self {
        let mut tiles: Vec<Tile> = graph
            .views()
            .iter()
            .map(|v| Tile {
                view: *v,
                model: Affine3::identity(),
                matches: Vec::new(),
                fixed: fixed.contains(v),
                faulted: false,
                updated: false,
            })
            .collect();
        for ((a, b), link) in graph.links() {
            for m in link {
                tiles[a].matches.push(TileMatch {
                    other: b,
                    p: m.p,
                    q: m.q,
                    w: m.w,
                });
                tiles[b].matches.push(TileMatch {
                    other: a,
                    p: m.q,
                    q: m.p,
                    w: m.w,
                });
            }
        }
        Self { tiles }
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn num_fixed(&self) -> usize {
        self.tiles.iter().filter(|t| t.fixed).count()
    }

    /// Current world distance of one match.
    pub fn match_distance(&self, tile: usize, m: &TileMatch) -> Real {
        let a = self.tiles[tile].model.transform_point(&m.p);
        let b = self.tiles[m.other].model.transform_point(&m.q);
        (a - b).norm()
    }

    /// Weighted mean and max match distance over all matches.
    pub fn errors(&self) -> (Real, Real) {
        let (mut sum, mut wsum, mut max) = (0.0, 0.0, 0.0_f64);
        for (i, t) in self.tiles.iter().enumerate() {
            for m in t.matches.iter().filter(|m| m.other > i) {
                let d = self.match_distance(i, m);
                sum += m.w * d;
                wsum += m.w;
                max = max.max(d);
            }
        }
        if wsum > 0.0 {
            (sum / wsum, max)
        } else {
            (0.0, 0.0)
        }
    }

    /// Weighted mean distance per linked tile pair `(a < b)`.
    pub fn link_errors(&self) -> Vec<((usize, usize), Real)> {
        let mut acc: BTreeMap<(usize, usize), (Real, Real)> = BTreeMap::new();
        for (i, t) in self.tiles.iter().enumerate() {
            for m in t.matches.iter().filter(|m| m.other > i) {
                let e = acc.entry((i, m.other)).or_default();
                e.0 += m.w * self.match_distance(i, m);
                e.1 += m.w;
            }
        }
        acc.into_iter()
            .filter(|(_, (_, w))| *w > 0.0)
            .map(|(k, (s, w))| (k, s / w))
            .collect()
    }

    /// Fit tile `i` onto the current positions of its neighbours.
    ///
    /// With `aligned`, only matches to tiles flagged `true` are used.
    /// Fixed and faulted tiles are never touched.
    pub fn update_tile(
        &mut self,
        i: usize,
        model: &ModelKind,
        robust: RobustKernel,
        aligned: Option<&[bool]>,
    ) -> TileUpdate {
        if !self.tiles[i].is_movable() {
            return TileUpdate::Skipped;
        }
        let current = self.tiles[i].model;
        let pm: Vec<PointMatch> = self.tiles[i]
            .matches
            .iter()
            .filter(|m| aligned.is_none_or(|a| a[m.other]))
            .filter_map(|m| {
                let target = self.tiles[m.other].model.transform_point(&m.q);
                let r = (current.transform_point(&m.p) - target).norm();
                let w = m.w * robust.weight(r);
                (w > 0.0 && w.is_finite()).then(|| PointMatch::weighted(m.p, target, w))
            })
            .collect();
        if pm.len() < model.min_matches() {
            return TileUpdate::Skipped;
        }
        match model.fit(&pm) {
            Ok(t) if is_finite_affine(&t) => {
                self.tiles[i].model = t;
                self.tiles[i].updated = true;
                TileUpdate::Updated
            }
            Ok(_) | Err(FitError::NonFinite | FitError::Degenerate | FitError::ZeroWeight) => {
                self.fault(i);
                TileUpdate::Faulted
            }
            Err(_) => TileUpdate::Skipped,
        }
    }

    fn fault(&mut self, i: usize) {
        let t = &mut self.tiles[i];
        t.model = Affine3::identity();
        t.faulted = true;
    }
}
