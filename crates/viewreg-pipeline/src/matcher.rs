//! Pairwise matching boundary and the built-in matchers.
//!
//! A matcher receives the world points of both groups of a candidate pair and
//! either returns a [`PairwiseResult`] or `None` when the pair has no reliable
//! correspondence. `None` is never an error; the pair simply contributes no
//! constraints.

use crate::{PairCorrespondences, RegistrationError};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use viewreg_core::{
    Affine3, CandidatePair, Correspondence, PairwiseResult, RansacOptions, Real, ViewId, ViewPoint,
};
use viewreg_linear::{ransac_fit, ModelKind, PointMatch};

pub trait PairwiseMatcher: Sync {
    /// Match the points `a` of `pair.first()` with the points `b` of
    /// `pair.second()`.
    ///
    /// Every returned correspondence has `a` from the first group and `b`
    /// from the second; the transform maps second onto first.
    fn match_pair(
        &self,
        pair: &CandidatePair,
        a: &[ViewPoint],
        b: &[ViewPoint],
    ) -> Option<PairwiseResult>;
}

/// Outlier filtering of candidate correspondences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherOptions {
    /// Model the pair transform is fitted with.
    pub model: ModelKind,
    /// Run RANSAC on the candidates; otherwise all candidates are inliers.
    pub ransac: bool,
    /// Maximal inlier distance in world units.
    pub max_epsilon: Real,
    pub min_inlier_ratio: Real,
    pub min_inliers: usize,
    pub max_iterations: usize,
    pub seed: u64,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        Self {
            model: ModelKind::Rigid,
            ransac: true,
            max_epsilon: 5.0,
            min_inlier_ratio: 0.1,
            min_inliers: 4,
            max_iterations: 10_000,
            seed: 0x5eed,
        }
    }
}

impl MatcherOptions {
    pub fn validate(&self) -> Result<(), RegistrationError> {
        self.model.validate()?;
        if !self.max_epsilon.is_finite() || self.max_epsilon <= 0.0 {
            return Err(RegistrationError::InvalidMatcher(format!(
                "max_epsilon must be positive, got {}",
                self.max_epsilon
            )));
        }
        if !(0.0..=1.0).contains(&self.min_inlier_ratio) {
            return Err(RegistrationError::InvalidMatcher(format!(
                "min_inlier_ratio must be in [0, 1], got {}",
                self.min_inlier_ratio
            )));
        }
        if self.max_iterations == 0 {
            return Err(RegistrationError::InvalidMatcher(
                "max_iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn ransac_options(&self) -> RansacOptions {
        RansacOptions {
            max_iters: self.max_iterations,
            thresh: self.max_epsilon,
            min_inliers: self.min_inliers,
            min_inlier_ratio: self.min_inlier_ratio,
            seed: self.seed,
            ..RansacOptions::default()
        }
    }
}

/// Turn candidate correspondences into a result, or `None` when too few
/// survive filtering.
pub fn filter_candidates(
    candidates: Vec<Correspondence>,
    opts: &MatcherOptions,
) -> Option<PairwiseResult> {
    let matches: Vec<PointMatch> = candidates
        .iter()
        .map(|c| PointMatch::weighted(c.b.world, c.a.world, c.weight))
        .collect();

    if !opts.ransac {
        if candidates.is_empty() || candidates.len() < opts.min_inliers {
            return None;
        }
        let transform = opts.model.fit(&matches).unwrap_or_else(|_| Affine3::identity());
        let inliers = candidates.clone();
        return Some(PairwiseResult::new(candidates, inliers, transform));
    }

    let res = match ransac_fit(&opts.model, &matches, &opts.ransac_options()) {
        Ok(res) => res,
        Err(err) => {
            debug!("pair fit rejected: {err}");
            return None;
        }
    };
    let model = res.model.filter(|_| res.success)?;
    let inliers: Vec<Correspondence> = res.inliers.iter().map(|&i| candidates[i]).collect();
    Some(PairwiseResult::new(candidates, inliers, model))
}

/// Candidates are points with equal interest-point ids across the pair.
#[derive(Debug, Clone, Default)]
pub struct IdMatcher {
    pub options: MatcherOptions,
}

impl IdMatcher {
    pub fn new(options: MatcherOptions) -> Self {
        Self { options }
    }
}

impl PairwiseMatcher for IdMatcher {
    fn match_pair(
        &self,
        pair: &CandidatePair,
        a: &[ViewPoint],
        b: &[ViewPoint],
    ) -> Option<PairwiseResult> {
        let mut by_id: BTreeMap<u64, Vec<&ViewPoint>> = BTreeMap::new();
        for p in b {
            by_id.entry(p.id).or_default().push(p);
        }
        let candidates: Vec<Correspondence> = a
            .iter()
            .flat_map(|pa| {
                by_id
                    .get(&pa.id)
                    .into_iter()
                    .flatten()
                    .filter(move |pb| pb.view != pa.view)
                    .map(move |pb| Correspondence::new(*pa, **pb))
            })
            .collect();
        if candidates.is_empty() {
            debug!("{pair}: no shared ids");
            return None;
        }
        let n = candidates.len();
        let res = filter_candidates(candidates, &self.options);
        if res.is_none() {
            debug!("{pair}: rejected ({n} candidates)");
        }
        res
    }
}

/// Candidates come from a caller-supplied table of id matches per view pair.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedMatcher {
    table: BTreeMap<(ViewId, ViewId), Vec<(u64, u64)>>,
    pub options: MatcherOptions,
}

impl PrecomputedMatcher {
    /// Index the table by ordered view pair; entries for `(b, a)` are flipped
    /// into `(a, b)`.
    pub fn new(correspondences: &[PairCorrespondences], options: MatcherOptions) -> Self {
        let mut table: BTreeMap<(ViewId, ViewId), Vec<(u64, u64)>> = BTreeMap::new();
        for pc in correspondences {
            if pc.a <= pc.b {
                table.entry((pc.a, pc.b)).or_default().extend(&pc.matches);
            } else {
                table
                    .entry((pc.b, pc.a))
                    .or_default()
                    .extend(pc.matches.iter().map(|(x, y)| (*y, *x)));
            }
        }
        Self { table, options }
    }

    /// Views referenced by the table.
    pub fn views(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.table.keys().flat_map(|(a, b)| [*a, *b])
    }

    fn lookup(&self, va: ViewId, vb: ViewId) -> Vec<(u64, u64)> {
        if va <= vb {
            self.table.get(&(va, vb)).cloned().unwrap_or_default()
        } else {
            self.table
                .get(&(vb, va))
                .map(|m| m.iter().map(|(x, y)| (*y, *x)).collect())
                .unwrap_or_default()
        }
    }
}

impl PairwiseMatcher for PrecomputedMatcher {
    fn match_pair(
        &self,
        pair: &CandidatePair,
        a: &[ViewPoint],
        b: &[ViewPoint],
    ) -> Option<PairwiseResult> {
        let index = |pts: &[ViewPoint]| -> HashMap<(ViewId, u64), ViewPoint> {
            pts.iter().map(|p| ((p.view, p.id), *p)).collect()
        };
        let (ia, ib) = (index(a), index(b));
        let mut candidates = Vec::new();
        for va in pair.first().iter() {
            for vb in pair.second().iter() {
                for (ida, idb) in self.lookup(va, vb) {
                    if let (Some(pa), Some(pb)) = (ia.get(&(va, ida)), ib.get(&(vb, idb))) {
                        candidates.push(Correspondence::new(*pa, *pb));
                    }
                }
            }
        }
        if candidates.is_empty() {
            return None;
        }
        filter_candidates(candidates, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewreg_core::{translation, Group, Pt3, Vec3};

    fn points(view: ViewId, shift: Real, n: usize) -> Vec<ViewPoint> {
        (0..n)
            .map(|i| ViewPoint {
                view,
                id: i as u64,
                world: Pt3::new(
                    (i % 4) as Real * 5.0 + shift,
                    (i / 4) as Real * 3.0,
                    ((i * 3) % 7) as Real,
                ),
            })
            .collect()
    }

    #[test]
    fn id_matcher_estimates_the_shift() {
        let (va, vb) = (ViewId::new(0, 0), ViewId::new(0, 1));
        let pair = CandidatePair::of_views(va, vb);
        let a = points(va, 0.0, 12);
        let b = points(vb, 2.0, 12);
        let m = IdMatcher::new(MatcherOptions {
            model: ModelKind::Translation,
            ..Default::default()
        });
        let res = m.match_pair(&pair, &a, &b).unwrap();
        assert_eq!(res.num_inliers(), 12);
        let expected = translation(Vec3::new(-2.0, 0.0, 0.0));
        assert!((res.transform().matrix() - expected.matrix()).amax() < 1e-9);
        assert!(res.error() < 1e-9);
    }

    #[test]
    fn id_matcher_rejects_too_few_candidates() {
        let (va, vb) = (ViewId::new(0, 0), ViewId::new(0, 1));
        let pair = CandidatePair::of_views(va, vb);
        let m = IdMatcher::default();
        assert!(m.match_pair(&pair, &points(va, 0.0, 2), &points(vb, 0.0, 2)).is_none());
        assert!(m.match_pair(&pair, &points(va, 0.0, 8), &[]).is_none());
    }

    #[test]
    fn precomputed_table_is_orientation_free() {
        let (va, vb) = (ViewId::new(0, 0), ViewId::new(0, 1));
        let table = vec![PairCorrespondences {
            a: vb,
            b: va,
            matches: (0..6).map(|i| (i + 100, i)).collect(),
        }];
        let a = points(va, 0.0, 6);
        let b: Vec<ViewPoint> = points(vb, 1.0, 6)
            .into_iter()
            .map(|mut p| {
                p.id += 100;
                p
            })
            .collect();
        let m = PrecomputedMatcher::new(
            &table,
            MatcherOptions {
                ransac: false,
                model: ModelKind::Translation,
                ..Default::default()
            },
        );
        let pair = CandidatePair::new(Group::single(vb), Group::single(va));
        let res = m.match_pair(&pair, &a, &b).unwrap();
        assert_eq!(res.num_inliers(), 6);
        assert!(res.inliers().iter().all(|c| c.a.view == va && c.b.view == vb));
    }

    #[test]
    fn invalid_options_are_rejected() {
        let opts = MatcherOptions {
            max_epsilon: 0.0,
            ..Default::default()
        };
        assert!(matches!(opts.validate(), Err(RegistrationError::InvalidMatcher(_))));
    }
}
