//! One global registration run: subsets, matching, optimization, map-back.
//!
//! # Pipeline
//!
//! 1. **Subsets**: candidate pairs from the pair filter and overlap test,
//!    split into connected components.
//! 2. **Matching**: every candidate pair of every subset, in parallel.
//! 3. **Optimization**: one tile relaxation per subset, in parallel.
//! 4. **Map-back**: re-anchor each subset that has a reference view.
//!
//! Output maps are ordered by view, so the result does not depend on how the
//! thread pool scheduled the work.

use crate::{
    build_subsets, group_points, validate_policies, PairwiseMatcher, RegistrationConfig,
    RegistrationError, Subset, SubsetAnchors, ViewDescription,
};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use viewreg_core::{
    is_finite_affine, Affine3, CancelToken, CandidatePair, Group, PairwiseResult, Real, Vec3,
    ViewId, ViewPoint,
};
use viewreg_optim::{
    anchor_points, apply_map_back, optimize, resolve_map_back, OptimizationReport,
    PointMatchGraph,
};

/// Final transform of one view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    /// World-space correction (`map_back * optimized`).
    #[serde(with = "crate::serde_affine")]
    pub correction: Affine3,
    /// Updated registration, `correction * original registration`.
    #[serde(with = "crate::serde_affine")]
    pub registration: Affine3,
    /// Where the transform came from.
    pub description: String,
}

/// Summary of one subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsetReport {
    pub views: Vec<ViewId>,
    pub fixed: Vec<ViewId>,
    pub reference: Option<ViewId>,
    /// Candidate pairs that were matched.
    pub pairs: usize,
    /// Pairs whose matcher returned a result.
    pub accepted_pairs: usize,
    /// Inliers that could not be attached to a view of the subset.
    pub ignored_matches: usize,
    pub optimization: OptimizationReport,
    #[serde(with = "crate::serde_affine")]
    pub map_back: Affine3,
    /// Why map-back was skipped; the subset then keeps its optimized frame.
    #[serde(default)]
    pub map_back_error: Option<String>,
}

/// Observational per-pair numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairStatistics {
    pub pair: CandidatePair,
    pub candidates: usize,
    pub inliers: usize,
    pub error: Real,
    #[serde(with = "crate::serde_affine")]
    pub transform: Affine3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationOutput {
    #[serde(with = "view_entries")]
    pub transforms: BTreeMap<ViewId, ViewTransform>,
    pub subsets: Vec<SubsetReport>,
    #[serde(default)]
    pub pair_statistics: Option<Vec<PairStatistics>>,
}

/// Outcome of [`register_subset`].
#[derive(Debug, Clone)]
pub struct SubsetOutcome {
    /// Final world-space correction per view of the subset.
    pub transforms: BTreeMap<ViewId, Affine3>,
    pub report: SubsetReport,
}

/// Serialize view-keyed maps as `[[view, value], ...]`; JSON keys must be
/// strings.
mod view_entries {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;
    use viewreg_core::ViewId;

    pub fn serialize<S: Serializer, T: Serialize>(
        map: &BTreeMap<ViewId, T>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        s.collect_seq(map.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>, T: Deserialize<'de>>(
        d: D,
    ) -> Result<BTreeMap<ViewId, T>, D::Error> {
        let entries = Vec::<(ViewId, T)>::deserialize(d)?;
        Ok(entries.into_iter().collect())
    }
}

/// Match every pair, in parallel, and return the accepted results sorted
/// by `(subset index, pair)`.
///
/// Grouped sides are merged with `min_distance` de-duplication.
pub fn match_pairs(
    subsets: &[Subset],
    views: &BTreeMap<ViewId, &ViewDescription>,
    matcher: &dyn PairwiseMatcher,
    min_distance: Real,
    cancel: Option<&CancelToken>,
) -> Result<Vec<(usize, CandidatePair, PairwiseResult)>, RegistrationError> {
    let groups: BTreeSet<&Group> = subsets.iter().flat_map(|s| s.groups()).collect();
    let points: BTreeMap<&Group, Vec<ViewPoint>> = groups
        .into_par_iter()
        .map(|g| (g, group_points(g, views, min_distance)))
        .collect();

    let jobs: Vec<(usize, &CandidatePair)> = subsets
        .iter()
        .enumerate()
        .flat_map(|(i, s)| s.pairs().iter().map(move |p| (i, p)))
        .collect();
    let cancelled = || cancel.is_some_and(CancelToken::is_cancelled);

    let mut results: Vec<(usize, CandidatePair, PairwiseResult)> = jobs
        .into_par_iter()
        .filter_map(|(i, pair)| {
            if cancelled() {
                return None;
            }
            let a = points.get(pair.first())?;
            let b = points.get(pair.second())?;
            match matcher.match_pair(pair, a, b) {
                Some(res) => Some((i, pair.clone(), res)),
                None => {
                    debug!("{pair}: no result");
                    None
                }
            }
        })
        .collect();
    if cancelled() {
        return Err(RegistrationError::Cancelled);
    }
    results.sort_by(|x, y| (x.0, &x.1).cmp(&(y.0, &y.1)));
    Ok(results)
}

/// Point-match graph of `subset` from its accepted pair results.
pub fn build_point_matches(
    subset: &Subset,
    results: &[(CandidatePair, PairwiseResult)],
) -> PointMatchGraph {
    PointMatchGraph::build(subset.views().iter().copied(), results.iter().map(|(p, r)| (p, r)))
}

/// Optimize one subset from its accepted pair results and anchors.
pub fn register_subset(
    index: usize,
    subset: &Subset,
    views: &BTreeMap<ViewId, &ViewDescription>,
    results: &[(CandidatePair, PairwiseResult)],
    anchors: &SubsetAnchors,
    config: &RegistrationConfig,
    cancel: Option<&CancelToken>,
) -> Result<SubsetOutcome, RegistrationError> {
    anchors.validate(subset, index)?;

    let graph = build_point_matches(subset, results);
    let outcome = optimize(&graph, &anchors.fixed, &config.model, &config.optimizer, cancel)
        .map_err(|e| RegistrationError::from_optimize(e, index))?;

    let mut map_back = Affine3::identity();
    let mut map_back_error = None;
    if let Some(reference) = anchors.reference {
        let registrations: BTreeMap<ViewId, Affine3> = subset
            .views()
            .iter()
            .filter_map(|v| views.get(v).map(|d| (*v, d.registration)))
            .collect();
        let anchor_pts = anchor_points(views.get(&reference).and_then(|d| d.size));
        match resolve_map_back(
            &outcome.transforms,
            &registrations,
            reference,
            Some(config.map_back_model),
            &anchor_pts,
        ) {
            Ok(m) => map_back = m,
            Err(err) => {
                warn!("subset {index}: map-back onto {reference} failed ({err}); keeping identity");
                map_back_error = Some(err.to_string());
            }
        }
    }
    let transforms = apply_map_back(&map_back, &outcome.transforms);

    let report = SubsetReport {
        views: subset.views().to_vec(),
        fixed: anchors.fixed.iter().copied().collect(),
        reference: anchors.reference,
        pairs: subset.pairs().len(),
        accepted_pairs: results.len(),
        ignored_matches: graph.ignored(),
        optimization: outcome.report,
        map_back,
        map_back_error,
    };
    Ok(SubsetOutcome { transforms, report })
}

fn describe(view: ViewId, report: &SubsetReport, config: &RegistrationConfig) -> String {
    let opt = &report.optimization;
    let mut text = if report.pairs == 0 {
        "identity: no overlapping views".to_string()
    } else if opt.unconstrained_views.contains(&view) {
        "identity: under-constrained".to_string()
    } else if opt.failed {
        "identity: optimization failed".to_string()
    } else if opt.faulted_views.contains(&view) {
        "identity: numerical fault".to_string()
    } else if report.fixed.contains(&view) {
        format!("fixed, {} global optimization", config.model.name())
    } else {
        format!(
            "{} global optimization over {} views, mean error {:.3}",
            config.model.name(),
            report.views.len(),
            opt.mean_error
        )
    };
    if let Some(r) = report.reference {
        if report.map_back_error.is_some() {
            text.push_str(&format!(", map-back to {r} failed"));
        } else {
            let model = format!("{:?}", config.map_back_model).to_lowercase();
            text.push_str(&format!(", mapped back to {r} ({model})"));
        }
    }
    text
}

/// Run a complete global registration.
///
/// Configuration errors are reported before any matching starts. Subsets are
/// independent: a failed optimization only affects its own views, which
/// receive identity corrections and are flagged in the report.
pub fn run_global_registration(
    views: &[ViewDescription],
    groups: &[Group],
    matcher: &dyn PairwiseMatcher,
    config: &RegistrationConfig,
    cancel: Option<&CancelToken>,
) -> Result<RegistrationOutput, RegistrationError> {
    config.validate()?;
    if let Some(v) = views.iter().find(|v| !is_finite_affine(&v.registration)) {
        return Err(RegistrationError::NonFiniteRegistration(v.id));
    }
    let bad_size = |s: &Vec3| s.iter().any(|x| !x.is_finite() || *x <= 0.0);
    if let Some(v) = views.iter().find(|v| v.size.as_ref().is_some_and(bad_size)) {
        return Err(RegistrationError::InvalidViewSize(v.id));
    }
    let overlap = config.overlap.build();
    let subsets = build_subsets(views, groups, &config.pair_filter, overlap.as_ref())?;

    let by_id: BTreeMap<ViewId, &ViewDescription> = views.iter().map(|v| (v.id, v)).collect();
    let known: BTreeSet<ViewId> = by_id.keys().copied().collect();
    validate_policies(&config.fix, &config.map_back, &known)?;
    let anchors: Vec<SubsetAnchors> = subsets
        .iter()
        .map(|s| SubsetAnchors::select(s, &config.fix, &config.map_back))
        .collect();
    for (i, (s, a)) in subsets.iter().zip(&anchors).enumerate() {
        a.validate(s, i)?;
    }
    info!(
        "{} views in {} subsets, {} candidate pairs",
        views.len(),
        subsets.len(),
        subsets.iter().map(|s| s.pairs().len()).sum::<usize>()
    );

    let matched = match_pairs(&subsets, &by_id, matcher, config.group_min_distance, cancel)?;
    let pair_statistics = config.pair_statistics.then(|| {
        matched
            .iter()
            .map(|(_, pair, res)| PairStatistics {
                pair: pair.clone(),
                candidates: res.candidates().len(),
                inliers: res.num_inliers(),
                error: res.error(),
                transform: *res.transform(),
            })
            .collect()
    });
    let mut per_subset: Vec<Vec<(CandidatePair, PairwiseResult)>> = vec![Vec::new(); subsets.len()];
    for (i, pair, res) in matched {
        per_subset[i].push((pair, res));
    }

    let outcomes: Vec<SubsetOutcome> = subsets
        .par_iter()
        .zip(anchors.par_iter())
        .zip(per_subset.par_iter())
        .enumerate()
        .map(|(i, ((subset, anchors), results))| {
            register_subset(i, subset, &by_id, results, anchors, config, cancel)
        })
        .collect::<Result<_, _>>()?;

    let mut transforms = BTreeMap::new();
    let mut reports = Vec::with_capacity(outcomes.len());
    for (i, outcome) in outcomes.into_iter().enumerate() {
        let r = &outcome.report;
        let opt = &r.optimization;
        info!(
            "subset {i}: {} views, {}/{} pairs accepted, {} iterations, mean error {:.4}, max error {:.4}",
            r.views.len(),
            r.accepted_pairs,
            r.pairs,
            opt.iterations,
            opt.mean_error,
            opt.max_error
        );
        if opt.exceeds_max_error {
            warn!("subset {i}: mean error {:.4} exceeds the allowed maximum", opt.mean_error);
        }
        if !opt.converged {
            warn!("subset {i}: stopped at the iteration limit without converging");
        }
        for (view, correction) in &outcome.transforms {
            let registration = by_id
                .get(view)
                .map_or_else(Affine3::identity, |d| d.registration);
            transforms.insert(
                *view,
                ViewTransform {
                    correction: *correction,
                    registration: correction * registration,
                    description: describe(*view, r, config),
                },
            );
        }
        reports.push(outcome.report);
    }

    Ok(RegistrationOutput {
        transforms,
        subsets: reports,
        pair_statistics,
    })
}
