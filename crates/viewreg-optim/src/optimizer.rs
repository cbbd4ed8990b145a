//! Iterative tile relaxation over a point-match graph.
//!
//! Every sweep visits the movable tiles in canonical order and refits each one
//! onto the current positions of its neighbours' matched points (Gauss-Seidel
//! style). Fixed tiles stay at identity and act as anchors. Sweeps repeat until
//! one of the [`ConvergenceCriteria`] fires.

use crate::{
    ConvergenceCriteria, CriteriaError, ErrorHistory, PointMatchGraph, RobustKernel, Tile,
    TileConfiguration, TileUpdate, EXACT_FIT_ERROR,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use thiserror::Error;
use viewreg_core::{Affine3, CancelToken, Real, ViewId};
use viewreg_linear::{FitError, ModelKind};

/// Drop the worst link after convergence and re-run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkRemoval {
    /// Worst link error must exceed this multiple of the mean error.
    pub relative_threshold: Real,
    /// Worst link error must exceed this absolute distance.
    pub absolute_threshold: Real,
}

impl Default for LinkRemoval {
    fn default() -> Self {
        Self {
            relative_threshold: 3.5,
            absolute_threshold: 7.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerOptions {
    pub criteria: ConvergenceCriteria,
    pub robust: RobustKernel,
    /// Breadth-first pre-alignment from the fixed tiles before relaxing.
    pub pre_align: bool,
    pub link_removal: Option<LinkRemoval>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OptimizeError {
    #[error("fixed view {0} is not part of the point-match graph")]
    UnknownFixedView(ViewId),
    #[error("invalid convergence criteria: {0}")]
    InvalidCriteria(#[from] CriteriaError),
    #[error("invalid model: {0}")]
    InvalidModel(#[from] FitError),
    #[error("invalid robust kernel {0:?}")]
    InvalidKernel(RobustKernel),
    #[error("link removal thresholds must be finite and non-negative")]
    InvalidLinkRemoval,
    #[error("optimization cancelled")]
    Cancelled,
}

/// Summary of one subset optimization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    /// Sweeps performed, summed over link-removal restarts.
    pub iterations: usize,
    pub mean_error: Real,
    pub max_error: Real,
    pub converged: bool,
    pub exceeds_max_error: bool,
    /// No usable solution was found; every view received identity.
    pub failed: bool,
    pub faulted_views: Vec<ViewId>,
    /// Views with matches that never got enough of them for one fit; they
    /// keep the identity transform.
    pub unconstrained_views: Vec<ViewId>,
    pub removed_links: Vec<(ViewId, ViewId)>,
    pub num_matches: usize,
}

#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    /// World-space correction per view, in canonical order.
    pub transforms: BTreeMap<ViewId, Affine3>,
    pub report: OptimizationReport,
}

#[derive(Debug, Default)]
struct RelaxStats {
    iterations: usize,
    converged: bool,
}

/// Optimize one subset.
///
/// Views in `fixed` keep the identity transform. A subset without matches
/// yields identity everywhere and is reported as converged. Numerical trouble
/// and under-constrained tiles never return `Err`: they show up as faulted or
/// unconstrained views, and as the `failed` flag when no constrained tile
/// could be solved.
pub fn optimize(
    graph: &PointMatchGraph,
    fixed: &BTreeSet<ViewId>,
    model: &ModelKind,
    opts: &OptimizerOptions,
    cancel: Option<&CancelToken>,
) -> Result<OptimizationOutcome, OptimizeError> {
    model.validate()?;
    opts.criteria.validate()?;
    if !opts.robust.is_valid() {
        return Err(OptimizeError::InvalidKernel(opts.robust));
    }
    if let Some(lr) = opts.link_removal {
        let ok = |v: Real| v.is_finite() && v >= 0.0;
        if !ok(lr.relative_threshold) || !ok(lr.absolute_threshold) {
            return Err(OptimizeError::InvalidLinkRemoval);
        }
    }
    if let Some(v) = fixed.iter().find(|v| graph.index_of(v).is_none()) {
        return Err(OptimizeError::UnknownFixedView(*v));
    }

    let mut graph = graph.clone();
    let mut removed = Vec::new();
    let mut iterations = 0;
    let (cfg, stats) = loop {
        let mut cfg = TileConfiguration::from_graph(&graph, fixed);
        let stats = relax(&mut cfg, model, opts, cancel)?;
        iterations += stats.iterations;
        let worst = opts
            .link_removal
            .and_then(|lr| removable_link(&cfg, &graph, &lr));
        match worst {
            Some((a, b, err)) => {
                debug!("removing link {a} <-> {b} (mean error {err:.3})");
                graph.remove_link(a, b);
                removed.push((a, b));
            }
            None => break (cfg, stats),
        }
    };

    let (mean_error, max_error) = cfg.errors();
    let faulted_views: Vec<ViewId> = cfg
        .tiles()
        .iter()
        .filter(|t| t.faulted)
        .map(|t| t.view)
        .collect();
    let unconstrained_views: Vec<ViewId> = constrained(&cfg)
        .filter(|t| !t.faulted && !t.updated)
        .map(|t| t.view)
        .collect();
    let failed = is_failed(&cfg);
    if !faulted_views.is_empty() {
        warn!("{} view(s) faulted and were reset to identity", faulted_views.len());
    }
    if !unconstrained_views.is_empty() {
        warn!(
            "{} view(s) have too few matches for a {} fit and keep identity",
            unconstrained_views.len(),
            model.name()
        );
    }

    let transforms = cfg
        .tiles()
        .iter()
        .map(|t| {
            let m = if failed { Affine3::identity() } else { t.model };
            (t.view, m)
        })
        .collect();
    if failed {
        warn!(
            "optimization of {} view(s) failed; falling back to identity",
            cfg.len()
        );
    }

    let report = OptimizationReport {
        iterations,
        mean_error,
        max_error,
        converged: stats.converged,
        exceeds_max_error: opts.criteria.exceeds_max_error(mean_error),
        failed,
        faulted_views,
        unconstrained_views,
        removed_links: removed,
        num_matches: graph.num_matches(),
    };
    Ok(OptimizationOutcome { transforms, report })
}

/// Movable tiles that carry at least one match.
fn constrained(cfg: &TileConfiguration) -> impl Iterator<Item = &Tile> {
    cfg.tiles()
        .iter()
        .filter(|t| !t.fixed && !t.matches.is_empty())
}

/// A subset fails when it has constrained tiles and none of them ended with
/// an accepted fit.
fn is_failed(cfg: &TileConfiguration) -> bool {
    let mut tiles = constrained(cfg).peekable();
    tiles.peek().is_some() && tiles.all(|t| t.faulted || !t.updated)
}

fn relax(
    cfg: &mut TileConfiguration,
    model: &ModelKind,
    opts: &OptimizerOptions,
    cancel: Option<&CancelToken>,
) -> Result<RelaxStats, OptimizeError> {
    let mut stats = RelaxStats::default();
    let movable: Vec<usize> = (0..cfg.len())
        .filter(|&i| !cfg.tiles()[i].fixed && !cfg.tiles()[i].matches.is_empty())
        .collect();
    if movable.is_empty() {
        stats.converged = true;
        return Ok(stats);
    }

    if opts.pre_align {
        pre_align(cfg, model);
    }

    let criteria = &opts.criteria;
    let mut history = ErrorHistory::default();
    history.push(cfg.errors().0);
    while stats.iterations < criteria.max_iterations {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(OptimizeError::Cancelled);
        }
        let mut sweep_updated = false;
        for &i in &movable {
            if cfg.update_tile(i, model, opts.robust, None) == TileUpdate::Updated {
                sweep_updated = true;
            }
        }
        stats.iterations += 1;
        // Without an accepted fit the next sweep would see the same state.
        if !sweep_updated {
            break;
        }

        let (mean, _) = cfg.errors();
        history.push(mean);
        if mean < EXACT_FIT_ERROR
            || history.is_plateau(criteria.plateau_width, criteria.min_relative_improvement)
        {
            stats.converged = true;
            break;
        }
        if movable.iter().all(|&i| cfg.tiles()[i].faulted) {
            break;
        }
    }
    Ok(stats)
}

/// Breadth-first pre-alignment. Each newly reached tile is fitted against
/// matches to already aligned tiles only.
fn pre_align(cfg: &mut TileConfiguration, model: &ModelKind) {
    let n = cfg.len();
    let mut aligned: Vec<bool> = cfg.tiles().iter().map(|t| t.fixed).collect();

    let mut queue: VecDeque<usize> = (0..n).filter(|&i| aligned[i]).collect();
    loop {
        if queue.is_empty() {
            // Seed the next component from its first constrained tile.
            let Some(seed) = (0..n).find(|&i| !aligned[i] && !cfg.tiles()[i].matches.is_empty())
            else {
                break;
            };
            aligned[seed] = true;
            queue.push_back(seed);
        }
        while let Some(i) = queue.pop_front() {
            let neighbours: BTreeSet<usize> =
                cfg.tiles()[i].matches.iter().map(|m| m.other).collect();
            for j in neighbours {
                if aligned[j] {
                    continue;
                }
                cfg.update_tile(j, model, RobustKernel::None, Some(&aligned));
                aligned[j] = true;
                queue.push_back(j);
            }
        }
    }
}

/// Worst link that exceeds both thresholds and whose removal leaves each of
/// its tiles with at least one other link.
fn removable_link(
    cfg: &TileConfiguration,
    graph: &PointMatchGraph,
    lr: &LinkRemoval,
) -> Option<(ViewId, ViewId, Real)> {
    let (mean, _) = cfg.errors();
    let degrees = graph.degrees();
    let mut links = cfg.link_errors();
    links.sort_by(|x, y| y.1.total_cmp(&x.1));
    for ((a, b), err) in links {
        if err <= lr.absolute_threshold || err <= lr.relative_threshold * mean {
            break;
        }
        if degrees[a] > 1 && degrees[b] > 1 {
            let views = graph.views();
            return Some((views[a], views[b], err));
        }
    }
    None
}
