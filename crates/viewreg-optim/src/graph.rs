//! Point-match graph: accepted correspondences demultiplexed onto views.
//!
//! Matching may run on groups of views, but every correspondence remembers
//! the view each point came from. The graph re-keys constraints by those
//! origin views, so the optimizer always works at view granularity.

use log::debug;
use std::collections::BTreeMap;
use viewreg_core::{CandidatePair, PairwiseResult, Pt3, Real, ViewId};

/// One constraint between two tiles: `p` in the lower-indexed view and `q` in
/// the higher-indexed view should coincide after optimization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkMatch {
    pub p: Pt3,
    pub q: Pt3,
    pub w: Real,
}

/// Weighted point-match constraints of one subset, keyed by view pair.
#[derive(Debug, Clone, Default)]
pub struct PointMatchGraph {
    views: Vec<ViewId>,
    index: BTreeMap<ViewId, usize>,
    links: BTreeMap<(usize, usize), Vec<LinkMatch>>,
    ignored: usize,
}

impl PointMatchGraph {
    /// Graph with one node per view and no constraints.
    ///
    /// Views are sorted and deduplicated; node order is the canonical order.
    pub fn new(views: impl IntoIterator<Item = ViewId>) -> Self {
        let mut views: Vec<ViewId> = views.into_iter().collect();
        views.sort();
        views.dedup();
        let index = views.iter().enumerate().map(|(i, v)| (*v, i)).collect();
        Self {
            views,
            index,
            links: BTreeMap::new(),
            ignored: 0,
        }
    }

    /// Build the graph of `views` from accepted pairwise results.
    ///
    /// Each inlier becomes a constraint between its two origin views with
    /// weight `correspondence.weight * result.weight`. Inliers touching a view
    /// outside `views`, or linking a view to itself, are skipped and counted in
    /// [`PointMatchGraph::ignored`].
    pub fn build<'a>(
        views: impl IntoIterator<Item = ViewId>,
        results: impl IntoIterator<Item = (&'a CandidatePair, &'a PairwiseResult)>,
    ) -> Self {
        let mut graph = Self::new(views);
        for (pair, result) in results {
            let before = graph.num_matches();
            for c in result.inliers() {
                graph.add_match(c.a.view, c.a.world, c.b.view, c.b.world, c.weight * result.weight());
            }
            debug!(
                "{pair}: {} constraints from {} inliers",
                graph.num_matches() - before,
                result.num_inliers()
            );
        }
        graph
    }

    /// Add one constraint; returns `false` (and counts it as ignored) when it
    /// cannot be placed.
    pub fn add_match(&mut self, va: ViewId, pa: Pt3, vb: ViewId, pb: Pt3, w: Real) -> bool {
        let (Some(&ia), Some(&ib)) = (self.index.get(&va), self.index.get(&vb)) else {
            self.ignored += 1;
            return false;
        };
        if ia == ib || w <= 0.0 || !w.is_finite() {
            self.ignored += 1;
            return false;
        }
        let (key, m) = if ia < ib {
            ((ia, ib), LinkMatch { p: pa, q: pb, w })
        } else {
            ((ib, ia), LinkMatch { p: pb, q: pa, w })
        };
        self.links.entry(key).or_default().push(m);
        true
    }

    /// Drop every constraint between two views. Returns the number removed.
    pub fn remove_link(&mut self, a: ViewId, b: ViewId) -> usize {
        let (Some(&ia), Some(&ib)) = (self.index.get(&a), self.index.get(&b)) else {
            return 0;
        };
        let key = (ia.min(ib), ia.max(ib));
        self.links.remove(&key).map_or(0, |v| v.len())
    }

    pub fn views(&self) -> &[ViewId] {
        &self.views
    }

    pub fn index_of(&self, view: &ViewId) -> Option<usize> {
        self.index.get(view).copied()
    }

    /// Links in canonical `(lower, higher)` node order.
    pub fn links(&self) -> impl Iterator<Item = ((usize, usize), &[LinkMatch])> + '_ {
        self.links.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    pub fn num_matches(&self) -> usize {
        self.links.values().map(Vec::len).sum()
    }

    /// Inliers that could not be attached to the graph.
    pub fn ignored(&self) -> usize {
        self.ignored
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Distinct neighbours of each node.
    pub fn degrees(&self) -> Vec<usize> {
        let mut deg = vec![0; self.views.len()];
        for &(a, b) in self.links.keys() {
            deg[a] += 1;
            deg[b] += 1;
        }
        deg
    }
}
