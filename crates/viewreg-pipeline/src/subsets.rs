//! View graph: candidate pairs and their connected components.

use crate::{OverlapTest, PairFilter, RegistrationError, ViewAttributes, ViewDescription};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use viewreg_core::{CandidatePair, Group, ViewId};

/// A connected component of the candidate-pair graph, solved on its own.
///
/// Views, groups and pairs are stored sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subset {
    views: Vec<ViewId>,
    groups: Vec<Group>,
    pairs: Vec<CandidatePair>,
}

impl Subset {
    pub fn views(&self) -> &[ViewId] {
        &self.views
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Group-level candidate pairs internal to this subset.
    pub fn pairs(&self) -> &[CandidatePair] {
        &self.pairs
    }

    /// Group pairs expanded to all view pairs across each pair's two groups.
    pub fn view_pairs(&self) -> Vec<(ViewId, ViewId)> {
        let set: BTreeSet<(ViewId, ViewId)> =
            self.pairs.iter().flat_map(CandidatePair::view_pairs).collect();
        set.into_iter().collect()
    }

    pub fn contains(&self, view: &ViewId) -> bool {
        self.views.binary_search(view).is_ok()
    }

    pub fn first_view(&self) -> Option<ViewId> {
        self.views.first().copied()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

/// Complete `groups` so that every view is in exactly one group.
///
/// Views not covered by any group become singletons. A view listed in two
/// groups, or a group member that is not a known view, is an error. The
/// result is sorted.
pub fn resolve_groups(views: &[ViewId], groups: &[Group]) -> Result<Vec<Group>, RegistrationError> {
    let known: BTreeSet<ViewId> = views.iter().copied().collect();
    let mut covered = BTreeSet::new();
    let mut out = Vec::with_capacity(views.len());
    for g in groups.iter().filter(|g| !g.is_empty()) {
        for v in g.iter() {
            if !known.contains(&v) {
                return Err(RegistrationError::UnknownGroupView(v));
            }
            if !covered.insert(v) {
                return Err(RegistrationError::ViewInTwoGroups(v));
            }
        }
        out.push(g.clone());
    }
    out.extend(known.difference(&covered).map(|v| Group::single(*v)));
    out.sort();
    Ok(out)
}

struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Smaller index becomes the root so component roots are stable.
            let (lo, hi) = (ra.min(rb), ra.max(rb));
            self.parent[hi] = lo;
        }
    }
}

/// Decompose views into independently solvable subsets.
///
/// Candidate pairs are all group pairs admitted by `filter` whose members
/// pass `overlap`; connected components of the surviving pairs become
/// subsets, sorted by their smallest view. Isolated views become singleton
/// subsets. Identical input gives identical output.
pub fn build_subsets(
    views: &[ViewDescription],
    groups: &[Group],
    filter: &PairFilter,
    overlap: &dyn OverlapTest,
) -> Result<Vec<Subset>, RegistrationError> {
    let by_id: BTreeMap<ViewId, &ViewDescription> = views.iter().map(|v| (v.id, v)).collect();
    if by_id.len() != views.len() {
        let mut seen = BTreeSet::new();
        if let Some(v) = views.iter().find(|v| !seen.insert(v.id)) {
            return Err(RegistrationError::DuplicateView(v.id));
        }
    }
    let ids: Vec<ViewId> = by_id.keys().copied().collect();
    let groups = resolve_groups(&ids, groups)?;
    let attributes: BTreeMap<ViewId, ViewAttributes> =
        by_id.iter().map(|(id, v)| (*id, v.attributes)).collect();
    let members = |g: &Group| -> Vec<&ViewDescription> {
        g.iter().filter_map(|v| by_id.get(&v).copied()).collect()
    };

    let mut sets = DisjointSets::new(groups.len());
    let mut edges: Vec<(usize, CandidatePair)> = Vec::new();
    for i in 0..groups.len() {
        for j in (i + 1)..groups.len() {
            let pair = CandidatePair::new(groups[i].clone(), groups[j].clone());
            if pair.is_self_pair() || !filter.admits(&groups[i], &groups[j], &attributes) {
                continue;
            }
            if !overlap.overlaps(&members(&groups[i]), &members(&groups[j])) {
                debug!("{pair}: no overlap");
                continue;
            }
            sets.union(i, j);
            edges.push((i, pair));
        }
    }

    let mut components: BTreeMap<usize, Subset> = BTreeMap::new();
    for (i, g) in groups.iter().enumerate() {
        let root = sets.find(i);
        let s = components.entry(root).or_insert_with(|| Subset {
            views: Vec::new(),
            groups: Vec::new(),
            pairs: Vec::new(),
        });
        s.views.extend(g.iter());
        s.groups.push(g.clone());
    }
    for (i, pair) in edges {
        let root = sets.find(i);
        if let Some(s) = components.get_mut(&root) {
            s.pairs.push(pair);
        }
    }

    let mut subsets: Vec<Subset> = components
        .into_values()
        .map(|mut s| {
            s.views.sort();
            s.groups.sort();
            s.pairs.sort();
            s.pairs.dedup();
            s
        })
        .collect();
    subsets.sort_by_key(|s| s.first_view());
    Ok(subsets)
}
