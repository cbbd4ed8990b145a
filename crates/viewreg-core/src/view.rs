//! View identities, groups and candidate pairs.
//!

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identity of one acquisition: `(timepoint, setup)`.
///
/// Ordered by timepoint first, then setup. This order is the canonical
/// traversal order everywhere in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ViewId {
    pub timepoint: u32,
    pub setup: u32,
}

impl ViewId {
    pub const fn new(timepoint: u32, setup: u32) -> Self {
        Self { timepoint, setup }
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tp{}/setup{}", self.timepoint, self.setup)
    }
}

/// A set of views treated as one logical node (e.g. several illuminations of
/// the same tile). A plain view is a singleton group.
///
/// Groups order lexicographically by their sorted members, so the group with
/// the smallest first view comes first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Group {
    views: BTreeSet<ViewId>,
}

impl Group {
    /// Build a group from any collection of views. Duplicates collapse.
    pub fn new(views: impl IntoIterator<Item = ViewId>) -> Self {
        Self {
            views: views.into_iter().collect(),
        }
    }

    pub fn single(view: ViewId) -> Self {
        Self::new([view])
    }

    pub fn views(&self) -> &BTreeSet<ViewId> {
        &self.views
    }

    pub fn iter(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.views.iter().copied()
    }

    pub fn contains(&self, view: &ViewId) -> bool {
        self.views.contains(view)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Smallest member, used as the group's representative.
    pub fn first(&self) -> Option<ViewId> {
        self.views.first().copied()
    }

    pub fn shares_view_with(&self, other: &Group) -> bool {
        !self.views.is_disjoint(&other.views)
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.views.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "]")
    }
}

/// Unordered pair of groups proposed for matching.
///
/// The constructor canonicalizes the order so `(A, B)` and `(B, A)` are the
/// same value; `first <= second` always holds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidatePair {
    first: Group,
    second: Group,
}

impl CandidatePair {
    pub fn new(a: Group, b: Group) -> Self {
        if a <= b {
            Self {
                first: a,
                second: b,
            }
        } else {
            Self {
                first: b,
                second: a,
            }
        }
    }

    /// Pair of two single views.
    pub fn of_views(a: ViewId, b: ViewId) -> Self {
        Self::new(Group::single(a), Group::single(b))
    }

    pub fn first(&self) -> &Group {
        &self.first
    }

    pub fn second(&self) -> &Group {
        &self.second
    }

    /// A pair is degenerate if both sides are the same group or share a view.
    pub fn is_self_pair(&self) -> bool {
        self.first.shares_view_with(&self.second)
    }

    /// All view-level pairs `(a, b)` with `a` from the first group and `b`
    /// from the second, in canonical order with `a < b` inside each pair.
    pub fn view_pairs(&self) -> Vec<(ViewId, ViewId)> {
        let mut out = Vec::with_capacity(self.first.len() * self.second.len());
        for a in self.first.iter() {
            for b in self.second.iter() {
                if a != b {
                    out.push(if a < b { (a, b) } else { (b, a) });
                }
            }
        }
        out.sort();
        out.dedup();
        out
    }
}

impl fmt::Display for CandidatePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.first, self.second)
    }
}
