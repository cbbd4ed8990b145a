//! Which views are pinned and which view anchors map-back, per subset.

use crate::{RegistrationError, Subset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use viewreg_core::ViewId;

/// Views held at identity during optimization.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixPolicy {
    None,
    /// The smallest view of every subset.
    #[default]
    FirstView,
    /// The listed views, in whichever subsets they fall.
    Views(BTreeSet<ViewId>),
}

/// Reference view whose original placement is restored after optimization.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapBackPolicy {
    #[default]
    None,
    /// The smallest view of every subset.
    FirstView,
    /// One view; only its subset is mapped back.
    View(ViewId),
}

/// Fixed views and map-back reference of one subset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubsetAnchors {
    pub fixed: BTreeSet<ViewId>,
    pub reference: Option<ViewId>,
}

impl SubsetAnchors {
    /// Apply the policies to one subset.
    pub fn select(subset: &Subset, fix: &FixPolicy, map_back: &MapBackPolicy) -> Self {
        let fixed = match fix {
            FixPolicy::None => BTreeSet::new(),
            FixPolicy::FirstView => subset.first_view().into_iter().collect(),
            FixPolicy::Views(set) => set.iter().filter(|v| subset.contains(v)).copied().collect(),
        };
        let reference = match map_back {
            MapBackPolicy::None => None,
            MapBackPolicy::FirstView => subset.first_view(),
            MapBackPolicy::View(v) => subset.contains(v).then_some(*v),
        };
        Self { fixed, reference }
    }

    /// Every fixed view and the reference must belong to `subset`.
    pub fn validate(&self, subset: &Subset, index: usize) -> Result<(), RegistrationError> {
        if let Some(v) = self.fixed.iter().find(|v| !subset.contains(v)) {
            return Err(RegistrationError::FixedViewOutsideSubset {
                view: *v,
                subset: index,
            });
        }
        match self.reference {
            Some(v) if !subset.contains(&v) => {
                Err(RegistrationError::ReferenceOutsideSubset { view: v, subset: index })
            }
            _ => Ok(()),
        }
    }
}

/// Reject policies naming views that do not exist.
pub fn validate_policies(
    fix: &FixPolicy,
    map_back: &MapBackPolicy,
    known: &BTreeSet<ViewId>,
) -> Result<(), RegistrationError> {
    if let FixPolicy::Views(set) = fix {
        if let Some(v) = set.iter().find(|v| !known.contains(v)) {
            return Err(RegistrationError::UnknownPolicyView(*v));
        }
    }
    if let MapBackPolicy::View(v) = map_back {
        if !known.contains(v) {
            return Err(RegistrationError::UnknownPolicyView(*v));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_subsets, AllOverlap, PairFilter, ViewDescription};
    use viewreg_core::Affine3;

    fn two_subsets() -> Vec<Subset> {
        // Different timepoints never pair under the default filter.
        let views: Vec<ViewDescription> = [(0, 0), (0, 1), (1, 0)]
            .into_iter()
            .map(|(t, s)| ViewDescription::new(ViewId::new(t, s), Affine3::identity()))
            .collect();
        build_subsets(&views, &[], &PairFilter::default(), &AllOverlap).unwrap()
    }

    #[test]
    fn policies_resolve_per_subset() {
        let subsets = two_subsets();
        assert_eq!(subsets.len(), 2);
        let fix = FixPolicy::Views(BTreeSet::from([ViewId::new(0, 1), ViewId::new(1, 0)]));
        let mb = MapBackPolicy::View(ViewId::new(1, 0));
        let a0 = SubsetAnchors::select(&subsets[0], &fix, &mb);
        let a1 = SubsetAnchors::select(&subsets[1], &fix, &mb);
        assert_eq!(a0.fixed, BTreeSet::from([ViewId::new(0, 1)]));
        assert_eq!(a0.reference, None);
        assert_eq!(a1.reference, Some(ViewId::new(1, 0)));
        let first = SubsetAnchors::select(&subsets[0], &FixPolicy::FirstView, &MapBackPolicy::None);
        assert_eq!(first.fixed, BTreeSet::from([ViewId::new(0, 0)]));
    }

    #[test]
    fn anchors_outside_the_subset_are_rejected() {
        let subsets = two_subsets();
        let bad = SubsetAnchors {
            fixed: BTreeSet::from([ViewId::new(1, 0)]),
            reference: None,
        };
        assert_eq!(
            bad.validate(&subsets[0], 0),
            Err(RegistrationError::FixedViewOutsideSubset {
                view: ViewId::new(1, 0),
                subset: 0
            })
        );
        let bad_ref = SubsetAnchors {
            fixed: BTreeSet::new(),
            reference: Some(ViewId::new(0, 0)),
        };
        assert!(matches!(
            bad_ref.validate(&subsets[1], 1),
            Err(RegistrationError::ReferenceOutsideSubset { .. })
        ));
    }

    #[test]
    fn unknown_policy_views_are_rejected() {
        let known = BTreeSet::from([ViewId::new(0, 0)]);
        let err = validate_policies(&FixPolicy::None, &MapBackPolicy::View(ViewId::new(4, 4)), &known);
        assert_eq!(err, Err(RegistrationError::UnknownPolicyView(ViewId::new(4, 4))));
    }
}
