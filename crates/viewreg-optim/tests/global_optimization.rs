//! Integration tests for subset optimization.
//!
//! Covers:
//! 1. The three-view line A - B - C with C fixed
//! 2. Fixed views staying at identity
//! 3. Subsets without any correspondence
//! 4. Termination under conflicting constraints
//! 5. Iterative removal of an inconsistent link
//! 6. Views with too few matches for the model
//! 7. Robust weighting of an outlier link

use nalgebra::{Rotation3, Translation3, UnitQuaternion};
use std::collections::BTreeSet;
use viewreg_core::{affine_from_iso, translation, Affine3, Iso3, Pt3, Real, Vec3, ViewId};
use viewreg_linear::ModelKind;
use viewreg_optim::{
    optimize, ConvergenceCriteria, LinkRemoval, OptimizerOptions, PointMatchGraph, RobustKernel,
};

fn bead(k: usize, offset: Real) -> Pt3 {
    Pt3::new(
        offset + (k % 4) as Real * 6.0,
        ((k / 4) % 3) as Real * 5.0 + (k % 2) as Real,
        ((k * 7) % 5) as Real * 3.0,
    )
}

/// Add `n` matches of true beads seen through the misregistrations `ea` / `eb`.
fn link(g: &mut PointMatchGraph, a: (ViewId, &Affine3), b: (ViewId, &Affine3), n: usize, offset: Real) {
    for k in 0..n {
        let x = bead(k, offset);
        g.add_match(a.0, a.1.transform_point(&x), b.0, b.1.transform_point(&x), 1.0);
    }
}

fn max_point_error(fit: &Affine3, expected: &Affine3) -> Real {
    (0..12)
        .map(|k| {
            let p = bead(k, 0.0);
            (fit.transform_point(&p) - expected.transform_point(&p)).norm()
        })
        .fold(0.0, Real::max)
}

#[test]
fn three_view_line_with_fixed_end_converges_to_truth() {
    let (a, b, c) = (ViewId::new(0, 0), ViewId::new(0, 1), ViewId::new(0, 2));
    // Misregistration of each view; C is correct and pinned.
    let ea = affine_from_iso(&Iso3::from_parts(
        Translation3::new(-2.0, 1.0, 0.5),
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_euler_angles(0.02, 0.0, -0.03)),
    ));
    let eb = translation(Vec3::new(5.0, 0.0, 0.0));
    let ec = Affine3::identity();

    let mut g = PointMatchGraph::new([a, b, c]);
    link(&mut g, (a, &ea), (b, &eb), 10, 0.0);
    link(&mut g, (b, &eb), (c, &ec), 10, 30.0);

    let out = optimize(
        &g,
        &BTreeSet::from([c]),
        &ModelKind::Rigid,
        &OptimizerOptions::default(),
        None,
    )
    .unwrap();

    assert!(!out.report.failed);
    assert!(out.report.mean_error < 1e-6, "mean error {}", out.report.mean_error);
    assert_eq!(out.transforms[&c], Affine3::identity());
    let inv_b = eb.inverse();
    let inv_a = ea.inverse();
    assert!(max_point_error(&out.transforms[&b], &inv_b) < 1e-5);
    assert!(max_point_error(&out.transforms[&a], &inv_a) < 1e-5);
}

#[test]
fn fixed_views_never_move() {
    let views: Vec<ViewId> = (0..4).map(|s| ViewId::new(0, s)).collect();
    let mut g = PointMatchGraph::new(views.iter().copied());
    let shifts = [0.0, 3.0, -4.0, 8.0];
    for i in 0..4 {
        for j in (i + 1)..4 {
            let ei = translation(Vec3::new(shifts[i], 0.0, 0.0));
            let ej = translation(Vec3::new(0.0, shifts[j], 0.0));
            link(&mut g, (views[i], &ei), (views[j], &ej), 6, (i * 10 + j) as Real);
        }
    }
    let fixed = BTreeSet::from([views[1], views[3]]);
    for model in [ModelKind::Translation, ModelKind::Rigid, ModelKind::Affine] {
        let out = optimize(&g, &fixed, &model, &OptimizerOptions::default(), None).unwrap();
        for v in &fixed {
            assert_eq!(out.transforms[v], Affine3::identity(), "{model:?} moved {v}");
        }
    }
}

#[test]
fn subset_without_matches_degrades_to_identity() {
    let views = [ViewId::new(0, 0), ViewId::new(0, 1), ViewId::new(0, 2)];
    let g = PointMatchGraph::new(views);
    let out = optimize(
        &g,
        &BTreeSet::new(),
        &ModelKind::Affine,
        &OptimizerOptions::default(),
        None,
    )
    .unwrap();
    assert_eq!(out.transforms.len(), 3);
    assert!(out.transforms.values().all(|t| *t == Affine3::identity()));
    assert!(!out.report.failed);
    assert_eq!(out.report.num_matches, 0);
}

#[test]
fn conflicting_loop_terminates_on_plateau() {
    let views: Vec<ViewId> = (0..3).map(|s| ViewId::new(0, s)).collect();
    let mut g = PointMatchGraph::new(views.iter().copied());
    // Every edge claims a +1 shift around the loop, which no solution satisfies.
    let id = Affine3::identity();
    let shift = translation(Vec3::new(1.0, 0.0, 0.0));
    link(&mut g, (views[0], &id), (views[1], &shift), 8, 0.0);
    link(&mut g, (views[1], &id), (views[2], &shift), 8, 0.0);
    link(&mut g, (views[2], &id), (views[0], &shift), 8, 0.0);

    let opts = OptimizerOptions {
        criteria: ConvergenceCriteria {
            max_iterations: 5_000,
            plateau_width: 20,
            min_relative_improvement: 1e-6,
            max_allowed_error: Some(0.1),
        },
        ..Default::default()
    };
    let out = optimize(&g, &BTreeSet::from([views[0]]), &ModelKind::Translation, &opts, None).unwrap();
    assert!(out.report.converged);
    assert!(out.report.iterations < 5_000);
    assert!(out.report.mean_error > 0.1);
    assert!(out.report.exceeds_max_error);
    assert!(!out.report.failed);
    assert!(out.transforms.values().all(|t| t.matrix().iter().all(|v| v.is_finite())));
}

#[test]
fn inconsistent_link_is_removed_and_run_restarts() {
    let views: Vec<ViewId> = (0..4).map(|s| ViewId::new(0, s)).collect();
    let mut g = PointMatchGraph::new(views.iter().copied());
    let id = Affine3::identity();
    let bad = translation(Vec3::new(20.0, 0.0, 0.0));
    for i in 0..4 {
        for j in (i + 1)..4 {
            let eb = if (i, j) == (1, 3) { &bad } else { &id };
            link(&mut g, (views[i], &id), (views[j], eb), 6, 0.0);
        }
    }
    let opts = OptimizerOptions {
        link_removal: Some(LinkRemoval {
            relative_threshold: 1.5,
            absolute_threshold: 1.0,
        }),
        ..Default::default()
    };
    let out = optimize(&g, &BTreeSet::from([views[0]]), &ModelKind::Translation, &opts, None).unwrap();
    assert_eq!(out.report.removed_links, vec![(views[1], views[3])]);
    assert!(out.report.mean_error < 1e-6);
    assert_eq!(out.report.num_matches, 5 * 6);
    assert!(out.transforms.values().all(|t| max_point_error(t, &id) < 1e-6));
}

#[test]
fn too_few_matches_for_the_model_flag_the_subset() {
    let (a, b) = (ViewId::new(0, 0), ViewId::new(0, 1));
    let mut g = PointMatchGraph::new([a, b]);
    // Two matches cannot pin down a rotation.
    for k in 0..2 {
        let p = Pt3::new(k as Real * 10.0, 0.0, 0.0);
        g.add_match(a, p, b, p + Vec3::new(5.0, 0.0, 0.0), 1.0);
    }
    let out = optimize(
        &g,
        &BTreeSet::from([a]),
        &ModelKind::Rigid,
        &OptimizerOptions::default(),
        None,
    )
    .unwrap();
    assert!(out.report.failed);
    assert!(!out.report.converged);
    assert_eq!(out.report.unconstrained_views, vec![b]);
    assert_eq!(out.transforms[&b], Affine3::identity());
}

#[test]
fn under_constrained_view_does_not_fail_the_rest() {
    let (a, b, c) = (ViewId::new(0, 0), ViewId::new(0, 1), ViewId::new(0, 2));
    let id = Affine3::identity();
    let eb = translation(Vec3::new(3.0, 0.0, 0.0));
    let mut g = PointMatchGraph::new([a, b, c]);
    link(&mut g, (a, &id), (b, &eb), 10, 0.0);
    link(&mut g, (b, &eb), (c, &id), 2, 0.0);

    let out = optimize(
        &g,
        &BTreeSet::from([a]),
        &ModelKind::Rigid,
        &OptimizerOptions::default(),
        None,
    )
    .unwrap();
    assert!(!out.report.failed);
    assert_eq!(out.report.unconstrained_views, vec![c]);
    assert_eq!(out.transforms[&c], Affine3::identity());
    assert!(max_point_error(&out.transforms[&b], &eb.inverse()) < 0.5);
}

#[test]
fn huber_kernel_limits_the_pull_of_an_outlier_link() {
    let views: Vec<ViewId> = (0..3).map(|s| ViewId::new(0, s)).collect();
    let id = Affine3::identity();
    let bad = translation(Vec3::new(10.0, 0.0, 0.0));
    let mut g = PointMatchGraph::new(views.iter().copied());
    link(&mut g, (views[0], &id), (views[1], &id), 6, 0.0);
    link(&mut g, (views[1], &id), (views[2], &id), 6, 0.0);
    link(&mut g, (views[0], &id), (views[2], &bad), 6, 0.0);
    let fixed = BTreeSet::from([views[0]]);

    let run = |robust: RobustKernel| {
        let opts = OptimizerOptions {
            robust,
            ..Default::default()
        };
        optimize(&g, &fixed, &ModelKind::Translation, &opts, None).unwrap()
    };
    let l2 = run(RobustKernel::None);
    let huber = run(RobustKernel::Huber { delta: 1.0 });

    // Least squares spreads the outlier: views 1 and 2 move by 10/3 and 20/3.
    let l2_err = max_point_error(&l2.transforms[&views[2]], &id);
    let huber_err = max_point_error(&huber.transforms[&views[2]], &id);
    assert!((l2_err - 20.0 / 3.0).abs() < 0.1, "l2 error {l2_err}");
    // Huber caps the outlier's pull at delta: views 1 and 2 move by 1 and 2.
    assert!((huber_err - 2.0).abs() < 0.1, "huber error {huber_err}");
    assert!(
        max_point_error(&huber.transforms[&views[1]], &id)
            < max_point_error(&l2.transforms[&views[1]], &id)
    );
}
