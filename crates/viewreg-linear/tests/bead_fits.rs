//! Model fits on synthetic bead correspondences between two tiles.

use nalgebra::{Matrix3, Rotation3, Translation3, UnitQuaternion};
use viewreg_core::synthetic::{beads, UniformNoise3};
use viewreg_core::{
    affine_from_iso, affine_from_parts, affine_max_abs_diff, Affine3, Iso3, Pt3, RansacOptions,
    Real, Vec3,
};
use viewreg_linear::{ransac_fit, BaseModel, ModelKind, PointMatch};

fn matches(gt: &Affine3, noise: &UniformNoise3) -> Vec<PointMatch> {
    beads(60, Pt3::origin(), Pt3::new(80.0, 80.0, 30.0), 5)
        .iter()
        .enumerate()
        .map(|(i, p)| PointMatch::new(*p, gt.transform_point(p) + noise.sample(0, i)))
        .collect()
}

fn rigid_truth() -> Affine3 {
    affine_from_iso(&Iso3::from_parts(
        Translation3::new(4.0, -3.0, 1.5),
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_euler_angles(0.01, -0.02, 0.04)),
    ))
}

fn rms(model: &Affine3, data: &[PointMatch]) -> Real {
    let sum: Real = data
        .iter()
        .map(|m| (model.transform_point(&m.p) - m.q).norm_squared())
        .sum();
    (sum / data.len() as Real).sqrt()
}

#[test]
fn every_model_recovers_an_exact_rigid_motion() {
    let gt = rigid_truth();
    let data = matches(&gt, &UniformNoise3::default());
    for kind in [ModelKind::Rigid, ModelKind::Affine] {
        let fit = kind.fit(&data).unwrap();
        assert!(affine_max_abs_diff(&fit, &gt) < 1e-8, "{}", kind.name());
    }
    // A translation cannot express the rotation but still beats identity.
    let t = ModelKind::Translation.fit(&data).unwrap();
    assert!(rms(&t, &data) < rms(&Affine3::identity(), &data));
}

#[test]
fn richer_models_never_fit_worse_under_noise() {
    let noise = UniformNoise3 {
        seed: 9,
        max_abs: 0.3,
    };
    let data = matches(&rigid_truth(), &noise);
    let e_rigid = rms(&ModelKind::Rigid.fit(&data).unwrap(), &data);
    let e_affine = rms(&ModelKind::Affine.fit(&data).unwrap(), &data);
    assert!(e_affine <= e_rigid + 1e-12);
    // Per-axis noise is uniform in ±0.3, so the rms stays near 0.3.
    assert!(e_rigid < 0.5);
}

#[test]
fn regularized_affine_stays_between_its_parts() {
    let scale = Matrix3::from_diagonal(&Vec3::new(1.03, 0.98, 1.0));
    let gt = affine_from_parts(&scale, &Vec3::new(2.0, 0.0, -1.0));
    let data = matches(&gt, &UniformNoise3::default());
    let kind = ModelKind::Regularized {
        model: BaseModel::Affine,
        regularizer: BaseModel::Rigid,
        lambda: 0.1,
    };
    let blended = kind.fit(&data).unwrap();
    let affine = ModelKind::Affine.fit(&data).unwrap();
    let rigid = ModelKind::Rigid.fit(&data).unwrap();
    let d_affine = affine_max_abs_diff(&blended, &affine);
    let d_rigid = affine_max_abs_diff(&blended, &rigid);
    assert!(d_affine > 0.0 && d_rigid > 0.0);
    assert!(d_affine < d_rigid, "lambda 0.1 should stay close to the affine fit");
}

#[test]
fn ransac_separates_misassigned_beads() {
    let gt = rigid_truth();
    let mut data = matches(&gt, &UniformNoise3::default());
    // Swap the targets of a few beads, as a wrong nearest-neighbour match would.
    for k in 0..5 {
        let (i, j) = (2 * k, 2 * k + 31);
        let qi = data[i].q;
        data[i].q = data[j].q;
        data[j].q = qi;
    }
    let opts = RansacOptions {
        thresh: 0.5,
        min_inliers: 20,
        ..RansacOptions::default()
    };
    let res = ransac_fit(&ModelKind::Rigid, &data, &opts).unwrap();
    assert!(res.success);
    assert_eq!(res.inliers.len(), 50);
    let swapped = |i: usize| (i < 10 && i % 2 == 0) || ((31..40).contains(&i) && i % 2 == 1);
    assert!(res.inliers.iter().all(|&i| !swapped(i)));
    assert!(affine_max_abs_diff(res.model.as_ref().unwrap(), &gt) < 1e-6);
}
