//! Synthetic bead scenes observed by overlapping tiles.

use super::{unit_sample, UniformNoise3};
use crate::{translation, Affine3, InterestPoint, Pt3, Real, Vec3};

/// `count` beads uniformly spread in the world box `[min, max]`.
///
/// Bead `i` keeps index `i`; observations reuse it as the interest-point id.
pub fn beads(count: usize, min: Pt3, max: Pt3, seed: u64) -> Vec<Pt3> {
    let extent = max - min;
    (0..count)
        .map(|i| {
            let u = Vec3::new(
                unit_sample(seed, 3 * i),
                unit_sample(seed, 3 * i + 1),
                unit_sample(seed, 3 * i + 2),
            );
            min + extent.component_mul(&u)
        })
        .collect()
}

/// Ground-truth placements of `n` tiles of width `tile_width` along +X with a
/// fractional `overlap` between neighbours.
pub fn tile_row(n: usize, tile_width: Real, overlap: Real) -> Vec<Affine3> {
    let step = tile_width * (1.0 - overlap);
    (0..n)
        .map(|i| translation(Vec3::new(i as Real * step, 0.0, 0.0)))
        .collect()
}

/// Observe world beads through a view whose true local-to-world mapping is
/// `truth` and whose local extent is `[0, size]`.
///
/// Returns local coordinates with deterministic noise; points falling outside
/// the view are skipped.
pub fn observe_beads(
    world: &[Pt3],
    truth: &Affine3,
    size: &Vec3,
    noise: &UniformNoise3,
    view_idx: usize,
) -> Vec<InterestPoint> {
    let Some(inv) = truth.try_inverse() else {
        return Vec::new();
    };
    world
        .iter()
        .enumerate()
        .filter_map(|(i, p)| {
            let local = inv.transform_point(p);
            let inside = (0..3).all(|k| local[k] >= 0.0 && local[k] <= size[k]);
            inside.then(|| InterestPoint::new(i as u64, local + noise.sample(view_idx, i)))
        })
        .collect()
}
