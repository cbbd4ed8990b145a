//! Deterministic noise helpers for synthetic datasets.
//!
//! SplitMix64 keyed by `(seed, view, point)`, so datasets stay stable across
//! `rand` versions and platforms.

use crate::{Real, Vec3};

/// Deterministic uniform noise in `[-max_abs, +max_abs]` per axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UniformNoise3 {
    pub seed: u64,
    pub max_abs: Real,
}

impl UniformNoise3 {
    /// Noise vector for a `(view_idx, point_idx)` key.
    #[inline]
    pub fn sample(&self, view_idx: usize, point_idx: usize) -> Vec3 {
        let max_abs = self.max_abs.abs();
        if max_abs == 0.0 {
            return Vec3::zeros();
        }
        let key = mix_key(self.seed, view_idx, point_idx);
        let x = unit_f64(splitmix64(key));
        let y = unit_f64(splitmix64(key ^ 0x94D0_49BB_1331_11EB));
        let z = unit_f64(splitmix64(key ^ 0xD6E8_FEB8_6659_FD93));
        Vec3::new(x - 0.5, y - 0.5, z - 0.5) * (2.0 * max_abs)
    }
}

/// Deterministic value in `[0, 1)` for an integer key.
pub fn unit_sample(seed: u64, idx: usize) -> Real {
    unit_f64(splitmix64(mix_key(seed, idx, 0)))
}

#[inline]
fn mix_key(seed: u64, view_idx: usize, point_idx: usize) -> u64 {
    seed ^ (view_idx as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (point_idx as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9)
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[inline]
fn unit_f64(x: u64) -> Real {
    // top 53 bits -> [0, 1)
    (x >> 11) as Real * (1.0 / (1u64 << 53) as Real)
}
