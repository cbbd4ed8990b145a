//! Deterministic synthetic data generation helpers.
//!
//! Small building blocks for constructing synthetic registration problems:
//! - bead clouds in a world volume,
//! - ground-truth tile placements,
//! - per-view observations of the beads (local coordinates, stable ids),
//! - deterministic noise that does not depend on `rand` internals.
//!
//! # Example
//!
//! ```
//! use viewreg_core::synthetic::{beads, observe_beads, tile_row, UniformNoise3};
//! use viewreg_core::{Pt3, Vec3};
//!
//! let world = beads(200, Pt3::new(0.0, 0.0, 0.0), Pt3::new(300.0, 100.0, 50.0), 3);
//! let truths = tile_row(3, 100.0, 0.2);
//! let size = Vec3::new(100.0, 100.0, 50.0);
//! let pts = observe_beads(&world, &truths[0], &size, &UniformNoise3::default(), 0);
//! assert!(!pts.is_empty());
//! ```

mod noise;
mod scene;

pub use noise::*;
pub use scene::*;
