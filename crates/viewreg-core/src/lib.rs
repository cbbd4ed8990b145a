//! Core math and data primitives for `viewreg`.
//!
//! This crate provides the foundational building blocks used by all other
//! crates in the workspace:
//!
//! - linear algebra type aliases (`Real`, `Vec3`, `Pt3`, `Affine3`, ...) and
//!   affine helpers,
//! - view identity types ([`ViewId`], [`Group`], [`CandidatePair`]),
//! - interest points, correspondences and the [`PairwiseResult`] contract
//!   produced by pairwise matchers,
//! - a deterministic, model-agnostic RANSAC engine.
//!
//! Transform convention: a view's registration maps local voxel coordinates to
//! world coordinates, and every correction computed downstream acts on world
//! coordinates (it is pre-concatenated onto the registration).
//!
//! # Example
//!
//! ```
//! use viewreg_core::{translation, Group, CandidatePair, Pt3, Vec3, ViewId};
//!
//! let a = Group::single(ViewId::new(0, 0));
//! let b = Group::single(ViewId::new(0, 1));
//! assert_eq!(CandidatePair::new(a.clone(), b.clone()), CandidatePair::new(b, a));
//!
//! let t = translation(Vec3::new(1.0, 2.0, 3.0));
//! assert_eq!(t.transform_point(&Pt3::origin()), Pt3::new(1.0, 2.0, 3.0));
//! ```

/// Cooperative cancellation.
mod cancel;
/// Linear algebra type aliases and affine helpers.
mod math;
/// Generic RANSAC engine and traits.
mod ransac;
/// Deterministic synthetic data generation helpers.
///
/// Used by workspace tests, the CLI tests and for quick experiments; not a
/// simulation of real microscopy data.
pub mod synthetic;
/// Points, correspondences and pairwise matching results.
mod types;
/// View identities, groups and candidate pairs.
mod view;

pub use cancel::*;
pub use math::*;
pub use ransac::*;
pub use types::*;
pub use view::*;
