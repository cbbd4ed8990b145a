//! Global optimization of per-view transforms.
//!
//! This crate turns accepted pairwise correspondences into one consistent set
//! of world-space corrections:
//!
//! - [`PointMatchGraph`] re-keys correspondences by their origin views,
//! - [`optimize`] relaxes the tiles of one subset with fixed views as anchors,
//! - [`resolve_map_back`] re-anchors a floating subset onto a reference view.
//!
//! Everything inside one subset runs sequentially in canonical view order, so
//! results are reproducible bit for bit.

mod convergence;
mod graph;
mod mapback;
mod optimizer;
mod robust;
mod tile;

pub use convergence::*;
pub use graph::*;
pub use mapback::*;
pub use optimizer::*;
pub use robust::*;
pub use tile::*;
