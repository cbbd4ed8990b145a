//! High-level entry crate for the `viewreg` toolbox.
//!
//! `viewreg` computes globally consistent corrections for the registrations of
//! many overlapping 3D views (tiles, channels, angles of a microscopy
//! acquisition) from pairwise point correspondences.
//!
//! ## 1. One-call Registration
//!
//! Use when the dataset is complete and the default workflow fits:
//!
//! ```no_run
//! use viewreg::pipeline::{run_global_registration, Dataset, IdMatcher, RegistrationConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let dataset = Dataset::from_json_file("dataset.json")?;
//! let config = RegistrationConfig::default();
//! let matcher = IdMatcher::new(config.matcher.clone());
//!
//! let output = run_global_registration(&dataset.views, &dataset.groups, &matcher, &config, None)?;
//! for report in &output.subsets {
//!     println!(
//!         "{} views, mean error {:.3}",
//!         report.views.len(),
//!         report.optimization.mean_error
//!     );
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## 2. Building Blocks
//!
//! The optimizer can be driven directly from any source of correspondences:
//!
//! ```no_run
//! use std::collections::BTreeSet;
//! use viewreg::core::{Pt3, ViewId};
//! use viewreg::linear::ModelKind;
//! use viewreg::optim::{optimize, OptimizerOptions, PointMatchGraph};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (a, b) = (ViewId::new(0, 0), ViewId::new(0, 1));
//! let mut graph = PointMatchGraph::new([a, b]);
//! graph.add_match(a, Pt3::new(0.0, 0.0, 0.0), b, Pt3::new(1.0, 0.0, 0.0), 1.0);
//!
//! let outcome = optimize(
//!     &graph,
//!     &BTreeSet::from([a]),
//!     &ModelKind::Translation,
//!     &OptimizerOptions::default(),
//!     None,
//! )?;
//! println!("{:?}", outcome.transforms[&b]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - **[`core`]**: Math types, view identities, correspondences, RANSAC
//! - **[`linear`]**: Closed-form translation, rigid and affine fits
//! - **[`optim`]**: Point-match graph, tile optimizer, map-back
//! - **[`pipeline`]**: Subsets, matchers, policies and complete runs
//! - **[`prelude`]**: Convenient re-exports for common use cases
//!
//! ## Stability
//!
//! The `viewreg` crate is the public compatibility boundary. Lower-level crates
//! are intended for advanced usage and may evolve more quickly.

/// Core math types, view identities and RANSAC primitives.
pub mod core {
    pub use viewreg_core::*;
}

/// Closed-form transform fits and model selection.
pub mod linear {
    pub use viewreg_linear::*;
}

/// Global optimization of one subset and its map-back.
pub mod optim {
    pub use viewreg_optim::*;
}

/// Complete registration runs over a dataset.
pub mod pipeline {
    pub use viewreg_pipeline::*;
}

/// Convenient re-exports for common use cases.
///
/// Import with `use viewreg::prelude::*;` to get started quickly.
pub mod prelude {
    pub use crate::core::{Affine3, CancelToken, Group, Pt3, Vec3, ViewId};
    pub use crate::linear::ModelKind;
    pub use crate::optim::{ConvergenceCriteria, MapBackModel, OptimizerOptions, RobustKernel};
    pub use crate::pipeline::{
        run_global_registration, Dataset, FixPolicy, IdMatcher, MapBackPolicy, PairwiseMatcher,
        PrecomputedMatcher, RegistrationConfig, RegistrationOutput, ViewDescription,
    };
}
