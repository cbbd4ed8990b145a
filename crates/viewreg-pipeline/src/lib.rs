//! Global registration runs over a dataset of views.
//!
//! This crate wires the lower layers into the complete workflow:
//!
//! - [`build_subsets`]: candidate pairs and connected components,
//! - [`PairwiseMatcher`]: the matching boundary, with [`IdMatcher`] and
//!   [`PrecomputedMatcher`] as built-in implementations,
//! - [`FixPolicy`] / [`MapBackPolicy`]: per-subset anchors,
//! - [`run_global_registration`]: the whole run, configured by
//!   [`RegistrationConfig`].
//!
//! # Example
//!
//! ```no_run
//! use viewreg_pipeline::{run_global_registration, Dataset, IdMatcher, RegistrationConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let dataset = Dataset::from_json_file("dataset.json")?;
//! let config = RegistrationConfig::default();
//! let matcher = IdMatcher::new(config.matcher.clone());
//! let output = run_global_registration(&dataset.views, &dataset.groups, &matcher, &config, None)?;
//! for (view, t) in &output.transforms {
//!     println!("{view}: {}", t.description);
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod dataset;
mod error;
mod filter;
mod grouping;
mod matcher;
mod overlap;
mod policy;
mod registration;
pub mod serde_affine;
mod subsets;

pub use config::*;
pub use dataset::*;
pub use error::*;
pub use filter::*;
pub use grouping::*;
pub use matcher::*;
pub use overlap::*;
pub use policy::*;
pub use registration::*;
pub use subsets::*;
