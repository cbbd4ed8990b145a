mod pairwise;
mod points;

pub use pairwise::*;
pub use points::*;
