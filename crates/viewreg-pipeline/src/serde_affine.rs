//! Row-major `[m00 m01 m02 t0 m10 m11 m12 t1 m20 m21 m22 t2]` serde form of
//! [`Affine3`], for use with `#[serde(with = "...")]`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use viewreg_core::{affine_from_row_major, affine_to_row_major, Affine3, Real};

pub fn serialize<S: Serializer>(a: &Affine3, s: S) -> Result<S::Ok, S::Error> {
    affine_to_row_major(a).serialize(s)
}

pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Affine3, D::Error> {
    let v = <[Real; 12]>::deserialize(d)?;
    Ok(affine_from_row_major(&v))
}

/// Identity as the default for optional registrations.
pub fn identity() -> Affine3 {
    Affine3::identity()
}
