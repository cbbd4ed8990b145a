use nalgebra::{Isometry3, Matrix3, Matrix4, Point3, Vector3};

/// Scalar type used throughout the library (currently `f64`).
pub type Real = f64;

/// 3D vector with [`Real`] components.
pub type Vec3 = Vector3<Real>;
/// 3D point with [`Real`] coordinates.
pub type Pt3 = Point3<Real>;
/// 3×3 matrix with [`Real`] entries.
pub type Mat3 = Matrix3<Real>;
/// 4×4 matrix with [`Real`] entries.
pub type Mat4 = Matrix4<Real>;
/// 3D rigid transform (SE(3)) using [`Real`].
pub type Iso3 = Isometry3<Real>;
/// General 3D affine transform using [`Real`].
pub type Affine3 = nalgebra::Affine3<Real>;

/// Build an affine transform `x -> m * x + t`.
pub fn affine_from_parts(m: &Mat3, t: &Vec3) -> Affine3 {
    let mut h = Mat4::identity();
    h.fixed_view_mut::<3, 3>(0, 0).copy_from(m);
    h.fixed_view_mut::<3, 1>(0, 3).copy_from(t);
    Affine3::from_matrix_unchecked(h)
}

/// Linear 3×3 part of an affine transform.
pub fn affine_linear(a: &Affine3) -> Mat3 {
    a.matrix().fixed_view::<3, 3>(0, 0).into_owned()
}

/// Translation part of an affine transform.
pub fn affine_translation(a: &Affine3) -> Vec3 {
    a.matrix().fixed_view::<3, 1>(0, 3).into_owned()
}

/// Pure translation.
pub fn translation(t: Vec3) -> Affine3 {
    affine_from_parts(&Mat3::identity(), &t)
}

/// Convert a rigid transform into the general affine representation.
pub fn affine_from_iso(iso: &Iso3) -> Affine3 {
    Affine3::from_matrix_unchecked(iso.to_homogeneous())
}

/// Row-major 12-vector `[m00 m01 m02 t0 m10 m11 m12 t1 m20 m21 m22 t2]`.
pub fn affine_to_row_major(a: &Affine3) -> [Real; 12] {
    let m = a.matrix();
    let mut out = [0.0; 12];
    for r in 0..3 {
        for c in 0..4 {
            out[4 * r + c] = m[(r, c)];
        }
    }
    out
}

/// Inverse of [`affine_to_row_major`].
pub fn affine_from_row_major(v: &[Real; 12]) -> Affine3 {
    let mut h = Mat4::identity();
    for r in 0..3 {
        for c in 0..4 {
            h[(r, c)] = v[4 * r + c];
        }
    }
    Affine3::from_matrix_unchecked(h)
}

/// `true` if every coefficient of the transform is finite.
pub fn is_finite_affine(a: &Affine3) -> bool {
    a.matrix().iter().all(|v| v.is_finite())
}

/// Largest absolute coefficient difference between two transforms.
pub fn affine_max_abs_diff(a: &Affine3, b: &Affine3) -> Real {
    (a.matrix() - b.matrix()).amax()
}

/// Linear interpolation of the affine matrices: `(1 - lambda) * a + lambda * b`.
///
/// The result is only guaranteed to be affine; it is not re-orthogonalized.
pub fn affine_blend(a: &Affine3, b: &Affine3, lambda: Real) -> Affine3 {
    let mut h = a.matrix() * (1.0 - lambda) + b.matrix() * lambda;
    h[(3, 0)] = 0.0;
    h[(3, 1)] = 0.0;
    h[(3, 2)] = 0.0;
    h[(3, 3)] = 1.0;
    Affine3::from_matrix_unchecked(h)
}
