use glam::{Mat3, Mat4, Quat, Vec3};

/// Splits an affine matrix into translation, rotation and scale.
///
/// Scale magnitudes are the lengths of the basis columns. A mirrored basis
/// (negative determinant) negates every scale component and the rotation basis,
/// keeping the rotation proper. Zero-length axes pass through as zero scale;
/// the rotation then comes from whatever axes remain, or identity.
pub fn decompose(matrix: &Mat4) -> (Vec3, Quat, Vec3) {
    let translation = matrix.w_axis.truncate();
    let linear = Mat3::from_mat4(*matrix);

    let mut scale = Vec3::new(
        linear.x_axis.length(),
        linear.y_axis.length(),
        linear.z_axis.length(),
    );
    let mut basis = orthonormalize(&linear);

    if linear.determinant() < 0.0 {
        scale = -scale;
        basis = basis.map(|basis| basis.mul_scalar(-1.0));
    }

    let rotation = match basis {
        Some(basis) => Quat::from_mat3(&basis).normalize(),
        None => Quat::IDENTITY,
    };

    (translation, rotation, scale)
}

/// Gram-Schmidt over the columns. A single missing axis is rebuilt from the
/// other two; with two or more missing there is no rotation to recover.
fn orthonormalize(linear: &Mat3) -> Option<Mat3> {
    let x = linear.x_axis.normalize_or_zero();
    let y = (linear.y_axis - x * linear.y_axis.dot(x)).normalize_or_zero();
    let z = (linear.z_axis - x * linear.z_axis.dot(x) - y * linear.z_axis.dot(y)).normalize_or_zero();

    let (x, y, z) = match (x == Vec3::ZERO, y == Vec3::ZERO, z == Vec3::ZERO) {
        (false, false, false) => (x, y, z),
        (true, false, false) => (y.cross(z), y, z),
        (false, true, false) => (x, z.cross(x), z),
        (false, false, true) => (x, y, x.cross(y)),
        _ => return None,
    };

    Some(Mat3::from_cols(x, y, z))
}
