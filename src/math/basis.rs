// Authoring space is Z up, runtime space (raylib, and glTF) is Y up. Both are
// right handed, so the change of basis is a quarter turn about X.

use glam::{Mat4, Vec4};

/// -90° about X: authoring +Z becomes runtime +Y.
pub const AUTHORING_TO_RUNTIME: Mat4 = Mat4::from_cols(
    Vec4::new(1.0, 0.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, -1.0, 0.0),
    Vec4::new(0.0, 1.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 0.0, 1.0),
);

/// +90° about X, the inverse of [`AUTHORING_TO_RUNTIME`].
pub const RUNTIME_TO_AUTHORING: Mat4 = Mat4::from_cols(
    Vec4::new(1.0, 0.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 1.0, 0.0),
    Vec4::new(0.0, -1.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 0.0, 1.0),
);

/// Re-expresses a transform authored in runtime space in authoring space.
pub fn runtime_to_authoring(matrix: Mat4) -> Mat4 {
    RUNTIME_TO_AUTHORING * matrix * AUTHORING_TO_RUNTIME
}
