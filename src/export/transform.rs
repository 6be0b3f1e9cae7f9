use glam::Mat4;

use crate::export::document::Transform;
use crate::math::{affine, basis};

/// Converts an authoring-space world matrix into a runtime-space transform.
/// `unit_scale` multiplies position and scale; rotation is left alone.
pub fn to_runtime(world_matrix: &Mat4, unit_scale: f32) -> Transform {
    let matrix = basis::AUTHORING_TO_RUNTIME * *world_matrix;
    let (mut position, rotation, mut scale) = affine::decompose(&matrix);

    if unit_scale != 1.0 {
        position *= unit_scale;
        scale *= unit_scale;
    }

    Transform {
        position: position.into(),
        rotation: rotation.into(),
        scale: scale.into(),
    }
}
