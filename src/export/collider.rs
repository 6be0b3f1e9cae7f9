use std::ops::Deref;

use crate::export::document::Collider;
use crate::export::error::{ExportError, LimitKind};
use crate::scene_graph::{GeometryHost, Mesh, SceneObject};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColliderLimits {
    pub max_vertices: usize,
    pub max_triangles: usize,
}

/// Temporary mesh borrowed from the host. Released when dropped, whichever
/// way the extraction exits.
pub struct ScopedMesh<'a, H: GeometryHost + ?Sized> {
    host: &'a H,
    object: &'a SceneObject,
    mesh: Mesh,
}

impl<'a, H: GeometryHost + ?Sized> ScopedMesh<'a, H> {
    pub fn acquire(host: &'a H, object: &'a SceneObject, evaluated: bool) -> Option<Self> {
        let mesh = host.to_mesh(object, evaluated)?;
        Some(Self { host, object, mesh })
    }
}

impl<H: GeometryHost + ?Sized> Deref for ScopedMesh<'_, H> {
    type Target = Mesh;

    fn deref(&self) -> &Mesh {
        &self.mesh
    }
}

impl<H: GeometryHost + ?Sized> Drop for ScopedMesh<'_, H> {
    fn drop(&mut self) {
        self.host.to_mesh_clear(self.object);
    }
}

/// Builds a collision mesh in object-local space. Objects without geometry
/// give `Ok(None)`.
pub fn extract_collider<H: GeometryHost + ?Sized>(
    host: &H,
    object: &SceneObject,
    apply_modifiers: bool,
    limits: ColliderLimits,
) -> Result<Option<Collider>, ExportError> {
    if !object.object_type.has_geometry() {
        return Ok(None);
    }

    let Some(mesh) = ScopedMesh::acquire(host, object, apply_modifiers) else {
        return Ok(None);
    };

    let vertex_count = mesh.positions.len();
    if vertex_count > limits.max_vertices {
        return Err(ExportError::ColliderLimitExceeded {
            object: object.name.clone(),
            limit: LimitKind::Vertices,
            count: vertex_count,
            max: limits.max_vertices,
        });
    }

    let triangle_count = mesh.triangle_count();
    if triangle_count > limits.max_triangles {
        return Err(ExportError::ColliderLimitExceeded {
            object: object.name.clone(),
            limit: LimitKind::Triangles,
            count: triangle_count,
            max: limits.max_triangles,
        });
    }

    let mut triangles = Vec::with_capacity(triangle_count);
    for triangle in mesh.faces.iter().flat_map(|face| face.triangles()) {
        if let Some(&index) = triangle.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(ExportError::DanglingIndex {
                object: object.name.clone(),
                index,
                vertex_count,
            });
        }
        triangles.push(triangle);
    }

    let vertices = mesh.positions.iter().map(|p| p.to_array()).collect();

    Ok(Some(Collider {
        vertices,
        triangles,
    }))
}
