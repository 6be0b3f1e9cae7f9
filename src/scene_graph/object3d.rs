use glam::Mat4;
use id_arena::Id;
use serde_json::{Map, Value};

use crate::scene_graph::mesh::MeshId;
use crate::scene_graph::scene::Scene;

pub type ObjectId = Id<SceneObject>;

/// Free-form per-object custom properties, as authored.
pub type Tags = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Mesh,
    Empty,
    Light,
    Camera,
    Other,
}

impl ObjectType {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::Mesh => "MESH",
            ObjectType::Empty => "EMPTY",
            ObjectType::Light => "LIGHT",
            ObjectType::Camera => "CAMERA",
            ObjectType::Other => "OTHER",
        }
    }

    /// Only mesh objects carry geometry a collider can be built from.
    pub fn has_geometry(self) -> bool {
        matches!(self, ObjectType::Mesh)
    }
}

pub struct SceneObject {
    pub name: String,
    pub object_type: ObjectType,
    pub tags: Tags,
    pub local_matrix: Mat4,
    pub mesh_id: Option<MeshId>,
    /// Overrides the mesh's default morph weights when building evaluated geometry.
    pub morph_weights: Option<Vec<f32>>,
    pub parent_id: Option<ObjectId>,
    pub child_ids: Vec<ObjectId>,
    world_matrix: Mat4,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, object_type: ObjectType) -> Self {
        Self {
            name: name.into(),
            object_type,
            ..Default::default()
        }
    }

    pub fn with_local_matrix(mut self, matrix: Mat4) -> Self {
        self.local_matrix = matrix;
        self.world_matrix = matrix;
        self
    }

    #[allow(dead_code)]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    #[allow(dead_code)]
    pub fn with_mesh(mut self, mesh_id: MeshId) -> Self {
        self.mesh_id = Some(mesh_id);
        self
    }

    /// World transform in the authoring convention (Z up).
    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    pub(crate) fn set_world_matrix(&mut self, world_matrix: Mat4) {
        self.world_matrix = world_matrix;
    }

    #[allow(dead_code)]
    pub fn parent<'a>(&self, scene: &'a Scene) -> Option<&'a SceneObject> {
        self.parent_id.and_then(|id| scene.get_object(id))
    }

    #[allow(dead_code)]
    pub fn children<'a, 'b>(&'a self, scene: &'b Scene) -> impl Iterator<Item = &'b SceneObject> + 'b
    where
        'a: 'b,
    {
        self.child_ids
            .iter()
            .filter_map(move |id| scene.get_object(*id))
    }
}

impl Default for SceneObject {
    fn default() -> Self {
        Self {
            name: String::new(),
            object_type: ObjectType::Empty,
            tags: Tags::new(),
            local_matrix: Mat4::IDENTITY,
            mesh_id: None,
            morph_weights: None,
            parent_id: None,
            child_ids: Vec::new(),
            world_matrix: Mat4::IDENTITY,
        }
    }
}
