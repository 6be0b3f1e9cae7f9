use std::cell::Cell;
use std::collections::HashMap;

use anyhow::Context;
use glam::Mat4;
use id_arena::Arena;
use serde_json::Value;

use crate::math::basis;
use crate::scene_graph::mesh::{Buffers, Mesh, MeshId};
use crate::scene_graph::object3d::{ObjectId, ObjectType, SceneObject, Tags};

/// Hands out temporary geometry for an object. Whatever `to_mesh` allocates
/// stays alive until the matching `to_mesh_clear`.
pub trait GeometryHost {
    /// Base geometry, or post-modifier geometry when `evaluated` is set.
    fn to_mesh(&self, object: &SceneObject, evaluated: bool) -> Option<Mesh>;

    fn to_mesh_clear(&self, object: &SceneObject);
}

pub struct Scene {
    objects: Arena<SceneObject>,
    meshes: Arena<Mesh>,
    /// Scene order, depth-first as spawned.
    order: Vec<ObjectId>,
    selection: Vec<ObjectId>,
    gltf_mesh_to_mesh: HashMap<usize, MeshId>,
    live_temp_meshes: Cell<usize>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Arena::new(),
            meshes: Arena::new(),
            order: Vec::new(),
            selection: Vec::new(),
            gltf_mesh_to_mesh: HashMap::new(),
            live_temp_meshes: Cell::new(0),
        }
    }

    pub fn add_object(&mut self, object: SceneObject) -> ObjectId {
        let id = self.objects.alloc(object);
        self.order.push(id);
        id
    }

    #[allow(dead_code)]
    pub fn get_object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    pub fn get_object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.order
            .iter()
            .copied()
            .find(|&id| self.objects[id].name == name)
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.alloc(mesh)
    }

    pub fn get_mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id)
    }

    /// All objects in scene order.
    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> + '_ {
        self.order.iter().map(move |&id| &self.objects[id])
    }

    /// Selected objects in selection order.
    pub fn selected_objects(&self) -> impl Iterator<Item = &SceneObject> + '_ {
        self.selection.iter().map(move |&id| &self.objects[id])
    }

    pub fn select(&mut self, id: ObjectId) {
        if !self.selection.contains(&id) {
            self.selection.push(id);
        }
    }

    pub fn select_by_name(&mut self, name: &str) -> anyhow::Result<()> {
        let id = self
            .get_object_by_name(name)
            .with_context(|| format!("No object named {name:?} in scene"))?;
        self.select(id);
        Ok(())
    }

    /// Number of temporary meshes handed out and not yet cleared.
    pub fn live_temp_meshes(&self) -> usize {
        self.live_temp_meshes.get()
    }

    /// Loads the default scene of a glTF asset. The asset is Y up; objects are
    /// converted to the authoring convention (Z up) on the way in.
    pub fn spawn_gltf_scene(
        &mut self,
        document: &gltf::Document,
        buffers: Buffers,
    ) -> anyhow::Result<usize> {
        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .context("No scenes in gltf")?;

        let joints = document
            .skins()
            .flat_map(|skin| skin.joints().map(|joint| joint.index()).collect::<Vec<_>>())
            .collect::<Vec<usize>>();

        let mut spawned = 0;
        for node in scene.nodes() {
            spawned += self.spawn_gltf_node(&node, buffers, &joints, None)?;
        }

        self.update_transforms();

        Ok(spawned)
    }

    fn spawn_gltf_node(
        &mut self,
        node: &gltf::Node,
        buffers: Buffers,
        joints: &[usize],
        parent: Option<ObjectId>,
    ) -> anyhow::Result<usize> {
        let node_name = node.name().unwrap_or("Unnamed").to_string();

        let object_type = if node.mesh().is_some() {
            ObjectType::Mesh
        } else if node.camera().is_some() {
            ObjectType::Camera
        } else if node.light().is_some() {
            ObjectType::Light
        } else if joints.contains(&node.index()) {
            ObjectType::Other
        } else {
            ObjectType::Empty
        };

        let local_matrix = Mat4::from_cols_array_2d(&node.transform().matrix());
        let mut object = SceneObject::new(node_name.clone(), object_type)
            .with_local_matrix(basis::runtime_to_authoring(local_matrix));
        object.tags = parse_extras(node.extras()).with_context(|| format!("Extras of {node_name}"))?;
        object.morph_weights = node.weights().map(<[f32]>::to_vec);

        if let Some(mesh) = node.mesh() {
            let mesh_index = mesh.index();

            let mesh_id = match self.gltf_mesh_to_mesh.get(&mesh_index).copied() {
                Some(mesh_id) => mesh_id,
                None => {
                    let mesh_name = mesh
                        .name()
                        .map(String::from)
                        .unwrap_or_else(|| format!("{} (Mesh)", node_name));

                    let mesh = Mesh::from_gltf(mesh_name, mesh, buffers, &basis::RUNTIME_TO_AUTHORING)?;
                    let mesh_id = self.add_mesh(mesh);
                    self.gltf_mesh_to_mesh.insert(mesh_index, mesh_id);

                    mesh_id
                }
            };

            object.mesh_id = Some(mesh_id);
        }

        let object_id = self.add_object(object);
        if let Some(parent_id) = parent {
            self.set_object_parent(object_id, Some(parent_id));
        }

        let mut spawned = 1;
        for child in node.children() {
            spawned += self.spawn_gltf_node(&child, buffers, joints, Some(object_id))?;
        }

        Ok(spawned)
    }

    /// Sets the parent of an object and updates child relationships
    pub fn set_object_parent(&mut self, child_id: ObjectId, new_parent_id: Option<ObjectId>) {
        if let Some(child) = self.objects.get(child_id) {
            if let Some(old_parent_id) = child.parent_id {
                if let Some(old_parent) = self.objects.get_mut(old_parent_id) {
                    old_parent.child_ids.retain(|&id| id != child_id);
                }
            }
        }

        if let Some(child) = self.objects.get_mut(child_id) {
            child.parent_id = new_parent_id;

            if let Some(new_parent_id) = new_parent_id {
                if let Some(new_parent) = self.objects.get_mut(new_parent_id) {
                    new_parent.child_ids.push(child_id);
                }
            }
        }
    }

    /// Recomputes every world matrix from the hierarchy, roots first.
    pub fn update_transforms(&mut self) {
        let roots = self
            .order
            .iter()
            .copied()
            .filter(|&id| self.objects[id].parent_id.is_none())
            .collect::<Vec<_>>();

        for root_id in roots {
            self.update_object_transform_recursive(root_id, Mat4::IDENTITY);
        }
    }

    fn update_object_transform_recursive(&mut self, object_id: ObjectId, parent_world_matrix: Mat4) {
        let Some(object) = self.objects.get_mut(object_id) else {
            return;
        };

        let world_matrix = parent_world_matrix * object.local_matrix;
        object.set_world_matrix(world_matrix);

        for child_id in object.child_ids.clone() {
            self.update_object_transform_recursive(child_id, world_matrix);
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryHost for Scene {
    fn to_mesh(&self, object: &SceneObject, evaluated: bool) -> Option<Mesh> {
        if !object.object_type.has_geometry() {
            return None;
        }

        let mesh = self.get_mesh(object.mesh_id?)?;
        let temp = if evaluated {
            mesh.evaluated(object.morph_weights.as_deref())
        } else {
            mesh.clone()
        };

        self.live_temp_meshes.set(self.live_temp_meshes.get() + 1);
        log::trace!("Temporary mesh for {} ({} vertices)", object.name, temp.positions.len());

        Some(temp)
    }

    fn to_mesh_clear(&self, object: &SceneObject) {
        self.live_temp_meshes
            .set(self.live_temp_meshes.get().saturating_sub(1));
        log::trace!("Cleared temporary mesh for {}", object.name);
    }
}

fn parse_extras(extras: &gltf::json::Extras) -> anyhow::Result<Tags> {
    let Some(raw) = extras else {
        return Ok(Tags::new());
    };

    match serde_json::from_str::<Value>(raw.get())? {
        Value::Object(map) => Ok(map),
        _ => Ok(Tags::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn world_matrices_follow_hierarchy() {
        let mut scene = Scene::new();
        let parent = scene.add_object(
            SceneObject::new("Parent", ObjectType::Empty)
                .with_local_matrix(Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0))),
        );
        let child = scene.add_object(
            SceneObject::new("Child", ObjectType::Empty)
                .with_local_matrix(Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0))),
        );
        scene.set_object_parent(child, Some(parent));
        scene.update_transforms();

        let child = scene.get_object(child).unwrap();
        assert_eq!(
            child.world_matrix().transform_point3(Vec3::ZERO),
            Vec3::new(10.0, 2.0, 0.0)
        );
        assert_eq!(child.parent(&scene).unwrap().name, "Parent");
        assert_eq!(
            scene.get_object(parent).unwrap().children(&scene).count(),
            1
        );
    }

    #[test]
    fn selection_keeps_selection_order() {
        let mut scene = Scene::new();
        scene.add_object(SceneObject::new("A", ObjectType::Empty));
        scene.add_object(SceneObject::new("B", ObjectType::Empty));
        scene.add_object(SceneObject::new("C", ObjectType::Empty));

        scene.select_by_name("C").unwrap();
        scene.select_by_name("A").unwrap();
        scene.select_by_name("C").unwrap();

        let names = scene.selected_objects().map(|o| o.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["C", "A"]);
        assert!(scene.select_by_name("Missing").is_err());
    }

    #[test]
    fn to_mesh_counts_live_temporaries() {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(Mesh::new("Tri", vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![]));
        let id = scene.add_object(SceneObject::new("Tri", ObjectType::Mesh).with_mesh(mesh));
        let object = scene.get_object(id).unwrap();

        let temp = scene.to_mesh(object, true);
        assert!(temp.is_some());
        assert_eq!(scene.live_temp_meshes(), 1);

        scene.to_mesh_clear(object);
        assert_eq!(scene.live_temp_meshes(), 0);
    }

    #[test]
    fn spawns_gltf_scene_in_authoring_space() {
        let (document, buffers, _) =
            gltf::import_slice(include_bytes!("../../assets/test_scene.gltf")).unwrap();
        let mut scene = Scene::new();

        let spawned = scene.spawn_gltf_scene(&document, &buffers).unwrap();

        assert_eq!(spawned, 3);
        let names = scene.objects().map(|o| o.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["Platform_A", "Group", "Spawn_1"]);

        let platform = scene.objects().next().unwrap();
        assert_eq!(platform.object_type, ObjectType::Mesh);
        assert!(platform
            .world_matrix()
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(0.0, 0.0, 1.0), 1e-6));
        assert_eq!(platform.tags["hp"], 10);
        assert!(platform.tags.contains_key("_hidden"));

        let mesh = scene.get_mesh(platform.mesh_id.unwrap()).unwrap();
        assert_eq!(mesh.name, "Tri");
        assert!(mesh.positions[2].abs_diff_eq(Vec3::new(0.0, 0.0, 1.0), 1e-6));
        assert_eq!(mesh.triangle_count(), 1);

        let spawn = scene.get_object(scene.get_object_by_name("Spawn_1").unwrap()).unwrap();
        assert_eq!(spawn.object_type, ObjectType::Empty);
        assert_eq!(spawn.parent(&scene).unwrap().name, "Group");
        assert!(spawn
            .world_matrix()
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn non_mesh_objects_have_no_geometry() {
        let mut scene = Scene::new();
        let id = scene.add_object(SceneObject::new("Lamp", ObjectType::Light));

        assert!(scene.to_mesh(scene.get_object(id).unwrap(), false).is_none());
        assert_eq!(scene.live_temp_meshes(), 0);
    }
}
