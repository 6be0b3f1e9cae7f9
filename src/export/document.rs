use std::collections::BTreeMap;

use glam::{Quat, Vec3};
use serde::Serialize;

pub const SCHEMA: &str = "raylib.level/1.0";
pub const COORDINATE_SYSTEM: &str = "Y_UP_RIGHT";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for Vector3 {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl From<Quat> for Quaternion {
    fn from(q: Quat) -> Self {
        Self {
            x: q.x,
            y: q.y,
            z: q.z,
            w: q.w,
        }
    }
}

/// Runtime-space transform of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    pub position: Vector3,
    pub rotation: Quaternion,
    pub scale: Vector3,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Collider {
    pub vertices: Vec<[f32; 3]>,
    pub triangles: Vec<[u32; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropScalar {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropValue {
    Scalar(PropScalar),
    /// Elements may mix scalar kinds.
    List(Vec<PropScalar>),
}

pub type PropertyBag = BTreeMap<String, PropValue>;

/// Type names the runtime loader maps vectors and rotations onto.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaylibTypes {
    pub vector_type: &'static str,
    pub quat_type: &'static str,
}

impl Default for RaylibTypes {
    fn default() -> Self {
        Self {
            vector_type: "Vector3",
            quat_type: "Quaternion",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub name: String,
    pub kind: String,
    pub transform: Transform,
    pub props: PropertyBag,
    pub raylib: RaylibTypes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collider: Option<Collider>,
}

/// One exported level. Built once by the assembler and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDocument {
    schema: &'static str,
    coordinate_system: &'static str,
    unit_scale: f32,
    glb: Option<String>,
    nodes: Vec<Node>,
}

impl LevelDocument {
    pub(crate) fn new(unit_scale: f32, glb: Option<String>, nodes: Vec<Node>) -> Self {
        Self {
            schema: SCHEMA,
            coordinate_system: COORDINATE_SYSTEM,
            unit_scale,
            glb,
            nodes,
        }
    }

    #[allow(dead_code)]
    pub fn unit_scale(&self) -> f32 {
        self.unit_scale
    }

    pub fn glb(&self) -> Option<&str> {
        self.glb.as_deref()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
