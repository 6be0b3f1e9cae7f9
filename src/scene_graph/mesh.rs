use anyhow::bail;
use glam::{Mat4, Vec3};
use gltf::buffer;
use id_arena::Id;
use itertools::Itertools;

pub type MeshId = Id<Mesh>;

pub type Buffers<'a> = &'a [buffer::Data];

/// A polygon as a list of vertex indices, at least three long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Face(pub Vec<u32>);

impl Face {
    /// Fan-triangulates the polygon.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        let first = self.0.first().copied();
        self.0
            .iter()
            .skip(1)
            .tuple_windows()
            .filter_map(move |(&b, &c)| first.map(|a| [a, b, c]))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MorphTarget {
    /// Per-vertex position displacement, same length as `Mesh::positions`.
    pub displacements: Vec<Vec3>,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub faces: Vec<Face>,
    pub morph_targets: Vec<MorphTarget>,
    pub default_weights: Vec<f32>,
}

impl Mesh {
    #[allow(dead_code)]
    pub fn new(name: impl Into<String>, positions: Vec<Vec3>, faces: Vec<Face>) -> Self {
        Self {
            name: name.into(),
            positions,
            faces,
            ..Default::default()
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.faces
            .iter()
            .map(|face| face.0.len().saturating_sub(2))
            .sum()
    }

    /// Returns a copy with morph targets blended in using `weights`, or the
    /// mesh's own default weights when none are given.
    pub fn evaluated(&self, weights: Option<&[f32]>) -> Mesh {
        let weights = weights.unwrap_or(&self.default_weights);
        let mut positions = self.positions.clone();

        for (target, &weight) in self.morph_targets.iter().zip(weights) {
            if weight == 0.0 {
                continue;
            }

            for (position, displacement) in positions.iter_mut().zip(&target.displacements) {
                *position += *displacement * weight;
            }
        }

        Mesh {
            name: self.name.clone(),
            positions,
            faces: self.faces.clone(),
            morph_targets: Vec::new(),
            default_weights: Vec::new(),
        }
    }

    /// Reads every primitive of a glTF mesh into one vertex list. Positions are
    /// mapped through `basis` so they land in the authoring convention.
    pub fn from_gltf(
        name: impl Into<String>,
        mesh: gltf::Mesh,
        buffers: Buffers,
        basis: &Mat4,
    ) -> anyhow::Result<Mesh> {
        let mut result = Mesh {
            name: name.into(),
            default_weights: mesh.weights().map(<[f32]>::to_vec).unwrap_or_default(),
            ..Default::default()
        };

        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let Some(position_reader) = reader.read_positions() else {
                bail!(
                    "Primitive {} of mesh {} has no positions",
                    primitive.index(),
                    result.name
                );
            };

            let vertex_offset = result.positions.len() as u32;
            let vertices = position_reader
                .map(|pos| basis.transform_vector3(Vec3::from(pos)))
                .collect::<Vec<Vec3>>();
            let vertex_len = vertices.len();
            let vertex_count = vertex_len as u32;

            let indices = match reader.read_indices() {
                Some(index_reader) => index_reader.into_u32().collect::<Vec<u32>>(),
                None => (0..vertex_count).collect(),
            };
            let indices = indices.into_iter().map(|index| index + vertex_offset);

            match primitive.mode() {
                gltf::mesh::Mode::Triangles => {
                    for chunk in &indices.chunks(3) {
                        let face = chunk.collect::<Vec<u32>>();
                        if face.len() == 3 {
                            result.faces.push(Face(face));
                        }
                    }
                }
                gltf::mesh::Mode::TriangleStrip => {
                    for (i, (a, b, c)) in indices.tuple_windows().enumerate() {
                        let face = if i % 2 == 0 { vec![a, b, c] } else { vec![b, a, c] };
                        result.faces.push(Face(face));
                    }
                }
                gltf::mesh::Mode::TriangleFan => {
                    let face = indices.collect::<Vec<u32>>();
                    if face.len() >= 3 {
                        result.faces.push(Face(face));
                    }
                }
                mode => {
                    log::debug!(
                        "Mesh {}: primitive {} has mode {:?}, no faces read",
                        result.name,
                        primitive.index(),
                        mode
                    );
                }
            }

            let mut targets = reader.read_morph_targets().map(|(positions, _, _)| {
                positions
                    .map(|displacements| {
                        displacements
                            .map(|d| basis.transform_vector3(Vec3::from(d)))
                            .collect::<Vec<Vec3>>()
                    })
                    .unwrap_or_else(|| vec![Vec3::ZERO; vertex_len])
            });

            if result.morph_targets.is_empty() {
                result.morph_targets = targets
                    .map(|displacements| MorphTarget {
                        displacements: vec![Vec3::ZERO; vertex_offset as usize]
                            .into_iter()
                            .chain(displacements)
                            .collect(),
                    })
                    .collect();
            } else {
                for target in result.morph_targets.iter_mut() {
                    let displacements = targets
                        .next()
                        .unwrap_or_else(|| vec![Vec3::ZERO; vertex_len]);
                    target.displacements.extend(displacements);
                }
            }

            result.positions.extend(vertices);
        }

        if result.positions.is_empty() {
            bail!("Mesh without vertices: {}", result.name);
        }

        Ok(result)
    }
}
