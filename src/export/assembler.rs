use crate::config::ExportConfig;
use crate::export::classify::classify;
use crate::export::collider::{extract_collider, ColliderLimits};
use crate::export::document::{LevelDocument, Node, RaylibTypes};
use crate::export::error::{ExportError, ExportWarning};
use crate::export::props::filter_props;
use crate::export::sidecar::{SidecarExporter, SidecarRequest, SidecarStatus};
use crate::export::transform::to_runtime;
use crate::scene_graph::{GeometryHost, ObjectType, SceneObject};

const ALLOWED_TYPES: [ObjectType; 4] = [
    ObjectType::Mesh,
    ObjectType::Empty,
    ObjectType::Light,
    ObjectType::Camera,
];

/// Sidecar export to run once all nodes are built.
pub struct SidecarJob<'a> {
    pub exporter: &'a mut dyn SidecarExporter,
    pub request: SidecarRequest,
}

#[derive(Debug)]
pub struct Assembly {
    pub document: LevelDocument,
    /// `None` when no sidecar was requested.
    pub sidecar: Option<SidecarStatus>,
    pub warnings: Vec<ExportWarning>,
}

pub struct LevelAssembler<'a> {
    config: &'a ExportConfig,
}

impl<'a> LevelAssembler<'a> {
    pub fn new(config: &'a ExportConfig) -> Self {
        Self { config }
    }

    /// Builds the level from `objects`, in the order given. A collider failure
    /// aborts before the sidecar runs; a sidecar failure only adds a warning.
    pub fn assemble<'o, H, I>(
        &self,
        host: &H,
        objects: I,
        sidecar: Option<SidecarJob<'_>>,
    ) -> Result<Assembly, ExportError>
    where
        H: GeometryHost + ?Sized,
        I: IntoIterator<Item = &'o SceneObject>,
    {
        let mut nodes = Vec::new();

        for object in objects {
            if !ALLOWED_TYPES.contains(&object.object_type) {
                log::debug!("Skipping {} ({})", object.name, object.object_type.as_str());
                continue;
            }

            nodes.push(self.build_node(host, object)?);
        }

        let mut warnings = Vec::new();
        let sidecar = sidecar.map(|job| {
            let status = job.exporter.export(&job.request);
            if let SidecarStatus::Failed(reason) = &status {
                let warning = ExportWarning::SidecarExportDegraded {
                    reason: reason.clone(),
                };
                log::warn!("{warning}");
                warnings.push(warning);
            }
            status
        });

        let glb = sidecar.as_ref().and_then(SidecarStatus::artifact_name);
        let document = LevelDocument::new(self.config.unit_scale, glb, nodes);

        Ok(Assembly {
            document,
            sidecar,
            warnings,
        })
    }

    fn build_node<H: GeometryHost + ?Sized>(
        &self,
        host: &H,
        object: &SceneObject,
    ) -> Result<Node, ExportError> {
        let collider = if self.config.include_colliders && object.object_type == ObjectType::Mesh {
            let limits = ColliderLimits {
                max_vertices: self.config.max_collider_vertices,
                max_triangles: self.config.max_collider_triangles,
            };
            extract_collider(host, object, self.config.apply_modifiers, limits)?
        } else {
            None
        };

        let node = Node {
            name: object.name.clone(),
            kind: classify(object),
            transform: to_runtime(&object.world_matrix(), self.config.unit_scale),
            props: filter_props(&object.tags),
            raylib: RaylibTypes::default(),
            collider,
        };

        log::debug!(
            "Node {} as {}{}",
            node.name,
            node.kind,
            if node.collider.is_some() { " with collider" } else { "" }
        );

        Ok(node)
    }
}
