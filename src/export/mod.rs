pub mod assembler;
pub mod classify;
pub mod collider;
pub mod document;
pub mod error;
pub mod props;
pub mod sidecar;
pub mod transform;

use std::path::{Path, PathBuf};

use crate::config::ExportConfig;
use crate::scene_graph::Scene;

pub use assembler::{LevelAssembler, SidecarJob};
pub use document::LevelDocument;
pub use error::{ExportError, ExportWarning};
pub use sidecar::{SidecarExporter, SidecarRequest, SidecarStatus};

#[derive(Debug)]
pub struct ExportReport {
    pub json_path: PathBuf,
    pub glb: Option<String>,
    pub node_count: usize,
    pub warnings: Vec<ExportWarning>,
}

/// Document and sidecar paths for an output base path; any extension on the
/// base is replaced.
pub fn output_paths(base: &Path) -> (PathBuf, PathBuf) {
    (base.with_extension("json"), base.with_extension("glb"))
}

/// Runs one export: assemble, write the sidecar (if an exporter is given and
/// the config asks for one), then write the document. Output directories are
/// only created once assembly has succeeded, and nothing is left on disk when
/// the export fails.
pub fn export_level(
    scene: &Scene,
    config: &ExportConfig,
    base: &Path,
    sidecar: Option<&mut dyn SidecarExporter>,
) -> Result<ExportReport, ExportError> {
    let (json_path, glb_path) = output_paths(base);

    let selection = config.selection_only.then(|| {
        scene
            .selected_objects()
            .map(|object| object.name.clone())
            .collect::<Vec<_>>()
    });
    let job = sidecar
        .filter(|_| config.export_glb)
        .map(|exporter| SidecarJob {
            exporter,
            request: SidecarRequest {
                path: glb_path,
                selection,
            },
        });

    let assembler = LevelAssembler::new(config);
    let assembly = if config.selection_only {
        assembler.assemble(scene, scene.selected_objects(), job)?
    } else {
        assembler.assemble(scene, scene.objects(), job)?
    };

    if let Err(err) = write_document(&assembly.document, &json_path) {
        if let Some(file) = assembly.sidecar.as_ref().and_then(SidecarStatus::written_file) {
            if let Err(remove_err) = std::fs::remove_file(file) {
                log::warn!("Failed to remove {}: {}", file.display(), remove_err);
            }
        }
        return Err(err);
    }

    Ok(ExportReport {
        json_path,
        glb: assembly.document.glb().map(String::from),
        node_count: assembly.document.nodes().len(),
        warnings: assembly.warnings,
    })
}

fn write_document(document: &LevelDocument, path: &Path) -> Result<(), ExportError> {
    let json = document.to_json_pretty()?;
    create_parent_dir(path)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Creates the directory `path` will be written into.
pub(crate) fn create_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset_pipeline::glb_packer::GlbPacker;
    use crate::scene_graph::mesh::Face;
    use crate::scene_graph::{Mesh, ObjectType, SceneObject};
    use glam::Vec3;
    use tempfile::TempDir;

    struct WritingSidecar;

    impl SidecarExporter for WritingSidecar {
        fn export(&mut self, request: &SidecarRequest) -> SidecarStatus {
            create_parent_dir(&request.path).unwrap();
            std::fs::write(&request.path, b"glTF").unwrap();
            SidecarStatus::Finished {
                file: request.path.clone(),
            }
        }
    }

    struct BrokenSidecar;

    impl SidecarExporter for BrokenSidecar {
        fn export(&mut self, _request: &SidecarRequest) -> SidecarStatus {
            SidecarStatus::Failed("no exporter".into())
        }
    }

    fn scene() -> Scene {
        let mut scene = Scene::new();
        let quad = scene.add_mesh(Mesh::new(
            "Quad",
            vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
            vec![Face(vec![0, 1, 2, 3])],
        ));
        scene.add_object(SceneObject::new("Floor", ObjectType::Mesh).with_mesh(quad));
        scene.add_object(SceneObject::new("Spawn", ObjectType::Empty).with_tag("_editor", true));
        scene
    }

    #[test]
    fn output_paths_replace_extension() {
        let (json, glb) = output_paths(Path::new("out/level.blend"));

        assert_eq!(json, PathBuf::from("out/level.json"));
        assert_eq!(glb, PathBuf::from("out/level.glb"));
    }

    #[test]
    fn writes_document_and_sidecar() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("levels/level");

        let report = export_level(&scene(), &ExportConfig::default(), &base, Some(&mut WritingSidecar)).unwrap();

        assert_eq!(report.glb.as_deref(), Some("level.glb"));
        assert_eq!(report.node_count, 2);
        assert!(dir.path().join("levels/level.glb").exists());

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report.json_path).unwrap()).unwrap();
        assert_eq!(written["schema"], "raylib.level/1.0");
        assert_eq!(written["glb"], "level.glb");
        assert_eq!(written["nodes"][0]["collider"]["triangles"].as_array().unwrap().len(), 2);
        assert!(written["nodes"][1].get("collider").is_none());
        assert_eq!(written["nodes"][1]["props"], serde_json::json!({}));
    }

    #[test]
    fn degraded_sidecar_still_writes_document() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("level");

        let report = export_level(&scene(), &ExportConfig::default(), &base, Some(&mut BrokenSidecar)).unwrap();

        assert!(report.json_path.exists());
        assert_eq!(report.glb, None);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn collider_limit_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("out/level");
        let config = ExportConfig {
            max_collider_triangles: 1,
            ..Default::default()
        };

        let err = export_level(&scene(), &config, &base, Some(&mut WritingSidecar)).unwrap_err();

        assert!(matches!(err, ExportError::ColliderLimitExceeded { .. }));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn failed_document_write_removes_sidecar() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("level");
        // A directory in the way of the document makes the write fail.
        std::fs::create_dir(dir.path().join("level.json")).unwrap();

        let err = export_level(&scene(), &ExportConfig::default(), &base, Some(&mut WritingSidecar)).unwrap_err();

        assert!(matches!(err, ExportError::Io(_)));
        assert!(!dir.path().join("level.glb").exists());
    }

    #[test]
    fn failed_cleanup_keeps_the_write_error() {
        struct VanishingSidecar;

        impl SidecarExporter for VanishingSidecar {
            fn export(&mut self, request: &SidecarRequest) -> SidecarStatus {
                SidecarStatus::Finished {
                    file: request.path.with_file_name("gone.glb"),
                }
            }
        }

        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("level.json")).unwrap();

        let err = export_level(
            &scene(),
            &ExportConfig::default(),
            &dir.path().join("level"),
            Some(&mut VanishingSidecar),
        )
        .unwrap_err();

        assert!(matches!(err, ExportError::Io(_)));
    }

    #[test]
    fn export_glb_off_skips_sidecar() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("level");
        let config = ExportConfig {
            export_glb: false,
            ..Default::default()
        };

        let report = export_level(&scene(), &config, &base, Some(&mut WritingSidecar)).unwrap();

        assert_eq!(report.glb, None);
        assert!(!dir.path().join("level.glb").exists());
    }

    #[test]
    fn selection_only_exports_selected_objects() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("level");
        let mut scene = scene();
        scene.select_by_name("Spawn").unwrap();
        let config = ExportConfig {
            selection_only: true,
            ..Default::default()
        };

        let report = export_level(&scene, &config, &base, None).unwrap();

        assert_eq!(report.node_count, 1);
    }

    #[test]
    fn selection_only_restricts_the_sidecar() {
        let (document, buffers, _) =
            gltf::import_slice(include_bytes!("../../assets/test_scene.gltf")).unwrap();
        let mut scene = Scene::new();
        scene.spawn_gltf_scene(&document, &buffers).unwrap();
        scene.select_by_name("Spawn_1").unwrap();
        let mut packer = GlbPacker::new(&document, &buffers);
        let dir = TempDir::new().unwrap();
        let config = ExportConfig {
            selection_only: true,
            ..Default::default()
        };

        let report = export_level(&scene, &config, &dir.path().join("level"), Some(&mut packer)).unwrap();

        assert_eq!(report.node_count, 1);
        let glb = gltf::Gltf::open(dir.path().join("level.glb")).unwrap();
        let names = glb.nodes().map(|n| n.name().unwrap_or_default().to_string()).collect::<Vec<_>>();
        assert_eq!(names, vec!["Group", "Spawn_1"]);
    }

    #[test]
    fn exports_imported_gltf_scene() {
        let (document, buffers, _) =
            gltf::import_slice(include_bytes!("../../assets/test_scene.gltf")).unwrap();
        let mut scene = Scene::new();
        scene.spawn_gltf_scene(&document, &buffers).unwrap();
        let mut packer = GlbPacker::new(&document, &buffers);
        let dir = TempDir::new().unwrap();

        let report = export_level(&scene, &ExportConfig::default(), &dir.path().join("level"), Some(&mut packer)).unwrap();

        assert_eq!(report.glb.as_deref(), Some("level.glb"));
        assert!(gltf::Gltf::open(dir.path().join("level.glb")).is_ok());

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report.json_path).unwrap()).unwrap();
        let nodes = written["nodes"].as_array().unwrap();
        let kinds = nodes.iter().map(|n| n["kind"].as_str().unwrap()).collect::<Vec<_>>();
        assert_eq!(kinds, vec!["platform", "empty", "spawner"]);

        let platform = &nodes[0];
        let position = &platform["transform"]["position"];
        assert!((position["y"].as_f64().unwrap() - 1.0).abs() < 1e-6);
        assert!(position["z"].as_f64().unwrap().abs() < 1e-6);
        assert_eq!(platform["props"], serde_json::json!({ "hp": 10, "tags": ["a", "b"] }));
        assert_eq!(platform["collider"]["triangles"], serde_json::json!([[0, 1, 2]]));

        let last_vertex = &platform["collider"]["vertices"][2];
        assert!((last_vertex[2].as_f64().unwrap() - 1.0).abs() < 1e-6);
    }
}
