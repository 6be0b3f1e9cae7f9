use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

mod asset_pipeline;
mod config;
mod export;
mod math;
mod scene_graph;

use crate::asset_pipeline::glb_packer::GlbPacker;
use crate::config::ExportConfig;
use crate::export::SidecarExporter;
use crate::scene_graph::Scene;

/// Export a glTF scene as a raylib level description.
#[derive(Parser)]
#[command(name = "raylvl", version)]
struct Cli {
    /// Source scene (.gltf or .glb)
    input: PathBuf,

    /// Output base path; writes <base>.json and <base>.glb
    #[arg(short, long, default_value = "level")]
    output: PathBuf,

    /// JSON file with export options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Select an object by name (repeatable, selection order is kept)
    #[arg(long = "select", value_name = "NAME")]
    select: Vec<String>,

    /// Export only the selected objects
    #[arg(long)]
    selection_only: bool,

    /// Do not write mesh colliders
    #[arg(long)]
    no_colliders: bool,

    /// Build colliders from base geometry instead of evaluated geometry
    #[arg(long)]
    no_modifiers: bool,

    #[arg(long, value_name = "N")]
    max_collider_vertices: Option<usize>,

    #[arg(long, value_name = "N")]
    max_collider_triangles: Option<usize>,

    #[arg(long, value_name = "SCALE")]
    unit_scale: Option<f32>,

    /// Do not write the GLB sidecar
    #[arg(long)]
    no_glb: bool,
}

impl Cli {
    fn export_config(&self) -> Result<ExportConfig> {
        let mut config = match &self.config {
            Some(path) => ExportConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ExportConfig::default(),
        };

        config.selection_only |= self.selection_only;
        config.include_colliders &= !self.no_colliders;
        config.apply_modifiers &= !self.no_modifiers;
        config.export_glb &= !self.no_glb;
        if let Some(max) = self.max_collider_vertices {
            config.max_collider_vertices = max;
        }
        if let Some(max) = self.max_collider_triangles {
            config.max_collider_triangles = max;
        }
        if let Some(scale) = self.unit_scale {
            config.unit_scale = scale;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let config = cli.export_config()?;

    let (document, buffers, _images) = gltf::import(&cli.input)
        .with_context(|| format!("Failed to import {}", cli.input.display()))?;

    let mut scene = Scene::new();
    let spawned = scene.spawn_gltf_scene(&document, &buffers)?;
    log::debug!("Loaded {} objects from {}", spawned, cli.input.display());

    for name in &cli.select {
        scene.select_by_name(name)?;
    }

    let (_, glb_path) = export::output_paths(&cli.output);
    if config.export_glb && same_file(&glb_path, &cli.input) {
        bail!("Refusing to overwrite the input scene {}", cli.input.display());
    }

    let mut packer = GlbPacker::new(&document, &buffers);
    if let Some(dir) = cli.input.parent() {
        packer = packer.with_base_dir(dir);
    }
    let sidecar: Option<&mut dyn SidecarExporter> = Some(&mut packer);

    let report = export::export_level(&scene, &config, &cli.output, sidecar)?;

    let json_name = report
        .json_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match &report.glb {
        Some(glb) => log::info!("RayLvl exported: {json_name} and {glb}"),
        None => log::info!("RayLvl exported: {json_name}"),
    }
    if report.warnings.is_empty() {
        log::info!("{} nodes", report.node_count);
    } else {
        log::info!("{} nodes, {} warnings", report.node_count, report.warnings.len());
    }

    Ok(())
}

fn same_file(a: &std::path::Path, b: &std::path::Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
