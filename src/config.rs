use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ExportConfig {
    /// Iterate the selection instead of the whole scene.
    pub selection_only: bool,
    pub include_colliders: bool,
    /// Build colliders from evaluated (morphed) geometry rather than the base mesh.
    pub apply_modifiers: bool,
    pub max_collider_vertices: usize,
    pub max_collider_triangles: usize,
    pub unit_scale: f32,
    pub export_glb: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            selection_only: false,
            include_colliders: true,
            apply_modifiers: true,
            max_collider_vertices: 20_000,
            max_collider_triangles: 40_000,
            unit_scale: 1.0,
            export_glb: true,
        }
    }
}

impl ExportConfig {
    /// Reads a JSON config file. Missing options keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: ExportConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.unit_scale.is_finite() {
            return Err(ConfigError::InvalidUnitScale(self.unit_scale));
        }
        if self.unit_scale <= 0.0 {
            log::warn!("Unit scale {} collapses or mirrors every position", self.unit_scale);
        }

        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unit scale must be a finite number, got {0}")]
    InvalidUnitScale(f32),
}
