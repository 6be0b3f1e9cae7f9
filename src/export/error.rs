use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Vertices,
    Triangles,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitKind::Vertices => f.write_str("vertex"),
            LimitKind::Triangles => f.write_str("triangle"),
        }
    }
}

/// Failures that abort an export. No artifact is written when one occurs.
#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("Collider {limit} count {count} > {max} on {object}.")]
    ColliderLimitExceeded {
        object: String,
        limit: LimitKind,
        count: usize,
        max: usize,
    },

    #[error("Face of {object} references vertex {index}, mesh has {vertex_count} vertices")]
    DanglingIndex {
        object: String,
        index: u32,
        vertex_count: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Conditions reported alongside a successful export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportWarning {
    /// The sidecar exporter did not finish normally; the document is still written.
    SidecarExportDegraded { reason: String },
}

impl fmt::Display for ExportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportWarning::SidecarExportDegraded { reason } => {
                write!(f, "GLB export returned: {reason}")
            }
        }
    }
}
