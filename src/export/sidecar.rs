use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarRequest {
    /// Where the binary asset should be written.
    pub path: PathBuf,
    /// Object names to restrict the asset to; `None` exports everything.
    pub selection: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidecarStatus {
    Finished { file: PathBuf },
    Cancelled,
    Failed(String),
}

impl SidecarStatus {
    /// File name of the written artifact, if one was written.
    pub fn artifact_name(&self) -> Option<String> {
        match self {
            SidecarStatus::Finished { file } => file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            SidecarStatus::Cancelled | SidecarStatus::Failed(_) => None,
        }
    }

    pub fn written_file(&self) -> Option<&Path> {
        match self {
            SidecarStatus::Finished { file } => Some(file),
            _ => None,
        }
    }
}

/// Writes the binary mesh asset that accompanies a level document.
pub trait SidecarExporter {
    fn export(&mut self, request: &SidecarRequest) -> SidecarStatus;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_name_is_file_name_only() {
        let status = SidecarStatus::Finished {
            file: PathBuf::from("out/levels/level.glb"),
        };

        assert_eq!(status.artifact_name().as_deref(), Some("level.glb"));
        assert_eq!(SidecarStatus::Cancelled.artifact_name(), None);
        assert_eq!(SidecarStatus::Failed("disk full".into()).artifact_name(), None);
    }
}
