//! Local directory output

use super::{check_name, Artifact, ArtifactSink, WriteError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Writes each artifact to `<output_dir>/<name>`.
///
/// The payload goes to a hidden temp file first and is renamed into place, so
/// a reader never sees a partially written artifact.
#[derive(Debug, Clone)]
pub struct FilesystemSink {
    output_dir: PathBuf,
}

impl FilesystemSink {
    /// Create the sink, creating the directory if needed
    pub async fn create(output_dir: impl AsRef<Path>) -> Result<Self, WriteError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|e| WriteError::Setup {
                handler: "filesystem".to_string(),
                message: format!("cannot create {}: {}", output_dir.display(), e),
            })?;
        tracing::info!("Output directory set to {}", output_dir.display());
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Final path of an artifact
    pub fn path_for(&self, artifact: &Artifact) -> PathBuf {
        self.output_dir.join(artifact.name())
    }
}

#[async_trait]
impl ArtifactSink for FilesystemSink {
    async fn store(&self, artifact: &Artifact) -> Result<(), WriteError> {
        check_name(artifact.name())?;

        let io_err = |source: std::io::Error| WriteError::Io {
            name: artifact.name().to_string(),
            source,
        };
        let target = self.path_for(artifact);
        let temp = self.output_dir.join(format!(".{}.tmp", artifact.name()));

        tokio::fs::write(&temp, artifact.payload())
            .await
            .map_err(io_err)?;
        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(io_err(e));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("filesystem:{}", self.output_dir.display())
    }
}
