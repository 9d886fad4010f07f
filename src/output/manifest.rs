//! CSV index of written artifacts (`"id","title","page_id"`)

use super::{Artifact, ArtifactSink, WriteError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

const HEADER: &str = "\"id\",\"title\",\"page_id\"\n";

/// Appends one row per artifact to a CSV file
pub struct ManifestSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl ManifestSink {
    /// Open (or create with a header) the manifest at `path`
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, WriteError> {
        let path = path.as_ref().to_path_buf();
        let setup_err = |e: std::io::Error| WriteError::Setup {
            handler: "manifest".to_string(),
            message: format!("{}: {}", path.display(), e),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(setup_err)?;
        }

        let exists = tokio::fs::try_exists(&path).await.map_err(setup_err)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(setup_err)?;
        if !exists {
            file.write_all(HEADER.as_bytes()).await.map_err(setup_err)?;
        }

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[async_trait]
impl ArtifactSink for ManifestSink {
    async fn store(&self, artifact: &Artifact) -> Result<(), WriteError> {
        let row = format!(
            "{},{},{}\n",
            quote(artifact.external_id()),
            quote(artifact.title().unwrap_or("")),
            quote(artifact.page_id())
        );

        let mut file = self.file.lock().await;
        file.write_all(row.as_bytes())
            .await
            .map_err(|source| WriteError::Io {
                name: artifact.name().to_string(),
                source,
            })
    }

    fn describe(&self) -> String {
        format!("manifest:{}", self.path.display())
    }

    async fn close(&self) -> Result<(), WriteError> {
        self.file.lock().await.flush().await.map_err(|e| WriteError::Setup {
            handler: "manifest".to_string(),
            message: e.to_string(),
        })
    }
}
