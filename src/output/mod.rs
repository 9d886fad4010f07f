//! Artifact outputs
//!
//! An [`ArtifactSink`] stores one named artifact. Sinks are wrapped in an
//! [`OutputHandler`] that applies the failure policy and keeps counts, and all
//! configured handlers are grouped into [`Outputs`], which writes every
//! artifact to each handler concurrently.
//!
//! # Failure policy
//!
//! - `fail_on_error = false`: a failed write is logged with the artifact name,
//!   counted, and the run continues.
//! - `fail_on_error = true`: the first failed write is returned to the caller,
//!   which treats it as fatal for the run.

mod artifact;
mod filesystem;
mod handler;
mod http;
mod manifest;

pub use artifact::{Artifact, ARTIFACT_SUFFIX};
pub use filesystem::FilesystemSink;
pub use handler::{HandlerStats, OutputHandler, Outputs};
pub use http::HttpSink;
pub use manifest::ManifestSink;

use crate::config::OutputConfig;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while storing a single artifact
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("I/O error writing {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP error writing {name}: {source}")]
    Http {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upload of {name} failed with status {status}: {body}")]
    Status { name: String, status: u16, body: String },

    #[error("refusing to write artifact with unsafe name {0:?}")]
    InvalidName(String),

    #[error("failed to set up {handler} output: {message}")]
    Setup { handler: String, message: String },
}

impl WriteError {
    /// Name of the artifact that failed, when the error concerns one
    pub fn artifact_name(&self) -> Option<&str> {
        match self {
            WriteError::Io { name, .. }
            | WriteError::Http { name, .. }
            | WriteError::Status { name, .. }
            | WriteError::InvalidName(name) => Some(name),
            WriteError::Setup { .. } => None,
        }
    }
}

/// Destination for artifacts
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Store one artifact. Either the whole payload is stored or an error is returned.
    async fn store(&self, artifact: &Artifact) -> Result<(), WriteError>;

    /// Short description for logs
    fn describe(&self) -> String;

    /// Flush and release resources
    async fn close(&self) -> Result<(), WriteError> {
        Ok(())
    }
}

/// Build a handler from its configuration
pub async fn handler_from_config(config: &OutputConfig) -> Result<OutputHandler, WriteError> {
    let handler = match config {
        OutputConfig::Filesystem {
            output_dir,
            fail_on_error,
        } => OutputHandler::new(FilesystemSink::create(output_dir).await?, *fail_on_error),
        OutputConfig::Http {
            base_url,
            base_path,
            access_key,
            timeout_secs,
            fail_on_error,
        } => OutputHandler::new(
            HttpSink::new(
                base_url,
                base_path,
                access_key.clone(),
                Duration::from_secs(*timeout_secs),
            )?,
            *fail_on_error,
        ),
        OutputConfig::Manifest {
            path,
            fail_on_error,
        } => OutputHandler::new(ManifestSink::create(path).await?, *fail_on_error),
    };

    tracing::info!("Using output {}", handler.describe());
    Ok(handler)
}

/// Build every configured handler
pub async fn outputs_from_config(configs: &[OutputConfig]) -> Result<Outputs, WriteError> {
    let mut handlers = Vec::with_capacity(configs.len());
    for config in configs {
        handlers.push(handler_from_config(config).await?);
    }
    Ok(Outputs::new(handlers))
}

/// Reject names that would escape the destination directory or prefix
pub(crate) fn check_name(name: &str) -> Result<(), WriteError> {
    if name.is_empty()
        || name.starts_with('.')
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(WriteError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_name() {
        assert!(check_name("Q100.wiki.txt").is_ok());
        assert!(check_name("../etc/passwd").is_err());
        assert!(check_name("a/b.wiki.txt").is_err());
        assert!(check_name(".hidden").is_err());
        assert!(check_name("").is_err());
    }

    #[test]
    fn test_error_names_artifact() {
        let err = WriteError::Status {
            name: "Q1.wiki.txt".to_string(),
            status: 500,
            body: "oops".to_string(),
        };
        assert_eq!(err.artifact_name(), Some("Q1.wiki.txt"));
        assert!(err.to_string().contains("Q1.wiki.txt"));
    }
}
