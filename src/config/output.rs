//! Output handler configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default timeout for HTTP uploads
fn default_upload_timeout() -> u64 {
    30
}

/// One `[[outputs]]` entry
///
/// ```toml
/// [[outputs]]
/// handler = "filesystem"
/// output_dir = "./output"
///
/// [[outputs]]
/// handler = "http"
/// base_url = "https://storage.bunnycdn.com/my-zone"
/// base_path = "wikitext"
/// access_key = "..."
/// fail_on_error = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "handler", rename_all = "lowercase")]
pub enum OutputConfig {
    /// Write artifacts into a local directory
    Filesystem {
        output_dir: PathBuf,
        #[serde(default)]
        fail_on_error: bool,
    },
    /// PUT artifacts to an object storage endpoint
    Http {
        base_url: String,
        #[serde(default)]
        base_path: String,
        /// Sent as the `AccessKey` header
        #[serde(default)]
        access_key: Option<String>,
        #[serde(default = "default_upload_timeout")]
        timeout_secs: u64,
        #[serde(default)]
        fail_on_error: bool,
    },
    /// Append one CSV row per artifact
    Manifest {
        path: PathBuf,
        #[serde(default)]
        fail_on_error: bool,
    },
}

impl OutputConfig {
    pub fn filesystem(output_dir: impl Into<PathBuf>) -> Self {
        OutputConfig::Filesystem {
            output_dir: output_dir.into(),
            fail_on_error: false,
        }
    }

    pub fn fail_on_error(&self) -> bool {
        match self {
            OutputConfig::Filesystem { fail_on_error, .. }
            | OutputConfig::Http { fail_on_error, .. }
            | OutputConfig::Manifest { fail_on_error, .. } => *fail_on_error,
        }
    }

    /// Switch the handler to fail-fast
    pub fn set_fail_on_error(&mut self, value: bool) {
        match self {
            OutputConfig::Filesystem { fail_on_error, .. }
            | OutputConfig::Http { fail_on_error, .. }
            | OutputConfig::Manifest { fail_on_error, .. } => *fail_on_error = value,
        }
    }

    pub fn handler_name(&self) -> &'static str {
        match self {
            OutputConfig::Filesystem { .. } => "filesystem",
            OutputConfig::Http { .. } => "http",
            OutputConfig::Manifest { .. } => "manifest",
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig::filesystem("./output")
    }
}
