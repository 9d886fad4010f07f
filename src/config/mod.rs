//! Configuration for dumpsplit
//!
//! Loaded from a TOML file where every section is optional, then adjusted by
//! environment variables and finally by CLI flags.

mod logging;
mod output;
mod sources;

pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use output::OutputConfig;
pub use sources::{SourcesConfig, DEFAULT_MAPPINGS_URL, DEFAULT_PAGES_URL};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default user agent for dump downloads
pub const DEFAULT_USER_AGENT: &str = "dumpsplit/0.1 (+https://github.com/dumpsplit)";

/// Overrides `pipeline.max_concurrent`
pub const ENV_MAX_CONCURRENT: &str = "MAX_CONCURRENT";

/// Replaces the output list with a single filesystem handler
pub const ENV_OUTPUT_DIR: &str = "DUMPSPLIT_OUTPUT_DIR";

/// Write scheduling and terminal behaviour
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum writes in flight (0 = unbounded)
    pub max_concurrent: usize,
    /// Hide the progress spinner
    pub quiet: bool,
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Output handlers; every artifact goes to each of them
    #[serde(default = "default_outputs")]
    pub outputs: Vec<OutputConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_outputs() -> Vec<OutputConfig> {
    vec![OutputConfig::default()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: SourcesConfig::default(),
            pipeline: PipelineConfig::default(),
            outputs: default_outputs(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load a TOML file without validating it.
    ///
    /// Call [`Config::validate`] after environment and CLI overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        Ok(config)
    }

    /// Load `path` when given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Default configuration rendered as TOML
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Self::default()).context("Failed to serialize default config")
    }

    /// Apply `MAX_CONCURRENT` and `DUMPSPLIT_OUTPUT_DIR` from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MAX_CONCURRENT) {
            let value = value.trim();
            if !value.is_empty() {
                self.pipeline.max_concurrent = value.parse::<usize>().with_context(|| {
                    format!(
                        "{} must be a non-negative integer, got '{}'",
                        ENV_MAX_CONCURRENT, value
                    )
                })?;
            }
        }

        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|d| !d.trim().is_empty()) {
            self.set_output_dir(PathBuf::from(dir));
        }

        Ok(())
    }

    /// Replace the outputs with a single filesystem handler at `dir`,
    /// keeping the fail-fast setting of the existing handlers
    pub fn set_output_dir(&mut self, dir: PathBuf) {
        let fail_on_error = self.outputs.iter().any(OutputConfig::fail_on_error);
        let mut output = OutputConfig::filesystem(dir);
        output.set_fail_on_error(fail_on_error);
        self.outputs = vec![output];
    }

    /// Make every handler fail-fast
    pub fn set_fail_fast(&mut self) {
        for output in &mut self.outputs {
            output.set_fail_on_error(true);
        }
    }

    /// Validate all configuration fields, reporting every problem at once
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.sources.property.trim().is_empty() {
            errors.push("sources.property must not be empty".to_string());
        }
        if self.sources.scan_tail_bytes == 0 {
            errors.push("sources.scan_tail_bytes must be positive".to_string());
        }
        if self.sources.chunk_size == 0 {
            errors.push("sources.chunk_size must be positive".to_string());
        }
        if self.sources.request_timeout_secs == 0 {
            errors.push("sources.request_timeout_secs must be positive".to_string());
        }
        if self.sources.user_agent.trim().is_empty() {
            errors.push("sources.user_agent must not be empty".to_string());
        }

        if self.outputs.is_empty() {
            errors.push("at least one [[outputs]] entry is required".to_string());
        }
        for (i, output) in self.outputs.iter().enumerate() {
            match output {
                OutputConfig::Filesystem { output_dir, .. } => {
                    if output_dir.as_os_str().is_empty() {
                        errors.push(format!("outputs[{}]: output_dir must not be empty", i));
                    }
                }
                OutputConfig::Http {
                    base_url,
                    timeout_secs,
                    ..
                } => {
                    if url::Url::parse(base_url).is_err() {
                        errors.push(format!("outputs[{}]: base_url '{}' is not a valid URL", i, base_url));
                    }
                    if *timeout_secs == 0 {
                        errors.push(format!("outputs[{}]: timeout_secs must be positive", i));
                    }
                }
                OutputConfig::Manifest { path, .. } => {
                    if path.as_os_str().is_empty() {
                        errors.push(format!("outputs[{}]: path must not be empty", i));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}
