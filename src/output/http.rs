//! HTTP object storage output (`PUT {base_url}/{base_path}/{name}`)
//!
//! Works with storage APIs that accept a plain authenticated PUT, such as
//! Bunny Storage or a presigned bucket gateway.

use super::{check_name, Artifact, ArtifactSink, WriteError};
use crate::util::truncate_str;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// Maximum response body kept in error messages
const MAX_ERROR_BODY: usize = 200;

/// Uploads artifacts with HTTP PUT
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    /// Prefix every artifact name is appended to, without trailing slash
    base: String,
    access_key: Option<String>,
}

impl HttpSink {
    pub fn new(
        base_url: &str,
        base_path: &str,
        access_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, WriteError> {
        let setup_err = |message: String| WriteError::Setup {
            handler: "http".to_string(),
            message,
        };

        Url::parse(base_url).map_err(|e| setup_err(format!("invalid base_url '{}': {}", base_url, e)))?;

        let base_path = base_path.trim_matches('/');
        let base = if base_path.is_empty() {
            base_url.trim_end_matches('/').to_string()
        } else {
            format!("{}/{}", base_url.trim_end_matches('/'), base_path)
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| setup_err(e.to_string()))?;

        Ok(Self {
            client,
            base,
            access_key,
        })
    }

    /// Destination URL of an artifact
    pub fn url_for(&self, artifact: &Artifact) -> String {
        format!("{}/{}", self.base, artifact.name())
    }
}

#[async_trait]
impl ArtifactSink for HttpSink {
    async fn store(&self, artifact: &Artifact) -> Result<(), WriteError> {
        check_name(artifact.name())?;

        let mut request = self
            .client
            .put(self.url_for(artifact))
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(artifact.payload().to_string());
        if let Some(ref key) = self.access_key {
            request = request.header("AccessKey", key);
        }

        let response = request.send().await.map_err(|source| WriteError::Http {
            name: artifact.name().to_string(),
            source,
        })?;

        let status = response.status().as_u16();
        if matches!(status, 200 | 201 | 204) {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(WriteError::Status {
            name: artifact.name().to_string(),
            status,
            body: truncate_str(&body, MAX_ERROR_BODY),
        })
    }

    fn describe(&self) -> String {
        format!("http:{}", self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_construction() {
        let sink = HttpSink::new(
            "https://storage.bunnycdn.com/",
            "/voyage/wikitext/",
            Some("secret".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        let artifact = Artifact::new("Q100", "7", "Hello");
        assert_eq!(
            sink.url_for(&artifact),
            "https://storage.bunnycdn.com/voyage/wikitext/Q100.wiki.txt"
        );
        assert_eq!(sink.describe(), "http:https://storage.bunnycdn.com/voyage/wikitext");
    }

    #[test]
    fn test_empty_base_path() {
        let sink = HttpSink::new("http://localhost:9000/bucket", "", None, Duration::from_secs(5)).unwrap();
        assert_eq!(
            sink.url_for(&Artifact::new("Q1", "1", "")),
            "http://localhost:9000/bucket/Q1.wiki.txt"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpSink::new("not a url", "", None, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, WriteError::Setup { .. }));
    }
}
