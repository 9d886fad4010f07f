//! Dump source configuration

use crate::extract::{Compression, DumpLocation, DEFAULT_CHUNK_SIZE, DEFAULT_PROPERTY, DEFAULT_TAIL_BYTES};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::DEFAULT_USER_AGENT;

/// Latest English Wikivoyage `page_props` dump
pub const DEFAULT_MAPPINGS_URL: &str =
    "https://dumps.wikimedia.org/enwikivoyage/latest/enwikivoyage-latest-page_props.sql.gz";

/// Latest English Wikivoyage articles dump
pub const DEFAULT_PAGES_URL: &str =
    "https://dumps.wikimedia.org/enwikivoyage/latest/enwikivoyage-latest-pages-articles.xml.bz2";

/// Where the two dumps come from and how they are read
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// `page_props` SQL dump (file path or http(s) URL)
    pub mappings: DumpLocation,
    /// `pages-articles` XML dump (file path or http(s) URL)
    pub pages: DumpLocation,
    /// Compression of the mappings dump (detected from the name when unset)
    pub mappings_compression: Option<Compression>,
    /// Compression of the pages dump (detected from the name when unset)
    pub pages_compression: Option<Compression>,
    /// Page property holding the external id
    pub property: String,
    /// Unmatched bytes kept between scanner chunks; must exceed the longest tuple
    pub scan_tail_bytes: usize,
    /// Read size for local files and decompressed scanning
    pub chunk_size: usize,
    /// HTTP connect timeout (seconds)
    pub request_timeout_secs: u64,
    /// User agent for dump downloads
    pub user_agent: String,
}

impl SourcesConfig {
    /// Effective compression of the mappings dump
    pub fn mappings_compression(&self) -> Compression {
        self.mappings_compression
            .unwrap_or_else(|| Compression::detect(self.mappings.file_name()))
    }

    /// Effective compression of the pages dump
    pub fn pages_compression(&self) -> Compression {
        self.pages_compression
            .unwrap_or_else(|| Compression::detect(self.pages.file_name()))
    }
}

fn default_location(url: &str) -> DumpLocation {
    // Both constants are valid absolute URLs
    DumpLocation::from_str(url).unwrap_or_else(|_| DumpLocation::Path(url.into()))
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            mappings: default_location(DEFAULT_MAPPINGS_URL),
            pages: default_location(DEFAULT_PAGES_URL),
            mappings_compression: None,
            pages_compression: None,
            property: DEFAULT_PROPERTY.to_string(),
            scan_tail_bytes: DEFAULT_TAIL_BYTES,
            chunk_size: DEFAULT_CHUNK_SIZE,
            request_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
