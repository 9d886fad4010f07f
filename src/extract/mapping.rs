//! Page id → external id map built from the `page_props` SQL dump
//!
//! The map must be complete before any page is correlated: the property rows
//! are ordered by page, not by dump position, so a partially built map would
//! silently drop matches.

use super::decode::decompress;
use super::error::PipelineError;
use super::progress::RunProgress;
use super::scanner::{TupleMatch, TupleScanner};
use super::source::{ByteStream, Compression, StreamReader};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{ErrorKind, Read};
use std::sync::Arc;
use tracing::{debug, info};

/// Page property used when none is configured
pub const DEFAULT_PROPERTY: &str = "wikibase_item";

/// Immutable page id → external id mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IdentifierMap {
    entries: HashMap<String, String>,
}

impl IdentifierMap {
    /// External id mapped to `page_id`, if any
    pub fn get(&self, page_id: &str) -> Option<&str> {
        self.entries.get(page_id).map(String::as_str)
    }

    pub fn contains(&self, page_id: &str) -> bool {
        self.entries.contains_key(page_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for IdentifierMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Accumulates mappings from chunks of decompressed SQL text
pub struct MappingCollector {
    scanner: TupleScanner,
    property: String,
    entries: HashMap<String, String>,
}

impl MappingCollector {
    pub fn new(property: impl Into<String>, tail_bytes: usize) -> Self {
        Self {
            scanner: TupleScanner::new(tail_bytes),
            property: property.into(),
            entries: HashMap::new(),
        }
    }

    /// Feed the next chunk of decompressed bytes
    pub fn feed(&mut self, chunk: &[u8]) {
        let property = self.property.as_str();
        let entries = &mut self.entries;
        self.scanner
            .push(chunk, |tuple| record(entries, property, tuple));
    }

    /// Run the final scan and freeze the map
    pub fn finish(self) -> IdentifierMap {
        let MappingCollector {
            scanner,
            property,
            mut entries,
        } = self;
        let matched = scanner.finish(|tuple| record(&mut entries, &property, tuple));
        debug!("Scanned {} property tuples", matched);
        IdentifierMap { entries }
    }
}

fn record(entries: &mut HashMap<String, String>, property: &str, tuple: TupleMatch<'_>) {
    if tuple.name == property {
        debug!("Found mapping {} -> {}", tuple.page_id, tuple.value);
        entries.insert(tuple.page_id.to_string(), tuple.value.to_string());
    }
}

/// Read a decompressed dump to the end and build the map.
///
/// Blocking; checks `progress` for cancellation between reads.
pub fn collect_mappings<R: Read>(
    mut reader: R,
    property: &str,
    tail_bytes: usize,
    chunk_size: usize,
    progress: &RunProgress,
) -> Result<IdentifierMap, PipelineError> {
    let mut collector = MappingCollector::new(property, tail_bytes);
    let mut buf = vec![0u8; chunk_size.max(1)];

    loop {
        if progress.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(PipelineError::from_read(e)),
        };
        collector.feed(&buf[..n]);
    }

    Ok(collector.finish())
}

/// Build the identifier map from a compressed dump stream.
///
/// Decompression and scanning run on the blocking pool; the download keeps
/// running on the async side.
pub async fn build_identifier_map(
    stream: ByteStream,
    compression: Compression,
    property: &str,
    tail_bytes: usize,
    chunk_size: usize,
    progress: Arc<RunProgress>,
) -> Result<IdentifierMap, PipelineError> {
    let reader = StreamReader::spawn(stream);
    let property = property.to_string();
    let scan_progress = progress.clone();

    let map = tokio::task::spawn_blocking(move || {
        collect_mappings(
            decompress(reader, compression),
            &property,
            tail_bytes,
            chunk_size,
            &scan_progress,
        )
    })
    .await??;

    progress.set_mappings(map.len() as u64);
    info!("Got {} mappings", map.len());
    Ok(map)
}
