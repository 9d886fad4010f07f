//! dumpsplit: split compressed Wikimedia dumps into per-article artifacts
//!
//! Extracts the raw wikitext of every article in a `pages-articles` XML dump,
//! names it after the article's external identifier (the `wikibase_item`
//! page property from the `page_props` SQL dump) and writes it through one or
//! more output handlers:
//! - Streaming decompression of gzip and bzip2 dumps from disk or HTTP
//! - Chunk-boundary-safe scanning of SQL `INSERT` tuples
//! - Incremental XML page splitting with bounded write concurrency
//! - Filesystem, HTTP object storage and CSV manifest outputs
//! - Typed node tree for the downstream structured representation

pub mod config;
pub mod extract;
pub mod model;
pub mod output;
pub mod util;

pub use config::Config;
pub use extract::{Pipeline, PipelineError, RunSummary};
