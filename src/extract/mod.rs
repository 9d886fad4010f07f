//! Dump extraction and correlation
//!
//! A run reads two Wikimedia dumps once each, as compressed byte streams that
//! are never fully buffered:
//!
//! 1. the `page_props` SQL dump, scanned for `(page_id, property, value, _)`
//!    tuples to build an [`IdentifierMap`] of page id → external id;
//! 2. the `pages-articles` XML dump, split into pages whose revision text is
//!    written as an [`Artifact`](crate::output::Artifact) named after the
//!    mapped external id.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌────────────────┐   ┌──────────────┐
//! │ SourceOpener │──▶│ StreamReader │──▶│  decompress()  │──▶│ TupleScanner │
//! │ file / HTTP  │   │ async → Read │   │  gzip / bzip2  │   │ (page_props) │
//! └──────────────┘   └──────────────┘   └────────────────┘   └──────┬───────┘
//!                                                                   │ IdentifierMap
//!                                                                   ▼
//! ┌──────────────┐   ┌──────────────┐   ┌────────────────┐   ┌──────────────┐
//! │   Outputs    │◀──│   JoinSet    │◀──│ConcurrencyGate │◀──│ PageSplitter │
//! │ (handlers)   │   │  of writes   │   │ (FIFO permits) │   │ (pages XML)  │
//! └──────────────┘   └──────────────┘   └────────────────┘   └──────────────┘
//! ```
//!
//! Decompression and parsing are synchronous and run on the blocking pool;
//! downloads and writes run on the async runtime.

pub mod decode;
pub mod error;
pub mod gate;
pub mod mapping;
pub mod pipeline;
pub mod progress;
pub mod scanner;
pub mod source;
pub mod splitter;

pub use decode::decompress;
pub use error::{DecodeError, PipelineError};
pub use gate::{ConcurrencyGate, GatePermit};
pub use mapping::{build_identifier_map, collect_mappings, IdentifierMap, MappingCollector, DEFAULT_PROPERTY};
pub use pipeline::{Pipeline, RunSummary};
pub use progress::{ProgressSnapshot, RunProgress};
pub use scanner::{TupleMatch, TupleScanner, DEFAULT_TAIL_BYTES};
pub use source::{ByteStream, Compression, DumpLocation, FetchError, SourceOpener, StreamReader, DEFAULT_CHUNK_SIZE};
pub use splitter::{extract_pages, split_pages, PageOutcome, PageSplitter, PageState, SplitStats};
