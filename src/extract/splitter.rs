//! Page stream splitter
//!
//! Walks the `pages-articles` XML dump one event at a time, collects the page
//! id and revision text of each `<page>`, and hands an [`Artifact`] to the
//! dispatcher for every page whose id is in the [`IdentifierMap`].
//!
//! Only element boundaries matter here, so the splitter is a small state
//! machine over local element names:
//!
//! ```text
//! Outside --<page>--> InPage --<revision>--> InRevision --<text>--> InText
//!    ^                  |  ^                    |  ^                  |
//!    +-----</page>------+  +----</revision>-----+  +-----</text>------+
//! ```

use super::decode::decompress;
use super::error::{DecodeError, PipelineError};
use super::gate::ConcurrencyGate;
use super::mapping::IdentifierMap;
use super::progress::RunProgress;
use super::source::{ByteStream, Compression, StreamReader, DEFAULT_CHUNK_SIZE};
use crate::output::{Artifact, Outputs, WriteError};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Where the parser currently is relative to the page structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Outside,
    InPage,
    InRevision,
    InText,
}

/// Page-level element whose text is being captured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Title,
}

/// Accumulator for the page currently being read
#[derive(Debug, Default)]
struct PageRecord {
    id: Option<String>,
    title: Option<String>,
    text: Option<String>,
    revision_entered: bool,
}

/// What happened to a page when its `</page>` was reached
#[derive(Debug, PartialEq, Eq)]
pub enum PageOutcome {
    /// The id is mapped; the artifact should be written
    Matched(Artifact),
    /// Complete page without a mapping
    Unmapped { page_id: String },
    /// Page had no id or no revision text
    Incomplete { page_id: Option<String> },
}

/// Counts for one pass over the page dump
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitStats {
    pub pages: u64,
    pub matched: u64,
    pub unmapped: u64,
    pub incomplete: u64,
}

/// Element-boundary state machine over one dump
pub struct PageSplitter<'m> {
    map: &'m IdentifierMap,
    state: PageState,
    field: Option<Field>,
    field_text: String,
    record: PageRecord,
}

impl<'m> PageSplitter<'m> {
    pub fn new(map: &'m IdentifierMap) -> Self {
        Self {
            map,
            state: PageState::Outside,
            field: None,
            field_text: String::new(),
            record: PageRecord::default(),
        }
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    /// Whether text events at the current position are kept
    pub fn wants_text(&self) -> bool {
        self.state == PageState::InText || self.field.is_some()
    }

    /// An element opened
    pub fn start(&mut self, name: &[u8]) {
        match (self.state, name) {
            (_, b"page") => {
                self.state = PageState::InPage;
                self.field = None;
                self.record = PageRecord::default();
            }
            (PageState::InPage, b"revision") => {
                self.state = PageState::InRevision;
                self.record.revision_entered = true;
            }
            (PageState::InRevision, b"text") => {
                self.state = PageState::InText;
                self.record.text.get_or_insert_with(String::new);
            }
            // The page id precedes the revision block; later ids belong to
            // revisions and contributors.
            (PageState::InPage, b"id")
                if self.record.id.is_none() && !self.record.revision_entered =>
            {
                self.begin_field(Field::Id);
            }
            (PageState::InPage, b"title") if self.record.title.is_none() => {
                self.begin_field(Field::Title);
            }
            _ => {}
        }
    }

    /// Character data at the current position, possibly one of several pieces
    pub fn text(&mut self, text: &str) {
        if self.state == PageState::InText {
            if let Some(ref mut body) = self.record.text {
                body.push_str(text);
            }
        } else if self.field.is_some() {
            self.field_text.push_str(text);
        }
    }

    /// An element closed; returns the page outcome on `</page>`
    pub fn end(&mut self, name: &[u8]) -> Option<PageOutcome> {
        match (self.state, name) {
            (PageState::InText, b"text") => self.state = PageState::InRevision,
            (PageState::InRevision, b"revision") => self.state = PageState::InPage,
            (PageState::InPage, b"id") if self.field == Some(Field::Id) => {
                self.record.id = self.take_field();
            }
            (PageState::InPage, b"title") if self.field == Some(Field::Title) => {
                self.record.title = self.take_field();
            }
            (PageState::Outside, _) => {}
            (_, b"page") => {
                self.state = PageState::Outside;
                self.field = None;
                let record = std::mem::take(&mut self.record);
                return Some(self.resolve(record));
            }
            _ => {}
        }
        None
    }

    fn begin_field(&mut self, field: Field) {
        self.field = Some(field);
        self.field_text.clear();
    }

    /// Trimmed field text; blank fields count as absent
    fn take_field(&mut self) -> Option<String> {
        self.field = None;
        let text = std::mem::take(&mut self.field_text);
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    fn resolve(&self, record: PageRecord) -> PageOutcome {
        match (record.id, record.text) {
            (Some(id), Some(text)) => match self.map.get(&id) {
                Some(external_id) => {
                    let artifact = Artifact::new(external_id, id.as_str(), text);
                    PageOutcome::Matched(match record.title {
                        Some(title) => artifact.with_title(title),
                        None => artifact,
                    })
                }
                None => PageOutcome::Unmapped { page_id: id },
            },
            (page_id, _) => PageOutcome::Incomplete { page_id },
        }
    }
}

/// Parse a decompressed page dump and dispatch every matched artifact.
///
/// Blocking. `dispatch` is called in document order; an error from it stops
/// the parse and is returned unchanged. Setting `halt` stops the parse with
/// [`PipelineError::Cancelled`] at the next event, as cancelling `progress`
/// does.
pub fn split_pages<R, F>(
    reader: R,
    map: &IdentifierMap,
    progress: &RunProgress,
    halt: &AtomicBool,
    mut dispatch: F,
) -> Result<SplitStats, PipelineError>
where
    R: BufRead,
    F: FnMut(Artifact) -> Result<(), PipelineError>,
{
    let mut xml = Reader::from_reader(reader);
    let mut buf = Vec::with_capacity(8192);
    let mut splitter = PageSplitter::new(map);
    let mut stats = SplitStats::default();

    loop {
        if progress.is_cancelled() || halt.load(Ordering::Relaxed) {
            return Err(PipelineError::Cancelled);
        }

        let position = xml.buffer_position() as u64;
        let event = match xml.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(e) => return Err(PipelineError::from_xml(e, position)),
        };

        let outcome = match event {
            Event::Start(ref e) => {
                splitter.start(e.local_name().as_ref());
                None
            }
            Event::Empty(ref e) => {
                let name = e.local_name();
                splitter.start(name.as_ref());
                splitter.end(name.as_ref())
            }
            Event::End(ref e) => splitter.end(e.local_name().as_ref()),
            Event::Text(ref e) => {
                if splitter.wants_text() {
                    let text = e
                        .unescape()
                        .map_err(|err| PipelineError::from_xml(err, position))?;
                    splitter.text(&text);
                }
                None
            }
            Event::CData(ref e) => {
                if splitter.wants_text() {
                    let text = std::str::from_utf8(e).map_err(|err| DecodeError::Xml {
                        position,
                        message: err.to_string(),
                    })?;
                    splitter.text(text);
                }
                None
            }
            Event::Eof => break,
            _ => None,
        };

        if let Some(outcome) = outcome {
            stats.pages += 1;
            match outcome {
                PageOutcome::Matched(artifact) => {
                    stats.matched += 1;
                    progress.page_seen(true);
                    debug!(
                        "Page {} -> {} ({} bytes)",
                        artifact.page_id(),
                        artifact.name(),
                        artifact.payload().len()
                    );
                    dispatch(artifact)?;
                }
                PageOutcome::Unmapped { page_id } => {
                    stats.unmapped += 1;
                    progress.page_seen(false);
                    debug!("No mapping for page {}", page_id);
                }
                PageOutcome::Incomplete { page_id } => {
                    stats.incomplete += 1;
                    progress.page_seen(false);
                    debug!("Skipping incomplete page {:?}", page_id);
                }
            }
        }

        buf.clear();
    }

    Ok(stats)
}

/// Stream the page dump and write every matched artifact to `outputs`.
///
/// Parsing runs on the blocking pool and hands artifacts over a rendezvous
/// channel. Each artifact waits for a gate permit, then its write runs as its
/// own task holding that permit, so the parser only ever waits for admission,
/// never for a write to finish. All writes are joined before returning.
///
/// A fail-fast write error halts the parse at its next event and stops the
/// download, then wins over any parse error that follows.
pub async fn extract_pages(
    stream: ByteStream,
    compression: Compression,
    map: Arc<IdentifierMap>,
    gate: ConcurrencyGate,
    outputs: Arc<Outputs>,
    progress: Arc<RunProgress>,
) -> Result<SplitStats, PipelineError> {
    let (reader, pump) = StreamReader::spawn_abortable(stream);
    let (tx, mut rx) = mpsc::channel::<Artifact>(1);
    let halt = Arc::new(AtomicBool::new(false));
    let parse_progress = progress.clone();
    let parse_halt = halt.clone();

    let parse = tokio::task::spawn_blocking(move || {
        let input = BufReader::with_capacity(DEFAULT_CHUNK_SIZE, decompress(reader, compression));
        split_pages(input, &map, &parse_progress, &parse_halt, |artifact| {
            tx.blocking_send(artifact)
                .map_err(|_| PipelineError::DispatchClosed)
        })
    });

    let mut writes: JoinSet<Result<(), WriteError>> = JoinSet::new();
    let mut fatal: Option<WriteError> = None;

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(artifact) => {
                    let permit = gate.acquire().await;
                    progress.artifact_dispatched();
                    let outputs = outputs.clone();
                    writes.spawn(async move {
                        let result = outputs.store(&artifact).await;
                        permit.release();
                        result
                    });
                }
                None => break,
            },
            Some(joined) = writes.join_next(), if !writes.is_empty() => {
                if let Err(e) = joined? {
                    fatal = Some(e);
                    break;
                }
            }
        }
    }

    if fatal.is_some() {
        halt.store(true, Ordering::Relaxed);
        pump.abort();
    }
    // Stops the parser at its next dispatch if it is still running
    drop(rx);

    while let Some(joined) = writes.join_next().await {
        if let Err(e) = joined? {
            fatal.get_or_insert(e);
        }
    }

    let parsed = parse.await?;
    if let Some(e) = fatal {
        warn!("Stopping after failed write: {}", e);
        return Err(PipelineError::WriteFailed(e));
    }

    let stats = parsed?;
    info!(
        "Scanned {} pages: {} matched, {} unmapped, {} incomplete",
        stats.pages, stats.matched, stats.unmapped, stats.incomplete
    );
    Ok(stats)
}
