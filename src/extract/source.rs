//! Dump sources: local files or HTTP downloads, exposed as chunked byte streams
//!
//! Both dumps are consumed exactly once as a stream of compressed chunks. The
//! parsers themselves are synchronous (`std::io::Read`), so [`StreamReader`]
//! bridges the async chunk stream onto a blocking reader running inside
//! `spawn_blocking`.

use bytes::{Buf, Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use url::Url;

/// A stream of raw (still compressed) dump bytes
pub type ByteStream = BoxStream<'static, Result<Bytes, FetchError>>;

/// Default read size for local files (1MB, same as the download chunking)
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Number of chunks buffered between the download task and the parser
const BRIDGE_DEPTH: usize = 8;

/// Errors raised while opening or reading a dump source
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to open {location}: {source}")]
    Open {
        location: String,
        #[source]
        source: io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("read error: {0}")]
    Read(#[source] io::Error),
}

/// Where a dump lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DumpLocation {
    /// Local file
    Path(PathBuf),
    /// Remote file fetched over HTTP(S)
    Url(Url),
}

impl DumpLocation {
    /// File name portion, used for compression detection
    pub fn file_name(&self) -> &str {
        match self {
            DumpLocation::Path(path) => path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            DumpLocation::Url(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .unwrap_or(""),
        }
    }
}

impl FromStr for DumpLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("dump location must not be empty".to_string());
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            Url::parse(s)
                .map(DumpLocation::Url)
                .map_err(|e| format!("invalid URL '{}': {}", s, e))
        } else {
            Ok(DumpLocation::Path(PathBuf::from(s)))
        }
    }
}

impl TryFrom<String> for DumpLocation {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DumpLocation> for String {
    fn from(location: DumpLocation) -> Self {
        location.to_string()
    }
}

impl fmt::Display for DumpLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpLocation::Path(path) => write!(f, "{}", path.display()),
            DumpLocation::Url(url) => write!(f, "{}", url),
        }
    }
}

/// Compression applied to a dump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Gzip,
    Bzip2,
    None,
}

impl Compression {
    /// Detect compression from a file name
    pub fn detect(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.ends_with(".gz") {
            Compression::Gzip
        } else if name.ends_with(".bz2") {
            Compression::Bzip2
        } else {
            Compression::None
        }
    }
}

/// Opens dump locations as byte streams
#[derive(Debug, Clone)]
pub struct SourceOpener {
    client: reqwest::Client,
    chunk_size: usize,
}

impl SourceOpener {
    /// Create an opener with its own HTTP client.
    ///
    /// `connect_timeout` bounds connection setup only; dump downloads run for
    /// as long as the body keeps streaming.
    pub fn new(user_agent: &str, connect_timeout: Duration, chunk_size: usize) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            client,
            chunk_size: chunk_size.max(1),
        })
    }

    /// Open a location. Fails if the file is missing or the server answers
    /// with a non-success status.
    pub async fn open(&self, location: &DumpLocation) -> Result<ByteStream, FetchError> {
        match location {
            DumpLocation::Path(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|source| FetchError::Open {
                        location: path.display().to_string(),
                        source,
                    })?;
                Ok(file_stream(file, self.chunk_size))
            }
            DumpLocation::Url(url) => {
                let response = self.client.get(url.clone()).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }
                tracing::debug!(
                    "Opened {} (content-length: {:?})",
                    url,
                    response.content_length()
                );
                Ok(response
                    .bytes_stream()
                    .map(|chunk| chunk.map_err(FetchError::from))
                    .boxed())
            }
        }
    }
}

fn file_stream(file: tokio::fs::File, chunk_size: usize) -> ByteStream {
    stream::try_unfold(file, move |mut file| async move {
        let mut buf = BytesMut::with_capacity(chunk_size);
        let n = match file.read_buf(&mut buf).await {
            Ok(n) => n,
            Err(e) => return Err(FetchError::Read(e)),
        };
        if n == 0 {
            Ok(None)
        } else {
            Ok(Some((buf.freeze(), file)))
        }
    })
    .boxed()
}

/// Blocking reader over a [`ByteStream`].
///
/// A pump task forwards chunks through a bounded channel, so at most a few
/// chunks are buffered ahead of the parser. Dropping the reader stops the pump
/// and with it the download. Stream errors surface as `io::Error`s wrapping the
/// original [`FetchError`].
///
/// `read` blocks the calling thread: use it only from `spawn_blocking` or a
/// plain thread, never from async code.
pub struct StreamReader {
    rx: mpsc::Receiver<Result<Bytes, FetchError>>,
    current: Bytes,
}

impl StreamReader {
    /// Spawn the pump task on the current runtime
    pub fn spawn(stream: ByteStream) -> Self {
        Self::spawn_abortable(stream).0
    }

    /// Like [`StreamReader::spawn`], also returning a handle that stops the
    /// pump. Once aborted, `read` reports end of input.
    pub fn spawn_abortable(mut stream: ByteStream) -> (Self, AbortHandle) {
        let (tx, rx) = mpsc::channel(BRIDGE_DEPTH);

        let pump = tokio::spawn(async move {
            while let Some(chunk) = stream.next().await {
                let failed = chunk.is_err();
                if tx.send(chunk).await.is_err() || failed {
                    break;
                }
            }
        });

        let reader = Self {
            rx,
            current: Bytes::new(),
        };
        (reader, pump.abort_handle())
    }
}

impl Read for StreamReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while self.current.is_empty() {
            match self.rx.blocking_recv() {
                Some(Ok(chunk)) => self.current = chunk,
                Some(Err(e)) => return Err(io::Error::new(io::ErrorKind::Other, e)),
                None => return Ok(0),
            }
        }

        let n = buf.len().min(self.current.len());
        buf[..n].copy_from_slice(&self.current[..n]);
        self.current.advance(n);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_location_parsing() {
        let url: DumpLocation = "https://dumps.wikimedia.org/enwikivoyage/latest/x.xml.bz2"
            .parse()
            .unwrap();
        assert!(matches!(url, DumpLocation::Url(_)));
        assert_eq!(url.file_name(), "x.xml.bz2");

        let path: DumpLocation = "/tmp/page_props.sql.gz".parse().unwrap();
        assert_eq!(path, DumpLocation::Path(PathBuf::from("/tmp/page_props.sql.gz")));
        assert_eq!(path.file_name(), "page_props.sql.gz");

        assert!("".parse::<DumpLocation>().is_err());
    }

    #[test]
    fn test_compression_detection() {
        assert_eq!(Compression::detect("enwikivoyage-latest-page_props.sql.gz"), Compression::Gzip);
        assert_eq!(
            Compression::detect("enwikivoyage-latest-pages-articles.xml.bz2"),
            Compression::Bzip2
        );
        assert_eq!(Compression::detect("pages.xml"), Compression::None);
    }

    #[tokio::test]
    async fn test_stream_reader_reassembles_chunks() {
        let chunks: Vec<Result<Bytes, FetchError>> = vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::new()),
            Ok(Bytes::from_static(b"chunked ")),
            Ok(Bytes::from_static(b"world")),
        ];
        let reader = StreamReader::spawn(stream::iter(chunks).boxed());

        let text = tokio::task::spawn_blocking(move || {
            let mut reader = reader;
            let mut out = String::new();
            reader.read_to_string(&mut out).map(|_| out)
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(text, "hello chunked world");
    }

    #[tokio::test]
    async fn test_aborted_pump_ends_a_stalled_read() {
        let stalled: ByteStream = stream::once(async { Ok(Bytes::from_static(b"head")) })
            .chain(stream::pending())
            .boxed();
        let (reader, pump) = StreamReader::spawn_abortable(stalled);

        let read = tokio::task::spawn_blocking(move || {
            let mut reader = reader;
            let mut out = Vec::new();
            reader.read_to_end(&mut out).map(|_| out)
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        pump.abort();

        let out = tokio::time::timeout(Duration::from_secs(5), read)
            .await
            .expect("read still blocked after abort")
            .unwrap()
            .unwrap();
        assert_eq!(out, b"head");
    }

    #[tokio::test]
    async fn test_stream_reader_surfaces_fetch_errors() {
        let chunks: Vec<Result<Bytes, FetchError>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(FetchError::Status {
                url: "http://example.invalid/dump".to_string(),
                status: 503,
            }),
        ];
        let reader = StreamReader::spawn(stream::iter(chunks).boxed());

        let err = tokio::task::spawn_blocking(move || {
            let mut reader = reader;
            let mut out = Vec::new();
            reader.read_to_end(&mut out).unwrap_err()
        })
        .await
        .unwrap();

        let inner = err.into_inner().unwrap();
        assert!(inner.downcast::<FetchError>().is_ok());
    }

    #[tokio::test]
    async fn test_open_local_file_in_chunks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();

        let opener = SourceOpener::new("test", Duration::from_secs(5), 3).unwrap();
        let location = DumpLocation::Path(file.path().to_path_buf());
        let chunks: Vec<Bytes> = opener
            .open(&location)
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;

        assert_eq!(chunks.concat(), b"0123456789");
    }

    #[tokio::test]
    async fn test_open_missing_file_is_fetch_error() {
        let opener = SourceOpener::new("test", Duration::from_secs(5), 1024).unwrap();
        let location = DumpLocation::Path(PathBuf::from("/nonexistent/dump.xml.bz2"));
        match opener.open(&location).await {
            Err(FetchError::Open { location, .. }) => assert!(location.contains("dump.xml.bz2")),
            other => panic!("expected open error, got {:?}", other.map(|_| ())),
        }
    }
}
