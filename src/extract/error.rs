//! Error taxonomy for an extraction run
//!
//! `FetchError` and `DecodeError` are always fatal. `WriteError`s are handled
//! per artifact by the output handlers and only reach this level as
//! [`PipelineError::WriteFailed`] when a handler is configured fail-fast.

use super::source::FetchError;
use crate::output::WriteError;
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Corruption in a dump stream
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("decompression error: {0}")]
    Decompression(String),

    #[error("XML parse error at byte {position}: {message}")]
    Xml { position: u64, message: String },
}

/// Fatal errors that abort a run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("write failed: {0}")]
    WriteFailed(#[from] WriteError),

    #[error("run cancelled")]
    Cancelled,

    #[error("write dispatch closed")]
    DispatchClosed,

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PipelineError {
    /// Classify an I/O error coming out of a decoder stack.
    ///
    /// Errors raised by the underlying [`StreamReader`](super::source::StreamReader)
    /// carry a `FetchError` and stay fetch errors; anything else was produced
    /// by the decompressor.
    pub fn from_read(err: io::Error) -> Self {
        let message = err.to_string();
        match err.into_inner() {
            Some(inner) => match inner.downcast::<FetchError>() {
                Ok(fetch) => PipelineError::Fetch(*fetch),
                Err(_) => DecodeError::Decompression(message).into(),
            },
            None => DecodeError::Decompression(message).into(),
        }
    }

    /// Classify a quick-xml error raised at `position` in the decompressed stream
    pub fn from_xml(err: quick_xml::Error, position: u64) -> Self {
        match err {
            quick_xml::Error::Io(shared) => match Arc::try_unwrap(shared) {
                Ok(io_err) => Self::from_read(io_err),
                Err(shared) => {
                    let from_source = shared
                        .get_ref()
                        .map(|inner| inner.is::<FetchError>())
                        .unwrap_or(false);
                    let copy = io::Error::new(shared.kind(), shared.to_string());
                    if from_source {
                        FetchError::Read(copy).into()
                    } else {
                        DecodeError::Decompression(copy.to_string()).into()
                    }
                }
            },
            other => DecodeError::Xml {
                position,
                message: other.to_string(),
            }
            .into(),
        }
    }

    /// Whether the error was caused by the source or the data itself
    pub fn is_input_error(&self) -> bool {
        matches!(self, PipelineError::Fetch(_) | PipelineError::Decode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_keeps_fetch_classification() {
        let fetch = FetchError::Status {
            url: "http://example.invalid".to_string(),
            status: 404,
        };
        let err = PipelineError::from_read(io::Error::new(io::ErrorKind::Other, fetch));
        assert!(matches!(err, PipelineError::Fetch(FetchError::Status { status: 404, .. })));
    }

    #[test]
    fn test_plain_io_error_is_decode_error() {
        let err = PipelineError::from_read(io::Error::new(
            io::ErrorKind::InvalidData,
            "corrupt deflate stream",
        ));
        match err {
            PipelineError::Decode(DecodeError::Decompression(msg)) => {
                assert!(msg.contains("corrupt deflate stream"))
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(PipelineError::Cancelled.to_string().contains("cancelled"));
    }
}
