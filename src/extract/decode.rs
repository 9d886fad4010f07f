//! Decompression layers for dump streams

use super::source::Compression;
use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use std::io::Read;

/// Wrap a raw reader in the decompressor matching `compression`.
///
/// The multi-member decoders are used because Wikimedia dumps are sometimes
/// concatenations of several compressed streams.
pub fn decompress<R>(reader: R, compression: Compression) -> Box<dyn Read + Send>
where
    R: Read + Send + 'static,
{
    match compression {
        Compression::Gzip => Box::new(MultiGzDecoder::new(reader)),
        Compression::Bzip2 => Box::new(MultiBzDecoder::new(reader)),
        Compression::None => Box::new(reader),
    }
}
