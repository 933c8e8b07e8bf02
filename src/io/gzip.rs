//! Gzip compression of archive payloads
//!
//! Compression streams the source in bounded chunks. Decompression works on a
//! fully fetched payload, so the whole object is held in memory.

use crate::{Error, Result};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

/// Size of each read from the source while compressing
pub const CHUNK_SIZE: usize = 1 << 20;

/// Gzip everything from `source` into `sink`, returning the input byte count
///
/// The gzip trailer is written only once `source` is exhausted.
pub fn compress_stream<R: Read, W: Write>(mut source: R, sink: W) -> Result<u64> {
    let mut encoder = GzEncoder::new(sink, Compression::default());
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        encoder.write_all(&buf[..n])?;
        total += n as u64;
    }

    let mut sink = encoder.finish()?;
    sink.flush()?;
    Ok(total)
}

/// Gzip the file at `src` into a new file at `dst`
pub fn compress_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<u64> {
    let input = File::open(src)?;
    let output = File::create(dst)?;
    compress_stream(input, BufWriter::new(output))
}

/// Decode a complete gzip payload
///
/// Concatenated members are decoded in turn. Nothing is returned unless every
/// member, trailer included, is valid.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = MultiGzDecoder::new(data);
    let mut out = Vec::with_capacity(data.len());
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Decode(e.to_string()))?;
    Ok(out)
}
