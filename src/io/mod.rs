//! Local file handling
//!
//! Atomic destination writes and gzip streaming used by the archiver.

mod atomic;
mod gzip;

pub use atomic::{write_atomic, AtomicFileWriter};
pub use gzip::{compress_file, compress_stream, decompress, CHUNK_SIZE};
