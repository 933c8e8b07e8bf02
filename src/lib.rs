//! # pg_raxarchive
//!
//! PostgreSQL WAL archiving on Rackspace Cloud Files.
//!
//! Segments are gzipped and uploaded by `archive_command`, fetched back by
//! `restore_command`, and pruned below a retention cutoff by
//! `archive_cleanup_command`.
//!
//! ## Core Concepts
//!
//! - **Archive name**: the logical name of one segment (its WAL filename)
//! - **Compression marker**: the `.gz` suffix on a compressed object
//! - **Normalized name**: a name truncated at its first `.`, used to order
//!   objects against a cleanup cutoff
//!
//! ## Example
//!
//! ```ignore
//! use pg_raxarchive::{Archiver, ArchiverConfig, CloudFilesStore, Compression};
//!
//! let store = CloudFilesStore::connect(&ArchiverConfig::default())?;
//! let archiver = Archiver::new(store);
//! archiver.upload("pg_wal/000000010000000000000001", "000000010000000000000001", true)?;
//! archiver.download("000000010000000000000001", "/tmp/restored", Compression::Auto)?;
//! archiver.cleanup("000000010000000000000001")?;
//! ```

pub mod config;
pub mod io;
pub mod naming;
pub mod store;

mod archiver;
mod error;

pub use archiver::{Archiver, Compression};
pub use config::ArchiverConfig;
pub use error::{Error, Result};
pub use naming::COMPRESSION_MARKER;
pub use store::{CloudFilesStore, Credentials, MemoryStore, ObjectStore};
