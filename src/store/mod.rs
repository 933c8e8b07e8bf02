//! Remote object storage
//!
//! The archiver only needs four capabilities from a store: list names, fetch
//! an object, upload a local file, delete an object. [`ObjectStore`] captures
//! them; [`CloudFilesStore`] talks to Rackspace Cloud Files and
//! [`MemoryStore`] keeps everything in process.

mod cloudfiles;
mod credentials;
mod memory;

pub use cloudfiles::{CloudFilesStore, DEFAULT_IDENTITY_URL};
pub use credentials::Credentials;
pub use memory::MemoryStore;

use crate::Result;
use std::collections::BTreeSet;
use std::path::Path;

/// Capabilities the archiver requires from a remote container
///
/// `fetch` and `delete` return [`crate::Error::NotFound`] for a missing object.
pub trait ObjectStore {
    /// Snapshot of every object name in the container
    fn list_names(&self) -> Result<BTreeSet<String>>;

    /// Full body of an object
    fn fetch(&self, name: &str) -> Result<Vec<u8>>;

    /// Create or overwrite `name` with the contents of `local_path`
    fn upload(&self, local_path: &Path, name: &str) -> Result<()>;

    /// Remove an object
    fn delete(&self, name: &str) -> Result<()>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for &S {
    fn list_names(&self) -> Result<BTreeSet<String>> {
        (**self).list_names()
    }

    fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        (**self).fetch(name)
    }

    fn upload(&self, local_path: &Path, name: &str) -> Result<()> {
        (**self).upload(local_path, name)
    }

    fn delete(&self, name: &str) -> Result<()> {
        (**self).delete(name)
    }
}
