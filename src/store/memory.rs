//! In-process object store

use super::ObjectStore;
use crate::{Error, Result};
use parking_lot::{Mutex, MutexGuard};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    objects: BTreeMap<String, Vec<u8>>,
    failing_uploads: HashSet<String>,
    failing_deletes: HashSet<String>,
    /// Local paths passed to `upload`, in call order
    upload_sources: Vec<PathBuf>,
}

/// An object store held entirely in memory
///
/// Clones share the same objects, so a handle kept by a test observes every
/// change made through a handle given to an [`crate::Archiver`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under `name` directly
    pub fn insert(&self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.lock().objects.insert(name.into(), data.into());
    }

    /// Copy of an object's body, if present
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.lock().objects.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().objects.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every later `upload(_, name)` fail with a store error
    pub fn fail_upload_of(&self, name: impl Into<String>) {
        self.lock().failing_uploads.insert(name.into());
    }

    /// Make every later `delete(name)` fail with a store error
    pub fn fail_delete_of(&self, name: impl Into<String>) {
        self.lock().failing_deletes.insert(name.into());
    }

    /// Local paths handed to `upload` so far, including rejected ones
    pub fn upload_sources(&self) -> Vec<PathBuf> {
        self.lock().upload_sources.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock()
    }
}

impl ObjectStore for MemoryStore {
    fn list_names(&self) -> Result<BTreeSet<String>> {
        Ok(self.lock().objects.keys().cloned().collect())
    }

    fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        self.get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    fn upload(&self, local_path: &Path, name: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.upload_sources.push(local_path.to_path_buf());
        if inner.failing_uploads.contains(name) {
            return Err(Error::Store(format!("Upload of {} rejected", name)));
        }
        let data = std::fs::read(local_path)?;
        inner.objects.insert(name.to_string(), data);
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        let mut inner = self.lock();
        if inner.failing_deletes.contains(name) {
            return Err(Error::Store(format!("Delete of {} rejected", name)));
        }
        inner
            .objects
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }
}
