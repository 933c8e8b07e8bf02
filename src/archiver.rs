//! Archive, restore and prune WAL segments
//!
//! This module provides the main entry point, [`Archiver`], which is a thin
//! orchestration layer over an [`ObjectStore`], the gzip codec and the atomic
//! file writer. Every call is a fresh, stateless operation against the store.

use crate::io::{compress_file, decompress, write_atomic};
use crate::naming::{compressed_name, retention_candidates};
use crate::store::ObjectStore;
use crate::{Error, Result};
use log::{debug, info, warn};
use std::path::Path;

/// How a downloaded object should be interpreted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Compression {
    /// Look for `name.gz` first, then the bare `name`
    #[default]
    Auto,
    /// Fetch `name` exactly as given and gunzip it
    Compressed,
    /// Fetch `name` exactly as given
    Plain,
}

/// Archiver over a remote object store
pub struct Archiver<S> {
    store: S,
}

impl<S: ObjectStore> Archiver<S> {
    pub fn new(store: S) -> Self {
        Archiver { store }
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Archive `src` under `name`
    ///
    /// With `compress` the file is gzipped into a private temporary file and
    /// stored as `name.gz`; otherwise it is stored as-is under `name`.
    pub fn upload(&self, src: impl AsRef<Path>, name: &str, compress: bool) -> Result<()> {
        let src = src.as_ref();

        if !compress {
            debug!("Uploading file {}...", name);
            return self.store.upload(src, name);
        }

        // Removed on drop, whichever way this function exits
        let temp = tempfile::Builder::new()
            .prefix("pg_raxarchive-")
            .suffix(".gz")
            .tempfile()?;

        debug!("Compressing file {}...", src.display());
        let size = compress_file(src, temp.path())?;

        let object = compressed_name(name);
        debug!("Uploading file {} ({} bytes uncompressed)...", object, size);
        self.store.upload(temp.path(), &object)?;

        // The object is stored; a leftover temp file must not fail the archive
        let temp_path = temp.path().to_path_buf();
        if let Err(e) = temp.close() {
            warn!("Could not remove {}: {}", temp_path.display(), e);
        }
        Ok(())
    }

    /// Restore the archive `name` into `dest`
    ///
    /// The destination is replaced atomically; on any failure it keeps its
    /// previous state.
    pub fn download(
        &self,
        name: &str,
        dest: impl AsRef<Path>,
        compression: Compression,
    ) -> Result<()> {
        let (object, compressed) = match compression {
            Compression::Auto => self.resolve(name)?,
            Compression::Compressed => (name.to_string(), true),
            Compression::Plain => (name.to_string(), false),
        };

        debug!("Fetching file {}...", object);
        let mut data = self.store.fetch(&object)?;

        if compressed {
            debug!("Decompressing...");
            data = decompress(&data)?;
        }

        let dest = dest.as_ref();
        debug!("Writing file {}...", dest.display());
        write_atomic(dest, data.as_slice())?;
        Ok(())
    }

    /// Find the stored representation of `name`, preferring the compressed one
    fn resolve(&self, name: &str) -> Result<(String, bool)> {
        let names = self.store.list_names()?;
        let gz = compressed_name(name);

        if names.contains(&gz) {
            Ok((gz, true))
        } else if names.contains(name) {
            Ok((name.to_string(), false))
        } else {
            Err(Error::NotFound(name.to_string()))
        }
    }

    /// Delete every archive that sorts strictly before `cutoff`
    ///
    /// Deletions are immediate. A failing delete stops the sweep and is
    /// returned; objects already removed stay removed.
    pub fn cleanup(&self, cutoff: &str) -> Result<()> {
        let names = self.store.list_names()?;
        let doomed = retention_candidates(&names, cutoff);
        info!(
            "Cleanup before {}: {} of {} objects to remove",
            cutoff,
            doomed.len(),
            names.len()
        );

        for object in &doomed {
            debug!("Removing file {}...", object);
            self.store.delete(object)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::fs;
    use tempfile::tempdir;

    fn archiver() -> (Archiver<MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        (Archiver::new(store.clone()), store)
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        crate::io::compress_stream(data, &mut out).unwrap();
        out
    }

    #[test]
    fn test_upload_compressed() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("000001");
        fs::write(&src, b"wal bytes").unwrap();
        let (archiver, store) = archiver();

        archiver.upload(&src, "000001", true).unwrap();

        assert!(store.contains("000001.gz"));
        assert!(!store.contains("000001"));
        assert_eq!(decompress(&store.get("000001.gz").unwrap()).unwrap(), b"wal bytes");
    }

    #[test]
    fn test_upload_uncompressed_creates_one_object() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("000001");
        fs::write(&src, b"wal bytes").unwrap();
        let (archiver, store) = archiver();

        archiver.upload(&src, "000001", false).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("000001").unwrap(), b"wal bytes");
    }

    #[test]
    fn test_upload_missing_source() {
        let dir = tempdir().unwrap();
        let (archiver, store) = archiver();

        let err = archiver
            .upload(dir.path().join("missing"), "000001", true)
            .unwrap_err();

        assert!(matches!(err, Error::Io(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_upload_removes_temp_file_on_success() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("000001");
        fs::write(&src, b"wal bytes").unwrap();
        let (archiver, store) = archiver();

        archiver.upload(&src, "000001", true).unwrap();

        let sources = store.upload_sources();
        assert_eq!(sources.len(), 1);
        assert_ne!(sources[0], src);
        assert!(!sources[0].exists());
    }

    #[test]
    fn test_upload_removes_temp_file_on_store_failure() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("000001");
        fs::write(&src, b"wal bytes").unwrap();
        let (archiver, store) = archiver();
        store.fail_upload_of("000001.gz");

        let err = archiver.upload(&src, "000001", true).unwrap_err();

        assert!(matches!(err, Error::Store(_)));
        let sources = store.upload_sources();
        assert_eq!(sources.len(), 1);
        assert!(!sources[0].exists());
        assert!(src.exists());
        assert!(store.is_empty());
    }

    /// Store that unlinks the local file once it has been uploaded
    struct ConsumingStore(MemoryStore);

    impl ObjectStore for ConsumingStore {
        fn list_names(&self) -> Result<std::collections::BTreeSet<String>> {
            self.0.list_names()
        }

        fn fetch(&self, name: &str) -> Result<Vec<u8>> {
            self.0.fetch(name)
        }

        fn upload(&self, local_path: &Path, name: &str) -> Result<()> {
            self.0.upload(local_path, name)?;
            fs::remove_file(local_path)?;
            Ok(())
        }

        fn delete(&self, name: &str) -> Result<()> {
            self.0.delete(name)
        }
    }

    #[test]
    fn test_upload_succeeds_when_temp_file_already_gone() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("000001");
        fs::write(&src, b"wal bytes").unwrap();
        let store = MemoryStore::new();
        let archiver = Archiver::new(ConsumingStore(store.clone()));

        archiver.upload(&src, "000001", true).unwrap();

        assert_eq!(decompress(&store.get("000001.gz").unwrap()).unwrap(), b"wal bytes");
    }

    #[test]
    fn test_download_auto_prefers_compressed() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("restored");
        let (archiver, store) = archiver();
        store.insert("000001.gz", gzip(b"compressed copy"));
        store.insert("000001", b"plain copy".to_vec());

        archiver.download("000001", &dest, Compression::Auto).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"compressed copy");
    }

    #[test]
    fn test_download_auto_plain() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("restored");
        let (archiver, store) = archiver();
        store.insert("000001", b"plain copy".to_vec());

        archiver.download("000001", &dest, Compression::Auto).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"plain copy");
    }

    #[test]
    fn test_download_not_found_names_bare() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("restored");
        let (archiver, _store) = archiver();

        match archiver.download("000009", &dest, Compression::Auto) {
            Err(Error::NotFound(name)) => assert_eq!(name, "000009"),
            other => panic!("expected not found, got {:?}", other),
        }
        assert!(!dest.exists());
    }

    #[test]
    fn test_download_explicit_names_are_used_verbatim() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("restored");
        let (archiver, store) = archiver();
        store.insert("000001.gz", gzip(b"data"));

        // Explicit mode never appends the marker
        let err = archiver
            .download("000001", &dest, Compression::Compressed)
            .unwrap_err();
        assert!(err.is_not_found());

        archiver
            .download("000001.gz", &dest, Compression::Compressed)
            .unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"data");

        archiver
            .download("000001.gz", &dest, Compression::Plain)
            .unwrap();
        assert_eq!(fs::read(&dest).unwrap(), gzip(b"data"));
    }

    #[test]
    fn test_download_corrupt_payload_keeps_destination() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("restored");
        fs::write(&dest, b"before").unwrap();
        let (archiver, store) = archiver();
        store.insert("000001.gz", b"not gzip at all".to_vec());

        let err = archiver
            .download("000001", &dest, Compression::Auto)
            .unwrap_err();

        assert!(matches!(err, Error::Decode(_)));
        assert_eq!(fs::read(&dest).unwrap(), b"before");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_cleanup_deletes_strictly_older() {
        let (archiver, store) = archiver();
        store.insert("000001", b"a".to_vec());
        store.insert("000002.gz", b"b".to_vec());
        store.insert("000003", b"c".to_vec());

        archiver.cleanup("000002").unwrap();

        assert!(!store.contains("000001"));
        assert!(store.contains("000002.gz"));
        assert!(store.contains("000003"));
    }

    #[test]
    fn test_cleanup_twice_is_noop() {
        let (archiver, store) = archiver();
        store.insert("000001.gz", b"a".to_vec());
        store.insert("000002.gz", b"b".to_vec());

        archiver.cleanup("000002").unwrap();
        archiver.cleanup("000002").unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.contains("000002.gz"));
    }

    #[test]
    fn test_cleanup_stops_on_failed_delete() {
        let (archiver, store) = archiver();
        store.insert("000001", b"a".to_vec());
        store.insert("000002", b"b".to_vec());
        store.insert("000003", b"c".to_vec());
        store.fail_delete_of("000002");

        let err = archiver.cleanup("000009").unwrap_err();

        assert!(matches!(err, Error::Store(_)));
        // Sweep runs in name order: 000001 went, 000002 refused, 000003 untouched
        assert!(!store.contains("000001"));
        assert!(store.contains("000002"));
        assert!(store.contains("000003"));
    }

    #[test]
    fn test_cleanup_bare_and_compressed_twins() {
        // Known collision: only the compressed twin is selected, the bare
        // object survives the sweep.
        let (archiver, store) = archiver();
        store.insert("000001", b"a".to_vec());
        store.insert("000001.gz", b"a".to_vec());

        archiver.cleanup("000002").unwrap();

        assert!(store.contains("000001"));
        assert!(!store.contains("000001.gz"));
    }
}
