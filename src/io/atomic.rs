//! Atomic file replacement
//!
//! Bytes are written to a hidden sibling `.tmp-<name>` and renamed onto the
//! destination only after every write succeeded. The sibling lives in the same
//! directory so the rename never crosses filesystems. Concurrent writers to the
//! same destination are not supported.

use crate::Result;
use log::debug;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

const TEMP_PREFIX: &str = ".tmp-";

/// Writer that publishes its contents under `dest` only on [`commit`]
///
/// Dropping the writer without committing removes the temporary file and
/// leaves `dest` as it was.
///
/// [`commit`]: AtomicFileWriter::commit
pub struct AtomicFileWriter {
    dest: PathBuf,
    temp: PathBuf,
    file: Option<File>,
    committed: bool,
}

impl AtomicFileWriter {
    /// Create the temporary sibling for `dest`, truncating any leftover
    pub fn create(dest: impl AsRef<Path>) -> Result<Self> {
        let dest = dest.as_ref().to_path_buf();
        let temp = temp_path(&dest)?;
        let file = File::create(&temp)?;
        Ok(AtomicFileWriter {
            dest,
            temp,
            file: Some(file),
            committed: false,
        })
    }

    /// Path of the temporary sibling
    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    /// Flush, fsync and rename the temporary file onto the destination
    pub fn commit(mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
            file.sync_all()?;
        }
        fs::rename(&self.temp, &self.dest)?;
        self.committed = true;
        debug!("Renamed {} to {}", self.temp.display(), self.dest.display());
        Ok(())
    }

    fn file(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "writer already committed"))
    }
}

impl Write for AtomicFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file()?.flush()
    }
}

impl Drop for AtomicFileWriter {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        // Close before unlinking
        drop(self.file.take());
        if let Err(e) = fs::remove_file(&self.temp) {
            debug!("Could not remove {}: {}", self.temp.display(), e);
        }
    }
}

/// Stream `source` into `dest` atomically, returning the byte count
pub fn write_atomic<R: Read>(dest: impl AsRef<Path>, mut source: R) -> Result<u64> {
    let mut writer = AtomicFileWriter::create(dest)?;
    let written = io::copy(&mut source, &mut writer)?;
    writer.commit()?;
    Ok(written)
}

fn temp_path(dest: &Path) -> Result<PathBuf> {
    let name = dest
        .file_name()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Not a file path: {}", dest.display()),
            )
        })?;
    let mut temp_name = std::ffi::OsString::from(TEMP_PREFIX);
    temp_name.push(name);
    Ok(dest.with_file_name(temp_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use tempfile::tempdir;

    /// Yields `good` bytes, then fails
    struct FailingReader {
        good: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.good == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "interrupted"));
            }
            let n = self.good.min(buf.len());
            buf[..n].fill(b'x');
            self.good -= n;
            Ok(n)
        }
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let path = temp_path(Path::new("/var/lib/pg/000001")).unwrap();
        assert_eq!(path, Path::new("/var/lib/pg/.tmp-000001"));
    }

    #[test]
    fn test_write_atomic_creates_file() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("000001");

        let written = write_atomic(&dest, &b"segment bytes"[..]).unwrap();

        assert_eq!(written, 13);
        assert_eq!(fs::read(&dest).unwrap(), b"segment bytes");
        assert_eq!(dir_entries(dir.path()), vec!["000001"]);
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("000001");
        fs::write(&dest, b"old").unwrap();

        write_atomic(&dest, &b"new contents"[..]).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"new contents");
    }

    #[test]
    fn test_failed_write_leaves_no_destination() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("000001");

        let result = write_atomic(&dest, FailingReader { good: 64 * 1024 });

        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn test_failed_write_preserves_previous_contents() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("000001");
        fs::write(&dest, b"previous").unwrap();

        let result = write_atomic(&dest, FailingReader { good: 10 });

        assert!(result.is_err());
        assert_eq!(fs::read(&dest).unwrap(), b"previous");
        assert_eq!(dir_entries(dir.path()), vec!["000001"]);
    }

    #[test]
    fn test_drop_without_commit_discards() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("000001");

        {
            let mut writer = AtomicFileWriter::create(&dest).unwrap();
            writer.write_all(b"partial").unwrap();
            assert!(writer.temp_path().exists());
            assert!(!dest.exists());
        }

        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("missing").join("000001");

        let err = write_atomic(&dest, &b"data"[..]).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_destination_without_file_name() {
        for dest in ["/", ".."] {
            match write_atomic(dest, &b"data"[..]) {
                Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::InvalidInput),
                other => panic!("expected invalid input for {}, got {:?}", dest, other),
            }
        }
    }
}
