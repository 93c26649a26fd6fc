//! Append-only archive file writer.
//!
//! [`ArchiveWriter`] owns its file handle for the duration of one write
//! session: open, write records, [`finish`](ArchiveWriter::finish).
//! Dropping the writer closes the file, so handles never outlive a
//! failed write either.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::archive::{join, Group, Value};
use crate::codec::{encode_header, encode_record};
use crate::error::ArchiveError;

/// Writes archive records to a file.
///
/// # Examples
///
/// ```no_run
/// use shoal_output::{Archive, ArchiveWriter, Value};
///
/// let mut w = ArchiveWriter::create("/tmp/example.shoal").unwrap();
/// w.write("clock/iteration", &Value::U64(10)).unwrap();
/// w.finish().unwrap();
///
/// let mut w = ArchiveWriter::append("/tmp/example.shoal").unwrap();
/// w.write("clock/iteration", &Value::U64(20)).unwrap();
/// w.finish().unwrap();
///
/// let archive = Archive::read_file("/tmp/example.shoal").unwrap();
/// assert_eq!(archive.root().u64("clock/iteration").unwrap(), 20);
/// ```
pub struct ArchiveWriter {
    out: CountingWriter<BufWriter<File>>,
    path: PathBuf,
}

impl ArchiveWriter {
    /// Create (or truncate) `path` and write the header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let mut writer = Self {
            out: CountingWriter::new(BufWriter::new(file)),
            path,
        };
        encode_header(&mut writer.out)?;
        Ok(writer)
    }

    /// Open an existing archive for appending records.
    pub fn append(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().append(true).open(&path)?;
        Ok(Self {
            out: CountingWriter::new(BufWriter::new(file)),
            path,
        })
    }

    /// Append one record.
    pub fn write(&mut self, path: &str, value: &Value) -> Result<(), ArchiveError> {
        encode_record(&mut self.out, path, value)
    }

    /// Append every value of `group` under `prefix` (empty for root).
    pub fn write_group(&mut self, prefix: &str, group: &Group) -> Result<(), ArchiveError> {
        for (path, value) in group.flatten() {
            self.write(&join(prefix, &path), value)?;
        }
        Ok(())
    }

    /// Bytes written through this writer so far (header included).
    pub fn bytes_written(&self) -> u64 {
        self.out.count
    }

    /// The file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and close the file. Returns the bytes written.
    pub fn finish(mut self) -> Result<u64, ArchiveError> {
        self.out.flush()?;
        let count = self.out.count;
        let file = self.out.inner.into_inner().map_err(|e| e.into_error())?;
        file.sync_data()?;
        Ok(count)
    }
}

struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{Archive, Array};

    #[test]
    fn append_supersedes_earlier_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.shoal");

        let mut w = ArchiveWriter::create(&path).unwrap();
        w.write("x", &Value::F64(1.0)).unwrap();
        w.write("keep", &Value::Str("yes".into())).unwrap();
        let first = w.finish().unwrap();
        assert_eq!(first, std::fs::metadata(&path).unwrap().len());

        let mut w = ArchiveWriter::append(&path).unwrap();
        w.write("x", &Value::F64(2.0)).unwrap();
        w.finish().unwrap();

        let archive = Archive::read_file(&path).unwrap();
        assert_eq!(archive.root().f64("x").unwrap(), 2.0);
        assert_eq!(archive.root().str("keep").unwrap(), "yes");
        assert_eq!(archive.records(), 3);
    }

    #[test]
    fn group_written_under_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.shoal");
        let mut group = Group::new();
        group.insert("a/b", Array::vector(vec![1.0, 2.0]));
        group.insert("c", 3u64);

        let mut w = ArchiveWriter::create(&path).unwrap();
        w.write_group("meta", &group).unwrap();
        w.finish().unwrap();

        let archive = Archive::read_file(&path).unwrap();
        assert_eq!(archive.array("meta/a/b").unwrap().data, [1.0, 2.0]);
        assert_eq!(archive.group("meta").unwrap(), &group);
    }

    #[test]
    fn append_to_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ArchiveWriter::append(dir.path().join("missing")),
            Err(ArchiveError::Io(_))
        ));
    }
}
