//! JSON snapshots of hierarchical files.
//!
//! A snapshot is a serialized [`MemoryFile`]: groups, datasets, attributes
//! and soft links. It needs no native library, which makes it the format of
//! choice for fixtures and for exchanging small files.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use hdfmap_core::hierarchy::{Child, Node};
use hdfmap_core::{Attributes, Hierarchy, MemoryFile, Selection, Value};

use crate::Result;

/// A hierarchical file loaded from a JSON snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonFile {
    inner: MemoryFile,
}

impl JsonFile {
    /// Load a snapshot. The file path reported by the hierarchy is `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid snapshot.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut inner: MemoryFile = serde_json::from_reader(reader)?;
        inner.set_path(path);
        Ok(Self { inner })
    }

    /// Wrap an in-memory file.
    #[must_use]
    pub fn from_memory(inner: MemoryFile) -> Self {
        Self { inner }
    }

    /// Write `file` as a snapshot at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn save<P: AsRef<Path>>(file: &MemoryFile, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, file)?;
        Ok(())
    }

    /// The underlying in-memory file.
    #[must_use]
    pub fn as_memory(&self) -> &MemoryFile {
        &self.inner
    }

    #[must_use]
    pub fn into_memory(self) -> MemoryFile {
        self.inner
    }
}

impl Hierarchy for JsonFile {
    fn file_path(&self) -> Option<&Path> {
        self.inner.file_path()
    }

    fn children(&self, address: &str) -> Vec<Child> {
        self.inner.children(address)
    }

    fn node(&self, address: &str) -> Option<Node> {
        self.inner.node(address)
    }

    fn attrs(&self, address: &str) -> hdfmap_core::Result<Attributes> {
        self.inner.attrs(address)
    }

    fn read(&self, address: &str, selection: &Selection) -> hdfmap_core::Result<Value> {
        self.inner.read(address, selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdfmap_core::AttrValue;
    use tempfile::NamedTempFile;

    #[test]
    fn test_snapshot_roundtrip() {
        let mut file = MemoryFile::new();
        file.group("/entry").attr("NX_class", "NXentry");
        file.dataset("/entry/x", vec![1.0, 2.0, 3.0])
            .attr("units", "mm");
        file.dataset("/entry/count", 7_i64);
        file.soft_link("/entry/link", "/entry/x");

        let tmp = NamedTempFile::new().unwrap();
        JsonFile::save(&file, tmp.path()).unwrap();
        let loaded = JsonFile::open(tmp.path()).unwrap();

        assert_eq!(loaded.file_path(), Some(tmp.path()));
        assert_eq!(
            loaded.attrs("/entry").unwrap().get("NX_class"),
            Some(&AttrValue::String("NXentry".into()))
        );
        assert_eq!(
            loaded.read("/entry/x", &Selection::Index(1)).unwrap(),
            Value::float(2.0)
        );
        assert_eq!(loaded.read("/entry/count", &Selection::All).unwrap(), Value::int(7));
        assert!(loaded.contains("/entry/link"));
    }

    #[test]
    fn test_invalid_snapshot() {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "not json").unwrap();
        assert!(matches!(JsonFile::open(tmp.path()), Err(crate::Error::Json(_))));
    }
}
