//! Hierarchical file collaborator.
//!
//! [`Hierarchy`] is the seam between the map and whatever library actually
//! opens files. Implementations resolve absolute addresses, enumerate group
//! members, expose attributes and read (sliced) dataset content. The map
//! never keeps a handle: every operation that touches data receives one.

use std::path::Path;

use indexmap::IndexMap;

use crate::error::Result;
use crate::value::{Attributes, DType, Selection, Value};

/// How a group member is linked to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkKind {
    #[default]
    Hard,
    Soft,
    External,
}

/// One member of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Child {
    /// Local key of the member inside its group.
    pub name: String,
    /// Link type of the member.
    pub link: LinkKind,
}

impl Child {
    /// A hard-linked member.
    pub fn hard(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link: LinkKind::Hard,
        }
    }
}

/// Shape and element kind of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetInfo {
    pub shape: Vec<usize>,
    pub dtype: DType,
}

impl DatasetInfo {
    /// Total number of elements.
    #[must_use]
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    /// Number of dimensions.
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }
}

/// Kind of object found at an address, resolved once by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Group,
    Dataset(DatasetInfo),
    /// A soft or external link whose target does not exist.
    UnresolvedLink,
}

/// Read access to an open hierarchical file.
pub trait Hierarchy {
    /// Path of the underlying file, if it has one.
    fn file_path(&self) -> Option<&Path>;

    /// Members of the group at `address`, in stable order. Empty if the
    /// address is not a group.
    fn children(&self, address: &str) -> Vec<Child>;

    /// Resolve the object at `address`. `None` if nothing is linked there.
    fn node(&self, address: &str) -> Option<Node>;

    /// Attributes of the object at `address`.
    ///
    /// # Errors
    /// Returns an error if the object exists but its attributes cannot be read.
    fn attrs(&self, address: &str) -> Result<Attributes>;

    /// Read the dataset at `address`.
    ///
    /// # Errors
    /// Returns an error if the address is not a readable dataset or the
    /// selection does not fit it.
    fn read(&self, address: &str, selection: &Selection) -> Result<Value>;

    /// True if `address` resolves to a group or dataset.
    fn contains(&self, address: &str) -> bool {
        matches!(self.node(address), Some(Node::Group | Node::Dataset(_)))
    }

    /// Dataset info at `address`, if it is a dataset.
    fn dataset_info(&self, address: &str) -> Option<DatasetInfo> {
        match self.node(address) {
            Some(Node::Dataset(info)) => Some(info),
            _ => None,
        }
    }

    /// Contextual values derived from the file rather than its contents.
    fn extra_context(&self) -> IndexMap<String, Value> {
        let (filepath, filename) = match self.file_path() {
            Some(path) => (
                path.display().to_string(),
                path.file_name()
                    .map_or_else(String::new, |n| n.to_string_lossy().into_owned()),
            ),
            None => ("unknown".to_string(), "unknown".to_string()),
        };
        let mut extra = IndexMap::new();
        extra.insert("filepath".to_string(), Value::text(filepath));
        extra.insert("filename".to_string(), Value::text(filename));
        extra
    }
}
