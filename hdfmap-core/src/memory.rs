//! In-memory hierarchy.
//!
//! [`MemoryFile`] implements [`Hierarchy`] over a tree of groups, datasets
//! and soft links held in memory. It backs the JSON snapshot format in
//! `hdfmap-io` and is the fixture builder used throughout the tests.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::address::{build_address, SEP};
use crate::error::{Error, Result};
use crate::hierarchy::{Child, DatasetInfo, Hierarchy, LinkKind, Node};
use crate::value::{AttrValue, Attributes, Selection, Value};

const MAX_LINK_DEPTH: usize = 16;

/// A dataset held in memory.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MemoryDataset {
    pub value: Value,
    #[cfg_attr(feature = "serde", serde(default))]
    pub attrs: Attributes,
}

impl MemoryDataset {
    /// Set an attribute.
    pub fn attr(&mut self, name: &str, value: impl Into<AttrValue>) -> &mut Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }
}

/// A group held in memory.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MemoryGroup {
    #[cfg_attr(feature = "serde", serde(default))]
    pub attrs: Attributes,
    #[cfg_attr(feature = "serde", serde(default))]
    pub members: IndexMap<String, MemoryNode>,
    /// Simulates an object whose attributes cannot be read.
    #[cfg_attr(feature = "serde", serde(default))]
    pub unreadable_attrs: bool,
}

impl MemoryGroup {
    /// Set an attribute.
    pub fn attr(&mut self, name: &str, value: impl Into<AttrValue>) -> &mut Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    /// Mark the attributes of this group as unreadable.
    pub fn unreadable(&mut self) -> &mut Self {
        self.unreadable_attrs = true;
        self
    }
}

/// A member of an in-memory group.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MemoryNode {
    Group(MemoryGroup),
    Dataset(MemoryDataset),
    /// Soft link holding the absolute address of its target.
    SoftLink(String),
}

/// An in-memory hierarchical file.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MemoryFile {
    #[cfg_attr(feature = "serde", serde(default))]
    path: Option<PathBuf>,
    #[cfg_attr(feature = "serde", serde(default))]
    root: MemoryGroup,
}

#[derive(Clone, Copy)]
enum Found<'a> {
    Group(&'a MemoryGroup),
    Dataset(&'a MemoryDataset),
    Broken,
}

impl MemoryFile {
    /// Create an empty file with no path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the path reported by [`Hierarchy::file_path`].
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the path reported by [`Hierarchy::file_path`].
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    /// The root group.
    pub fn root(&mut self) -> &mut MemoryGroup {
        &mut self.root
    }

    /// Get or create the group at `address`, creating missing parents.
    ///
    /// An existing dataset or link on the way is replaced by a group.
    pub fn group(&mut self, address: &str) -> &mut MemoryGroup {
        let mut group = &mut self.root;
        for segment in address.split(SEP).filter(|s| !s.is_empty()) {
            let node = group
                .members
                .entry(segment.to_string())
                .or_insert_with(|| MemoryNode::Group(MemoryGroup::default()));
            if !matches!(node, MemoryNode::Group(_)) {
                *node = MemoryNode::Group(MemoryGroup::default());
            }
            group = match node {
                MemoryNode::Group(g) => g,
                _ => unreachable!("member was just replaced by a group"),
            };
        }
        group
    }

    /// Create or replace the dataset at `address`, creating missing parents.
    pub fn dataset(&mut self, address: &str, value: impl Into<Value>) -> &mut MemoryDataset {
        let (parent, key) = split_last(address);
        let group = self.group(parent);
        let dataset = MemoryDataset {
            value: value.into(),
            attrs: Attributes::new(),
        };
        group
            .members
            .insert(key.to_string(), MemoryNode::Dataset(dataset));
        match group.members.get_mut(key) {
            Some(MemoryNode::Dataset(d)) => d,
            _ => unreachable!("member was just replaced by a dataset"),
        }
    }

    /// Create a soft link at `address` pointing to `target`.
    pub fn soft_link(&mut self, address: &str, target: &str) {
        let (parent, key) = split_last(address);
        self.group(parent)
            .members
            .insert(key.to_string(), MemoryNode::SoftLink(build_address([target])));
    }

    fn resolve(&self, address: &str, depth: usize) -> Option<Found<'_>> {
        if depth > MAX_LINK_DEPTH {
            return Some(Found::Broken);
        }
        let segments: Vec<&str> = address.split(SEP).filter(|s| !s.is_empty()).collect();
        let mut current = Found::Group(&self.root);
        for (n, segment) in segments.iter().enumerate() {
            let Found::Group(group) = current else {
                return None;
            };
            current = match group.members.get(*segment)? {
                MemoryNode::Group(g) => Found::Group(g),
                MemoryNode::Dataset(d) => Found::Dataset(d),
                MemoryNode::SoftLink(target) => {
                    self.resolve(target, depth + 1).unwrap_or(Found::Broken)
                }
            };
            if matches!(current, Found::Broken) && n + 1 < segments.len() {
                return None;
            }
        }
        Some(current)
    }
}

fn split_last(address: &str) -> (&str, &str) {
    let trimmed = address.trim_matches(SEP);
    match trimmed.rfind(SEP) {
        Some(idx) => (&trimmed[..idx], &trimmed[idx + 1..]),
        None => ("", trimmed),
    }
}

impl Hierarchy for MemoryFile {
    fn file_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn children(&self, address: &str) -> Vec<Child> {
        match self.resolve(address, 0) {
            Some(Found::Group(group)) => group
                .members
                .iter()
                .map(|(name, node)| Child {
                    name: name.clone(),
                    link: match node {
                        MemoryNode::SoftLink(_) => LinkKind::Soft,
                        _ => LinkKind::Hard,
                    },
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn node(&self, address: &str) -> Option<Node> {
        self.resolve(address, 0).map(|found| match found {
            Found::Group(_) => Node::Group,
            Found::Dataset(d) => Node::Dataset(DatasetInfo {
                shape: d.value.shape().to_vec(),
                dtype: d.value.dtype(),
            }),
            Found::Broken => Node::UnresolvedLink,
        })
    }

    fn attrs(&self, address: &str) -> Result<Attributes> {
        match self.resolve(address, 0) {
            Some(Found::Group(group)) if group.unreadable_attrs => Err(Error::read(
                address,
                "attributes of this object cannot be read",
            )),
            Some(Found::Group(group)) => Ok(group.attrs.clone()),
            Some(Found::Dataset(dataset)) => Ok(dataset.attrs.clone()),
            _ => Err(Error::NotFound(address.to_string())),
        }
    }

    fn read(&self, address: &str, selection: &Selection) -> Result<Value> {
        match self.resolve(address, 0) {
            Some(Found::Dataset(dataset)) => dataset.value.select(selection),
            _ => Err(Error::NotFound(address.to_string())),
        }
    }
}
