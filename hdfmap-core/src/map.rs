//! The index model and the traversal that populates it.
//!
//! An [`HdfMap`] records every group and dataset of a file by address and
//! sorts datasets into name-keyed namespaces by dimensionality:
//!
//! - `values`: scalar datasets
//! - `arrays`: datasets with one or more dimensions
//! - `image_data`: datasets with three or more dimensions (also in `arrays`)
//! - `scannables`: arrays sharing the scan length, derived after traversal
//! - `combined`: `values`, then `arrays`, then `scannables`, later entries
//!   winning on shared names
//!
//! The map holds no file handle. It is built once and reused against any
//! file sharing the same layout.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::address::{child_address, name_from_address, parent_name, ROOT};
use crate::config::MapConfig;
use crate::hierarchy::{DatasetInfo, Hierarchy, LinkKind, Node};
use crate::value::{AttrValue, Attributes, DType};

/// Class tag of groups without a class attribute.
pub const DEFAULT_CLASS: &str = "Group";

/// Class tag of groups whose attributes cannot be read.
pub const NO_CLASS: &str = "NoClass";

/// Soft-linked groups entered along one branch before the walk stops.
const MAX_LINK_DEPTH: usize = 8;

/// Name to address lookup.
pub type Namespace = IndexMap<String, String>;

/// A group found during traversal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroupRecord {
    /// Class tag.
    pub class: String,
    pub name: String,
    pub attrs: Attributes,
    /// Keys of the datasets directly inside the group.
    pub datasets: Vec<String>,
}

/// A dataset found during traversal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DatasetRecord {
    pub name: String,
    pub size: usize,
    pub shape: Vec<usize>,
    pub dtype: DType,
    pub attrs: Attributes,
}

impl DatasetRecord {
    /// Number of dimensions.
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }
}

/// One traversal pass: read members under `source`, record them under
/// `target`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Pass<'a> {
    pub source: &'a str,
    pub target: &'a str,
    pub recursive: bool,
    /// Only descend into groups whose key or class tag is listed. Applies to
    /// the first level of the pass only.
    pub groups: Option<&'a [String]>,
    /// Record soft-linked datasets too.
    pub include_soft: bool,
    /// Soft-linked groups entered so far on this branch.
    pub link_depth: usize,
}

/// Address index and namespaces of a hierarchical file.
#[derive(Debug, Clone, Default)]
pub struct HdfMap {
    pub(crate) config: MapConfig,
    pub(crate) filename: Option<PathBuf>,
    pub(crate) groups: IndexMap<String, GroupRecord>,
    pub(crate) classes: IndexMap<String, Vec<String>>,
    pub(crate) datasets: IndexMap<String, DatasetRecord>,
    pub(crate) arrays: Namespace,
    pub(crate) values: Namespace,
    pub(crate) scannables: Namespace,
    pub(crate) combined: Namespace,
    pub(crate) image_data: Namespace,
    pub(crate) default_image_address: Option<String>,
}

impl HdfMap {
    /// Create an empty map with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty map with a configuration.
    #[must_use]
    pub fn with_config(config: MapConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Create an empty map for NeXus files.
    #[must_use]
    pub fn nexus() -> Self {
        Self::with_config(MapConfig::nexus())
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Enable or disable debug logging.
    pub fn set_debug(&mut self, debug: bool) {
        self.config.debug = debug;
    }

    /// Path of the file the map was last populated from.
    #[must_use]
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Groups by address.
    #[must_use]
    pub fn groups(&self) -> &IndexMap<String, GroupRecord> {
        &self.groups
    }

    /// Group addresses by class tag and by group name.
    #[must_use]
    pub fn classes(&self) -> &IndexMap<String, Vec<String>> {
        &self.classes
    }

    /// Datasets by address.
    #[must_use]
    pub fn datasets(&self) -> &IndexMap<String, DatasetRecord> {
        &self.datasets
    }

    #[must_use]
    pub fn arrays(&self) -> &Namespace {
        &self.arrays
    }

    #[must_use]
    pub fn values(&self) -> &Namespace {
        &self.values
    }

    #[must_use]
    pub fn scannables(&self) -> &Namespace {
        &self.scannables
    }

    #[must_use]
    pub fn combined(&self) -> &Namespace {
        &self.combined
    }

    #[must_use]
    pub fn image_data(&self) -> &Namespace {
        &self.image_data
    }

    /// Populate the map from `file` using the configured layout.
    pub fn populate(&mut self, file: &dyn Hierarchy) {
        self.filename = file.file_path().map(Path::to_path_buf);
        debug_log!(
            self.config.debug,
            "populating from {:?} with {} layout",
            self.filename,
            self.config.layout.name()
        );
        let layout = Arc::clone(&self.config.layout);
        layout.populate(self, file);
    }

    /// Walk the group at `address`, recording its members.
    ///
    /// With `recursive`, sub-groups are walked too. `groups` restricts the
    /// descent from `address` to sub-groups whose key or class tag is
    /// listed; deeper levels are walked in full. Ends by rebuilding the
    /// combined namespace.
    pub fn populate_group(
        &mut self,
        file: &dyn Hierarchy,
        address: &str,
        recursive: bool,
        groups: Option<&[String]>,
    ) {
        self.traverse(
            file,
            Pass {
                source: address,
                target: address,
                recursive,
                groups,
                include_soft: false,
                link_depth: 0,
            },
        );
        self.generate_combined();
    }

    pub(crate) fn traverse(&mut self, file: &dyn Hierarchy, pass: Pass<'_>) {
        for child in file.children(pass.source) {
            let source = child_address(pass.source, &child.name);
            let address = child_address(pass.target, &child.name);
            match file.node(&source) {
                None | Some(Node::UnresolvedLink) => {
                    debug_log!(self.config.debug, "{address}: unresolved link, skipped");
                }
                Some(Node::Group) => {
                    let class = self.store_group(file, &source, &address);
                    let accepted = pass
                        .groups
                        .map_or(true, |g| g.iter().any(|k| *k == child.name || *k == class));
                    if !pass.recursive || !accepted {
                        continue;
                    }
                    let link_depth = pass.link_depth + usize::from(child.link == LinkKind::Soft);
                    if link_depth > MAX_LINK_DEPTH {
                        debug_log!(self.config.debug, "{address}: link depth exceeded, not walked");
                        continue;
                    }
                    let inner = Pass {
                        source: &source,
                        target: &address,
                        groups: None,
                        link_depth,
                        ..pass
                    };
                    self.traverse(file, inner);
                }
                Some(Node::Dataset(info)) => {
                    if child.link == LinkKind::Soft && !pass.include_soft {
                        debug_log!(self.config.debug, "{address}: soft linked dataset, skipped");
                        continue;
                    }
                    self.store_dataset(file, &source, &address, info);
                }
            }
        }
    }

    /// Record the group at `address` itself, without its members.
    pub(crate) fn record_group(&mut self, file: &dyn Hierarchy, address: &str) {
        self.store_group(file, address, address);
    }

    fn store_group(&mut self, file: &dyn Hierarchy, source: &str, address: &str) -> String {
        let name = name_from_address(address);
        let (class, attrs) = match file.attrs(source) {
            Ok(attrs) => {
                let class = attrs
                    .get(&self.config.class_attr)
                    .map_or_else(|| DEFAULT_CLASS.to_string(), attr_text);
                (class, attrs)
            }
            Err(err) => {
                debug_log!(self.config.debug, "{address}: attributes unreadable: {err}");
                (NO_CLASS.to_string(), Attributes::new())
            }
        };
        let datasets = file
            .children(source)
            .into_iter()
            .filter(|c| matches!(file.node(&child_address(source, &c.name)), Some(Node::Dataset(_))))
            .map(|c| c.name)
            .collect();
        debug_log!(self.config.debug, "{address}  group: {class}");
        self.register_class(&name, address);
        self.register_class(&class, address);
        self.groups.insert(
            address.to_string(),
            GroupRecord {
                class: class.clone(),
                name,
                attrs,
                datasets,
            },
        );
        class
    }

    fn store_dataset(&mut self, file: &dyn Hierarchy, source: &str, address: &str, info: DatasetInfo) {
        let name = name_from_address(address);
        let attrs = file.attrs(source).unwrap_or_default();
        let altname = attrs
            .get(&self.config.local_name_attr)
            .and_then(AttrValue::first_text)
            .map_or_else(|| name.clone(), |text| name_from_address(&text));
        let ndim = info.ndim();
        debug_log!(
            self.config.debug,
            "{address}  dataset: {name}, altname={altname}, shape={:?}",
            info.shape
        );
        self.datasets.insert(
            address.to_string(),
            DatasetRecord {
                name: name.clone(),
                size: info.size(),
                shape: info.shape,
                dtype: info.dtype,
                attrs,
            },
        );
        if ndim >= 3 {
            self.register_image(&name, address);
            self.image_data.insert(altname.clone(), address.to_string());
        }
        if ndim > 0 {
            self.register_array(&name, address);
            self.arrays.insert(altname, address.to_string());
        } else {
            self.values.insert(name, address.to_string());
            self.values.insert(altname, address.to_string());
        }
    }

    /// Append `address` to the class index entry `key`, once.
    pub(crate) fn register_class(&mut self, key: &str, address: &str) {
        let entry = self.classes.entry(key.to_string()).or_default();
        if !entry.iter().any(|a| a == address) {
            entry.push(address.to_string());
        }
    }

    /// Register an array under `name`.
    pub fn register_array(&mut self, name: &str, address: &str) {
        self.arrays.insert(name.to_string(), address.to_string());
    }

    /// Register image data under `name` and under `<parent group>_<name>`.
    pub fn register_image(&mut self, name: &str, address: &str) {
        self.image_data.insert(name.to_string(), address.to_string());
        let qualified = format!("{}_{name}", parent_name(address));
        self.image_data.insert(qualified, address.to_string());
    }

    /// Size occurring most often among arrays with more than one element.
    /// Ties go to the smallest size. `None` without such arrays.
    #[must_use]
    pub fn most_common_size(&self) -> Option<usize> {
        most_common(
            self.arrays
                .values()
                .filter_map(|address| self.datasets.get(address))
                .map(|record| record.size)
                .filter(|size| *size > 1),
        )
    }

    /// Shape occurring most often among arrays. Ties go to the
    /// lexicographically smallest shape.
    #[must_use]
    pub fn most_common_shape(&self) -> Option<Vec<usize>> {
        most_common(
            self.arrays
                .values()
                .filter_map(|address| self.datasets.get(address))
                .map(|record| record.shape.clone())
                .filter(|shape| !shape.is_empty()),
        )
    }

    /// Length of the first axis of the first scannable, 0 without scannables.
    #[must_use]
    pub fn scannables_length(&self) -> usize {
        self.scannables
            .values()
            .next()
            .and_then(|address| self.datasets.get(address))
            .and_then(|record| record.shape.first().copied())
            .unwrap_or(0)
    }

    /// True if no group or dataset has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.datasets.is_empty()
    }

    /// Walk the whole file from the root.
    pub(crate) fn populate_root(&mut self, file: &dyn Hierarchy) {
        self.populate_group(file, ROOT, true, None);
    }
}

fn attr_text(value: &AttrValue) -> String {
    value
        .as_text()
        .map_or_else(|| value.to_string(), Cow::into_owned)
}

fn most_common<T: Ord>(items: impl Iterator<Item = T>) -> Option<T> {
    let mut counts: BTreeMap<T, usize> = BTreeMap::new();
    for item in items {
        *counts.entry(item).or_default() += 1;
    }
    let max = counts.values().copied().max()?;
    counts.into_iter().find(|(_, n)| *n == max).map(|(item, _)| item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryFile;
    use crate::value::Value;
    use ndarray::{ArrayD, IxDyn};

    fn scan_file() -> MemoryFile {
        let mut file = MemoryFile::new().with_path("/data/12345.nxs");
        file.group("/entry").attr("NX_class", "NXentry");
        file.group("/entry/measurement").attr("NX_class", "NXdata");
        file.dataset("/entry/measurement/x", vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        file.dataset("/entry/measurement/y", vec![2.0, 4.0, 6.0, 8.0, 10.0]);
        file.dataset("/entry/temperature", 300.0);
        file.dataset("/entry/sample/energy/value", 8.0)
            .attr("local_name", "sample.en");
        file.dataset(
            "/entry/instrument/pil3/data",
            Value::from(ArrayD::<f64>::zeros(IxDyn(&[5, 4, 3]))),
        );
        file.group("/entry/instrument/pil3").attr("NX_class", "NXdetector");
        file
    }

    #[test]
    fn test_populate_records_groups_and_datasets() {
        let mut map = HdfMap::new();
        map.populate(&scan_file());
        assert_eq!(map.filename(), Some(Path::new("/data/12345.nxs")));
        assert_eq!(map.groups()["/entry"].class, "NXentry");
        assert_eq!(map.groups()["/entry/sample"].class, DEFAULT_CLASS);
        assert_eq!(map.groups()["/entry/measurement"].datasets, vec!["x", "y"]);
        assert_eq!(map.datasets()["/entry/measurement/x"].size, 5);
        assert_eq!(map.classes()["NXdata"], vec!["/entry/measurement"]);
        assert_eq!(map.classes()["measurement"], vec!["/entry/measurement"]);
    }

    #[test]
    fn test_dimensionality_classification() {
        let mut map = HdfMap::new();
        map.populate(&scan_file());
        assert_eq!(map.values()["temperature"], "/entry/temperature");
        assert_eq!(map.values()["energy"], "/entry/sample/energy/value");
        assert_eq!(map.values()["sample_en"], "/entry/sample/energy/value");
        assert_eq!(map.arrays()["x"], "/entry/measurement/x");
        assert!(!map.values().contains_key("x"));
        assert_eq!(map.image_data()["data"], "/entry/instrument/pil3/data");
        assert_eq!(map.image_data()["pil3_data"], "/entry/instrument/pil3/data");
        assert_eq!(map.arrays()["data"], "/entry/instrument/pil3/data");
    }

    #[test]
    fn test_repeated_populate_is_idempotent() {
        let file = scan_file();
        let mut map = HdfMap::new();
        map.populate(&file);
        let first = map.clone();
        map.populate(&file);
        assert_eq!(map.classes(), first.classes());
        assert_eq!(map.datasets().len(), first.datasets().len());
    }

    #[test]
    fn test_unreadable_group_attributes() {
        let mut file = scan_file();
        file.group("/entry/odd").unreadable();
        let mut map = HdfMap::new();
        map.populate(&file);
        assert_eq!(map.groups()["/entry/odd"].class, NO_CLASS);
        assert_eq!(map.classes()[NO_CLASS], vec!["/entry/odd"]);
    }

    #[test]
    fn test_byte_string_class_is_decoded() {
        let mut file = MemoryFile::new();
        file.group("/entry")
            .attr("NX_class", AttrValue::Bytes(b"NXentry".to_vec()));
        let mut map = HdfMap::new();
        map.populate(&file);
        assert_eq!(map.groups()["/entry"].class, "NXentry");
    }

    #[test]
    fn test_group_filter_applies_to_first_level() {
        let file = scan_file();
        let mut map = HdfMap::new();
        let groups = vec!["NXdata".to_string()];
        map.populate_group(&file, "/entry", true, Some(&groups));
        assert!(map.datasets().contains_key("/entry/measurement/x"));
        assert!(map.datasets().contains_key("/entry/temperature"));
        assert!(!map.datasets().contains_key("/entry/instrument/pil3/data"));
        assert!(map.groups().contains_key("/entry/instrument"));
    }

    #[test]
    fn test_soft_linked_group_is_walked() {
        let mut file = MemoryFile::new();
        file.dataset("/entry1/measurement/x", vec![1.0, 2.0]);
        file.dataset(
            "/shared/det/frames",
            Value::from(ArrayD::<f64>::zeros(IxDyn(&[2, 3, 3]))),
        );
        file.soft_link("/entry1/det", "/shared/det");
        let mut map = HdfMap::new();
        map.populate_group(&file, "/entry1", true, None);
        assert!(map.groups().contains_key("/entry1/det"));
        assert!(map.datasets().contains_key("/entry1/det/frames"));
        assert_eq!(map.image_data()["frames"], "/entry1/det/frames");
    }

    #[test]
    fn test_link_cycle_terminates() {
        let mut file = MemoryFile::new();
        file.dataset("/entry/x", vec![1.0, 2.0]);
        file.soft_link("/entry/again", "/entry");
        let mut map = HdfMap::new();
        map.populate(&file);
        assert!(map.datasets().contains_key("/entry/again/x"));
        let deepest = map.datasets().keys().map(|a| a.matches("again").count()).max();
        assert_eq!(deepest, Some(MAX_LINK_DEPTH));
    }

    #[test]
    fn test_non_recursive_populate() {
        let mut map = HdfMap::new();
        map.populate_group(&scan_file(), "/entry", false, None);
        assert!(map.datasets().contains_key("/entry/temperature"));
        assert!(!map.datasets().contains_key("/entry/measurement/x"));
        assert_eq!(map.combined()["temperature"], "/entry/temperature");
    }

    #[test]
    fn test_most_common_size_and_shape() {
        let mut map = HdfMap::new();
        map.populate(&scan_file());
        assert_eq!(map.most_common_size(), Some(5));
        assert_eq!(map.most_common_shape(), Some(vec![5]));
        assert_eq!(HdfMap::new().most_common_size(), None);
    }

    #[test]
    fn test_most_common_tie_takes_smallest() {
        assert_eq!(most_common([7, 3, 7, 3, 9].into_iter()), Some(3));
        assert_eq!(most_common(std::iter::empty::<usize>()), None);
    }

    #[test]
    fn test_scannables_length_empty() {
        assert!(HdfMap::new().is_empty());
        assert_eq!(HdfMap::new().scannables_length(), 0);
        let mut map = HdfMap::new();
        map.populate(&scan_file());
        assert!(!map.is_empty());
    }
}
