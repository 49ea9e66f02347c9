//! Population and image detection strategies.
//!
//! A [`Layout`] decides which part of a file is walked, which extra names
//! are registered and where the default image lives. [`GenericLayout`]
//! walks everything; [`NexusLayout`] follows the NeXus `default` attribute
//! chain to a single entry and its plottable data group.

use std::fmt::Debug;

use crate::address::{child_address, ROOT};
use crate::hierarchy::{Hierarchy, Node};
use crate::map::HdfMap;
use crate::value::AttrValue;

/// Attribute naming the default entry of a file or default data of an entry.
pub const NX_DEFAULT: &str = "default";
/// Conventional name of the data group when an entry has no default.
pub const NX_MEASUREMENT: &str = "measurement";
/// Attribute naming the signal dataset of a data group.
pub const NX_SIGNAL: &str = "signal";
/// Attribute naming the axes datasets of a data group.
pub const NX_AXES: &str = "axes";
/// Class tag of detector groups.
pub const NX_DETECTOR: &str = "NXdetector";
/// Dataset holding detector frames.
pub const NX_DETECTOR_DATA: &str = "data";

/// Strategy used by [`HdfMap::populate`] and image address resolution.
pub trait Layout: Send + Sync + Debug {
    /// Short identifier used in log records.
    fn name(&self) -> &'static str;

    /// Populate `map` from `file`.
    fn populate(&self, map: &mut HdfMap, file: &dyn Hierarchy) {
        map.populate_root(file);
    }

    /// Address of the image dataset detected in `map`.
    fn image_address<'a>(&self, map: &'a HdfMap) -> Option<&'a str> {
        map.image_data().values().next().map(String::as_str)
    }
}

/// Walk the whole file; the first image dataset is the default image.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericLayout;

impl Layout for GenericLayout {
    fn name(&self) -> &'static str {
        "generic"
    }
}

/// NeXus population options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NexusOptions {
    /// Only descend into entry sub-groups with these keys or class tags.
    pub groups: Option<Vec<String>>,
}

/// Walk the default entry of a NeXus file.
///
/// 1. Register the `axes` and `signal` datasets of the default data group.
/// 2. Walk the default entry, optionally filtered by group.
/// 3. Derive scannables from the default data group.
/// 4. Register detector frames under `NXdetector`.
#[derive(Debug, Clone, Default)]
pub struct NexusLayout {
    pub options: NexusOptions,
}

impl NexusLayout {
    /// Restrict the walk to entry sub-groups with these keys or class tags.
    #[must_use]
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.groups = Some(groups.into_iter().map(Into::into).collect());
        self
    }

    /// Default entry: root `default` attribute, else the first member.
    fn default_entry(file: &dyn Hierarchy) -> Option<String> {
        let key = match default_attr(file, ROOT) {
            Some(key) => key,
            None => file.children(ROOT).into_iter().next()?.name,
        };
        let address = child_address(ROOT, &key);
        matches!(file.node(&address), Some(Node::Group)).then_some(address)
    }

    /// Default data group address of an entry, which may not exist.
    fn default_data(file: &dyn Hierarchy, entry: &str) -> String {
        let key = default_attr(file, entry).unwrap_or_else(|| NX_MEASUREMENT.to_string());
        child_address(entry, &key)
    }

    /// Register `axes` and `signal`. Any missing link in the chain stops
    /// the registration without affecting the rest of the population.
    fn load_defaults(map: &mut HdfMap, file: &dyn Hierarchy) -> Option<()> {
        let debug = map.config().debug;
        let entry = Self::default_entry(file)?;
        let data = Self::default_data(file, &entry);
        let attrs = file.attrs(&data).ok()?;
        let axes = attrs.get(NX_AXES).and_then(AttrValue::first_text)?;
        let signal = attrs.get(NX_SIGNAL).and_then(AttrValue::first_text)?;
        let axes = child_address(&data, &axes);
        let signal = child_address(&data, &signal);
        if file.contains(&axes) {
            debug_log!(debug, "default axes: {axes}");
            map.register_array(NX_AXES, &axes);
        }
        if file.contains(&signal) {
            debug_log!(debug, "default signal: {signal}");
            map.register_array(NX_SIGNAL, &signal);
        }
        Some(())
    }
}

fn default_attr(file: &dyn Hierarchy, address: &str) -> Option<String> {
    let attrs = file.attrs(address).ok()?;
    attrs
        .get(NX_DEFAULT)
        .and_then(AttrValue::as_text)
        .map(std::borrow::Cow::into_owned)
}

impl Layout for NexusLayout {
    fn name(&self) -> &'static str {
        "nexus"
    }

    fn populate(&self, map: &mut HdfMap, file: &dyn Hierarchy) {
        let debug = map.config().debug;
        if Self::load_defaults(map, file).is_none() {
            debug_log!(debug, "no NeXus default axes and signal");
        }
        let Some(entry) = Self::default_entry(file) else {
            debug_log!(debug, "no entry group, walking the whole file");
            map.populate_root(file);
            return;
        };
        debug_log!(debug, "NX entry: {entry}");
        map.record_group(file, &entry);
        map.populate_group(file, &entry, true, self.options.groups.as_deref());

        let data = Self::default_data(file, &entry);
        if matches!(file.node(&data), Some(Node::Group)) {
            debug_log!(debug, "NX data: {data}");
            map.generate_scannables_from_group(file, &data, None);
        }

        let detector = map
            .classes()
            .get(NX_DETECTOR)
            .and_then(|addresses| addresses.first())
            .map(|group| child_address(group, NX_DETECTOR_DATA));
        if let Some(address) = detector {
            debug_log!(debug, "NX detector: {address}");
            if file.contains(&address) {
                map.image_data.insert(NX_DETECTOR.to_string(), address);
            }
        }
    }

    fn image_address<'a>(&self, map: &'a HdfMap) -> Option<&'a str> {
        map.image_data().get(NX_DETECTOR).map(String::as_str)
    }
}
