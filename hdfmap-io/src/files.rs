//! File discovery, map builders and multi-file helpers.
//!
//! The helpers build a map from the first file when none is given, then
//! apply it to every file in parallel. Results keep the order of `paths`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use hdfmap_core::{DataBlock, HdfMap, Hierarchy, MapConfig, NexusLayout, NexusOptions, Selection, Value};
use rayon::prelude::*;

use crate::json::JsonFile;
use crate::{Error, Result};

/// Extensions of HDF5 and NeXus files.
pub const EXTENSIONS: [&str; 4] = ["nxs", "hdf", "hdf5", "h5"];

/// Extension listed by default.
pub const DEFAULT_EXTENSION: &str = EXTENSIONS[0];

/// Extension of JSON snapshots.
pub const JSON_EXTENSION: &str = "json";

/// Files in `directory` with `extension`, oldest modification first.
///
/// A missing or unreadable directory gives an empty list.
#[must_use]
pub fn list_files<P: AsRef<Path>>(directory: P, extension: &str) -> Vec<PathBuf> {
    let extension = extension.trim_start_matches('.');
    let Ok(entries) = fs::read_dir(directory) else {
        return Vec::new();
    };
    let mut files: Vec<(SystemTime, PathBuf)> = entries
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|e| e == extension))
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .collect();
    files.sort();
    files.into_iter().map(|(_, path)| path).collect()
}

/// Open a file with the backend matching its extension.
///
/// # Errors
/// Returns an error if the file cannot be opened, or
/// [`Error::InvalidFormat`] for an extension without a backend.
pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Box<dyn Hierarchy>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if extension == JSON_EXTENSION {
        return Ok(Box::new(JsonFile::open(path)?));
    }
    if EXTENSIONS.contains(&extension.as_str()) {
        return open_hdf5(path);
    }
    Err(Error::InvalidFormat(format!(
        "no backend for {}",
        path.display()
    )))
}

#[cfg(feature = "hdf5")]
fn open_hdf5(path: &Path) -> Result<Box<dyn Hierarchy>> {
    Ok(Box::new(crate::hdf5::Hdf5File::open(path)?))
}

#[cfg(not(feature = "hdf5"))]
fn open_hdf5(path: &Path) -> Result<Box<dyn Hierarchy>> {
    Err(Error::InvalidFormat(format!(
        "{}: HDF5 support requires the `hdf5` feature",
        path.display()
    )))
}

/// Map a whole file and take scannables from the most common array size.
///
/// # Errors
/// Returns an error if the file cannot be opened.
pub fn create_hdf_map<P: AsRef<Path>>(path: P, debug: bool) -> Result<HdfMap> {
    let file = open_file(path)?;
    let mut map = HdfMap::with_config(MapConfig::default().with_debug(debug));
    map.populate(file.as_ref());
    if let Some(size) = map.most_common_size() {
        map.generate_scannables(size);
    }
    Ok(map)
}

/// Map the default entry of a NeXus file.
///
/// Without a default data group the scannables come from the most common
/// array size.
///
/// # Errors
/// Returns an error if the file cannot be opened.
pub fn create_nexus_map<P: AsRef<Path>>(path: P, options: NexusOptions, debug: bool) -> Result<HdfMap> {
    let file = open_file(path)?;
    let config = MapConfig::default()
        .with_debug(debug)
        .with_layout(NexusLayout { options });
    let mut map = HdfMap::with_config(config);
    map.populate(file.as_ref());
    if map.scannables().is_empty() {
        log::info!("NXdata not found, taking scannables from the most common array size");
        if let Some(size) = map.most_common_size() {
            map.generate_scannables(size);
        }
    }
    Ok(map)
}

/// Apply `op` to every file in parallel with one map.
fn map_files<P, T, F>(paths: &[P], map: &HdfMap, op: F) -> Result<Vec<T>>
where
    P: AsRef<Path> + Sync,
    T: Send,
    F: Fn(&HdfMap, &dyn Hierarchy) -> hdfmap_core::Result<T> + Sync,
{
    paths
        .par_iter()
        .map(|path| -> Result<T> {
            let file = open_file(path)?;
            log::debug!("reading {}", path.as_ref().display());
            Ok(op(map, file.as_ref())?)
        })
        .collect()
}

fn map_or_build<'a, P: AsRef<Path>>(
    paths: &[P],
    map: Option<&'a HdfMap>,
    owned: &'a mut Option<HdfMap>,
    build: fn(&Path) -> Result<HdfMap>,
) -> Result<Option<&'a HdfMap>> {
    if let Some(map) = map {
        return Ok(Some(map));
    }
    let Some(first) = paths.first() else {
        return Ok(None);
    };
    Ok(Some(&*owned.insert(build(first.as_ref())?)))
}

fn build_hdf_map(path: &Path) -> Result<HdfMap> {
    create_hdf_map(path, false)
}

fn build_nexus_map(path: &Path) -> Result<HdfMap> {
    create_nexus_map(path, NexusOptions::default(), false)
}

/// Read datasets from many files: one row per file, one entry per name.
///
/// Names absent from a file take `default`.
///
/// # Errors
/// Returns an error if a file cannot be opened or read.
pub fn hdf_data<P, S>(
    paths: &[P],
    names: &[S],
    map: Option<&HdfMap>,
    selection: &Selection,
    default: Option<&Value>,
) -> Result<Vec<Vec<Option<Value>>>>
where
    P: AsRef<Path> + Sync,
    S: AsRef<str> + Sync,
{
    let mut owned = None;
    let Some(map) = map_or_build(paths, map, &mut owned, build_hdf_map)? else {
        return Ok(Vec::new());
    };
    map_files(paths, map, |map, file| {
        names
            .iter()
            .map(|name| {
                map.get_data(file, name.as_ref(), selection)
                    .map(|value| value.or_else(|| default.cloned()))
            })
            .collect()
    })
}

/// Evaluate `expression` in every file.
///
/// # Errors
/// Returns an error if a file cannot be opened or the evaluation fails.
pub fn hdf_eval<P>(paths: &[P], expression: &str, map: Option<&HdfMap>) -> Result<Vec<Value>>
where
    P: AsRef<Path> + Sync,
{
    let mut owned = None;
    let Some(map) = map_or_build(paths, map, &mut owned, build_hdf_map)? else {
        return Ok(Vec::new());
    };
    map_files(paths, map, |map, file| map.eval(file, expression))
}

/// Format `template` with every file.
///
/// # Errors
/// Returns an error if a file cannot be opened or a field fails.
pub fn hdf_format<P>(paths: &[P], template: &str, map: Option<&HdfMap>) -> Result<Vec<String>>
where
    P: AsRef<Path> + Sync,
{
    let mut owned = None;
    let Some(map) = map_or_build(paths, map, &mut owned, build_hdf_map)? else {
        return Ok(Vec::new());
    };
    map_files(paths, map, |map, file| map.format(file, template))
}

/// Read the default image of every file, `None` where a file has none.
///
/// # Errors
/// Returns an error if a file cannot be opened or read.
pub fn hdf_image<P>(
    paths: &[P],
    selection: Option<&Selection>,
    map: Option<&HdfMap>,
) -> Result<Vec<Option<Value>>>
where
    P: AsRef<Path> + Sync,
{
    let mut owned = None;
    let Some(map) = map_or_build(paths, map, &mut owned, build_hdf_map)? else {
        return Ok(Vec::new());
    };
    map_files(paths, map, |map, file| map.get_image(file, selection.cloned()))
}

/// Scannables and metadata of every file, mapped with the NeXus layout.
///
/// # Errors
/// Returns an error if a file cannot be opened or read.
pub fn nexus_data_block<P>(paths: &[P], map: Option<&HdfMap>) -> Result<Vec<DataBlock>>
where
    P: AsRef<Path> + Sync,
{
    let mut owned = None;
    let Some(map) = map_or_build(paths, map, &mut owned, build_nexus_map)? else {
        return Ok(Vec::new());
    };
    map_files(paths, map, |map, file| map.get_data_block(file))
}
