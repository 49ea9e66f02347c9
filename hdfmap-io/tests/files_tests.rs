//! Multi-file helpers over JSON snapshots.

use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use hdfmap_core::{MemoryFile, NexusOptions, Selection, Value};
use hdfmap_io::{
    create_hdf_map, create_nexus_map, hdf_data, hdf_eval, hdf_format, hdf_image, list_files,
    nexus_data_block, open_file, Error, JsonFile,
};
use ndarray::{ArrayD, IxDyn};
use tempfile::TempDir;

fn scan(scan_number: i64, points: usize) -> MemoryFile {
    let mut file = MemoryFile::new();
    file.root().attr("default", "entry");
    file.group("/entry")
        .attr("NX_class", "NXentry")
        .attr("default", "measurement");
    file.group("/entry/measurement").attr("NX_class", "NXdata");
    let x: Vec<f64> = (0..points).map(|i| i as f64).collect();
    let y: Vec<f64> = x.iter().map(|v| v * 10.0).collect();
    file.dataset("/entry/measurement/x", x);
    file.dataset("/entry/measurement/y", y);
    file.dataset("/entry/scan_number", scan_number);
    file.group("/entry/instrument/pil3").attr("NX_class", "NXdetector");
    let frames = ArrayD::from_shape_fn(IxDyn(&[points, 2, 3]), |idx| idx[0] as f64);
    file.dataset("/entry/instrument/pil3/data", Value::from(frames));
    file
}

fn write_scans(dir: &Path) -> Vec<PathBuf> {
    (1..=3)
        .map(|n| {
            let path = dir.join(format!("scan_{n}.json"));
            JsonFile::save(&scan(n, 3 + n as usize), &path).unwrap();
            path
        })
        .collect()
}

#[test]
fn test_list_files_filters_extension() {
    let dir = TempDir::new().unwrap();
    let paths = write_scans(dir.path());
    std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
    let listed = list_files(dir.path(), ".json");
    assert_eq!(listed.len(), paths.len());
    assert!(listed.iter().all(|p| p.extension().unwrap() == "json"));
    assert!(list_files(dir.path().join("missing"), "json").is_empty());
}

#[test]
fn test_create_maps() {
    let dir = TempDir::new().unwrap();
    let paths = write_scans(dir.path());

    let map = create_hdf_map(&paths[0], false).unwrap();
    assert_eq!(map.scannables_length(), 4);
    assert_eq!(map.filename(), Some(paths[0].as_path()));

    let nexus = create_nexus_map(&paths[0], NexusOptions::default(), true).unwrap();
    assert_eq!(
        nexus.scannables().keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["x", "y"]
    );
    assert_eq!(nexus.get_image_address(), Some("/entry/instrument/pil3/data"));
}

#[test]
fn test_helpers_keep_file_order() {
    let dir = TempDir::new().unwrap();
    let paths = write_scans(dir.path());

    let numbers = hdf_eval(&paths, "scan_number", None).unwrap();
    assert_eq!(numbers, vec![Value::int(1), Value::int(2), Value::int(3)]);

    let lengths = hdf_format(&paths, "#{scan_number}: {len(x)}", None).unwrap();
    assert_eq!(lengths, vec!["#1: 4", "#2: 5", "#3: 6"]);

    let data = hdf_data(
        &paths,
        &["scan_number", "missing"],
        None,
        &Selection::All,
        Some(&Value::float(f64::NAN)),
    )
    .unwrap();
    assert_eq!(data.len(), 3);
    assert_eq!(data[2][0], Some(Value::int(3)));
    assert!(data[2][1].as_ref().unwrap().as_f64().unwrap().is_nan());

    let images = hdf_image(&paths, None, None).unwrap();
    let middle = images[1].as_ref().unwrap().to_f64_array().unwrap();
    assert_eq!(middle.shape(), &[2, 3]);
    assert_relative_eq!(middle[[0, 0]], 2.0);
}

#[test]
fn test_data_blocks() {
    let dir = TempDir::new().unwrap();
    let paths = write_scans(dir.path());
    let blocks = nexus_data_block(&paths, None).unwrap();
    assert_eq!(blocks.len(), 3);
    assert_eq!(blocks[0].keys().collect::<Vec<_>>(), vec!["x", "y"]);
    assert_eq!(blocks[1]["y"].size(), 5);
    assert_eq!(blocks[2].metadata["scan_number"], Value::int(3));
    assert_eq!(
        blocks[2].metadata["filename"],
        Value::text("scan_3.json")
    );
}

#[test]
fn test_empty_and_unsupported_inputs() {
    let none: Vec<PathBuf> = Vec::new();
    assert!(hdf_eval(&none, "x", None).unwrap().is_empty());
    let dir = TempDir::new().unwrap();
    let text = dir.path().join("scan.txt");
    std::fs::write(&text, "x").unwrap();
    assert!(matches!(open_file(&text), Err(Error::InvalidFormat(_))));
}

#[cfg(not(feature = "hdf5"))]
#[test]
fn test_hdf5_requires_feature() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scan.nxs");
    std::fs::write(&path, "").unwrap();
    assert!(matches!(open_file(&path), Err(Error::InvalidFormat(_))));
}
