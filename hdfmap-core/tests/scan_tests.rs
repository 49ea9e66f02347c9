//! End-to-end tests over an in-memory scan file.

use approx::assert_relative_eq;
use hdfmap_core::{
    build_address, name_from_address, Error, EvalError, HdfMap, Hierarchy, MapConfig, MemoryFile,
    Selection, Value,
};
use ndarray::{ArrayD, IxDyn};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn scan_file(path: &str) -> MemoryFile {
    let mut file = MemoryFile::new().with_path(path);
    file.group("/entry").attr("NX_class", "NXentry");
    file.group("/entry/measurement").attr("NX_class", "NXdata");
    file.dataset("/entry/measurement/x", vec![0.1, 0.2, 0.3, 0.4, 0.5]);
    file.dataset("/entry/measurement/y", vec![10.0, 20.0, 30.0, 40.0, 50.0]);
    file.dataset("/entry/measurement/count", vec![1_i64, 2, 3, 4, 5]);
    file.dataset("/entry/sample/temperature", 300.0);
    file.dataset("/entry/sample/energy/value", 8.0)
        .attr("local_name", "incident_energy");
    file.dataset("/entry/title", "x scan");
    let frames = ArrayD::from_shape_fn(IxDyn(&[5, 3, 4, 1]), |idx| (idx[0] * 100 + idx[1]) as f64);
    file.dataset("/entry/instrument/pil3/data", Value::from(frames));
    file
}

fn build_map(file: &MemoryFile) -> HdfMap {
    let mut map = HdfMap::with_config(MapConfig::default().with_debug(true));
    map.populate(file);
    let size = map.most_common_size().unwrap_or(1);
    map.generate_scannables(size);
    map
}

#[test]
fn test_scan_end_to_end() {
    init_logger();
    let file = scan_file("/data/scan_1.nxs");
    let map = build_map(&file);

    assert_eq!(map.most_common_size(), Some(5));
    assert_eq!(map.scannables_length(), 5);
    assert_eq!(
        map.scannables().keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["x", "y", "count"]
    );

    let metadata = map.get_metadata(&file, None).unwrap();
    assert_eq!(metadata["temperature"], Value::float(300.0));
    assert_eq!(metadata["incident_energy"], Value::float(8.0));
    assert_eq!(metadata["filename"], Value::text("scan_1.nxs"));

    let sum = map.eval(&file, "x + y").unwrap().to_f64_array().unwrap();
    assert_relative_eq!(sum[[4]], 50.5);
    assert_eq!(map.get_address("nonexistent"), None);
    assert_eq!(map.format(&file, "T={temperature:.1f}").unwrap(), "T=300.0");
}

#[test]
fn test_map_reused_across_files() {
    let first = scan_file("/data/scan_1.nxs");
    let map = build_map(&first);

    let mut second = MemoryFile::new().with_path("/data/scan_2.nxs");
    second.dataset("/entry/measurement/x", vec![1.0, 2.0]);
    second.dataset("/entry/sample/temperature", 250.0);

    let x = map.get_data(&second, "x", &Selection::All).unwrap().unwrap();
    assert_eq!(x, Value::from(vec![1.0, 2.0]));
    assert!(map.get_data(&second, "y", &Selection::All).unwrap().is_none());
    assert!(map.get_image(&second, None).unwrap().is_none());

    let scannables = map.get_scannables(&second).unwrap();
    assert_eq!(scannables.keys().collect::<Vec<_>>(), vec!["x"]);
    assert_eq!(
        map.format(&second, "{filename}: {temperature}").unwrap(),
        "scan_2.nxs: 250.0"
    );
}

#[test]
fn test_addresses_resolve_in_file() {
    let file = scan_file("/data/scan_1.nxs");
    let map = build_map(&file);
    for (name, address) in map.combined() {
        assert!(file.contains(address), "{name} -> {address}");
        let value = map.get_data(&file, name, &Selection::All).unwrap().unwrap();
        assert_eq!(value.size(), map.get_size(address).unwrap());
    }
    for address in map.datasets().keys() {
        let segments: Vec<&str> = address.split('/').filter(|s| !s.is_empty()).collect();
        assert_eq!(&build_address(segments), address);
    }
    assert_eq!(name_from_address("/entry/sample/energy/value"), "energy");
}

#[test]
fn test_image_defaults_to_middle_frame() {
    let file = scan_file("/data/scan_1.nxs");
    let map = build_map(&file);
    let image = map.get_image(&file, None).unwrap().unwrap();
    assert_eq!(image.shape(), &[3, 4]);
    let image = image.to_f64_array().unwrap();
    assert_relative_eq!(image[[1, 0]], 201.0);

    let last = map.get_image(&file, Some(Selection::Index(-1))).unwrap().unwrap();
    assert_relative_eq!(last.to_f64_array().unwrap()[[0, 0]], 400.0);
    assert!(matches!(
        map.get_image(&file, Some(Selection::Index(5))),
        Err(Error::IndexOutOfBounds { index: 5, .. })
    ));
}

#[test]
fn test_eval_errors_name_the_identifier() {
    let file = scan_file("/data/scan_1.nxs");
    let map = build_map(&file);
    let err = map.eval(&file, "x * unknown_motor").unwrap_err();
    assert!(matches!(
        err,
        Error::Eval(EvalError::UnresolvedName(ref name)) if name == "unknown_motor"
    ));
    assert!(err.to_string().contains("unknown_motor"));
    assert!(matches!(
        map.eval(&file, "x + title"),
        Err(Error::Eval(EvalError::Type(_)))
    ));
}

#[test]
fn test_eval_expressions() {
    let file = scan_file("/data/scan_1.nxs");
    let map = build_map(&file);
    assert_eq!(map.eval(&file, "len(count)").unwrap(), Value::int(5));
    assert_eq!(map.eval(&file, "count[1:3]").unwrap(), Value::from(vec![2_i64, 3]));
    assert_relative_eq!(map.eval(&file, "np.mean(y)").unwrap().as_f64().unwrap(), 30.0);
    assert_eq!(map.eval(&file, "_temperature").unwrap(), Value::text("/entry/sample/temperature"));
    assert_eq!(
        map.format(&file, "{title}, {len(x)} points, y max {np.max(y):.0f}").unwrap(),
        "x scan, 5 points, y max 50"
    );
}

#[test]
fn test_scannables_table() {
    let file = scan_file("/data/scan_1.nxs");
    let map = build_map(&file);
    let table = map.get_scannables_array(&file).unwrap();
    assert_eq!(table.names, vec!["x", "y", "count"]);
    assert_relative_eq!(table.get("count").unwrap()[2], 3.0);

    let mut ragged = scan_file("/data/scan_1.nxs");
    ragged.dataset("/entry/measurement/y", vec![1.0, 2.0]);
    assert!(matches!(map.get_scannables_array(&ragged), Err(Error::Shape(_))));
}
