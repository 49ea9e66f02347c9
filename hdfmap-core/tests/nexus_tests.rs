//! NeXus layout population over in-memory files.

use hdfmap_core::{
    AttrValue, HdfMap, MapConfig, MemoryFile, NexusLayout, Selection, Value,
};
use ndarray::{ArrayD, IxDyn};

fn nexus_file() -> MemoryFile {
    let mut file = MemoryFile::new().with_path("/data/i16-1234.nxs");
    file.root().attr("default", "entry1");
    file.group("/entry1")
        .attr("NX_class", "NXentry")
        .attr("default", "plot");
    file.group("/entry1/plot")
        .attr("NX_class", "NXdata")
        .attr("axes", AttrValue::StringArray(vec!["eta".into()]))
        .attr("signal", "roi_sum");
    file.dataset("/entry1/plot/eta", vec![10.0, 10.1, 10.2, 10.3]);
    file.dataset("/entry1/plot/roi_sum", vec![5.0, 50.0, 500.0, 50.0]);
    file.dataset("/entry1/plot/monitor", vec![1.0, 1.0]);
    file.group("/entry1/instrument").attr("NX_class", "NXinstrument");
    file.group("/entry1/instrument/pil3").attr("NX_class", "NXdetector");
    let frames = ArrayD::from_shape_fn(IxDyn(&[4, 2, 2]), |idx| idx[0] as f64);
    file.dataset("/entry1/instrument/pil3/data", Value::from(frames));
    file.dataset("/entry1/instrument/mono/energy", 8.0);
    file.group("/entry1/sample").attr("NX_class", "NXsample");
    file.dataset("/entry1/sample/temperature", 12.5);
    file.dataset("/entry2/other/x", vec![1.0, 2.0, 3.0, 4.0]);
    file
}

#[test]
fn test_nexus_defaults_and_scannables() {
    let file = nexus_file();
    let mut map = HdfMap::nexus();
    map.populate(&file);

    assert_eq!(map.arrays()["axes"], "/entry1/plot/eta");
    assert_eq!(map.arrays()["signal"], "/entry1/plot/roi_sum");
    assert_eq!(
        map.scannables().keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["eta", "roi_sum"]
    );
    assert_eq!(map.combined()["eta"], "/entry1/plot/eta");
    assert!(map.groups().contains_key("/entry1"));
    assert!(!map.datasets().contains_key("/entry2/other/x"));

    let axes = map.eval(&file, "axes").unwrap();
    assert_eq!(axes.size(), 4);
    assert_eq!(map.eval(&file, "np.argmax(signal)").unwrap(), Value::int(2));
}

#[test]
fn test_nexus_detector_image() {
    let file = nexus_file();
    let mut map = HdfMap::nexus();
    map.populate(&file);
    assert_eq!(map.image_data()["NXdetector"], "/entry1/instrument/pil3/data");
    assert_eq!(map.get_image_address(), Some("/entry1/instrument/pil3/data"));
    let image = map.get_image(&file, None).unwrap().unwrap();
    assert_eq!(image.shape(), &[2, 2]);
    assert_eq!(
        map.get_image(&file, Some(Selection::Index(3))).unwrap().unwrap(),
        Value::from(ArrayD::from_elem(IxDyn(&[2, 2]), 3.0))
    );
}

#[test]
fn test_nexus_group_filter() {
    let file = nexus_file();
    let config = MapConfig::default().with_layout(NexusLayout::default().with_groups(["NXdata", "sample"]));
    let mut map = HdfMap::with_config(config);
    map.populate(&file);
    assert!(map.datasets().contains_key("/entry1/sample/temperature"));
    assert!(map.datasets().contains_key("/entry1/plot/eta"));
    assert!(!map.datasets().contains_key("/entry1/instrument/mono/energy"));
    assert!(map.image_data().is_empty());
}

#[test]
fn test_missing_defaults_fall_back() {
    let mut file = MemoryFile::new();
    file.group("/scan").attr("NX_class", "NXentry");
    file.dataset("/scan/measurement/x", vec![1.0, 2.0, 3.0]);
    file.dataset("/scan/measurement/y", vec![4.0, 5.0, 6.0]);
    file.dataset("/scan/energy", 3.2);
    let mut map = HdfMap::nexus();
    map.populate(&file);
    assert!(!map.arrays().contains_key("axes"));
    assert_eq!(map.scannables().len(), 2);
    assert_eq!(map.values()["energy"], "/scan/energy");
    assert_eq!(map.get_image_address(), None);
}

#[test]
fn test_broken_default_chain_is_fail_soft() {
    let mut file = MemoryFile::new();
    file.root().attr("default", "missing_entry");
    file.dataset("/value_only", 1.0);
    file.soft_link("/dangling", "/nowhere");
    let mut map = HdfMap::nexus();
    map.populate(&file);
    assert_eq!(map.values()["value_only"], "/value_only");
    assert_eq!(map.datasets().len(), 1);
    assert!(map.scannables().is_empty());
}

#[test]
fn test_configured_default_image() {
    let file = nexus_file();
    let mut map = HdfMap::with_config(MapConfig::nexus().with_default_image("roi_sum"));
    map.populate(&file);
    assert_eq!(map.get_image_address(), Some("/entry1/plot/roi_sum"));
    map.set_image_address(Some("pil3_data"));
    assert_eq!(map.get_image_address(), Some("/entry1/instrument/pil3/data"));
}
