//! Name resolution, data retrieval and evaluation against an open file.
//!
//! Every operation here takes the file explicitly: the map only knows
//! addresses, and the same map can be used with any file of the same layout.
//! Addresses that the map knows but the file lacks are treated as absent.

use std::fmt;
use std::ops::Index;

use indexmap::IndexMap;
use ndarray::Array2;

use crate::address::parent_address;
use crate::block::{DataBlock, Record, ScanTable, TableFormat};
use crate::error::{Error, Result};
use crate::eval::{format_value, Scope};
use crate::hierarchy::Hierarchy;
use crate::map::{DatasetRecord, HdfMap};
use crate::value::{AttrValue, Attributes, Selection, Value};

/// Attribute holding the number of decimals used when printing a dataset.
pub const DECIMALS_ATTR: &str = "decimals";

impl HdfMap {
    /// Resolve a name or address to a recorded address.
    ///
    /// Lookup order: datasets, groups, combined, image data, then the first
    /// group of a class tag or group name.
    #[must_use]
    pub fn get_address(&self, name_or_address: &str) -> Option<&str> {
        if let Some((address, _)) = self.datasets.get_key_value(name_or_address) {
            return Some(address.as_str());
        }
        if let Some((address, _)) = self.groups.get_key_value(name_or_address) {
            return Some(address.as_str());
        }
        self.combined
            .get(name_or_address)
            .or_else(|| self.image_data.get(name_or_address))
            .or_else(|| self.classes.get(name_or_address).and_then(|a| a.first()))
            .map(String::as_str)
    }

    /// Address of the group containing the resolved object, or the object
    /// itself if it is a group.
    #[must_use]
    pub fn get_group_address(&self, name_or_address: &str) -> Option<&str> {
        let mut address = self.get_address(name_or_address)?;
        loop {
            if let Some((group, _)) = self.groups.get_key_value(address) {
                return Some(group.as_str());
            }
            address = parent_address(address)?;
        }
    }

    /// Keys of the datasets directly inside the resolved group.
    #[must_use]
    pub fn get_group_datasets(&self, name_or_address: &str) -> Option<&[String]> {
        let address = self.get_group_address(name_or_address)?;
        self.groups.get(address).map(|g| g.datasets.as_slice())
    }

    fn dataset_record(&self, name_or_address: &str) -> Option<&DatasetRecord> {
        self.datasets.get(self.get_address(name_or_address)?)
    }

    /// Number of elements of a dataset.
    #[must_use]
    pub fn get_size(&self, name_or_address: &str) -> Option<usize> {
        self.dataset_record(name_or_address).map(|d| d.size)
    }

    /// Shape of a dataset.
    #[must_use]
    pub fn get_shape(&self, name_or_address: &str) -> Option<&[usize]> {
        self.dataset_record(name_or_address).map(|d| d.shape.as_slice())
    }

    /// Attributes of a dataset or group.
    #[must_use]
    pub fn get_attrs(&self, name_or_address: &str) -> Option<&Attributes> {
        let address = self.get_address(name_or_address)?;
        self.datasets
            .get(address)
            .map(|d| &d.attrs)
            .or_else(|| self.groups.get(address).map(|g| &g.attrs))
    }

    /// One attribute of a dataset or group.
    #[must_use]
    pub fn get_attr(&self, name_or_address: &str, label: &str) -> Option<&AttrValue> {
        self.get_attrs(name_or_address)?.get(label)
    }

    /// Dataset addresses whose name contains `text`. With `name_only` unset
    /// the full address is searched instead.
    #[must_use]
    pub fn find(&self, text: &str, name_only: bool) -> Vec<&str> {
        self.datasets
            .iter()
            .filter(|(address, record)| {
                if name_only {
                    record.name.contains(text)
                } else {
                    address.contains(text)
                }
            })
            .map(|(address, _)| address.as_str())
            .collect()
    }

    /// Dataset addresses, then group addresses, carrying the attribute `label`.
    #[must_use]
    pub fn find_attr(&self, label: &str) -> Vec<&str> {
        let datasets = self
            .datasets
            .iter()
            .filter(|(_, d)| d.attrs.contains_key(label))
            .map(|(address, _)| address.as_str());
        let groups = self
            .groups
            .iter()
            .filter(|(_, g)| g.attrs.contains_key(label))
            .map(|(address, _)| address.as_str());
        datasets.chain(groups).collect()
    }

    /// Override the image address. A name that does not resolve leaves the
    /// current override in place; `None` clears it.
    pub fn set_image_address(&mut self, name_or_address: Option<&str>) {
        match name_or_address {
            None => self.default_image_address = None,
            Some(name) => match self.get_address(name).map(str::to_string) {
                Some(address) => {
                    debug_log!(self.config.debug, "default image address: {address}");
                    self.default_image_address = Some(address);
                }
                None => debug_log!(self.config.debug, "image address {name} not resolved"),
            },
        }
    }

    /// Address of the default image: the explicit override, then the
    /// configured default, then the layout's detection.
    #[must_use]
    pub fn get_image_address(&self) -> Option<&str> {
        if let Some(address) = &self.default_image_address {
            return Some(address.as_str());
        }
        self.config
            .default_image
            .as_deref()
            .and_then(|name| self.get_address(name))
            .or_else(|| self.config.layout.image_address(self))
    }

    /// Read a dataset, or `None` if the name does not resolve or the file
    /// has no dataset at the address.
    ///
    /// # Errors
    /// Returns an error if the backend fails to read the dataset or the
    /// selection does not fit it.
    pub fn get_data(
        &self,
        file: &dyn Hierarchy,
        name_or_address: &str,
        selection: &Selection,
    ) -> Result<Option<Value>> {
        let Some(address) = self.get_address(name_or_address) else {
            return Ok(None);
        };
        if file.dataset_info(address).is_none() {
            debug_log!(self.config.debug, "{address} not in {:?}", file.file_path());
            return Ok(None);
        }
        file.read(address, selection).map(Some)
    }

    /// [`get_data`](Self::get_data) with a fallback value.
    ///
    /// # Errors
    /// Returns an error if the backend fails to read the dataset.
    pub fn get_data_or(
        &self,
        file: &dyn Hierarchy,
        name_or_address: &str,
        selection: &Selection,
        default: Value,
    ) -> Result<Value> {
        Ok(self.get_data(file, name_or_address, selection)?.unwrap_or(default))
    }

    /// Read every value dataset, merged over the file's extra context.
    ///
    /// Values missing from `file` take `default`, or are left out without one.
    ///
    /// # Errors
    /// Returns an error if the backend fails to read a dataset.
    pub fn get_metadata(&self, file: &dyn Hierarchy, default: Option<&Value>) -> Result<Record> {
        let mut metadata = file.extra_context();
        for (name, address) in &self.values {
            let value = if file.dataset_info(address).is_some() {
                Some(file.read(address, &Selection::All)?)
            } else {
                default.cloned()
            };
            if let Some(value) = value {
                metadata.insert(name.clone(), value);
            }
        }
        Ok(metadata.into())
    }

    /// Read every scannable present in `file`.
    ///
    /// # Errors
    /// Returns an error if the backend fails to read a dataset.
    pub fn get_scannables(&self, file: &dyn Hierarchy) -> Result<Record> {
        let mut scannables = IndexMap::new();
        for (name, address) in &self.scannables {
            if file.dataset_info(address).is_some() {
                scannables.insert(name.clone(), file.read(address, &Selection::All)?);
            }
        }
        Ok(scannables.into())
    }

    /// Numeric scannables present in `file`, in namespace order.
    fn numeric_scannables<'a>(&'a self, file: &dyn Hierarchy) -> Vec<(&'a str, &'a str)> {
        self.scannables
            .iter()
            .filter(|(_, address)| {
                file.dataset_info(address)
                    .is_some_and(|info| info.dtype.is_numeric())
            })
            .map(|(name, address)| (name.as_str(), address.as_str()))
            .collect()
    }

    fn read_column(file: &dyn Hierarchy, address: &str) -> Result<Vec<f64>> {
        let value = file.read(address, &Selection::All)?;
        let array = value
            .to_f64_array()
            .ok_or_else(|| Error::Shape(format!("{address} is not numeric")))?;
        Ok(array.iter().copied().collect())
    }

    /// Numeric scannables as a table with one row per scannable.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if the scannables differ in length, or a read
    /// error from the backend.
    pub fn get_scannables_array(&self, file: &dyn Hierarchy) -> Result<ScanTable> {
        let mut names = Vec::new();
        let mut data = Vec::new();
        let mut length = None;
        for (name, address) in self.numeric_scannables(file) {
            let column = Self::read_column(file, address)?;
            match length {
                None => length = Some(column.len()),
                Some(len) if len != column.len() => {
                    return Err(Error::Shape(format!(
                        "scannable {name} has {} points, expected {len}",
                        column.len()
                    )));
                }
                Some(_) => {}
            }
            names.push(name.to_string());
            data.extend(column);
        }
        let data = Array2::from_shape_vec((names.len(), length.unwrap_or(0)), data)
            .map_err(|err| Error::Shape(err.to_string()))?;
        Ok(ScanTable { names, data })
    }

    /// Numeric scannables rendered as delimited text, one line per point.
    ///
    /// Each column uses the `decimals` attribute of its dataset when present.
    ///
    /// # Errors
    /// Returns an error if a dataset cannot be read or the format is invalid.
    pub fn get_scannables_str(&self, file: &dyn Hierarchy, table: &TableFormat) -> Result<String> {
        let mut names = Vec::new();
        let mut columns = Vec::new();
        for (name, address) in self.numeric_scannables(file) {
            let decimals = self
                .get_attr(address, DECIMALS_ATTR)
                .and_then(AttrValue::as_i64)
                .and_then(|d| usize::try_from(d).ok())
                .unwrap_or(table.default_decimals);
            names.push(name);
            columns.push((table.spec(decimals), Self::read_column(file, address)?));
        }
        let mut lines = vec![names.join(&table.delimiter)];
        for row in 0..self.scannables_length() {
            let cells = columns
                .iter()
                .map(|(spec, column)| match column.get(row) {
                    Some(v) => format_value(&Value::float(*v), spec),
                    None => Ok(String::new()),
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            lines.push(cells.join(&table.delimiter));
        }
        Ok(lines.join("\n"))
    }

    /// Scannables and metadata of `file` in one bundle.
    ///
    /// # Errors
    /// Returns an error if the backend fails to read a dataset.
    pub fn get_data_block(&self, file: &dyn Hierarchy) -> Result<DataBlock> {
        Ok(DataBlock {
            filename: file.file_path().map(|p| p.display().to_string()),
            scannables: self.get_scannables(file)?,
            metadata: self.get_metadata(file, None)?,
        })
    }

    /// Read the default image at `selection`, squeezed.
    ///
    /// Without a selection the middle frame of the scan is read. `None` if
    /// no image address resolves or the file lacks it.
    ///
    /// # Errors
    /// Returns an error if the read fails or the frame index is out of range.
    pub fn get_image(&self, file: &dyn Hierarchy, selection: Option<Selection>) -> Result<Option<Value>> {
        let Some(address) = self.get_image_address() else {
            return Ok(None);
        };
        if file.dataset_info(address).is_none() {
            return Ok(None);
        }
        let selection = selection.unwrap_or_else(|| {
            Selection::Index(isize::try_from(self.scannables_length() / 2).unwrap_or(0))
        });
        debug_log!(self.config.debug, "image {address} at {selection:?}");
        Ok(Some(file.read(address, &selection)?.squeeze()))
    }

    /// Bind `names` for evaluation: the file's extra context, then
    /// `_<name>` address strings, then datasets read from `file`.
    fn scope(&self, file: &dyn Hierarchy, names: &[String]) -> Result<Scope> {
        let mut scope = file.extra_context();
        for name in names {
            if let Some(address) = self.combined.get(name) {
                if file.dataset_info(address).is_some() {
                    scope.insert(name.clone(), file.read(address, &Selection::All)?);
                }
            } else if let Some(address) = name.strip_prefix('_').and_then(|n| self.combined.get(n)) {
                scope.insert(name.clone(), Value::text(address.as_str()));
            }
        }
        debug_log!(
            self.config.debug,
            "scope: {:?}",
            scope.keys().collect::<Vec<_>>()
        );
        Ok(scope)
    }

    /// Evaluate an expression over the combined namespace.
    ///
    /// An expression that is itself the address of a dataset in `file` reads
    /// that dataset.
    ///
    /// # Errors
    /// Returns [`Error::Eval`] naming the unresolved identifier or describing
    /// the failure, or a read error from the backend.
    pub fn eval(&self, file: &dyn Hierarchy, expression: &str) -> Result<Value> {
        let expression = expression.trim();
        if file.dataset_info(expression).is_some() {
            return file.read(expression, &Selection::All);
        }
        let engine = &self.config.engine;
        let names = engine.identifiers(expression)?;
        let scope = self.scope(file, &names)?;
        debug_log!(self.config.debug, "eval: {expression}");
        Ok(engine.evaluate(expression, &scope)?)
    }

    /// Replace every `{expression:spec}` field of `template`.
    ///
    /// # Errors
    /// Returns [`Error::Eval`] if a field fails to evaluate or format.
    pub fn format(&self, file: &dyn Hierarchy, template: &str) -> Result<String> {
        let engine = &self.config.engine;
        let names = engine.template_identifiers(template)?;
        let scope = self.scope(file, &names)?;
        debug_log!(self.config.debug, "format: {template}");
        Ok(engine.format(template, &scope)?)
    }

    /// True if `name` is in the combined namespace.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.combined.contains_key(name)
    }

    /// Names of the combined namespace.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.combined.keys().map(String::as_str)
    }

    #[must_use]
    pub fn info_groups(&self) -> String {
        let mut out = format!("{}\nGroups:\n", self.header());
        for (address, group) in &self.groups {
            out.push_str(&format!(
                "{address} [{}: '{}']\n",
                group.class, group.name
            ));
            for name in &group.datasets {
                out.push_str(&format!("  {name}\n"));
            }
        }
        out
    }

    #[must_use]
    pub fn info_datasets(&self) -> String {
        let mut out = format!("{}\nDatasets:\n", self.header());
        for (address, record) in &self.datasets {
            out.push_str(&format!(
                "{address:>60}: {:<20} {:?}\n",
                record.name, record.shape
            ));
        }
        out
    }

    #[must_use]
    pub fn info_dataset_types(&self) -> String {
        let mut out = String::new();
        for (title, namespace) in [
            ("Values", &self.values),
            ("Arrays", &self.arrays),
            ("Scannables", &self.scannables),
            ("Image Data", &self.image_data),
        ] {
            let names: Vec<&str> = namespace.keys().map(String::as_str).collect();
            out.push_str(&format!("{title}: {}\n", names.join(", ")));
        }
        out
    }

    #[must_use]
    pub fn info_names(&self) -> String {
        let mut out = String::from("Combined Namespace:\n");
        for (name, address) in &self.combined {
            let shape = self.get_shape(address).unwrap_or_default();
            out.push_str(&format!("{name:>30}: {shape:?}: {address}\n"));
        }
        out
    }

    #[must_use]
    pub fn info_scannables(&self) -> String {
        let mut out = format!("Scannables (length {}):\n", self.scannables_length());
        for (name, address) in &self.scannables {
            let shape = self.get_shape(address).unwrap_or_default();
            out.push_str(&format!("{name:>30}: {shape:?}: {address}\n"));
        }
        out
    }

    fn header(&self) -> String {
        let filename = self
            .filename
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        format!("HdfMap based on '{filename}'")
    }
}

impl fmt::Display for HdfMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header())?;
        write!(f, "{}", self.info_names())
    }
}

impl Index<&str> for HdfMap {
    type Output = String;

    /// Address of `name` in the combined namespace.
    ///
    /// # Panics
    /// Panics if `name` is not in the combined namespace.
    fn index(&self, name: &str) -> &String {
        &self.combined[name]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;
    use crate::memory::MemoryFile;
    use approx::assert_relative_eq;
    use ndarray::{ArrayD, IxDyn};

    fn scan_file() -> MemoryFile {
        let mut file = MemoryFile::new().with_path("/data/12345.nxs");
        file.group("/entry").attr("NX_class", "NXentry");
        file.group("/entry/measurement").attr("NX_class", "NXdata");
        file.dataset("/entry/measurement/x", vec![1.0, 2.0, 3.0, 4.0, 5.0])
            .attr("decimals", 1_i64);
        file.dataset("/entry/measurement/y", vec![2.0, 4.0, 6.0, 8.0, 10.0]);
        file.dataset("/entry/temperature", 300.0);
        file.dataset("/entry/title", "scan x");
        let frames = ArrayD::from_shape_fn(IxDyn(&[5, 2, 2]), |idx| idx[0] as f64);
        file.dataset("/entry/instrument/pil3/data", Value::from(frames));
        file
    }

    fn scan_map(file: &MemoryFile) -> HdfMap {
        let mut map = HdfMap::new();
        map.populate(file);
        let size = map.most_common_size().unwrap();
        map.generate_scannables(size);
        map
    }

    #[test]
    fn test_get_address_order() {
        let file = scan_file();
        let map = scan_map(&file);
        assert_eq!(map.get_address("x"), Some("/entry/measurement/x"));
        assert_eq!(map.get_address("/entry/temperature"), Some("/entry/temperature"));
        assert_eq!(map.get_address("/entry"), Some("/entry"));
        assert_eq!(map.get_address("NXdata"), Some("/entry/measurement"));
        assert_eq!(map.get_address("pil3_data"), Some("/entry/instrument/pil3/data"));
        assert_eq!(map.get_address("nonexistent"), None);
    }

    #[test]
    fn test_get_group_address() {
        let file = scan_file();
        let map = scan_map(&file);
        assert_eq!(map.get_group_address("x"), Some("/entry/measurement"));
        assert_eq!(map.get_group_address("measurement"), Some("/entry/measurement"));
        assert_eq!(
            map.get_group_datasets("x").unwrap(),
            &["x".to_string(), "y".to_string()]
        );
        assert_eq!(map.get_group_address("nonexistent"), None);
    }

    #[test]
    fn test_get_data_absent_in_other_file() {
        let file = scan_file();
        let map = scan_map(&file);
        let other = MemoryFile::new();
        assert!(map.get_data(&other, "x", &Selection::All).unwrap().is_none());
        let fallback = map
            .get_data_or(&other, "x", &Selection::All, Value::float(-1.0))
            .unwrap();
        assert_eq!(fallback, Value::float(-1.0));
        let x = map.get_data(&file, "x", &Selection::Index(-1)).unwrap().unwrap();
        assert_eq!(x, Value::float(5.0));
    }

    #[test]
    fn test_metadata_overrides_extras() {
        let mut file = scan_file();
        file.dataset("/entry/filename", "override");
        let map = scan_map(&file);
        let metadata = map.get_metadata(&file, None).unwrap();
        assert_eq!(metadata.keys().next(), Some("filepath"));
        assert_eq!(metadata["filename"], Value::text("override"));
        assert_eq!(metadata["temperature"], Value::float(300.0));

        let empty = MemoryFile::new();
        let defaults = map.get_metadata(&empty, Some(&Value::float(0.0))).unwrap();
        assert_eq!(defaults["filepath"], Value::text("unknown"));
        assert_eq!(defaults["temperature"], Value::float(0.0));
        let skipped = map.get_metadata(&empty, None).unwrap();
        assert!(!skipped.contains("temperature"));
    }

    #[test]
    fn test_scannables_array() {
        let file = scan_file();
        let map = scan_map(&file);
        let table = map.get_scannables_array(&file).unwrap();
        assert_eq!(table.names, vec!["x", "y"]);
        assert_eq!(table.data.dim(), (2, 5));
        assert_relative_eq!(table.get("y").unwrap()[4], 10.0);
    }

    #[test]
    fn test_scannables_array_skips_booleans() {
        let mut file = MemoryFile::new();
        file.dataset("/entry/x", vec![1.0, 2.0, 3.0]);
        file.dataset(
            "/entry/flag",
            Value::from(ArrayD::from_shape_vec(IxDyn(&[3]), vec![true, false, true]).unwrap()),
        );
        let mut map = HdfMap::new();
        map.populate(&file);
        map.generate_scannables(3);
        assert!(map.scannables().contains_key("flag"));
        let table = map.get_scannables_array(&file).unwrap();
        assert_eq!(table.names, vec!["x"]);
        let text = map.get_scannables_str(&file, &TableFormat::default()).unwrap();
        assert_eq!(text.lines().next(), Some("x"));
    }

    #[test]
    fn test_scannables_str_uses_decimals() {
        let file = scan_file();
        let map = scan_map(&file);
        let table = TableFormat::default().with_default_decimals(2);
        let text = map.get_scannables_str(&file, &table).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "x, y");
        assert_eq!(lines[1], "1.0, 2.00");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_image_middle_frame() {
        let file = scan_file();
        let map = scan_map(&file);
        let image = map.get_image(&file, None).unwrap().unwrap();
        assert_eq!(image.shape(), &[2, 2]);
        assert_eq!(image.as_f64(), None);
        let first = map.get_image(&file, Some(Selection::Index(0))).unwrap().unwrap();
        assert_relative_eq!(first.to_f64_array().unwrap().sum(), 0.0);
        let middle = image.to_f64_array().unwrap();
        assert_relative_eq!(middle[[0, 0]], 2.0);
    }

    #[test]
    fn test_image_address_override() {
        let file = scan_file();
        let mut map = scan_map(&file);
        assert_eq!(map.get_image_address(), Some("/entry/instrument/pil3/data"));
        map.set_image_address(Some("x"));
        assert_eq!(map.get_image_address(), Some("/entry/measurement/x"));
        map.set_image_address(Some("nonexistent"));
        assert_eq!(map.get_image_address(), Some("/entry/measurement/x"));
        map.set_image_address(None);
        assert_eq!(map.get_image_address(), Some("/entry/instrument/pil3/data"));
        assert!(HdfMap::new().get_image(&file, None).unwrap().is_none());
    }

    #[test]
    fn test_eval_binds_names() {
        let file = scan_file();
        let map = scan_map(&file);
        let sum = map.eval(&file, "x + y").unwrap();
        assert_eq!(sum, Value::from(vec![3.0, 6.0, 9.0, 12.0, 15.0]));
        assert_eq!(map.eval(&file, "_x").unwrap(), Value::text("/entry/measurement/x"));
        assert_eq!(map.eval(&file, "filename").unwrap(), Value::text("12345.nxs"));
        assert_eq!(map.eval(&file, "/entry/temperature").unwrap(), Value::float(300.0));
        assert_eq!(map.eval(&file, "np.max(x)").unwrap(), Value::float(5.0));
    }

    #[test]
    fn test_eval_unresolved_name() {
        let file = scan_file();
        let map = scan_map(&file);
        match map.eval(&file, "x + missing") {
            Err(Error::Eval(EvalError::UnresolvedName(name))) => assert_eq!(name, "missing"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_format_template() {
        let file = scan_file();
        let map = scan_map(&file);
        assert_eq!(map.format(&file, "T={temperature:.1f}").unwrap(), "T=300.0");
        assert_eq!(
            map.format(&file, "{title}: {len(x)} points").unwrap(),
            "scan x: 5 points"
        );
    }

    #[test]
    fn test_attrs_and_find() {
        let file = scan_file();
        let map = scan_map(&file);
        assert_eq!(map.get_size("x"), Some(5));
        assert_eq!(map.get_shape("data"), Some(&[5, 2, 2][..]));
        assert_eq!(map.get_attr("x", "decimals"), Some(&AttrValue::Int(1)));
        assert_eq!(
            map.get_attr("NXentry", "NX_class").and_then(AttrValue::as_text).as_deref(),
            Some("NXentry")
        );
        assert_eq!(map.find("temp", true), vec!["/entry/temperature"]);
        assert_eq!(map.find("measurement", false).len(), 2);
        assert_eq!(map.find_attr("decimals"), vec!["/entry/measurement/x"]);
        assert_eq!(map.find_attr("NX_class"), vec!["/entry", "/entry/measurement"]);
    }

    #[test]
    fn test_map_access_and_display() {
        let file = scan_file();
        let map = scan_map(&file);
        assert!(map.contains("temperature"));
        assert_eq!(map["x"], "/entry/measurement/x");
        assert!(map.names().any(|n| n == "y"));
        let text = map.to_string();
        assert!(text.starts_with("HdfMap based on '/data/12345.nxs'"));
        assert!(text.contains("temperature"));
        assert!(map.info_dataset_types().contains("Scannables: x, y"));
        assert!(map.info_scannables().contains("length 5"));
        assert!(map.info_groups().contains("/entry/measurement [NXdata: 'measurement']"));
        assert!(map.info_datasets().contains("/entry/title"));
    }

    #[test]
    fn test_data_block() {
        let file = scan_file();
        let map = scan_map(&file);
        let block = map.get_data_block(&file).unwrap();
        assert_eq!(block.keys().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(block.metadata["title"], Value::text("scan x"));
        assert_eq!(block.filename.as_deref(), Some("/data/12345.nxs"));
    }
}
