//! HDF5 backend over the `hdf5` crate.

use std::path::{Path, PathBuf};

use hdf5::types::{FixedAscii, FixedUnicode, H5Type, TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{LinkInfo, LinkType, Location, LocationType};
use hdfmap_core::address::ROOT;
use hdfmap_core::hierarchy::{Child, DatasetInfo, LinkKind, Node};
use hdfmap_core::{AttrValue, Attributes, DType, Hierarchy, Selection, Value};
use ndarray::{ArrayD, IxDyn, SliceInfo, SliceInfoElem};

use crate::Result;

/// Longest fixed-length string read without truncation.
const FIXED_LEN: usize = 1024;

/// An HDF5 file opened read-only.
#[derive(Debug)]
pub struct Hdf5File {
    file: hdf5::File,
    path: PathBuf,
}

impl Hdf5File {
    /// Open a file for reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened as HDF5.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = hdf5::File::open(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

fn link_kind(info: &LinkInfo) -> LinkKind {
    match info.link_type {
        LinkType::Hard => LinkKind::Hard,
        LinkType::Soft => LinkKind::Soft,
        LinkType::External => LinkKind::External,
    }
}

fn dtype(descriptor: &TypeDescriptor) -> DType {
    match descriptor {
        TypeDescriptor::Float(_) => DType::Float,
        TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) | TypeDescriptor::Enum(_) => {
            DType::Int
        }
        TypeDescriptor::Boolean => DType::Bool,
        _ => DType::Text,
    }
}

fn read_array<T: H5Type>(
    dataset: &hdf5::Dataset,
    address: &str,
    selection: &Selection,
) -> hdfmap_core::Result<ArrayD<T>> {
    let read = match selection {
        Selection::All => dataset.read_dyn::<T>(),
        _ => {
            let elems = selection.to_elems(&dataset.shape())?;
            let info = SliceInfo::<Vec<SliceInfoElem>, IxDyn, IxDyn>::try_from(elems)
                .map_err(|err| hdfmap_core::Error::InvalidSelection(err.to_string()))?;
            dataset.read_slice::<T, _, IxDyn>(info)
        }
    };
    read.map_err(|err| hdfmap_core::Error::read(address, err))
}

fn read_text<T, F>(
    dataset: &hdf5::Dataset,
    address: &str,
    selection: &Selection,
    to_string: F,
) -> hdfmap_core::Result<Value>
where
    T: H5Type,
    F: Fn(&T) -> String,
{
    let array = read_array::<T>(dataset, address, selection)?;
    Ok(Value::Text(array.map(|s| to_string(s).trim_end_matches('\0').to_string())))
}

fn read_attr(location: &Location, name: &str) -> hdf5::Result<Option<AttrValue>> {
    let attr = location.attr(name)?;
    let scalar = attr.is_scalar();
    let value = match attr.dtype()?.to_descriptor()? {
        TypeDescriptor::Float(_) if scalar => AttrValue::Float(attr.read_scalar()?),
        TypeDescriptor::Float(_) => AttrValue::FloatArray(attr.read_raw()?),
        TypeDescriptor::Integer(_) if scalar => AttrValue::Int(attr.read_scalar()?),
        TypeDescriptor::Integer(_) => AttrValue::IntArray(attr.read_raw()?),
        TypeDescriptor::Unsigned(_) if scalar => AttrValue::UInt(attr.read_scalar()?),
        TypeDescriptor::Unsigned(_) => AttrValue::IntArray(
            attr.read_raw::<u64>()?
                .into_iter()
                .map(|v| i64::try_from(v).unwrap_or(i64::MAX))
                .collect(),
        ),
        TypeDescriptor::Boolean if scalar => AttrValue::Bool(attr.read_scalar()?),
        TypeDescriptor::VarLenUnicode if scalar => {
            AttrValue::String(attr.read_scalar::<VarLenUnicode>()?.to_string())
        }
        TypeDescriptor::VarLenUnicode => AttrValue::StringArray(
            attr.read_raw::<VarLenUnicode>()?.iter().map(ToString::to_string).collect(),
        ),
        TypeDescriptor::VarLenAscii if scalar => {
            AttrValue::String(attr.read_scalar::<VarLenAscii>()?.to_string())
        }
        TypeDescriptor::VarLenAscii => AttrValue::StringArray(
            attr.read_raw::<VarLenAscii>()?.iter().map(ToString::to_string).collect(),
        ),
        TypeDescriptor::FixedAscii(_) if scalar => {
            AttrValue::Bytes(attr.read_scalar::<FixedAscii<FIXED_LEN>>()?.as_bytes().to_vec())
        }
        TypeDescriptor::FixedAscii(_) => AttrValue::StringArray(
            attr.read_raw::<FixedAscii<FIXED_LEN>>()?
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
        ),
        TypeDescriptor::FixedUnicode(_) if scalar => {
            AttrValue::String(attr.read_scalar::<FixedUnicode<FIXED_LEN>>()?.as_str().to_string())
        }
        TypeDescriptor::FixedUnicode(_) => AttrValue::StringArray(
            attr.read_raw::<FixedUnicode<FIXED_LEN>>()?
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
        ),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn read_attrs(location: &Location) -> hdf5::Result<Attributes> {
    let mut attrs = Attributes::new();
    for name in location.attr_names()? {
        match read_attr(location, &name) {
            Ok(Some(value)) => {
                attrs.insert(name, value);
            }
            Ok(None) => log::debug!("{}: attribute {name} has an unsupported type", location.name()),
            Err(err) => log::debug!("{}: attribute {name} unreadable: {err}", location.name()),
        }
    }
    Ok(attrs)
}

impl Hierarchy for Hdf5File {
    fn file_path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn children(&self, address: &str) -> Vec<Child> {
        let Ok(group) = self.file.group(address) else {
            return Vec::new();
        };
        group
            .iter_visit_default(Vec::new(), |_, name, info, children: &mut Vec<Child>| {
                children.push(Child {
                    name: name.to_string(),
                    link: link_kind(&info),
                });
                true
            })
            .unwrap_or_default()
    }

    fn node(&self, address: &str) -> Option<Node> {
        if address == ROOT {
            return Some(Node::Group);
        }
        if !self.file.link_exists(address) {
            return None;
        }
        match self.file.loc_type_by_name(address) {
            Ok(LocationType::Group) => Some(Node::Group),
            Ok(LocationType::Dataset) => {
                let dataset = self.file.dataset(address).ok()?;
                let descriptor = dataset.dtype().and_then(|t| t.to_descriptor()).ok()?;
                Some(Node::Dataset(DatasetInfo {
                    shape: dataset.shape(),
                    dtype: dtype(&descriptor),
                }))
            }
            Ok(_) => None,
            Err(_) => Some(Node::UnresolvedLink),
        }
    }

    fn attrs(&self, address: &str) -> hdfmap_core::Result<Attributes> {
        let attrs = match self.file.group(address) {
            Ok(group) => read_attrs(&group),
            Err(_) => self
                .file
                .dataset(address)
                .and_then(|dataset| read_attrs(&dataset)),
        };
        attrs.map_err(|err| hdfmap_core::Error::read(address, err))
    }

    fn read(&self, address: &str, selection: &Selection) -> hdfmap_core::Result<Value> {
        let dataset = self
            .file
            .dataset(address)
            .map_err(|err| hdfmap_core::Error::read(address, err))?;
        let descriptor = dataset
            .dtype()
            .and_then(|t| t.to_descriptor())
            .map_err(|err| hdfmap_core::Error::read(address, err))?;
        match descriptor {
            TypeDescriptor::Float(_) => Ok(Value::Float(read_array(&dataset, address, selection)?)),
            TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) | TypeDescriptor::Enum(_) => {
                Ok(Value::Int(read_array(&dataset, address, selection)?))
            }
            TypeDescriptor::Boolean => Ok(Value::Bool(read_array(&dataset, address, selection)?)),
            TypeDescriptor::VarLenUnicode => {
                read_text::<VarLenUnicode, _>(&dataset, address, selection, ToString::to_string)
            }
            TypeDescriptor::VarLenAscii => {
                read_text::<VarLenAscii, _>(&dataset, address, selection, ToString::to_string)
            }
            TypeDescriptor::FixedAscii(_) => read_text::<FixedAscii<FIXED_LEN>, _>(
                &dataset,
                address,
                selection,
                |s| s.as_str().to_string(),
            ),
            TypeDescriptor::FixedUnicode(_) => read_text::<FixedUnicode<FIXED_LEN>, _>(
                &dataset,
                address,
                selection,
                |s| s.as_str().to_string(),
            ),
            other => Err(hdfmap_core::Error::read(
                address,
                format!("unsupported dataset type {other:?}"),
            )),
        }
    }
}
