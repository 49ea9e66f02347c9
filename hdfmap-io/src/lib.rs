//! hdfmap-io: File backends and multi-file helpers for hdfmap.
//!
//! This crate provides [`Hierarchy`](hdfmap_core::Hierarchy) implementations
//! for JSON snapshots and, with the `hdf5` feature, for HDF5/NeXus files,
//! plus one-call map builders and helpers that apply a map to many files.
//!

mod error;
pub mod files;
#[cfg(feature = "hdf5")]
pub mod hdf5;
pub mod json;

pub use error::{Error, Result};
pub use files::{
    create_hdf_map, create_nexus_map, hdf_data, hdf_eval, hdf_format, hdf_image, list_files,
    nexus_data_block, open_file, DEFAULT_EXTENSION, EXTENSIONS,
};
#[cfg(feature = "hdf5")]
pub use hdf5::Hdf5File;
pub use json::JsonFile;
