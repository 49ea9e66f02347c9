//! hdfmap-core: Address index and name namespace for hierarchical data files.
//!
//! An [`HdfMap`] walks a file once, records every group and dataset by
//! address, and sorts datasets into name-keyed namespaces (values, arrays,
//! scannables, image data and their combination). The populated map is then
//! used against any open file of the same layout to read data by short name
//! and to evaluate expressions and format templates.
//!
//! File access goes through the [`Hierarchy`] trait; [`MemoryFile`] is an
//! in-memory implementation, and file-backed ones live in `hdfmap-io`.
//!

/// `log::debug!` gated on a runtime flag.
macro_rules! debug_log {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            ::log::debug!($($arg)+);
        }
    };
}

pub mod address;
pub mod block;
pub mod config;
pub mod error;
pub mod eval;
pub mod hierarchy;
pub mod layout;
pub mod map;
pub mod memory;
mod namespace;
mod retrieval;
pub mod value;

pub use address::{build_address, name_from_address};
pub use block::{DataBlock, Record, ScanTable, TableFormat};
pub use config::MapConfig;
pub use error::{Error, EvalError, Result};
pub use eval::{Calculator, ExpressionEngine, Scope};
pub use hierarchy::{Child, DatasetInfo, Hierarchy, LinkKind, Node};
pub use layout::{GenericLayout, Layout, NexusLayout, NexusOptions};
pub use map::{DatasetRecord, GroupRecord, HdfMap, Namespace};
pub use memory::MemoryFile;
pub use retrieval::DECIMALS_ATTR;
pub use value::{AttrValue, Attributes, DType, Selection, Value};
