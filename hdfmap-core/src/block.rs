//! Containers returned by the bulk retrieval operations.

use std::ops::Index;

use indexmap::IndexMap;
use ndarray::{Array2, ArrayView1, Axis};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Ordered, immutable bundle of named values.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Record {
    items: IndexMap<String, Value>,
}

impl Record {
    /// Value stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.items.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// Names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consume the record, returning the underlying map.
    #[must_use]
    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.items
    }
}

impl From<IndexMap<String, Value>> for Record {
    fn from(items: IndexMap<String, Value>) -> Self {
        Self { items }
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl Index<&str> for Record {
    type Output = Value;

    fn index(&self, name: &str) -> &Value {
        &self.items[name]
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Scannables and metadata of one file.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DataBlock {
    /// File the block was read from.
    pub filename: Option<String>,
    pub scannables: Record,
    pub metadata: Record,
}

impl DataBlock {
    /// Scannable named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.scannables.get(name)
    }

    /// Scannable names.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.scannables.keys()
    }
}

impl Index<&str> for DataBlock {
    type Output = Value;

    fn index(&self, name: &str) -> &Value {
        &self.scannables[name]
    }
}

/// Numeric scannables as one table, one row per scannable.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanTable {
    pub names: Vec<String>,
    pub data: Array2<f64>,
}

impl ScanTable {
    /// Values of the scannable `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        let row = self.names.iter().position(|n| n == name)?;
        Some(self.data.index_axis(Axis(0), row))
    }

    /// Number of scan points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.ncols()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Layout of the text table produced by
/// [`HdfMap::get_scannables_str`](crate::HdfMap::get_scannables_str).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFormat {
    /// Column separator.
    pub delimiter: String,
    /// Minimum width of each value.
    pub width: Option<usize>,
    /// Float presentation: `f`, `e` or `g`.
    pub kind: char,
    /// Decimals used when a dataset has no `decimals` attribute.
    pub default_decimals: usize,
}

impl Default for TableFormat {
    fn default() -> Self {
        Self {
            delimiter: ", ".to_string(),
            width: None,
            kind: 'f',
            default_decimals: 8,
        }
    }
}

impl TableFormat {
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    #[must_use]
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: char) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_default_decimals(mut self, decimals: usize) -> Self {
        self.default_decimals = decimals;
        self
    }

    /// Format specifier for a column with `decimals` decimals.
    #[must_use]
    pub fn spec(&self, decimals: usize) -> String {
        let width = self.width.map(|w| w.to_string()).unwrap_or_default();
        format!("{width}.{decimals}{}", self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_record_access() {
        let record: Record = [
            ("a".to_string(), Value::int(1)),
            ("b".to_string(), Value::text("x")),
        ]
        .into_iter()
        .collect();
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(record["a"], Value::int(1));
        assert!(record.get("c").is_none());
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_scan_table_rows() {
        let table = ScanTable {
            names: vec!["x".into(), "y".into()],
            data: array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
        };
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("y").unwrap().to_vec(), vec![4.0, 5.0, 6.0]);
        assert!(table.get("z").is_none());
    }

    #[test]
    fn test_table_format_spec() {
        assert_eq!(TableFormat::default().spec(3), ".3f");
        assert_eq!(TableFormat::default().with_width(10).with_kind('e').spec(2), "10.2e");
    }
}
