//! Data values read from datasets and attributes.

use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;
use ndarray::{Array1, ArrayD, ArrayViewD, Axis, IxDyn, SliceInfo, SliceInfoElem};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Attributes of a group or dataset, in file order.
pub type Attributes = IndexMap<String, AttrValue>;

/// Value of a single attribute.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AttrValue {
    Float(f64),
    Int(i64),
    UInt(u64),
    Bool(bool),
    String(String),
    /// Fixed-length or ASCII strings that were not decoded by the backend.
    Bytes(Vec<u8>),
    FloatArray(Vec<f64>),
    IntArray(Vec<i64>),
    StringArray(Vec<String>),
}

impl AttrValue {
    /// Text content, decoding byte strings.
    #[must_use]
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::String(s) => Some(Cow::Borrowed(s)),
            Self::Bytes(b) => Some(String::from_utf8_lossy(b)),
            _ => None,
        }
    }

    /// Text content, or the first element of a string array.
    #[must_use]
    pub fn first_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::StringArray(items) => items.first().map(|s| Cow::Borrowed(s.as_str())),
            other => other.as_text(),
        }
    }

    /// Numeric content of a scalar attribute.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::UInt(v) => Some(*v as f64),
            Self::Bool(v) => Some(f64::from(u8::from(*v))),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Integer content of a scalar attribute.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            Self::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => f.write_str(&format_float(*v)),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Bool(v) => f.write_str(if *v { "True" } else { "False" }),
            Self::String(s) => f.write_str(s),
            Self::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            Self::FloatArray(items) => write_list(f, items.iter().map(|v| format_float(*v))),
            Self::IntArray(items) => write_list(f, items.iter().map(ToString::to_string)),
            Self::StringArray(items) => write_list(f, items.iter().map(|s| format!("'{s}'"))),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<&str>> for AttrValue {
    fn from(value: Vec<&str>) -> Self {
        Self::StringArray(value.into_iter().map(str::to_string).collect())
    }
}

/// Element kind of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DType {
    Float,
    Int,
    Bool,
    Text,
}

impl DType {
    /// True for number kinds. Booleans are not numbers.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Float | Self::Int)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Float => "float64",
            Self::Int => "int64",
            Self::Bool => "bool",
            Self::Text => "str",
        })
    }
}

/// N-dimensional dataset content. Scalars are 0-d arrays.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    Float(ArrayD<f64>),
    Int(ArrayD<i64>),
    Bool(ArrayD<bool>),
    Text(ArrayD<String>),
}

impl Value {
    /// Scalar float.
    #[must_use]
    pub fn float(value: f64) -> Self {
        Self::Float(ArrayD::from_elem(IxDyn(&[]), value))
    }

    /// Scalar integer.
    #[must_use]
    pub fn int(value: i64) -> Self {
        Self::Int(ArrayD::from_elem(IxDyn(&[]), value))
    }

    /// Scalar boolean.
    #[must_use]
    pub fn bool(value: bool) -> Self {
        Self::Bool(ArrayD::from_elem(IxDyn(&[]), value))
    }

    /// Scalar text.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(ArrayD::from_elem(IxDyn(&[]), value.into()))
    }

    /// Element kind.
    #[must_use]
    pub fn dtype(&self) -> DType {
        match self {
            Self::Float(_) => DType::Float,
            Self::Int(_) => DType::Int,
            Self::Bool(_) => DType::Bool,
            Self::Text(_) => DType::Text,
        }
    }

    /// Dimension sizes; empty for scalars.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Float(a) => a.shape(),
            Self::Int(a) => a.shape(),
            Self::Bool(a) => a.shape(),
            Self::Text(a) => a.shape(),
        }
    }

    /// Number of dimensions.
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Total number of elements.
    #[must_use]
    pub fn size(&self) -> usize {
        self.shape().iter().product()
    }

    /// True for 0-d values.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.ndim() == 0
    }

    /// Numeric content converted to `f64`; `None` for text.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64_array(&self) -> Option<ArrayD<f64>> {
        match self {
            Self::Float(a) => Some(a.clone()),
            Self::Int(a) => Some(a.mapv(|v| v as f64)),
            Self::Bool(a) => Some(a.mapv(|v| f64::from(u8::from(v)))),
            Self::Text(_) => None,
        }
    }

    /// Single numeric value of a one-element value.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        if self.size() != 1 {
            return None;
        }
        self.to_f64_array().and_then(|a| a.iter().next().copied())
    }

    /// Single integer value of a one-element integer or boolean value.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        if self.size() != 1 {
            return None;
        }
        match self {
            Self::Int(a) => a.iter().next().copied(),
            Self::Bool(a) => a.iter().next().map(|v| i64::from(*v)),
            _ => None,
        }
    }

    /// Text of a one-element text value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(a) if a.len() == 1 => a.iter().next().map(String::as_str),
            _ => None,
        }
    }

    /// Apply a selection, returning an owned value.
    ///
    /// # Errors
    /// Returns an error if the selection does not fit this value.
    pub fn select(&self, selection: &Selection) -> Result<Self> {
        Ok(match self {
            Self::Float(a) => Self::Float(select_array(a, selection)?),
            Self::Int(a) => Self::Int(select_array(a, selection)?),
            Self::Bool(a) => Self::Bool(select_array(a, selection)?),
            Self::Text(a) => Self::Text(select_array(a, selection)?),
        })
    }

    /// Remove all axes of length one.
    #[must_use]
    pub fn squeeze(self) -> Self {
        match self {
            Self::Float(a) => Self::Float(squeeze_array(a)),
            Self::Int(a) => Self::Int(squeeze_array(a)),
            Self::Bool(a) => Self::Bool(squeeze_array(a)),
            Self::Text(a) => Self::Text(squeeze_array(a)),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::float(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(value: Vec<f64>) -> Self {
        Self::Float(Array1::from(value).into_dyn())
    }
}

impl From<Vec<i64>> for Value {
    fn from(value: Vec<i64>) -> Self {
        Self::Int(Array1::from(value).into_dyn())
    }
}

impl From<ArrayD<f64>> for Value {
    fn from(value: ArrayD<f64>) -> Self {
        Self::Float(value)
    }
}

impl From<ArrayD<i64>> for Value {
    fn from(value: ArrayD<i64>) -> Self {
        Self::Int(value)
    }
}

impl From<ArrayD<bool>> for Value {
    fn from(value: ArrayD<bool>) -> Self {
        Self::Bool(value)
    }
}

impl From<ArrayD<String>> for Value {
    fn from(value: ArrayD<String>) -> Self {
        Self::Text(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(a) => write_array(f, a.view(), |v| format_float(*v)),
            Self::Int(a) => write_array(f, a.view(), ToString::to_string),
            Self::Bool(a) => write_array(f, a.view(), |v| {
                if *v { "True" } else { "False" }.to_string()
            }),
            Self::Text(a) if a.ndim() == 0 => f.write_str(a.iter().next().map_or("", String::as_str)),
            Self::Text(a) => write_array(f, a.view(), |s| format!("'{s}'")),
        }
    }
}

/// Region of a dataset to read.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Selection {
    /// The whole dataset.
    #[default]
    All,
    /// One position along the first axis; negative values count from the end.
    Index(isize),
    /// General per-axis slicing; missing trailing axes are taken whole.
    Slice(Vec<SliceInfoElem>),
}

impl Selection {
    /// Per-axis elements for a dataset with `ndim` dimensions, validated
    /// against `shape`.
    ///
    /// # Errors
    /// Returns an error if an index or range falls outside `shape`.
    pub fn to_elems(&self, shape: &[usize]) -> Result<Vec<SliceInfoElem>> {
        let mut elems = match self {
            Self::All => Vec::new(),
            Self::Index(index) => vec![SliceInfoElem::Index(*index)],
            Self::Slice(elems) => elems.clone(),
        };
        let mut axis = 0;
        for elem in &elems {
            match *elem {
                SliceInfoElem::NewAxis => continue,
                SliceInfoElem::Index(index) => {
                    let len = axis_len(shape, axis)?;
                    resolve_index(index, axis, len)?;
                }
                SliceInfoElem::Slice { start, end, step } => {
                    let len = axis_len(shape, axis)?;
                    if step == 0 {
                        return Err(Error::InvalidSelection("slice step cannot be zero".into()));
                    }
                    resolve_bound(start, axis, len)?;
                    if let Some(end) = end {
                        resolve_bound(end, axis, len)?;
                    }
                }
            }
            axis += 1;
        }
        elems.extend((axis..shape.len()).map(|_| SliceInfoElem::from(..)));
        Ok(elems)
    }
}

impl From<isize> for Selection {
    fn from(index: isize) -> Self {
        Self::Index(index)
    }
}

impl From<Vec<SliceInfoElem>> for Selection {
    fn from(elems: Vec<SliceInfoElem>) -> Self {
        Self::Slice(elems)
    }
}

fn axis_len(shape: &[usize], axis: usize) -> Result<usize> {
    shape.get(axis).copied().ok_or_else(|| {
        Error::InvalidSelection(format!(
            "too many indices for value with {} dimensions",
            shape.len()
        ))
    })
}

/// Resolve a possibly negative index against an axis length.
///
/// # Errors
/// Returns `IndexOutOfBounds` if the index lies outside the axis.
pub fn resolve_index(index: isize, axis: usize, len: usize) -> Result<usize> {
    let out_of_bounds = || Error::IndexOutOfBounds { index, axis, len };
    let resolved = if index < 0 {
        len.checked_sub(index.unsigned_abs()).ok_or_else(out_of_bounds)?
    } else {
        index.unsigned_abs()
    };
    if resolved >= len {
        return Err(out_of_bounds());
    }
    Ok(resolved)
}

fn resolve_bound(bound: isize, axis: usize, len: usize) -> Result<usize> {
    let resolved = if bound < 0 {
        len.checked_sub(bound.unsigned_abs())
    } else {
        Some(bound.unsigned_abs()).filter(|b| *b <= len)
    };
    resolved.ok_or(Error::IndexOutOfBounds {
        index: bound,
        axis,
        len,
    })
}

fn select_array<T: Clone>(array: &ArrayD<T>, selection: &Selection) -> Result<ArrayD<T>> {
    match selection {
        Selection::All => Ok(array.clone()),
        Selection::Index(index) => {
            if array.ndim() == 0 {
                return Err(Error::InvalidSelection("cannot index a scalar".into()));
            }
            let i = resolve_index(*index, 0, array.len_of(Axis(0)))?;
            Ok(array.index_axis(Axis(0), i).to_owned())
        }
        Selection::Slice(_) => {
            let elems = selection.to_elems(array.shape())?;
            let info = SliceInfo::<Vec<SliceInfoElem>, IxDyn, IxDyn>::try_from(elems)
                .map_err(|e| Error::InvalidSelection(e.to_string()))?;
            Ok(array.slice(&info).to_owned())
        }
    }
}

fn squeeze_array<T>(mut array: ArrayD<T>) -> ArrayD<T> {
    for axis in (0..array.ndim()).rev() {
        if array.len_of(Axis(axis)) == 1 {
            array = array.index_axis_move(Axis(axis), 0);
        }
    }
    array
}

/// Shortest round-trip text of a float, as Python prints it: integral
/// values keep `.0` and very large or small magnitudes use an exponent.
pub(crate) fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let text = format!("{value:e}");
    let Some((mantissa, exp)) = text.split_once('e') else {
        return format!("{value}");
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    if !(-4..16).contains(&exp) {
        return format!("{mantissa}{}", exponent_suffix(exp));
    }
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Python style exponent: sign and at least two digits.
pub(crate) fn exponent_suffix(exp: i32) -> String {
    let sign = if exp < 0 { '-' } else { '+' };
    format!("e{sign}{:02}", exp.unsigned_abs())
}

fn write_list<I>(f: &mut fmt::Formatter<'_>, items: I) -> fmt::Result
where
    I: Iterator<Item = String>,
{
    f.write_str("[")?;
    for (n, item) in items.enumerate() {
        if n > 0 {
            f.write_str(", ")?;
        }
        f.write_str(&item)?;
    }
    f.write_str("]")
}

fn write_array<T, F>(f: &mut fmt::Formatter<'_>, array: ArrayViewD<'_, T>, fmt_elem: F) -> fmt::Result
where
    F: Fn(&T) -> String + Copy,
{
    if array.ndim() == 0 {
        return match array.iter().next() {
            Some(v) => f.write_str(&fmt_elem(v)),
            None => Ok(()),
        };
    }
    f.write_str("[")?;
    for (n, sub) in array.outer_iter().enumerate() {
        if n > 0 {
            f.write_str(" ")?;
        }
        write_array(f, sub, fmt_elem)?;
    }
    f.write_str("]")
}
