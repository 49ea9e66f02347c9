//! Address and name utilities.
//!
//! An *address* is the absolute, `/`-separated location of an object in a
//! file (`/entry/measurement/x`). A *name* is the short identifier derived
//! from the final segment of an address, usable as a variable name.

/// Address separator.
pub const SEP: char = '/';

/// Address of the root group.
pub const ROOT: &str = "/";

/// Segment replaced by its parent when deriving names (`.../energy/value`).
const VALUE_SEGMENT: &str = "value";

/// Convert an address (or any `/`-separated path) into a name.
///
/// Dots are replaced with underscores, the last segment is taken, and a
/// last segment of `value` is replaced by its parent segment.
///
/// ```
/// use hdfmap_core::address::name_from_address;
/// assert_eq!(name_from_address("/entry/measurement/x"), "x");
/// assert_eq!(name_from_address("/entry/sample/energy/value"), "energy");
/// assert_eq!(name_from_address("/entry/mono.en"), "mono_en");
/// ```
#[must_use]
pub fn name_from_address(address: &str) -> String {
    let address = address.replace('.', "_");
    let trimmed = address.trim_end_matches(SEP);
    let mut segments = trimmed.rsplit(SEP);
    let last = segments.next().unwrap_or_default();
    if last == VALUE_SEGMENT {
        if let Some(parent) = segments.next().filter(|s| !s.is_empty()) {
            return parent.to_string();
        }
    }
    last.to_string()
}

/// Join path segments into a canonical absolute address.
///
/// Each segment is stripped of leading and trailing separators; empty
/// segments are dropped.
///
/// ```
/// use hdfmap_core::address::build_address;
/// assert_eq!(build_address(["entry", "/measurement/"]), "/entry/measurement");
/// assert_eq!(build_address(["/entry/measurement", "x"]), "/entry/measurement/x");
/// ```
#[must_use]
pub fn build_address<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut address = String::new();
    for segment in segments {
        let segment = segment.as_ref().trim_matches(SEP);
        if segment.is_empty() {
            continue;
        }
        address.push(SEP);
        address.push_str(segment);
    }
    if address.is_empty() {
        address.push(SEP);
    }
    address
}

/// Address of `key` inside the group at `parent`.
#[must_use]
pub fn child_address(parent: &str, key: &str) -> String {
    build_address([parent, key])
}

/// Address of the group containing `address`, or `None` for the root.
#[must_use]
pub fn parent_address(address: &str) -> Option<&str> {
    let trimmed = address.trim_end_matches(SEP);
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind(SEP) {
        Some(0) => Some(ROOT),
        Some(idx) => Some(&trimmed[..idx]),
        None => None,
    }
}

/// Name of the group containing `address` (used to qualify detector data).
#[must_use]
pub fn parent_name(address: &str) -> &str {
    parent_address(address)
        .and_then(|parent| parent.rsplit(SEP).next())
        .unwrap_or_default()
}

/// True if `text` looks like an absolute address rather than a name.
#[must_use]
pub fn is_address(text: &str) -> bool {
    text.starts_with(SEP)
}
