//! Archive naming rules
//!
//! Two distinct transformations apply to stored names:
//!
//! - **Marker stripping** removes a trailing [`COMPRESSION_MARKER`] so that the
//!   compressed and plain representations of one segment map to the same key.
//! - **Normalization** drops everything from the first `.` onward and is used
//!   only to order names against a retention cutoff.

use std::collections::{BTreeMap, BTreeSet};

/// Suffix appended to the stored name of every gzip-compressed object
pub const COMPRESSION_MARKER: &str = ".gz";

/// Name under which the compressed representation of `name` is stored
pub fn compressed_name(name: &str) -> String {
    format!("{}{}", name, COMPRESSION_MARKER)
}

/// Remove a trailing compression marker, if present
pub fn strip_marker(name: &str) -> &str {
    name.strip_suffix(COMPRESSION_MARKER).unwrap_or(name)
}

/// Truncate a name at its first `.`
///
/// Idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(name: &str) -> &str {
    match name.find('.') {
        Some(idx) => &name[..idx],
        None => name,
    }
}

/// Map each logical archive name to the object that represents it
///
/// When two stored names strip to the same key, the one sorting last wins
/// (so `x.gz` shadows a bare `x`).
pub fn logical_names(names: &BTreeSet<String>) -> BTreeMap<&str, &str> {
    names
        .iter()
        .map(|stored| (strip_marker(stored), stored.as_str()))
        .collect()
}

/// Stored names whose normalized logical name sorts strictly before `cutoff`
pub fn retention_candidates(names: &BTreeSet<String>, cutoff: &str) -> Vec<String> {
    let cutoff = normalize(cutoff);
    logical_names(names)
        .into_iter()
        .filter(|(logical, _)| normalize(logical) < cutoff)
        .map(|(_, stored)| stored.to_string())
        .collect()
}
