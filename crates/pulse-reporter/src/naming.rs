//! Exported metric names: prefixes, type suffixes, percentile keys and the
//! delta-counter marker.

/// Marks a counter as a delta counter. Kept on the exported name.
pub const DELTA_PREFIX: &str = "\u{2206}";

/// Alternate spelling of [`DELTA_PREFIX`] (Greek capital delta).
pub const ALT_DELTA_PREFIX: &str = "\u{0394}";

/// Name under which a counter is exported as a delta counter.
///
/// Names that already carry either marker are returned unchanged.
pub fn delta_counter_name(name: &str) -> String {
    if has_delta_prefix(name) {
        name.to_string()
    } else {
        format!("{DELTA_PREFIX}{name}")
    }
}

pub fn has_delta_prefix(name: &str) -> bool {
    name.starts_with(DELTA_PREFIX) || name.starts_with(ALT_DELTA_PREFIX)
}

/// `name` without its delta marker, if any.
pub(crate) fn strip_delta_prefix(name: &str) -> &str {
    name.strip_prefix(DELTA_PREFIX)
        .or_else(|| name.strip_prefix(ALT_DELTA_PREFIX))
        .unwrap_or(name)
}

/// Builds `[prefix.]name[.suffix]*` names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameFormatter {
    prefix: String,
    add_suffix: bool,
}

impl NameFormatter {
    pub fn new(prefix: &str, add_suffix: bool) -> Self {
        Self {
            prefix: prefix.strip_suffix('.').unwrap_or(prefix).to_string(),
            add_suffix,
        }
    }

    /// Prefix is always applied; suffixes only when suffix mode is on.
    pub fn prepare(&self, name: &str, suffixes: &[&str]) -> String {
        let mut out = String::with_capacity(self.prefix.len() + name.len() + 8);
        if !self.prefix.is_empty() {
            out.push_str(&self.prefix);
            out.push('.');
        }
        out.push_str(name);
        if self.add_suffix {
            for suffix in suffixes {
                out.push('.');
                out.push_str(suffix);
            }
        }
        out
    }
}

/// `0.95` → `"95"`, `0.999` → `"999"`: `p * 100` with its first `.` removed.
pub fn percentile_key(p: f64) -> String {
    format!("{}", p * 100.0).replacen('.', "", 1)
}
