//! Class name extraction from bundled native libraries.
//!
//! JNI code names Java classes by their slash-separated internal name
//! (`com/foo/Bar`) in `FindClass` calls and registration tables, sometimes
//! as full descriptors (`Lcom/foo/Bar;`). Both forms survive as plain strings
//! in the library's read-only data.

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::collections::BTreeSet;

static DESCRIPTOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"L([A-Za-z_$][A-Za-z0-9_$]*(?:/[A-Za-z_$][A-Za-z0-9_$]*)+);").unwrap()
});

static INTERNAL_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z_$][A-Za-z0-9_$]*(?:/[A-Za-z_$][A-Za-z0-9_$]*)+").unwrap()
});

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b == b'/'
}

/// Scans native library bytes for class names
pub struct NativeLibScanner;

impl NativeLibScanner {
    pub fn new() -> Self {
        Self
    }

    /// Every class name found in `bytes`, as type descriptors
    pub fn scan(&self, bytes: &[u8]) -> BTreeSet<String> {
        let descriptors = DESCRIPTOR_REGEX
            .captures_iter(bytes)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_bytes());

        // A name followed by ';' is the tail of a descriptor, possibly with a
        // primitive type code in front
        let internal_names = INTERNAL_NAME_REGEX
            .find_iter(bytes)
            .filter(|m| m.start() == 0 || !is_name_byte(bytes[m.start() - 1]))
            .filter(|m| bytes.get(m.end()) != Some(&b';'))
            .map(|m| m.as_bytes());

        descriptors
            .chain(internal_names)
            .filter_map(|name| std::str::from_utf8(name).ok())
            .map(|name| format!("L{};", name))
            .collect()
    }
}

impl Default for NativeLibScanner {
    fn default() -> Self {
        Self::new()
    }
}
