//! `KeyPath` — dot-separated literal paths into decoded payloads.
//!
//! A key path walks objects by key and arrays by decimal index:
//! `"travelers.0.name"` reads the `name` of the first traveler. There are no
//! wildcards, filters or escapes.
//!
//! Resolution never fails loudly. A malformed path (`"a..b"`, `".a"`, `"a."`),
//! a missing key, an out-of-range index or a scalar in the middle of the path
//! all resolve to `None`.

use std::fmt;

use serde_json::Value;

use crate::SourceMap;

/// A parsed key path.
///
/// # Invariant
///
/// No segment is empty. An empty input parses to a path with no segments,
/// which resolves to the root itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// Parse a key path, returning `None` when any segment would be empty.
    ///
    /// ```
    /// use objmap::KeyPath;
    ///
    /// assert_eq!(KeyPath::parse("trainInfo.name").unwrap().len(), 2);
    /// assert!(KeyPath::parse("").unwrap().is_empty());
    /// assert!(KeyPath::parse("a..b").is_none());
    /// ```
    #[must_use]
    pub fn parse(path: &str) -> Option<Self> {
        if path.is_empty() {
            return Some(Self {
                segments: Vec::new(),
            });
        }
        let segments = path
            .split('.')
            .map(|s| (!s.is_empty()).then(|| s.to_owned()))
            .collect::<Option<Vec<_>>>()?;
        Some(Self { segments })
    }

    /// The path segments in order.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` for the empty path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Resolve this path against any value.
    ///
    /// The empty path returns `root` unchanged.
    #[must_use]
    pub fn resolve<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        self.segments
            .iter()
            .try_fold(root, |current, segment| step(current, segment))
    }

    /// Resolve this path against an object root.
    ///
    /// The empty path resolves to `None` here: an object root is not itself a
    /// [`Value`] that could be returned.
    #[must_use]
    pub fn resolve_in<'v>(&self, root: &'v SourceMap) -> Option<&'v Value> {
        let (first, rest) = self.segments.split_first()?;
        rest.iter()
            .try_fold(root.get(first)?, |current, segment| step(current, segment))
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

fn step<'v>(current: &'v Value, segment: &str) -> Option<&'v Value> {
    match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => items.get(parse_index(segment)?),
        _ => None,
    }
}

// `usize::from_str` accepts a leading '+', which is not an index.
fn parse_index(segment: &str) -> Option<usize> {
    if segment.bytes().all(|b| b.is_ascii_digit()) {
        segment.parse().ok()
    } else {
        None
    }
}

/// Resolve a key path string against a value.
///
/// Shorthand for [`KeyPath::parse`] followed by [`KeyPath::resolve`].
///
/// ```
/// use objmap::resolve;
/// use serde_json::json;
///
/// let source = json!({ "travelers": [{ "name": "A" }, { "name": "B" }] });
/// assert_eq!(resolve("travelers.1.name", &source), Some(&json!("B")));
/// assert_eq!(resolve("travelers.2.name", &source), None);
/// assert_eq!(resolve("travelers..name", &source), None);
/// ```
#[must_use]
pub fn resolve<'v>(path: &str, root: &'v Value) -> Option<&'v Value> {
    KeyPath::parse(path)?.resolve(root)
}
