//! Key paths: dotted sequences of property names.
//!
//! A [`KeyPath`] is validated once at parse time and is never empty, so
//! anything built from one (a chain, for example) has at least one segment.

use std::fmt;
use std::str::FromStr;

use crate::error::{KvoError, Result};
use crate::value::Value;

/// Separator used when none is configured.
pub const DEFAULT_SEPARATOR: char = '.';

/// A validated, non-empty sequence of property names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<String>,
    separator: char,
}

impl KeyPath {
    /// Parse `path` using [`DEFAULT_SEPARATOR`].
    pub fn parse(path: &str) -> Result<Self> {
        Self::parse_with(path, DEFAULT_SEPARATOR)
    }

    /// Parse `path` split on `separator`.
    ///
    /// # Errors
    ///
    /// [`KvoError::InvalidArgument`] if `path` is empty or any segment is
    /// empty (leading, trailing or doubled separators).
    pub fn parse_with(path: &str, separator: char) -> Result<Self> {
        if path.is_empty() {
            return Err(KvoError::InvalidArgument {
                path: String::new(),
                reason: "path is empty",
            });
        }
        let segments: Vec<String> = path.split(separator).map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(KvoError::InvalidArgument {
                path: path.to_string(),
                reason: "path contains an empty segment",
            });
        }
        Ok(Self {
            segments,
            separator,
        })
    }

    /// Segment names, root first.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments. Always at least 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The final segment.
    #[must_use]
    pub fn leaf(&self) -> &str {
        // Parsing guarantees at least one segment.
        self.segments.last().map_or("", String::as_str)
    }

    #[must_use]
    pub fn separator(&self) -> char {
        self.separator
    }
}

impl FromStr for KeyPath {
    type Err = KvoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", self.separator)?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

/// Resolve `path` from `root` once, without observing anything.
///
/// Each step reads through the value's [`Source`](crate::value::Source);
/// once a step yields `Null` or an opaque scalar the rest of the path reads
/// as `Null`.
#[must_use]
pub fn get_path(root: &Value, path: &KeyPath) -> Value {
    path.segments
        .iter()
        .fold(root.clone(), |current, segment| current.get(segment))
}
