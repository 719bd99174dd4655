use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between the two stems of a noun pair key.
pub const PAIR_SEPARATOR: char = '$';

/// Ordered pair of noun stems: path start first, path end second.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NounPair {
    first: String,
    second: String,
}

impl NounPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    /// Parse the `stem1$stem2` key form. Both stems must be non-empty.
    pub fn parse(key: &str) -> Option<Self> {
        let (first, second) = key.split_once(PAIR_SEPARATOR)?;
        if first.is_empty() || second.is_empty() || second.contains(PAIR_SEPARATOR) {
            return None;
        }
        Some(Self::new(first, second))
    }
}

impl fmt::Display for NounPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.first, PAIR_SEPARATOR, self.second)
    }
}

/// Colon-joined POS tags from one noun to another, endpoints included.
/// Opaque as an aggregation key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyPath(String);

impl DependencyPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Tags along the path.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split(super::PATH_SEPARATOR)
    }
}

impl fmt::Display for DependencyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DependencyPath {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for DependencyPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
