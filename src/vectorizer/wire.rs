//! Text encoding of pass-1 keys, values and output lines.
//!
//! ```text
//! pair key        anim$dog
//! path key        NN:VB:NN
//! path count      NN:VB:NN#3
//! count list      NN:VB:NN#3@NN:IN:NN#1
//! catalog record  **<TAB>NN:VB:NN
//! ```

use std::collections::BTreeMap;
use std::fmt;

use crate::error::WireError;
use crate::ngram::{DependencyPath, NounPair};

/// Separates a dependency path from its occurrence count.
pub const COUNT_DELIMITER: char = '#';
/// Separates `(path, count)` fragments within one value.
pub const FRAGMENT_DELIMITER: char = '@';
/// Key under which accepted catalog paths are emitted.
pub const CATALOG_KEY: &str = "**";

/// Marker key for catalog-membership records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CatalogKey;

impl fmt::Display for CatalogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(CATALOG_KEY)
    }
}

/// Shuffle key of the vocabulary pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VocabularyKey {
    Pair(NounPair),
    Path(DependencyPath),
}

impl fmt::Display for VocabularyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pair(pair) => pair.fmt(f),
            Self::Path(path) => path.fmt(f),
        }
    }
}

/// One `path#count` fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathCount {
    pub path: DependencyPath,
    pub count: u64,
}

impl PathCount {
    pub fn new(path: DependencyPath, count: u64) -> Self {
        Self { path, count }
    }

    pub fn parse(fragment: &str) -> Result<Self, WireError> {
        let malformed = || WireError::Fragment {
            fragment: fragment.to_string(),
        };
        let (path, count) = fragment.rsplit_once(COUNT_DELIMITER).ok_or_else(malformed)?;
        if path.is_empty() {
            return Err(malformed());
        }
        let count = count.parse::<u64>().map_err(|_| malformed())?;
        Ok(Self::new(DependencyPath::from(path), count))
    }
}

impl fmt::Display for PathCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.path, COUNT_DELIMITER, self.count)
    }
}

/// Per-pair occurrence counts, one entry per distinct path, ordered by path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PathCounts(Vec<PathCount>);

impl PathCounts {
    /// Sum counts per distinct path.
    pub fn from_fragments<I>(fragments: I) -> Self
    where
        I: IntoIterator<Item = PathCount>,
    {
        let mut sums: BTreeMap<DependencyPath, u64> = BTreeMap::new();
        for fragment in fragments {
            *sums.entry(fragment.path).or_insert(0) += fragment.count;
        }
        Self(
            sums.into_iter()
                .map(|(path, count)| PathCount::new(path, count))
                .collect(),
        )
    }

    pub fn parse(value: &str) -> Result<Self, WireError> {
        let fragments = value
            .split(FRAGMENT_DELIMITER)
            .filter(|f| !f.is_empty())
            .map(PathCount::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_fragments(fragments))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathCount> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn count_of(&self, path: &DependencyPath) -> u64 {
        self.0
            .binary_search_by(|pc| pc.path.cmp(path))
            .map(|i| self.0[i].count)
            .unwrap_or(0)
    }
}

impl fmt::Display for PathCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, fragment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{FRAGMENT_DELIMITER}")?;
            }
            fragment.fmt(f)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a PathCounts {
    type Item = &'a PathCount;
    type IntoIter = std::slice::Iter<'a, PathCount>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Shuffle value of the vocabulary pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VocabularyValue {
    /// Under a path key: a pair the path connects.
    Pair(NounPair),
    /// Under a pair key: occurrences of one path.
    PathCount(PathCount),
    /// Under a pair key: summed occurrences of every path.
    PathCounts(PathCounts),
}

impl fmt::Display for VocabularyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pair(pair) => pair.fmt(f),
            Self::PathCount(pc) => pc.fmt(f),
            Self::PathCounts(pcs) => pcs.fmt(f),
        }
    }
}

/// A line of pass-1 output, the input of the vectorizer pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VocabularyRecord {
    /// `stem1$stem2 <TAB> path#n@path#n...`
    PairCounts { pair: NounPair, counts: PathCounts },
    /// `** <TAB> path`
    CatalogPath(DependencyPath),
}

impl VocabularyRecord {
    pub fn to_line(&self) -> String {
        self.to_string()
    }

    pub fn parse_line(line: &str) -> Result<Self, WireError> {
        let (key, value) = line.split_once('\t').ok_or_else(|| WireError::MissingTab {
            line: line.to_string(),
        })?;
        if key == CATALOG_KEY {
            if value.is_empty() {
                return Err(WireError::EmptyPath);
            }
            return Ok(Self::CatalogPath(DependencyPath::from(value)));
        }
        let pair = NounPair::parse(key).ok_or_else(|| WireError::Pair { key: key.to_string() })?;
        Ok(Self::PairCounts {
            pair,
            counts: PathCounts::parse(value)?,
        })
    }
}

impl fmt::Display for VocabularyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PairCounts { pair, counts } => write!(f, "{pair}\t{counts}"),
            Self::CatalogPath(path) => write!(f, "{CATALOG_KEY}\t{path}"),
        }
    }
}
