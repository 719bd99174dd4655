use std::io::{Read, Write};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::ngram::DependencyPath;
use crate::vectorizer::wire::VocabularyRecord;

/// Frozen, ordered set of dependency paths accepted by the vocabulary pass.
///
/// Paths are sorted lexicographically when the catalog is frozen, so a path's
/// index is a pure function of the catalog contents. The index is the slot
/// of that path in every feature vector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    paths: IndexSet<DependencyPath>,
}

impl Catalog {
    /// Freeze a catalog from accepted paths in any order. Duplicates collapse.
    pub fn freeze<I>(paths: I) -> Self
    where
        I: IntoIterator<Item = DependencyPath>,
    {
        let mut sorted: Vec<DependencyPath> = paths.into_iter().collect();
        sorted.sort_unstable();
        sorted.dedup();
        Self {
            paths: sorted.into_iter().collect(),
        }
    }

    /// Collect the `**` records out of pass-1 output.
    pub fn collect<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a VocabularyRecord>,
    {
        Self::freeze(records.into_iter().filter_map(|record| match record {
            VocabularyRecord::CatalogPath(path) => Some(path.clone()),
            VocabularyRecord::PairCounts { .. } => None,
        }))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    #[inline]
    pub fn index_of(&self, path: &DependencyPath) -> Option<usize> {
        self.paths.get_index_of(path)
    }

    pub fn get(&self, index: usize) -> Option<&DependencyPath> {
        self.paths.get_index(index)
    }

    pub fn contains(&self, path: &DependencyPath) -> bool {
        self.paths.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DependencyPath> {
        self.paths.iter()
    }

    /// Fail unless the published feature count matches this catalog.
    pub fn check_published(&self, published: usize) -> Result<(), CatalogError> {
        if published != self.len() {
            return Err(CatalogError::Inconsistent {
                published,
                actual: self.len(),
            });
        }
        Ok(())
    }

    pub fn write_cbor<W: Write>(&self, writer: W) -> Result<(), CatalogError> {
        serde_cbor::to_writer(writer, self).map_err(|e| CatalogError::Codec {
            message: e.to_string(),
        })
    }

    pub fn read_cbor<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let catalog: Self = serde_cbor::from_reader(reader).map_err(|e| CatalogError::Codec {
            message: e.to_string(),
        })?;
        // artifact order is not trusted
        Ok(Self::freeze(catalog.paths))
    }
}

/// Text form of the published catalog size.
pub fn format_feature_count(count: usize) -> String {
    format!("{count}\n")
}

pub fn parse_feature_count(content: &str) -> Result<usize, CatalogError> {
    content
        .trim()
        .parse::<usize>()
        .map_err(|_| CatalogError::FeatureCount {
            content: content.trim().to_string(),
        })
}
