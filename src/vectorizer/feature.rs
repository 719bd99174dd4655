//! Pass 2: feature vectors joined against gold labels.

use std::fmt;

use num::{Bounded, Num, NumCast};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::engine::{Mapper, Reducer, TaskContext};
use crate::error::TaskError;
use crate::ngram::NounPair;
use crate::vectorizer::catalog::Catalog;
use crate::vectorizer::hypernym::HypernymTable;
use crate::vectorizer::wire::{PathCounts, VocabularyRecord};

/// Job counter: pairs with a gold label, one output row each.
pub const LABELED_PAIRS: &str = "labeled_pairs";
/// Job counter: pairs with no gold label, dropped.
pub const UNLABELED_PAIRS: &str = "unlabeled_pairs";
/// Job counter: path occurrences whose path is not in the catalog.
pub const UNCATALOGED_PATHS: &str = "uncataloged_paths";
/// Job counter: catalog records skipped by the pass-2 mapper.
pub const CATALOG_RECORDS: &str = "catalog_records";

/// Dense occurrence counts of one noun pair, one slot per catalog path.
///
/// `N` defaults to `u64`. [`quantize`](FeatureVector::quantize) converts to a
/// narrower numeric type, saturating at its maximum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureVector<N = u64>
where
    N: Num + Copy,
{
    values: Vec<N>,
}

impl<N> FeatureVector<N>
where
    N: Num + Copy,
{
    pub fn zeros(len: usize) -> Self {
        Self {
            values: vec![N::zero(); len],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<N> {
        self.values.get(index).copied()
    }

    pub fn as_slice(&self) -> &[N] {
        &self.values
    }

    /// Add `by` to one slot. Out-of-range indices are ignored.
    pub fn add(&mut self, index: usize, by: N) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = *slot + by;
        }
    }

    pub fn nnz(&self) -> usize {
        self.values.iter().filter(|v| !v.is_zero()).count()
    }
}

impl FeatureVector<u64> {
    /// Project a pair's path counts onto the catalog. Paths absent from the
    /// catalog do not contribute; repeated paths are summed.
    pub fn from_counts(catalog: &Catalog, counts: &PathCounts) -> (Self, u64) {
        let mut vector = Self::zeros(catalog.len());
        let mut uncataloged = 0;
        for pc in counts {
            match catalog.index_of(&pc.path) {
                Some(index) => vector.add(index, pc.count),
                None => uncataloged += 1,
            }
        }
        (vector, uncataloged)
    }

    pub fn quantize<M>(&self) -> FeatureVector<M>
    where
        M: Num + Copy + NumCast + Bounded,
    {
        FeatureVector {
            values: self
                .values
                .iter()
                .map(|&v| num::cast::<u64, M>(v).unwrap_or_else(M::max_value))
                .collect(),
        }
    }
}

impl<N> fmt::Display for FeatureVector<N>
where
    N: Num + Copy + fmt::Display,
{
    /// Comma-separated slot values.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// A feature vector with its gold label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labeled {
    pub vector: FeatureVector,
    pub is_hypernym: bool,
}

/// One row of the training dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledVector {
    pub pair: NounPair,
    pub vector: FeatureVector,
    pub is_hypernym: bool,
}

impl LabeledVector {
    pub fn new(pair: NounPair, labeled: Labeled) -> Self {
        Self {
            pair,
            vector: labeled.vector,
            is_hypernym: labeled.is_hypernym,
        }
    }

    /// `stem1$stem2<TAB>c1,...,cN,true|false`
    pub fn to_line(&self) -> String {
        if self.vector.is_empty() {
            format!("{}\t{}", self.pair, self.is_hypernym)
        } else {
            format!("{}\t{},{}", self.pair, self.vector, self.is_hypernym)
        }
    }
}

/// Re-keys pass-1 pair records by pair. Catalog records are skipped.
pub struct PairCountsMapper;

impl Mapper for PairCountsMapper {
    type Input = VocabularyRecord;
    type Key = NounPair;
    type Value = PathCounts;

    fn map(
        &self,
        record: &VocabularyRecord,
        ctx: &mut TaskContext<NounPair, PathCounts>,
    ) -> Result<(), TaskError> {
        match record {
            VocabularyRecord::PairCounts { pair, counts } => ctx.emit(pair.clone(), counts.clone()),
            VocabularyRecord::CatalogPath(_) => ctx.increment(CATALOG_RECORDS, 1),
        }
        Ok(())
    }
}

/// Builds one labeled vector per gold-labeled pair.
///
/// Holds the frozen catalog and the gold table by reference; neither changes
/// while the job runs.
pub struct VectorizeReducer<'a> {
    catalog: &'a Catalog,
    hypernyms: &'a HypernymTable,
}

impl<'a> VectorizeReducer<'a> {
    pub fn new(catalog: &'a Catalog, hypernyms: &'a HypernymTable) -> Self {
        Self { catalog, hypernyms }
    }
}

impl Reducer for VectorizeReducer<'_> {
    type Key = NounPair;
    type Value = PathCounts;
    type OutKey = NounPair;
    type OutValue = Labeled;

    fn reduce(
        &self,
        pair: &NounPair,
        values: &[PathCounts],
        ctx: &mut TaskContext<NounPair, Labeled>,
    ) -> Result<(), TaskError> {
        let Some(is_hypernym) = self.hypernyms.lookup(pair) else {
            trace!(%pair, "no gold label");
            ctx.increment(UNLABELED_PAIRS, 1);
            return Ok(());
        };

        let merged =
            PathCounts::from_fragments(values.iter().flat_map(|counts| counts.iter().cloned()));
        let (vector, uncataloged) = FeatureVector::<u64>::from_counts(self.catalog, &merged);
        if vector.len() != self.catalog.len() {
            return Err(TaskError::new(format!(
                "vector for {pair} has {} slots, catalog has {}",
                vector.len(),
                self.catalog.len()
            )));
        }
        ctx.increment(UNCATALOGED_PATHS, uncataloged);
        ctx.increment(LABELED_PAIRS, 1);
        ctx.emit(pair.clone(), Labeled { vector, is_hypernym });
        Ok(())
    }
}
