//! Pass 1: path search and vocabulary reduction.
//!
//! Runs as two jobs on the engine.
//!
//! 1. [`PathSearchMapper`] turns each n-gram record into
//!    `(pair, path#1)` and `(path, pair)` emissions. [`VocabularyReducer`]
//!    sums the per-pair counts and, for every distinct path a pair was seen
//!    under, re-keys one `(path, pair)` record so that path support survives
//!    into the second job.
//! 2. [`SupportMapper`] regroups the `(path, pair)` records by path and
//!    [`ThresholdReducer`] admits a path into the catalog once it connects
//!    `dp_min` distinct pairs.
//!
//! Support is counted over *distinct* pairs, so duplicated `(path, pair)`
//! records from the two sources never inflate it.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::debug;

use crate::engine::{Mapper, Reducer, TaskContext};
use crate::error::TaskError;
use crate::ngram::{search_paths, DependencyPath, NounPair, NounTags, ParseTree, Stem};
use crate::vectorizer::wire::{
    CatalogKey, PathCount, PathCounts, VocabularyKey, VocabularyRecord, VocabularyValue,
};

/// Job counter: records dropped as malformed.
pub const INVALID_RECORDS: &str = "invalid_records";
/// Job counter: records that produced a tree.
pub const VALID_RECORDS: &str = "valid_records";
/// Job counter: paths found by the search.
pub const PATH_EMISSIONS: &str = "path_emissions";
/// Job counter: paths admitted to the catalog.
pub const CATALOG_PATHS: &str = "catalog_paths";
/// Job counter: paths below the support threshold.
pub const REJECTED_PATHS: &str = "rejected_paths";

// ---------------------------------------------------------------------------
// Job 1: path search
// ---------------------------------------------------------------------------

/// Parses each raw record, builds its tree and emits every path found.
///
/// A malformed record is logged, counted and skipped. It never fails the task.
pub struct PathSearchMapper<'a> {
    stemmer: &'a dyn Stem,
    nouns: &'a NounTags,
}

impl<'a> PathSearchMapper<'a> {
    pub fn new(stemmer: &'a dyn Stem, nouns: &'a NounTags) -> Self {
        Self { stemmer, nouns }
    }
}

impl Mapper for PathSearchMapper<'_> {
    type Input = String;
    type Key = VocabularyKey;
    type Value = VocabularyValue;

    fn map(
        &self,
        line: &String,
        ctx: &mut TaskContext<VocabularyKey, VocabularyValue>,
    ) -> Result<(), TaskError> {
        let tree = match ParseTree::from_line(line, self.stemmer) {
            Ok(tree) => tree,
            Err(e) => {
                debug!(task = ctx.task(), error = %e, "skipping malformed record");
                ctx.increment(INVALID_RECORDS, 1);
                return Ok(());
            }
        };
        ctx.increment(VALID_RECORDS, 1);

        for emission in search_paths(&tree, self.nouns) {
            ctx.increment(PATH_EMISSIONS, 1);
            ctx.emit(
                VocabularyKey::Path(emission.path.clone()),
                VocabularyValue::Pair(emission.pair.clone()),
            );
            ctx.emit(
                VocabularyKey::Pair(emission.pair),
                VocabularyValue::PathCount(PathCount::new(emission.path, 1)),
            );
        }
        Ok(())
    }
}

/// Sum every count fragment of a pair group, per path.
fn sum_counts(
    pair: &NounPair,
    values: &[VocabularyValue],
) -> Result<BTreeMap<DependencyPath, u64>, TaskError> {
    let mut sums = BTreeMap::new();
    for value in values {
        match value {
            VocabularyValue::PathCount(pc) => {
                *sums.entry(pc.path.clone()).or_insert(0) += pc.count;
            }
            VocabularyValue::PathCounts(pcs) => {
                for pc in pcs {
                    *sums.entry(pc.path.clone()).or_insert(0) += pc.count;
                }
            }
            VocabularyValue::Pair(other) => {
                return Err(TaskError::new(format!(
                    "pair key {pair} carries a pair value {other}"
                )));
            }
        }
    }
    Ok(sums)
}

/// Distinct pairs of a path group.
fn distinct_pairs<'v>(
    path: &DependencyPath,
    values: &'v [VocabularyValue],
) -> Result<BTreeSet<&'v NounPair>, TaskError> {
    values
        .iter()
        .map(|value| match value {
            VocabularyValue::Pair(pair) => Ok(pair),
            other => Err(TaskError::new(format!(
                "path key {path} carries a count value {other}"
            ))),
        })
        .collect()
}

/// Map-side combiner for job 1: partial sums per `(pair, path)` and
/// deduplicated pairs per path. Output has the same shape as its input.
pub struct VocabularyCombiner;

impl Reducer for VocabularyCombiner {
    type Key = VocabularyKey;
    type Value = VocabularyValue;
    type OutKey = VocabularyKey;
    type OutValue = VocabularyValue;

    fn reduce(
        &self,
        key: &VocabularyKey,
        values: &[VocabularyValue],
        ctx: &mut TaskContext<VocabularyKey, VocabularyValue>,
    ) -> Result<(), TaskError> {
        match key {
            VocabularyKey::Pair(pair) => {
                for (path, count) in sum_counts(pair, values)? {
                    ctx.emit(key.clone(), VocabularyValue::PathCount(PathCount::new(path, count)));
                }
            }
            VocabularyKey::Path(path) => {
                for pair in distinct_pairs(path, values)? {
                    ctx.emit(key.clone(), VocabularyValue::Pair(pair.clone()));
                }
            }
        }
        Ok(())
    }
}

/// Output of job 1: either a finished pair record or a `(path, pair)`
/// support record bound for job 2.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VocabularyOutput {
    Record(VocabularyRecord),
    Support(DependencyPath, NounPair),
}

/// Reducer of job 1.
///
/// Pair groups become one `PairCounts` record plus one support record per
/// distinct path. Path groups forward their distinct pairs as support.
pub struct VocabularyReducer;

impl Reducer for VocabularyReducer {
    type Key = VocabularyKey;
    type Value = VocabularyValue;
    type OutKey = VocabularyKey;
    type OutValue = VocabularyOutput;

    fn reduce(
        &self,
        key: &VocabularyKey,
        values: &[VocabularyValue],
        ctx: &mut TaskContext<VocabularyKey, VocabularyOutput>,
    ) -> Result<(), TaskError> {
        match key {
            VocabularyKey::Pair(pair) => {
                let sums = sum_counts(pair, values)?;
                for path in sums.keys() {
                    ctx.emit(
                        VocabularyKey::Path(path.clone()),
                        VocabularyOutput::Support(path.clone(), pair.clone()),
                    );
                }
                let counts = PathCounts::from_fragments(
                    sums.into_iter().map(|(path, count)| PathCount::new(path, count)),
                );
                ctx.emit(
                    key.clone(),
                    VocabularyOutput::Record(VocabularyRecord::PairCounts {
                        pair: pair.clone(),
                        counts,
                    }),
                );
            }
            VocabularyKey::Path(path) => {
                for pair in distinct_pairs(path, values)? {
                    ctx.emit(
                        key.clone(),
                        VocabularyOutput::Support(path.clone(), pair.clone()),
                    );
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Job 2: support threshold
// ---------------------------------------------------------------------------

/// Regroups `(path, pair)` support records by path.
pub struct SupportMapper;

impl Mapper for SupportMapper {
    type Input = (DependencyPath, NounPair);
    type Key = DependencyPath;
    type Value = NounPair;

    fn map(
        &self,
        (path, pair): &(DependencyPath, NounPair),
        ctx: &mut TaskContext<DependencyPath, NounPair>,
    ) -> Result<(), TaskError> {
        ctx.emit(path.clone(), pair.clone());
        Ok(())
    }
}

/// Drops repeated pairs under one path.
pub struct DistinctCombiner;

impl Reducer for DistinctCombiner {
    type Key = DependencyPath;
    type Value = NounPair;
    type OutKey = DependencyPath;
    type OutValue = NounPair;

    fn reduce(
        &self,
        path: &DependencyPath,
        pairs: &[NounPair],
        ctx: &mut TaskContext<DependencyPath, NounPair>,
    ) -> Result<(), TaskError> {
        for pair in pairs.iter().collect::<BTreeSet<_>>() {
            ctx.emit(path.clone(), pair.clone());
        }
        Ok(())
    }
}

/// Admits a path once it connects at least `dp_min` distinct pairs.
///
/// Counting stops as soon as the threshold is reached.
pub struct ThresholdReducer {
    dp_min: usize,
}

impl ThresholdReducer {
    pub fn new(dp_min: u32) -> Self {
        Self {
            dp_min: (dp_min as usize).max(1),
        }
    }
}

impl Reducer for ThresholdReducer {
    type Key = DependencyPath;
    type Value = NounPair;
    type OutKey = CatalogKey;
    type OutValue = DependencyPath;

    fn reduce(
        &self,
        path: &DependencyPath,
        pairs: &[NounPair],
        ctx: &mut TaskContext<CatalogKey, DependencyPath>,
    ) -> Result<(), TaskError> {
        let mut seen = HashSet::with_capacity(self.dp_min.min(pairs.len()));
        for pair in pairs {
            seen.insert(pair);
            if seen.len() >= self.dp_min {
                break;
            }
        }
        if seen.len() >= self.dp_min {
            ctx.increment(CATALOG_PATHS, 1);
            ctx.emit(CatalogKey, path.clone());
        } else {
            ctx.increment(REJECTED_PATHS, 1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Verbatim;
    impl Stem for Verbatim {
        fn stem(&self, word: &str) -> String {
            word.to_lowercase()
        }
    }

    fn pair_ctx() -> TaskContext<VocabularyKey, VocabularyValue> {
        TaskContext::new(0, 1)
    }

    #[test]
    fn mapper_emits_both_keyings() {
        let nouns = NounTags::default();
        let mapper = PathSearchMapper::new(&Verbatim, &nouns);
        let mut ctx = pair_ctx();
        let line = "x\tanimal/NN/root/0 is/VB/cop/1 dog/NN/nsubj/2\t7".to_string();
        mapper.map(&line, &mut ctx).unwrap();

        let path = DependencyPath::from("NN:VB:NN");
        let pair = NounPair::new("animal", "dog");
        assert_eq!(
            ctx.records,
            vec![
                (VocabularyKey::Path(path.clone()), VocabularyValue::Pair(pair.clone())),
                (
                    VocabularyKey::Pair(pair),
                    VocabularyValue::PathCount(PathCount::new(path, 1))
                ),
            ]
        );
        assert_eq!(ctx.counter(VALID_RECORDS), 1);
        assert_eq!(ctx.counter(PATH_EMISSIONS), 1);
    }

    #[test]
    fn malformed_record_is_counted_not_fatal() {
        let nouns = NounTags::default();
        let mapper = PathSearchMapper::new(&Verbatim, &nouns);
        let mut ctx = pair_ctx();
        mapper.map(&"x\tcat/NN/nsubj/9".to_string(), &mut ctx).unwrap();
        mapper.map(&"no tab here".to_string(), &mut ctx).unwrap();
        assert!(ctx.records.is_empty());
        assert_eq!(ctx.counter(INVALID_RECORDS), 2);
    }

    #[test]
    fn pair_group_sums_and_rekeys() {
        let pair = NounPair::new("anim", "dog");
        let key = VocabularyKey::Pair(pair.clone());
        let a = DependencyPath::from("NN:VB:NN");
        let b = DependencyPath::from("NN:IN:NN");
        let values = vec![
            VocabularyValue::PathCount(PathCount::new(a.clone(), 1)),
            VocabularyValue::PathCount(PathCount::new(b.clone(), 2)),
            VocabularyValue::PathCount(PathCount::new(a.clone(), 3)),
        ];
        let mut ctx = TaskContext::new(0, 1);
        VocabularyReducer.reduce(&key, &values, &mut ctx).unwrap();

        let support: Vec<_> = ctx
            .records
            .iter()
            .filter_map(|(_, out)| match out {
                VocabularyOutput::Support(path, p) => Some((path.clone(), p.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(support, vec![(b.clone(), pair.clone()), (a.clone(), pair.clone())]);

        let record = ctx
            .records
            .iter()
            .find_map(|(_, out)| match out {
                VocabularyOutput::Record(r) => Some(r.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(record.to_line(), "anim$dog\tNN:IN:NN#2@NN:VB:NN#4");
    }

    #[test]
    fn combiner_output_reduces_like_raw_input() {
        let key = VocabularyKey::Pair(NounPair::new("a", "b"));
        let p = DependencyPath::from("NN:NN");
        let raw: Vec<_> = (0..5)
            .map(|_| VocabularyValue::PathCount(PathCount::new(p.clone(), 1)))
            .collect();

        let mut combined = pair_ctx();
        VocabularyCombiner.reduce(&key, &raw[..3], &mut combined).unwrap();
        let mut values: Vec<_> = combined.records.into_iter().map(|(_, v)| v).collect();
        values.extend_from_slice(&raw[3..]);

        let mut direct = TaskContext::new(0, 1);
        VocabularyReducer.reduce(&key, &raw, &mut direct).unwrap();
        let mut via_combiner = TaskContext::new(0, 1);
        VocabularyReducer.reduce(&key, &values, &mut via_combiner).unwrap();
        assert_eq!(direct.records, via_combiner.records);
    }

    #[test]
    fn mismatched_value_fails_task() {
        let key = VocabularyKey::Pair(NounPair::new("a", "b"));
        let values = vec![VocabularyValue::Pair(NounPair::new("c", "d"))];
        let mut ctx = TaskContext::new(0, 1);
        assert!(VocabularyReducer.reduce(&key, &values, &mut ctx).is_err());
    }

    fn threshold(dp_min: u32, pairs: &[(&str, &str)]) -> bool {
        let pairs: Vec<_> = pairs.iter().map(|(a, b)| NounPair::new(*a, *b)).collect();
        let mut ctx = TaskContext::new(0, 1);
        ThresholdReducer::new(dp_min)
            .reduce(&DependencyPath::from("NN:VB:NN"), &pairs, &mut ctx)
            .unwrap();
        !ctx.records.is_empty()
    }

    #[test]
    fn threshold_counts_distinct_pairs() {
        assert!(threshold(2, &[("a", "b"), ("c", "d")]));
        assert!(!threshold(2, &[("a", "b"), ("a", "b"), ("a", "b")]));
        assert!(threshold(1, &[("a", "b")]));
        assert!(!threshold(3, &[("a", "b"), ("c", "d")]));
    }

    #[test]
    fn admission_is_monotone_in_support() {
        let mut pairs = vec![("a", "b")];
        let mut admitted = threshold(3, &pairs);
        for extra in [("c", "d"), ("e", "f"), ("g", "h")] {
            pairs.push(extra);
            let now = threshold(3, &pairs);
            assert!(now || !admitted);
            admitted = now;
        }
        assert!(admitted);
    }

    #[test]
    fn distinct_combiner_dedupes() {
        let path = DependencyPath::from("NN:NN");
        let pairs = vec![NounPair::new("a", "b"), NounPair::new("a", "b"), NounPair::new("c", "d")];
        let mut ctx = TaskContext::new(0, 1);
        DistinctCombiner.reduce(&path, &pairs, &mut ctx).unwrap();
        assert_eq!(ctx.emitted(), 2);
    }
}
