use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use ahash::RandomState;
use dashmap::DashMap;
use rayon::prelude::*;

/// All values for one key, gathered from every map task.
pub type Group<K, V> = (K, Vec<V>);

/// Reduce partition a key belongs to. Stable across runs and processes.
pub fn partition_of<K: Hash>(key: &K, partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % partitions.max(1) as u64) as usize
}

/// Group one worker's output by key, for the combiner.
pub(crate) fn group_local<K, V>(records: Vec<(K, V)>) -> Vec<Group<K, V>>
where
    K: Eq + Hash,
{
    let mut groups: HashMap<K, Vec<V>, RandomState> =
        HashMap::with_hasher(RandomState::new());
    for (key, value) in records {
        groups.entry(key).or_default().push(value);
    }
    groups.into_iter().collect()
}

/// Merge every task's committed output and split it into reduce partitions.
///
/// Within a partition groups are ordered by key. Value order inside a group
/// is unspecified.
pub(crate) fn shuffle<K, V>(
    outputs: Vec<Vec<(K, V)>>,
    partitions: usize,
) -> Vec<Vec<Group<K, V>>>
where
    K: Eq + Hash + Ord + Send + Sync,
    V: Send + Sync,
{
    let grouped: DashMap<K, Vec<V>, RandomState> = DashMap::with_hasher(RandomState::new());
    outputs.into_par_iter().for_each(|records| {
        for (key, value) in records {
            grouped.entry(key).or_default().push(value);
        }
    });

    let mut split: Vec<Vec<Group<K, V>>> = (0..partitions.max(1)).map(|_| Vec::new()).collect();
    for (key, values) in grouped {
        let p = partition_of(&key, split.len());
        split[p].push((key, values));
    }
    split
        .par_iter_mut()
        .for_each(|groups| groups.sort_unstable_by(|a, b| a.0.cmp(&b.0)));
    split
}
