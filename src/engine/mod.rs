//! In-process map → combine → shuffle → reduce substrate.
//!
//! Map tasks run over contiguous input partitions on a rayon pool. Each task
//! attempt writes into a private [`TaskContext`]; only committed attempts
//! reach the shuffle, so a retried task never duplicates output. The
//! combiner, when enabled, runs on a single map task's output and may be
//! skipped entirely, so combine logic must be associative. Every key's values
//! are delivered to exactly one reduce invocation; reduce partitions run in
//! parallel with no ordering between them.

pub mod shuffle;
pub mod task;

use std::fmt;
use std::hash::Hash;

use indexmap::IndexMap;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::info;

use crate::config::EngineConfig;
use crate::error::{EngineError, TaskError};

pub use shuffle::{partition_of, Group};
pub use task::TaskContext;
use task::{run_with_retry, TaskOutcome};

/// Map logic: one input record to zero or more key/value emissions.
pub trait Mapper: Send + Sync {
    type Input: Sync;
    type Key: Eq + Hash + Ord + Clone + Send + Sync;
    type Value: Send + Sync;

    fn map(
        &self,
        input: &Self::Input,
        ctx: &mut TaskContext<Self::Key, Self::Value>,
    ) -> Result<(), TaskError>;
}

/// Reduce logic: all values of one key to zero or more output records.
///
/// Values arrive as a slice so that a retried task sees the same group.
pub trait Reducer: Send + Sync {
    type Key: Eq + Hash + Ord + Clone + Send + Sync;
    type Value: Send + Sync;
    type OutKey: Send;
    type OutValue: Send;

    fn reduce(
        &self,
        key: &Self::Key,
        values: &[Self::Value],
        ctx: &mut TaskContext<Self::OutKey, Self::OutValue>,
    ) -> Result<(), TaskError>;
}

/// A reducer whose output has the same shape as its input.
pub type Combiner<K, V> = dyn Reducer<Key = K, Value = V, OutKey = K, OutValue = V>;

/// Counters of one finished job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobCounters {
    pub map_tasks: usize,
    pub reduce_tasks: usize,
    pub map_input_records: u64,
    pub map_output_records: u64,
    pub combine_output_records: u64,
    pub reduce_groups: u64,
    pub reduce_output_records: u64,
    pub retries: u64,
    /// Counters incremented by task logic.
    pub user: IndexMap<&'static str, u64>,
}

impl JobCounters {
    fn absorb<K, V>(&mut self, outcome: &TaskOutcome<K, V>) {
        self.retries += outcome.retries as u64;
        for (name, value) in &outcome.context.counters {
            *self.user.entry(*name).or_insert(0) += *value;
        }
    }

    pub fn user(&self, name: &str) -> u64 {
        self.user.get(name).copied().unwrap_or(0)
    }
}

impl fmt::Display for JobCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "map_in={} map_out={} combine_out={} groups={} reduce_out={} retries={}",
            self.map_input_records,
            self.map_output_records,
            self.combine_output_records,
            self.reduce_groups,
            self.reduce_output_records,
            self.retries
        )?;
        for (name, value) in &self.user {
            write!(f, " {name}={value}")?;
        }
        Ok(())
    }
}

/// Reduce output of one job.
#[derive(Debug)]
pub struct JobOutput<K, V> {
    pub records: Vec<(K, V)>,
    pub counters: JobCounters,
}

/// The aggregation substrate.
pub struct Engine {
    config: EngineConfig,
    pool: ThreadPool,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("dpv-worker-{i}"))
            .build()
            .map_err(|e| EngineError::ThreadPool {
                message: e.to_string(),
            })?;
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one job to completion. All map tasks commit before the shuffle
    /// starts; the job fails if any task exhausts its attempts.
    pub fn run<M, R>(
        &self,
        stage: &str,
        inputs: &[M::Input],
        mapper: &M,
        combiner: Option<&Combiner<M::Key, M::Value>>,
        reducer: &R,
    ) -> Result<JobOutput<R::OutKey, R::OutValue>, EngineError>
    where
        M: Mapper,
        R: Reducer<Key = M::Key, Value = M::Value>,
    {
        let combiner = combiner.filter(|_| self.config.combine);
        info!(
            stage,
            inputs = inputs.len(),
            map_tasks = self.config.map_tasks,
            reduce_tasks = self.config.reduce_tasks,
            combine = combiner.is_some(),
            "job started"
        );
        let output = self
            .pool
            .install(|| self.run_phases(stage, inputs, mapper, combiner, reducer))?;
        info!(stage, counters = %output.counters, "job finished");
        Ok(output)
    }

    fn run_phases<M, R>(
        &self,
        stage: &str,
        inputs: &[M::Input],
        mapper: &M,
        combiner: Option<&Combiner<M::Key, M::Value>>,
        reducer: &R,
    ) -> Result<JobOutput<R::OutKey, R::OutValue>, EngineError>
    where
        M: Mapper,
        R: Reducer<Key = M::Key, Value = M::Value>,
    {
        let attempts = self.config.max_attempts;
        let mut counters = JobCounters::default();

        // map (+ combine)
        let map_stage = format!("{stage}/map");
        let split_len = inputs.len().div_ceil(self.config.map_tasks).max(1);
        let map_outcomes = inputs
            .par_chunks(split_len)
            .enumerate()
            .map(|(task, split)| {
                run_with_retry(&map_stage, task, attempts, |ctx| {
                    for input in split {
                        mapper.map(input, ctx)?;
                    }
                    ctx.consumed = split.len() as u64;
                    if let Some(combiner) = combiner {
                        combine_in_place(combiner, ctx)?;
                    }
                    Ok(())
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        counters.map_tasks = map_outcomes.len();
        let mut map_outputs = Vec::with_capacity(map_outcomes.len());
        for outcome in map_outcomes {
            counters.absorb(&outcome);
            let emitted = outcome.context.records.len() as u64;
            counters.map_input_records += outcome.context.consumed;
            match outcome.context.pre_combine {
                Some(before) => {
                    counters.map_output_records += before;
                    counters.combine_output_records += emitted;
                }
                None => counters.map_output_records += emitted,
            }
            map_outputs.push(outcome.context.records);
        }

        // shuffle
        let partitions = shuffle::shuffle(map_outputs, self.config.reduce_tasks);
        counters.reduce_tasks = partitions.len();

        // reduce
        let reduce_stage = format!("{stage}/reduce");
        let reduce_outcomes = partitions
            .par_iter()
            .enumerate()
            .map(|(task, groups)| {
                run_with_retry(&reduce_stage, task, attempts, |ctx| {
                    for (key, values) in groups {
                        reducer.reduce(key, values, ctx)?;
                    }
                    ctx.consumed = groups.len() as u64;
                    Ok(())
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        let mut records = Vec::new();
        for outcome in reduce_outcomes {
            counters.absorb(&outcome);
            counters.reduce_groups += outcome.context.consumed;
            counters.reduce_output_records += outcome.context.records.len() as u64;
            records.extend(outcome.context.records);
        }

        Ok(JobOutput { records, counters })
    }
}

/// Replace a map task's buffer with its combined form.
fn combine_in_place<K, V>(
    combiner: &Combiner<K, V>,
    ctx: &mut TaskContext<K, V>,
) -> Result<(), TaskError>
where
    K: Eq + Hash + Ord + Clone + Send + Sync,
    V: Send + Sync,
{
    let records = std::mem::take(&mut ctx.records);
    ctx.pre_combine = Some(records.len() as u64);
    let mut combined = TaskContext::new(ctx.task(), ctx.attempt());
    for (key, values) in shuffle::group_local(records) {
        combiner.reduce(&key, &values, &mut combined)?;
    }
    ctx.records = combined.records;
    for (name, value) in combined.counters {
        ctx.increment(name, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Words;
    impl Mapper for Words {
        type Input = String;
        type Key = String;
        type Value = u64;

        fn map(&self, line: &String, ctx: &mut TaskContext<String, u64>) -> Result<(), TaskError> {
            for word in line.split_whitespace() {
                ctx.emit(word.to_string(), 1);
            }
            ctx.increment("lines", 1);
            Ok(())
        }
    }

    struct Sum;
    impl Reducer for Sum {
        type Key = String;
        type Value = u64;
        type OutKey = String;
        type OutValue = u64;

        fn reduce(
            &self,
            key: &String,
            values: &[u64],
            ctx: &mut TaskContext<String, u64>,
        ) -> Result<(), TaskError> {
            ctx.emit(key.clone(), values.iter().sum());
            Ok(())
        }
    }

    /// Counts how many reduce invocations saw each key.
    struct Invocations;
    impl Reducer for Invocations {
        type Key = String;
        type Value = u64;
        type OutKey = String;
        type OutValue = usize;

        fn reduce(
            &self,
            key: &String,
            values: &[u64],
            ctx: &mut TaskContext<String, usize>,
        ) -> Result<(), TaskError> {
            ctx.emit(key.clone(), values.len());
            Ok(())
        }
    }

    fn engine(combine: bool) -> Engine {
        Engine::new(EngineConfig {
            workers: 2,
            map_tasks: 3,
            reduce_tasks: 2,
            max_attempts: 3,
            combine,
        })
        .unwrap()
    }

    fn corpus() -> Vec<String> {
        vec![
            "a b a".to_string(),
            "b c".to_string(),
            "a".to_string(),
            "c c c d".to_string(),
            "".to_string(),
        ]
    }

    fn sorted(mut records: Vec<(String, u64)>) -> Vec<(String, u64)> {
        records.sort();
        records
    }

    #[test]
    fn word_count() {
        let out = engine(false).run("wc", &corpus(), &Words, None, &Sum).unwrap();
        assert_eq!(
            sorted(out.records),
            vec![
                ("a".to_string(), 3),
                ("b".to_string(), 2),
                ("c".to_string(), 4),
                ("d".to_string(), 1)
            ]
        );
        assert_eq!(out.counters.map_input_records, 5);
        assert_eq!(out.counters.map_output_records, 10);
        assert_eq!(out.counters.reduce_groups, 4);
        assert_eq!(out.counters.user("lines"), 5);
    }

    #[test]
    fn combine_does_not_change_result() {
        let sum: &Combiner<String, u64> = &Sum;
        let with = engine(true).run("wc", &corpus(), &Words, Some(sum), &Sum).unwrap();
        let without = engine(false).run("wc", &corpus(), &Words, Some(sum), &Sum).unwrap();
        assert_eq!(sorted(with.records), sorted(without.records));
        assert!(with.counters.combine_output_records < with.counters.map_output_records);
        assert_eq!(without.counters.combine_output_records, 0);
    }

    #[test]
    fn each_key_reduced_once_with_all_values() {
        let out = engine(false).run("wc", &corpus(), &Words, None, &Invocations).unwrap();
        let mut keys: Vec<(String, usize)> = out.records;
        keys.sort();
        assert_eq!(
            keys,
            vec![
                ("a".to_string(), 3),
                ("b".to_string(), 2),
                ("c".to_string(), 4),
                ("d".to_string(), 1)
            ]
        );
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let sum: &Combiner<String, u64> = &Sum;
        let out = engine(true).run("wc", &[], &Words, Some(sum), &Sum).unwrap();
        assert!(out.records.is_empty());
        assert_eq!(out.counters.map_tasks, 0);
    }

    struct FlakyMapper {
        failures: AtomicU32,
    }
    impl Mapper for FlakyMapper {
        type Input = String;
        type Key = String;
        type Value = u64;

        fn map(&self, line: &String, ctx: &mut TaskContext<String, u64>) -> Result<(), TaskError> {
            Words.map(line, ctx)?;
            if line == "b c" && self.failures.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(TaskError::new("worker lost"));
            }
            Ok(())
        }
    }

    #[test]
    fn retried_map_task_does_not_duplicate_output() {
        let mapper = FlakyMapper { failures: AtomicU32::new(0) };
        let out = engine(false).run("wc", &corpus(), &mapper, None, &Sum).unwrap();
        assert_eq!(out.counters.retries, 1);
        assert_eq!(
            sorted(out.records),
            vec![
                ("a".to_string(), 3),
                ("b".to_string(), 2),
                ("c".to_string(), 4),
                ("d".to_string(), 1)
            ]
        );
    }

    struct Broken;
    impl Reducer for Broken {
        type Key = String;
        type Value = u64;
        type OutKey = String;
        type OutValue = u64;

        fn reduce(
            &self,
            _: &String,
            _: &[u64],
            _: &mut TaskContext<String, u64>,
        ) -> Result<(), TaskError> {
            Err(TaskError::new("bad reducer"))
        }
    }

    #[test]
    fn exhausted_reduce_task_fails_job() {
        let err = engine(false).run("wc", &corpus(), &Words, None, &Broken).unwrap_err();
        assert!(matches!(
            err,
            EngineError::TaskFailed { ref stage, attempts: 3, .. } if stage == "wc/reduce"
        ));
    }
}
