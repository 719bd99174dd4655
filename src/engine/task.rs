use std::panic::{catch_unwind, AssertUnwindSafe};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::{EngineError, TaskError};

/// Per-attempt sink handed to map, combine and reduce logic.
///
/// Nothing written here is visible outside the task until the attempt
/// succeeds; a failed attempt's buffer is dropped.
#[derive(Debug)]
pub struct TaskContext<K, V> {
    task: usize,
    attempt: u32,
    pub(crate) records: Vec<(K, V)>,
    pub(crate) counters: IndexMap<&'static str, u64>,
    /// Records consumed by this attempt (map inputs or reduce groups).
    pub(crate) consumed: u64,
    /// Map output count before the combiner ran, if it ran.
    pub(crate) pre_combine: Option<u64>,
}

impl<K, V> TaskContext<K, V> {
    pub(crate) fn new(task: usize, attempt: u32) -> Self {
        Self {
            task,
            attempt,
            records: Vec::new(),
            counters: IndexMap::new(),
            consumed: 0,
            pre_combine: None,
        }
    }

    /// Emit one key/value record.
    #[inline]
    pub fn emit(&mut self, key: K, value: V) {
        self.records.push((key, value));
    }

    /// Bump a named job counter.
    pub fn increment(&mut self, counter: &'static str, by: u64) {
        *self.counters.entry(counter).or_insert(0) += by;
    }

    pub fn task(&self) -> usize {
        self.task
    }

    /// 1-based attempt number.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn emitted(&self) -> usize {
        self.records.len()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }
}

/// A committed task attempt.
#[derive(Debug)]
pub(crate) struct TaskOutcome<K, V> {
    pub context: TaskContext<K, V>,
    pub retries: u32,
}

/// Run `body` until it succeeds or `max_attempts` is exhausted.
///
/// Each attempt gets a fresh context. Panics count as failed attempts.
pub(crate) fn run_with_retry<K, V, F>(
    stage: &str,
    task: usize,
    max_attempts: u32,
    mut body: F,
) -> Result<TaskOutcome<K, V>, EngineError>
where
    F: FnMut(&mut TaskContext<K, V>) -> Result<(), TaskError>,
{
    let mut last_error = String::new();
    for attempt in 1..=max_attempts {
        let mut context = TaskContext::new(task, attempt);
        let result = catch_unwind(AssertUnwindSafe(|| body(&mut context)));
        match result {
            Ok(Ok(())) => {
                debug!(stage, task, attempt, emitted = context.emitted(), "task committed");
                return Ok(TaskOutcome {
                    context,
                    retries: attempt - 1,
                });
            }
            Ok(Err(e)) => last_error = e.message,
            Err(payload) => last_error = panic_message(payload.as_ref()),
        }
        warn!(stage, task, attempt, max_attempts, error = %last_error, "task attempt failed");
    }
    Err(EngineError::TaskFailed {
        stage: stage.to_string(),
        task,
        attempts: max_attempts,
        message: last_error,
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_success_commits() {
        let outcome = run_with_retry::<u32, u32, _>("t", 0, 3, |ctx| {
            ctx.emit(1, 2);
            ctx.increment("seen", 1);
            Ok(())
        })
        .unwrap();
        assert_eq!(outcome.retries, 0);
        assert_eq!(outcome.context.records, vec![(1, 2)]);
        assert_eq!(outcome.context.counter("seen"), 1);
    }

    #[test]
    fn failed_attempt_output_is_discarded() {
        let outcome = run_with_retry::<u32, u32, _>("t", 4, 3, |ctx| {
            ctx.emit(ctx.attempt(), 0);
            if ctx.attempt() < 3 {
                return Err(TaskError::new("flaky"));
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(outcome.retries, 2);
        assert_eq!(outcome.context.records, vec![(3, 0)]);
        assert_eq!(outcome.context.task(), 4);
    }

    #[test]
    fn exhausted_budget_fails_stage() {
        let err =
            run_with_retry::<u32, u32, _>("vocab/map", 7, 2, |_| Err(TaskError::new("disk gone")))
                .unwrap_err();
        match err {
            EngineError::TaskFailed { stage, task, attempts, message } => {
                assert_eq!(stage, "vocab/map");
                assert_eq!(task, 7);
                assert_eq!(attempts, 2);
                assert_eq!(message, "disk gone");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn panic_is_a_failed_attempt() {
        let outcome = run_with_retry::<u32, u32, _>("t", 0, 2, |ctx| {
            if ctx.attempt() == 1 {
                panic!("boom");
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(outcome.retries, 1);

        let err = run_with_retry::<u32, u32, _>("t", 0, 1, |_| panic!("always")).unwrap_err();
        assert!(matches!(
            err,
            EngineError::TaskFailed { ref message, .. } if message == "panicked: always"
        ));
    }
}
