//! Diagnostic error types for the extraction pipeline.
//!
//! Each subsystem owns an error enum with miette `#[diagnostic]` derives;
//! `PipelineError` wraps them so the binary can render the full chain.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type returned by the job driver.
#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Corpus(#[from] CorpusError),
}

// ---------------------------------------------------------------------------
// Record errors
// ---------------------------------------------------------------------------

/// A malformed syntactic n-gram record.
///
/// Never fatal: the pass-1 mapper logs it, counts it and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum RecordError {
    #[error("record has no n-gram field (expected at least 2 tab-separated fields)")]
    #[diagnostic(code(dpv::record::missing_field))]
    MissingField,

    #[error("token \"{token}\" has {fields} '/'-separated fields, expected 4")]
    #[diagnostic(code(dpv::record::arity))]
    Arity { token: String, fields: usize },

    #[error("token \"{token}\" has an empty word after stripping non-alphabetic characters")]
    #[diagnostic(code(dpv::record::empty_word))]
    EmptyWord { token: String },

    #[error("token \"{token}\" has an empty POS tag after stripping non-alphabetic characters")]
    #[diagnostic(code(dpv::record::empty_tag))]
    EmptyTag { token: String },

    #[error("token \"{token}\" has a non-numeric head index")]
    #[diagnostic(code(dpv::record::bad_head))]
    BadHeadIndex { token: String },

    #[error("head index {head} is outside the record (length {len})")]
    #[diagnostic(code(dpv::record::head_out_of_range))]
    HeadOutOfRange { head: usize, len: usize },

    #[error("record has no root token (head index 0)")]
    #[diagnostic(code(dpv::record::no_root))]
    NoRoot,

    #[error("record has {count} root tokens, expected exactly one")]
    #[diagnostic(code(dpv::record::multiple_roots))]
    MultipleRoots { count: usize },

    #[error("token at position {position} is not connected to the root")]
    #[diagnostic(
        code(dpv::record::detached),
        help("The head indices form a cycle that never reaches the root token.")
    )]
    Detached { position: usize },

    #[error("word \"{word}\" stems to \"{stem}\", which cannot be written as a pair key")]
    #[diagnostic(
        code(dpv::record::bad_stem),
        help("Stems must be non-empty and free of '$', tabs and newlines.")
    )]
    BadStem { word: String, stem: String },
}

// ---------------------------------------------------------------------------
// Wire format errors
// ---------------------------------------------------------------------------

/// A pass-1 intermediate line that does not follow the key/value wire format.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum WireError {
    #[error("expected `key<TAB>value`, got \"{line}\"")]
    #[diagnostic(code(dpv::wire::missing_tab))]
    MissingTab { line: String },

    #[error("malformed noun pair key \"{key}\"")]
    #[diagnostic(code(dpv::wire::pair))]
    Pair { key: String },

    #[error("malformed path count fragment \"{fragment}\"")]
    #[diagnostic(code(dpv::wire::fragment))]
    Fragment { fragment: String },

    #[error("empty dependency path")]
    #[diagnostic(code(dpv::wire::empty_path))]
    EmptyPath,
}

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

/// Failure of a single task attempt. The engine retries the task from scratch.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TaskError {
    pub message: String,
}

impl TaskError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("{stage}: task {task} failed after {attempts} attempts: {message}")]
    #[diagnostic(
        code(dpv::engine::task_failed),
        help(
            "A map or reduce task exhausted its retry budget. Inspect the last \
             failure message, or raise `engine.max_attempts` if the failure is transient."
        )
    )]
    TaskFailed {
        stage: String,
        task: usize,
        attempts: u32,
        message: String,
    },

    #[error("could not start worker pool: {message}")]
    #[diagnostic(code(dpv::engine::thread_pool))]
    ThreadPool { message: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("DPmin is not configured")]
    #[diagnostic(
        code(dpv::config::missing_dp_min),
        help("Set `dp_min` in the config file or pass --dp-min.")
    )]
    MissingDpMin,

    #[error("DPmin must be a positive integer, got {value}")]
    #[diagnostic(code(dpv::config::invalid_dp_min))]
    InvalidDpMin { value: i64 },

    #[error("invalid engine setting `{field}`: {message}")]
    #[diagnostic(code(dpv::config::invalid_engine))]
    InvalidEngine { field: &'static str, message: String },

    #[error("noun tag set is empty")]
    #[diagnostic(
        code(dpv::config::no_noun_tags),
        help("Leave `noun_tags` unset to use the Penn Treebank noun tags.")
    )]
    EmptyNounTags,

    #[error("config parse error: {message}")]
    #[diagnostic(code(dpv::config::parse))]
    Parse { message: String },

    #[error("config I/O error for {path}: {message}")]
    #[diagnostic(code(dpv::config::io))]
    Io { path: String, message: String },
}

// ---------------------------------------------------------------------------
// Catalog errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("catalog has {actual} paths but the published feature count is {published}")]
    #[diagnostic(
        code(dpv::catalog::inconsistent),
        help(
            "The catalog and the feature-count artifact come from different pass-1 runs. \
             Re-run the vocabulary pass so both are published together."
        )
    )]
    Inconsistent { published: usize, actual: usize },

    #[error("feature vector has {actual} slots, expected {expected}")]
    #[diagnostic(code(dpv::catalog::vector_width))]
    VectorWidth { expected: usize, actual: usize },

    #[error("catalog codec error: {message}")]
    #[diagnostic(code(dpv::catalog::codec))]
    Codec { message: String },

    #[error("feature count artifact is not an integer: \"{content}\"")]
    #[diagnostic(code(dpv::catalog::feature_count))]
    FeatureCount { content: String },
}

// ---------------------------------------------------------------------------
// Corpus I/O errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CorpusError {
    #[error("I/O error for {path}: {message}")]
    #[diagnostic(code(dpv::corpus::io))]
    Io { path: String, message: String },

    #[error("no input files found under {path}")]
    #[diagnostic(code(dpv::corpus::empty))]
    Empty { path: String },

    #[error("malformed line {line} in {path}: {message}")]
    #[diagnostic(code(dpv::corpus::malformed))]
    Malformed {
        path: String,
        line: usize,
        message: String,
    },
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
