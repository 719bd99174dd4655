/// This crate turns syntactic n-gram records into dependency-path feature
/// vectors for noun-pair hypernymy classification.
pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod ngram;
pub mod pipeline;
pub mod vectorizer;

/// Pipeline Driver
/// The top-level struct of this crate. It runs both passes on one
/// aggregation engine.
///
/// - Pass 1 (`vocabulary`): parses each n-gram record into a tree, searches
///   it for noun-to-noun dependency paths, sums occurrence counts per noun
///   pair and admits a path into the catalog once it connects at least
///   `dp_min` distinct noun pairs.
/// - Barrier: all accepted paths are collected and frozen into a `Catalog`
///   before pass 2 starts. Its size is the published feature count.
/// - Pass 2 (`vectorize`): joins every noun pair against the hypernym gold
///   table and emits one labeled `FeatureVector` per labeled pair.
///
/// `Pipeline` owns the stemmer used for both the records and the gold table,
/// so pair keys from both sides always agree.
pub use pipeline::{Dataset, Pipeline, Vocabulary};

/// Configuration
/// `ConfigFile` is the TOML form, every field optional; `PipelineConfig` is
/// the validated form handed to the driver.
///
/// `dp_min` has no default and must be a positive integer.
pub use config::{ConfigFile, EngineConfig, PipelineConfig};

/// Aggregation Engine
/// A generic map → combine → shuffle → reduce substrate running on a rayon
/// pool.
///
/// Implement `Mapper` and `Reducer` to define a job. A combiner is any
/// `Reducer` whose output shape equals its input shape; it may run zero or
/// more times per map task, so its logic must be associative.
///
/// # Fault tolerance
/// Each task attempt writes into a private buffer that is committed only
/// when the attempt succeeds. A failed or panicking attempt is retried up to
/// `max_attempts` times and never duplicates output.
pub use engine::{Combiner, Engine, JobCounters, JobOutput, Mapper, Reducer, TaskContext};

/// Syntactic N-gram Model
/// Token descriptors, reconstructed dependency trees and the path search.
///
/// Noun pairs and dependency paths are the two aggregation keys of pass 1.
pub use ngram::{
    search_paths, DependencyPath, NounPair, NounTags, ParseTree, SnowballStemmer, Stem,
    TokenDescriptor, TreeNode,
};

/// Path Catalog
/// The frozen, lexicographically ordered set of accepted dependency paths.
/// A path's index is its slot in every feature vector.
///
/// # Serialization
/// Supported (CBOR).
pub use vectorizer::Catalog;

/// Feature Vector
/// Dense per-pair path occurrence counts, one slot per catalog path.
///
/// `FeatureVector<N>` stores `u64` by default and can be quantized into a
/// narrower numeric type, for example:
/// - u8
/// - u16
/// - u32
pub use vectorizer::{FeatureVector, LabeledVector};

/// Hypernym Gold Table
/// Maps stemmed noun pairs to a boolean hypernymy label. Pairs absent from
/// the table produce no output row.
pub use vectorizer::HypernymTable;

/// Pass-1 Records
/// The text form shared by the two passes.
/// - `stem1$stem2<TAB>path#n@path#n...`: per-pair path counts
/// - `**<TAB>path`: a catalog path
pub use vectorizer::{PathCount, PathCounts, VocabularyRecord};

/// Errors
/// Every subsystem error is a miette diagnostic. `PipelineError` wraps them
/// all.
pub use error::{
    CatalogError, ConfigError, CorpusError, EngineError, PipelineError, PipelineResult,
    RecordError, TaskError, WireError,
};
