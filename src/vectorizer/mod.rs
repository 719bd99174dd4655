pub mod catalog;
pub mod feature;
pub mod hypernym;
pub mod vocabulary;
pub mod wire;

pub use catalog::{format_feature_count, parse_feature_count, Catalog};
pub use feature::{FeatureVector, Labeled, LabeledVector, PairCountsMapper, VectorizeReducer};
pub use hypernym::HypernymTable;
pub use vocabulary::{
    DistinctCombiner, PathSearchMapper, SupportMapper, ThresholdReducer, VocabularyCombiner,
    VocabularyOutput, VocabularyReducer,
};
pub use wire::{
    CatalogKey, PathCount, PathCounts, VocabularyKey, VocabularyRecord, VocabularyValue,
    CATALOG_KEY, COUNT_DELIMITER, FRAGMENT_DELIMITER,
};
