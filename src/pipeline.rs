//! Job driver: pass 1, the catalog barrier, pass 2.

use tracing::info;

use crate::config::PipelineConfig;
use crate::engine::{Combiner, Engine, JobCounters};
use crate::error::{CatalogError, PipelineResult};
use crate::ngram::{DependencyPath, NounPair, SnowballStemmer, Stem};
use crate::vectorizer::{
    Catalog, DistinctCombiner, HypernymTable, LabeledVector, PairCountsMapper, PathSearchMapper,
    SupportMapper, ThresholdReducer, VectorizeReducer, VocabularyCombiner, VocabularyKey,
    VocabularyOutput, VocabularyRecord, VocabularyReducer, VocabularyValue,
};

/// Pass-1 result.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    /// Pair records ordered by pair, followed by one `**` record per catalog path.
    pub records: Vec<VocabularyRecord>,
    /// The frozen catalog. Its length is the published feature count.
    pub catalog: Catalog,
    pub search_counters: JobCounters,
    pub threshold_counters: JobCounters,
}

impl Vocabulary {
    pub fn feature_count(&self) -> usize {
        self.catalog.len()
    }

    pub fn pair_count(&self) -> usize {
        self.records.len() - self.catalog.len()
    }
}

/// Pass-2 result: one row per gold-labeled pair, ordered by pair.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub rows: Vec<LabeledVector>,
    pub feature_count: usize,
    pub counters: JobCounters,
}

impl Dataset {
    pub fn positives(&self) -> usize {
        self.rows.iter().filter(|row| row.is_hypernym).count()
    }

    pub fn negatives(&self) -> usize {
        self.rows.len() - self.positives()
    }

    /// Non-zero feature slots across all rows.
    pub fn nonzero(&self) -> usize {
        self.rows.iter().map(|row| row.vector.nnz()).sum()
    }
}

/// Runs both passes on one engine with one stemmer.
pub struct Pipeline {
    config: PipelineConfig,
    engine: Engine,
    stemmer: Box<dyn Stem>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(config: PipelineConfig, stemmer: Box<dyn Stem>) -> PipelineResult<Self> {
        let engine = Engine::new(config.engine.clone())?;
        Ok(Self {
            config,
            engine,
            stemmer,
        })
    }

    /// Pipeline with the English Snowball stemmer.
    pub fn english(config: PipelineConfig) -> PipelineResult<Self> {
        Self::new(config, Box::new(SnowballStemmer::english()))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn stemmer(&self) -> &dyn Stem {
        self.stemmer.as_ref()
    }

    /// Pass 1 over raw n-gram records.
    ///
    /// Returns only after both jobs have committed and the catalog is frozen.
    pub fn vocabulary(&self, lines: &[String]) -> PipelineResult<Vocabulary> {
        let mapper = PathSearchMapper::new(self.stemmer.as_ref(), &self.config.noun_tags);
        let combiner: &Combiner<VocabularyKey, VocabularyValue> = &VocabularyCombiner;
        let search = self.engine.run(
            "vocabulary/search",
            lines,
            &mapper,
            Some(combiner),
            &VocabularyReducer,
        )?;

        let mut records = Vec::new();
        let mut support = Vec::new();
        for (_, output) in search.records {
            match output {
                VocabularyOutput::Record(record) => records.push(record),
                VocabularyOutput::Support(path, pair) => support.push((path, pair)),
            }
        }

        let threshold = ThresholdReducer::new(self.config.dp_min);
        let distinct: &Combiner<DependencyPath, NounPair> = &DistinctCombiner;
        let admitted = self.engine.run(
            "vocabulary/threshold",
            &support,
            &SupportMapper,
            Some(distinct),
            &threshold,
        )?;

        // barrier: every accepted path is in hand before the catalog is fixed
        let catalog = Catalog::freeze(admitted.records.into_iter().map(|(_, path)| path));
        records.sort();
        records.extend(catalog.iter().cloned().map(VocabularyRecord::CatalogPath));

        info!(
            dp_min = self.config.dp_min,
            pairs = records.len() - catalog.len(),
            candidate_paths = admitted.counters.reduce_groups,
            catalog = catalog.len(),
            "vocabulary pass finished"
        );

        Ok(Vocabulary {
            records,
            catalog,
            search_counters: search.counters,
            threshold_counters: admitted.counters,
        })
    }

    /// Pass 2 over pass-1 records against a frozen catalog.
    ///
    /// `published` is the feature count recorded with the catalog; a mismatch
    /// fails before any task runs.
    pub fn vectorize(
        &self,
        records: &[VocabularyRecord],
        catalog: &Catalog,
        published: usize,
        hypernyms: &HypernymTable,
    ) -> PipelineResult<Dataset> {
        catalog.check_published(published)?;

        let reducer = VectorizeReducer::new(catalog, hypernyms);
        let job = self
            .engine
            .run("vectorize", records, &PairCountsMapper, None, &reducer)?;

        let mut rows = Vec::with_capacity(job.records.len());
        for (pair, labeled) in job.records {
            if labeled.vector.len() != published {
                return Err(CatalogError::VectorWidth {
                    expected: published,
                    actual: labeled.vector.len(),
                }
                .into());
            }
            rows.push(LabeledVector::new(pair, labeled));
        }
        rows.sort_by(|a, b| a.pair.cmp(&b.pair));

        let dataset = Dataset {
            rows,
            feature_count: published,
            counters: job.counters,
        };
        info!(
            rows = dataset.rows.len(),
            positives = dataset.positives(),
            negatives = dataset.negatives(),
            features = published,
            nonzero = dataset.nonzero(),
            "vectorize pass finished"
        );
        Ok(dataset)
    }

    /// Both passes back to back.
    pub fn run(
        &self,
        lines: &[String],
        hypernyms: &HypernymTable,
    ) -> PipelineResult<(Vocabulary, Dataset)> {
        let vocabulary = self.vocabulary(lines)?;
        let dataset = self.vectorize(
            &vocabulary.records,
            &vocabulary.catalog,
            vocabulary.feature_count(),
            hypernyms,
        )?;
        Ok((vocabulary, dataset))
    }
}
