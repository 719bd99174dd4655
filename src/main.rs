//! dep-path-vectorizer CLI: dependency-path features for hypernym detection.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use miette::Result;
use tracing::info;

use dep_path_vectorizer::corpus::{
    self, CATALOG_FILE, FEATURE_COUNT_FILE, VECTORS_FILE, VOCABULARY_FILE,
};
use dep_path_vectorizer::{ConfigFile, Pipeline, PipelineConfig, Vocabulary};

#[derive(Parser)]
#[command(
    name = "dep-path-vectorizer",
    version,
    about = "Dependency-path feature vectors for noun-pair hypernymy"
)]
struct Cli {
    /// TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimum distinct noun pairs a path must connect (overrides config).
    #[arg(long, global = true)]
    dp_min: Option<i64>,

    /// Worker threads (overrides config, 0 = one per core).
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Disable the map-side combiner.
    #[arg(long, global = true)]
    no_combine: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Inputs {
    /// N-gram record files or directories of them.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run both passes and write every artifact.
    Run {
        #[command(flatten)]
        inputs: Inputs,

        /// Hypernym gold table (`word1 word2 True|False` per line).
        #[arg(long)]
        hypernyms: PathBuf,

        /// Output directory.
        #[arg(long, default_value = "out")]
        out: PathBuf,
    },

    /// Pass 1 only: pair records, catalog and feature count.
    Vocabulary {
        #[command(flatten)]
        inputs: Inputs,

        /// Output directory.
        #[arg(long, default_value = "out")]
        out: PathBuf,
    },

    /// Pass 2 only, from the artifacts of a previous vocabulary run.
    Vectorize {
        /// Directory holding vocabulary.tsv, catalog.cbor and feature_count.txt.
        #[arg(long)]
        from: PathBuf,

        /// Hypernym gold table.
        #[arg(long)]
        hypernyms: PathBuf,

        /// Output file (defaults to <from>/vectors.tsv).
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let file = match &cli.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    let config = file
        .with_overrides(cli.dp_min, cli.workers, cli.no_combine)
        .into_config()?;
    Ok(config)
}

fn write_vocabulary_artifacts(out: &Path, vocabulary: &Vocabulary) -> Result<()> {
    corpus::ensure_dir(out)?;
    corpus::write_vocabulary(&out.join(VOCABULARY_FILE), &vocabulary.records)?;
    corpus::write_catalog(out, &vocabulary.catalog)?;
    info!(
        dir = %out.display(),
        pairs = vocabulary.pair_count(),
        features = vocabulary.feature_count(),
        "vocabulary artifacts written"
    );
    Ok(())
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let pipeline = Pipeline::english(config)?;
    let started = Instant::now();

    match cli.command {
        Commands::Run {
            inputs,
            hypernyms,
            out,
        } => {
            let records = corpus::read_records(&inputs.inputs)?;
            let gold = corpus::read_hypernyms(&hypernyms, pipeline.stemmer())?;
            let (vocabulary, dataset) = pipeline.run(&records, &gold)?;
            write_vocabulary_artifacts(&out, &vocabulary)?;
            let vectors = out.join(VECTORS_FILE);
            corpus::write_vectors(&vectors, &dataset.rows)?;
            println!(
                "{} rows ({} positive) x {} features -> {}",
                dataset.rows.len(),
                dataset.positives(),
                dataset.feature_count,
                vectors.display()
            );
        }

        Commands::Vocabulary { inputs, out } => {
            let records = corpus::read_records(&inputs.inputs)?;
            let vocabulary = pipeline.vocabulary(&records)?;
            write_vocabulary_artifacts(&out, &vocabulary)?;
            println!(
                "{} pairs, {} catalog paths -> {}",
                vocabulary.pair_count(),
                vocabulary.feature_count(),
                out.display()
            );
        }

        Commands::Vectorize {
            from,
            hypernyms,
            out,
        } => {
            let records = corpus::read_vocabulary(&from.join(VOCABULARY_FILE))?;
            let catalog = corpus::read_catalog(&from.join(CATALOG_FILE))?;
            let published = corpus::read_feature_count(&from.join(FEATURE_COUNT_FILE))?;
            let gold = corpus::read_hypernyms(&hypernyms, pipeline.stemmer())?;
            let dataset = pipeline.vectorize(&records, &catalog, published, &gold)?;
            let vectors = out.unwrap_or_else(|| from.join(VECTORS_FILE));
            if let Some(parent) = vectors.parent().filter(|p| !p.as_os_str().is_empty()) {
                corpus::ensure_dir(parent)?;
            }
            corpus::write_vectors(&vectors, &dataset.rows)?;
            println!(
                "{} rows ({} positive) x {} features -> {}",
                dataset.rows.len(),
                dataset.positives(),
                dataset.feature_count,
                vectors.display()
            );
        }
    }

    info!(elapsed_ms = started.elapsed().as_millis() as u64, "done");
    Ok(())
}
