//! Reading inputs and writing artifacts.
//!
//! Every I/O failure is reported with the path involved.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{CorpusError, PipelineError, PipelineResult};
use crate::ngram::Stem;
use crate::vectorizer::{
    format_feature_count, parse_feature_count, Catalog, HypernymTable, LabeledVector,
    VocabularyRecord,
};

/// Pass-1 pair and catalog records.
pub const VOCABULARY_FILE: &str = "vocabulary.tsv";
/// Frozen catalog, CBOR encoded.
pub const CATALOG_FILE: &str = "catalog.cbor";
/// Published catalog size.
pub const FEATURE_COUNT_FILE: &str = "feature_count.txt";
/// Labeled feature vectors.
pub const VECTORS_FILE: &str = "vectors.tsv";

fn io_error(path: &Path, e: std::io::Error) -> CorpusError {
    CorpusError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// Expand inputs into a sorted file list. Directories contribute their
/// regular files, non-recursively.
pub fn input_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, CorpusError> {
    let mut files = Vec::new();
    for input in inputs {
        let meta = fs::metadata(input).map_err(|e| io_error(input, e))?;
        if meta.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(input)
                .map_err(|e| io_error(input, e))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file())
                .collect();
            if found.is_empty() {
                return Err(CorpusError::Empty {
                    path: input.display().to_string(),
                });
            }
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

/// Every non-blank line of every input file, in file order.
pub fn read_records(inputs: &[PathBuf]) -> Result<Vec<String>, CorpusError> {
    let mut lines = Vec::new();
    for file in input_files(inputs)? {
        let before = lines.len();
        let reader = BufReader::new(File::open(&file).map_err(|e| io_error(&file, e))?);
        for line in reader.lines() {
            let line = line.map_err(|e| io_error(&file, e))?;
            if !line.trim().is_empty() {
                lines.push(line);
            }
        }
        debug!(file = %file.display(), records = lines.len() - before, "read input file");
    }
    info!(records = lines.len(), "input loaded");
    Ok(lines)
}

pub fn read_hypernyms(path: &Path, stemmer: &dyn Stem) -> Result<HypernymTable, CorpusError> {
    let text = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    let table = HypernymTable::parse(text.lines(), stemmer);
    info!(path = %path.display(), pairs = table.len(), "hypernym table loaded");
    Ok(table)
}

fn write_lines<I>(path: &Path, lines: I) -> Result<(), CorpusError>
where
    I: IntoIterator<Item = String>,
{
    let file = File::create(path).map_err(|e| io_error(path, e))?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writeln!(writer, "{line}").map_err(|e| io_error(path, e))?;
    }
    writer.flush().map_err(|e| io_error(path, e))
}

pub fn write_vocabulary(path: &Path, records: &[VocabularyRecord]) -> Result<(), CorpusError> {
    write_lines(path, records.iter().map(VocabularyRecord::to_line))
}

pub fn read_vocabulary(path: &Path) -> Result<Vec<VocabularyRecord>, CorpusError> {
    let reader = BufReader::new(File::open(path).map_err(|e| io_error(path, e))?);
    let mut records = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| io_error(path, e))?;
        if line.is_empty() {
            continue;
        }
        let record = VocabularyRecord::parse_line(&line).map_err(|e| CorpusError::Malformed {
            path: path.display().to_string(),
            line: number + 1,
            message: e.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

pub fn write_vectors(path: &Path, rows: &[LabeledVector]) -> Result<(), CorpusError> {
    write_lines(path, rows.iter().map(LabeledVector::to_line))
}

/// Write the catalog and its published size side by side.
pub fn write_catalog(dir: &Path, catalog: &Catalog) -> PipelineResult<()> {
    let path = dir.join(CATALOG_FILE);
    let file = File::create(&path).map_err(|e| io_error(&path, e))?;
    let mut writer = BufWriter::new(file);
    catalog.write_cbor(&mut writer)?;
    writer.flush().map_err(|e| io_error(&path, e))?;

    let count_path = dir.join(FEATURE_COUNT_FILE);
    fs::write(&count_path, format_feature_count(catalog.len()))
        .map_err(|e| io_error(&count_path, e))?;
    Ok(())
}

pub fn read_catalog(path: &Path) -> PipelineResult<Catalog> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    Ok(Catalog::read_cbor(BufReader::new(file))?)
}

pub fn read_feature_count(path: &Path) -> PipelineResult<usize> {
    let text = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    parse_feature_count(&text).map_err(PipelineError::from)
}

/// Create the output directory if needed.
pub fn ensure_dir(dir: &Path) -> Result<(), CorpusError> {
    fs::create_dir_all(dir).map_err(|e| io_error(dir, e))
}
