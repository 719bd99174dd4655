use rust_stemmers::{Algorithm, Stemmer};

/// Maps a raw word to its canonical stem. Pure and deterministic.
///
/// A stem becomes half of a `stem1$stem2` key, so it must be non-empty and
/// contain no `$`, tab or newline. Trees reject words whose stem breaks this.
pub trait Stem: Send + Sync {
    fn stem(&self, word: &str) -> String;
}

/// Snowball (Porter2) English stemmer. Input is lowercased first.
pub struct SnowballStemmer {
    inner: Stemmer,
}

impl SnowballStemmer {
    pub fn english() -> Self {
        Self {
            inner: Stemmer::create(Algorithm::English),
        }
    }
}

/// Whether `stem` can be written as one side of a pair key.
pub fn is_key_safe(stem: &str) -> bool {
    !stem.is_empty() && !stem.contains(|c| matches!(c, '$' | '\t' | '\n' | '\r'))
}

impl Default for SnowballStemmer {
    fn default() -> Self {
        Self::english()
    }
}

impl std::fmt::Debug for SnowballStemmer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SnowballStemmer(English)")
    }
}

impl Stem for SnowballStemmer {
    fn stem(&self, word: &str) -> String {
        let lower = word.to_lowercase();
        self.inner.stem(&lower).into_owned()
    }
}
