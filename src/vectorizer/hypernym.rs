use std::collections::HashMap;

use tracing::warn;

use crate::ngram::{NounPair, Stem};

/// Gold labels for noun pairs, keyed by stemmed `(hyponym-side, hypernym-side)`.
///
/// Built once before the vectorizer pass and shared read-only by every
/// reduce task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HypernymTable {
    labels: HashMap<NounPair, bool>,
}

impl HypernymTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `word1 word2 True|False` lines, one pair per line.
    ///
    /// Both words go through `stemmer` so the keys match pass-1 pair keys.
    /// Blank lines are ignored; malformed lines are logged and skipped.
    /// A later line for the same pair overrides an earlier one.
    pub fn parse<'a, I>(lines: I, stemmer: &dyn Stem) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut table = Self::new();
        for (number, line) in lines.into_iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Some((first, second, label)) => {
                    table.insert(NounPair::new(stemmer.stem(first), stemmer.stem(second)), label);
                }
                None => {
                    warn!(line = number + 1, content = line, "skipping malformed hypernym line")
                }
            }
        }
        table
    }

    pub fn insert(&mut self, pair: NounPair, is_hypernym: bool) {
        self.labels.insert(pair, is_hypernym);
    }

    /// `None` when the pair has no gold label.
    #[inline]
    pub fn lookup(&self, pair: &NounPair) -> Option<bool> {
        self.labels.get(pair).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

fn parse_line(line: &str) -> Option<(&str, &str, bool)> {
    let mut fields = line.split_whitespace();
    let first = fields.next()?;
    let second = fields.next()?;
    let label = fields.next()?;
    if fields.next().is_some() {
        return None;
    }
    let label = if label.eq_ignore_ascii_case("true") {
        true
    } else if label.eq_ignore_ascii_case("false") {
        false
    } else {
        return None;
    };
    Some((first, second, label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ngram::SnowballStemmer;

    #[test]
    fn labels_are_keyed_by_stems() {
        let table = HypernymTable::parse(
            ["dogs animals True", "cat\tcar\tFalse", ""],
            &SnowballStemmer::english(),
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup(&NounPair::new("dog", "anim")), Some(true));
        assert_eq!(table.lookup(&NounPair::new("cat", "car")), Some(false));
        assert_eq!(table.lookup(&NounPair::new("anim", "dog")), None);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let table = HypernymTable::parse(
            ["dog animal", "dog animal maybe", "dog animal True extra", "Dog Animal true"],
            &SnowballStemmer::english(),
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup(&NounPair::new("dog", "anim")), Some(true));
    }
}
