use std::str::FromStr;

use crate::error::RecordError;

/// One `word/pos_tag/dependency_label/head_index` token of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDescriptor {
    pub word: String,
    pub pos_tag: String,
    pub dependency_label: String,
    /// 1-based head position within the record, 0 for the root.
    pub head_index: usize,
}

impl FromStr for TokenDescriptor {
    type Err = RecordError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = token.split('/').collect();
        if fields.len() != 4 {
            return Err(RecordError::Arity {
                token: token.to_string(),
                fields: fields.len(),
            });
        }

        let word = strip_non_alphabetic(fields[0]);
        if word.is_empty() {
            return Err(RecordError::EmptyWord {
                token: token.to_string(),
            });
        }
        let pos_tag = strip_non_alphabetic(fields[1]);
        if pos_tag.is_empty() {
            return Err(RecordError::EmptyTag {
                token: token.to_string(),
            });
        }
        let head_index = fields[3]
            .parse::<usize>()
            .map_err(|_| RecordError::BadHeadIndex {
                token: token.to_string(),
            })?;

        Ok(Self {
            word,
            pos_tag,
            dependency_label: fields[2].to_string(),
            head_index,
        })
    }
}

/// Keep ASCII letters only.
fn strip_non_alphabetic(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_alphabetic()).collect()
}

/// Parse one input line: `head_word \t syntactic_ngram \t total_count \t counts_by_year`.
///
/// Only the n-gram field is read; its tokens are space separated.
/// The whole record is rejected on the first bad token.
pub fn parse_record(line: &str) -> Result<Vec<TokenDescriptor>, RecordError> {
    let ngram = line.split('\t').nth(1).ok_or(RecordError::MissingField)?;
    ngram.split_whitespace().map(str::parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_token() {
        let token: TokenDescriptor = "dogs/NNS/nsubj/2".parse().unwrap();
        assert_eq!(token.word, "dogs");
        assert_eq!(token.pos_tag, "NNS");
        assert_eq!(token.dependency_label, "nsubj");
        assert_eq!(token.head_index, 2);
    }

    #[test]
    fn strips_non_alphabetic_characters() {
        let token: TokenDescriptor = "co-op's/NN$/dobj/0".parse().unwrap();
        assert_eq!(token.word, "coops");
        assert_eq!(token.pos_tag, "NN");
    }

    #[test]
    fn rejects_wrong_arity() {
        let err = "a/b/c".parse::<TokenDescriptor>().unwrap_err();
        assert_eq!(err, RecordError::Arity { token: "a/b/c".into(), fields: 3 });

        let err = "1/2/NN/dep/0".parse::<TokenDescriptor>().unwrap_err();
        assert!(matches!(err, RecordError::Arity { fields: 5, .. }));
    }

    #[test]
    fn rejects_empty_word_or_tag() {
        assert!(matches!(
            "1984/CD/num/0".parse::<TokenDescriptor>(),
            Err(RecordError::EmptyWord { .. })
        ));
        assert!(matches!(
            ",/,/punct/0".parse::<TokenDescriptor>(),
            Err(RecordError::EmptyWord { .. })
        ));
        assert!(matches!(
            "dog/$/dep/0".parse::<TokenDescriptor>(),
            Err(RecordError::EmptyTag { .. })
        ));
    }

    #[test]
    fn rejects_non_numeric_head() {
        assert!(matches!(
            "dog/NN/dep/x".parse::<TokenDescriptor>(),
            Err(RecordError::BadHeadIndex { .. })
        ));
        assert!(matches!(
            "dog/NN/dep/-1".parse::<TokenDescriptor>(),
            Err(RecordError::BadHeadIndex { .. })
        ));
    }

    #[test]
    fn parses_record_line() {
        let line = "dog\tdog/NN/root/0 barks/VB/nsubj/1\t12\t2000,12";
        let tokens = parse_record(line).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].word, "barks");
        assert_eq!(tokens[1].head_index, 1);
    }

    #[test]
    fn record_without_ngram_field_is_invalid() {
        assert_eq!(parse_record("dog/NN/root/0"), Err(RecordError::MissingField));
    }

    #[test]
    fn one_bad_token_rejects_record() {
        let line = "x\tdog/NN/root/0 bad/VB/1\t3";
        assert!(matches!(parse_record(line), Err(RecordError::Arity { .. })));
    }
}
