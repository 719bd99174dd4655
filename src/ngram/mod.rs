//! Syntactic n-gram records: token parsing, tree reconstruction and
//! noun-to-noun dependency path search.

pub mod key;
pub mod path;
pub mod stem;
pub mod token;
pub mod tree;

use std::collections::HashSet;

pub use key::{DependencyPath, NounPair, PAIR_SEPARATOR};
pub use path::{search_paths, PathEmission, PATH_SEPARATOR};
pub use stem::{SnowballStemmer, Stem};
pub use token::{parse_record, TokenDescriptor};
pub use tree::{ParseTree, TreeNode};

/// Penn Treebank noun tags.
pub const DEFAULT_NOUN_TAGS: [&str; 4] = ["NN", "NNS", "NNP", "NNPS"];

/// POS tags that mark a node as a noun for path search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NounTags {
    tags: HashSet<String>,
}

impl NounTags {
    pub fn new<I, T>(tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    #[inline]
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    #[inline]
    pub fn is_noun(&self, node: &TreeNode) -> bool {
        self.contains(&node.pos_tag)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl Default for NounTags {
    fn default() -> Self {
        Self::new(DEFAULT_NOUN_TAGS)
    }
}
