use crate::error::RecordError;
use crate::ngram::stem::{is_key_safe, Stem};
use crate::ngram::token::{parse_record, TokenDescriptor};

/// A token placed in the reconstructed dependency tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub word: String,
    pub stem: String,
    pub pos_tag: String,
    pub dependency_label: String,
    pub head_index: usize,
    /// Positions of the children in the owning tree, in input order.
    pub children: Vec<usize>,
}

impl TreeNode {
    /// The part of a dependency path this node contributes.
    #[inline]
    pub fn path_component(&self) -> &str {
        &self.pos_tag
    }
}

/// Rooted dependency tree of one record.
///
/// Nodes live in an arena in input order; `children` hold arena positions.
/// Every node is reachable from the single root.
#[derive(Debug, Clone)]
pub struct ParseTree {
    nodes: Vec<TreeNode>,
    root: usize,
}

impl ParseTree {
    /// Build the tree for one record.
    ///
    /// All head indices are checked before any node is allocated, so an
    /// invalid record never yields a partial tree.
    pub fn build(
        descriptors: Vec<TokenDescriptor>,
        stemmer: &dyn Stem,
    ) -> Result<Self, RecordError> {
        let len = descriptors.len();
        let root = Self::validate_heads(&descriptors)?;

        let mut nodes = Vec::with_capacity(len);
        for d in descriptors {
            let stem = stemmer.stem(&d.word);
            if !is_key_safe(&stem) {
                return Err(RecordError::BadStem { word: d.word, stem });
            }
            nodes.push(TreeNode {
                stem,
                word: d.word,
                pos_tag: d.pos_tag,
                dependency_label: d.dependency_label,
                head_index: d.head_index,
                children: Vec::new(),
            });
        }

        for position in 0..len {
            let head = nodes[position].head_index;
            if head > 0 {
                nodes[head - 1].children.push(position);
            }
        }

        let tree = Self { nodes, root };
        if let Some(position) = tree.first_detached() {
            return Err(RecordError::Detached {
                position: position + 1,
            });
        }
        Ok(tree)
    }

    /// Parse an input line and build its tree.
    pub fn from_line(line: &str, stemmer: &dyn Stem) -> Result<Self, RecordError> {
        Self::build(parse_record(line)?, stemmer)
    }

    /// Returns the root position.
    fn validate_heads(descriptors: &[TokenDescriptor]) -> Result<usize, RecordError> {
        let len = descriptors.len();
        let mut roots = descriptors
            .iter()
            .enumerate()
            .filter(|(_, d)| d.head_index == 0)
            .map(|(i, _)| i);
        let root = roots.next().ok_or(RecordError::NoRoot)?;
        let extra = roots.count();
        if extra > 0 {
            return Err(RecordError::MultipleRoots { count: extra + 1 });
        }
        if let Some(d) = descriptors.iter().find(|d| d.head_index > len) {
            return Err(RecordError::HeadOutOfRange {
                head: d.head_index,
                len,
            });
        }
        Ok(root)
    }

    /// First node (0-based) not reachable from the root, if any.
    /// Only possible when head indices form a cycle.
    fn first_detached(&self) -> Option<usize> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![self.root];
        while let Some(position) = stack.pop() {
            if std::mem::replace(&mut seen[position], true) {
                continue;
            }
            stack.extend(self.nodes[position].children.iter().copied());
        }
        seen.iter().position(|s| !s)
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[self.root]
    }

    pub fn root_position(&self) -> usize {
        self.root
    }

    pub fn node(&self, position: usize) -> Option<&TreeNode> {
        self.nodes.get(position)
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, position: usize) -> impl Iterator<Item = &TreeNode> {
        self.nodes[position].children.iter().map(|&c| &self.nodes[c])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Verbatim;
    impl Stem for Verbatim {
        fn stem(&self, word: &str) -> String {
            word.to_string()
        }
    }

    fn tree(ngram: &str) -> Result<ParseTree, RecordError> {
        ParseTree::from_line(&format!("head\t{ngram}\t1"), &Verbatim)
    }

    #[test]
    fn chain_builds_single_rooted_tree() {
        let t = tree("animal/NN/root/0 is/VB/cop/1 dog/NN/nsubj/2").unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.root().word, "animal");
        assert_eq!(t.root_position(), 0);
        assert_eq!(t.children(0).map(|n| n.word.as_str()).collect::<Vec<_>>(), ["is"]);
        assert_eq!(t.children(1).map(|n| n.word.as_str()).collect::<Vec<_>>(), ["dog"]);
        assert_eq!(t.nodes().iter().filter(|n| n.head_index == 0).count(), 1);
    }

    #[test]
    fn root_need_not_be_first() {
        let t = tree("the/DT/det/2 dog/NN/root/0 barks/VBZ/dep/2").unwrap();
        assert_eq!(t.root().word, "dog");
        assert_eq!(t.children(1).map(|n| n.word.as_str()).collect::<Vec<_>>(), ["the", "barks"]);
    }

    #[test]
    fn stems_each_node_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        struct Counting(AtomicUsize);
        impl Stem for Counting {
            fn stem(&self, word: &str) -> String {
                self.0.fetch_add(1, Ordering::Relaxed);
                word.to_uppercase()
            }
        }
        let stemmer = Counting(AtomicUsize::new(0));
        let t = ParseTree::from_line("h\tdog/NN/root/0 cat/NN/conj/1", &stemmer).unwrap();
        assert_eq!(stemmer.0.load(Ordering::Relaxed), 2);
        assert_eq!(t.node(1).unwrap().stem, "CAT");
    }

    #[test]
    fn stems_unfit_for_pair_keys_are_rejected() {
        struct Fixed(&'static str);
        impl Stem for Fixed {
            fn stem(&self, _word: &str) -> String {
                self.0.to_string()
            }
        }
        for stem in ["", "an$im", "an\tim"] {
            let err = ParseTree::from_line("h\tdog/NN/root/0 cat/NN/conj/1", &Fixed(stem))
                .unwrap_err();
            assert_eq!(
                err,
                RecordError::BadStem {
                    word: "dog".into(),
                    stem: stem.into()
                }
            );
        }
    }

    #[test]
    fn head_out_of_range_fails_fast() {
        assert_eq!(
            tree("dog/NN/root/0 cat/NN/dep/7").unwrap_err(),
            RecordError::HeadOutOfRange { head: 7, len: 2 }
        );
    }

    #[test]
    fn root_count_must_be_one() {
        assert_eq!(tree("dog/NN/dep/2 cat/NN/dep/1").unwrap_err(), RecordError::NoRoot);
        assert_eq!(
            tree("dog/NN/root/0 cat/NN/root/0").unwrap_err(),
            RecordError::MultipleRoots { count: 2 }
        );
    }

    #[test]
    fn cycles_are_detached() {
        let err = tree("dog/NN/root/0 cat/NN/dep/3 bird/NN/dep/2").unwrap_err();
        assert_eq!(err, RecordError::Detached { position: 2 });

        let err = tree("dog/NN/root/0 cat/NN/dep/2").unwrap_err();
        assert_eq!(err, RecordError::Detached { position: 2 });
    }

    #[test]
    fn malformed_token_never_builds() {
        assert!(matches!(tree("dog/NN/root/0 ,/,/p/1"), Err(RecordError::EmptyWord { .. })));
        assert!(matches!(tree("dog/NN/0"), Err(RecordError::Arity { .. })));
    }

    #[test]
    fn empty_ngram_has_no_root() {
        assert_eq!(ParseTree::build(Vec::new(), &Verbatim).unwrap_err(), RecordError::NoRoot);
    }
}
