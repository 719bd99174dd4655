use crate::ngram::key::{DependencyPath, NounPair};
use crate::ngram::tree::ParseTree;
use crate::ngram::NounTags;

/// Separator between path components.
pub const PATH_SEPARATOR: char = ':';

/// One completed noun-to-noun path found in a tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathEmission {
    pub path: DependencyPath,
    pub pair: NounPair,
}

/// Traversal state: a node to visit, the path accumulated above it
/// (`None` until a noun has been seen on this branch) and the noun that
/// opened the current path.
struct Frame {
    node: usize,
    prefix: Option<String>,
    start: usize,
}

/// Enumerate every dependency path between a noun and the next noun below it.
///
/// Depth-first, pre-order, children left to right. A noun that closes a path
/// immediately opens the next one, so it can be the end of one pair and the
/// start of another. Uses an explicit stack, so tree depth is not bounded by
/// the call stack.
pub fn search_paths(tree: &ParseTree, nouns: &NounTags) -> Vec<PathEmission> {
    let mut emissions = Vec::new();
    if tree.is_empty() {
        return emissions;
    }

    let nodes = tree.nodes();
    let mut stack = vec![Frame {
        node: tree.root_position(),
        prefix: None,
        start: tree.root_position(),
    }];

    while let Some(Frame { node, prefix, start }) = stack.pop() {
        let current = &nodes[node];
        let component = current.path_component();

        let (child_prefix, child_start) = if nouns.is_noun(current) {
            if let Some(prefix) = prefix {
                let start_node = &nodes[start];
                emissions.push(PathEmission {
                    path: DependencyPath::new(format!("{prefix}{PATH_SEPARATOR}{component}")),
                    pair: NounPair::new(start_node.stem.as_str(), current.stem.as_str()),
                });
            }
            (Some(component.to_string()), node)
        } else {
            let extended = prefix.map(|p| format!("{p}{PATH_SEPARATOR}{component}"));
            (extended, start)
        };

        // reversed so the leftmost child is popped first
        for &child in current.children.iter().rev() {
            stack.push(Frame {
                node: child,
                prefix: child_prefix.clone(),
                start: child_start,
            });
        }
    }

    emissions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ngram::stem::Stem;

    struct Verbatim;
    impl Stem for Verbatim {
        fn stem(&self, word: &str) -> String {
            word.to_string()
        }
    }

    fn search(ngram: &str) -> Vec<(String, String)> {
        let tree = ParseTree::from_line(&format!("h\t{ngram}\t1"), &Verbatim).unwrap();
        search_paths(&tree, &NounTags::default())
            .into_iter()
            .map(|e| (e.path.to_string(), e.pair.to_string()))
            .collect()
    }

    #[test]
    fn single_noun_emits_nothing() {
        assert!(search("dog/NN/root/0 barks/VB/nsubj/1").is_empty());
    }

    #[test]
    fn chain_through_verb() {
        assert_eq!(
            search("animal/NN/root/0 is/VB/cop/1 dog/NN/nsubj/2"),
            [("NN:VB:NN".to_string(), "animal$dog".to_string())]
        );
    }

    #[test]
    fn adjacent_nouns() {
        assert_eq!(
            search("dog/NN/root/0 cats/NNS/conj/1"),
            [("NN:NNS".to_string(), "dog$cats".to_string())]
        );
    }

    #[test]
    fn closing_noun_opens_next_path() {
        // a -> of -> b -> in -> c
        let got = search("a/NN/root/0 of/IN/prep/1 b/NN/pobj/2 in/IN/prep/3 c/NNP/pobj/4");
        assert_eq!(
            got,
            [
                ("NN:IN:NN".to_string(), "a$b".to_string()),
                ("NN:IN:NNP".to_string(), "b$c".to_string()),
            ]
        );
    }

    #[test]
    fn non_noun_root_contributes_nothing_until_a_noun() {
        // root verb with two noun subtrees: no path crosses the verb
        let got = search("eats/VB/root/0 dog/NN/nsubj/1 bone/NN/dobj/1");
        assert!(got.is_empty());
    }

    #[test]
    fn branches_share_start_noun() {
        // dog has two children; each branch ends at a different noun
        let got = search("dog/NN/root/0 with/IN/prep/1 collar/NN/pobj/2 and/CC/cc/1 cat/NN/conj/4");
        assert_eq!(
            got,
            [
                ("NN:IN:NN".to_string(), "dog$collar".to_string()),
                ("NN:CC:NN".to_string(), "dog$cat".to_string()),
            ]
        );
    }

    #[test]
    fn deterministic_across_runs() {
        let ngram = "a/NN/root/0 b/NN/dep/1 c/VB/dep/1 d/NNS/dep/3 e/NN/dep/2";
        assert_eq!(search(ngram), search(ngram));
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let depth = 5_000;
        let mut tokens = vec!["top/NN/root/0".to_string()];
        for i in 1..depth {
            tokens.push(format!("w/JJ/amod/{i}"));
        }
        tokens.push(format!("bottom/NN/dep/{depth}"));
        let tree = ParseTree::from_line(&format!("h\t{}\t1", tokens.join(" ")), &Verbatim).unwrap();
        let got = search_paths(&tree, &NounTags::default());
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].path.components().count(), depth + 1);
        assert_eq!(got[0].pair, NounPair::new("top", "bottom"));
    }

    #[test]
    fn custom_noun_tags() {
        let tree = ParseTree::from_line("h\tdog/NN/root/0 runs/VB/dep/1", &Verbatim).unwrap();
        let tags = NounTags::new(["NN", "VB"]);
        let got = search_paths(&tree, &tags);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].path.as_str(), "NN:VB");
    }
}
