//! Candidate index for the clusterer
//!
//! The first level is keyed by token count, the next `prefix_tokens` levels by
//! the leading tokens of the message. A lookup only scores the clusters stored
//! at the node it reaches, so the candidate set stays small no matter how
//! many clusters exist in total.
//!
//! Each node also has a dedicated wildcard branch. Tokens go there on insert
//! when they contain a digit (with numeric parametrisation on) or when the
//! node already holds `max_children` literal children. Lookups take the exact
//! child first and fall back to the wildcard branch.
//!
//! Removal prunes empty nodes, except literal children of a node that has a
//! wildcard branch: those stay so the node keeps its child count and no token
//! filed under the wildcard branch later gets a literal child of its own.
use crate::cluster::ClusterId;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

#[derive(Debug, Default)]
struct Node {
    children: FxHashMap<String, Node>,
    wildcard: Option<Box<Node>>,
    clusters: SmallVec<[ClusterId; 4]>,
}

impl Node {
    fn is_empty(&self) -> bool {
        self.children.is_empty() && self.wildcard.is_none() && self.clusters.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Literal(String),
    Wildcard,
}

/// Where a cluster was filed, so it can be removed without searching.
#[derive(Debug, Clone)]
struct IndexPath {
    len: usize,
    steps: SmallVec<[Step; 4]>,
}

#[derive(Debug)]
pub struct PrefixTree {
    roots: FxHashMap<usize, Node>,
    locations: FxHashMap<ClusterId, IndexPath>,
    prefix_tokens: usize,
    max_children: usize,
    parametrize_numeric: bool,
}

#[inline]
fn has_digit(token: &str) -> bool {
    token.bytes().any(|b| b.is_ascii_digit())
}

impl PrefixTree {
    pub fn new(prefix_tokens: usize, max_children: usize, parametrize_numeric: bool) -> Self {
        Self {
            roots: FxHashMap::default(),
            locations: FxHashMap::default(),
            prefix_tokens,
            max_children,
            parametrize_numeric,
        }
    }

    fn route(node: &Node, token: &str, max_children: usize, parametrize_numeric: bool) -> Step {
        if parametrize_numeric && has_digit(token) {
            return Step::Wildcard;
        }
        if node.children.contains_key(token) || node.children.len() < max_children {
            Step::Literal(token.to_string())
        } else {
            Step::Wildcard
        }
    }

    /// File `id` under the path for `tokens`.
    pub fn insert(&mut self, id: ClusterId, tokens: &[&str]) {
        let (max_children, parametrize) = (self.max_children, self.parametrize_numeric);
        let len = tokens.len();
        let mut steps = SmallVec::new();

        let mut node = self.roots.entry(len).or_default();
        for token in tokens.iter().take(self.prefix_tokens) {
            let step = Self::route(node, token, max_children, parametrize);
            node = match &step {
                Step::Literal(literal) => node.children.entry(literal.clone()).or_default(),
                Step::Wildcard => &mut **node.wildcard.get_or_insert_with(Box::default),
            };
            steps.push(step);
        }
        node.clusters.push(id);

        self.locations.insert(id, IndexPath { len, steps });
    }

    /// Cluster ids filed under the node `tokens` leads to, in insertion order.
    pub fn candidates(&self, tokens: &[&str]) -> &[ClusterId] {
        let Some(mut node) = self.roots.get(&tokens.len()) else {
            return &[];
        };
        for token in tokens.iter().take(self.prefix_tokens) {
            let next = if self.parametrize_numeric && has_digit(token) {
                node.wildcard.as_deref()
            } else {
                node.children.get(*token).or(node.wildcard.as_deref())
            };
            match next {
                Some(child) => node = child,
                None => return &[],
            }
        }
        &node.clusters
    }

    /// Drop `id` from the index, pruning nodes left empty.
    pub fn remove(&mut self, id: ClusterId) -> bool {
        let Some(path) = self.locations.remove(&id) else {
            return false;
        };
        if let Some(root) = self.roots.get_mut(&path.len) {
            Self::remove_at(root, &path.steps, id);
            if root.is_empty() {
                self.roots.remove(&path.len);
            }
        }
        true
    }

    fn remove_at(node: &mut Node, steps: &[Step], id: ClusterId) {
        let Some((step, rest)) = steps.split_first() else {
            node.clusters.retain(|c| *c != id);
            return;
        };
        match step {
            Step::Literal(token) => {
                if let Some(child) = node.children.get_mut(token) {
                    Self::remove_at(child, rest, id);
                    // Node stays full while overflowed tokens live under its wildcard branch
                    if child.is_empty() && node.wildcard.is_none() {
                        node.children.remove(token);
                    }
                }
            }
            Step::Wildcard => {
                if let Some(child) = node.wildcard.as_deref_mut() {
                    Self::remove_at(child, rest, id);
                    if child.is_empty() {
                        node.wildcard = None;
                    }
                }
            }
        }
    }

    pub fn contains(&self, id: ClusterId) -> bool {
        self.locations.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Distinct token counts currently indexed.
    pub fn length_buckets(&self) -> usize {
        self.roots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> PrefixTree {
        PrefixTree::new(2, 100, true)
    }

    #[test]
    fn test_candidates_share_length_and_prefix() {
        let mut t = tree();
        t.insert(1, &["GET", "/a", "200"]);
        t.insert(2, &["GET", "/a", "404"]);
        t.insert(3, &["GET", "/b", "200"]);
        t.insert(4, &["GET", "/a"]);

        assert_eq!(t.candidates(&["GET", "/a", "500"]), &[1, 2]);
        assert_eq!(t.candidates(&["GET", "/b", "x"]), &[3]);
        assert_eq!(t.candidates(&["GET", "/a"]), &[4]);
        assert!(t.candidates(&["POST", "/a", "200"]).is_empty());
        assert!(t.candidates(&["GET", "/a", "1", "2"]).is_empty());
        assert_eq!(t.length_buckets(), 2);
    }

    #[test]
    fn test_numeric_tokens_share_wildcard_branch() {
        let mut t = tree();
        t.insert(1, &["job", "17", "done"]);
        assert_eq!(t.candidates(&["job", "99", "done"]), &[1]);

        let mut literal = PrefixTree::new(2, 100, false);
        literal.insert(1, &["job", "17", "done"]);
        assert!(literal.candidates(&["job", "99", "done"]).is_empty());
    }

    #[test]
    fn test_full_node_overflows_into_wildcard() {
        let mut t = PrefixTree::new(1, 2, false);
        t.insert(1, &["alpha", "x"]);
        t.insert(2, &["beta", "x"]);
        t.insert(3, &["gamma", "x"]);

        assert_eq!(t.candidates(&["alpha", "y"]), &[1]);
        assert_eq!(t.candidates(&["gamma", "y"]), &[3]);
        // unknown tokens fall back to the overflow branch
        assert_eq!(t.candidates(&["delta", "y"]), &[3]);
    }

    #[test]
    fn test_short_sequences_stop_early() {
        let mut t = PrefixTree::new(3, 100, true);
        t.insert(1, &["only"]);
        t.insert(2, &[]);
        assert_eq!(t.candidates(&["only"]), &[1]);
        assert_eq!(t.candidates(&[]), &[2]);
    }

    #[test]
    fn test_remove_prunes_empty_nodes() {
        let mut t = tree();
        t.insert(1, &["a", "b", "c"]);
        t.insert(2, &["a", "b", "d"]);

        assert!(t.remove(1));
        assert!(!t.remove(1));
        assert!(!t.contains(1));
        assert_eq!(t.candidates(&["a", "b", "c"]), &[2]);

        assert!(t.remove(2));
        assert!(t.is_empty());
        assert_eq!(t.length_buckets(), 0);
    }

    #[test]
    fn test_remove_keeps_full_node_beside_wildcard_branch() {
        let mut t = PrefixTree::new(1, 2, false);
        t.insert(1, &["a", "x"]);
        t.insert(2, &["b", "x"]);
        t.insert(3, &["c", "x"]);

        assert!(t.remove(1));
        // "a" keeps its slot, so "c" still resolves to the overflow branch
        assert_eq!(t.candidates(&["c", "x"]), &[3]);
        t.insert(4, &["c", "y"]);
        assert_eq!(t.candidates(&["c", "x"]), &[3, 4]);
        assert!(t.candidates(&["a", "x"]).is_empty());
    }
}
