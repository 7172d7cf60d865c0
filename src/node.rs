use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a node in its tree's arena.
pub type NodeId = usize;

/// A node of an ID3 tree.
///
/// Children are referenced by id, and kept sorted by increasing
/// feature value.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub enum Node {
    Leaf {
        label: i64,
    },
    Split {
        /// 0-based column of the design matrix.
        feature: usize,
        /// Information gain of the split, 0 when it was read back from matrices.
        gain: f64,
        children: Vec<(i64, NodeId)>,
    },
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Child reached by following the edge labelled `value`.
    pub fn get_child_idx(&self, value: i64) -> Option<NodeId> {
        match self {
            Node::Leaf { .. } => None,
            Node::Split { children, .. } => children
                .binary_search_by_key(&value, |(v, _)| *v)
                .ok()
                .map(|i| children[i].1),
        }
    }

    /// Shift every child reference by `offset`, used when a subtree is
    /// appended behind other nodes.
    pub(crate) fn rebase(&mut self, offset: usize) {
        if let Node::Split { children, .. } = self {
            for (_, c) in children.iter_mut() {
                *c += offset;
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Node::Leaf { label } => write!(f, "leaf={}", label),
            Node::Split { feature, gain, children } => {
                let edges: Vec<String> = children.iter().map(|(v, c)| format!("{}->{}", v, c)).collect();
                write!(f, "[f{}] gain={:.4} {}", feature, gain, edges.join(","))
            }
        }
    }
}
