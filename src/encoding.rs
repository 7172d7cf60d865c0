//! Encoding
//!
//! Conversion between a [`Tree`] and its two-matrix form.
//!
//! The nodes matrix has one `(splitFeature, payload)` row per node, with
//! `splitFeature == -1` for leaves, whose payload is the label, and the
//! 1-based feature column otherwise. The edges matrix has one
//! `(parent, value, child)` row per edge, node references are 1-based rows
//! of the nodes matrix. A tree without edges stores the 1x1 matrix `[-1]`.
use crate::constants::{EDGE_COLS, LEAF_SENTINEL, NODE_COLS};
use crate::data::DenseMatrix;
use crate::errors::Id3Error;
use crate::node::{Node, NodeId};
use crate::tree::Tree;
use crate::utils::is_integer_code;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TreeMatrices {
    pub nodes: DenseMatrix,
    pub edges: DenseMatrix,
}

impl TreeMatrices {
    /// Encode a tree. Node rows follow the arena order, edges are listed
    /// depth first: the edge to a child, then the edges inside it.
    pub fn from_tree(tree: &Tree) -> Result<Self, Id3Error> {
        if tree.nodes.is_empty() {
            return Err(Id3Error::MalformedTree("the tree has no nodes".to_string()));
        }
        let mut nodes = DenseMatrix::zeros(tree.nodes.len(), NODE_COLS);
        for (i, node) in tree.nodes.iter().enumerate() {
            match node {
                Node::Leaf { label } => {
                    nodes.set(i, 0, LEAF_SENTINEL);
                    nodes.set(i, 1, *label as f64);
                }
                Node::Split { feature, .. } => {
                    nodes.set(i, 0, (*feature + 1) as f64);
                }
            }
        }

        let mut rows: Vec<[f64; EDGE_COLS]> = Vec::with_capacity(tree.n_edges());
        push_edges(tree, 0, &mut rows);
        let edges = if rows.is_empty() {
            DenseMatrix::new(vec![LEAF_SENTINEL], 1, 1)?
        } else {
            DenseMatrix::from_rows(&rows)?
        };
        Ok(TreeMatrices { nodes, edges })
    }

    /// Does the edges matrix hold the single leaf marker.
    pub fn is_leaf_only(&self) -> bool {
        self.edges.rows() == 1 && self.edges.cols() == 1 && self.edges.get(0, 0) == LEAF_SENTINEL
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.rows()
    }

    pub fn n_edges(&self) -> usize {
        if self.is_leaf_only() {
            0
        } else {
            self.edges.rows()
        }
    }

    /// Check that nodes is `R x 2` with `R > 0`, and that edges is either
    /// the leaf marker or `E x 3`.
    pub fn check_shape(&self) -> Result<(), Id3Error> {
        if self.nodes.rows() == 0 || self.nodes.cols() != NODE_COLS {
            return Err(Id3Error::MalformedTree(format!(
                "the nodes matrix must be R x {}, got {} x {}",
                NODE_COLS,
                self.nodes.rows(),
                self.nodes.cols()
            )));
        }
        if !self.is_leaf_only() && self.edges.cols() != EDGE_COLS {
            return Err(Id3Error::MalformedTree(format!(
                "the edges matrix must be E x {}, got {} x {}",
                EDGE_COLS,
                self.edges.rows(),
                self.edges.cols()
            )));
        }
        Ok(())
    }

    /// Decode the matrices into a tree, checking that they describe one.
    ///
    /// Row 1 of the nodes matrix must be the root, every other node needs
    /// exactly one parent and must be reachable from the root.
    pub fn to_tree(&self) -> Result<Tree, Id3Error> {
        self.check_shape()?;
        let n = self.nodes.rows();
        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let feature = self.nodes.get(i, 0);
            let payload = self.nodes.get(i, 1);
            if feature == LEAF_SENTINEL {
                if !is_integer_code(payload) {
                    return Err(Id3Error::MalformedTree(format!("leaf {} has label {}", i + 1, payload)));
                }
                nodes.push(Node::Leaf { label: payload as i64 });
            } else if is_integer_code(feature) && feature >= 1.0 {
                nodes.push(Node::Split {
                    feature: feature as usize - 1,
                    gain: 0.0,
                    children: Vec::new(),
                });
            } else {
                return Err(Id3Error::MalformedTree(format!(
                    "node {} has split feature {}",
                    i + 1,
                    feature
                )));
            }
        }

        if !self.is_leaf_only() {
            let mut has_parent = vec![false; n];
            for e in 0..self.edges.rows() {
                let parent = self.node_ref(e, 0)?;
                let child = self.node_ref(e, 2)?;
                let value = self.edges.get(e, 1);
                if !is_integer_code(value) {
                    return Err(Id3Error::MalformedTree(format!("edge {} has value {}", e + 1, value)));
                }
                if child == 0 || has_parent[child] {
                    return Err(Id3Error::MalformedTree(format!(
                        "node {} has more than one parent",
                        child + 1
                    )));
                }
                has_parent[child] = true;
                match &mut nodes[parent] {
                    Node::Split { children, .. } => {
                        let value = value as i64;
                        match children.binary_search_by_key(&value, |(v, _)| *v) {
                            Ok(_) => {
                                return Err(Id3Error::MalformedTree(format!(
                                    "node {} has two edges for value {}",
                                    parent + 1,
                                    value
                                )))
                            }
                            Err(pos) => children.insert(pos, (value, child)),
                        }
                    }
                    Node::Leaf { .. } => {
                        return Err(Id3Error::MalformedTree(format!(
                            "edge {} leaves leaf node {}",
                            e + 1,
                            parent + 1
                        )))
                    }
                }
            }
        }

        let tree = Tree::from_nodes(nodes);
        check_reachable(&tree)?;
        Ok(tree)
    }

    /// 0-based node id stored in column `col` of edge `e`.
    fn node_ref(&self, e: usize, col: usize) -> Result<NodeId, Id3Error> {
        let v = self.edges.get(e, col);
        if is_integer_code(v) && v >= 1.0 && (v as usize) <= self.nodes.rows() {
            Ok(v as usize - 1)
        } else {
            Err(Id3Error::MalformedTree(format!(
                "edge {} references node {} of {}",
                e + 1,
                v,
                self.nodes.rows()
            )))
        }
    }
}

fn push_edges(tree: &Tree, idx: NodeId, rows: &mut Vec<[f64; EDGE_COLS]>) {
    if let Node::Split { children, .. } = &tree.nodes[idx] {
        for (v, c) in children {
            rows.push([(idx + 1) as f64, *v as f64, (*c + 1) as f64]);
            push_edges(tree, *c, rows);
        }
    }
}

fn check_reachable(tree: &Tree) -> Result<(), Id3Error> {
    let mut seen = vec![false; tree.nodes.len()];
    let mut stack = vec![0];
    while let Some(idx) = stack.pop() {
        seen[idx] = true;
        match &tree.nodes[idx] {
            Node::Split { children, .. } => {
                if children.is_empty() {
                    return Err(Id3Error::MalformedTree(format!("split node {} has no edges", idx + 1)));
                }
                stack.extend(children.iter().map(|(_, c)| *c));
            }
            Node::Leaf { .. } => {}
        }
    }
    match seen.iter().position(|s| !s) {
        Some(i) => Err(Id3Error::MalformedTree(format!(
            "node {} is not reachable from the root",
            i + 1
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> Tree {
        Tree::from_nodes(vec![
            Node::Split {
                feature: 0,
                gain: 0.4,
                children: vec![(1, 1), (2, 4)],
            },
            Node::Split {
                feature: 2,
                gain: 0.2,
                children: vec![(1, 2), (3, 3)],
            },
            Node::Leaf { label: 1 },
            Node::Leaf { label: 2 },
            Node::Leaf { label: 2 },
        ])
    }

    #[test]
    fn test_encode() {
        let m = TreeMatrices::from_tree(&sample_tree()).unwrap();
        let nodes = DenseMatrix::from_rows(&[[1., 0.], [3., 0.], [-1., 1.], [-1., 2.], [-1., 2.]]).unwrap();
        let edges = DenseMatrix::from_rows(&[[1., 1., 2.], [2., 1., 3.], [2., 3., 4.], [1., 2., 5.]]).unwrap();
        assert_eq!(m.nodes, nodes);
        assert_eq!(m.edges, edges);
        assert_eq!(m.n_nodes(), 5);
        assert_eq!(m.n_edges(), 4);
        assert!(!m.is_leaf_only());
    }

    #[test]
    fn test_leaf_sentinel() {
        let m = TreeMatrices::from_tree(&Tree::leaf(3)).unwrap();
        assert_eq!(m.nodes, DenseMatrix::from_rows(&[[-1., 3.]]).unwrap());
        assert_eq!(m.edges, DenseMatrix::from_rows(&[[-1.]]).unwrap());
        assert!(m.is_leaf_only());
        assert_eq!(m.n_edges(), 0);
        assert_eq!(m.to_tree().unwrap(), Tree::leaf(3));
        assert!(TreeMatrices::from_tree(&Tree::new()).is_err());
    }

    #[test]
    fn test_decode_loses_only_gain() {
        let tree = sample_tree();
        let back = TreeMatrices::from_tree(&tree).unwrap().to_tree().unwrap();
        assert_eq!(back.nodes.len(), tree.nodes.len());
        for (a, b) in back.nodes.iter().zip(tree.nodes.iter()) {
            match (a, b) {
                (
                    Node::Split {
                        feature: fa,
                        children: ca,
                        ..
                    },
                    Node::Split {
                        feature: fb,
                        children: cb,
                        ..
                    },
                ) => {
                    assert_eq!(fa, fb);
                    assert_eq!(ca, cb);
                }
                (a, b) => assert_eq!(a, b),
            }
        }
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let nodes = DenseMatrix::from_rows(&[[1., 0.], [-1., 1.], [-1., 2.]]).unwrap();
        let bad = |edges: &[[f64; 3]]| TreeMatrices {
            nodes: nodes.clone(),
            edges: DenseMatrix::from_rows(edges).unwrap(),
        };
        // two parents
        assert!(bad(&[[1., 1., 2.], [1., 2., 2.]]).to_tree().is_err());
        // out of range
        assert!(bad(&[[1., 1., 2.], [1., 2., 4.]]).to_tree().is_err());
        // edge out of a leaf
        assert!(bad(&[[1., 1., 2.], [2., 2., 3.]]).to_tree().is_err());
        // duplicate value
        assert!(bad(&[[1., 1., 2.], [1., 1., 3.]]).to_tree().is_err());
        // unreachable node
        assert!(bad(&[[1., 1., 2.]]).to_tree().is_err());
        // edge into the root
        assert!(bad(&[[1., 1., 2.], [1., 2., 3.], [1., 3., 1.]]).to_tree().is_err());
        // fine
        assert!(bad(&[[1., 1., 2.], [1., 2., 3.]]).to_tree().is_ok());

        let wrong_shape = TreeMatrices {
            nodes: DenseMatrix::from_rows(&[[-1., 1., 0.]]).unwrap(),
            edges: DenseMatrix::from_rows(&[[-1.]]).unwrap(),
        };
        assert!(wrong_shape.to_tree().is_err());
        let split_without_edges = TreeMatrices {
            nodes: DenseMatrix::from_rows(&[[2., 0.]]).unwrap(),
            edges: DenseMatrix::from_rows(&[[-1.]]).unwrap(),
        };
        assert!(split_without_edges.to_tree().is_err());
    }
}
