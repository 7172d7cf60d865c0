use crate::data::Matrix;
use crate::errors::Id3Error;
use crate::histogram::label_histogram;
use crate::node::{Node, NodeId};
use crate::recode::RecodedData;
use crate::splitter::Splitter;
use crate::utils::{first_argmax, is_integer_code, n_nonzero};
use hashbrown::HashMap;
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// An ID3 tree stored as an arena.
///
/// The root is node 0, and nodes are laid out in the order the recursive
/// builder emits them: a node, then the subtree of each of its children
/// in increasing value order. Node `i` is row `i + 1` of the nodes matrix.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Tree { nodes: Vec::new() }
    }

    /// A tree made of a single leaf.
    pub fn leaf(label: i64) -> Self {
        Tree {
            nodes: vec![Node::Leaf { label }],
        }
    }

    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        Tree { nodes }
    }

    /// Fit the tree on recoded data, replacing any previous nodes.
    ///
    /// * `data` - Recoded design matrix and labels.
    /// * `index` - Rows to learn from.
    /// * `splitter` - Criterion used to choose each split.
    /// * `min_split` - Nodes with fewer rows become leaves.
    /// * `sample_weight` - Optional positive weight for each row of `data`.
    /// * `parallel` - Grow the children of a split on the rayon pool.
    pub fn fit<S: Splitter + Sync>(
        &mut self,
        data: &RecodedData,
        index: &[usize],
        splitter: &S,
        min_split: usize,
        sample_weight: Option<&[f64]>,
        parallel: bool,
    ) -> Result<(), Id3Error> {
        let builder = TreeBuilder {
            data,
            splitter,
            min_split,
            sample_weight,
            parallel,
        };
        let attributes = vec![true; data.cols];
        *self = builder.build(index, &attributes)?;
        Ok(())
    }

    /// Append `child` behind the current nodes and link it to `parent`
    /// through an edge labelled `value`.
    ///
    /// Every node id inside `child` is shifted by the number of nodes
    /// already placed, so its internal edges stay valid. Returns the new
    /// id of the child's root.
    pub fn graft(&mut self, parent: NodeId, value: i64, child: Tree) -> Result<NodeId, Id3Error> {
        let offset = self.nodes.len();
        match self.nodes.get_mut(parent) {
            Some(Node::Split { children, .. }) => match children.binary_search_by_key(&value, |(v, _)| *v) {
                Ok(_) => {
                    return Err(Id3Error::MalformedTree(format!(
                        "node {} already has an edge for value {}",
                        parent + 1,
                        value
                    )))
                }
                Err(pos) => children.insert(pos, (value, offset)),
            },
            Some(Node::Leaf { .. }) => {
                return Err(Id3Error::MalformedTree(format!(
                    "cannot attach a child to leaf node {}",
                    parent + 1
                )))
            }
            None => {
                return Err(Id3Error::MalformedTree(format!(
                    "parent node {} does not exist",
                    parent + 1
                )))
            }
        }
        Ok(self.append(child))
    }

    /// Place `child` behind the current nodes, shifting its ids, and
    /// return the new id of its root. No edge is created.
    fn append(&mut self, child: Tree) -> NodeId {
        let offset = self.nodes.len();
        self.nodes.extend(child.nodes.into_iter().map(|mut n| {
            n.rebase(offset);
            n
        }));
        offset
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    pub fn n_edges(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| match n {
                Node::Split { children, .. } => children.len(),
                Node::Leaf { .. } => 0,
            })
            .sum()
    }

    /// Number of edges on the longest root to leaf path.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut stack: Vec<(NodeId, usize)> = Vec::new();
        if !self.nodes.is_empty() {
            stack.push((0, 0));
        }
        while let Some((idx, d)) = stack.pop() {
            depth = depth.max(d);
            if let Node::Split { children, .. } = &self.nodes[idx] {
                stack.extend(children.iter().map(|(_, c)| (*c, d + 1)));
            }
        }
        depth
    }

    /// Label of the leaf a row ends up in, `None` when the row carries a
    /// value no edge was grown for.
    pub fn predict_row_from_row_slice(&self, row: &[f64]) -> Option<i64> {
        let mut node_idx = 0;
        loop {
            let node = self.nodes.get(node_idx)?;
            match node {
                Node::Leaf { label } => return Some(*label),
                Node::Split { feature, .. } => {
                    let v = *row.get(*feature)?;
                    if !is_integer_code(v) {
                        return None;
                    }
                    node_idx = node.get_child_idx(v as i64)?;
                }
            }
        }
    }

    fn predict_row(&self, data: &Matrix<f64>, row: usize) -> f64 {
        self.predict_row_from_row_slice(&data.get_row(row))
            .map_or(f64::NAN, |l| l as f64)
    }

    /// Predict every row of `data`, `NaN` marks rows that reached an
    /// unseen value.
    pub fn predict(&self, data: &Matrix<f64>, parallel: bool) -> Vec<f64> {
        if parallel {
            data.index.par_iter().map(|i| self.predict_row(data, *i)).collect()
        } else {
            data.index.iter().map(|i| self.predict_row(data, *i)).collect()
        }
    }

    fn get_node_stats<F>(&self, calc_stat: &F, stats: &mut HashMap<usize, (f64, usize)>)
    where
        F: Fn(&Node) -> f64,
    {
        for node in &self.nodes {
            if let Node::Split { feature, .. } = node {
                let s = calc_stat(node);
                stats
                    .entry(*feature)
                    .and_modify(|(v, c)| {
                        *v += s;
                        *c += 1;
                    })
                    .or_insert((s, 1));
            }
        }
    }

    pub fn calculate_importance_weight(&self, stats: &mut HashMap<usize, (f64, usize)>) {
        self.get_node_stats(&|_: &Node| 1., stats);
    }

    pub fn calculate_importance_gain(&self, stats: &mut HashMap<usize, (f64, usize)>) {
        self.get_node_stats(
            &|n: &Node| match n {
                Node::Split { gain, .. } => *gain,
                Node::Leaf { .. } => 0.,
            },
            stats,
        );
    }
}

/// Recursive ID3 induction over recoded data.
pub struct TreeBuilder<'a, S> {
    pub data: &'a RecodedData,
    pub splitter: &'a S,
    pub min_split: usize,
    pub sample_weight: Option<&'a [f64]>,
    pub parallel: bool,
}

impl<'a, S: Splitter + Sync> TreeBuilder<'a, S> {
    /// Grow the subtree of the rows in `index`, splitting only on the
    /// attributes still set in `attributes`.
    pub fn build(&self, index: &[usize], attributes: &[bool]) -> Result<Tree, Id3Error> {
        let data = self.data;
        let label_hist = label_histogram(index, &data.labels, data.n_labels, self.sample_weight);

        if n_nonzero(&label_hist) <= 1 || !attributes.iter().any(|a| *a) || index.len() < self.min_split {
            return Ok(Tree::leaf(majority_label(&label_hist)));
        }
        let split = match self
            .splitter
            .best_split(data, index, &label_hist, attributes, self.sample_weight)
        {
            Some(s) => s,
            None => return Ok(Tree::leaf(majority_label(&label_hist))),
        };
        debug!(
            "Splitting {} rows on feature {} with gain {:.6}",
            index.len(),
            split.feature,
            split.gain
        );

        let mut child_attributes = attributes.to_vec();
        child_attributes[split.feature] = false;

        let partitions = partition(data.feature(split.feature), data.n_values[split.feature], index);
        let children: Vec<(i64, Tree)> = if self.parallel {
            partitions
                .into_par_iter()
                .map(|(v, rows)| Ok((v, self.build(&rows, &child_attributes)?)))
                .collect::<Result<_, Id3Error>>()?
        } else {
            partitions
                .into_iter()
                .map(|(v, rows)| Ok((v, self.build(&rows, &child_attributes)?)))
                .collect::<Result<_, Id3Error>>()?
        };

        let mut tree = Tree::from_nodes(vec![Node::Split {
            feature: split.feature,
            gain: split.gain,
            children: Vec::with_capacity(children.len()),
        }]);
        for (v, child) in children {
            tree.graft(0, v, child)?;
        }
        Ok(tree)
    }
}

/// Most frequent recoded label, the lowest code on ties.
fn majority_label(label_hist: &[f64]) -> i64 {
    first_argmax(label_hist).map_or(1, |k| k as i64 + 1)
}

/// Split `index` by the value of `feature`, keeping only non-empty
/// partitions, in increasing value order.
fn partition(feature: &[u32], n_values: usize, index: &[usize]) -> Vec<(i64, Vec<usize>)> {
    let mut parts: Vec<Vec<usize>> = vec![Vec::new(); n_values];
    for i in index {
        parts[feature[*i] as usize - 1].push(*i);
    }
    parts
        .into_iter()
        .enumerate()
        .filter(|(_, rows)| !rows.is_empty())
        .map(|(v, rows)| (v as i64 + 1, rows))
        .collect()
}

impl Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.nodes.is_empty() {
            return Ok(());
        }
        let mut print_buffer: Vec<(NodeId, Option<i64>, usize)> = vec![(0, None, 0)];
        let mut r = String::new();
        while let Some((idx, value, depth)) = print_buffer.pop() {
            let node = &self.nodes[idx];
            let prefix = match value {
                Some(v) => format!("={} ", v),
                None => String::new(),
            };
            r += format!("{}{}{}:{}\n", "      ".repeat(depth), prefix, idx + 1, node).as_str();
            if let Node::Split { children, .. } = node {
                for (v, c) in children.iter().rev() {
                    print_buffer.push((*c, Some(*v), depth + 1));
                }
            }
        }
        write!(f, "{}", r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recode::recode;
    use crate::splitter::InformationGainSplitter;

    fn recoded(rows: &[Vec<f64>], y: &[f64]) -> RecodedData {
        let n = rows.len();
        let m = rows.first().map_or(0, |r| r.len());
        let mut col_major = Vec::new();
        for j in 0..m {
            col_major.extend(rows.iter().map(|r| r[j]));
        }
        recode(&Matrix::new(&col_major, n, m), y).unwrap()
    }

    fn fit(rows: &[Vec<f64>], y: &[f64], min_split: usize, parallel: bool) -> (Tree, RecodedData) {
        let data = recoded(rows, y);
        let index: Vec<usize> = (0..rows.len()).collect();
        let mut tree = Tree::new();
        tree.fit(
            &data,
            &index,
            &InformationGainSplitter::new(parallel),
            min_split,
            None,
            parallel,
        )
        .unwrap();
        (tree, data)
    }

    fn children(node: &Node) -> Vec<(i64, NodeId)> {
        match node {
            Node::Split { children, .. } => children.clone(),
            Node::Leaf { .. } => Vec::new(),
        }
    }

    #[test]
    fn test_pure_subset_is_leaf() {
        let (tree, _) = fit(&[vec![0., 1.], vec![1., 0.], vec![1., 1.]], &[7., 7., 7.], 1, false);
        assert_eq!(tree.nodes, vec![Node::Leaf { label: 1 }]);
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.n_edges(), 0);
    }

    #[test]
    fn test_binary_split() {
        let (tree, _) = fit(&[vec![0.], vec![0.], vec![1.], vec![1.]], &[0., 0., 1., 1.], 1, false);
        assert_eq!(tree.n_nodes(), 3);
        assert_eq!(tree.n_edges(), 2);
        assert_eq!(tree.nodes[1], Node::Leaf { label: 1 });
        assert_eq!(tree.nodes[2], Node::Leaf { label: 2 });
        assert!(matches!(tree.nodes[0], Node::Split { feature: 0, .. }));
        assert_eq!(children(&tree.nodes[0]), vec![(1, 1), (2, 2)]);
    }

    #[test]
    fn test_min_split_boundary() {
        let rows = vec![vec![0.], vec![1.], vec![1.]];
        let y = vec![0., 1., 1.];
        // Exactly min_split rows may still split.
        let (tree, _) = fit(&rows, &y, 3, false);
        assert_eq!(tree.n_nodes(), 3);
        // One row short is forced to a leaf, with the majority label.
        let (tree, _) = fit(&rows, &y, 4, false);
        assert_eq!(tree.nodes, vec![Node::Leaf { label: 2 }]);
    }

    #[test]
    fn test_min_split_zero_splits_until_exhausted() {
        let (tree, _) = fit(&[vec![0., 0.], vec![0., 0.]], &[0., 1.], 0, false);
        // Both attributes are constant, each is used once along the path.
        assert_eq!(tree.n_nodes(), 3);
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.nodes[2], Node::Leaf { label: 1 });
    }

    #[test]
    fn test_leaf_majority_tie_takes_lowest_label() {
        let (tree, _) = fit(&[vec![0.], vec![0.]], &[3., 2.], 1, false);
        // f0 is used once, then no attribute is left.
        assert_eq!(tree.nodes[1], Node::Leaf { label: 1 });
    }

    #[test]
    fn test_skips_empty_values() {
        let rows = vec![vec![0.], vec![1.], vec![2.], vec![2.]];
        let data = recoded(&rows, &[0., 1., 0., 1.]);
        let splitter = InformationGainSplitter::default();
        let builder = TreeBuilder {
            data: &data,
            splitter: &splitter,
            min_split: 1,
            sample_weight: None,
            parallel: false,
        };
        // Row 1 holds the only (recoded) 2, leave it out of the subset.
        let tree = builder.build(&[0, 2, 3], &[true]).unwrap();
        assert_eq!(children(&tree.nodes[0]), vec![(1, 1), (3, 2)]);
        assert_eq!(tree.nodes[1], Node::Leaf { label: 1 });
        assert_eq!(tree.nodes[2], Node::Leaf { label: 1 });
    }

    #[test]
    fn test_node_and_edge_counts_with_rebasing() {
        // f0 splits first, the f0 == 0 side needs f1, the f0 == 1 side is pure.
        let rows = vec![
            vec![0., 0.],
            vec![0., 1.],
            vec![0., 0.],
            vec![0., 1.],
            vec![1., 0.],
            vec![1., 1.],
            vec![1., 0.],
        ];
        let y = vec![0., 1., 0., 1., 2., 2., 2.];
        let (tree, _) = fit(&rows, &y, 1, false);
        assert_eq!(tree.n_nodes(), 5);
        assert_eq!(tree.n_edges(), 4);
        assert!(matches!(tree.nodes[0], Node::Split { feature: 0, .. }));
        assert_eq!(children(&tree.nodes[0]), vec![(1, 1), (2, 4)]);
        assert!(matches!(tree.nodes[1], Node::Split { feature: 1, .. }));
        assert_eq!(children(&tree.nodes[1]), vec![(1, 2), (2, 3)]);
        assert_eq!(tree.nodes[2], Node::Leaf { label: 1 });
        assert_eq!(tree.nodes[3], Node::Leaf { label: 2 });
        assert_eq!(tree.nodes[4], Node::Leaf { label: 3 });
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn test_build_matches_grafting_subtrees() {
        let rows = vec![
            vec![0., 0.],
            vec![0., 1.],
            vec![0., 0.],
            vec![0., 1.],
            vec![1., 0.],
            vec![1., 1.],
            vec![1., 0.],
        ];
        let data = recoded(&rows, &[0., 1., 0., 1., 2., 2., 2.]);
        let splitter = InformationGainSplitter::default();
        let builder = TreeBuilder {
            data: &data,
            splitter: &splitter,
            min_split: 1,
            sample_weight: None,
            parallel: false,
        };
        let full = builder.build(&[0, 1, 2, 3, 4, 5, 6], &[true, true]).unwrap();
        let gain = match full.nodes[0] {
            Node::Split { gain, .. } => gain,
            Node::Leaf { .. } => panic!("root should split"),
        };

        let mut by_hand = Tree::from_nodes(vec![Node::Split {
            feature: 0,
            gain,
            children: Vec::new(),
        }]);
        let left = builder.build(&[0, 1, 2, 3], &[false, true]).unwrap();
        let right = builder.build(&[4, 5, 6], &[false, true]).unwrap();
        assert_eq!(by_hand.graft(0, 1, left).unwrap(), 1);
        assert_eq!(by_hand.graft(0, 2, right).unwrap(), 4);
        assert_eq!(by_hand, full);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let rows: Vec<Vec<f64>> = (0..60)
            .map(|i| vec![(i % 3) as f64, (i % 5) as f64, (i % 2) as f64, ((i / 7) % 4) as f64])
            .collect();
        let y: Vec<f64> = (0..60).map(|i| ((i % 3 + i % 2) % 3) as f64).collect();
        let (seq, _) = fit(&rows, &y, 2, false);
        let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let (par, _) = pool.install(|| fit(&rows, &y, 2, true));
        assert_eq!(seq, par);
    }

    #[test]
    fn test_graft_rebases_child() {
        let mut parent = Tree::from_nodes(vec![Node::Split {
            feature: 0,
            gain: 0.,
            children: vec![],
        }]);
        let child = Tree::from_nodes(vec![
            Node::Split {
                feature: 1,
                gain: 0.,
                children: vec![(1, 1), (2, 2)],
            },
            Node::Leaf { label: 1 },
            Node::Leaf { label: 2 },
        ]);
        assert_eq!(parent.graft(0, 5, Tree::leaf(9)).unwrap(), 1);
        assert_eq!(parent.graft(0, 2, child).unwrap(), 2);
        assert_eq!(parent.nodes[0].get_child_idx(2), Some(2));
        assert_eq!(parent.nodes[0].get_child_idx(5), Some(1));
        assert_eq!(parent.nodes[2].get_child_idx(1), Some(3));
        assert_eq!(parent.nodes[2].get_child_idx(2), Some(4));
        assert_eq!(parent.n_edges(), 4);

        assert!(parent.graft(0, 5, Tree::leaf(1)).is_err());
        assert!(parent.graft(1, 1, Tree::leaf(1)).is_err());
        assert!(parent.graft(42, 1, Tree::leaf(1)).is_err());
    }

    #[test]
    fn test_predict() {
        let rows = vec![vec![0., 5.], vec![0., 6.], vec![1., 5.], vec![1., 6.]];
        let (tree, data) = fit(&rows, &[0., 0., 1., 1.], 1, false);
        let tree = data.recoding.decode_tree(&tree);
        assert_eq!(tree.predict_row_from_row_slice(&[1., 5.]), Some(1));
        assert_eq!(tree.predict_row_from_row_slice(&[0., 9.]), Some(0));
        assert_eq!(tree.predict_row_from_row_slice(&[3., 5.]), None);
        assert_eq!(tree.predict_row_from_row_slice(&[0.5, 5.]), None);

        let x = vec![0., 1., 2., 5., 5., 5.];
        let m = Matrix::new(&x, 3, 2);
        let preds = tree.predict(&m, false);
        assert_eq!(preds[..2], [0., 1.]);
        assert!(preds[2].is_nan());
        let par = tree.predict(&m, true);
        assert_eq!(par[..2], preds[..2]);
    }

    #[test]
    fn test_importance() {
        let rows = vec![vec![0., 0.], vec![0., 1.], vec![1., 0.], vec![1., 1.]];
        // Both features tie at the root, the later one wins.
        let (tree, _) = fit(&rows, &[0., 1., 2., 3.], 1, false);
        let mut stats = HashMap::new();
        tree.calculate_importance_weight(&mut stats);
        assert_eq!(stats[&1], (1., 1));
        assert_eq!(stats[&0], (2., 2));
        let mut stats = HashMap::new();
        tree.calculate_importance_gain(&mut stats);
        assert!((stats[&1].0 - 2.0_f64.ln()).abs() < 1e-9);
        println!("{}", tree);
    }
}
