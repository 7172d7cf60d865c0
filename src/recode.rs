//! Recoding
//!
//! Shifts every feature column and the labels so that their smallest value
//! becomes 1, which lets the codes address histogram buckets directly. The
//! shifts are kept in a [`Recoding`] so a fitted tree can be mapped back to
//! the original domains.
use crate::constants::{MAX_DOMAIN_SIZE, MAX_TABLE_CELLS};
use crate::data::Matrix;
use crate::encoding::TreeMatrices;
use crate::errors::Id3Error;
use crate::node::Node;
use crate::tree::Tree;
use crate::utils::is_integer_code;
use serde::{Deserialize, Serialize};

/// Per feature and label corrections, `recoded = original + correction`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Recoding {
    pub feature_corrections: Vec<i64>,
    pub label_correction: i64,
}

/// Recoded design matrix and labels, all codes are `>= 1`.
#[derive(Debug)]
pub struct RecodedData {
    /// Column major codes, `rows * cols` of them.
    pub codes: Vec<u32>,
    pub labels: Vec<u32>,
    pub rows: usize,
    pub cols: usize,
    /// Largest code of each feature.
    pub n_values: Vec<usize>,
    /// Largest label code.
    pub n_labels: usize,
    pub recoding: Recoding,
}

impl RecodedData {
    pub fn matrix(&self) -> Matrix<'_, u32> {
        Matrix::new(&self.codes, self.rows, self.cols)
    }

    /// Recoded column of `feature`.
    pub fn feature(&self, feature: usize) -> &[u32] {
        &self.codes[(feature * self.rows)..((feature + 1) * self.rows)]
    }
}

fn to_code(v: f64, location: &dyn Fn() -> String) -> Result<i64, Id3Error> {
    if is_integer_code(v) && v.abs() < (u32::MAX as f64) {
        Ok(v as i64)
    } else {
        Err(Id3Error::InvalidCode { value: v, location: location() })
    }
}

/// Shift one column so that its minimum is 1.
///
/// Returns the codes, the correction and the largest code. Columns spanning
/// more than [`MAX_DOMAIN_SIZE`] values are rejected, every histogram over
/// them would be sized by that span.
fn recode_column(values: &[f64], location: &dyn Fn() -> String) -> Result<(Vec<u32>, i64, usize), Id3Error> {
    let ints = values
        .iter()
        .map(|v| to_code(*v, location))
        .collect::<Result<Vec<i64>, Id3Error>>()?;
    let min = ints.iter().copied().min().unwrap_or(1);
    let max = ints.iter().copied().max().unwrap_or(1);
    let span = max - min + 1;
    if span > MAX_DOMAIN_SIZE as i64 {
        return Err(Id3Error::InvalidParameter(
            location(),
            format!("at most {} codes between its smallest and largest value", MAX_DOMAIN_SIZE),
            span.to_string(),
        ));
    }
    let correction = 1 - min;
    let codes = ints.iter().map(|v| (v + correction) as u32).collect();
    Ok((codes, correction, span as usize))
}

/// Recode a design matrix and its labels.
///
/// * `data` - Categorical features, integer valued.
/// * `y` - Integer valued labels, one per row of `data`.
pub fn recode(data: &Matrix<f64>, y: &[f64]) -> Result<RecodedData, Id3Error> {
    if data.rows != y.len() {
        return Err(Id3Error::ShapeMismatch(data.rows, y.len()));
    }
    if data.rows == 0 {
        return Err(Id3Error::EmptyInput);
    }

    let mut codes = Vec::with_capacity(data.rows * data.cols);
    let mut feature_corrections = Vec::with_capacity(data.cols);
    let mut n_values = Vec::with_capacity(data.cols);
    for j in 0..data.cols {
        let (col, correction, max) = recode_column(data.get_col(j), &|| format!("feature {}", j + 1))?;
        codes.extend(col);
        feature_corrections.push(correction);
        n_values.push(max);
    }
    let (labels, label_correction, n_labels) = recode_column(y, &|| "labels".to_string())?;
    if let Some((j, n)) = n_values.iter().enumerate().find(|(_, n)| **n * n_labels > MAX_TABLE_CELLS) {
        return Err(Id3Error::InvalidParameter(
            format!("feature {}", j + 1),
            format!("at most {} value by label cells", MAX_TABLE_CELLS),
            (n * n_labels).to_string(),
        ));
    }

    Ok(RecodedData {
        codes,
        labels,
        rows: data.rows,
        cols: data.cols,
        n_values,
        n_labels,
        recoding: Recoding {
            feature_corrections,
            label_correction,
        },
    })
}

impl Recoding {
    /// No-op recoding for `n_features` features.
    pub fn identity(n_features: usize) -> Self {
        Recoding {
            feature_corrections: vec![0; n_features],
            label_correction: 0,
        }
    }

    pub fn decode_label(&self, label: i64) -> i64 {
        label - self.label_correction
    }

    pub fn decode_value(&self, feature: usize, value: i64) -> i64 {
        value - self.feature_corrections[feature]
    }

    /// Decode a tree fitted on recoded data back to the original domains.
    pub fn decode_tree(&self, tree: &Tree) -> Tree {
        let nodes = tree
            .nodes
            .iter()
            .map(|n| match n {
                Node::Leaf { label } => Node::Leaf {
                    label: self.decode_label(*label),
                },
                Node::Split {
                    feature,
                    gain,
                    children,
                } => Node::Split {
                    feature: *feature,
                    gain: *gain,
                    children: children
                        .iter()
                        .map(|(v, c)| (self.decode_value(*feature, *v), *c))
                        .collect(),
                },
            })
            .collect();
        Tree::from_nodes(nodes)
    }

    /// Decode nodes/edges matrices in place of the tree.
    ///
    /// Leaf payloads lose the label correction, and every edge value loses
    /// the correction of the feature its parent node splits on.
    pub fn decode_matrices(&self, matrices: &TreeMatrices) -> Result<TreeMatrices, Id3Error> {
        matrices.check_shape()?;
        let mut nodes = matrices.nodes.clone();
        let mut edges = matrices.edges.clone();
        for i in 0..nodes.rows() {
            if nodes.get(i, 0) < 0.0 {
                let label = nodes.get(i, 1) as i64;
                nodes.set(i, 1, self.decode_label(label) as f64);
            }
        }
        if !matrices.is_leaf_only() {
            for e in 0..edges.rows() {
                let parent = edges.get(e, 0) as usize;
                if parent == 0 || parent > nodes.rows() {
                    return Err(Id3Error::MalformedTree(format!(
                        "edge {} references node {} of {}",
                        e + 1,
                        parent,
                        nodes.rows()
                    )));
                }
                let feature = nodes.get(parent - 1, 0);
                if feature < 1.0 || feature as usize > self.feature_corrections.len() {
                    return Err(Id3Error::MalformedTree(format!(
                        "edge {} leaves node {} which does not split on a known feature",
                        e + 1,
                        parent
                    )));
                }
                let value = edges.get(e, 1) as i64;
                edges.set(e, 1, self.decode_value(feature as usize - 1, value) as f64);
            }
        }
        Ok(TreeMatrices { nodes, edges })
    }
}
