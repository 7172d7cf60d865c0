//! Splitter
//!
//! Choice of the attribute a node branches on.
use crate::histogram::ContingencyTable;
use crate::recode::RecodedData;
use crate::utils::entropy;
use rayon::prelude::*;

/// The attribute chosen for a split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitInfo {
    pub feature: usize,
    pub gain: f64,
}

pub trait Splitter {
    /// Find the attribute to split the rows in `index` on.
    ///
    /// * `data` - Recoded design matrix and labels.
    /// * `index` - Rows of the current node, never empty.
    /// * `label_hist` - Label histogram of those rows.
    /// * `attributes` - Attributes still eligible on this path.
    /// * `sample_weight` - Optional weight for every row of `data`.
    ///
    /// Returns `None` when no attribute is eligible.
    fn best_split(
        &self,
        data: &RecodedData,
        index: &[usize],
        label_hist: &[f64],
        attributes: &[bool],
        sample_weight: Option<&[f64]>,
    ) -> Option<SplitInfo>;
}

/// Information gain splitter, the ID3 criterion.
///
/// Eligible attributes are visited in increasing order and an attribute
/// replaces the current best one when its gain is greater than *or equal
/// to* the best gain so far, so ties go to the highest index.
#[derive(Debug, Clone, Copy, Default)]
pub struct InformationGainSplitter {
    /// Evaluate the attributes of a node on the rayon pool.
    pub parallel: bool,
}

impl InformationGainSplitter {
    pub fn new(parallel: bool) -> Self {
        InformationGainSplitter { parallel }
    }

    /// `H(Y | feature)` over the rows in `index`.
    ///
    /// The per-value terms are added smallest first rather than in value
    /// order.
    pub fn conditional_entropy(
        &self,
        data: &RecodedData,
        feature: usize,
        index: &[usize],
        sample_weight: Option<&[f64]>,
    ) -> f64 {
        let table = ContingencyTable::from_index(
            data.feature(feature),
            data.n_values[feature],
            &data.labels,
            data.n_labels,
            index,
            sample_weight,
        );
        let total: f64 = (1..=table.n_values()).map(|v| table.value_total(v)).sum();
        let mut terms: Vec<f64> = table
            .present_values()
            .map(|v| (table.value_total(v) / total) * entropy(table.value_histogram(v)))
            .collect();
        // Sum in a fixed order, so attributes inducing the same partition
        // under relabelled values get bit-identical gains and tie.
        terms.sort_by(|a, b| a.total_cmp(b));
        terms.iter().sum()
    }

    /// `H(Y) - H(Y | feature)`, given the parent entropy `H(Y)`.
    pub fn gain(
        &self,
        data: &RecodedData,
        feature: usize,
        index: &[usize],
        parent_entropy: f64,
        sample_weight: Option<&[f64]>,
    ) -> f64 {
        parent_entropy - self.conditional_entropy(data, feature, index, sample_weight)
    }
}

impl Splitter for InformationGainSplitter {
    fn best_split(
        &self,
        data: &RecodedData,
        index: &[usize],
        label_hist: &[f64],
        attributes: &[bool],
        sample_weight: Option<&[f64]>,
    ) -> Option<SplitInfo> {
        let parent_entropy = entropy(label_hist);
        let eligible: Vec<usize> = (0..data.cols).filter(|f| attributes[*f]).collect();

        let gains: Vec<f64> = if self.parallel {
            eligible
                .par_iter()
                .map(|f| self.gain(data, *f, index, parent_entropy, sample_weight))
                .collect()
        } else {
            eligible
                .iter()
                .map(|f| self.gain(data, *f, index, parent_entropy, sample_weight))
                .collect()
        };

        let mut best: Option<SplitInfo> = None;
        for (feature, gain) in eligible.into_iter().zip(gains) {
            match best {
                Some(b) if gain < b.gain => {}
                _ => best = Some(SplitInfo { feature, gain }),
            }
        }
        best
    }
}
