//! Histogram
//!
//! Grouped aggregation over categorical codes. Every histogram here is
//! addressed by a recoded (1-based) code, bucket `k - 1` holds the weighted
//! count of code `k`.
use crate::errors::Id3Error;

/// Sum `values` per group.
///
/// * `values` - Weight of each row, usually a 0/1 indicator.
/// * `groups` - Group code of each row, in `1..=n_groups`.
/// * `n_groups` - Number of buckets in the returned histogram.
pub fn group_sum(values: &[f64], groups: &[u32], n_groups: usize) -> Result<Vec<f64>, Id3Error> {
    if values.len() != groups.len() {
        return Err(Id3Error::ShapeMismatch(groups.len(), values.len()));
    }
    if let Some(g) = groups.iter().find(|g| **g == 0 || **g as usize > n_groups) {
        return Err(Id3Error::InvalidCode {
            value: *g as f64,
            location: format!("group codes (expected 1..={})", n_groups),
        });
    }
    Ok(sum_by_group(
        values.iter().zip(groups).map(|(v, g)| (*v, *g as usize)),
        n_groups,
    ))
}

/// Accumulate `(value, group)` pairs, groups are trusted to be in range.
fn sum_by_group<I>(pairs: I, n_groups: usize) -> Vec<f64>
where
    I: Iterator<Item = (f64, usize)>,
{
    let mut hist = vec![0.0; n_groups];
    for (v, g) in pairs {
        hist[g - 1] += v;
    }
    hist
}

#[inline]
fn row_weight(sample_weight: Option<&[f64]>, i: usize) -> f64 {
    sample_weight.map_or(1.0, |w| w[i])
}

/// Label histogram of the rows in `index`.
///
/// Codes are trusted to be in range, they come out of
/// [`crate::recode::recode`].
pub fn label_histogram(index: &[usize], labels: &[u32], n_labels: usize, sample_weight: Option<&[f64]>) -> Vec<f64> {
    sum_by_group(
        index
            .iter()
            .map(|i| (row_weight(sample_weight, *i), labels[*i] as usize)),
        n_labels,
    )
}

/// Value by label counts of one feature over a set of rows.
#[derive(Debug, Clone)]
pub struct ContingencyTable {
    n_labels: usize,
    /// Row major, one row of `n_labels` counts per feature value.
    counts: Vec<f64>,
    totals: Vec<f64>,
}

impl ContingencyTable {
    /// Tabulate `feature` against `labels` for the rows in `index`.
    ///
    /// * `feature` - Recoded column, values in `1..=n_values`.
    /// * `labels` - Recoded labels, values in `1..=n_labels`.
    pub fn from_index(
        feature: &[u32],
        n_values: usize,
        labels: &[u32],
        n_labels: usize,
        index: &[usize],
        sample_weight: Option<&[f64]>,
    ) -> Self {
        // One grouped sum over the joint (value, label) code.
        let counts = sum_by_group(
            index.iter().map(|i| {
                let cell = (feature[*i] as usize - 1) * n_labels + labels[*i] as usize;
                (row_weight(sample_weight, *i), cell)
            }),
            n_values * n_labels,
        );
        let totals = if n_labels == 0 {
            vec![0.0; n_values]
        } else {
            counts.chunks(n_labels).map(|c| c.iter().sum()).collect()
        };
        ContingencyTable {
            n_labels,
            counts,
            totals,
        }
    }

    pub fn n_values(&self) -> usize {
        self.totals.len()
    }

    /// Label histogram of the rows holding `value` (1-based).
    pub fn value_histogram(&self, value: usize) -> &[f64] {
        let start = (value - 1) * self.n_labels;
        &self.counts[start..(start + self.n_labels)]
    }

    /// Weighted count of the rows holding `value` (1-based).
    pub fn value_total(&self, value: usize) -> f64 {
        self.totals[value - 1]
    }

    /// Values with a nonzero count, increasing.
    pub fn present_values(&self) -> impl Iterator<Item = usize> + '_ {
        self.totals
            .iter()
            .enumerate()
            .filter(|(_, t)| **t > 0.0)
            .map(|(v, _)| v + 1)
    }
}
