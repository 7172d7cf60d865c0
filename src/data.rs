//! Data
//!
//! Dense matrix containers. `Matrix` is a borrowed column-major view used by
//! the induction code, `DenseMatrix` owns its values and is what the tree
//! encoding and the file readers produce.
use crate::errors::Id3Error;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Contiguous Column Major Matrix data container.
///
/// * `T` - The type of the stored values, `f64` for raw data and `u32`
///     for recoded categorical codes.
pub struct Matrix<'a, T> {
    /// The raw data stored in a single slice.
    pub data: &'a [T],
    /// Indices into the data row-wise.
    pub index: Vec<usize>,
    /// Number of rows in the matrix.
    pub rows: usize,
    /// Number of columns in the matrix.
    pub cols: usize,
    stride1: usize,
    stride2: usize,
}

impl<'a, T> Matrix<'a, T> {
    // Defaults to column major
    pub fn new(data: &'a [T], rows: usize, cols: usize) -> Self {
        Matrix {
            data,
            index: (0..rows).collect(),
            rows,
            cols,
            stride1: rows,
            stride2: 1,
        }
    }

    /// Get a single reference to an item in the matrix.
    ///
    /// * `i` - The ith row of the data to get.
    /// * `j` - the jth column of the data to get.
    pub fn get(&self, i: usize, j: usize) -> &T {
        &self.data[self.item_index(i, j)]
    }

    fn item_index(&self, i: usize, j: usize) -> usize {
        let mut idx = self.stride2 * i;
        idx += j * self.stride1;
        idx
    }

    /// Get access to a row of the data, as an iterator.
    pub fn get_row_iter(&self, row: usize) -> std::iter::StepBy<std::iter::Skip<std::slice::Iter<'a, T>>> {
        self.data.iter().skip(row).step_by(self.rows.max(1))
    }

    /// Get an entire column in the matrix.
    ///
    /// * `col` - The index of the column to get.
    pub fn get_col(&self, col: usize) -> &[T] {
        let start = self.item_index(0, col);
        &self.data[start..(start + self.rows)]
    }
}

impl<'a, T> Matrix<'a, T>
where
    T: Copy,
{
    /// Get a row of the data as a vector.
    pub fn get_row(&self, row: usize) -> Vec<T> {
        self.get_row_iter(row).take(self.cols).copied().collect()
    }
}

/// Owned, column-major matrix of `f64` values.
///
/// This is the shape tree matrices are exchanged in, and what the readers in
/// [`crate::io`] return.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DenseMatrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl DenseMatrix {
    /// Wrap column-major `data` of the given shape.
    pub fn new(data: Vec<f64>, rows: usize, cols: usize) -> Result<Self, Id3Error> {
        if data.len() != rows * cols {
            return Err(Id3Error::InvalidParameter(
                "data".to_string(),
                format!("{} values for a {}x{} matrix", rows * cols, rows, cols),
                data.len().to_string(),
            ));
        }
        Ok(DenseMatrix { data, rows, cols })
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        DenseMatrix {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Build a matrix from row slices, all rows must have the same length.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, Id3Error> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, |r| r.as_ref().len());
        let mut m = DenseMatrix::zeros(n_rows, n_cols);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != n_cols {
                return Err(Id3Error::InvalidParameter(
                    format!("row {}", i + 1),
                    format!("{} values", n_cols),
                    row.len().to_string(),
                ));
            }
            for (j, v) in row.iter().enumerate() {
                m.set(i, j, *v);
            }
        }
        Ok(m)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[j * self.rows + i]
    }

    pub fn set(&mut self, i: usize, j: usize, v: f64) {
        self.data[j * self.rows + i] = v;
    }

    pub fn row(&self, i: usize) -> Vec<f64> {
        (0..self.cols).map(|j| self.get(i, j)).collect()
    }

    /// Column-major backing values.
    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// Borrow as a [`Matrix`] view.
    pub fn as_matrix(&self) -> Matrix<'_, f64> {
        Matrix::new(&self.data, self.rows, self.cols)
    }
}

impl Display for DenseMatrix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for i in 0..self.rows {
            let row: Vec<String> = self.row(i).iter().map(|v| v.to_string()).collect();
            writeln!(f, "{}", row.join(" "))?;
        }
        Ok(())
    }
}
