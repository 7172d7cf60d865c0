//! Command line driver
//!
//! `id3tree X Y NODES EDGES` fits a tree on the design matrix and label
//! files and writes the nodes and edges matrices. The minimum split size is
//! always [`MIN_SPLIT`].
use crate::constants::MIN_SPLIT;
use crate::encoding::TreeMatrices;
use crate::errors::Id3Error;
use crate::io::{read_matrix, write_matrix, MatrixFormat};
use crate::Id3Classifier;
use clap::Parser;
use log::info;
use std::path::PathBuf;

/// Fit an ID3 tree and write it as a nodes matrix and an edges matrix.
#[derive(Parser, Debug)]
#[command(name = "id3tree", version, about, long_about = None)]
pub struct CliArgs {
    /// Design matrix, one integer coded categorical feature per column
    pub x: PathBuf,
    /// Labels, a single row or a single column
    pub y: PathBuf,
    /// Output file for the nodes matrix
    pub nodes: PathBuf,
    /// Output file for the edges matrix
    pub edges: PathBuf,
    /// Matrix file format, `csv` or `text`
    #[arg(short, long, default_value = "csv")]
    pub format: MatrixFormat,
    /// Number of worker threads, all cores by default
    #[arg(short, long)]
    pub threads: Option<usize>,
}

/// Read the inputs, fit, and write both output matrices. The written
/// matrices are also returned.
pub fn run(args: &CliArgs) -> Result<TreeMatrices, Id3Error> {
    let x = read_matrix(&args.x, args.format)?;
    let y = read_matrix(&args.y, args.format)?;
    if y.rows() != 1 && y.cols() != 1 {
        return Err(Id3Error::ShapeMismatch(x.rows(), y.rows() * y.cols()));
    }
    info!("Read a {}x{} design matrix from {:?}", x.rows(), x.cols(), args.x);

    let mut model = Id3Classifier::new(MIN_SPLIT, args.threads, true)?;
    model.fit(&x.as_matrix(), y.values(), None)?;
    let matrices = model.to_matrices()?;

    write_matrix(&args.nodes, &matrices.nodes, args.format)?;
    write_matrix(&args.edges, &matrices.edges, args.format)?;
    Ok(matrices)
}
