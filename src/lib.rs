mod node;

// Modules
pub mod classifier;
pub mod cli;
pub mod constants;
pub mod data;
pub mod encoding;
pub mod errors;
pub mod histogram;
pub mod io;
pub mod recode;
pub mod splitter;
pub mod tree;
pub mod utils;

// Individual classes, and functions
pub use classifier::{Id3Classifier, ImportanceMethod};
pub use data::{DenseMatrix, Matrix};
pub use encoding::TreeMatrices;
pub use node::{Node, NodeId};
pub use tree::Tree;
