/// Minimum number of rows a node needs before it may be split.
/// The `id3tree` binary always runs with this value.
pub const MIN_SPLIT: usize = 2;
/// Marker stored in the feature column of the nodes matrix for leaves,
/// and the single value of the edges matrix of a leaf-only tree.
pub const LEAF_SENTINEL: f64 = -1.0;
/// Number of columns of the nodes matrix.
pub const NODE_COLS: usize = 2;
/// Number of columns of the edges matrix.
pub const EDGE_COLS: usize = 3;
/// Largest span between the smallest and largest code of a feature or of
/// the labels.
pub const MAX_DOMAIN_SIZE: usize = 1 << 20;
/// Largest value by label table a single feature may need.
pub const MAX_TABLE_CELLS: usize = 1 << 26;
