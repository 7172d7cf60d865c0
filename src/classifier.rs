use crate::constants::MIN_SPLIT;
use crate::data::Matrix;
use crate::encoding::TreeMatrices;
use crate::errors::Id3Error;
use crate::node::Node;
use crate::recode::{recode, Recoding};
use crate::splitter::InformationGainSplitter;
use crate::tree::Tree;
use hashbrown::HashMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Instant;

type ImportanceFn = fn(&Tree, &mut HashMap<usize, (f64, usize)>);

/// Method to calculate variable importance.
#[derive(Serialize, Deserialize)]
pub enum ImportanceMethod {
    /// The number of times a feature is used to split the data.
    Weight,
    /// The average information gain across all splits the feature is used in.
    Gain,
    /// The total information gain across all splits the feature is used in.
    TotalGain,
}

/// ID3 classifier over categorical features.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Id3Classifier {
    /// Nodes holding fewer rows than this become leaves. Values of 0 or 1
    /// keep splitting until a node is pure or runs out of attributes.
    #[serde(default = "default_min_split")]
    pub min_split: usize,
    /// Number of threads to use during training, all cores when `None`.
    pub num_threads: Option<usize>,
    /// Grow sibling subtrees and evaluate attributes concurrently.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// The fitted tree, in the original feature and label domains.
    pub tree: Tree,
    /// Shifts applied to the data while fitting.
    pub recoding: Recoding,
}

fn default_min_split() -> usize {
    MIN_SPLIT
}
fn default_parallel() -> bool {
    true
}

impl Default for Id3Classifier {
    fn default() -> Self {
        Id3Classifier {
            min_split: MIN_SPLIT,
            num_threads: None,
            parallel: true,
            tree: Tree::new(),
            recoding: Recoding::identity(0),
        }
    }
}

impl Id3Classifier {
    /// ID3 classifier.
    ///
    /// * `min_split` - Minimum number of rows a node needs to be split.
    /// * `num_threads` - Number of threads to use during training.
    /// * `parallel` - Build sibling subtrees concurrently.
    pub fn new(min_split: usize, num_threads: Option<usize>, parallel: bool) -> Result<Self, Id3Error> {
        let model = Id3Classifier {
            min_split,
            num_threads,
            parallel,
            ..Default::default()
        };
        model.validate_parameters()?;
        Ok(model)
    }

    pub fn validate_parameters(&self) -> Result<(), Id3Error> {
        if self.num_threads == Some(0) {
            return Err(Id3Error::InvalidParameter(
                "num_threads".to_string(),
                "a positive number of threads".to_string(),
                "0".to_string(),
            ));
        }
        Ok(())
    }

    /// Build an already fitted classifier from nodes and edges matrices.
    pub fn from_matrices(matrices: &TreeMatrices) -> Result<Self, Id3Error> {
        let tree = matrices.to_tree()?;
        let n_features = tree
            .nodes
            .iter()
            .filter_map(|n| match n {
                Node::Split { feature, .. } => Some(feature + 1),
                Node::Leaf { .. } => None,
            })
            .max()
            .unwrap_or(0);
        Ok(Id3Classifier {
            tree,
            recoding: Recoding::identity(n_features),
            ..Default::default()
        })
    }

    /// Fit the tree on a provided dataset.
    ///
    /// * `data` - Integer coded categorical features.
    /// * `y` - Integer coded labels, one per row of `data`.
    /// * `sample_weight` - Positive instance weights.
    pub fn fit(&mut self, data: &Matrix<f64>, y: &[f64], sample_weight: Option<&[f64]>) -> Result<(), Id3Error> {
        self.validate_parameters()?;
        if let Some(w) = sample_weight {
            validate_sample_weight(w, data.rows)?;
        }
        let start = Instant::now();
        let recoded = recode(data, y)?;
        info!(
            "Fitting ID3 tree on {} rows, {} features and {} label codes.",
            recoded.rows, recoded.cols, recoded.n_labels
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads.unwrap_or(0))
            .build()
            .map_err(|e| Id3Error::ThreadPool(e.to_string()))?;
        let splitter = InformationGainSplitter::new(self.parallel);
        let mut tree = Tree::new();
        pool.install(|| {
            tree.fit(
                &recoded,
                &data.index,
                &splitter,
                self.min_split,
                sample_weight,
                self.parallel,
            )
        })?;

        if tree.n_nodes() == 1 {
            warn!("The fitted tree is a single leaf, no split was made.");
        }
        self.tree = recoded.recoding.decode_tree(&tree);
        self.recoding = recoded.recoding;
        info!(
            "Fitted tree with {} nodes, {} leaves and depth {} in {:.3}s.",
            self.tree.n_nodes(),
            self.tree.n_leaves(),
            self.tree.depth(),
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }

    /// Predict the label of each row, `NaN` for rows holding a value the
    /// tree has no edge for.
    pub fn predict(&self, data: &Matrix<f64>) -> Vec<f64> {
        self.tree.predict(data, self.parallel)
    }

    /// Nodes and edges matrices of the fitted tree.
    pub fn to_matrices(&self) -> Result<TreeMatrices, Id3Error> {
        TreeMatrices::from_tree(&self.tree)
    }

    /// Calculate feature importance measure for the features
    /// in the model.
    /// - `method`: variable importance method to use.
    /// - `normalize`: scale the values so that they sum to one.
    pub fn calculate_feature_importance(&self, method: ImportanceMethod, normalize: bool) -> HashMap<usize, f64> {
        let (average, importance_fn): (bool, ImportanceFn) = match method {
            ImportanceMethod::Weight => (false, Tree::calculate_importance_weight),
            ImportanceMethod::Gain => (true, Tree::calculate_importance_gain),
            ImportanceMethod::TotalGain => (false, Tree::calculate_importance_gain),
        };
        let mut stats = HashMap::new();
        importance_fn(&self.tree, &mut stats);

        let importance = stats
            .iter()
            .map(|(k, (v, c))| if average { (*k, v / (*c as f64)) } else { (*k, *v) })
            .collect::<HashMap<usize, f64>>();

        if normalize {
            // Sum in a fixed order so the result does not depend on the map.
            let mut values: Vec<f64> = importance.values().copied().collect();
            values.sort_by(|a, b| a.total_cmp(b));
            let total: f64 = values.iter().sum();
            if total > 0.0 {
                return importance.iter().map(|(k, v)| (*k, v / total)).collect();
            }
        }
        importance
    }

    /// Save the classifier as a json object to a file.
    ///
    /// * `path` - Path to save the model.
    pub fn save_model(&self, path: &str) -> Result<(), Id3Error> {
        let model = self.json_dump()?;
        match fs::write(path, model) {
            Err(e) => Err(Id3Error::UnableToWrite(e.to_string())),
            Ok(_) => Ok(()),
        }
    }

    /// Dump the classifier as a json object
    pub fn json_dump(&self) -> Result<String, Id3Error> {
        match serde_json::to_string(self) {
            Ok(s) => Ok(s),
            Err(e) => Err(Id3Error::UnableToWrite(e.to_string())),
        }
    }

    /// Load a classifier from Json string
    ///
    /// * `json_str` - String object, which can be serialized to json.
    pub fn from_json(json_str: &str) -> Result<Self, Id3Error> {
        let model = serde_json::from_str::<Id3Classifier>(json_str);
        match model {
            Ok(m) => Ok(m),
            Err(e) => Err(Id3Error::UnableToRead(e.to_string())),
        }
    }

    /// Load a classifier from a path to a json model.
    ///
    /// * `path` - Path to load the model from.
    pub fn load_model(path: &str) -> Result<Self, Id3Error> {
        let json_str = match fs::read_to_string(path) {
            Ok(s) => Ok(s),
            Err(e) => Err(Id3Error::UnableToRead(e.to_string())),
        }?;
        Self::from_json(&json_str)
    }

    // Set methods for paramters

    /// Set the minimum number of rows needed to split a node.
    pub fn set_min_split(mut self, min_split: usize) -> Self {
        self.min_split = min_split;
        self
    }

    /// Set the number of threads on the classifier.
    pub fn set_num_threads(mut self, num_threads: Option<usize>) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Set whether to build subtrees concurrently.
    pub fn set_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

fn validate_sample_weight(sample_weight: &[f64], rows: usize) -> Result<(), Id3Error> {
    if sample_weight.len() != rows {
        return Err(Id3Error::ShapeMismatch(rows, sample_weight.len()));
    }
    match sample_weight.iter().find(|w| !(w.is_finite() && **w > 0.0)) {
        Some(w) => Err(Id3Error::InvalidParameter(
            "sample_weight".to_string(),
            "finite positive weights".to_string(),
            w.to_string(),
        )),
        None => Ok(()),
    }
}
