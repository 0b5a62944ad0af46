use loanrisk_core::{Float, LoanError, LoanResult, Tensor};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decision_tree::{argmax, class_labels, DecisionTreeClassifier};

/// How many features each tree in a forest sees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// `floor(sqrt(p))`, at least 1.
    Sqrt,
    All,
    /// `ceil(f * p)`, clamped to `1..=p`.
    Fraction(f64),
}

impl MaxFeatures {
    pub fn resolve(&self, p: usize) -> usize {
        let m = match *self {
            MaxFeatures::Sqrt => (p as f64).sqrt().floor() as usize,
            MaxFeatures::All => p,
            MaxFeatures::Fraction(f) => (p as f64 * f).ceil() as usize,
        };
        m.clamp(1, p.max(1))
    }
}

/// Random Forest Classifier: an ensemble of decision trees with bagging.
///
/// Each tree is grown on a bootstrap sample of the rows and a random subset
/// of the columns, both drawn from a single `StdRng` seeded with `seed`, so
/// the same seed rebuilds the same forest. Prediction is a majority vote
/// with ties going to the lowest class.
#[derive(Debug, Clone)]
pub struct RandomForestClassifier<T: Float> {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub seed: u64,
    trees: Vec<DecisionTreeClassifier<T>>,
    feature_subsets: Vec<Vec<usize>>,
    pub n_classes: usize,
    pub n_features: usize,
}

impl<T: Float> RandomForestClassifier<T> {
    pub fn new(n_estimators: usize, max_depth: usize, max_features: MaxFeatures) -> Self {
        RandomForestClassifier {
            n_estimators,
            max_depth,
            min_samples_split: 2,
            max_features,
            bootstrap: true,
            seed: 42,
            trees: Vec::new(),
            feature_subsets: Vec::new(),
            n_classes: 0,
            n_features: 0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    pub fn fit(&mut self, x: &Tensor<T>, y: &Tensor<T>) -> LoanResult<()> {
        let (n, p) = x.shape().matrix()?;
        let labels = class_labels(y, n)?;
        if self.n_estimators == 0 {
            return Err(LoanError::invalid_input("a forest needs at least one tree"));
        }
        if p == 0 {
            return Err(LoanError::invalid_input("cannot fit a forest without features"));
        }
        let m = self.max_features.resolve(p);
        debug!(trees = self.n_estimators, features_per_tree = m, rows = n, "growing forest");

        self.trees.clear();
        self.feature_subsets.clear();
        self.n_classes = labels.iter().copied().max().unwrap_or(0) + 1;
        self.n_features = p;

        let mut rng = StdRng::seed_from_u64(self.seed);
        for _ in 0..self.n_estimators {
            let rows: Vec<usize> = if self.bootstrap {
                (0..n).map(|_| rng.gen_range(0..n)).collect()
            } else {
                (0..n).collect()
            };

            let mut features: Vec<usize> = (0..p).collect();
            features.shuffle(&mut rng);
            features.truncate(m);
            features.sort_unstable();

            let x_sub = x.select_cols(&features)?.select_rows(&rows)?;
            let y_sub = y.select_rows(&rows)?;

            let mut tree = DecisionTreeClassifier::new(self.max_depth, self.min_samples_split, 1)
                .with_seed(rng.gen());
            tree.fit(&x_sub, &y_sub)?;

            self.trees.push(tree);
            self.feature_subsets.push(features);
        }

        Ok(())
    }

    pub fn predict(&self, x: &Tensor<T>) -> LoanResult<Tensor<T>> {
        if !self.is_fitted() {
            return Err(LoanError::NotFitted("RandomForestClassifier".into()));
        }
        let (n, p) = x.shape().matrix()?;
        if p != self.n_features {
            return Err(LoanError::DimensionMismatch(format!(
                "forest fitted on {} features, got {}",
                self.n_features, p
            )));
        }

        let mut votes = vec![vec![0usize; self.n_classes]; n];
        for (tree, features) in self.trees.iter().zip(&self.feature_subsets) {
            let classes = tree.predict_classes(&x.select_cols(features)?)?;
            for (row, cls) in votes.iter_mut().zip(classes) {
                if cls < row.len() {
                    row[cls] += 1;
                }
            }
        }

        let predictions: Vec<T> = votes.iter().map(|v| T::from_usize(argmax(v))).collect();
        Tensor::new(predictions, vec![n])
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
