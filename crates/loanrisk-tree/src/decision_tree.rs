use loanrisk_core::{Float, LoanError, LoanResult, Tensor};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// A node in the decision tree.
#[derive(Debug, Clone)]
enum TreeNode<T: Float> {
    /// Internal node: rows with `x[feature_idx] <= threshold` go left.
    Split {
        feature_idx: usize,
        threshold: T,
        left: Box<TreeNode<T>>,
        right: Box<TreeNode<T>>,
    },
    Leaf { class: usize },
}

/// Validate a label vector against `n` rows and convert it to class ids.
/// Labels must be whole numbers below `n`.
pub(crate) fn class_labels<T: Float>(y: &Tensor<T>, n: usize) -> LoanResult<Vec<usize>> {
    if y.numel() != n {
        return Err(LoanError::DimensionMismatch(format!(
            "X has {} rows but y has {} labels",
            n,
            y.numel()
        )));
    }
    if n == 0 {
        return Err(LoanError::EmptyTensor);
    }
    y.data()
        .iter()
        .map(|&v| {
            let f = v.to_f64();
            if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f < n as f64 {
                Ok(f as usize)
            } else {
                Err(LoanError::invalid_input(format!(
                    "invalid class label {} for {} rows",
                    v, n
                )))
            }
        })
        .collect()
}

/// Index of the largest count; the lowest class wins ties.
pub(crate) fn argmax(counts: &[usize]) -> usize {
    let mut best = 0;
    for (i, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = i;
        }
    }
    best
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / n).powi(2)).sum::<f64>()
}

/// Decision Tree Classifier using CART (Gini impurity).
///
/// Candidate thresholds sit halfway between consecutive distinct values of a
/// feature. For each feature the rows are sorted once and swept left to
/// right while class counts are moved from the right child to the left, so
/// a node costs O(p · n log n). Features are visited in an order shuffled
/// by `seed` at every node; among equally good splits the first visited
/// feature and its lowest threshold win.
#[derive(Debug, Clone)]
pub struct DecisionTreeClassifier<T: Float> {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
    tree: Option<TreeNode<T>>,
    pub n_classes: usize,
    pub n_features: usize,
}

impl<T: Float> DecisionTreeClassifier<T> {
    pub fn new(max_depth: usize, min_samples_split: usize, min_samples_leaf: usize) -> Self {
        DecisionTreeClassifier {
            max_depth,
            min_samples_split,
            min_samples_leaf,
            seed: 0,
            tree: None,
            n_classes: 0,
            n_features: 0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.tree.is_some()
    }

    pub fn fit(&mut self, x: &Tensor<T>, y: &Tensor<T>) -> LoanResult<()> {
        let (n, p) = x.shape().matrix()?;
        let labels = class_labels(y, n)?;
        if x.has_nan() {
            return Err(LoanError::invalid_input("cannot fit a tree on missing values"));
        }

        self.n_classes = labels.iter().copied().max().unwrap_or(0) + 1;
        self.n_features = p;

        let indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.tree = Some(self.build_tree(x.data(), p, &labels, &indices, 0, &mut rng));
        Ok(())
    }

    fn class_counts(&self, labels: &[usize], indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in indices {
            counts[labels[i]] += 1;
        }
        counts
    }

    fn build_tree(
        &self,
        x: &[T],
        p: usize,
        labels: &[usize],
        indices: &[usize],
        depth: usize,
        rng: &mut StdRng,
    ) -> TreeNode<T> {
        let counts = self.class_counts(labels, indices);
        let majority = argmax(&counts);
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;

        if pure
            || depth >= self.max_depth
            || indices.len() < self.min_samples_split.max(2)
        {
            return TreeNode::Leaf { class: majority };
        }

        let mut order: Vec<usize> = (0..p).collect();
        order.shuffle(rng);
        match self.best_split(x, p, &order, labels, indices, &counts) {
            Some((feature_idx, threshold)) => {
                let (left, right): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| x[i * p + feature_idx] <= threshold);
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left: Box::new(self.build_tree(x, p, labels, &left, depth + 1, rng)),
                    right: Box::new(self.build_tree(x, p, labels, &right, depth + 1, rng)),
                }
            }
            None => TreeNode::Leaf { class: majority },
        }
    }

    /// Lowest weighted child impurity over every feature (visited in
    /// `order`) and threshold.
    fn best_split(
        &self,
        x: &[T],
        p: usize,
        order: &[usize],
        labels: &[usize],
        indices: &[usize],
        counts: &[usize],
    ) -> Option<(usize, T)> {
        let n = indices.len();
        let min_leaf = self.min_samples_leaf.max(1);
        let mut best: Option<(f64, usize, T)> = None;
        let mut sorted = indices.to_vec();

        for &feature in order {
            let value = |i: usize| x[i * p + feature];
            sorted.sort_by(|&a, &b| value(a).to_f64().total_cmp(&value(b).to_f64()));

            let mut left = vec![0usize; self.n_classes];
            let mut right = counts.to_vec();
            for k in 0..n - 1 {
                let cls = labels[sorted[k]];
                left[cls] += 1;
                right[cls] -= 1;

                let (lo, hi) = (value(sorted[k]), value(sorted[k + 1]));
                if lo == hi {
                    continue;
                }
                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let score = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / n as f64;
                if best.map_or(true, |(s, _, _)| score < s) {
                    let mut threshold = (lo + hi) / T::TWO;
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some((score, feature, threshold));
                }
            }
        }

        best.map(|(_, feature, threshold)| (feature, threshold))
    }

    fn traverse(node: &TreeNode<T>, row: &[T]) -> usize {
        match node {
            TreeNode::Leaf { class } => *class,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
            } => {
                if row[*feature_idx] <= *threshold {
                    Self::traverse(left, row)
                } else {
                    Self::traverse(right, row)
                }
            }
        }
    }

    /// Predicted class id for every row of `x`.
    pub(crate) fn predict_classes(&self, x: &Tensor<T>) -> LoanResult<Vec<usize>> {
        let tree = self
            .tree
            .as_ref()
            .ok_or_else(|| LoanError::NotFitted("DecisionTreeClassifier".into()))?;
        let (n, p) = x.shape().matrix()?;
        if p != self.n_features {
            return Err(LoanError::DimensionMismatch(format!(
                "tree fitted on {} features, got {}",
                self.n_features, p
            )));
        }
        (0..n)
            .map(|i| Ok(Self::traverse(tree, x.row_slice(i)?)))
            .collect()
    }

    pub fn predict(&self, x: &Tensor<T>) -> LoanResult<Tensor<T>> {
        let classes = self.predict_classes(x)?;
        let n = classes.len();
        Tensor::new(classes.into_iter().map(T::from_usize).collect(), vec![n])
    }

    /// Depth of the fitted tree (a lone leaf has depth 0).
    pub fn depth(&self) -> Option<usize> {
        fn walk<T: Float>(node: &TreeNode<T>) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        self.tree.as_ref().map(walk)
    }
}
