use loanrisk_core::{Float, LoanError, LoanResult, Tensor};
use serde::{Deserialize, Serialize};

/// Distance metric for KNN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    Euclidean,
    Manhattan,
}

/// How neighbours' votes are weighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    Uniform,
    /// Inverse distance. Neighbours at distance zero outvote everything else.
    Distance,
}

/// K-Nearest Neighbors Classifier.
///
/// Neighbours at equal distance are taken in training-row order; vote ties
/// go to the lowest class.
#[derive(Debug, Clone)]
pub struct KNNClassifier<T: Float> {
    pub k: usize,
    pub metric: DistanceMetric,
    pub weighting: Weighting,
    x_train: Option<Tensor<T>>,
    y_train: Vec<usize>,
    pub n_classes: usize,
}

impl<T: Float> KNNClassifier<T> {
    pub fn new(k: usize, metric: DistanceMetric) -> Self {
        KNNClassifier {
            k,
            metric,
            weighting: Weighting::Uniform,
            x_train: None,
            y_train: Vec::new(),
            n_classes: 0,
        }
    }

    pub fn with_weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.x_train.is_some()
    }

    pub fn fit(&mut self, x: &Tensor<T>, y: &Tensor<T>) -> LoanResult<()> {
        let (n, _) = x.shape().matrix()?;
        if y.numel() != n {
            return Err(LoanError::DimensionMismatch(format!(
                "X has {} rows but y has {} labels",
                n,
                y.numel()
            )));
        }
        if self.k == 0 || self.k > n {
            return Err(LoanError::invalid_input(format!(
                "k = {} neighbours requested from {} training rows",
                self.k, n
            )));
        }
        // Class ids index the vote table, so they must be whole and below n.
        let labels = y
            .data()
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
            .collect::<LoanResult<Vec<usize>>>()?;

        self.y_train = labels;
        self.n_classes = self.y_train.iter().copied().max().unwrap_or(0) + 1;
        self.x_train = Some(x.clone());
        Ok(())
    }

    fn distance(&self, a: &[T], b: &[T]) -> f64 {
        match self.metric {
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b)
                .map(|(&u, &v)| {
                    let d = (u - v).to_f64();
                    d * d
                })
                .sum::<f64>()
                .sqrt(),
            DistanceMetric::Manhattan => a
                .iter()
                .zip(b)
                .map(|(&u, &v)| (u - v).to_f64().abs())
                .sum(),
        }
    }

    fn vote(&self, neighbours: &[(f64, usize)]) -> usize {
        let mut votes = vec![0.0f64; self.n_classes];
        match self.weighting {
            Weighting::Uniform => {
                for &(_, j) in neighbours {
                    votes[self.y_train[j]] += 1.0;
                }
            }
            Weighting::Distance => {
                let exact: Vec<usize> = neighbours
                    .iter()
                    .filter(|(d, _)| *d == 0.0)
                    .map(|&(_, j)| j)
                    .collect();
                if exact.is_empty() {
                    for &(d, j) in neighbours {
                        votes[self.y_train[j]] += 1.0 / d;
                    }
                } else {
                    for j in exact {
                        votes[self.y_train[j]] += 1.0;
                    }
                }
            }
        }

        let mut best = 0;
        for (c, &v) in votes.iter().enumerate() {
            if v > votes[best] {
                best = c;
            }
        }
        best
    }

    pub fn predict(&self, x: &Tensor<T>) -> LoanResult<Tensor<T>> {
        let x_train = self
            .x_train
            .as_ref()
            .ok_or_else(|| LoanError::NotFitted("KNNClassifier".into()))?;
        let (n_test, d) = x.shape().matrix()?;
        let (n_train, d_train) = x_train.shape().matrix()?;
        if d != d_train {
            return Err(LoanError::DimensionMismatch(format!(
                "fitted on {} features, got {}",
                d_train, d
            )));
        }

        let mut predictions = Vec::with_capacity(n_test);
        let mut dists: Vec<(f64, usize)> = Vec::with_capacity(n_train);
        for i in 0..n_test {
            let row = x.row_slice(i)?;
            dists.clear();
            for j in 0..n_train {
                dists.push((self.distance(row, x_train.row_slice(j)?), j));
            }
            // Stable sort keeps training order among equal distances.
            dists.sort_by(|a, b| a.0.total_cmp(&b.0));

            let k = self.k.min(dists.len());
            predictions.push(T::from_usize(self.vote(&dists[..k])));
        }

        Tensor::new(predictions, vec![n_test])
    }
}
