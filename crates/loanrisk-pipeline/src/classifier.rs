use std::fmt;

use loanrisk_core::{LoanError, LoanResult, Tensor};
use loanrisk_data::{FeatureMatrix, TargetVector};
use loanrisk_metrics::{classification_report, ClassificationReport, ZeroDivision};
use loanrisk_neighbors::KNNClassifier;
use loanrisk_tree::{DecisionTreeClassifier, RandomForestClassifier};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PipelineConfig;
use crate::split::Subset;

/// A supervised classifier over scaled `f64` features.
pub trait Estimator: fmt::Debug + Send + Sync {
    fn fit(&mut self, x: &Tensor<f64>, y: &Tensor<f64>) -> LoanResult<()>;
    fn predict(&self, x: &Tensor<f64>) -> LoanResult<Tensor<f64>>;
    fn is_fitted(&self) -> bool;
}

impl Estimator for DecisionTreeClassifier<f64> {
    fn fit(&mut self, x: &Tensor<f64>, y: &Tensor<f64>) -> LoanResult<()> {
        DecisionTreeClassifier::fit(self, x, y)
    }

    fn predict(&self, x: &Tensor<f64>) -> LoanResult<Tensor<f64>> {
        DecisionTreeClassifier::predict(self, x)
    }

    fn is_fitted(&self) -> bool {
        DecisionTreeClassifier::is_fitted(self)
    }
}

impl Estimator for RandomForestClassifier<f64> {
    fn fit(&mut self, x: &Tensor<f64>, y: &Tensor<f64>) -> LoanResult<()> {
        RandomForestClassifier::fit(self, x, y)
    }

    fn predict(&self, x: &Tensor<f64>) -> LoanResult<Tensor<f64>> {
        RandomForestClassifier::predict(self, x)
    }

    fn is_fitted(&self) -> bool {
        RandomForestClassifier::is_fitted(self)
    }
}

impl Estimator for KNNClassifier<f64> {
    fn fit(&mut self, x: &Tensor<f64>, y: &Tensor<f64>) -> LoanResult<()> {
        KNNClassifier::fit(self, x, y)
    }

    fn predict(&self, x: &Tensor<f64>) -> LoanResult<Tensor<f64>> {
        KNNClassifier::predict(self, x)
    }

    fn is_fitted(&self) -> bool {
        KNNClassifier::is_fitted(self)
    }
}

/// The classifier families the pipeline trains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierFamily {
    DecisionTree,
    RandomForest,
    KNearestNeighbors,
}

impl ClassifierFamily {
    pub const ALL: [ClassifierFamily; 3] = [
        ClassifierFamily::DecisionTree,
        ClassifierFamily::RandomForest,
        ClassifierFamily::KNearestNeighbors,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ClassifierFamily::DecisionTree => "decision tree",
            ClassifierFamily::RandomForest => "random forest",
            ClassifierFamily::KNearestNeighbors => "k-nearest neighbors",
        }
    }

    /// A fresh, unfitted estimator with the configured hyperparameters.
    pub fn build(&self, config: &PipelineConfig) -> Box<dyn Estimator> {
        match self {
            ClassifierFamily::DecisionTree => Box::new(
                DecisionTreeClassifier::<f64>::new(config.max_depth, 2, 1).with_seed(config.seed),
            ),
            ClassifierFamily::RandomForest => Box::new(
                RandomForestClassifier::<f64>::new(
                    config.n_estimators,
                    config.max_depth,
                    config.max_features,
                )
                .with_seed(config.seed),
            ),
            ClassifierFamily::KNearestNeighbors => Box::new(
                KNNClassifier::<f64>::new(config.n_neighbors, config.metric)
                    .with_weighting(config.weighting),
            ),
        }
    }
}

impl fmt::Display for ClassifierFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An estimator together with the feature columns it was trained on.
#[derive(Debug)]
pub struct ClassifierModel {
    family: ClassifierFamily,
    estimator: Box<dyn Estimator>,
    features: Option<Vec<String>>,
}

impl ClassifierModel {
    pub fn untrained(family: ClassifierFamily, config: &PipelineConfig) -> Self {
        ClassifierModel {
            family,
            estimator: family.build(config),
            features: None,
        }
    }

    pub fn family(&self) -> ClassifierFamily {
        self.family
    }

    pub fn is_trained(&self) -> bool {
        self.features.is_some() && self.estimator.is_fitted()
    }

    /// Training column names, once trained.
    pub fn features(&self) -> Option<&[String]> {
        self.features.as_deref()
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &TargetVector) -> LoanResult<()> {
        y.check_aligned(x)?;
        self.estimator.fit(x.values(), y.values())?;
        self.features = Some(x.columns().to_vec());
        Ok(())
    }

    /// Predict `x` and report against `y`. The model is not modified.
    pub fn evaluate(
        &self,
        x: &FeatureMatrix,
        y: &TargetVector,
        zero_division: ZeroDivision,
    ) -> LoanResult<ClassificationReport> {
        let trained = match &self.features {
            Some(columns) if self.estimator.is_fitted() => columns,
            _ => return Err(LoanError::NotFitted(self.family.name().to_string())),
        };
        if trained.as_slice() != x.columns() {
            return Err(LoanError::ShapeMismatch {
                expected: trained.clone(),
                got: x.columns().to_vec(),
            });
        }
        y.check_aligned(x)?;
        let predictions = self.estimator.predict(x.values())?;
        classification_report(y.values(), &predictions, zero_division)
    }
}

/// Fit a fresh model of `family` and report on its own training data.
pub fn train(
    family: ClassifierFamily,
    x: &FeatureMatrix,
    y: &TargetVector,
    config: &PipelineConfig,
) -> LoanResult<(ClassifierModel, ClassificationReport)> {
    let mut model = ClassifierModel::untrained(family, config);
    model.fit(x, y)?;
    let report = model.evaluate(x, y, config.zero_division)?;
    info!(family = %family, rows = x.nrows(), accuracy = report.accuracy, "trained classifier");
    Ok((model, report))
}

/// One classification report, labelled by model family and subset.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub family: ClassifierFamily,
    pub subset: Subset,
    pub report: ClassificationReport,
}
