use loanrisk_core::LoanResult;
use loanrisk_data::{FeatureMatrix, Table, TargetVector};
use loanrisk_preprocessing::MinMaxScaler;
use loanrisk_selection::{FeatureSelector, Rfe, SelectKBest};
use serde::Serialize;
use tracing::info;

use crate::classifier::{train, ClassifierFamily, Evaluation};
use crate::config::PipelineConfig;
use crate::features::{engineer_features, project};
use crate::split::{split_dataset, Split, Subset};

/// Scaled, projected subsets ready for selection and modeling.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub split_sizes: Split<usize>,
    pub features: Split<FeatureMatrix>,
    pub targets: Split<TargetVector>,
    /// Fitted on the training matrix only.
    pub scaler: MinMaxScaler,
}

/// Feature names proposed by each selection strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSelections {
    pub univariate: Vec<String>,
    pub rfe: Vec<String>,
}

/// Everything one run produces.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub split_sizes: Split<usize>,
    pub selections: FeatureSelections,
    pub evaluations: Vec<Evaluation>,
}

impl PipelineOutcome {
    pub fn evaluation(&self, family: ClassifierFamily, subset: Subset) -> Option<&Evaluation> {
        self.evaluations
            .iter()
            .find(|e| e.family == family && e.subset == subset)
    }
}

/// Subsets each family is reported on. Only k-nearest neighbors sees test.
fn reported_subsets(family: ClassifierFamily) -> &'static [Subset] {
    match family {
        ClassifierFamily::DecisionTree | ClassifierFamily::RandomForest => {
            &[Subset::Train, Subset::Validate]
        }
        ClassifierFamily::KNearestNeighbors => &[Subset::Train, Subset::Validate, Subset::Test],
    }
}

/// The loan-default workflow over one dataset.
///
/// ```ignore
/// let outcome = LoanDefaultPipeline::default().run(&table)?;
/// for e in &outcome.evaluations {
///     println!("{} / {}\n{}", e.family, e.subset, e.report);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoanDefaultPipeline {
    config: PipelineConfig,
}

impl LoanDefaultPipeline {
    pub fn new(config: PipelineConfig) -> LoanResult<Self> {
        config.validate()?;
        Ok(LoanDefaultPipeline { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Split, engineer, project and scale.
    pub fn prepare(&self, data: &Table) -> LoanResult<PreparedData> {
        let config = &self.config;
        let mut split = split_dataset(data, config)?;
        split.for_each_mut(|subset, table| engineer_features(table, subset, config))?;
        let projected = split.try_map(|subset, table| project(table, subset, config))?;

        let mut scaler = MinMaxScaler::new();
        scaler.fit(&projected.train.0)?;
        let features = projected.try_map(|_, (x, _)| scaler.transform(x))?;
        let targets = projected.try_map(|_, (_, y)| Ok(y.clone()))?;
        let split_sizes = split.try_map(|_, table| Ok(table.nrows()))?;
        info!(
            features = features.train.ncols(),
            train_positive_rate = targets.train.positive_rate(),
            "prepared features"
        );

        Ok(PreparedData {
            split_sizes,
            features,
            targets,
            scaler,
        })
    }

    /// Run both selectors on the scaled training data.
    pub fn select_features(&self, prepared: &PreparedData) -> LoanResult<FeatureSelections> {
        let x = &prepared.features.train;
        let y = &prepared.targets.train;
        let univariate = SelectKBest::new(self.config.n_selected).select(x, y)?;
        let rfe = Rfe::new(self.config.n_selected).select(x, y)?;
        info!(univariate = ?univariate, rfe = ?rfe, "selected features");
        Ok(FeatureSelections { univariate, rfe })
    }

    /// Run every stage. Evaluations come out family by family, train first.
    pub fn run(&self, data: &Table) -> LoanResult<PipelineOutcome> {
        let prepared = self.prepare(data)?;
        let selections = self.select_features(&prepared)?;

        let mut evaluations = Vec::new();
        for family in ClassifierFamily::ALL {
            let (model, train_report) = train(
                family,
                &prepared.features.train,
                &prepared.targets.train,
                &self.config,
            )?;
            for &subset in reported_subsets(family) {
                let report = match subset {
                    Subset::Train => train_report.clone(),
                    _ => model.evaluate(
                        prepared.features.get(subset),
                        prepared.targets.get(subset),
                        self.config.zero_division,
                    )?,
                };
                info!(family = %family, subset = %subset, accuracy = report.accuracy, "evaluated");
                evaluations.push(Evaluation { family, subset, report });
            }
        }

        Ok(PipelineOutcome {
            split_sizes: prepared.split_sizes,
            selections,
            evaluations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use loanrisk_core::LoanError;
    use loanrisk_datasets::make_loans;

    fn quick() -> LoanDefaultPipeline {
        LoanDefaultPipeline::new(PipelineConfig {
            n_estimators: 10,
            ..PipelineConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PipelineConfig {
            n_neighbors: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(LoanDefaultPipeline::new(config), Err(LoanError::InvalidInput(_))));
    }

    #[test]
    fn test_scaler_sees_only_train() {
        let data = make_loans(300, 0.2, 5).unwrap();
        let pipeline = quick();
        let prepared = pipeline.prepare(&data).unwrap();

        let config = pipeline.config();
        let mut split = split_dataset(&data, config).unwrap();
        engineer_features(&mut split.train, Subset::Train, config).unwrap();
        let (raw_train, _) = project(&split.train, Subset::Train, config).unwrap();
        let mut expected = MinMaxScaler::new();
        expected.fit(&raw_train).unwrap();
        assert_eq!(prepared.scaler.state(), expected.state());

        let train = prepared.features.train.values();
        for &v in train.data() {
            assert!((0.0..=1.0).contains(&v));
        }
        let mins = train.min_rows().unwrap();
        let maxs = train.max_rows().unwrap();
        for j in 0..train.ncols() {
            assert_abs_diff_eq!(mins.data()[j], 0.0, epsilon = 1e-12);
            assert!(maxs.data()[j] <= 1.0 + 1e-12);
        }
    }

    #[test]
    fn test_rescaling_is_idempotent() {
        let data = make_loans(200, 0.2, 8).unwrap();
        let prepared = quick().prepare(&data).unwrap();
        let raw = {
            let config = PipelineConfig::default();
            let mut split = split_dataset(&data, &config).unwrap();
            engineer_features(&mut split.validate, Subset::Validate, &config).unwrap();
            project(&split.validate, Subset::Validate, &config).unwrap().0
        };
        let once = prepared.scaler.transform(&raw).unwrap();
        let twice = prepared.scaler.transform(&raw).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once, prepared.features.validate);
    }

    #[test]
    fn test_run_order() {
        let data = make_loans(200, 0.2, 11).unwrap();
        let outcome = quick().run(&data).unwrap();
        let order: Vec<(ClassifierFamily, Subset)> =
            outcome.evaluations.iter().map(|e| (e.family, e.subset)).collect();
        assert_eq!(
            order,
            vec![
                (ClassifierFamily::DecisionTree, Subset::Train),
                (ClassifierFamily::DecisionTree, Subset::Validate),
                (ClassifierFamily::RandomForest, Subset::Train),
                (ClassifierFamily::RandomForest, Subset::Validate),
                (ClassifierFamily::KNearestNeighbors, Subset::Train),
                (ClassifierFamily::KNearestNeighbors, Subset::Validate),
                (ClassifierFamily::KNearestNeighbors, Subset::Test),
            ]
        );
        assert!(outcome.evaluation(ClassifierFamily::RandomForest, Subset::Test).is_none());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["evaluations"][6]["family"], "k_nearest_neighbors");
        assert_eq!(json["evaluations"][6]["subset"], "test");
    }
}
