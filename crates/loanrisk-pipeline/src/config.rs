use loanrisk_core::{LoanError, LoanResult};
use loanrisk_metrics::ZeroDivision;
use loanrisk_neighbors::{DistanceMetric, Weighting};
use loanrisk_tree::MaxFeatures;
use serde::{Deserialize, Serialize};

pub const TARGET_COLUMN: &str = "is_default";
pub const SEED: u64 = 123;

pub const TRAIN_PROPORTION: f64 = 0.56;
pub const VALIDATE_PROPORTION: f64 = 0.24;
pub const TEST_PROPORTION: f64 = 0.20;

pub const NAICS_COLUMN: &str = "naics";
pub const NAICS_INDICATOR: &str = "is_naics_defaulter";
/// Industry codes with the most defaults.
pub const NAICS_DEFAULTERS: [i64; 3] = [722110, 722211, 811111];

pub const STATE_COLUMN: &str = "state";
pub const STATE_INDICATOR: &str = "is_state_defaulter";
/// States with the highest share of defaulted loans.
pub const STATE_DEFAULTERS: [&str; 24] = [
    "FL", "GA", "NV", "AZ", "MI", "CA", "DC", "IL", "NJ", "TN", "SC", "CO", "UT", "NC", "NY",
    "VA", "TX", "AL", "IN", "MD", "LA", "KY", "OR", "OH",
];

/// Columns kept for modeling, target included.
pub const MODELING_COLUMNS: [&str; 13] = [
    "term",
    "emp_num",
    "jobs_created",
    "jobs_retained",
    "appv_loan_amount",
    "sba_appv_amount",
    "is_new",
    "sba_percent",
    "monthly_debt",
    "jobs_count",
    "is_default",
    "is_naics_defaulter",
    "is_state_defaulter",
];

pub const SELECTED_FEATURES: usize = 3;
pub const MAX_DEPTH: usize = 3;
pub const N_ESTIMATORS: usize = 100;
pub const N_NEIGHBORS: usize = 3;

/// Train/validate/test shares of the full dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitProportions {
    pub train: f64,
    pub validate: f64,
    pub test: f64,
}

impl Default for SplitProportions {
    fn default() -> Self {
        SplitProportions {
            train: TRAIN_PROPORTION,
            validate: VALIDATE_PROPORTION,
            test: TEST_PROPORTION,
        }
    }
}

impl SplitProportions {
    /// Share of the train+validate remainder that becomes validate.
    pub fn validate_ratio(&self) -> f64 {
        self.validate / (self.train + self.validate)
    }
}

/// Every knob of the pipeline. Missing JSON fields take the defaults above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub proportions: SplitProportions,
    pub target: String,
    pub seed: u64,
    pub naics_defaulters: Vec<i64>,
    pub state_defaulters: Vec<String>,
    pub modeling_columns: Vec<String>,
    pub n_selected: usize,
    pub max_depth: usize,
    pub n_estimators: usize,
    pub max_features: MaxFeatures,
    pub n_neighbors: usize,
    pub weighting: Weighting,
    pub metric: DistanceMetric,
    pub zero_division: ZeroDivision,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            proportions: SplitProportions::default(),
            target: TARGET_COLUMN.to_string(),
            seed: SEED,
            naics_defaulters: NAICS_DEFAULTERS.to_vec(),
            state_defaulters: STATE_DEFAULTERS.iter().map(|s| s.to_string()).collect(),
            modeling_columns: MODELING_COLUMNS.iter().map(|s| s.to_string()).collect(),
            n_selected: SELECTED_FEATURES,
            max_depth: MAX_DEPTH,
            n_estimators: N_ESTIMATORS,
            max_features: MaxFeatures::Sqrt,
            n_neighbors: N_NEIGHBORS,
            weighting: Weighting::Uniform,
            metric: DistanceMetric::Euclidean,
            zero_division: ZeroDivision::Zero,
        }
    }
}

impl PipelineConfig {
    /// Modeling columns other than the target, in list order.
    pub fn feature_columns(&self) -> Vec<String> {
        self.modeling_columns
            .iter()
            .filter(|c| **c != self.target)
            .cloned()
            .collect()
    }

    pub fn validate(&self) -> LoanResult<()> {
        let p = &self.proportions;
        if [p.train, p.validate, p.test].iter().any(|v| !(*v > 0.0)) {
            return Err(LoanError::invalid_input("split proportions must all be positive"));
        }
        let total = p.train + p.validate + p.test;
        if (total - 1.0).abs() > 1e-9 {
            return Err(LoanError::invalid_input(format!(
                "split proportions must sum to 1, got {}",
                total
            )));
        }
        if !self.modeling_columns.contains(&self.target) {
            return Err(LoanError::invalid_input(format!(
                "target '{}' is not a modeling column",
                self.target
            )));
        }
        let mut unique = self.modeling_columns.clone();
        unique.sort();
        unique.dedup();
        if unique.len() != self.modeling_columns.len() {
            return Err(LoanError::invalid_input("modeling columns contain duplicates"));
        }
        let n_features = self.feature_columns().len();
        if self.n_selected == 0 || self.n_selected > n_features {
            return Err(LoanError::invalid_input(format!(
                "cannot select {} of {} features",
                self.n_selected, n_features
            )));
        }
        if self.naics_defaulters.is_empty() || self.state_defaulters.is_empty() {
            return Err(LoanError::invalid_input("defaulter reference lists must not be empty"));
        }
        if self.max_depth == 0 || self.n_estimators == 0 || self.n_neighbors == 0 {
            return Err(LoanError::invalid_input(
                "max_depth, n_estimators and n_neighbors must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_defaults() {
        let c = PipelineConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.feature_columns().len(), 12);
        assert!(!c.feature_columns().contains(&"is_default".to_string()));
        assert_eq!(c.feature_columns()[0], "term");
        assert_abs_diff_eq!(c.proportions.validate_ratio(), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let c: PipelineConfig = serde_json::from_str(r#"{"seed": 7, "weighting": "distance"}"#).unwrap();
        assert_eq!(c.seed, 7);
        assert_eq!(c.weighting, Weighting::Distance);
        assert_eq!(c.n_neighbors, N_NEIGHBORS);
        assert_eq!(c.state_defaulters.len(), 24);
    }

    #[test]
    fn test_validate_rejects() {
        let mut c = PipelineConfig::default();
        c.proportions.test = 0.3;
        assert!(c.validate().is_err());

        let mut c = PipelineConfig::default();
        c.n_selected = 13;
        assert!(c.validate().is_err());

        let mut c = PipelineConfig::default();
        c.target = "defaulted".into();
        assert!(c.validate().is_err());

        let mut c = PipelineConfig::default();
        c.n_neighbors = 0;
        assert!(c.validate().is_err());
    }
}
