use loanrisk_core::{LoanError, LoanResult, Tensor};
use loanrisk_data::FeatureMatrix;
use serde::{Deserialize, Serialize};

/// Fitted per-column minimum and range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxState {
    pub columns: Vec<String>,
    pub min: Tensor<f64>,
    pub range: Tensor<f64>,
}

/// Scale features to the [0, 1] range of the data they were fitted on.
///
/// Transforming other data reuses the fitted minimum and range unchanged, so
/// values outside the training range map outside [0, 1]. Constant columns
/// use a divisor of 1 and map to 0.
#[derive(Debug, Clone, Default)]
pub struct MinMaxScaler {
    state: Option<MinMaxState>,
}

impl MinMaxScaler {
    pub fn new() -> Self {
        MinMaxScaler { state: None }
    }

    pub fn state(&self) -> Option<&MinMaxState> {
        self.state.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// Record column minimum and range. Refitting replaces the old state.
    pub fn fit(&mut self, x: &FeatureMatrix) -> LoanResult<()> {
        let values = x.values();
        if values.has_nan() {
            return Err(LoanError::invalid_input("cannot fit scaler on missing values"));
        }
        let min = values.min_rows()?;
        let max = values.max_rows()?;
        let range = max
            .sub(&min)?
            .apply(|v| if v.abs() < f64::EPSILON { 1.0 } else { v });

        self.state = Some(MinMaxState {
            columns: x.columns().to_vec(),
            min,
            range,
        });
        Ok(())
    }

    /// Apply the fitted transform. Columns, row order and row ids are kept.
    pub fn transform(&self, x: &FeatureMatrix) -> LoanResult<FeatureMatrix> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| LoanError::NotFitted("MinMaxScaler".into()))?;
        if x.columns() != state.columns.as_slice() {
            return Err(LoanError::DimensionMismatch(format!(
                "scaler fitted on {:?}, got {:?}",
                state.columns,
                x.columns()
            )));
        }
        if x.nrows() == 0 {
            return Ok(x.clone());
        }

        let scaled = x.values().sub(&state.min)?.div(&state.range)?;
        x.with_values(scaled)
    }

    pub fn fit_transform(&mut self, x: &FeatureMatrix) -> LoanResult<FeatureMatrix> {
        self.fit(x)?;
        self.transform(x)
    }
}
