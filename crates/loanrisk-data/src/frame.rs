use loanrisk_core::{LoanError, LoanResult, Tensor};

/// A numeric feature matrix with named columns and row identities.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    index: Vec<usize>,
    values: Tensor<f64>,
}

impl FeatureMatrix {
    pub fn new(columns: Vec<String>, index: Vec<usize>, values: Tensor<f64>) -> LoanResult<Self> {
        let (rows, cols) = values.shape().matrix()?;
        if cols != columns.len() || rows != index.len() {
            return Err(LoanError::DimensionMismatch(format!(
                "values are {}x{} but {} columns and {} row ids were given",
                rows,
                cols,
                columns.len(),
                index.len()
            )));
        }
        Ok(FeatureMatrix { columns, index, values })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn index(&self) -> &[usize] {
        &self.index
    }

    pub fn values(&self) -> &Tensor<f64> {
        &self.values
    }

    pub fn nrows(&self) -> usize {
        self.index.len()
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Same columns and rows, new values. The shape must not change.
    pub fn with_values(&self, values: Tensor<f64>) -> LoanResult<Self> {
        if values.shape() != self.values.shape() {
            return Err(LoanError::DimensionMismatch(format!(
                "replacement values have shape {}, expected {}",
                values.shape(),
                self.values.shape()
            )));
        }
        Ok(FeatureMatrix {
            columns: self.columns.clone(),
            index: self.index.clone(),
            values,
        })
    }

    /// Keep the named columns, in the order given.
    pub fn select(&self, names: &[String]) -> LoanResult<Self> {
        let positions = names
            .iter()
            .map(|n| {
                self.column_position(n)
                    .ok_or_else(|| LoanError::missing_column(n.as_str(), "feature matrix"))
            })
            .collect::<LoanResult<Vec<_>>>()?;
        FeatureMatrix::new(
            names.to_vec(),
            self.index.clone(),
            self.values.select_cols(&positions)?,
        )
    }
}

/// Binary target column aligned with a `FeatureMatrix`.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetVector {
    name: String,
    index: Vec<usize>,
    values: Tensor<f64>,
}

impl TargetVector {
    pub fn new(name: impl Into<String>, index: Vec<usize>, values: Vec<f64>) -> LoanResult<Self> {
        if values.len() != index.len() {
            return Err(LoanError::DimensionMismatch(format!(
                "{} target values for {} row ids",
                values.len(),
                index.len()
            )));
        }
        Ok(TargetVector {
            name: name.into(),
            index,
            values: Tensor::from_slice(&values),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> &[usize] {
        &self.index
    }

    pub fn values(&self) -> &Tensor<f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Fraction of rows labelled 1.
    pub fn positive_rate(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let positives = self.values.data().iter().filter(|&&v| v == 1.0).count();
        positives as f64 / self.len() as f64
    }

    /// Fails unless the rows line up one-to-one with `features`.
    pub fn check_aligned(&self, features: &FeatureMatrix) -> LoanResult<()> {
        if self.index != features.index() {
            return Err(LoanError::DimensionMismatch(format!(
                "target '{}' has {} rows not aligned with a {}-row feature matrix",
                self.name,
                self.len(),
                features.nrows()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn matrix() -> FeatureMatrix {
        let values = Tensor::from_vec2d(&[
            vec![84.0, 1.0, 0.5],
            vec![120.0, 0.0, 0.75],
        ])
        .unwrap();
        FeatureMatrix::new(
            vec!["term".into(), "is_new".into(), "sba_percent".into()],
            vec![7, 3],
            values,
        )
        .unwrap()
    }

    #[test]
    fn test_new_checks_shape() {
        let values = Tensor::zeros(vec![2, 2]);
        assert!(FeatureMatrix::new(vec!["a".into()], vec![0, 1], values).is_err());
    }

    #[test]
    fn test_select_reorders() {
        let m = matrix();
        let s = m.select(&["sba_percent".into(), "term".into()]).unwrap();
        assert_eq!(s.columns(), &["sba_percent".to_string(), "term".to_string()]);
        assert_eq!(s.index(), &[7, 3]);
        assert_eq!(s.values().data(), &[0.5, 84.0, 0.75, 120.0]);
        assert!(m.select(&["naics".into()]).is_err());
    }

    #[test]
    fn test_with_values_keeps_shape() {
        let m = matrix();
        let scaled = m.with_values(m.values().mul_scalar(0.0)).unwrap();
        assert_eq!(scaled.columns(), m.columns());
        assert!(m.with_values(Tensor::zeros(vec![3, 3])).is_err());
    }

    #[test]
    fn test_target_vector() {
        let y = TargetVector::new("is_default", vec![7, 3], vec![1.0, 0.0]).unwrap();
        assert_abs_diff_eq!(y.positive_rate(), 0.5);
        assert!(y.check_aligned(&matrix()).is_ok());

        let other = TargetVector::new("is_default", vec![3, 7], vec![1.0, 0.0]).unwrap();
        assert!(other.check_aligned(&matrix()).is_err());
        assert!(TargetVector::new("is_default", vec![1], vec![]).is_err());
    }
}
