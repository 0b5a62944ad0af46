use loanrisk_core::{Float, LoanError, LoanResult, Tensor};
use loanrisk_linalg::lstsq;

/// Ordinary Least Squares linear regression.
///
/// Fits `y = Xw + b`. With an intercept, X and y are centered first and
/// `b = ȳ - x̄·w`. Weights are the minimum-norm least-squares solution, so
/// collinear features share weight instead of making the fit fail.
#[derive(Debug, Clone)]
pub struct LinearRegression<T: Float> {
    pub weights: Option<Tensor<T>>,
    pub bias: Option<T>,
    pub fit_intercept: bool,
}

impl<T: Float> LinearRegression<T> {
    pub fn new(fit_intercept: bool) -> Self {
        LinearRegression {
            weights: None,
            bias: None,
            fit_intercept,
        }
    }

    pub fn fit(&mut self, x: &Tensor<T>, y: &Tensor<T>) -> LoanResult<()> {
        let (n, _) = x.shape().matrix()?;
        if y.numel() != n {
            return Err(LoanError::DimensionMismatch(format!(
                "X has {} rows but y has {} values",
                n,
                y.numel()
            )));
        }
        if n == 0 {
            return Err(LoanError::EmptyTensor);
        }

        if self.fit_intercept {
            let x_mean = x.mean_rows()?;
            let y_mean = y.mean_all()?;
            let w = lstsq(&x.sub(&x_mean)?, &y.add_scalar(-y_mean))?;
            self.bias = Some(y_mean - x_mean.dot(&w)?);
            self.weights = Some(w);
        } else {
            self.weights = Some(lstsq(x, y)?);
            self.bias = None;
        }
        Ok(())
    }

    pub fn predict(&self, x: &Tensor<T>) -> LoanResult<Tensor<T>> {
        let w = self
            .weights
            .as_ref()
            .ok_or_else(|| LoanError::NotFitted("LinearRegression".into()))?;
        let (n, p) = x.shape().matrix()?;

        let mut pred = x.matmul(&w.reshape(vec![p, 1])?)?;
        if let Some(b) = self.bias {
            pred = pred.add_scalar(b);
        }
        pred.reshape(vec![n])
    }

    /// Fitted coefficients, one per feature.
    pub fn coefficients(&self) -> LoanResult<&[T]> {
        self.weights
            .as_ref()
            .map(|w| w.data())
            .ok_or_else(|| LoanError::NotFitted("LinearRegression".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_linear_regression() {
        // y = 2*x1 + 3*x2 + 1
        let x: Tensor<f64> = Tensor::from_vec2d(&[
            vec![1.0, 2.0],
            vec![2.0, 1.0],
            vec![3.0, 4.0],
            vec![4.0, 3.0],
            vec![5.0, 5.0],
        ])
        .unwrap();
        let y: Tensor<f64> = Tensor::from_slice(&[9.0, 8.0, 19.0, 18.0, 26.0]);

        let mut model = LinearRegression::new(true);
        model.fit(&x, &y).unwrap();

        let w = model.coefficients().unwrap();
        assert_abs_diff_eq!(w[0], 2.0, epsilon = 1e-8);
        assert_abs_diff_eq!(w[1], 3.0, epsilon = 1e-8);
        assert_abs_diff_eq!(model.bias.unwrap(), 1.0, epsilon = 1e-8);

        let pred = model.predict(&x).unwrap();
        for i in 0..5 {
            assert_abs_diff_eq!(pred.data()[i], y.data()[i], epsilon = 1e-8);
        }
    }

    #[test]
    fn test_collinear_features() {
        // Third column is the sum of the first two.
        let x: Tensor<f64> = Tensor::from_vec2d(&[
            vec![1.0, 0.0, 1.0],
            vec![0.0, 1.0, 1.0],
            vec![2.0, 1.0, 3.0],
            vec![1.0, 3.0, 4.0],
            vec![3.0, 2.0, 5.0],
        ])
        .unwrap();
        let y: Tensor<f64> = Tensor::from_slice(&[1.0, 2.0, 4.0, 7.0, 7.0]);

        let mut model = LinearRegression::new(true);
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x).unwrap();
        for i in 0..5 {
            assert_abs_diff_eq!(pred.data()[i], y.data()[i], epsilon = 1e-8);
        }
    }

    #[test]
    fn test_not_fitted() {
        let model: LinearRegression<f64> = LinearRegression::new(true);
        assert!(matches!(model.coefficients(), Err(LoanError::NotFitted(_))));
        assert!(model.predict(&Tensor::zeros(vec![1, 1])).is_err());
    }
}
