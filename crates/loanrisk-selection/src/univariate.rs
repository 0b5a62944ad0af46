use loanrisk_core::{LoanError, LoanResult, Tensor};

use crate::{check_request, FeatureSelector};

/// Univariate linear regression F-statistic of each column against `y`.
///
/// F = r² / (1 − r²) · (n − 2), with r the Pearson correlation. Scores are
/// kept finite the way scikit-learn's `force_finite` does: a constant column
/// (or constant `y`) scores 0 and a perfectly correlated column scores
/// `f64::MAX`.
pub fn f_regression(x: &Tensor<f64>, y: &Tensor<f64>) -> LoanResult<Vec<f64>> {
    let (n, p) = x.shape().matrix()?;
    if y.numel() != n {
        return Err(LoanError::DimensionMismatch(format!(
            "X has {} rows but y has {} values",
            n,
            y.numel()
        )));
    }
    if n < 3 {
        return Err(LoanError::invalid_input(format!(
            "F-test needs at least 3 rows, got {}",
            n
        )));
    }

    let y_mean = y.mean_all()?;
    let yc: Vec<f64> = y.data().iter().map(|v| v - y_mean).collect();
    let y_norm = yc.iter().map(|v| v * v).sum::<f64>().sqrt();
    let x_mean = x.mean_rows()?;
    let dof = (n - 2) as f64;

    let mut scores = Vec::with_capacity(p);
    for j in 0..p {
        let mean = x_mean.data()[j];
        let (mut cross, mut sq) = (0.0, 0.0);
        for (i, yv) in yc.iter().enumerate() {
            let d = x.data()[i * p + j] - mean;
            cross += d * yv;
            sq += d * d;
        }
        let r = cross / (sq.sqrt() * y_norm);
        let r2 = r * r;
        let f = r2 / (1.0 - r2) * dof;
        scores.push(if f.is_nan() {
            0.0
        } else if f.is_infinite() {
            f64::MAX
        } else {
            f
        });
    }
    Ok(scores)
}

/// Keep the `k` columns with the highest F-statistic.
///
/// Among equal scores the later column is preferred: columns are stably sorted by ascending score and the last `k`
/// are taken.
#[derive(Debug, Clone)]
pub struct SelectKBest {
    pub k: usize,
}

impl SelectKBest {
    pub fn new(k: usize) -> Self {
        SelectKBest { k }
    }
}

impl FeatureSelector for SelectKBest {
    fn select_indices(&self, x: &Tensor<f64>, y: &Tensor<f64>) -> LoanResult<Vec<usize>> {
        let (_, p) = check_request(x, y, self.k)?;
        let scores = f_regression(x, y)?;

        let mut order: Vec<usize> = (0..p).collect();
        order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
        let mut picked = order[p - self.k..].to_vec();
        picked.sort_unstable();
        Ok(picked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_f_regression_value() {
        // r = 0.8 for x = [1, 2, 3, 4, 5], y = [1, 3, 2, 5, 4]
        let x: Tensor<f64> = Tensor::from_vec2d(&[
            vec![1.0], vec![2.0], vec![3.0], vec![4.0], vec![5.0],
        ]).unwrap();
        let y = Tensor::from_slice(&[1.0, 3.0, 2.0, 5.0, 4.0]);
        let f = f_regression(&x, &y).unwrap();
        assert_abs_diff_eq!(f[0], 0.64 / 0.36 * 3.0, epsilon = 1e-10);
    }

    #[test]
    fn test_constant_column_scores_zero() {
        let x: Tensor<f64> = Tensor::from_vec2d(&[
            vec![1.0, 2.0], vec![1.0, 4.0], vec![1.0, 5.0],
        ]).unwrap();
        let y = Tensor::from_slice(&[0.0, 1.0, 1.0]);
        let f = f_regression(&x, &y).unwrap();
        assert_eq!(f[0], 0.0);
        assert!(f[1].is_finite() && f[1] > 0.0);
    }

    #[test]
    fn test_constant_column_ties_with_uncorrelated() {
        // Column 0 is constant, column 1 is uncorrelated with y; both score 0
        // and the later one wins the tie.
        let x: Tensor<f64> = Tensor::from_vec2d(&[
            vec![2.0, 1.0, 0.0],
            vec![2.0, 0.0, 0.0],
            vec![2.0, 0.0, 1.0],
            vec![2.0, 1.0, 1.0],
        ]).unwrap();
        let y = Tensor::from_slice(&[0.0, 0.0, 1.0, 1.0]);
        let f = f_regression(&x, &y).unwrap();
        assert_eq!(f[0], 0.0);
        assert_abs_diff_eq!(f[1], 0.0, epsilon = 1e-12);
        assert_eq!(f[2], f64::MAX);
        assert_eq!(SelectKBest::new(2).select_indices(&x, &y).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_select_k_best() {
        // Column 2 tracks y, column 0 is noisy, column 1 is constant.
        let x: Tensor<f64> = Tensor::from_vec2d(&[
            vec![0.3, 1.0, 0.0],
            vec![0.9, 1.0, 0.1],
            vec![0.1, 1.0, 0.9],
            vec![0.5, 1.0, 1.0],
        ]).unwrap();
        let y = Tensor::from_slice(&[0.0, 0.0, 1.0, 1.0]);
        let selector = SelectKBest::new(2);
        assert_eq!(selector.select_indices(&x, &y).unwrap(), vec![0, 2]);
        assert_eq!(SelectKBest::new(1).select_indices(&x, &y).unwrap(), vec![2]);
    }

    #[test]
    fn test_ties_prefer_later_columns() {
        // Identical columns score identically.
        let x: Tensor<f64> = Tensor::from_vec2d(&[
            vec![1.0, 1.0, 1.0],
            vec![2.0, 2.0, 2.0],
            vec![4.0, 4.0, 4.0],
        ]).unwrap();
        let y = Tensor::from_slice(&[0.0, 1.0, 1.0]);
        assert_eq!(SelectKBest::new(2).select_indices(&x, &y).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_bad_k() {
        let x: Tensor<f64> = Tensor::zeros(vec![4, 2]);
        let y = Tensor::from_slice(&[0.0, 1.0, 0.0, 1.0]);
        assert!(SelectKBest::new(3).select_indices(&x, &y).is_err());
        assert!(SelectKBest::new(0).select_indices(&x, &y).is_err());
    }
}
