use loanrisk_core::{Float, LoanError, LoanResult, Tensor};

use crate::eigen::pinv_symmetric;

/// Gram matrix XᵀX of an `[n, p]` matrix.
pub fn gram<T: Float>(x: &Tensor<T>) -> LoanResult<Tensor<T>> {
    x.t()?.matmul(x)
}

/// Minimum-norm least-squares solution of X w ≈ y.
///
/// `x` is `[n, p]`, `y` is `[n]`; returns `w` of shape `[p]`. Uses
/// (XᵀX)⁺ Xᵀ y, so rank-deficient designs (collinear columns) still
/// produce a solution instead of failing.
pub fn lstsq<T: Float>(x: &Tensor<T>, y: &Tensor<T>) -> LoanResult<Tensor<T>> {
    let (n, p) = x.shape().matrix()?;
    if y.ndim() != 1 || y.numel() != n {
        return Err(LoanError::DimensionMismatch(format!(
            "lstsq: y has shape {} but X has {} rows",
            y.shape(),
            n
        )));
    }

    let xty = x.t()?.matmul(&y.reshape(vec![n, 1])?)?;
    let w = pinv_symmetric(&gram(x)?)?.matmul(&xty)?;
    w.reshape(vec![p])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_lstsq_exact() {
        // y = 2a - b
        let x: Tensor<f64> = Tensor::from_vec2d(&[
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
            vec![2.0, 1.0],
        ])
        .unwrap();
        let y = Tensor::from_slice(&[2.0, -1.0, 1.0, 3.0]);
        let w = lstsq(&x, &y).unwrap();
        assert_abs_diff_eq!(w.data()[0], 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(w.data()[1], -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_lstsq_collinear_splits_weight() {
        // Duplicate columns: minimum-norm solution shares the weight equally.
        let x: Tensor<f64> = Tensor::from_vec2d(&[
            vec![1.0, 1.0],
            vec![2.0, 2.0],
            vec![3.0, 3.0],
        ])
        .unwrap();
        let y = Tensor::from_slice(&[2.0, 4.0, 6.0]);
        let w = lstsq(&x, &y).unwrap();
        assert_abs_diff_eq!(w.data()[0], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(w.data()[1], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_lstsq_shape_error() {
        let x: Tensor<f64> = Tensor::zeros(vec![3, 2]);
        let y = Tensor::from_slice(&[1.0, 2.0]);
        assert!(matches!(lstsq(&x, &y), Err(LoanError::DimensionMismatch(_))));
    }
}
