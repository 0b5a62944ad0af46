use loanrisk_core::{LoanError, LoanResult, Tensor};
use loanrisk_data::{FeatureMatrix, TargetVector};

pub mod univariate;
pub mod rfe;

pub use univariate::*;
pub use rfe::*;

/// A strategy that picks a subset of feature columns.
pub trait FeatureSelector {
    /// Positions of the selected columns, ascending.
    fn select_indices(&self, x: &Tensor<f64>, y: &Tensor<f64>) -> LoanResult<Vec<usize>>;

    /// Names of the selected columns, in the matrix's column order.
    fn select(&self, x: &FeatureMatrix, y: &TargetVector) -> LoanResult<Vec<String>> {
        y.check_aligned(x)?;
        let picked = self.select_indices(x.values(), y.values())?;
        Ok(picked.into_iter().map(|i| x.columns()[i].clone()).collect())
    }
}

/// Shared argument checks for selectors keeping `k` of `x`'s columns.
pub(crate) fn check_request(x: &Tensor<f64>, y: &Tensor<f64>, k: usize) -> LoanResult<(usize, usize)> {
    let (n, p) = x.shape().matrix()?;
    if y.numel() != n {
        return Err(LoanError::DimensionMismatch(format!(
            "X has {} rows but y has {} values",
            n,
            y.numel()
        )));
    }
    if k == 0 || k > p {
        return Err(LoanError::invalid_input(format!(
            "cannot select {} of {} features",
            k, p
        )));
    }
    Ok((n, p))
}
