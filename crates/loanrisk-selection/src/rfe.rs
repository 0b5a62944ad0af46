use loanrisk_core::{LoanResult, Tensor};
use loanrisk_linear::LinearRegression;
use tracing::debug;

use crate::{check_request, FeatureSelector};

/// Recursive feature elimination driven by least-squares coefficients.
///
/// Repeatedly fits `LinearRegression` on the surviving columns and drops the
/// one with the smallest absolute coefficient (the earlier column on ties)
/// until `n_features` remain. One column is removed per round.
#[derive(Debug, Clone)]
pub struct Rfe {
    pub n_features: usize,
}

impl Rfe {
    pub fn new(n_features: usize) -> Self {
        Rfe { n_features }
    }

    /// Elimination order: the first column removed comes first.
    pub fn elimination_order(&self, x: &Tensor<f64>, y: &Tensor<f64>) -> LoanResult<Vec<usize>> {
        let (_, p) = check_request(x, y, self.n_features)?;
        let mut remaining: Vec<usize> = (0..p).collect();
        let mut eliminated = Vec::with_capacity(p - self.n_features);

        while remaining.len() > self.n_features {
            let mut model = LinearRegression::new(true);
            model.fit(&x.select_cols(&remaining)?, y)?;
            let coefs = model.coefficients()?;

            let mut weakest = 0;
            for (k, c) in coefs.iter().enumerate() {
                if c.abs() < coefs[weakest].abs() {
                    weakest = k;
                }
            }
            let dropped = remaining.remove(weakest);
            debug!(column = dropped, coef = coefs[weakest], left = remaining.len(), "rfe eliminated");
            eliminated.push(dropped);
        }

        Ok(eliminated)
    }
}

impl FeatureSelector for Rfe {
    fn select_indices(&self, x: &Tensor<f64>, y: &Tensor<f64>) -> LoanResult<Vec<usize>> {
        let (_, p) = check_request(x, y, self.n_features)?;
        let eliminated = self.elimination_order(x, y)?;
        Ok((0..p).filter(|j| !eliminated.contains(j)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loanrisk_data::{FeatureMatrix, TargetVector};

    fn design() -> (Tensor<f64>, Tensor<f64>) {
        // y = 5 a + 0.1 b + 3 c - 2 d
        let rows = vec![
            vec![1.0, 0.0, 2.0, 1.0],
            vec![2.0, 1.0, 0.0, 3.0],
            vec![0.0, 3.0, 1.0, 2.0],
            vec![3.0, 2.0, 4.0, 0.0],
            vec![1.0, 4.0, 3.0, 4.0],
            vec![4.0, 1.0, 1.0, 1.0],
        ];
        let y: Vec<f64> = rows
            .iter()
            .map(|r| 5.0 * r[0] + 0.1 * r[1] + 3.0 * r[2] - 2.0 * r[3])
            .collect();
        (Tensor::from_vec2d(&rows).unwrap(), Tensor::from_slice(&y))
    }

    #[test]
    fn test_drops_weakest_coefficient() {
        let (x, y) = design();
        let rfe = Rfe::new(3);
        assert_eq!(rfe.elimination_order(&x, &y).unwrap(), vec![1]);
        assert_eq!(rfe.select_indices(&x, &y).unwrap(), vec![0, 2, 3]);
    }

    #[test]
    fn test_recursive_rounds() {
        let (x, y) = design();
        let rfe = Rfe::new(1);
        let order = rfe.elimination_order(&x, &y).unwrap();
        assert_eq!(order.len(), 3);
        assert_eq!(order[0], 1);
        assert_eq!(rfe.select_indices(&x, &y).unwrap().len(), 1);
    }

    #[test]
    fn test_select_names() {
        let (x, y) = design();
        let names: Vec<String> = ["term", "emp_num", "sba_percent", "monthly_debt"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let index: Vec<usize> = (0..6).collect();
        let fm = FeatureMatrix::new(names, index.clone(), x).unwrap();
        let target = TargetVector::new("is_default", index, y.data().to_vec()).unwrap();
        assert_eq!(
            Rfe::new(3).select(&fm, &target).unwrap(),
            vec!["term".to_string(), "sba_percent".into(), "monthly_debt".into()]
        );
    }

    #[test]
    fn test_keep_all() {
        let (x, y) = design();
        assert!(Rfe::new(4).elimination_order(&x, &y).unwrap().is_empty());
        assert!(Rfe::new(5).select_indices(&x, &y).is_err());
    }
}
