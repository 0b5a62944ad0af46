use std::fmt;

use loanrisk_core::{Float, LoanError, LoanResult, Tensor};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// What a precision or recall with a zero denominator evaluates to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroDivision {
    /// 0.0, silently.
    #[default]
    Zero,
    /// 0.0, and a warning is logged.
    Warn,
}

fn labels_of<T: Float>(y: &Tensor<T>, what: &str) -> LoanResult<Vec<usize>> {
    y.data()
        .iter()
        .map(|&v| {
            if v.is_finite() && v >= T::ZERO {
                Ok(v.to_label())
            } else {
                Err(LoanError::invalid_input(format!("{} contains label {}", what, v)))
            }
        })
        .collect()
}

fn paired_labels<T: Float>(y_true: &Tensor<T>, y_pred: &Tensor<T>) -> LoanResult<(Vec<usize>, Vec<usize>)> {
    if y_true.numel() != y_pred.numel() {
        return Err(LoanError::DimensionMismatch(format!(
            "{} true labels vs {} predictions",
            y_true.numel(),
            y_pred.numel()
        )));
    }
    if y_true.numel() == 0 {
        return Err(LoanError::EmptyTensor);
    }
    Ok((labels_of(y_true, "y_true")?, labels_of(y_pred, "y_pred")?))
}

/// Fraction of correct predictions.
pub fn accuracy<T: Float>(y_true: &Tensor<T>, y_pred: &Tensor<T>) -> LoanResult<f64> {
    let (t, p) = paired_labels(y_true, y_pred)?;
    let correct = t.iter().zip(&p).filter(|(a, b)| a == b).count();
    Ok(correct as f64 / t.len() as f64)
}

/// Confusion matrix over `labels`: `matrix[i][j]` counts rows whose true
/// label is `labels[i]` and predicted label is `labels[j]`.
pub fn confusion_matrix<T: Float>(
    y_true: &Tensor<T>,
    y_pred: &Tensor<T>,
    labels: &[usize],
) -> LoanResult<Vec<Vec<usize>>> {
    let (t, p) = paired_labels(y_true, y_pred)?;
    let pos = |l: usize| labels.iter().position(|&x| x == l);
    let mut matrix = vec![vec![0usize; labels.len()]; labels.len()];
    for (&ti, &pi) in t.iter().zip(&p) {
        if let (Some(i), Some(j)) = (pos(ti), pos(pi)) {
            matrix[i][j] += 1;
        }
    }
    Ok(matrix)
}

/// Precision, recall, F1 and support for one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// An averaged row (`macro avg`, `weighted avg`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Per-class metrics plus accuracy and averages.
///
/// `Display` renders the familiar text table:
///
/// ```text
///               precision    recall  f1-score   support
///
///            0       0.95      0.99      0.97       216
///            1       0.80      0.50      0.62        24
///
///     accuracy                           0.94       240
///    macro avg       0.88      0.74      0.79       240
/// weighted avg       0.94      0.94      0.93       240
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
}

impl ClassificationReport {
    pub fn class(&self, label: usize) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.label == label)
    }

    pub fn total_support(&self) -> usize {
        self.classes.iter().map(|c| c.support).sum()
    }
}

fn ratio(num: usize, den: usize, metric: &str, label: usize, policy: ZeroDivision) -> f64 {
    if den > 0 {
        return num as f64 / den as f64;
    }
    if policy == ZeroDivision::Warn {
        warn!(metric, label, "ill-defined metric set to 0.0: no samples in denominator");
    }
    0.0
}

/// Build a classification report. Rows cover every label seen in either
/// `y_true` or `y_pred`, in ascending order.
pub fn classification_report<T: Float>(
    y_true: &Tensor<T>,
    y_pred: &Tensor<T>,
    zero_division: ZeroDivision,
) -> LoanResult<ClassificationReport> {
    let (t, p) = paired_labels(y_true, y_pred)?;
    let mut labels: Vec<usize> = t.iter().chain(&p).copied().collect();
    labels.sort_unstable();
    labels.dedup();

    let cm = confusion_matrix(y_true, y_pred, &labels)?;
    let n = t.len();

    let classes: Vec<ClassMetrics> = labels
        .iter()
        .enumerate()
        .map(|(k, &label)| {
            let tp = cm[k][k];
            let support: usize = cm[k].iter().sum();
            let predicted: usize = cm.iter().map(|row| row[k]).sum();
            let precision = ratio(tp, predicted, "precision", label, zero_division);
            let recall = ratio(tp, support, "recall", label, zero_division);
            let f1_score = ratio(2 * tp, predicted + support, "f1-score", label, zero_division);
            ClassMetrics {
                label,
                precision,
                recall,
                f1_score,
                support,
            }
        })
        .collect();

    let correct: usize = (0..labels.len()).map(|k| cm[k][k]).sum();
    let k = classes.len() as f64;
    let macro_avg = AverageMetrics {
        precision: classes.iter().map(|c| c.precision).sum::<f64>() / k,
        recall: classes.iter().map(|c| c.recall).sum::<f64>() / k,
        f1_score: classes.iter().map(|c| c.f1_score).sum::<f64>() / k,
        support: n,
    };
    let weighted = |f: fn(&ClassMetrics) -> f64| {
        classes.iter().map(|c| f(c) * c.support as f64).sum::<f64>() / n as f64
    };
    let weighted_avg = AverageMetrics {
        precision: weighted(|c| c.precision),
        recall: weighted(|c| c.recall),
        f1_score: weighted(|c| c.f1_score),
        support: n,
    };

    Ok(ClassificationReport {
        accuracy: correct as f64 / n as f64,
        classes,
        macro_avg,
        weighted_avg,
    })
}

const NAME_WIDTH: usize = 12;

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = NAME_WIDTH;
        writeln!(
            f,
            "{:>w$}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>w$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label, c.precision, c.recall, c.f1_score, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>w$}  {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>w$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1_score, avg.support
            )?;
        }
        Ok(())
    }
}
