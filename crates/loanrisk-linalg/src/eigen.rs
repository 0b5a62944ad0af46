use loanrisk_core::{Float, LoanError, LoanResult, Tensor};

const MAX_SWEEPS: usize = 64;

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations.
///
/// Returns `(values, vectors)`: eigenvalues `[n]` in descending order and
/// the matching eigenvectors as the columns of an `[n, n]` matrix, so that
/// A = V diag(λ) Vᵀ.
pub fn symmetric_eigen<T: Float>(a: &Tensor<T>) -> LoanResult<(Tensor<T>, Tensor<T>)> {
    let (rows, n) = a.shape().matrix()?;
    if rows != n {
        return Err(LoanError::InvalidOperation(format!(
            "symmetric_eigen: matrix must be square, got {}",
            a.shape()
        )));
    }

    // Work in f64 for numerical stability
    let mut m: Vec<f64> = a.data().iter().map(|v| v.to_f64()).collect();
    let mut vecs = vec![0.0f64; n * n];
    for i in 0..n {
        vecs[i * n + i] = 1.0;
    }

    let norm = m.iter().map(|v| v * v).sum::<f64>().sqrt();
    for _ in 0..MAX_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| m[i * n + j] * m[i * n + j])
            .sum();
        if off.sqrt() <= f64::EPSILON * norm {
            break;
        }

        for p in 0..n {
            for q in p + 1..n {
                let apq = m[p * n + q];
                if apq == 0.0 {
                    continue;
                }
                let theta = (m[q * n + q] - m[p * n + p]) / (2.0 * apq);
                let sign = if theta >= 0.0 { 1.0 } else { -1.0 };
                let t = sign / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                // A ← Jᵀ A J
                for k in 0..n {
                    let akp = m[k * n + p];
                    let akq = m[k * n + q];
                    m[k * n + p] = c * akp - s * akq;
                    m[k * n + q] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = m[p * n + k];
                    let aqk = m[q * n + k];
                    m[p * n + k] = c * apk - s * aqk;
                    m[q * n + k] = s * apk + c * aqk;
                }
                // V ← V J
                for k in 0..n {
                    let vkp = vecs[k * n + p];
                    let vkq = vecs[k * n + q];
                    vecs[k * n + p] = c * vkp - s * vkq;
                    vecs[k * n + q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| m[j * n + j].total_cmp(&m[i * n + i]));

    let values: Vec<T> = order.iter().map(|&i| T::from_f64(m[i * n + i])).collect();
    let mut v_data = Vec::with_capacity(n * n);
    for row in 0..n {
        for &col in &order {
            v_data.push(T::from_f64(vecs[row * n + col]));
        }
    }

    Ok((Tensor::new(values, vec![n])?, Tensor::new(v_data, vec![n, n])?))
}

/// Moore-Penrose pseudo-inverse of a symmetric matrix: A⁺ = V diag(1/λ) Vᵀ,
/// dropping eigenvalues below `eps · max|λ| · n`.
pub fn pinv_symmetric<T: Float>(a: &Tensor<T>) -> LoanResult<Tensor<T>> {
    let (values, vectors) = symmetric_eigen(a)?;
    let n = values.numel();
    let lambda: Vec<f64> = values.data().iter().map(|v| v.to_f64()).collect();
    let v: Vec<f64> = vectors.data().iter().map(|x| x.to_f64()).collect();

    let largest = lambda.iter().fold(0.0f64, |acc, l| acc.max(l.abs()));
    let tol = f64::EPSILON * largest * n as f64;
    let inv: Vec<f64> = lambda
        .iter()
        .map(|&l| if l.abs() > tol { 1.0 / l } else { 0.0 })
        .collect();

    let mut out = vec![T::ZERO; n * n];
    for i in 0..n {
        for j in 0..n {
            let sum: f64 = (0..n).map(|k| v[i * n + k] * inv[k] * v[j * n + k]).sum();
            out[i * n + j] = T::from_f64(sum);
        }
    }
    Tensor::new(out, vec![n, n])
}
