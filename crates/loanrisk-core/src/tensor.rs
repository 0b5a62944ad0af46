use crate::dtype::Float;
use crate::error::{LoanError, LoanResult};
use crate::shape::Shape;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense N-dimensional array, the numeric backbone of every LoanRisk model.
///
/// Stores data in a flat contiguous `Vec<T>` with row-major (C-order) layout.
/// Feature matrices are `[rows, features]`, targets and predictions `[rows]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct Tensor<T: Float> {
    data: Vec<T>,
    shape: Shape,
}

// ─── Construction ───────────────────────────────────────────────────────────

impl<T: Float> Tensor<T> {
    /// Create a tensor from raw data and shape.
    pub fn new(data: Vec<T>, shape: Vec<usize>) -> LoanResult<Self> {
        let s = Shape::new(shape);
        if data.len() != s.numel() {
            return Err(LoanError::DimensionMismatch(format!(
                "{} elements cannot fill shape {}",
                data.len(),
                s
            )));
        }
        Ok(Tensor { data, shape: s })
    }

    /// Create a tensor filled with zeros.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let s = Shape::new(shape);
        Tensor {
            data: vec![T::ZERO; s.numel()],
            shape: s,
        }
    }

    /// Create a 1-D tensor from a slice.
    pub fn from_slice(data: &[T]) -> Self {
        Tensor {
            data: data.to_vec(),
            shape: Shape::new(vec![data.len()]),
        }
    }

    /// Create a 2-D tensor from row vectors. All rows must have equal length.
    pub fn from_vec2d(rows: &[Vec<T>]) -> LoanResult<Self> {
        if rows.is_empty() {
            return Err(LoanError::EmptyTensor);
        }
        let cols = rows[0].len();
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(LoanError::DimensionMismatch(format!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    cols
                )));
            }
            data.extend_from_slice(row);
        }
        Tensor::new(data, vec![rows.len(), cols])
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn shape_vec(&self) -> Vec<usize> {
        self.shape.to_vec()
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Row count of a 1-D or 2-D tensor.
    pub fn nrows(&self) -> usize {
        self.shape.dims().first().copied().unwrap_or(0)
    }

    /// Column count of a 2-D tensor (1 for vectors).
    pub fn ncols(&self) -> usize {
        self.shape.dims().get(1).copied().unwrap_or(1)
    }

    /// Multi-dimensional indexing: compute flat offset from indices.
    pub fn get(&self, indices: &[usize]) -> LoanResult<T> {
        if indices.len() != self.ndim() {
            return Err(LoanError::DimensionMismatch(format!(
                "expected {} indices, got {}",
                self.ndim(),
                indices.len()
            )));
        }
        let dims = self.shape.dims();
        let mut offset = 0;
        for (axis, &idx) in indices.iter().enumerate() {
            if idx >= dims[axis] {
                return Err(LoanError::IndexOutOfBounds {
                    index: idx,
                    axis,
                    size: dims[axis],
                });
            }
            offset = offset * dims[axis] + idx;
        }
        Ok(self.data[offset])
    }

    /// Borrow row `i` of a 2D tensor as a slice.
    pub fn row_slice(&self, i: usize) -> LoanResult<&[T]> {
        let (rows, cols) = self.shape.matrix()?;
        if i >= rows {
            return Err(LoanError::IndexOutOfBounds {
                index: i,
                axis: 0,
                size: rows,
            });
        }
        Ok(&self.data[i * cols..(i + 1) * cols])
    }

    // ─── Shape Manipulation ─────────────────────────────────────────────────

    /// Reshape the tensor (data remains the same, only shape changes).
    pub fn reshape(&self, new_shape: Vec<usize>) -> LoanResult<Tensor<T>> {
        let ns = Shape::new(new_shape);
        if self.numel() != ns.numel() {
            return Err(LoanError::DimensionMismatch(format!(
                "cannot reshape {} into {}",
                self.shape, ns
            )));
        }
        Ok(Tensor {
            data: self.data.clone(),
            shape: ns,
        })
    }

    /// Transpose a matrix.
    pub fn t(&self) -> LoanResult<Tensor<T>> {
        let (rows, cols) = self.shape.matrix()?;
        let mut data = vec![T::ZERO; self.numel()];
        for i in 0..rows {
            for j in 0..cols {
                data[j * rows + i] = self.data[i * cols + j];
            }
        }
        Ok(Tensor {
            data,
            shape: Shape::new(vec![cols, rows]),
        })
    }

    /// Gather rows by position. Works for vectors and matrices; the order
    /// of `indices` is the order of the output.
    pub fn select_rows(&self, indices: &[usize]) -> LoanResult<Tensor<T>> {
        let rows = self.nrows();
        let width = if self.ndim() == 1 { 1 } else { self.shape.matrix()?.1 };
        let mut data = Vec::with_capacity(indices.len() * width);
        for &i in indices {
            if i >= rows {
                return Err(LoanError::IndexOutOfBounds {
                    index: i,
                    axis: 0,
                    size: rows,
                });
            }
            data.extend_from_slice(&self.data[i * width..(i + 1) * width]);
        }
        let mut dims = self.shape.to_vec();
        dims[0] = indices.len();
        Tensor::new(data, dims)
    }

    /// Gather columns of a matrix by position.
    pub fn select_cols(&self, indices: &[usize]) -> LoanResult<Tensor<T>> {
        let (rows, cols) = self.shape.matrix()?;
        if let Some(&bad) = indices.iter().find(|&&j| j >= cols) {
            return Err(LoanError::IndexOutOfBounds {
                index: bad,
                axis: 1,
                size: cols,
            });
        }
        let mut data = Vec::with_capacity(rows * indices.len());
        for i in 0..rows {
            let row = &self.data[i * cols..(i + 1) * cols];
            data.extend(indices.iter().map(|&j| row[j]));
        }
        Tensor::new(data, vec![rows, indices.len()])
    }

    // ─── Element-wise Operations ────────────────────────────────────────────

    pub fn apply<F: Fn(T) -> T>(&self, f: F) -> Tensor<T> {
        Tensor {
            data: self.data.iter().map(|&x| f(x)).collect(),
            shape: self.shape.clone(),
        }
    }

    pub fn add_scalar(&self, s: T) -> Tensor<T> { self.apply(|x| x + s) }
    pub fn mul_scalar(&self, s: T) -> Tensor<T> { self.apply(|x| x * s) }

    fn broadcast_binary_op<F: Fn(T, T) -> T>(
        &self,
        other: &Tensor<T>,
        op: F,
    ) -> LoanResult<Tensor<T>> {
        // Fast path: same shape
        if self.shape == other.shape {
            let data = self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| op(a, b))
                .collect();
            return Ok(Tensor {
                data,
                shape: self.shape.clone(),
            });
        }

        let out_shape = Shape::broadcast_shape(&self.shape, &other.shape)?;
        let out_dims = out_shape.dims().to_vec();
        let ndim = out_dims.len();
        let a_dims = aligned_dims(self.shape.dims(), ndim);
        let b_dims = aligned_dims(other.shape.dims(), ndim);

        let mut data = Vec::with_capacity(out_shape.numel());
        let mut index = vec![0usize; ndim];
        for _ in 0..out_shape.numel() {
            let mut a_offset = 0usize;
            let mut b_offset = 0usize;
            for d in 0..ndim {
                a_offset = a_offset * a_dims[d] + if a_dims[d] > 1 { index[d] } else { 0 };
                b_offset = b_offset * b_dims[d] + if b_dims[d] > 1 { index[d] } else { 0 };
            }
            data.push(op(self.data[a_offset], other.data[b_offset]));

            // Advance the row-major output index.
            for d in (0..ndim).rev() {
                index[d] += 1;
                if index[d] < out_dims[d] {
                    break;
                }
                index[d] = 0;
            }
        }

        Ok(Tensor {
            data,
            shape: out_shape,
        })
    }

    pub fn add(&self, other: &Tensor<T>) -> LoanResult<Tensor<T>> {
        self.broadcast_binary_op(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &Tensor<T>) -> LoanResult<Tensor<T>> {
        self.broadcast_binary_op(other, |a, b| a - b)
    }

    pub fn div(&self, other: &Tensor<T>) -> LoanResult<Tensor<T>> {
        self.broadcast_binary_op(other, |a, b| a / b)
    }

    // ─── Reductions ─────────────────────────────────────────────────────────

    /// Sum of all elements.
    pub fn sum_all(&self) -> T {
        self.data.iter().copied().sum()
    }

    /// Mean of all elements.
    pub fn mean_all(&self) -> LoanResult<T> {
        if self.data.is_empty() {
            return Err(LoanError::EmptyTensor);
        }
        Ok(self.sum_all() / T::from_usize(self.numel()))
    }

    /// Fold every column of a matrix into one value, returning `[cols]`.
    fn fold_rows<F: Fn(T, T) -> T>(&self, init: T, f: F) -> LoanResult<Tensor<T>> {
        let (rows, cols) = self.shape.matrix()?;
        if rows == 0 {
            return Err(LoanError::EmptyTensor);
        }
        let mut result = vec![init; cols];
        if cols == 0 {
            return Ok(Tensor::from_slice(&result));
        }
        for row in self.data.chunks_exact(cols) {
            for (acc, &v) in result.iter_mut().zip(row) {
                *acc = f(*acc, v);
            }
        }
        Ok(Tensor::from_slice(&result))
    }

    /// Column sums of a matrix.
    pub fn sum_rows(&self) -> LoanResult<Tensor<T>> {
        self.fold_rows(T::ZERO, |a, b| a + b)
    }

    /// Column means of a matrix.
    pub fn mean_rows(&self) -> LoanResult<Tensor<T>> {
        let n = T::from_usize(self.nrows());
        Ok(self.sum_rows()?.apply(|s| s / n))
    }

    /// Column minima of a matrix.
    pub fn min_rows(&self) -> LoanResult<Tensor<T>> {
        self.fold_rows(T::INFINITY, |a, b| if b < a { b } else { a })
    }

    /// Column maxima of a matrix.
    pub fn max_rows(&self) -> LoanResult<Tensor<T>> {
        self.fold_rows(T::NEG_INFINITY, |a, b| if b > a { b } else { a })
    }

    /// Check if any element is NaN.
    pub fn has_nan(&self) -> bool {
        self.data.iter().any(|v| v.is_nan())
    }

    // ─── Products ───────────────────────────────────────────────────────────

    /// Dot product of two 1-D tensors.
    pub fn dot(&self, other: &Tensor<T>) -> LoanResult<T> {
        if self.ndim() != 1 || other.ndim() != 1 {
            return Err(LoanError::InvalidOperation(
                "dot requires two 1D tensors".to_string(),
            ));
        }
        if self.numel() != other.numel() {
            return Err(LoanError::DimensionMismatch(format!(
                "dot: {} vs {} elements",
                self.numel(),
                other.numel()
            )));
        }
        Ok(self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| a * b)
            .sum())
    }

    /// Matrix multiply of two 2D tensors.
    pub fn matmul(&self, other: &Tensor<T>) -> LoanResult<Tensor<T>> {
        let (m, k) = self.shape.matrix()?;
        let (k2, n) = other.shape.matrix()?;
        if k != k2 {
            return Err(LoanError::DimensionMismatch(format!(
                "matmul: inner dimensions must match, got {} and {}",
                k, k2
            )));
        }

        let mut data = vec![T::ZERO; m * n];
        for i in 0..m {
            for p in 0..k {
                let a = self.data[i * k + p];
                if a == T::ZERO {
                    continue;
                }
                for j in 0..n {
                    data[i * n + j] += a * other.data[p * n + j];
                }
            }
        }
        Tensor::new(data, vec![m, n])
    }
}

/// Left-pad `dims` with ones up to `ndim` axes.
fn aligned_dims(dims: &[usize], ndim: usize) -> Vec<usize> {
    let mut out = vec![1usize; ndim - dims.len()];
    out.extend_from_slice(dims);
    out
}

impl<T: Float> PartialEq for Tensor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.data == other.data
    }
}

// ─── Display ────────────────────────────────────────────────────────────────

impl<T: Float> fmt::Display for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ndim() == 1 {
            write!(f, "tensor([")?;
            for (i, v) in self.data.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                if i > 6 {
                    write!(f, "...")?;
                    break;
                }
                write!(f, "{:.4}", v)?;
            }
            return write!(f, "])");
        }
        if let Ok((rows, cols)) = self.shape.matrix() {
            writeln!(f, "tensor([")?;
            for i in 0..rows.min(8) {
                write!(f, "  [")?;
                for j in 0..cols.min(8) {
                    if j > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:.4}", self.data[i * cols + j])?;
                }
                if cols > 8 {
                    write!(f, ", ...")?;
                }
                writeln!(f, "],")?;
            }
            if rows > 8 {
                writeln!(f, "  ...")?;
            }
            return write!(f, "], shape={})", self.shape);
        }
        write!(f, "tensor(shape={}, numel={})", self.shape, self.numel())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample() -> Tensor<f64> {
        Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).unwrap()
    }

    #[test]
    fn test_creation() {
        let t: Tensor<f64> = Tensor::zeros(vec![3, 4]);
        assert_eq!(t.shape_vec(), vec![3, 4]);
        assert_eq!(t.numel(), 12);

        assert!(Tensor::<f64>::new(vec![1.0, 2.0], vec![3]).is_err());
    }

    #[test]
    fn test_from_vec2d() {
        let t = Tensor::from_vec2d(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(t, sample());
        assert_eq!(t.get(&[1, 2]).unwrap(), 6.0);
        assert!(Tensor::from_vec2d(&[vec![1.0], vec![1.0, 2.0]]).is_err());
        assert!(Tensor::<f64>::from_vec2d(&[]).is_err());
    }

    #[test]
    fn test_get_out_of_bounds() {
        let t = sample();
        assert!(matches!(
            t.get(&[2, 0]),
            Err(LoanError::IndexOutOfBounds { index: 2, axis: 0, size: 2 })
        ));
    }

    #[test]
    fn test_broadcasting_row_vector() {
        let a = sample();
        let b: Tensor<f64> = Tensor::new(vec![10.0, 20.0, 30.0], vec![1, 3]).unwrap();
        let c = a.add(&b).unwrap();
        assert_eq!(c.shape_vec(), vec![2, 3]);
        assert_eq!(c.data(), &[11.0, 22.0, 33.0, 14.0, 25.0, 36.0]);

        let d = a.sub(&Tensor::from_slice(&[1.0, 2.0, 3.0])).unwrap();
        assert_eq!(d.data(), &[0.0, 0.0, 0.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_broadcast_mismatch() {
        let a = sample();
        let b = Tensor::from_slice(&[1.0, 2.0]);
        assert!(a.div(&b).is_err());
    }

    #[test]
    fn test_matmul() {
        let a = sample();
        let b: Tensor<f64> =
            Tensor::new(vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0], vec![3, 2]).unwrap();
        let c = a.matmul(&b).unwrap();
        assert_eq!(c.shape_vec(), vec![2, 2]);
        assert_eq!(c.data(), &[58.0, 64.0, 139.0, 154.0]);
        assert!(a.matmul(&a).is_err());
    }

    #[test]
    fn test_transpose() {
        let t = sample().t().unwrap();
        assert_eq!(t.shape_vec(), vec![3, 2]);
        assert_eq!(t.get(&[1, 0]).unwrap(), 2.0);
        assert_eq!(t.get(&[2, 1]).unwrap(), 6.0);
    }

    #[test]
    fn test_column_reductions() {
        let a = sample();
        assert_eq!(a.sum_rows().unwrap().data(), &[5.0, 7.0, 9.0]);
        assert_eq!(a.min_rows().unwrap().data(), &[1.0, 2.0, 3.0]);
        assert_eq!(a.max_rows().unwrap().data(), &[4.0, 5.0, 6.0]);
        let mean = a.mean_rows().unwrap();
        assert_abs_diff_eq!(mean.data()[1], 3.5, epsilon = 1e-12);
        assert!(Tensor::<f64>::zeros(vec![0, 3]).min_rows().is_err());
    }

    #[test]
    fn test_select_rows_and_cols() {
        let a = sample();
        let r = a.select_rows(&[1, 0, 1]).unwrap();
        assert_eq!(r.shape_vec(), vec![3, 3]);
        assert_eq!(r.data()[..3], [4.0, 5.0, 6.0]);

        let c = a.select_cols(&[2, 0]).unwrap();
        assert_eq!(c.data(), &[3.0, 1.0, 6.0, 4.0]);

        let v = Tensor::from_slice(&[0.0, 1.0, 1.0]);
        assert_eq!(v.select_rows(&[2, 0]).unwrap().data(), &[1.0, 0.0]);

        assert!(a.select_rows(&[5]).is_err());
        assert!(a.select_cols(&[3]).is_err());
    }

    #[test]
    fn test_dot_and_row_slice() {
        let a: Tensor<f64> = Tensor::from_slice(&[1.0, 2.0, 3.0]);
        let b: Tensor<f64> = Tensor::from_slice(&[4.0, 5.0, 6.0]);
        assert_eq!(a.dot(&b).unwrap(), 32.0);
        assert_eq!(sample().row_slice(1).unwrap(), &[4.0, 5.0, 6.0]);
    }
}
