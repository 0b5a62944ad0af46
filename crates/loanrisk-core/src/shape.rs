use crate::error::{LoanError, LoanResult};
use serde::{Deserialize, Serialize};

/// Dimensions of a tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Size along a specific axis.
    pub fn dim(&self, axis: usize) -> LoanResult<usize> {
        self.dims.get(axis).copied().ok_or(LoanError::InvalidAxis {
            axis,
            ndim: self.ndim(),
        })
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.dims.clone()
    }

    /// `(rows, cols)` of a matrix.
    pub fn matrix(&self) -> LoanResult<(usize, usize)> {
        if self.ndim() != 2 {
            return Err(LoanError::InvalidOperation(format!(
                "expected a 2D tensor, got shape {}",
                self
            )));
        }
        Ok((self.dims[0], self.dims[1]))
    }

    /// Shape of `a op b` when a row vector `[1, p]` or `[p]` is broadcast
    /// over the rows of an `[n, p]` matrix.
    pub fn broadcast_shape(a: &Shape, b: &Shape) -> LoanResult<Shape> {
        let max_ndim = a.ndim().max(b.ndim());
        let mut result = vec![0usize; max_ndim];

        for i in 0..max_ndim {
            let da = if i < a.ndim() { a.dims[a.ndim() - 1 - i] } else { 1 };
            let db = if i < b.ndim() { b.dims[b.ndim() - 1 - i] } else { 1 };

            result[max_ndim - 1 - i] = match (da, db) {
                _ if da == db => da,
                (1, _) => db,
                (_, 1) => da,
                _ => {
                    return Err(LoanError::BroadcastError {
                        a: a.to_vec(),
                        b: b.to_vec(),
                    })
                }
            };
        }

        Ok(Shape::new(result))
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, ")")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::new(dims)
    }
}
