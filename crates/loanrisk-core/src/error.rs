use thiserror::Error;

/// Error type shared by every LoanRisk crate.
///
/// The first five variants are the pipeline's contract errors; the rest come
/// from the tensor engine and the I/O layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LoanError {
    /// Malformed or insufficiently populated source data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing column '{column}' in {subset} data")]
    MissingColumn { column: String, subset: String },

    /// A fitted transform was applied to a differently shaped matrix.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A model was evaluated against features it was not trained on.
    #[error("Shape mismatch: model trained on {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<String>,
        got: Vec<String>,
    },

    #[error("{0} has not been fitted")]
    NotFitted(String),

    #[error("Index out of bounds: index {index} for axis {axis} with size {size}")]
    IndexOutOfBounds {
        index: usize,
        axis: usize,
        size: usize,
    },

    #[error("Invalid axis: {axis} for tensor with {ndim} dimensions")]
    InvalidAxis { axis: usize, ndim: usize },

    #[error("Cannot broadcast shapes {a:?} and {b:?}")]
    BroadcastError { a: Vec<usize>, b: Vec<usize> },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Singular matrix: cannot invert or decompose")]
    SingularMatrix,

    #[error("Empty tensor")]
    EmptyTensor,

    #[error("I/O error: {0}")]
    Io(String),
}

impl LoanError {
    pub fn missing_column(column: impl Into<String>, subset: impl Into<String>) -> Self {
        LoanError::MissingColumn {
            column: column.into(),
            subset: subset.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        LoanError::InvalidInput(msg.into())
    }
}

impl From<std::io::Error> for LoanError {
    fn from(err: std::io::Error) -> Self {
        LoanError::Io(err.to_string())
    }
}

pub type LoanResult<T> = Result<T, LoanError>;
