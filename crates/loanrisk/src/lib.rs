//! # LoanRisk
//!
//! Loan-default modeling over tabular SBA-style loan records.
//!
//! ## Modules
//!
//! - **core**: Tensor engine and the `LoanError` type
//! - **linalg**: Symmetric eigendecomposition, pseudo-inverse, least squares
//! - **data**: `Table`, `FeatureMatrix`, `TargetVector`
//! - **preprocessing**: Stratified split, MinMaxScaler, indicator encoding
//! - **linear**: Ordinary least squares
//! - **tree**: Decision tree (CART, Gini) and random forest classifiers
//! - **neighbors**: K-nearest-neighbors classifier
//! - **metrics**: Accuracy, confusion matrix, classification report
//! - **selection**: F-test SelectKBest and recursive feature elimination
//! - **io**: CSV tables and JSON reports/config
//! - **datasets**: Synthetic loan generator
//! - **pipeline**: The end-to-end loan-default workflow

/// Core tensor engine.
pub use loanrisk_core as core;

/// Linear algebra operations.
pub use loanrisk_linalg as linalg;

/// Tabular data and feature matrices.
pub use loanrisk_data as data;

/// Data preprocessing.
pub use loanrisk_preprocessing as preprocessing;

/// Linear models.
pub use loanrisk_linear as linear;

/// Tree-based models.
pub use loanrisk_tree as tree;

/// Nearest neighbors.
pub use loanrisk_neighbors as neighbors;

/// Evaluation metrics.
pub use loanrisk_metrics as metrics;

/// Feature selection.
pub use loanrisk_selection as selection;

/// I/O utilities.
pub use loanrisk_io as io;

/// Built-in datasets.
pub use loanrisk_datasets as datasets;

/// Pipeline API.
pub use loanrisk_pipeline as pipeline;
