//! The loan-default modeling workflow.
//!
//! Stages run in a fixed order over one dataset:
//! split → engineer → project → scale → select → fit → predict → report.

pub mod config;
pub mod split;
pub mod features;
pub mod classifier;
pub mod pipeline;

pub use config::PipelineConfig;
pub use split::{split_dataset, Split, Subset};
pub use features::{engineer_features, project};
pub use classifier::{train, ClassifierFamily, ClassifierModel, Estimator, Evaluation};
pub use pipeline::{FeatureSelections, LoanDefaultPipeline, PipelineOutcome, PreparedData};
