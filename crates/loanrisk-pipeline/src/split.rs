use std::fmt;

use loanrisk_core::{LoanError, LoanResult};
use loanrisk_data::{Column, Table};
use loanrisk_preprocessing::stratified_split;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PipelineConfig;

/// The three partitions of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subset {
    Train,
    Validate,
    Test,
}

impl Subset {
    pub const ALL: [Subset; 3] = [Subset::Train, Subset::Validate, Subset::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subset::Train => "train",
            Subset::Validate => "validate",
            Subset::Test => "test",
        }
    }
}

impl fmt::Display for Subset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split<T> {
    pub train: T,
    pub validate: T,
    pub test: T,
}

impl<T> Split<T> {
    pub fn get(&self, subset: Subset) -> &T {
        match subset {
            Subset::Train => &self.train,
            Subset::Validate => &self.validate,
            Subset::Test => &self.test,
        }
    }

    fn get_mut(&mut self, subset: Subset) -> &mut T {
        match subset {
            Subset::Train => &mut self.train,
            Subset::Validate => &mut self.validate,
            Subset::Test => &mut self.test,
        }
    }

    /// Apply one fallible function to every subset, train first.
    pub fn try_map<U, F>(&self, mut f: F) -> LoanResult<Split<U>>
    where
        F: FnMut(Subset, &T) -> LoanResult<U>,
    {
        Ok(Split {
            train: f(Subset::Train, &self.train)?,
            validate: f(Subset::Validate, &self.validate)?,
            test: f(Subset::Test, &self.test)?,
        })
    }

    pub fn for_each_mut<F>(&mut self, mut f: F) -> LoanResult<()>
    where
        F: FnMut(Subset, &mut T) -> LoanResult<()>,
    {
        for subset in Subset::ALL {
            f(subset, self.get_mut(subset))?;
        }
        Ok(())
    }
}

/// Checked 0/1 values of the target column.
fn binary_target(table: &Table, target: &str) -> LoanResult<Vec<f64>> {
    let column = table.column(target).ok_or_else(|| {
        LoanError::invalid_input(format!("dataset has no target column '{}'", target))
    })?;
    let values = match column {
        Column::Numeric(v) => v.clone(),
        Column::Text(_) => {
            return Err(LoanError::invalid_input(format!(
                "target '{}' must be numeric",
                target
            )))
        }
    };
    if let Some(pos) = values.iter().position(|&v| v != 0.0 && v != 1.0) {
        return Err(LoanError::invalid_input(format!(
            "target '{}' must be 0 or 1; row {} holds {}",
            target, table.index()[pos], values[pos]
        )));
    }
    for class in [0.0, 1.0] {
        let members = values.iter().filter(|&&v| v == class).count();
        if members < 3 {
            return Err(LoanError::invalid_input(format!(
                "class {} of '{}' has {} member(s); at least 3 are needed for three partitions",
                class, target, members
            )));
        }
    }
    Ok(values)
}

/// Partition a dataset into stratified train/validate/test subsets.
///
/// Test is held out first, then validate is held out of the remainder, each
/// with a stratified shuffle split seeded by `config.seed`. Row ids are kept.
pub fn split_dataset(table: &Table, config: &PipelineConfig) -> LoanResult<Split<Table>> {
    config.validate()?;
    let labels = binary_target(table, &config.target)?;

    let (rest_rows, test_rows) = stratified_split(&labels, config.proportions.test, config.seed)?;
    let rest = table.take(&rest_rows)?;
    let test = table.take(&test_rows)?;

    let rest_labels: Vec<f64> = rest_rows.iter().map(|&i| labels[i]).collect();
    let (train_rows, validate_rows) = stratified_split(
        &rest_labels,
        config.proportions.validate_ratio(),
        config.seed,
    )?;

    let split = Split {
        train: rest.take(&train_rows)?,
        validate: rest.take(&validate_rows)?,
        test,
    };
    info!(
        train = split.train.nrows(),
        validate = split.validate.nrows(),
        test = split.test.nrows(),
        "split dataset"
    );
    Ok(split)
}
