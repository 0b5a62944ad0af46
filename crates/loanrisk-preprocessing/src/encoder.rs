use std::collections::BTreeSet;

use loanrisk_core::LoanResult;
use loanrisk_data::{Column, Table};
use serde::{Deserialize, Serialize};

/// Closed set of values that switch an indicator on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Membership {
    /// Integer codes. Numeric cells must be whole numbers; text cells must
    /// parse as an integer exactly.
    Codes(BTreeSet<i64>),
    /// Exact text labels.
    Labels(BTreeSet<String>),
}

impl Membership {
    pub fn codes(codes: &[i64]) -> Self {
        Membership::Codes(codes.iter().copied().collect())
    }

    pub fn labels(labels: &[&str]) -> Self {
        Membership::Labels(labels.iter().map(|s| s.to_string()).collect())
    }

    fn contains_number(&self, v: f64) -> bool {
        if !v.is_finite() || v.fract() != 0.0 {
            return false;
        }
        match self {
            Membership::Codes(set) => set.contains(&(v as i64)),
            Membership::Labels(set) => set.contains(&format!("{}", v as i64)),
        }
    }

    fn contains_text(&self, s: &str) -> bool {
        match self {
            Membership::Codes(set) => s.parse::<i64>().map(|c| set.contains(&c)).unwrap_or(false),
            Membership::Labels(set) => set.contains(s),
        }
    }
}

/// Derives a 0/1 column from membership of a source column in a fixed set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorEncoder {
    pub source: String,
    pub target: String,
    pub members: Membership,
}

impl IndicatorEncoder {
    pub fn new(source: impl Into<String>, target: impl Into<String>, members: Membership) -> Self {
        IndicatorEncoder {
            source: source.into(),
            target: target.into(),
            members,
        }
    }

    /// Indicator values for a column. Missing cells map to 0.
    pub fn encode(&self, column: &Column) -> Vec<f64> {
        let flag = |hit: bool| if hit { 1.0 } else { 0.0 };
        match column {
            Column::Numeric(v) => v.iter().map(|&x| flag(self.members.contains_number(x))).collect(),
            Column::Text(v) => v.iter().map(|s| flag(self.members.contains_text(s))).collect(),
        }
    }

    /// Add (or replace) the indicator column on `table`. `subset` names the
    /// table in errors.
    pub fn apply(&self, table: &mut Table, subset: &str) -> LoanResult<()> {
        let values = self.encode(table.require(&self.source, subset)?);
        table.insert_column(&self.target, Column::Numeric(values))
    }
}
