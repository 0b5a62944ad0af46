use std::collections::BTreeMap;

use loanrisk_core::{LoanError, LoanResult};
use serde::{Deserialize, Serialize};

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        if v.is_nan() { Value::Missing } else { Value::Number(v) }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        if v.is_empty() { Value::Missing } else { Value::Text(v.to_string()) }
    }
}

/// One row of a dataset, keyed by column name.
pub type Record = BTreeMap<String, Value>;

/// Column storage. Numeric columns mark missing cells with NaN, text columns
/// with the empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Column {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<Value> {
        match self {
            Column::Numeric(v) => v.get(i).map(|&x| Value::from(x)),
            Column::Text(v) => v.get(i).map(|s| Value::from(s.as_str())),
        }
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Column::Numeric(v) => Some(v),
            Column::Text(_) => None,
        }
    }

    pub fn missing_count(&self) -> usize {
        match self {
            Column::Numeric(v) => v.iter().filter(|x| x.is_nan()).count(),
            Column::Text(v) => v.iter().filter(|s| s.is_empty()).count(),
        }
    }

    fn take(&self, rows: &[usize]) -> Column {
        match self {
            Column::Numeric(v) => Column::Numeric(rows.iter().map(|&i| v[i]).collect()),
            Column::Text(v) => Column::Text(rows.iter().map(|&i| v[i].clone()).collect()),
        }
    }
}

/// Column-oriented table with a stable row index.
///
/// The index holds each row's identity in the dataset it was loaded from, so
/// partitions of a table can be compared and re-joined by row id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    index: Vec<usize>,
    names: Vec<String>,
    columns: Vec<Column>,
}

impl Table {
    /// Build a table from named columns. Rows are numbered `0..n`.
    pub fn from_columns(columns: Vec<(String, Column)>) -> LoanResult<Self> {
        let nrows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        let mut table = Table {
            index: (0..nrows).collect(),
            names: Vec::with_capacity(columns.len()),
            columns: Vec::with_capacity(columns.len()),
        };
        for (name, column) in columns {
            if table.position(&name).is_some() {
                return Err(LoanError::invalid_input(format!("duplicate column '{}'", name)));
            }
            table.push_column(name, column)?;
        }
        Ok(table)
    }

    /// Build a table from records. Column order follows the first record in
    /// which each key appears; absent keys become missing cells.
    pub fn from_records(records: &[Record]) -> LoanResult<Self> {
        let mut names: Vec<&String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !names.contains(&key) {
                    names.push(key);
                }
            }
        }

        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let cells: Vec<&Value> = records
                .iter()
                .map(|r| r.get(name).unwrap_or(&Value::Missing))
                .collect();
            let has_text = cells.iter().any(|v| matches!(v, Value::Text(_)));
            let has_number = cells.iter().any(|v| matches!(v, Value::Number(_)));
            let column = match (has_text, has_number) {
                (true, true) => {
                    return Err(LoanError::invalid_input(format!(
                        "column '{}' mixes numbers and text",
                        name
                    )))
                }
                (true, false) => Column::Text(
                    cells
                        .iter()
                        .map(|v| match v {
                            Value::Text(s) => s.clone(),
                            _ => String::new(),
                        })
                        .collect(),
                ),
                _ => Column::Numeric(
                    cells
                        .iter()
                        .map(|v| match v {
                            Value::Number(x) => *x,
                            _ => f64::NAN,
                        })
                        .collect(),
                ),
            };
            columns.push((name.clone(), column));
        }

        let mut table = Table::from_columns(columns)?;
        if table.columns.is_empty() {
            table.index = (0..records.len()).collect();
        }
        Ok(table)
    }

    pub fn nrows(&self) -> usize {
        self.index.len()
    }

    pub fn ncols(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Row identities, in row order.
    pub fn index(&self) -> &[usize] {
        &self.index
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.position(name).map(|i| &self.columns[i])
    }

    /// Look up a column, failing with `MissingColumn` tagged by `subset`.
    pub fn require(&self, name: &str, subset: &str) -> LoanResult<&Column> {
        self.column(name)
            .ok_or_else(|| LoanError::missing_column(name, subset))
    }

    fn push_column(&mut self, name: String, column: Column) -> LoanResult<()> {
        if column.len() != self.nrows() {
            return Err(LoanError::DimensionMismatch(format!(
                "column '{}' has {} rows, table has {}",
                name,
                column.len(),
                self.nrows()
            )));
        }
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    /// Add a column, replacing any existing column of the same name in place.
    pub fn insert_column(&mut self, name: &str, column: Column) -> LoanResult<()> {
        match self.position(name) {
            Some(i) => {
                if column.len() != self.nrows() {
                    return Err(LoanError::DimensionMismatch(format!(
                        "column '{}' has {} rows, table has {}",
                        name,
                        column.len(),
                        self.nrows()
                    )));
                }
                self.columns[i] = column;
                Ok(())
            }
            None => self.push_column(name.to_string(), column),
        }
    }

    /// New table holding the rows at the given positions, in that order.
    /// Row identities travel with their rows.
    pub fn take(&self, rows: &[usize]) -> LoanResult<Table> {
        if let Some(&bad) = rows.iter().find(|&&r| r >= self.nrows()) {
            return Err(LoanError::IndexOutOfBounds {
                index: bad,
                axis: 0,
                size: self.nrows(),
            });
        }
        Ok(Table {
            index: rows.iter().map(|&r| self.index[r]).collect(),
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
        })
    }

    /// Materialize row `i` as a record.
    pub fn record(&self, i: usize) -> Option<Record> {
        if i >= self.nrows() {
            return None;
        }
        Some(
            self.names
                .iter()
                .zip(&self.columns)
                .filter_map(|(n, c)| c.get(i).map(|v| (n.clone(), v)))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loans() -> Table {
        Table::from_columns(vec![
            ("state".into(), Column::Text(vec!["FL".into(), "WY".into(), "".into()])),
            ("term".into(), Column::Numeric(vec![84.0, 120.0, f64::NAN])),
        ])
        .unwrap()
    }

    #[test]
    fn test_from_columns() {
        let t = loans();
        assert_eq!(t.nrows(), 3);
        assert_eq!(t.ncols(), 2);
        assert_eq!(t.index(), &[0, 1, 2]);
        assert_eq!(t.column("term").unwrap().missing_count(), 1);
        assert_eq!(t.column("state").unwrap().missing_count(), 1);
    }

    #[test]
    fn test_rejects_ragged_and_duplicate_columns() {
        let ragged = Table::from_columns(vec![
            ("a".into(), Column::Numeric(vec![1.0])),
            ("b".into(), Column::Numeric(vec![1.0, 2.0])),
        ]);
        assert!(matches!(ragged, Err(LoanError::DimensionMismatch(_))));

        let dup = Table::from_columns(vec![
            ("a".into(), Column::Numeric(vec![1.0])),
            ("a".into(), Column::Numeric(vec![2.0])),
        ]);
        assert!(matches!(dup, Err(LoanError::InvalidInput(_))));
    }

    #[test]
    fn test_from_records() {
        let mut r1 = Record::new();
        r1.insert("naics".into(), Value::Number(722110.0));
        r1.insert("state".into(), Value::Text("GA".into()));
        let mut r2 = Record::new();
        r2.insert("naics".into(), Value::Number(111110.0));

        let t = Table::from_records(&[r1.clone(), r2]).unwrap();
        assert_eq!(t.nrows(), 2);
        assert_eq!(t.column("naics").unwrap().as_numeric().unwrap(), &[722110.0, 111110.0]);
        assert_eq!(t.column("state").unwrap().get(1), Some(Value::Missing));
        assert_eq!(t.record(0).unwrap(), r1);
    }

    #[test]
    fn test_from_records_mixed_types() {
        let mut r1 = Record::new();
        r1.insert("naics".into(), Value::Number(1.0));
        let mut r2 = Record::new();
        r2.insert("naics".into(), Value::Text("x".into()));
        assert!(Table::from_records(&[r1, r2]).is_err());
    }

    #[test]
    fn test_take_keeps_row_identity() {
        let t = loans();
        let sub = t.take(&[2, 0]).unwrap();
        assert_eq!(sub.index(), &[2, 0]);
        assert_eq!(sub.column("state").unwrap().get(1), Some(Value::Text("FL".into())));

        let again = sub.take(&[1]).unwrap();
        assert_eq!(again.index(), &[0]);
        assert!(t.take(&[3]).is_err());
    }

    #[test]
    fn test_insert_column_replaces() {
        let mut t = loans();
        t.insert_column("flag", Column::Numeric(vec![1.0, 0.0, 0.0])).unwrap();
        assert_eq!(t.ncols(), 3);
        t.insert_column("flag", Column::Numeric(vec![0.0, 0.0, 1.0])).unwrap();
        assert_eq!(t.ncols(), 3);
        assert_eq!(t.column("flag").unwrap().as_numeric().unwrap(), &[0.0, 0.0, 1.0]);
        assert!(t.insert_column("flag", Column::Numeric(vec![1.0])).is_err());
    }

    #[test]
    fn test_require_reports_subset() {
        let t = loans();
        let err = t.require("is_default", "validate").unwrap_err();
        assert_eq!(
            err,
            LoanError::MissingColumn {
                column: "is_default".into(),
                subset: "validate".into()
            }
        );
    }
}
