use std::io::{Read, Write};
use std::path::Path;

use loanrisk_core::{LoanError, LoanResult};
use loanrisk_data::{Column, Table};
use tracing::info;

fn csv_error(err: csv::Error) -> LoanError {
    LoanError::Io(err.to_string())
}

/// Read a headered CSV into a `Table`.
///
/// A column is numeric when every non-empty field parses as `f64`; empty
/// fields become NaN there. Any other column is text, with empty fields kept
/// as empty strings.
pub fn read_table_from<R: Read>(reader: R) -> LoanResult<Table> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut fields: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for result in rdr.records() {
        let record = result.map_err(csv_error)?;
        for (col, field) in fields.iter_mut().zip(record.iter()) {
            col.push(field.trim().to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(fields)
        .map(|(name, raw)| {
            let numeric: Option<Vec<f64>> = raw
                .iter()
                .map(|s| if s.is_empty() { Some(f64::NAN) } else { s.parse().ok() })
                .collect();
            let column = match numeric {
                Some(values) => Column::Numeric(values),
                None => Column::Text(raw),
            };
            (name, column)
        })
        .collect();

    Table::from_columns(columns)
}

pub fn read_table(path: impl AsRef<Path>) -> LoanResult<Table> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let table = read_table_from(file)?;
    info!(path = %path.display(), rows = table.nrows(), columns = table.ncols(), "loaded dataset");
    Ok(table)
}

/// Write a `Table` as CSV. Missing cells are written as empty fields.
pub fn write_table_to<W: Write>(table: &Table, writer: W) -> LoanResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(table.names()).map_err(csv_error)?;

    let columns: Vec<&Column> = table
        .names()
        .iter()
        .filter_map(|n| table.column(n))
        .collect();
    for i in 0..table.nrows() {
        let row: Vec<String> = columns
            .iter()
            .map(|c| match c {
                Column::Numeric(v) if v[i].is_nan() => String::new(),
                Column::Numeric(v) => format!("{}", v[i]),
                Column::Text(v) => v[i].clone(),
            })
            .collect();
        wtr.write_record(&row).map_err(csv_error)?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_table(table: &Table, path: impl AsRef<Path>) -> LoanResult<()> {
    let file = std::fs::File::create(path.as_ref())?;
    write_table_to(table, file)
}
