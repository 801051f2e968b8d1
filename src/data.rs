//! Loading price series from CSV files
//!
//! The expected format is a header row followed by one observation per row,
//! oldest first:
//!
//! ```text
//! date,open,high,low,close,volume
//! 2023-01-03,130.28,130.90,124.17,125.07,112117500
//! ```
//!
//! Only the named column is read; other columns may hold anything.

use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::{EngineError, Result};

/// Read one numeric column from CSV text
pub fn read_column<R: Read>(reader: R, column: &str) -> Result<Vec<f64>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = rdr.headers()?.clone();
    let index = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(column))
        .ok_or_else(|| {
            EngineError::Data(format!(
                "Column '{}' not found, available: {}",
                column,
                headers.iter().collect::<Vec<_>>().join(", ")
            ))
        })?;

    let mut values = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let field = record.get(index).unwrap_or_default();
        let value = field.parse::<f64>().map_err(|e| {
            EngineError::Data(format!(
                "Invalid {} value '{}' at line {}: {}",
                column,
                field,
                i + 2,
                e
            ))
        })?;
        values.push(value);
    }

    if values.is_empty() {
        return Err(EngineError::Data(format!("No rows in column '{}'", column)));
    }
    Ok(values)
}

/// Read one numeric column from a CSV file
pub fn load_prices<P: AsRef<Path>>(path: P, column: &str) -> Result<Vec<f64>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|e| EngineError::Data(format!("Failed to open {}: {}", path.display(), e)))?;
    let values = read_column(file, column)?;
    debug!(path = %path.display(), column, rows = values.len(), "loaded prices");
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_named_column() {
        let text = "date,Close\n2024-01-02, 10.5\n2024-01-03,11\n";
        assert_eq!(read_column(text.as_bytes(), "close").unwrap(), vec![10.5, 11.0]);
    }

    #[test]
    fn test_bad_rows_are_reported() {
        let missing = read_column("date,open\n2024-01-02,1\n".as_bytes(), "close");
        assert!(matches!(missing, Err(EngineError::Data(_))));

        let garbage = read_column("close\nabc\n".as_bytes(), "close");
        assert!(matches!(garbage, Err(EngineError::Data(_))));

        let empty = read_column("close\n".as_bytes(), "close");
        assert!(matches!(empty, Err(EngineError::Data(_))));
    }
}
