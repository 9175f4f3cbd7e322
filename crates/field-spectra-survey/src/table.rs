//! Whitespace-separated configuration tables.
//!
//! Positions, masks and ignore lists are plain text files with one header
//! line and whitespace-separated columns, one row per measurement.

use std::fs;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("table has no column {name:?}")]
    MissingColumn { name: String },
    #[error("table has no row {row}, only {len}")]
    RowOutOfRange { row: usize, len: usize },
    #[error("row {row} has {got} fields, the header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        got: usize,
    },
    #[error("column {column:?} row {row}: cannot parse {value:?} as a number")]
    Parse {
        column: String,
        row: usize,
        value: String,
    },
}

/// Plain text table with named columns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    pub fn parse(text: &str) -> Result<Self, TableError> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());
        let columns: Vec<String> = match lines.next() {
            Some(header) => header.split_whitespace().map(str::to_owned).collect(),
            None => Vec::new(),
        };
        let mut rows = Vec::new();
        for (row, line) in lines.enumerate() {
            let fields: Vec<String> = line.split_whitespace().map(str::to_owned).collect();
            if fields.len() != columns.len() {
                return Err(TableError::RaggedRow {
                    row,
                    expected: columns.len(),
                    got: fields.len(),
                });
            }
            rows.push(fields);
        }
        Ok(Self { columns, rows })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TableError> {
        Self::parse(&fs::read_to_string(path)?)
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    fn column_index(&self, name: &str) -> Result<usize, TableError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| TableError::MissingColumn {
                name: name.to_owned(),
            })
    }

    pub fn get(&self, column: &str, row: usize) -> Result<&str, TableError> {
        let col = self.column_index(column)?;
        let fields = self.rows.get(row).ok_or(TableError::RowOutOfRange {
            row,
            len: self.rows.len(),
        })?;
        Ok(&fields[col])
    }

    pub fn get_f64(&self, column: &str, row: usize) -> Result<f64, TableError> {
        let raw = self.get(column, row)?;
        raw.parse().map_err(|_| TableError::Parse {
            column: column.to_owned(),
            row,
            value: raw.to_owned(),
        })
    }

    pub fn get_usize(&self, column: &str, row: usize) -> Result<usize, TableError> {
        let raw = self.get(column, row)?;
        // Integer columns may be written as floats by spreadsheet exports.
        raw.parse::<usize>()
            .or_else(|_| raw.parse::<f64>().map(|v| v as usize))
            .map_err(|_| TableError::Parse {
                column: column.to_owned(),
                row,
                value: raw.to_owned(),
            })
    }

    /// All values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Result<Vec<&str>, TableError> {
        let col = self.column_index(name)?;
        Ok(self.rows.iter().map(|fields| fields[col].as_str()).collect())
    }

    /// Index of the first row whose `column` value equals `value`.
    pub fn find_row(&self, column: &str, value: &str) -> Result<Option<usize>, TableError> {
        let col = self.column_index(column)?;
        Ok(self.rows.iter().position(|fields| fields[col] == value))
    }
}
