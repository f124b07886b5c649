//! In-memory rental table.
//!
//! Rentals arrive as a CSV export with arbitrary caller-defined columns.
//! The pipeline only reads `latitude`/`longitude` and appends annotation
//! columns; everything else passes through untouched, in its original
//! order. Cells are kept as strings, and an empty cell is a null.

use std::io::{Read, Write};
use std::path::Path;

use crate::ProximityError;

/// Column holding the rental latitude (WGS84).
pub const LATITUDE_COLUMN: &str = "latitude";
/// Column holding the rental longitude (WGS84).
pub const LONGITUDE_COLUMN: &str = "longitude";

/// A header row plus string cells, one row per rental listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RentalTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RentalTable {
    /// Builds a table from a header and rows.
    ///
    /// # Errors
    ///
    /// Returns [`ProximityError::MalformedTable`] if any row's width
    /// differs from the header's.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, ProximityError> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(ProximityError::MalformedTable {
                message: format!(
                    "row {idx} has {} cells but the header has {} columns",
                    row.len(),
                    columns.len()
                ),
            });
        }

        Ok(Self { columns, rows })
    }

    /// Reads a table from CSV with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`ProximityError::Csv`] on malformed CSV (including rows
    /// with a different number of fields than the header).
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, ProximityError> {
        let mut reader = csv::ReaderBuilder::new().from_reader(reader);

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_owned())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(|v| v.trim().to_owned()).collect());
        }

        Ok(Self { columns, rows })
    }

    /// Reads a table from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`ProximityError`] if the file cannot be opened or parsed.
    pub fn from_csv_path(path: &Path) -> Result<Self, ProximityError> {
        let file = std::fs::File::open(path)?;
        let table = Self::from_csv_reader(file)?;
        log::info!(
            "Loaded {} rentals ({} columns) from {}",
            table.len(),
            table.columns.len(),
            path.display()
        );
        Ok(table)
    }

    /// Writes the table as CSV, header first.
    ///
    /// # Errors
    ///
    /// Returns [`ProximityError`] if writing fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ProximityError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes the table to a CSV file, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`ProximityError`] if the file cannot be written.
    pub fn write_csv_path(&self, path: &Path) -> Result<(), ProximityError> {
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns a cell by row and column index, or `None` for a null cell.
    #[must_use]
    pub fn cell_at(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Returns a cell by row and column name, or `None` for a null cell
    /// or unknown column.
    #[must_use]
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        self.column_index(column)
            .and_then(|idx| self.cell_at(row, idx))
    }

    /// Overwrites a single cell. `None` stores a null.
    ///
    /// Out-of-range positions are ignored.
    pub fn set_cell(&mut self, row: usize, column: usize, value: Option<String>) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(column)) {
            *cell = value.unwrap_or_default();
        }
    }

    /// Replaces the named column's values, appending the column at the
    /// end if it does not exist yet. Returns the column's index.
    ///
    /// # Errors
    ///
    /// Returns [`ProximityError::MalformedTable`] if `values` does not
    /// have exactly one entry per row.
    pub fn set_column(
        &mut self,
        name: &str,
        values: Vec<String>,
    ) -> Result<usize, ProximityError> {
        if values.len() != self.rows.len() {
            return Err(ProximityError::MalformedTable {
                message: format!(
                    "column '{name}' has {} values but the table has {} rows",
                    values.len(),
                    self.rows.len()
                ),
            });
        }

        let idx = if let Some(idx) = self.column_index(name) {
            for (row, value) in self.rows.iter_mut().zip(values) {
                row[idx] = value;
            }
            idx
        } else {
            self.columns.push(name.to_owned());
            for (row, value) in self.rows.iter_mut().zip(values) {
                row.push(value);
            }
            self.columns.len() - 1
        };

        Ok(idx)
    }

    /// Sets every cell of the named column to null, appending it if
    /// needed. Returns the column's index.
    pub fn reset_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            for row in &mut self.rows {
                row[idx].clear();
            }
            idx
        } else {
            self.columns.push(name.to_owned());
            for row in &mut self.rows {
                row.push(String::new());
            }
            self.columns.len() - 1
        }
    }
}
