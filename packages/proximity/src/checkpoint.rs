//! Durable snapshots of a partially annotated rental table.
//!
//! Each snapshot replaces the previous one wholesale. The file is
//! written next to its destination and renamed over it; an interrupted
//! write leaves the previous checkpoint intact.

use std::path::{Path, PathBuf};

use crate::table::RentalTable;
use crate::ProximityError;

/// Persists the whole table each time it is called.
pub trait CheckpointWriter: Send {
    /// # Errors
    ///
    /// Returns [`ProximityError`] if the snapshot cannot be persisted.
    fn write(&mut self, table: &RentalTable) -> Result<(), ProximityError>;
}

/// Writes checkpoints as CSV to a fixed path.
#[derive(Debug, Clone)]
pub struct CsvCheckpoint {
    path: PathBuf,
}

impl CsvCheckpoint {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/rental_with_<feature>.csv`
    #[must_use]
    pub fn for_feature(dir: &Path, feature: &str) -> Self {
        Self::new(dir.join(format!("rental_with_{feature}.csv")))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointWriter for CsvCheckpoint {
    fn write(&mut self, table: &RentalTable) -> Result<(), ProximityError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let staging = self.path.with_extension("csv.partial");
        table.write_csv_path(&staging)?;
        std::fs::rename(&staging, &self.path)?;

        log::debug!(
            "Checkpointed {} rows to {}",
            table.len(),
            self.path.display()
        );
        Ok(())
    }
}
