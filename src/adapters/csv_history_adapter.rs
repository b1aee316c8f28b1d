//! Append-only recommendation history in a CSV file.

use crate::domain::error::EngineError;
use crate::ports::history_port::{HistoryPort, HistoryRecord};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;

pub struct CsvHistoryAdapter {
    path: PathBuf,
}

impl CsvHistoryAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn history_error(&self, e: impl std::fmt::Display) -> EngineError {
        EngineError::History {
            reason: format!("{}: {}", self.path.display(), e),
        }
    }
}

impl HistoryPort for CsvHistoryAdapter {
    fn append(&self, records: &[HistoryRecord]) -> Result<(), EngineError> {
        if records.is_empty() {
            return Ok(());
        }
        let needs_header = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.history_error(e))?;

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        for record in records {
            wtr.serialize(record).map_err(|e| self.history_error(e))?;
        }
        wtr.flush().map_err(|e| self.history_error(e))?;

        tracing::info!(path = %self.path.display(), rows = records.len(), "appended recommendation history");
        Ok(())
    }

    fn load(&self) -> Result<Vec<HistoryRecord>, EngineError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::Reader::from_path(&self.path).map_err(|e| self.history_error(e))?;
        rdr.deserialize()
            .map(|row| row.map_err(|e| self.history_error(e)))
            .collect()
    }
}
