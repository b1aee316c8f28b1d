//! CSV file price adapter.
//!
//! One file per instrument, `{code}.csv`, with a
//! `date,open,high,low,close,volume` header. Files are read once and kept
//! in memory; every query is then cut at the requested date.

use crate::domain::error::EngineError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

pub struct CsvAdapter {
    base_path: PathBuf,
    loaded: Mutex<HashMap<String, Arc<Vec<OhlcvBar>>>>,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            loaded: Mutex::new(HashMap::new()),
        }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{code}.csv"))
    }

    fn read_bars(&self, code: &str) -> Result<Vec<OhlcvBar>, EngineError> {
        let path = self.csv_path(code);
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(EngineError::NoData {
                    code: code.to_string(),
                });
            }
            Err(e) => {
                return Err(EngineError::Data {
                    reason: format!("failed to read {}: {}", path.display(), e),
                });
            }
        };

        let mut rdr = csv::Reader::from_reader(file);
        let mut bars = Vec::new();
        for (line, result) in rdr.deserialize::<OhlcvBar>().enumerate() {
            let bar = result.map_err(|e| EngineError::Data {
                reason: format!("{} row {}: {}", path.display(), line + 1, e),
            })?;
            bars.push(bar);
        }

        bars.sort_by_key(|b| b.date);
        tracing::debug!(%code, bars = bars.len(), "loaded price file");
        Ok(bars)
    }

    fn bars(&self, code: &str) -> Result<Arc<Vec<OhlcvBar>>, EngineError> {
        if let Some(bars) = self
            .loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(code)
        {
            return Ok(Arc::clone(bars));
        }
        let bars = Arc::new(self.read_bars(code)?);
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(code.to_string(), Arc::clone(&bars));
        Ok(bars)
    }
}

impl DataPort for CsvAdapter {
    fn source_name(&self) -> &str {
        "csv prices"
    }

    fn fetch_history(&self, code: &str, as_of: NaiveDate) -> Result<Vec<OhlcvBar>, EngineError> {
        let bars = self.bars(code)?;
        let history: Vec<OhlcvBar> = bars.iter().filter(|b| b.date <= as_of).cloned().collect();
        if history.is_empty() {
            return Err(EngineError::NoData {
                code: code.to_string(),
            });
        }
        Ok(history)
    }

    fn fetch_forward(
        &self,
        code: &str,
        after: NaiveDate,
        count: usize,
    ) -> Result<Vec<OhlcvBar>, EngineError> {
        let bars = self.bars(code)?;
        Ok(bars
            .iter()
            .filter(|b| b.date > after)
            .take(count)
            .cloned()
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, EngineError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| EngineError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| EngineError::Data {
                reason: format!("directory entry error: {e}"),
            })?;
            let name = entry.file_name();
            if let Some(code) = name.to_string_lossy().strip_suffix(".csv") {
                symbols.push(code.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
