//! Recommendation history sink.

use crate::domain::error::EngineError;
use crate::domain::regime::MarketRegime;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One surfaced recommendation, as persisted after a live run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub as_of: NaiveDate,
    pub strategy: String,
    pub code: String,
    pub score: u8,
    pub weight: f64,
    pub regime: MarketRegime,
}

pub trait HistoryPort {
    fn append(&self, records: &[HistoryRecord]) -> Result<(), EngineError>;

    fn load(&self) -> Result<Vec<HistoryRecord>, EngineError>;
}
