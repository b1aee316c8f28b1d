//! Daily OHLCV bar, as stored one row per trading day in a price file.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl OhlcvBar {
    /// Traded value, close * volume.
    pub fn turnover(&self) -> f64 {
        self.close * self.volume as f64
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// Describes the first problem that makes this bar unusable, if any.
    pub fn defect(&self) -> Option<String> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Some(format!("non-positive or non-finite price on {}", self.date));
        }
        if self.volume < 0 {
            return Some(format!("negative volume on {}", self.date));
        }
        None
    }
}
