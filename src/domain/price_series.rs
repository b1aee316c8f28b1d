//! Validated, date-ordered price history for one instrument.
//!
//! A `PriceSeries` is immutable once built. Missing trading days are not
//! forward-filled: a gap simply means fewer observations in a window.

use crate::domain::error::EngineError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    code: String,
    bars: Vec<OhlcvBar>,
}

impl PriceSeries {
    /// Builds a series, rejecting empty input, non-increasing dates and
    /// prices that are non-finite or non-positive.
    pub fn new(code: impl Into<String>, bars: Vec<OhlcvBar>) -> Result<Self, EngineError> {
        let code = code.into();
        if bars.is_empty() {
            return Err(EngineError::NoData { code });
        }

        for (i, bar) in bars.iter().enumerate() {
            if let Some(reason) = bar.defect() {
                return Err(EngineError::InvalidData { code, reason });
            }
            if i > 0 && bars[i - 1].date >= bar.date {
                return Err(EngineError::InvalidData {
                    code,
                    reason: format!(
                        "dates not strictly increasing at {} (after {})",
                        bar.date,
                        bars[i - 1].date
                    ),
                });
            }
        }

        Ok(Self { code, bars })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last_date(&self) -> NaiveDate {
        self.bars[self.bars.len() - 1].date
    }

    pub fn last(&self) -> &OhlcvBar {
        &self.bars[self.bars.len() - 1]
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Index of the last bar dated on or before `date`.
    pub fn index_on_or_before(&self, date: NaiveDate) -> Option<usize> {
        match self.bars.partition_point(|b| b.date <= date) {
            0 => None,
            n => Some(n - 1),
        }
    }

    /// Copy of the series restricted to bars dated on or before `as_of`.
    pub fn truncate(&self, as_of: NaiveDate) -> Result<PriceSeries, EngineError> {
        match self.index_on_or_before(as_of) {
            Some(idx) => Ok(PriceSeries {
                code: self.code.clone(),
                bars: self.bars[..=idx].to_vec(),
            }),
            None => Err(EngineError::NoData {
                code: self.code.clone(),
            }),
        }
    }

    /// Fails with `LookaheadViolation` if any bar is dated after `cutoff`.
    pub fn ensure_within(&self, cutoff: NaiveDate, source_name: &str) -> Result<(), EngineError> {
        let last = self.last_date();
        if last > cutoff {
            return Err(EngineError::past_cutoff(source_name, &self.code, cutoff, last));
        }
        Ok(())
    }

    /// Fails with `InsufficientHistory` unless at least `minimum` bars exist.
    pub fn require(&self, minimum: usize) -> Result<(), EngineError> {
        if self.bars.len() < minimum {
            return Err(EngineError::InsufficientHistory {
                code: self.code.clone(),
                bars: self.bars.len(),
                minimum,
            });
        }
        Ok(())
    }
}
