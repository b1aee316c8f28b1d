#![allow(dead_code)]

use chrono::NaiveDate;
use equiscore::domain::error::EngineError;
pub use equiscore::domain::ohlcv::OhlcvBar;
use equiscore::domain::sentiment::{SentimentScore, SentimentSnapshot};
use equiscore::ports::data_port::DataPort;
use equiscore::ports::sentiment_port::SentimentPort;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

pub const START: &str = "2024-01-01";

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
    /// Codes whose history ignores the requested cutoff.
    pub leaky: HashSet<String>,
    pub honors_cutoff: bool,
    /// Codes whose history fetch sleeps before answering.
    pub delays: HashMap<String, Duration>,
    fetches: Mutex<HashMap<String, usize>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            leaky: HashSet::new(),
            honors_cutoff: true,
            delays: HashMap::new(),
            fetches: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }

    pub fn with_leak(mut self, code: &str) -> Self {
        self.leaky.insert(code.to_string());
        self
    }

    pub fn without_cutoff(mut self) -> Self {
        self.honors_cutoff = false;
        self
    }

    pub fn with_delay(mut self, code: &str, delay: Duration) -> Self {
        self.delays.insert(code.to_string(), delay);
        self
    }

    pub fn fetch_count(&self, code: &str) -> usize {
        self.fetches.lock().unwrap().get(code).copied().unwrap_or(0)
    }
}

impl DataPort for MockDataPort {
    fn source_name(&self) -> &str {
        "mock prices"
    }

    fn fetch_history(&self, code: &str, as_of: NaiveDate) -> Result<Vec<OhlcvBar>, EngineError> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(code.to_string())
            .or_insert(0) += 1;

        if let Some(delay) = self.delays.get(code) {
            std::thread::sleep(*delay);
        }
        if let Some(reason) = self.errors.get(code) {
            return Err(EngineError::Data {
                reason: reason.clone(),
            });
        }
        let bars = self.data.get(code).ok_or_else(|| EngineError::NoData {
            code: code.to_string(),
        })?;
        let history: Vec<OhlcvBar> = if self.leaky.contains(code) {
            bars.clone()
        } else {
            bars.iter().filter(|b| b.date <= as_of).cloned().collect()
        };
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
        let bars = self.data.get(code).ok_or_else(|| EngineError::NoData {
            code: code.to_string(),
        })?;
        Ok(bars
            .iter()
            .filter(|b| b.date > after)
            .take(count)
            .cloned()
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, EngineError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn honors_cutoff(&self) -> bool {
        self.honors_cutoff
    }
}

/// Dated sentiment scores per code; the latest entry on or before the
/// cutoff wins.
pub struct MockSentimentPort {
    pub scores: HashMap<String, Vec<(NaiveDate, f64)>>,
    pub default: f64,
    pub honors_cutoff: bool,
    pub leaky: bool,
}

impl MockSentimentPort {
    pub fn new() -> Self {
        Self {
            scores: HashMap::new(),
            default: 0.0,
            honors_cutoff: true,
            leaky: false,
        }
    }

    pub fn with_default(mut self, score: f64) -> Self {
        self.default = score;
        self
    }

    pub fn with_score(mut self, code: &str, date: NaiveDate, score: f64) -> Self {
        self.scores
            .entry(code.to_string())
            .or_default()
            .push((date, score));
        self
    }

    pub fn without_cutoff(mut self) -> Self {
        self.honors_cutoff = false;
        self
    }

    pub fn leaky(mut self) -> Self {
        self.leaky = true;
        self
    }
}

impl SentimentPort for MockSentimentPort {
    fn source_name(&self) -> &str {
        "mock sentiment"
    }

    fn sentiment_as_of(&self, code: &str, as_of: NaiveDate) -> Result<SentimentSnapshot, EngineError> {
        let latest = self.scores.get(code).and_then(|entries| {
            entries
                .iter()
                .filter(|(date, _)| self.leaky || *date <= as_of)
                .max_by_key(|(date, _)| *date)
                .copied()
        });
        let (latest_headline, value) = match latest {
            Some((date, value)) => (Some(date), value),
            None => (None, self.default),
        };
        Ok(SentimentSnapshot {
            code: code.to_string(),
            as_of,
            score: SentimentScore::new(value)?,
            headline_count: usize::from(latest_headline.is_some()),
            latest_headline,
        })
    }

    fn honors_cutoff(&self) -> bool {
        self.honors_cutoff
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Date of the `index`-th generated bar.
pub fn day(index: usize) -> NaiveDate {
    NaiveDate::parse_from_str(START, "%Y-%m-%d").unwrap() + chrono::Duration::days(index as i64)
}

/// One bar per calendar day from `START`, with a 2% high-low range.
pub fn bars_from_closes(closes: &[f64]) -> Vec<OhlcvBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            date: day(i),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 100_000,
        })
        .collect()
}

/// Closes compounding at `daily_return` from `start_price`.
pub fn geometric_closes(count: usize, start_price: f64, daily_return: f64) -> Vec<f64> {
    (0..count)
        .map(|i| start_price * (1.0 + daily_return).powi(i as i32))
        .collect()
}

pub fn generate_bars(count: usize, start_price: f64, daily_return: f64) -> Vec<OhlcvBar> {
    bars_from_closes(&geometric_closes(count, start_price, daily_return))
}
