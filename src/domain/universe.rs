//! Universe selection, run by the caller before scoring.
//!
//! Parses code lists from configuration and drops codes without data or
//! with too little average turnover as of the run date. The turnover floor
//! is raised by half in a BEAR market.

use crate::domain::error::EngineError;
use crate::domain::indicator::turnover::calculate_turnover;
use crate::domain::price_series::PriceSeries;
use crate::domain::regime::MarketRegime;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fmt;

pub const BEAR_TURNOVER_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

impl From<UniverseError> for EngineError {
    fn from(err: UniverseError) -> Self {
        EngineError::ConfigInvalid {
            section: "universe".to_string(),
            key: "codes".to_string(),
            reason: err.to_string(),
        }
    }
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

/// Turnover floor in force for a regime.
pub fn effective_min_turnover(min_turnover: f64, regime: MarketRegime) -> f64 {
    match regime {
        MarketRegime::Bear => min_turnover * BEAR_TURNOVER_MULTIPLIER,
        _ => min_turnover,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    /// The history could not be read or failed validation.
    Failed(String),
    InsufficientBars { bars: usize, minimum: usize },
    LowTurnover { average: f64, minimum: f64 },
}

impl SkipReason {
    fn from_error(err: &EngineError) -> Self {
        match err {
            EngineError::NoData { .. } => SkipReason::NoData,
            other => SkipReason::Failed(other.to_string()),
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoData => write!(f, "no data"),
            SkipReason::Failed(reason) => write!(f, "{reason}"),
            SkipReason::InsufficientBars { bars, minimum } => {
                write!(f, "{bars} bars, turnover window needs {minimum}")
            }
            SkipReason::LowTurnover { average, minimum } => {
                write!(f, "average turnover {average:.0} below {minimum:.0}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedCode {
    pub code: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniverseSelection {
    pub codes: Vec<String>,
    pub skipped: Vec<SkippedCode>,
}

/// Turnover screen applied before scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniverseFilter {
    /// Bars in the average-turnover window.
    pub window: usize,
    /// Floor before the regime adjustment.
    pub min_turnover: f64,
}

/// Keeps codes whose average turnover over `window` bars up to `as_of`
/// reaches the regime-adjusted floor. Fails with `NoData` when nothing
/// survives.
pub fn select_universe(
    data_port: &dyn DataPort,
    codes: Vec<String>,
    as_of: NaiveDate,
    window: usize,
    min_turnover: f64,
    regime: MarketRegime,
) -> Result<UniverseSelection, EngineError> {
    let filter = UniverseFilter {
        window,
        min_turnover,
    };
    let selection = filter_universe(data_port, codes, as_of, &filter, regime);
    if selection.codes.is_empty() {
        return Err(EngineError::NoData {
            code: "universe".to_string(),
        });
    }
    Ok(selection)
}

/// Splits `codes` into those passing `filter` as of `as_of` and those
/// skipped, with the reason. An empty selection is not an error here.
pub fn filter_universe(
    data_port: &dyn DataPort,
    codes: impl IntoIterator<Item = String>,
    as_of: NaiveDate,
    filter: &UniverseFilter,
    regime: MarketRegime,
) -> UniverseSelection {
    let minimum = effective_min_turnover(filter.min_turnover, regime);
    let window = filter.window;
    let mut selected = Vec::new();
    let mut skipped = Vec::new();

    for code in codes {
        let fetched = data_port
            .fetch_history(&code, as_of)
            .and_then(|bars| PriceSeries::new(code.as_str(), bars));
        let series = match fetched {
            Ok(series) => series,
            Err(e) => {
                tracing::warn!(%code, error = %e, "skipping code without usable data");
                skipped.push(SkippedCode {
                    reason: SkipReason::from_error(&e),
                    code,
                });
                continue;
            }
        };

        let Some(average) = calculate_turnover(series.bars(), window).latest() else {
            tracing::warn!(%code, bars = series.len(), window, "skipping code with short history");
            skipped.push(SkippedCode {
                code,
                reason: SkipReason::InsufficientBars {
                    bars: series.len(),
                    minimum: window,
                },
            });
            continue;
        };

        if average < minimum {
            tracing::warn!(%code, average, minimum, "skipping illiquid code");
            skipped.push(SkippedCode {
                code,
                reason: SkipReason::LowTurnover { average, minimum },
            });
            continue;
        }

        selected.push(code);
    }

    if !skipped.is_empty() {
        tracing::info!(
            %as_of,
            selected = selected.len(),
            total = selected.len() + skipped.len(),
            "universe filtered"
        );
    }

    UniverseSelection {
        codes: selected,
        skipped,
    }
}
