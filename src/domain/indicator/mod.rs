//! Technical indicators and the per-instrument `IndicatorSet`.
//!
//! Each indicator module produces an `IndicatorSeries` aligned with the input
//! bars, flagging warmup points as invalid. `compute_indicator_set` reads the
//! latest point of every series for a history truncated at its as-of date.

pub mod atr;
pub mod momentum;
pub mod rsi;
pub mod sma;
pub mod turnover;

use crate::domain::error::EngineError;
use crate::domain::price_series::PriceSeries;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Momentum(usize),
    Rsi(usize),
    Atr(usize),
    Sma(usize),
    Turnover(usize),
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Value of the final point, if it is past warmup.
    pub fn latest(&self) -> Option<f64> {
        self.values.last().filter(|p| p.valid).map(|p| p.value)
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Momentum(period) => write!(f, "MOM({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Turnover(period) => write!(f, "TURNOVER({})", period),
        }
    }
}

/// Lookback windows, in trading observations.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConfig {
    pub mom_short: usize,
    pub mom_mid: usize,
    pub mom_long: usize,
    pub rsi_period: usize,
    pub atr_period: usize,
    pub turnover_window: usize,
    pub trend_short: usize,
    pub trend_long: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            mom_short: 5,
            mom_mid: 20,
            mom_long: 60,
            rsi_period: 14,
            atr_period: 14,
            turnover_window: 20,
            trend_short: 5,
            trend_long: 60,
        }
    }
}

impl IndicatorConfig {
    /// Bars needed before every indicator in the set is past warmup.
    pub fn min_bars(&self) -> usize {
        [
            self.mom_short + 1,
            self.mom_mid + 1,
            self.mom_long + 1,
            self.rsi_period + 1,
            self.atr_period + 1,
            self.turnover_window,
            self.trend_short,
            self.trend_long,
        ]
        .into_iter()
        .max()
        .unwrap_or(1)
    }
}

/// Indicator snapshot for one instrument at one as-of date.
///
/// Momentum and trend values are percentages; `atr` is in price units and
/// `atr_ratio` is ATR divided by the close.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSet {
    pub code: String,
    pub as_of: NaiveDate,
    pub close: f64,
    pub momentum_short: f64,
    pub momentum_mid: f64,
    pub momentum_long: f64,
    pub rsi: f64,
    pub atr: f64,
    pub atr_ratio: f64,
    pub turnover: f64,
    pub turnover_ratio: f64,
    pub trend_short: f64,
    pub trend_long: f64,
}

/// Computes the indicator set from the last bar of `series`.
///
/// The caller is responsible for truncating the series at its as-of date;
/// see [`compute_indicator_set_as_of`].
pub fn compute_indicator_set(
    series: &PriceSeries,
    config: &IndicatorConfig,
) -> Result<IndicatorSet, EngineError> {
    series.require(config.min_bars())?;

    let bars = series.bars();
    let code = series.code();
    let close = series.last().close;

    let latest = |s: IndicatorSeries| -> Result<f64, EngineError> {
        s.latest().ok_or_else(|| EngineError::InsufficientHistory {
            code: code.to_string(),
            bars: bars.len(),
            minimum: config.min_bars(),
        })
    };

    let momentum_short = latest(momentum::calculate_momentum(bars, config.mom_short))?;
    let momentum_mid = latest(momentum::calculate_momentum(bars, config.mom_mid))?;
    let momentum_long = latest(momentum::calculate_momentum(bars, config.mom_long))?;
    let rsi = latest(rsi::calculate_rsi(bars, config.rsi_period))?;
    let atr = latest(atr::calculate_atr(bars, config.atr_period))?;
    let avg_turnover = latest(turnover::calculate_turnover(bars, config.turnover_window))?;
    let sma_short = latest(sma::calculate_sma(bars, config.trend_short))?;
    let sma_long = latest(sma::calculate_sma(bars, config.trend_long))?;

    let turnover_ratio = if avg_turnover > 0.0 {
        series.last().turnover() / avg_turnover
    } else {
        1.0
    };

    Ok(IndicatorSet {
        code: code.to_string(),
        as_of: series.last_date(),
        close,
        momentum_short,
        momentum_mid,
        momentum_long,
        rsi,
        atr,
        atr_ratio: atr / close,
        turnover: avg_turnover,
        turnover_ratio,
        trend_short: (close / sma_short - 1.0) * 100.0,
        trend_long: (close / sma_long - 1.0) * 100.0,
    })
}

/// Truncates `series` at `as_of` and computes the indicator set.
pub fn compute_indicator_set_as_of(
    series: &PriceSeries,
    as_of: NaiveDate,
    config: &IndicatorConfig,
) -> Result<IndicatorSet, EngineError> {
    compute_indicator_set(&series.truncate(as_of)?, config)
}
