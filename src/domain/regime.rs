//! Market regime classification from a benchmark's moving averages.
//!
//! BULL when the short average exceeds the long one by more than the margin,
//! BEAR when it trails by more than the margin, NEUTRAL otherwise. The margin
//! is a fraction of the mean of the two averages, so swapping the averages
//! exactly swaps BULL and BEAR.

use crate::domain::error::EngineError;
use crate::domain::indicator::sma::last_sma;
use crate::domain::price_series::PriceSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketRegime {
    Bull,
    Bear,
    Neutral,
}

impl fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketRegime::Bull => write!(f, "BULL"),
            MarketRegime::Bear => write!(f, "BEAR"),
            MarketRegime::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegimeConfig {
    pub short_window: usize,
    pub long_window: usize,
    pub margin: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            short_window: 20,
            long_window: 60,
            margin: 0.01,
        }
    }
}

/// Regime plus the averages that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegimeSnapshot {
    pub benchmark: String,
    pub as_of: NaiveDate,
    pub regime: MarketRegime,
    pub short_ma: f64,
    pub long_ma: f64,
}

pub fn classify_from_averages(short_ma: f64, long_ma: f64, margin: f64) -> MarketRegime {
    let threshold = margin * (short_ma + long_ma) / 2.0;
    let spread = short_ma - long_ma;
    if spread > threshold {
        MarketRegime::Bull
    } else if spread < -threshold {
        MarketRegime::Bear
    } else {
        MarketRegime::Neutral
    }
}

pub fn classify_regime(
    benchmark: &PriceSeries,
    as_of: NaiveDate,
    config: &RegimeConfig,
) -> Result<RegimeSnapshot, EngineError> {
    let series = benchmark.truncate(as_of)?;
    series.require(config.long_window.max(config.short_window))?;

    let closes = series.closes();
    let insufficient = || EngineError::InsufficientHistory {
        code: series.code().to_string(),
        bars: closes.len(),
        minimum: config.long_window.max(config.short_window),
    };
    let short_ma = last_sma(&closes, config.short_window).ok_or_else(insufficient)?;
    let long_ma = last_sma(&closes, config.long_window).ok_or_else(insufficient)?;

    let regime = classify_from_averages(short_ma, long_ma, config.margin);
    tracing::debug!(
        benchmark = series.code(),
        %as_of,
        %regime,
        short_ma,
        long_ma,
        "classified market regime"
    );

    Ok(RegimeSnapshot {
        benchmark: series.code().to_string(),
        as_of,
        regime,
        short_ma,
        long_ma,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use proptest::prelude::*;

    fn series_from(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect();
        PriceSeries::new("KOSPI200", bars).unwrap()
    }

    fn last_date(series: &PriceSeries) -> NaiveDate {
        series.last_date()
    }

    #[test]
    fn rising_benchmark_is_bull() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let series = series_from(&closes);
        let snap = classify_regime(&series, last_date(&series), &RegimeConfig::default()).unwrap();
        assert_eq!(snap.regime, MarketRegime::Bull);
        assert!(snap.short_ma > snap.long_ma);
    }

    #[test]
    fn falling_benchmark_is_bear() {
        let closes: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        let series = series_from(&closes);
        let snap = classify_regime(&series, last_date(&series), &RegimeConfig::default()).unwrap();
        assert_eq!(snap.regime, MarketRegime::Bear);
    }

    #[test]
    fn flat_benchmark_is_neutral() {
        let series = series_from(&[100.0; 70]);
        let snap = classify_regime(&series, last_date(&series), &RegimeConfig::default()).unwrap();
        assert_eq!(snap.regime, MarketRegime::Neutral);
    }

    #[test]
    fn spread_inside_margin_is_neutral() {
        // 0.5% apart with a 1% margin
        assert_eq!(classify_from_averages(100.5, 100.0, 0.01), MarketRegime::Neutral);
        assert_eq!(classify_from_averages(102.0, 100.0, 0.01), MarketRegime::Bull);
        assert_eq!(classify_from_averages(98.0, 100.0, 0.01), MarketRegime::Bear);
    }

    #[test]
    fn short_history_is_insufficient() {
        let series = series_from(&[100.0; 59]);
        let result = classify_regime(&series, last_date(&series), &RegimeConfig::default());
        assert!(matches!(
            result,
            Err(EngineError::InsufficientHistory { bars: 59, minimum: 60, .. })
        ));
    }

    #[test]
    fn as_of_truncates_benchmark() {
        let mut closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        // a crash after the cutoff must not change the classification
        closes.extend((0..30).map(|i| 50.0 - i as f64));
        let series = series_from(&closes);
        let as_of = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(59);
        let snap = classify_regime(&series, as_of, &RegimeConfig::default()).unwrap();
        assert_eq!(snap.regime, MarketRegime::Bull);
        assert_eq!(snap.as_of, as_of);
    }

    #[test]
    fn regime_display() {
        assert_eq!(MarketRegime::Bull.to_string(), "BULL");
        assert_eq!(MarketRegime::Neutral.to_string(), "NEUTRAL");
    }

    proptest! {
        #[test]
        fn swapping_averages_flips_bull_and_bear(
            short in 1.0..1000.0_f64,
            long in 1.0..1000.0_f64,
            margin in 0.0..0.2_f64,
        ) {
            let forward = classify_from_averages(short, long, margin);
            let swapped = classify_from_averages(long, short, margin);
            let expected = match forward {
                MarketRegime::Bull => MarketRegime::Bear,
                MarketRegime::Bear => MarketRegime::Bull,
                MarketRegime::Neutral => MarketRegime::Neutral,
            };
            prop_assert_eq!(swapped, expected);
        }
    }
}
