//! Rolling average turnover (close * volume).
//!
//! TURNOVER(n)[i] = sum(C[i-j] * V[i-j] for j in 0..n) / n
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_turnover(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let valid = period > 0 && i + 1 >= period;
            let value = if valid {
                bars[i + 1 - period..=i]
                    .iter()
                    .map(OhlcvBar::turnover)
                    .sum::<f64>()
                    / period as f64
            } else {
                0.0
            };
            IndicatorPoint {
                date: bar.date,
                valid,
                value,
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Turnover(period),
        values,
    }
}
