//! Momentum (percentage rate of change).
//!
//! MOM(n)[i] = (C[i] / C[i-n] - 1) * 100
//! Warmup: first n bars invalid, so n prior observations are required.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_momentum(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());

    for i in 0..bars.len() {
        let valid = period > 0 && i >= period;

        let value = if valid {
            (bars[i].close / bars[i - period].close - 1.0) * 100.0
        } else {
            0.0
        };

        values.push(IndicatorPoint {
            date: bars[i].date,
            valid,
            value,
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Momentum(period),
        values,
    }
}
