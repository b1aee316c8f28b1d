//! ATR (Average True Range) with Wilder's smoothing.
//!
//! True range needs the previous close, so bar 0 contributes no TR.
//! Seed: mean of TR[1..=n]; subsequent: (prev * (n-1) + TR) / n.
//! Warmup: first n bars invalid, matching momentum's history requirement.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_atr(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let mut values: Vec<IndicatorPoint> = Vec::with_capacity(bars.len());
    let mut atr = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if period == 0 || i < period {
            values.push(IndicatorPoint {
                date: bar.date,
                valid: false,
                value: 0.0,
            });
            continue;
        }

        if i == period {
            atr = (1..=period)
                .map(|j| bars[j].true_range(bars[j - 1].close))
                .sum::<f64>()
                / period as f64;
        } else {
            let tr = bar.true_range(bars[i - 1].close);
            atr = (atr * (period - 1) as f64 + tr) / period as f64;
        }

        values.push(IndicatorPoint {
            date: bar.date,
            valid: true,
            value: atr,
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bar(day: u32, high: f64, low: f64, close: f64) -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1000,
        }
    }

    #[test]
    fn atr_warmup() {
        let bars: Vec<OhlcvBar> = (1..=5).map(|d| make_bar(d, 110.0, 90.0, 100.0)).collect();
        let series = calculate_atr(&bars, 3);

        assert_eq!(series.values.len(), 5);
        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(!series.values[2].valid);
        assert!(series.values[3].valid);
        assert!(series.values[4].valid);
    }

    #[test]
    fn atr_seed_is_average() {
        let bars = vec![
            make_bar(1, 110.0, 100.0, 105.0),
            make_bar(2, 115.0, 105.0, 110.0),
            make_bar(3, 120.0, 110.0, 115.0),
            make_bar(4, 125.0, 115.0, 120.0),
        ];

        let series = calculate_atr(&bars, 3);
        // each TR: max(10, |high - prev|=10, |low - prev|=0) = 10
        assert!((series.latest().unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn atr_wilder_smoothing() {
        let bars = vec![
            make_bar(1, 110.0, 100.0, 105.0),
            make_bar(2, 115.0, 105.0, 110.0),
            make_bar(3, 120.0, 110.0, 115.0),
            make_bar(4, 140.0, 120.0, 130.0),
        ];

        let series = calculate_atr(&bars, 2);
        // seed at bar 2: (10 + 10) / 2 = 10; bar 3 TR = max(20, 25, 5) = 25
        let expected = (10.0 * 1.0 + 25.0) / 2.0;
        assert!((series.latest().unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn atr_insufficient_bars() {
        let bars: Vec<OhlcvBar> = (1..=3).map(|d| make_bar(d, 110.0, 90.0, 100.0)).collect();
        let series = calculate_atr(&bars, 3);
        assert_eq!(series.latest(), None);
    }

    #[test]
    fn atr_is_non_negative_for_flat_prices() {
        let bars: Vec<OhlcvBar> = (1..=10).map(|d| make_bar(d, 50.0, 50.0, 50.0)).collect();
        let series = calculate_atr(&bars, 5);
        assert_eq!(series.latest(), Some(0.0));
    }
}
