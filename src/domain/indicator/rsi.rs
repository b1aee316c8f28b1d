//! RSI (Relative Strength Index) with Wilder's smoothing.
//!
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss)), clamped to [0, 100].
//! avg_loss == 0 gives 100, or exactly 50 when avg_gain is also 0.
//!
//! Warmup: first n bars are invalid (need n price changes).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        (100.0 - (100.0 / (1.0 + avg_gain / avg_loss))).clamp(0.0, 100.0)
    }
}

pub fn calculate_rsi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.len() < 2 {
        let values: Vec<IndicatorPoint> = bars
            .iter()
            .map(|b| IndicatorPoint {
                date: b.date,
                valid: false,
                value: 0.0,
            })
            .collect();

        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values,
        };
    }

    let mut values = Vec::with_capacity(bars.len());
    values.push(IndicatorPoint {
        date: bars[0].date,
        valid: false,
        value: 0.0,
    });

    let changes: Vec<f64> = bars.windows(2).map(|w| w[1].close - w[0].close).collect();
    let gains: Vec<f64> = changes.iter().map(|c| c.max(0.0)).collect();
    let losses: Vec<f64> = changes.iter().map(|c| (-c).max(0.0)).collect();

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for (i, bar) in bars.iter().enumerate().skip(1) {
        let idx = i - 1;

        if idx + 1 < period {
            values.push(IndicatorPoint {
                date: bar.date,
                valid: false,
                value: 0.0,
            });
            continue;
        }

        if idx + 1 == period {
            avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
            avg_loss = losses[..period].iter().sum::<f64>() / period as f64;
        } else {
            avg_gain = (avg_gain * (period - 1) as f64 + gains[idx]) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + losses[idx]) / period as f64;
        }

        values.push(IndicatorPoint {
            date: bar.date,
            valid: true,
            value: rsi_value(avg_gain, avg_loss),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn make_bar(date: NaiveDate, close: f64) -> OhlcvBar {
        OhlcvBar {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000,
        }
    }

    fn bars_from(closes: &[f64]) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| make_bar(start + chrono::Duration::days(i as i64), c))
            .collect()
    }

    #[test]
    fn rsi_empty_bars() {
        let series = calculate_rsi(&[], 14);
        assert_eq!(series.values.len(), 0);
    }

    #[test]
    fn rsi_warmup_period() {
        let closes: Vec<f64> = (1..=15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let series = calculate_rsi(&bars_from(&closes), 14);

        assert_eq!(series.values.len(), 15);
        for i in 0..14 {
            assert!(!series.values[i].valid, "Bar {} should be invalid", i);
        }
        assert!(series.values[14].valid, "Bar 14 should be valid");
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let series = calculate_rsi(&bars_from(&closes), 14);
        assert_eq!(series.latest(), Some(100.0));
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let series = calculate_rsi(&bars_from(&closes), 14);
        assert_eq!(series.latest(), Some(0.0));
    }

    #[test]
    fn rsi_flat_prices_is_50() {
        let closes = vec![42.0; 20];
        let series = calculate_rsi(&bars_from(&closes), 14);
        assert_eq!(series.latest(), Some(50.0));
    }

    #[test]
    fn rsi_known_calculation() {
        let closes = [
            44.0, 44.25, 44.50, 43.75, 44.50, 44.25, 44.75, 45.25, 45.50, 45.25, 45.50, 46.0,
            46.25, 46.0, 46.50,
        ];
        let series = calculate_rsi(&bars_from(&closes), 14);
        let rsi = series.latest().unwrap();
        // gains 4.0, losses 1.5 → 100 - 100 / (1 + 4/1.5)
        let expected = 100.0 - 100.0 / (1.0 + 4.0 / 1.5);
        assert!((rsi - expected).abs() < 1e-9);
    }

    #[test]
    fn rsi_wilder_smoothing_step() {
        // period 2: changes +2, -1, +3
        let series = calculate_rsi(&bars_from(&[10.0, 12.0, 11.0, 14.0]), 2);
        // seed: gain 1.0, loss 0.5; next: gain (1.0 + 3) / 2 = 2.0, loss 0.25
        let expected = 100.0 - 100.0 / (1.0 + 2.0 / 0.25);
        assert!((series.latest().unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn rsi_zero_period() {
        let series = calculate_rsi(&bars_from(&[100.0, 101.0]), 0);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    proptest! {
        #[test]
        fn rsi_stays_in_range(closes in prop::collection::vec(1.0..500.0_f64, 16..60)) {
            let series = calculate_rsi(&bars_from(&closes), 14);
            for point in series.values.iter().filter(|p| p.valid) {
                prop_assert!((0.0..=100.0).contains(&point.value));
            }
        }
    }
}
