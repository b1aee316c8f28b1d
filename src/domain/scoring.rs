//! Multi-factor scorer.
//!
//! Each raw indicator is mapped onto a [0, 100] sub-score, the profile's base
//! weights are scaled by the regime multiplier table, and the weighted mean
//! of the sub-scores is rounded to an integer before the circuit breaker
//! caps it. Summation always follows `Factor::ALL`, so identical inputs give
//! bit-identical breakdowns.

use crate::domain::circuit_breaker::{CircuitBreakerConfig, apply_circuit_breaker};
use crate::domain::error::EngineError;
use crate::domain::indicator::IndicatorSet;
use crate::domain::regime::MarketRegime;
use crate::domain::sentiment::SentimentScore;
use crate::domain::strategy::{Factor, NormalizationParams, StrategyProfile, regime_multiplier};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

fn logistic(x: f64) -> f64 {
    100.0 / (1.0 + (-x).exp())
}

/// Percentage momentum through a logistic curve; 0% maps to 50.
pub fn momentum_sub_score(pct: f64, scale: f64) -> f64 {
    logistic(pct / scale)
}

/// RSI with zone adjustments below oversold and above overbought.
pub fn rsi_sub_score(rsi: f64, params: &NormalizationParams) -> f64 {
    let adjusted = if rsi < params.rsi_oversold {
        rsi + params.rsi_oversold_adjust
    } else if rsi > params.rsi_overbought {
        rsi + params.rsi_overbought_adjust
    } else {
        rsi
    };
    adjusted.clamp(0.0, 100.0)
}

/// Inverted volatility: 100 at the ATR-ratio floor, 0 at the ceiling.
pub fn volatility_sub_score(atr_ratio: f64, params: &NormalizationParams) -> f64 {
    let span = params.atr_ratio_ceiling - params.atr_ratio_floor;
    let position = (atr_ratio - params.atr_ratio_floor) / span;
    ((1.0 - position) * 100.0).clamp(0.0, 100.0)
}

/// Percentage distance of the close above a moving average.
pub fn trend_sub_score(pct: f64, scale: f64) -> f64 {
    logistic(pct / scale)
}

/// Turnover surge ratio; an average day (ratio 1) maps to 50.
pub fn turnover_sub_score(ratio: f64) -> f64 {
    logistic((ratio - 1.0) * 2.0)
}

pub fn sentiment_sub_score(sentiment: SentimentScore) -> f64 {
    sentiment.to_percent()
}

/// Sub-score of one factor for the given inputs.
pub fn sub_score(
    factor: Factor,
    indicators: &IndicatorSet,
    sentiment: SentimentScore,
    params: &NormalizationParams,
) -> f64 {
    match factor {
        Factor::MomentumShort => momentum_sub_score(indicators.momentum_short, params.momentum_short_scale),
        Factor::MomentumMid => momentum_sub_score(indicators.momentum_mid, params.momentum_mid_scale),
        Factor::MomentumLong => momentum_sub_score(indicators.momentum_long, params.momentum_long_scale),
        Factor::Rsi => rsi_sub_score(indicators.rsi, params),
        Factor::Volatility => volatility_sub_score(indicators.atr_ratio, params),
        Factor::TrendShort => trend_sub_score(indicators.trend_short, params.trend_scale),
        Factor::TrendLong => trend_sub_score(indicators.trend_long, params.trend_scale),
        Factor::Turnover => turnover_sub_score(indicators.turnover_ratio),
        Factor::Sentiment => sentiment_sub_score(sentiment),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorContribution {
    pub factor: Factor,
    pub sub_score: f64,
    pub base_weight: f64,
    /// Base weight times the regime multiplier.
    pub applied_weight: f64,
    /// `applied_weight * sub_score`.
    pub contribution: f64,
}

/// Close below a moving average the strategy relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreWarning {
    BelowShortAverage,
    BelowLongAverage,
}

impl fmt::Display for ScoreWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreWarning::BelowShortAverage => write!(f, "close below short moving average"),
            ScoreWarning::BelowLongAverage => write!(f, "long-term trend broken"),
        }
    }
}

/// Warnings raised by `profile` for these indicators, in factor order.
pub fn trend_warnings(indicators: &IndicatorSet, profile: &StrategyProfile) -> Vec<ScoreWarning> {
    profile
        .trend_alerts
        .iter()
        .filter_map(|factor| match factor {
            Factor::TrendShort if indicators.trend_short < 0.0 => {
                Some(ScoreWarning::BelowShortAverage)
            }
            Factor::TrendLong if indicators.trend_long < 0.0 => Some(ScoreWarning::BelowLongAverage),
            _ => None,
        })
        .collect()
}

/// Per-instrument scoring result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub code: String,
    pub as_of: NaiveDate,
    pub strategy: String,
    /// Close of the last bar on or before `as_of`.
    pub close: f64,
    pub regime: MarketRegime,
    pub lead_momentum: Option<f64>,
    pub sentiment: f64,
    pub contributions: Vec<FactorContribution>,
    /// Sum of contributions before normalization.
    pub raw_weighted_sum: f64,
    pub total_weight: f64,
    /// `raw_weighted_sum / total_weight`, unrounded.
    pub weighted_mean: f64,
    pub provisional_score: u8,
    /// Cap applied by the circuit breaker, if it tripped.
    pub cap: Option<u8>,
    pub final_score: u8,
    pub warnings: Vec<ScoreWarning>,
}

impl ScoreBreakdown {
    pub fn contribution(&self, factor: Factor) -> Option<&FactorContribution> {
        self.contributions.iter().find(|c| c.factor == factor)
    }
}

/// Scores one instrument and passes the result through the circuit breaker.
pub fn score_indicators(
    indicators: &IndicatorSet,
    sentiment: SentimentScore,
    profile: &StrategyProfile,
    regime: MarketRegime,
    lead_momentum: Option<f64>,
    breaker: &CircuitBreakerConfig,
) -> Result<ScoreBreakdown, EngineError> {
    let mut contributions = Vec::with_capacity(Factor::COUNT);
    let mut raw_weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for factor in Factor::ALL {
        let base_weight = profile.weight(factor);
        let applied_weight = base_weight * regime_multiplier(regime, factor);
        let sub = sub_score(factor, indicators, sentiment, &profile.params);
        let contribution = applied_weight * sub;
        raw_weighted_sum += contribution;
        total_weight += applied_weight;
        contributions.push(FactorContribution {
            factor,
            sub_score: sub,
            base_weight,
            applied_weight,
            contribution,
        });
    }

    if total_weight <= 0.0 {
        return Err(EngineError::InvalidStrategy {
            name: format!("{} (no positive weight under {regime})", profile.name),
        });
    }

    let weighted_mean = raw_weighted_sum / total_weight;
    let provisional_score = weighted_mean.round().clamp(0.0, 100.0) as u8;
    let outcome = apply_circuit_breaker(provisional_score, regime, lead_momentum, breaker);

    tracing::debug!(
        code = %indicators.code,
        strategy = profile.name,
        %regime,
        weighted_mean,
        provisional_score,
        final_score = outcome.final_score,
        "scored instrument"
    );

    Ok(ScoreBreakdown {
        code: indicators.code.clone(),
        as_of: indicators.as_of,
        strategy: profile.name.to_string(),
        close: indicators.close,
        regime,
        lead_momentum,
        sentiment: sentiment.value(),
        contributions,
        raw_weighted_sum,
        total_weight,
        weighted_mean,
        provisional_score,
        cap: outcome.cap,
        final_score: outcome.final_score,
        warnings: trend_warnings(indicators, profile),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::strategy::{DAY_TRADER, DEFAULT, LONG_TERM};
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn indicators() -> IndicatorSet {
        IndicatorSet {
            code: "005930".to_string(),
            as_of: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            close: 100.0,
            momentum_short: 8.0,
            momentum_mid: 10.0,
            momentum_long: 12.0,
            rsi: 72.0,
            atr: 2.0,
            atr_ratio: 0.02,
            turnover: 1.0e9,
            turnover_ratio: 1.2,
            trend_short: 3.0,
            trend_long: 6.0,
        }
    }

    fn positive() -> SentimentScore {
        SentimentScore::new(0.6).unwrap()
    }

    #[test]
    fn momentum_mapping_is_centered() {
        assert_relative_eq!(momentum_sub_score(0.0, 4.0), 50.0);
        assert_relative_eq!(momentum_sub_score(8.0, 4.0), 88.079_707_797_788_24, epsilon = 1e-9);
        assert!(momentum_sub_score(-8.0, 4.0) < 12.0);
    }

    #[test]
    fn rsi_zone_adjustments() {
        let p = &DAY_TRADER.params;
        assert_relative_eq!(rsi_sub_score(50.0, p), 50.0);
        assert_relative_eq!(rsi_sub_score(72.0, p), 62.0);
        // oversold rebound bonus
        assert_relative_eq!(rsi_sub_score(25.0, p), 65.0);
        assert_relative_eq!(rsi_sub_score(100.0, p), 90.0);

        let lt = &LONG_TERM.params;
        assert_relative_eq!(rsi_sub_score(10.0, lt), 0.0);
    }

    #[test]
    fn volatility_is_inverted() {
        let p = &DAY_TRADER.params;
        assert_relative_eq!(volatility_sub_score(0.005, p), 100.0);
        assert_relative_eq!(volatility_sub_score(0.08, p), 0.0, epsilon = 1e-9);
        assert!(volatility_sub_score(0.02, p) > volatility_sub_score(0.04, p));
    }

    #[test]
    fn sentiment_is_linear() {
        assert_relative_eq!(sentiment_sub_score(positive()), 80.0);
    }

    #[test]
    fn day_trader_bull_lands_in_high_band() {
        let breakdown = score_indicators(
            &indicators(),
            positive(),
            &DAY_TRADER,
            MarketRegime::Bull,
            None,
            &CircuitBreakerConfig::default(),
        )
        .unwrap();

        assert!(breakdown.final_score >= 70, "score {}", breakdown.final_score);
        assert_eq!(breakdown.cap, None);
        assert_eq!(breakdown.final_score, breakdown.provisional_score);
        assert_eq!(breakdown.contributions.len(), Factor::COUNT);
    }

    #[test]
    fn bear_with_falling_lead_is_capped() {
        let breakdown = score_indicators(
            &indicators(),
            positive(),
            &DAY_TRADER,
            MarketRegime::Bear,
            Some(-3.0),
            &CircuitBreakerConfig::default(),
        )
        .unwrap();

        assert!(breakdown.provisional_score > 60);
        assert_eq!(breakdown.cap, Some(60));
        assert_eq!(breakdown.final_score, 60);
    }

    #[test]
    fn regime_scales_weights() {
        let bull = score_indicators(
            &indicators(),
            positive(),
            &DEFAULT,
            MarketRegime::Bull,
            None,
            &CircuitBreakerConfig::default(),
        )
        .unwrap();
        let mom = bull.contribution(Factor::MomentumShort).unwrap();
        assert_relative_eq!(mom.applied_weight, 1.5 * 1.25);
        let sent = bull.contribution(Factor::Sentiment).unwrap();
        assert_relative_eq!(sent.applied_weight, 0.8);
    }

    #[test]
    fn weighted_mean_is_normalized() {
        let b = score_indicators(
            &indicators(),
            positive(),
            &LONG_TERM,
            MarketRegime::Neutral,
            None,
            &CircuitBreakerConfig::default(),
        )
        .unwrap();
        let total: f64 = b.contributions.iter().map(|c| c.applied_weight).sum();
        assert_relative_eq!(b.total_weight, total);
        assert_relative_eq!(b.weighted_mean, b.raw_weighted_sum / total);
        assert_eq!(b.provisional_score, b.weighted_mean.round() as u8);
    }

    #[test]
    fn scoring_is_deterministic() {
        let run = || {
            score_indicators(
                &indicators(),
                positive(),
                &DAY_TRADER,
                MarketRegime::Neutral,
                Some(0.5),
                &CircuitBreakerConfig::default(),
            )
            .unwrap()
        };
        let first = run();
        let second = run();
        assert_eq!(first, second);
        assert_eq!(first.weighted_mean.to_bits(), second.weighted_mean.to_bits());
    }

    #[test]
    fn day_trader_flags_break_of_short_average() {
        let set = IndicatorSet {
            trend_short: -1.5,
            trend_long: -4.0,
            ..indicators()
        };
        let b = score_indicators(
            &set,
            positive(),
            &DAY_TRADER,
            MarketRegime::Neutral,
            None,
            &CircuitBreakerConfig::default(),
        )
        .unwrap();
        assert_eq!(b.warnings, vec![ScoreWarning::BelowShortAverage]);
    }

    #[test]
    fn long_term_flags_break_of_long_average() {
        let set = IndicatorSet {
            trend_long: -0.5,
            ..indicators()
        };
        assert_eq!(trend_warnings(&set, &LONG_TERM), vec![ScoreWarning::BelowLongAverage]);
        assert!(trend_warnings(&set, &DAY_TRADER).is_empty());
        assert!(trend_warnings(&set, &DEFAULT).is_empty());
    }

    #[test]
    fn close_above_averages_has_no_warnings() {
        assert!(trend_warnings(&indicators(), &DAY_TRADER).is_empty());
        assert!(trend_warnings(&indicators(), &LONG_TERM).is_empty());
    }

    fn arb_regime() -> impl Strategy<Value = MarketRegime> {
        prop_oneof![
            Just(MarketRegime::Bull),
            Just(MarketRegime::Bear),
            Just(MarketRegime::Neutral),
        ]
    }

    proptest! {
        #[test]
        fn score_stays_in_range(
            mom_s in -60.0..60.0_f64,
            mom_m in -80.0..80.0_f64,
            mom_l in -90.0..300.0_f64,
            rsi in 0.0..=100.0_f64,
            atr_ratio in 0.0..0.5_f64,
            turnover_ratio in 0.0..20.0_f64,
            trend_s in -50.0..50.0_f64,
            trend_l in -80.0..200.0_f64,
            sentiment in -1.0..=1.0_f64,
            regime in arb_regime(),
            profile_idx in 0usize..3,
        ) {
            let set = IndicatorSet {
                momentum_short: mom_s,
                momentum_mid: mom_m,
                momentum_long: mom_l,
                rsi,
                atr_ratio,
                turnover_ratio,
                trend_short: trend_s,
                trend_long: trend_l,
                ..indicators()
            };
            let profile = [&DAY_TRADER, &LONG_TERM, &DEFAULT][profile_idx];
            let b = score_indicators(
                &set,
                SentimentScore::new(sentiment).unwrap(),
                profile,
                regime,
                None,
                &CircuitBreakerConfig::default(),
            ).unwrap();
            prop_assert!(b.final_score <= 100);
            prop_assert!(b.final_score <= b.provisional_score);
            for c in &b.contributions {
                prop_assert!((0.0..=100.0).contains(&c.sub_score));
            }
        }
    }
}
