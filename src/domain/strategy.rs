//! Strategy weight profiles and the regime multiplier table.
//!
//! A strategy is data, not code: every profile runs through the same scorer
//! and differs only in its factor weights and normalization parameters.

use crate::domain::error::EngineError;
use crate::domain::regime::MarketRegime;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    MomentumShort,
    MomentumMid,
    MomentumLong,
    Rsi,
    Volatility,
    TrendShort,
    TrendLong,
    Turnover,
    Sentiment,
}

impl Factor {
    pub const COUNT: usize = 9;

    /// Fixed evaluation order; summation follows it so scores are reproducible.
    pub const ALL: [Factor; Factor::COUNT] = [
        Factor::MomentumShort,
        Factor::MomentumMid,
        Factor::MomentumLong,
        Factor::Rsi,
        Factor::Volatility,
        Factor::TrendShort,
        Factor::TrendLong,
        Factor::Turnover,
        Factor::Sentiment,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Factor::MomentumShort => "momentum_short",
            Factor::MomentumMid => "momentum_mid",
            Factor::MomentumLong => "momentum_long",
            Factor::Rsi => "rsi",
            Factor::Volatility => "volatility",
            Factor::TrendShort => "trend_short",
            Factor::TrendLong => "trend_long",
            Factor::Turnover => "turnover",
            Factor::Sentiment => "sentiment",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Parameters of the raw-indicator to [0, 100] mappings.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationParams {
    /// Momentum percentage that maps to ~73 on the logistic curve.
    pub momentum_short_scale: f64,
    pub momentum_mid_scale: f64,
    pub momentum_long_scale: f64,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    /// Added to the RSI sub-score below `rsi_oversold`.
    pub rsi_oversold_adjust: f64,
    /// Added to the RSI sub-score above `rsi_overbought`.
    pub rsi_overbought_adjust: f64,
    /// ATR ratio at or below which volatility scores 100.
    pub atr_ratio_floor: f64,
    /// ATR ratio at or above which volatility scores 0.
    pub atr_ratio_ceiling: f64,
    pub trend_scale: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyProfile {
    pub name: &'static str,
    pub description: &'static str,
    weights: [f64; Factor::COUNT],
    pub params: NormalizationParams,
    /// Trend factors whose breach is flagged on the breakdown.
    pub trend_alerts: &'static [Factor],
}

impl StrategyProfile {
    /// Builds a profile from (factor, weight) pairs; unlisted factors weigh 0.
    pub fn new(
        name: &'static str,
        description: &'static str,
        weights: &[(Factor, f64)],
        params: NormalizationParams,
    ) -> Result<Self, EngineError> {
        let mut table = [0.0; Factor::COUNT];
        for &(factor, weight) in weights {
            table[factor.index()] = weight;
        }
        let profile = Self {
            name,
            description,
            weights: table,
            params,
            trend_alerts: &[],
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn weight(&self, factor: Factor) -> f64 {
        self.weights[factor.index()]
    }

    /// Weights must be finite and non-negative with at least one positive.
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |reason: String| EngineError::InvalidStrategy {
            name: format!("{} ({})", self.name, reason),
        };
        for factor in Factor::ALL {
            let w = self.weight(factor);
            if !w.is_finite() || w < 0.0 {
                return Err(invalid(format!("weight for {factor} is {w}")));
            }
        }
        if Factor::ALL.iter().all(|&f| self.weight(f) == 0.0) {
            return Err(invalid("all weights are zero".to_string()));
        }
        let p = &self.params;
        if p.atr_ratio_ceiling <= p.atr_ratio_floor {
            return Err(invalid("atr ratio ceiling must exceed floor".to_string()));
        }
        let scales = [
            p.momentum_short_scale,
            p.momentum_mid_scale,
            p.momentum_long_scale,
            p.trend_scale,
        ];
        if scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(invalid("normalization scales must be positive".to_string()));
        }
        Ok(())
    }
}

/// Regime-dependent weight multipliers.
///
/// BULL leans on momentum, BEAR on sentiment, volatility and trend.
pub fn regime_multiplier(regime: MarketRegime, factor: Factor) -> f64 {
    use Factor::*;
    match (regime, factor) {
        (MarketRegime::Bull, MomentumShort | MomentumMid | MomentumLong) => 1.25,
        (MarketRegime::Bull, Sentiment | Volatility) => 0.8,
        (MarketRegime::Bear, MomentumShort | MomentumMid | MomentumLong) => 0.6,
        (MarketRegime::Bear, Sentiment | Volatility) => 1.5,
        (MarketRegime::Bear, TrendShort | TrendLong) => 1.2,
        _ => 1.0,
    }
}

pub static DAY_TRADER: StrategyProfile = StrategyProfile {
    name: "day_trader",
    description: "short-term momentum and oversold rebounds; ignores long-term trend",
    //        mom_s mom_m mom_l rsi  vol  tr_s tr_l turn sent
    weights: [3.0, 1.0, 0.0, 2.0, 0.5, 1.0, 0.0, 0.5, 2.0],
    params: NormalizationParams {
        momentum_short_scale: 4.0,
        momentum_mid_scale: 8.0,
        momentum_long_scale: 15.0,
        rsi_oversold: 30.0,
        rsi_overbought: 70.0,
        rsi_oversold_adjust: 40.0,
        rsi_overbought_adjust: -10.0,
        atr_ratio_floor: 0.01,
        atr_ratio_ceiling: 0.08,
        trend_scale: 2.0,
    },
    trend_alerts: &[Factor::TrendShort],
};

pub static LONG_TERM: StrategyProfile = StrategyProfile {
    name: "long_term",
    description: "long-term momentum and trend continuity; penalizes RSI extremes",
    //        mom_s mom_m mom_l rsi  vol  tr_s tr_l turn sent
    weights: [0.5, 1.5, 3.0, 0.5, 1.5, 0.0, 2.0, 0.0, 0.5],
    params: NormalizationParams {
        momentum_short_scale: 4.0,
        momentum_mid_scale: 8.0,
        momentum_long_scale: 15.0,
        rsi_oversold: 30.0,
        rsi_overbought: 70.0,
        rsi_oversold_adjust: -15.0,
        rsi_overbought_adjust: -15.0,
        atr_ratio_floor: 0.01,
        atr_ratio_ceiling: 0.05,
        trend_scale: 5.0,
    },
    trend_alerts: &[Factor::TrendLong],
};

pub static DEFAULT: StrategyProfile = StrategyProfile {
    name: "default",
    description: "balanced momentum and risk",
    //        mom_s mom_m mom_l rsi  vol  tr_s tr_l turn  sent
    weights: [1.5, 1.0, 1.0, 1.0, 1.0, 0.5, 0.5, 0.25, 1.0],
    params: NormalizationParams {
        momentum_short_scale: 4.0,
        momentum_mid_scale: 8.0,
        momentum_long_scale: 15.0,
        rsi_oversold: 30.0,
        rsi_overbought: 80.0,
        rsi_oversold_adjust: 10.0,
        rsi_overbought_adjust: -10.0,
        atr_ratio_floor: 0.01,
        atr_ratio_ceiling: 0.06,
        trend_scale: 3.0,
    },
    trend_alerts: &[],
};

static REGISTRY: [&StrategyProfile; 3] = [&DAY_TRADER, &LONG_TERM, &DEFAULT];

pub fn available_strategies() -> &'static [&'static StrategyProfile] {
    &REGISTRY
}

/// Resolves a strategy identifier; `long_term_trader` is an alias of `long_term`.
pub fn resolve_strategy(name: &str) -> Result<&'static StrategyProfile, EngineError> {
    let key = name.trim().to_ascii_lowercase();
    let key = match key.as_str() {
        "long_term_trader" => "long_term",
        other => other,
    };
    REGISTRY
        .iter()
        .copied()
        .find(|p| p.name == key)
        .ok_or_else(|| EngineError::InvalidStrategy {
            name: name.to_string(),
        })
}
