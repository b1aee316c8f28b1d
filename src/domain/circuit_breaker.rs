//! Circuit breaker: caps scores under a BEAR regime or a falling lead stock.
//!
//! The cap only ever lowers a score: `final = min(provisional, cap)`.

use crate::domain::regime::MarketRegime;

#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Maximum score allowed while the breaker is tripped.
    pub cap: u8,
    /// Lead momentum (percent) strictly below this trips the breaker.
    pub lead_threshold: f64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            cap: 60,
            lead_threshold: -2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerOutcome {
    pub final_score: u8,
    /// The cap in force, or `None` when the breaker did not trip.
    pub cap: Option<u8>,
}

/// True when the regime or the lead instrument calls for a cap.
///
/// A missing lead momentum leaves the decision to the regime alone.
pub fn is_tripped(regime: MarketRegime, lead_momentum: Option<f64>, config: &CircuitBreakerConfig) -> bool {
    regime == MarketRegime::Bear || lead_momentum.is_some_and(|m| m < config.lead_threshold)
}

pub fn apply_circuit_breaker(
    provisional: u8,
    regime: MarketRegime,
    lead_momentum: Option<f64>,
    config: &CircuitBreakerConfig,
) -> BreakerOutcome {
    if is_tripped(regime, lead_momentum, config) {
        BreakerOutcome {
            final_score: provisional.min(config.cap),
            cap: Some(config.cap),
        }
    } else {
        BreakerOutcome {
            final_score: provisional,
            cap: None,
        }
    }
}
