//! Configuration validation.
//!
//! Validates every config field before a run so that the engine never
//! starts with a window it cannot satisfy or a cap it cannot apply.

use crate::domain::error::EngineError;
use crate::domain::strategy::resolve_strategy;
use crate::domain::universe::parse_codes;
use crate::ports::config_port::ConfigPort;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), EngineError> {
    validate_data(config)?;
    validate_market(config)?;
    validate_indicators(config)?;
    validate_regime(config)?;
    validate_circuit_breaker(config)?;
    validate_sentiment(config)?;
    validate_backtest(config)?;
    validate_recommend(config)?;
    validate_universe(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> EngineError {
    EngineError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn require_string(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, EngineError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(EngineError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, EngineError> {
    let value = config.get_int(section, key, default);
    if value < 1 {
        return Err(invalid(section, key, format!("{key} must be at least 1")));
    }
    Ok(value)
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), EngineError> {
    require_string(config, "data", "prices_dir")?;
    Ok(())
}

fn validate_market(config: &dyn ConfigPort) -> Result<(), EngineError> {
    let benchmark = require_string(config, "market", "benchmark")?;
    let lead = config.get_string("market", "lead");
    if lead.is_some_and(|l| l.trim().eq_ignore_ascii_case(benchmark.trim())) {
        return Err(invalid("market", "lead", "lead must differ from benchmark"));
    }
    Ok(())
}

fn validate_indicators(config: &dyn ConfigPort) -> Result<(), EngineError> {
    let short = positive_int(config, "indicators", "mom_short", 5)?;
    let mid = positive_int(config, "indicators", "mom_mid", 20)?;
    let long = positive_int(config, "indicators", "mom_long", 60)?;
    if !(short < mid && mid < long) {
        return Err(invalid(
            "indicators",
            "mom_mid",
            "momentum windows must satisfy mom_short < mom_mid < mom_long",
        ));
    }
    positive_int(config, "indicators", "rsi_period", 14)?;
    positive_int(config, "indicators", "atr_period", 14)?;
    positive_int(config, "indicators", "turnover_window", 20)?;
    let trend_short = positive_int(config, "indicators", "trend_short", 5)?;
    let trend_long = positive_int(config, "indicators", "trend_long", 60)?;
    if trend_short >= trend_long {
        return Err(invalid(
            "indicators",
            "trend_short",
            "trend_short must be shorter than trend_long",
        ));
    }
    Ok(())
}

fn validate_regime(config: &dyn ConfigPort) -> Result<(), EngineError> {
    let short = positive_int(config, "regime", "short_window", 20)?;
    let long = positive_int(config, "regime", "long_window", 60)?;
    if short >= long {
        return Err(invalid(
            "regime",
            "short_window",
            "short_window must be shorter than long_window",
        ));
    }
    let margin = config.get_double("regime", "margin", 0.01);
    if !(0.0..1.0).contains(&margin) {
        return Err(invalid("regime", "margin", "margin must be in [0, 1)"));
    }
    Ok(())
}

fn validate_circuit_breaker(config: &dyn ConfigPort) -> Result<(), EngineError> {
    let cap = config.get_int("circuit_breaker", "cap", 60);
    if !(0..=100).contains(&cap) {
        return Err(invalid("circuit_breaker", "cap", "cap must be between 0 and 100"));
    }
    let threshold = config.get_double("circuit_breaker", "lead_threshold", -2.0);
    if !threshold.is_finite() || threshold > 0.0 {
        return Err(invalid(
            "circuit_breaker",
            "lead_threshold",
            "lead_threshold must be zero or negative",
        ));
    }
    Ok(())
}

fn validate_sentiment(config: &dyn ConfigPort) -> Result<(), EngineError> {
    positive_int(config, "sentiment", "news_max", 3)?;
    let confidence = config.get_double("sentiment", "neutral_confidence", 0.55);
    if !(0.0..=1.0).contains(&confidence) {
        return Err(invalid(
            "sentiment",
            "neutral_confidence",
            "neutral_confidence must be between 0 and 1",
        ));
    }
    let decay = config.get_double("sentiment", "decay_rate", 0.2);
    if !decay.is_finite() || decay < 0.0 {
        return Err(invalid("sentiment", "decay_rate", "decay_rate must be non-negative"));
    }
    Ok(())
}

fn validate_backtest(config: &dyn ConfigPort) -> Result<(), EngineError> {
    positive_int(config, "backtest", "horizon", 5)?;
    let threshold = config.get_int("backtest", "buy_threshold", 70);
    if !(0..=100).contains(&threshold) {
        return Err(invalid(
            "backtest",
            "buy_threshold",
            "buy_threshold must be between 0 and 100",
        ));
    }
    Ok(())
}

fn validate_recommend(config: &dyn ConfigPort) -> Result<(), EngineError> {
    if let Some(name) = config.get_string("recommend", "strategy") {
        resolve_strategy(&name)
            .map_err(|_| invalid("recommend", "strategy", format!("unknown strategy '{name}'")))?;
    }
    positive_int(config, "recommend", "top_n", 5)?;
    positive_int(config, "recommend", "timeout_secs", 30)?;
    Ok(())
}

fn validate_universe(config: &dyn ConfigPort) -> Result<(), EngineError> {
    if let Some(codes) = config.get_string("universe", "codes") {
        parse_codes(&codes)?;
    }
    let min_turnover = config.get_double("universe", "min_turnover", 0.0);
    if !min_turnover.is_finite() || min_turnover < 0.0 {
        return Err(invalid(
            "universe",
            "min_turnover",
            "min_turnover must be non-negative",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapConfig(HashMap<(String, String), String>);

    impl MapConfig {
        fn new(entries: &[(&str, &str, &str)]) -> Self {
            let mut map = HashMap::new();
            for (section, key, value) in entries {
                map.insert((section.to_string(), key.to_string()), value.to_string());
            }
            MapConfig(map)
        }

        fn valid() -> Self {
            Self::new(&[("data", "prices_dir", "data/prices"), ("market", "benchmark", "KOSPI")])
        }

        fn with(mut self, section: &str, key: &str, value: &str) -> Self {
            self.0.insert((section.to_string(), key.to_string()), value.to_string());
            self
        }
    }

    impl ConfigPort for MapConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            self.0.get(&(section.to_string(), key.to_string())).cloned()
        }

        fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }

        fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }

        fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }
    }

    fn invalid_key(result: Result<(), EngineError>) -> Option<(String, String)> {
        match result {
            Err(EngineError::ConfigInvalid { section, key, .. }) => Some((section, key)),
            _ => None,
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&MapConfig::valid()).is_ok());
    }

    #[test]
    fn missing_benchmark() {
        let config = MapConfig::new(&[("data", "prices_dir", "data")]);
        assert!(matches!(
            validate_config(&config),
            Err(EngineError::ConfigMissing { key, .. }) if key == "benchmark"
        ));
    }

    #[test]
    fn missing_prices_dir() {
        let config = MapConfig::new(&[("market", "benchmark", "KOSPI")]);
        assert!(matches!(
            validate_config(&config),
            Err(EngineError::ConfigMissing { key, .. }) if key == "prices_dir"
        ));
    }

    #[test]
    fn lead_equal_to_benchmark() {
        let config = MapConfig::valid().with("market", "lead", "kospi");
        assert_eq!(
            invalid_key(validate_config(&config)),
            Some(("market".into(), "lead".into()))
        );
    }

    #[test]
    fn momentum_windows_must_increase() {
        let config = MapConfig::valid().with("indicators", "mom_mid", "80");
        assert_eq!(
            invalid_key(validate_config(&config)),
            Some(("indicators".into(), "mom_mid".into()))
        );
    }

    #[test]
    fn zero_window_rejected() {
        let config = MapConfig::valid().with("indicators", "rsi_period", "0");
        assert_eq!(
            invalid_key(validate_config(&config)),
            Some(("indicators".into(), "rsi_period".into()))
        );
    }

    #[test]
    fn regime_windows_ordered() {
        let config = MapConfig::valid().with("regime", "short_window", "60");
        assert_eq!(
            invalid_key(validate_config(&config)),
            Some(("regime".into(), "short_window".into()))
        );
    }

    #[test]
    fn margin_out_of_range() {
        let config = MapConfig::valid().with("regime", "margin", "1.5");
        assert_eq!(
            invalid_key(validate_config(&config)),
            Some(("regime".into(), "margin".into()))
        );
    }

    #[test]
    fn cap_above_100() {
        let config = MapConfig::valid().with("circuit_breaker", "cap", "120");
        assert_eq!(
            invalid_key(validate_config(&config)),
            Some(("circuit_breaker".into(), "cap".into()))
        );
    }

    #[test]
    fn positive_lead_threshold_rejected() {
        let config = MapConfig::valid().with("circuit_breaker", "lead_threshold", "1.0");
        assert_eq!(
            invalid_key(validate_config(&config)),
            Some(("circuit_breaker".into(), "lead_threshold".into()))
        );
    }

    #[test]
    fn unknown_strategy_rejected() {
        let config = MapConfig::valid().with("recommend", "strategy", "scalper");
        assert_eq!(
            invalid_key(validate_config(&config)),
            Some(("recommend".into(), "strategy".into()))
        );
    }

    #[test]
    fn alias_strategy_accepted() {
        let config = MapConfig::valid().with("recommend", "strategy", "long_term_trader");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn buy_threshold_range() {
        let config = MapConfig::valid().with("backtest", "buy_threshold", "101");
        assert_eq!(
            invalid_key(validate_config(&config)),
            Some(("backtest".into(), "buy_threshold".into()))
        );
    }

    #[test]
    fn duplicate_universe_codes() {
        let config = MapConfig::valid().with("universe", "codes", "005930,005930");
        assert_eq!(
            invalid_key(validate_config(&config)),
            Some(("universe".into(), "codes".into()))
        );
    }

    #[test]
    fn negative_min_turnover() {
        let config = MapConfig::valid().with("universe", "min_turnover", "-1");
        assert_eq!(
            invalid_key(validate_config(&config)),
            Some(("universe".into(), "min_turnover".into()))
        );
    }
}
