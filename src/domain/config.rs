//! Typed configuration built from a validated `ConfigPort`.

use crate::domain::backtest::BacktestConfig;
use crate::domain::circuit_breaker::CircuitBreakerConfig;
use crate::domain::config_validation::validate_config;
use crate::domain::error::EngineError;
use crate::domain::indicator::IndicatorConfig;
use crate::domain::regime::RegimeConfig;
use crate::domain::sentiment::SentimentConfig;
use crate::domain::universe::parse_codes;
use crate::ports::config_port::ConfigPort;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub prices_dir: String,
    pub sentiment_file: Option<String>,
    pub history_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketConfig {
    pub benchmark: String,
    /// Bellwether whose short momentum gates the circuit breaker.
    pub lead: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendConfig {
    pub strategy: String,
    pub top_n: usize,
    pub timeout: Duration,
    pub parallel: bool,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            strategy: "default".to_string(),
            top_n: 5,
            timeout: Duration::from_secs(30),
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UniverseConfig {
    pub codes: Vec<String>,
    pub min_turnover: f64,
}

/// Everything the engine itself needs.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub market: MarketConfig,
    pub indicators: IndicatorConfig,
    pub regime: RegimeConfig,
    pub breaker: CircuitBreakerConfig,
    pub recommend: RecommendConfig,
}

impl EngineConfig {
    /// Default windows and thresholds for the given benchmark.
    pub fn for_benchmark(benchmark: &str) -> Self {
        Self {
            market: MarketConfig {
                benchmark: benchmark.to_string(),
                lead: None,
            },
            indicators: IndicatorConfig::default(),
            regime: RegimeConfig::default(),
            breaker: CircuitBreakerConfig::default(),
            recommend: RecommendConfig::default(),
        }
    }

    pub fn with_lead(mut self, lead: &str) -> Self {
        self.market.lead = Some(lead.to_string());
        self
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, EngineError> {
        validate_config(config)?;
        Ok(read_engine(config))
    }
}

/// Full application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data: DataConfig,
    pub engine: EngineConfig,
    pub sentiment: SentimentConfig,
    pub backtest: BacktestConfig,
    pub universe: UniverseConfig,
}

impl AppConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, EngineError> {
        validate_config(config)?;

        let data = DataConfig {
            prices_dir: string(config, "data", "prices_dir").unwrap_or_default(),
            sentiment_file: string(config, "data", "sentiment_file"),
            history_file: string(config, "data", "history_file"),
        };

        let sentiment = SentimentConfig {
            news_max: usize_of(config, "sentiment", "news_max", 3),
            neutral_confidence: config.get_double("sentiment", "neutral_confidence", 0.55),
            decay_rate: config.get_double("sentiment", "decay_rate", 0.2),
        };

        let backtest = BacktestConfig {
            horizon: usize_of(config, "backtest", "horizon", 5),
            buy_threshold: config.get_int("backtest", "buy_threshold", 70) as u8,
            with_news: config.get_bool("backtest", "with_news", true),
        };

        let codes = match string(config, "universe", "codes") {
            Some(list) => parse_codes(&list)?,
            None => Vec::new(),
        };
        let universe = UniverseConfig {
            codes,
            min_turnover: config.get_double("universe", "min_turnover", 0.0),
        };

        Ok(Self {
            data,
            engine: read_engine(config),
            sentiment,
            backtest,
            universe,
        })
    }
}

fn string(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn usize_of(config: &dyn ConfigPort, section: &str, key: &str, default: i64) -> usize {
    config.get_int(section, key, default).max(0) as usize
}

fn read_engine(config: &dyn ConfigPort) -> EngineConfig {
    let market = MarketConfig {
        benchmark: string(config, "market", "benchmark").unwrap_or_default(),
        lead: string(config, "market", "lead"),
    };

    let indicators = IndicatorConfig {
        mom_short: usize_of(config, "indicators", "mom_short", 5),
        mom_mid: usize_of(config, "indicators", "mom_mid", 20),
        mom_long: usize_of(config, "indicators", "mom_long", 60),
        rsi_period: usize_of(config, "indicators", "rsi_period", 14),
        atr_period: usize_of(config, "indicators", "atr_period", 14),
        turnover_window: usize_of(config, "indicators", "turnover_window", 20),
        trend_short: usize_of(config, "indicators", "trend_short", 5),
        trend_long: usize_of(config, "indicators", "trend_long", 60),
    };

    let regime = RegimeConfig {
        short_window: usize_of(config, "regime", "short_window", 20),
        long_window: usize_of(config, "regime", "long_window", 60),
        margin: config.get_double("regime", "margin", 0.01),
    };

    let breaker = CircuitBreakerConfig {
        cap: config.get_int("circuit_breaker", "cap", 60).clamp(0, 100) as u8,
        lead_threshold: config.get_double("circuit_breaker", "lead_threshold", -2.0),
    };

    let recommend = RecommendConfig {
        strategy: string(config, "recommend", "strategy").unwrap_or_else(|| "default".to_string()),
        top_n: usize_of(config, "recommend", "top_n", 5),
        timeout: Duration::from_secs(usize_of(config, "recommend", "timeout_secs", 30) as u64),
        parallel: config.get_bool("recommend", "parallel", true),
    };

    EngineConfig {
        market,
        indicators,
        regime,
        breaker,
        recommend,
    }
}
