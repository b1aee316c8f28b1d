//! Recommendation engine: the live scoring pipeline.
//!
//! Collaborators are reached through cutoff-aware ports and everything they
//! return is checked against the requested as-of date before use. The market
//! context (regime and lead momentum) is computed once per as-of date and
//! shared read-only by every instrument scored for that date.

use crate::domain::config::EngineConfig;
use crate::domain::error::EngineError;
use crate::domain::indicator::{compute_indicator_set, momentum::calculate_momentum};
use crate::domain::price_series::PriceSeries;
use crate::domain::regime::{RegimeSnapshot, classify_regime};
use crate::domain::scoring::{ScoreBreakdown, score_indicators};
use crate::domain::sentiment::SentimentScore;
use crate::domain::strategy::{StrategyProfile, resolve_strategy};
use crate::ports::data_port::DataPort;
use crate::ports::sentiment_port::SentimentPort;
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Market-wide inputs shared by every instrument on one as-of date.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketContext {
    pub regime: RegimeSnapshot,
    /// Short-window momentum of the lead instrument, when one is configured.
    pub lead_momentum: Option<f64>,
}

/// A per-instrument failure inside a batch.
#[derive(Debug)]
pub struct InstrumentFailure {
    pub code: String,
    pub error: EngineError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pick {
    pub rank: usize,
    /// Equal weight 1/N across the selected instruments.
    pub weight: f64,
    pub breakdown: ScoreBreakdown,
}

/// Result of scoring a universe on one date.
#[derive(Debug)]
pub struct RecommendationBatch {
    pub as_of: NaiveDate,
    pub strategy: &'static str,
    pub market: Arc<MarketContext>,
    /// Every successful score, best first; ties broken by code.
    pub ranked: Vec<ScoreBreakdown>,
    /// The top-N of `ranked` with portfolio weights.
    pub picks: Vec<Pick>,
    pub failures: Vec<InstrumentFailure>,
}

pub struct RecommendationEngine<'a> {
    prices: &'a dyn DataPort,
    sentiment: &'a dyn SentimentPort,
    config: EngineConfig,
    market_cache: Mutex<HashMap<NaiveDate, Arc<MarketContext>>>,
}

impl<'a> RecommendationEngine<'a> {
    pub fn new(
        prices: &'a dyn DataPort,
        sentiment: &'a dyn SentimentPort,
        config: EngineConfig,
    ) -> Self {
        Self {
            prices,
            sentiment,
            config,
            market_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn prices(&self) -> &dyn DataPort {
        self.prices
    }

    pub fn sentiment(&self) -> &dyn SentimentPort {
        self.sentiment
    }

    /// Price history for `code` up to `as_of`, checked against the cutoff.
    pub fn history(&self, code: &str, as_of: NaiveDate) -> Result<PriceSeries, EngineError> {
        let bars = self.prices.fetch_history(code, as_of)?;
        let series = PriceSeries::new(code, bars)?;
        series.ensure_within(as_of, self.prices.source_name())?;
        Ok(series)
    }

    fn sentiment_score(
        &self,
        code: &str,
        as_of: NaiveDate,
        with_news: bool,
    ) -> Result<SentimentScore, EngineError> {
        if !with_news {
            return Ok(SentimentScore::neutral());
        }
        let snapshot = self.sentiment.sentiment_as_of(code, as_of)?;
        snapshot.ensure_within(as_of, self.sentiment.source_name())?;
        Ok(snapshot.score)
    }

    /// Classifies the market regime from the configured benchmark.
    pub fn classify_regime(&self, as_of: NaiveDate) -> Result<RegimeSnapshot, EngineError> {
        let benchmark = self.history(&self.config.market.benchmark, as_of)?;
        classify_regime(&benchmark, as_of, &self.config.regime)
    }

    fn lead_momentum(&self, as_of: NaiveDate) -> Result<Option<f64>, EngineError> {
        let Some(lead) = self.config.market.lead.as_deref() else {
            return Ok(None);
        };
        let series = self.history(lead, as_of)?;
        let window = self.config.indicators.mom_short;
        series.require(window + 1)?;
        let momentum = calculate_momentum(series.bars(), window).latest().ok_or_else(|| {
            EngineError::InsufficientHistory {
                code: lead.to_string(),
                bars: series.len(),
                minimum: window + 1,
            }
        })?;
        Ok(Some(momentum))
    }

    /// Regime and lead momentum for `as_of`, memoized per date.
    ///
    /// Failures are not cached.
    pub fn market_context(&self, as_of: NaiveDate) -> Result<Arc<MarketContext>, EngineError> {
        if let Some(ctx) = self
            .market_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&as_of)
        {
            tracing::debug!(%as_of, "market context cache hit");
            return Ok(Arc::clone(ctx));
        }

        let ctx = Arc::new(MarketContext {
            regime: self.classify_regime(as_of)?,
            lead_momentum: self.lead_momentum(as_of)?,
        });

        let mut cache = self
            .market_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = cache.entry(as_of).or_insert(ctx);
        Ok(Arc::clone(entry))
    }

    /// Scores one instrument against an already computed market context.
    pub fn score_in_context(
        &self,
        code: &str,
        as_of: NaiveDate,
        profile: &StrategyProfile,
        market: &MarketContext,
        with_news: bool,
    ) -> Result<ScoreBreakdown, EngineError> {
        let series = self.history(code, as_of)?;
        let indicators = compute_indicator_set(&series, &self.config.indicators)?;
        let sentiment = self.sentiment_score(code, as_of, with_news)?;
        score_indicators(
            &indicators,
            sentiment,
            profile,
            market.regime.regime,
            market.lead_momentum,
            &self.config.breaker,
        )
    }

    /// Scores one instrument as of a date with the named strategy.
    pub fn score(
        &self,
        code: &str,
        as_of: NaiveDate,
        strategy: &str,
    ) -> Result<ScoreBreakdown, EngineError> {
        let profile = resolve_strategy(strategy)?;
        let market = self.market_context(as_of)?;
        self.score_in_context(code, as_of, profile, &market, true)
    }

    /// Scores every code, ranks the successes and selects the top N.
    ///
    /// Regime failure aborts the batch; per-instrument failures are
    /// reported in `failures`. Workers check the deadline before scoring;
    /// if any instrument was left unscored, the partial results are
    /// discarded and the batch fails with `Timeout`. A batch whose last
    /// worker finishes after the deadline still completes.
    pub fn score_universe(
        &self,
        codes: &[String],
        as_of: NaiveDate,
        strategy: &str,
    ) -> Result<RecommendationBatch, EngineError> {
        let profile = resolve_strategy(strategy)?;
        let market = self.market_context(as_of)?;
        let timeout = self.config.recommend.timeout;
        let started = Instant::now();

        let score_one = |code: &String| -> Option<(String, Result<ScoreBreakdown, EngineError>)> {
            if started.elapsed() >= timeout {
                return None;
            }
            let result = self.score_in_context(code, as_of, profile, &market, true);
            Some((code.clone(), result))
        };

        let outcomes: Vec<Option<(String, Result<ScoreBreakdown, EngineError>)>> =
            if self.config.recommend.parallel {
                codes.par_iter().map(score_one).collect()
            } else {
                codes.iter().map(score_one).collect()
            };

        let elapsed = started.elapsed();
        if outcomes.iter().any(Option::is_none) {
            tracing::warn!(elapsed_ms = elapsed.as_millis(), "batch deadline exceeded");
            return Err(EngineError::Timeout {
                elapsed_ms: elapsed.as_millis(),
            });
        }

        let mut ranked = Vec::new();
        let mut failures = Vec::new();
        for (code, result) in outcomes.into_iter().flatten() {
            match result {
                Ok(breakdown) => ranked.push(breakdown),
                Err(error) => {
                    tracing::warn!(%code, %error, "instrument failed");
                    failures.push(InstrumentFailure { code, error });
                }
            }
        }

        rank(&mut ranked);
        let picks = select_top(&ranked, self.config.recommend.top_n);

        tracing::info!(
            %as_of,
            strategy = profile.name,
            regime = %market.regime.regime,
            scored = ranked.len(),
            failed = failures.len(),
            "scored universe"
        );

        Ok(RecommendationBatch {
            as_of,
            strategy: profile.name,
            market,
            ranked,
            picks,
            failures,
        })
    }
}

/// Sorts by final score descending, then by code.
pub fn rank(breakdowns: &mut [ScoreBreakdown]) {
    breakdowns.sort_by(|a, b| {
        b.final_score
            .cmp(&a.final_score)
            .then_with(|| a.code.cmp(&b.code))
    });
}

/// First `top_n` of an already ranked list, equally weighted.
pub fn select_top(ranked: &[ScoreBreakdown], top_n: usize) -> Vec<Pick> {
    let n = ranked.len().min(top_n);
    ranked
        .iter()
        .take(n)
        .enumerate()
        .map(|(i, breakdown)| Pick {
            rank: i + 1,
            weight: 1.0 / n as f64,
            breakdown: breakdown.clone(),
        })
        .collect()
}
