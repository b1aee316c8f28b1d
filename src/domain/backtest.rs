//! Backtest simulator.
//!
//! Replays the live pipeline as of a target date and scores the decision
//! against realized forward prices. The decision sees only data on or
//! before the target date; the realized return sees only bars strictly
//! after it.

use crate::domain::engine::{InstrumentFailure, MarketContext, RecommendationEngine};
use crate::domain::error::EngineError;
use crate::domain::regime::MarketRegime;
use crate::domain::strategy::{StrategyProfile, resolve_strategy};
use crate::domain::universe::{SkippedCode, UniverseFilter, filter_universe};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    /// Holding horizon in trading days.
    pub horizon: usize,
    /// Scores at or above this are a buy.
    pub buy_threshold: u8,
    /// When false the sentiment collaborator is not consulted.
    pub with_news: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            horizon: 5,
            buy_threshold: 70,
            with_news: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Buy,
    Wait,
}

impl Decision {
    pub fn from_score(score: u8, buy_threshold: u8) -> Self {
        if score >= buy_threshold {
            Decision::Buy
        } else {
            Decision::Wait
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Buy => write!(f, "buy"),
            Decision::Wait => write!(f, "wait"),
        }
    }
}

/// Waiting dodged a loss, or buying caught a non-negative return.
pub fn is_defended(decision: Decision, realized_return: f64) -> bool {
    match decision {
        Decision::Wait => realized_return < 0.0,
        Decision::Buy => realized_return >= 0.0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub code: String,
    pub target_date: NaiveDate,
    /// Date of the last bar on or before the target date.
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub score: u8,
    pub regime: MarketRegime,
    pub decision: Decision,
    pub entry_close: f64,
    pub exit_close: f64,
    pub realized_return: f64,
    pub defended: bool,
}

/// Outcome of one target date.
#[derive(Debug)]
pub struct BacktestReport {
    pub target_date: NaiveDate,
    pub regime: MarketRegime,
    pub results: Vec<BacktestResult>,
    pub failures: Vec<InstrumentFailure>,
    /// Codes the turnover screen dropped before scoring.
    pub skipped: Vec<SkippedCode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestSummary {
    pub count: usize,
    pub buys: usize,
    pub defended: usize,
    pub average_return: f64,
    /// Mean realized return of buy decisions, if there were any.
    pub average_buy_return: Option<f64>,
    pub defense_rate: f64,
}

impl BacktestSummary {
    pub fn from_results<'r>(results: impl IntoIterator<Item = &'r BacktestResult>) -> Self {
        let mut count = 0usize;
        let mut buys = 0usize;
        let mut defended = 0usize;
        let mut total_return = 0.0;
        let mut total_buy_return = 0.0;

        for r in results {
            count += 1;
            total_return += r.realized_return;
            if r.decision == Decision::Buy {
                buys += 1;
                total_buy_return += r.realized_return;
            }
            if r.defended {
                defended += 1;
            }
        }

        let (average_return, defense_rate) = if count > 0 {
            (total_return / count as f64, defended as f64 / count as f64)
        } else {
            (0.0, 0.0)
        };

        Self {
            count,
            buys,
            defended,
            average_return,
            average_buy_return: (buys > 0).then(|| total_buy_return / buys as f64),
            defense_rate,
        }
    }
}

pub struct Backtester<'e, 'a> {
    engine: &'e RecommendationEngine<'a>,
    config: BacktestConfig,
    universe_filter: Option<UniverseFilter>,
}

impl<'e, 'a> Backtester<'e, 'a> {
    pub fn new(engine: &'e RecommendationEngine<'a>, config: BacktestConfig) -> Self {
        Self {
            engine,
            config,
            universe_filter: None,
        }
    }

    /// Screens the universe on each target date the way a live run would,
    /// with that date's regime and data.
    pub fn with_universe_filter(mut self, filter: UniverseFilter) -> Self {
        self.universe_filter = Some(filter);
        self
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Fails closed when a collaborator cannot restrict itself to a cutoff.
    fn check_collaborators(&self) -> Result<(), EngineError> {
        let prices = self.engine.prices();
        if !prices.honors_cutoff() {
            return Err(EngineError::cutoff_unsupported(prices.source_name()));
        }
        let sentiment = self.engine.sentiment();
        if self.config.with_news && !sentiment.honors_cutoff() {
            return Err(EngineError::cutoff_unsupported(sentiment.source_name()));
        }
        Ok(())
    }

    fn check_horizon(horizon: usize) -> Result<(), EngineError> {
        if horizon == 0 {
            return Err(EngineError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "horizon".to_string(),
                reason: "horizon must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Backtests every code of `universe` at `target_date`.
    pub fn backtest(
        &self,
        universe: &[String],
        target_date: NaiveDate,
        horizon: usize,
        strategy: &str,
    ) -> Result<BacktestReport, EngineError> {
        Self::check_horizon(horizon)?;
        self.check_collaborators()?;
        let profile = resolve_strategy(strategy)?;
        self.run_date(universe, target_date, horizon, profile)
    }

    /// Backtests every benchmark trading date in `[start, end]`.
    ///
    /// Dates run in parallel; each one reads only data up to its own cutoff.
    pub fn backtest_range(
        &self,
        universe: &[String],
        start: NaiveDate,
        end: NaiveDate,
        horizon: usize,
        strategy: &str,
    ) -> Result<Vec<BacktestReport>, EngineError> {
        Self::check_horizon(horizon)?;
        self.check_collaborators()?;
        let profile = resolve_strategy(strategy)?;

        let benchmark = self
            .engine
            .history(&self.engine.config().market.benchmark, end)?;
        let dates: Vec<NaiveDate> = benchmark
            .bars()
            .iter()
            .map(|b| b.date)
            .filter(|d| *d >= start)
            .collect();
        if dates.is_empty() {
            return Err(EngineError::NoData {
                code: benchmark.code().to_string(),
            });
        }
        tracing::info!(%start, %end, dates = dates.len(), "running backtest range");

        let run = |date: &NaiveDate| self.run_date(universe, *date, horizon, profile);
        if self.engine.config().recommend.parallel {
            dates.par_iter().map(run).collect()
        } else {
            dates.iter().map(run).collect()
        }
    }

    fn run_date(
        &self,
        universe: &[String],
        target_date: NaiveDate,
        horizon: usize,
        profile: &StrategyProfile,
    ) -> Result<BacktestReport, EngineError> {
        let market = self.engine.market_context(target_date)?;

        let (candidates, skipped) = match &self.universe_filter {
            Some(filter) => {
                let selection = filter_universe(
                    self.engine.prices(),
                    universe.iter().cloned(),
                    target_date,
                    filter,
                    market.regime.regime,
                );
                (selection.codes, selection.skipped)
            }
            None => (universe.to_vec(), Vec::new()),
        };

        let evaluate = |code: &String| {
            (
                code.clone(),
                self.evaluate(code, target_date, horizon, profile, &market),
            )
        };
        let outcomes: Vec<(String, Result<BacktestResult, EngineError>)> =
            if self.engine.config().recommend.parallel {
                candidates.par_iter().map(evaluate).collect()
            } else {
                candidates.iter().map(evaluate).collect()
            };

        let mut results = Vec::new();
        let mut failures = Vec::new();
        for (code, outcome) in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(error) => {
                    tracing::warn!(%code, %target_date, %error, "backtest instrument failed");
                    failures.push(InstrumentFailure { code, error });
                }
            }
        }

        tracing::debug!(
            %target_date,
            regime = %market.regime.regime,
            evaluated = results.len(),
            failed = failures.len(),
            skipped = skipped.len(),
            "backtested date"
        );

        Ok(BacktestReport {
            target_date,
            regime: market.regime.regime,
            results,
            failures,
            skipped,
        })
    }

    fn evaluate(
        &self,
        code: &str,
        target_date: NaiveDate,
        horizon: usize,
        profile: &StrategyProfile,
        market: &MarketContext,
    ) -> Result<BacktestResult, EngineError> {
        let breakdown =
            self.engine
                .score_in_context(code, target_date, profile, market, self.config.with_news)?;
        let decision = Decision::from_score(breakdown.final_score, self.config.buy_threshold);

        let forward = self
            .engine
            .prices()
            .fetch_forward(code, target_date, horizon)?;
        if let Some(bar) = forward.iter().find(|b| b.date <= target_date) {
            return Err(EngineError::InvalidData {
                code: code.to_string(),
                reason: format!("forward bar {} is not after {}", bar.date, target_date),
            });
        }
        let Some(exit) = forward.get(horizon - 1) else {
            return Err(EngineError::InsufficientHistory {
                code: code.to_string(),
                bars: forward.len(),
                minimum: horizon,
            });
        };

        let realized_return = exit.close / breakdown.close - 1.0;
        Ok(BacktestResult {
            code: code.to_string(),
            target_date,
            entry_date: breakdown.as_of,
            exit_date: exit.date,
            score: breakdown.final_score,
            regime: breakdown.regime,
            decision,
            entry_close: breakdown.close,
            exit_close: exit.close,
            realized_return,
            defended: is_defended(decision, realized_return),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn result(decision: Decision, realized_return: f64) -> BacktestResult {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        BacktestResult {
            code: "005930".to_string(),
            target_date: date,
            entry_date: date,
            exit_date: date + chrono::Duration::days(7),
            score: if decision == Decision::Buy { 80 } else { 40 },
            regime: MarketRegime::Neutral,
            decision,
            entry_close: 100.0,
            exit_close: 100.0 * (1.0 + realized_return),
            realized_return,
            defended: is_defended(decision, realized_return),
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        assert_eq!(Decision::from_score(70, 70), Decision::Buy);
        assert_eq!(Decision::from_score(69, 70), Decision::Wait);
        assert_eq!(Decision::Buy.to_string(), "buy");
    }

    #[test]
    fn buy_then_loss_is_not_defended() {
        assert!(!is_defended(Decision::Buy, -0.02));
    }

    #[test]
    fn defended_cases() {
        assert!(is_defended(Decision::Buy, 0.0));
        assert!(is_defended(Decision::Buy, 0.03));
        assert!(is_defended(Decision::Wait, -0.01));
        assert!(!is_defended(Decision::Wait, 0.0));
        assert!(!is_defended(Decision::Wait, 0.05));
    }

    #[test]
    fn summary_folds_results() {
        let results = vec![
            result(Decision::Buy, 0.04),
            result(Decision::Buy, -0.02),
            result(Decision::Wait, -0.03),
            result(Decision::Wait, 0.01),
        ];
        let summary = BacktestSummary::from_results(&results);
        assert_eq!(summary.count, 4);
        assert_eq!(summary.buys, 2);
        assert_eq!(summary.defended, 2);
        assert_relative_eq!(summary.average_return, 0.0, epsilon = 1e-12);
        assert_relative_eq!(summary.average_buy_return.unwrap(), 0.01, epsilon = 1e-12);
        assert_relative_eq!(summary.defense_rate, 0.5);
    }

    #[test]
    fn empty_summary() {
        let summary = BacktestSummary::from_results(&[]);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.average_buy_return, None);
        assert_eq!(summary.defense_rate, 0.0);
    }

    #[test]
    fn summary_without_buys() {
        let results = vec![result(Decision::Wait, -0.01)];
        let summary = BacktestSummary::from_results(&results);
        assert_eq!(summary.average_buy_return, None);
        assert_relative_eq!(summary.defense_rate, 1.0);
    }
}
