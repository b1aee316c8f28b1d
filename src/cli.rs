//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_history_adapter::CsvHistoryAdapter;
use crate::adapters::csv_sentiment_adapter::CsvSentimentAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::neutral_sentiment_adapter::NeutralSentiment;
use crate::domain::backtest::{BacktestReport, BacktestResult, BacktestSummary, Backtester};
use crate::domain::config::AppConfig;
use crate::domain::config_validation::validate_config;
use crate::domain::engine::{RecommendationBatch, RecommendationEngine};
use crate::domain::error::EngineError;
use crate::domain::scoring::ScoreBreakdown;
use crate::domain::strategy::{available_strategies, resolve_strategy};
use crate::domain::universe::{SkippedCode, UniverseFilter, parse_codes, select_universe};
use crate::ports::data_port::DataPort;
use crate::ports::history_port::{HistoryPort, HistoryRecord};
use crate::ports::sentiment_port::SentimentPort;

#[derive(Parser, Debug)]
#[command(name = "equiscore", about = "Multi-factor equity scoring and backtesting")]
pub struct Cli {
    /// Log at DEBUG instead of INFO
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score one instrument
    Score {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: String,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        strategy: Option<String>,
    },
    /// Classify the market regime
    Regime {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Score and rank the universe
    Recommend {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        strategy: Option<String>,
        #[arg(long)]
        codes: Option<String>,
        #[arg(long)]
        top_n: Option<usize>,
    },
    /// Replay decisions against realized forward returns
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Single target date
        #[arg(long, value_parser = parse_date, conflicts_with_all = ["start", "end"])]
        date: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date, requires = "end")]
        start: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date, requires = "start")]
        end: Option<NaiveDate>,
        #[arg(long)]
        horizon: Option<usize>,
        #[arg(short, long)]
        strategy: Option<String>,
        #[arg(long)]
        codes: Option<String>,
        /// Write per-instrument results as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List instruments with price files
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List the built-in strategies
    Strategies,
}

pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Score {
            config,
            code,
            date,
            strategy,
        } => run_score(&config, &code, date, strategy.as_deref()),
        Command::Regime { config, date } => run_regime(&config, date),
        Command::Recommend {
            config,
            date,
            strategy,
            codes,
            top_n,
        } => run_recommend(&config, date, strategy.as_deref(), codes.as_deref(), top_n),
        Command::Backtest {
            config,
            date,
            start,
            end,
            horizon,
            strategy,
            codes,
            output,
        } => run_backtest(
            &config,
            BacktestArgs {
                date,
                range: start.zip(end),
                horizon,
                strategy: strategy.as_deref(),
                codes: codes.as_deref(),
                output: output.as_deref(),
            },
        ),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config } => run_list_symbols(&config),
        Command::Strategies => {
            run_strategies();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<AppConfig, EngineError> {
    tracing::debug!(path = %path.display(), "loading config");
    let adapter = FileConfigAdapter::from_file(path)?;
    AppConfig::from_config(&adapter)
}

/// Collaborators wired from configuration.
pub struct Collaborators {
    pub config: AppConfig,
    pub prices: CsvAdapter,
    pub sentiment: Box<dyn SentimentPort>,
}

impl Collaborators {
    pub fn from_config(config: AppConfig) -> Result<Self, EngineError> {
        let prices = CsvAdapter::new(PathBuf::from(&config.data.prices_dir));
        let sentiment: Box<dyn SentimentPort> = match &config.data.sentiment_file {
            Some(path) => Box::new(CsvSentimentAdapter::from_path(path, config.sentiment.clone())?),
            None => Box::new(NeutralSentiment),
        };
        Ok(Self {
            config,
            prices,
            sentiment,
        })
    }

    pub fn engine(&self) -> RecommendationEngine<'_> {
        RecommendationEngine::new(
            &self.prices,
            self.sentiment.as_ref(),
            self.config.engine.clone(),
        )
    }

    /// Turnover screen shared by live runs and backtests.
    pub fn universe_filter(&self) -> UniverseFilter {
        UniverseFilter {
            window: self.config.engine.indicators.turnover_window,
            min_turnover: self.config.universe.min_turnover,
        }
    }

    /// Explicit codes, then configured codes, then every price file except the benchmark.
    pub fn universe(&self, codes_override: Option<&str>) -> Result<Vec<String>, EngineError> {
        if let Some(list) = codes_override {
            return Ok(parse_codes(list)?);
        }
        if !self.config.universe.codes.is_empty() {
            return Ok(self.config.universe.codes.clone());
        }
        let benchmark = &self.config.engine.market.benchmark;
        Ok(self
            .prices
            .list_symbols()?
            .into_iter()
            .filter(|code| !code.eq_ignore_ascii_case(benchmark))
            .collect())
    }
}

fn open(config_path: &Path) -> Result<Collaborators, EngineError> {
    Collaborators::from_config(load_config(config_path)?)
}

/// The requested date, or the benchmark's last trading date.
pub fn resolve_as_of(
    engine: &RecommendationEngine<'_>,
    date: Option<NaiveDate>,
) -> Result<NaiveDate, EngineError> {
    match date {
        Some(d) => Ok(d),
        None => {
            let benchmark = &engine.config().market.benchmark;
            Ok(engine.history(benchmark, NaiveDate::MAX)?.last_date())
        }
    }
}

fn run_score(
    config_path: &Path,
    code: &str,
    date: Option<NaiveDate>,
    strategy: Option<&str>,
) -> Result<(), EngineError> {
    let collaborators = open(config_path)?;
    let engine = collaborators.engine();
    let as_of = resolve_as_of(&engine, date)?;
    let strategy = strategy.unwrap_or(collaborators.config.engine.recommend.strategy.as_str());

    let breakdown = engine.score(&code.to_uppercase(), as_of, strategy)?;
    print_breakdown(&breakdown);
    Ok(())
}

pub fn print_breakdown(b: &ScoreBreakdown) {
    println!(
        "{} as of {} ({}, {})",
        b.code, b.as_of, b.strategy, b.regime
    );
    println!(
        "{:<16} {:>7} {:>7} {:>8} {:>12}",
        "factor", "sub", "weight", "applied", "contribution"
    );
    for c in &b.contributions {
        println!(
            "{:<16} {:>7.1} {:>7.2} {:>8.2} {:>12.1}",
            c.factor.key(),
            c.sub_score,
            c.base_weight,
            c.applied_weight,
            c.contribution
        );
    }
    let cap = b
        .cap
        .map(|c| c.to_string())
        .unwrap_or_else(|| "none".to_string());
    println!(
        "weighted mean {:.2}, provisional {}, cap {}, final {}",
        b.weighted_mean, b.provisional_score, cap, b.final_score
    );
    for warning in &b.warnings {
        println!("warning: {warning}");
    }
}

fn run_regime(config_path: &Path, date: Option<NaiveDate>) -> Result<(), EngineError> {
    let collaborators = open(config_path)?;
    let engine = collaborators.engine();
    let as_of = resolve_as_of(&engine, date)?;

    let market = engine.market_context(as_of)?;
    let snap = &market.regime;
    println!(
        "{} as of {}: {} (short MA {:.2}, long MA {:.2})",
        snap.benchmark, snap.as_of, snap.regime, snap.short_ma, snap.long_ma
    );
    if let (Some(lead), Some(momentum)) = (&engine.config().market.lead, market.lead_momentum) {
        println!("lead {lead}: momentum {momentum:.2}%");
    }
    Ok(())
}

fn run_recommend(
    config_path: &Path,
    date: Option<NaiveDate>,
    strategy: Option<&str>,
    codes: Option<&str>,
    top_n: Option<usize>,
) -> Result<(), EngineError> {
    let mut collaborators = open(config_path)?;
    if let Some(n) = top_n {
        collaborators.config.engine.recommend.top_n = n.max(1);
    }
    let engine = collaborators.engine();
    let as_of = resolve_as_of(&engine, date)?;
    let strategy = strategy.unwrap_or(collaborators.config.engine.recommend.strategy.as_str());

    let market = engine.market_context(as_of)?;
    let candidates = collaborators.universe(codes)?;
    let filter = collaborators.universe_filter();
    let selection = select_universe(
        &collaborators.prices,
        candidates,
        as_of,
        filter.window,
        filter.min_turnover,
        market.regime.regime,
    )?;

    let batch = engine.score_universe(&selection.codes, as_of, strategy)?;
    print_batch(&batch);
    print_skipped(&selection.skipped);

    if let Some(path) = &collaborators.config.data.history_file {
        let records: Vec<HistoryRecord> = batch
            .picks
            .iter()
            .map(|p| HistoryRecord {
                as_of: batch.as_of,
                strategy: batch.strategy.to_string(),
                code: p.breakdown.code.clone(),
                score: p.breakdown.final_score,
                weight: p.weight,
                regime: p.breakdown.regime,
            })
            .collect();
        CsvHistoryAdapter::new(PathBuf::from(path)).append(&records)?;
    }
    Ok(())
}

pub fn print_batch(batch: &RecommendationBatch) {
    println!(
        "{} as of {} ({} regime)",
        batch.strategy, batch.as_of, batch.market.regime.regime
    );
    println!("{:<5} {:<10} {:>6} {:>7}", "rank", "code", "score", "weight");
    for pick in &batch.picks {
        println!(
            "{:<5} {:<10} {:>6} {:>7.3}",
            pick.rank, pick.breakdown.code, pick.breakdown.final_score, pick.weight
        );
    }
    for failure in &batch.failures {
        eprintln!("  {}: {}", failure.code, failure.error);
    }
    eprintln!(
        "{} scored, {} failed",
        batch.ranked.len(),
        batch.failures.len()
    );
}

pub fn print_skipped(skipped: &[SkippedCode]) {
    for s in skipped {
        eprintln!("  {} skipped: {}", s.code, s.reason);
    }
}

pub struct BacktestArgs<'a> {
    pub date: Option<NaiveDate>,
    pub range: Option<(NaiveDate, NaiveDate)>,
    pub horizon: Option<usize>,
    pub strategy: Option<&'a str>,
    pub codes: Option<&'a str>,
    pub output: Option<&'a Path>,
}

fn run_backtest(config_path: &Path, args: BacktestArgs<'_>) -> Result<(), EngineError> {
    let collaborators = open(config_path)?;
    let engine = collaborators.engine();
    let backtester = Backtester::new(&engine, collaborators.config.backtest.clone())
        .with_universe_filter(collaborators.universe_filter());
    let horizon = args.horizon.unwrap_or(collaborators.config.backtest.horizon);
    let strategy = args
        .strategy
        .unwrap_or(collaborators.config.engine.recommend.strategy.as_str());
    let universe = collaborators.universe(args.codes)?;

    let reports = match args.range {
        Some((start, end)) => {
            backtester.backtest_range(&universe, start, end, horizon, strategy)?
        }
        None => {
            let target = resolve_as_of(&engine, args.date)?;
            vec![backtester.backtest(&universe, target, horizon, strategy)?]
        }
    };

    print_reports(&reports);

    if let Some(path) = args.output {
        write_results(path, reports.iter().flat_map(|r| r.results.iter()))?;
        eprintln!("Results written to: {}", path.display());
    }
    Ok(())
}

pub fn print_reports(reports: &[BacktestReport]) {
    for report in reports {
        for r in &report.results {
            println!(
                "{} {:<10} {:>3} {:<4} {:>+7.2}% {}",
                r.target_date,
                r.code,
                r.score,
                r.decision.to_string(),
                r.realized_return * 100.0,
                if r.defended { "defended" } else { "-" }
            );
        }
        for failure in &report.failures {
            eprintln!("  {} {}: {}", report.target_date, failure.code, failure.error);
        }
        for s in &report.skipped {
            eprintln!("  {} {} skipped: {}", report.target_date, s.code, s.reason);
        }
    }

    let summary = BacktestSummary::from_results(reports.iter().flat_map(|r| r.results.iter()));
    eprintln!("\n=== Backtest Summary ===");
    eprintln!("Dates:            {}", reports.len());
    eprintln!("Results:          {}", summary.count);
    eprintln!("Buys:             {}", summary.buys);
    eprintln!("Average Return:   {:.2}%", summary.average_return * 100.0);
    if let Some(avg) = summary.average_buy_return {
        eprintln!("Avg Buy Return:   {:.2}%", avg * 100.0);
    }
    eprintln!("Defense Rate:     {:.1}%", summary.defense_rate * 100.0);
}

pub fn write_results<'r>(
    path: &Path,
    results: impl IntoIterator<Item = &'r BacktestResult>,
) -> Result<(), EngineError> {
    let to_err = |e: csv::Error| EngineError::Data {
        reason: format!("failed to write {}: {}", path.display(), e),
    };
    let mut wtr = csv::Writer::from_path(path).map_err(to_err)?;
    for result in results {
        wtr.serialize(result).map_err(to_err)?;
    }
    wtr.flush()?;
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), EngineError> {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = FileConfigAdapter::from_file(config_path)?;
    validate_config(&adapter)?;
    let config = AppConfig::from_config(&adapter)?;

    let strategy = resolve_strategy(&config.engine.recommend.strategy)?;
    eprintln!("  benchmark: {}", config.engine.market.benchmark);
    if let Some(lead) = &config.engine.market.lead {
        eprintln!("  lead:      {}", lead);
    }
    eprintln!("  strategy:  {}", strategy.name);
    eprintln!(
        "  history:   {} bars minimum",
        config.engine.indicators.min_bars()
    );
    if !config.universe.codes.is_empty() {
        eprintln!("  codes:     {}", config.universe.codes.join(", "));
    }
    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_list_symbols(config_path: &Path) -> Result<(), EngineError> {
    let collaborators = open(config_path)?;
    let symbols = collaborators.prices.list_symbols()?;
    if symbols.is_empty() {
        eprintln!("No price files found in {}", collaborators.config.data.prices_dir);
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}

fn run_strategies() {
    for profile in available_strategies() {
        println!("{:<12} {}", profile.name, profile.description);
    }
}
