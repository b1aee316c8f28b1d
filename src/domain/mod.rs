//! Scoring engine domain: pure types and logic, no I/O.

pub mod backtest;
pub mod circuit_breaker;
pub mod config;
pub mod config_validation;
pub mod engine;
pub mod error;
pub mod indicator;
pub mod ohlcv;
pub mod price_series;
pub mod regime;
pub mod scoring;
pub mod sentiment;
pub mod strategy;
pub mod universe;
