//! equiscore: multi-factor equity recommendation scoring engine.
//!
//! Hexagonal architecture: scoring, regime and backtest logic in [`domain`],
//! collaborator traits in [`ports`], concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
