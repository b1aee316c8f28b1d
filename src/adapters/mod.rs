//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod csv_history_adapter;
pub mod csv_sentiment_adapter;
pub mod file_config_adapter;
pub mod neutral_sentiment_adapter;
