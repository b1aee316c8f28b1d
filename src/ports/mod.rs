pub mod config_port;
pub mod data_port;
pub mod history_port;
pub mod sentiment_port;
