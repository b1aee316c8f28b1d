//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for equiscore.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no data for {code}")]
    NoData { code: String },

    #[error("insufficient history for {code}: have {bars} bars, need {minimum}")]
    InsufficientHistory {
        code: String,
        bars: usize,
        minimum: usize,
    },

    #[error("look-ahead violation in {source_name}: {reason}")]
    LookaheadViolation { source_name: String, reason: String },

    #[error("invalid strategy: {name}")]
    InvalidStrategy { name: String },

    #[error("invalid data for {code}: {reason}")]
    InvalidData { code: String, reason: String },

    #[error("data source error: {reason}")]
    Data { reason: String },

    #[error("history sink error: {reason}")]
    History { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("batch timed out after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u128 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// A collaborator handed back data dated after the cutoff it was given.
    pub fn past_cutoff(source_name: &str, code: &str, cutoff: NaiveDate, observed: NaiveDate) -> Self {
        EngineError::LookaheadViolation {
            source_name: source_name.to_string(),
            reason: format!("{code} has data for {observed} past cutoff {cutoff}"),
        }
    }

    /// A collaborator that cannot restrict its data to an as-of date.
    pub fn cutoff_unsupported(source_name: &str) -> Self {
        EngineError::LookaheadViolation {
            source_name: source_name.to_string(),
            reason: "source cannot honor an as-of cutoff".to_string(),
        }
    }
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err {
            EngineError::Io(_) | EngineError::Timeout { .. } => 1,
            EngineError::ConfigParse { .. }
            | EngineError::ConfigMissing { .. }
            | EngineError::ConfigInvalid { .. } => 2,
            EngineError::Data { .. } | EngineError::InvalidData { .. } => 3,
            EngineError::InvalidStrategy { .. } => 4,
            EngineError::NoData { .. }
            | EngineError::InsufficientHistory { .. }
            | EngineError::History { .. } => 5,
            EngineError::LookaheadViolation { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
