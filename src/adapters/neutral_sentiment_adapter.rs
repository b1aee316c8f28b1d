//! Sentiment provider for runs without a headline source.

use crate::domain::error::EngineError;
use crate::domain::sentiment::SentimentSnapshot;
use crate::ports::sentiment_port::SentimentPort;
use chrono::NaiveDate;

/// Reports neutral sentiment for every instrument and date.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeutralSentiment;

impl SentimentPort for NeutralSentiment {
    fn source_name(&self) -> &str {
        "neutral sentiment"
    }

    fn sentiment_as_of(&self, code: &str, as_of: NaiveDate) -> Result<SentimentSnapshot, EngineError> {
        Ok(SentimentSnapshot::neutral(code, as_of))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_neutral_and_within_cutoff() {
        let as_of = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let snap = NeutralSentiment.sentiment_as_of("005930", as_of).unwrap();
        assert_eq!(snap.score.value(), 0.0);
        assert!(snap.ensure_within(as_of, NeutralSentiment.source_name()).is_ok());
        assert!(NeutralSentiment.honors_cutoff());
    }
}
