//! News sentiment score and headline aggregation.
//!
//! Headline classification itself belongs to the sentiment collaborator;
//! this module only folds classified headlines into a bounded score.

use crate::domain::error::EngineError;
use chrono::NaiveDate;
use serde::Serialize;
use std::str::FromStr;

/// Sentiment in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct SentimentScore(f64);

impl SentimentScore {
    pub fn new(value: f64) -> Result<Self, EngineError> {
        if !value.is_finite() || !(-1.0..=1.0).contains(&value) {
            return Err(EngineError::InvalidData {
                code: "sentiment".to_string(),
                reason: format!("score {value} outside [-1, 1]"),
            });
        }
        Ok(Self(value))
    }

    pub fn neutral() -> Self {
        Self(0.0)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Linear map of [-1, 1] onto [0, 100].
    pub fn to_percent(self) -> f64 {
        (self.0 + 1.0) * 50.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadlineLabel {
    Positive,
    Neutral,
    Negative,
}

impl HeadlineLabel {
    fn value(self) -> f64 {
        match self {
            HeadlineLabel::Positive => 1.0,
            HeadlineLabel::Neutral => 0.0,
            HeadlineLabel::Negative => -1.0,
        }
    }
}

impl FromStr for HeadlineLabel {
    type Err = String;

    /// Accepts names and the 0/1/2 class ids of three-way financial
    /// sentiment models (0 negative, 1 neutral, 2 positive), optionally
    /// prefixed with `LABEL_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let key = lower.strip_prefix("label_").unwrap_or(lower.as_str());
        match key {
            "positive" | "2" => Ok(HeadlineLabel::Positive),
            "neutral" | "1" => Ok(HeadlineLabel::Neutral),
            "negative" | "0" => Ok(HeadlineLabel::Negative),
            other => Err(format!("unknown sentiment label: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedHeadline {
    pub published: NaiveDate,
    pub label: HeadlineLabel,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentimentConfig {
    pub news_max: usize,
    /// Predictions below this confidence count as neutral.
    pub neutral_confidence: f64,
    /// Recency decay: the i-th newest headline weighs exp(-decay_rate * i).
    pub decay_rate: f64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            news_max: 3,
            neutral_confidence: 0.55,
            decay_rate: 0.2,
        }
    }
}

/// Sentiment for one instrument as of a date, as returned by a collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentSnapshot {
    pub code: String,
    pub as_of: NaiveDate,
    pub score: SentimentScore,
    pub headline_count: usize,
    /// Publication date of the newest headline used, if any.
    pub latest_headline: Option<NaiveDate>,
}

impl SentimentSnapshot {
    pub fn neutral(code: &str, as_of: NaiveDate) -> Self {
        Self {
            code: code.to_string(),
            as_of,
            score: SentimentScore::neutral(),
            headline_count: 0,
            latest_headline: None,
        }
    }

    /// Fails with `LookaheadViolation` if any input was published after `cutoff`.
    pub fn ensure_within(&self, cutoff: NaiveDate, source_name: &str) -> Result<(), EngineError> {
        if let Some(latest) = self.latest_headline.filter(|d| *d > cutoff) {
            return Err(EngineError::past_cutoff(source_name, &self.code, cutoff, latest));
        }
        if self.as_of > cutoff {
            return Err(EngineError::past_cutoff(source_name, &self.code, cutoff, self.as_of));
        }
        Ok(())
    }
}

/// Folds headlines (newest first) into a recency-weighted mean in [-1, 1].
pub fn aggregate_headlines(
    headlines: &[ClassifiedHeadline],
    config: &SentimentConfig,
) -> SentimentScore {
    let mut weighted = 0.0;
    let mut total_weight = 0.0;

    for (i, headline) in headlines.iter().take(config.news_max).enumerate() {
        let value = if headline.confidence < config.neutral_confidence {
            0.0
        } else {
            headline.label.value()
        };
        let weight = (-config.decay_rate * i as f64).exp();
        weighted += value * weight;
        total_weight += weight;
    }

    if total_weight == 0.0 {
        return SentimentScore::neutral();
    }
    SentimentScore((weighted / total_weight).clamp(-1.0, 1.0))
}
