//! Classified-headline CSV sentiment adapter.
//!
//! Rows are `code,date,label,confidence`, one per headline, as written by
//! the upstream classifier. Aggregation happens per query so that only
//! headlines published on or before the cutoff are folded in.

use crate::domain::error::EngineError;
use crate::domain::sentiment::{
    ClassifiedHeadline, HeadlineLabel, SentimentConfig, SentimentSnapshot, aggregate_headlines,
};
use crate::ports::sentiment_port::SentimentPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct HeadlineRow {
    code: String,
    date: NaiveDate,
    label: String,
    confidence: f64,
}

pub struct CsvSentimentAdapter {
    /// Headlines per code, newest first.
    headlines: HashMap<String, Vec<ClassifiedHeadline>>,
    config: SentimentConfig,
}

impl CsvSentimentAdapter {
    pub fn from_path<P: AsRef<Path>>(path: P, config: SentimentConfig) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| EngineError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_reader(file, config)
    }

    pub fn from_reader<R: Read>(reader: R, config: SentimentConfig) -> Result<Self, EngineError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut headlines: HashMap<String, Vec<ClassifiedHeadline>> = HashMap::new();

        for (line, result) in rdr.deserialize::<HeadlineRow>().enumerate() {
            let row = result.map_err(|e| EngineError::Data {
                reason: format!("sentiment row {}: {}", line + 1, e),
            })?;
            let label: HeadlineLabel = row.label.parse().map_err(|reason| EngineError::Data {
                reason: format!("sentiment row {}: {}", line + 1, reason),
            })?;
            headlines
                .entry(row.code.trim().to_uppercase())
                .or_default()
                .push(ClassifiedHeadline {
                    published: row.date,
                    label,
                    confidence: row.confidence,
                });
        }

        for list in headlines.values_mut() {
            list.sort_by(|a, b| b.published.cmp(&a.published));
        }

        Ok(Self { headlines, config })
    }
}

impl SentimentPort for CsvSentimentAdapter {
    fn source_name(&self) -> &str {
        "csv headlines"
    }

    fn sentiment_as_of(&self, code: &str, as_of: NaiveDate) -> Result<SentimentSnapshot, EngineError> {
        let visible: Vec<ClassifiedHeadline> = self
            .headlines
            .get(&code.to_uppercase())
            .map(|list| {
                list.iter()
                    .filter(|h| h.published <= as_of)
                    .take(self.config.news_max)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if visible.is_empty() {
            return Ok(SentimentSnapshot::neutral(code, as_of));
        }

        Ok(SentimentSnapshot {
            code: code.to_string(),
            as_of,
            score: aggregate_headlines(&visible, &self.config),
            headline_count: visible.len(),
            latest_headline: visible.first().map(|h| h.published),
        })
    }
}
