//! News sentiment port.
//!
//! The collaborator owns headline fetching and classification; the engine
//! only sees a bounded score and the date of the newest headline behind it.

use crate::domain::error::EngineError;
use crate::domain::sentiment::SentimentSnapshot;
use chrono::NaiveDate;

pub trait SentimentPort: Send + Sync {
    fn source_name(&self) -> &str;

    /// Sentiment built only from headlines published on or before `as_of`.
    fn sentiment_as_of(&self, code: &str, as_of: NaiveDate) -> Result<SentimentSnapshot, EngineError>;

    /// Whether `sentiment_as_of` can restrict itself to a cutoff.
    fn honors_cutoff(&self) -> bool {
        true
    }
}
