//! Price history port.
//!
//! Every price collaborator is cutoff-aware: history is requested as of a
//! date and forward prices are requested strictly after one. The engine
//! still checks what comes back against the cutoff it asked for.

use crate::domain::error::EngineError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort: Send + Sync {
    /// Name used in look-ahead diagnostics.
    fn source_name(&self) -> &str;

    /// Bars for `code` dated on or before `as_of`, oldest first.
    ///
    /// Fails with `NoData` if the code is unknown or has no bar by `as_of`.
    fn fetch_history(&self, code: &str, as_of: NaiveDate) -> Result<Vec<OhlcvBar>, EngineError>;

    /// Up to `count` bars dated strictly after `after`, oldest first.
    fn fetch_forward(
        &self,
        code: &str,
        after: NaiveDate,
        count: usize,
    ) -> Result<Vec<OhlcvBar>, EngineError>;

    fn list_symbols(&self) -> Result<Vec<String>, EngineError>;

    /// Whether `fetch_history` restricts itself to the requested cutoff.
    fn honors_cutoff(&self) -> bool {
        true
    }
}
