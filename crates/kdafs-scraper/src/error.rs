use std::time::Duration;

use thiserror::Error;

use crate::sink::SinkError;

/// Failures reported by a [`BrowserSurface`](crate::BrowserSurface) call.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The element reference points at a node that was replaced, typically by
    /// a postback that rebuilt the document.
    #[error("stale element reference")]
    Stale,

    #[error("webdriver command failed: {0}")]
    Driver(String),

    #[error("could not start browser session: {0}")]
    Session(String),

    #[error("script argument could not be encoded: {0}")]
    Script(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("element {selector} not found within {timeout:?}")]
    ElementNotFound { selector: String, timeout: Duration },

    #[error("element {selector} stayed stale after {attempts} attempts")]
    StaleElement { selector: String, attempts: u32 },

    #[error("overlay did not appear within {}s", timeout.as_secs())]
    OverlayTimeout { timeout: Duration },

    #[error("previous overlay still open")]
    OverlayStillOpen,

    #[error("transition to page {page} was not confirmed within {timeout:?}")]
    NavigationTimeout { page: u32, timeout: Duration },

    #[error("row {row} has {cells} data cells, expected at least {expected}")]
    MalformedRow {
        row: usize,
        cells: usize,
        expected: usize,
    },

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("failed to persist record: {0}")]
    Sink(#[from] SinkError),
}

impl ScraperError {
    /// Returns `true` when the failure comes from a stale element reference,
    /// whether raised directly by the browser or after the locator gave up.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            ScraperError::StaleElement { .. } | ScraperError::Browser(BrowserError::Stale)
        )
    }
}
