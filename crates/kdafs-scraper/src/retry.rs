//! Stale-element recovery for element lookups.
//!
//! A postback replaces the whole document, so any reference captured just
//! before it completes turns stale on first use. Lookups here poll for
//! presence within a timeout and, when the browser reports staleness, repeat
//! the whole lookup after a fixed one-second backoff. Timeouts are never
//! retried: an element that did not appear in time is reported as
//! [`ScraperError::ElementNotFound`].

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::browser::{BrowserSurface, Selector, POLL_INTERVAL};
use crate::error::{BrowserError, ScraperError};

/// Fixed delay between attempts after a stale reference.
pub const STALE_BACKOFF: Duration = Duration::from_secs(1);

/// Waits up to `timeout` for an element matching `selector` and returns it.
///
/// `max_retries` is the total number of attempts on staleness; `0` is
/// treated as a single attempt.
///
/// # Errors
///
/// - [`ScraperError::ElementNotFound`] — nothing matched within `timeout`.
/// - [`ScraperError::StaleElement`] — every attempt hit a stale reference.
/// - [`ScraperError::Browser`] — any other driver failure (not retried).
pub async fn locate<B: BrowserSurface>(
    browser: &B,
    selector: &Selector,
    timeout: Duration,
    max_retries: u32,
) -> Result<B::Element, ScraperError> {
    let attempts = max_retries.max(1);
    let mut attempt = 1u32;

    loop {
        match poll_for(browser, selector, timeout).await {
            Ok(Some(element)) => return Ok(element),
            Ok(None) => {
                return Err(ScraperError::ElementNotFound {
                    selector: selector.to_string(),
                    timeout,
                })
            }
            Err(BrowserError::Stale) if attempt < attempts => {
                tracing::debug!(%selector, attempt, attempts, "stale reference during lookup, retrying");
                tokio::time::sleep(STALE_BACKOFF).await;
                attempt += 1;
            }
            Err(BrowserError::Stale) => {
                return Err(ScraperError::StaleElement {
                    selector: selector.to_string(),
                    attempts,
                })
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Polls for presence until `timeout` elapses. `Ok(None)` means timed out.
async fn poll_for<B: BrowserSurface>(
    browser: &B,
    selector: &Selector,
    timeout: Duration,
) -> Result<Option<B::Element>, BrowserError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(element) = browser.locate(selector).await? {
            return Ok(Some(element));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
    }
}

/// Runs `operation`, repeating it after [`STALE_BACKOFF`] while it fails
/// with a stale reference, up to `max_retries` attempts in total.
///
/// Non-stale errors are returned immediately. When every attempt is stale
/// the last stale error is returned so the caller can decide on a coarser
/// recovery.
pub async fn retry_on_stale<T, F, Fut>(max_retries: u32, mut operation: F) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let attempts = max_retries.max(1);
    let mut attempt = 1u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_stale() && attempt < attempts => {
                tracing::warn!(attempt, attempts, error = %err, "stale reference, retrying");
                tokio::time::sleep(STALE_BACKOFF).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
