//! The browser capability the extractor consumes.
//!
//! Any automation driver that can locate, read, click, and report staleness
//! can back the traversal. [`WebDriverSurface`](crate::WebDriverSurface) binds
//! it to a W3C WebDriver endpoint; tests bind it to a scripted in-memory page.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::BrowserError;

/// Interval between condition checks in [`wait_until`].
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How an element is looked up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Id(String),
    Css(String),
    Tag(String),
}

impl Selector {
    pub fn id(value: impl Into<String>) -> Self {
        Selector::Id(value.into())
    }

    pub fn css(value: impl Into<String>) -> Self {
        Selector::Css(value.into())
    }

    pub fn tag(value: impl Into<String>) -> Self {
        Selector::Tag(value.into())
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Id(v) => write!(f, "#{v}"),
            Selector::Css(v) => write!(f, "css({v})"),
            Selector::Tag(v) => write!(f, "<{v}>"),
        }
    }
}

/// Primitive browser operations.
///
/// Lookups return `Ok(None)` / an empty `Vec` when nothing matches and
/// `Err(BrowserError::Stale)` when a parent or target reference has been
/// invalidated. None of the primitives wait; waiting is layered on top by
/// [`wait_until`], [`BrowserSurface::wait_for_stale`] and
/// [`locate`](crate::locate).
#[allow(async_fn_in_trait)]
pub trait BrowserSurface {
    type Element: Clone + std::fmt::Debug;

    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    async fn locate(&self, selector: &Selector) -> Result<Option<Self::Element>, BrowserError>;

    async fn locate_all(&self, selector: &Selector) -> Result<Vec<Self::Element>, BrowserError>;

    async fn locate_within(
        &self,
        parent: &Self::Element,
        selector: &Selector,
    ) -> Result<Option<Self::Element>, BrowserError>;

    async fn locate_all_within(
        &self,
        parent: &Self::Element,
        selector: &Selector,
    ) -> Result<Vec<Self::Element>, BrowserError>;

    async fn click(&self, element: &Self::Element) -> Result<(), BrowserError>;

    /// Clicks through script (`arguments[0].click()`), bypassing overlays
    /// that would intercept a pointer click.
    async fn scripted_click(&self, element: &Self::Element) -> Result<(), BrowserError>;

    async fn read_text(&self, element: &Self::Element) -> Result<String, BrowserError>;

    async fn read_attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>, BrowserError>;

    /// Returns `true` once the node behind `element` is gone from the document.
    async fn is_stale(&self, element: &Self::Element) -> Result<bool, BrowserError>;

    /// Blocks until `element` goes stale or `timeout` elapses.
    ///
    /// Returns `Ok(false)` on timeout.
    async fn wait_for_stale(
        &self,
        element: &Self::Element,
        timeout: Duration,
    ) -> Result<bool, BrowserError> {
        wait_until(timeout, move || self.is_stale(element)).await
    }
}

/// Polls `condition` every [`POLL_INTERVAL`] until it reports `true` or
/// `timeout` elapses. The condition is always evaluated at least once.
///
/// Returns `Ok(false)` on timeout. Errors from the condition end the wait.
///
/// # Errors
///
/// Propagates the first error returned by `condition`.
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> Result<bool, BrowserError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, BrowserError>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition().await? {
            return Ok(true);
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
    }
}
