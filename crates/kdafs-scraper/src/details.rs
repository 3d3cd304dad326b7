//! Violation details overlay.
//!
//! Clicking a row's violations link opens a colorbox overlay that lists the
//! violations of that inspection. The overlay carries no count: entries are
//! enumerated by probing indexed element ids `0, 1, 2, …` until the first
//! index whose code label cannot be found.
//!
//! Failures stay local to the row. A missing overlay yields
//! [`ViolationOutcome::Failed`]; a missing explanation or comment degrades to
//! `None` on that violation.

use std::time::Duration;

use kdafs_core::{AppConfig, Violation};

use crate::browser::{wait_until, BrowserSurface, Selector};
use crate::error::{BrowserError, ScraperError};
use crate::locators;
use crate::retry::locate;

/// Upper bound on probed indices, guarding against a lookup that keeps
/// succeeding on a glitching page.
pub const MAX_VIOLATION_PROBE: usize = 200;

/// Pause after revealing an explanation. The panel exists before its text is
/// filled in, so there is no DOM signal to wait on.
pub const EXPLANATION_SETTLE: Duration = Duration::from_millis(500);

const HEADER_PREFIX: &str = "Inspection Violations:";
const COMMENTS_CAPTION: &str = "Inspector Comments";

/// Timeouts used while working inside the overlay.
#[derive(Debug, Clone, Copy)]
pub struct DetailSettings {
    pub overlay_timeout: Duration,
    /// Wait per probed element; also bounds the end-of-list miss.
    pub probe_timeout: Duration,
    pub max_retries: u32,
}

impl DetailSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            overlay_timeout: config.overlay_wait_timeout(),
            probe_timeout: config.probe_timeout(),
            max_retries: config.max_retries,
        }
    }
}

/// What the overlay yielded for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationOutcome {
    /// The row has no activating link; nothing was reported.
    NoLink,
    Extracted(ViolationReport),
    /// The overlay could not be opened or never appeared.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationReport {
    /// Date printed in the overlay header, without its caption.
    pub header_date: Option<String>,
    pub facility_information: Option<String>,
    pub violations: Vec<Violation>,
    /// `false` when the close control could not be used; the overlay may
    /// still cover the grid.
    pub overlay_closed: bool,
}

/// Opens the overlay behind `link`, reads every violation, and closes it.
///
/// Returns [`ViolationOutcome::NoLink`] immediately when `link` is `None`.
/// If an earlier overlay is still on the page and cannot be closed, the row
/// fails with [`ScraperError::OverlayStillOpen`] instead of reading it.
pub async fn extract_violations<B: BrowserSurface>(
    browser: &B,
    link: Option<&B::Element>,
    settings: &DetailSettings,
) -> ViolationOutcome {
    let Some(link) = link else {
        return ViolationOutcome::NoLink;
    };

    // A leftover overlay would be read as this row's violations.
    if overlay_present(browser).await {
        tracing::warn!("overlay from a previous row still open, closing it first");
        if !close_overlay(browser, settings).await {
            let err = ScraperError::OverlayStillOpen;
            tracing::warn!(error = %err, "not opening violations for this row");
            return ViolationOutcome::Failed {
                reason: err.to_string(),
            };
        }
    }

    if let Err(err) = browser.scripted_click(link).await {
        tracing::warn!(error = %err, "could not activate violations link");
        return ViolationOutcome::Failed {
            reason: format!("violations link could not be activated: {err}"),
        };
    }

    if let Err(err) = locate(
        browser,
        &locators::overlay_root(),
        settings.overlay_timeout,
        settings.max_retries,
    )
    .await
    {
        let err = match err {
            ScraperError::ElementNotFound { .. } => ScraperError::OverlayTimeout {
                timeout: settings.overlay_timeout,
            },
            other => other,
        };
        tracing::warn!(error = %err, "violation overlay unavailable");
        return ViolationOutcome::Failed {
            reason: err.to_string(),
        };
    }

    let header_date = read_optional(browser, &locators::overlay_header(), settings)
        .await
        .map(|text| strip_caption(&text, HEADER_PREFIX))
        .filter(|text| !text.is_empty());
    let facility_information =
        read_optional(browser, &locators::facility_information(), settings).await;

    let violations = probe_violations(browser, settings).await;
    let overlay_closed = close_overlay(browser, settings).await;

    ViolationOutcome::Extracted(ViolationReport {
        header_date,
        facility_information,
        violations,
        overlay_closed,
    })
}

/// Reads violation entries by index until the first missing code label.
async fn probe_violations<B: BrowserSurface>(
    browser: &B,
    settings: &DetailSettings,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    for index in 0..MAX_VIOLATION_PROBE {
        let code = match locate(
            browser,
            &locators::violation_code(index),
            settings.probe_timeout,
            settings.max_retries,
        )
        .await
        {
            Ok(label) => match browser.read_text(&label).await {
                Ok(text) => text.trim().to_owned(),
                Err(err) => {
                    tracing::warn!(index, error = %err, "could not read violation code, ending probe");
                    return violations;
                }
            },
            Err(ScraperError::ElementNotFound { .. }) => {
                tracing::debug!(count = index, "end of violation list");
                return violations;
            }
            Err(err) => {
                tracing::warn!(index, error = %err, "violation code lookup failed, ending probe");
                return violations;
            }
        };

        let code_explanation = match read_explanation(browser, index, settings).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(index, error = %err, "code explanation unavailable");
                None
            }
        };

        let inspector_comments = match read_comments(browser, index, settings).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(index, error = %err, "inspector comments unavailable");
                None
            }
        };

        violations.push(Violation {
            code,
            code_explanation,
            inspector_comments,
        });
    }

    tracing::warn!(
        limit = MAX_VIOLATION_PROBE,
        "violation probe hit its index limit; remaining entries ignored"
    );
    violations
}

async fn read_explanation<B: BrowserSurface>(
    browser: &B,
    index: usize,
    settings: &DetailSettings,
) -> Result<Option<String>, ScraperError> {
    let toggle = locate(
        browser,
        &locators::explanation_toggle(index),
        settings.probe_timeout,
        settings.max_retries,
    )
    .await?;
    browser.scripted_click(&toggle).await?;
    tokio::time::sleep(EXPLANATION_SETTLE).await;

    let panel = locate(
        browser,
        &locators::explanation_panel(index),
        settings.probe_timeout,
        settings.max_retries,
    )
    .await?;
    let Some(text_node) = browser
        .locate_within(&panel, &locators::explanation_text())
        .await?
    else {
        return Ok(None);
    };
    Ok(non_empty(browser.read_text(&text_node).await?.trim()))
}

async fn read_comments<B: BrowserSurface>(
    browser: &B,
    index: usize,
    settings: &DetailSettings,
) -> Result<Option<String>, ScraperError> {
    let panel = locate(
        browser,
        &locators::comments_panel(index),
        settings.probe_timeout,
        settings.max_retries,
    )
    .await?;
    let text = browser.read_text(&panel).await?;
    Ok(non_empty(&strip_caption(&text, COMMENTS_CAPTION)))
}

/// Reads the text of an optional overlay label; any failure yields `None`.
async fn read_optional<B: BrowserSurface>(
    browser: &B,
    selector: &Selector,
    settings: &DetailSettings,
) -> Option<String> {
    let element = match locate(browser, selector, settings.probe_timeout, settings.max_retries).await
    {
        Ok(element) => element,
        Err(err) => {
            tracing::debug!(%selector, error = %err, "optional overlay label missing");
            return None;
        }
    };
    match browser.read_text(&element).await {
        Ok(text) => non_empty(text.trim()),
        Err(err) => {
            tracing::debug!(%selector, error = %err, "optional overlay label unreadable");
            None
        }
    }
}

/// Single immediate lookup; lookup failures count as absent.
async fn overlay_present<B: BrowserSurface>(browser: &B) -> bool {
    matches!(browser.locate(&locators::overlay_root()).await, Ok(Some(_)))
}

/// Clicks the close control and waits for the overlay to leave the page.
/// Returns `false` if either step fails.
async fn close_overlay<B: BrowserSurface>(browser: &B, settings: &DetailSettings) -> bool {
    let close = match locate(
        browser,
        &locators::overlay_close(),
        settings.overlay_timeout,
        settings.max_retries,
    )
    .await
    {
        Ok(close) => close,
        Err(err) => {
            tracing::warn!(error = %err, "overlay close control not found; overlay may still be open");
            return false;
        }
    };

    if let Err(err) = browser.click(&close).await {
        tracing::warn!(error = %err, "overlay close click failed; overlay may still be open");
        return false;
    }

    let root = locators::overlay_root();
    let root = &root;
    match wait_until(settings.overlay_timeout, move || async move {
        Ok::<bool, BrowserError>(browser.locate(root).await?.is_none())
    })
    .await
    {
        Ok(true) => true,
        Ok(false) => {
            tracing::warn!("overlay still present after close");
            false
        }
        Err(err) => {
            tracing::warn!(error = %err, "could not confirm overlay closed");
            false
        }
    }
}

fn strip_caption(text: &str, caption: &str) -> String {
    text.replace(caption, "").trim().to_owned()
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_owned())
}
