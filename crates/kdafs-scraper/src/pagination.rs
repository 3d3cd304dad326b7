//! Postback pagination of the results grid.
//!
//! The pager row shows a window of page links. A page inside the window is a
//! link whose text is the page number; the page just past the window is an
//! ellipsis link. Both fire an ASP.NET postback whose argument names the
//! target page:
//!
//! ```text
//! javascript:__doPostBack('ctl00$MainContent$gvInspections','Page$11')
//! ```
//!
//! A postback replaces the whole grid, so a transition is confirmed by the
//! former first data row going stale.

use std::sync::LazyLock;
use std::time::Duration;

use kdafs_core::PageCursor;
use regex::Regex;

use crate::browser::{BrowserSurface, Selector};
use crate::error::{BrowserError, ScraperError};
use crate::locators;
use crate::retry::locate;

const ELLIPSIS: &str = "...";

static POSTBACK_PAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Page\$(\d+)").expect("valid postback page regex"));

/// Finds the pager link leading to the page after `cursor`.
///
/// Returns `Ok(None)` when no such link exists, which marks the last page.
/// Links that go stale while being inspected are skipped.
///
/// # Errors
///
/// Returns [`ScraperError`] if the pager row cannot be located or its links
/// cannot be listed.
pub async fn has_next_page<B: BrowserSurface>(
    browser: &B,
    cursor: PageCursor,
    timeout: Duration,
    max_retries: u32,
) -> Result<Option<B::Element>, ScraperError> {
    let target = cursor.next_page_number();
    let pager = locate(browser, &locators::pager_row(), timeout, max_retries).await?;
    let links = browser.locate_all_within(&pager, &Selector::tag("a")).await?;

    for link in links {
        match inspect_link(browser, &link, target).await {
            Ok(true) => return Ok(Some(link)),
            Ok(false) => {}
            Err(BrowserError::Stale) => {
                tracing::debug!(target, "pager link went stale during scan, skipping");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(None)
}

async fn inspect_link<B: BrowserSurface>(
    browser: &B,
    link: &B::Element,
    target: u32,
) -> Result<bool, BrowserError> {
    let text = browser.read_text(link).await?;
    let text = text.trim();
    if text.parse::<u32>().is_ok_and(|page| page == target) {
        return Ok(true);
    }
    if text == ELLIPSIS {
        let href = browser.read_attribute(link, "href").await?;
        return Ok(href.as_deref().and_then(postback_page) == Some(target));
    }
    Ok(false)
}

/// Extracts the target page number from a pager postback `href`.
#[must_use]
pub fn postback_page(href: &str) -> Option<u32> {
    POSTBACK_PAGE
        .captures(href)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Clicks `link` and waits for `anchor` (the current first data row) to go
/// stale, which confirms the grid was replaced by page `target`.
///
/// # Errors
///
/// - [`ScraperError::NavigationTimeout`] — `anchor` stayed attached for `timeout`.
/// - [`ScraperError::Browser`] — the click or staleness check failed.
pub async fn advance<B: BrowserSurface>(
    browser: &B,
    link: &B::Element,
    anchor: &B::Element,
    target: u32,
    timeout: Duration,
) -> Result<(), ScraperError> {
    browser.scripted_click(link).await?;
    if browser.wait_for_stale(anchor, timeout).await? {
        Ok(())
    } else {
        Err(ScraperError::NavigationTimeout {
            page: target,
            timeout,
        })
    }
}
