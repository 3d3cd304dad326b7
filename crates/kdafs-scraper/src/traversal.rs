//! Page-by-page traversal of the search results.
//!
//! ```text
//! Searching ──► PageLoaded ──► RowProcessing ──► Paginating ──► Done
//!                   ▲                                 │
//!                   └─────────── next page ───────────┘
//! ```
//!
//! Any state can fall through to `Failed`. Records are handed to the sink one
//! row at a time, so a failure never loses rows that were already processed.

use kdafs_core::{AppConfig, PageCursor};
use uuid::Uuid;

use crate::browser::BrowserSurface;
use crate::details::{extract_violations, DetailSettings, ViolationOutcome};
use crate::error::ScraperError;
use crate::locators;
use crate::pagination::{advance, has_next_page};
use crate::record::build_record;
use crate::retry::{locate, retry_on_stale};
use crate::sink::RecordSink;
use crate::table::{read_page, PageRows, RawRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalState {
    Searching,
    PageLoaded,
    RowProcessing,
    Paginating,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraversalOutcome {
    /// The last page was reached, or the configured page limit.
    Completed,
    /// The run stopped early; records persisted before the failure are kept.
    Failed {
        state: TraversalState,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalReport {
    pub run_id: Uuid,
    pub pages_visited: usize,
    pub last_page: u32,
    pub records_persisted: usize,
    /// Rows dropped as malformed.
    pub rows_skipped: usize,
    /// Rows persisted with an extraction-error marker.
    pub detail_failures: usize,
    pub outcome: TraversalOutcome,
}

impl TraversalReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == TraversalOutcome::Completed
    }
}

/// Drives one search through every result page, owning the sink for the
/// duration of the run.
pub struct Traversal<'a, B: BrowserSurface, S: RecordSink> {
    browser: &'a B,
    config: &'a AppConfig,
    details: DetailSettings,
    sink: S,
    cursor: PageCursor,
    state: TraversalState,
    run_id: Uuid,
    pages_visited: usize,
    rows_skipped: usize,
    detail_failures: usize,
}

impl<'a, B: BrowserSurface, S: RecordSink> Traversal<'a, B, S> {
    pub fn new(browser: &'a B, config: &'a AppConfig, sink: S) -> Self {
        Self {
            browser,
            config,
            details: DetailSettings::from_config(config),
            sink,
            cursor: PageCursor::first(),
            state: TraversalState::Searching,
            run_id: Uuid::new_v4(),
            pages_visited: 0,
            rows_skipped: 0,
            detail_failures: 0,
        }
    }

    /// Runs the traversal to `Done` or `Failed` and returns the report along
    /// with the sink.
    pub async fn run(mut self) -> (TraversalReport, S) {
        let mut pending: Vec<RawRow<B::Element>> = Vec::new();
        let mut failure: Option<(TraversalState, ScraperError)> = None;

        tracing::info!(run_id = %self.run_id, search_url = %self.config.search_url, "starting extraction");

        loop {
            let current = self.state;
            let step = match current {
                TraversalState::Searching => self
                    .search()
                    .await
                    .map(|()| TraversalState::PageLoaded),
                TraversalState::PageLoaded => self.load_page().await.map(|rows| {
                    pending = rows;
                    TraversalState::RowProcessing
                }),
                TraversalState::RowProcessing => self
                    .process_rows(std::mem::take(&mut pending))
                    .await
                    .map(|()| TraversalState::Paginating),
                TraversalState::Paginating => self.paginate().await.map(|more| {
                    if more {
                        TraversalState::PageLoaded
                    } else {
                        TraversalState::Done
                    }
                }),
                TraversalState::Done | TraversalState::Failed => break,
            };

            self.state = match step {
                Ok(next) => next,
                Err(err) => {
                    tracing::error!(
                        run_id = %self.run_id,
                        state = ?current,
                        page = self.cursor.page_number(),
                        error = %err,
                        "traversal failed"
                    );
                    failure = Some((current, err));
                    TraversalState::Failed
                }
            };
            tracing::trace!(from = ?current, to = ?self.state, "state transition");
        }

        let outcome = match failure {
            None => TraversalOutcome::Completed,
            Some((state, err)) => TraversalOutcome::Failed {
                state,
                reason: err.to_string(),
            },
        };

        let report = TraversalReport {
            run_id: self.run_id,
            pages_visited: self.pages_visited,
            last_page: self.cursor.page_number(),
            records_persisted: self.sink.len(),
            rows_skipped: self.rows_skipped,
            detail_failures: self.detail_failures,
            outcome,
        };
        tracing::info!(
            run_id = %report.run_id,
            pages = report.pages_visited,
            records = report.records_persisted,
            skipped = report.rows_skipped,
            detail_failures = report.detail_failures,
            success = report.is_success(),
            "extraction finished"
        );
        (report, self.sink)
    }

    /// Opens the search page, submits the empty search, and waits for the grid.
    async fn search(&mut self) -> Result<(), ScraperError> {
        let retries = self.config.max_retries;
        self.browser.navigate(&self.config.search_url).await?;

        let button = locate(
            self.browser,
            &locators::search_button(),
            self.config.row_wait_timeout(),
            retries,
        )
        .await?;
        self.browser.click(&button).await?;

        locate(
            self.browser,
            &locators::results_table(),
            self.config.initial_load_timeout(),
            retries,
        )
        .await?;
        tracing::info!("search results loaded");
        Ok(())
    }

    /// Reads the current page. If the grid is still stale once the retry
    /// budget is spent, the page is read once more from scratch.
    async fn load_page(&mut self) -> Result<Vec<RawRow<B::Element>>, ScraperError> {
        let page = match self.read_current_page().await {
            Err(err) if err.is_stale() => {
                tracing::warn!(
                    page = self.cursor.page_number(),
                    error = %err,
                    "grid stayed stale, re-reading page from scratch"
                );
                self.read_current_page().await?
            }
            other => other?,
        };

        self.pages_visited += 1;
        self.rows_skipped += page.malformed;
        tracing::info!(
            page = self.cursor.page_number(),
            rows = page.rows.len(),
            malformed = page.malformed,
            "page loaded"
        );
        Ok(page.rows)
    }

    async fn read_current_page(&self) -> Result<PageRows<B::Element>, ScraperError> {
        let browser = self.browser;
        let timeout = self.config.page_wait_timeout();
        let retries = self.config.max_retries;

        retry_on_stale(retries, move || async move {
            let table = locate(browser, &locators::results_table(), timeout, retries).await?;
            read_page(browser, &table).await
        })
        .await
    }

    /// Extracts details for each row and persists it before the next one.
    async fn process_rows(&mut self, rows: Vec<RawRow<B::Element>>) -> Result<(), ScraperError> {
        let page = self.cursor.page_number();
        for row in rows {
            let outcome =
                extract_violations(self.browser, row.violations_link.as_ref(), &self.details).await;

            match &outcome {
                ViolationOutcome::Failed { reason } => {
                    self.detail_failures += 1;
                    tracing::warn!(page, row = row.index, %reason, "violation details not extracted");
                }
                ViolationOutcome::Extracted(report) if !report.overlay_closed => {
                    tracing::warn!(page, row = row.index, "overlay may still be open");
                }
                _ => {}
            }

            let record = build_record(&row, outcome);
            self.sink.append(record)?;
            tracing::debug!(
                page,
                row = row.index,
                persisted = self.sink.len(),
                "row persisted"
            );
        }
        Ok(())
    }

    /// Moves to the next page. Returns `Ok(false)` at the last page or when
    /// the page limit is reached.
    async fn paginate(&mut self) -> Result<bool, ScraperError> {
        if let Some(limit) = self.config.page_limit() {
            if self.pages_visited >= limit {
                tracing::info!(limit, "page limit reached");
                return Ok(false);
            }
        }

        let retries = self.config.max_retries;
        let row_wait = self.config.row_wait_timeout();

        let Some(link) = has_next_page(self.browser, self.cursor, row_wait, retries).await? else {
            tracing::info!(page = self.cursor.page_number(), "reached last page");
            return Ok(false);
        };

        let anchor = locate(self.browser, &locators::anchor_row(), row_wait, retries).await?;
        let target = self.cursor.next_page_number();
        advance(
            self.browser,
            &link,
            &anchor,
            target,
            self.config.page_wait_timeout(),
        )
        .await?;

        self.cursor.advance();
        tracing::debug!(page = self.cursor.page_number(), "page transition confirmed");
        Ok(true)
    }
}
