//! Reads the current page of the results grid into [`RawRow`]s.
//!
//! Grid layout assumed by the reader:
//!
//! | row             | content                                 |
//! |-----------------|-----------------------------------------|
//! | first           | header cells (`<th>`)                   |
//! | middle          | data rows (`<td>`)                      |
//! | second to last  | footer                                  |
//! | last            | pager links                             |
//!
//! Only the first [`MAX_COLUMNS`] cells of a row are read. The fifth header is
//! always relabelled [`VIOLATIONS_HEADER`]; the site prints a report label there.

use crate::browser::{BrowserSurface, Selector};
use crate::error::ScraperError;

/// Number of leading cells materialized per row.
pub const MAX_COLUMNS: usize = 6;

/// Zero-based position of the violations cell.
pub const VIOLATIONS_COLUMN: usize = 4;

/// Label forced onto the violations column.
pub const VIOLATIONS_HEADER: &str = "Violations";

/// Rows with fewer data cells than this cannot be turned into a record.
pub const MIN_DATA_CELLS: usize = VIOLATIONS_COLUMN + 1;

/// One data row of the grid, keyed by header name in column order.
#[derive(Debug, Clone)]
pub struct RawRow<E> {
    /// Position among the data rows of the page, starting at 0.
    pub index: usize,
    cells: Vec<(String, String)>,
    /// Activating link in the violations cell, when the row reports any.
    pub violations_link: Option<E>,
}

impl<E> RawRow<E> {
    #[must_use]
    pub fn new(index: usize, cells: Vec<(String, String)>, violations_link: Option<E>) -> Self {
        Self {
            index,
            cells,
            violations_link,
        }
    }

    /// Cell text by column position.
    #[must_use]
    pub fn column(&self, position: usize) -> Option<&str> {
        self.cells.get(position).map(|(_, value)| value.as_str())
    }

    /// Cell text by header name.
    #[must_use]
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == header)
            .map(|(_, value)| value.as_str())
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Data rows read from one page plus the count of rows dropped as malformed.
#[derive(Debug)]
pub struct PageRows<E> {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow<E>>,
    pub malformed: usize,
}

/// Reads headers and data rows from the grid element `table`.
///
/// Rows without any `<td>` are layout artifacts and are skipped silently.
/// Rows with fewer than [`MIN_DATA_CELLS`] cells are logged as
/// [`ScraperError::MalformedRow`] and counted, not returned.
///
/// # Errors
///
/// Propagates browser failures, including [`BrowserError::Stale`](crate::BrowserError::Stale)
/// when a postback replaces the grid mid-read.
pub async fn read_page<B: BrowserSurface>(
    browser: &B,
    table: &B::Element,
) -> Result<PageRows<B::Element>, ScraperError> {
    let headers = read_headers(browser, table).await?;

    let all_rows = browser.locate_all_within(table, &Selector::tag("tr")).await?;
    let data_rows = data_row_slice(&all_rows);

    let mut rows = Vec::with_capacity(data_rows.len());
    let mut malformed = 0usize;

    for (index, tr) in data_rows.iter().enumerate() {
        let cells = browser.locate_all_within(tr, &Selector::tag("td")).await?;
        if cells.is_empty() {
            tracing::debug!(row = index, "skipping row without data cells");
            continue;
        }
        if cells.len() < MIN_DATA_CELLS {
            let err = ScraperError::MalformedRow {
                row: index,
                cells: cells.len(),
                expected: MIN_DATA_CELLS,
            };
            tracing::warn!(error = %err, "skipping malformed row");
            malformed += 1;
            continue;
        }

        let mut values = Vec::with_capacity(MAX_COLUMNS);
        for (position, cell) in cells.iter().take(MAX_COLUMNS).enumerate() {
            let text = browser.read_text(cell).await?;
            values.push((header_name(&headers, position), text.trim().to_owned()));
        }

        let violations_link = activating_link(browser, &cells[VIOLATIONS_COLUMN]).await?;
        rows.push(RawRow::new(index, values, violations_link));
    }

    Ok(PageRows {
        headers,
        rows,
        malformed,
    })
}

/// Reads up to [`MAX_COLUMNS`] header labels and applies the violations relabel.
async fn read_headers<B: BrowserSurface>(
    browser: &B,
    table: &B::Element,
) -> Result<Vec<String>, ScraperError> {
    let cells = browser.locate_all_within(table, &Selector::tag("th")).await?;
    let mut headers = Vec::with_capacity(MAX_COLUMNS);
    for cell in cells.iter().take(MAX_COLUMNS) {
        headers.push(browser.read_text(cell).await?.trim().to_owned());
    }
    Ok(normalize_headers(headers))
}

/// Forces the violations label onto the fifth header.
fn normalize_headers(mut headers: Vec<String>) -> Vec<String> {
    if let Some(label) = headers.get_mut(VIOLATIONS_COLUMN) {
        VIOLATIONS_HEADER.clone_into(label);
    }
    headers
}

fn header_name(headers: &[String], position: usize) -> String {
    match headers.get(position) {
        Some(name) if !name.is_empty() => name.clone(),
        _ if position == VIOLATIONS_COLUMN => VIOLATIONS_HEADER.to_owned(),
        _ => format!("Column {}", position + 1),
    }
}

/// Drops the header row and the trailing footer and pager rows.
fn data_row_slice<T>(rows: &[T]) -> &[T] {
    if rows.len() < 3 {
        return &[];
    }
    &rows[1..rows.len() - 2]
}

/// Returns the link in the violations cell if it carries text. An empty
/// anchor means the row has nothing to open.
async fn activating_link<B: BrowserSurface>(
    browser: &B,
    cell: &B::Element,
) -> Result<Option<B::Element>, ScraperError> {
    let Some(link) = browser.locate_within(cell, &Selector::tag("a")).await? else {
        return Ok(None);
    };
    let text = browser.read_text(&link).await?;
    if text.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(link))
}
