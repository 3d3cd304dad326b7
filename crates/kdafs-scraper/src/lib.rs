//! Stateful extraction of the KDA public food safety inspection search.
//!
//! The results grid is a server-rendered, postback-driven table with no
//! machine-readable API. [`Traversal`] drives it page by page through a
//! [`BrowserSurface`], opens the violation overlay for each row, and hands
//! every finished [`InspectionRecord`](kdafs_core::InspectionRecord) to a
//! [`RecordSink`] before touching the next row.

pub mod browser;
pub mod details;
pub mod error;
pub mod locators;
pub mod pagination;
pub mod record;
pub mod retry;
pub mod sink;
pub mod table;
pub mod traversal;
pub mod webdriver;

pub use browser::{wait_until, BrowserSurface, Selector};
pub use details::{extract_violations, DetailSettings, ViolationOutcome, ViolationReport};
pub use error::{BrowserError, ScraperError};
pub use pagination::{advance, has_next_page};
pub use record::build_record;
pub use retry::locate;
pub use sink::{JsonFileSink, RecordSink, SinkError};
pub use table::{read_page, PageRows, RawRow};
pub use traversal::{Traversal, TraversalOutcome, TraversalReport, TraversalState};
pub use webdriver::WebDriverSurface;
