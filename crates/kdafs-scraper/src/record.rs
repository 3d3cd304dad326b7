//! Assembles an [`InspectionRecord`] from a grid row and its overlay outcome.

use kdafs_core::{InspectionEvent, InspectionRecord};

use crate::details::ViolationOutcome;
use crate::table::RawRow;

const FACILITY_COLUMN: usize = 0;
const DATE_COLUMN: usize = 1;
const TYPE_COLUMN: usize = 2;

/// Builds the record for one row. Always yields exactly one inspection event;
/// a row without violation details gets an empty violation list.
#[must_use]
pub fn build_record<E>(row: &RawRow<E>, outcome: ViolationOutcome) -> InspectionRecord {
    let (trade_name, map_address) = split_facility(row.column(FACILITY_COLUMN).unwrap_or_default());
    let inspection_date = row.column(DATE_COLUMN).unwrap_or_default().trim().to_owned();
    let inspection_type = non_blank(row.column(TYPE_COLUMN));

    let mut event = InspectionEvent::new(inspection_date, inspection_type);
    match outcome {
        ViolationOutcome::NoLink => {}
        ViolationOutcome::Extracted(report) => {
            if let Some(header_date) = report.header_date.as_deref() {
                if header_date != event.inspection_date {
                    tracing::debug!(
                        row = row.index,
                        row_date = %event.inspection_date,
                        header_date,
                        "overlay date differs from row date"
                    );
                }
            }
            event.violations = report.violations;
            event.facility_information = report.facility_information;
        }
        ViolationOutcome::Failed { reason } => {
            event.extraction_error = Some(reason);
        }
    }

    InspectionRecord::new(trade_name, map_address, establishment_types(row), event)
}

/// Splits the facility cell at its first line break into trade name and
/// address. Remaining line breaks in the address are folded to spaces.
fn split_facility(text: &str) -> (String, String) {
    let text = text.trim();
    match text.split_once('\n') {
        Some((name, address)) => (name.trim().to_owned(), fold_lines(address)),
        None => (text.to_owned(), String::new()),
    }
}

fn fold_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reads establishment types from a column whose header mentions
/// "establishment", if the grid has one.
fn establishment_types<E>(row: &RawRow<E>) -> Vec<String> {
    row.cells()
        .find(|(header, _)| header.to_ascii_lowercase().contains("establishment"))
        .map(|(_, value)| {
            value
                .split([',', '\n'])
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
