//! Fixed element identities of the KDA public inspection search page.
//!
//! The page is an ASP.NET WebForms app: the results grid is
//! `MainContent_gvInspections` and the violation overlay is a user control
//! whose repeater items are suffixed with a zero-based index.

use crate::browser::Selector;

const RESULTS_TABLE_ID: &str = "MainContent_gvInspections";
const VIOLATIONS_PREFIX: &str = "MainContent_wucPublicInspectionViolations";

#[must_use]
pub fn search_button() -> Selector {
    Selector::id("MainContent_btnSearch")
}

#[must_use]
pub fn results_table() -> Selector {
    Selector::id(RESULTS_TABLE_ID)
}

/// Last row of the grid, which holds the pager links.
#[must_use]
pub fn pager_row() -> Selector {
    Selector::css(format!("#{RESULTS_TABLE_ID} > tbody > tr:last-child"))
}

/// First data row of the grid. Its staleness signals that a postback has
/// replaced the page.
#[must_use]
pub fn anchor_row() -> Selector {
    Selector::css(format!("#{RESULTS_TABLE_ID} tr:nth-child(2)"))
}

#[must_use]
pub fn overlay_root() -> Selector {
    Selector::id("tbPublicInspectionMain")
}

#[must_use]
pub fn overlay_header() -> Selector {
    Selector::id(format!("{VIOLATIONS_PREFIX}_lblHeader"))
}

#[must_use]
pub fn facility_information() -> Selector {
    Selector::id(format!("{VIOLATIONS_PREFIX}_lblFacilityInformation"))
}

#[must_use]
pub fn violation_code(index: usize) -> Selector {
    Selector::id(format!(
        "{VIOLATIONS_PREFIX}_rptViolations_lblRegulatorCodeType_{index}"
    ))
}

#[must_use]
pub fn explanation_toggle(index: usize) -> Selector {
    Selector::id(format!(
        "{VIOLATIONS_PREFIX}_rptViolations_lnkToggleCodeExplanation_{index}"
    ))
}

#[must_use]
pub fn explanation_panel(index: usize) -> Selector {
    Selector::id(format!(
        "{VIOLATIONS_PREFIX}_rptViolations_pnlCodeExplanation_{index}"
    ))
}

/// Text container nested inside an explanation panel.
#[must_use]
pub fn explanation_text() -> Selector {
    Selector::css("div > div")
}

#[must_use]
pub fn comments_panel(index: usize) -> Selector {
    Selector::id(format!("{VIOLATIONS_PREFIX}_rptViolations_pnlComments_{index}"))
}

/// Close control of the colorbox overlay.
#[must_use]
pub fn overlay_close() -> Selector {
    Selector::id("cboxClose")
}
