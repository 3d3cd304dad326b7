//! Output record types for extracted food safety inspections.
//!
//! Field names serialize in camelCase to match the published JSON shape:
//!
//! ```json
//! {
//!     "ownerName": null,
//!     "tradeName": "Corner Cafe",
//!     "establishmentTypes": [],
//!     "mapAddress": "100 Main St Topeka, KS 66603",
//!     "inspections": [
//!         {
//!             "inspectionDate": "1/14/2025",
//!             "inspectionType": "Routine",
//!             "violations": [
//!                 { "code": "3-501.16", "codeExplanation": null, "inspectorComments": null }
//!             ]
//!         }
//!     ]
//! }
//! ```
//!
//! Records have no natural key. The results table exposes no stable record
//! ID, so identity is the order of discovery.

use serde::{Deserialize, Serialize};

/// One establishment row from the results table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionRecord {
    /// Never exposed by the results table; always `null` in practice.
    pub owner_name: Option<String>,
    pub trade_name: String,
    pub establishment_types: Vec<String>,
    pub map_address: String,
    /// Always holds at least one event. Construct through
    /// [`InspectionRecord::new`] to keep that guarantee.
    pub inspections: Vec<InspectionEvent>,
}

impl InspectionRecord {
    /// Builds a record around its first inspection event.
    #[must_use]
    pub fn new(
        trade_name: String,
        map_address: String,
        establishment_types: Vec<String>,
        first_inspection: InspectionEvent,
    ) -> Self {
        Self {
            owner_name: None,
            trade_name,
            establishment_types,
            map_address,
            inspections: vec![first_inspection],
        }
    }
}

/// A single inspection of an establishment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionEvent {
    /// Site-native date text, e.g. `1/14/2025`. Not reparsed.
    pub inspection_date: String,
    pub inspection_type: Option<String>,
    pub violations: Vec<Violation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility_information: Option<String>,
    /// Set when the violation details could not be extracted; `violations`
    /// is then empty regardless of what the row reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_error: Option<String>,
}

impl InspectionEvent {
    #[must_use]
    pub fn new(inspection_date: String, inspection_type: Option<String>) -> Self {
        Self {
            inspection_date,
            inspection_type,
            violations: Vec::new(),
            facility_information: None,
            extraction_error: None,
        }
    }
}

/// One itemized violation from the details overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub code: String,
    pub code_explanation: Option<String>,
    pub inspector_comments: Option<String>,
}

/// Position of the traversal in the paginated results. Starts at page 1 and
/// only ever moves forward by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageCursor {
    page_number: u32,
}

impl PageCursor {
    #[must_use]
    pub fn first() -> Self {
        Self { page_number: 1 }
    }

    #[must_use]
    pub fn page_number(self) -> u32 {
        self.page_number
    }

    /// Page number the next navigation must land on.
    #[must_use]
    pub fn next_page_number(self) -> u32 {
        self.page_number.saturating_add(1)
    }

    /// Records a confirmed page transition.
    pub fn advance(&mut self) {
        self.page_number = self.next_page_number();
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::first()
    }
}

impl std::fmt::Display for PageCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "page {}", self.page_number)
    }
}
