use std::path::PathBuf;
use std::time::Duration;

/// Public inspection search page of the Kansas Department of Agriculture
/// food safety program.
pub const DEFAULT_SEARCH_URL: &str =
    "https://foodsafety.kda.ks.gov/FoodSafety/Web/Inspection/PublicInspectionSearch.aspx";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub search_url: String,
    pub webdriver_url: String,
    pub headless: bool,
    pub output_path: PathBuf,
    pub log_level: String,
    pub initial_load_timeout_secs: u64,
    pub page_wait_timeout_secs: u64,
    pub row_wait_timeout_secs: u64,
    pub overlay_wait_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub max_retries: u32,
    /// Stop after this many pages; `0` means no limit.
    pub max_pages: usize,
}

impl AppConfig {
    #[must_use]
    pub fn initial_load_timeout(&self) -> Duration {
        Duration::from_secs(self.initial_load_timeout_secs)
    }

    #[must_use]
    pub fn page_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.page_wait_timeout_secs)
    }

    #[must_use]
    pub fn row_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.row_wait_timeout_secs)
    }

    #[must_use]
    pub fn overlay_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.overlay_wait_timeout_secs)
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Page limit as an `Option`, with `0` mapped to `None`.
    #[must_use]
    pub fn page_limit(&self) -> Option<usize> {
        (self.max_pages > 0).then_some(self.max_pages)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            webdriver_url: "http://localhost:4444".to_string(),
            headless: true,
            output_path: PathBuf::from("./inspection_data.json"),
            log_level: "info".to_string(),
            initial_load_timeout_secs: 20,
            page_wait_timeout_secs: 15,
            row_wait_timeout_secs: 10,
            overlay_wait_timeout_secs: 10,
            probe_timeout_secs: 2,
            max_retries: 3,
            max_pages: 0,
        }
    }
}
