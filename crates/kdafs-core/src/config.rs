use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is present but its value is invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is present but its value is invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every option has a default, so an empty environment yields
/// [`AppConfig::default`].
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let defaults = AppConfig::default();

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: u32| -> Result<u32, ConfigError> {
        match lookup(var) {
            Ok(raw) => raw.trim().parse::<u32>().map_err(|e| invalid(var, e.to_string())),
            Err(_) => Ok(default),
        }
    };

    let parse_u64 = |var: &str, default: u64| -> Result<u64, ConfigError> {
        match lookup(var) {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|e| invalid(var, e.to_string())),
            Err(_) => Ok(default),
        }
    };

    let parse_usize = |var: &str, default: usize| -> Result<usize, ConfigError> {
        match lookup(var) {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|e| invalid(var, e.to_string())),
            Err(_) => Ok(default),
        }
    };

    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match lookup(var) {
            Ok(raw) => parse_flag(&raw).ok_or_else(|| {
                invalid(var, format!("expected true/false, got \"{raw}\""))
            }),
            Err(_) => Ok(default),
        }
    };

    let search_url = or_default("KDAFS_SEARCH_URL", &defaults.search_url);
    let webdriver_url = or_default("KDAFS_WEBDRIVER_URL", &defaults.webdriver_url);
    let headless = parse_bool("KDAFS_HEADLESS", defaults.headless)?;
    let output_path = lookup("KDAFS_OUTPUT_PATH").map_or(defaults.output_path, PathBuf::from);
    let log_level = or_default("KDAFS_LOG_LEVEL", &defaults.log_level);

    let initial_load_timeout_secs = parse_u64(
        "KDAFS_INITIAL_LOAD_TIMEOUT_SECS",
        defaults.initial_load_timeout_secs,
    )?;
    let page_wait_timeout_secs =
        parse_u64("KDAFS_PAGE_WAIT_TIMEOUT_SECS", defaults.page_wait_timeout_secs)?;
    let row_wait_timeout_secs =
        parse_u64("KDAFS_ROW_WAIT_TIMEOUT_SECS", defaults.row_wait_timeout_secs)?;
    let overlay_wait_timeout_secs = parse_u64(
        "KDAFS_OVERLAY_WAIT_TIMEOUT_SECS",
        defaults.overlay_wait_timeout_secs,
    )?;
    let probe_timeout_secs = parse_u64("KDAFS_PROBE_TIMEOUT_SECS", defaults.probe_timeout_secs)?;
    let max_retries = parse_u32("KDAFS_MAX_RETRIES", defaults.max_retries)?;
    let max_pages = parse_usize("KDAFS_MAX_PAGES", defaults.max_pages)?;

    if initial_load_timeout_secs < page_wait_timeout_secs {
        return Err(invalid(
            "KDAFS_INITIAL_LOAD_TIMEOUT_SECS",
            format!(
                "must be at least KDAFS_PAGE_WAIT_TIMEOUT_SECS ({page_wait_timeout_secs}), got {initial_load_timeout_secs}"
            ),
        ));
    }

    Ok(AppConfig {
        search_url,
        webdriver_url,
        headless,
        output_path,
        log_level,
        initial_load_timeout_secs,
        page_wait_timeout_secs,
        row_wait_timeout_secs,
        overlay_wait_timeout_secs,
        probe_timeout_secs,
        max_retries,
        max_pages,
    })
}

/// Parse a boolean flag. Accepts `true/false`, `1/0`, `yes/no` (case-insensitive).
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
