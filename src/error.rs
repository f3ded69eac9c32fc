use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Navigation timeout after {0}s")]
    NavigationTimeout(u64),

    #[error("Result frame not found after {attempts} attempts")]
    FrameNotFound { attempts: u32 },

    #[error("Failed to read pagination: {0}")]
    PaginationFailed(String),

    #[error("Page {page} extraction failed: {reason}")]
    ExtractionFailed { page: u32, reason: String },

    #[error("No data extracted from {pages} page(s)")]
    NoDataExtracted { pages: usize },

    #[error("Browser teardown failed: {0}")]
    TeardownFailed(String),

    #[error("{operation} timed out after {}", format_timeout(.ms))]
    Timeout { operation: String, ms: u64 },

    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("JavaScript evaluation failed: {0}")]
    EvaluationError(String),

    #[error("Search keyword must not be empty")]
    EmptyKeyword,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    #[error("General error: {0}")]
    General(String),
}

fn format_timeout(ms: &u64) -> String {
    let ms = *ms;
    if ms % 1000 == 0 {
        format!("{}s", ms / 1000)
    } else if ms < 1000 {
        format!("{}ms", ms)
    } else {
        format!("{:.1}s", ms as f64 / 1000.0)
    }
}

impl ExtractError {
    pub fn timeout(operation: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Per-page failures are recorded as misses; everything else ends the request.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ExtractionFailed { .. })
    }

    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::LaunchFailed(_) => vec![
                "Ensure Chrome/Chromium is installed".into(),
                "Try specifying Chrome path with --chrome-path or CHROME_PATH".into(),
                "Inside containers keep browser.no_sandbox enabled".into(),
            ],
            Self::NavigationTimeout(timeout) => vec![
                format!("Increase timeout with --timeout {}", timeout + 30),
                "Check network connectivity".into(),
                "Verify the search page is reachable from this host".into(),
            ],
            Self::FrameNotFound { .. } => vec![
                "Raise retry.frame_attempts or retry.frame_interval_ms".into(),
                "Check site.frame_name and site.frame_url_marker against the live page".into(),
                "Run with --headless false to watch the page render".into(),
            ],
            Self::NoDataExtracted { .. } => vec![
                "Check site.state_global against the live page".into(),
                "Raise timeouts.settle_ms if pages render slowly".into(),
            ],
            Self::ElementNotFound { selector } => vec![
                format!("Check if element '{}' exists on the page", selector),
                "Try --strategy deep-link to skip the search box".into(),
            ],
            Self::ConfigError(_) | Self::TomlDeError(_) | Self::TomlSerError(_) => vec![
                "Check configuration file syntax".into(),
                "Run `map-extractor config show` to inspect the effective config".into(),
            ],
            Self::EmptyKeyword => vec!["Pass a keyword: map-extractor search <keyword>".into()],
            _ => vec![
                "Run with --verbose for more details".into(),
                "Check the documentation for help".into(),
            ],
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::LaunchFailed(_) => 3,
            Self::NavigationFailed(_) | Self::NavigationTimeout(_) | Self::Timeout { .. } => 4,
            Self::FrameNotFound { .. } | Self::ElementNotFound { .. } => 5,
            Self::NoDataExtracted { .. } | Self::ExtractionFailed { .. } => 6,
            Self::ConfigError(_)
            | Self::TomlDeError(_)
            | Self::TomlSerError(_)
            | Self::InvalidUrl(_) => 7,
            Self::EmptyKeyword => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_page_failures_are_recoverable() {
        let miss = ExtractError::ExtractionFailed {
            page: 2,
            reason: "state container not found".into(),
        };
        assert!(miss.is_recoverable());
        assert!(!ExtractError::FrameNotFound { attempts: 5 }.is_recoverable());
        assert!(!ExtractError::NoDataExtracted { pages: 3 }.is_recoverable());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ExtractError::NoDataExtracted { pages: 3 }.to_string(),
            "No data extracted from 3 page(s)"
        );
        assert_eq!(
            ExtractError::timeout("Launch", std::time::Duration::from_secs(60)).to_string(),
            "Launch timed out after 60s"
        );
        assert_eq!(
            ExtractError::timeout("Reading pagination", std::time::Duration::from_millis(100))
                .to_string(),
            "Reading pagination timed out after 100ms"
        );
        assert_eq!(
            ExtractError::timeout("Reading page 2", std::time::Duration::from_millis(2500))
                .to_string(),
            "Reading page 2 timed out after 2.5s"
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExtractError::LaunchFailed("x".into()).exit_code(), 3);
        assert_eq!(ExtractError::FrameNotFound { attempts: 1 }.exit_code(), 5);
        assert_eq!(ExtractError::EmptyKeyword.exit_code(), 2);
        assert_eq!(ExtractError::General("x".into()).exit_code(), 1);
    }
}
