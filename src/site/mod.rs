//! Target-site seam.
//!
//! Everything that knows about the search site's markup lives behind
//! [`SiteAdapter`]: where the result frame is, what the pagination controls
//! look like and which global holds the client state. The orchestration in
//! [`crate::extract`] only talks to these traits, so a different site or a
//! scripted fake can be plugged in without touching it.

pub mod profile;

use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use profile::SiteProfile;

/// How the session reaches the search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EntryStrategy {
    /// Load the landing page, type the keyword into the search box and submit.
    #[default]
    Interactive,
    /// Load a URL that already carries the keyword.
    DeepLink,
}

impl std::fmt::Display for EntryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interactive => write!(f, "interactive"),
            Self::DeepLink => write!(f, "deep-link"),
        }
    }
}

/// A located result frame.
///
/// `locator` is a CSS selector for the `<iframe>` element in the top document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameHandle {
    pub name: String,
    pub url: String,
    pub locator: String,
}

/// One pagination control as rendered inside the result frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageControl {
    pub label: String,
    #[serde(default)]
    pub disabled: bool,
}

impl PageControl {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            disabled: false,
        }
    }

    pub fn disabled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            disabled: true,
        }
    }
}

/// A live browser session bound to the target site.
///
/// Owned by exactly one extraction request. `close` releases the browser and
/// is called exactly once by the session controller.
#[async_trait::async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Performs the single navigation to the search results for `keyword`.
    async fn open_search(&self, keyword: &str, strategy: EntryStrategy) -> Result<()>;

    /// One detection probe. `Ok(None)` means "not there yet".
    async fn find_result_frame(&self) -> Result<Option<FrameHandle>>;

    async fn list_page_controls(&self, frame: &FrameHandle) -> Result<Vec<PageControl>>;

    /// Clicks the control for `page`. Returns `false` when no control matched.
    async fn goto_page(&self, frame: &FrameHandle, page: u32) -> Result<bool>;

    /// Reads `window[global]` from the frame. `Ok(None)` when it is absent.
    async fn read_state(&self, frame: &FrameHandle, global: &str) -> Result<Option<Value>>;

    /// Text of every inline `<script>` in the frame document.
    async fn inline_scripts(&self, frame: &FrameHandle) -> Result<Vec<String>>;

    async fn close(&mut self) -> Result<()>;
}

/// Starts one browser resource per call. Sessions are never shared.
#[async_trait::async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn SiteAdapter>>;
}
