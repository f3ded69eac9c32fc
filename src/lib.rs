pub mod chrome;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod extract;
pub mod handlers;
pub mod js_templates;
pub mod output;
pub mod retry;
pub mod server;
pub mod site;
pub mod timeouts;
pub mod utils;

pub use config::{Config, ServerConfig};
pub use error::ExtractError;
pub use events::{EventBroadcaster, ProgressEvent, ProgressReporter, Severity};
pub use extract::{
    ExtractionOutcome, ExtractionRequest, ExtractionSettings, MergedResult, PageIndex,
    SessionController, SessionState,
};
pub use site::{BrowserLauncher, EntryStrategy, FrameHandle, PageControl, SiteAdapter, SiteProfile};

pub type Result<T> = std::result::Result<T, ExtractError>;
