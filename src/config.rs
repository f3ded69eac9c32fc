use crate::site::SiteProfile;
use crate::timeouts::{FRAME_ATTEMPTS, ms, secs};
use crate::{ExtractError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub site: SiteProfile,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    pub chrome_path: Option<PathBuf>,
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Container-friendly flags (`--no-sandbox`, `--disable-dev-shm-usage`).
    #[serde(default = "default_no_sandbox")]
    pub no_sandbox: bool,
    /// Needed to script a cross-origin result frame from the top document.
    #[serde(default = "default_disable_web_security")]
    pub disable_web_security: bool,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_operation_timeout")]
    pub operation_seconds: u64,
    #[serde(default = "default_initial_load_timeout")]
    pub initial_load_seconds: u64,
    #[serde(default = "default_settle")]
    pub settle_ms: u64,
    #[serde(default = "default_inter_page")]
    pub inter_page_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_frame_attempts")]
    pub frame_attempts: u32,
    #[serde(default = "default_frame_interval")]
    pub frame_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    pub default_keyword: Option<String>,
}

fn default_headless() -> bool {
    true
}
fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    800
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36".to_string()
}
fn default_no_sandbox() -> bool {
    true
}
fn default_disable_web_security() -> bool {
    true
}
fn default_operation_timeout() -> u64 {
    secs::OPERATION
}
fn default_initial_load_timeout() -> u64 {
    secs::INITIAL_LOAD
}
fn default_settle() -> u64 {
    ms::PAGE_SETTLE
}
fn default_inter_page() -> u64 {
    ms::INTER_PAGE
}
fn default_frame_attempts() -> u32 {
    FRAME_ATTEMPTS
}
fn default_frame_interval() -> u64 {
    ms::FRAME_RETRY_INTERVAL
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_server_port() -> u16 {
    3000
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: default_headless(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            user_agent: default_user_agent(),
            no_sandbox: default_no_sandbox(),
            disable_web_security: default_disable_web_security(),
            extra_args: Vec::new(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            operation_seconds: default_operation_timeout(),
            initial_load_seconds: default_initial_load_timeout(),
            settle_ms: default_settle(),
            inter_page_ms: default_inter_page(),
        }
    }
}

impl TimeoutConfig {
    pub fn operation(&self) -> Duration {
        Duration::from_secs(self.operation_seconds)
    }

    pub fn initial_load(&self) -> Duration {
        Duration::from_secs(self.initial_load_seconds)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn inter_page(&self) -> Duration {
        Duration::from_millis(self.inter_page_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            frame_attempts: default_frame_attempts(),
            frame_interval_ms: default_frame_interval(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_server_port(),
            default_keyword: None,
        }
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    default_config_dir().map(|p| p.join("config.toml"))
}

pub fn default_config_dir() -> Result<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
        .map(|p| p.join("map-extractor"))
        .ok_or_else(|| ExtractError::ConfigError("Could not determine config directory".into()))
}

pub const PROJECT_CONFIG_FILE: &str = ".map-extractor.toml";

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        let global_path = default_config_path()?;
        if global_path.exists() {
            config = Self::from_file(&global_path)?;
        }

        let project_path = PathBuf::from(PROJECT_CONFIG_FILE);
        if project_path.exists() {
            let content = std::fs::read_to_string(&project_path)?;
            config = config.merge(toml::from_str(&content)?)?;
        }

        config.load_from_env();

        Ok(config)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn load_with_overrides(&self, cli_overrides: ConfigOverrides) -> Self {
        let mut config = self.clone();

        if let Some(headless) = cli_overrides.headless {
            config.browser.headless = headless;
        }
        if let Some(chrome_path) = cli_overrides.chrome_path {
            config.browser.chrome_path = Some(chrome_path);
        }
        if let Some(timeout) = cli_overrides.timeout {
            config.timeouts.operation_seconds = timeout;
        }
        if let Some(strategy) = cli_overrides.strategy {
            config.site.entry_strategy = strategy;
        }

        config
    }

    /// Overlays a project file onto this config.
    ///
    /// Only keys present in `project` change; `browser.extra_args` appends.
    fn merge(self, project: toml::Table) -> Result<Self> {
        let mut layered = toml::Table::try_from(&self)?;
        overlay(&mut layered, project);
        Ok(layered.try_into()?)
    }

    fn load_from_env(&mut self) {
        if let Ok(keyword) = std::env::var("MAP_EXTRACTOR_KEYWORD")
            .or_else(|_| std::env::var("DEFAULT_KEYWORD"))
            && !keyword.trim().is_empty()
        {
            self.server.default_keyword = Some(keyword);
        }
        if let Ok(port) = std::env::var("PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
        }
        if let Ok(headless) = std::env::var("CHROME_HEADLESS") {
            self.browser.headless = headless == "true" || headless == "1";
        }
        if let Ok(path) = std::env::var("CHROME_PATH") {
            self.browser.chrome_path = Some(PathBuf::from(path));
        }
        if let Ok(timeout) = std::env::var("MAP_EXTRACTOR_TIMEOUT")
            && let Ok(timeout) = timeout.parse()
        {
            self.timeouts.operation_seconds = timeout;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeouts.operation_seconds == 0 {
            return Err(ExtractError::ConfigError(
                "timeouts.operation_seconds must be greater than 0".into(),
            ));
        }

        if self.timeouts.initial_load_seconds == 0 {
            return Err(ExtractError::ConfigError(
                "timeouts.initial_load_seconds must be greater than 0".into(),
            ));
        }

        if self.retry.frame_attempts == 0 {
            return Err(ExtractError::ConfigError(
                "retry.frame_attempts must be at least 1".into(),
            ));
        }

        if self.browser.window_width == 0 || self.browser.window_height == 0 {
            return Err(ExtractError::ConfigError(
                "browser window size must be non-zero".into(),
            ));
        }

        if let Some(ref path) = self.browser.chrome_path
            && !path.exists()
        {
            return Err(ExtractError::ConfigError(format!(
                "Chrome path does not exist: {}",
                path.display()
            )));
        }

        self.site.validate()
    }

    pub fn show_masked(&self) -> String {
        format!(
            r#"Browser:
  Chrome Path: {}
  Headless: {}
  Viewport: {}x{}
  No Sandbox: {}

Timeouts:
  Operation: {}s
  Initial Load: {}s
  Settle: {}ms
  Between Pages: {}ms

Retry:
  Frame Attempts: {}
  Frame Interval: {}ms

Site:
  Search URL: {}
  Deep Link Base: {}
  Entry Strategy: {}
  Frame: {} / {}
  State Global: {}

Server:
  Listen: {}:{}
  Default Keyword: {}
"#,
            self.browser
                .chrome_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "auto-detect".into()),
            self.browser.headless,
            self.browser.window_width,
            self.browser.window_height,
            self.browser.no_sandbox,
            self.timeouts.operation_seconds,
            self.timeouts.initial_load_seconds,
            self.timeouts.settle_ms,
            self.timeouts.inter_page_ms,
            self.retry.frame_attempts,
            self.retry.frame_interval_ms,
            self.site.search_url,
            self.site.deep_link_base,
            self.site.entry_strategy,
            self.site.frame_name,
            self.site.frame_url_marker,
            self.site.state_global,
            self.server.host,
            self.server.port,
            self.server.default_keyword.as_deref().unwrap_or("none"),
        )
    }
}

fn overlay(base: &mut toml::Table, layer: toml::Table) {
    for (key, value) in layer {
        let value = match (base.remove(&key), value) {
            (Some(toml::Value::Table(mut inner)), toml::Value::Table(layer)) => {
                overlay(&mut inner, layer);
                toml::Value::Table(inner)
            }
            (Some(toml::Value::Array(mut args)), toml::Value::Array(extra)) if key == "extra_args" => {
                args.extend(extra);
                toml::Value::Array(args)
            }
            (_, value) => value,
        };
        base.insert(key, value);
    }
}

#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub headless: Option<bool>,
    pub chrome_path: Option<PathBuf>,
    pub timeout: Option<u64>,
    pub strategy: Option<crate::site::EntryStrategy>,
}
