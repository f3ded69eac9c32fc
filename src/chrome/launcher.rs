use super::ChromeSiteAdapter;
use crate::config::{BrowserConfig as BrowserSettings, Config};
use crate::site::{BrowserLauncher, SiteAdapter, SiteProfile};
use crate::timeouts::secs;
use crate::utils::find_chrome_executable;
use crate::{ExtractError, Result};
use chromiumoxide::{Browser, BrowserConfig, Page};
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;

/// Launches a fresh Chrome per extraction run.
pub struct ChromeLauncher {
    browser: BrowserSettings,
    site: SiteProfile,
    request_timeout: Duration,
}

impl ChromeLauncher {
    pub fn new(config: &Config) -> Self {
        Self {
            browser: config.browser.clone(),
            site: config.site.clone(),
            request_timeout: config.timeouts.operation(),
        }
    }

    fn chrome_path(&self) -> Result<PathBuf> {
        match &self.browser.chrome_path {
            Some(path) if path.exists() => Ok(path.clone()),
            Some(path) => Err(ExtractError::LaunchFailed(format!(
                "Chrome executable not found at {}",
                path.display()
            ))),
            None => find_chrome_executable(),
        }
    }

    pub fn browser_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--no-first-run".into(),
            "--no-default-browser-check".into(),
            "--disable-gpu".into(),
            "--disable-dev-shm-usage".into(),
        ];

        if self.browser.no_sandbox {
            args.push("--no-sandbox".into());
            args.push("--disable-setuid-sandbox".into());
        }

        if self.browser.disable_web_security {
            args.push("--disable-web-security".into());
            args.push("--disable-features=IsolateOrigins,site-per-process".into());
            args.push("--disable-site-isolation-trials".into());
        }

        args.extend(self.browser.extra_args.iter().cloned());
        args
    }
}

#[async_trait::async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn SiteAdapter>> {
        let chrome_path = self.chrome_path()?;
        tracing::debug!(path = %chrome_path.display(), headless = self.browser.headless, "Launching Chrome");

        let mut builder = BrowserConfig::builder()
            .chrome_executable(&chrome_path)
            .request_timeout(self.request_timeout)
            .window_size(self.browser.window_width, self.browser.window_height)
            .viewport(None);

        if !self.browser.headless {
            builder = builder.with_head();
        }

        for arg in self.browser_args() {
            builder = builder.arg(arg);
        }

        let browser_config = builder.build().map_err(ExtractError::LaunchFailed)?;

        let (mut browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ExtractError::LaunchFailed(e.to_string()))?;

        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = match prepare_page(&browser, &self.browser.user_agent).await {
            Ok(page) => page,
            Err(e) => {
                // Half-started browsers are closed here since no adapter owns them yet.
                let _ = tokio::time::timeout(Duration::from_secs(secs::TEARDOWN), async {
                    let _ = browser.close().await;
                    let _ = browser.wait().await;
                })
                .await;
                handler_task.abort();
                return Err(e);
            }
        };

        Ok(Box::new(ChromeSiteAdapter::new(
            browser,
            handler_task,
            page,
            self.site.clone(),
        )))
    }
}

async fn prepare_page(browser: &Browser, user_agent: &str) -> Result<Page> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| ExtractError::LaunchFailed(format!("Failed to open page: {}", e)))?;

    if !user_agent.is_empty() {
        let params = SetUserAgentOverrideParams::builder()
            .user_agent(user_agent)
            .build()
            .map_err(ExtractError::LaunchFailed)?;
        page.execute(params)
            .await
            .map_err(|e| ExtractError::LaunchFailed(format!("Failed to set user agent: {}", e)))?;
    }

    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args_allow_frame_scripting() {
        let launcher = ChromeLauncher::new(&Config::default());
        let args = launcher.browser_args();
        assert!(args.contains(&"--disable-web-security".to_string()));
        assert!(args.contains(&"--disable-site-isolation-trials".to_string()));
        assert!(args.contains(&"--no-sandbox".to_string()));
    }

    #[test]
    fn test_args_follow_config() {
        let mut config = Config::default();
        config.browser.no_sandbox = false;
        config.browser.disable_web_security = false;
        config.browser.extra_args = vec!["--lang=ko-KR".into()];

        let args = ChromeLauncher::new(&config).browser_args();
        assert!(!args.iter().any(|a| a == "--no-sandbox"));
        assert!(!args.iter().any(|a| a == "--disable-web-security"));
        assert_eq!(args.last().map(String::as_str), Some("--lang=ko-KR"));
    }

    #[test]
    fn test_missing_configured_path() {
        let mut config = Config::default();
        config.browser.chrome_path = Some(PathBuf::from("/nonexistent/chrome"));
        let err = ChromeLauncher::new(&config).chrome_path().unwrap_err();
        assert!(matches!(err, ExtractError::LaunchFailed(_)));
    }
}
