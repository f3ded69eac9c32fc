use crate::js_templates;
use crate::site::{EntryStrategy, FrameHandle, PageControl, SiteAdapter, SiteProfile};
use crate::timeouts::{ms, secs};
use crate::{ExtractError, Result};
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::{Browser, Page};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// One launched Chrome with a single tab, scripted against the result frame
/// from the top document.
pub struct ChromeSiteAdapter {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Page,
    site: SiteProfile,
    closed: bool,
}

#[derive(Debug, Deserialize)]
struct FrameProbe {
    found: bool,
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    ready: Option<String>,
    #[serde(default)]
    locator: String,
}

#[derive(Debug, Deserialize)]
struct InFrame<T> {
    frame: bool,
    value: Option<T>,
}

impl ChromeSiteAdapter {
    pub fn new(browser: Browser, handler: JoinHandle<()>, page: Page, site: SiteProfile) -> Self {
        Self {
            browser,
            handler,
            page,
            site,
            closed: false,
        }
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| ExtractError::EvaluationError(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| ExtractError::EvaluationError(e.to_string()))
    }

    /// Runs a frame-scoped script. `None` means the script yielded null.
    async fn eval_in_frame<T: DeserializeOwned>(
        &self,
        frame: &FrameHandle,
        script: String,
    ) -> Result<Option<T>> {
        let result: InFrame<T> = self.eval(script).await?;
        if !result.frame {
            return Err(ExtractError::EvaluationError(format!(
                "result frame '{}' is no longer accessible",
                frame.name
            )));
        }
        Ok(result.value)
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| ExtractError::NavigationFailed(format!("Invalid navigation: {}", e)))?;

        let response = self
            .page
            .execute(params)
            .await
            .map_err(|e| ExtractError::NavigationFailed(e.to_string()))?;

        if let Some(error) = &response.result.error_text {
            return Err(ExtractError::NavigationFailed(format!("{} ({})", error, url)));
        }

        self.wait_for_load().await
    }

    /// Returns once `readyState` reads `complete` twice in a row. The caller
    /// bounds the total wait.
    async fn wait_for_load(&self) -> Result<()> {
        let mut stable_count = 0;

        loop {
            match tokio::time::timeout(
                Duration::from_secs(secs::READY_STATE),
                self.page.evaluate(js_templates::READY_STATE),
            )
            .await
            {
                Ok(Ok(result)) => {
                    if let Ok(state) = result.into_value::<String>() {
                        if state == "complete" {
                            stable_count += 1;
                            if stable_count >= 2 {
                                return Ok(());
                            }
                        } else {
                            stable_count = 0;
                        }
                    }
                }
                Ok(Err(_)) | Err(_) => {
                    stable_count = 0;
                }
            }
            tokio::time::sleep(Duration::from_millis(ms::POLL_INTERVAL)).await;
        }
    }

    async fn submit_search(&self, keyword: &str) -> Result<()> {
        let selector = self.site.search_input_selector.as_str();
        let timeout = Duration::from_millis(ms::SELECTOR_TIMEOUT);
        let start = Instant::now();

        let input = loop {
            if let Ok(element) = self.page.find_element(selector).await {
                break element;
            }
            if start.elapsed() >= timeout {
                return Err(ExtractError::ElementNotFound {
                    selector: selector.to_string(),
                });
            }
            tokio::time::sleep(Duration::from_millis(ms::POLL_INTERVAL)).await;
        };

        input
            .click()
            .await
            .map_err(|e| ExtractError::NavigationFailed(format!("Failed to focus search box: {}", e)))?
            .type_str(keyword)
            .await
            .map_err(|e| ExtractError::NavigationFailed(format!("Failed to type keyword: {}", e)))?;

        self.press_key("Enter").await?;
        tokio::time::sleep(Duration::from_millis(ms::SEARCH_SUBMIT_SETTLE)).await;
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        for key_down in [true, false] {
            let kind = if key_down {
                DispatchKeyEventType::KeyDown
            } else {
                DispatchKeyEventType::KeyUp
            };
            let mut builder = DispatchKeyEventParams::builder().r#type(kind).key(key);
            if key == "Enter" {
                builder = builder.code("Enter").windows_virtual_key_code(13);
                if key_down {
                    builder = builder.text("\r");
                }
            }
            let params = builder
                .build()
                .map_err(|e| ExtractError::General(format!("Failed to build key event: {}", e)))?;
            self.page
                .execute(params)
                .await
                .map_err(|e| ExtractError::NavigationFailed(format!("Failed to press {}: {}", key, e)))?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SiteAdapter for ChromeSiteAdapter {
    async fn open_search(&self, keyword: &str, strategy: EntryStrategy) -> Result<()> {
        let url = self.site.entry_url(keyword, strategy)?;
        tracing::debug!(%url, %strategy, "Opening search");
        self.navigate(url.as_str()).await?;

        if strategy == EntryStrategy::Interactive {
            self.submit_search(keyword).await?;
        }
        Ok(())
    }

    async fn find_result_frame(&self) -> Result<Option<FrameHandle>> {
        let probe: FrameProbe = self
            .eval(js_templates::find_frame(
                &self.site.frame_name,
                &self.site.frame_url_marker,
            ))
            .await?;

        if !probe.found {
            return Ok(None);
        }
        if probe.ready.as_deref() != Some("complete") {
            tracing::debug!(ready = ?probe.ready, "Result frame present but not loaded");
            return Ok(None);
        }

        Ok(Some(FrameHandle {
            name: probe.name,
            url: probe.url,
            locator: probe.locator,
        }))
    }

    async fn list_page_controls(&self, frame: &FrameHandle) -> Result<Vec<PageControl>> {
        let controls: Option<Vec<PageControl>> = self
            .eval_in_frame(
                frame,
                js_templates::list_page_controls(
                    &frame.locator,
                    &self.site.pagination_selector,
                    &self.site.inactive_page_class,
                ),
            )
            .await?;
        Ok(controls.unwrap_or_default())
    }

    async fn goto_page(&self, frame: &FrameHandle, page: u32) -> Result<bool> {
        let clicked: Option<bool> = self
            .eval_in_frame(
                frame,
                js_templates::click_page(&frame.locator, &self.site.pagination_selector, page),
            )
            .await?;
        Ok(clicked.unwrap_or(false))
    }

    async fn read_state(&self, frame: &FrameHandle, global: &str) -> Result<Option<Value>> {
        let state: Option<Value> = self
            .eval_in_frame(frame, js_templates::read_state(&frame.locator, global))
            .await?;
        Ok(state.filter(|v| !v.is_null()))
    }

    async fn inline_scripts(&self, frame: &FrameHandle) -> Result<Vec<String>> {
        let scripts: Option<Vec<String>> = self
            .eval_in_frame(frame, js_templates::inline_scripts(&frame.locator))
            .await?;
        Ok(scripts.unwrap_or_default())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let closed = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| ExtractError::TeardownFailed(e.to_string()));
        // Reap the child even when the close command failed.
        let waited = self.browser.wait().await;
        self.handler.abort();

        closed?;
        waited.map_err(|e| ExtractError::TeardownFailed(e.to_string()))?;
        tracing::debug!("Chrome process exited");
        Ok(())
    }
}
