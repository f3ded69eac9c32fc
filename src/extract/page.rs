use super::PageIndex;
use crate::events::ProgressReporter;
use crate::site::{FrameHandle, SiteAdapter};
use crate::{ExtractError, Result};
use regex::Regex;
use serde_json::{Map, Value};
use std::future::Future;
use std::time::Duration;

/// Pulls the client-side state container out of one result page at a time.
///
/// Tracks which page the frame currently shows so page 1 is never clicked.
pub struct PageExtractor {
    state_global: String,
    settle: Duration,
    timeout: Duration,
    current: PageIndex,
}

impl PageExtractor {
    pub fn new(state_global: impl Into<String>, settle: Duration, timeout: Duration) -> Self {
        Self {
            state_global: state_global.into(),
            settle,
            timeout,
            current: PageIndex::FIRST,
        }
    }

    /// Every failure here is an [`ExtractError::ExtractionFailed`] miss.
    pub async fn extract(
        &mut self,
        adapter: &dyn SiteAdapter,
        frame: &FrameHandle,
        page: PageIndex,
        reporter: &mut ProgressReporter,
    ) -> Result<Map<String, Value>> {
        let miss = |reason: String| ExtractError::ExtractionFailed {
            page: page.get(),
            reason,
        };

        if page != self.current {
            reporter.info(format!("Moving to page {}", page));
            let clicked = self
                .bounded("Pagination click", adapter.goto_page(frame, page.get()))
                .await
                .map_err(|e| miss(e.to_string()))?;
            if !clicked {
                return Err(miss("pagination control not found".into()));
            }
            self.current = page;
            tokio::time::sleep(self.settle).await;
        }

        reporter.info(format!("Extracting page {} data", page));

        match self
            .bounded("State read", adapter.read_state(frame, &self.state_global))
            .await
        {
            Ok(Some(Value::Object(state))) => return Ok(state),
            Ok(Some(other)) => {
                reporter.warning(format!(
                    "Page {}: {} is not an object ({}), scanning inline scripts",
                    page,
                    self.state_global,
                    json_kind(&other)
                ));
            }
            Ok(None) => {
                reporter.warning(format!(
                    "Page {}: {} not exposed, scanning inline scripts",
                    page, self.state_global
                ));
            }
            Err(e) => {
                reporter.warning(format!(
                    "Page {}: reading {} failed ({}), scanning inline scripts",
                    page, self.state_global, e
                ));
            }
        }

        let scripts = self
            .bounded("Inline script scan", adapter.inline_scripts(frame))
            .await
            .map_err(|e| miss(e.to_string()))?;

        match parse_state_from_scripts(&scripts, &self.state_global) {
            Ok(Some(state)) => {
                tracing::debug!(page = page.get(), "State recovered from inline script");
                Ok(state)
            }
            Ok(None) => Err(miss(format!("{} not found", self.state_global))),
            Err(e) => {
                reporter.warning(format!(
                    "Page {}: inline {} could not be parsed: {}",
                    page, self.state_global, e
                ));
                Err(miss(format!("inline state parse error: {}", e)))
            }
        }
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ExtractError::timeout(operation, self.timeout)),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Finds `<global> = {...}` in inline script text and parses the literal.
///
/// Returns the first assignment that parses as a JSON object. When
/// assignments exist but none parse, the last parse error is returned.
pub fn parse_state_from_scripts(
    scripts: &[String],
    global: &str,
) -> std::result::Result<Option<Map<String, Value>>, serde_json::Error> {
    let pattern = format!(r"(?:window\.)?{}\s*=\s*", regex::escape(global));
    let Ok(assignment) = Regex::new(&pattern) else {
        return Ok(None);
    };

    let mut last_error = None;
    for script in scripts {
        for found in assignment.find_iter(script) {
            let literal = &script[found.end()..];
            let mut values = serde_json::Deserializer::from_str(literal).into_iter::<Value>();
            match values.next() {
                Some(Ok(Value::Object(state))) => return Ok(Some(state)),
                Some(Ok(_)) | None => {}
                Some(Err(e)) => last_error = Some(e),
            }
        }
    }

    match last_error {
        Some(e) => Err(e),
        None => Ok(None),
    }
}
