use super::{
    ExtractionRequest, FrameResolver, MergedResult, PageExtractor, PageFragment, PageIndex,
    PaginationEnumerator, SessionState, merge,
};
use crate::config::Config;
use crate::events::{EventBroadcaster, ProgressEvent, ProgressReporter};
use crate::retry::RetryPolicy;
use crate::site::{BrowserLauncher, SiteAdapter};
use crate::timeouts::secs;
use crate::{ExtractError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Knobs the controller needs from [`Config`].
#[derive(Debug, Clone)]
pub struct ExtractionSettings {
    pub frame_retry: RetryPolicy,
    pub operation_timeout: Duration,
    pub initial_load_timeout: Duration,
    pub teardown_timeout: Duration,
    pub settle: Duration,
    pub inter_page: Duration,
    pub state_global: String,
}

impl ExtractionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            frame_retry: RetryPolicy::from(&config.retry),
            operation_timeout: config.timeouts.operation(),
            initial_load_timeout: config.timeouts.initial_load(),
            teardown_timeout: Duration::from_secs(secs::TEARDOWN),
            settle: config.timeouts.settle(),
            inter_page: config.timeouts.inter_page(),
            state_global: config.site.state_global.clone(),
        }
    }
}

/// What a single run produced: the terminal result plus everything reported.
#[derive(Debug)]
pub struct ExtractionOutcome {
    pub result: Result<MergedResult>,
    pub events: Vec<ProgressEvent>,
    pub states: Vec<SessionState>,
}

impl ExtractionOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn final_state(&self) -> SessionState {
        self.states.last().copied().unwrap_or(SessionState::Idle)
    }

    pub fn into_result(self) -> Result<MergedResult> {
        self.result
    }
}

/// Drives one extraction request from launch to teardown.
pub struct SessionController {
    launcher: Arc<dyn BrowserLauncher>,
    broadcaster: Arc<EventBroadcaster>,
    settings: ExtractionSettings,
}

struct Run {
    reporter: ProgressReporter,
    states: Vec<SessionState>,
}

impl Run {
    fn enter(&mut self, state: SessionState) {
        tracing::debug!(?state, "Session state");
        self.states.push(state);
    }

    fn finish(self, result: Result<MergedResult>) -> ExtractionOutcome {
        ExtractionOutcome {
            result,
            events: self.reporter.into_events(),
            states: self.states,
        }
    }
}

impl SessionController {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        broadcaster: Arc<EventBroadcaster>,
        settings: ExtractionSettings,
    ) -> Self {
        Self {
            launcher,
            broadcaster,
            settings,
        }
    }

    /// Runs the request to completion. The browser, once launched, is closed
    /// exactly once before this returns, whatever happened in between.
    pub async fn run(&self, request: &ExtractionRequest) -> ExtractionOutcome {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!(
            "extract",
            %request_id,
            keyword = %request.keyword(),
            strategy = %request.strategy
        );
        self.run_session(request).instrument(span).await
    }

    async fn run_session(&self, request: &ExtractionRequest) -> ExtractionOutcome {
        let mut run = Run {
            reporter: ProgressReporter::new(self.broadcaster.clone()),
            states: vec![SessionState::Idle],
        };

        run.enter(SessionState::Launching);
        run.reporter
            .info(format!("Starting browser session for \"{}\"", request.keyword()));

        let launched = bounded(
            "Browser launch",
            self.settings.initial_load_timeout,
            self.launcher.launch(),
        )
        .await
        .map_err(|e| match e {
            ExtractError::Timeout { .. } | ExtractError::LaunchFailed(_) => e,
            other => ExtractError::LaunchFailed(other.to_string()),
        });

        let mut adapter = match launched {
            Ok(adapter) => adapter,
            Err(e) => {
                // Nothing was acquired, so there is nothing to release.
                run.enter(SessionState::ClosingFailure);
                run.reporter.error(format!("Error: {}", e));
                return run.finish(Err(e));
            }
        };
        run.reporter.info("Browser started");

        let result = self.drive(adapter.as_ref(), request, &mut run).await;

        let closing = if result.is_ok() {
            SessionState::ClosingSuccess
        } else {
            SessionState::ClosingFailure
        };
        run.enter(closing);

        match &result {
            Ok(merged) => run.reporter.success(format!(
                "Extraction complete: {} of {} page(s)",
                merged.extracted.len(),
                merged.pages.len()
            )),
            Err(e) => run.reporter.error(format!("Error: {}", e)),
        }

        self.teardown(adapter.as_mut(), &mut run).await;

        run.finish(result)
    }

    async fn drive(
        &self,
        adapter: &dyn SiteAdapter,
        request: &ExtractionRequest,
        run: &mut Run,
    ) -> Result<MergedResult> {
        run.enter(SessionState::Navigating);
        run.reporter
            .info(format!("Opening search page ({} entry)", request.strategy));
        bounded(
            "Initial navigation",
            self.settings.initial_load_timeout,
            adapter.open_search(request.keyword(), request.strategy),
        )
        .await
        .map_err(|e| match e {
            ExtractError::Timeout { .. } => {
                ExtractError::NavigationTimeout(self.settings.initial_load_timeout.as_secs())
            }
            ExtractError::NavigationFailed(_)
            | ExtractError::NavigationTimeout(_)
            | ExtractError::ElementNotFound { .. } => e,
            other => ExtractError::NavigationFailed(other.to_string()),
        })?;
        run.reporter.info("Search submitted, waiting for results");

        run.enter(SessionState::AwaitingFrame);
        let frame = FrameResolver::new(self.settings.frame_retry, self.settings.operation_timeout)
            .resolve(adapter, &mut run.reporter)
            .await?;

        run.enter(SessionState::Enumerating);
        run.reporter.info("Reading pagination");
        let pages = PaginationEnumerator::new(self.settings.operation_timeout)
            .enumerate(adapter, &frame)
            .await?;
        run.reporter.info(format!("Found {} page(s)", pages.len()));

        let mut extractor = PageExtractor::new(
            self.settings.state_global.clone(),
            self.settings.settle,
            self.settings.operation_timeout,
        );
        let mut fragments = Vec::with_capacity(pages.len());

        for (i, &page) in pages.iter().enumerate() {
            run.enter(SessionState::ExtractingPage(page));

            match extractor
                .extract(adapter, &frame, page, &mut run.reporter)
                .await
            {
                Ok(data) => {
                    run.reporter.success(format!("Page {} extracted", page));
                    fragments.push(PageFragment { page, data });
                }
                Err(e) if e.is_recoverable() => {
                    run.reporter.error(format!("Page {} skipped: {}", page, e));
                }
                Err(e) => return Err(e),
            }

            if i + 1 < pages.len() {
                tokio::time::sleep(self.settings.inter_page).await;
            }
        }

        run.enter(SessionState::Merging);
        if fragments.is_empty() {
            return Err(ExtractError::NoDataExtracted { pages: pages.len() });
        }

        let data = merge(&fragments)?;
        let extracted: Vec<PageIndex> = fragments.iter().map(|f| f.page).collect();
        run.reporter.info(format!(
            "Merged {} fragment(s) into {} key(s)",
            extracted.len(),
            data.len()
        ));

        Ok(MergedResult {
            data,
            pages,
            extracted,
        })
    }

    /// Release failures are reported but never replace the run's result.
    async fn teardown(&self, adapter: &mut dyn SiteAdapter, run: &mut Run) {
        match bounded(
            "Browser teardown",
            self.settings.teardown_timeout,
            adapter.close(),
        )
        .await
        {
            Ok(()) => run.reporter.info("Browser closed"),
            Err(e) => {
                let e = ExtractError::TeardownFailed(e.to_string());
                tracing::warn!(error = %e, "Teardown failed");
                run.reporter.warning(e.to_string());
            }
        }
    }
}

async fn bounded<T>(
    operation: &str,
    timeout: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(ExtractError::timeout(operation, timeout)),
    }
}
