use crate::events::ProgressReporter;
use crate::retry::{self, RetryPolicy};
use crate::site::{FrameHandle, SiteAdapter};
use crate::{ExtractError, Result};
use std::time::Duration;

/// Polls for the result frame, which the page injects after its scripts run.
pub struct FrameResolver {
    policy: RetryPolicy,
    probe_timeout: Duration,
}

impl FrameResolver {
    pub fn new(policy: RetryPolicy, probe_timeout: Duration) -> Self {
        Self {
            policy,
            probe_timeout,
        }
    }

    pub async fn resolve(
        &self,
        adapter: &dyn SiteAdapter,
        reporter: &mut ProgressReporter,
    ) -> Result<FrameHandle> {
        let attempts = self.policy.attempts;
        let probe_timeout = self.probe_timeout;

        let found = {
            let reporter = &mut *reporter;
            retry::poll(self.policy, move |attempt| {
                reporter.info(format!(
                    "Looking for the result frame ({}/{})",
                    attempt, attempts
                ));
                let probe = adapter.find_result_frame();
                async move {
                    match tokio::time::timeout(probe_timeout, probe).await {
                        Ok(result) => result,
                        Err(_) => Err(ExtractError::timeout("Frame probe", probe_timeout)),
                    }
                }
            })
            .await
        };

        match found {
            Ok(frame) => {
                tracing::debug!(name = %frame.name, url = %frame.url, "Result frame resolved");
                reporter.success("Found the result frame");
                Ok(frame)
            }
            Err(exhausted) => {
                if let Some(ref e) = exhausted.last_error {
                    tracing::warn!(error = %e, "Last frame probe error");
                }
                Err(ExtractError::FrameNotFound {
                    attempts: exhausted.attempts,
                })
            }
        }
    }
}
