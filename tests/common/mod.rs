//! Scripted stand-ins for the browser seam.

#![allow(dead_code)]

use async_trait::async_trait;
use map_extractor::retry::RetryPolicy;
use map_extractor::{
    BrowserLauncher, EntryStrategy, ExtractError, ExtractionSettings, FrameHandle, PageControl,
    Result, SiteAdapter,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const GLOBAL: &str = "__APOLLO_STATE__";

/// What the fake site does at each step.
#[derive(Clone, Default)]
pub struct SiteScript {
    pub fail_launch: bool,
    pub fail_open: bool,
    pub fail_close: bool,
    /// The frame shows up on this probe (1-based). `None` means never.
    pub frame_on_probe: Option<usize>,
    pub controls: Vec<PageControl>,
    pub fail_controls: bool,
    /// The pagination read never resolves.
    pub hang_controls: bool,
    /// State reads never resolve.
    pub hang_state: bool,
    /// Pages whose pagination control cannot be clicked.
    pub unclickable: Vec<u32>,
    pub states: HashMap<u32, Value>,
    pub inline: HashMap<u32, Vec<String>>,
}

impl SiteScript {
    /// A site with numbered controls `1..=pages` and a frame on the first probe.
    pub fn with_pages(pages: u32) -> Self {
        Self {
            frame_on_probe: Some(1),
            controls: (1..=pages).map(|p| PageControl::new(p.to_string())).collect(),
            ..Self::default()
        }
    }

    pub fn state(mut self, page: u32, value: Value) -> Self {
        self.states.insert(page, value);
        self
    }

    pub fn inline(mut self, page: u32, script: &str) -> Self {
        self.inline.entry(page).or_default().push(script.to_string());
        self
    }
}

#[derive(Default)]
pub struct Counters {
    pub launches: AtomicUsize,
    pub closes: AtomicUsize,
    pub frame_probes: AtomicUsize,
    pub clicks: Mutex<Vec<u32>>,
}

impl Counters {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn frame_probes(&self) -> usize {
        self.frame_probes.load(Ordering::SeqCst)
    }

    pub fn clicks(&self) -> Vec<u32> {
        self.clicks.lock().unwrap().clone()
    }
}

pub struct FakeLauncher {
    script: SiteScript,
    pub counters: Arc<Counters>,
}

impl FakeLauncher {
    pub fn new(script: SiteScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            counters: Arc::new(Counters::default()),
        })
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn SiteAdapter>> {
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_launch {
            return Err(ExtractError::LaunchFailed("no chrome here".into()));
        }
        Ok(Box::new(FakeSite {
            script: self.script.clone(),
            counters: self.counters.clone(),
            current: Mutex::new(1),
        }))
    }
}

struct FakeSite {
    script: SiteScript,
    counters: Arc<Counters>,
    current: Mutex<u32>,
}

impl FakeSite {
    fn current(&self) -> u32 {
        *self.current.lock().unwrap()
    }
}

#[async_trait]
impl SiteAdapter for FakeSite {
    async fn open_search(&self, _keyword: &str, _strategy: EntryStrategy) -> Result<()> {
        if self.script.fail_open {
            return Err(ExtractError::EvaluationError("connection reset".into()));
        }
        Ok(())
    }

    async fn find_result_frame(&self) -> Result<Option<FrameHandle>> {
        let probe = self.counters.frame_probes.fetch_add(1, Ordering::SeqCst) + 1;
        match self.script.frame_on_probe {
            Some(n) if probe >= n => Ok(Some(FrameHandle {
                name: "searchIframe".into(),
                url: "https://pcmap.place.naver.com/place/list".into(),
                locator: "iframe[name=\"searchIframe\"]".into(),
            })),
            _ => Ok(None),
        }
    }

    async fn list_page_controls(&self, _frame: &FrameHandle) -> Result<Vec<PageControl>> {
        if self.script.hang_controls {
            futures::future::pending::<()>().await;
        }
        if self.script.fail_controls {
            return Err(ExtractError::EvaluationError("frame detached".into()));
        }
        Ok(self.script.controls.clone())
    }

    async fn goto_page(&self, _frame: &FrameHandle, page: u32) -> Result<bool> {
        self.counters.clicks.lock().unwrap().push(page);
        if self.script.unclickable.contains(&page) {
            return Ok(false);
        }
        *self.current.lock().unwrap() = page;
        Ok(true)
    }

    async fn read_state(&self, _frame: &FrameHandle, global: &str) -> Result<Option<Value>> {
        assert_eq!(global, GLOBAL);
        if self.script.hang_state {
            futures::future::pending::<()>().await;
        }
        Ok(self.script.states.get(&self.current()).cloned())
    }

    async fn inline_scripts(&self, _frame: &FrameHandle) -> Result<Vec<String>> {
        Ok(self
            .script
            .inline
            .get(&self.current())
            .cloned()
            .unwrap_or_default())
    }

    async fn close(&mut self) -> Result<()> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_close {
            return Err(ExtractError::General("process already gone".into()));
        }
        Ok(())
    }
}

/// Zero delays so the whole flow runs instantly.
pub fn settings(frame_attempts: u32) -> ExtractionSettings {
    ExtractionSettings {
        frame_retry: RetryPolicy::new(frame_attempts, Duration::ZERO),
        operation_timeout: Duration::from_secs(5),
        initial_load_timeout: Duration::from_secs(5),
        teardown_timeout: Duration::from_secs(5),
        settle: Duration::ZERO,
        inter_page: Duration::ZERO,
        state_global: GLOBAL.to_string(),
    }
}

/// Zero delays and a short bound on every site step.
pub fn settings_with_timeout(frame_attempts: u32, timeout: Duration) -> ExtractionSettings {
    ExtractionSettings {
        operation_timeout: timeout,
        ..settings(frame_attempts)
    }
}
