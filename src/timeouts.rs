pub mod ms {
    pub const POLL_INTERVAL: u64 = 100;
    pub const SELECTOR_TIMEOUT: u64 = 5000;
    pub const PAGE_SETTLE: u64 = 2000;
    pub const INTER_PAGE: u64 = 1000;
    pub const FRAME_RETRY_INTERVAL: u64 = 2000;
    pub const SEARCH_SUBMIT_SETTLE: u64 = 500;
}

pub mod secs {
    pub const OPERATION: u64 = 30;
    pub const INITIAL_LOAD: u64 = 60;
    pub const READY_STATE: u64 = 5;
    pub const TEARDOWN: u64 = 10;
}

pub const FRAME_ATTEMPTS: u32 = 5;
