pub mod frame;
pub mod merge;
pub mod page;
pub mod pagination;
pub mod session;

use crate::site::EntryStrategy;
use crate::{ExtractError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use frame::FrameResolver;
pub use merge::{merge, merge_into};
pub use page::{PageExtractor, parse_state_from_scripts};
pub use pagination::PaginationEnumerator;
pub use session::{ExtractionOutcome, ExtractionSettings, SessionController};

/// A 1-based result page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageIndex(u32);

impl PageIndex {
    pub const FIRST: Self = Self(1);

    pub fn new(n: u32) -> Option<Self> {
        (n > 0).then_some(Self(n))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for PageIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageFragment {
    pub page: PageIndex,
    pub data: Map<String, Value>,
}

/// The combined state of every extracted page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedResult {
    pub data: Map<String, Value>,
    /// Every page the pagination advertised.
    pub pages: Vec<PageIndex>,
    /// Pages that contributed a fragment.
    pub extracted: Vec<PageIndex>,
}

impl MergedResult {
    pub fn missed(&self) -> Vec<PageIndex> {
        self.pages
            .iter()
            .filter(|p| !self.extracted.contains(p))
            .copied()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    keyword: String,
    pub strategy: EntryStrategy,
}

impl ExtractionRequest {
    pub fn new(keyword: impl Into<String>, strategy: EntryStrategy) -> Result<Self> {
        let keyword = keyword.into().trim().to_string();
        if keyword.is_empty() {
            return Err(ExtractError::EmptyKeyword);
        }
        Ok(Self { keyword, strategy })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "page", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Launching,
    Navigating,
    AwaitingFrame,
    Enumerating,
    ExtractingPage(PageIndex),
    Merging,
    ClosingSuccess,
    ClosingFailure,
}

impl SessionState {
    pub fn is_closing(self) -> bool {
        matches!(self, Self::ClosingSuccess | Self::ClosingFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_index_rejects_zero() {
        assert!(PageIndex::new(0).is_none());
        assert_eq!(PageIndex::new(3).map(PageIndex::get), Some(3));
        assert_eq!(PageIndex::FIRST.to_string(), "1");
    }

    #[test]
    fn test_request_requires_keyword() {
        assert!(matches!(
            ExtractionRequest::new("   ", EntryStrategy::Interactive),
            Err(ExtractError::EmptyKeyword)
        ));
        let req = ExtractionRequest::new(" pizza ", EntryStrategy::DeepLink).unwrap();
        assert_eq!(req.keyword(), "pizza");
    }

    #[test]
    fn test_missed_pages() {
        let p = |n| PageIndex::new(n).unwrap();
        let result = MergedResult {
            data: Map::new(),
            pages: vec![p(1), p(2), p(3)],
            extracted: vec![p(1), p(3)],
        };
        assert_eq!(result.missed(), vec![p(2)]);
    }

    #[test]
    fn test_session_state_closing() {
        assert!(SessionState::ClosingFailure.is_closing());
        assert!(!SessionState::Merging.is_closing());
    }
}
