use super::PageIndex;
use crate::site::{FrameHandle, PageControl, SiteAdapter};
use crate::{ExtractError, Result};
use std::collections::BTreeSet;
use std::time::Duration;

pub struct PaginationEnumerator {
    timeout: Duration,
}

impl PaginationEnumerator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Reads the page set once. Always non-empty, ascending and deduplicated.
    pub async fn enumerate(
        &self,
        adapter: &dyn SiteAdapter,
        frame: &FrameHandle,
    ) -> Result<Vec<PageIndex>> {
        let controls = tokio::time::timeout(self.timeout, adapter.list_page_controls(frame))
            .await
            .map_err(|_| ExtractError::timeout("Reading pagination", self.timeout))?
            .map_err(|e| ExtractError::PaginationFailed(e.to_string()))?;

        tracing::debug!(controls = controls.len(), "Pagination controls read");
        Ok(page_indices(&controls))
    }
}

/// A label names a page only when it is all ASCII digits after trimming.
/// `click_page` matches controls by the same rule.
pub fn page_number(label: &str) -> Option<u32> {
    let label = label.trim();
    if label.is_empty() || !label.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    label.parse().ok()
}

/// Page 1 is implied even when it has no visible control.
pub fn page_indices(controls: &[PageControl]) -> Vec<PageIndex> {
    let mut pages: BTreeSet<PageIndex> = controls
        .iter()
        .filter(|c| !c.disabled)
        .filter_map(|c| page_number(&c.label))
        .filter_map(PageIndex::new)
        .collect();
    pages.insert(PageIndex::FIRST);
    pages.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(ns: &[u32]) -> Vec<PageIndex> {
        ns.iter().filter_map(|&n| PageIndex::new(n)).collect()
    }

    #[test]
    fn test_no_controls_is_single_page() {
        assert_eq!(page_indices(&[]), pages(&[1]));
    }

    #[test]
    fn test_only_invalid_controls_is_single_page() {
        let controls = [
            PageControl::new("이전페이지"),
            PageControl::new(""),
            PageControl::new("0"),
            PageControl::disabled("2"),
        ];
        assert_eq!(page_indices(&controls), pages(&[1]));
    }

    #[test]
    fn test_implicit_first_page_added() {
        let controls = [PageControl::new("2"), PageControl::new("3")];
        assert_eq!(page_indices(&controls), pages(&[1, 2, 3]));
    }

    #[test]
    fn test_sorted_and_deduplicated() {
        let controls = [
            PageControl::new(" 4 "),
            PageControl::new("2"),
            PageControl::new("4"),
            PageControl::new("1"),
            PageControl::new("다음페이지"),
        ];
        assert_eq!(page_indices(&controls), pages(&[1, 2, 4]));
    }

    #[test]
    fn test_labels_with_trailing_text_are_not_pages() {
        let controls = [
            PageControl::new("2페이지"),
            PageControl::new("+3"),
            PageControl::new("4"),
        ];
        assert_eq!(page_indices(&controls), pages(&[1, 4]));
        assert_eq!(page_number(" 05 "), Some(5));
        assert_eq!(page_number("2페이지"), None);
    }

    #[test]
    fn test_disabled_current_page_still_yields_first() {
        let controls = [PageControl::disabled("1"), PageControl::new("2")];
        assert_eq!(page_indices(&controls), pages(&[1, 2]));
    }
}
