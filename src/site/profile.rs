use super::EntryStrategy;
use crate::{ExtractError, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Selectors, URLs and names of the target site.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteProfile {
    #[serde(default = "default_search_url")]
    pub search_url: String,
    #[serde(default = "default_deep_link_base")]
    pub deep_link_base: String,
    #[serde(default)]
    pub entry_strategy: EntryStrategy,
    #[serde(default = "default_search_input_selector")]
    pub search_input_selector: String,
    #[serde(default = "default_frame_name")]
    pub frame_name: String,
    #[serde(default = "default_frame_url_marker")]
    pub frame_url_marker: String,
    #[serde(default = "default_pagination_selector")]
    pub pagination_selector: String,
    /// Class marking the current page button or a placeholder.
    #[serde(default = "default_inactive_page_class")]
    pub inactive_page_class: String,
    #[serde(default = "default_state_global")]
    pub state_global: String,
}

fn default_search_url() -> String {
    "https://map.naver.com/v5".to_string()
}
fn default_deep_link_base() -> String {
    "https://map.naver.com/p/search".to_string()
}
fn default_search_input_selector() -> String {
    ".input_search".to_string()
}
fn default_frame_name() -> String {
    "searchIframe".to_string()
}
fn default_frame_url_marker() -> String {
    "pcmap.place.naver.com".to_string()
}
fn default_pagination_selector() -> String {
    ".zRM9F .mBN2s".to_string()
}
fn default_inactive_page_class() -> String {
    "qxokY".to_string()
}
fn default_state_global() -> String {
    "__APOLLO_STATE__".to_string()
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            deep_link_base: default_deep_link_base(),
            entry_strategy: EntryStrategy::default(),
            search_input_selector: default_search_input_selector(),
            frame_name: default_frame_name(),
            frame_url_marker: default_frame_url_marker(),
            pagination_selector: default_pagination_selector(),
            inactive_page_class: default_inactive_page_class(),
            state_global: default_state_global(),
        }
    }
}

impl SiteProfile {
    /// URL the navigation goes to for `strategy`.
    pub fn entry_url(&self, keyword: &str, strategy: EntryStrategy) -> Result<Url> {
        match strategy {
            EntryStrategy::Interactive => parse_url(&self.search_url),
            EntryStrategy::DeepLink => self.deep_link(keyword),
        }
    }

    pub fn deep_link(&self, keyword: &str) -> Result<Url> {
        let mut url = parse_url(&self.deep_link_base)?;
        url.path_segments_mut()
            .map_err(|_| ExtractError::InvalidUrl(self.deep_link_base.clone()))?
            .pop_if_empty()
            .push(keyword);
        Ok(url)
    }

    pub fn validate(&self) -> Result<()> {
        parse_url(&self.search_url)?;
        if parse_url(&self.deep_link_base)?.cannot_be_a_base() {
            return Err(ExtractError::ConfigError(format!(
                "site.deep_link_base cannot carry a path: {}",
                self.deep_link_base
            )));
        }

        for (field, value) in [
            ("site.search_input_selector", &self.search_input_selector),
            ("site.pagination_selector", &self.pagination_selector),
            ("site.state_global", &self.state_global),
        ] {
            if value.trim().is_empty() {
                return Err(ExtractError::ConfigError(format!(
                    "{} must not be empty",
                    field
                )));
            }
        }

        if self.frame_name.trim().is_empty() && self.frame_url_marker.trim().is_empty() {
            return Err(ExtractError::ConfigError(
                "site.frame_name or site.frame_url_marker must be set".into(),
            ));
        }

        Ok(())
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| ExtractError::InvalidUrl(format!("{}: {}", raw, e)))
}
