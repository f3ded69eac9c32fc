use crate::extract::{ExtractionRequest, MergedResult, PageIndex, SessionController};
use crate::site::EntryStrategy;
use crate::{Result, output};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

/// Where the merged document should be written, if anywhere.
#[derive(Debug, Clone, Default)]
pub enum ExportTarget {
    #[default]
    None,
    Path(PathBuf),
    /// A timestamped file in the working directory.
    Timestamped,
}

impl ExportTarget {
    pub fn from_args(output: Option<PathBuf>, save: bool) -> Self {
        match (output, save) {
            (Some(path), _) => Self::Path(path),
            (None, true) => Self::Timestamped,
            (None, false) => Self::None,
        }
    }

    fn resolve(&self) -> Option<PathBuf> {
        match self {
            Self::None => None,
            Self::Path(path) => Some(path.clone()),
            Self::Timestamped => Some(PathBuf::from(output::export_file_name(chrono::Utc::now()))),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchReport {
    pub keyword: String,
    pub strategy: EntryStrategy,
    pub pages: Vec<PageIndex>,
    pub extracted: Vec<PageIndex>,
    pub missed: Vec<PageIndex>,
    pub keys: usize,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<PathBuf>,
}

fn join_pages(pages: &[PageIndex]) -> String {
    if pages.is_empty() {
        return "none".into();
    }
    pages
        .iter()
        .map(PageIndex::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl output::OutputFormatter for SearchReport {
    fn format_text(&self) -> String {
        use crate::output::text;

        let mut lines = vec![
            text::section(&format!("Search: {}", self.keyword)),
            text::key_value("Strategy", &self.strategy.to_string()),
            text::key_value("Pages", &join_pages(&self.pages)),
            text::key_value("Extracted", &join_pages(&self.extracted)),
            text::key_value("Top-level Keys", &self.keys.to_string()),
            text::key_value("Elapsed", &text::format_duration_ms(self.elapsed_ms)),
        ];
        if !self.missed.is_empty() {
            lines.push(text::warning(&format!(
                "Missed page(s): {}",
                join_pages(&self.missed)
            )));
        }
        if let Some(path) = &self.saved_to {
            lines.push(text::success(&format!("Saved to {}", path.display())));
        }
        lines.join("\n")
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

pub async fn handle_search(
    controller: &SessionController,
    request: &ExtractionRequest,
    export: &ExportTarget,
) -> Result<(MergedResult, SearchReport)> {
    let start = Instant::now();
    let merged = controller.run(request).await.into_result()?;

    let saved_to = match export.resolve() {
        Some(path) => {
            output::write_json_file(&path, &merged.data)?;
            tracing::info!(path = %path.display(), "Merged document written");
            Some(path)
        }
        None => None,
    };

    let report = SearchReport {
        keyword: request.keyword().to_string(),
        strategy: request.strategy,
        pages: merged.pages.clone(),
        extracted: merged.extracted.clone(),
        missed: merged.missed(),
        keys: merged.data.len(),
        elapsed_ms: start.elapsed().as_millis() as u64,
        saved_to,
    };

    Ok((merged, report))
}
