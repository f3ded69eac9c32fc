use crate::events::{ProgressEvent, Severity};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::path::Path;

pub trait OutputFormatter {
    fn format_text(&self) -> String;
    fn format_json(&self, pretty: bool) -> crate::Result<String>;
}

pub fn print_output<T: OutputFormatter>(
    data: &T,
    as_json: bool,
    json_pretty: bool,
) -> crate::Result<()> {
    let output = if as_json {
        data.format_json(json_pretty)?
    } else {
        data.format_text()
    };

    println!("{}", output);
    Ok(())
}

pub fn to_json<T: Serialize>(data: &T, pretty: bool) -> crate::Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(data)?)
    } else {
        Ok(serde_json::to_string(data)?)
    }
}

pub fn write_json_file<T: Serialize>(path: &Path, data: &T) -> crate::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, to_json(data, true)?)?;
    Ok(())
}

/// Korea Standard Time, which the exported file names are stamped in.
const KST_OFFSET_SECS: i32 = 9 * 3600;

pub fn export_file_name(now: DateTime<Utc>) -> String {
    let kst = FixedOffset::east_opt(KST_OFFSET_SECS)
        .map(|offset| now.with_timezone(&offset).naive_local())
        .unwrap_or_else(|| now.naive_utc());
    format!("map_rawdata_{}.json", kst.format("%Y-%m-%d_%H-%M-%S"))
}

pub fn format_event(event: &ProgressEvent) -> String {
    let stamp = event.timestamp.format("%H:%M:%S");
    let line = match event.severity {
        Severity::Info => text::info(&event.message),
        Severity::Success => text::success(&event.message),
        Severity::Warning => text::warning(&event.message),
        Severity::Error => text::error(&event.message),
    };
    format!("{} {}", text::dim(&stamp.to_string()), line)
}

pub mod text {
    use colored::Colorize;

    pub fn success(msg: &str) -> String {
        format!("{} {}", "✓".green().bold(), msg)
    }

    pub fn error(msg: &str) -> String {
        format!("{} {}", "✗".red().bold(), msg)
    }

    pub fn warning(msg: &str) -> String {
        format!("{} {}", "⚠".yellow().bold(), msg)
    }

    pub fn info(msg: &str) -> String {
        format!("{} {}", "ℹ".blue().bold(), msg)
    }

    pub fn dim(msg: &str) -> String {
        msg.dimmed().to_string()
    }

    pub fn bullet(msg: &str) -> String {
        format!("  • {}", msg)
    }

    pub fn section(title: &str) -> String {
        format!("\n{}\n{}", title.bold(), "─".repeat(title.chars().count()))
    }

    pub fn key_value(key: &str, value: &str) -> String {
        format!("  {}: {}", key.bold(), value)
    }

    pub fn format_duration_ms(ms: u64) -> String {
        if ms >= 1000 {
            format!("{:.2}s", ms as f64 / 1000.0)
        } else {
            format!("{}ms", ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_export_file_name_is_kst() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 20, 5, 7).unwrap();
        assert_eq!(export_file_name(now), "map_rawdata_2024-03-10_05-05-07.json");
    }

    #[test]
    fn test_format_event_keeps_message() {
        let line = format_event(&ProgressEvent::warning("Page 2 skipped"));
        assert!(line.contains("Page 2 skipped"));
    }

    #[test]
    fn test_write_json_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("data.json");
        write_json_file(&path, &serde_json::json!({"a": [1]})).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"a\""));
        assert!(written.contains('\n'));
    }

    #[test]
    fn test_format_duration_ms() {
        assert_eq!(text::format_duration_ms(500), "500ms");
        assert_eq!(text::format_duration_ms(2500), "2.50s");
    }

    #[test]
    fn test_to_json_pretty() {
        #[derive(Serialize)]
        struct TestData {
            name: String,
        }
        let data = TestData {
            name: "test".to_string(),
        };
        assert!(!to_json(&data, false).unwrap().contains('\n'));
        assert!(to_json(&data, true).unwrap().contains('\n'));
    }

    #[test]
    fn test_key_value() {
        let msg = text::key_value("Pages", "3");
        assert!(msg.contains("Pages"));
        assert!(msg.contains('3'));
    }
}
