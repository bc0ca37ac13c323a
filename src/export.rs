//! CSV export of the server's usage statistics and activity log.
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::api::LogsAndStats;
use crate::error::{Context as _, Result, simple_error};

pub const EXPORT_FILE_NAME: &str = "logs_and_stats.csv";

/// Render the two-section report: per-day statistics, then the activity log.
pub fn generate_csv(data: &LogsAndStats) -> String {
    let mut out = String::new();
    out.push_str("Usage Statistics\n");
    out.push_str("Date,IPAs Signed\n");
    for (date, count) in &data.stats {
        let _ = writeln!(out, "{},{}", field(date), field(&stat_text(count)));
    }

    out.push_str("\nActivity Logs\n");
    out.push_str("Timestamp,User,Action,Details\n");
    for log in &data.logs {
        let user = log.username.as_deref().filter(|u| !u.is_empty()).unwrap_or("N/A");
        let _ = writeln!(
            out,
            "{},{},{},{}",
            field(&log.timestamp),
            field(user),
            field(&log.action),
            field(&log.details)
        );
    }
    out
}

/// Write `content` as `logs_and_stats.csv` inside `dir`.
pub fn write_csv(dir: &Path, content: &str) -> Result<PathBuf> {
    if !dir.is_dir() {
        return Err(simple_error(format!(
            "export directory {} does not exist",
            dir.display()
        )));
    }
    let path = dir.join(EXPORT_FILE_NAME);
    std::fs::write(&path, content).with_ctx(|| format!("write {}", path.display()))?;
    Ok(path)
}

fn stat_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Quote a CSV field when it contains a separator, quote or line break.
fn field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
