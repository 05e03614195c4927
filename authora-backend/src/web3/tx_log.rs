//! Append-only transfer audit log
//!
//! One line per event: `[<RFC 3339 timestamp>] <json>`.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

pub struct TxLog {
    path: PathBuf,
}

impl TxLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn try_append(&self, entry: &Value) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
            }
        }

        let line = format!(
            "[{}] {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            entry
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| format!("Failed to open {}: {}", self.path.display(), e))?;

        file.write_all(line.as_bytes())
            .map_err(|e| format!("Failed to write {}: {}", self.path.display(), e))
    }

    /// Write one entry. Failures are logged and swallowed.
    pub fn append(&self, entry: Value) {
        if let Err(e) = self.try_append(&entry) {
            log::warn!("[CHAIN] Could not write transaction log: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_appends_timestamped_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("logs").join("transactions.log");
        let log = TxLog::new(path.clone());

        log.append(json!({"action": "validate", "amount": "0"}));
        log.append(json!({"action": "send", "txHash": "0x1"}));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with(r#"{"action":"validate","amount":"0"}"#));
        assert!(lines[1].contains(r#""txHash":"0x1""#));
    }
}
