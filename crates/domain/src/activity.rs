//! Activity log entries and their two export encodings.
//!
//! The structured encoding is a JSON array of entries. The plain-text
//! encoding is one tab-separated line per entry:
//!
//! ```text
//! <rfc3339 timestamp>\t<status>\t<trigger_reason>\t<action_name>\t<details>
//! ```
//!
//! Backslash, tab, CR and LF inside text fields are escaped, and an empty
//! `details` column stands for "no details", so both encodings parse back
//! to the exact entries that were written.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LogFormatError;
use crate::time::{Timestamp, now};

/// Outcome recorded by an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Executed,
    Cancelled,
    Error,
    Info,
}

impl LogStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Executed => "executed",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "executed" => Ok(Self::Executed),
            "cancelled" => Ok(Self::Cancelled),
            "error" => Ok(Self::Error),
            "info" => Ok(Self::Info),
            other => Err(format!("unknown status `{other}`")),
        }
    }
}

/// One activity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: Timestamp,
    pub trigger_reason: String,
    pub action_name: String,
    pub status: LogStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create an entry stamped with the current time.
    #[must_use]
    pub fn new(
        trigger_reason: impl Into<String>,
        action_name: impl Into<String>,
        status: LogStatus,
    ) -> Self {
        Self::at(now(), trigger_reason, action_name, status)
    }

    /// Create an entry with an explicit timestamp.
    #[must_use]
    pub fn at(
        timestamp: Timestamp,
        trigger_reason: impl Into<String>,
        action_name: impl Into<String>,
        status: LogStatus,
    ) -> Self {
        Self {
            timestamp,
            trigger_reason: trigger_reason.into(),
            action_name: action_name.into(),
            status,
            details: None,
        }
    }

    /// Attach details; an empty string means no details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        let details = details.into();
        self.details = (!details.is_empty()).then_some(details);
        self
    }

    /// Case-insensitive substring match over reason, action and details.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        [
            Some(self.trigger_reason.as_str()),
            Some(self.action_name.as_str()),
            self.details.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&query))
    }

    /// Render as one plain-text line (no trailing newline).
    #[must_use]
    pub fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            self.status,
            escape(&self.trigger_reason),
            escape(&self.action_name),
            self.details.as_deref().map(escape).unwrap_or_default(),
        )
    }

    /// Parse a line produced by [`LogEntry::to_line`].
    ///
    /// # Errors
    ///
    /// Returns [`LogFormatError::MalformedLine`] when the column count,
    /// timestamp, status or an escape sequence is invalid. `line_no` is
    /// only used for the error message.
    pub fn from_line(line: &str, line_no: usize) -> Result<Self, LogFormatError> {
        let malformed = |reason: String| LogFormatError::MalformedLine {
            line: line_no,
            reason,
        };

        let columns: Vec<&str> = line.split('\t').collect();
        let [timestamp, status, reason, action, details] = columns[..] else {
            return Err(malformed(format!(
                "expected 5 tab-separated columns, found {}",
                columns.len()
            )));
        };

        let timestamp = DateTime::parse_from_rfc3339(timestamp)
            .map_err(|err| malformed(format!("invalid timestamp: {err}")))?
            .with_timezone(&Utc);
        let status = status.parse().map_err(malformed)?;

        Ok(Self {
            timestamp,
            trigger_reason: unescape(reason).map_err(malformed)?,
            action_name: unescape(action).map_err(malformed)?,
            status,
            details: match unescape(details).map_err(malformed)? {
                d if d.is_empty() => None,
                d => Some(d),
            },
        })
    }
}

/// Export encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Pretty-printed JSON array.
    #[default]
    Structured,
    /// Tab-separated lines.
    PlainText,
}

impl ExportFormat {
    /// Conventional file extension.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Structured => "json",
            Self::PlainText => "txt",
        }
    }

    /// Encode `entries` in this format.
    ///
    /// # Errors
    ///
    /// Returns [`LogFormatError::Json`] if structured serialization fails.
    pub fn encode(self, entries: &[LogEntry]) -> Result<String, LogFormatError> {
        match self {
            Self::Structured => Ok(serde_json::to_string_pretty(entries)?),
            Self::PlainText => Ok(entries
                .iter()
                .map(LogEntry::to_line)
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    /// Decode text produced by [`ExportFormat::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`LogFormatError`] when the text is not valid for this format.
    pub fn decode(self, text: &str) -> Result<Vec<LogEntry>, LogFormatError> {
        match self {
            Self::Structured => Ok(serde_json::from_str(text)?),
            Self::PlainText => text
                .lines()
                .enumerate()
                .filter(|(_, line)| !line.is_empty())
                .map(|(idx, line)| LogEntry::from_line(line, idx + 1))
                .collect(),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = LogFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "structured" => Ok(Self::Structured),
            "txt" | "text" | "plain" | "plain_text" | "plain-text" => Ok(Self::PlainText),
            _ => Err(LogFormatError::UnknownFormat(s.to_string())),
        }
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(text: &str) -> Result<String, String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => return Err(format!("invalid escape `\\{other}`")),
            None => return Err("dangling backslash".to_string()),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn awkward_entries() -> Vec<LogEntry> {
        vec![
            LogEntry::new("Network idle on eth0", "Shut Down", LogStatus::Executed),
            LogEntry::new("tab\there", "back\\slash", LogStatus::Error)
                .with_details("reading: line one\nline two\r\n"),
            LogEntry::new("Processes idle: steam", "Lock Screen", LogStatus::Cancelled)
                .with_details("-"),
        ]
    }

    #[test]
    fn should_round_trip_plain_text_export() {
        let entries = awkward_entries();
        let text = ExportFormat::PlainText.encode(&entries).unwrap();
        assert_eq!(text.lines().count(), entries.len());
        assert_eq!(ExportFormat::PlainText.decode(&text).unwrap(), entries);
    }

    #[test]
    fn should_round_trip_structured_export() {
        let entries = awkward_entries();
        let text = ExportFormat::Structured.encode(&entries).unwrap();
        assert_eq!(ExportFormat::Structured.decode(&text).unwrap(), entries);
    }

    #[test]
    fn should_normalize_empty_details_to_none() {
        let entry = LogEntry::new("r", "a", LogStatus::Info).with_details("");
        assert!(entry.details.is_none());
    }

    #[test]
    fn should_match_query_case_insensitively_across_fields() {
        let entry = LogEntry::new("Network idle", "Shut Down", LogStatus::Error)
            .with_details("executing: Permission denied");
        assert!(entry.matches("NETWORK"));
        assert!(entry.matches("shut"));
        assert!(entry.matches("permission"));
        assert!(!entry.matches("hibernate"));
    }

    #[test]
    fn should_reject_line_with_wrong_column_count() {
        let err = LogEntry::from_line("2024-01-01T00:00:00Z\tinfo\tonly", 3).unwrap_err();
        assert!(matches!(err, LogFormatError::MalformedLine { line: 3, .. }));
    }

    #[test]
    fn should_reject_unknown_status() {
        let err = LogEntry::from_line("2024-01-01T00:00:00Z\tmaybe\tr\ta\t", 1).unwrap_err();
        assert!(err.to_string().contains("unknown status"));
    }

    #[test]
    fn should_parse_format_aliases() {
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Structured);
        assert_eq!("TXT".parse::<ExportFormat>().unwrap(), ExportFormat::PlainText);
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
