//! Transfer reports
//!
//! A report maps each item (file name or object key) to the outcome of its
//! transfer. Recording the same item twice keeps the last outcome.

use std::collections::BTreeMap;
use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Why an item was not transferred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Key ends with a path separator
    Folder,
    /// Key has no file extension
    NoExtension,
    /// A presigned URL could not be generated for the key
    PresignFailed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Folder => write!(f, "folder"),
            SkipReason::NoExtension => write!(f, "no_extension"),
            SkipReason::PresignFailed => write!(f, "presign_failed"),
        }
    }
}

/// Terminal state of one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    /// Local file did not exist when its turn came
    Missing,
    Skipped(SkipReason),
    /// Backend rejected the request (auth, permissions, throttling, not found)
    ClientError(String),
    /// Local or unexpected failure
    Error(String),
}

impl Outcome {
    /// Outcomes a caller should treat as a failed item
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Outcome::Missing | Outcome::ClientError(_) | Outcome::Error(_)
        )
    }

    /// Classify a per-item error
    pub fn from_error(error: &crate::Error) -> Self {
        if error.is_client_error() {
            Outcome::ClientError(error.detail())
        } else {
            Outcome::Error(error.detail())
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::Missing => write!(f, "missing"),
            Outcome::Skipped(reason) => write!(f, "skipped({reason})"),
            Outcome::ClientError(detail) => write!(f, "client_error({detail})"),
            Outcome::Error(detail) => write!(f, "error({detail})"),
        }
    }
}

/// Which sync operation produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Upload,
    Download,
    Transfer,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Upload => write!(f, "upload"),
            Operation::Download => write!(f, "download"),
            Operation::Transfer => write!(f, "transfer"),
        }
    }
}

/// Per-outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub success: usize,
    pub missing: usize,
    pub skipped: usize,
    pub client_error: usize,
    pub error: usize,
}

impl Summary {
    pub fn failed(&self) -> usize {
        self.missing + self.client_error + self.error
    }
}

/// Outcome of one sync call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub operation: Operation,
    pub bucket: String,
    /// Destination bucket of a transfer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    pub started_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
    pub bytes_transferred: u64,
    /// Run stopped early; items after the stop point are absent
    pub cancelled: bool,
    pub items: BTreeMap<String, Outcome>,
}

impl Report {
    pub fn new(operation: Operation, bucket: impl Into<String>) -> Self {
        Self {
            operation,
            bucket: bucket.into(),
            destination: None,
            started_at: Timestamp::now(),
            finished_at: None,
            bytes_transferred: 0,
            cancelled: false,
            items: BTreeMap::new(),
        }
    }

    /// Record an item's outcome, replacing any earlier one
    pub fn record(&mut self, item: impl Into<String>, outcome: Outcome) {
        let item = item.into();
        if let Some(previous) = self.items.insert(item.clone(), outcome) {
            tracing::debug!(item = %item, previous = %previous, "Item reported more than once");
        }
    }

    pub fn add_bytes(&mut self, bytes: u64) {
        self.bytes_transferred += bytes;
    }

    /// Stamp the finish time
    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Timestamp::now());
        self
    }

    pub fn get(&self, item: &str) -> Option<&Outcome> {
        self.items.get(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Outcome)> {
        self.items.iter()
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            total: self.items.len(),
            ..Default::default()
        };
        for outcome in self.items.values() {
            match outcome {
                Outcome::Success => summary.success += 1,
                Outcome::Missing => summary.missing += 1,
                Outcome::Skipped(_) => summary.skipped += 1,
                Outcome::ClientError(_) => summary.client_error += 1,
                Outcome::Error(_) => summary.error += 1,
            }
        }
        summary
    }

    /// True when no item failed and the run was not cancelled
    pub fn is_success(&self) -> bool {
        !self.cancelled && !self.items.values().any(Outcome::is_failure)
    }

    /// Items whose outcome is a failure
    pub fn failures(&self) -> impl Iterator<Item = (&String, &Outcome)> {
        self.items.iter().filter(|(_, o)| o.is_failure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_last_write_wins() {
        let mut report = Report::new(Operation::Upload, "bucket");
        report.record("a.txt", Outcome::Error("boom".into()));
        report.record("a.txt", Outcome::Success);
        assert_eq!(report.len(), 1);
        assert_eq!(report.get("a.txt"), Some(&Outcome::Success));
    }

    #[test]
    fn test_summary_counts() {
        let mut report = Report::new(Operation::Download, "bucket");
        report.record("a.csv", Outcome::Success);
        report.record("b.csv", Outcome::Success);
        report.record("dir/", Outcome::Skipped(SkipReason::Folder));
        report.record("c.csv", Outcome::ClientError("AccessDenied".into()));
        report.record("d.csv", Outcome::Missing);

        let summary = report.summary();
        assert_eq!(summary.total, 5);
        assert_eq!(summary.success, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.client_error, 1);
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.failed(), 2);
        assert!(!report.is_success());
        assert_eq!(report.failures().count(), 2);
    }

    #[test]
    fn test_skips_are_not_failures() {
        let mut report = Report::new(Operation::Download, "bucket");
        report.record("raw", Outcome::Skipped(SkipReason::NoExtension));
        assert!(report.is_success());

        report.cancelled = true;
        assert!(!report.is_success());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::Success.to_string(), "success");
        assert_eq!(
            Outcome::Skipped(SkipReason::NoExtension).to_string(),
            "skipped(no_extension)"
        );
        assert_eq!(
            Outcome::ClientError("NoSuchKey".into()).to_string(),
            "client_error(NoSuchKey)"
        );
    }

    #[test]
    fn test_outcome_from_error() {
        assert_eq!(
            Outcome::from_error(&Error::Auth("AccessDenied".into())),
            Outcome::ClientError("AccessDenied".into())
        );
        assert_eq!(
            Outcome::from_error(&Error::General("disk full".into())),
            Outcome::Error("disk full".into())
        );
    }

    #[test]
    fn test_outcome_serialization() {
        assert_eq!(
            serde_json::to_string(&Outcome::Success).unwrap(),
            "\"success\""
        );
        assert_eq!(
            serde_json::to_string(&Outcome::Skipped(SkipReason::Folder)).unwrap(),
            r#"{"skipped":"folder"}"#
        );
        assert_eq!(
            serde_json::to_string(&Outcome::ClientError("denied".into())).unwrap(),
            r#"{"client_error":"denied"}"#
        );
    }

    #[test]
    fn test_finish_stamps_time() {
        let report = Report::new(Operation::Transfer, "bucket");
        assert!(report.finished_at.is_none());
        let report = report.finish();
        assert!(report.finished_at.unwrap() >= report.started_at);
    }
}
