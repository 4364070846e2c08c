//! Confirmation report types with JSON persistence.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::QuestionId;

/// The three kinds of store calls issued while persisting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Create => write!(f, "create"),
            OperationKind::Update => write!(f, "update"),
            OperationKind::Delete => write!(f, "delete"),
        }
    }
}

/// Success/failure count for one operation kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationTally {
    pub succeeded: usize,
    pub failed: usize,
}

impl OperationTally {
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }
}

impl fmt::Display for OperationTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} succeeded / {} failed", self.succeeded, self.failed)
    }
}

/// A store call that failed. Failed calls are not retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationFailure {
    pub kind: OperationKind,
    pub question: QuestionId,
    pub message: String,
}

/// An updated question that the reloaded set no longer contains.
///
/// The local copy is kept in the buffer under a new placeholder id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationWarning {
    /// Id the question had before it vanished from the store.
    pub question: QuestionId,
    /// Placeholder it was re-added under.
    pub readopted_as: QuestionId,
    pub statement: String,
}

/// Outcome of one confirmation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationReport {
    /// Unique run identifier.
    pub id: Uuid,
    pub assessment_id: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Point total of the working copy when confirmation started.
    pub point_total: u64,
    /// Whether the operator accepted a normalization.
    pub normalized: bool,
    pub created: OperationTally,
    pub updated: OperationTally,
    pub deleted: OperationTally,
    #[serde(default)]
    pub failures: Vec<OperationFailure>,
    #[serde(default)]
    pub warnings: Vec<ReconciliationWarning>,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl ConfirmationReport {
    pub fn new(assessment_id: u64, point_total: u64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            assessment_id,
            started_at: now,
            finished_at: now,
            point_total,
            normalized: false,
            created: OperationTally::default(),
            updated: OperationTally::default(),
            deleted: OperationTally::default(),
            failures: Vec::new(),
            warnings: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn tally(&self, kind: OperationKind) -> OperationTally {
        match kind {
            OperationKind::Create => self.created,
            OperationKind::Update => self.updated,
            OperationKind::Delete => self.deleted,
        }
    }

    pub(crate) fn record(&mut self, kind: OperationKind, question: QuestionId, error: Option<String>) {
        let tally = match kind {
            OperationKind::Create => &mut self.created,
            OperationKind::Update => &mut self.updated,
            OperationKind::Delete => &mut self.deleted,
        };
        match error {
            None => tally.succeeded += 1,
            Some(message) => {
                tally.failed += 1;
                self.failures.push(OperationFailure {
                    kind,
                    question,
                    message,
                });
            }
        }
    }

    pub fn failed_count(&self) -> usize {
        self.created.failed + self.updated.failed + self.deleted.failed
    }

    pub fn succeeded_count(&self) -> usize {
        self.created.succeeded + self.updated.succeeded + self.deleted.succeeded
    }

    /// No failed calls and nothing left to reconcile.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.warnings.is_empty()
    }

    /// One-line summary for operators.
    pub fn summary_line(&self) -> String {
        format!(
            "created {}, updated {}, deleted {}",
            self.created, self.updated, self.deleted
        )
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: ConfirmationReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_counts_per_kind() {
        let mut report = ConfirmationReport::new(1, 95);
        report.record(OperationKind::Update, QuestionId::Persisted(1), None);
        report.record(
            OperationKind::Update,
            QuestionId::Persisted(2),
            Some("question 2 not found".into()),
        );
        report.record(OperationKind::Delete, QuestionId::Persisted(3), None);

        assert_eq!(report.updated, OperationTally { succeeded: 1, failed: 1 });
        assert_eq!(report.tally(OperationKind::Delete).succeeded, 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.succeeded_count(), 2);
        assert!(!report.is_clean());
        assert_eq!(report.failures[0].question, QuestionId::Persisted(2));
        assert_eq!(
            report.summary_line(),
            "created 0 succeeded / 0 failed, updated 1 succeeded / 1 failed, deleted 1 succeeded / 0 failed"
        );
    }

    #[test]
    fn save_and_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/run.json");

        let mut report = ConfirmationReport::new(4, 100);
        report.record(OperationKind::Create, QuestionId::Pending(1), None);
        report.save_json(&path).unwrap();

        let loaded = ConfirmationReport::load_json(&path).unwrap();
        assert_eq!(loaded.id, report.id);
        assert_eq!(loaded.created.succeeded, 1);
        assert!(loaded.is_clean());
    }
}
