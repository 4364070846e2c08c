//! Confirmation workflow.
//!
//! Drives one edit buffer through validation, optional normalization,
//! diffing and sequential persistence:
//!
//! ```text
//! Idle -> Validating -> [NormalizationOffered -> Normalizing] -> Diffing
//!      -> Persisting -> Synced -> Idle
//! ```
//!
//! `Error` is entered from `Validating` or `Persisting`. The
//! host UI follows progress through a [`WorkflowObserver`] and answers the
//! normalization offer through a [`NormalizationPrompt`].

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::buffer::EditBuffer;
use crate::diff::diff;
use crate::error::{GatewayError, WorkflowError};
use crate::model::{Question, QuestionId, POINT_BUDGET};
use crate::normalize::normalize;
use crate::report::{ConfirmationReport, OperationKind, ReconciliationWarning};
use crate::traits::PersistenceGateway;

/// Where a confirmation run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Validating,
    /// The point total is off; waiting for the operator's decision.
    NormalizationOffered {
        total: u64,
    },
    Normalizing,
    Diffing,
    Persisting,
    Synced,
    Error,
}

impl WorkflowState {
    /// Whether a new confirmation may start from this state.
    pub fn accepts_confirm(&self) -> bool {
        matches!(self, WorkflowState::Idle | WorkflowState::Error)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowState::Idle => write!(f, "idle"),
            WorkflowState::Validating => write!(f, "validating"),
            WorkflowState::NormalizationOffered { total } => {
                write!(f, "normalization offered (total {total})")
            }
            WorkflowState::Normalizing => write!(f, "normalizing"),
            WorkflowState::Diffing => write!(f, "diffing"),
            WorkflowState::Persisting => write!(f, "persisting"),
            WorkflowState::Synced => write!(f, "synced"),
            WorkflowState::Error => write!(f, "error"),
        }
    }
}

/// Configuration for the confirmation workflow.
#[derive(Debug, Clone, Default)]
pub struct WorkflowConfig {
    /// Pause between consecutive store calls while persisting.
    pub call_delay: Duration,
}

/// Asks the operator whether to apply a proposed normalization.
pub trait NormalizationPrompt: Send + Sync {
    /// `proposal` is aligned with the buffer's questions.
    fn accept(&self, total: u64, proposal: &[u32]) -> bool;
}

/// Prompt that accepts every proposal.
pub struct AlwaysAccept;

impl NormalizationPrompt for AlwaysAccept {
    fn accept(&self, _: u64, _: &[u32]) -> bool {
        true
    }
}

/// Prompt that declines every proposal.
pub struct AlwaysDecline;

impl NormalizationPrompt for AlwaysDecline {
    fn accept(&self, _: u64, _: &[u32]) -> bool {
        false
    }
}

/// Progress reporting trait.
pub trait WorkflowObserver: Send + Sync {
    fn on_state(&self, state: &WorkflowState);
    fn on_point_total(&self, total: u64);
    fn on_operation(&self, kind: OperationKind, question: QuestionId, error: Option<&GatewayError>);
    fn on_warning(&self, warning: &ReconciliationWarning);
}

/// No-op observer.
pub struct NoopObserver;

impl WorkflowObserver for NoopObserver {
    fn on_state(&self, _: &WorkflowState) {}
    fn on_point_total(&self, _: u64) {}
    fn on_operation(&self, _: OperationKind, _: QuestionId, _: Option<&GatewayError>) {}
    fn on_warning(&self, _: &ReconciliationWarning) {}
}

/// How a confirmation run that reached the store ended.
#[derive(Debug, Clone)]
pub enum ConfirmOutcome {
    /// Every call succeeded and the buffer holds the reloaded set.
    Synced(ConfirmationReport),
    /// Some calls failed. Successful ones are reflected in the buffer, which
    /// stays dirty so the operator can retry.
    PartiallyApplied(ConfirmationReport),
}

impl ConfirmOutcome {
    pub fn report(&self) -> &ConfirmationReport {
        match self {
            ConfirmOutcome::Synced(report) | ConfirmOutcome::PartiallyApplied(report) => report,
        }
    }

    pub fn into_report(self) -> ConfirmationReport {
        match self {
            ConfirmOutcome::Synced(report) | ConfirmOutcome::PartiallyApplied(report) => report,
        }
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, ConfirmOutcome::Synced(_))
    }
}

/// The confirmation state machine. One run at a time.
pub struct ConfirmationWorkflow {
    gateway: Arc<dyn PersistenceGateway>,
    config: WorkflowConfig,
    state: WorkflowState,
}

impl ConfirmationWorkflow {
    pub fn new(gateway: Arc<dyn PersistenceGateway>, config: WorkflowConfig) -> Self {
        Self {
            gateway,
            config,
            state: WorkflowState::Idle,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn gateway(&self) -> &Arc<dyn PersistenceGateway> {
        &self.gateway
    }

    /// Whether a confirm trigger should be enabled.
    pub fn can_confirm(&self) -> bool {
        self.state.accepts_confirm()
    }

    /// Forget a run whose future was dropped mid-flight.
    ///
    /// Calls already issued are not rolled back.
    pub fn abandon(&mut self) {
        if !self.state.accepts_confirm() {
            tracing::warn!(state = %self.state, "abandoning in-flight confirmation");
        }
        self.state = WorkflowState::Idle;
    }

    /// Load a set from the store into a fresh edit buffer.
    pub async fn load(&self, assessment_id: u64) -> Result<EditBuffer, WorkflowError> {
        let set = self
            .gateway
            .reload(assessment_id)
            .await
            .map_err(WorkflowError::Reload)?;
        tracing::info!(
            assessment_id,
            questions = set.questions.len(),
            total = set.total_points(),
            "loaded question set"
        );
        Ok(EditBuffer::load(set))
    }

    /// Replace the whole set with freshly generated questions.
    ///
    /// Bypasses the diff engine: buffer and snapshot are both reset to the
    /// store's answer and any local edits are dropped.
    pub async fn regenerate(
        &mut self,
        buffer: &mut EditBuffer,
        count: usize,
    ) -> Result<(), WorkflowError> {
        self.ensure_idle()?;
        let assessment_id = buffer.assessment_id();
        if buffer.is_dirty() {
            tracing::warn!(assessment_id, "regenerating over unconfirmed local edits");
        }
        let set = self
            .gateway
            .regenerate_questions(assessment_id, count)
            .await
            .map_err(WorkflowError::Regenerate)?;
        tracing::info!(assessment_id, count = set.questions.len(), "question set regenerated");
        buffer.commit(set);
        Ok(())
    }

    /// Validate, optionally normalize, diff and persist `buffer`.
    pub async fn confirm(
        &mut self,
        buffer: &mut EditBuffer,
        prompt: &dyn NormalizationPrompt,
        observer: &dyn WorkflowObserver,
    ) -> Result<ConfirmOutcome, WorkflowError> {
        self.ensure_idle()?;
        let start = Instant::now();
        let assessment_id = buffer.assessment_id();

        self.transition(WorkflowState::Validating, observer);
        let total = buffer.total_points();
        observer.on_point_total(total);
        tracing::info!(assessment_id, total, questions = buffer.len(), "confirming");

        if let Some((id, source)) = buffer
            .questions()
            .iter()
            .find_map(|q| q.validate().err().map(|e| (q.id, e)))
        {
            self.transition(WorkflowState::Error, observer);
            return Err(WorkflowError::InvalidQuestion { id, source });
        }

        let mut report = ConfirmationReport::new(assessment_id, total);

        // An empty set has nothing to score.
        if total != u64::from(POINT_BUDGET) && !buffer.is_empty() {
            let proposal = normalize(buffer.questions());

            self.transition(WorkflowState::NormalizationOffered { total }, observer);
            if !prompt.accept(total, &proposal) {
                tracing::info!(total, "normalization declined, nothing persisted");
                self.transition(WorkflowState::Idle, observer);
                return Err(WorkflowError::PointTotalRejected { total });
            }

            self.transition(WorkflowState::Normalizing, observer);
            let applied = buffer.apply_points(&proposal);
            debug_assert!(applied, "proposal is aligned with the working copy");
            report.normalized = true;
        }

        self.transition(WorkflowState::Diffing, observer);
        let plan = diff(buffer.snapshot(), buffer.questions());
        tracing::info!(
            create = plan.to_create.len(),
            update = plan.to_update.len(),
            delete = plan.to_delete.len(),
            "diff computed"
        );

        self.transition(WorkflowState::Persisting, observer);
        let mut issued = 0usize;

        for question in &plan.to_create {
            self.pace(&mut issued).await;
            match self.gateway.create_question(assessment_id, question).await {
                Ok(persisted) => {
                    tracing::debug!(pending = %question.id, id = %persisted.id, "created");
                    observer.on_operation(OperationKind::Create, question.id, None);
                    report.record(OperationKind::Create, question.id, None);
                    buffer.settle_created(question.id, persisted);
                }
                Err(e) => {
                    self.record_failure(&mut report, observer, OperationKind::Create, question.id, &e);
                }
            }
        }

        let mut updated: Vec<&Question> = Vec::new();
        for question in &plan.to_update {
            let Some(id) = question.id.persisted() else {
                continue;
            };
            self.pace(&mut issued).await;
            match self.gateway.update_question(id, question).await {
                Ok(persisted) => {
                    tracing::debug!(id, "updated");
                    observer.on_operation(OperationKind::Update, question.id, None);
                    report.record(OperationKind::Update, question.id, None);
                    buffer.settle_updated(persisted);
                    updated.push(question);
                }
                Err(e) => {
                    self.record_failure(&mut report, observer, OperationKind::Update, question.id, &e);
                }
            }
        }

        for question in &plan.to_delete {
            let Some(id) = question.id.persisted() else {
                continue;
            };
            self.pace(&mut issued).await;
            match self.gateway.delete_question(id).await {
                Ok(()) => {
                    tracing::debug!(id, "deleted");
                    observer.on_operation(OperationKind::Delete, question.id, None);
                    report.record(OperationKind::Delete, question.id, None);
                    buffer.settle_deleted(question.id);
                }
                Err(e) => {
                    self.record_failure(&mut report, observer, OperationKind::Delete, question.id, &e);
                }
            }
        }

        tracing::info!(summary = %report.summary_line(), "persisting finished");

        if report.failed_count() > 0 {
            report.finished_at = chrono::Utc::now();
            report.duration_ms = start.elapsed().as_millis() as u64;
            self.transition(WorkflowState::Error, observer);
            return Ok(ConfirmOutcome::PartiallyApplied(report));
        }

        let server = match self.gateway.reload(assessment_id).await {
            Ok(set) => set,
            Err(e) => {
                tracing::error!("reload after persisting failed: {e}");
                self.transition(WorkflowState::Error, observer);
                return Err(WorkflowError::Reload(e));
            }
        };

        let orphans: Vec<Question> = updated
            .into_iter()
            .filter(|local| server.questions.iter().all(|q| q.id != local.id))
            .cloned()
            .collect();

        buffer.commit(server);

        for orphan in orphans {
            let question = orphan.id;
            let statement = orphan.statement.clone();
            let readopted_as = buffer.readopt(orphan);
            let warning = ReconciliationWarning {
                question,
                readopted_as,
                statement,
            };
            tracing::warn!(
                question = %warning.question,
                readopted_as = %warning.readopted_as,
                "updated question is missing from the reloaded set"
            );
            observer.on_warning(&warning);
            report.warnings.push(warning);
        }

        report.finished_at = chrono::Utc::now();
        report.duration_ms = start.elapsed().as_millis() as u64;
        self.transition(WorkflowState::Synced, observer);
        self.transition(WorkflowState::Idle, observer);
        Ok(ConfirmOutcome::Synced(report))
    }

    fn ensure_idle(&self) -> Result<(), WorkflowError> {
        if self.state.accepts_confirm() {
            Ok(())
        } else {
            Err(WorkflowError::Busy {
                state: self.state.to_string(),
            })
        }
    }

    fn transition(&mut self, next: WorkflowState, observer: &dyn WorkflowObserver) {
        tracing::debug!(from = %self.state, to = %next, "workflow transition");
        self.state = next;
        observer.on_state(&next);
    }

    /// Wait the configured delay before every call except the first.
    async fn pace(&self, issued: &mut usize) {
        if *issued > 0 && !self.config.call_delay.is_zero() {
            tokio::time::sleep(self.config.call_delay).await;
        }
        *issued += 1;
    }

    fn record_failure(
        &self,
        report: &mut ConfirmationReport,
        observer: &dyn WorkflowObserver,
        kind: OperationKind,
        question: QuestionId,
        error: &GatewayError,
    ) {
        tracing::warn!(%kind, %question, "store call failed: {error}");
        observer.on_operation(kind, question, Some(error));
        report.record(kind, question, Some(error.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_allowed_only_when_idle_or_error() {
        assert!(WorkflowState::Idle.accepts_confirm());
        assert!(WorkflowState::Error.accepts_confirm());
        assert!(!WorkflowState::Persisting.accepts_confirm());
        assert!(!WorkflowState::NormalizationOffered { total: 90 }.accepts_confirm());
        assert!(!WorkflowState::Synced.accepts_confirm());
    }

    #[test]
    fn state_display() {
        assert_eq!(WorkflowState::Persisting.to_string(), "persisting");
        assert_eq!(
            WorkflowState::NormalizationOffered { total: 85 }.to_string(),
            "normalization offered (total 85)"
        );
    }

    #[test]
    fn fixed_prompts() {
        assert!(AlwaysAccept.accept(90, &[50, 50]));
        assert!(!AlwaysDecline.accept(90, &[50, 50]));
    }
}
