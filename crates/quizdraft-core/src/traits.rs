//! Core trait definitions for the persistence gateway.
//!
//! The gateway is the only way the core talks to the remote store. Concrete
//! implementations live in the `quizdraft-gateway` crate.

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::model::{Question, QuestionSet};

/// Trait for backends that persist question sets.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Human-readable gateway name (e.g. "http").
    fn name(&self) -> &str;

    /// Create a question in `assessment_id`. The returned question carries
    /// the store-assigned id.
    async fn create_question(
        &self,
        assessment_id: u64,
        question: &Question,
    ) -> Result<Question, GatewayError>;

    /// Overwrite the persisted question `id`.
    async fn update_question(&self, id: u64, question: &Question)
        -> Result<Question, GatewayError>;

    /// Delete the persisted question `id`.
    async fn delete_question(&self, id: u64) -> Result<(), GatewayError>;

    /// Load the authoritative question set.
    async fn reload(&self, assessment_id: u64) -> Result<QuestionSet, GatewayError>;

    /// Replace the whole set with `count` freshly generated questions.
    async fn regenerate_questions(
        &self,
        assessment_id: u64,
        count: usize,
    ) -> Result<QuestionSet, GatewayError>;
}
