//! quizdraft-core: question model, edit buffer, diff engine, score
//! normalization and the confirmation workflow.
//!
//! Operators edit a [`buffer::EditBuffer`] locally; confirming runs the
//! [`workflow::ConfirmationWorkflow`], which validates the point total,
//! offers [`normalize::normalize`] when it is off, computes a
//! [`diff::QuestionDiff`] and persists it through a
//! [`traits::PersistenceGateway`].

pub mod buffer;
pub mod diff;
pub mod error;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod report;
pub mod traits;
pub mod workflow;

pub use buffer::{EditBuffer, QuestionPatch};
pub use diff::{diff, QuestionDiff};
pub use error::{BufferError, GatewayError, QuestionError, WorkflowError};
pub use model::{Question, QuestionId, QuestionKind, QuestionSet};
pub use normalize::{normalize, normalize_points};
pub use report::{ConfirmationReport, OperationKind, OperationTally};
pub use traits::PersistenceGateway;
pub use workflow::{ConfirmOutcome, ConfirmationWorkflow, WorkflowConfig, WorkflowState};
