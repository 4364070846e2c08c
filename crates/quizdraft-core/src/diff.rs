//! Reconcile a working copy against the last persisted snapshot.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{Question, QuestionId};

/// The operations needed to bring the store in line with the working copy.
///
/// The three lists are disjoint. Creates and updates follow the working
/// copy's order; deletes follow the snapshot's order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDiff {
    pub to_create: Vec<Question>,
    pub to_update: Vec<Question>,
    pub to_delete: Vec<Question>,
}

impl QuestionDiff {
    /// Total number of store calls this diff requires.
    pub fn len(&self) -> usize {
        self.to_create.len() + self.to_update.len() + self.to_delete.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Compute the create/update/delete sets.
///
/// Every persisted question in `working` is sent for update; content is not
/// compared. A persisted id that is missing from `original` is still an
/// update: the store reports the not-found.
pub fn diff(original: &[Question], working: &[Question]) -> QuestionDiff {
    let kept: HashSet<QuestionId> = working.iter().map(|q| q.id).collect();

    let (to_create, to_update): (Vec<Question>, Vec<Question>) = working
        .iter()
        .cloned()
        .partition(|q| q.id.is_pending());

    let to_delete = original
        .iter()
        .filter(|q| !kept.contains(&q.id))
        .cloned()
        .collect();

    QuestionDiff {
        to_create,
        to_update,
        to_delete,
    }
}
