//! The edit buffer: a working copy of a question set plus the snapshot it
//! was loaded from.
//!
//! Mutations only touch the working copy. The snapshot always mirrors what
//! the store is known to hold, so the diff engine can reconcile the two.

use serde::{Deserialize, Serialize};

use crate::error::BufferError;
use crate::model::{total_points, Question, QuestionId, QuestionKind, QuestionSet};

/// Partial update of a question. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPatch {
    #[serde(default)]
    pub kind: Option<QuestionKind>,
    #[serde(default)]
    pub statement: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub points: Option<u32>,
    #[serde(default)]
    pub order: Option<i32>,
}

impl QuestionPatch {
    pub fn points(points: u32) -> Self {
        Self {
            points: Some(points),
            ..Default::default()
        }
    }

    pub fn statement(statement: impl Into<String>) -> Self {
        Self {
            statement: Some(statement.into()),
            ..Default::default()
        }
    }

    /// Apply the patch to `question`. The id is never changed.
    pub fn apply_to(&self, question: &mut Question) {
        if let Some(kind) = self.kind {
            question.kind = kind;
        }
        if let Some(statement) = &self.statement {
            question.statement = statement.clone();
        }
        if let Some(options) = &self.options {
            question.options = options.clone();
        }
        if let Some(answer) = &self.correct_answer {
            question.correct_answer = answer.clone();
        }
        if let Some(points) = self.points {
            question.points = points;
        }
        if let Some(order) = self.order {
            question.order = order;
        }
    }
}

/// Local editing session over one question set.
#[derive(Debug, Clone)]
pub struct EditBuffer {
    assessment_id: u64,
    title: String,
    snapshot: Vec<Question>,
    working: Vec<Question>,
    dirty: bool,
    /// Last placeholder handed out. Never reset, so placeholders stay unique
    /// for the lifetime of the buffer.
    last_pending: u32,
}

impl EditBuffer {
    /// Start a session from a freshly loaded set.
    pub fn load(set: QuestionSet) -> Self {
        Self {
            assessment_id: set.assessment_id,
            title: set.title,
            snapshot: set.questions.clone(),
            working: set.questions,
            dirty: false,
            last_pending: 0,
        }
    }

    pub fn assessment_id(&self) -> u64 {
        self.assessment_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// The working copy, in display order.
    pub fn questions(&self) -> &[Question] {
        &self.working
    }

    /// What the store is known to hold.
    pub fn snapshot(&self) -> &[Question] {
        &self.snapshot
    }

    pub fn get(&self, id: QuestionId) -> Option<&Question> {
        self.working.iter().find(|q| q.id == id)
    }

    pub fn len(&self) -> usize {
        self.working.len()
    }

    pub fn is_empty(&self) -> bool {
        self.working.is_empty()
    }

    pub fn total_points(&self) -> u64 {
        total_points(&self.working)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The working copy as a question set.
    pub fn to_set(&self) -> QuestionSet {
        QuestionSet {
            assessment_id: self.assessment_id,
            title: self.title.clone(),
            questions: self.working.clone(),
        }
    }

    /// Append a new question under a fresh placeholder id.
    pub fn add(&mut self, mut question: Question) -> Result<QuestionId, BufferError> {
        if question.statement.trim().is_empty() {
            return Err(BufferError::EmptyStatement);
        }
        let id = self.next_pending();
        question.id = id;
        self.working.push(question);
        self.dirty = true;
        Ok(id)
    }

    /// Patch the question with `id` in place. Returns `false` (and changes
    /// nothing) when no such question exists.
    pub fn update(&mut self, id: QuestionId, patch: &QuestionPatch) -> bool {
        let Some(question) = self.working.iter_mut().find(|q| q.id == id) else {
            return false;
        };
        patch.apply_to(question);
        self.dirty = true;
        true
    }

    /// Remove the question with `id`. Unknown ids are ignored.
    pub fn remove(&mut self, id: QuestionId) -> Option<Question> {
        let index = self.working.iter().position(|q| q.id == id)?;
        self.dirty = true;
        Some(self.working.remove(index))
    }

    /// Overwrite every question's points, positionally.
    ///
    /// Used to apply a normalization result. `points` must be aligned with
    /// [`EditBuffer::questions`]. Returns `false` and changes nothing when the
    /// lengths differ.
    pub fn apply_points(&mut self, points: &[u32]) -> bool {
        if points.len() != self.working.len() {
            return false;
        }
        for (question, &value) in self.working.iter_mut().zip(points) {
            question.points = value;
        }
        self.dirty = true;
        true
    }

    /// Replace both the snapshot and the working copy with the store's view.
    pub fn commit(&mut self, set: QuestionSet) {
        self.assessment_id = set.assessment_id;
        self.title = set.title;
        self.snapshot = set.questions.clone();
        self.working = set.questions;
        self.dirty = false;
    }

    /// Re-add a question the store no longer knows about, under a fresh
    /// placeholder, so the operator can decide what to do with it.
    pub fn readopt(&mut self, mut question: Question) -> QuestionId {
        let id = self.next_pending();
        question.id = id;
        self.working.push(question);
        self.dirty = true;
        id
    }

    /// Record that a pending question now exists in the store.
    pub(crate) fn settle_created(&mut self, pending: QuestionId, persisted: Question) {
        if let Some(slot) = self.working.iter_mut().find(|q| q.id == pending) {
            *slot = persisted.clone();
        }
        self.snapshot.push(persisted);
    }

    /// Record that the store accepted an update.
    pub(crate) fn settle_updated(&mut self, persisted: Question) {
        match self.snapshot.iter_mut().find(|q| q.id == persisted.id) {
            Some(slot) => *slot = persisted,
            None => self.snapshot.push(persisted),
        }
    }

    /// Record that the store deleted a question.
    pub(crate) fn settle_deleted(&mut self, id: QuestionId) {
        self.snapshot.retain(|q| q.id != id);
    }

    fn next_pending(&mut self) -> QuestionId {
        self.last_pending += 1;
        QuestionId::Pending(self.last_pending)
    }
}
