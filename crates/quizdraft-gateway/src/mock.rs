//! Mock gateway for testing.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use quizdraft_core::error::GatewayError;
use quizdraft_core::model::{Question, QuestionId, QuestionKind, QuestionSet};
use quizdraft_core::normalize::normalize_points;
use quizdraft_core::traits::PersistenceGateway;

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { assessment_id: u64, statement: String },
    Update { id: u64 },
    Delete { id: u64 },
    Reload { assessment_id: u64 },
    Regenerate { assessment_id: u64, count: usize },
}

#[derive(Default)]
struct State {
    sets: BTreeMap<u64, QuestionSet>,
    next_id: u64,
    calls: Vec<Call>,
    failing_updates: HashSet<u64>,
    failing_deletes: HashSet<u64>,
    failing_create_statements: HashSet<String>,
    vanish_on_update: HashSet<u64>,
    fail_reload: bool,
}

/// In-memory gateway with call recording and failure injection.
pub struct MockGateway {
    state: Mutex<State>,
    call_count: AtomicU32,
}

impl MockGateway {
    /// Create a mock store holding `sets`. New ids start above the largest
    /// id already present.
    pub fn new(sets: impl IntoIterator<Item = QuestionSet>) -> Self {
        let sets: BTreeMap<u64, QuestionSet> =
            sets.into_iter().map(|s| (s.assessment_id, s)).collect();
        let max_id = sets
            .values()
            .flat_map(|s| s.questions.iter())
            .filter_map(|q| q.id.persisted())
            .max()
            .unwrap_or(0);
        Self {
            state: Mutex::new(State {
                sets,
                next_id: max_id + 1,
                ..Default::default()
            }),
            call_count: AtomicU32::new(0),
        }
    }

    /// Make every update of `id` fail with a rejection.
    pub fn fail_update(&self, id: u64) -> &Self {
        self.state.lock().unwrap().failing_updates.insert(id);
        self
    }

    /// Make every delete of `id` fail with a rejection.
    pub fn fail_delete(&self, id: u64) -> &Self {
        self.state.lock().unwrap().failing_deletes.insert(id);
        self
    }

    /// Make creating a question with this statement fail.
    pub fn fail_create(&self, statement: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .failing_create_statements
            .insert(statement.to_string());
        self
    }

    /// Accept updates of `id` but drop the question from the store, as if it
    /// had been deleted concurrently.
    pub fn vanish_on_update(&self, id: u64) -> &Self {
        self.state.lock().unwrap().vanish_on_update.insert(id);
        self
    }

    /// Make `reload` fail.
    pub fn fail_reload(&self, fail: bool) -> &Self {
        self.state.lock().unwrap().fail_reload = fail;
        self
    }

    /// Drop every injected failure.
    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.failing_updates.clear();
        state.failing_deletes.clear();
        state.failing_create_statements.clear();
        state.vanish_on_update.clear();
        state.fail_reload = false;
    }

    /// Remove a question behind the buffer's back.
    pub fn delete_remotely(&self, id: u64) {
        let mut state = self.state.lock().unwrap();
        for set in state.sets.values_mut() {
            set.questions.retain(|q| q.id != QuestionId::Persisted(id));
        }
    }

    /// Get the number of calls made to this gateway.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Current contents of a set.
    pub fn set(&self, assessment_id: u64) -> Option<QuestionSet> {
        self.state.lock().unwrap().sets.get(&assessment_id).cloned()
    }

    fn record(&self, call: Call) -> std::sync::MutexGuard<'_, State> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state
    }
}

fn rejected(message: String) -> GatewayError {
    GatewayError::Rejected {
        status: 422,
        message,
    }
}

#[async_trait]
impl PersistenceGateway for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_question(
        &self,
        assessment_id: u64,
        question: &Question,
    ) -> Result<Question, GatewayError> {
        let mut state = self.record(Call::Create {
            assessment_id,
            statement: question.statement.clone(),
        });
        if state.failing_create_statements.contains(&question.statement) {
            return Err(rejected(format!("cannot create {:?}", question.statement)));
        }
        let id = state.next_id;
        state.next_id += 1;
        let stored = Question {
            id: QuestionId::Persisted(id),
            ..question.clone()
        };
        state
            .sets
            .entry(assessment_id)
            .or_insert_with(|| QuestionSet::new(assessment_id, Vec::new()))
            .questions
            .push(stored.clone());
        Ok(stored)
    }

    async fn update_question(&self, id: u64, question: &Question) -> Result<Question, GatewayError> {
        let mut state = self.record(Call::Update { id });
        if state.failing_updates.contains(&id) {
            return Err(rejected(format!("update of {id} refused")));
        }
        let target = QuestionId::Persisted(id);
        let vanish = state.vanish_on_update.contains(&id);
        let set = state
            .sets
            .values_mut()
            .find(|s| s.questions.iter().any(|q| q.id == target))
            .ok_or(GatewayError::NotFound(id))?;
        let stored = Question {
            id: target,
            ..question.clone()
        };
        if vanish {
            set.questions.retain(|q| q.id != target);
        } else if let Some(slot) = set.questions.iter_mut().find(|q| q.id == target) {
            *slot = stored.clone();
        }
        Ok(stored)
    }

    async fn delete_question(&self, id: u64) -> Result<(), GatewayError> {
        let mut state = self.record(Call::Delete { id });
        if state.failing_deletes.contains(&id) {
            return Err(rejected(format!("delete of {id} refused")));
        }
        let target = QuestionId::Persisted(id);
        let set = state
            .sets
            .values_mut()
            .find(|s| s.questions.iter().any(|q| q.id == target))
            .ok_or(GatewayError::NotFound(id))?;
        set.questions.retain(|q| q.id != target);
        Ok(())
    }

    async fn reload(&self, assessment_id: u64) -> Result<QuestionSet, GatewayError> {
        let state = self.record(Call::Reload { assessment_id });
        if state.fail_reload {
            return Err(GatewayError::NetworkError("store unavailable".into()));
        }
        Ok(state
            .sets
            .get(&assessment_id)
            .cloned()
            .unwrap_or_else(|| QuestionSet::new(assessment_id, Vec::new())))
    }

    async fn regenerate_questions(
        &self,
        assessment_id: u64,
        count: usize,
    ) -> Result<QuestionSet, GatewayError> {
        let mut state = self.record(Call::Regenerate {
            assessment_id,
            count,
        });
        let points = normalize_points(&vec![0; count]);
        let mut questions = Vec::with_capacity(count);
        for (i, &value) in points.iter().enumerate() {
            let id = state.next_id;
            state.next_id += 1;
            questions.push(Question {
                id: QuestionId::Persisted(id),
                kind: QuestionKind::Theory,
                statement: format!("Generated {}", i + 1),
                options: Vec::new(),
                correct_answer: String::new(),
                points: value,
                order: i as i32,
            });
        }
        let set = QuestionSet::new(assessment_id, questions);
        state.sets.insert(assessment_id, set.clone());
        Ok(set)
    }
}
