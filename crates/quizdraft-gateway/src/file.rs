//! JSON file store gateway.
//!
//! Keeps every question set in one JSON document. Each mutation rewrites the
//! file. Useful for local curation and for driving the CLI without a server.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use quizdraft_core::error::GatewayError;
use quizdraft_core::model::{Question, QuestionId, QuestionKind, QuestionSet};
use quizdraft_core::normalize::normalize_points;
use quizdraft_core::traits::PersistenceGateway;

/// On-disk layout of the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreDocument {
    /// Next id to hand out.
    #[serde(default = "first_id")]
    pub next_id: u64,
    /// Sets keyed by assessment id.
    #[serde(default)]
    pub sets: BTreeMap<u64, QuestionSet>,
}

fn first_id() -> u64 {
    1
}

impl StoreDocument {
    fn allocate_id(&mut self) -> u64 {
        let used = self
            .sets
            .values()
            .flat_map(|s| s.questions.iter())
            .filter_map(|q| q.id.persisted())
            .max()
            .unwrap_or(0);
        let id = self.next_id.max(used + 1);
        self.next_id = id + 1;
        id
    }

    fn find_mut(&mut self, id: u64) -> Option<&mut Question> {
        self.sets
            .values_mut()
            .flat_map(|s| s.questions.iter_mut())
            .find(|q| q.id == QuestionId::Persisted(id))
    }
}

/// Gateway backed by a JSON file.
pub struct FileGateway {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileGateway {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `doc` to `path`, creating parent directories.
    pub fn write_document(path: &Path, doc: &StoreDocument) -> Result<(), GatewayError> {
        let json = serde_json::to_string_pretty(doc)
            .map_err(|e| GatewayError::Storage(format!("failed to serialize store: {e}")))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    GatewayError::Storage(format!("failed to create {}: {e}", parent.display()))
                })?;
            }
        }
        std::fs::write(path, json)
            .map_err(|e| GatewayError::Storage(format!("failed to write {}: {e}", path.display())))
    }

    fn read(&self) -> Result<StoreDocument, GatewayError> {
        if !self.path.exists() {
            return Ok(StoreDocument {
                next_id: first_id(),
                sets: BTreeMap::new(),
            });
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            GatewayError::Storage(format!("failed to read {}: {e}", self.path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            GatewayError::Storage(format!("failed to parse {}: {e}", self.path.display()))
        })
    }

    /// Run `f` against the document under the lock and save it afterwards.
    fn modify<T>(
        &self,
        f: impl FnOnce(&mut StoreDocument) -> Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| GatewayError::Storage("store lock poisoned".into()))?;
        let mut doc = self.read()?;
        let value = f(&mut doc)?;
        Self::write_document(&self.path, &doc)?;
        Ok(value)
    }
}

#[async_trait]
impl PersistenceGateway for FileGateway {
    fn name(&self) -> &str {
        "file"
    }

    async fn create_question(
        &self,
        assessment_id: u64,
        question: &Question,
    ) -> Result<Question, GatewayError> {
        self.modify(|doc| {
            let id = doc.allocate_id();
            let set = doc
                .sets
                .entry(assessment_id)
                .or_insert_with(|| QuestionSet::new(assessment_id, Vec::new()));
            let mut stored = question.clone();
            stored.id = QuestionId::Persisted(id);
            set.questions.push(stored.clone());
            tracing::debug!(assessment_id, id, "stored new question");
            Ok(stored)
        })
    }

    async fn update_question(&self, id: u64, question: &Question) -> Result<Question, GatewayError> {
        self.modify(|doc| {
            let slot = doc.find_mut(id).ok_or(GatewayError::NotFound(id))?;
            *slot = Question {
                id: QuestionId::Persisted(id),
                ..question.clone()
            };
            Ok(slot.clone())
        })
    }

    async fn delete_question(&self, id: u64) -> Result<(), GatewayError> {
        self.modify(|doc| {
            let target = QuestionId::Persisted(id);
            let set = doc
                .sets
                .values_mut()
                .find(|s| s.questions.iter().any(|q| q.id == target))
                .ok_or(GatewayError::NotFound(id))?;
            set.questions.retain(|q| q.id != target);
            Ok(())
        })
    }

    async fn reload(&self, assessment_id: u64) -> Result<QuestionSet, GatewayError> {
        let doc = self.read()?;
        Ok(doc
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
        let points = normalize_points(&vec![0; count]);
        self.modify(|doc| {
            let title = doc
                .sets
                .get(&assessment_id)
                .map(|s| s.title.clone())
                .unwrap_or_default();
            doc.sets.remove(&assessment_id);

            let mut questions = Vec::with_capacity(count);
            for (i, value) in points.iter().enumerate() {
                let id = doc.allocate_id();
                questions.push(Question {
                    id: QuestionId::Persisted(id),
                    kind: QuestionKind::Theory,
                    statement: format!("Generated question {}", i + 1),
                    options: Vec::new(),
                    correct_answer: String::new(),
                    points: *value,
                    order: i as i32 + 1,
                });
            }
            let set = QuestionSet {
                assessment_id,
                title,
                questions,
            };
            doc.sets.insert(assessment_id, set.clone());
            Ok(set)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(dir: &tempfile::TempDir) -> FileGateway {
        let path = dir.path().join("store.json");
        let mut sets = BTreeMap::new();
        sets.insert(
            1,
            QuestionSet {
                assessment_id: 1,
                title: "Seed".into(),
                questions: vec![Question {
                    id: QuestionId::Persisted(4),
                    kind: QuestionKind::Open,
                    statement: "Existing".into(),
                    options: vec![],
                    correct_answer: String::new(),
                    points: 100,
                    order: 1,
                }],
            },
        );
        FileGateway::write_document(&path, &StoreDocument { next_id: 1, sets }).unwrap();
        FileGateway::new(path)
    }

    #[tokio::test]
    async fn create_assigns_fresh_ids() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = seeded(&dir);

        let created = gateway
            .create_question(1, &Question::draft(QuestionKind::Code, "Write fizzbuzz", 20))
            .await
            .unwrap();
        // Id 4 is taken, so allocation skips past it.
        assert_eq!(created.id, QuestionId::Persisted(5));

        let set = gateway.reload(1).await.unwrap();
        assert_eq!(set.questions.len(), 2);
        assert_eq!(set.title, "Seed");
    }

    #[tokio::test]
    async fn update_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = seeded(&dir);

        let mut question = gateway.reload(1).await.unwrap().questions[0].clone();
        question.points = 55;
        let updated = gateway.update_question(4, &question).await.unwrap();
        assert_eq!(updated.points, 55);

        gateway.delete_question(4).await.unwrap();
        assert!(gateway.reload(1).await.unwrap().questions.is_empty());

        assert!(gateway.delete_question(4).await.unwrap_err().is_not_found());
        assert!(gateway
            .update_question(4, &question)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn missing_file_is_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = FileGateway::new(dir.path().join("nested/store.json"));
        let set = gateway.reload(3).await.unwrap();
        assert!(set.questions.is_empty());

        gateway
            .create_question(3, &Question::draft(QuestionKind::Open, "First", 100))
            .await
            .unwrap();
        assert!(gateway.path().exists());
    }

    #[tokio::test]
    async fn regenerate_replaces_set() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = seeded(&dir);

        let set = gateway.regenerate_questions(1, 3).await.unwrap();
        assert_eq!(set.questions.len(), 3);
        assert_eq!(set.total_points(), 100);
        assert!(set.questions.iter().all(|q| q.id != QuestionId::Persisted(4)));
        assert_eq!(gateway.reload(1).await.unwrap(), set);

        let large = gateway.regenerate_questions(1, 21).await.unwrap();
        assert_eq!(large.questions.len(), 21);
        assert_eq!(large.total_points(), 100);
    }

    #[tokio::test]
    async fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();
        let gateway = FileGateway::new(path);
        assert!(matches!(
            gateway.reload(1).await,
            Err(GatewayError::Storage(_))
        ));
    }
}
