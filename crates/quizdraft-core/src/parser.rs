//! TOML edit-script parser.
//!
//! An edit script replays operator actions against an [`EditBuffer`]:
//!
//! ```toml
//! [[edits]]
//! op = "add"
//! kind = "multiple_choice"
//! statement = "Which keyword declares a constant?"
//! options = ["let", "const", "static"]
//! correct_answer = "const"
//! points = 10
//!
//! [[edits]]
//! op = "update"
//! id = 12
//! points = 25
//!
//! [[edits]]
//! op = "remove"
//! id = 13
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::buffer::{EditBuffer, QuestionPatch};
use crate::model::{Question, QuestionId, QuestionKind};

/// A parsed edit script.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditScript {
    #[serde(default)]
    pub edits: Vec<Edit>,
}

/// One operator action.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Edit {
    Add(NewQuestion),
    Update {
        id: QuestionId,
        #[serde(flatten)]
        patch: QuestionPatch,
    },
    Remove {
        id: QuestionId,
    },
}

/// Fields of a question to add. The id is assigned by the buffer.
#[derive(Debug, Clone, Deserialize)]
pub struct NewQuestion {
    #[serde(default = "default_kind")]
    pub kind: QuestionKind,
    pub statement: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub order: i32,
}

fn default_kind() -> QuestionKind {
    QuestionKind::Open
}

impl From<NewQuestion> for Question {
    fn from(new: NewQuestion) -> Self {
        Question::draft(new.kind, new.statement, new.points)
            .with_options(new.options, new.correct_answer)
            .with_order(new.order)
    }
}

/// What happened to one edit when it was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditNote {
    Added(QuestionId),
    Updated(QuestionId),
    Removed(QuestionId),
    /// The target id is not in the buffer; nothing changed.
    UnknownId(QuestionId),
    /// The question could not be added.
    Rejected(String),
}

impl EditScript {
    /// Apply every edit in order.
    pub fn apply(&self, buffer: &mut EditBuffer) -> Vec<EditNote> {
        self.edits
            .iter()
            .map(|edit| match edit {
                Edit::Add(new) => match buffer.add(new.clone().into()) {
                    Ok(id) => EditNote::Added(id),
                    Err(e) => EditNote::Rejected(e.to_string()),
                },
                Edit::Update { id, patch } => {
                    if buffer.update(*id, patch) {
                        EditNote::Updated(*id)
                    } else {
                        EditNote::UnknownId(*id)
                    }
                }
                Edit::Remove { id } => match buffer.remove(*id) {
                    Some(_) => EditNote::Removed(*id),
                    None => EditNote::UnknownId(*id),
                },
            })
            .collect()
    }
}

/// Parse an edit script from TOML text.
pub fn parse_edit_script_str(content: &str) -> Result<EditScript> {
    toml::from_str(content).context("failed to parse edit script")
}

/// Parse an edit script from a TOML file.
pub fn parse_edit_script(path: &Path) -> Result<EditScript> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read edit script: {}", path.display()))?;
    parse_edit_script_str(&content).with_context(|| format!("in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionSet;

    const SCRIPT: &str = r#"
[[edits]]
op = "add"
kind = "multiple_choice"
statement = "Which keyword declares a constant?"
options = ["let", "const", "static"]
correct_answer = "const"
points = 10

[[edits]]
op = "update"
id = 1
points = 25
statement = "Reworded"

[[edits]]
op = "remove"
id = 2

[[edits]]
op = "remove"
id = 99
"#;

    fn buffer() -> EditBuffer {
        let question = |id: u64| Question {
            id: QuestionId::Persisted(id),
            kind: QuestionKind::Theory,
            statement: format!("Q{id}"),
            options: vec![],
            correct_answer: String::new(),
            points: 50,
            order: 0,
        };
        EditBuffer::load(QuestionSet::new(3, vec![question(1), question(2)]))
    }

    #[test]
    fn parse_script() {
        let script = parse_edit_script_str(SCRIPT).unwrap();
        assert_eq!(script.edits.len(), 4);
        match &script.edits[0] {
            Edit::Add(new) => {
                assert_eq!(new.kind, QuestionKind::MultipleChoice);
                assert_eq!(new.options.len(), 3);
            }
            other => panic!("expected add, got {other:?}"),
        }
        match &script.edits[1] {
            Edit::Update { id, patch } => {
                assert_eq!(*id, QuestionId::Persisted(1));
                assert_eq!(patch.points, Some(25));
                assert_eq!(patch.statement.as_deref(), Some("Reworded"));
                assert!(patch.kind.is_none());
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn apply_script() {
        let script = parse_edit_script_str(SCRIPT).unwrap();
        let mut buffer = buffer();
        let notes = script.apply(&mut buffer);

        assert!(matches!(notes[0], EditNote::Added(id) if id.is_pending()));
        assert_eq!(notes[1], EditNote::Updated(QuestionId::Persisted(1)));
        assert_eq!(notes[2], EditNote::Removed(QuestionId::Persisted(2)));
        assert_eq!(notes[3], EditNote::UnknownId(QuestionId::Persisted(99)));

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.total_points(), 35);
        assert!(buffer.is_dirty());
    }

    #[test]
    fn unknown_kind_is_coerced_in_scripts() {
        let script = parse_edit_script_str(
            r#"
[[edits]]
op = "add"
kind = "essay"
statement = "Discuss ownership"
points = 20
"#,
        )
        .unwrap();
        match &script.edits[0] {
            Edit::Add(new) => assert_eq!(new.kind, QuestionKind::Open),
            other => panic!("expected add, got {other:?}"),
        }
    }

    #[test]
    fn empty_statement_is_rejected_on_apply() {
        let script = parse_edit_script_str(
            r#"
[[edits]]
op = "add"
statement = ""
"#,
        )
        .unwrap();
        let mut buffer = buffer();
        let notes = script.apply(&mut buffer);
        assert!(matches!(notes[0], EditNote::Rejected(_)));
        assert!(!buffer.is_dirty());
    }

    #[test]
    fn unknown_op_fails_to_parse() {
        let err = parse_edit_script_str("[[edits]]\nop = \"rename\"\nid = 1\n").unwrap_err();
        assert!(err.to_string().contains("edit script"));
    }

    #[test]
    fn parse_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edits.toml");
        std::fs::write(&path, SCRIPT).unwrap();
        assert_eq!(parse_edit_script(&path).unwrap().edits.len(), 4);
        assert!(parse_edit_script(&dir.path().join("missing.toml")).is_err());
    }
}
