//! Core data model types for quizdraft.
//!
//! A [`QuestionSet`] is the ordered list of scored [`Question`]s that belong
//! to one assessment. Questions that have not reached the remote store yet
//! carry a [`QuestionId::Pending`] id, which can never collide with an id
//! handed out by the store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QuestionError;

/// Delimiter used to join `options` into a single string at the boundary.
pub const OPTION_DELIMITER: char = '|';

/// Points every question set must add up to before it can be persisted.
pub const POINT_BUDGET: u32 = 100;

/// Granularity of question points.
pub const POINT_STEP: u32 = 5;

/// Identifier of a question.
///
/// Persisted ids are assigned by the remote store. Pending ids are handed out
/// by the edit buffer for questions created locally and only ever live inside
/// the working copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawQuestionId", into = "RawQuestionId")]
pub enum QuestionId {
    Persisted(u64),
    Pending(u32),
}

impl QuestionId {
    /// Returns `true` for ids that have not been assigned by the store.
    pub fn is_pending(&self) -> bool {
        matches!(self, QuestionId::Pending(_))
    }

    /// The store-assigned id, if any.
    pub fn persisted(&self) -> Option<u64> {
        match self {
            QuestionId::Persisted(id) => Some(*id),
            QuestionId::Pending(_) => None,
        }
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionId::Persisted(id) => write!(f, "{id}"),
            QuestionId::Pending(n) => write!(f, "pending-{n}"),
        }
    }
}

impl FromStr for QuestionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(n) = s.strip_prefix("pending-") {
            return n
                .parse::<u32>()
                .map(QuestionId::Pending)
                .map_err(|_| format!("invalid pending id: {s}"));
        }
        s.parse::<u64>()
            .map(QuestionId::Persisted)
            .map_err(|_| format!("invalid question id: {s}"))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawQuestionId {
    Number(u64),
    Text(String),
}

impl TryFrom<RawQuestionId> for QuestionId {
    type Error = String;

    fn try_from(raw: RawQuestionId) -> Result<Self, Self::Error> {
        match raw {
            RawQuestionId::Number(id) => Ok(QuestionId::Persisted(id)),
            RawQuestionId::Text(s) => s.parse(),
        }
    }
}

impl From<QuestionId> for RawQuestionId {
    fn from(id: QuestionId) -> Self {
        match id {
            QuestionId::Persisted(id) => RawQuestionId::Number(id),
            pending => RawQuestionId::Text(pending.to_string()),
        }
    }
}

/// The fixed set of question kinds.
///
/// Deserialization never fails: unknown kinds are coerced with
/// [`QuestionKind::coerce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum QuestionKind {
    Open,
    MultipleChoice,
    TrueFalse,
    Code,
    Theory,
}

/// Kind names that denote a free-form written answer.
const FREE_FORM_KINDS: &[&str] = &[
    "ESSAY",
    "SHORT_ANSWER",
    "LONG_ANSWER",
    "TEXT",
    "FREE_TEXT",
    "FREE_FORM",
    "WRITTEN",
    "OPEN_ENDED",
    "OPEN_ANSWER",
];

impl QuestionKind {
    /// Map any kind name onto the fixed enumeration.
    ///
    /// Known names (in any case, with `-`, `_` or spaces as separators) map
    /// directly. Unknown names become [`QuestionKind::Open`] when they denote a
    /// free-form answer and [`QuestionKind::Theory`] otherwise.
    pub fn coerce(raw: &str) -> Self {
        if let Ok(kind) = raw.parse() {
            return kind;
        }
        let normalized = normalize_kind_name(raw);
        if FREE_FORM_KINDS.contains(&normalized.as_str()) {
            QuestionKind::Open
        } else {
            QuestionKind::Theory
        }
    }

    /// Whether questions of this kind carry an option list.
    pub fn uses_options(&self) -> bool {
        matches!(self, QuestionKind::MultipleChoice | QuestionKind::TrueFalse)
    }
}

fn normalize_kind_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect::<String>()
        .to_uppercase()
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::Open => write!(f, "OPEN"),
            QuestionKind::MultipleChoice => write!(f, "MULTIPLE_CHOICE"),
            QuestionKind::TrueFalse => write!(f, "TRUE_FALSE"),
            QuestionKind::Code => write!(f, "CODE"),
            QuestionKind::Theory => write!(f, "THEORY"),
        }
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_kind_name(s).as_str() {
            "OPEN" => Ok(QuestionKind::Open),
            "MULTIPLE_CHOICE" | "MULTIPLECHOICE" | "MCQ" => Ok(QuestionKind::MultipleChoice),
            "TRUE_FALSE" | "TRUEFALSE" | "BOOLEAN" => Ok(QuestionKind::TrueFalse),
            "CODE" | "CODING" => Ok(QuestionKind::Code),
            "THEORY" => Ok(QuestionKind::Theory),
            other => Err(format!("unknown question kind: {other}")),
        }
    }
}

impl From<String> for QuestionKind {
    fn from(raw: String) -> Self {
        QuestionKind::coerce(&raw)
    }
}

/// A single scored assessment question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub kind: QuestionKind,
    pub statement: String,
    /// Ordered answer options; only meaningful for kinds that use options.
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: String,
    pub points: u32,
    /// Rank within the set. Not required to be contiguous.
    #[serde(default)]
    pub order: i32,
}

impl Question {
    /// A new, not yet persisted question. The edit buffer replaces the id
    /// when the question is added.
    pub fn draft(kind: QuestionKind, statement: impl Into<String>, points: u32) -> Self {
        Self {
            id: QuestionId::Pending(0),
            kind,
            statement: statement.into(),
            options: Vec::new(),
            correct_answer: String::new(),
            points,
            order: 0,
        }
    }

    /// Attach an option list and the correct answer.
    pub fn with_options(
        mut self,
        options: impl IntoIterator<Item = impl Into<String>>,
        correct_answer: impl Into<String>,
    ) -> Self {
        self.options = options.into_iter().map(Into::into).collect();
        self.correct_answer = correct_answer.into();
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Options in their boundary form, joined by [`OPTION_DELIMITER`].
    pub fn options_wire(&self) -> String {
        join_options(&self.options)
    }

    /// Check the question can be sent to the store.
    pub fn validate(&self) -> Result<(), QuestionError> {
        if self.statement.trim().is_empty() {
            return Err(QuestionError::EmptyStatement);
        }
        if !self.kind.uses_options() || self.options.is_empty() {
            return Ok(());
        }
        if let Some(option) = self.options.iter().find(|o| o.contains(OPTION_DELIMITER)) {
            return Err(QuestionError::DelimiterInOption(option.clone()));
        }
        if !self.options.iter().any(|o| o == &self.correct_answer) {
            return Err(QuestionError::CorrectAnswerNotAnOption(
                self.correct_answer.clone(),
            ));
        }
        Ok(())
    }
}

/// Join options into their boundary form.
pub fn join_options(options: &[String]) -> String {
    options.join(&OPTION_DELIMITER.to_string())
}

/// Split a boundary option string back into an ordered list.
///
/// An empty string means "no options".
pub fn split_options(wire: &str) -> Vec<String> {
    if wire.is_empty() {
        return Vec::new();
    }
    wire.split(OPTION_DELIMITER).map(str::to_string).collect()
}

/// The questions that belong to one assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSet {
    /// Assessment this set belongs to.
    pub assessment_id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl QuestionSet {
    pub fn new(assessment_id: u64, questions: Vec<Question>) -> Self {
        Self {
            assessment_id,
            title: String::new(),
            questions,
        }
    }

    pub fn total_points(&self) -> u64 {
        total_points(&self.questions)
    }
}

/// Sum of `points` over a slice of questions.
pub fn total_points(questions: &[Question]) -> u64 {
    questions.iter().map(|q| u64::from(q.points)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display_and_parse() {
        assert_eq!(QuestionKind::MultipleChoice.to_string(), "MULTIPLE_CHOICE");
        assert_eq!(
            "multiple-choice".parse::<QuestionKind>().unwrap(),
            QuestionKind::MultipleChoice
        );
        assert_eq!("mcq".parse::<QuestionKind>().unwrap(), QuestionKind::MultipleChoice);
        assert_eq!("True False".parse::<QuestionKind>().unwrap(), QuestionKind::TrueFalse);
        assert!("essay".parse::<QuestionKind>().is_err());
    }

    #[test]
    fn unknown_kinds_are_coerced() {
        assert_eq!(QuestionKind::coerce("essay"), QuestionKind::Open);
        assert_eq!(QuestionKind::coerce("short-answer"), QuestionKind::Open);
        assert_eq!(QuestionKind::coerce("Free Text"), QuestionKind::Open);
        assert_eq!(QuestionKind::coerce("matching"), QuestionKind::Theory);
        assert_eq!(QuestionKind::coerce(""), QuestionKind::Theory);
        assert_eq!(QuestionKind::coerce("code"), QuestionKind::Code);
    }

    #[test]
    fn kind_deserializes_leniently() {
        let kind: QuestionKind = serde_json::from_str("\"ESSAY\"").unwrap();
        assert_eq!(kind, QuestionKind::Open);
        let kind: QuestionKind = serde_json::from_str("\"TRUE_FALSE\"").unwrap();
        assert_eq!(kind, QuestionKind::TrueFalse);
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"TRUE_FALSE\"");
    }

    #[test]
    fn question_id_serde_forms() {
        assert_eq!(serde_json::to_string(&QuestionId::Persisted(12)).unwrap(), "12");
        assert_eq!(
            serde_json::to_string(&QuestionId::Pending(3)).unwrap(),
            "\"pending-3\""
        );
        let id: QuestionId = serde_json::from_str("\"pending-7\"").unwrap();
        assert_eq!(id, QuestionId::Pending(7));
        let id: QuestionId = serde_json::from_str("41").unwrap();
        assert_eq!(id, QuestionId::Persisted(41));
        assert!(serde_json::from_str::<QuestionId>("\"bogus\"").is_err());
    }

    #[test]
    fn pending_and_persisted_never_compare_equal() {
        assert_ne!(QuestionId::Pending(1), QuestionId::Persisted(1));
        assert!(QuestionId::Pending(1).is_pending());
        assert_eq!(QuestionId::Persisted(9).persisted(), Some(9));
    }

    #[test]
    fn options_wire_form() {
        let q = Question::draft(QuestionKind::MultipleChoice, "Pick one", 10)
            .with_options(["a", "b", "c"], "b");
        assert_eq!(q.options_wire(), "a|b|c");
        assert_eq!(split_options("a|b|c"), vec!["a", "b", "c"]);
        assert!(split_options("").is_empty());
    }

    #[test]
    fn validate_question() {
        let ok = Question::draft(QuestionKind::TrueFalse, "Sky is blue", 5)
            .with_options(["True", "False"], "True");
        assert!(ok.validate().is_ok());

        let empty = Question::draft(QuestionKind::Open, "   ", 5);
        assert!(matches!(empty.validate(), Err(QuestionError::EmptyStatement)));

        let bad_answer = Question::draft(QuestionKind::MultipleChoice, "Pick", 5)
            .with_options(["a", "b"], "c");
        assert!(matches!(
            bad_answer.validate(),
            Err(QuestionError::CorrectAnswerNotAnOption(_))
        ));

        let bad_option = Question::draft(QuestionKind::MultipleChoice, "Pick", 5)
            .with_options(["a|b", "c"], "c");
        assert!(matches!(
            bad_option.validate(),
            Err(QuestionError::DelimiterInOption(_))
        ));

        // Options on kinds that do not use them are ignored.
        let theory = Question::draft(QuestionKind::Theory, "Explain", 5).with_options(["x|y"], "");
        assert!(theory.validate().is_ok());
    }

    #[test]
    fn set_total_points() {
        let set = QuestionSet::new(
            1,
            vec![
                Question::draft(QuestionKind::Open, "a", 40),
                Question::draft(QuestionKind::Open, "b", 35),
            ],
        );
        assert_eq!(set.total_points(), 75);
    }

    #[test]
    fn total_points_does_not_wrap() {
        let questions = [
            Question::draft(QuestionKind::Open, "a", u32::MAX),
            Question::draft(QuestionKind::Open, "b", 101),
        ];
        assert_eq!(total_points(&questions), u64::from(u32::MAX) + 101);
    }
}
