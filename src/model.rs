use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Closed set of answer option keys. Everything that consumes or produces an
/// option key goes through this enum, never a free-form string.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OptionKey {
    #[default]
    A,
    B,
    C,
    D,
}

impl OptionKey {
    pub const ALL: [OptionKey; 4] = [OptionKey::A, OptionKey::B, OptionKey::C, OptionKey::D];

    pub fn as_str(self) -> &'static str {
        match self {
            OptionKey::A => "a",
            OptionKey::B => "b",
            OptionKey::C => "c",
            OptionKey::D => "d",
        }
    }

    pub fn parse(s: &str) -> Option<OptionKey> {
        match s {
            "a" => Some(OptionKey::A),
            "b" => Some(OptionKey::B),
            "c" => Some(OptionKey::C),
            "d" => Some(OptionKey::D),
            _ => None,
        }
    }
}

/// The four answer texts of a question, one per option key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub a: String,
    pub b: String,
    pub c: String,
    pub d: String,
}

impl Options {
    pub fn get(&self, key: OptionKey) -> &str {
        match key {
            OptionKey::A => &self.a,
            OptionKey::B => &self.b,
            OptionKey::C => &self.c,
            OptionKey::D => &self.d,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub options: Options,
    pub correct_answer: OptionKey,
    pub category_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Derived; recomputed after every question/category mutation.
    pub question_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SavedQuiz {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub questions: Vec<Question>,
    pub created_at: i64,
}

/// One attempt at a quiz. `questions` is snapshot-copied at start and never
/// changes afterwards, so a completed session scores identically even if the
/// source quiz is later edited or deleted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Session {
    pub id: String,
    pub source_quiz_id: String,
    pub questions: Vec<Question>,
    pub current_question_index: usize,
    /// Sparse: an absent question id means unanswered (skipped).
    pub answers: BTreeMap<String, OptionKey>,
    pub start_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedResult {
    pub question_id: String,
    pub prompt: String,
    pub options: Options,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    pub user_answer: Option<OptionKey>,
    pub correct_answer: OptionKey,
    pub is_correct: bool,
    pub marks_awarded: i64,
}

/// Derived scoring summary. Never stored; recomputed on demand from a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub session_id: String,
    pub category_name: String,
    pub total_questions: usize,
    pub correct_answers: usize,
    pub incorrect_answers: usize,
    pub skipped_questions: usize,
    pub score: usize,
    pub percentage: i64,
    pub total_marks: i64,
    pub max_marks: i64,
    pub time_taken: i64,
    pub detailed_results: Vec<DetailedResult>,
}

/// Category ids are derived from the display name: lowercase, runs of
/// whitespace collapsed to single hyphens.
pub fn derive_category_id(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Validate a question prior to any mutation. No partial writes: callers must
/// reject the whole request when this fails.
pub fn validate_question(q: &Question) -> Result<(), String> {
    if q.prompt.trim().is_empty() {
        return Err("question prompt must not be empty".to_string());
    }
    for key in OptionKey::ALL {
        if q.options.get(key).trim().is_empty() {
            return Err(format!("option {} must not be empty", key.as_str()));
        }
    }
    if q.category_id.trim().is_empty() {
        return Err("question must reference a category".to_string());
    }
    Ok(())
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
