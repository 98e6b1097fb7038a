use serde::Serialize;

use crate::model::{Question, QuizResult, Session};
use crate::repo::Repository;
use crate::session;

/// Everything the external report renderer needs for one completed session:
/// the scored result plus the session's question snapshot. Rendering (page
/// layout, PDF output, image decoding) happens outside the core.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportModel {
    pub result: QuizResult,
    pub questions: Vec<Question>,
}

/// Display name for a session's source: a saved-quiz title when the session
/// was started from a saved quiz, a category name when it was built from a
/// category. `None` (deleted source) degrades to "Unknown Category" in the
/// scored result rather than failing.
pub fn resolve_source_name(repo: &Repository, source_id: &str) -> Option<String> {
    if let Some(quiz) = repo.saved_quiz_by_id(source_id) {
        return Some(quiz.title);
    }
    repo.category_by_id(source_id).map(|c| c.name)
}

pub fn build(repo: &Repository, session: &Session) -> ReportModel {
    let name = resolve_source_name(repo, &session.source_quiz_id);
    ReportModel {
        result: session::score(session, name.as_deref()),
        questions: session.questions.clone(),
    }
}
