use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::model::{DetailedResult, OptionKey, Question, QuizResult, SavedQuiz, Session};

pub const MARKS_CORRECT: i64 = 4;
pub const MARKS_INCORRECT: i64 = -1;
pub const MARKS_PER_QUESTION: i64 = 4;

/// Engine-level failure with a stable wire code.
#[derive(Debug, Clone)]
pub struct EngineError {
    pub code: &'static str,
    pub message: String,
}

impl EngineError {
    fn new(code: &'static str, message: impl Into<String>) -> EngineError {
        EngineError {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    Random,
    Sequential,
}

/// Construct a fresh session from a saved quiz: full ordered question
/// snapshot, index 0, no answers.
pub fn start_session(quiz: &SavedQuiz, now: i64) -> Result<Session, EngineError> {
    snapshot_session(&quiz.id, quiz.questions.clone(), now)
}

/// Construct a session from an arbitrary question snapshot (category-built
/// quizzes source their session to the category id).
pub fn snapshot_session(
    source_id: &str,
    questions: Vec<Question>,
    now: i64,
) -> Result<Session, EngineError> {
    if questions.is_empty() {
        return Err(EngineError::new("empty_quiz", "quiz has no questions"));
    }
    Ok(Session {
        id: crate::model::new_id(),
        source_quiz_id: source_id.to_string(),
        questions,
        current_question_index: 0,
        answers: Default::default(),
        start_time: now,
        end_time: None,
        is_completed: false,
    })
}

/// Whether an existing current session should be resumed instead of starting a
/// duplicate. The resume key is the source quiz id, nothing looser.
pub fn resumable(current: &Session, source_id: &str) -> bool {
    !current.is_completed && current.source_quiz_id == source_id
}

/// Pick `count` questions for a category-built quiz. Bounds are validated here
/// so no partial construction happens on bad input.
pub fn select_questions(
    pool: &[Question],
    count: usize,
    mode: SelectionMode,
) -> Result<Vec<Question>, EngineError> {
    if count == 0 {
        return Err(EngineError::new("bad_params", "questionCount must be at least 1"));
    }
    if count > pool.len() {
        return Err(EngineError::new(
            "bad_params",
            format!(
                "questionCount {} exceeds available questions {}",
                count,
                pool.len()
            ),
        ));
    }
    let mut picked: Vec<Question> = pool.to_vec();
    match mode {
        SelectionMode::Random => {
            picked.shuffle(&mut rand::thread_rng());
            picked.truncate(count);
        }
        SelectionMode::Sequential => picked.truncate(count),
    }
    Ok(picked)
}

/// Record (or overwrite) the answer for the current question.
pub fn select_answer(session: &mut Session, key: OptionKey) -> Result<(), EngineError> {
    if session.is_completed {
        return Err(EngineError::new(
            "session_completed",
            "cannot answer a completed session",
        ));
    }
    let Some(question) = session.questions.get(session.current_question_index) else {
        return Err(EngineError::new("bad_params", "current question index out of range"));
    };
    let id = question.id.clone();
    session.answers.insert(id, key);
    Ok(())
}

/// Move forward one question. Advancing past the last question is the only
/// implicit completion path.
pub fn advance(session: &mut Session, now: i64) -> Result<(), EngineError> {
    if session.is_completed {
        return Err(EngineError::new(
            "session_completed",
            "session is already completed",
        ));
    }
    if session.current_question_index + 1 >= session.questions.len() {
        complete(session, now);
    } else {
        session.current_question_index += 1;
    }
    Ok(())
}

/// Move back one question, clamped at the first.
pub fn retreat(session: &mut Session) -> Result<(), EngineError> {
    if session.is_completed {
        return Err(EngineError::new(
            "session_completed",
            "session is already completed",
        ));
    }
    session.current_question_index = session.current_question_index.saturating_sub(1);
    Ok(())
}

/// Direct navigation. Never completes the session, even at the last index.
pub fn jump_to(session: &mut Session, index: usize) -> Result<(), EngineError> {
    if session.is_completed {
        return Err(EngineError::new(
            "session_completed",
            "session is already completed",
        ));
    }
    if index >= session.questions.len() {
        return Err(EngineError::new(
            "bad_params",
            format!(
                "index {} out of range for {} questions",
                index,
                session.questions.len()
            ),
        ));
    }
    session.current_question_index = index;
    Ok(())
}

/// Force completion. Covers user submission and timer expiry alike; a second
/// call on a completed session is a no-op, so a user submit racing the timer
/// tick is harmless.
pub fn submit(session: &mut Session, now: i64) {
    if session.is_completed {
        return;
    }
    complete(session, now);
}

fn complete(session: &mut Session, now: i64) {
    session.is_completed = true;
    session.end_time = Some(now);
}

/// Compute the scored result for a session. Pure: byte-for-byte reproducible
/// from the same session data, with no clock or randomness of its own.
pub fn score(session: &Session, category_name: Option<&str>) -> QuizResult {
    let mut correct_answers = 0usize;
    let mut incorrect_answers = 0usize;
    let mut skipped_questions = 0usize;
    let mut total_marks = 0i64;

    let detailed_results: Vec<DetailedResult> = session
        .questions
        .iter()
        .map(|question| {
            let user_answer = session.answers.get(&question.id).copied();
            let is_correct = user_answer == Some(question.correct_answer);
            let marks_awarded = match user_answer {
                None => {
                    skipped_questions += 1;
                    0
                }
                Some(_) if is_correct => {
                    correct_answers += 1;
                    MARKS_CORRECT
                }
                Some(_) => {
                    incorrect_answers += 1;
                    MARKS_INCORRECT
                }
            };
            total_marks += marks_awarded;
            DetailedResult {
                question_id: question.id.clone(),
                prompt: question.prompt.clone(),
                options: question.options.clone(),
                image_ref: question.image_ref.clone(),
                user_answer,
                correct_answer: question.correct_answer,
                is_correct,
                marks_awarded,
            }
        })
        .collect();

    let total_questions = session.questions.len();
    let max_marks = total_questions as i64 * MARKS_PER_QUESTION;
    let percentage = if max_marks > 0 {
        ((total_marks as f64 / max_marks as f64) * 100.0).round() as i64
    } else {
        0
    };
    let time_taken = session
        .end_time
        .map(|end| end - session.start_time)
        .unwrap_or(0);

    QuizResult {
        session_id: session.id.clone(),
        category_name: category_name.unwrap_or("Unknown Category").to_string(),
        total_questions,
        correct_answers,
        incorrect_answers,
        skipped_questions,
        score: correct_answers,
        percentage,
        total_marks,
        max_marks,
        time_taken,
        detailed_results,
    }
}
