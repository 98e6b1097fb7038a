use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{repo_mut, repo_ref, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{new_id, now_ms, validate_question, OptionKey, Options, Question, SavedQuiz};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmbeddedQuestionParams {
    prompt: String,
    options: Options,
    correct_answer: OptionKey,
    #[serde(default)]
    category_id: Option<String>,
    #[serde(default)]
    image_ref: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizCreateParams {
    title: String,
    #[serde(default)]
    description: Option<String>,
    /// Stamped onto embedded questions that carry no category of their own.
    #[serde(default)]
    category_id: Option<String>,
    questions: Vec<EmbeddedQuestionParams>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizUpdateParams {
    quiz_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    category_id: Option<String>,
    #[serde(default)]
    questions: Option<Vec<EmbeddedQuestionParams>>,
}

/// Build owned question copies for a quiz. All-or-nothing: any invalid
/// question rejects the whole request before anything is written.
fn build_questions(
    req: &Request,
    params: Vec<EmbeddedQuestionParams>,
    fallback_category: Option<&str>,
) -> Result<Vec<Question>, serde_json::Value> {
    let mut questions = Vec::with_capacity(params.len());
    for (i, p) in params.into_iter().enumerate() {
        let category_id = p
            .category_id
            .or_else(|| fallback_category.map(|c| c.to_string()))
            .unwrap_or_default();
        let question = Question {
            id: new_id(),
            prompt: p.prompt.trim().to_string(),
            options: p.options,
            correct_answer: p.correct_answer,
            category_id,
            image_ref: p.image_ref,
            explanation: p.explanation,
        };
        validate_question(&question)
            .map_err(|msg| err(&req.id, "bad_params", format!("question {}: {}", i + 1, msg), None))?;
        questions.push(question);
    }
    Ok(questions)
}

fn quiz_summary(quiz: &SavedQuiz) -> serde_json::Value {
    json!({
        "id": quiz.id,
        "title": quiz.title,
        "description": quiz.description,
        "questionCount": quiz.questions.len(),
        "createdAt": quiz.created_at,
    })
}

fn handle_quizzes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo_ref(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let quizzes: Vec<serde_json::Value> = repo.saved_quizzes().iter().map(quiz_summary).collect();
    ok(&req.id, json!({ "quizzes": quizzes }))
}

fn handle_quizzes_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let quiz_id = match required_str(req, "quizId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let repo = match repo_ref(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let Some(quiz) = repo.saved_quiz_by_id(&quiz_id) else {
        return err(&req.id, "not_found", "quiz not found", None);
    };
    match serde_json::to_value(quiz) {
        Ok(quiz) => ok(&req.id, json!({ "quiz": quiz })),
        Err(e) => err(&req.id, "serialize_failed", e.to_string(), None),
    }
}

fn handle_quizzes_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let params: QuizCreateParams = match serde_json::from_value(req.params.clone()) {
        Ok(p) => p,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    let title = params.title.trim().to_string();
    if title.is_empty() {
        return err(&req.id, "bad_params", "title must not be empty", None);
    }
    if params.questions.is_empty() {
        return err(
            &req.id,
            "bad_params",
            "quiz must contain at least one question",
            None,
        );
    }
    let questions = match build_questions(req, params.questions, params.category_id.as_deref()) {
        Ok(qs) => qs,
        Err(resp) => return resp,
    };

    let quiz = SavedQuiz {
        id: new_id(),
        title,
        description: params.description,
        questions,
        created_at: now_ms(),
    };

    let repo = match repo_mut(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let quiz_id = quiz.id.clone();
    let persisted = repo.add_saved_quiz(quiz);
    ok(&req.id, json!({ "quizId": quiz_id, "persisted": persisted }))
}

fn handle_quizzes_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let params: QuizUpdateParams = match serde_json::from_value(req.params.clone()) {
        Ok(p) => p,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };

    let repo = match repo_mut(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let Some(mut quiz) = repo.saved_quiz_by_id(&params.quiz_id) else {
        return err(&req.id, "not_found", "quiz not found", None);
    };

    if let Some(title) = params.title {
        let title = title.trim().to_string();
        if title.is_empty() {
            return err(&req.id, "bad_params", "title must not be empty", None);
        }
        quiz.title = title;
    }
    if let Some(description) = params.description {
        quiz.description = Some(description);
    }
    if let Some(question_params) = params.questions {
        if question_params.is_empty() {
            return err(
                &req.id,
                "bad_params",
                "quiz must contain at least one question",
                None,
            );
        }
        quiz.questions = match build_questions(req, question_params, params.category_id.as_deref())
        {
            Ok(qs) => qs,
            Err(resp) => return resp,
        };
    }

    match repo.update_saved_quiz(quiz) {
        Some(persisted) => ok(&req.id, json!({ "persisted": persisted })),
        None => err(&req.id, "not_found", "quiz not found", None),
    }
}

fn handle_quizzes_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let quiz_id = match required_str(req, "quizId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let repo = match repo_mut(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match repo.delete_saved_quiz(&quiz_id) {
        Some(persisted) => ok(&req.id, json!({ "persisted": persisted })),
        None => err(&req.id, "not_found", "quiz not found", None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "quizzes.list" => Some(handle_quizzes_list(state, req)),
        "quizzes.get" => Some(handle_quizzes_get(state, req)),
        "quizzes.create" => Some(handle_quizzes_create(state, req)),
        "quizzes.update" => Some(handle_quizzes_update(state, req)),
        "quizzes.delete" => Some(handle_quizzes_delete(state, req)),
        _ => None,
    }
}
