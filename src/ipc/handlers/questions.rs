use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, repo_mut, repo_ref, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{new_id, validate_question, OptionKey, Options, Question};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionParams {
    prompt: String,
    options: Options,
    correct_answer: OptionKey,
    category_id: String,
    #[serde(default)]
    image_ref: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
}

fn parse_question(req: &Request, id: String) -> Result<Question, serde_json::Value> {
    let params: QuestionParams = serde_json::from_value(req.params.clone())
        .map_err(|e| err(&req.id, "bad_params", e.to_string(), None))?;
    let question = Question {
        id,
        prompt: params.prompt.trim().to_string(),
        options: params.options,
        correct_answer: params.correct_answer,
        category_id: params.category_id,
        image_ref: params.image_ref,
        explanation: params.explanation,
    };
    validate_question(&question).map_err(|msg| err(&req.id, "bad_params", msg, None))?;
    Ok(question)
}

fn handle_questions_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo_ref(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let questions = match optional_str(req, "categoryId") {
        Some(category_id) => repo.questions_by_category(&category_id),
        None => repo.questions(),
    };
    match serde_json::to_value(questions) {
        Ok(questions) => ok(&req.id, json!({ "questions": questions })),
        Err(e) => err(&req.id, "serialize_failed", e.to_string(), None),
    }
}

fn handle_questions_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let question = match parse_question(req, new_id()) {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    let repo = match repo_mut(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    if repo.category_by_id(&question.category_id).is_none() {
        return err(
            &req.id,
            "not_found",
            format!("category '{}' does not exist", question.category_id),
            None,
        );
    }
    let question_id = question.id.clone();
    let persisted = repo.add_question(question);
    ok(
        &req.id,
        json!({ "questionId": question_id, "persisted": persisted }),
    )
}

fn handle_questions_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let question_id = match required_str(req, "questionId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let question = match parse_question(req, question_id) {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    let repo = match repo_mut(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match repo.update_question(question) {
        Some(persisted) => ok(&req.id, json!({ "persisted": persisted })),
        None => err(&req.id, "not_found", "question not found", None),
    }
}

fn handle_questions_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let question_id = match required_str(req, "questionId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let repo = match repo_mut(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match repo.delete_question(&question_id) {
        Some(persisted) => ok(&req.id, json!({ "persisted": persisted })),
        None => err(&req.id, "not_found", "question not found", None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "questions.list" => Some(handle_questions_list(state, req)),
        "questions.create" => Some(handle_questions_create(state, req)),
        "questions.update" => Some(handle_questions_update(state, req)),
        "questions.delete" => Some(handle_questions_delete(state, req)),
        _ => None,
    }
}
