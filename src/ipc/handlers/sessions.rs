use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, repo_mut, repo_ref, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{now_ms, OptionKey, Session};
use crate::repo::Repository;
use crate::session::{self, EngineError, SelectionMode};
use serde_json::json;

fn engine_err(req: &Request, e: EngineError) -> serde_json::Value {
    err(&req.id, e.code, e.message, None)
}

fn session_result(req: &Request, session: &Session, persisted: bool) -> serde_json::Value {
    match serde_json::to_value(session) {
        Ok(session) => ok(&req.id, json!({ "session": session, "persisted": persisted })),
        Err(e) => err(&req.id, "serialize_failed", e.to_string(), None),
    }
}

/// Load the current session or report `no_session`. Mutating handlers all go
/// through this, so a finalized or never-started session fails uniformly.
fn current_session(repo: &Repository, req: &Request) -> Result<Session, serde_json::Value> {
    repo.current_session()
        .ok_or_else(|| err(&req.id, "no_session", "no session in progress", None))
}

fn begin(
    repo: &mut Repository,
    req: &Request,
    source_id: &str,
    build: impl FnOnce() -> Result<Session, EngineError>,
) -> serde_json::Value {
    // An unfinished attempt at the same source is resumed, not restarted.
    if let Some(current) = repo.current_session() {
        if session::resumable(&current, source_id) {
            return match serde_json::to_value(&current) {
                Ok(session) => ok(&req.id, json!({ "session": session, "resumed": true })),
                Err(e) => err(&req.id, "serialize_failed", e.to_string(), None),
            };
        }
    }
    let session = match build() {
        Ok(s) => s,
        Err(e) => return engine_err(req, e),
    };
    let persisted = repo.set_current_session(&session);
    match serde_json::to_value(&session) {
        Ok(session) => ok(
            &req.id,
            json!({ "session": session, "resumed": false, "persisted": persisted }),
        ),
        Err(e) => err(&req.id, "serialize_failed", e.to_string(), None),
    }
}

fn handle_session_start(state: &mut AppState, req: &Request) -> serde_json::Value {
    let quiz_id = match required_str(req, "quizId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let repo = match repo_mut(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let Some(quiz) = repo.saved_quiz_by_id(&quiz_id) else {
        return err(&req.id, "not_found", "quiz not found", None);
    };
    begin(repo, req, &quiz_id, || session::start_session(&quiz, now_ms()))
}

fn handle_session_start_from_category(state: &mut AppState, req: &Request) -> serde_json::Value {
    let category_id = match required_str(req, "categoryId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let count = match req.params.get("questionCount").and_then(|v| v.as_u64()) {
        Some(n) => n as usize,
        None => return err(&req.id, "bad_params", "missing questionCount", None),
    };
    let mode = match optional_str(req, "selectionMode") {
        None => SelectionMode::Random,
        Some(raw) => match serde_json::from_value(json!(raw)) {
            Ok(mode) => mode,
            Err(_) => {
                return err(
                    &req.id,
                    "bad_params",
                    format!("unknown selectionMode '{}'", raw),
                    None,
                )
            }
        },
    };

    let repo = match repo_mut(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    if repo.category_by_id(&category_id).is_none() {
        return err(&req.id, "not_found", "category not found", None);
    }
    let pool = repo.questions_by_category(&category_id);
    begin(repo, req, &category_id, || {
        let picked = session::select_questions(&pool, count, mode)?;
        session::snapshot_session(&category_id, picked, now_ms())
    })
}

fn handle_session_current(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo_ref(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match repo.current_session() {
        Some(session) => match serde_json::to_value(&session) {
            Ok(session) => ok(&req.id, json!({ "session": session })),
            Err(e) => err(&req.id, "serialize_failed", e.to_string(), None),
        },
        None => ok(&req.id, json!({ "session": serde_json::Value::Null })),
    }
}

fn handle_session_answer(state: &mut AppState, req: &Request) -> serde_json::Value {
    let raw = match required_str(req, "option") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(key) = OptionKey::parse(&raw) else {
        return err(
            &req.id,
            "bad_params",
            format!("option must be one of a, b, c, d; got '{}'", raw),
            None,
        );
    };
    let repo = match repo_mut(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let mut session = match current_session(repo, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    if let Err(e) = session::select_answer(&mut session, key) {
        return engine_err(req, e);
    }
    let persisted = repo.set_current_session(&session);
    session_result(req, &session, persisted)
}

fn handle_session_advance(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo_mut(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let mut session = match current_session(repo, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    if let Err(e) = session::advance(&mut session, now_ms()) {
        return engine_err(req, e);
    }
    let persisted = repo.set_current_session(&session);
    session_result(req, &session, persisted)
}

fn handle_session_retreat(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo_mut(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let mut session = match current_session(repo, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    if let Err(e) = session::retreat(&mut session) {
        return engine_err(req, e);
    }
    let persisted = repo.set_current_session(&session);
    session_result(req, &session, persisted)
}

fn handle_session_jump_to(state: &mut AppState, req: &Request) -> serde_json::Value {
    let index = match req.params.get("index").and_then(|v| v.as_u64()) {
        Some(n) => n as usize,
        None => return err(&req.id, "bad_params", "missing index", None),
    };
    let repo = match repo_mut(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let mut session = match current_session(repo, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    if let Err(e) = session::jump_to(&mut session, index) {
        return engine_err(req, e);
    }
    let persisted = repo.set_current_session(&session);
    session_result(req, &session, persisted)
}

/// Completes the current session in place. Idempotent: re-submitting an
/// already completed session keeps the original end time.
fn handle_session_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo_mut(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let mut session = match current_session(repo, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    session::submit(&mut session, now_ms());
    let persisted = repo.set_current_session(&session);
    session_result(req, &session, persisted)
}

/// Archive the current session and clear the slot. Completes first if the
/// caller skipped submit.
fn handle_session_finalize(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo_mut(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let mut session = match current_session(repo, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    session::submit(&mut session, now_ms());
    let persisted = repo.archive_session(&session);
    ok(
        &req.id,
        json!({ "sessionId": session.id, "persisted": persisted }),
    )
}

fn handle_sessions_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo_ref(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let mut sessions = repo.sessions();
    sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    let summaries: Vec<serde_json::Value> = sessions
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "sourceQuizId": s.source_quiz_id,
                "questionCount": s.questions.len(),
                "answeredCount": s.answers.len(),
                "startTime": s.start_time,
                "endTime": s.end_time,
                "isCompleted": s.is_completed,
            })
        })
        .collect();
    ok(&req.id, json!({ "sessions": summaries }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.start" => Some(handle_session_start(state, req)),
        "session.startFromCategory" => Some(handle_session_start_from_category(state, req)),
        "session.current" => Some(handle_session_current(state, req)),
        "session.answer" => Some(handle_session_answer(state, req)),
        "session.advance" => Some(handle_session_advance(state, req)),
        "session.retreat" => Some(handle_session_retreat(state, req)),
        "session.jumpTo" => Some(handle_session_jump_to(state, req)),
        "session.submit" => Some(handle_session_submit(state, req)),
        "session.finalize" => Some(handle_session_finalize(state, req)),
        "sessions.list" => Some(handle_sessions_list(state, req)),
        _ => None,
    }
}
