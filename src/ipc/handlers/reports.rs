use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, repo_ref};
use crate::ipc::types::{AppState, Request};
use crate::report;
use serde_json::json;

/// Build the report model for an archived session (by id) or, with no
/// `sessionId`, for the session currently in progress.
fn handle_result_model(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo_ref(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let session = match optional_str(req, "sessionId") {
        Some(session_id) => match repo.session_by_id(&session_id) {
            Some(s) => s,
            None => return err(&req.id, "not_found", "session not found", None),
        },
        None => match repo.current_session() {
            Some(s) => s,
            None => return err(&req.id, "no_session", "no session in progress", None),
        },
    };
    let model = report::build(repo, &session);
    match serde_json::to_value(&model) {
        Ok(model) => ok(&req.id, model),
        Err(e) => err(&req.id, "serialize_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.resultModel" => Some(handle_result_model(state, req)),
        _ => None,
    }
}
