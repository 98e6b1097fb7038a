use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::repo::Repository;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
}

pub fn repo_ref<'a>(state: &'a AppState, req: &Request) -> Result<&'a Repository, serde_json::Value> {
    state
        .repo
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn repo_mut<'a>(
    state: &'a mut AppState,
    req: &Request,
) -> Result<&'a mut Repository, serde_json::Value> {
    state
        .repo
        .as_mut()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}
