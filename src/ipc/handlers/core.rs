use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{repo_mut, repo_ref, required_str};
use crate::ipc::types::{AppState, Request};
use crate::repo::Repository;
use crate::store::SqliteStore;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match required_str(req, "path").map(PathBuf::from) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match SqliteStore::open(&path) {
        Ok(store) => {
            let mut repo = Repository::new(Box::new(store));
            // Session history is pruned and defaults are seeded (first run
            // only) before any request touches the workspace.
            repo.initialize();
            state.workspace = Some(path.clone());
            state.repo = Some(repo);
            ok(&req.id, json!({ "workspacePath": path.to_string_lossy() }))
        }
        Err(e) => err(&req.id, "store_open_failed", format!("{e:?}"), None),
    }
}

fn handle_storage_repair(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo_mut(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let summary = repo.repair();
    ok(
        &req.id,
        json!({
            "categoriesAdded": summary.categories_added,
            "questionsAdded": summary.questions_added
        }),
    )
}

fn handle_storage_info(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo_ref(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match serde_json::to_value(repo.storage_info()) {
        Ok(info) => ok(&req.id, info),
        Err(e) => err(&req.id, "serialize_failed", e.to_string(), None),
    }
}

/// Destructive; the caller runs its own confirmation flow before invoking
/// this, the core does not ask twice.
fn handle_storage_clear_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo_mut(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    repo.clear_all();
    ok(&req.id, json!({ "cleared": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "storage.repair" => Some(handle_storage_repair(state, req)),
        "storage.info" => Some(handle_storage_info(state, req)),
        "storage.clearAll" => Some(handle_storage_clear_all(state, req)),
        _ => None,
    }
}
