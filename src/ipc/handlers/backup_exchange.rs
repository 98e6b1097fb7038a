use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::repo::Repository;
use crate::store::SqliteStore;
use serde_json::json;
use std::path::PathBuf;

/// Bundle methods accept an explicit `workspacePath` and otherwise operate on
/// the selected workspace.
fn target_workspace(state: &AppState, req: &Request) -> Result<PathBuf, serde_json::Value> {
    if let Some(path) = optional_str(req, "workspacePath") {
        return Ok(PathBuf::from(path));
    }
    state
        .workspace
        .clone()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

fn handle_export_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match required_str(req, "outPath").map(PathBuf::from) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let workspace = match target_workspace(state, req) {
        Ok(w) => w,
        Err(resp) => return resp,
    };
    match backup::export_workspace_bundle(&workspace, &out_path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "outPath": out_path.to_string_lossy(),
                "bundleFormat": summary.bundle_format,
                "entryCount": summary.entry_count,
            }),
        ),
        Err(e) => err(&req.id, "backup_failed", format!("{e:#}"), None),
    }
}

/// Replace a workspace's contents with a bundle. When the target is the
/// selected workspace, the open store is dropped before the swap (the
/// database file is renamed over) and reopened afterwards so subsequent
/// requests see the imported data.
fn handle_import_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let in_path = match required_str(req, "inPath").map(PathBuf::from) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let workspace = match target_workspace(state, req) {
        Ok(w) => w,
        Err(resp) => return resp,
    };
    let replacing_open_store = state.workspace.as_deref() == Some(workspace.as_path());

    if replacing_open_store {
        state.repo = None;
    }
    let summary = match backup::import_workspace_bundle(&in_path, &workspace) {
        Ok(s) => s,
        Err(e) => {
            // The old database is intact on a failed import; reopen it.
            if replacing_open_store {
                reopen(state, &workspace);
            }
            return err(&req.id, "backup_failed", format!("{e:#}"), None);
        }
    };
    if replacing_open_store && !reopen(state, &workspace) {
        return err(
            &req.id,
            "store_open_failed",
            "imported database could not be opened",
            None,
        );
    }
    ok(
        &req.id,
        json!({
            "bundleFormat": summary.bundle_format_detected,
            "assetsRestored": summary.assets_restored,
        }),
    )
}

fn reopen(state: &mut AppState, workspace: &std::path::Path) -> bool {
    match SqliteStore::open(workspace) {
        Ok(store) => {
            let mut repo = Repository::new(Box::new(store));
            repo.initialize();
            state.repo = Some(repo);
            true
        }
        Err(e) => {
            eprintln!("quizd: failed to reopen workspace store: {e:?}");
            false
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspaceBundle" => Some(handle_export_bundle(state, req)),
        "backup.importWorkspaceBundle" => Some(handle_import_bundle(state, req)),
        _ => None,
    }
}
