use crate::assets;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::{Path, PathBuf};

fn workspace<'a>(state: &'a AppState, req: &Request) -> Result<&'a Path, serde_json::Value> {
    state
        .workspace
        .as_deref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

fn handle_assets_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let source = match required_str(req, "path").map(PathBuf::from) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let ws = match workspace(state, req) {
        Ok(w) => w,
        Err(resp) => return resp,
    };
    match assets::import_asset(ws, &source) {
        Ok(asset_ref) => ok(&req.id, json!({ "assetRef": asset_ref })),
        Err(e) => err(&req.id, "asset_io_failed", format!("{e:#}"), None),
    }
}

fn handle_assets_resolve(state: &mut AppState, req: &Request) -> serde_json::Value {
    let asset_ref = match required_str(req, "assetRef") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let ws = match workspace(state, req) {
        Ok(w) => w,
        Err(resp) => return resp,
    };
    match assets::resolve_asset(ws, &asset_ref) {
        Some(path) => ok(&req.id, json!({ "path": path.to_string_lossy() })),
        None => err(&req.id, "not_found", "asset not found", None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assets.import" => Some(handle_assets_import(state, req)),
        "assets.resolve" => Some(handle_assets_resolve(state, req)),
        _ => None,
    }
}
