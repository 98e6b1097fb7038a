use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, repo_mut, repo_ref, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{derive_category_id, Category};
use serde_json::json;

fn handle_categories_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let repo = match repo_ref(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match serde_json::to_value(repo.categories()) {
        Ok(categories) => ok(&req.id, json!({ "categories": categories })),
        Err(e) => err(&req.id, "serialize_failed", e.to_string(), None),
    }
}

fn handle_categories_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = match required_str(req, "name") {
        Ok(v) => v.trim().to_string(),
        Err(resp) => return resp,
    };
    if name.is_empty() {
        return err(&req.id, "bad_params", "name must not be empty", None);
    }
    let description = optional_str(req, "description").unwrap_or_default();

    let category = Category {
        id: derive_category_id(&name),
        name,
        description,
        question_count: 0,
    };

    let repo = match repo_mut(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match repo.add_category(category.clone()) {
        Ok(persisted) => ok(
            &req.id,
            json!({ "categoryId": category.id, "persisted": persisted }),
        ),
        Err(message) => err(
            &req.id,
            "category_exists",
            message,
            Some(json!({ "categoryId": category.id })),
        ),
    }
}

fn handle_categories_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let category_id = match required_str(req, "categoryId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let name = optional_str(req, "name");
    let description = optional_str(req, "description");
    if let Some(n) = &name {
        if n.trim().is_empty() {
            return err(&req.id, "bad_params", "name must not be empty", None);
        }
    }

    let repo = match repo_mut(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let Some(mut category) = repo.category_by_id(&category_id) else {
        return err(&req.id, "not_found", "category not found", None);
    };
    // The id stays derived from the original name; renames do not re-slug.
    if let Some(n) = name {
        category.name = n.trim().to_string();
    }
    if let Some(d) = description {
        category.description = d;
    }
    match repo.update_category(category) {
        Some(persisted) => ok(&req.id, json!({ "persisted": persisted })),
        None => err(&req.id, "not_found", "category not found", None),
    }
}

/// Cascades: every loose question in the category is deleted with it. The
/// caller confirms with the user before calling.
fn handle_categories_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let category_id = match required_str(req, "categoryId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let repo = match repo_mut(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let removed_questions = repo.questions_by_category(&category_id).len();
    match repo.delete_category(&category_id) {
        Some(persisted) => ok(
            &req.id,
            json!({ "persisted": persisted, "questionsRemoved": removed_questions }),
        ),
        None => err(&req.id, "not_found", "category not found", None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "categories.list" => Some(handle_categories_list(state, req)),
        "categories.create" => Some(handle_categories_create(state, req)),
        "categories.update" => Some(handle_categories_update(state, req)),
        "categories.delete" => Some(handle_categories_delete(state, req)),
        _ => None,
    }
}
