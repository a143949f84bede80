use crate::ipc::error::ok;
use crate::ipc::handlers::{bad_params, no_workspace, with_persist_warning};
use crate::ipc::types::{AppState, Request};
use crate::model::StudentDraft;
use serde_json::json;

fn draft_from(params: &serde_json::Value, key: &str) -> Result<StudentDraft, String> {
    let value = params.get(key).cloned().unwrap_or(serde_json::Value::Null);
    if !value.is_object() {
        return Err(format!("missing params.{}", key));
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    // No workspace yet: an empty roster, so the UI can render before setup.
    let students = state.store.as_ref().map(|s| s.students()).unwrap_or(&[]);
    ok(&req.id, json!({ "students": students }))
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return no_workspace(&req.id);
    };
    let draft = match draft_from(&req.params, "student") {
        Ok(d) => d,
        Err(msg) => return bad_params(&req.id, msg),
    };
    let record = store.add_student(draft);
    with_persist_warning(store, ok(&req.id, json!({ "student": record })))
}

fn handle_bulk_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return no_workspace(&req.id);
    };
    let Some(value) = req.params.get("students").cloned() else {
        return bad_params(&req.id, "missing params.students");
    };
    let drafts: Vec<StudentDraft> = match serde_json::from_value(value) {
        Ok(d) => d,
        Err(e) => return bad_params(&req.id, e.to_string()),
    };
    let records = store.add_students(drafts);
    let created = records.len();
    let resp = ok(
        &req.id,
        json!({ "students": records, "createdCount": created }),
    );
    with_persist_warning(store, resp)
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return no_workspace(&req.id);
    };
    let Some(id) = req.params.get("id").and_then(|v| v.as_str()) else {
        return bad_params(&req.id, "missing params.id");
    };
    let draft = match draft_from(&req.params, "student") {
        Ok(d) => d,
        Err(msg) => return bad_params(&req.id, msg),
    };
    // Unknown id is a no-op, not an error.
    let updated = store.update_student(id, draft);
    with_persist_warning(store, ok(&req.id, json!({ "updated": updated })))
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return no_workspace(&req.id);
    };
    let Some(id) = req.params.get("id").and_then(|v| v.as_str()) else {
        return bad_params(&req.id, "missing params.id");
    };
    let deleted = store.delete_student(id);
    with_persist_warning(store, ok(&req.id, json!({ "deleted": deleted })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_list(state, req)),
        "students.create" => Some(handle_create(state, req)),
        "students.bulkCreate" => Some(handle_bulk_create(state, req)),
        "students.update" => Some(handle_update(state, req)),
        "students.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
