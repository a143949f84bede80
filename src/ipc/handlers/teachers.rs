use crate::ipc::error::ok;
use crate::ipc::handlers::{bad_params, no_workspace, with_persist_warning};
use crate::ipc::types::{AppState, Request};
use crate::model::TeacherDraft;
use serde_json::json;

fn draft_from(params: &serde_json::Value, key: &str) -> Result<TeacherDraft, String> {
    let value = params.get(key).cloned().unwrap_or(serde_json::Value::Null);
    if !value.is_object() {
        return Err(format!("missing params.{}", key));
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let teachers = state.store.as_ref().map(|s| s.teachers()).unwrap_or(&[]);
    ok(&req.id, json!({ "teachers": teachers }))
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return no_workspace(&req.id);
    };
    let draft = match draft_from(&req.params, "teacher") {
        Ok(d) => d,
        Err(msg) => return bad_params(&req.id, msg),
    };
    let record = store.add_teacher(draft);
    with_persist_warning(store, ok(&req.id, json!({ "teacher": record })))
}

fn handle_bulk_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return no_workspace(&req.id);
    };
    let Some(value) = req.params.get("teachers").cloned() else {
        return bad_params(&req.id, "missing params.teachers");
    };
    let drafts: Vec<TeacherDraft> = match serde_json::from_value(value) {
        Ok(d) => d,
        Err(e) => return bad_params(&req.id, e.to_string()),
    };
    let records = store.add_teachers(drafts);
    let created = records.len();
    let resp = ok(
        &req.id,
        json!({ "teachers": records, "createdCount": created }),
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
    let draft = match draft_from(&req.params, "teacher") {
        Ok(d) => d,
        Err(msg) => return bad_params(&req.id, msg),
    };
    let updated = store.update_teacher(id, draft);
    with_persist_warning(store, ok(&req.id, json!({ "updated": updated })))
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return no_workspace(&req.id);
    };
    let Some(id) = req.params.get("id").and_then(|v| v.as_str()) else {
        return bad_params(&req.id, "missing params.id");
    };
    let deleted = store.delete_teacher(id);
    with_persist_warning(store, ok(&req.id, json!({ "deleted": deleted })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "teachers.list" => Some(handle_list(state, req)),
        "teachers.create" => Some(handle_create(state, req)),
        "teachers.bulkCreate" => Some(handle_bulk_create(state, req)),
        "teachers.update" => Some(handle_update(state, req)),
        "teachers.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
