use crate::ipc::error::{err, ok};
use crate::ipc::handlers::bad_params;
use crate::ipc::types::{AppState, Request};
use crate::store::RecordStore;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (student_count, teacher_count) = state
        .store
        .as_ref()
        .map(|s| s.counts())
        .unwrap_or((0, 0));
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "studentCount": student_count,
            "teacherCount": teacher_count,
            "totalCount": student_count + teacher_count,
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return bad_params(&req.id, "missing params.path");
    };

    match RecordStore::open(&path) {
        Ok(store) => {
            let (student_count, teacher_count) = store.counts();
            state.workspace = Some(path.clone());
            state.store = Some(store);
            ok(
                &req.id,
                json!({
                    "workspacePath": path.to_string_lossy(),
                    "studentCount": student_count,
                    "teacherCount": teacher_count,
                }),
            )
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
