use crate::ipc::error::{err, ok};
use crate::ipc::handlers::{bad_params, no_workspace, with_persist_warning};
use crate::ipc::types::{AppState, Request};
use crate::model::Kind;
use crate::sheet;
use serde_json::json;
use std::path::{Path, PathBuf};

fn required_path(req: &Request, key: &str) -> Result<PathBuf, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
        .ok_or_else(|| bad_params(&req.id, format!("missing params.{}", key)))
}

fn read_sheet_bytes(req: &Request, path: &Path) -> Result<Vec<u8>, serde_json::Value> {
    std::fs::read(path).map_err(|e| {
        err(
            &req.id,
            "io_failed",
            format!("failed to read {}: {}", path.to_string_lossy(), e),
            None,
        )
    })
}

fn handle_import_students(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return no_workspace(&req.id);
    };
    let path = match required_path(req, "path") {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let bytes = match read_sheet_bytes(req, &path) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let drafts = match sheet::parse_student_sheet(&bytes) {
        Ok(d) => d,
        Err(e) => return err(&req.id, "parse_error", format!("{e:#}"), None),
    };
    // File decoded fine but carried no rows: the content, not the format,
    // is at fault, so report it under a distinct code.
    if drafts.is_empty() {
        return err(
            &req.id,
            "empty_sheet",
            "no student rows found beyond the header",
            None,
        );
    }

    let records = store.add_students(drafts);
    let imported = records.len();
    let resp = ok(
        &req.id,
        json!({ "students": records, "importedCount": imported }),
    );
    with_persist_warning(store, resp)
}

fn handle_import_teachers(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return no_workspace(&req.id);
    };
    let path = match required_path(req, "path") {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let bytes = match read_sheet_bytes(req, &path) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let drafts = match sheet::parse_teacher_sheet(&bytes) {
        Ok(d) => d,
        Err(e) => return err(&req.id, "parse_error", format!("{e:#}"), None),
    };
    if drafts.is_empty() {
        return err(
            &req.id,
            "empty_sheet",
            "no teacher rows found beyond the header",
            None,
        );
    }

    let records = store.add_teachers(drafts);
    let imported = records.len();
    let resp = ok(
        &req.id,
        json!({ "teachers": records, "importedCount": imported }),
    );
    with_persist_warning(store, resp)
}

fn handle_template(req: &Request, kind: Kind) -> serde_json::Value {
    let out_path = match required_path(req, "outPath") {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    match sheet::write_template(kind, &out_path) {
        Ok(()) => ok(&req.id, json!({ "path": out_path.to_string_lossy() })),
        Err(e) => err(&req.id, "io_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.importSheet" => Some(handle_import_students(state, req)),
        "teachers.importSheet" => Some(handle_import_teachers(state, req)),
        "students.template" => Some(handle_template(req, Kind::Student)),
        "teachers.template" => Some(handle_template(req, Kind::Teacher)),
        _ => None,
    }
}
