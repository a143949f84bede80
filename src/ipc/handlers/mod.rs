pub mod core;
pub mod sheets;
pub mod students;
pub mod teachers;

use crate::ipc::error::err;
use crate::store::RecordStore;
use serde_json::json;

/// Attaches the warning from a failed write-through to an otherwise
/// successful response. The in-memory mutation stands either way.
pub fn with_persist_warning(
    store: &mut RecordStore,
    mut resp: serde_json::Value,
) -> serde_json::Value {
    if let Some(warning) = store.take_persist_warning() {
        resp["persistWarning"] = json!(warning);
    }
    resp
}

pub fn bad_params(id: &str, message: impl Into<String>) -> serde_json::Value {
    err(id, "bad_params", message, None)
}

pub fn no_workspace(id: &str) -> serde_json::Value {
    err(id, "no_workspace", "select a workspace first", None)
}
