mod db;
mod ipc;
mod model;
mod sheet;
mod store;

use std::io::{self, BufRead, Write};

use serde_json::json;

fn respond(stdout: &mut io::Stdout, resp: &serde_json::Value) {
    let line = serde_json::to_string(resp).unwrap_or_else(|_| "{\"ok\":false}".to_string());
    let _ = writeln!(stdout, "{}", line);
    let _ = stdout.flush();
}

fn main() {
    // One request line in, one response line out, on the invoking thread.
    // There is exactly one writer (the user's session), so no locking.
    let mut state = ipc::AppState {
        workspace: None,
        store: None,
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => {
                let resp = ipc::handle_request(&mut state, req);
                respond(&mut stdout, &resp);
            }
            Err(e) => {
                // No parsed id to address, but the reply must still be one
                // well-formed JSON line regardless of what the message holds.
                let resp = json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                respond(&mut stdout, &resp);
            }
        }
    }
}
