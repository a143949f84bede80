use serde_json::json;
use std::collections::HashSet;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn fixture_path(rel: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(rel)
}

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_idcardd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn idcardd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn request_err_code(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .expect("error code")
        .to_string()
}

#[test]
fn student_roster_import_maps_columns_and_dates() {
    let workspace = temp_dir("idcardd-import-students");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let roster = fixture_path("fixtures/import/students_roster.xlsx");
    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.importSheet",
        json!({ "path": roster.to_string_lossy() }),
    );
    assert_eq!(imported.get("importedCount"), Some(&json!(3)));
    let students = imported
        .get("students")
        .and_then(|v| v.as_array())
        .cloned()
        .expect("students array");

    let asha = &students[0];
    assert_eq!(asha.get("name"), Some(&json!("Asha Verma")));
    assert_eq!(asha.get("class"), Some(&json!("X-A")));
    assert_eq!(asha.get("rollNo"), Some(&json!("12")));
    assert_eq!(asha.get("fatherName"), Some(&json!("Rakesh Verma")));
    // ISO date reformatted to the card's fixed format.
    assert_eq!(asha.get("dob"), Some(&json!("19-04-2011")));
    assert_eq!(asha.get("apaarId"), Some(&json!("APR-9913")));
    assert_eq!(
        asha.get("photoURL"),
        Some(&json!("https://img.example/asha.jpg"))
    );
    // The roster's extra "House" column is not a recognized field.
    assert!(asha.get("House").is_none());

    let ravi = &students[1];
    // Already DD-MM-YYYY: kept verbatim.
    assert_eq!(ravi.get("dob"), Some(&json!("19-04-2011")));
    assert_eq!(ravi.get("phone"), Some(&json!("")));

    let meena = &students[2];
    // Uninterpretable date becomes empty rather than failing the import.
    assert_eq!(meena.get("dob"), Some(&json!("")));
    assert_eq!(meena.get("phone"), Some(&json!("9876500044")));
    assert_eq!(meena.get("admissionNo"), Some(&json!("")));

    // Importing the same file again appends the same fields under new ids.
    let again = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.importSheet",
        json!({ "path": roster.to_string_lossy() }),
    );
    assert_eq!(again.get("importedCount"), Some(&json!(3)));
    let listed = request_ok(&mut stdin, &mut reader, "4", "students.list", json!({}));
    let all = listed.get("students").and_then(|v| v.as_array()).cloned().unwrap();
    assert_eq!(all.len(), 6);
    let ids: HashSet<&str> = all
        .iter()
        .map(|s| s.get("id").and_then(|v| v.as_str()).expect("id"))
        .collect();
    assert_eq!(ids.len(), 6);
    for (first, second) in all[..3].iter().zip(&all[3..]) {
        let mut a = first.clone();
        let mut b = second.clone();
        a.as_object_mut().unwrap().remove("id");
        b.as_object_mut().unwrap().remove("id");
        assert_eq!(a, b, "re-import must be field-for-field identical");
    }
}

#[test]
fn teacher_roster_import_normalizes_both_date_columns() {
    let workspace = temp_dir("idcardd-import-teachers");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let roster = fixture_path("fixtures/import/teachers_roster.xlsx");
    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "teachers.importSheet",
        json!({ "path": roster.to_string_lossy() }),
    );
    assert_eq!(imported.get("importedCount"), Some(&json!(2)));
    let teachers = imported
        .get("teachers")
        .and_then(|v| v.as_array())
        .cloned()
        .expect("teachers array");

    let iyer = &teachers[0];
    assert_eq!(iyer.get("name"), Some(&json!("S. Iyer")));
    assert_eq!(iyer.get("designation"), Some(&json!("PGT")));
    assert_eq!(iyer.get("doj"), Some(&json!("12-06-2019")));
    assert_eq!(iyer.get("dob"), Some(&json!("30-11-1985")));
    assert_eq!(iyer.get("teacherId"), Some(&json!("T-88")));
    // Not a sheet column; always starts empty.
    assert_eq!(iyer.get("principalSignURL"), Some(&json!("")));

    let das = &teachers[1];
    assert_eq!(das.get("doj"), Some(&json!("01-04-2021")));
    assert_eq!(das.get("dob"), Some(&json!("")));
}

#[test]
fn import_failure_modes_are_distinct() {
    let workspace = temp_dir("idcardd-import-errors");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let roster = fixture_path("fixtures/import/students_roster.xlsx");
    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "1",
        "students.importSheet",
        json!({ "path": roster.to_string_lossy() }),
    );
    assert_eq!(code, "no_workspace");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    // Readable workbook with no data rows: content problem, not format.
    let header_only = fixture_path("fixtures/import/header_only.xlsx");
    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "3",
        "students.importSheet",
        json!({ "path": header_only.to_string_lossy() }),
    );
    assert_eq!(code, "empty_sheet");

    // Not decodable as a workbook at all.
    let corrupt = fixture_path("fixtures/import/not_a_workbook.xlsx");
    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "4",
        "students.importSheet",
        json!({ "path": corrupt.to_string_lossy() }),
    );
    assert_eq!(code, "parse_error");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "5",
        "students.importSheet",
        json!({ "path": workspace.join("missing.xlsx").to_string_lossy() }),
    );
    assert_eq!(code, "io_failed");

    // Nothing was imported along the way.
    let listed = request_ok(&mut stdin, &mut reader, "6", "students.list", json!({}));
    assert_eq!(listed.get("students"), Some(&json!([])));
}

#[test]
fn exported_template_round_trips_through_import() {
    let workspace = temp_dir("idcardd-template");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let out_path = workspace.join("student_template.xlsx");
    let written = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.template",
        json!({ "outPath": out_path.to_string_lossy() }),
    );
    assert_eq!(
        written.get("path"),
        Some(&json!(out_path.to_string_lossy()))
    );
    assert!(out_path.is_file());

    // The blank template decodes fine and carries only the header row.
    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "3",
        "students.importSheet",
        json!({ "path": out_path.to_string_lossy() }),
    );
    assert_eq!(code, "empty_sheet");

    let teacher_out = workspace.join("teacher_template.xlsx");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "teachers.template",
        json!({ "outPath": teacher_out.to_string_lossy() }),
    );
    assert!(teacher_out.is_file());
}
