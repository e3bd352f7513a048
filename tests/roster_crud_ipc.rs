use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

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
    let exe = env!("CARGO_BIN_EXE_edutrackd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn edutrackd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn raw_request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({ "id": id, "method": method, "params": params });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
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
    let value = raw_request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = raw_request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "expected {} to fail: {}",
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

fn create_student(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    name: &str,
    email: &str,
    semester: &str,
) -> String {
    let result = request_ok(
        stdin,
        reader,
        id,
        "students.create",
        json!({
            "name": name,
            "email": email,
            "password": "password123",
            "semester": semester
        }),
    );
    result
        .get("studentId")
        .and_then(|v| v.as_str())
        .expect("studentId")
        .to_string()
}

#[test]
fn students_crud_flow_with_validation_and_duplicates() {
    let workspace = temp_dir("edutrack-students-crud");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let alice = create_student(
        &mut stdin,
        &mut reader,
        "2",
        "Alice Jones",
        "alice@example.com",
        "3",
    );
    let _bob = create_student(
        &mut stdin,
        &mut reader,
        "3",
        "Bob Stone",
        "bob@example.com",
        "5",
    );

    // Duplicate email is rejected.
    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "students.create",
        json!({
            "name": "Alice Clone",
            "email": "alice@example.com",
            "password": "password123",
            "semester": "4"
        }),
    );
    assert_eq!(code, "duplicate_email");

    // Field validation mirrors the roster form rules.
    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "students.create",
        json!({
            "name": "No Email",
            "email": "not-an-email",
            "password": "password123",
            "semester": "1"
        }),
    );
    assert_eq!(code, "validation_failed");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "students.create",
        json!({
            "name": "Short Password",
            "email": "short@example.com",
            "password": "abc",
            "semester": "1"
        }),
    );
    assert_eq!(code, "validation_failed");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "7",
        "students.create",
        json!({
            "name": "No Semester",
            "email": "nosem@example.com",
            "password": "password123"
        }),
    );
    assert_eq!(code, "validation_failed");

    // List never exposes the stored credential hash.
    let listed = request_ok(&mut stdin, &mut reader, "8", "students.list", json!({}));
    let students = listed
        .get("students")
        .and_then(|v| v.as_array())
        .cloned()
        .expect("students array");
    assert_eq!(students.len(), 2);
    assert!(students.iter().all(|s| s.get("passwordHash").is_none()));
    assert!(students.iter().all(|s| s.get("password").is_none()));

    // Search and semester filters.
    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "students.list",
        json!({ "search": "alice" }),
    );
    assert_eq!(
        listed.get("students").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(1)
    );
    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "students.list",
        json!({ "semester": "5" }),
    );
    let only = listed
        .get("students")
        .and_then(|v| v.as_array())
        .cloned()
        .expect("students array");
    assert_eq!(only.len(), 1);
    assert_eq!(
        only[0].get("name").and_then(|v| v.as_str()),
        Some("Bob Stone")
    );

    // Patch update; unknown id is a no-op, not an error.
    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "students.update",
        json!({
            "studentId": &alice,
            "patch": { "name": "Alice Updated", "phone": "555-000-1111" }
        }),
    );
    assert_eq!(updated.get("updated").and_then(|v| v.as_bool()), Some(true));
    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "students.update",
        json!({ "studentId": "missing-id", "patch": { "name": "Nobody" } }),
    );
    assert_eq!(updated.get("updated").and_then(|v| v.as_bool()), Some(false));

    // Updating onto another student's email breaks uniqueness and is rejected.
    let code = request_err(
        &mut stdin,
        &mut reader,
        "13",
        "students.update",
        json!({ "studentId": &alice, "patch": { "email": "bob@example.com" } }),
    );
    assert_eq!(code, "duplicate_email");

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "14",
        "students.list",
        json!({ "search": "Alice Updated" }),
    );
    let found = listed
        .get("students")
        .and_then(|v| v.as_array())
        .cloned()
        .expect("students array");
    assert_eq!(found.len(), 1);
    assert_eq!(
        found[0].get("phone").and_then(|v| v.as_str()),
        Some("555-000-1111")
    );

    // Delete, then delete again: second call is a no-op.
    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "15",
        "students.delete",
        json!({ "studentId": &alice }),
    );
    assert_eq!(deleted.get("deleted").and_then(|v| v.as_bool()), Some(true));
    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "16",
        "students.delete",
        json!({ "studentId": &alice }),
    );
    assert_eq!(deleted.get("deleted").and_then(|v| v.as_bool()), Some(false));

    let listed = request_ok(&mut stdin, &mut reader, "17", "students.list", json!({}));
    assert_eq!(
        listed.get("students").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(1)
    );

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn teachers_crud_flow() {
    let workspace = temp_dir("edutrack-teachers-crud");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let wilson = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "teachers.create",
        json!({
            "name": "Dr. James Wilson",
            "email": "james.wilson@example.com",
            "password": "password123",
            "subject": "Mathematics",
            "experienceYears": 12,
            "qualification": "Ph.D. in Mathematics"
        }),
    );
    let wilson_id = wilson
        .get("teacherId")
        .and_then(|v| v.as_str())
        .expect("teacherId")
        .to_string();

    // Defaults apply when optional fields are omitted.
    let chen = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "teachers.create",
        json!({
            "name": "Prof. Emily Chen",
            "email": "emily.chen@example.com",
            "password": "password123",
            "subject": "Physics"
        }),
    );
    let chen_teacher = chen.get("teacher").cloned().expect("teacher");
    assert_eq!(
        chen_teacher.get("experienceYears").and_then(|v| v.as_i64()),
        Some(0)
    );
    assert_eq!(
        chen_teacher.get("qualification").and_then(|v| v.as_str()),
        Some("Not specified")
    );

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "teachers.create",
        json!({
            "name": "Wilson Clone",
            "email": "james.wilson@example.com",
            "password": "password123",
            "subject": "Physics"
        }),
    );
    assert_eq!(code, "duplicate_email");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "teachers.create",
        json!({
            "name": "No Subject",
            "email": "nosubject@example.com",
            "password": "password123"
        }),
    );
    assert_eq!(code, "validation_failed");

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "teachers.list",
        json!({ "subject": "Mathematics" }),
    );
    let math = listed
        .get("teachers")
        .and_then(|v| v.as_array())
        .cloned()
        .expect("teachers array");
    assert_eq!(math.len(), 1);
    assert_eq!(
        math[0].get("name").and_then(|v| v.as_str()),
        Some("Dr. James Wilson")
    );

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "teachers.update",
        json!({
            "teacherId": &wilson_id,
            "patch": { "subject": "Statistics", "experienceYears": 13 }
        }),
    );
    assert_eq!(updated.get("updated").and_then(|v| v.as_bool()), Some(true));

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "teachers.list",
        json!({ "search": "wilson" }),
    );
    let found = listed
        .get("teachers")
        .and_then(|v| v.as_array())
        .cloned()
        .expect("teachers array");
    assert_eq!(found[0].get("subject").and_then(|v| v.as_str()), Some("Statistics"));
    assert_eq!(
        found[0].get("experienceYears").and_then(|v| v.as_i64()),
        Some(13)
    );

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "teachers.delete",
        json!({ "teacherId": &wilson_id }),
    );
    assert_eq!(deleted.get("deleted").and_then(|v| v.as_bool()), Some(true));
    let listed = request_ok(&mut stdin, &mut reader, "10", "teachers.list", json!({}));
    assert_eq!(
        listed.get("teachers").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(1)
    );

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn deleting_a_student_purges_their_attendance() {
    let workspace = temp_dir("edutrack-delete-purge");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let alice = create_student(
        &mut stdin,
        &mut reader,
        "2",
        "Alice Jones",
        "alice@example.com",
        "3",
    );
    let bob = create_student(
        &mut stdin,
        &mut reader,
        "3",
        "Bob Stone",
        "bob@example.com",
        "5",
    );

    for (id, date) in [("4", "2024-01-01"), ("5", "2024-01-02")] {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            id,
            "attendance.bulkMark",
            json!({
                "roster": "students",
                "date": date,
                "personIds": [&alice, &bob],
                "status": "present"
            }),
        );
    }

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "students.delete",
        json!({ "studentId": &alice }),
    );
    assert_eq!(deleted.get("deleted").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(
        deleted.get("attendancePurged").and_then(|v| v.as_u64()),
        Some(2)
    );

    let range = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "attendance.rangeQuery",
        json!({
            "roster": "students",
            "fromDate": "2024-01-01",
            "toDate": "2024-01-02"
        }),
    );
    let records = range
        .get("records")
        .and_then(|v| v.as_array())
        .cloned()
        .expect("records");
    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .all(|r| r.get("personId").and_then(|v| v.as_str()) == Some(bob.as_str())));

    let _ = std::fs::remove_dir_all(workspace);
}
