use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::helpers::{opt_str, require_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{RosterMember, Student, Teacher};
use crate::password;
use crate::repo::{NewStudent, NewTeacher, Repository, StudentPatch, TeacherPatch};
use serde_json::json;

/// Structural check only; real deliverability is the front-end's problem.
fn is_valid_email(email: &str) -> bool {
    if email.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.len() >= 2,
        None => false,
    }
}

/// Shared create-form validation: name, email shape, password length. The
/// plaintext password never leaves this module unhashed.
fn validate_credentials(
    params: &serde_json::Value,
) -> Result<(String, String, String), HandlerErr> {
    let name = opt_str(params, "name")
        .ok_or_else(|| HandlerErr::validation("name", "Name is required"))?;
    let email = opt_str(params, "email")
        .ok_or_else(|| HandlerErr::validation("email", "Email is required"))?;
    if !is_valid_email(&email) {
        return Err(HandlerErr::validation(
            "email",
            "Please enter a valid email address",
        ));
    }
    let password = params
        .get("password")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if password.is_empty() {
        return Err(HandlerErr::validation("password", "Password is required"));
    }
    if password.chars().count() < 6 {
        return Err(HandlerErr::validation(
            "password",
            "Password must be at least 6 characters",
        ));
    }
    Ok((name, email, password.to_string()))
}

fn parse_experience_years(params: &serde_json::Value) -> Result<Option<i64>, HandlerErr> {
    match params.get("experienceYears") {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params("experienceYears must be a number")),
    }
}

fn matches_search<M: RosterMember>(member: &M, term: &str) -> bool {
    let t = term.to_lowercase();
    member.name().to_lowercase().contains(&t)
        || member.email().to_lowercase().contains(&t)
        || member.detail().to_lowercase().contains(&t)
}

/// Wire shape for roster rows; the password hash stays server-side.
fn student_json(s: &Student) -> serde_json::Value {
    json!({
        "id": s.id,
        "name": s.name,
        "email": s.email,
        "semester": s.semester,
        "phone": s.phone,
        "address": s.address,
        "dateAdded": s.date_added,
    })
}

fn teacher_json(t: &Teacher) -> serde_json::Value {
    json!({
        "id": t.id,
        "name": t.name,
        "email": t.email,
        "subject": t.subject,
        "experienceYears": t.experience_years,
        "qualification": t.qualification,
        "dateAdded": t.date_added,
    })
}

// ---- students ----

fn list_students(
    repo: &Repository,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let search = opt_str(params, "search");
    let semester = opt_str(params, "semester");
    let students: Vec<serde_json::Value> = repo
        .students()
        .iter()
        .filter(|s| search.as_deref().map(|t| matches_search(*s, t)).unwrap_or(true))
        .filter(|s| semester.as_deref().map(|f| s.semester == f).unwrap_or(true))
        .map(student_json)
        .collect();
    Ok(json!({ "students": students }))
}

fn create_student(
    repo: &mut Repository,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let (name, email, password) = validate_credentials(params)?;
    let semester = opt_str(params, "semester")
        .ok_or_else(|| HandlerErr::validation("semester", "Please select a semester"))?;
    let password_hash = password::hash_password(&password)
        .map_err(|e| HandlerErr::new("internal_error", e.to_string()))?;

    let created = repo.create_student(NewStudent {
        name,
        email,
        password_hash,
        semester,
        phone: opt_str(params, "phone"),
        address: opt_str(params, "address"),
    })?;
    Ok(json!({ "studentId": created.id.clone(), "student": student_json(&created) }))
}

fn update_student(
    repo: &mut Repository,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = require_str(params, "studentId")?;
    let patch_params = params.get("patch").cloned().unwrap_or_else(|| json!({}));

    let mut patch = StudentPatch::default();
    patch.name = opt_str(&patch_params, "name");
    if let Some(email) = opt_str(&patch_params, "email") {
        if !is_valid_email(&email) {
            return Err(HandlerErr::validation(
                "email",
                "Please enter a valid email address",
            ));
        }
        patch.email = Some(email);
    }
    patch.semester = opt_str(&patch_params, "semester");
    if patch_params.get("phone").is_some() {
        patch.phone = Some(opt_str(&patch_params, "phone"));
    }
    if patch_params.get("address").is_some() {
        patch.address = Some(opt_str(&patch_params, "address"));
    }

    let updated = repo.update_student(&student_id, patch)?;
    Ok(json!({ "updated": updated }))
}

fn delete_student(
    repo: &mut Repository,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = require_str(params, "studentId")?;
    match repo.delete_student(&student_id)? {
        Some(purged) => Ok(json!({ "deleted": true, "attendancePurged": purged })),
        None => Ok(json!({ "deleted": false, "attendancePurged": 0 })),
    }
}

// ---- teachers ----

fn list_teachers(
    repo: &Repository,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let search = opt_str(params, "search");
    let subject = opt_str(params, "subject");
    let teachers: Vec<serde_json::Value> = repo
        .teachers()
        .iter()
        .filter(|t| search.as_deref().map(|s| matches_search(*t, s)).unwrap_or(true))
        .filter(|t| subject.as_deref().map(|f| t.subject == f).unwrap_or(true))
        .map(teacher_json)
        .collect();
    Ok(json!({ "teachers": teachers }))
}

fn create_teacher(
    repo: &mut Repository,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let (name, email, password) = validate_credentials(params)?;
    let subject = opt_str(params, "subject")
        .ok_or_else(|| HandlerErr::validation("subject", "Please select a subject"))?;
    let experience_years = parse_experience_years(params)?.unwrap_or(0);
    let qualification =
        opt_str(params, "qualification").unwrap_or_else(|| "Not specified".to_string());
    let password_hash = password::hash_password(&password)
        .map_err(|e| HandlerErr::new("internal_error", e.to_string()))?;

    let created = repo.create_teacher(NewTeacher {
        name,
        email,
        password_hash,
        subject,
        experience_years,
        qualification,
    })?;
    Ok(json!({ "teacherId": created.id.clone(), "teacher": teacher_json(&created) }))
}

fn update_teacher(
    repo: &mut Repository,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let teacher_id = require_str(params, "teacherId")?;
    let patch_params = params.get("patch").cloned().unwrap_or_else(|| json!({}));

    let mut patch = TeacherPatch::default();
    patch.name = opt_str(&patch_params, "name");
    if let Some(email) = opt_str(&patch_params, "email") {
        if !is_valid_email(&email) {
            return Err(HandlerErr::validation(
                "email",
                "Please enter a valid email address",
            ));
        }
        patch.email = Some(email);
    }
    patch.subject = opt_str(&patch_params, "subject");
    patch.experience_years = parse_experience_years(&patch_params)?;
    patch.qualification = opt_str(&patch_params, "qualification");

    let updated = repo.update_teacher(&teacher_id, patch)?;
    Ok(json!({ "updated": updated }))
}

fn delete_teacher(
    repo: &mut Repository,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let teacher_id = require_str(params, "teacherId")?;
    match repo.delete_teacher(&teacher_id)? {
        Some(purged) => Ok(json!({ "deleted": true, "attendancePurged": purged })),
        None => Ok(json!({ "deleted": false, "attendancePurged": 0 })),
    }
}

fn with_repo(
    state: &mut AppState,
    req: &Request,
    f: impl FnOnce(&mut Repository, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>,
) -> serde_json::Value {
    let Some(repo) = state.repo.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match f(repo, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(with_repo(state, req, |r, p| list_students(r, p))),
        "students.create" => Some(with_repo(state, req, create_student)),
        "students.update" => Some(with_repo(state, req, update_student)),
        "students.delete" => Some(with_repo(state, req, delete_student)),
        "teachers.list" => Some(with_repo(state, req, |r, p| list_teachers(r, p))),
        "teachers.create" => Some(with_repo(state, req, create_teacher)),
        "teachers.update" => Some(with_repo(state, req, update_teacher)),
        "teachers.delete" => Some(with_repo(state, req, delete_teacher)),
        _ => None,
    }
}
