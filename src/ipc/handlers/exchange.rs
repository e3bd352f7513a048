use crate::backup;
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::helpers::{opt_str, require_date, require_roster, require_str};
use crate::ipc::types::{AppState, Request};
use crate::ledger;
use crate::repo::Repository;
use serde_json::json;
use std::path::{Path, PathBuf};

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn export_attendance_csv(
    repo: &Repository,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let kind = require_roster(params)?;
    let from = require_date(params, "fromDate")?;
    let to = require_date(params, "toDate")?;
    let person_id = opt_str(params, "personId");
    let out_path = require_str(params, "outPath")?;

    let records = ledger::range_query(repo.ledger(kind), from, to, person_id.as_deref());
    let mut csv = String::from("date,person_id,person_name,status\n");
    for rec in &records {
        csv.push_str(&format!(
            "{},{},{},{}\n",
            rec.date,
            csv_quote(&rec.person_id),
            csv_quote(&rec.person_name),
            rec.status.as_str()
        ));
    }

    let out = PathBuf::from(&out_path);
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent).map_err(|e| HandlerErr {
            code: "io_failed",
            message: e.to_string(),
            details: Some(json!({ "path": out_path.clone() })),
        })?;
    }
    std::fs::write(&out, csv).map_err(|e| HandlerErr {
        code: "io_failed",
        message: e.to_string(),
        details: Some(json!({ "path": out_path.clone() })),
    })?;

    Ok(json!({ "rowsExported": records.len(), "path": out_path }))
}

fn handle_export_attendance_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(repo) = state.repo.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match export_attendance_csv(repo, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_export_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let out_path = match opt_str(&req.params, "outPath") {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing outPath", None),
    };

    match backup::export_workspace_bundle(&workspace, Path::new(&out_path)) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "path": out_path,
                "bundleFormat": summary.bundle_format,
                "dbSha256": summary.db_sha256,
            }),
        ),
        Err(e) => err(&req.id, "io_failed", e.to_string(), None),
    }
}

fn handle_import_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let in_path = match opt_str(&req.params, "inPath") {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing inPath", None),
    };

    // Release the open connection before the database file is swapped in.
    state.repo = None;

    match backup::import_workspace_bundle(Path::new(&in_path), &workspace) {
        Ok(import) => match Repository::open(&workspace) {
            Ok(repo) => {
                state.repo = Some(repo);
                ok(
                    &req.id,
                    json!({
                        "workspacePath": workspace.to_string_lossy(),
                        "bundleFormatDetected": import.bundle_format_detected,
                    }),
                )
            }
            Err(e) => err(&req.id, "load_failed", format!("{e:?}"), None),
        },
        Err(e) => {
            // The existing database was never touched; reopen it.
            state.repo = Repository::open(&workspace).ok();
            err(&req.id, "io_failed", e.to_string(), None)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "exchange.exportAttendanceCsv" => Some(handle_export_attendance_csv(state, req)),
        "backup.exportWorkspaceBundle" => Some(handle_export_bundle(state, req)),
        "backup.importWorkspaceBundle" => Some(handle_import_bundle(state, req)),
        _ => None,
    }
}
