use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::helpers::opt_date;
use crate::ipc::types::{AppState, Request};
use crate::repo::Repository;
use chrono::Utc;
use serde_json::json;

/// Running aggregates for the dashboard header. `date` defaults to today
/// (UTC), matching how the front-end stamps attendance days.
fn stats(repo: &Repository, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let date = opt_date(params, "date")?.unwrap_or_else(|| Utc::now().date_naive());
    let stats = repo.dashboard_stats(date);
    Ok(json!({ "date": date, "stats": stats }))
}

fn handle_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(repo) = state.repo.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match stats(repo, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.stats" => Some(handle_stats(state, req)),
        _ => None,
    }
}
