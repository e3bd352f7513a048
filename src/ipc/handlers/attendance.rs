use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::helpers::{
    opt_status, opt_str, require_date, require_id_array, require_roster, require_status,
    require_str,
};
use crate::ipc::types::{AppState, Request};
use crate::ledger;
use crate::model::{AttendanceStatus, Ledger, RosterKind, RosterMember};
use crate::repo::Repository;
use chrono::NaiveDate;
use serde_json::json;

fn row_json<M: RosterMember>(
    target: &Ledger,
    date: NaiveDate,
    member: &M,
) -> serde_json::Value {
    let status = ledger::resolve_status(target, date, member.id(), AttendanceStatus::Absent);
    json!({
        "personId": member.id(),
        "name": member.name(),
        "detail": member.detail(),
        "status": status,
    })
}

/// Marking view: one row per roster member with the resolved status for the
/// day, plus the whole-roster summary.
fn day_sheet(
    repo: &Repository,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let kind = require_roster(params)?;
    let date = require_date(params, "date")?;
    let target = repo.ledger(kind);

    let rows: Vec<serde_json::Value> = match kind {
        RosterKind::Students => repo
            .students()
            .iter()
            .map(|s| row_json(target, date, s))
            .collect(),
        RosterKind::Teachers => repo
            .teachers()
            .iter()
            .map(|t| row_json(target, date, t))
            .collect(),
    };

    let ids = repo.roster_ids(kind);
    let summary = ledger::daily_summary(
        target,
        date,
        ids.iter().map(String::as_str),
        AttendanceStatus::Absent,
    );
    Ok(json!({ "date": date, "rows": rows, "summary": summary }))
}

fn daily_summary(
    repo: &Repository,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let kind = require_roster(params)?;
    let date = require_date(params, "date")?;
    let default = opt_status(params, "defaultStatus")?.unwrap_or(AttendanceStatus::Absent);
    let ids = repo.roster_ids(kind);
    let summary = ledger::daily_summary(repo.ledger(kind), date, ids.iter().map(String::as_str), default);
    Ok(json!({ "date": date, "defaultStatus": default, "summary": summary }))
}

fn toggle(
    repo: &mut Repository,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let kind = require_roster(params)?;
    let date = require_date(params, "date")?;
    let person_id = require_str(params, "personId")?;
    let status = require_status(params, "status")?;
    let updated = repo.toggle(kind, date, &person_id, status)?;
    Ok(json!({ "updated": updated }))
}

fn bulk_mark(
    repo: &mut Repository,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let kind = require_roster(params)?;
    let date = require_date(params, "date")?;
    let person_ids = require_id_array(params, "personIds")?;
    let status = require_status(params, "status")?;
    let marked = repo.bulk_mark(kind, date, &person_ids, status)?;
    Ok(json!({ "marked": marked }))
}

fn mark_all(
    repo: &mut Repository,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let kind = require_roster(params)?;
    let date = require_date(params, "date")?;
    let status = require_status(params, "status")?;
    let marked = repo.mark_all(kind, date, status)?;
    Ok(json!({ "marked": marked }))
}

fn range_query(
    repo: &Repository,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let kind = require_roster(params)?;
    let from = require_date(params, "fromDate")?;
    let to = require_date(params, "toDate")?;
    let person_id = opt_str(params, "personId");
    let records = ledger::range_query(repo.ledger(kind), from, to, person_id.as_deref());
    let summary = ledger::summarize_records(records.iter());
    Ok(json!({ "records": records, "summary": summary }))
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
        "attendance.daySheet" => Some(with_repo(state, req, |r, p| day_sheet(r, p))),
        "attendance.dailySummary" => Some(with_repo(state, req, |r, p| daily_summary(r, p))),
        "attendance.toggle" => Some(with_repo(state, req, toggle)),
        "attendance.bulkMark" => Some(with_repo(state, req, bulk_mark)),
        "attendance.markAll" => Some(with_repo(state, req, mark_all)),
        "attendance.rangeQuery" => Some(with_repo(state, req, |r, p| range_query(r, p))),
        _ => None,
    }
}
