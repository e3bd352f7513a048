//! Shared request-parameter extraction for the handler modules.

use crate::ipc::error::HandlerErr;
use crate::model::{AttendanceStatus, RosterKind};
use chrono::NaiveDate;

pub fn require_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// Trimmed optional string; absent, null, or blank all read as `None`.
pub fn opt_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn parse_date(key: &str, raw: &str) -> Result<NaiveDate, HandlerErr> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| HandlerErr::bad_params(format!("{} must be an ISO date (YYYY-MM-DD)", key)))
}

pub fn require_date(params: &serde_json::Value, key: &str) -> Result<NaiveDate, HandlerErr> {
    let raw = require_str(params, key)?;
    parse_date(key, &raw)
}

pub fn opt_date(params: &serde_json::Value, key: &str) -> Result<Option<NaiveDate>, HandlerErr> {
    match opt_str(params, key) {
        Some(raw) => parse_date(key, &raw).map(Some),
        None => Ok(None),
    }
}

pub fn require_status(
    params: &serde_json::Value,
    key: &str,
) -> Result<AttendanceStatus, HandlerErr> {
    let raw = require_str(params, key)?;
    AttendanceStatus::parse(&raw)
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be present or absent", key)))
}

pub fn opt_status(
    params: &serde_json::Value,
    key: &str,
) -> Result<Option<AttendanceStatus>, HandlerErr> {
    match opt_str(params, key) {
        Some(raw) => AttendanceStatus::parse(&raw)
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be present or absent", key))),
        None => Ok(None),
    }
}

pub fn require_roster(params: &serde_json::Value) -> Result<RosterKind, HandlerErr> {
    let raw = require_str(params, "roster")?;
    RosterKind::parse(&raw)
        .ok_or_else(|| HandlerErr::bad_params("roster must be students or teachers"))
}

pub fn require_id_array(params: &serde_json::Value, key: &str) -> Result<Vec<String>, HandlerErr> {
    let Some(raw) = params.get(key).and_then(|v| v.as_array()) else {
        return Err(HandlerErr::bad_params(format!("missing {}", key)));
    };
    Ok(raw
        .iter()
        .filter_map(|v| v.as_str().map(|s| s.to_string()))
        .collect())
}
