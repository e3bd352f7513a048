use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attendance state for one person on one day. Two states, toggled only by
/// explicit request; a missing ledger entry carries no status at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" => Some(AttendanceStatus::Present),
            "absent" => Some(AttendanceStatus::Absent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub person_id: String,
    /// Name captured at write time; renames do not rewrite history.
    pub person_name: String,
    pub status: AttendanceStatus,
    pub date: NaiveDate,
}

/// One day's records, keyed by person id. At most one record per person per
/// day; last write wins.
pub type DayEntries = BTreeMap<String, AttendanceRecord>;

/// Date-indexed attendance store for one roster. BTreeMap keeps both the
/// persisted JSON and range walks in calendar order.
pub type Ledger = BTreeMap<NaiveDate, DayEntries>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub semester: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub date_added: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub subject: String,
    pub experience_years: i64,
    pub qualification: String,
    pub date_added: NaiveDate,
}

/// Which of the two rosters (and matching ledger) an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterKind {
    Students,
    Teachers,
}

impl RosterKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "students" => Some(RosterKind::Students),
            "teachers" => Some(RosterKind::Teachers),
            _ => None,
        }
    }
}

/// Shared seam over the two roster record types so list/day-sheet handlers
/// stay generic.
pub trait RosterMember {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn email(&self) -> &str;
    /// Secondary column shown beside the person (semester or subject).
    fn detail(&self) -> String;
}

impl RosterMember for Student {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn email(&self) -> &str {
        &self.email
    }
    fn detail(&self) -> String {
        format!("Semester {}", self.semester)
    }
}

impl RosterMember for Teacher {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn email(&self) -> &str {
        &self.email
    }
    fn detail(&self) -> String {
        self.subject.clone()
    }
}
