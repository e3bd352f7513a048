//! Pure attendance aggregation over an in-memory ledger. No storage, no I/O;
//! the repository owns persistence and hands these functions borrowed maps.

use crate::model::{AttendanceRecord, AttendanceStatus, Ledger};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttendanceSummary {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub percentage: u32,
}

pub fn percentage(present: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((present as f64 / total as f64) * 100.0).round() as u32
}

/// Status of one person on one day, falling back to `default` when the ledger
/// has no entry. The fallback is an explicit input, not a hidden convention.
pub fn resolve_status(
    ledger: &Ledger,
    date: NaiveDate,
    person_id: &str,
    default: AttendanceStatus,
) -> AttendanceStatus {
    ledger
        .get(&date)
        .and_then(|entries| entries.get(person_id))
        .map(|rec| rec.status)
        .unwrap_or(default)
}

/// Whole-roster summary for one day. `total` is the roster size; people
/// without a ledger entry count as `default`.
pub fn daily_summary<'a>(
    ledger: &Ledger,
    date: NaiveDate,
    roster_ids: impl Iterator<Item = &'a str>,
    default: AttendanceStatus,
) -> AttendanceSummary {
    let mut total = 0usize;
    let mut present = 0usize;
    for id in roster_ids {
        total += 1;
        if resolve_status(ledger, date, id, default) == AttendanceStatus::Present {
            present += 1;
        }
    }
    AttendanceSummary {
        total,
        present,
        absent: total - present,
        percentage: percentage(present, total),
    }
}

/// All records in the inclusive day range, optionally restricted to one
/// person, newest date first (ties broken by person name so output is
/// deterministic). Days with no ledger entry contribute nothing; an inverted
/// range is empty.
pub fn range_query(
    ledger: &Ledger,
    from: NaiveDate,
    to: NaiveDate,
    person_id: Option<&str>,
) -> Vec<AttendanceRecord> {
    if from > to {
        return Vec::new();
    }
    let mut records: Vec<AttendanceRecord> = ledger
        .range(from..=to)
        .flat_map(|(_, entries)| entries.values())
        .filter(|rec| person_id.map(|p| rec.person_id == p).unwrap_or(true))
        .cloned()
        .collect();
    records.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| a.person_name.cmp(&b.person_name))
    });
    records
}

/// Summary over recorded entries only — no roster, no default fill. This is
/// what range views and the dashboard count.
pub fn summarize_records<'a>(
    records: impl Iterator<Item = &'a AttendanceRecord>,
) -> AttendanceSummary {
    let mut total = 0usize;
    let mut present = 0usize;
    for rec in records {
        total += 1;
        if rec.status == AttendanceStatus::Present {
            present += 1;
        }
    }
    AttendanceSummary {
        total,
        present,
        absent: total - present,
        percentage: percentage(present, total),
    }
}

/// Upsert one record; the (date, person) slot holds at most one record and
/// the last write wins.
pub fn upsert(
    ledger: &mut Ledger,
    date: NaiveDate,
    person_id: &str,
    person_name: &str,
    status: AttendanceStatus,
) {
    ledger.entry(date).or_default().insert(
        person_id.to_string(),
        AttendanceRecord {
            person_id: person_id.to_string(),
            person_name: person_name.to_string(),
            status,
            date,
        },
    );
}

/// Remove every record for one person across all days; empty day maps are
/// dropped. Returns the number of records removed.
pub fn purge_person(ledger: &mut Ledger, person_id: &str) -> usize {
    let mut removed = 0usize;
    ledger.retain(|_, entries| {
        if entries.remove(person_id).is_some() {
            removed += 1;
        }
        !entries.is_empty()
    });
    removed
}

/// (present, total) over the entries recorded for one day.
pub fn recorded_day_tally(ledger: &Ledger, date: NaiveDate) -> (usize, usize) {
    match ledger.get(&date) {
        Some(entries) => {
            let present = entries
                .values()
                .filter(|rec| rec.status == AttendanceStatus::Present)
                .count();
            (present, entries.len())
        }
        None => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("test date")
    }

    fn mark(ledger: &mut Ledger, date: &str, id: &str, status: AttendanceStatus) {
        upsert(ledger, d(date), id, &format!("Person {}", id), status);
    }

    #[test]
    fn percentage_has_no_division_by_zero() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(1, 2), 50);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(3, 3), 100);
    }

    #[test]
    fn empty_ledger_counts_roster_as_default_absent() {
        let ledger = Ledger::new();
        let s = daily_summary(
            &ledger,
            d("2024-01-01"),
            ["a", "b"].into_iter(),
            AttendanceStatus::Absent,
        );
        assert_eq!(s.total, 2);
        assert_eq!(s.present, 0);
        assert_eq!(s.absent, 2);
        assert_eq!(s.percentage, 0);
    }

    #[test]
    fn marking_everyone_present_yields_full_percentage() {
        let mut ledger = Ledger::new();
        mark(&mut ledger, "2024-01-02", "a", AttendanceStatus::Present);
        mark(&mut ledger, "2024-01-02", "b", AttendanceStatus::Present);
        let s = daily_summary(
            &ledger,
            d("2024-01-02"),
            ["a", "b"].into_iter(),
            AttendanceStatus::Absent,
        );
        assert_eq!((s.total, s.present, s.absent, s.percentage), (2, 2, 0, 100));
    }

    #[test]
    fn upsert_is_idempotent_and_last_write_wins() {
        let mut ledger = Ledger::new();
        mark(&mut ledger, "2024-01-01", "a", AttendanceStatus::Present);
        let once = ledger.clone();
        mark(&mut ledger, "2024-01-01", "a", AttendanceStatus::Present);
        assert_eq!(ledger, once);
        assert_eq!(ledger.get(&d("2024-01-01")).unwrap().len(), 1);

        mark(&mut ledger, "2024-01-01", "a", AttendanceStatus::Absent);
        assert_eq!(
            resolve_status(&ledger, d("2024-01-01"), "a", AttendanceStatus::Present),
            AttendanceStatus::Absent
        );
        assert_eq!(ledger.get(&d("2024-01-01")).unwrap().len(), 1);
    }

    #[test]
    fn single_day_range_returns_that_day_once_per_person() {
        let mut ledger = Ledger::new();
        mark(&mut ledger, "2024-01-01", "a", AttendanceStatus::Present);
        mark(&mut ledger, "2024-01-01", "b", AttendanceStatus::Absent);
        mark(&mut ledger, "2024-01-02", "a", AttendanceStatus::Absent);

        let records = range_query(&ledger, d("2024-01-01"), d("2024-01-01"), None);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.date == d("2024-01-01")));
        let mut ids: Vec<&str> = records.iter().map(|r| r.person_id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn range_is_newest_first_and_person_filter_applies() {
        let mut ledger = Ledger::new();
        mark(&mut ledger, "2024-01-01", "a", AttendanceStatus::Present);
        mark(&mut ledger, "2024-01-02", "a", AttendanceStatus::Absent);
        mark(&mut ledger, "2024-01-02", "b", AttendanceStatus::Present);
        mark(&mut ledger, "2024-01-03", "a", AttendanceStatus::Present);

        let records = range_query(&ledger, d("2024-01-01"), d("2024-01-03"), Some("a"));
        let days: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
        assert_eq!(days, vec![d("2024-01-03"), d("2024-01-02"), d("2024-01-01")]);
        assert!(records.iter().all(|r| r.person_id == "a"));
    }

    #[test]
    fn inverted_range_is_empty() {
        let mut ledger = Ledger::new();
        mark(&mut ledger, "2024-01-02", "a", AttendanceStatus::Present);
        assert!(range_query(&ledger, d("2024-01-03"), d("2024-01-01"), None).is_empty());
    }

    #[test]
    fn days_without_entries_contribute_nothing() {
        let mut ledger = Ledger::new();
        mark(&mut ledger, "2024-01-01", "a", AttendanceStatus::Present);
        mark(&mut ledger, "2024-01-05", "a", AttendanceStatus::Absent);
        let records = range_query(&ledger, d("2024-01-01"), d("2024-01-05"), None);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn purge_drops_all_records_for_person_and_empty_days() {
        let mut ledger = Ledger::new();
        mark(&mut ledger, "2024-01-01", "a", AttendanceStatus::Present);
        mark(&mut ledger, "2024-01-02", "a", AttendanceStatus::Absent);
        mark(&mut ledger, "2024-01-02", "b", AttendanceStatus::Present);

        assert_eq!(purge_person(&mut ledger, "a"), 2);
        assert!(!ledger.contains_key(&d("2024-01-01")));
        assert_eq!(ledger.get(&d("2024-01-02")).unwrap().len(), 1);
        assert_eq!(purge_person(&mut ledger, "missing"), 0);
    }

    #[test]
    fn recorded_tally_counts_only_recorded_entries() {
        let mut ledger = Ledger::new();
        mark(&mut ledger, "2024-01-01", "a", AttendanceStatus::Present);
        mark(&mut ledger, "2024-01-01", "b", AttendanceStatus::Absent);
        assert_eq!(recorded_day_tally(&ledger, d("2024-01-01")), (1, 2));
        assert_eq!(recorded_day_tally(&ledger, d("2024-01-02")), (0, 0));
    }
}
