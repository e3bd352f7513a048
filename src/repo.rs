//! Repository owning the four persisted collections. Collections are loaded
//! once when a workspace is selected, mutated in memory, and every mutating
//! operation writes the affected slot(s) back inside one transaction.
//! Handlers never touch storage directly.

use crate::ledger;
use crate::model::{AttendanceStatus, Ledger, RosterKind, RosterMember, Student, Teacher};
use crate::seed;
use crate::store;
use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("a {kind} with email {email} already exists")]
    DuplicateEmail { kind: &'static str, email: String },
    #[error("workspace already contains data")]
    NotEmpty,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub semester: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTeacher {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub subject: String,
    pub experience_years: i64,
    pub qualification: String,
}

/// Field-level patch; outer `None` means "leave unchanged", inner `None` (for
/// optional fields) means "clear".
#[derive(Debug, Clone, Default)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub semester: Option<String>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct TeacherPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub experience_years: Option<i64>,
    pub qualification: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_students: usize,
    pub total_teachers: usize,
    /// Percentage of *recorded* entries (both ledgers combined) that are
    /// present on the requested day. Records only, not roster size.
    pub attendance_today: u32,
    pub active_semesters: usize,
}

fn email_taken<M: RosterMember>(roster: &[M], email: &str, excluding: Option<&str>) -> bool {
    roster.iter().any(|m| {
        excluding.map(|id| m.id() != id).unwrap_or(true) && m.email().eq_ignore_ascii_case(email)
    })
}

fn encode<T: Serialize>(slot: &'static str, value: &T) -> Result<String, RepoError> {
    serde_json::to_string(value)
        .map_err(|e| RepoError::Storage(anyhow::anyhow!("failed to serialize slot {}: {}", slot, e)))
}

pub struct Repository {
    conn: Connection,
    students: Vec<Student>,
    teachers: Vec<Teacher>,
    student_ledger: Ledger,
    teacher_ledger: Ledger,
}

impl Repository {
    /// Open (or create) the workspace store and load all four slots. A slot
    /// that exists but fails to parse aborts the open; there is no partial
    /// load.
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        let conn = store::open_store(workspace)?;
        let students: Vec<Student> =
            store::slot_get_json(&conn, store::SLOT_STUDENTS)?.unwrap_or_default();
        let teachers: Vec<Teacher> =
            store::slot_get_json(&conn, store::SLOT_TEACHERS)?.unwrap_or_default();
        let student_ledger: Ledger =
            store::slot_get_json(&conn, store::SLOT_STUDENT_ATTENDANCE)?.unwrap_or_default();
        let teacher_ledger: Ledger =
            store::slot_get_json(&conn, store::SLOT_TEACHER_ATTENDANCE)?.unwrap_or_default();

        info!(
            students = students.len(),
            teachers = teachers.len(),
            "workspace collections loaded"
        );

        Ok(Self {
            conn,
            students,
            teachers,
            student_ledger,
            teacher_ledger,
        })
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn teachers(&self) -> &[Teacher] {
        &self.teachers
    }

    pub fn ledger(&self, kind: RosterKind) -> &Ledger {
        match kind {
            RosterKind::Students => &self.student_ledger,
            RosterKind::Teachers => &self.teacher_ledger,
        }
    }

    fn ledger_mut(&mut self, kind: RosterKind) -> &mut Ledger {
        match kind {
            RosterKind::Students => &mut self.student_ledger,
            RosterKind::Teachers => &mut self.teacher_ledger,
        }
    }

    pub fn roster_ids(&self, kind: RosterKind) -> Vec<String> {
        match kind {
            RosterKind::Students => self.students.iter().map(|s| s.id.clone()).collect(),
            RosterKind::Teachers => self.teachers.iter().map(|t| t.id.clone()).collect(),
        }
    }

    pub fn person_name(&self, kind: RosterKind, person_id: &str) -> Option<String> {
        match kind {
            RosterKind::Students => self
                .students
                .iter()
                .find(|s| s.id == person_id)
                .map(|s| s.name.clone()),
            RosterKind::Teachers => self
                .teachers
                .iter()
                .find(|t| t.id == person_id)
                .map(|t| t.name.clone()),
        }
    }

    // ---- roster CRUD ----

    pub fn create_student(&mut self, new: NewStudent) -> Result<Student, RepoError> {
        if email_taken(&self.students, &new.email, None) {
            return Err(RepoError::DuplicateEmail {
                kind: "student",
                email: new.email,
            });
        }
        let student = Student {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            semester: new.semester,
            phone: new.phone,
            address: new.address,
            date_added: Utc::now().date_naive(),
        };
        self.students.push(student.clone());
        self.persist_students()?;
        Ok(student)
    }

    /// No-op (`Ok(false)`) when the id is unknown.
    pub fn update_student(&mut self, id: &str, patch: StudentPatch) -> Result<bool, RepoError> {
        let Some(idx) = self.students.iter().position(|s| s.id == id) else {
            return Ok(false);
        };
        if let Some(email) = &patch.email {
            if email_taken(&self.students, email, Some(id)) {
                return Err(RepoError::DuplicateEmail {
                    kind: "student",
                    email: email.clone(),
                });
            }
        }
        let s = &mut self.students[idx];
        if let Some(name) = patch.name {
            s.name = name;
        }
        if let Some(email) = patch.email {
            s.email = email;
        }
        if let Some(semester) = patch.semester {
            s.semester = semester;
        }
        if let Some(phone) = patch.phone {
            s.phone = phone;
        }
        if let Some(address) = patch.address {
            s.address = address;
        }
        self.persist_students()?;
        Ok(true)
    }

    /// Removes the student and purges their ledger entries in the same
    /// persist. `Ok(None)` when the id is unknown; otherwise the number of
    /// attendance records purged.
    pub fn delete_student(&mut self, id: &str) -> Result<Option<usize>, RepoError> {
        let Some(idx) = self.students.iter().position(|s| s.id == id) else {
            return Ok(None);
        };
        self.students.remove(idx);
        let purged = ledger::purge_person(&mut self.student_ledger, id);
        self.persist_slots(vec![
            (store::SLOT_STUDENTS, encode(store::SLOT_STUDENTS, &self.students)?),
            (
                store::SLOT_STUDENT_ATTENDANCE,
                encode(store::SLOT_STUDENT_ATTENDANCE, &self.student_ledger)?,
            ),
        ])?;
        Ok(Some(purged))
    }

    pub fn create_teacher(&mut self, new: NewTeacher) -> Result<Teacher, RepoError> {
        if email_taken(&self.teachers, &new.email, None) {
            return Err(RepoError::DuplicateEmail {
                kind: "teacher",
                email: new.email,
            });
        }
        let teacher = Teacher {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            subject: new.subject,
            experience_years: new.experience_years,
            qualification: new.qualification,
            date_added: Utc::now().date_naive(),
        };
        self.teachers.push(teacher.clone());
        self.persist_teachers()?;
        Ok(teacher)
    }

    pub fn update_teacher(&mut self, id: &str, patch: TeacherPatch) -> Result<bool, RepoError> {
        let Some(idx) = self.teachers.iter().position(|t| t.id == id) else {
            return Ok(false);
        };
        if let Some(email) = &patch.email {
            if email_taken(&self.teachers, email, Some(id)) {
                return Err(RepoError::DuplicateEmail {
                    kind: "teacher",
                    email: email.clone(),
                });
            }
        }
        let t = &mut self.teachers[idx];
        if let Some(name) = patch.name {
            t.name = name;
        }
        if let Some(email) = patch.email {
            t.email = email;
        }
        if let Some(subject) = patch.subject {
            t.subject = subject;
        }
        if let Some(experience_years) = patch.experience_years {
            t.experience_years = experience_years;
        }
        if let Some(qualification) = patch.qualification {
            t.qualification = qualification;
        }
        self.persist_teachers()?;
        Ok(true)
    }

    pub fn delete_teacher(&mut self, id: &str) -> Result<Option<usize>, RepoError> {
        let Some(idx) = self.teachers.iter().position(|t| t.id == id) else {
            return Ok(None);
        };
        self.teachers.remove(idx);
        let purged = ledger::purge_person(&mut self.teacher_ledger, id);
        self.persist_slots(vec![
            (store::SLOT_TEACHERS, encode(store::SLOT_TEACHERS, &self.teachers)?),
            (
                store::SLOT_TEACHER_ATTENDANCE,
                encode(store::SLOT_TEACHER_ATTENDANCE, &self.teacher_ledger)?,
            ),
        ])?;
        Ok(Some(purged))
    }

    // ---- attendance ----

    /// Upsert one record. `Ok(false)` when the person is not on the roster;
    /// the operation has no effect in that case.
    pub fn toggle(
        &mut self,
        kind: RosterKind,
        date: NaiveDate,
        person_id: &str,
        status: AttendanceStatus,
    ) -> Result<bool, RepoError> {
        let Some(name) = self.person_name(kind, person_id) else {
            return Ok(false);
        };
        ledger::upsert(self.ledger_mut(kind), date, person_id, &name, status);
        self.persist_ledger(kind)?;
        Ok(true)
    }

    /// Sequential upserts, persisted once. Unknown ids are skipped; returns
    /// the number of people marked.
    pub fn bulk_mark(
        &mut self,
        kind: RosterKind,
        date: NaiveDate,
        person_ids: &[String],
        status: AttendanceStatus,
    ) -> Result<usize, RepoError> {
        let known: Vec<(String, String)> = person_ids
            .iter()
            .filter_map(|pid| self.person_name(kind, pid).map(|name| (pid.clone(), name)))
            .collect();
        if known.is_empty() {
            return Ok(0);
        }
        let target = self.ledger_mut(kind);
        for (pid, name) in &known {
            ledger::upsert(target, date, pid, name, status);
        }
        self.persist_ledger(kind)?;
        Ok(known.len())
    }

    pub fn mark_all(
        &mut self,
        kind: RosterKind,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> Result<usize, RepoError> {
        let ids = self.roster_ids(kind);
        self.bulk_mark(kind, date, &ids, status)
    }

    // ---- aggregates ----

    pub fn dashboard_stats(&self, date: NaiveDate) -> DashboardStats {
        let (student_present, student_total) = ledger::recorded_day_tally(&self.student_ledger, date);
        let (teacher_present, teacher_total) = ledger::recorded_day_tally(&self.teacher_ledger, date);
        let semesters: BTreeSet<&str> = self.students.iter().map(|s| s.semester.as_str()).collect();
        DashboardStats {
            total_students: self.students.len(),
            total_teachers: self.teachers.len(),
            attendance_today: ledger::percentage(
                student_present + teacher_present,
                student_total + teacher_total,
            ),
            active_semesters: semesters.len(),
        }
    }

    // ---- seeding ----

    /// Install the demo collections. Refused unless both rosters are empty.
    pub fn seed_demo(&mut self) -> Result<(usize, usize), RepoError> {
        if !self.students.is_empty() || !self.teachers.is_empty() {
            return Err(RepoError::NotEmpty);
        }
        let demo = seed::demo_data()?;
        self.students = demo.students;
        self.teachers = demo.teachers;
        self.student_ledger = demo.student_ledger;
        self.teacher_ledger = demo.teacher_ledger;
        self.persist_slots(vec![
            (store::SLOT_STUDENTS, encode(store::SLOT_STUDENTS, &self.students)?),
            (store::SLOT_TEACHERS, encode(store::SLOT_TEACHERS, &self.teachers)?),
            (
                store::SLOT_STUDENT_ATTENDANCE,
                encode(store::SLOT_STUDENT_ATTENDANCE, &self.student_ledger)?,
            ),
            (
                store::SLOT_TEACHER_ATTENDANCE,
                encode(store::SLOT_TEACHER_ATTENDANCE, &self.teacher_ledger)?,
            ),
        ])?;
        info!(
            students = self.students.len(),
            teachers = self.teachers.len(),
            "demo data seeded"
        );
        Ok((self.students.len(), self.teachers.len()))
    }

    // ---- persistence ----

    fn persist_students(&self) -> Result<(), RepoError> {
        self.persist_slots(vec![(
            store::SLOT_STUDENTS,
            encode(store::SLOT_STUDENTS, &self.students)?,
        )])
    }

    fn persist_teachers(&self) -> Result<(), RepoError> {
        self.persist_slots(vec![(
            store::SLOT_TEACHERS,
            encode(store::SLOT_TEACHERS, &self.teachers)?,
        )])
    }

    fn persist_ledger(&self, kind: RosterKind) -> Result<(), RepoError> {
        let (slot, target) = match kind {
            RosterKind::Students => (store::SLOT_STUDENT_ATTENDANCE, &self.student_ledger),
            RosterKind::Teachers => (store::SLOT_TEACHER_ATTENDANCE, &self.teacher_ledger),
        };
        self.persist_slots(vec![(slot, encode(slot, target)?)])
    }

    fn persist_slots(&self, slots: Vec<(&'static str, String)>) -> Result<(), RepoError> {
        let write = || -> anyhow::Result<()> {
            let tx = self.conn.unchecked_transaction()?;
            for (key, value) in &slots {
                store::slot_set(&tx, key, value)?;
            }
            tx.commit()?;
            Ok(())
        };
        write().map_err(RepoError::Storage)
    }
}
