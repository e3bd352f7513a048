//! Demo roster and attendance for an empty workspace, installed on request by
//! `workspace.seedDemo`.

use crate::ledger;
use crate::model::{AttendanceStatus, Ledger, Student, Teacher};
use crate::password;
use chrono::{Days, NaiveDate, Utc};
use uuid::Uuid;

const DEMO_PASSWORD: &str = "password123";

pub struct DemoData {
    pub students: Vec<Student>,
    pub teachers: Vec<Teacher>,
    pub student_ledger: Ledger,
    pub teacher_ledger: Ledger,
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn student(
    name: &str,
    email: &str,
    semester: &str,
    phone: &str,
    address: &str,
    date_added: NaiveDate,
) -> anyhow::Result<Student> {
    Ok(Student {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: email.to_string(),
        password_hash: password::hash_password(DEMO_PASSWORD)?,
        semester: semester.to_string(),
        phone: Some(phone.to_string()),
        address: Some(address.to_string()),
        date_added,
    })
}

fn teacher(
    name: &str,
    email: &str,
    subject: &str,
    experience_years: i64,
    qualification: &str,
    date_added: NaiveDate,
) -> anyhow::Result<Teacher> {
    Ok(Teacher {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: email.to_string(),
        password_hash: password::hash_password(DEMO_PASSWORD)?,
        subject: subject.to_string(),
        experience_years,
        qualification: qualification.to_string(),
        date_added,
    })
}

pub fn demo_data() -> anyhow::Result<DemoData> {
    let students = vec![
        student(
            "Alex Johnson",
            "alex.johnson@example.com",
            "3",
            "555-123-4567",
            "123 Main St, New York, NY",
            date(2023, 9, 15),
        )?,
        student(
            "Maria Garcia",
            "maria.garcia@example.com",
            "5",
            "555-234-5678",
            "456 Oak Ave, Los Angeles, CA",
            date(2023, 9, 10),
        )?,
        student(
            "David Smith",
            "david.smith@example.com",
            "2",
            "555-345-6789",
            "789 Pine Rd, Chicago, IL",
            date(2023, 9, 5),
        )?,
        student(
            "Sarah Williams",
            "sarah.williams@example.com",
            "4",
            "555-456-7890",
            "321 Elm St, Houston, TX",
            date(2023, 8, 28),
        )?,
    ];

    let teachers = vec![
        teacher(
            "Dr. James Wilson",
            "james.wilson@example.com",
            "Mathematics",
            12,
            "Ph.D. in Mathematics",
            date(2023, 8, 15),
        )?,
        teacher(
            "Prof. Emily Chen",
            "emily.chen@example.com",
            "Physics",
            8,
            "M.Sc. in Physics",
            date(2023, 8, 20),
        )?,
        teacher(
            "Dr. Robert Brown",
            "robert.brown@example.com",
            "Computer Science",
            15,
            "Ph.D. in Computer Science",
            date(2023, 8, 10),
        )?,
    ];

    let today = Utc::now().date_naive();
    let yesterday = today.checked_sub_days(Days::new(1)).unwrap_or(today);

    let mut student_ledger = Ledger::new();
    for (idx, status) in [
        (0, AttendanceStatus::Present),
        (1, AttendanceStatus::Present),
        (2, AttendanceStatus::Absent),
    ] {
        let s = &students[idx];
        ledger::upsert(&mut student_ledger, today, &s.id, &s.name, status);
    }
    for (idx, status) in [
        (0, AttendanceStatus::Absent),
        (2, AttendanceStatus::Present),
        (3, AttendanceStatus::Present),
    ] {
        let s = &students[idx];
        ledger::upsert(&mut student_ledger, yesterday, &s.id, &s.name, status);
    }

    let mut teacher_ledger = Ledger::new();
    for (idx, status) in [
        (0, AttendanceStatus::Present),
        (1, AttendanceStatus::Present),
    ] {
        let t = &teachers[idx];
        ledger::upsert(&mut teacher_ledger, today, &t.id, &t.name, status);
    }
    for (idx, status) in [
        (1, AttendanceStatus::Present),
        (2, AttendanceStatus::Absent),
    ] {
        let t = &teachers[idx];
        ledger::upsert(&mut teacher_ledger, yesterday, &t.id, &t.name, status);
    }

    Ok(DemoData {
        students,
        teachers,
        student_ledger,
        teacher_ledger,
    })
}
