//! Collaborator boundary: turn the loosely shaped JSON the backend returns
//! into normalized entities. Field-name fallbacks live here and nowhere else.

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

use crate::{ids::*, model::InternshipPhase, types::*};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("record has no {0}")]
    MissingField(&'static str),
    #[error("unparseable date in {field}: {value}")]
    InvalidDate { field: &'static str, value: String },
}

/// First non-empty string among `paths`; each path is a list of object keys.
fn pick_str(v: &Value, paths: &[&[&str]]) -> Option<String> {
    paths.iter().find_map(|path| {
        let mut cur = v;
        for key in *path {
            cur = cur.get(key)?;
        }
        match cur {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    })
}

fn pick_bool(v: &Value, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|k| v.get(k).and_then(Value::as_bool))
}

/// Accepts `YYYY-MM-DD` as well as ISO timestamps (the date part is kept).
fn parse_day(field: &'static str, raw: &str) -> Result<NaiveDate, NormalizeError> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|_| NormalizeError::InvalidDate { field, value: raw.to_string() })
}

pub fn student_from_json(v: &Value) -> Result<Student, NormalizeError> {
    let id = pick_str(v, &[&["id"], &["_id"], &["studentId"], &["student", "id"]])
        .ok_or(NormalizeError::MissingField("id"))?;
    let name = pick_str(v, &[&["name"], &["fullName"], &["studentName"], &["student", "name"]])
        .ok_or(NormalizeError::MissingField("name"))?;

    let phase = pick_str(v, &[&["internshipPhase"], &["application", "internshipPhase"]])
        .and_then(|p| InternshipPhase::parse(&p));
    let active = match phase {
        Some(p) => p.is_active(),
        None => pick_bool(v, &["active", "isActive"]).unwrap_or(false),
    };

    Ok(Student {
        id: StudentId::from(id),
        name,
        roll_number: pick_str(v, &[&["rollNumber"], &["rollNo"], &["student", "rollNumber"]]),
        email: pick_str(v, &[&["email"], &["student", "email"], &["user", "email"]]),
        department: pick_str(v, &[&["department"], &["branch"], &["student", "department"]]),
        batch: pick_str(v, &[&["batch"], &["student", "batch"]]),
        internship_phase: phase.unwrap_or_default(),
        application_status: pick_str(v, &[&["applicationStatus"], &["status"], &["application", "status"]]),
        active,
    })
}

pub fn window_from_json(v: &Value) -> Result<InternshipWindow, NormalizeError> {
    let start = pick_str(v, &[&["startDate"], &["joiningDate"], &["internship", "startDate"]])
        .ok_or(NormalizeError::MissingField("startDate"))?;
    let end = pick_str(v, &[&["endDate"], &["completionDate"], &["internship", "endDate"]]);
    Ok(InternshipWindow {
        start_date: parse_day("startDate", &start)?,
        end_date: end.map(|e| parse_day("endDate", &e)).transpose()?,
    })
}
