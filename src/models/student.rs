//! Student record and enrollment form field models.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Student identity as returned by the student service.
///
/// Only the id and class are load-bearing for the document pipeline; the
/// rest of the payload rides along untyped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub student_id: String,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Accept ids serialized as either strings or integers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Flat scalar fields of the enrollment form.
///
/// Mutated by direct operator edits (last write wins) and by the
/// extraction merger (fill-if-empty only).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrollmentFields {
    pub first_name: String,
    pub last_name: String,
    pub father_name: String,
    pub mother_name: String,
    pub gender: String,
    pub category: String,
    pub date_of_birth: String,
    pub permanent_address: String,
    pub temporary_address: String,
    pub previous_school: String,
    pub board: String,
    pub passing_year: String,
    pub tc_number: String,
    pub phone: String,
    pub email: String,
    pub emergency_contact: String,
}

impl EnrollmentFields {
    /// Populate from a loaded student payload. Stored students predate a
    /// few schema renames, so each field falls back through the key
    /// aliases seen in production data; a combined `name` is split into
    /// first and last parts when the split fields are absent.
    pub fn populate_from_student(&mut self, data: &serde_json::Map<String, Value>) {
        let text = |keys: &[&str]| -> String {
            keys.iter()
                .filter_map(|k| data.get(*k))
                .filter_map(value_text)
                .next()
                .unwrap_or_default()
        };

        self.first_name = text(&["firstName"]);
        self.last_name = text(&["lastName"]);
        if self.first_name.is_empty() {
            if let Some(name) = data.get("name").and_then(value_text) {
                let mut parts = name.split_whitespace();
                self.first_name = parts.next().unwrap_or_default().to_string();
                self.last_name = parts.collect::<Vec<_>>().join(" ");
            }
        }

        self.father_name = text(&["fatherName", "father_name"]);
        self.mother_name = text(&["motherName", "mother_name"]);
        self.gender = text(&["gender"]);
        self.category = text(&["category", "caste_category"]);
        self.date_of_birth = text(&["dateOfBirth", "dob", "date_of_birth"]);
        self.permanent_address = text(&["permanentAddress", "permanent_address", "address"]);
        self.temporary_address = text(&["temporaryAddress", "temporary_address", "currentAddress"]);
        self.previous_school = text(&["previousSchool", "previous_school", "lastSchool"]);
        self.board = text(&["board", "previous_board", "boardUniversity"]);
        self.passing_year = text(&["passingYear", "passing_year", "previousYear"]);
        self.tc_number = text(&["tcNumber", "tc_number", "transferCertificateNumber"]);
        self.phone = text(&["phone", "phoneNumber", "phone_number", "contactNumber"]);
        self.email = text(&["email", "emailAddress", "email_address"]);
        self.emergency_contact = text(&["emergencyContact", "emergency_contact", "emergencyNumber"]);
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
