//! Extraction-to-form merging.
//!
//! Extracted values flow into the enrollment form under a fill-if-empty
//! rule: a value the operator (or an earlier merge) already set is never
//! overwritten. Academic-record extractions are additionally translated
//! into marksheet records for the deduplicator.

use serde_json::Value;

use crate::models::{EnrollmentFields, Extraction, MarksheetRecord, RecordIds, SubjectRow};

/// Merge the cross-document fields of an extraction into the form,
/// writing each one only if the form field is currently empty. Returns
/// the names of the fields that were filled.
pub fn merge_into_form(
    fields: &mut EnrollmentFields,
    extraction: &Extraction,
) -> Vec<&'static str> {
    let mut filled = Vec::new();
    fill(
        &mut fields.previous_school,
        extraction.text("schoolName"),
        "previous_school",
        &mut filled,
    );
    fill(
        &mut fields.board,
        extraction.text("boardUniversity"),
        "board",
        &mut filled,
    );
    fill(
        &mut fields.father_name,
        extraction.text("fatherName"),
        "father_name",
        &mut filled,
    );
    fill(
        &mut fields.mother_name,
        extraction.text("motherName"),
        "mother_name",
        &mut filled,
    );
    filled
}

fn fill(
    target: &mut String,
    value: Option<String>,
    name: &'static str,
    filled: &mut Vec<&'static str>,
) {
    if !target.trim().is_empty() {
        return;
    }
    if let Some(value) = value {
        *target = value;
        filled.push(name);
    }
}

/// Translate an academic-record extraction into a marksheet record with
/// freshly minted ids. An extraction without subjects still gets one
/// blank subject row so the record is editable.
pub fn marksheet_from_extraction(extraction: &Extraction, ids: &mut RecordIds) -> MarksheetRecord {
    let mut subjects: Vec<SubjectRow> = extraction
        .get("subjects")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_object)
                .map(|entry| SubjectRow {
                    id: ids.next_subject(),
                    name: object_text(entry, "subject"),
                    obtained: object_text(entry, "obtainedMarksOrGrade"),
                    max: object_text(entry, "maxMarksOrGrade"),
                })
                .collect()
        })
        .unwrap_or_default();
    if subjects.is_empty() {
        subjects.push(SubjectRow::blank(ids.next_subject()));
    }

    let text = |key: &str| extraction.text(key).unwrap_or_default();

    MarksheetRecord {
        id: ids.next_marksheet(),
        class_name: text("className"),
        board_university: text("boardUniversity"),
        school_name: text("schoolName"),
        roll_number: text("rollNumber"),
        total_max_marks: text("totalMaxMarksOrGrade"),
        total_obtained_marks: text("totalObtainedMarksOrGrade"),
        percentage: text("percentageOrGrade"),
        result_status: text("resultStatus"),
        subjects,
        is_extracted: true,
    }
}

/// Non-empty text of one field in a subject entry, stringifying numbers
/// the same way [`Extraction::text`] does.
fn object_text(entry: &serde_json::Map<String, Value>, key: &str) -> String {
    match entry.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
