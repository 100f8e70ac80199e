//! Marksheet list maintenance and deduplication.
//!
//! Extracted records are inserted through a dedup policy keyed on
//! (roll number, class, school, total obtained marks), so re-uploading
//! the same document is idempotent. The very first extraction replaces
//! the initial empty scaffold instead of growing the list.

use tracing::debug;

use crate::models::{MarksheetRecord, RecordIds, SubjectRow, PLACEHOLDER_ID};

/// What an insert did to the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// An equivalent extracted record already exists; nothing changed.
    Unchanged,
    /// The still-empty placeholder was replaced in place, keeping id 1.
    ReplacedPlaceholder,
    /// The candidate was prepended under its own id.
    Prepended,
}

/// Insert an extracted record, deduplicating against everything already
/// extracted.
pub fn insert_extracted(
    records: &mut Vec<MarksheetRecord>,
    mut candidate: MarksheetRecord,
) -> InsertOutcome {
    let duplicate = records.iter().any(|existing| {
        existing.is_extracted
            && existing.roll_number == candidate.roll_number
            && existing.class_name == candidate.class_name
            && existing.school_name == candidate.school_name
            && existing.total_obtained_marks == candidate.total_obtained_marks
    });
    if duplicate {
        debug!(
            roll_number = %candidate.roll_number,
            school = %candidate.school_name,
            "duplicate marksheet extraction ignored"
        );
        return InsertOutcome::Unchanged;
    }

    // The single untouched scaffold from form init is replaced rather
    // than kept alongside real data. Its id stays 1, and an explicit
    // class selection made on it wins over the extraction's class.
    if records.len() == 1
        && records[0].id == PLACEHOLDER_ID
        && records[0].is_still_empty()
    {
        if !records[0].class_name.is_empty() {
            candidate.class_name = records[0].class_name.clone();
        }
        candidate.id = PLACEHOLDER_ID;
        records[0] = candidate;
        return InsertOutcome::ReplacedPlaceholder;
    }

    records.insert(0, candidate);
    InsertOutcome::Prepended
}

/// Append a blank record for manual entry. Returns its id.
pub fn add_blank(records: &mut Vec<MarksheetRecord>, ids: &mut RecordIds) -> u64 {
    let record = MarksheetRecord::blank(ids);
    let id = record.id;
    records.push(record);
    id
}

/// Remove a record by id. Refused while only one record exists; the
/// list never goes empty.
pub fn remove_record(records: &mut Vec<MarksheetRecord>, id: u64) -> bool {
    if records.len() <= 1 {
        return false;
    }
    let before = records.len();
    records.retain(|record| record.id != id);
    records.len() < before
}

/// Add a blank subject row to a record. Returns the new subject id.
pub fn add_subject(
    records: &mut [MarksheetRecord],
    marksheet_id: u64,
    ids: &mut RecordIds,
) -> Option<u64> {
    let record = records.iter_mut().find(|r| r.id == marksheet_id)?;
    let subject = SubjectRow::blank(ids.next_subject());
    let id = subject.id;
    record.subjects.push(subject);
    Some(id)
}

/// Remove a subject row from a record.
pub fn remove_subject(records: &mut [MarksheetRecord], marksheet_id: u64, subject_id: u64) -> bool {
    let Some(record) = records.iter_mut().find(|r| r.id == marksheet_id) else {
        return false;
    };
    let before = record.subjects.len();
    record.subjects.retain(|subject| subject.id != subject_id);
    record.subjects.len() < before
}
