//! Academic-record (marksheet) models.
//!
//! A student's marksheet list always holds at least one record: a
//! placeholder with id 1 created at form initialization. Ids come from
//! an explicit session-owned generator and are never reused.

use serde::{Deserialize, Serialize};

/// Id reserved for the placeholder record created at form init.
pub const PLACEHOLDER_ID: u64 = 1;

/// One subject row inside a marksheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRow {
    pub id: u64,
    pub name: String,
    pub obtained: String,
    pub max: String,
}

impl SubjectRow {
    /// An empty row ready for manual entry.
    pub fn blank(id: u64) -> Self {
        Self {
            id,
            name: String::new(),
            obtained: String::new(),
            max: String::new(),
        }
    }
}

/// One academic term/record known for the student.
///
/// Marks stay as text: they come out of extraction as strings and may be
/// grades rather than numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarksheetRecord {
    pub id: u64,
    pub class_name: String,
    pub board_university: String,
    pub school_name: String,
    pub roll_number: String,
    pub total_max_marks: String,
    pub total_obtained_marks: String,
    pub percentage: String,
    pub result_status: String,
    pub subjects: Vec<SubjectRow>,
    /// True when the record came from document extraction rather than
    /// manual entry.
    pub is_extracted: bool,
}

impl MarksheetRecord {
    /// The placeholder record present after form initialization.
    pub fn placeholder(ids: &mut RecordIds) -> Self {
        Self {
            id: PLACEHOLDER_ID,
            class_name: String::new(),
            board_university: String::new(),
            school_name: String::new(),
            roll_number: String::new(),
            total_max_marks: String::new(),
            total_obtained_marks: String::new(),
            percentage: String::new(),
            result_status: String::new(),
            subjects: vec![SubjectRow::blank(ids.next_subject())],
            is_extracted: false,
        }
    }

    /// A blank record for manual entry under a fresh id.
    pub fn blank(ids: &mut RecordIds) -> Self {
        let id = ids.next_marksheet();
        Self {
            id,
            ..Self::placeholder(ids)
        }
    }

    /// Whether this is still the untouched scaffold: no total marks and
    /// no school name have been filled in.
    pub fn is_still_empty(&self) -> bool {
        self.total_max_marks.is_empty() && self.school_name.is_empty()
    }
}

/// Monotonic id sequences for marksheets and subject rows, owned by the
/// enrollment session and threaded through calls that mint records.
#[derive(Debug, Clone)]
pub struct RecordIds {
    next_marksheet: u64,
    next_subject: u64,
}

impl RecordIds {
    /// Marksheet ids start past the placeholder's reserved id 1.
    pub fn new() -> Self {
        Self {
            next_marksheet: PLACEHOLDER_ID + 1,
            next_subject: 101,
        }
    }

    pub fn next_marksheet(&mut self) -> u64 {
        let id = self.next_marksheet;
        self.next_marksheet += 1;
        id
    }

    pub fn next_subject(&mut self) -> u64 {
        let id = self.next_subject;
        self.next_subject += 1;
        id
    }
}

impl Default for RecordIds {
    fn default() -> Self {
        Self::new()
    }
}
