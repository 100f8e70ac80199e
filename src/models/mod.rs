//! Data models for the document intake pipeline.

mod document;
mod marksheet;
pub mod schema;
mod student;

pub use document::{
    AadhaarSide, DocumentSlot, DocumentType, Extraction, SideState, SideStatus, SlotStatus,
    StandardSlot, TwoSidedSlot,
};
pub use marksheet::{MarksheetRecord, RecordIds, SubjectRow, PLACEHOLDER_ID};
pub use student::{EnrollmentFields, StudentRecord};
