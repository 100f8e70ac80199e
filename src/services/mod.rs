//! Service layer for the document intake pipeline.
//!
//! This module contains the pipeline logic separated from UI concerns.
//! Services can be used by the CLI or embedded by other interfaces.

pub mod marksheets;
pub mod merge;
pub mod records;
pub mod session;
pub mod slots;
pub mod upload;

pub use marksheets::{insert_extracted, InsertOutcome};
pub use merge::{marksheet_from_extraction, merge_into_form};
pub use records::{ManualRecordStore, RecordState, SaveKind};
pub use session::{EnrollmentSession, SessionError, UploadReport};
pub use slots::{Completion, SlotError, SlotRegistry, SlotUpdate, UploadTicket};
pub use upload::{UploadCoordinator, MAX_RETRIES};
