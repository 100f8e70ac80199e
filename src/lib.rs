//! docintake - student document intake and extraction pipeline.
//!
//! Drives the document side of a school enrollment workflow: uploading
//! identity and academic files for a student, tracking per-slot upload
//! state with bounded retry, merging machine-extracted fields back into
//! the enrollment form, and deduplicating repeated marksheet
//! extractions.

pub mod api;
pub mod cli;
pub mod config;
pub mod models;
pub mod services;
