//! Per-student document slot registry.
//!
//! Owns the fixed set of slots and every transition they go through:
//! begin/complete for uploads, reset, and absorption of the server's
//! document listing. Completions are fenced by a per-slot generation
//! counter so a stale retry can never overwrite a newer upload.

use std::collections::HashMap;

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{
    AadhaarSide, DocumentSlot, DocumentType, Extraction, SideStatus, SlotStatus,
};

#[derive(Debug, Error)]
pub enum SlotError {
    #[error("{} uploads must name a side", .0.display_name())]
    MissingSide(DocumentType),
    #[error("{} has no front/back sides", .0.display_name())]
    UnexpectedSide(DocumentType),
}

/// Identifies one begun upload. A completion presenting a ticket older
/// than the slot's current generation is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket {
    pub document_type: DocumentType,
    pub side: Option<AadhaarSide>,
    generation: u64,
}

/// What a successful upload wants applied to its slot.
#[derive(Debug, Clone)]
pub struct SlotUpdate {
    pub file_url: Option<String>,
    pub resolved_type: Option<DocumentType>,
    pub extraction: Option<Extraction>,
}

/// Whether a completion was applied or superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Stale,
}

/// The fixed set of document slots for one student.
#[derive(Debug)]
pub struct SlotRegistry {
    slots: HashMap<DocumentType, DocumentSlot>,
}

impl SlotRegistry {
    /// One empty slot per known document type.
    pub fn new() -> Self {
        let slots = DocumentType::ALL
            .into_iter()
            .map(|ty| (ty, DocumentSlot::new(ty)))
            .collect();
        Self { slots }
    }

    pub fn slot(&self, document_type: DocumentType) -> &DocumentSlot {
        &self.slots[&document_type]
    }

    /// Slots in form display order.
    pub fn iter(&self) -> impl Iterator<Item = (DocumentType, &DocumentSlot)> {
        DocumentType::ALL.into_iter().map(move |ty| (ty, &self.slots[&ty]))
    }

    /// Mark a slot (or one Aadhaar side) as uploading and hand back the
    /// ticket its completion must present. Beginning again while an
    /// upload is in flight supersedes the older attempt.
    pub fn begin_upload(
        &mut self,
        document_type: DocumentType,
        side: Option<AadhaarSide>,
    ) -> Result<UploadTicket, SlotError> {
        let slot = self
            .slots
            .get_mut(&document_type)
            .expect("registry holds all document types");

        let generation = match (slot, side) {
            (DocumentSlot::TwoSided(slot), Some(side)) => {
                let state = slot.side_mut(side);
                state.status = SideStatus::Uploading;
                state.generation += 1;
                state.generation
            }
            (DocumentSlot::Standard(slot), None) => {
                slot.status = SlotStatus::Uploading;
                slot.generation += 1;
                slot.generation
            }
            (DocumentSlot::TwoSided(_), None) => return Err(SlotError::MissingSide(document_type)),
            (DocumentSlot::Standard(_), Some(_)) => {
                return Err(SlotError::UnexpectedSide(document_type))
            }
        };

        debug!(
            document = document_type.as_str(),
            side = side.map(|s| s.as_str()),
            generation,
            "upload begun"
        );

        Ok(UploadTicket {
            document_type,
            side,
            generation,
        })
    }

    /// Apply a successful upload. Non-Aadhaar slots take the file URL and
    /// the extraction wholesale; an Aadhaar side stores its URL and
    /// shallow-merges the new extraction over what the other side already
    /// delivered.
    pub fn complete_success(&mut self, ticket: &UploadTicket, update: SlotUpdate) -> Completion {
        let slot = self
            .slots
            .get_mut(&ticket.document_type)
            .expect("registry holds all document types");

        match (slot, ticket.side) {
            (DocumentSlot::TwoSided(slot), Some(side)) => {
                if slot.side(side).generation != ticket.generation {
                    return stale(ticket);
                }
                let state = slot.side_mut(side);
                state.status = SideStatus::Uploaded;
                state.url = update.file_url;
                if let Some(extraction) = update.extraction {
                    match &mut slot.extracted {
                        Some(stored) => stored.merge_over(&extraction),
                        None => slot.extracted = Some(extraction),
                    }
                }
            }
            (DocumentSlot::Standard(slot), None) => {
                if slot.generation != ticket.generation {
                    return stale(ticket);
                }
                slot.status = SlotStatus::Uploaded;
                slot.file_url = update.file_url;
                slot.resolved_type = update.resolved_type.or(Some(ticket.document_type));
                slot.extracted = update.extraction;
                slot.uploaded_at = Some(Utc::now());
            }
            _ => return stale(ticket),
        }

        Completion::Applied
    }

    /// Apply a failed upload: the status flips to error but previously
    /// stored URLs and extractions survive, so a failed retry does not
    /// erase earlier successful data.
    pub fn complete_failure(&mut self, ticket: &UploadTicket) -> Completion {
        let slot = self
            .slots
            .get_mut(&ticket.document_type)
            .expect("registry holds all document types");

        match (slot, ticket.side) {
            (DocumentSlot::TwoSided(slot), Some(side)) => {
                if slot.side(side).generation != ticket.generation {
                    return stale(ticket);
                }
                slot.side_mut(side).status = SideStatus::Error;
            }
            (DocumentSlot::Standard(slot), None) => {
                if slot.generation != ticket.generation {
                    return stale(ticket);
                }
                slot.status = SlotStatus::Error;
            }
            _ => return stale(ticket),
        }

        Completion::Applied
    }

    /// Restore a slot to its documented initial empty value.
    pub fn reset(&mut self, document_type: DocumentType) {
        self.slots
            .insert(document_type, DocumentSlot::new(document_type));
    }

    /// Fold the server's document listing into the slots. Returns the
    /// marksheet entry's payload, if any, for the caller to run through
    /// the extraction merger.
    pub fn absorb_listing(
        &mut self,
        documents: &serde_json::Map<String, Value>,
    ) -> Option<Extraction> {
        let mut marksheet_payload = None;

        for (key, value) in documents {
            let Some(document_type) = DocumentType::from_wire(key) else {
                debug!(key, "ignoring unknown document type in listing");
                continue;
            };
            let Some(entry) = value.as_object() else {
                continue;
            };

            let slot = self
                .slots
                .get_mut(&document_type)
                .expect("registry holds all document types");

            match slot {
                DocumentSlot::TwoSided(slot) => {
                    let front_url = object_url(entry, "frontUrl").or_else(|| object_url(entry, "fileUrl"));
                    let back_url = object_url(entry, "backUrl");
                    slot.front.status = if front_url.is_some() {
                        SideStatus::Uploaded
                    } else {
                        SideStatus::Idle
                    };
                    slot.front.url = front_url;
                    slot.back.status = if back_url.is_some() {
                        SideStatus::Uploaded
                    } else {
                        SideStatus::Idle
                    };
                    slot.back.url = back_url;
                    slot.extracted = Some(Extraction(entry.clone()));
                }
                DocumentSlot::Standard(slot) => {
                    let file_url = object_url(entry, "fileUrl");
                    slot.status = if file_url.is_some() {
                        SlotStatus::Uploaded
                    } else {
                        SlotStatus::MetadataFound
                    };
                    slot.file_url = file_url;
                    slot.resolved_type = entry
                        .get("documentType")
                        .and_then(Value::as_str)
                        .and_then(DocumentType::from_wire);
                    slot.extracted = Some(Extraction(entry.clone()));
                }
            }

            if document_type == DocumentType::Marksheet {
                marksheet_payload = Some(Extraction(entry.clone()));
            }
        }

        marksheet_payload
    }
}

impl Default for SlotRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn stale(ticket: &UploadTicket) -> Completion {
    warn!(
        document = ticket.document_type.as_str(),
        side = ticket.side.map(|s| s.as_str()),
        "dropping stale upload completion"
    );
    Completion::Stale
}

fn object_url(entry: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match entry.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
