//! Document slot models for per-student intake tracking.
//!
//! Every student gets a fixed set of slots, one per known document type.
//! Aadhaar is two-sided and tracks each side independently; all other
//! types are single-file slots. Slots are created empty at form
//! initialization and are only ever mutated through the slot registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Document categories accepted by the intake pipeline.
///
/// The serialized form matches the backend's compact wire keys
/// (`birthcertificate`, `bankpassbook`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Photo,
    Aadhaar,
    BirthCertificate,
    TransferCertificate,
    DomicileCertificate,
    CasteCertificate,
    IncomeCertificate,
    BankPassbook,
    Marksheet,
    Other,
}

impl DocumentType {
    /// All document types, in the order the intake form presents them.
    pub const ALL: [DocumentType; 10] = [
        Self::Photo,
        Self::Aadhaar,
        Self::BirthCertificate,
        Self::TransferCertificate,
        Self::DomicileCertificate,
        Self::CasteCertificate,
        Self::IncomeCertificate,
        Self::BankPassbook,
        Self::Marksheet,
        Self::Other,
    ];

    /// Backend wire key for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Aadhaar => "aadhaar",
            Self::BirthCertificate => "birthcertificate",
            Self::TransferCertificate => "transfercertificate",
            Self::DomicileCertificate => "domicilecertificate",
            Self::CasteCertificate => "castecertificate",
            Self::IncomeCertificate => "incomecertificate",
            Self::BankPassbook => "bankpassbook",
            Self::Marksheet => "marksheet",
            Self::Other => "other",
        }
    }

    /// Parse a backend wire key.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "photo" => Some(Self::Photo),
            "aadhaar" => Some(Self::Aadhaar),
            "birthcertificate" => Some(Self::BirthCertificate),
            "transfercertificate" => Some(Self::TransferCertificate),
            "domicilecertificate" => Some(Self::DomicileCertificate),
            "castecertificate" => Some(Self::CasteCertificate),
            "incomecertificate" => Some(Self::IncomeCertificate),
            "bankpassbook" => Some(Self::BankPassbook),
            "marksheet" => Some(Self::Marksheet),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Parse user input: accepts the wire key or a hyphenated form
    /// (`birth-certificate`), case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        Self::from_wire(&s.to_lowercase().replace(['-', '_', ' '], ""))
    }

    /// Human-facing name shown by the intake form.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Photo => "Photo",
            Self::Aadhaar => "Aadhar Card",
            Self::BirthCertificate => "Birth Certificate",
            Self::TransferCertificate => "Transfer Certificate",
            Self::DomicileCertificate => "Domicile Certificate",
            Self::CasteCertificate => "Caste Certificate",
            Self::IncomeCertificate => "Income Certificate",
            Self::BankPassbook => "Bank Pass Book",
            Self::Marksheet => "Marksheets",
            Self::Other => "Others",
        }
    }

    /// Whether this type is tracked as two independent sides.
    pub fn is_two_sided(&self) -> bool {
        matches!(self, Self::Aadhaar)
    }
}

/// Upload lifecycle status of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Idle,
    Uploading,
    Uploaded,
    /// Exactly one side of a two-sided document is uploaded.
    Partial,
    /// The backend holds structured data for this type but no file.
    MetadataFound,
    Error,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Uploaded => "uploaded",
            Self::Partial => "partial",
            Self::MetadataFound => "metadata_found",
            Self::Error => "error",
        }
    }
}

/// Upload status of one side of a two-sided document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideStatus {
    #[default]
    Idle,
    Uploading,
    Uploaded,
    Error,
}

impl SideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Uploaded => "uploaded",
            Self::Error => "error",
        }
    }
}

/// Which side of a two-sided document a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AadhaarSide {
    Front,
    Back,
}

impl AadhaarSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "front" => Some(Self::Front),
            "back" => Some(Self::Back),
            _ => None,
        }
    }
}

/// Structured field data returned by the extraction service for one
/// document. Schemas differ per document type, so the payload stays a
/// JSON object with typed accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extraction(pub serde_json::Map<String, Value>);

impl Extraction {
    /// Wrap a JSON value, accepting only objects.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Field value as non-empty text. Numbers are stringified since the
    /// extraction service is inconsistent about marks being strings.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Shallow-merge `newer` over this payload. Fields absent from the
    /// newer payload survive; each Aadhaar side delivers partial data.
    pub fn merge_over(&mut self, newer: &Extraction) {
        for (key, value) in &newer.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// State of one side of a two-sided document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SideState {
    pub status: SideStatus,
    pub url: Option<String>,
    /// Bumped on every begin; completions carrying an older value are stale.
    #[serde(skip)]
    pub(crate) generation: u64,
}

/// Single-file slot state.
#[derive(Debug, Clone, Serialize)]
pub struct StandardSlot {
    pub status: SlotStatus,
    pub file_url: Option<String>,
    /// Document type the server resolved for the uploaded file.
    pub resolved_type: Option<DocumentType>,
    pub extracted: Option<Extraction>,
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub(crate) generation: u64,
}

impl StandardSlot {
    fn empty() -> Self {
        Self {
            status: SlotStatus::Idle,
            file_url: None,
            resolved_type: None,
            extracted: None,
            uploaded_at: None,
            generation: 0,
        }
    }
}

/// Two-sided slot state (Aadhaar).
#[derive(Debug, Clone, Serialize)]
pub struct TwoSidedSlot {
    pub front: SideState,
    pub back: SideState,
    /// Accumulated extraction, merged additively across side uploads.
    pub extracted: Option<Extraction>,
}

impl TwoSidedSlot {
    fn empty() -> Self {
        Self {
            front: SideState::default(),
            back: SideState::default(),
            extracted: None,
        }
    }

    pub fn side(&self, side: AadhaarSide) -> &SideState {
        match side {
            AadhaarSide::Front => &self.front,
            AadhaarSide::Back => &self.back,
        }
    }

    pub(crate) fn side_mut(&mut self, side: AadhaarSide) -> &mut SideState {
        match side {
            AadhaarSide::Front => &mut self.front,
            AadhaarSide::Back => &mut self.back,
        }
    }

    /// Aggregate status derived from both sides: uploaded when both sides
    /// are in, partial when exactly one is, error when a side failed and
    /// nothing is uploaded yet.
    pub fn aggregate_status(&self) -> SlotStatus {
        let front = self.front.status;
        let back = self.back.status;
        if front == SideStatus::Uploaded && back == SideStatus::Uploaded {
            SlotStatus::Uploaded
        } else if front == SideStatus::Uploaded || back == SideStatus::Uploaded {
            SlotStatus::Partial
        } else if front == SideStatus::Error || back == SideStatus::Error {
            SlotStatus::Error
        } else if front == SideStatus::Uploading || back == SideStatus::Uploading {
            SlotStatus::Uploading
        } else {
            SlotStatus::Idle
        }
    }
}

/// Upload state for one document type belonging to one student.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DocumentSlot {
    Standard(StandardSlot),
    TwoSided(TwoSidedSlot),
}

impl DocumentSlot {
    /// Create the documented initial empty value for a type.
    pub fn new(document_type: DocumentType) -> Self {
        if document_type.is_two_sided() {
            Self::TwoSided(TwoSidedSlot::empty())
        } else {
            Self::Standard(StandardSlot::empty())
        }
    }

    /// Current status; derived from both sides for two-sided slots.
    pub fn status(&self) -> SlotStatus {
        match self {
            Self::Standard(slot) => slot.status,
            Self::TwoSided(slot) => slot.aggregate_status(),
        }
    }

    pub fn extracted(&self) -> Option<&Extraction> {
        match self {
            Self::Standard(slot) => slot.extracted.as_ref(),
            Self::TwoSided(slot) => slot.extracted.as_ref(),
        }
    }

    /// Stored file URL; for two-sided slots the front side's URL.
    pub fn file_url(&self) -> Option<&str> {
        match self {
            Self::Standard(slot) => slot.file_url.as_deref(),
            Self::TwoSided(slot) => slot.front.url.as_deref(),
        }
    }

    pub fn as_standard(&self) -> Option<&StandardSlot> {
        match self {
            Self::Standard(slot) => Some(slot),
            Self::TwoSided(_) => None,
        }
    }

    pub fn as_two_sided(&self) -> Option<&TwoSidedSlot> {
        match self {
            Self::TwoSided(slot) => Some(slot),
            Self::Standard(_) => None,
        }
    }
}
