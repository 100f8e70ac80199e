//! Wire envelopes for the school backend's JSON responses.
//!
//! The backend speaks two envelope dialects: the student and upload
//! services wrap results in `{ success: bool, ... }`, while the document
//! box wraps them in `{ status: "success", ... }`. Both are tolerated
//! everywhere fields overlap.

use serde::Deserialize;
use serde_json::Value;

use crate::models::Extraction;

/// Raw HTTP response as seen by the retry loop: status plus body text,
/// before any JSON interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Leading slice of the body for error messages.
    pub fn snippet(&self) -> String {
        let trimmed = self.body.trim();
        let mut end = trimmed.len().min(200);
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        trimmed[..end].to_string()
    }
}

/// Response to a multipart document upload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadEnvelope {
    pub success: bool,
    pub file_url: Option<String>,
    pub document_type: Option<String>,
    pub extracted_data: Option<Value>,
    /// The Aadhaar path reports extraction under `data` instead.
    pub data: Option<Value>,
    pub message: Option<String>,
}

impl UploadEnvelope {
    /// The extraction payload, whichever key it arrived under.
    pub fn extraction(&self) -> Option<Extraction> {
        self.extracted_data
            .clone()
            .or_else(|| self.data.clone())
            .and_then(Extraction::from_value)
    }
}

/// Document-box envelope: manual records and the document listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DataEnvelope {
    pub status: Option<String>,
    pub data: Option<Value>,
    pub message: Option<String>,
    pub documents: Option<serde_json::Map<String, Value>>,
}

impl DataEnvelope {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }

    /// Stored record data, required to be an object.
    pub fn data_object(&self) -> Option<&serde_json::Map<String, Value>> {
        self.data.as_ref().and_then(Value::as_object)
    }
}

/// Student-service envelope.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StudentEnvelope {
    pub success: bool,
    pub data: Option<Value>,
    pub message: Option<String>,
}
