//! HTTP transport and endpoint builders for the school backend.
//!
//! The transport is a trait so the pipeline can be driven against a
//! scripted fake in tests; production plugs in a reqwest client.

mod envelope;
mod error;

pub use envelope::{DataEnvelope, RawResponse, StudentEnvelope, UploadEnvelope};
pub use error::ApiError;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::models::DocumentType;

/// HTTP method of a backend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// One file plus the metadata fields that accompany it in the multipart
/// body. Owned bytes so the form can be rebuilt on every retry attempt.
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub file_name: String,
    pub content: Vec<u8>,
    pub mime_type: String,
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(FilePayload),
}

/// A fully built backend request, ready for any number of attempts.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: RequestBody,
}

/// Executes one request attempt. Implementations report transport
/// failures as `ApiError::Transport`; HTTP status interpretation is the
/// caller's concern.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, ApiError>;
}

/// Production transport over reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, ApiError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        debug!(method = method.as_str(), url = %request.url, "dispatching request");

        let mut builder = self.client.request(method, &request.url);
        match &request.body {
            RequestBody::Empty => {}
            RequestBody::Json(value) => {
                builder = builder.json(value);
            }
            RequestBody::Multipart(payload) => {
                let part = reqwest::multipart::Part::bytes(payload.content.clone())
                    .file_name(payload.file_name.clone())
                    .mime_str(&payload.mime_type)
                    .map_err(|e| ApiError::Transport(e.to_string()))?;
                let mut form = reqwest::multipart::Form::new();
                for (name, value) in &payload.fields {
                    form = form.text(name.clone(), value.clone());
                }
                form = form.part("file", part);
                builder = builder.multipart(form);
            }
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(RawResponse { status, body })
    }
}

/// Builds requests against the backend for one school.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: String,
    school_id: String,
}

impl ApiClient {
    pub fn new(base: &Url, school_id: &str) -> Self {
        Self {
            base: base.as_str().trim_end_matches('/').to_string(),
            school_id: school_id.to_string(),
        }
    }

    pub fn school_id(&self) -> &str {
        &self.school_id
    }

    /// `POST {base}/students/{schoolId}/students`
    pub fn create_student(&self, class_name: &str) -> ApiRequest {
        ApiRequest {
            method: Method::Post,
            url: format!("{}/students/{}/students", self.base, self.school_id),
            body: RequestBody::Json(serde_json::json!({ "className": class_name })),
        }
    }

    /// `GET {base}/students/{schoolId}/students/{studentId}`
    pub fn get_student(&self, student_id: &str) -> ApiRequest {
        ApiRequest {
            method: Method::Get,
            url: format!(
                "{}/students/{}/students/{}",
                self.base, self.school_id, student_id
            ),
            body: RequestBody::Empty,
        }
    }

    /// `POST {base}/documentUpload/{schoolId}/student/{studentId}`
    pub fn upload_document(&self, student_id: &str, payload: FilePayload) -> ApiRequest {
        ApiRequest {
            method: Method::Post,
            url: format!(
                "{}/documentUpload/{}/student/{}",
                self.base, self.school_id, student_id
            ),
            body: RequestBody::Multipart(payload),
        }
    }

    /// `GET {base}/documentbox/{schoolId}/students/{studentId}/documents`
    pub fn list_documents(&self, student_id: &str) -> ApiRequest {
        ApiRequest {
            method: Method::Get,
            url: format!(
                "{}/documentbox/{}/students/{}/documents",
                self.base, self.school_id, student_id
            ),
            body: RequestBody::Empty,
        }
    }

    fn record_url(&self, student_id: &str, document_type: DocumentType) -> String {
        format!(
            "{}/documentbox/{}/students/{}/documents/{}",
            self.base,
            self.school_id,
            student_id,
            document_type.as_str()
        )
    }

    /// `GET {base}/documentbox/.../documents/{documentType}`
    pub fn get_record(&self, student_id: &str, document_type: DocumentType) -> ApiRequest {
        ApiRequest {
            method: Method::Get,
            url: self.record_url(student_id, document_type),
            body: RequestBody::Empty,
        }
    }

    /// `POST|PUT {base}/documentbox/.../documents/{documentType}` with a
    /// `{ "data": ... }` body; the method encodes create vs. update.
    pub fn save_record(
        &self,
        student_id: &str,
        document_type: DocumentType,
        method: Method,
        data: &serde_json::Map<String, Value>,
    ) -> ApiRequest {
        ApiRequest {
            method,
            url: self.record_url(student_id, document_type),
            body: RequestBody::Json(serde_json::json!({ "data": data })),
        }
    }

    /// `DELETE {base}/documentbox/.../documents/{documentType}`
    pub fn delete_record(&self, student_id: &str, document_type: DocumentType) -> ApiRequest {
        ApiRequest {
            method: Method::Delete,
            url: self.record_url(student_id, document_type),
            body: RequestBody::Empty,
        }
    }
}
