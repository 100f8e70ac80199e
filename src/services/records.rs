//! Manual structured-record store.
//!
//! Each document type can carry a structured record on the backend,
//! independent of any uploaded file. Whether one exists is unknown until
//! fetched; the answer drives create-vs-update on save and pre-population
//! of the editable draft from slot extraction data.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::api::{ApiClient, ApiError, DataEnvelope, Method};
use crate::models::{DocumentType, Extraction};
use crate::services::upload::UploadCoordinator;

/// Server-side existence of the record for one document type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordState {
    #[default]
    Unknown,
    Found,
    NotFound,
}

/// Whether a save created or updated the server record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    Created,
    Updated,
}

/// Structured-data CRUD for a student's document types.
pub struct ManualRecordStore {
    api: ApiClient,
    coordinator: Arc<UploadCoordinator>,
    states: HashMap<DocumentType, RecordState>,
    drafts: HashMap<DocumentType, serde_json::Map<String, Value>>,
}

impl ManualRecordStore {
    pub fn new(api: ApiClient, coordinator: Arc<UploadCoordinator>) -> Self {
        Self {
            api,
            coordinator,
            states: HashMap::new(),
            drafts: HashMap::new(),
        }
    }

    pub fn state(&self, document_type: DocumentType) -> RecordState {
        self.states.get(&document_type).copied().unwrap_or_default()
    }

    /// The editable draft loaded or pre-populated by the last fetch.
    pub fn draft(&self, document_type: DocumentType) -> Option<&serde_json::Map<String, Value>> {
        self.drafts.get(&document_type)
    }

    /// Fetch the stored record. A not-found answer is a recognized state,
    /// not an error: the draft is pre-populated from the slot's extraction
    /// when one exists so the operator does not retype OCR'd values. Any
    /// other failure leaves the state unchanged.
    pub async fn fetch(
        &mut self,
        student_id: &str,
        document_type: DocumentType,
        slot_extraction: Option<&Extraction>,
    ) -> Result<&serde_json::Map<String, Value>, ApiError> {
        let request = self.api.get_record(student_id, document_type);
        let result = self.coordinator.execute(&request).await;
        match result {
            Ok(value) => {
                let envelope: DataEnvelope = serde_json::from_value(value).unwrap_or_default();
                match envelope.data_object() {
                    Some(data) if envelope.is_success() => {
                        self.states.insert(document_type, RecordState::Found);
                        self.drafts.insert(document_type, data.clone());
                        info!(document = document_type.as_str(), "record loaded from server");
                    }
                    _ => {
                        return Err(ApiError::Rejected(
                            envelope
                                .message
                                .unwrap_or_else(|| "failed to parse document data".to_string()),
                        ));
                    }
                }
            }
            Err(error) if error.is_not_found() => {
                self.states.insert(document_type, RecordState::NotFound);
                let draft = match slot_extraction {
                    Some(extraction) => {
                        debug!(
                            document = document_type.as_str(),
                            "record not stored; pre-populating from extraction"
                        );
                        extraction.0.clone()
                    }
                    None => serde_json::Map::new(),
                };
                self.drafts.insert(document_type, draft);
            }
            Err(error) => return Err(error),
        }

        Ok(&self.drafts[&document_type])
    }

    /// Persist a record: update when the last fetch found one, create
    /// otherwise. On success the draft adopts the server's returned value.
    pub async fn save(
        &mut self,
        student_id: &str,
        document_type: DocumentType,
        data: serde_json::Map<String, Value>,
    ) -> Result<SaveKind, ApiError> {
        let (method, kind) = if self.state(document_type) == RecordState::Found {
            (Method::Put, SaveKind::Updated)
        } else {
            (Method::Post, SaveKind::Created)
        };

        let request = self.api.save_record(student_id, document_type, method, &data);
        let value = self.coordinator.execute(&request).await?;
        let envelope: DataEnvelope = serde_json::from_value(value).unwrap_or_default();
        match envelope.data_object() {
            Some(stored) if envelope.is_success() => {
                self.states.insert(document_type, RecordState::Found);
                self.drafts.insert(document_type, stored.clone());
                info!(
                    document = document_type.as_str(),
                    created = kind == SaveKind::Created,
                    "record saved"
                );
                Ok(kind)
            }
            _ => Err(ApiError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "save returned no record data".to_string()),
            )),
        }
    }

    /// Delete the stored record. The caller is responsible for having
    /// confirmed the operation with the operator.
    pub async fn delete(
        &mut self,
        student_id: &str,
        document_type: DocumentType,
    ) -> Result<String, ApiError> {
        let request = self.api.delete_record(student_id, document_type);
        let value = self.coordinator.execute(&request).await?;
        let envelope: DataEnvelope = serde_json::from_value(value).unwrap_or_default();
        match envelope.message {
            Some(message) if envelope.is_success() => {
                self.states.insert(document_type, RecordState::NotFound);
                self.drafts.insert(document_type, serde_json::Map::new());
                info!(document = document_type.as_str(), "record deleted");
                Ok(message)
            }
            _ => Err(ApiError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "delete was not acknowledged".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use url::Url;

    use crate::api::{ApiRequest, ApiTransport, RawResponse};

    /// Responds per method, recording the methods seen.
    struct MethodTransport {
        responses: HashMap<&'static str, RawResponse>,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ApiTransport for MethodTransport {
        async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, ApiError> {
            self.seen
                .lock()
                .unwrap()
                .push(request.method.as_str().to_string());
            Ok(self
                .responses
                .get(request.method.as_str())
                .cloned()
                .unwrap_or(RawResponse {
                    status: 404,
                    body: r#"{"status": "error", "message": "Document not found"}"#.to_string(),
                }))
        }
    }

    fn store(responses: HashMap<&'static str, RawResponse>) -> (ManualRecordStore, Arc<MethodTransport>) {
        let transport = Arc::new(MethodTransport {
            responses,
            seen: Mutex::new(Vec::new()),
        });
        let api = ApiClient::new(&Url::parse("http://backend.test").unwrap(), "342635");
        let coordinator = Arc::new(UploadCoordinator::new(transport.clone()));
        (ManualRecordStore::new(api, coordinator), transport)
    }

    fn ok(body: Value) -> RawResponse {
        RawResponse {
            status: 200,
            body: body.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_found_loads_server_record() {
        let (mut store, _) = store(HashMap::from([(
            "GET",
            ok(json!({"status": "success", "data": {"bankName": "SBI"}})),
        )]));

        let draft = store
            .fetch("s-1", DocumentType::BankPassbook, None)
            .await
            .unwrap();
        assert_eq!(draft.get("bankName"), Some(&json!("SBI")));
        assert_eq!(store.state(DocumentType::BankPassbook), RecordState::Found);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_not_found_prepopulates_from_extraction() {
        let (mut store, _) = store(HashMap::new());
        let extraction =
            Extraction::from_value(json!({"bankName": "SBI", "ifscCode": "SBIN0001"})).unwrap();

        let draft = store
            .fetch("s-1", DocumentType::BankPassbook, Some(&extraction))
            .await
            .unwrap();
        assert_eq!(draft.get("ifscCode"), Some(&json!("SBIN0001")));
        assert_eq!(
            store.state(DocumentType::BankPassbook),
            RecordState::NotFound
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_not_found_without_extraction_is_empty() {
        let (mut store, _) = store(HashMap::new());
        let draft = store
            .fetch("s-1", DocumentType::CasteCertificate, None)
            .await
            .unwrap();
        assert!(draft.is_empty());
        assert_eq!(
            store.state(DocumentType::CasteCertificate),
            RecordState::NotFound
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_leaves_state_unchanged() {
        let (mut store, _) = store(HashMap::from([(
            "GET",
            RawResponse {
                status: 200,
                body: r#"{"status": "error", "message": "permission denied"}"#.to_string(),
            },
        )]));

        let error = store
            .fetch("s-1", DocumentType::BankPassbook, None)
            .await
            .unwrap_err();
        assert!(matches!(error, ApiError::Rejected(_)));
        assert_eq!(
            store.state(DocumentType::BankPassbook),
            RecordState::Unknown
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_uses_post_then_put() {
        let saved = json!({"status": "success", "data": {"bankName": "SBI"}});
        let (mut store, transport) = store(HashMap::from([
            ("POST", ok(saved.clone())),
            ("PUT", ok(saved.clone())),
        ]));

        let mut data = serde_json::Map::new();
        data.insert("bankName".to_string(), json!("SBI"));

        // Never fetched: existence unknown, so the first save creates.
        let kind = store
            .save("s-1", DocumentType::BankPassbook, data.clone())
            .await
            .unwrap();
        assert_eq!(kind, SaveKind::Created);

        // Now known to exist: the next save updates.
        let kind = store
            .save("s-1", DocumentType::BankPassbook, data)
            .await
            .unwrap();
        assert_eq!(kind, SaveKind::Updated);

        assert_eq!(*transport.seen.lock().unwrap(), vec!["POST", "PUT"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_resets_to_not_found() {
        let (mut store, _) = store(HashMap::from([
            ("GET", ok(json!({"status": "success", "data": {"bankName": "SBI"}}))),
            (
                "DELETE",
                ok(json!({"status": "success", "message": "Document deleted"})),
            ),
        ]));

        store
            .fetch("s-1", DocumentType::BankPassbook, None)
            .await
            .unwrap();
        let message = store.delete("s-1", DocumentType::BankPassbook).await.unwrap();
        assert_eq!(message, "Document deleted");
        assert_eq!(
            store.state(DocumentType::BankPassbook),
            RecordState::NotFound
        );
        assert!(store.draft(DocumentType::BankPassbook).unwrap().is_empty());
    }
}
