//! Enrollment session controller.
//!
//! Owns everything the intake form owns: the active student, the form
//! fields, the document slots, the marksheet list, and the id sequences.
//! All mutation flows through here, driven by operator actions and by
//! responses from the backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{
    ApiClient, ApiError, ApiTransport, DataEnvelope, FilePayload, StudentEnvelope, UploadEnvelope,
};
use crate::config::Config;
use crate::models::{
    AadhaarSide, DocumentType, EnrollmentFields, Extraction, MarksheetRecord, RecordIds,
    SlotStatus, StudentRecord,
};
use crate::services::marksheets::{self, InsertOutcome};
use crate::services::merge;
use crate::services::records::{ManualRecordStore, RecordState, SaveKind};
use crate::services::slots::{Completion, SlotError, SlotRegistry, SlotUpdate};
use crate::services::upload::UploadCoordinator;

#[derive(Debug, Error)]
pub enum SessionError {
    /// No upload or record operation may run before a student exists.
    #[error("no active student; create or load a student first")]
    NoActiveStudent,

    #[error("failed to upload {document}: {source}")]
    Upload {
        document: &'static str,
        #[source]
        source: ApiError,
    },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Slot(#[from] SlotError),

    #[error("could not read {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What one upload did, for presentation to the operator.
#[derive(Debug)]
pub struct UploadReport {
    pub document: &'static str,
    pub status: SlotStatus,
    pub file_url: Option<String>,
    /// Form fields filled from the extraction.
    pub merged_fields: Vec<&'static str>,
    /// Set when the extraction produced a marksheet insert.
    pub marksheet_outcome: Option<InsertOutcome>,
}

/// One operator's enrollment workspace for one student.
pub struct EnrollmentSession {
    api: ApiClient,
    coordinator: Arc<UploadCoordinator>,
    student: Option<StudentRecord>,
    pub fields: EnrollmentFields,
    slots: SlotRegistry,
    pub marksheets: Vec<MarksheetRecord>,
    ids: RecordIds,
    records: ManualRecordStore,
}

impl EnrollmentSession {
    pub fn new(config: &Config, transport: Arc<dyn ApiTransport>) -> Self {
        let api = ApiClient::new(&config.api_base_url, &config.school_id);
        let coordinator = Arc::new(UploadCoordinator::new(transport));
        let mut ids = RecordIds::new();
        let marksheets = vec![MarksheetRecord::placeholder(&mut ids)];
        Self {
            records: ManualRecordStore::new(api.clone(), coordinator.clone()),
            api,
            coordinator,
            student: None,
            fields: EnrollmentFields::default(),
            slots: SlotRegistry::new(),
            marksheets,
            ids,
        }
    }

    pub fn student(&self) -> Option<&StudentRecord> {
        self.student.as_ref()
    }

    pub fn slots(&self) -> &SlotRegistry {
        &self.slots
    }

    fn require_student(&self) -> Result<&StudentRecord, SessionError> {
        self.student.as_ref().ok_or(SessionError::NoActiveStudent)
    }

    /// Create a fresh student for a class and make it the active one.
    pub async fn create_student(
        &mut self,
        class_name: &str,
    ) -> Result<&StudentRecord, SessionError> {
        let request = self.api.create_student(class_name);
        let value = self.coordinator.execute(&request).await?;
        let student = parse_student(value, "student create returned no data")?;

        // The placeholder marksheet inherits the admission class.
        if let Some(class) = &student.class_name {
            if let Some(first) = self.marksheets.first_mut() {
                first.class_name = class.clone();
            }
        }

        info!(student_id = %student.student_id, class = ?student.class_name, "student created");
        Ok(&*self.student.insert(student))
    }

    /// Load an existing student, populate the form from its stored data,
    /// and pull the document listing. A listing failure does not undo the
    /// load; it is logged and the slots stay as they were.
    pub async fn load_student(&mut self, student_id: &str) -> Result<(), SessionError> {
        let request = self.api.get_student(student_id);
        let value = self.coordinator.execute(&request).await?;
        let student = parse_student(value, "student not found")?;

        if let Some(data) = student_data_object(&student) {
            self.fields.populate_from_student(&data);
        }
        info!(student_id = %student.student_id, "student loaded");
        self.student = Some(student);

        if let Err(error) = self.refresh_documents().await {
            warn!(%error, "failed to fetch initial document list");
        }
        Ok(())
    }

    /// Re-sync slots from the server's document listing. A marksheet
    /// entry in the listing runs through the extraction merger exactly
    /// like a fresh upload. Returns the number of listed documents.
    pub async fn refresh_documents(&mut self) -> Result<usize, SessionError> {
        let student_id = self.require_student()?.student_id.clone();
        let request = self.api.list_documents(&student_id);

        let result = self.coordinator.execute(&request).await;
        match result {
            Ok(value) => {
                let envelope: DataEnvelope = serde_json::from_value(value).unwrap_or_default();
                match envelope.documents {
                    Some(documents) if envelope.is_success() => {
                        let count = documents.len();
                        if let Some(payload) = self.slots.absorb_listing(&documents) {
                            self.ingest_marksheet_extraction(&payload);
                        }
                        Ok(count)
                    }
                    _ => {
                        debug!("no prior document data found");
                        Ok(0)
                    }
                }
            }
            // A refusal here is the backend's way of saying the student
            // has no document box yet.
            Err(ApiError::Rejected(message)) => {
                debug!(%message, "no prior document data found");
                Ok(0)
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Upload a single-file document through the full pipeline.
    pub async fn upload_document(
        &mut self,
        document_type: DocumentType,
        path: &Path,
    ) -> Result<UploadReport, SessionError> {
        self.run_upload(document_type, None, path).await
    }

    /// Upload one side of the Aadhaar card.
    pub async fn upload_aadhaar_side(
        &mut self,
        side: AadhaarSide,
        path: &Path,
    ) -> Result<UploadReport, SessionError> {
        self.run_upload(DocumentType::Aadhaar, Some(side), path).await
    }

    async fn run_upload(
        &mut self,
        document_type: DocumentType,
        side: Option<AadhaarSide>,
        path: &Path,
    ) -> Result<UploadReport, SessionError> {
        let student_id = self.require_student()?.student_id.clone();
        let payload = build_payload(path, document_type, side)?;
        let ticket = self.slots.begin_upload(document_type, side)?;
        let request = self.api.upload_document(&student_id, payload);

        let result = self.coordinator.execute(&request).await;
        match result {
            Ok(value) => {
                let envelope: UploadEnvelope = serde_json::from_value(value).unwrap_or_default();
                let resolved = envelope
                    .document_type
                    .as_deref()
                    .and_then(DocumentType::from_wire);
                let extraction = envelope.extraction();

                let completion = self.slots.complete_success(
                    &ticket,
                    SlotUpdate {
                        file_url: envelope.file_url.clone(),
                        resolved_type: resolved,
                        extraction: extraction.clone(),
                    },
                );

                let mut merged_fields = Vec::new();
                let mut marksheet_outcome = None;
                if completion == Completion::Applied
                    && side.is_none()
                    && resolved == Some(DocumentType::Marksheet)
                {
                    if let Some(extraction) = &extraction {
                        if let Some((filled, outcome)) =
                            self.ingest_marksheet_extraction(extraction)
                        {
                            merged_fields = filled;
                            marksheet_outcome = Some(outcome);
                        }
                    }
                }

                info!(
                    document = document_type.as_str(),
                    side = side.map(|s| s.as_str()),
                    "upload complete"
                );
                Ok(UploadReport {
                    document: document_type.display_name(),
                    status: self.slots.slot(document_type).status(),
                    file_url: envelope.file_url,
                    merged_fields,
                    marksheet_outcome,
                })
            }
            Err(error) => {
                self.slots.complete_failure(&ticket);
                Err(SessionError::Upload {
                    document: document_type.display_name(),
                    source: error,
                })
            }
        }
    }

    /// Merge a marksheet extraction into the form and the record list.
    /// Payloads that do not declare themselves marksheets are ignored.
    fn ingest_marksheet_extraction(
        &mut self,
        extraction: &Extraction,
    ) -> Option<(Vec<&'static str>, InsertOutcome)> {
        if extraction.text("documentType").as_deref() != Some("marksheet") {
            return None;
        }
        let filled = merge::merge_into_form(&mut self.fields, extraction);
        let record = merge::marksheet_from_extraction(extraction, &mut self.ids);
        let outcome = marksheets::insert_extracted(&mut self.marksheets, record);
        Some((filled, outcome))
    }

    /// Clear a slot back to its initial empty value.
    pub fn reset_slot(&mut self, document_type: DocumentType) {
        self.slots.reset(document_type);
    }

    pub fn record_state(&self, document_type: DocumentType) -> RecordState {
        self.records.state(document_type)
    }

    /// Open the structured-record editor for a type: fetch the stored
    /// record, or pre-populate from this slot's extraction when none is
    /// stored yet.
    pub async fn open_record(
        &mut self,
        document_type: DocumentType,
    ) -> Result<&serde_json::Map<String, Value>, SessionError> {
        let student_id = self.require_student()?.student_id.clone();
        let extraction = self.slots.slot(document_type).extracted().cloned();
        let draft = self
            .records
            .fetch(&student_id, document_type, extraction.as_ref())
            .await?;
        Ok(draft)
    }

    /// Persist a structured record, then re-sync the document listing so
    /// local state reflects the server's authoritative view.
    pub async fn save_record(
        &mut self,
        document_type: DocumentType,
        data: serde_json::Map<String, Value>,
    ) -> Result<SaveKind, SessionError> {
        let student_id = self.require_student()?.student_id.clone();
        let kind = self.records.save(&student_id, document_type, data).await?;
        self.refresh_documents().await?;
        Ok(kind)
    }

    /// Delete a structured record, then re-sync. The caller must have
    /// confirmed the deletion with the operator.
    pub async fn delete_record(
        &mut self,
        document_type: DocumentType,
    ) -> Result<String, SessionError> {
        let student_id = self.require_student()?.student_id.clone();
        let message = self.records.delete(&student_id, document_type).await?;
        self.refresh_documents().await?;
        Ok(message)
    }

    /// Append a blank marksheet for manual entry. Returns its id.
    pub fn add_marksheet(&mut self) -> u64 {
        marksheets::add_blank(&mut self.marksheets, &mut self.ids)
    }

    /// Remove a marksheet; refused while only one record exists.
    pub fn remove_marksheet(&mut self, id: u64) -> bool {
        marksheets::remove_record(&mut self.marksheets, id)
    }

    pub fn add_subject(&mut self, marksheet_id: u64) -> Option<u64> {
        marksheets::add_subject(&mut self.marksheets, marksheet_id, &mut self.ids)
    }

    pub fn remove_subject(&mut self, marksheet_id: u64, subject_id: u64) -> bool {
        marksheets::remove_subject(&mut self.marksheets, marksheet_id, subject_id)
    }
}

fn parse_student(value: Value, missing: &str) -> Result<StudentRecord, SessionError> {
    let envelope: StudentEnvelope = serde_json::from_value(value).unwrap_or_default();
    let data = match (envelope.success, envelope.data) {
        (true, Some(data)) => data,
        _ => {
            return Err(SessionError::Api(ApiError::Rejected(
                envelope.message.unwrap_or_else(|| missing.to_string()),
            )))
        }
    };
    serde_json::from_value(data)
        .map_err(|e| SessionError::Api(ApiError::Rejected(format!("unexpected student payload: {e}"))))
}

/// The student payload as a JSON object for form population.
fn student_data_object(student: &StudentRecord) -> Option<serde_json::Map<String, Value>> {
    serde_json::to_value(student).ok().and_then(|v| match v {
        Value::Object(map) => Some(map),
        _ => None,
    })
}

fn build_payload(
    path: &Path,
    document_type: DocumentType,
    side: Option<AadhaarSide>,
) -> Result<FilePayload, SessionError> {
    let content = std::fs::read(path).map_err(|source| SessionError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload")
        .to_string();
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    let mut fields = vec![(
        "documentType".to_string(),
        document_type.as_str().to_string(),
    )];
    if let Some(side) = side {
        fields.push(("side".to_string(), side.as_str().to_string()));
    }
    // Marksheets are multi-instance server-side; successive uploads use
    // an index slot.
    if document_type == DocumentType::Marksheet {
        fields.push(("indexNumber".to_string(), "1".to_string()));
    }

    Ok(FilePayload {
        file_name,
        content,
        mime_type,
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::io::Write;
    use url::Url;

    use crate::api::{ApiRequest, RawResponse};

    struct StaticTransport {
        body: Value,
    }

    #[async_trait]
    impl ApiTransport for StaticTransport {
        async fn execute(&self, _request: &ApiRequest) -> Result<RawResponse, ApiError> {
            Ok(RawResponse {
                status: 200,
                body: self.body.to_string(),
            })
        }
    }

    fn config() -> Config {
        Config {
            api_base_url: Url::parse("http://backend.test/api").unwrap(),
            school_id: "342635".to_string(),
            request_timeout: std::time::Duration::from_secs(30),
        }
    }

    fn session(body: Value) -> EnrollmentSession {
        EnrollmentSession::new(&config(), Arc::new(StaticTransport { body }))
    }

    #[tokio::test]
    async fn test_upload_requires_active_student() {
        let mut session = session(json!({"success": true}));
        let error = session
            .upload_document(DocumentType::Photo, Path::new("/nonexistent.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(error, SessionError::NoActiveStudent));
        // The precondition failed before any state change.
        assert_eq!(
            session.slots().slot(DocumentType::Photo).status(),
            SlotStatus::Idle
        );
    }

    #[tokio::test]
    async fn test_create_student_sets_placeholder_class() {
        let mut session = session(json!({
            "success": true,
            "data": {"studentId": "s-1", "className": "class-10"}
        }));
        let student = session.create_student("class-10").await.unwrap();
        assert_eq!(student.student_id, "s-1");
        assert_eq!(session.marksheets[0].class_name, "class-10");
    }

    #[tokio::test]
    async fn test_upload_failure_names_document() {
        let mut session = session(json!({
            "success": true,
            "data": {"studentId": "s-1", "className": "class-10"}
        }));
        session.create_student("class-10").await.unwrap();

        let mut file = tempfile::NamedTempFile::with_suffix(".pdf").unwrap();
        file.write_all(b"%PDF-1.4 stub").unwrap();

        // The backend now refuses everything.
        let mut refusing = EnrollmentSession::new(
            &config(),
            Arc::new(StaticTransport {
                body: json!({"success": false, "message": "file too large"}),
            }),
        );
        refusing.student = session.student.take();

        let error = refusing
            .upload_document(DocumentType::BirthCertificate, file.path())
            .await
            .unwrap_err();
        let rendered = error.to_string();
        assert!(rendered.contains("Birth Certificate"), "{rendered}");
        assert!(rendered.contains("file too large"), "{rendered}");
        assert_eq!(
            refusing.slots().slot(DocumentType::BirthCertificate).status(),
            SlotStatus::Error
        );
    }

    #[tokio::test]
    async fn test_marksheet_upload_merges_and_inserts() {
        let mut session = session(json!({
            "success": true,
            "fileUrl": "https://files.test/ms.pdf",
            "documentType": "marksheet",
            "extractedData": {
                "documentType": "marksheet",
                "rollNumber": "12",
                "className": "class-10",
                "schoolName": "ABC",
                "boardUniversity": "CBSE",
                "totalMaxMarksOrGrade": "500",
                "totalObtainedMarksOrGrade": "450",
                "subjects": [
                    {"subject": "Maths", "obtainedMarksOrGrade": "95", "maxMarksOrGrade": "100"}
                ]
            }
        }));
        session.student = Some(StudentRecord {
            student_id: "s-1".to_string(),
            class_name: Some("class-10".to_string()),
            extra: serde_json::Map::new(),
        });

        let mut file = tempfile::NamedTempFile::with_suffix(".pdf").unwrap();
        file.write_all(b"%PDF-1.4 stub").unwrap();

        let report = session
            .upload_document(DocumentType::Marksheet, file.path())
            .await
            .unwrap();

        assert_eq!(report.status, SlotStatus::Uploaded);
        assert_eq!(report.marksheet_outcome, Some(InsertOutcome::ReplacedPlaceholder));
        assert_eq!(session.marksheets.len(), 1);
        assert_eq!(session.marksheets[0].roll_number, "12");
        assert_eq!(session.fields.previous_school, "ABC");
        assert_eq!(session.fields.board, "CBSE");
    }
}
