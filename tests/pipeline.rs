//! End-to-end pipeline scenarios against a scripted backend.
//!
//! Drives the enrollment session the way an operator would: create a
//! student, upload documents, watch extractions land in the form and the
//! marksheet list, and edit structured records.

use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use url::Url;

use docintake::api::{ApiError, ApiRequest, ApiTransport, Method, RawResponse, RequestBody};
use docintake::config::Config;
use docintake::models::{AadhaarSide, DocumentType, SlotStatus, PLACEHOLDER_ID};
use docintake::services::{EnrollmentSession, InsertOutcome, RecordState, SaveKind};

/// In-memory stand-in for the school backend. Upload responses are
/// scripted per call; manual records live in a map so create/update/
/// delete behave like the real document box.
struct FakeBackend {
    upload_responses: Mutex<VecDeque<Value>>,
    records: Mutex<HashMap<String, Value>>,
}

impl FakeBackend {
    fn new(upload_responses: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            upload_responses: Mutex::new(upload_responses.into()),
            records: Mutex::new(HashMap::new()),
        })
    }

    fn ok(body: Value) -> Result<RawResponse, ApiError> {
        Ok(RawResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    fn not_found() -> Result<RawResponse, ApiError> {
        Ok(RawResponse {
            status: 404,
            body: json!({"status": "error", "message": "Document not found"}).to_string(),
        })
    }
}

#[async_trait]
impl ApiTransport for FakeBackend {
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, ApiError> {
        let url = &request.url;

        if url.contains("/students/") && !url.contains("/documentbox/") {
            return Self::ok(json!({
                "success": true,
                "data": {"studentId": "s-1", "className": "class-10"}
            }));
        }

        if url.contains("/documentUpload/") {
            let response = self
                .upload_responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| json!({"success": false, "message": "no scripted response"}));
            return Self::ok(response);
        }

        if url.ends_with("/documents") {
            // Listing: nothing stored server-side in these scenarios.
            return Self::ok(json!({"status": "error", "message": "not found"}));
        }

        // Manual record endpoints: .../documents/{documentType}
        let document_type = url.rsplit('/').next().unwrap_or_default().to_string();
        match request.method {
            Method::Get => match self.records.lock().unwrap().get(&document_type) {
                Some(data) => Self::ok(json!({"status": "success", "data": data})),
                None => Self::not_found(),
            },
            Method::Post | Method::Put => {
                let data = match &request.body {
                    RequestBody::Json(body) => body["data"].clone(),
                    _ => Value::Null,
                };
                self.records
                    .lock()
                    .unwrap()
                    .insert(document_type, data.clone());
                Self::ok(json!({"status": "success", "data": data}))
            }
            Method::Delete => {
                self.records.lock().unwrap().remove(&document_type);
                Self::ok(json!({"status": "success", "message": "Document deleted"}))
            }
        }
    }
}

fn config() -> Config {
    Config {
        api_base_url: Url::parse("http://backend.test/api").unwrap(),
        school_id: "342635".to_string(),
        request_timeout: std::time::Duration::from_secs(30),
    }
}

fn marksheet_response(roll: &str) -> Value {
    json!({
        "success": true,
        "fileUrl": format!("https://files.test/marksheet-{roll}.pdf"),
        "documentType": "marksheet",
        "extractedData": {
            "documentType": "marksheet",
            "rollNumber": roll,
            "className": "class-10",
            "schoolName": "ABC",
            "boardUniversity": "CBSE",
            "fatherName": "Suresh Verma",
            "totalMaxMarksOrGrade": "500",
            "totalObtainedMarksOrGrade": if roll == "12" { "450" } else { "431" },
            "percentageOrGrade": "90",
            "resultStatus": "PASS",
            "subjects": [
                {"subject": "Maths", "obtainedMarksOrGrade": "95", "maxMarksOrGrade": "100"},
                {"subject": "Science", "obtainedMarksOrGrade": "88", "maxMarksOrGrade": "100"}
            ]
        }
    })
}

fn pdf_fixture() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::with_suffix(".pdf").unwrap();
    file.write_all(b"%PDF-1.4 fixture").unwrap();
    file
}

#[tokio::test(start_paused = true)]
async fn marksheet_uploads_dedupe_and_grow() {
    let backend = FakeBackend::new(vec![
        marksheet_response("12"),
        marksheet_response("12"),
        marksheet_response("13"),
    ]);
    let mut session = EnrollmentSession::new(&config(), backend);
    let file = pdf_fixture();

    let student_id = session
        .create_student("class-10")
        .await
        .unwrap()
        .student_id
        .clone();
    assert_eq!(student_id, "s-1");

    // First upload replaces the empty scaffold in place.
    let report = session
        .upload_document(DocumentType::Marksheet, file.path())
        .await
        .unwrap();
    assert_eq!(report.status, SlotStatus::Uploaded);
    assert_eq!(
        report.marksheet_outcome,
        Some(InsertOutcome::ReplacedPlaceholder)
    );
    assert_eq!(session.marksheets.len(), 1);
    assert_eq!(session.marksheets[0].id, PLACEHOLDER_ID);
    assert_eq!(session.marksheets[0].roll_number, "12");
    assert!(session.marksheets[0].is_extracted);
    // The placeholder's class selection from admission wins.
    assert_eq!(session.marksheets[0].class_name, "class-10");

    // Extraction filled the empty form fields.
    assert_eq!(session.fields.previous_school, "ABC");
    assert_eq!(session.fields.board, "CBSE");
    assert_eq!(session.fields.father_name, "Suresh Verma");

    // Re-uploading the identical document is idempotent.
    let report = session
        .upload_document(DocumentType::Marksheet, file.path())
        .await
        .unwrap();
    assert_eq!(report.marksheet_outcome, Some(InsertOutcome::Unchanged));
    assert_eq!(session.marksheets.len(), 1);

    // A distinct marksheet grows the list, newest first.
    let report = session
        .upload_document(DocumentType::Marksheet, file.path())
        .await
        .unwrap();
    assert_eq!(report.marksheet_outcome, Some(InsertOutcome::Prepended));
    assert_eq!(session.marksheets.len(), 2);
    assert_eq!(session.marksheets[0].roll_number, "13");
    assert_eq!(session.marksheets[1].roll_number, "12");
}

#[tokio::test(start_paused = true)]
async fn operator_edits_survive_later_extractions() {
    let backend = FakeBackend::new(vec![marksheet_response("12")]);
    let mut session = EnrollmentSession::new(&config(), backend);
    let file = pdf_fixture();

    session.create_student("class-10").await.unwrap();
    session.fields.father_name = "Ravi Kumar".to_string();

    session
        .upload_document(DocumentType::Marksheet, file.path())
        .await
        .unwrap();

    // Fill-if-empty: the operator's value stands.
    assert_eq!(session.fields.father_name, "Ravi Kumar");
    assert_eq!(session.fields.previous_school, "ABC");
}

#[tokio::test(start_paused = true)]
async fn aadhaar_sides_build_the_aggregate() {
    let backend = FakeBackend::new(vec![
        json!({
            "success": true,
            "fileUrl": "https://files.test/front.jpg",
            "documentType": "aadhaar",
            "data": {"name": "Asha Verma", "adharNumber": "1234 5678 9012"}
        }),
        json!({
            "success": true,
            "fileUrl": "https://files.test/back.jpg",
            "documentType": "aadhaar",
            "data": {"residenceAddress": "12 MG Road"}
        }),
    ]);
    let mut session = EnrollmentSession::new(&config(), backend);
    let file = pdf_fixture();

    session.create_student("class-10").await.unwrap();

    let report = session
        .upload_aadhaar_side(AadhaarSide::Front, file.path())
        .await
        .unwrap();
    assert_eq!(report.status, SlotStatus::Partial);

    let report = session
        .upload_aadhaar_side(AadhaarSide::Back, file.path())
        .await
        .unwrap();
    assert_eq!(report.status, SlotStatus::Uploaded);

    // Both sides' partial extractions accumulated on the slot.
    let slot = session.slots().slot(DocumentType::Aadhaar);
    let extracted = slot.extracted().unwrap();
    assert_eq!(extracted.text("name").as_deref(), Some("Asha Verma"));
    assert_eq!(
        extracted.text("residenceAddress").as_deref(),
        Some("12 MG Road")
    );
}

#[tokio::test(start_paused = true)]
async fn failed_upload_marks_slot_and_spares_others() {
    let backend = FakeBackend::new(vec![
        json!({"success": false, "message": "unreadable scan"}),
        json!({
            "success": true,
            "fileUrl": "https://files.test/photo.jpg",
            "documentType": "photo"
        }),
    ]);
    let mut session = EnrollmentSession::new(&config(), backend);
    let file = pdf_fixture();

    session.create_student("class-10").await.unwrap();

    let error = session
        .upload_document(DocumentType::BirthCertificate, file.path())
        .await
        .unwrap_err();
    assert!(error.to_string().contains("Birth Certificate"));
    assert_eq!(
        session.slots().slot(DocumentType::BirthCertificate).status(),
        SlotStatus::Error
    );

    // Other slots are untouched and still usable.
    let report = session
        .upload_document(DocumentType::Photo, file.path())
        .await
        .unwrap();
    assert_eq!(report.status, SlotStatus::Uploaded);
}

#[tokio::test(start_paused = true)]
async fn manual_record_lifecycle_with_prepopulation() {
    let backend = FakeBackend::new(vec![json!({
        "success": true,
        "fileUrl": "https://files.test/passbook.jpg",
        "documentType": "bankpassbook",
        "extractedData": {"bankName": "SBI", "ifscCode": "SBIN0001"}
    })]);
    let mut session = EnrollmentSession::new(&config(), backend);
    let file = pdf_fixture();

    session.create_student("class-10").await.unwrap();
    session
        .upload_document(DocumentType::BankPassbook, file.path())
        .await
        .unwrap();

    // Nothing stored yet: the editor opens pre-populated from the
    // upload's extraction instead of empty.
    let draft = session
        .open_record(DocumentType::BankPassbook)
        .await
        .unwrap()
        .clone();
    assert_eq!(
        session.record_state(DocumentType::BankPassbook),
        RecordState::NotFound
    );
    assert_eq!(draft.get("bankName"), Some(&json!("SBI")));

    // First save creates; the session now knows the record exists.
    let mut data = draft;
    data.insert("accountNumber".to_string(), json!("0011223344"));
    let kind = session
        .save_record(DocumentType::BankPassbook, data)
        .await
        .unwrap();
    assert_eq!(kind, SaveKind::Created);
    assert_eq!(
        session.record_state(DocumentType::BankPassbook),
        RecordState::Found
    );

    // Second save updates in place.
    let mut data = session
        .open_record(DocumentType::BankPassbook)
        .await
        .unwrap()
        .clone();
    assert_eq!(data.get("accountNumber"), Some(&json!("0011223344")));
    data.insert("branchName".to_string(), json!("Civil Lines"));
    let kind = session
        .save_record(DocumentType::BankPassbook, data)
        .await
        .unwrap();
    assert_eq!(kind, SaveKind::Updated);

    // Delete resets to not-found with an empty draft.
    let message = session
        .delete_record(DocumentType::BankPassbook)
        .await
        .unwrap();
    assert_eq!(message, "Document deleted");
    assert_eq!(
        session.record_state(DocumentType::BankPassbook),
        RecordState::NotFound
    );
}

#[tokio::test(start_paused = true)]
async fn upload_is_refused_without_a_student() {
    let backend = FakeBackend::new(vec![]);
    let mut session = EnrollmentSession::new(&config(), backend);
    let file = pdf_fixture();

    let error = session
        .upload_document(DocumentType::Photo, file.path())
        .await
        .unwrap_err();
    assert!(error.to_string().contains("no active student"));
    assert_eq!(
        session.slots().slot(DocumentType::Photo).status(),
        SlotStatus::Idle
    );
}
