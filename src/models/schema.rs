//! Manual-edit field schemas per document type.
//!
//! The structured-record editor shows a fixed field list for each
//! document type; the backend stores whatever keys it gets, so these
//! lists are the client-side source of truth for editable fields.

use super::DocumentType;

/// Editable fields for a document type's structured record, in display
/// order. Photo and Other carry no structured data.
pub fn manual_fields(document_type: DocumentType) -> &'static [&'static str] {
    match document_type {
        DocumentType::Aadhaar => &[
            "name",
            "dob",
            "gender",
            "fatherName",
            "adharNumber",
            "residenceAddress",
        ],
        DocumentType::BirthCertificate => &[
            "name",
            "fatherName",
            "motherName",
            "gender",
            "dob",
            "address",
            "applicationNumber",
            "certificateNumber",
            "updateDate",
            "issueAgency",
        ],
        DocumentType::TransferCertificate => &[
            "name",
            "fatherName",
            "motherName",
            "dob",
            "issueSchoolName",
            "schoolAddress",
            "studentPerformance",
            "tcSerialNumber",
            "certificateNumber",
            "createdDate",
            "previousSinceYears",
            "tcClassName",
            "tcIssueDate",
            "tcReason",
            "className",
            "graduation",
            "stream",
        ],
        DocumentType::DomicileCertificate => &[
            "applicantName",
            "husbandName",
            "motherName",
            "houseNumber",
            "mohalla",
            "village",
            "policeStation",
            "tehsil",
            "district",
            "applicationNumber",
            "certificateNumber",
            "dateOfIssue",
        ],
        DocumentType::CasteCertificate => &[
            "applicantName",
            "fatherName",
            "motherName",
            "casteCategory",
            "issueDate",
            "applicationNumber",
            "certificateNumber",
        ],
        DocumentType::IncomeCertificate => &[
            "applicantName",
            "fatherName",
            "motherName",
            "issueDate",
            "incomeAmount",
            "applicationNumber",
            "certificateNumber",
        ],
        DocumentType::BankPassbook => &[
            "name",
            "dob",
            "bankName",
            "ifscCode",
            "accountNumber",
            "branchName",
            "branchAddress",
            "openDate",
        ],
        DocumentType::Marksheet => &[
            "name",
            "fatherName",
            "motherName",
            "schoolName",
            "className",
            "graduation",
            "stream",
            "section",
            "rollNumber",
            "serialNumber",
            "totalMaxMarksOrGrade",
            "totalObtainedMarksOrGrade",
            "percentageOrGrade",
            "resultStatus",
            "performance",
            "resultIssueDate",
            "resultSerialNumber",
            "resultIssueOrganization",
            "boardUniversity",
            "schoolAddress",
        ],
        DocumentType::Photo | DocumentType::Other => &[],
    }
}
