use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::parsed_resume::ParsedResume;
use crate::models::student::Student;
use crate::services::student_service::StudentProfile;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpsertStudentPayload {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: String,
    pub branch: Option<String>,
    #[serde(alias = "cgpa")]
    #[validate(range(min = 0.0, max = 10.0))]
    pub gpa: Option<f64>,
    pub batch: Option<String>,
}

impl From<UpsertStudentPayload> for StudentProfile {
    fn from(payload: UpsertStudentPayload) -> Self {
        Self {
            name: payload.name,
            email: payload.email,
            branch: payload.branch,
            gpa: payload.gpa,
            batch: payload.batch,
        }
    }
}

/// Multipart form for the resume upload. `file` is accepted as the field name too.
#[derive(Debug, Clone, ToSchema)]
pub struct ResumeUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub resume: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResumeUploadResponse {
    pub message: String,
    pub student: Student,
    pub parsed_resume: Option<ParsedResume>,
    /// Set when the file was stored but could not be parsed.
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResumeDeleteResponse {
    pub message: String,
    pub student: Student,
}
