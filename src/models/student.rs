use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Metadata of the stored resume file. Also copied into parsed resumes and
/// application snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResumeMeta {
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub content_hash: String,
    pub url: String,
    pub storage_key: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Student {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
    pub branch: Option<String>,
    pub gpa: Option<f64>,
    pub batch: Option<String>,
    pub resume: Option<ResumeMeta>,
    pub parsed_resume_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What an admin sees of an applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StudentSummary {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub branch: Option<String>,
    pub gpa: Option<f64>,
    pub batch: Option<String>,
    pub resume_url: Option<String>,
}

impl From<&Student> for StudentSummary {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id,
            name: student.name.clone(),
            email: student.email.clone(),
            branch: student.branch.clone(),
            gpa: student.gpa,
            batch: student.batch.clone(),
            resume_url: student.resume.as_ref().map(|r| r.url.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
    pub branch: Option<String>,
    pub gpa: Option<f64>,
    pub batch: Option<String>,
}
