use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

use super::student::ResumeMeta;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResumeExtract {
    pub skills: Vec<String>,
    #[schema(value_type = Vec<Object>)]
    pub projects: Vec<JsonValue>,
    pub tools: Vec<String>,
    #[schema(value_type = Vec<Object>)]
    pub experience: Vec<JsonValue>,
    #[schema(value_type = Vec<Object>)]
    pub education: Vec<JsonValue>,
    pub summary: String,
    pub raw_text: String,
}

/// Academic fields as they were known when the resume was parsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AcademicSnapshot {
    pub branch: Option<String>,
    pub gpa: Option<f64>,
    pub batch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ParserInfo {
    pub engine: String,
    pub version: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParsedResume {
    pub id: Uuid,
    pub student_id: Uuid,
    pub resume_meta: Option<ResumeMeta>,
    pub extract: ResumeExtract,
    pub academics: AcademicSnapshot,
    pub skill_embedding: Option<Vec<f32>>,
    pub parsed_at: DateTime<Utc>,
    pub parser: ParserInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewParsedResume {
    pub student_id: Uuid,
    pub resume_meta: Option<ResumeMeta>,
    pub extract: ResumeExtract,
    pub academics: AcademicSnapshot,
    pub skill_embedding: Option<Vec<f32>>,
    pub parser: ParserInfo,
}
