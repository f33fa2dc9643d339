use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::application::{Application, ApplicationWithJob, ApplicationWithStudent};
use crate::services::application_service::{ApplyOutcome, ApplyRequest};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ApplyPayload {
    #[serde(alias = "jobId")]
    pub job_id: Uuid,
    #[serde(default, alias = "matchScore")]
    #[validate(range(min = 0, max = 100))]
    pub match_score: Option<i32>,
    #[serde(default, alias = "missingSkills")]
    pub missing_skills: Vec<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl ApplyPayload {
    pub fn into_request(self) -> (Uuid, ApplyRequest) {
        (
            self.job_id,
            ApplyRequest {
                match_score: self.match_score,
                missing_skills: self.missing_skills,
                notes: self.notes,
            },
        )
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApplyResponse {
    pub external: bool,
    pub apply_url: Option<String>,
    pub application: Option<Application>,
    pub message: String,
}

impl From<ApplyOutcome> for ApplyResponse {
    fn from(outcome: ApplyOutcome) -> Self {
        match outcome {
            ApplyOutcome::External { apply_url } => Self {
                external: true,
                apply_url: Some(apply_url),
                application: None,
                message: "This job is applied for on the employer's site".to_string(),
            },
            ApplyOutcome::Created(application) => Self {
                external: false,
                apply_url: None,
                application: Some(application),
                message: "Application submitted".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateStatusPayload {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentApplicationsResponse {
    pub applications: Vec<ApplicationWithJob>,
    pub count: usize,
}

impl From<Vec<ApplicationWithJob>> for StudentApplicationsResponse {
    fn from(applications: Vec<ApplicationWithJob>) -> Self {
        Self {
            count: applications.len(),
            applications,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobApplicantsResponse {
    pub applications: Vec<ApplicationWithStudent>,
    pub count: usize,
}

impl From<Vec<ApplicationWithStudent>> for JobApplicantsResponse {
    fn from(applications: Vec<ApplicationWithStudent>) -> Self {
        Self {
            count: applications.len(),
            applications,
        }
    }
}
