use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::job::JobSummary;
use super::student::{ResumeMeta, StudentSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    UnderReview,
    Shortlisted,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 3] = [
        ApplicationStatus::UnderReview,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::UnderReview => "UNDER_REVIEW",
            ApplicationStatus::Shortlisted => "SHORTLISTED",
            ApplicationStatus::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApplicationStatus::UnderReview)
    }

    /// Re-applying the current status is allowed; terminal states never move.
    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        *self == next || (!self.is_terminal() && next.is_terminal())
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| {
                format!(
                    "Invalid status value '{}', expected one of UNDER_REVIEW, SHORTLISTED, REJECTED",
                    s
                )
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Application {
    pub id: Uuid,
    pub student_id: Uuid,
    pub job_id: Uuid,
    pub status: ApplicationStatus,
    pub match_score: i32,
    pub missing_skills: Vec<String>,
    pub notes: Option<String>,
    pub resume_snapshot: Option<ResumeMeta>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewApplication {
    pub student_id: Uuid,
    pub job_id: Uuid,
    pub match_score: i32,
    pub missing_skills: Vec<String>,
    pub notes: Option<String>,
    pub resume_snapshot: Option<ResumeMeta>,
}


/// A student's application with the job it was made for. `job` is empty when the job
/// row is gone.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApplicationWithJob {
    #[serde(flatten)]
    pub application: Application,
    pub job: Option<JobSummary>,
}

/// An application to a job with the applicant's profile.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApplicationWithStudent {
    #[serde(flatten)]
    pub application: Application,
    pub student: Option<StudentSummary>,
}
