use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum JobType {
    #[default]
    Internship,
    #[serde(rename = "Full-Time")]
    FullTime,
    #[serde(rename = "Part-Time")]
    PartTime,
    Contract,
    Remote,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Internship => "Internship",
            JobType::FullTime => "Full-Time",
            JobType::PartTime => "Part-Time",
            JobType::Contract => "Contract",
            JobType::Remote => "Remote",
        }
    }
}

impl std::str::FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "internship" => Ok(JobType::Internship),
            "full-time" | "full_time" | "fulltime" => Ok(JobType::FullTime),
            "part-time" | "part_time" | "parttime" => Ok(JobType::PartTime),
            "contract" => Ok(JobType::Contract),
            "remote" => Ok(JobType::Remote),
            other => Err(format!("unknown job type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub company: Option<String>,
    pub description: String,
    pub requirements_text: String,
    pub skills: Vec<String>,
    pub tools: Vec<String>,
    pub branch: Option<String>,
    pub domains: Vec<String>,
    pub job_type: JobType,
    pub allowed_batches: Vec<String>,
    pub allowed_branches: Vec<String>,
    pub min_gpa: Option<f64>,
    pub salary: Option<String>,
    pub external_apply: bool,
    pub apply_url: Option<String>,
    pub posted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// The URL students are sent to when the job is applied for outside this system.
    /// A job flagged external without a usable URL falls back to the internal flow.
    pub fn external_apply_url(&self) -> Option<&str> {
        if !self.external_apply {
            return None;
        }
        self.apply_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// What a student sees of a job next to their application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct JobSummary {
    pub id: Uuid,
    pub title: String,
    pub company: Option<String>,
    pub job_type: JobType,
    pub external_apply: bool,
    pub apply_url: Option<String>,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            title: job.title.clone(),
            company: job.company.clone(),
            job_type: job.job_type,
            external_apply: job.external_apply,
            apply_url: job.apply_url.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub title: String,
    pub company: Option<String>,
    pub description: String,
    pub requirements_text: String,
    pub skills: Vec<String>,
    pub tools: Vec<String>,
    pub branch: Option<String>,
    pub domains: Vec<String>,
    pub job_type: JobType,
    pub allowed_batches: Vec<String>,
    pub allowed_branches: Vec<String>,
    pub min_gpa: Option<f64>,
    pub salary: Option<String>,
    pub external_apply: bool,
    pub apply_url: Option<String>,
    pub posted_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub job_type: Option<JobType>,
    pub batch: Option<String>,
}
