use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::job::{Job, JobFilter, JobType, NewJob};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateJobPayload {
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    pub company: Option<String>,
    #[validate(length(min = 1))]
    pub description: String,
    #[serde(default, alias = "requirementsText")]
    pub requirements_text: Option<String>,
    #[serde(default, alias = "skillsRequired")]
    pub skills: Vec<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    pub branch: Option<String>,
    /// Single domain tag, merged into `domains`.
    pub domain: Option<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default, alias = "jobType")]
    pub job_type: Option<String>,
    #[serde(default, alias = "allowedBatches")]
    pub allowed_batches: Vec<String>,
    #[serde(default, alias = "allowedBranches")]
    pub allowed_branches: Vec<String>,
    #[serde(default, alias = "minCgpa", alias = "minGpa")]
    #[validate(range(min = 0.0, max = 10.0))]
    pub min_gpa: Option<f64>,
    pub salary: Option<String>,
    #[serde(default, alias = "externalApply")]
    pub external_apply: bool,
    #[serde(default, alias = "applyUrl")]
    #[validate(length(min = 1))]
    pub apply_url: Option<String>,
}

impl CreateJobPayload {
    pub fn into_new_job(self, posted_by: Option<Uuid>) -> Result<NewJob> {
        let job_type = match self.job_type.as_deref().map(str::trim) {
            None | Some("") => JobType::default(),
            Some(raw) => raw.parse().map_err(Error::BadRequest)?,
        };

        let mut domains = self.domains;
        if let Some(domain) = self.domain {
            domains.insert(0, domain);
        }

        Ok(NewJob {
            title: self.title,
            company: self.company,
            requirements_text: self.requirements_text.unwrap_or_default(),
            description: self.description,
            skills: self.skills,
            tools: self.tools,
            branch: self.branch,
            domains,
            job_type,
            allowed_batches: self.allowed_batches,
            allowed_branches: self.allowed_branches,
            min_gpa: self.min_gpa,
            salary: self.salary,
            external_apply: self.external_apply,
            apply_url: self.apply_url,
            posted_by,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct JobListQuery {
    #[serde(alias = "jobType")]
    pub job_type: Option<String>,
    pub batch: Option<String>,
}

impl JobListQuery {
    pub fn into_filter(self) -> Result<JobFilter> {
        let job_type = match self.job_type.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse().map_err(Error::BadRequest)?),
        };
        Ok(JobFilter {
            job_type,
            batch: self
                .batch
                .map(|b| b.trim().to_string())
                .filter(|b| !b.is_empty()),
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobListResponse {
    pub jobs: Vec<Job>,
    pub count: usize,
}
