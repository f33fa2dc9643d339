use std::sync::Arc;

use uuid::Uuid;

use crate::database::{JobStore, Stores, StudentStore};
use crate::error::{Error, Result};
use crate::models::job::{Job, JobFilter, NewJob};
use crate::utils::normalize;

#[derive(Clone)]
pub struct JobService {
    jobs: Arc<dyn JobStore>,
    students: Arc<dyn StudentStore>,
}

impl JobService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            jobs: stores.jobs.clone(),
            students: stores.students.clone(),
        }
    }

    /// Admin identities come from tokens and need not have a local row; the creator is
    /// only recorded when one exists.
    pub async fn create(&self, job: NewJob) -> Result<Job> {
        let mut job = normalize_new_job(job)?;
        if let Some(creator) = job.posted_by {
            if self.students.get(creator).await?.is_none() {
                tracing::warn!(creator = %creator, "job creator has no local record, leaving posted_by empty");
                job.posted_by = None;
            }
        }
        let created = self.jobs.create(job).await?;
        tracing::info!(job_id = %created.id, title = %created.title, "job created");
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<Job> {
        self.jobs
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".to_string()))
    }

    pub async fn list(&self, filter: JobFilter) -> Result<Vec<Job>> {
        Ok(self.jobs.list(filter).await?)
    }
}

/// Trims and lowercases tags, drops blank list entries and defaults the
/// requirements text to the description.
pub fn normalize_new_job(mut job: NewJob) -> Result<NewJob> {
    job.title = job.title.trim().to_string();
    job.description = job.description.trim().to_string();
    if job.title.is_empty() {
        return Err(Error::BadRequest("title is required".to_string()));
    }
    if job.description.is_empty() {
        return Err(Error::BadRequest("description is required".to_string()));
    }

    job.requirements_text = job.requirements_text.trim().to_string();
    if job.requirements_text.is_empty() {
        job.requirements_text = job.description.clone();
    }

    job.company = job
        .company
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    job.skills = normalize::dedup_trimmed(&job.skills);
    job.tools = normalize::dedup_trimmed(&job.tools);
    job.branch = job
        .branch
        .map(|b| b.trim().to_lowercase())
        .filter(|b| !b.is_empty());
    job.domains = normalize::lowercase_tags(&job.domains);
    job.allowed_batches = normalize::dedup_trimmed(&job.allowed_batches);
    job.allowed_branches = normalize::dedup_trimmed(&job.allowed_branches);

    if let Some(min_gpa) = job.min_gpa {
        if !(0.0..=10.0).contains(&min_gpa) {
            return Err(Error::BadRequest(
                "min_gpa must be between 0 and 10".to_string(),
            ));
        }
    }

    job.apply_url = job
        .apply_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    if let Some(apply_url) = &job.apply_url {
        url::Url::parse(apply_url)
            .map_err(|e| Error::BadRequest(format!("apply_url is not a valid URL: {}", e)))?;
    }
    if job.external_apply && job.apply_url.is_none() {
        return Err(Error::BadRequest(
            "apply_url is required when external_apply is set".to_string(),
        ));
    }

    Ok(job)
}
