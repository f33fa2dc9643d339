use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::database::{ApplicationStore, JobStore, Stores, StudentStore};
use crate::error::{Error, Result};
use crate::models::application::{
    Application, ApplicationStatus, ApplicationWithJob, ApplicationWithStudent, NewApplication,
};
use crate::models::job::JobSummary;
use crate::models::student::StudentSummary;

pub const ALREADY_APPLIED: &str = "Application already submitted";

#[derive(Debug, Clone, Default)]
pub struct ApplyRequest {
    pub match_score: Option<i32>,
    pub missing_skills: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ApplyOutcome {
    /// The job is applied for elsewhere; nothing was stored.
    External { apply_url: String },
    Created(Application),
}

#[derive(Clone)]
pub struct ApplicationService {
    students: Arc<dyn StudentStore>,
    jobs: Arc<dyn JobStore>,
    applications: Arc<dyn ApplicationStore>,
}

impl ApplicationService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            students: stores.students.clone(),
            jobs: stores.jobs.clone(),
            applications: stores.applications.clone(),
        }
    }

    /// The pre-check only produces a friendlier early answer; the store's unique
    /// (student, job) constraint decides concurrent attempts.
    pub async fn apply(
        &self,
        student_id: Uuid,
        job_id: Uuid,
        request: ApplyRequest,
    ) -> Result<ApplyOutcome> {
        let match_score = request.match_score.unwrap_or(0);
        if !(0..=100).contains(&match_score) {
            return Err(Error::BadRequest(
                "match_score must be between 0 and 100".to_string(),
            ));
        }

        let student = self
            .students
            .get(student_id)
            .await?
            .ok_or_else(|| Error::NotFound("Student not found".to_string()))?;
        let job = self
            .jobs
            .get(job_id)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".to_string()))?;

        if let Some(url) = job.external_apply_url() {
            tracing::info!(student_id = %student_id, job_id = %job_id, "external apply redirect");
            return Ok(ApplyOutcome::External {
                apply_url: url.to_string(),
            });
        }

        if self
            .applications
            .find_by_pair(student_id, job_id)
            .await?
            .is_some()
        {
            return Err(Error::Conflict(ALREADY_APPLIED.to_string()));
        }

        let application = self
            .applications
            .insert(NewApplication {
                student_id,
                job_id,
                match_score,
                missing_skills: request.missing_skills,
                notes: request.notes,
                resume_snapshot: student.resume,
            })
            .await
            .map_err(|e| match Error::from(e) {
                Error::Conflict(_) => Error::Conflict(ALREADY_APPLIED.to_string()),
                other => other,
            })?;

        tracing::info!(
            student_id = %student_id,
            job_id = %job_id,
            application_id = %application.id,
            "application created"
        );
        Ok(ApplyOutcome::Created(application))
    }

    /// `status` is the raw value from the caller; anything outside the enum is
    /// rejected before the store is touched.
    pub async fn transition(&self, application_id: Uuid, status: &str) -> Result<Application> {
        let next: ApplicationStatus = status.parse().map_err(Error::BadRequest)?;

        let current = self
            .applications
            .get(application_id)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;

        if current.status == next {
            return Ok(current);
        }
        if !current.status.can_transition_to(next) {
            return Err(Error::Conflict(format!(
                "invalid_transition: {} -> {}",
                current.status, next
            )));
        }

        let updated = self
            .applications
            .update_status(application_id, current.status, next)
            .await?
            .ok_or_else(|| {
                Error::Conflict("invalid_transition: status changed concurrently".to_string())
            })?;

        tracing::info!(
            application_id = %application_id,
            from = %current.status,
            to = %next,
            "application status updated"
        );
        Ok(updated)
    }

    /// Own applications, each with a summary of its job.
    pub async fn list_for_student(&self, student_id: Uuid) -> Result<Vec<ApplicationWithJob>> {
        let applications = self.applications.list_by_student(student_id).await?;
        let mut jobs: HashMap<Uuid, Option<JobSummary>> = HashMap::new();
        let mut out = Vec::with_capacity(applications.len());
        for application in applications {
            let job = match jobs.get(&application.job_id) {
                Some(cached) => cached.clone(),
                None => {
                    let summary = self
                        .jobs
                        .get(application.job_id)
                        .await?
                        .as_ref()
                        .map(JobSummary::from);
                    jobs.insert(application.job_id, summary.clone());
                    summary
                }
            };
            out.push(ApplicationWithJob { application, job });
        }
        Ok(out)
    }

    /// Applicants for a job with their profiles.
    pub async fn list_for_job(&self, job_id: Uuid) -> Result<Vec<ApplicationWithStudent>> {
        self.jobs
            .get(job_id)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".to_string()))?;
        let applications = self.applications.list_by_job(job_id).await?;
        let mut out = Vec::with_capacity(applications.len());
        for application in applications {
            let student = self
                .students
                .get(application.student_id)
                .await?
                .as_ref()
                .map(StudentSummary::from);
            out.push(ApplicationWithStudent {
                application,
                student,
            });
        }
        Ok(out)
    }
}
