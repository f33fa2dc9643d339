use std::collections::BTreeMap;

use async_trait::async_trait;
use uuid::Uuid;

use super::StoreResult;
use crate::models::application::{Application, ApplicationStatus, NewApplication};
use crate::models::job::{Job, JobFilter, NewJob};
use crate::models::parsed_resume::{NewParsedResume, ParsedResume};
use crate::models::student::{NewStudent, ResumeMeta, Student};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StudentStore: Send + Sync {
    /// Inserts a student or updates the profile fields of the one with the same email.
    async fn upsert(&self, student: NewStudent) -> StoreResult<Student>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<Student>>;

    /// Overwrites the resume metadata. Returns `None` for an unknown student.
    async fn set_resume(&self, id: Uuid, resume: ResumeMeta) -> StoreResult<Option<Student>>;

    async fn set_parsed_resume(&self, id: Uuid, parsed_resume_id: Uuid)
        -> StoreResult<Option<Student>>;

    /// Nulls both the resume metadata and the parsed resume pointer.
    async fn clear_resume(&self, id: Uuid) -> StoreResult<Option<Student>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, job: NewJob) -> StoreResult<Job>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<Job>>;

    /// Newest first.
    async fn list(&self, filter: JobFilter) -> StoreResult<Vec<Job>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParsedResumeStore: Send + Sync {
    async fn find_by_student(&self, student_id: Uuid) -> StoreResult<Option<ParsedResume>>;

    /// Removes whatever parsed resume the student has and inserts `parsed` in its place.
    /// The replacement is a whole record; concurrent callers end with exactly one row.
    async fn replace_for_student(&self, parsed: NewParsedResume) -> StoreResult<ParsedResume>;

    /// Returns whether a record was removed.
    async fn delete_for_student(&self, student_id: Uuid) -> StoreResult<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn find_by_pair(&self, student_id: Uuid, job_id: Uuid)
        -> StoreResult<Option<Application>>;

    /// Fails with `StoreError::Conflict` when the (student, job) pair already exists.
    async fn insert(&self, application: NewApplication) -> StoreResult<Application>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<Application>>;

    /// Compare-and-set on the current status. `None` when the id is unknown or the
    /// status no longer equals `expected`.
    async fn update_status(
        &self,
        id: Uuid,
        expected: ApplicationStatus,
        next: ApplicationStatus,
    ) -> StoreResult<Option<Application>>;

    /// Newest first.
    async fn list_by_student(&self, student_id: Uuid) -> StoreResult<Vec<Application>>;

    /// Newest first.
    async fn list_by_job(&self, job_id: Uuid) -> StoreResult<Vec<Application>>;
}

/// Counts over the whole placement dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlacementTotals {
    pub students: i64,
    pub jobs: i64,
    pub applications: i64,
    pub pending_applications: i64,
    pub match_score_sum: i64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Lowercased job skill to the number of jobs listing it.
    async fn skill_demand(&self) -> StoreResult<BTreeMap<String, i64>>;

    async fn totals(&self) -> StoreResult<PlacementTotals>;
}
