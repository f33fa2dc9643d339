use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::store::{
    AnalyticsStore, ApplicationStore, JobStore, ParsedResumeStore, PlacementTotals, StudentStore,
};
use super::{StoreError, StoreResult};
use crate::models::application::{Application, ApplicationStatus, NewApplication};
use crate::models::job::{Job, JobFilter, NewJob};
use crate::models::parsed_resume::{NewParsedResume, ParsedResume};
use crate::models::student::{NewStudent, ResumeMeta, Role, Student};

/// Process-local store with the same uniqueness rules as the Postgres schema.
/// Used by tests and for running the API without a database.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    students: HashMap<Uuid, Student>,
    // Insertion order doubles as creation order for "newest first" listings.
    jobs: Vec<Job>,
    parsed_resumes: HashMap<Uuid, ParsedResume>,
    applications: Vec<Application>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Corrupt("memory store lock poisoned".to_string()))
    }

    pub fn parsed_resume_count(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.parsed_resumes.len())
            .unwrap_or_default()
    }

    pub fn application_count(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.applications.len())
            .unwrap_or_default()
    }
}

fn update_student<F>(inner: &mut Inner, id: Uuid, apply: F) -> Option<Student>
where
    F: FnOnce(&mut Student),
{
    let student = inner.students.get_mut(&id)?;
    apply(student);
    student.updated_at = Utc::now();
    Some(student.clone())
}

#[async_trait]
impl StudentStore for MemoryStore {
    async fn upsert(&self, student: NewStudent) -> StoreResult<Student> {
        let mut inner = self.lock()?;
        let now = Utc::now();

        if let Some(existing) = inner
            .students
            .values_mut()
            .find(|s| s.email == student.email)
        {
            if student.name.is_some() {
                existing.name = student.name;
            }
            if student.branch.is_some() {
                existing.branch = student.branch;
            }
            if student.gpa.is_some() {
                existing.gpa = student.gpa;
            }
            if student.batch.is_some() {
                existing.batch = student.batch;
            }
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let created = Student {
            id: Uuid::new_v4(),
            name: student.name,
            email: student.email,
            role: student.role,
            branch: student.branch,
            gpa: student.gpa,
            batch: student.batch,
            resume: None,
            parsed_resume_id: None,
            created_at: now,
            updated_at: now,
        };
        inner.students.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Student>> {
        Ok(self.lock()?.students.get(&id).cloned())
    }

    async fn set_resume(&self, id: Uuid, resume: ResumeMeta) -> StoreResult<Option<Student>> {
        let mut inner = self.lock()?;
        Ok(update_student(&mut inner, id, |s| s.resume = Some(resume)))
    }

    async fn set_parsed_resume(
        &self,
        id: Uuid,
        parsed_resume_id: Uuid,
    ) -> StoreResult<Option<Student>> {
        let mut inner = self.lock()?;
        Ok(update_student(&mut inner, id, |s| {
            s.parsed_resume_id = Some(parsed_resume_id)
        }))
    }

    async fn clear_resume(&self, id: Uuid) -> StoreResult<Option<Student>> {
        let mut inner = self.lock()?;
        Ok(update_student(&mut inner, id, |s| {
            s.resume = None;
            s.parsed_resume_id = None;
        }))
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn create(&self, job: NewJob) -> StoreResult<Job> {
        let mut inner = self.lock()?;
        if let Some(creator) = job.posted_by {
            if !inner.students.contains_key(&creator) {
                return Err(StoreError::MissingReference(format!(
                    "referenced record does not exist (posted_by {})",
                    creator
                )));
            }
        }
        let now = Utc::now();
        let created = Job {
            id: Uuid::new_v4(),
            title: job.title,
            company: job.company,
            description: job.description,
            requirements_text: job.requirements_text,
            skills: job.skills,
            tools: job.tools,
            branch: job.branch,
            domains: job.domains,
            job_type: job.job_type,
            allowed_batches: job.allowed_batches,
            allowed_branches: job.allowed_branches,
            min_gpa: job.min_gpa,
            salary: job.salary,
            external_apply: job.external_apply,
            apply_url: job.apply_url,
            posted_by: job.posted_by,
            created_at: now,
            updated_at: now,
        };
        inner.jobs.push(created.clone());
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Job>> {
        Ok(self.lock()?.jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn list(&self, filter: JobFilter) -> StoreResult<Vec<Job>> {
        let batch = filter.batch.map(|b| b.trim().to_lowercase());
        let inner = self.lock()?;
        Ok(inner
            .jobs
            .iter()
            .rev()
            .filter(|job| filter.job_type.map_or(true, |t| job.job_type == t))
            .filter(|job| match &batch {
                Some(batch) => {
                    job.allowed_batches.is_empty()
                        || job
                            .allowed_batches
                            .iter()
                            .any(|b| b.trim().to_lowercase() == *batch)
                }
                None => true,
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ParsedResumeStore for MemoryStore {
    async fn find_by_student(&self, student_id: Uuid) -> StoreResult<Option<ParsedResume>> {
        Ok(self.lock()?.parsed_resumes.get(&student_id).cloned())
    }

    async fn replace_for_student(&self, parsed: NewParsedResume) -> StoreResult<ParsedResume> {
        let record = ParsedResume {
            id: Uuid::new_v4(),
            student_id: parsed.student_id,
            resume_meta: parsed.resume_meta,
            extract: parsed.extract,
            academics: parsed.academics,
            skill_embedding: parsed.skill_embedding,
            parsed_at: Utc::now(),
            parser: parsed.parser,
        };
        self.lock()?
            .parsed_resumes
            .insert(record.student_id, record.clone());
        Ok(record)
    }

    async fn delete_for_student(&self, student_id: Uuid) -> StoreResult<bool> {
        Ok(self.lock()?.parsed_resumes.remove(&student_id).is_some())
    }
}

#[async_trait]
impl ApplicationStore for MemoryStore {
    async fn find_by_pair(
        &self,
        student_id: Uuid,
        job_id: Uuid,
    ) -> StoreResult<Option<Application>> {
        Ok(self
            .lock()?
            .applications
            .iter()
            .find(|a| a.student_id == student_id && a.job_id == job_id)
            .cloned())
    }

    async fn insert(&self, application: NewApplication) -> StoreResult<Application> {
        let mut inner = self.lock()?;
        if inner
            .applications
            .iter()
            .any(|a| a.student_id == application.student_id && a.job_id == application.job_id)
        {
            return Err(StoreError::Conflict(
                "Application already submitted".to_string(),
            ));
        }

        let now = Utc::now();
        let created = Application {
            id: Uuid::new_v4(),
            student_id: application.student_id,
            job_id: application.job_id,
            status: ApplicationStatus::UnderReview,
            match_score: application.match_score,
            missing_skills: application.missing_skills,
            notes: application.notes,
            resume_snapshot: application.resume_snapshot,
            created_at: now,
            updated_at: now,
        };
        inner.applications.push(created.clone());
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Application>> {
        Ok(self
            .lock()?
            .applications
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: ApplicationStatus,
        next: ApplicationStatus,
    ) -> StoreResult<Option<Application>> {
        let mut inner = self.lock()?;
        let Some(application) = inner
            .applications
            .iter_mut()
            .find(|a| a.id == id && a.status == expected)
        else {
            return Ok(None);
        };
        application.status = next;
        application.updated_at = Utc::now();
        Ok(Some(application.clone()))
    }

    async fn list_by_student(&self, student_id: Uuid) -> StoreResult<Vec<Application>> {
        Ok(self
            .lock()?
            .applications
            .iter()
            .rev()
            .filter(|a| a.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn list_by_job(&self, job_id: Uuid) -> StoreResult<Vec<Application>> {
        Ok(self
            .lock()?
            .applications
            .iter()
            .rev()
            .filter(|a| a.job_id == job_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AnalyticsStore for MemoryStore {
    async fn skill_demand(&self) -> StoreResult<BTreeMap<String, i64>> {
        let inner = self.lock()?;
        let mut counts = BTreeMap::new();
        for skill in inner.jobs.iter().flat_map(|job| job.skills.iter()) {
            let skill = skill.trim();
            if skill.is_empty() {
                continue;
            }
            *counts.entry(skill.to_lowercase()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn totals(&self) -> StoreResult<PlacementTotals> {
        let inner = self.lock()?;
        let count = |n: usize| n as i64;
        Ok(PlacementTotals {
            students: count(
                inner
                    .students
                    .values()
                    .filter(|s| s.role == Role::Student)
                    .count(),
            ),
            jobs: count(inner.jobs.len()),
            applications: count(inner.applications.len()),
            pending_applications: count(
                inner
                    .applications
                    .iter()
                    .filter(|a| a.status == ApplicationStatus::UnderReview)
                    .count(),
            ),
            match_score_sum: inner
                .applications
                .iter()
                .map(|a| i64::from(a.match_score))
                .sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_student(email: &str) -> NewStudent {
        NewStudent {
            name: Some("Asha".to_string()),
            email: email.to_string(),
            role: Role::Student,
            branch: Some("cse".to_string()),
            gpa: Some(8.1),
            batch: Some("2025".to_string()),
        }
    }

    #[tokio::test]
    async fn upsert_keeps_one_student_per_email() {
        let store = MemoryStore::new();
        let first = StudentStore::upsert(&store, new_student("a@x.edu")).await.unwrap();

        let mut again = new_student("a@x.edu");
        again.gpa = Some(9.0);
        again.name = None;
        let second = StudentStore::upsert(&store, again).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.gpa, Some(9.0));
        assert_eq!(second.name.as_deref(), Some("Asha"));
    }

    #[tokio::test]
    async fn duplicate_application_insert_is_a_conflict() {
        let store = MemoryStore::new();
        let pair = NewApplication {
            student_id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            match_score: 0,
            missing_skills: vec![],
            notes: None,
            resume_snapshot: None,
        };
        store.insert(pair.clone()).await.unwrap();
        let err = store.insert(pair).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.application_count(), 1);
    }

    #[tokio::test]
    async fn update_status_is_compare_and_set() {
        let store = MemoryStore::new();
        let app = store
            .insert(NewApplication {
                student_id: Uuid::new_v4(),
                job_id: Uuid::new_v4(),
                match_score: 40,
                missing_skills: vec![],
                notes: None,
                resume_snapshot: None,
            })
            .await
            .unwrap();

        let stale = store
            .update_status(app.id, ApplicationStatus::Shortlisted, ApplicationStatus::Rejected)
            .await
            .unwrap();
        assert!(stale.is_none());

        let moved = store
            .update_status(app.id, ApplicationStatus::UnderReview, ApplicationStatus::Rejected)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.status, ApplicationStatus::Rejected);
    }

    fn job_with_skills(skills: &[&str]) -> NewJob {
        NewJob {
            title: "Intern".to_string(),
            company: None,
            description: String::new(),
            requirements_text: String::new(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            tools: vec![],
            branch: None,
            domains: vec![],
            job_type: Default::default(),
            allowed_batches: vec![],
            allowed_branches: vec![],
            min_gpa: None,
            salary: None,
            external_apply: false,
            apply_url: None,
            posted_by: None,
        }
    }

    #[tokio::test]
    async fn skill_demand_folds_case_and_skips_blanks() {
        let store = MemoryStore::new();
        JobStore::create(&store, job_with_skills(&["Rust", "SQL", " "])).await.unwrap();
        JobStore::create(&store, job_with_skills(&["rust", ""])).await.unwrap();

        let demand = store.skill_demand().await.unwrap();
        assert_eq!(demand.len(), 2);
        assert_eq!(demand["rust"], 2);
        assert_eq!(demand["sql"], 1);
    }

    #[tokio::test]
    async fn totals_count_students_only_and_pending_applications() {
        let store = MemoryStore::new();
        let student = StudentStore::upsert(&store, new_student("a@x.edu")).await.unwrap();
        let mut admin = new_student("admin@x.edu");
        admin.role = Role::Admin;
        StudentStore::upsert(&store, admin).await.unwrap();
        let job = JobStore::create(&store, job_with_skills(&["Rust"])).await.unwrap();

        let app = store
            .insert(NewApplication {
                student_id: student.id,
                job_id: job.id,
                match_score: 70,
                missing_skills: vec![],
                notes: None,
                resume_snapshot: None,
            })
            .await
            .unwrap();
        store
            .insert(NewApplication {
                student_id: Uuid::new_v4(),
                job_id: job.id,
                match_score: 45,
                missing_skills: vec![],
                notes: None,
                resume_snapshot: None,
            })
            .await
            .unwrap();
        store
            .update_status(app.id, ApplicationStatus::UnderReview, ApplicationStatus::Shortlisted)
            .await
            .unwrap();

        let totals = store.totals().await.unwrap();
        assert_eq!(
            totals,
            PlacementTotals {
                students: 1,
                jobs: 1,
                applications: 2,
                pending_applications: 1,
                match_score_sum: 115,
            }
        );
    }
}
