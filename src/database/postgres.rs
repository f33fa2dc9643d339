use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::store::{
    AnalyticsStore, ApplicationStore, JobStore, ParsedResumeStore, PlacementTotals, StudentStore,
};
use super::{StoreError, StoreResult};
use crate::models::application::{Application, ApplicationStatus, NewApplication};
use crate::models::job::{Job, JobFilter, NewJob};
use crate::models::parsed_resume::{
    AcademicSnapshot, NewParsedResume, ParsedResume, ParserInfo, ResumeExtract,
};
use crate::models::student::{NewStudent, ResumeMeta, Student};

const STUDENT_COLUMNS: &str =
    "id, name, email, role, branch, gpa, batch, resume, parsed_resume_id, created_at, updated_at";

const JOB_COLUMNS: &str = "id, title, company, description, requirements_text, skills, tools, \
     branch, domains, job_type, allowed_batches, allowed_branches, min_gpa, salary, \
     external_apply, apply_url, posted_by, created_at, updated_at";

const PARSED_RESUME_COLUMNS: &str = "id, student_id, resume_meta, skills, projects, tools, \
     experience, education, summary, raw_text, branch, gpa, batch, skill_embedding, parsed_at, \
     parser_engine, parser_version, parser_error";

const APPLICATION_COLUMNS: &str = "id, student_id, job_id, status, match_score, missing_skills, \
     notes, resume_snapshot, created_at, updated_at";

/// PostgreSQL-backed implementation of every store trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct StudentRow {
    id: Uuid,
    name: Option<String>,
    email: String,
    role: String,
    branch: Option<String>,
    gpa: Option<f64>,
    batch: Option<String>,
    resume: Option<Json<ResumeMeta>>,
    parsed_resume_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<StudentRow> for Student {
    type Error = StoreError;

    fn try_from(row: StudentRow) -> StoreResult<Self> {
        Ok(Student {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row.role.parse().map_err(StoreError::Corrupt)?,
            branch: row.branch,
            gpa: row.gpa,
            batch: row.batch,
            resume: row.resume.map(|json| json.0),
            parsed_resume_id: row.parsed_resume_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct JobRow {
    id: Uuid,
    title: String,
    company: Option<String>,
    description: String,
    requirements_text: String,
    skills: Vec<String>,
    tools: Vec<String>,
    branch: Option<String>,
    domains: Vec<String>,
    job_type: String,
    allowed_batches: Vec<String>,
    allowed_branches: Vec<String>,
    min_gpa: Option<f64>,
    salary: Option<String>,
    external_apply: bool,
    apply_url: Option<String>,
    posted_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(row: JobRow) -> StoreResult<Self> {
        Ok(Job {
            id: row.id,
            title: row.title,
            company: row.company,
            description: row.description,
            requirements_text: row.requirements_text,
            skills: row.skills,
            tools: row.tools,
            branch: row.branch,
            domains: row.domains,
            job_type: row.job_type.parse().map_err(StoreError::Corrupt)?,
            allowed_batches: row.allowed_batches,
            allowed_branches: row.allowed_branches,
            min_gpa: row.min_gpa,
            salary: row.salary,
            external_apply: row.external_apply,
            apply_url: row.apply_url,
            posted_by: row.posted_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ParsedResumeRow {
    id: Uuid,
    student_id: Uuid,
    resume_meta: Option<Json<ResumeMeta>>,
    skills: Vec<String>,
    projects: Json<Vec<JsonValue>>,
    tools: Vec<String>,
    experience: Json<Vec<JsonValue>>,
    education: Json<Vec<JsonValue>>,
    summary: String,
    raw_text: String,
    branch: Option<String>,
    gpa: Option<f64>,
    batch: Option<String>,
    skill_embedding: Option<Vec<f32>>,
    parsed_at: DateTime<Utc>,
    parser_engine: String,
    parser_version: String,
    parser_error: Option<String>,
}

impl From<ParsedResumeRow> for ParsedResume {
    fn from(row: ParsedResumeRow) -> Self {
        ParsedResume {
            id: row.id,
            student_id: row.student_id,
            resume_meta: row.resume_meta.map(|json| json.0),
            extract: ResumeExtract {
                skills: row.skills,
                projects: row.projects.0,
                tools: row.tools,
                experience: row.experience.0,
                education: row.education.0,
                summary: row.summary,
                raw_text: row.raw_text,
            },
            academics: AcademicSnapshot {
                branch: row.branch,
                gpa: row.gpa,
                batch: row.batch,
            },
            skill_embedding: row.skill_embedding,
            parsed_at: row.parsed_at,
            parser: ParserInfo {
                engine: row.parser_engine,
                version: row.parser_version,
                error: row.parser_error,
            },
        }
    }
}

#[derive(Debug, FromRow)]
struct ApplicationRow {
    id: Uuid,
    student_id: Uuid,
    job_id: Uuid,
    status: String,
    match_score: i32,
    missing_skills: Vec<String>,
    notes: Option<String>,
    resume_snapshot: Option<Json<ResumeMeta>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = StoreError;

    fn try_from(row: ApplicationRow) -> StoreResult<Self> {
        Ok(Application {
            id: row.id,
            student_id: row.student_id,
            job_id: row.job_id,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            match_score: row.match_score,
            missing_skills: row.missing_skills,
            notes: row.notes,
            resume_snapshot: row.resume_snapshot.map(|json| json.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn collect<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl StudentStore for PgStore {
    async fn upsert(&self, student: NewStudent) -> StoreResult<Student> {
        let query = format!(
            r#"
            INSERT INTO students (id, name, email, role, branch, gpa, batch)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (email) DO UPDATE SET
                name = COALESCE(EXCLUDED.name, students.name),
                branch = COALESCE(EXCLUDED.branch, students.branch),
                gpa = COALESCE(EXCLUDED.gpa, students.gpa),
                batch = COALESCE(EXCLUDED.batch, students.batch),
                updated_at = NOW()
            RETURNING {}
            "#,
            STUDENT_COLUMNS
        );
        let row = sqlx::query_as::<_, StudentRow>(&query)
            .bind(Uuid::new_v4())
            .bind(student.name)
            .bind(student.email)
            .bind(student.role.as_str())
            .bind(student.branch)
            .bind(student.gpa)
            .bind(student.batch)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Student>> {
        let query = format!("SELECT {} FROM students WHERE id = $1", STUDENT_COLUMNS);
        let row = sqlx::query_as::<_, StudentRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Student::try_from).transpose()
    }

    async fn set_resume(&self, id: Uuid, resume: ResumeMeta) -> StoreResult<Option<Student>> {
        let query = format!(
            "UPDATE students SET resume = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            STUDENT_COLUMNS
        );
        let row = sqlx::query_as::<_, StudentRow>(&query)
            .bind(id)
            .bind(Json(resume))
            .fetch_optional(&self.pool)
            .await?;
        row.map(Student::try_from).transpose()
    }

    async fn set_parsed_resume(
        &self,
        id: Uuid,
        parsed_resume_id: Uuid,
    ) -> StoreResult<Option<Student>> {
        let query = format!(
            "UPDATE students SET parsed_resume_id = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            STUDENT_COLUMNS
        );
        let row = sqlx::query_as::<_, StudentRow>(&query)
            .bind(id)
            .bind(parsed_resume_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Student::try_from).transpose()
    }

    async fn clear_resume(&self, id: Uuid) -> StoreResult<Option<Student>> {
        let query = format!(
            r#"
            UPDATE students
            SET resume = NULL, parsed_resume_id = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            STUDENT_COLUMNS
        );
        let row = sqlx::query_as::<_, StudentRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Student::try_from).transpose()
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn create(&self, job: NewJob) -> StoreResult<Job> {
        let query = format!(
            r#"
            INSERT INTO jobs (
                id, title, company, description, requirements_text,
                skills, tools, branch, domains, job_type,
                allowed_batches, allowed_branches, min_gpa, salary, external_apply,
                apply_url, posted_by
            ) VALUES (
                $1,$2,$3,$4,$5,
                $6,$7,$8,$9,$10,
                $11,$12,$13,$14,$15,
                $16,$17
            )
            RETURNING {}
            "#,
            JOB_COLUMNS
        );
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(Uuid::new_v4())
            .bind(job.title)
            .bind(job.company)
            .bind(job.description)
            .bind(job.requirements_text)
            .bind(job.skills)
            .bind(job.tools)
            .bind(job.branch)
            .bind(job.domains)
            .bind(job.job_type.as_str())
            .bind(job.allowed_batches)
            .bind(job.allowed_branches)
            .bind(job.min_gpa)
            .bind(job.salary)
            .bind(job.external_apply)
            .bind(job.apply_url)
            .bind(job.posted_by)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Job>> {
        let query = format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS);
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Job::try_from).transpose()
    }

    async fn list(&self, filter: JobFilter) -> StoreResult<Vec<Job>> {
        let mut filters = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(job_type) = filter.job_type {
            args.push(job_type.as_str().to_string());
            filters.push(format!("job_type = ${}", args.len()));
        }
        if let Some(batch) = filter.batch {
            args.push(batch.trim().to_lowercase());
            filters.push(format!(
                "(cardinality(allowed_batches) = 0 OR EXISTS (SELECT 1 FROM unnest(allowed_batches) b WHERE lower(trim(b)) = ${}))",
                args.len()
            ));
        }

        let where_clause = if filters.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", filters.join(" AND "))
        };
        let query = format!(
            "SELECT {} FROM jobs {} ORDER BY created_at DESC",
            JOB_COLUMNS, where_clause
        );

        let mut statement = sqlx::query_as::<_, JobRow>(&query);
        for value in &args {
            statement = statement.bind(value);
        }
        let rows = statement.fetch_all(&self.pool).await?;
        collect(rows)
    }
}

#[async_trait]
impl ParsedResumeStore for PgStore {
    async fn find_by_student(&self, student_id: Uuid) -> StoreResult<Option<ParsedResume>> {
        let query = format!(
            "SELECT {} FROM parsed_resumes WHERE student_id = $1",
            PARSED_RESUME_COLUMNS
        );
        let row = sqlx::query_as::<_, ParsedResumeRow>(&query)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ParsedResume::from))
    }

    async fn replace_for_student(&self, parsed: NewParsedResume) -> StoreResult<ParsedResume> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM parsed_resumes WHERE student_id = $1")
            .bind(parsed.student_id)
            .execute(&mut *tx)
            .await?;

        // A concurrent replace can commit between the delete and the insert; the
        // conflict arm overwrites that row wholesale instead of failing.
        let query = format!(
            r#"
            INSERT INTO parsed_resumes (
                id, student_id, resume_meta, skills, projects,
                tools, experience, education, summary, raw_text,
                branch, gpa, batch, skill_embedding, parsed_at,
                parser_engine, parser_version, parser_error
            ) VALUES (
                $1,$2,$3,$4,$5,
                $6,$7,$8,$9,$10,
                $11,$12,$13,$14,NOW(),
                $15,$16,$17
            )
            ON CONFLICT (student_id) DO UPDATE SET
                id = EXCLUDED.id,
                resume_meta = EXCLUDED.resume_meta,
                skills = EXCLUDED.skills,
                projects = EXCLUDED.projects,
                tools = EXCLUDED.tools,
                experience = EXCLUDED.experience,
                education = EXCLUDED.education,
                summary = EXCLUDED.summary,
                raw_text = EXCLUDED.raw_text,
                branch = EXCLUDED.branch,
                gpa = EXCLUDED.gpa,
                batch = EXCLUDED.batch,
                skill_embedding = EXCLUDED.skill_embedding,
                parsed_at = EXCLUDED.parsed_at,
                parser_engine = EXCLUDED.parser_engine,
                parser_version = EXCLUDED.parser_version,
                parser_error = EXCLUDED.parser_error
            RETURNING {}
            "#,
            PARSED_RESUME_COLUMNS
        );
        let row = sqlx::query_as::<_, ParsedResumeRow>(&query)
            .bind(Uuid::new_v4())
            .bind(parsed.student_id)
            .bind(parsed.resume_meta.map(Json))
            .bind(parsed.extract.skills)
            .bind(Json(parsed.extract.projects))
            .bind(parsed.extract.tools)
            .bind(Json(parsed.extract.experience))
            .bind(Json(parsed.extract.education))
            .bind(parsed.extract.summary)
            .bind(parsed.extract.raw_text)
            .bind(parsed.academics.branch)
            .bind(parsed.academics.gpa)
            .bind(parsed.academics.batch)
            .bind(parsed.skill_embedding)
            .bind(parsed.parser.engine)
            .bind(parsed.parser.version)
            .bind(parsed.parser.error)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn delete_for_student(&self, student_id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM parsed_resumes WHERE student_id = $1")
            .bind(student_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl ApplicationStore for PgStore {
    async fn find_by_pair(
        &self,
        student_id: Uuid,
        job_id: Uuid,
    ) -> StoreResult<Option<Application>> {
        let query = format!(
            "SELECT {} FROM applications WHERE student_id = $1 AND job_id = $2",
            APPLICATION_COLUMNS
        );
        let row = sqlx::query_as::<_, ApplicationRow>(&query)
            .bind(student_id)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Application::try_from).transpose()
    }

    async fn insert(&self, application: NewApplication) -> StoreResult<Application> {
        let query = format!(
            r#"
            INSERT INTO applications (
                id, student_id, job_id, status, match_score, missing_skills, notes, resume_snapshot
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            APPLICATION_COLUMNS
        );
        let row = sqlx::query_as::<_, ApplicationRow>(&query)
            .bind(Uuid::new_v4())
            .bind(application.student_id)
            .bind(application.job_id)
            .bind(ApplicationStatus::UnderReview.as_str())
            .bind(application.match_score)
            .bind(application.missing_skills)
            .bind(application.notes)
            .bind(application.resume_snapshot.map(Json))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx(e, "Application already submitted"))?;
        row.try_into()
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Application>> {
        let query = format!("SELECT {} FROM applications WHERE id = $1", APPLICATION_COLUMNS);
        let row = sqlx::query_as::<_, ApplicationRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Application::try_from).transpose()
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: ApplicationStatus,
        next: ApplicationStatus,
    ) -> StoreResult<Option<Application>> {
        let query = format!(
            r#"
            UPDATE applications
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            APPLICATION_COLUMNS
        );
        let row = sqlx::query_as::<_, ApplicationRow>(&query)
            .bind(id)
            .bind(expected.as_str())
            .bind(next.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Application::try_from).transpose()
    }

    async fn list_by_student(&self, student_id: Uuid) -> StoreResult<Vec<Application>> {
        let query = format!(
            "SELECT {} FROM applications WHERE student_id = $1 ORDER BY created_at DESC",
            APPLICATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, ApplicationRow>(&query)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;
        collect(rows)
    }

    async fn list_by_job(&self, job_id: Uuid) -> StoreResult<Vec<Application>> {
        let query = format!(
            "SELECT {} FROM applications WHERE job_id = $1 ORDER BY created_at DESC",
            APPLICATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, ApplicationRow>(&query)
            .bind(job_id)
            .fetch_all(&self.pool)
            .await?;
        collect(rows)
    }
}

#[derive(FromRow)]
struct SkillCountRow {
    skill: String,
    jobs: i64,
}

#[derive(FromRow)]
struct TotalsRow {
    students: i64,
    jobs: i64,
    applications: i64,
    pending_applications: i64,
    match_score_sum: i64,
}

#[async_trait]
impl AnalyticsStore for PgStore {
    async fn skill_demand(&self) -> StoreResult<BTreeMap<String, i64>> {
        let rows = sqlx::query_as::<_, SkillCountRow>(
            r#"
            SELECT lower(trim(skill)) AS skill, COUNT(*)::BIGINT AS jobs
            FROM jobs, unnest(skills) AS skill
            WHERE trim(skill) <> ''
            GROUP BY lower(trim(skill))
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| (r.skill, r.jobs)).collect())
    }

    async fn totals(&self) -> StoreResult<PlacementTotals> {
        let row = sqlx::query_as::<_, TotalsRow>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM students WHERE role = 'student')::BIGINT AS students,
                (SELECT COUNT(*) FROM jobs)::BIGINT AS jobs,
                (SELECT COUNT(*) FROM applications)::BIGINT AS applications,
                (SELECT COUNT(*) FROM applications WHERE status = 'UNDER_REVIEW')::BIGINT
                    AS pending_applications,
                (SELECT COALESCE(SUM(match_score), 0) FROM applications)::BIGINT
                    AS match_score_sum
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(PlacementTotals {
            students: row.students,
            jobs: row.jobs,
            applications: row.applications,
            pending_applications: row.pending_applications,
            match_score_sum: row.match_score_sum,
        })
    }
}
