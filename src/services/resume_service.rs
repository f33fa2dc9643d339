use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use crate::database::{ParsedResumeStore, Stores, StudentStore};
use crate::error::{Error, Result};
use crate::models::parsed_resume::{
    AcademicSnapshot, NewParsedResume, ParsedResume, ParserInfo, ResumeExtract,
};
use crate::models::student::{ResumeMeta, Student};
use crate::services::parser_service::{ParsedResult, ResumeParser};
use crate::services::storage_service::{content_hash, ObjectStorage};
use crate::utils::normalize;

pub const PARSE_FAILED_WARNING: &str =
    "Resume uploaded, but parsing failed. Resume metadata saved.";
const SUMMARY_CHARS: usize = 250;
const PDF_MIME: &str = "application/pdf";

/// Progress of one upload, attached to every log line as `stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Received,
    StorageWriteInFlight,
    StorageFailed,
    StorageCommitted,
    ParseInFlight,
    ParseFailed,
    MetadataOnlySaved,
    ParseSucceeded,
    ExtractPersisted,
    Linked,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStage::Received => "received",
            IngestStage::StorageWriteInFlight => "storage_write_in_flight",
            IngestStage::StorageFailed => "storage_failed",
            IngestStage::StorageCommitted => "storage_committed",
            IngestStage::ParseInFlight => "parse_in_flight",
            IngestStage::ParseFailed => "parse_failed",
            IngestStage::MetadataOnlySaved => "metadata_only_saved",
            IngestStage::ParseSucceeded => "parse_succeeded",
            IngestStage::ExtractPersisted => "extract_persisted",
            IngestStage::Linked => "linked",
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub data: Bytes,
    pub original_name: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Copy)]
pub struct UploadPolicy {
    pub max_bytes: usize,
    pub pdf_only: bool,
}

#[derive(Debug, Clone)]
pub enum IngestOutcome {
    Linked {
        student: Student,
        parsed_resume: ParsedResume,
    },
    /// The file and its metadata were saved but extraction failed. Any earlier
    /// parsed resume is left untouched.
    MetadataOnly { student: Student, warning: String },
}

#[derive(Clone)]
pub struct ResumeService {
    students: Arc<dyn StudentStore>,
    parsed_resumes: Arc<dyn ParsedResumeStore>,
    storage: Arc<dyn ObjectStorage>,
    parser: Arc<dyn ResumeParser>,
    policy: UploadPolicy,
}

impl ResumeService {
    pub fn new(
        stores: &Stores,
        storage: Arc<dyn ObjectStorage>,
        parser: Arc<dyn ResumeParser>,
        policy: UploadPolicy,
    ) -> Self {
        Self {
            students: stores.students.clone(),
            parsed_resumes: stores.parsed_resumes.clone(),
            storage,
            parser,
            policy,
        }
    }

    fn validate(&self, upload: &ResumeUpload) -> Result<()> {
        if upload.data.is_empty() {
            return Err(Error::BadRequest("Resume file is empty".to_string()));
        }
        if upload.data.len() > self.policy.max_bytes {
            return Err(Error::BadRequest(format!(
                "Resume exceeds the maximum size of {} bytes",
                self.policy.max_bytes
            )));
        }
        if self.policy.pdf_only {
            if !upload.mime_type.eq_ignore_ascii_case(PDF_MIME) {
                return Err(Error::BadRequest("Only PDF resumes are accepted".to_string()));
            }
            if !upload.data.starts_with(b"%PDF") {
                return Err(Error::BadRequest(
                    "Uploaded file is not a valid PDF".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Stores the file, records its metadata, then replaces the parsed resume.
    ///
    /// The steps are ordered but not atomic: metadata is committed before parsing
    /// starts, so a failed parse leaves new metadata next to the previous extraction.
    pub async fn ingest(&self, student_id: Uuid, upload: ResumeUpload) -> Result<IngestOutcome> {
        tracing::info!(
            student_id = %student_id,
            stage = %IngestStage::Received,
            size = upload.data.len(),
            "resume upload received"
        );

        let student = self
            .students
            .get(student_id)
            .await?
            .ok_or_else(|| Error::NotFound("Student not found".to_string()))?;
        self.validate(&upload)?;

        if let Some(previous) = &student.resume {
            self.delete_blob(student_id, &previous.storage_key).await;
        }

        tracing::info!(student_id = %student_id, stage = %IngestStage::StorageWriteInFlight, "storing resume");
        let stored = match self
            .storage
            .store(
                student_id,
                upload.data.clone(),
                &upload.mime_type,
                &upload.original_name,
            )
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!(
                    student_id = %student_id,
                    stage = %IngestStage::StorageFailed,
                    operation = "store",
                    error = %e,
                    "resume storage failed"
                );
                return Err(match e {
                    Error::Storage(_) => e,
                    other => Error::Storage(other.to_string()),
                });
            }
        };

        let meta = ResumeMeta {
            original_name: upload.original_name.clone(),
            mime_type: upload.mime_type.clone(),
            size: upload.data.len() as i64,
            content_hash: content_hash(&upload.data),
            url: stored.url,
            storage_key: stored.key,
            uploaded_at: Utc::now(),
        };
        let student = self
            .students
            .set_resume(student_id, meta.clone())
            .await?
            .ok_or_else(|| Error::NotFound("Student not found".to_string()))?;
        tracing::info!(
            student_id = %student_id,
            stage = %IngestStage::StorageCommitted,
            storage_key = %meta.storage_key,
            "resume metadata saved"
        );

        tracing::info!(student_id = %student_id, stage = %IngestStage::ParseInFlight, "parsing resume");
        let parsed = match self
            .parser
            .parse(upload.data, &upload.original_name, &upload.mime_type)
            .await
        {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(
                    student_id = %student_id,
                    stage = %IngestStage::ParseFailed,
                    operation = "parse",
                    error = %e,
                    "resume parsing failed"
                );
                tracing::info!(student_id = %student_id, stage = %IngestStage::MetadataOnlySaved, "keeping metadata only");
                return Ok(IngestOutcome::MetadataOnly {
                    student,
                    warning: PARSE_FAILED_WARNING.to_string(),
                });
            }
        };
        tracing::info!(
            student_id = %student_id,
            stage = %IngestStage::ParseSucceeded,
            skills = parsed.skills.len(),
            "resume parsed"
        );

        let record = build_parsed_resume(&student, meta, parsed);
        let parsed_resume = self.parsed_resumes.replace_for_student(record).await?;
        tracing::info!(
            student_id = %student_id,
            stage = %IngestStage::ExtractPersisted,
            parsed_resume_id = %parsed_resume.id,
            "parsed resume saved"
        );

        let student = self
            .students
            .set_parsed_resume(student_id, parsed_resume.id)
            .await?
            .ok_or_else(|| Error::NotFound("Student not found".to_string()))?;
        tracing::info!(student_id = %student_id, stage = %IngestStage::Linked, "resume linked");

        Ok(IngestOutcome::Linked {
            student,
            parsed_resume,
        })
    }

    /// Removes the blob, the parsed resume and the student's resume fields, in that
    /// order. Succeeds when there is nothing to delete.
    pub async fn delete_resume(&self, student_id: Uuid) -> Result<Student> {
        let student = self
            .students
            .get(student_id)
            .await?
            .ok_or_else(|| Error::NotFound("Student not found".to_string()))?;

        if let Some(resume) = &student.resume {
            self.delete_blob(student_id, &resume.storage_key).await;
        }

        let removed = self.parsed_resumes.delete_for_student(student_id).await?;
        let student = self
            .students
            .clear_resume(student_id)
            .await?
            .ok_or_else(|| Error::NotFound("Student not found".to_string()))?;

        tracing::info!(student_id = %student_id, parsed_removed = removed, "resume deleted");
        Ok(student)
    }

    pub async fn get_parsed_resume(&self, student_id: Uuid) -> Result<ParsedResume> {
        self.parsed_resumes
            .find_by_student(student_id)
            .await?
            .ok_or_else(|| Error::NotFound("Parsed resume not found".to_string()))
    }

    async fn delete_blob(&self, student_id: Uuid, key: &str) {
        if key.is_empty() {
            return;
        }
        if let Err(e) = self.storage.delete(key).await {
            tracing::warn!(
                student_id = %student_id,
                operation = "delete",
                storage_key = %key,
                error = %e,
                "could not remove stored resume"
            );
        }
    }
}

/// Academic fields reported by the extraction win, the profile fills the gaps.
fn build_parsed_resume(student: &Student, meta: ResumeMeta, parsed: ParsedResult) -> NewParsedResume {
    let summary = parsed.summary.clone().unwrap_or_else(|| {
        normalize::truncate_chars(&normalize::collapse_whitespace(&parsed.raw_text), SUMMARY_CHARS)
    });

    NewParsedResume {
        student_id: student.id,
        resume_meta: Some(meta),
        extract: ResumeExtract {
            skills: normalize::dedup_trimmed(&parsed.skills),
            projects: parsed.projects,
            tools: normalize::dedup_trimmed(&parsed.tools),
            experience: parsed.experience,
            education: parsed.education,
            summary,
            raw_text: parsed.raw_text,
        },
        academics: AcademicSnapshot {
            branch: parsed.branch.or_else(|| student.branch.clone()),
            gpa: parsed.gpa.or(student.gpa),
            batch: parsed.batch.or_else(|| student.batch.clone()),
        },
        skill_embedding: parsed.embedding,
        parser: ParserInfo {
            engine: parsed.engine,
            version: parsed.version,
            error: None,
        },
    }
}
