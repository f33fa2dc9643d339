use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::student_dto::{
        ResumeDeleteResponse, ResumeUploadForm, ResumeUploadResponse, UpsertStudentPayload,
    },
    error::{Error, Result},
    middleware::auth::Claims,
    models::{parsed_resume::ParsedResume, student::Student},
    services::{
        recommendation_service::{JobMatch, RecommendationList},
        resume_service::{IngestOutcome, ResumeUpload},
    },
    AppState,
};

const RESUME_FIELDS: [&str; 2] = ["resume", "file"];

fn guess_mime(file_name: &str) -> &'static str {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        "application/pdf"
    } else if lower.ends_with(".docx") {
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    } else if lower.ends_with(".doc") {
        "application/msword"
    } else {
        "application/octet-stream"
    }
}

#[utoipa::path(
    post,
    path = "/api/students",
    request_body = UpsertStudentPayload,
    responses(
        (status = 200, description = "Student created or updated", body = Student),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn upsert_student(
    State(state): State<AppState>,
    Json(payload): Json<UpsertStudentPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let student = state.student_service.upsert_profile(payload.into()).await?;
    Ok((StatusCode::OK, Json(student)))
}

#[utoipa::path(
    get,
    path = "/api/students/me",
    responses(
        (status = 200, description = "Current student", body = Student),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Student not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let student = state.student_service.get(claims.student_id()?).await?;
    Ok(Json(student))
}

#[utoipa::path(
    post,
    path = "/api/students/me/resume",
    request_body(content = ResumeUploadForm, content_type = "multipart/form-data", description = "PDF file in the `resume` or `file` field"),
    responses(
        (status = 200, description = "Resume stored; parsed unless `warning` is set", body = ResumeUploadResponse),
        (status = 400, description = "Missing, empty, oversized or non-PDF file"),
        (status = 502, description = "File storage failed")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn upload_resume(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let student_id = claims.student_id()?;
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!(student_id = %student_id, "failed to read multipart field: {}", e);
        Error::BadRequest(e.to_string())
    })? {
        let is_resume = field
            .name()
            .is_some_and(|name| RESUME_FIELDS.contains(&name));
        if !is_resume {
            continue;
        }

        let original_name = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "resume.pdf".to_string());
        let mime_type = field
            .content_type()
            .map(str::to_string)
            .filter(|mime| mime != "application/octet-stream")
            .unwrap_or_else(|| guess_mime(&original_name).to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::BadRequest(format!("could not read upload: {}", e)))?;

        upload = Some(ResumeUpload {
            data,
            original_name,
            mime_type,
        });
        break;
    }

    let upload = upload.ok_or_else(|| {
        Error::BadRequest("No resume file provided (expected field 'resume' or 'file')".to_string())
    })?;

    let response = match state.resume_service.ingest(student_id, upload).await? {
        IngestOutcome::Linked {
            student,
            parsed_resume,
        } => ResumeUploadResponse {
            message: "Resume processed and parsed data saved.".to_string(),
            student,
            parsed_resume: Some(parsed_resume),
            warning: None,
        },
        IngestOutcome::MetadataOnly { student, warning } => ResumeUploadResponse {
            message: warning.clone(),
            student,
            parsed_resume: None,
            warning: Some(warning),
        },
    };
    Ok(Json(response))
}

#[utoipa::path(
    delete,
    path = "/api/students/me/resume",
    responses(
        (status = 200, description = "Resume removed (also when there was none)", body = ResumeDeleteResponse),
        (status = 404, description = "Student not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn delete_resume(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let student = state.resume_service.delete_resume(claims.student_id()?).await?;
    Ok(Json(ResumeDeleteResponse {
        message: "Resume deleted successfully".to_string(),
        student,
    }))
}

#[utoipa::path(
    get,
    path = "/api/students/me/resume",
    responses(
        (status = 200, description = "Parsed resume", body = ParsedResume),
        (status = 404, description = "No parsed resume")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn get_parsed_resume(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let parsed = state
        .resume_service
        .get_parsed_resume(claims.student_id()?)
        .await?;
    Ok(Json(parsed))
}

#[utoipa::path(
    get,
    path = "/api/students/me/recommendations",
    responses(
        (status = 200, description = "Ranked eligible jobs; empty with a reason when there are none", body = RecommendationList),
        (status = 503, description = "Ranking service unavailable, retry later")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn get_recommendations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let list = state
        .recommendation_service
        .recommend(claims.student_id()?)
        .await?;
    Ok(Json(list))
}

#[utoipa::path(
    get,
    path = "/api/students/me/recommendations/{job_id}",
    params(("job_id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Score for one job", body = JobMatch),
        (status = 404, description = "Job not found"),
        (status = 503, description = "Ranking service unavailable, retry later")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn get_job_recommendation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let matched = state
        .recommendation_service
        .recommend_for_job(claims.student_id()?, job_id)
        .await?;
    Ok(Json(matched))
}
