use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::job_dto::{CreateJobPayload, JobListQuery, JobListResponse},
    error::Result,
    middleware::auth::Claims,
    models::job::Job,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/jobs",
    params(JobListQuery),
    responses(
        (status = 200, description = "Jobs, newest first", body = JobListResponse),
        (status = 400, description = "Unknown job type")
    )
)]
#[axum::debug_handler]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> Result<impl IntoResponse> {
    let jobs = state.job_service.list(query.into_filter()?).await?;
    Ok(Json(JobListResponse {
        count: jobs.len(),
        jobs,
    }))
}

#[utoipa::path(
    get,
    path = "/api/jobs/{id}",
    params(("id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job", body = Job),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state.job_service.get(id).await?;
    Ok(Json(job))
}

#[utoipa::path(
    post,
    path = "/api/jobs",
    request_body = CreateJobPayload,
    responses(
        (status = 201, description = "Job created", body = Job),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn create_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateJobPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let posted_by = claims.student_id().ok();
    let job = state
        .job_service
        .create(payload.into_new_job(posted_by)?)
        .await?;
    Ok((StatusCode::CREATED, Json(job)))
}
