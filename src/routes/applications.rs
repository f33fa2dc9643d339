use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::application_dto::{
        ApplyPayload, ApplyResponse, JobApplicantsResponse, StudentApplicationsResponse,
        UpdateStatusPayload,
    },
    error::Result,
    middleware::auth::Claims,
    models::application::Application,
    services::application_service::ApplyOutcome,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/applications",
    request_body = ApplyPayload,
    responses(
        (status = 201, description = "Application created", body = ApplyResponse),
        (status = 200, description = "External job, follow `apply_url`", body = ApplyResponse),
        (status = 404, description = "Student or job not found"),
        (status = 409, description = "Already applied")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn apply(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ApplyPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let student_id = claims.student_id()?;
    let (job_id, request) = payload.into_request();

    let outcome = state
        .application_service
        .apply(student_id, job_id, request)
        .await?;
    let status = match outcome {
        ApplyOutcome::External { .. } => StatusCode::OK,
        ApplyOutcome::Created(_) => StatusCode::CREATED,
    };
    Ok((status, Json(ApplyResponse::from(outcome))))
}

#[utoipa::path(
    get,
    path = "/api/applications/student",
    responses((status = 200, description = "Own applications with their jobs, newest first", body = StudentApplicationsResponse)),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_my_applications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let applications = state
        .application_service
        .list_for_student(claims.student_id()?)
        .await?;
    Ok(Json(StudentApplicationsResponse::from(applications)))
}

#[utoipa::path(
    get,
    path = "/api/applications/job/{job_id}",
    params(("job_id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Applications for the job, newest first", body = JobApplicantsResponse),
        (status = 404, description = "Job not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_job_applications(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let applications = state.application_service.list_for_job(job_id).await?;
    Ok(Json(JobApplicantsResponse::from(applications)))
}

#[utoipa::path(
    patch,
    path = "/api/admin/applications/{id}/status",
    params(("id" = Uuid, Path, description = "Application ID")),
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Status updated", body = Application),
        (status = 400, description = "Invalid status value"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Transition not allowed")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn update_application_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse> {
    let application = state
        .application_service
        .transition(id, &payload.status)
        .await?;
    Ok(Json(application))
}
