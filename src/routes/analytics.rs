use axum::{
    extract::State,
    response::{IntoResponse, Json},
};

use crate::{
    error::Result,
    services::analytics_service::{AdminOverview, MatchSummary, SkillDemand},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/analytics/skills",
    responses(
        (status = 200, description = "Number of jobs asking for each skill", body = SkillDemand),
        (status = 403, description = "Admin access required")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn skill_demand(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.analytics_service.skill_demand().await?))
}

#[utoipa::path(
    get,
    path = "/api/analytics/matches",
    responses(
        (status = 200, description = "Student, job and application counts with the average match score", body = MatchSummary),
        (status = 403, description = "Admin access required")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn match_summary(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.analytics_service.match_summary().await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/overview",
    responses(
        (status = 200, description = "Job and application totals", body = AdminOverview),
        (status = 403, description = "Admin access required")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn overview(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.analytics_service.overview().await?))
}
