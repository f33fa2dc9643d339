pub mod analytics;
pub mod applications;
pub mod docs;
pub mod health;
pub mod jobs;
pub mod students;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};

use crate::middleware::auth::{require_admin, require_auth};
use crate::AppState;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Every API route with its auth layer, bound to `state`.
pub fn api_router(state: AppState) -> Router {
    let upload_limit = state.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    let public = Router::new()
        .route("/health", get(health::health))
        .route("/api-docs/openapi.json", get(docs::openapi_json))
        .route("/api/students", post(students::upsert_student))
        .route(
            "/api/jobs",
            get(jobs::list_jobs).merge(
                post(jobs::create_job)
                    .route_layer(from_fn_with_state(state.clone(), require_admin)),
            ),
        )
        .route("/api/jobs/:id", get(jobs::get_job));

    let student = Router::new()
        .route("/api/students/me", get(students::get_me))
        .route(
            "/api/students/me/resume",
            get(students::get_parsed_resume)
                .post(students::upload_resume)
                .delete(students::delete_resume)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/students/me/resume/delete",
            post(students::delete_resume),
        )
        .route(
            "/api/students/me/recommendations",
            get(students::get_recommendations),
        )
        .route(
            "/api/students/me/recommendations/:job_id",
            get(students::get_job_recommendation),
        )
        .route("/api/jobs/apply", post(applications::apply))
        .route("/api/applications", post(applications::apply))
        .route(
            "/api/applications/student",
            get(applications::list_my_applications),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let admin = Router::new()
        .route(
            "/api/applications/job/:job_id",
            get(applications::list_job_applications),
        )
        .route(
            "/api/admin/applications/:id/status",
            patch(applications::update_application_status),
        )
        .route("/api/analytics/skills", get(analytics::skill_demand))
        .route("/api/analytics/matches", get(analytics::match_summary))
        .route("/api/admin/overview", get(analytics::overview))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    public.merge(student).merge(admin).with_state(state)
}
