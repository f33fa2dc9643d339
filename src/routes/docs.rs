use axum::{response::IntoResponse, Json};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::dto::{
    application_dto::{
        ApplyPayload, ApplyResponse, JobApplicantsResponse, StudentApplicationsResponse,
        UpdateStatusPayload,
    },
    job_dto::{CreateJobPayload, JobListResponse},
    student_dto::{
        ResumeDeleteResponse, ResumeUploadForm, ResumeUploadResponse, UpsertStudentPayload,
    },
};
use crate::models::{
    application::{Application, ApplicationStatus, ApplicationWithJob, ApplicationWithStudent},
    job::{Job, JobSummary, JobType},
    parsed_resume::{AcademicSnapshot, ParsedResume, ParserInfo, ResumeExtract},
    student::{ResumeMeta, Role, Student, StudentSummary},
};
use crate::services::{
    analytics_service::{AdminOverview, MatchSummary, SkillDemand},
    recommendation_service::{EmptyReason, JobMatch, Recommendation, RecommendationList},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::health::health,
        super::students::upsert_student,
        super::students::get_me,
        super::students::upload_resume,
        super::students::delete_resume,
        super::students::get_parsed_resume,
        super::students::get_recommendations,
        super::students::get_job_recommendation,
        super::jobs::list_jobs,
        super::jobs::get_job,
        super::jobs::create_job,
        super::applications::apply,
        super::applications::list_my_applications,
        super::applications::list_job_applications,
        super::applications::update_application_status,
        super::analytics::skill_demand,
        super::analytics::match_summary,
        super::analytics::overview,
    ),
    components(schemas(
        Student, Role, ResumeMeta,
        Job, JobType,
        ParsedResume, ResumeExtract, AcademicSnapshot, ParserInfo,
        Application, ApplicationStatus,
        UpsertStudentPayload, ResumeUploadForm, ResumeUploadResponse, ResumeDeleteResponse,
        CreateJobPayload, JobListResponse,
        ApplyPayload, ApplyResponse, UpdateStatusPayload,
        StudentApplicationsResponse, JobApplicantsResponse,
        ApplicationWithJob, ApplicationWithStudent, JobSummary, StudentSummary,
        RecommendationList, Recommendation, JobMatch, EmptyReason,
        SkillDemand, MatchSummary, AdminOverview,
    )),
    modifiers(&BearerAuth),
    tags((name = "placement", description = "Resume ingestion, job matching, applications and placement analytics"))
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
