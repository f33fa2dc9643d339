pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::database::Stores;
use crate::error::Result;
use crate::services::{
    analytics_service::AnalyticsService,
    application_service::ApplicationService,
    job_service::JobService,
    parser_service::{HttpResumeParser, ResumeParser},
    ranking_service::{HttpRanker, Ranker},
    recommendation_service::RecommendationService,
    resume_service::{ResumeService, UploadPolicy},
    storage_service::{LocalDiskStorage, ObjectStorage},
    student_service::StudentService,
};
use reqwest::Client;
use sqlx::PgPool;

/// External collaborators, built once and shared by every request.
#[derive(Clone)]
pub struct Adapters {
    pub storage: Arc<dyn ObjectStorage>,
    pub parser: Arc<dyn ResumeParser>,
    pub ranker: Arc<dyn Ranker>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub jwt_secret: String,
    pub upload_policy: UploadPolicy,
}

#[derive(Clone)]
pub struct AppState {
    pub student_service: StudentService,
    pub job_service: JobService,
    pub resume_service: ResumeService,
    pub recommendation_service: RecommendationService,
    pub application_service: ApplicationService,
    pub analytics_service: AnalyticsService,
    pub jwt_secret: String,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.ai_service_timeout_secs))
            .build()?;

        let adapters = Adapters {
            storage: Arc::new(LocalDiskStorage::new(
                &config.uploads_dir,
                &config.public_base_url,
            )),
            parser: Arc::new(HttpResumeParser::new(
                http_client.clone(),
                &config.ai_service_url,
            )?),
            ranker: Arc::new(HttpRanker::new(http_client, &config.ai_service_url)?),
        };
        let settings = Settings {
            jwt_secret: config.jwt_secret.clone(),
            upload_policy: UploadPolicy {
                max_bytes: config.max_resume_bytes,
                pdf_only: config.resume_pdf_only,
            },
        };

        Ok(Self::from_parts(Stores::postgres(pool), adapters, settings))
    }

    pub fn from_parts(stores: Stores, adapters: Adapters, settings: Settings) -> Self {
        Self {
            student_service: StudentService::new(&stores),
            job_service: JobService::new(&stores),
            resume_service: ResumeService::new(
                &stores,
                adapters.storage,
                adapters.parser,
                settings.upload_policy,
            ),
            recommendation_service: RecommendationService::new(&stores, adapters.ranker),
            application_service: ApplicationService::new(&stores),
            analytics_service: AnalyticsService::new(&stores),
            jwt_secret: settings.jwt_secret,
            max_upload_bytes: settings.upload_policy.max_bytes,
        }
    }
}
