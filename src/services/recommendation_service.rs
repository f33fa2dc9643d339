use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::database::{JobStore, ParsedResumeStore, Stores, StudentStore};
use crate::error::{Error, Result};
use crate::models::job::{Job, JobFilter, JobType};
use crate::models::parsed_resume::ParsedResume;
use crate::services::eligibility::{is_eligible, AcademicProfile, JobConstraints};
use crate::services::ranking_service::{
    JobPayload, RankedJob, Ranker, RankingRequest, RankingResponse, StudentPayload,
};

/// Why a recommendation list or a single-job score is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    NoParsedResume,
    NoEligibleJobs,
    NotEligible,
    NotRanked,
}

impl EmptyReason {
    pub fn message(&self) -> &'static str {
        match self {
            EmptyReason::NoParsedResume => "Upload a resume to get recommendations",
            EmptyReason::NoEligibleJobs => "No eligible jobs",
            EmptyReason::NotEligible => "You do not meet the eligibility criteria for this job",
            EmptyReason::NotRanked => "The ranking service returned no score for this job",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Recommendation {
    pub job_id: Uuid,
    pub title: String,
    pub company: Option<String>,
    pub job_type: JobType,
    pub match_score: i32,
    pub ai_score: f64,
    pub reasons: Vec<String>,
    pub external_apply: bool,
    pub apply_url: Option<String>,
}

impl Recommendation {
    fn from_ranked(job: &Job, ranked: &RankedJob) -> Self {
        Self {
            job_id: job.id,
            title: job.title.clone(),
            company: job.company.clone(),
            job_type: job.job_type,
            match_score: to_match_score(ranked.match_percent),
            ai_score: ranked.score,
            reasons: ranked.reasons.clone(),
            external_apply: job.external_apply,
            apply_url: job.external_apply_url().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecommendationList {
    pub student_id: Uuid,
    pub recommendations: Vec<Recommendation>,
    pub count: usize,
    pub used_ranker: bool,
    pub model_version: Option<String>,
    pub reason: Option<EmptyReason>,
    pub message: Option<String>,
}

impl RecommendationList {
    fn empty(student_id: Uuid, reason: EmptyReason) -> Self {
        Self {
            student_id,
            recommendations: Vec::new(),
            count: 0,
            used_ranker: false,
            model_version: None,
            reason: Some(reason),
            message: Some(reason.message().to_string()),
        }
    }
}

/// Score of one job for one student. A zero score always carries a reason.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobMatch {
    pub student_id: Uuid,
    pub job_id: Uuid,
    pub match_score: i32,
    pub ai_score: f64,
    pub reasons: Vec<String>,
    pub eligible: bool,
    pub reason: Option<EmptyReason>,
}

impl JobMatch {
    fn zero(student_id: Uuid, job_id: Uuid, eligible: bool, reason: EmptyReason) -> Self {
        Self {
            student_id,
            job_id,
            match_score: 0,
            ai_score: 0.0,
            reasons: vec![reason.message().to_string()],
            eligible,
            reason: Some(reason),
        }
    }
}

/// Rounds to the nearest integer and clamps to 0..=100. NaN scores as 0.
pub fn to_match_score(match_percent: f64) -> i32 {
    if match_percent.is_nan() {
        return 0;
    }
    match_percent.round().clamp(0.0, 100.0) as i32
}

#[derive(Clone)]
pub struct RecommendationService {
    students: Arc<dyn StudentStore>,
    jobs: Arc<dyn JobStore>,
    parsed_resumes: Arc<dyn ParsedResumeStore>,
    ranker: Arc<dyn Ranker>,
}

impl RecommendationService {
    pub fn new(stores: &Stores, ranker: Arc<dyn Ranker>) -> Self {
        Self {
            students: stores.students.clone(),
            jobs: stores.jobs.clone(),
            parsed_resumes: stores.parsed_resumes.clone(),
            ranker,
        }
    }

    /// Looked up by student id, so a stale pointer on the student is never followed.
    async fn load_parsed(&self, student_id: Uuid) -> Result<Option<ParsedResume>> {
        self.students
            .get(student_id)
            .await?
            .ok_or_else(|| Error::NotFound("Student not found".to_string()))?;
        Ok(self.parsed_resumes.find_by_student(student_id).await?)
    }

    async fn rank(&self, parsed: &ParsedResume, jobs: &[Job]) -> Result<RankingResponse> {
        let request = RankingRequest {
            student: StudentPayload::from_parsed(parsed),
            jobs: jobs.iter().map(JobPayload::from).collect(),
        };
        self.ranker.rank(request).await.map_err(|e| {
            tracing::error!(
                student_id = %parsed.student_id,
                operation = "rank",
                jobs = jobs.len(),
                error = %e,
                "ranking failed"
            );
            match e {
                Error::Upstream { .. } => e,
                other => Error::upstream("ranking service", other.to_string()),
            }
        })
    }

    /// Ranked, eligible jobs in the order the ranker returned them.
    pub async fn recommend(&self, student_id: Uuid) -> Result<RecommendationList> {
        let Some(parsed) = self.load_parsed(student_id).await? else {
            tracing::info!(student_id = %student_id, "no parsed resume, skipping ranking");
            return Ok(RecommendationList::empty(student_id, EmptyReason::NoParsedResume));
        };

        let profile = AcademicProfile::from(&parsed.academics);
        let eligible: Vec<Job> = self
            .jobs
            .list(JobFilter::default())
            .await?
            .into_iter()
            .filter(|job| is_eligible(&profile, &JobConstraints::from(job)))
            .collect();

        if eligible.is_empty() {
            tracing::info!(student_id = %student_id, "no eligible jobs");
            return Ok(RecommendationList::empty(student_id, EmptyReason::NoEligibleJobs));
        }

        let response = self.rank(&parsed, &eligible).await?;
        let by_id: HashMap<Uuid, &Job> = eligible.iter().map(|job| (job.id, job)).collect();

        let recommendations: Vec<Recommendation> = response
            .recommendations
            .iter()
            .filter_map(|ranked| {
                let job = ranked.job_uuid().and_then(|id| by_id.get(&id));
                if job.is_none() {
                    tracing::warn!(student_id = %student_id, job_id = %ranked.job_id, "ranker returned unknown job");
                }
                job.map(|job| Recommendation::from_ranked(job, ranked))
            })
            .collect();

        tracing::info!(
            student_id = %student_id,
            eligible = eligible.len(),
            ranked = recommendations.len(),
            used_ranker = response.used_ranker,
            "recommendations ready"
        );

        Ok(RecommendationList {
            student_id,
            count: recommendations.len(),
            recommendations,
            used_ranker: response.used_ranker,
            model_version: response.model_version,
            reason: None,
            message: None,
        })
    }

    pub async fn recommend_for_job(&self, student_id: Uuid, job_id: Uuid) -> Result<JobMatch> {
        let parsed = self.load_parsed(student_id).await?;
        let job = self
            .jobs
            .get(job_id)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".to_string()))?;

        let Some(parsed) = parsed else {
            return Ok(JobMatch::zero(student_id, job_id, false, EmptyReason::NoParsedResume));
        };

        let profile = AcademicProfile::from(&parsed.academics);
        if !is_eligible(&profile, &JobConstraints::from(&job)) {
            return Ok(JobMatch::zero(student_id, job_id, false, EmptyReason::NotEligible));
        }

        let response = self.rank(&parsed, std::slice::from_ref(&job)).await?;
        let ranked = response
            .recommendations
            .iter()
            .find(|ranked| ranked.job_uuid() == Some(job_id));

        Ok(match ranked {
            Some(ranked) => JobMatch {
                student_id,
                job_id,
                match_score: to_match_score(ranked.match_percent),
                ai_score: ranked.score,
                reasons: ranked.reasons.clone(),
                eligible: true,
                reason: None,
            },
            None => JobMatch::zero(student_id, job_id, true, EmptyReason::NotRanked),
        })
    }
}
