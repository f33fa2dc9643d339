use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::database::{AnalyticsStore, Stores};
use crate::error::Result;

/// How many jobs ask for each skill, keyed by the lowercased skill name.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SkillDemand {
    pub skills: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MatchSummary {
    pub students: i64,
    pub jobs: i64,
    pub applications: i64,
    /// Mean application match score rounded to the nearest integer; 0 with no applications.
    pub average_score: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AdminOverview {
    pub total_jobs: i64,
    pub total_applications: i64,
    pub pending_applications: i64,
}

#[derive(Clone)]
pub struct AnalyticsService {
    analytics: Arc<dyn AnalyticsStore>,
}

impl AnalyticsService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            analytics: stores.analytics.clone(),
        }
    }

    pub async fn skill_demand(&self) -> Result<SkillDemand> {
        let skills = self.analytics.skill_demand().await?;
        Ok(SkillDemand { skills })
    }

    pub async fn match_summary(&self) -> Result<MatchSummary> {
        let totals = self.analytics.totals().await?;
        let average_score = if totals.applications > 0 {
            (totals.match_score_sum as f64 / totals.applications as f64).round() as i64
        } else {
            0
        };
        Ok(MatchSummary {
            students: totals.students,
            jobs: totals.jobs,
            applications: totals.applications,
            average_score,
        })
    }

    pub async fn overview(&self) -> Result<AdminOverview> {
        let totals = self.analytics.totals().await?;
        Ok(AdminOverview {
            total_jobs: totals.jobs,
            total_applications: totals.applications,
            pending_applications: totals.pending_applications,
        })
    }
}
