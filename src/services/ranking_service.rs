use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use url::Url;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::job::Job;
use crate::models::parsed_resume::ParsedResume;
use crate::utils::normalize::{self, lookup};

const SERVICE: &str = "ranking service";
const NO_RESUME_TEXT: &str = "No resume text";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentPayload {
    pub id: String,
    pub resume_text: String,
    pub skills: Vec<String>,
    #[serde(rename = "skillEmbedding")]
    pub skill_embedding: Vec<f32>,
    pub branch: Option<String>,
    pub domains: Vec<String>,
    pub gpa: f64,
    pub experience: Vec<JsonValue>,
    pub education: Vec<JsonValue>,
    pub projects: Vec<JsonValue>,
    pub positions: Vec<String>,
    pub responsibilities: String,
}

impl StudentPayload {
    /// Academic fields come from the parsed resume snapshot.
    pub fn from_parsed(parsed: &ParsedResume) -> Self {
        let extract = &parsed.extract;

        let positions = extract
            .experience
            .iter()
            .filter_map(|entry| normalize::opt_string(lookup(entry, "position")))
            .collect();
        let responsibilities = extract
            .experience
            .iter()
            .filter_map(|entry| normalize::opt_string(lookup(entry, "description")))
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            id: parsed.student_id.to_string(),
            resume_text: resume_text(parsed),
            skills: normalize::dedup_trimmed(&extract.skills),
            skill_embedding: parsed.skill_embedding.clone().unwrap_or_default(),
            branch: parsed.academics.branch.clone(),
            domains: Vec::new(),
            gpa: parsed.academics.gpa.unwrap_or(0.0),
            experience: extract.experience.clone(),
            education: extract.education.clone(),
            projects: extract.projects.clone(),
            positions,
            responsibilities,
        }
    }
}

/// Raw text when present, otherwise summary, experience descriptions and project
/// titles stitched together.
fn resume_text(parsed: &ParsedResume) -> String {
    let extract = &parsed.extract;
    let raw = extract.raw_text.trim();
    if !raw.is_empty() {
        return raw.to_string();
    }

    let text_of = |entry: &JsonValue, field: &str| match entry {
        JsonValue::String(s) => Some(s.trim().to_string()),
        _ => normalize::opt_string(entry.get(field)),
    };

    let mut sections = vec![extract.summary.trim().to_string()];
    sections.extend(extract.experience.iter().filter_map(|e| text_of(e, "description")));
    sections.extend(extract.projects.iter().filter_map(|p| text_of(p, "title")));

    let stitched = sections
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if stitched.is_empty() {
        NO_RESUME_TEXT.to_string()
    } else {
        stitched
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobPayload {
    pub id: String,
    pub title: String,
    pub description: String,
    pub skills: Vec<String>,
    pub skills_required: Vec<String>,
    pub related_skills_in_job: Vec<String>,
    pub tools: Vec<String>,
    pub company: String,
    pub branch: Option<String>,
    pub domain: Option<String>,
    pub domains: Vec<String>,
    pub education_requirement: String,
    pub experience_requirement: String,
    pub responsibilities_text: String,
}

impl From<&Job> for JobPayload {
    fn from(job: &Job) -> Self {
        let description = if job.description.trim().is_empty() {
            job.requirements_text.clone()
        } else {
            job.description.clone()
        };
        let skills = normalize::dedup_trimmed(&job.skills);

        Self {
            id: job.id.to_string(),
            title: job.title.clone(),
            skills_required: skills.clone(),
            skills,
            related_skills_in_job: Vec::new(),
            tools: normalize::dedup_trimmed(&job.tools),
            company: job.company.clone().unwrap_or_default(),
            branch: job
                .branch
                .as_deref()
                .map(|b| b.trim().to_lowercase())
                .filter(|b| !b.is_empty()),
            domain: job.domains.first().cloned(),
            domains: normalize::lowercase_tags(&job.domains),
            education_requirement: String::new(),
            experience_requirement: job.requirements_text.clone(),
            responsibilities_text: description.clone(),
            description,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankingRequest {
    pub student: StudentPayload,
    pub jobs: Vec<JobPayload>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RankedJob {
    pub job_id: String,
    #[serde(default)]
    pub match_percent: f64,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl RankedJob {
    pub fn job_uuid(&self) -> Option<Uuid> {
        Uuid::parse_str(self.job_id.trim()).ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RankingResponse {
    #[serde(default)]
    pub recommendations: Vec<RankedJob>,
    #[serde(default)]
    pub used_ranker: bool,
    #[serde(default)]
    pub model_version: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Ranker: Send + Sync {
    async fn rank(&self, request: RankingRequest) -> Result<RankingResponse>;
}

#[derive(Clone)]
pub struct HttpRanker {
    client: Client,
    endpoint: Url,
}

impl HttpRanker {
    pub fn new(client: Client, base_url: &Url) -> Result<Self> {
        let endpoint = base_url
            .join("recommend")
            .map_err(|e| Error::Config(format!("invalid AI_SERVICE_URL: {}", e)))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Ranker for HttpRanker {
    async fn rank(&self, request: RankingRequest) -> Result<RankingResponse> {
        let res = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::upstream(SERVICE, e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::upstream(SERVICE, format!("{}: {}", status, text)));
        }

        res.json::<RankingResponse>()
            .await
            .map_err(|e| Error::upstream(SERVICE, format!("undecodable response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parsed_resume::{AcademicSnapshot, ParserInfo, ResumeExtract};
    use chrono::Utc;
    use serde_json::json;

    fn parsed(extract: ResumeExtract) -> ParsedResume {
        ParsedResume {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            resume_meta: None,
            extract,
            academics: AcademicSnapshot {
                branch: Some("cse".into()),
                gpa: None,
                batch: Some("2025".into()),
            },
            skill_embedding: None,
            parsed_at: Utc::now(),
            parser: ParserInfo {
                engine: "test".into(),
                version: "1".into(),
                error: None,
            },
        }
    }

    #[test]
    fn student_payload_derives_positions_and_responsibilities() {
        let payload = StudentPayload::from_parsed(&parsed(ResumeExtract {
            skills: vec!["Rust".into(), "rust".into()],
            experience: vec![
                json!({ "role": "Backend Intern", "description": "Wrote services" }),
                json!({ "position": "TA", "description": "Graded labs" }),
                json!("freeform line"),
            ],
            raw_text: "  full text  ".into(),
            ..Default::default()
        }));

        assert_eq!(payload.positions, vec!["Backend Intern", "TA"]);
        assert_eq!(payload.responsibilities, "Wrote services Graded labs");
        assert_eq!(payload.skills, vec!["Rust"]);
        assert_eq!(payload.resume_text, "full text");
        assert_eq!(payload.gpa, 0.0);
    }

    #[test]
    fn resume_text_falls_back_to_stitched_sections() {
        let stitched = StudentPayload::from_parsed(&parsed(ResumeExtract {
            summary: "Summary".into(),
            experience: vec![json!({ "description": "Did things" })],
            projects: vec![json!({ "title": "Compiler" }), json!("Side project")],
            ..Default::default()
        }));
        assert_eq!(stitched.resume_text, "Summary\nDid things\nCompiler\nSide project");

        let empty = StudentPayload::from_parsed(&parsed(ResumeExtract::default()));
        assert_eq!(empty.resume_text, "No resume text");
    }

    #[test]
    fn ranking_response_tolerates_missing_fields() {
        let body = json!({
            "recommendations": [{ "job_id": "not-a-uuid", "match_percent": 71.6 }]
        });
        let parsed: RankingResponse = serde_json::from_value(body).unwrap();
        assert!(!parsed.used_ranker);
        assert!(parsed.model_version.is_none());
        assert_eq!(parsed.recommendations[0].score, 0.0);
        assert!(parsed.recommendations[0].job_uuid().is_none());
    }
}
