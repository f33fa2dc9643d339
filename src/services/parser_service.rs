use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Client};
use serde_json::Value as JsonValue;
use url::Url;

use crate::error::{Error, Result};
use crate::utils::normalize::{self, lookup};

const SERVICE: &str = "resume parser";

/// Structured extraction returned by the parsing collaborator, already normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResult {
    pub skills: Vec<String>,
    pub projects: Vec<JsonValue>,
    pub tools: Vec<String>,
    pub experience: Vec<JsonValue>,
    pub education: Vec<JsonValue>,
    pub summary: Option<String>,
    pub raw_text: String,
    pub branch: Option<String>,
    pub gpa: Option<f64>,
    pub batch: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub engine: String,
    pub version: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResumeParser: Send + Sync {
    async fn parse(&self, data: Bytes, original_name: &str, mime_type: &str)
        -> Result<ParsedResult>;
}

#[derive(Clone)]
pub struct HttpResumeParser {
    client: Client,
    endpoint: Url,
}

impl HttpResumeParser {
    pub fn new(client: Client, base_url: &Url) -> Result<Self> {
        let endpoint = base_url
            .join("parse_resume")
            .map_err(|e| Error::Config(format!("invalid AI_SERVICE_URL: {}", e)))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl ResumeParser for HttpResumeParser {
    async fn parse(
        &self,
        data: Bytes,
        original_name: &str,
        mime_type: &str,
    ) -> Result<ParsedResult> {
        let file_name = if original_name.trim().is_empty() {
            "resume.pdf".to_string()
        } else {
            original_name.to_string()
        };
        let part = multipart::Part::bytes(data.to_vec())
            .file_name(file_name)
            .mime_str(mime_type)
            .map_err(|e| Error::BadRequest(format!("invalid mime type '{}': {}", mime_type, e)))?;
        let form = multipart::Form::new().part("file", part);

        let res = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::upstream(SERVICE, e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::upstream(SERVICE, format!("{}: {}", status, text)));
        }

        let body: JsonValue = res
            .json()
            .await
            .map_err(|e| Error::upstream(SERVICE, format!("undecodable response: {}", e)))?;
        normalize_parse_response(&body)
    }
}

/// Maps a collaborator response onto [`ParsedResult`]. Extraction fields may sit at the
/// top level or inside a nested `extracted`/`parsed` object.
pub fn normalize_parse_response(body: &JsonValue) -> Result<ParsedResult> {
    if !body.is_object() {
        return Err(Error::upstream(SERVICE, "response is not a JSON object"));
    }
    let nested = lookup(body, "parsed").filter(|v| v.is_object());
    let field = |name: &str| nested.and_then(|n| lookup(n, name)).or_else(|| lookup(body, name));

    let raw_text = field("raw_text")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    Ok(ParsedResult {
        skills: normalize::string_list(field("skills")),
        projects: normalize::object_list(field("projects")),
        tools: normalize::string_list(field("tools")),
        experience: normalize::object_list(field("experience")),
        education: normalize::object_list(field("education")),
        summary: normalize::opt_string(field("summary")),
        raw_text,
        branch: normalize::opt_string(field("branch")),
        gpa: normalize::opt_f64(field("gpa")),
        batch: normalize::opt_string(field("batch")),
        embedding: normalize::f32_list(field("embedding")),
        engine: normalize::opt_string(field("engine")).unwrap_or_else(|| "unknown".to_string()),
        version: normalize::opt_string(field("version")).unwrap_or_else(|| "unknown".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_nested_extraction_and_top_level_metadata() {
        let body = json!({
            "raw_text": "Jane Doe\nRust developer",
            "parsed": {
                "skills": ["Rust", " rust ", "PostgreSQL"],
                "experience": [{ "role": "Intern", "description": "Built APIs" }],
                "education": [],
                "cgpa": "8.4"
            },
            "embedding": [0.1, 0.2],
            "engineName": "gemini",
            "engineVersion": "1.5"
        });

        let parsed = normalize_parse_response(&body).unwrap();
        assert_eq!(parsed.skills, vec!["Rust", "PostgreSQL"]);
        assert_eq!(parsed.experience.len(), 1);
        assert_eq!(parsed.gpa, Some(8.4));
        assert_eq!(parsed.raw_text, "Jane Doe\nRust developer");
        assert_eq!(parsed.embedding, Some(vec![0.1, 0.2]));
        assert_eq!(parsed.engine, "gemini");
        assert_eq!(parsed.version, "1.5");
        assert!(parsed.summary.is_none());
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let parsed = normalize_parse_response(&json!({})).unwrap();
        assert!(parsed.skills.is_empty());
        assert_eq!(parsed.engine, "unknown");
        assert!(parsed.embedding.is_none());
    }

    #[test]
    fn nan_gpa_is_dropped() {
        let parsed = normalize_parse_response(&json!({ "parsed": { "cgpa": "NaN" } })).unwrap();
        assert_eq!(parsed.gpa, None);
    }

    #[test]
    fn non_object_body_is_an_upstream_failure() {
        let err = normalize_parse_response(&json!([1, 2])).unwrap_err();
        assert!(err.is_retryable());
    }
}
