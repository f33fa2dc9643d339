use bytes::Bytes;
use reqwest::Client;
use serde_json::json;
use uuid::Uuid;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use placement_backend::{
    config::parse_base_url,
    error::Error,
    services::{
        parser_service::{HttpResumeParser, ResumeParser},
        ranking_service::{HttpRanker, Ranker, RankingRequest, StudentPayload},
    },
};

fn student(id: Uuid) -> StudentPayload {
    StudentPayload {
        id: id.to_string(),
        resume_text: "Rust developer".into(),
        skills: vec!["Rust".into()],
        skill_embedding: vec![0.5, 0.5],
        branch: Some("cse".into()),
        domains: vec![],
        gpa: 8.0,
        experience: vec![],
        education: vec![],
        projects: vec![],
        positions: vec![],
        responsibilities: String::new(),
    }
}

#[tokio::test]
async fn parser_posts_multipart_and_reads_nested_extraction() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ai/parse_resume"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "parsed": {
                "skills": ["Rust", " rust ", "Go"],
                "raw_text": "Rust and Go",
                "cgpa": "8.4"
            },
            "engine": "pdfminer",
            "version": "2.1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let base = parse_base_url(&format!("{}/ai", server.uri())).unwrap();
    let parser = HttpResumeParser::new(Client::new(), &base).unwrap();
    let result = parser
        .parse(Bytes::from_static(b"%PDF-1.4"), "cv.pdf", "application/pdf")
        .await
        .unwrap();

    assert_eq!(result.skills, vec!["Rust", "Go"]);
    assert_eq!(result.raw_text, "Rust and Go");
    assert_eq!(result.gpa, Some(8.4));
    assert_eq!(result.engine, "pdfminer");
}

#[tokio::test]
async fn parser_server_error_is_retryable_upstream_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/parse_resume"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let base = parse_base_url(&server.uri()).unwrap();
    let parser = HttpResumeParser::new(Client::new(), &base).unwrap();
    let err = parser
        .parse(Bytes::from_static(b"%PDF-1.4"), "cv.pdf", "application/pdf")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Upstream { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn ranker_sends_student_and_decodes_recommendations() {
    let server = MockServer::start().await;
    let student_id = Uuid::new_v4();
    let job_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/recommend"))
        .and(body_partial_json(json!({
            "student": { "id": student_id.to_string(), "skillEmbedding": [0.5, 0.5] }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "recommendations": [
                { "job_id": job_id.to_string(), "match_percent": 91.6, "score": 0.916, "reasons": ["Rust"] }
            ],
            "used_ranker": true,
            "model_version": "ltr-3"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ranker = HttpRanker::new(Client::new(), &parse_base_url(&server.uri()).unwrap()).unwrap();
    let response = ranker
        .rank(RankingRequest {
            student: student(student_id),
            jobs: vec![],
        })
        .await
        .unwrap();

    assert!(response.used_ranker);
    assert_eq!(response.model_version.as_deref(), Some("ltr-3"));
    assert_eq!(response.recommendations[0].job_uuid(), Some(job_id));
    assert_eq!(response.recommendations[0].reasons, vec!["Rust"]);
}

#[tokio::test]
async fn ranker_unavailable_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/recommend"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let ranker = HttpRanker::new(Client::new(), &parse_base_url(&server.uri()).unwrap()).unwrap();
    let err = ranker
        .rank(RankingRequest {
            student: student(Uuid::new_v4()),
            jobs: vec![],
        })
        .await
        .unwrap_err();

    assert!(err.is_retryable());
}
