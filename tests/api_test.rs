use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

use placement_backend::{
    database::{memory::MemoryStore, Stores},
    error::{Error, Result},
    models::student::Role,
    routes::api_router,
    services::{
        parser_service::{ParsedResult, ResumeParser},
        ranking_service::{RankedJob, Ranker, RankingRequest, RankingResponse},
        resume_service::UploadPolicy,
        storage_service::{ObjectStorage, StoredObject},
    },
    utils::token::issue_token,
    AppState, Adapters, Settings,
};

const SECRET: &str = "test_secret_key";
const BOUNDARY: &str = "placement-test-boundary";

#[derive(Default)]
struct FakeStorage {
    keys: Mutex<Vec<String>>,
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn store(
        &self,
        owner_id: Uuid,
        _data: Bytes,
        _content_type: &str,
        _original_name: &str,
    ) -> Result<StoredObject> {
        let key = format!("resumes/{}-{}.pdf", owner_id, Uuid::new_v4());
        self.keys.lock().unwrap().push(key.clone());
        Ok(StoredObject {
            url: format!("http://files.test/uploads/{}", key),
            key,
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.keys.lock().unwrap().retain(|k| k != key);
        Ok(())
    }
}

#[derive(Default)]
struct FakeParser {
    fail: AtomicBool,
}

#[async_trait]
impl ResumeParser for FakeParser {
    async fn parse(&self, _data: Bytes, _name: &str, _mime: &str) -> Result<ParsedResult> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::upstream("resume parser", "500 Internal Server Error"));
        }
        Ok(ParsedResult {
            skills: vec!["Rust".into(), "SQL".into()],
            tools: vec!["Git".into()],
            raw_text: "Rust developer with SQL experience".into(),
            summary: Some("Systems programmer".into()),
            branch: Some("cse".into()),
            gpa: Some(8.2),
            batch: Some("2025".into()),
            embedding: Some(vec![0.1, 0.2, 0.3]),
            engine: "fake".into(),
            version: "1".into(),
            ..Default::default()
        })
    }
}

/// Scores every job it is sent at 80%.
struct FakeRanker;

#[async_trait]
impl Ranker for FakeRanker {
    async fn rank(&self, request: RankingRequest) -> Result<RankingResponse> {
        Ok(RankingResponse {
            recommendations: request
                .jobs
                .iter()
                .map(|job| RankedJob {
                    job_id: job.id.clone(),
                    match_percent: 80.0,
                    score: 0.8,
                    reasons: vec!["skills overlap".into()],
                })
                .collect(),
            used_ranker: true,
            model_version: Some("test-model".into()),
        })
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    storage: Arc<FakeStorage>,
    parser: Arc<FakeParser>,
}

fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let storage = Arc::new(FakeStorage::default());
    let parser = Arc::new(FakeParser::default());
    let state = AppState::from_parts(
        Stores::in_memory(store.clone()),
        Adapters {
            storage: storage.clone(),
            parser: parser.clone(),
            ranker: Arc::new(FakeRanker),
        },
        Settings {
            jwt_secret: SECRET.to_string(),
            upload_policy: UploadPolicy {
                max_bytes: 1024 * 1024,
                pdf_only: true,
            },
        },
    );
    TestApp {
        router: api_router(state),
        store,
        storage,
        parser,
    }
}

fn token_for(id: Uuid, role: Role) -> String {
    issue_token(SECRET, id, role, chrono::Duration::hours(1)).expect("token")
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, JsonValue) {
    let res = router.clone().oneshot(req).await.expect("response");
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
    let body = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: JsonValue) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn resume_request(token: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"resume\"; filename=\"cv.pdf\"\r\nContent-Type: application/pdf\r\n\r\n",
            b = BOUNDARY
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/students/me/resume")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn create_student(router: &Router, email: &str) -> (Uuid, String) {
    let (status, body) = send(
        router,
        json_request(
            "POST",
            "/api/students",
            None,
            json!({ "name": "Asha", "email": email, "branch": "CSE", "cgpa": 8.2, "batch": "2025" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let id: Uuid = body["id"].as_str().unwrap().parse().unwrap();
    (id, token_for(id, Role::Student))
}

async fn create_job(router: &Router, payload: JsonValue) -> Uuid {
    let admin = token_for(Uuid::new_v4(), Role::Admin);
    let (status, body) = send(router, json_request("POST", "/api/jobs", Some(&admin), payload)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    // The admin token's subject has no local record.
    assert!(body["posted_by"].is_null());
    body["id"].as_str().unwrap().parse().unwrap()
}

fn internship(title: &str) -> JsonValue {
    json!({
        "title": title,
        "company": "Acme",
        "description": "Build backend services",
        "skills": ["Rust", "SQL"],
        "jobType": "Internship",
        "allowedBatches": ["2025"],
        "minGpa": 7.0
    })
}

#[tokio::test]
async fn health_and_openapi_are_public() {
    let app = test_app();

    let (status, body) = send(&app.router, get_request("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app.router, get_request("/api-docs/openapi.json", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/students/me/resume"]["post"]["requestBody"]["content"]
        ["multipart/form-data"]
        .is_object());
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = test_app();

    let (status, _) = send(&app.router, get_request("/api/students/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app.router, get_request("/api/students/me", Some("garbage"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong_secret =
        issue_token("other", Uuid::new_v4(), Role::Student, chrono::Duration::hours(1)).unwrap();
    let (status, _) = send(&app.router, get_request("/api/students/me", Some(&wrong_secret))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, student_token) = create_student(&app.router, "asha@uni.edu").await;
    let (status, _) = send(
        &app.router,
        json_request("POST", "/api/jobs", Some(&student_token), internship("Backend Intern")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app.router,
        get_request(&format!("/api/applications/job/{}", Uuid::new_v4()), Some(&student_token)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn legacy_auth_token_header_is_accepted() {
    let app = test_app();
    let (id, token) = create_student(&app.router, "legacy@uni.edu").await;

    let req = Request::builder()
        .uri("/api/students/me")
        .header("auth-token", token)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.to_string());
}

#[tokio::test]
async fn resume_upload_links_parsed_resume_and_recommends_jobs() {
    let app = test_app();
    let (student_id, token) = create_student(&app.router, "asha@uni.edu").await;
    let job_id = create_job(&app.router, internship("Backend Intern")).await;
    let mut strict = internship("Research Intern");
    strict["minGpa"] = json!(9.5);
    create_job(&app.router, strict).await;

    let (status, body) = send(&app.router, get_request("/api/students/me/recommendations", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert_eq!(body["reason"], "no_parsed_resume");

    let (status, body) = send(&app.router, resume_request(&token, b"%PDF-1.4 resume")).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["warning"].is_null());
    assert_eq!(body["parsed_resume"]["student_id"], student_id.to_string());
    assert_eq!(body["student"]["parsed_resume_id"], body["parsed_resume"]["id"]);
    assert_eq!(app.store.parsed_resume_count(), 1);

    let (status, body) = send(&app.router, get_request("/api/students/me/resume", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["extract"]["skills"], json!(["Rust", "SQL"]));

    let (status, body) = send(&app.router, get_request("/api/students/me/recommendations", Some(&token))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["count"], 1);
    assert_eq!(body["used_ranker"], true);
    assert_eq!(body["recommendations"][0]["job_id"], job_id.to_string());
    assert_eq!(body["recommendations"][0]["match_score"], 80);

    let (status, body) = send(
        &app.router,
        get_request(&format!("/api/students/me/recommendations/{}", job_id), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
}

#[tokio::test]
async fn parse_failure_still_stores_the_file() {
    let app = test_app();
    let (_, token) = create_student(&app.router, "asha@uni.edu").await;

    send(&app.router, resume_request(&token, b"%PDF-1.4 first")).await;
    let (_, first) = send(&app.router, get_request("/api/students/me/resume", Some(&token))).await;

    app.parser.fail.store(true, Ordering::SeqCst);
    let (status, body) = send(&app.router, resume_request(&token, b"%PDF-1.4 second")).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["warning"].is_string());
    assert!(body["parsed_resume"].is_null());
    assert_eq!(body["student"]["resume"]["size"], 15);

    let (_, kept) = send(&app.router, get_request("/api/students/me/resume", Some(&token))).await;
    assert_eq!(kept["id"], first["id"]);
    assert_eq!(app.storage.keys.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn rejects_non_pdf_and_missing_file() {
    let app = test_app();
    let (_, token) = create_student(&app.router, "asha@uni.edu").await;

    let (status, _) = send(&app.router, resume_request(&token, b"plain text")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app.router, resume_request(&token, b"")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.storage.keys.lock().unwrap().is_empty());
}

#[tokio::test]
async fn deleting_a_resume_twice_succeeds() {
    let app = test_app();
    let (_, token) = create_student(&app.router, "asha@uni.edu").await;
    send(&app.router, resume_request(&token, b"%PDF-1.4 resume")).await;

    let delete = || {
        Request::builder()
            .method("DELETE")
            .uri("/api/students/me/resume")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = send(&app.router, delete()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["student"]["resume"].is_null());
    assert!(body["student"]["parsed_resume_id"].is_null());
    assert_eq!(app.store.parsed_resume_count(), 0);
    assert!(app.storage.keys.lock().unwrap().is_empty());

    let (status, _) = send(&app.router, delete()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app.router, get_request("/api/students/me/resume", Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn apply_once_then_conflict_and_review() {
    let app = test_app();
    let (_, token) = create_student(&app.router, "asha@uni.edu").await;
    let job_id = create_job(&app.router, internship("Backend Intern")).await;

    let payload = json!({ "jobId": job_id, "matchScore": 72, "missingSkills": ["Kafka"] });
    let (status, body) = send(&app.router, json_request("POST", "/api/applications", Some(&token), payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["external"], false);
    let application_id = body["application"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["application"]["status"], "UNDER_REVIEW");

    let (status, body) = send(&app.router, json_request("POST", "/api/jobs/apply", Some(&token), payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Application already submitted");
    assert_eq!(app.store.application_count(), 1);

    let (status, body) = send(&app.router, get_request("/api/applications/student", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["applications"][0]["job"]["title"], "Backend Intern");

    let admin = token_for(Uuid::new_v4(), Role::Admin);
    let status_uri = format!("/api/admin/applications/{}/status", application_id);

    let (status, _) = send(&app.router, json_request("PATCH", &status_uri, Some(&admin), json!({ "status": "HIRED" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app.router, get_request(&format!("/api/applications/job/{}", job_id), Some(&admin))).await;
    assert_eq!(body["applications"][0]["status"], "UNDER_REVIEW");
    assert_eq!(body["applications"][0]["student"]["email"], "asha@uni.edu");

    let (status, body) = send(&app.router, json_request("PATCH", &status_uri, Some(&admin), json!({ "status": "SHORTLISTED" }))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "SHORTLISTED");

    let (status, _) = send(&app.router, json_request("PATCH", &status_uri, Some(&admin), json!({ "status": "REJECTED" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn external_jobs_return_the_apply_url() {
    let app = test_app();
    let (_, token) = create_student(&app.router, "asha@uni.edu").await;
    let mut job = internship("Partner Role");
    job["externalApply"] = json!(true);
    job["applyUrl"] = json!("https://careers.example.com/42");
    let job_id = create_job(&app.router, job).await;

    let (status, body) = send(
        &app.router,
        json_request("POST", "/api/applications", Some(&token), json!({ "job_id": job_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["external"], true);
    assert_eq!(body["apply_url"], "https://careers.example.com/42");
    assert_eq!(app.store.application_count(), 0);
}

#[tokio::test]
async fn job_listing_filters_by_batch() {
    let app = test_app();
    create_job(&app.router, internship("Backend Intern")).await;
    let mut other = internship("Older Batch");
    other["allowedBatches"] = json!(["2023"]);
    create_job(&app.router, other).await;

    let (status, body) = send(&app.router, get_request("/api/jobs", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (_, body) = send(&app.router, get_request("/api/jobs?batch=2025", None)).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["jobs"][0]["title"], "Backend Intern");

    let (status, _) = send(&app.router, get_request(&format!("/api/jobs/{}", Uuid::new_v4()), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn analytics_and_overview_are_admin_only() {
    let app = test_app();
    let (_, token) = create_student(&app.router, "asha@uni.edu").await;
    let job_id = create_job(&app.router, internship("Backend Intern")).await;
    let mut data = internship("Data Intern");
    data["skills"] = json!(["rust", "Python"]);
    create_job(&app.router, data).await;

    let (status, _) = send(
        &app.router,
        json_request("POST", "/api/applications", Some(&token), json!({ "jobId": job_id, "matchScore": 71 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    for uri in ["/api/analytics/skills", "/api/analytics/matches", "/api/admin/overview"] {
        let (status, _) = send(&app.router, get_request(uri, Some(&token))).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
    }

    let admin = token_for(Uuid::new_v4(), Role::Admin);
    let (status, body) = send(&app.router, get_request("/api/analytics/skills", Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["skills"], json!({ "python": 1, "rust": 2, "sql": 1 }));

    let (_, body) = send(&app.router, get_request("/api/analytics/matches", Some(&admin))).await;
    assert_eq!(body, json!({ "students": 1, "jobs": 2, "applications": 1, "average_score": 71 }));

    let (_, body) = send(&app.router, get_request("/api/admin/overview", Some(&admin))).await;
    assert_eq!(body["total_jobs"], 2);
    assert_eq!(body["total_applications"], 1);
    assert_eq!(body["pending_applications"], 1);
}
