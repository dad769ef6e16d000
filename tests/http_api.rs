use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::Value;
use survey_insights::{build_router, AppState, MemoryRepository, Repository};
use tower::util::ServiceExt; // for `oneshot`

const BOUNDARY: &str = "survey-insights-test-boundary";

const PROPOSAL_SHEET: &str = "\
ID,Completion time,Program,Does the proposal intends to create the expected impact?,Digital transformation,Clarity,Comments
P-1,2025-08-20 16:00:00,Aquaculture,4,5,Agree,Clear roadmap
P-2,2025-08-20 16:05:00,Solar schools,2,3,Disagree,Needs a budget
";

async fn setup_app() -> (axum::Router, Arc<MemoryRepository>) {
    let repo = Arc::new(MemoryRepository::with_default_cycles().await.unwrap());
    let app = build_router(AppState::new(repo.clone()));
    (app, repo)
}

fn multipart_request(uri: &str, field: &str, contents: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"export.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {contents}\r\n\
         --{BOUNDARY}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let (app, _) = setup_app().await;
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = extract_json(response.into_body()).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn proposal_upload_is_imported_and_counted() {
    let (app, repo) = setup_app().await;
    let response = app
        .clone()
        .oneshot(multipart_request(
            "/api/proposals-feedback/import",
            "file",
            PROPOSAL_SHEET,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = extract_json(response.into_body()).await;
    assert_eq!(json["inserted"], 2);
    assert_eq!(json["skipped"], 0);

    let stored = repo
        .find_proposal_feedback(&Default::default())
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);

    let response = app
        .oneshot(get("/api/proposals-feedback/analytics?program=Aquaculture"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = extract_json(response.into_body()).await;
    assert_eq!(json["totalResponses"], 1);
    assert_eq!(json["programs"].as_array().unwrap().len(), 2);
    assert_eq!(json["questions"]["clarity"]["average"], 4.0);
    assert_eq!(json["questions"]["impact"]["distribution"]["4"], 1);
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() {
    let (app, _) = setup_app().await;
    let response = app
        .oneshot(multipart_request(
            "/api/evaluation-survey/import",
            "attachment",
            "a,b\n1,2",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = extract_json(response.into_body()).await;
    assert_eq!(json["error"], "No file uploaded");
}

#[tokio::test]
async fn missing_required_column_names_the_field() {
    let (app, repo) = setup_app().await;
    let response = app
        .oneshot(multipart_request(
            "/api/evaluation-survey/import",
            "file",
            "Start time,You are a,Your university\n2024-01-10,Student,UFPR",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = extract_json(response.into_body()).await;
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("'planning'"));
    assert!(message.contains("start time, you are a, your university"));
    assert!(repo
        .find_survey_responses(&Default::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn evaluation_analytics_empty_state() {
    let (app, _) = setup_app().await;
    let response = app
        .oneshot(get("/api/evaluation-survey/analytics"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = extract_json(response.into_body()).await;
    assert_eq!(json["totalResponses"], 0);
    assert_eq!(json["metrics"]["overallSatisfaction"]["value"], 0.0);
    assert_eq!(json["metrics"]["preparedness"]["target"], 4.0);
    assert_eq!(json["questionAverages"], serde_json::json!({}));
    assert_eq!(json["cycles"].as_array().unwrap().len(), 6);
    assert_eq!(json["overallTrend"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn malformed_cycle_id_is_a_bad_request() {
    let (app, _) = setup_app().await;
    let response = app
        .oneshot(get("/api/evaluation-survey/analytics?cycleId=first"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
