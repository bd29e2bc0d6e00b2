use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use founder_reality_check::analysis::AnalysisClient;
use founder_reality_check::config::Config;
use founder_reality_check::routes::{router, AppState};
use founder_reality_check::tools::gemini::GeminiClient;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, header as header_eq, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app_for(server: &MockServer) -> Router {
    let config = Config::from_lookup(|key| match key {
        "GEMINI_API_KEY" => Some("integration-key".to_string()),
        "GEMINI_API_BASE" => Some(server.uri()),
        _ => None,
    })
    .unwrap();
    let gemini = GeminiClient::new(&config).unwrap();
    router(AppState::new(Arc::new(AnalysisClient::new(gemini))))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn gemini_reply(text: &str) -> ResponseTemplate {
    let chunks: Vec<Value> = (0..8)
        .map(|i| json!({ "web": { "uri": format!("https://src{}.example", i % 7), "title": format!("Source {}", i) } }))
        .collect();
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "groundingMetadata": { "groundingChunks": chunks }
        }]
    }))
}

#[tokio::test]
async fn one_shot_analysis_against_mock_gemini() {
    let server = MockServer::start().await;
    let verdict = json!({
        "marketRealismScore": 12,
        "scoreJustification": "Hamsters are not a market.",
        "coreAssumptions": ["Hamster owners want social media"],
        "redFlags": ["No monetization"],
        "competitors": ["Instagram"],
        "pivotSuggestions": ["Pet supply marketplace"],
        "recommendation": "NO-GO",
        "reasoning": "Novelty only.",
        "executionPlan": {
            "techStackRecommendation": "None",
            "mvpFeatures": [],
            "salesChannel": "None",
            "firstMonthGoals": []
        }
    });
    Mock::given(method("POST"))
        .and(path("/gemini-2.5-flash:generateContent"))
        .and(header_eq("x-goog-api-key", "integration-key"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": "A social network for hamsters." }] }],
            "generationConfig": { "temperature": 0.2 }
        })))
        .respond_with(gemini_reply(&format!("```json\n{}\n```", verdict)))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_for(&server);
    let (status, body) = call(
        &app,
        "POST",
        "/analyze",
        Some(json!({ "pitch": "A social network for hamsters." })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recommendation"], "NO-GO");
    assert_eq!(body["marketRealismScore"], 12);

    let urls: Vec<&str> = body["sources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["url"].as_str().unwrap())
        .collect();
    assert_eq!(
        urls,
        vec![
            "https://src0.example",
            "https://src1.example",
            "https://src2.example",
            "https://src3.example",
            "https://src4.example",
        ]
    );
}

#[tokio::test]
async fn session_failure_surfaces_message_and_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(gemini_reply("Sorry, I cannot help with that."))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_for(&server);
    let (_, created) = call(&app, "POST", "/sessions", None).await;
    let id = created["sessionId"].as_str().unwrap().to_string();

    let (status, _) = call(
        &app,
        "POST",
        &format!("/sessions/{}/submit", id),
        Some(json!({ "pitch": "Uber for dog walking" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let mut view = Value::Null;
    for _ in 0..100 {
        let (_, body) = call(&app, "GET", &format!("/sessions/{}", id), None).await;
        view = body;
        if view["phase"] != "loading" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(view["phase"], "failure");
    assert_eq!(view["error"], "AI response was not valid JSON. Please try again.");
    assert!(view["result"].is_null());

    let (_, body) = call(&app, "POST", &format!("/sessions/{}/reset", id), None).await;
    assert_eq!(body["phase"], "idle");
    assert!(body["error"].is_null());
}

#[tokio::test]
async fn service_error_is_reported_as_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "code": 429, "message": "Resource has been exhausted.", "status": "RESOURCE_EXHAUSTED" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_for(&server);
    let (status, body) = call(&app, "POST", "/analyze", Some(json!({ "pitch": "idea" }))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Resource has been exhausted.");
}
