use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use httpmock::prelude::*;
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use tower::ServiceExt;

use livro::assist::Assist;
use livro::llm::{LlmProvider, OpenAiProvider};
use livro::server::{build_router, AppState, IDENTITY_HEADER};
use livro::store::{Store, UserUpsert};

fn completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 10, "total_tokens": 20}
    })
}

async fn make_app(base_url: String) -> (axum::Router, NamedTempFile) {
    let db = NamedTempFile::new().unwrap();
    let store = Arc::new(
        Store::new(db.path().to_str().unwrap(), None)
            .await
            .unwrap(),
    );
    store
        .upsert_user(&UserUpsert {
            open_id: "oid-1".to_string(),
            name: Some("Ana".to_string()),
            email: None,
            login_method: None,
        })
        .await
        .unwrap();
    let provider = Arc::new(OpenAiProvider::new(
        "test-key".to_string(),
        None,
        Some(base_url),
    ));
    let assist = Arc::new(Assist::new(provider));
    (build_router(AppState { store, assist }), db)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(IDENTITY_HEADER, "oid-1")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn provider_returns_mocked_completion_text() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(completion_body("Considere aprofundar o conflito."));
        })
        .await;

    let provider = OpenAiProvider::new("test-key".to_string(), None, Some(server.base_url()));
    let text = provider
        .generate_text("Revise este parágrafo", "Você é um editor.")
        .await
        .unwrap();
    assert_eq!(text, "Considere aprofundar o conflito.");
    mock.assert_async().await;
}

#[tokio::test]
async fn review_endpoint_returns_generated_text() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(completion_body("O ritmo está bom."));
        })
        .await;

    let (app, _db) = make_app(server.base_url()).await;
    let response = app
        .oneshot(post("/api/ai/review", json!({"paragraph": "Era uma noite escura."})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["text"], "O ritmo está bom.");
    assert!(body.get("degraded").is_none());
}

#[tokio::test]
async fn provider_failure_degrades_to_fallback_text() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(500).body("upstream exploded");
        })
        .await;

    let (app, _db) = make_app(server.base_url()).await;
    let response = app
        .clone()
        .oneshot(post(
            "/api/ai/suggestion",
            json!({"context": "capítulo 1", "chapterContent": "Era uma vez."}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["text"], "Não foi possível gerar sugestão.");
    assert_eq!(body["degraded"], true);

    let response = app
        .oneshot(post("/api/ai/ideas", json!({"notes": ["uma ideia"]})))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["text"], "Não foi possível gerar ideias.");
    assert_eq!(body["degraded"], true);
}

#[tokio::test]
async fn empty_input_is_rejected_before_the_provider_is_called() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(completion_body("nunca usado"));
        })
        .await;

    let (app, _db) = make_app(server.base_url()).await;
    let response = app
        .oneshot(post("/api/ai/review", json!({"paragraph": "   "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["field"], "paragraph");
    mock.assert_hits_async(0).await;
}
