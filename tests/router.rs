use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use tower::ServiceExt;

use livro::assist::Assist;
use livro::llm::OpenAiProvider;
use livro::server::{build_router, AppState, IDENTITY_HEADER, SESSION_COOKIE};
use livro::store::{Store, UserUpsert};

async fn make_app() -> (axum::Router, Arc<Store>, NamedTempFile) {
    let db = NamedTempFile::new().unwrap();
    let store = Arc::new(
        Store::new(db.path().to_str().unwrap(), None)
            .await
            .unwrap(),
    );
    // The provider is never reached by these tests.
    let provider = Arc::new(OpenAiProvider::new(
        "key".to_string(),
        None,
        Some("http://127.0.0.1:1".to_string()),
    ));
    let assist = Arc::new(Assist::new(provider));
    let app = build_router(AppState {
        store: store.clone(),
        assist,
    });
    (app, store, db)
}

async fn seed_user(store: &Store, open_id: &str) {
    store
        .upsert_user(&UserUpsert {
            open_id: open_id.to_string(),
            name: Some("Ana".to_string()),
            email: None,
            login_method: None,
        })
        .await
        .unwrap();
}

fn get(uri: &str, open_id: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(open_id) = open_id {
        builder = builder.header(IDENTITY_HEADER, open_id);
    }
    builder.body(Body::empty()).unwrap()
}

fn post(uri: &str, open_id: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(open_id) = open_id {
        builder = builder.header(IDENTITY_HEADER, open_id);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn protected_operations_reject_unauthenticated_callers() {
    let (app, _store, _db) = make_app().await;

    for uri in ["/api/book", "/api/sessions", "/api/rituals", "/api/settings"] {
        let response = app.clone().oneshot(get(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }

    let response = app
        .clone()
        .oneshot(post(
            "/api/chapters/create",
            Some("ghost"),
            json!({"bookId": 1, "chapterNumber": 1, "title": "x"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn auth_login_and_me_round_trip() {
    let (app, _store, _db) = make_app().await;

    let response = app
        .clone()
        .oneshot(post(
            "/api/auth/login",
            None,
            json!({"openId": "oid-1", "name": "Ana", "loginMethod": "google"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let user = body_json(response).await;
    assert_eq!(user["openId"], "oid-1");
    assert_eq!(user["role"], "user");

    let response = app.clone().oneshot(get("/api/auth/me", Some("oid-1"))).await.unwrap();
    let me = body_json(response).await;
    assert_eq!(me["name"], "Ana");

    let response = app.clone().oneshot(get("/api/auth/me", Some("unknown"))).await.unwrap();
    assert_eq!(body_json(response).await, Value::Null);
}

#[tokio::test]
async fn logout_clears_the_session_cookie() {
    let (app, _store, _db) = make_app().await;
    let response = app
        .clone()
        .oneshot(post("/api/auth/logout", None, json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get("set-cookie")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with(&format!("{SESSION_COOKIE}=;")));
    assert!(cookie.contains("Max-Age=0"));
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn book_get_creates_default_book_once() {
    let (app, store, _db) = make_app().await;
    seed_user(&store, "oid-1").await;

    let response = app.clone().oneshot(get("/api/book", Some("oid-1"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let book = body_json(response).await;
    assert_eq!(book["title"], "Meu Livro");
    assert_eq!(book["targetChapters"], 20);

    // Idempotent: a second call returns the same row, no second create.
    let response = app.clone().oneshot(get("/api/book", Some("oid-1"))).await.unwrap();
    let again = body_json(response).await;
    assert_eq!(again["id"], book["id"]);
}

#[tokio::test]
async fn get_or_create_ignores_arguments_when_book_exists() {
    let (app, store, _db) = make_app().await;
    seed_user(&store, "oid-1").await;

    let response = app
        .clone()
        .oneshot(post(
            "/api/book/get_or_create",
            Some("oid-1"),
            json!({"title": "Original", "targetChapters": 10}),
        ))
        .await
        .unwrap();
    let book = body_json(response).await;
    assert_eq!(book["title"], "Original");
    assert_eq!(book["targetChapters"], 10);

    let response = app
        .clone()
        .oneshot(post(
            "/api/book/get_or_create",
            Some("oid-1"),
            json!({"title": "Outro", "targetChapters": 99}),
        ))
        .await
        .unwrap();
    let same = body_json(response).await;
    assert_eq!(same["id"], book["id"]);
    assert_eq!(same["title"], "Original");
    assert_eq!(same["targetChapters"], 10);
}

#[tokio::test]
async fn book_update_is_partial() {
    let (app, store, _db) = make_app().await;
    seed_user(&store, "oid-1").await;

    let response = app
        .clone()
        .oneshot(post(
            "/api/book/get_or_create",
            Some("oid-1"),
            json!({"title": "Rascunho", "targetChapters": 15}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post("/api/book/update", Some("oid-1"), json!({"title": "X"})))
        .await
        .unwrap();
    let book = body_json(response).await;
    assert_eq!(book["title"], "X");
    assert_eq!(book["targetChapters"], 15);
}

#[tokio::test]
async fn chapter_flow_create_list_update() {
    let (app, store, _db) = make_app().await;
    seed_user(&store, "oid-1").await;

    let response = app.clone().oneshot(get("/api/book", Some("oid-1"))).await.unwrap();
    let book = body_json(response).await;
    let book_id = book["id"].as_i64().unwrap();

    for (number, title) in [(2, "Segundo"), (1, "Primeiro")] {
        let response = app
            .clone()
            .oneshot(post(
                "/api/chapters/create",
                Some("oid-1"),
                json!({"bookId": book_id, "chapterNumber": number, "title": title}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let chapter = body_json(response).await;
        assert_eq!(chapter["status"], "not_started");
        assert_eq!(chapter["progress"], 0);
    }

    let response = app
        .clone()
        .oneshot(get(&format!("/api/chapters?bookId={book_id}"), Some("oid-1")))
        .await
        .unwrap();
    let chapters = body_json(response).await;
    let chapters = chapters.as_array().unwrap();
    assert!(chapters.len() >= 2);
    assert_eq!(chapters[0]["title"], "Primeiro");

    let chapter_id = chapters[0]["id"].as_i64().unwrap();
    let response = app
        .clone()
        .oneshot(post(
            "/api/chapters/update",
            Some("oid-1"),
            json!({"chapterId": chapter_id, "progress": 50}),
        ))
        .await
        .unwrap();
    let updated = body_json(response).await;
    assert_eq!(updated["progress"], 50);
    assert_eq!(updated["title"], "Primeiro");
    assert_eq!(updated["status"], "not_started");
}

#[tokio::test]
async fn validation_errors_name_the_field() {
    let (app, store, _db) = make_app().await;
    seed_user(&store, "oid-1").await;

    let response = app.clone().oneshot(get("/api/book", Some("oid-1"))).await.unwrap();
    let book = body_json(response).await;
    let book_id = book["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(post(
            "/api/chapters/create",
            Some("oid-1"),
            json!({"bookId": book_id, "chapterNumber": 1, "title": "   "}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["field"], "title");

    let response = app
        .clone()
        .oneshot(post(
            "/api/chapters/create",
            Some("oid-1"),
            json!({"bookId": book_id, "chapterNumber": 1, "title": "Um"}),
        ))
        .await
        .unwrap();
    let chapter = body_json(response).await;
    let chapter_id = chapter["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(post(
            "/api/chapters/update",
            Some("oid-1"),
            json!({"chapterId": chapter_id, "progress": 150}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["field"], "progress");

    let response = app
        .clone()
        .oneshot(post(
            "/api/settings/update",
            Some("oid-1"),
            json!({"maintenanceReminderTime": "25:99"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["field"], "maintenanceReminderTime");
}

#[tokio::test]
async fn callers_cannot_touch_another_users_data() {
    let (app, store, _db) = make_app().await;
    seed_user(&store, "oid-1").await;
    seed_user(&store, "oid-2").await;

    let response = app.clone().oneshot(get("/api/book", Some("oid-1"))).await.unwrap();
    let book = body_json(response).await;
    let book_id = book["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(post(
            "/api/chapters/create",
            Some("oid-1"),
            json!({"bookId": book_id, "chapterNumber": 1, "title": "Um"}),
        ))
        .await
        .unwrap();
    let chapter = body_json(response).await;
    let chapter_id = chapter["id"].as_i64().unwrap();

    // The second user supplies ids belonging to the first.
    let response = app
        .clone()
        .oneshot(get(&format!("/api/chapters?bookId={book_id}"), Some("oid-2")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(post(
            "/api/chapters/update",
            Some("oid-2"),
            json!({"chapterId": chapter_id, "progress": 10}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(post(
            "/api/milestones/create",
            Some("oid-2"),
            json!({"bookId": book_id, "description": "x", "type": "custom"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn session_and_ritual_flow_over_http() {
    let (app, store, _db) = make_app().await;
    seed_user(&store, "oid-1").await;

    let response = app.clone().oneshot(get("/api/book", Some("oid-1"))).await.unwrap();
    let book = body_json(response).await;
    let book_id = book["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(post(
            "/api/sessions/create",
            Some("oid-1"),
            json!({"bookId": book_id, "mode": "maintenance"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session = body_json(response).await;
    let session_id = session["id"].as_i64().unwrap();
    assert_eq!(session["mode"], "maintenance");

    let response = app
        .clone()
        .oneshot(post(
            "/api/sessions/update",
            Some("oid-1"),
            json!({"sessionId": session_id, "duration": 50, "notesCount": 2}),
        ))
        .await
        .unwrap();
    let session = body_json(response).await;
    assert_eq!(session["duration"], 50);

    let response = app.clone().oneshot(get("/api/sessions", Some("oid-1"))).await.unwrap();
    let sessions = body_json(response).await;
    assert_eq!(sessions.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(post(
            "/api/rituals/create",
            Some("oid-1"),
            json!({"type": "entry_construction", "date": 1700000000}),
        ))
        .await
        .unwrap();
    let ritual = body_json(response).await;
    assert_eq!(ritual["completed"], 0);
    let ritual_id = ritual["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(post(
            "/api/rituals/update",
            Some("oid-1"),
            json!({"ritualId": ritual_id, "completed": 1}),
        ))
        .await
        .unwrap();
    let ritual = body_json(response).await;
    assert_eq!(ritual["completed"], 1);

    let response = app
        .clone()
        .oneshot(post(
            "/api/rituals/update",
            Some("oid-1"),
            json!({"ritualId": ritual_id, "completed": 7}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn settings_round_trip_over_http() {
    let (app, store, _db) = make_app().await;
    seed_user(&store, "oid-1").await;

    let response = app.clone().oneshot(get("/api/settings", Some("oid-1"))).await.unwrap();
    assert_eq!(body_json(response).await, Value::Null);

    let response = app
        .clone()
        .oneshot(post(
            "/api/settings/update",
            Some("oid-1"),
            json!({"notificationsEnabled": 0}),
        ))
        .await
        .unwrap();
    let settings = body_json(response).await;
    assert_eq!(settings["notificationsEnabled"], 0);
    assert_eq!(settings["maintenanceReminderTime"], "19:00");
    assert_eq!(settings["constructionReminderTime"], "06:45");

    let response = app.clone().oneshot(get("/api/settings", Some("oid-1"))).await.unwrap();
    let settings = body_json(response).await;
    assert_eq!(settings["notificationsEnabled"], 0);
}
