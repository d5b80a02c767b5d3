use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::{format_description::FormatItem, macros::format_description, Time};

use crate::assist::{Assist, IDEAS_FALLBACK, REVIEW_FALLBACK, SUGGESTION_FALLBACK};
use crate::error::{LivroError, Result};
use crate::store::{
    Book, BookUpdate, Chapter, ChapterStatus, MilestoneType, Ritual, RitualType, RitualUpdate,
    Session, SessionMode, SessionUpdate, SettingsUpdate, Store, User, UserUpsert,
};

/// Session cookie cleared on logout. Issuance belongs to the auth gateway.
pub const SESSION_COOKIE: &str = "livro_session";

/// Header carrying the verified external identity, set by the auth gateway
/// in front of this service. Caller identity is never an input field.
pub const IDENTITY_HEADER: &str = "x-open-id";

const DEFAULT_BOOK_TITLE: &str = "Meu Livro";
const DEFAULT_BOOK_DESCRIPTION: &str = "Livro criado automaticamente";

const REMINDER_FORMAT: &[FormatItem<'static>] = format_description!("[hour]:[minute]");

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub assist: Arc<Assist>,
}

impl IntoResponse for LivroError {
    fn into_response(self) -> Response {
        let status = match &self {
            LivroError::Validation { .. } => StatusCode::BAD_REQUEST,
            LivroError::Unauthorized => StatusCode::UNAUTHORIZED,
            LivroError::NotFound(_) => StatusCode::NOT_FOUND,
            LivroError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = match &self {
            LivroError::Validation { field, message } => {
                json!({"error": message, "field": field})
            }
            other => json!({"error": other.to_string()}),
        };
        (status, axum::Json(body)).into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/login", post(auth_login))
        .route("/api/auth/me", get(auth_me))
        .route("/api/auth/logout", post(auth_logout))
        .route("/api/book", get(book_get))
        .route("/api/book/get_or_create", post(book_get_or_create))
        .route("/api/book/update", post(book_update))
        .route("/api/chapters", get(chapters_list))
        .route("/api/chapters/:id", get(chapters_get))
        .route("/api/chapters/create", post(chapters_create))
        .route("/api/chapters/update", post(chapters_update))
        .route("/api/sessions", get(sessions_list))
        .route("/api/sessions/create", post(sessions_create))
        .route("/api/sessions/update", post(sessions_update))
        .route("/api/notes", get(notes_list))
        .route("/api/notes/create", post(notes_create))
        .route("/api/rituals", get(rituals_list))
        .route("/api/rituals/create", post(rituals_create))
        .route("/api/rituals/update", post(rituals_update))
        .route("/api/milestones", get(milestones_list))
        .route("/api/milestones/create", post(milestones_create))
        .route("/api/settings", get(settings_get))
        .route("/api/settings/update", post(settings_update))
        .route("/api/ai/suggestion", post(ai_suggestion))
        .route("/api/ai/review", post(ai_review))
        .route("/api/ai/ideas", post(ai_ideas))
        .with_state(state)
}

/// Resolves the forwarded identity to a user row. Rejects before any other
/// store access when the header is missing or unknown.
async fn authenticate(headers: &HeaderMap, store: &Store) -> Result<User> {
    let open_id = headers
        .get(IDENTITY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(LivroError::Unauthorized)?;
    store
        .user_by_open_id(open_id)
        .await?
        .ok_or(LivroError::Unauthorized)
}

// Ownership checks: every id supplied by the caller must chain back to the
// authenticated user. Violations surface as not-found.

async fn owned_book(store: &Store, user: &User, book_id: i32) -> Result<Book> {
    match store.book_by_id(book_id).await? {
        Some(book) if book.user_id == user.id => Ok(book),
        _ => Err(LivroError::NotFound("book")),
    }
}

async fn owned_chapter(store: &Store, user: &User, chapter_id: i32) -> Result<Chapter> {
    let chapter = store
        .chapter_by_id(chapter_id)
        .await?
        .ok_or(LivroError::NotFound("chapter"))?;
    owned_book(store, user, chapter.book_id).await?;
    Ok(chapter)
}

async fn owned_session(store: &Store, user: &User, session_id: i32) -> Result<Session> {
    match store.session_by_id(session_id).await? {
        Some(session) if session.user_id == user.id => Ok(session),
        _ => Err(LivroError::NotFound("session")),
    }
}

async fn owned_ritual(store: &Store, user: &User, ritual_id: i32) -> Result<Ritual> {
    match store.ritual_by_id(ritual_id).await? {
        Some(ritual) if ritual.user_id == user.id => Ok(ritual),
        _ => Err(LivroError::NotFound("ritual")),
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LivroError::validation(field, "must not be empty"));
    }
    Ok(())
}

fn validate_progress(progress: i32) -> Result<()> {
    if !(0..=100).contains(&progress) {
        return Err(LivroError::validation("progress", "must be between 0 and 100"));
    }
    Ok(())
}

fn validate_reminder_time(field: &str, value: &str) -> Result<()> {
    Time::parse(value, REMINDER_FORMAT)
        .map_err(|_| LivroError::validation(field, "must be HH:MM"))?;
    Ok(())
}

// ---- auth ----

async fn auth_login(
    State(state): State<AppState>,
    Json(payload): Json<UserUpsert>,
) -> Result<Json<User>> {
    let user = state.store.upsert_user(&payload).await?;
    Ok(Json(user))
}

async fn auth_me(State(state): State<AppState>, headers: HeaderMap) -> Json<Option<User>> {
    match authenticate(&headers, &state.store).await {
        Ok(user) => Json(Some(user)),
        Err(_) => Json(None),
    }
}

async fn auth_logout() -> Response {
    let cookie = format!("{SESSION_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax");
    (
        [(header::SET_COOKIE, cookie)],
        axum::Json(json!({"success": true})),
    )
        .into_response()
}

// ---- book ----

async fn book_get(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Book>> {
    let user = authenticate(&headers, &state.store).await?;
    let book = match state.store.book_by_user(user.id).await? {
        Some(book) => book,
        None => {
            state
                .store
                .create_book(
                    user.id,
                    DEFAULT_BOOK_TITLE,
                    Some(DEFAULT_BOOK_DESCRIPTION),
                    Some(20),
                )
                .await?
        }
    };
    Ok(Json(book))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GetOrCreateBookRequest {
    title: Option<String>,
    description: Option<String>,
    target_chapters: Option<i32>,
}

async fn book_get_or_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<GetOrCreateBookRequest>,
) -> Result<Json<Book>> {
    let user = authenticate(&headers, &state.store).await?;
    if let Some(existing) = state.store.book_by_user(user.id).await? {
        // Supplied values are deliberately ignored once a book exists.
        return Ok(Json(existing));
    }
    let title = payload.title.as_deref().unwrap_or("My Book");
    let book = state
        .store
        .create_book(
            user.id,
            title,
            payload.description.as_deref(),
            payload.target_chapters,
        )
        .await?;
    Ok(Json(book))
}

async fn book_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<BookUpdate>,
) -> Result<Json<Book>> {
    let user = authenticate(&headers, &state.store).await?;
    if let Some(title) = payload.title.as_deref() {
        require_non_empty("title", title)?;
    }
    let book = state
        .store
        .book_by_user(user.id)
        .await?
        .ok_or(LivroError::NotFound("book"))?;
    let updated = state.store.update_book(book.id, &payload).await?;
    Ok(Json(updated))
}

// ---- chapters ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookScopedQuery {
    book_id: i32,
}

async fn chapters_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BookScopedQuery>,
) -> Result<Json<Vec<Chapter>>> {
    let user = authenticate(&headers, &state.store).await?;
    owned_book(&state.store, &user, query.book_id).await?;
    let chapters = state.store.chapters_by_book(query.book_id).await?;
    Ok(Json(chapters))
}

async fn chapters_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(chapter_id): Path<i32>,
) -> Result<Json<Chapter>> {
    let user = authenticate(&headers, &state.store).await?;
    let chapter = owned_chapter(&state.store, &user, chapter_id).await?;
    Ok(Json(chapter))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateChapterRequest {
    book_id: i32,
    chapter_number: i32,
    title: String,
}

async fn chapters_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateChapterRequest>,
) -> Result<Json<Chapter>> {
    let user = authenticate(&headers, &state.store).await?;
    require_non_empty("title", &payload.title)?;
    owned_book(&state.store, &user, payload.book_id).await?;
    let chapter = state
        .store
        .create_chapter(payload.book_id, payload.chapter_number, &payload.title)
        .await?;
    Ok(Json(chapter))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateChapterRequest {
    chapter_id: i32,
    status: Option<String>,
    progress: Option<i32>,
    notes: Option<String>,
    next_steps: Option<String>,
}

async fn chapters_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateChapterRequest>,
) -> Result<Json<Chapter>> {
    let user = authenticate(&headers, &state.store).await?;
    let status = match payload.status.as_deref() {
        Some(value) => Some(
            ChapterStatus::parse(value)
                .ok_or_else(|| LivroError::validation("status", "unknown status"))?,
        ),
        None => None,
    };
    if let Some(progress) = payload.progress {
        validate_progress(progress)?;
    }
    owned_chapter(&state.store, &user, payload.chapter_id).await?;
    let update = crate::store::ChapterUpdate {
        status,
        progress: payload.progress,
        notes: payload.notes,
        next_steps: payload.next_steps,
    };
    let chapter = state
        .store
        .update_chapter(payload.chapter_id, &update)
        .await?;
    Ok(Json(chapter))
}

// ---- sessions ----

async fn sessions_list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Session>>> {
    let user = authenticate(&headers, &state.store).await?;
    let sessions = state
        .store
        .sessions_by_user(user.id, crate::store::DEFAULT_SESSION_LIMIT)
        .await?;
    Ok(Json(sessions))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionRequest {
    book_id: i32,
    mode: String,
    chapter_id: Option<i32>,
}

async fn sessions_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<Json<Session>> {
    let user = authenticate(&headers, &state.store).await?;
    let mode = SessionMode::parse(&payload.mode)
        .ok_or_else(|| LivroError::validation("mode", "unknown mode"))?;
    owned_book(&state.store, &user, payload.book_id).await?;
    if let Some(chapter_id) = payload.chapter_id {
        owned_chapter(&state.store, &user, chapter_id).await?;
    }
    let session = state
        .store
        .create_session(user.id, payload.book_id, mode, payload.chapter_id)
        .await?;
    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSessionRequest {
    session_id: i32,
    #[serde(flatten)]
    update: SessionUpdate,
}

async fn sessions_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateSessionRequest>,
) -> Result<Json<Session>> {
    let user = authenticate(&headers, &state.store).await?;
    owned_session(&state.store, &user, payload.session_id).await?;
    let session = state
        .store
        .update_session(payload.session_id, &payload.update)
        .await?;
    Ok(Json(session))
}

// ---- notes ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChapterScopedQuery {
    chapter_id: i32,
}

async fn notes_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ChapterScopedQuery>,
) -> Result<Json<Vec<crate::store::AtomicNote>>> {
    let user = authenticate(&headers, &state.store).await?;
    owned_chapter(&state.store, &user, query.chapter_id).await?;
    let notes = state.store.notes_by_chapter(query.chapter_id).await?;
    Ok(Json(notes))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateNoteRequest {
    book_id: i32,
    content: String,
    chapter_id: Option<i32>,
    session_id: Option<i32>,
    tags: Option<String>,
}

async fn notes_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateNoteRequest>,
) -> Result<Json<crate::store::AtomicNote>> {
    let user = authenticate(&headers, &state.store).await?;
    require_non_empty("content", &payload.content)?;
    owned_book(&state.store, &user, payload.book_id).await?;
    if let Some(chapter_id) = payload.chapter_id {
        owned_chapter(&state.store, &user, chapter_id).await?;
    }
    if let Some(session_id) = payload.session_id {
        owned_session(&state.store, &user, session_id).await?;
    }
    let note = state
        .store
        .create_note(
            user.id,
            payload.book_id,
            &payload.content,
            payload.chapter_id,
            payload.session_id,
            payload.tags.as_deref(),
        )
        .await?;
    Ok(Json(note))
}

// ---- rituals ----

async fn rituals_list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Ritual>>> {
    let user = authenticate(&headers, &state.store).await?;
    let rituals = state.store.rituals_by_user(user.id).await?;
    Ok(Json(rituals))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRitualRequest {
    #[serde(rename = "type")]
    ritual_type: String,
    date: i64,
}

async fn rituals_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateRitualRequest>,
) -> Result<Json<Ritual>> {
    let user = authenticate(&headers, &state.store).await?;
    let ritual_type = RitualType::parse(&payload.ritual_type)
        .ok_or_else(|| LivroError::validation("type", "unknown ritual type"))?;
    let ritual = state
        .store
        .create_ritual(user.id, ritual_type, payload.date)
        .await?;
    Ok(Json(ritual))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRitualRequest {
    ritual_id: i32,
    #[serde(flatten)]
    update: RitualUpdate,
}

async fn rituals_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateRitualRequest>,
) -> Result<Json<Ritual>> {
    let user = authenticate(&headers, &state.store).await?;
    if let Some(completed) = payload.update.completed {
        if completed != 0 && completed != 1 {
            return Err(LivroError::validation("completed", "must be 0 or 1"));
        }
    }
    owned_ritual(&state.store, &user, payload.ritual_id).await?;
    let ritual = state
        .store
        .update_ritual(payload.ritual_id, &payload.update)
        .await?;
    Ok(Json(ritual))
}

// ---- milestones ----

async fn milestones_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BookScopedQuery>,
) -> Result<Json<Vec<crate::store::Milestone>>> {
    let user = authenticate(&headers, &state.store).await?;
    owned_book(&state.store, &user, query.book_id).await?;
    let milestones = state.store.milestones_by_book(query.book_id).await?;
    Ok(Json(milestones))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateMilestoneRequest {
    book_id: i32,
    description: String,
    #[serde(rename = "type")]
    milestone_type: String,
    celebration_notes: Option<String>,
}

async fn milestones_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateMilestoneRequest>,
) -> Result<Json<crate::store::Milestone>> {
    let user = authenticate(&headers, &state.store).await?;
    require_non_empty("description", &payload.description)?;
    let milestone_type = MilestoneType::parse(&payload.milestone_type)
        .ok_or_else(|| LivroError::validation("type", "unknown milestone type"))?;
    owned_book(&state.store, &user, payload.book_id).await?;
    let milestone = state
        .store
        .create_milestone(
            user.id,
            payload.book_id,
            &payload.description,
            milestone_type,
            payload.celebration_notes.as_deref(),
        )
        .await?;
    Ok(Json(milestone))
}

// ---- settings ----

async fn settings_get(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Option<crate::store::UserSettings>>> {
    let user = authenticate(&headers, &state.store).await?;
    let settings = state.store.settings_by_user(user.id).await?;
    Ok(Json(settings))
}

async fn settings_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SettingsUpdate>,
) -> Result<Json<crate::store::UserSettings>> {
    let user = authenticate(&headers, &state.store).await?;
    if let Some(value) = payload.maintenance_reminder_time.as_deref() {
        validate_reminder_time("maintenanceReminderTime", value)?;
    }
    if let Some(value) = payload.construction_reminder_time.as_deref() {
        validate_reminder_time("constructionReminderTime", value)?;
    }
    let settings = state.store.upsert_settings(user.id, &payload).await?;
    Ok(Json(settings))
}

// ---- ai ----

#[derive(Serialize)]
struct AssistResponse {
    text: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    degraded: bool,
}

/// Provider failures map onto the operation's fixed fallback string with a
/// degraded marker; validation failures stay hard errors.
fn assist_response(result: Result<String>, fallback: &str) -> Result<Json<AssistResponse>> {
    match result {
        Ok(text) => Ok(Json(AssistResponse {
            text,
            degraded: false,
        })),
        Err(err @ LivroError::Validation { .. }) => Err(err),
        Err(_) => Ok(Json(AssistResponse {
            text: fallback.to_string(),
            degraded: true,
        })),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestionRequest {
    context: String,
    chapter_content: String,
}

async fn ai_suggestion(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SuggestionRequest>,
) -> Result<Json<AssistResponse>> {
    authenticate(&headers, &state.store).await?;
    let result = state
        .assist
        .generate_suggestion(&payload.context, &payload.chapter_content)
        .await;
    assist_response(result, SUGGESTION_FALLBACK)
}

#[derive(Debug, Deserialize)]
struct ReviewRequest {
    paragraph: String,
}

async fn ai_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ReviewRequest>,
) -> Result<Json<AssistResponse>> {
    authenticate(&headers, &state.store).await?;
    let result = state.assist.review_paragraph(&payload.paragraph).await;
    assist_response(result, REVIEW_FALLBACK)
}

#[derive(Debug, Deserialize)]
struct IdeasRequest {
    notes: Vec<String>,
}

async fn ai_ideas(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<IdeasRequest>,
) -> Result<Json<AssistResponse>> {
    authenticate(&headers, &state.store).await?;
    let result = state.assist.generate_ideas(&payload.notes).await;
    assist_response(result, IDEAS_FALLBACK)
}
