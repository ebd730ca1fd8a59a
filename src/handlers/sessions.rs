// src/handlers/sessions.rs

//! Learning sessions, the flashcard workflow and tests.
//!
//! Every handler here works on the caller's own session: it loads the session,
//! points the caller's study context at it (dropping card and test if another
//! session was active), runs the service, persists the session and context,
//! and only then records analytics.

use std::sync::Arc;

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        context::{CardView, StudyContext},
        question::{PublicQuestion, SubmitTestRequest, TestResponse, TestResultResponse},
        session::{
            CreateSessionRequest, DocumentResponse, Flashcard, LearningSession, QuestionRequest,
            SaveFlashcardRequest, SessionDetail, SessionSummary,
        },
    },
    services::{analytics, exam, workflow},
    state::AppState,
    store::Store,
    utils::jwt::Claims,
};

/// Loads a session owned by `username`. Other users' sessions look missing.
async fn load_session(store: &dyn Store, id: i64, username: &str) -> Result<LearningSession, AppError> {
    store
        .get_session(id)
        .await?
        .filter(|session| session.username == username)
        .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))
}

/// JSON body that may be left out entirely.
fn optional_json<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(body)?)
}

/// Loads the session and the caller's context focused on it.
async fn open(
    store: &dyn Store,
    id: i64,
    username: &str,
) -> Result<(LearningSession, StudyContext), AppError> {
    let session = load_session(store, id, username).await?;
    let ctx = StudyContext::focus(store.get_context(username).await?, session.id);
    Ok((session, ctx))
}

/// List the current user's sessions, most recent first.
#[utoipa::path(
    get,
    path = "/api/sessions",
    responses((status = 200, description = "OK", body = [SessionSummary])),
    security(("bearer" = [])),
    tag = "sessions"
)]
pub async fn list_sessions(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let sessions = store.get_sessions_for_user(claims.username()).await?;
    let summaries: Vec<SessionSummary> = sessions.iter().map(SessionSummary::from).collect();
    Ok(Json(summaries))
}

/// Create a session and make it the active one.
#[utoipa::path(
    post,
    path = "/api/sessions",
    request_body = CreateSessionRequest,
    responses((status = 201, description = "Created", body = LearningSession)),
    security(("bearer" = [])),
    tag = "sessions"
)]
pub async fn create_session(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Session name must not be blank".to_string()));
    }

    let session = store.create_session(claims.username(), name).await?;
    store
        .put_context(claims.username(), &StudyContext::new(session.id))
        .await?;

    tracing::info!(session_id = session.id, username = claims.username(), "Session created");
    Ok((StatusCode::CREATED, Json(session)))
}

/// Open a session: returns it with its workflow state and makes it active.
#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    params(("id" = i64, Path, description = "Session id")),
    responses((status = 200, description = "OK", body = SessionDetail), (status = 404, description = "Not found")),
    security(("bearer" = [])),
    tag = "sessions"
)]
pub async fn get_session(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let (session, ctx) = open(store.as_ref(), id, claims.username()).await?;
    store.put_context(claims.username(), &ctx).await?;

    let workflow = CardView::new(&ctx, &session, None);
    Ok(Json(SessionDetail { session, workflow }))
}

/// Delete a session with its saved flashcards. Copies shared to communities stay.
#[utoipa::path(
    delete,
    path = "/api/sessions/{id}",
    params(("id" = i64, Path, description = "Session id")),
    responses((status = 204, description = "Done"), (status = 404, description = "Not found")),
    security(("bearer" = [])),
    tag = "sessions"
)]
pub async fn delete_session(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = load_session(store.as_ref(), id, claims.username()).await?;
    store.delete_session(session.id).await?;

    let active = store.get_context(claims.username()).await?;
    if active.is_some_and(|ctx| ctx.session_id == session.id) {
        store.delete_context(claims.username()).await?;
    }

    tracing::info!(session_id = id, username = claims.username(), "Session deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Upload the session's source document (raw bytes).
///
/// Only the first upload with readable text is kept.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/document",
    params(("id" = i64, Path, description = "Session id")),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses((status = 200, description = "OK", body = DocumentResponse), (status = 404, description = "Not found")),
    security(("bearer" = [])),
    tag = "workflow"
)]
pub async fn upload_document(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let store = state.store.as_ref();
    let (mut session, ctx) = open(store, id, claims.username()).await?;

    let extracted = state.extractor.extract(&body);
    let (outcome, delta) = workflow::ingest_text(&mut session, extracted);
    if outcome.changed_session() {
        store.put_session(&session).await?;
    }
    store.put_context(claims.username(), &ctx).await?;

    let analytics_error = analytics::record(store, claims.username(), &delta).await;
    Ok(Json(DocumentResponse {
        session_id: session.id,
        outcome,
        has_text: session.usable_text().is_some(),
        analytics_error,
    }))
}

/// Show the next flashcard question for a topic.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/question",
    params(("id" = i64, Path, description = "Session id")),
    request_body = QuestionRequest,
    responses((status = 200, description = "OK", body = CardView), (status = 400, description = "Bad request"), (status = 502, description = "Generation failed")),
    security(("bearer" = [])),
    tag = "workflow"
)]
pub async fn next_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let payload: QuestionRequest = optional_json(&body)?;
    let store = state.store.as_ref();
    let (session, mut ctx) = open(store, id, claims.username()).await?;

    let result = workflow::next_question(&state.generator, &session, &mut ctx, &payload.topic).await;
    // The focus change sticks even if generation failed.
    store.put_context(claims.username(), &ctx).await?;
    let delta = result?;

    let analytics_error = analytics::record(store, claims.username(), &delta).await;
    Ok(Json(CardView::new(&ctx, &session, analytics_error)))
}

/// Reveal the answer to the current question.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/answer",
    params(("id" = i64, Path, description = "Session id")),
    responses((status = 200, description = "OK", body = CardView), (status = 400, description = "Bad request"), (status = 502, description = "Generation failed")),
    security(("bearer" = [])),
    tag = "workflow"
)]
pub async fn reveal_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let store = state.store.as_ref();
    let (session, mut ctx) = open(store, id, claims.username()).await?;

    let result = workflow::reveal_answer(&state.generator, &session, &mut ctx).await;
    store.put_context(claims.username(), &ctx).await?;
    result?;

    Ok(Json(CardView::new(&ctx, &session, None)))
}

/// Re-explain the revealed answer in simpler words.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/simplify",
    params(("id" = i64, Path, description = "Session id")),
    responses((status = 200, description = "OK", body = CardView), (status = 400, description = "Bad request"), (status = 502, description = "Generation failed")),
    security(("bearer" = [])),
    tag = "workflow"
)]
pub async fn simplify(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let store = state.store.as_ref();
    let (session, mut ctx) = open(store, id, claims.username()).await?;

    let result = workflow::simplify(&state.generator, &session, &mut ctx).await;
    store.put_context(claims.username(), &ctx).await?;
    result?;

    Ok(Json(CardView::new(&ctx, &session, None)))
}

/// List the session's saved flashcards in saving order.
#[utoipa::path(
    get,
    path = "/api/sessions/{id}/flashcards",
    params(("id" = i64, Path, description = "Session id")),
    responses((status = 200, description = "OK", body = [Flashcard])),
    security(("bearer" = [])),
    tag = "workflow"
)]
pub async fn list_flashcards(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = load_session(store.as_ref(), id, claims.username()).await?;
    Ok(Json(session.flashcards))
}

/// Save a flashcard. Fields left out are taken from the card on screen.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/flashcards",
    params(("id" = i64, Path, description = "Session id")),
    request_body = SaveFlashcardRequest,
    responses((status = 201, description = "Created", body = Flashcard), (status = 400, description = "Bad request")),
    security(("bearer" = [])),
    tag = "workflow"
)]
pub async fn save_flashcard(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let payload: SaveFlashcardRequest = optional_json(&body)?;
    let (mut session, ctx) = open(store.as_ref(), id, claims.username()).await?;

    let card = ctx.card.as_ref();
    let question = payload
        .question
        .or_else(|| card.map(|c| c.question.clone()))
        .unwrap_or_default();
    let answer = payload
        .answer
        .or_else(|| card.and_then(|c| c.answer.clone()))
        .unwrap_or_default();

    let flashcard = workflow::save_flashcard(&mut session, &question, &answer)?;
    store.put_session(&session).await?;
    store.put_context(claims.username(), &ctx).await?;

    Ok((StatusCode::CREATED, Json(flashcard)))
}

/// Generate a new ten-question test. Any previous unsubmitted test is dropped.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/test",
    params(("id" = i64, Path, description = "Session id")),
    responses((status = 200, description = "OK", body = TestResponse), (status = 400, description = "Bad request"), (status = 502, description = "Generation failed")),
    security(("bearer" = [])),
    tag = "tests"
)]
pub async fn start_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let store = state.store.as_ref();
    let (session, mut ctx) = open(store, id, claims.username()).await?;

    let result = exam::start_test(&state.generator, &session, &mut ctx).await;
    store.put_context(claims.username(), &ctx).await?;
    let questions = result?;

    Ok(Json(TestResponse {
        session_id: session.id,
        questions: questions
            .iter()
            .enumerate()
            .map(|(index, q)| PublicQuestion::new(index, q))
            .collect(),
    }))
}

/// Submit answers to the pending test, get the score, review and insights.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/test/submit",
    params(("id" = i64, Path, description = "Session id")),
    request_body = SubmitTestRequest,
    responses((status = 200, description = "OK", body = TestResultResponse), (status = 400, description = "Bad request")),
    security(("bearer" = [])),
    tag = "tests"
)]
pub async fn submit_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<SubmitTestRequest>,
) -> Result<impl IntoResponse, AppError> {
    let store = state.store.as_ref();
    let (session, mut ctx) = open(store, id, claims.username()).await?;

    let Some(test) = ctx.test.take() else {
        store.put_context(claims.username(), &ctx).await?;
        return Err(AppError::BadRequest("No test in progress for this session".to_string()));
    };

    let submission = exam::score_test(&test.questions, &payload.answers);
    store.put_context(claims.username(), &ctx).await?;

    let source = session.usable_text().unwrap_or_default();
    let delta = exam::record_result(&state.generator, source, &submission, Utc::now()).await;
    let insights = delta
        .test
        .as_ref()
        .map(|record| record.insights.clone())
        .unwrap_or_default();

    tracing::info!(
        session_id = session.id,
        username = claims.username(),
        score = submission.score,
        "Test submitted"
    );

    let analytics_error = analytics::record(store, claims.username(), &delta).await;
    Ok(Json(TestResultResponse {
        submission,
        insights,
        analytics_error,
    }))
}
