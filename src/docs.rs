// src/docs.rs

use axum::Json;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{
    handlers::{analytics, auth, community, sessions},
    models::{
        community::{Community, CreateCommunityRequest, ShareFailure, ShareReport, ShareRequest, ShareSource, SharedFlashcard},
        context::{Card, CardView, WorkflowPhase},
        question::{PublicQuestion, ReviewItem, SubmitTestRequest, TestResponse, TestResultResponse, TestSubmission, WrongItem},
        session::{
            CreateSessionRequest, DocumentResponse, Flashcard, IngestOutcome, LearningSession, QuestionRequest,
            SaveFlashcardRequest, SessionDetail, SessionSummary,
        },
        user::{Analytics, CreateUserRequest, LoginRequest, TestHistoryEntry, UserProfile},
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        analytics::get_analytics,
        sessions::list_sessions,
        sessions::create_session,
        sessions::get_session,
        sessions::delete_session,
        sessions::upload_document,
        sessions::next_question,
        sessions::reveal_answer,
        sessions::simplify,
        sessions::list_flashcards,
        sessions::save_flashcard,
        sessions::start_test,
        sessions::submit_test,
        community::list_communities,
        community::list_my_communities,
        community::list_available_communities,
        community::create_community,
        community::delete_community,
        community::join_community,
        community::leave_community,
        community::list_members,
        community::list_shared_flashcards,
        community::delete_shared_flashcard,
        community::share_flashcard,
    ),
    components(schemas(
        Analytics, TestHistoryEntry, UserProfile, CreateUserRequest, LoginRequest,
        LearningSession, Flashcard, SessionSummary, SessionDetail, CreateSessionRequest,
        QuestionRequest, SaveFlashcardRequest, DocumentResponse, IngestOutcome,
        Card, CardView, WorkflowPhase,
        PublicQuestion, TestResponse, SubmitTestRequest, WrongItem, ReviewItem, TestSubmission, TestResultResponse,
        Community, SharedFlashcard, CreateCommunityRequest, ShareSource, ShareRequest, ShareFailure, ShareReport,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "sessions", description = "Learning sessions"),
        (name = "workflow", description = "Flashcard workflow of a session"),
        (name = "tests", description = "Multiple-choice tests"),
        (name = "communities", description = "Communities and shared flashcards"),
        (name = "analytics", description = "Per-user learning analytics")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Serves the OpenAPI document.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
