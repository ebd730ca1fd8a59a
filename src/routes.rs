// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    docs::openapi_json,
    handlers::{analytics, auth, community, sessions},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Auth and the OpenAPI document are public; everything else needs a bearer token.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store, generator, extractor, config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let session_routes = Router::new()
        .route("/", get(sessions::list_sessions).post(sessions::create_session))
        .route(
            "/{id}",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/{id}/document", post(sessions::upload_document))
        .route("/{id}/question", post(sessions::next_question))
        .route("/{id}/answer", post(sessions::reveal_answer))
        .route("/{id}/simplify", post(sessions::simplify))
        .route(
            "/{id}/flashcards",
            get(sessions::list_flashcards).post(sessions::save_flashcard),
        )
        .route("/{id}/test", post(sessions::start_test))
        .route("/{id}/test/submit", post(sessions::submit_test));

    let community_routes = Router::new()
        .route(
            "/",
            get(community::list_communities).post(community::create_community),
        )
        .route("/mine", get(community::list_my_communities))
        .route("/available", get(community::list_available_communities))
        .route("/share", post(community::share_flashcard))
        .route("/{id}", delete(community::delete_community))
        .route("/{id}/join", post(community::join_community))
        .route("/{id}/leave", post(community::leave_community))
        .route("/{id}/members", get(community::list_members))
        .route("/{id}/flashcards", get(community::list_shared_flashcards))
        .route(
            "/{id}/flashcards/{flashcard_id}",
            delete(community::delete_shared_flashcard),
        );

    let protected_routes = Router::new()
        .nest("/api/sessions", session_routes)
        .nest("/api/communities", community_routes)
        .route("/api/analytics", get(analytics::get_analytics))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .route("/api/openapi.json", get(openapi_json))
        .merge(protected_routes)
        // Global middleware (applied top to bottom)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
