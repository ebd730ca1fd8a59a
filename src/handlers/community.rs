// src/handlers/community.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::community::{Community, CreateCommunityRequest, ShareReport, ShareRequest, SharedFlashcard},
    services::community as communities,
    store::Store,
    utils::jwt::Claims,
};

/// List every community.
#[utoipa::path(
    get,
    path = "/api/communities",
    responses((status = 200, description = "OK", body = [Community])),
    security(("bearer" = [])),
    tag = "communities"
)]
pub async fn list_communities(State(store): State<Arc<dyn Store>>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.get_communities().await?))
}

/// List the communities the current user belongs to.
#[utoipa::path(
    get,
    path = "/api/communities/mine",
    responses((status = 200, description = "OK", body = [Community])),
    security(("bearer" = [])),
    tag = "communities"
)]
pub async fn list_my_communities(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.get_user_communities(claims.username()).await?))
}

/// List the communities the current user can still join.
#[utoipa::path(
    get,
    path = "/api/communities/available",
    responses((status = 200, description = "OK", body = [Community])),
    security(("bearer" = [])),
    tag = "communities"
)]
pub async fn list_available_communities(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(communities::available_communities(store.as_ref(), claims.username()).await?))
}

/// Create a community. The creator becomes its first member.
#[utoipa::path(
    post,
    path = "/api/communities",
    request_body = CreateCommunityRequest,
    responses((status = 201, description = "Created", body = Community)),
    security(("bearer" = [])),
    tag = "communities"
)]
pub async fn create_community(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCommunityRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let community = communities::create_community(store.as_ref(), claims.username(), payload).await?;
    Ok((StatusCode::CREATED, Json(community)))
}

/// Delete a community along with its memberships and shared flashcards.
#[utoipa::path(
    delete,
    path = "/api/communities/{id}",
    params(("id" = i64, Path, description = "Community id")),
    responses((status = 204, description = "Done")),
    security(("bearer" = [])),
    tag = "communities"
)]
pub async fn delete_community(
    State(store): State<Arc<dyn Store>>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    communities::delete_community(
        store.as_ref(),
        config.community_delete_policy,
        id,
        claims.username(),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Join a community.
#[utoipa::path(
    post,
    path = "/api/communities/{id}/join",
    params(("id" = i64, Path, description = "Community id")),
    responses((status = 200, description = "OK")),
    security(("bearer" = [])),
    tag = "communities"
)]
pub async fn join_community(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let joined = communities::join(store.as_ref(), id, claims.username()).await?;
    Ok(Json(json!({ "community_id": id, "joined": joined })))
}

/// Leave a community. Flashcards shared before stay visible to the others.
#[utoipa::path(
    post,
    path = "/api/communities/{id}/leave",
    params(("id" = i64, Path, description = "Community id")),
    responses((status = 204, description = "Done")),
    security(("bearer" = [])),
    tag = "communities"
)]
pub async fn leave_community(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    communities::leave(store.as_ref(), id, claims.username()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List member usernames. Unknown ids give an empty list.
#[utoipa::path(
    get,
    path = "/api/communities/{id}/members",
    params(("id" = i64, Path, description = "Community id")),
    responses((status = 200, description = "OK", body = [String])),
    security(("bearer" = [])),
    tag = "communities"
)]
pub async fn list_members(
    State(store): State<Arc<dyn Store>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.get_members(id).await?))
}

/// List a community's shared flashcards. Members only.
#[utoipa::path(
    get,
    path = "/api/communities/{id}/flashcards",
    params(("id" = i64, Path, description = "Community id")),
    responses((status = 200, description = "OK", body = [SharedFlashcard])),
    security(("bearer" = [])),
    tag = "communities"
)]
pub async fn list_shared_flashcards(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        communities::visible_flashcards(store.as_ref(), id, claims.username()).await?,
    ))
}

/// Remove a shared flashcard from one community. Copies elsewhere are untouched.
#[utoipa::path(
    delete,
    path = "/api/communities/{id}/flashcards/{flashcard_id}",
    params(
        ("id" = i64, Path, description = "Community id"),
        ("flashcard_id" = i64, Path, description = "Shared flashcard id")
    ),
    responses((status = 204, description = "Done")),
    security(("bearer" = [])),
    tag = "communities"
)]
pub async fn delete_shared_flashcard(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path((id, flashcard_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    communities::delete_shared(store.as_ref(), id, flashcard_id, claims.username()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Share one flashcard into one or more communities.
///
/// Returns 201 with a per-community report when at least one copy was made.
#[utoipa::path(
    post,
    path = "/api/communities/share",
    request_body = ShareRequest,
    responses((status = 201, description = "Created", body = ShareReport)),
    security(("bearer" = [])),
    tag = "communities"
)]
pub async fn share_flashcard(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ShareRequest>,
) -> Result<impl IntoResponse, AppError> {
    let store = store.as_ref();
    let flashcard = communities::flashcard_for_share(store, claims.username(), &payload.source).await?;
    let report = communities::share(store, claims.username(), &payload.community_ids, &flashcard).await?;
    Ok((StatusCode::CREATED, Json(report)))
}
