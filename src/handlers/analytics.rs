use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::{error::AppError, models::user::Analytics, store::Store, utils::jwt::Claims};

/// Get the current user's counters, latest insights and score history.
#[utoipa::path(
    get,
    path = "/api/analytics",
    responses((status = 200, description = "OK", body = Analytics)),
    security(("bearer" = [])),
    tag = "analytics"
)]
pub async fn get_analytics(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = store
        .get_user(claims.username())
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user.analytics))
}
