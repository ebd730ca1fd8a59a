// src/models/community.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::session::Flashcard;

/// A named group whose members see each other's shared flashcards.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Community {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// The member who created the community. Only consulted when deletion is
    /// restricted to creators.
    pub created_by: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Insert form of a community; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewCommunity {
    pub name: String,
    pub description: String,
    pub created_by: String,
}

/// A flashcard copied into a community.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SharedFlashcard {
    pub id: i64,
    pub community_id: i64,
    /// Value copy taken at share time; later edits to the source never reach it.
    pub flashcard: Flashcard,
    pub shared_by: String,
    pub shared_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a community.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCommunityRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Community name length must be between 1 and 100 chars"
    ))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
}

/// Where the shared card comes from.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ShareSource {
    /// The card currently on screen in the active session, saved or not.
    Current,
    /// A saved flashcard of one of the user's sessions.
    Saved { session_id: i64, index: usize },
}

/// DTO for sharing one flashcard into several communities.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ShareRequest {
    pub community_ids: Vec<i64>,
    #[serde(flatten)]
    pub source: ShareSource,
}

/// One failed insertion of a share request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ShareFailure {
    pub community_id: i64,
    pub reason: String,
}

/// Per-community result of a share. Insertions are independent.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ShareReport {
    pub shared: Vec<SharedFlashcard>,
    pub failed: Vec<ShareFailure>,
}

impl ShareReport {
    /// At least one community received the card.
    pub fn succeeded(&self) -> bool {
        !self.shared.is_empty()
    }
}
