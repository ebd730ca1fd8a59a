// src/models/session.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// A user's unit of study: one source document and the flashcards saved from it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LearningSession {
    pub id: i64,
    pub username: String,
    pub name: String,

    /// Extracted document text. `None` until a document is ingested; once it
    /// holds non-empty text it is never replaced.
    pub source_text: Option<String>,

    /// Saved flashcards in the order they were saved.
    pub flashcards: Vec<Flashcard>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl LearningSession {
    /// The source text if it is usable for generation.
    pub fn usable_text(&self) -> Option<&str> {
        self.source_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// A saved question/answer pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Session list entry. Leaves out the (possibly large) source text.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionSummary {
    pub id: i64,
    pub name: String,
    pub has_text: bool,
    pub flashcard_count: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&LearningSession> for SessionSummary {
    fn from(session: &LearningSession) -> Self {
        Self {
            id: session.id,
            name: session.name.clone(),
            has_text: session.usable_text().is_some(),
            flashcard_count: session.flashcards.len(),
            created_at: session.created_at,
        }
    }
}

/// DTO for creating a new session.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSessionRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Session name length must be between 1 and 100 chars"
    ))]
    pub name: String,
}

/// DTO for asking for the next flashcard question.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct QuestionRequest {
    /// Topic to focus on. Blank means general concepts.
    #[serde(default)]
    pub topic: String,
}

/// DTO for saving a flashcard. Missing fields default to the current card.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SaveFlashcardRequest {
    pub question: Option<String>,
    pub answer: Option<String>,
}

/// Result of offering extracted text to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IngestOutcome {
    /// Text stored; this was the session's first usable document.
    Stored,
    /// Extraction produced nothing usable. The session stays without text.
    Empty,
    /// The session already has text; the upload was ignored.
    AlreadyIngested,
}

impl IngestOutcome {
    /// Whether the session record changed and needs saving.
    pub fn changed_session(self) -> bool {
        !matches!(self, IngestOutcome::AlreadyIngested)
    }
}

/// Response for a document upload.
#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentResponse {
    pub session_id: i64,
    pub outcome: IngestOutcome,
    pub has_text: bool,
    pub analytics_error: Option<String>,
}

/// A session opened for study: the record plus where its workflow stands.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: LearningSession,
    pub workflow: super::context::CardView,
}
