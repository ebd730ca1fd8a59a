// src/models/context.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{question::Question, session::LearningSession};

/// Where the flashcard workflow of a session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    /// The session has no usable source text yet.
    NoText,
    /// A question is shown (or about to be fetched); its answer is hidden.
    QuestionPending,
    /// The answer to the current question is shown.
    AnswerRevealed,
}

/// The flashcard currently on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Card {
    pub topic: String,
    pub question: String,
    pub answer: Option<String>,
}

/// A generated test waiting for its submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTest {
    pub questions: Vec<Question>,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

/// Per-user working state of the active learning session.
///
/// This is the explicit value the workflow and test engines read and return;
/// it is persisted between requests and holds nothing that is not also
/// derivable from the requests that built it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyContext {
    pub session_id: i64,
    pub card: Option<Card>,
    pub test: Option<PendingTest>,
}

impl StudyContext {
    pub fn new(session_id: i64) -> Self {
        Self {
            session_id,
            card: None,
            test: None,
        }
    }

    /// Points the context at `session_id`.
    ///
    /// Switching to another session drops the current card and any test in
    /// progress; refocusing the same session keeps both.
    pub fn focus(context: Option<StudyContext>, session_id: i64) -> StudyContext {
        match context {
            Some(ctx) if ctx.session_id == session_id => ctx,
            Some(ctx) => {
                tracing::debug!(
                    from = ctx.session_id,
                    to = session_id,
                    "Switching active session, discarding card and test"
                );
                StudyContext::new(session_id)
            }
            None => StudyContext::new(session_id),
        }
    }

    pub fn phase(&self, session: &LearningSession) -> WorkflowPhase {
        if session.usable_text().is_none() {
            return WorkflowPhase::NoText;
        }
        match &self.card {
            Some(Card {
                answer: Some(_), ..
            }) => WorkflowPhase::AnswerRevealed,
            _ => WorkflowPhase::QuestionPending,
        }
    }
}

/// What the client sees of the workflow.
#[derive(Debug, Serialize, ToSchema)]
pub struct CardView {
    pub session_id: i64,
    pub phase: WorkflowPhase,
    pub card: Option<Card>,
    /// Set when the best-effort analytics write failed.
    pub analytics_error: Option<String>,
}

impl CardView {
    pub fn new(ctx: &StudyContext, session: &LearningSession, analytics_error: Option<String>) -> Self {
        Self {
            session_id: ctx.session_id,
            phase: ctx.phase(session),
            card: ctx.card.clone(),
            analytics_error,
        }
    }
}
