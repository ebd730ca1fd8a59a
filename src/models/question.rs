// src/models/question.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::utils::sanitize::sanitize;

/// One multiple-choice test item as produced by the generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Question {
    pub question: String,

    /// Exactly four options, in display order.
    pub options: Vec<String>,

    /// The correct option's text. Compared by normalized text, never by index.
    pub correct: String,
}

/// DTO for sending a question to the client (no correct answer).
/// Text goes through the same sanitizer that scoring uses.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicQuestion {
    pub index: usize,
    pub question: String,
    pub options: Vec<String>,
}

impl PublicQuestion {
    pub fn new(index: usize, question: &Question) -> Self {
        Self {
            index,
            question: sanitize(&question.question),
            options: question.options.iter().map(|o| sanitize(o)).collect(),
        }
    }
}

/// Response for a freshly generated test.
#[derive(Debug, Serialize, ToSchema)]
pub struct TestResponse {
    pub session_id: i64,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for submitting a test attempt.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitTestRequest {
    /// User's answers map.
    /// Key: question index (0-based)
    /// Value: the option text the user picked
    #[serde(default)]
    pub answers: HashMap<usize, String>,
}

/// A question the user got wrong, kept for insight generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WrongItem {
    pub question: String,
    /// `None` when the question was left unanswered.
    pub given_answer: Option<String>,
}

/// Per-question review row shown after submission.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReviewItem {
    pub question: String,
    pub given_answer: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
}

/// Outcome of scoring one submission.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TestSubmission {
    pub score: u32,
    pub total: u32,
    pub wrong_items: Vec<WrongItem>,
    pub review: Vec<ReviewItem>,
}

/// Response for a submitted test.
#[derive(Debug, Serialize, ToSchema)]
pub struct TestResultResponse {
    #[serde(flatten)]
    pub submission: TestSubmission,
    pub insights: String,
    pub analytics_error: Option<String>,
}
