//! Flashcard workflow of one learning session.
//!
//! `NoText -> QuestionPending -> AnswerRevealed`, with "simplify" looping on
//! `AnswerRevealed` and "next question" going back to `QuestionPending`. The
//! functions here take the session and the user's [`StudyContext`] explicitly
//! and mutate only what they are handed; persisting the result is the
//! caller's job.

use chrono::Utc;

use crate::{
    config::DEFAULT_TOPIC,
    error::AppError,
    generation::{Directive, Generator},
    models::{
        context::{Card, StudyContext},
        session::{Flashcard, IngestOutcome, LearningSession},
    },
    utils::sanitize::sanitize,
};

use super::analytics::AnalyticsDelta;

fn no_usable_text() -> AppError {
    AppError::BadRequest("Upload a document with readable text first".to_string())
}

/// Blank topics fall back to general concepts.
pub fn normalize_topic(topic: &str) -> String {
    let topic = topic.trim();
    if topic.is_empty() {
        DEFAULT_TOPIC.to_string()
    } else {
        topic.to_string()
    }
}

/// Stores extracted text unless the session already has usable text.
///
/// Only the first non-empty ingestion counts as an ingested document, so the
/// counter moves at most once per session.
pub fn ingest_text(session: &mut LearningSession, extracted: String) -> (IngestOutcome, AnalyticsDelta) {
    if session.usable_text().is_some() {
        return (IngestOutcome::AlreadyIngested, AnalyticsDelta::default());
    }

    if extracted.trim().is_empty() {
        tracing::warn!(session_id = session.id, "Extraction produced no text");
        session.source_text = Some(String::new());
        return (IngestOutcome::Empty, AnalyticsDelta::default());
    }

    tracing::info!(session_id = session.id, chars = extracted.chars().count(), "Document ingested");
    session.source_text = Some(extracted);
    (IngestOutcome::Stored, AnalyticsDelta::document_ingested())
}

/// Fetches the next question for `topic`.
///
/// A topic different from the current card's starts over: the card is
/// replaced, no previous question is sent and the generated counter moves.
/// A blank topic is not a change.
/// The same topic asks for a different question than the current one and
/// moves the viewed counter. On generation failure the context is untouched.
pub async fn next_question(
    generator: &Generator,
    session: &LearningSession,
    ctx: &mut StudyContext,
    topic: &str,
) -> Result<AnalyticsDelta, AppError> {
    debug_assert_eq!(ctx.session_id, session.id);
    let text = session.usable_text().ok_or_else(no_usable_text)?;
    // A blank topic keeps the current card's topic; it only means "general
    // concepts" when there is no card yet.
    let topic = match &ctx.card {
        Some(card) if topic.trim().is_empty() => card.topic.clone(),
        _ => normalize_topic(topic),
    };

    let previous = match &ctx.card {
        Some(card) if card.topic == topic => Some(card.question.as_str()),
        _ => None,
    };

    let question = generator
        .text(
            text,
            Directive::Question {
                topic: &topic,
                previous_question: previous.unwrap_or(""),
            },
        )
        .await?;

    let delta = if previous.is_some() {
        AnalyticsDelta::flashcard_viewed()
    } else {
        AnalyticsDelta::flashcard_generated()
    };

    ctx.card = Some(Card {
        topic,
        question,
        answer: None,
    });
    Ok(delta)
}

/// Reveals the answer to the current question.
///
/// Calling it again once revealed returns the same answer without another
/// generation call.
pub async fn reveal_answer(
    generator: &Generator,
    session: &LearningSession,
    ctx: &mut StudyContext,
) -> Result<String, AppError> {
    let text = session.usable_text().ok_or_else(no_usable_text)?;
    let card = ctx
        .card
        .as_mut()
        .ok_or_else(|| AppError::BadRequest("No question to answer yet".to_string()))?;

    if let Some(answer) = &card.answer {
        return Ok(answer.clone());
    }

    let answer = generator
        .text(
            text,
            Directive::Answer {
                question: &card.question,
            },
        )
        .await?;
    card.answer = Some(answer.clone());
    Ok(answer)
}

/// Replaces the revealed answer with a simpler explanation.
pub async fn simplify(
    generator: &Generator,
    session: &LearningSession,
    ctx: &mut StudyContext,
) -> Result<String, AppError> {
    let text = session.usable_text().ok_or_else(no_usable_text)?;
    let card = ctx
        .card
        .as_mut()
        .filter(|card| card.answer.is_some())
        .ok_or_else(|| AppError::BadRequest("Reveal the answer first".to_string()))?;
    let current = card.answer.as_deref().unwrap_or_default();

    let simpler = generator
        .text(text, Directive::Simplify { answer: current })
        .await?;
    card.answer = Some(simpler.clone());
    Ok(simpler)
}

/// Appends a flashcard to the session's saved list.
pub fn save_flashcard(
    session: &mut LearningSession,
    question: &str,
    answer: &str,
) -> Result<Flashcard, AppError> {
    let question = sanitize(question);
    let answer = sanitize(answer);
    if question.is_empty() || answer.is_empty() {
        return Err(AppError::BadRequest(
            "A flashcard needs both a question and an answer".to_string(),
        ));
    }

    let flashcard = Flashcard {
        question,
        answer,
        timestamp: Utc::now(),
    };
    session.flashcards.push(flashcard.clone());
    Ok(flashcard)
}
