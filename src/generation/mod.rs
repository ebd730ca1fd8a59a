//! Language-model collaborator.
//!
//! [`GenerationService`] is the raw contract: text in, text out. [`Generator`]
//! wraps a service with the source-text budget and output sanitization so
//! every call made while handling a request sees the same excerpt and every
//! piece of generated prose is cleaned the same way.

mod client;
mod prompt;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::{models::question::WrongItem, utils::sanitize::sanitize};

pub use client::ChatCompletionsClient;

/// What the model is asked to produce from the source text.
#[derive(Debug, Clone, Copy)]
pub enum Directive<'a> {
    /// One flashcard question about `topic`, different from `previous_question`.
    Question {
        topic: &'a str,
        previous_question: &'a str,
    },
    /// The answer to a flashcard question.
    Answer { question: &'a str },
    /// A plainer restatement of an answer.
    Simplify { answer: &'a str },
    /// Study advice after a test.
    Insights {
        score: u32,
        total: u32,
        wrong_items: &'a [WrongItem],
    },
}

/// Errors from the generation layer.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("generation request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("generation service error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The service answered but produced no usable text.
    #[error("generation service returned no content")]
    EmptyResponse,

    /// A structured payload did not have the required shape.
    #[error("malformed generation payload: {0}")]
    Malformed(String),
}

pub type GenerationResult<T> = Result<T, GenerationError>;

/// Request/response access to the language model. No retries happen at this
/// level or above it.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Free-text generation. Output is expected to be plain text but is not trusted to be.
    async fn generate(&self, text: &str, directive: Directive<'_>) -> GenerationResult<String>;

    /// Raw multiple-choice test payload, parsed by the test engine.
    async fn generate_test_set(&self, text: &str) -> GenerationResult<String>;
}

/// Cuts `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// A generation service bound to a source-text budget.
#[derive(Clone)]
pub struct Generator {
    service: Arc<dyn GenerationService>,
    max_source_chars: usize,
}

impl Generator {
    pub fn new(service: Arc<dyn GenerationService>, max_source_chars: usize) -> Self {
        Self {
            service,
            max_source_chars,
        }
    }

    fn excerpt<'a>(&self, text: &'a str) -> &'a str {
        truncate_chars(text, self.max_source_chars)
    }

    /// Sanitized free text. Output that is empty after cleaning counts as a failure.
    pub async fn text(&self, source: &str, directive: Directive<'_>) -> GenerationResult<String> {
        let raw = self
            .service
            .generate(self.excerpt(source), directive)
            .await?;
        let clean = sanitize(&raw);
        if clean.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(clean)
    }

    /// Raw test payload for the budgeted excerpt of `source`.
    pub async fn test_set(&self, source: &str) -> GenerationResult<String> {
        self.service.generate_test_set(self.excerpt(source)).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted stand-in for the language model.

    use std::{collections::VecDeque, sync::Mutex};

    use super::*;

    /// Replies with queued responses in order; records every source excerpt and
    /// directive kind it was called with.
    #[derive(Default)]
    pub struct ScriptedService {
        replies: Mutex<VecDeque<GenerationResult<String>>>,
        pub calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedService {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, text: &str) -> Self {
            self.replies.lock().unwrap().push_back(Ok(text.to_string()));
            self
        }

        pub fn fail(self) -> Self {
            self.replies
                .lock()
                .unwrap()
                .push_back(Err(GenerationError::EmptyResponse));
            self
        }

        fn next(&self, source: &str, kind: String) -> GenerationResult<String> {
            self.calls.lock().unwrap().push((source.to_string(), kind));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(GenerationError::EmptyResponse))
        }
    }

    #[async_trait]
    impl GenerationService for ScriptedService {
        async fn generate(&self, text: &str, directive: Directive<'_>) -> GenerationResult<String> {
            self.next(text, format!("{directive:?}"))
        }

        async fn generate_test_set(&self, text: &str) -> GenerationResult<String> {
            self.next(text, "TestSet".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{testing::ScriptedService, *};

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[tokio::test]
    async fn generator_sends_the_budgeted_excerpt_and_sanitizes() {
        let service = Arc::new(ScriptedService::new().reply("<b>Question:</b> What boils?"));
        let generator = Generator::new(service.clone(), 5);

        let out = generator
            .text(
                "Water boils at 100C",
                Directive::Answer { question: "q" },
            )
            .await
            .unwrap();

        assert_eq!(out, "What boils?");
        assert_eq!(service.calls.lock().unwrap()[0].0, "Water");
    }

    #[tokio::test]
    async fn blank_output_is_a_failure() {
        let service = Arc::new(ScriptedService::new().reply("<p> </p>"));
        let generator = Generator::new(service, 100);
        let result = generator
            .text("text", Directive::Simplify { answer: "a" })
            .await;
        assert!(matches!(result, Err(GenerationError::EmptyResponse)));
    }
}
