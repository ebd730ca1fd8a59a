//! Accumulation of per-user learning counters.
//!
//! Every learning action describes what it did as an [`AnalyticsDelta`]; the
//! delta is applied to the stored record and the whole record is written back
//! in one `put_user`. Analytics are written last and best-effort: a failed
//! write is reported to the caller but nothing already shown is taken back.

use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::user::{Analytics, TestHistoryEntry},
    store::Store,
};

/// A finished test as it enters the history.
#[derive(Debug, Clone, PartialEq)]
pub struct TestRecord {
    pub score: u32,
    pub insights: String,
    pub taken_at: DateTime<Utc>,
}

/// What one action adds to a user's analytics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsDelta {
    pub documents_ingested: u64,
    pub flashcards_generated: u64,
    pub flashcards_viewed: u64,
    pub test: Option<TestRecord>,
}

impl AnalyticsDelta {
    pub fn document_ingested() -> Self {
        Self {
            documents_ingested: 1,
            ..Self::default()
        }
    }

    pub fn flashcard_generated() -> Self {
        Self {
            flashcards_generated: 1,
            ..Self::default()
        }
    }

    pub fn flashcard_viewed() -> Self {
        Self {
            flashcards_viewed: 1,
            ..Self::default()
        }
    }

    pub fn test_taken(record: TestRecord) -> Self {
        Self {
            test: Some(record),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Analytics {
    /// Applies a delta in place. A test record updates the history, the last
    /// score, the insight text and the test counter together.
    pub fn apply(&mut self, delta: &AnalyticsDelta) {
        self.documents_ingested += delta.documents_ingested;
        self.flashcards_generated += delta.flashcards_generated;
        self.flashcards_viewed += delta.flashcards_viewed;

        if let Some(test) = &delta.test {
            self.tests_taken += 1;
            self.last_test_score = test.score;
            self.test_insights = test.insights.clone();
            self.history.push(TestHistoryEntry {
                date: test.taken_at.format("%Y-%m-%d").to_string(),
                time: test.taken_at.format("%H:%M:%S").to_string(),
                score: test.score,
            });
        }
    }
}

/// Applies `delta` to the user's stored analytics and writes the full record back.
pub async fn update_analytics(
    store: &dyn Store,
    username: &str,
    delta: &AnalyticsDelta,
) -> Result<Analytics, AppError> {
    let mut user = store
        .get_user(username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User '{}' not found", username)))?;

    user.analytics.apply(delta);
    store.put_user(&user).await?;

    Ok(user.analytics)
}

const ANALYTICS_UNAVAILABLE: &str = "Your statistics could not be updated this time.";

/// Best-effort variant for the end of a user-visible action.
/// Returns the failure message, if any, for the response body.
pub async fn record(store: &dyn Store, username: &str, delta: &AnalyticsDelta) -> Option<String> {
    if delta.is_empty() {
        return None;
    }
    match update_analytics(store, username, delta).await {
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(username, error = %e, "Analytics update failed");
            Some(ANALYTICS_UNAVAILABLE.to_string())
        }
    }
}
