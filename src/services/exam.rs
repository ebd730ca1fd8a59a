//! Multiple-choice test engine: generation, scoring and result recording.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    config::{OPTIONS_PER_QUESTION, TEST_QUESTION_COUNT},
    error::AppError,
    generation::{Directive, GenerationError, Generator},
    models::{
        context::{PendingTest, StudyContext},
        question::{Question, ReviewItem, TestSubmission, WrongItem},
        session::LearningSession,
    },
    utils::sanitize::sanitize,
};

use super::analytics::{AnalyticsDelta, TestRecord};

const FALLBACK_INSIGHTS: &str = "Insights are unavailable right now. Review the questions you missed.";

/// Item shape as the model writes it. Every field is optional here so a
/// missing key is a validation failure rather than a parse error.
#[derive(Debug, Deserialize)]
struct RawQuestion {
    question: Option<String>,
    options: Option<Vec<String>>,
    correct: Option<String>,
}

/// The substring between the first `[` and the last `]`, inclusive.
pub fn extract_payload(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    (start < end).then(|| &raw[start..=end])
}

fn validate(raw: RawQuestion) -> Option<Question> {
    let question = raw.question.filter(|q| !sanitize(q).is_empty())?;
    let options = raw.options?;
    if options.len() != OPTIONS_PER_QUESTION {
        return None;
    }
    // Options must stay non-empty and distinct once cleaned for display.
    let cleaned: HashSet<String> = options.iter().map(|o| sanitize(o)).collect();
    if cleaned.len() != OPTIONS_PER_QUESTION || cleaned.contains("") {
        return None;
    }
    let correct = raw.correct?;
    if !cleaned.contains(&sanitize(&correct)) {
        return None;
    }
    Some(Question {
        question,
        options,
        correct,
    })
}

/// Parses a raw test payload. Any structural problem yields an empty list;
/// a partially valid set is never returned.
pub fn parse_test_set(raw: &str) -> Vec<Question> {
    let Some(payload) = extract_payload(raw) else {
        tracing::warn!("Test payload has no bracketed array");
        return Vec::new();
    };

    let items: Vec<RawQuestion> = match serde_json::from_str(payload) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(error = %e, "Test payload is not a JSON array of items");
            return Vec::new();
        }
    };

    if items.len() != TEST_QUESTION_COUNT {
        tracing::warn!(count = items.len(), "Test payload has the wrong number of items");
        return Vec::new();
    }

    let mut questions = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match validate(item) {
            Some(question) => questions.push(question),
            None => {
                tracing::warn!(index, "Test payload item is malformed");
                return Vec::new();
            }
        }
    }
    questions
}

/// Generates a fresh test set from `text`.
pub async fn generate_test(generator: &Generator, text: &str) -> Result<Vec<Question>, GenerationError> {
    let raw = generator.test_set(text).await?;
    Ok(parse_test_set(&raw))
}

/// Replaces the context's pending test with a newly generated one.
///
/// The previous test is discarded before generation, so a failure leaves no
/// test pending at all.
pub async fn start_test(
    generator: &Generator,
    session: &LearningSession,
    ctx: &mut StudyContext,
) -> Result<Vec<Question>, AppError> {
    let text = session
        .usable_text()
        .ok_or_else(|| AppError::BadRequest("Upload a document with readable text first".to_string()))?;

    ctx.test = None;
    let questions = generate_test(generator, text).await?;
    if questions.is_empty() {
        return Err(GenerationError::Malformed("test set did not have the expected shape".to_string()).into());
    }

    tracing::info!(session_id = session.id, "Test generated");
    ctx.test = Some(PendingTest {
        questions: questions.clone(),
        generated_at: Utc::now(),
    });
    Ok(questions)
}

/// Scores `answers` against `questions`. Unanswered or out-of-range indices
/// never fail; missing ones count as wrong.
pub fn score_test(questions: &[Question], answers: &HashMap<usize, String>) -> TestSubmission {
    let mut score = 0;
    let mut wrong_items = Vec::new();
    let mut review = Vec::with_capacity(questions.len());

    for (index, question) in questions.iter().enumerate() {
        let given = answers.get(&index).map(|a| sanitize(a)).filter(|a| !a.is_empty());
        let correct = sanitize(&question.correct);
        let is_correct = given.as_deref() == Some(correct.as_str());

        if is_correct {
            score += 1;
        } else {
            wrong_items.push(WrongItem {
                question: sanitize(&question.question),
                given_answer: given.clone(),
            });
        }

        review.push(ReviewItem {
            question: sanitize(&question.question),
            given_answer: given,
            correct_answer: correct,
            is_correct,
        });
    }

    TestSubmission {
        score,
        total: questions.len() as u32,
        wrong_items,
        review,
    }
}

/// Builds the analytics record for a scored test. Insight generation failing
/// does not lose the result; a fallback text is recorded instead.
pub async fn record_result(
    generator: &Generator,
    source: &str,
    submission: &TestSubmission,
    taken_at: DateTime<Utc>,
) -> AnalyticsDelta {
    let directive = Directive::Insights {
        score: submission.score,
        total: submission.total,
        wrong_items: &submission.wrong_items,
    };
    let insights = match generator.text(source, directive).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "Insight generation failed, recording fallback");
            FALLBACK_INSIGHTS.to_string()
        }
    };

    AnalyticsDelta::test_taken(TestRecord {
        score: submission.score,
        insights,
        taken_at,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{
        generation::testing::ScriptedService,
        models::{question::PublicQuestion, user::Analytics},
    };

    fn item(n: usize) -> serde_json::Value {
        json!({
            "question": format!("Question {n}?"),
            "options": ["A", "B", "C", "D"],
            "correct": "B",
        })
    }

    fn payload(items: Vec<serde_json::Value>) -> String {
        serde_json::Value::Array(items).to_string()
    }

    fn ten_items() -> Vec<serde_json::Value> {
        (0..10).map(item).collect()
    }

    fn session() -> LearningSession {
        LearningSession {
            id: 3,
            username: "ada".into(),
            name: "Biology".into(),
            source_text: Some("Cells divide by mitosis".into()),
            flashcards: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn payload_is_cut_out_of_surrounding_prose() {
        let raw = format!("Sure! Here is your test:\n{}\nGood luck [really].", payload(ten_items()));
        assert_eq!(extract_payload("no brackets"), None);
        assert_eq!(extract_payload("] backwards ["), None);
        // The last bracket belongs to the prose, so this one does not parse.
        assert!(parse_test_set(&raw).is_empty());

        let raw = format!("Sure! Here is your test:\n{}\nGood luck.", payload(ten_items()));
        assert_eq!(parse_test_set(&raw).len(), 10);
    }

    #[test]
    fn one_malformed_item_discards_the_whole_set() {
        let mut items = ten_items();
        items[1] = json!({
            "question": "Short?",
            "options": ["A", "B", "C"],
            "correct": "A",
        });
        assert!(parse_test_set(&payload(items)).is_empty());
    }

    #[test]
    fn missing_fields_and_wrong_counts_are_rejected() {
        let mut items = ten_items();
        items[4] = json!({ "question": "No options?", "correct": "A" });
        assert!(parse_test_set(&payload(items)).is_empty());

        let mut items = ten_items();
        items[0]["correct"] = json!("Z");
        assert!(parse_test_set(&payload(items)).is_empty());

        let mut items = ten_items();
        items.pop();
        assert!(parse_test_set(&payload(items)).is_empty());
    }

    #[test]
    fn options_that_clean_to_the_same_text_are_rejected() {
        let mut items = ten_items();
        items[2]["options"] = json!(["A", "A", "B", "C"]);
        assert!(parse_test_set(&payload(items)).is_empty());

        let mut items = ten_items();
        items[5]["options"] = json!(["A", "<b>A</b>", "B", "C"]);
        assert!(parse_test_set(&payload(items)).is_empty());
    }

    #[test]
    fn a_displayed_option_scores_as_correct_however_deeply_escaped() {
        let mut correct = "&lt;b&gt;Mitosis&lt;/b&gt;".to_string();
        for _ in 0..20 {
            correct = correct.replace('&', "&amp;");
        }
        let question = Question {
            question: "How do cells divide?".into(),
            options: vec![correct.clone(), "Meiosis".into(), "Fission".into(), "Budding".into()],
            correct,
        };
        let shown = PublicQuestion::new(0, &question).options[0].clone();
        assert_eq!(shown, "Mitosis");

        let answers = HashMap::from([(0, shown)]);
        assert_eq!(score_test(&[question], &answers).score, 1);
    }

    #[test]
    fn seven_of_ten() {
        let questions = parse_test_set(&payload(ten_items()));
        let mut answers: HashMap<usize, String> = (0..7).map(|i| (i, "B".to_string())).collect();
        answers.insert(7, "A".into());
        answers.insert(8, "<b>C</b>".into());

        let submission = score_test(&questions, &answers);

        assert_eq!(submission.score, 7);
        assert_eq!(submission.total, 10);
        assert_eq!(submission.wrong_items.len(), 3);
        assert_eq!(submission.wrong_items[2].given_answer, None);
        assert_eq!(submission.review.iter().filter(|r| r.is_correct).count(), 7);
    }

    #[test]
    fn blank_answers_score_zero() {
        let questions = parse_test_set(&payload(ten_items()));
        let submission = score_test(&questions, &HashMap::new());
        assert_eq!(submission.score, 0);
        assert_eq!(submission.wrong_items.len(), 10);
    }

    #[test]
    fn comparison_uses_the_same_cleaning_on_both_sides() {
        let questions = vec![Question {
            question: "Temperature?".into(),
            options: vec!["100&#176;C".into(), "0C".into(), "50C".into(), "10C".into()],
            correct: "<i>100&#176;C</i>".into(),
        }];
        let answers = HashMap::from([(0, "100°C".to_string())]);
        assert_eq!(score_test(&questions, &answers).score, 1);
    }

    #[tokio::test]
    async fn regenerating_discards_the_previous_test_even_on_failure() {
        let service = Arc::new(
            ScriptedService::new()
                .reply(&payload(ten_items()))
                .reply("[not json]"),
        );
        let generator = Generator::new(service, 1500);
        let session = session();
        let mut ctx = StudyContext::new(session.id);

        start_test(&generator, &session, &mut ctx).await.unwrap();
        assert!(ctx.test.is_some());

        let err = start_test(&generator, &session, &mut ctx).await.unwrap_err();
        assert!(matches!(err, AppError::GenerationFailure(_)));
        assert!(ctx.test.is_none());
    }

    #[tokio::test]
    async fn result_appends_one_history_entry() {
        let service = Arc::new(ScriptedService::new().reply("Review mitosis."));
        let generator = Generator::new(service, 1500);
        let questions = parse_test_set(&payload(ten_items()));
        let answers: HashMap<usize, String> = (0..7).map(|i| (i, "B".to_string())).collect();
        let submission = score_test(&questions, &answers);

        let delta = record_result(&generator, "text", &submission, Utc::now()).await;
        let mut analytics = Analytics::default();
        analytics.apply(&delta);

        assert_eq!(analytics.history.len(), 1);
        assert_eq!(analytics.history[0].score, 7);
        assert_eq!(analytics.last_test_score, 7);
        assert_eq!(analytics.tests_taken, 1);
        assert_eq!(analytics.test_insights, "Review mitosis.");
    }

    #[tokio::test]
    async fn insight_failure_still_records_the_score() {
        let service = Arc::new(ScriptedService::new().fail());
        let generator = Generator::new(service, 1500);
        let submission = score_test(&[], &HashMap::new());

        let delta = record_result(&generator, "text", &submission, Utc::now()).await;
        let record = delta.test.unwrap();
        assert_eq!(record.score, 0);
        assert_eq!(record.insights, FALLBACK_INSIGHTS);
    }
}
