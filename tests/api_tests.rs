// tests/api_tests.rs

mod common;

use std::sync::atomic::Ordering;

use common::spawn_app;
use serde_json::{Value, json};

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_fails_validation() {
    let app = spawn_app().await;

    // Username too short
    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "username": "yo", "password": "Str0ng!Pass" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);

    // Weak password (no special character, no uppercase)
    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "username": "someone", "password": "password123" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn duplicate_username_conflicts_and_bad_password_is_rejected() {
    let app = spawn_app().await;
    let (username, _) = app.signed_up_user().await;

    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "username": username, "password": "An0ther!Pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    let response = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "username": username, "password": "Wr0ng!Pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = spawn_app().await;

    let response = app.client.get(app.url("/api/sessions")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = app
        .client
        .get(app.url("/api/analytics"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn openapi_document_is_public() {
    let app = spawn_app().await;
    let response = app.client.get(app.url("/api/openapi.json")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let doc: Value = response.json().await.unwrap();
    assert!(doc["paths"]["/api/sessions/{id}/question"].is_object());
}

#[tokio::test]
async fn flashcard_workflow() {
    let app = spawn_app().await;
    let (_, token) = app.signed_up_user().await;
    let id = app.session_with_text(&token, "Water boils at 100C").await;

    // Question
    let response = app
        .post_json(&token, &format!("/api/sessions/{}/question", id), json!({ "topic": "boiling point" }))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let view: Value = response.json().await.unwrap();
    let question = view["card"]["question"].as_str().unwrap().to_string();
    assert!(!question.contains('<') && !question.contains('>'));
    assert_eq!(view["phase"], "question_pending");
    assert!(view["card"]["answer"].is_null());

    // Answer
    let view: Value = app
        .post_json(&token, &format!("/api/sessions/{}/answer", id), json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(view["phase"], "answer_revealed");
    let answer = view["card"]["answer"].as_str().unwrap();
    assert!(!answer.is_empty());
    assert!(!answer.contains("**Front**"));

    // Simplify stays revealed
    let view: Value = app
        .post_json(&token, &format!("/api/sessions/{}/simplify", id), json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(view["phase"], "answer_revealed");
    assert_eq!(view["card"]["answer"], "Simply put, it is hot.");

    // Save the card on screen
    let response = app
        .post_json(&token, &format!("/api/sessions/{}/flashcards", id), json!({}))
        .await;
    assert_eq!(response.status().as_u16(), 201);

    let (status, saved) = app
        .get_json(&token, &format!("/api/sessions/{}/flashcards", id))
        .await;
    assert_eq!(status, 200);
    assert_eq!(saved.as_array().unwrap().len(), 1);
    assert_eq!(saved[0]["question"], question.as_str());

    // Same topic again counts as a view, not a new generation
    app.post_json(&token, &format!("/api/sessions/{}/question", id), json!({ "topic": "boiling point" }))
        .await;

    let (_, analytics) = app.get_json(&token, "/api/analytics").await;
    assert_eq!(analytics["documents_ingested"], 1);
    assert_eq!(analytics["flashcards_generated"], 1);
    assert_eq!(analytics["flashcards_viewed"], 1);
}

#[tokio::test]
async fn questions_need_text_first() {
    let app = spawn_app().await;
    let (_, token) = app.signed_up_user().await;

    let session: Value = app
        .post_json(&token, "/api/sessions", json!({ "name": "Empty" }))
        .await
        .json()
        .await
        .unwrap();
    let id = session["id"].as_i64().unwrap();

    let response = app
        .client
        .post(app.url(&format!("/api/sessions/{}/question", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Whitespace-only upload degrades to "no text"
    let response = app
        .client
        .post(app.url(&format!("/api/sessions/{}/document", id)))
        .bearer_auth(&token)
        .body("   \n  ")
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["outcome"], "empty");
    assert_eq!(body["has_text"], false);

    let (_, detail) = app.get_json(&token, &format!("/api/sessions/{}", id)).await;
    assert_eq!(detail["workflow"]["phase"], "no_text");
}

#[tokio::test]
async fn first_document_wins() {
    let app = spawn_app().await;
    let (_, token) = app.signed_up_user().await;
    let id = app.session_with_text(&token, "First document").await;

    let body: Value = app
        .client
        .post(app.url(&format!("/api/sessions/{}/document", id)))
        .bearer_auth(&token)
        .body("Second document")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["outcome"], "already_ingested");

    let (_, detail) = app.get_json(&token, &format!("/api/sessions/{}", id)).await;
    assert_eq!(detail["source_text"], "First document");

    let (_, analytics) = app.get_json(&token, "/api/analytics").await;
    assert_eq!(analytics["documents_ingested"], 1);
}

#[tokio::test]
async fn sessions_are_private() {
    let app = spawn_app().await;
    let (_, owner) = app.signed_up_user().await;
    let (_, other) = app.signed_up_user().await;
    let id = app.session_with_text(&owner, "Secret notes").await;

    let (status, _) = app.get_json(&other, &format!("/api/sessions/{}", id)).await;
    assert_eq!(status, 404);

    let (_, list) = app.get_json(&other, "/api/sessions").await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_flow_records_history() {
    let app = spawn_app().await;
    let (_, token) = app.signed_up_user().await;
    let id = app.session_with_text(&token, "Cells divide by mitosis").await;

    let response = app
        .post_json(&token, &format!("/api/sessions/{}/test", id), json!({}))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let test: Value = response.json().await.unwrap();
    let questions = test["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 10);
    assert!(questions[0].get("correct").is_none());

    // 7 right, 2 wrong, 1 unanswered
    let mut answers = serde_json::Map::new();
    for i in 0..7 {
        answers.insert(i.to_string(), json!("Beta"));
    }
    answers.insert("7".into(), json!("Alpha"));
    answers.insert("8".into(), json!("Gamma"));

    let response = app
        .post_json(
            &token,
            &format!("/api/sessions/{}/test/submit", id),
            json!({ "answers": answers }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let result: Value = response.json().await.unwrap();
    assert_eq!(result["score"], 7);
    assert_eq!(result["total"], 10);
    assert_eq!(result["wrong_items"].as_array().unwrap().len(), 3);
    assert_eq!(result["insights"], "You scored 7/10. Review the basics.");
    assert!(result["analytics_error"].is_null());

    let (_, analytics) = app.get_json(&token, "/api/analytics").await;
    assert_eq!(analytics["tests_taken"], 1);
    assert_eq!(analytics["last_test_score"], 7);
    assert_eq!(analytics["history"].as_array().unwrap().len(), 1);
    assert_eq!(analytics["history"][0]["score"], 7);

    // The test is consumed by its submission
    let response = app
        .post_json(
            &token,
            &format!("/api/sessions/{}/test/submit", id),
            json!({ "answers": {} }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn malformed_test_set_is_a_generation_failure() {
    let app = spawn_app().await;
    let (_, token) = app.signed_up_user().await;
    let id = app.session_with_text(&token, "Cells divide by mitosis").await;

    app.generator.malformed_tests.store(true, Ordering::SeqCst);
    let response = app
        .post_json(&token, &format!("/api/sessions/{}/test", id), json!({}))
        .await;
    assert_eq!(response.status().as_u16(), 502);

    let response = app
        .post_json(
            &token,
            &format!("/api/sessions/{}/test/submit", id),
            json!({ "answers": {} }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn switching_sessions_discards_the_test() {
    let app = spawn_app().await;
    let (_, token) = app.signed_up_user().await;
    let first = app.session_with_text(&token, "Cells divide by mitosis").await;
    let second = app.session_with_text(&token, "Atoms have nuclei").await;

    app.post_json(&token, &format!("/api/sessions/{}/test", first), json!({}))
        .await;
    let (status, _) = app.get_json(&token, &format!("/api/sessions/{}", second)).await;
    assert_eq!(status, 200);

    let response = app
        .post_json(
            &token,
            &format!("/api/sessions/{}/test/submit", first),
            json!({ "answers": { "0": "Beta" } }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
}
