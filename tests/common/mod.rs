// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use serde_json::{Value, json};
use studydeck::{
    config::{Config, DeletePolicy, GenerationConfig},
    extract::PlainTextExtractor,
    generation::{Directive, GenerationResult, GenerationService, Generator},
    routes,
    state::AppState,
    store::{MemoryStore, PgStore, Store},
};

/// Canned generation service. Replies are deterministic and deliberately
/// carry markup so the sanitizer is exercised end to end.
#[derive(Default)]
pub struct FakeGenerator {
    counter: AtomicUsize,
    /// When set, test sets come back with a broken item.
    pub malformed_tests: AtomicBool,
}

#[async_trait]
impl GenerationService for FakeGenerator {
    async fn generate(&self, _text: &str, directive: Directive<'_>) -> GenerationResult<String> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(match directive {
            Directive::Question { topic, .. } => format!("<p>Question: What about {topic} (#{n})?</p>"),
            Directive::Answer { question } => format!("**Front** The answer to '{question}'."),
            Directive::Simplify { .. } => "<b>Simply put</b>, it is hot.".to_string(),
            Directive::Insights { score, total, .. } => format!("You scored {score}/{total}. Review the basics."),
        })
    }

    async fn generate_test_set(&self, _text: &str) -> GenerationResult<String> {
        let mut items: Vec<Value> = (0..10)
            .map(|i| {
                json!({
                    "question": format!("Question {i}?"),
                    "options": ["Alpha", "Beta", "Gamma", "Delta"],
                    "correct": "Beta",
                })
            })
            .collect();
        if self.malformed_tests.load(Ordering::SeqCst) {
            items[1]["options"] = json!(["Alpha", "Beta", "Gamma"]);
        }
        Ok(format!("Here is your test:\n{}\nGood luck!", Value::Array(items)))
    }
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub generator: Arc<FakeGenerator>,
}

/// Helper function to spawn the app on a random port for testing.
/// Runs on the in-memory store, so no database is needed.
pub async fn spawn_app() -> TestApp {
    spawn_app_with_policy(DeletePolicy::AnyMember).await
}

pub async fn spawn_app_with_policy(policy: DeletePolicy) -> TestApp {
    spawn_app_on(Arc::new(MemoryStore::new()), policy).await
}

/// Connects to the database in `DATABASE_URL`, applying migrations.
/// Returns `None` when the variable is unset so callers can skip.
pub async fn pg_store() -> Option<PgStore> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres test");
        return None;
    };
    Some(
        PgStore::connect(&database_url)
            .await
            .expect("Failed to connect to Postgres for testing"),
    )
}

/// Same as `spawn_app`, but backed by the database in `DATABASE_URL`.
pub async fn spawn_pg_app() -> Option<TestApp> {
    let store = pg_store().await?;
    Some(spawn_app_on(Arc::new(store), DeletePolicy::AnyMember).await)
}

pub async fn spawn_app_on(store: Arc<dyn Store>, policy: DeletePolicy) -> TestApp {
    let config = Config {
        database_url: None,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        port: 0,
        generation: GenerationConfig::default(),
        community_delete_policy: policy,
    };

    let fake = Arc::new(FakeGenerator::default());
    let state = AppState {
        config,
        store,
        generator: Generator::new(fake.clone(), 1500),
        extractor: Arc::new(PlainTextExtractor),
    };

    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        generator: fake,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Registers a fresh user and returns (username, bearer token).
    pub async fn signed_up_user(&self) -> (String, String) {
        let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
        let password = "Str0ng!Pass";

        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 201);

        let body: Value = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
            .json()
            .await
            .unwrap();

        (username, body["token"].as_str().unwrap().to_string())
    }

    /// Creates a session and uploads `text` as its document. Returns the session id.
    pub async fn session_with_text(&self, token: &str, text: &str) -> i64 {
        let session: Value = self
            .client
            .post(self.url("/api/sessions"))
            .bearer_auth(token)
            .json(&json!({ "name": "Physics" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let id = session["id"].as_i64().unwrap();

        let response = self
            .client
            .post(self.url(&format!("/api/sessions/{}/document", id)))
            .bearer_auth(token)
            .body(text.to_string())
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);

        id
    }

    pub async fn post_json(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get_json(&self, token: &str, path: &str) -> (u16, Value) {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request");
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }
}
