// src/models/user.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// A registered learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique username; the key every other record points at.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub analytics: Analytics,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl User {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password_hash.into(),
            analytics: Analytics::default(),
            created_at: chrono::Utc::now(),
        }
    }
}

/// Per-user learning counters and test history.
///
/// Stored as one document and always replaced wholesale. Missing fields in an
/// older record fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Analytics {
    #[serde(alias = "pdfs_uploaded")]
    pub documents_ingested: u64,
    pub flashcards_generated: u64,
    pub flashcards_viewed: u64,
    pub tests_taken: u64,
    pub last_test_score: u32,
    pub test_insights: String,
    #[serde(alias = "test_history")]
    pub history: Vec<TestHistoryEntry>,
}

impl Default for Analytics {
    fn default() -> Self {
        Self {
            documents_ingested: 0,
            flashcards_generated: 0,
            flashcards_viewed: 0,
            tests_taken: 0,
            last_test_score: 0,
            test_insights: "No tests taken yet".to_string(),
            history: Vec::new(),
        }
    }
}

/// One point of the score time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TestHistoryEntry {
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM:SS`
    pub time: String,
    pub score: u32,
}

/// Public view of a user.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserProfile {
    pub username: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            created_at: user.created_at,
        }
    }
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(
        length(max = 128, message = "Password must be at most 128 characters."),
        custom(function = validate_password_strength)
    )]
    pub password: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

static UPPER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Z]").expect("valid pattern"));
static LOWER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z]").expect("valid pattern"));
static DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d").expect("valid pattern"));
static SPECIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[!@#$%^&*(),.?":{}|<>]"#).expect("valid pattern"));

/// Password rule applied before an account is accepted.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let rule = |code: &'static str, message: &'static str| {
        let mut err = ValidationError::new(code);
        err.message = Some(message.into());
        Err(err)
    };

    if password.chars().count() < 8 {
        return rule("password_too_short", "Password must be at least 8 characters long.");
    }
    if !UPPER.is_match(password) {
        return rule(
            "password_no_uppercase",
            "Password must contain at least one uppercase letter.",
        );
    }
    if !LOWER.is_match(password) {
        return rule(
            "password_no_lowercase",
            "Password must contain at least one lowercase letter.",
        );
    }
    if !DIGIT.is_match(password) {
        return rule("password_no_digit", "Password must contain at least one digit.");
    }
    if !SPECIAL.is_match(password) {
        return rule(
            "password_no_special",
            "Password must contain at least one special character (!@#$%^&* etc.).",
        );
    }
    Ok(())
}
