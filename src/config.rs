// src/config.rs

use std::env;

use dotenvy::dotenv;
use url::Url;

/// Number of questions in a generated test.
pub const TEST_QUESTION_COUNT: usize = 10;

/// Every test question carries exactly this many options.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// Topic used when the user leaves the topic field blank.
pub const DEFAULT_TOPIC: &str = "general concepts";

const DEFAULT_GENERATION_API_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_GENERATION_MODEL: &str = "gemma2-9b-it";

/// Who may delete a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Any current member may delete the community.
    AnyMember,
    /// Only the member recorded as `created_by` may delete it.
    CreatorOnly,
}

impl DeletePolicy {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "creator" | "creator_only" => DeletePolicy::CreatorOnly,
            _ => DeletePolicy::AnyMember,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. When absent the server runs on the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    pub generation: GenerationConfig,
    pub community_delete_policy: DeletePolicy,
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Base URL of an OpenAI-compatible chat completions API.
    pub api_url: Url,
    pub api_key: String,
    pub model: String,
    /// Maximum number of source-text characters sent with any generation call.
    pub max_source_chars: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse(DEFAULT_GENERATION_API_URL).expect("default URL is valid"),
            api_key: String::new(),
            model: DEFAULT_GENERATION_MODEL.to_string(),
            max_source_chars: 1500,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let defaults = GenerationConfig::default();

        let api_url = match env::var("GENERATION_API_URL") {
            Ok(raw) => Url::parse(&raw).expect("GENERATION_API_URL must be a valid URL"),
            Err(_) => defaults.api_url,
        };

        let generation = GenerationConfig {
            api_url,
            api_key: env::var("GENERATION_API_KEY").unwrap_or_default(),
            model: env::var("GENERATION_MODEL").unwrap_or(defaults.model),
            max_source_chars: env::var("MAX_SOURCE_CHARS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_source_chars),
        };

        let community_delete_policy = env::var("COMMUNITY_DELETE_POLICY")
            .map(|v| DeletePolicy::parse(&v))
            .unwrap_or(DeletePolicy::AnyMember);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port,
            generation,
            community_delete_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_policy_defaults_to_any_member() {
        assert_eq!(DeletePolicy::parse("member"), DeletePolicy::AnyMember);
        assert_eq!(DeletePolicy::parse("garbage"), DeletePolicy::AnyMember);
        assert_eq!(DeletePolicy::parse(" Creator "), DeletePolicy::CreatorOnly);
    }
}
