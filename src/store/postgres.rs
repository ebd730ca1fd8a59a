//! PostgreSQL store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, postgres::PgPoolOptions, types::Json};

use crate::models::{
    community::{Community, NewCommunity, SharedFlashcard},
    context::StudyContext,
    session::{Flashcard, LearningSession},
    user::{Analytics, User},
};

use super::{Store, StoreError, StoreResult};

const CONNECT_ATTEMPTS: u32 = 5;

#[derive(sqlx::FromRow)]
struct UserRow {
    username: String,
    password: String,
    analytics: Json<Analytics>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            username: row.username,
            password: row.password,
            analytics: row.analytics.0,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: i64,
    username: String,
    name: String,
    source_text: Option<String>,
    flashcards: Json<Vec<Flashcard>>,
    created_at: DateTime<Utc>,
}

impl From<SessionRow> for LearningSession {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            name: row.name,
            source_text: row.source_text,
            flashcards: row.flashcards.0,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SharedFlashcardRow {
    id: i64,
    community_id: i64,
    flashcard: Json<Flashcard>,
    shared_by: String,
    shared_at: DateTime<Utc>,
}

impl From<SharedFlashcardRow> for SharedFlashcard {
    fn from(row: SharedFlashcardRow) -> Self {
        Self {
            id: row.id,
            community_id: row.community_id,
            flashcard: row.flashcard.0,
            shared_by: row.shared_by,
            shared_at: row.shared_at,
        }
    }
}

/// Maps a unique-key violation to `AlreadyExists`, anything else to `Database`.
fn conflict_or_database(err: sqlx::Error, entity_type: &'static str, key: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::already_exists(entity_type, key)
        }
        _ => StoreError::Database(err),
    }
}

/// Store backed by a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects with retry (the database container may still be starting) and
    /// applies pending migrations.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let mut attempt = 0;
        let pool = loop {
            match PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(3))
                .connect(database_url)
                .await
            {
                Ok(pool) => break pool,
                Err(e) => {
                    attempt += 1;
                    if attempt >= CONNECT_ATTEMPTS {
                        return Err(StoreError::Database(e));
                    }
                    tracing::warn!(
                        "Database not ready, retrying in 2s... (Attempt {})",
                        attempt
                    );
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        };
        tracing::info!("Database connected...");

        tracing::info!("Running migrations...");
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Migrations applied successfully.");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl Store for PgStore {
    // =========================================================================
    // User operations
    // =========================================================================

    async fn get_user(&self, username: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT username, password, analytics, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn create_user(&self, user: User) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, password, analytics)
            VALUES ($1, $2, $3)
            RETURNING username, password, analytics, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.password)
        .bind(Json(&user.analytics))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "User", &user.username))?;
        Ok(row.into())
    }

    async fn put_user(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET password = $2, analytics = $3 WHERE username = $1")
            .bind(&user.username)
            .bind(&user.password)
            .bind(Json(&user.analytics))
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("User", &user.username));
        }
        Ok(())
    }

    // =========================================================================
    // Learning session operations
    // =========================================================================

    async fn create_session(&self, username: &str, name: &str) -> StoreResult<LearningSession> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO sessions (username, name)
            VALUES ($1, $2)
            RETURNING id, username, name, source_text, flashcards, created_at
            "#,
        )
        .bind(username)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn get_session(&self, id: i64) -> StoreResult<Option<LearningSession>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, username, name, source_text, flashcards, created_at FROM sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(LearningSession::from))
    }

    async fn get_sessions_for_user(&self, username: &str) -> StoreResult<Vec<LearningSession>> {
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, username, name, source_text, flashcards, created_at
            FROM sessions
            WHERE username = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(LearningSession::from).collect())
    }

    async fn put_session(&self, session: &LearningSession) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE sessions SET name = $2, source_text = $3, flashcards = $4 WHERE id = $1",
        )
        .bind(session.id)
        .bind(&session.name)
        .bind(session.source_text.as_deref())
        .bind(Json(&session.flashcards))
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Session", session.id.to_string()));
        }
        Ok(())
    }

    async fn delete_session(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Session", id.to_string()));
        }
        Ok(())
    }

    // =========================================================================
    // Study context operations
    // =========================================================================

    async fn get_context(&self, username: &str) -> StoreResult<Option<StudyContext>> {
        let context = sqlx::query_scalar::<_, Json<StudyContext>>(
            "SELECT context FROM study_contexts WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(context.map(|c| c.0))
    }

    async fn put_context(&self, username: &str, context: &StudyContext) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO study_contexts (username, context)
            VALUES ($1, $2)
            ON CONFLICT (username) DO UPDATE SET
                context = EXCLUDED.context,
                updated_at = NOW()
            "#,
        )
        .bind(username)
        .bind(Json(context))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_context(&self, username: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM study_contexts WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Community operations
    // =========================================================================

    async fn get_communities(&self) -> StoreResult<Vec<Community>> {
        let communities = sqlx::query_as::<_, Community>(
            "SELECT id, name, description, created_by, created_at FROM communities ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(communities)
    }

    async fn get_community(&self, id: i64) -> StoreResult<Option<Community>> {
        let community = sqlx::query_as::<_, Community>(
            "SELECT id, name, description, created_by, created_at FROM communities WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(community)
    }

    async fn get_user_communities(&self, username: &str) -> StoreResult<Vec<Community>> {
        let communities = sqlx::query_as::<_, Community>(
            r#"
            SELECT c.id, c.name, c.description, c.created_by, c.created_at
            FROM communities c
            INNER JOIN community_members cm ON c.id = cm.community_id
            WHERE cm.username = $1
            ORDER BY c.id
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;
        Ok(communities)
    }

    async fn create_community(&self, community: NewCommunity) -> StoreResult<Community> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Community>(
            r#"
            INSERT INTO communities (name, description, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, created_by, created_at
            "#,
        )
        .bind(&community.name)
        .bind(&community.description)
        .bind(&community.created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_or_database(e, "Community", &community.name))?;

        sqlx::query("INSERT INTO community_members (community_id, username) VALUES ($1, $2)")
            .bind(created.id)
            .bind(&community.created_by)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn delete_community(&self, id: i64) -> StoreResult<()> {
        // Members and shared flashcards go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM communities WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Community", id.to_string()));
        }
        Ok(())
    }

    async fn get_members(&self, community_id: i64) -> StoreResult<Vec<String>> {
        let members = sqlx::query_scalar::<_, String>(
            "SELECT username FROM community_members WHERE community_id = $1 ORDER BY username",
        )
        .bind(community_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    async fn add_member(&self, community_id: i64, username: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO community_members (community_id, username)
            VALUES ($1, $2)
            ON CONFLICT (community_id, username) DO NOTHING
            "#,
        )
        .bind(community_id)
        .bind(username)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::not_found("Community", community_id.to_string())
            }
            _ => StoreError::Database(e),
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_member(&self, community_id: i64, username: &str) -> StoreResult<bool> {
        let result =
            sqlx::query("DELETE FROM community_members WHERE community_id = $1 AND username = $2")
                .bind(community_id)
                .bind(username)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Shared flashcard operations
    // =========================================================================

    async fn get_shared_flashcards(&self, community_id: i64) -> StoreResult<Vec<SharedFlashcard>> {
        let rows = sqlx::query_as::<_, SharedFlashcardRow>(
            r#"
            SELECT id, community_id, flashcard, shared_by, shared_at
            FROM community_flashcards
            WHERE community_id = $1
            ORDER BY id
            "#,
        )
        .bind(community_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(SharedFlashcard::from).collect())
    }

    async fn add_shared_flashcard(
        &self,
        community_id: i64,
        flashcard: &Flashcard,
        shared_by: &str,
    ) -> StoreResult<SharedFlashcard> {
        let row = sqlx::query_as::<_, SharedFlashcardRow>(
            r#"
            INSERT INTO community_flashcards (community_id, flashcard, shared_by)
            VALUES ($1, $2, $3)
            RETURNING id, community_id, flashcard, shared_by, shared_at
            "#,
        )
        .bind(community_id)
        .bind(Json(flashcard))
        .bind(shared_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::not_found("Community", community_id.to_string())
            }
            _ => StoreError::Database(e),
        })?;
        Ok(row.into())
    }

    async fn delete_shared_flashcard(&self, community_id: i64, id: i64) -> StoreResult<()> {
        let result =
            sqlx::query("DELETE FROM community_flashcards WHERE id = $1 AND community_id = $2")
                .bind(id)
                .bind(community_id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Shared flashcard", id.to_string()));
        }
        Ok(())
    }
}
