//! Store trait definition.

use async_trait::async_trait;

use crate::models::{
    community::{Community, NewCommunity, SharedFlashcard},
    context::StudyContext,
    session::{Flashcard, LearningSession},
    user::User,
};

use super::StoreResult;

/// Keyed storage for every record the application persists.
///
/// Each method is atomic on its own. `create_community` is the one compound
/// write: the community row and the creator's membership land together or not
/// at all.
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // User operations
    // =========================================================================

    /// Gets a user by username.
    async fn get_user(&self, username: &str) -> StoreResult<Option<User>>;

    /// Inserts a new user. Fails with `AlreadyExists` if the name is taken.
    async fn create_user(&self, user: User) -> StoreResult<User>;

    /// Replaces an existing user record, analytics included.
    async fn put_user(&self, user: &User) -> StoreResult<()>;

    // =========================================================================
    // Learning session operations
    // =========================================================================

    /// Creates an empty session for `username` and returns it with its id.
    async fn create_session(&self, username: &str, name: &str) -> StoreResult<LearningSession>;

    /// Gets a session by id.
    async fn get_session(&self, id: i64) -> StoreResult<Option<LearningSession>>;

    /// Lists the user's sessions, most recent first.
    async fn get_sessions_for_user(&self, username: &str) -> StoreResult<Vec<LearningSession>>;

    /// Replaces a session record.
    async fn put_session(&self, session: &LearningSession) -> StoreResult<()>;

    /// Deletes a session.
    async fn delete_session(&self, id: i64) -> StoreResult<()>;

    // =========================================================================
    // Study context operations
    // =========================================================================

    /// Gets the user's working state, if any.
    async fn get_context(&self, username: &str) -> StoreResult<Option<StudyContext>>;

    /// Replaces the user's working state.
    async fn put_context(&self, username: &str, context: &StudyContext) -> StoreResult<()>;

    /// Forgets the user's working state.
    async fn delete_context(&self, username: &str) -> StoreResult<()>;

    // =========================================================================
    // Community operations
    // =========================================================================

    /// Lists every community.
    async fn get_communities(&self) -> StoreResult<Vec<Community>>;

    /// Gets a community by id.
    async fn get_community(&self, id: i64) -> StoreResult<Option<Community>>;

    /// Lists the communities `username` belongs to.
    async fn get_user_communities(&self, username: &str) -> StoreResult<Vec<Community>>;

    /// Creates a community and makes its creator the first member.
    /// Fails with `AlreadyExists` if the name is taken.
    async fn create_community(&self, community: NewCommunity) -> StoreResult<Community>;

    /// Deletes a community together with its memberships and shared flashcards.
    async fn delete_community(&self, id: i64) -> StoreResult<()>;

    /// Lists member usernames. Unknown ids yield an empty list.
    async fn get_members(&self, community_id: i64) -> StoreResult<Vec<String>>;

    /// Adds a member. Returns `false` if they already were one.
    async fn add_member(&self, community_id: i64, username: &str) -> StoreResult<bool>;

    /// Removes a member. Returns `false` if they were not one.
    async fn remove_member(&self, community_id: i64, username: &str) -> StoreResult<bool>;

    // =========================================================================
    // Shared flashcard operations
    // =========================================================================

    /// Lists a community's shared flashcards in sharing order.
    async fn get_shared_flashcards(&self, community_id: i64) -> StoreResult<Vec<SharedFlashcard>>;

    /// Stores a copy of `flashcard` in the community.
    async fn add_shared_flashcard(
        &self,
        community_id: i64,
        flashcard: &Flashcard,
        shared_by: &str,
    ) -> StoreResult<SharedFlashcard>;

    /// Deletes one shared flashcard of a community.
    async fn delete_shared_flashcard(&self, community_id: i64, id: i64) -> StoreResult<()>;
}
