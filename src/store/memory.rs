//! In-memory store for tests and database-less runs.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::models::{
    community::{Community, NewCommunity, SharedFlashcard},
    context::StudyContext,
    session::{Flashcard, LearningSession},
    user::User,
};

use super::{Store, StoreError, StoreResult};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<String, User>,
    sessions: BTreeMap<i64, LearningSession>,
    contexts: HashMap<String, StudyContext>,
    communities: BTreeMap<i64, Community>,
    members: HashMap<i64, BTreeSet<String>>,
    shared: BTreeMap<i64, SharedFlashcard>,
    next_session_id: i64,
    next_community_id: i64,
    next_shared_id: i64,
}

impl MemoryState {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

/// In-memory store. One lock guards all tables, so compound writes are atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    // =========================================================================
    // User operations
    // =========================================================================

    async fn get_user(&self, username: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(username).cloned())
    }

    async fn create_user(&self, user: User) -> StoreResult<User> {
        let mut state = self.state.write().await;
        if state.users.contains_key(&user.username) {
            return Err(StoreError::already_exists("User", &user.username));
        }
        state.users.insert(user.username.clone(), user.clone());
        Ok(user)
    }

    async fn put_user(&self, user: &User) -> StoreResult<()> {
        let mut state = self.state.write().await;
        match state.users.get_mut(&user.username) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(StoreError::not_found("User", &user.username)),
        }
    }

    // =========================================================================
    // Learning session operations
    // =========================================================================

    async fn create_session(&self, username: &str, name: &str) -> StoreResult<LearningSession> {
        let mut state = self.state.write().await;
        let id = MemoryState::next_id(&mut state.next_session_id);
        let session = LearningSession {
            id,
            username: username.to_string(),
            name: name.to_string(),
            source_text: None,
            flashcards: Vec::new(),
            created_at: Utc::now(),
        };
        state.sessions.insert(id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: i64) -> StoreResult<Option<LearningSession>> {
        let state = self.state.read().await;
        Ok(state.sessions.get(&id).cloned())
    }

    async fn get_sessions_for_user(&self, username: &str) -> StoreResult<Vec<LearningSession>> {
        let state = self.state.read().await;
        let mut sessions: Vec<LearningSession> = state
            .sessions
            .values()
            .filter(|s| s.username == username)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(sessions)
    }

    async fn put_session(&self, session: &LearningSession) -> StoreResult<()> {
        let mut state = self.state.write().await;
        match state.sessions.get_mut(&session.id) {
            Some(existing) => {
                *existing = session.clone();
                Ok(())
            }
            None => Err(StoreError::not_found("Session", session.id.to_string())),
        }
    }

    async fn delete_session(&self, id: i64) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.sessions.remove(&id).is_none() {
            return Err(StoreError::not_found("Session", id.to_string()));
        }
        Ok(())
    }

    // =========================================================================
    // Study context operations
    // =========================================================================

    async fn get_context(&self, username: &str) -> StoreResult<Option<StudyContext>> {
        let state = self.state.read().await;
        Ok(state.contexts.get(username).cloned())
    }

    async fn put_context(&self, username: &str, context: &StudyContext) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.contexts.insert(username.to_string(), context.clone());
        Ok(())
    }

    async fn delete_context(&self, username: &str) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.contexts.remove(username);
        Ok(())
    }

    // =========================================================================
    // Community operations
    // =========================================================================

    async fn get_communities(&self) -> StoreResult<Vec<Community>> {
        let state = self.state.read().await;
        Ok(state.communities.values().cloned().collect())
    }

    async fn get_community(&self, id: i64) -> StoreResult<Option<Community>> {
        let state = self.state.read().await;
        Ok(state.communities.get(&id).cloned())
    }

    async fn get_user_communities(&self, username: &str) -> StoreResult<Vec<Community>> {
        let state = self.state.read().await;
        Ok(state
            .communities
            .values()
            .filter(|c| {
                state
                    .members
                    .get(&c.id)
                    .is_some_and(|members| members.contains(username))
            })
            .cloned()
            .collect())
    }

    async fn create_community(&self, community: NewCommunity) -> StoreResult<Community> {
        let mut state = self.state.write().await;
        if state.communities.values().any(|c| c.name == community.name) {
            return Err(StoreError::already_exists("Community", &community.name));
        }
        let id = MemoryState::next_id(&mut state.next_community_id);
        let created = Community {
            id,
            name: community.name,
            description: community.description,
            created_by: community.created_by.clone(),
            created_at: Utc::now(),
        };
        state.communities.insert(id, created.clone());
        state
            .members
            .insert(id, BTreeSet::from([community.created_by]));
        Ok(created)
    }

    async fn delete_community(&self, id: i64) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.communities.remove(&id).is_none() {
            return Err(StoreError::not_found("Community", id.to_string()));
        }
        state.members.remove(&id);
        state.shared.retain(|_, card| card.community_id != id);
        Ok(())
    }

    async fn get_members(&self, community_id: i64) -> StoreResult<Vec<String>> {
        let state = self.state.read().await;
        Ok(state
            .members
            .get(&community_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn add_member(&self, community_id: i64, username: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if !state.communities.contains_key(&community_id) {
            return Err(StoreError::not_found("Community", community_id.to_string()));
        }
        Ok(state
            .members
            .entry(community_id)
            .or_default()
            .insert(username.to_string()))
    }

    async fn remove_member(&self, community_id: i64, username: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(state
            .members
            .get_mut(&community_id)
            .is_some_and(|members| members.remove(username)))
    }

    // =========================================================================
    // Shared flashcard operations
    // =========================================================================

    async fn get_shared_flashcards(&self, community_id: i64) -> StoreResult<Vec<SharedFlashcard>> {
        let state = self.state.read().await;
        Ok(state
            .shared
            .values()
            .filter(|card| card.community_id == community_id)
            .cloned()
            .collect())
    }

    async fn add_shared_flashcard(
        &self,
        community_id: i64,
        flashcard: &Flashcard,
        shared_by: &str,
    ) -> StoreResult<SharedFlashcard> {
        let mut state = self.state.write().await;
        if !state.communities.contains_key(&community_id) {
            return Err(StoreError::not_found("Community", community_id.to_string()));
        }
        let id = MemoryState::next_id(&mut state.next_shared_id);
        let shared = SharedFlashcard {
            id,
            community_id,
            flashcard: flashcard.clone(),
            shared_by: shared_by.to_string(),
            shared_at: Utc::now(),
        };
        state.shared.insert(id, shared.clone());
        Ok(shared)
    }

    async fn delete_shared_flashcard(&self, community_id: i64, id: i64) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let belongs = state
            .shared
            .get(&id)
            .is_some_and(|card| card.community_id == community_id);
        if !belongs {
            return Err(StoreError::not_found("Shared flashcard", id.to_string()));
        }
        state.shared.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(question: &str) -> Flashcard {
        Flashcard {
            question: question.to_string(),
            answer: "answer".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_usernames_are_rejected() {
        let store = MemoryStore::new();
        store.create_user(User::new("ada", "hash")).await.unwrap();
        let err = store.create_user(User::new("ada", "hash")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn sessions_are_listed_most_recent_first() {
        let store = MemoryStore::new();
        let first = store.create_session("ada", "first").await.unwrap();
        let second = store.create_session("ada", "second").await.unwrap();
        store.create_session("bob", "other").await.unwrap();

        let listed = store.get_sessions_for_user("ada").await.unwrap();
        let ids: Vec<i64> = listed.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn creating_a_community_adds_the_creator() {
        let store = MemoryStore::new();
        let community = store
            .create_community(NewCommunity {
                name: "Biology".into(),
                description: String::new(),
                created_by: "ada".into(),
            })
            .await
            .unwrap();
        assert_eq!(store.get_members(community.id).await.unwrap(), vec!["ada"]);
    }

    #[tokio::test]
    async fn deleting_a_community_cascades() {
        let store = MemoryStore::new();
        let community = store
            .create_community(NewCommunity {
                name: "Physics".into(),
                description: String::new(),
                created_by: "ada".into(),
            })
            .await
            .unwrap();
        store.add_member(community.id, "bob").await.unwrap();
        store
            .add_shared_flashcard(community.id, &card("q"), "ada")
            .await
            .unwrap();

        store.delete_community(community.id).await.unwrap();

        assert!(store.get_members(community.id).await.unwrap().is_empty());
        assert!(store.get_shared_flashcards(community.id).await.unwrap().is_empty());
        assert!(store.get_user_communities("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn shared_flashcards_are_scoped_to_their_community() {
        let store = MemoryStore::new();
        let a = store
            .create_community(NewCommunity {
                name: "A".into(),
                description: String::new(),
                created_by: "ada".into(),
            })
            .await
            .unwrap();
        let b = store
            .create_community(NewCommunity {
                name: "B".into(),
                description: String::new(),
                created_by: "ada".into(),
            })
            .await
            .unwrap();
        let in_b = store.add_shared_flashcard(b.id, &card("q"), "ada").await.unwrap();

        assert!(store.delete_shared_flashcard(a.id, in_b.id).await.is_err());
        assert_eq!(store.get_shared_flashcards(b.id).await.unwrap().len(), 1);
    }
}
