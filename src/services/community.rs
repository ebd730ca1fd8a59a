//! Community membership and flashcard sharing.
//!
//! Membership is the only permission: members may share into, view and prune
//! a community, and (under the default policy) delete it.

use chrono::Utc;

use crate::{
    config::DeletePolicy,
    error::AppError,
    models::{
        community::{Community, CreateCommunityRequest, NewCommunity, ShareFailure, ShareReport, ShareSource, SharedFlashcard},
        session::Flashcard,
    },
    store::Store,
};

/// Loads a community, failing with `NotFound` if it does not exist.
pub async fn find_community(store: &dyn Store, id: i64) -> Result<Community, AppError> {
    store
        .get_community(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Community {} not found", id)))
}

/// Loads a community `username` belongs to.
pub async fn require_member(store: &dyn Store, id: i64, username: &str) -> Result<Community, AppError> {
    let community = find_community(store, id).await?;
    let members = store.get_members(id).await?;
    if !members.iter().any(|m| m == username) {
        return Err(AppError::NotAMember(format!(
            "You are not a member of '{}'",
            community.name
        )));
    }
    Ok(community)
}

pub async fn create_community(
    store: &dyn Store,
    username: &str,
    req: CreateCommunityRequest,
) -> Result<Community, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Community name must not be blank".to_string()));
    }

    let community = store
        .create_community(NewCommunity {
            name: name.to_string(),
            description: req.description.trim().to_string(),
            created_by: username.to_string(),
        })
        .await?;

    tracing::info!(community_id = community.id, username, "Community created");
    Ok(community)
}

/// Communities `username` has not joined.
pub async fn available_communities(store: &dyn Store, username: &str) -> Result<Vec<Community>, AppError> {
    let mine: Vec<i64> = store
        .get_user_communities(username)
        .await?
        .iter()
        .map(|c| c.id)
        .collect();

    Ok(store
        .get_communities()
        .await?
        .into_iter()
        .filter(|c| !mine.contains(&c.id))
        .collect())
}

/// Joins a community. Joining twice is harmless; returns whether anything changed.
pub async fn join(store: &dyn Store, id: i64, username: &str) -> Result<bool, AppError> {
    find_community(store, id).await?;
    let added = store.add_member(id, username).await?;
    if added {
        tracing::info!(community_id = id, username, "Joined community");
    }
    Ok(added)
}

/// Leaves a community. Flashcards the user shared stay in it.
pub async fn leave(store: &dyn Store, id: i64, username: &str) -> Result<(), AppError> {
    require_member(store, id, username).await?;
    store.remove_member(id, username).await?;
    tracing::info!(community_id = id, username, "Left community");
    Ok(())
}

/// Deletes a community with everything in it.
pub async fn delete_community(
    store: &dyn Store,
    policy: DeletePolicy,
    id: i64,
    username: &str,
) -> Result<(), AppError> {
    let community = require_member(store, id, username).await?;
    if policy == DeletePolicy::CreatorOnly && community.created_by != username {
        return Err(AppError::Forbidden(format!(
            "Only {} can delete '{}'",
            community.created_by, community.name
        )));
    }

    store.delete_community(id).await?;
    tracing::info!(community_id = id, username, "Community deleted");
    Ok(())
}

/// Shared flashcards of a community, for members only.
pub async fn visible_flashcards(
    store: &dyn Store,
    id: i64,
    username: &str,
) -> Result<Vec<SharedFlashcard>, AppError> {
    require_member(store, id, username).await?;
    Ok(store.get_shared_flashcards(id).await?)
}

/// Removes one shared flashcard. Any member may do so.
pub async fn delete_shared(
    store: &dyn Store,
    id: i64,
    flashcard_id: i64,
    username: &str,
) -> Result<(), AppError> {
    require_member(store, id, username).await?;
    store.delete_shared_flashcard(id, flashcard_id).await?;
    Ok(())
}

/// Resolves what the user wants to share into a flashcard value.
pub async fn flashcard_for_share(
    store: &dyn Store,
    username: &str,
    source: &ShareSource,
) -> Result<Flashcard, AppError> {
    match source {
        ShareSource::Current => {
            let card = store
                .get_context(username)
                .await?
                .and_then(|ctx| ctx.card)
                .ok_or_else(|| AppError::BadRequest("There is no flashcard on screen".to_string()))?;
            let answer = card
                .answer
                .ok_or_else(|| AppError::BadRequest("Reveal the answer before sharing".to_string()))?;
            Ok(Flashcard {
                question: card.question,
                answer,
                timestamp: Utc::now(),
            })
        }
        ShareSource::Saved { session_id, index } => {
            let session = store
                .get_session(*session_id)
                .await?
                .filter(|s| s.username == username)
                .ok_or_else(|| AppError::NotFound(format!("Session {} not found", session_id)))?;
            session
                .flashcards
                .get(*index)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("Flashcard {} not found", index)))
        }
    }
}

/// Copies `flashcard` into each listed community.
///
/// Insertions are independent: one community failing does not stop or undo
/// the others. If none succeeds the first failure is returned as the error.
pub async fn share(
    store: &dyn Store,
    username: &str,
    community_ids: &[i64],
    flashcard: &Flashcard,
) -> Result<ShareReport, AppError> {
    let mut targets = community_ids.to_vec();
    targets.sort_unstable();
    targets.dedup();
    if targets.is_empty() {
        return Err(AppError::BadRequest("Pick at least one community".to_string()));
    }

    let mut report = ShareReport::default();
    let mut first_error = None;

    for community_id in targets {
        let attempt = async {
            require_member(store, community_id, username).await?;
            Ok::<_, AppError>(store.add_shared_flashcard(community_id, flashcard, username).await?)
        };
        match attempt.await {
            Ok(shared) => report.shared.push(shared),
            Err(e) => {
                tracing::warn!(community_id, username, error = %e, "Share failed");
                report.failed.push(ShareFailure {
                    community_id,
                    reason: e.to_string(),
                });
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) if !report.succeeded() => Err(e),
        _ => Ok(report),
    }
}
