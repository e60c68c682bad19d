//! Unit tests for ProfileRepository.
//!
//! Covers out-of-order field setters, wizard state, and missing-field checks.

use crate::models::SetupState;
use crate::profile_repo::ProfileRepository;
use crate::sqlite_pool::SqlitePoolManager;

async fn repo() -> ProfileRepository {
    let pool = SqlitePoolManager::new("sqlite::memory:")
        .await
        .expect("Failed to create pool");
    ProfileRepository::new(pool)
        .await
        .expect("Failed to create repository")
}

#[tokio::test]
async fn test_setters_upsert_in_any_order() {
    let repo = repo().await;

    // No profile row exists yet; the first setter must create it.
    repo.set_source(1, "-100111").await.expect("Failed to set");
    repo.set_api_id(1, 12345).await.expect("Failed to set");
    repo.set_api_hash(1, "0123456789abcdef0123456789abcdef")
        .await
        .expect("Failed to set");
    repo.set_destination(1, "@mirror").await.expect("Failed to set");

    let profile = repo
        .load(1)
        .await
        .expect("Failed to load")
        .expect("Missing profile");
    assert_eq!(profile.api_id, Some(12345));
    assert_eq!(profile.source.as_deref(), Some("-100111"));
    assert_eq!(profile.destination.as_deref(), Some("@mirror"));
    assert!(profile.session_string.is_none());
    assert!(profile.is_complete());
}

#[tokio::test]
async fn test_missing_fields_reported() {
    let repo = repo().await;

    repo.set_api_id(1, 12345).await.expect("Failed to set");

    let profile = repo
        .load(1)
        .await
        .expect("Failed to load")
        .expect("Missing profile");
    let missing = profile.missing_fields();
    assert_eq!(missing, vec!["API hash", "source channel", "destination channel"]);
    assert!(!profile.is_complete());
}

#[tokio::test]
async fn test_setup_state_roundtrip_and_clear() {
    let repo = repo().await;

    repo.set_setup_state(1, Some(SetupState::ApiId))
        .await
        .expect("Failed to set state");
    let profile = repo
        .load(1)
        .await
        .expect("Failed to load")
        .expect("Missing profile");
    assert_eq!(profile.setup_state, Some(SetupState::ApiId));

    repo.set_setup_state(1, Some(SetupState::Destination))
        .await
        .expect("Failed to set state");
    let profile = repo
        .load(1)
        .await
        .expect("Failed to load")
        .expect("Missing profile");
    assert_eq!(profile.setup_state, Some(SetupState::Destination));

    repo.set_setup_state(1, None)
        .await
        .expect("Failed to clear state");
    let profile = repo
        .load(1)
        .await
        .expect("Failed to load")
        .expect("Missing profile");
    assert!(profile.setup_state.is_none());
}

#[tokio::test]
async fn test_load_missing_returns_none() {
    let repo = repo().await;
    assert!(repo.load(7).await.expect("Failed to load").is_none());
}
