//! Wizard walk-through: the setup handler collects a full profile one
//! message at a time, driven through the handler chain with a mock bot.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use autoforward_bot::{HandlerChain, SetupHandler};
use chrono::Utc;
use forward_core::{Bot, Chat, HandlerResponse, IncomingMessage, Result as CoreResult, User};
use storage::{ProfileRepository, SetupState, SqlitePoolManager};

#[derive(Default)]
struct MockBot {
    sent: Mutex<Vec<String>>,
}

impl MockBot {
    fn new() -> Self {
        Self::default()
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().expect("sent lock").clone()
    }
}

#[async_trait]
impl Bot for MockBot {
    async fn send_message(&self, _chat: &Chat, text: &str) -> CoreResult<()> {
        self.sent.lock().expect("sent lock").push(text.to_string());
        Ok(())
    }

    async fn reply_to(&self, _message: &IncomingMessage, text: &str) -> CoreResult<()> {
        self.sent.lock().expect("sent lock").push(text.to_string());
        Ok(())
    }

    async fn edit_message(&self, _chat: &Chat, _message_id: &str, text: &str) -> CoreResult<()> {
        self.sent.lock().expect("sent lock").push(text.to_string());
        Ok(())
    }

    async fn send_message_and_return_id(&self, _chat: &Chat, text: &str) -> CoreResult<String> {
        self.sent.lock().expect("sent lock").push(text.to_string());
        Ok("1".to_string())
    }
}

fn msg(user_id: i64, text: &str) -> IncomingMessage {
    IncomingMessage {
        id: "m1".to_string(),
        user: User {
            id: user_id,
            username: None,
            first_name: Some("Test".to_string()),
            last_name: None,
        },
        chat: Chat {
            id: user_id,
            chat_type: "Private".to_string(),
        },
        content: text.to_string(),
        created_at: Utc::now(),
    }
}

async fn setup() -> (HandlerChain, ProfileRepository, Arc<MockBot>) {
    let pool = SqlitePoolManager::new("sqlite::memory:")
        .await
        .expect("Failed to create pool");
    let profiles = ProfileRepository::new(pool)
        .await
        .expect("Failed to create repository");
    let bot = Arc::new(MockBot::new());
    let chain = HandlerChain::new().add_handler(Arc::new(SetupHandler::new(
        bot.clone(),
        profiles.clone(),
    )));
    (chain, profiles, bot)
}

#[tokio::test]
async fn test_wizard_collects_full_profile() {
    let (chain, profiles, bot) = setup().await;
    let api_hash = "0123456789abcdef0123456789abcdef";

    for text in ["/setup", "12345", api_hash, "session-string-value", "-100111", "@mirror"] {
        chain.handle(&msg(1, text)).await.expect("Chain failed");
    }

    let profile = profiles
        .load(1)
        .await
        .expect("Failed to load")
        .expect("Missing profile");
    assert_eq!(profile.api_id, Some(12345));
    assert_eq!(profile.api_hash.as_deref(), Some(api_hash));
    assert_eq!(profile.session_string.as_deref(), Some("session-string-value"));
    assert_eq!(profile.source.as_deref(), Some("-100111"));
    assert_eq!(profile.destination.as_deref(), Some("@mirror"));
    assert!(profile.setup_state.is_none());
    assert!(profile.is_complete());

    let sent = bot.sent();
    assert!(sent
        .last()
        .expect("No replies sent")
        .contains("Setup complete"));
}

#[tokio::test]
async fn test_wizard_rejects_bad_api_id_and_stays_on_step() {
    let (chain, profiles, bot) = setup().await;

    chain.handle(&msg(1, "/setup")).await.expect("Chain failed");
    chain.handle(&msg(1, "not-a-number")).await.expect("Chain failed");

    let profile = profiles
        .load(1)
        .await
        .expect("Failed to load")
        .expect("Missing profile");
    assert_eq!(profile.setup_state, Some(SetupState::ApiId));
    assert!(profile.api_id.is_none());
    assert!(bot
        .sent()
        .last()
        .expect("No replies sent")
        .contains("numeric API id"));
}

#[tokio::test]
async fn test_wizard_rejects_short_api_hash() {
    let (chain, profiles, _bot) = setup().await;

    chain.handle(&msg(1, "/setup")).await.expect("Chain failed");
    chain.handle(&msg(1, "12345")).await.expect("Chain failed");
    chain.handle(&msg(1, "tooshort")).await.expect("Chain failed");

    let profile = profiles
        .load(1)
        .await
        .expect("Failed to load")
        .expect("Missing profile");
    assert_eq!(profile.setup_state, Some(SetupState::ApiHash));
    assert!(profile.api_hash.is_none());
}

#[tokio::test]
async fn test_inactive_wizard_passes_messages_through() {
    let (chain, _profiles, bot) = setup().await;

    let response = chain.handle(&msg(1, "hello there")).await.expect("Chain failed");
    assert_eq!(response, HandlerResponse::Continue);
    assert!(bot.sent().is_empty());
}

#[tokio::test]
async fn test_wizard_is_per_user() {
    let (chain, profiles, _bot) = setup().await;

    chain.handle(&msg(1, "/setup")).await.expect("Chain failed");
    // User 2 never started the wizard; their text is not consumed.
    let response = chain.handle(&msg(2, "12345")).await.expect("Chain failed");
    assert_eq!(response, HandlerResponse::Continue);
    assert!(profiles.load(2).await.expect("Failed to load").is_none());

    let profile = profiles
        .load(1)
        .await
        .expect("Failed to load")
        .expect("Missing profile");
    assert_eq!(profile.setup_state, Some(SetupState::ApiId));
}
