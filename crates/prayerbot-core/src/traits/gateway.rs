//! Messaging gateway trait: the only view the scheduler has of the chat platform.

use async_trait::async_trait;

use crate::error::Result;

/// Chat transport capabilities consumed by the trigger engine and command layer.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Human-friendly name for a user. Best-effort: returns the raw id on failure.
    async fn resolve_display_name(&self, user_id: &str) -> String;

    /// Whether `channel_id` is a direct-message channel with the bot.
    async fn is_direct_message_channel(&self, channel_id: &str) -> Result<bool>;

    /// Open a private multi-person conversation and return its id.
    async fn create_private_conversation(&self, user_ids: &[String]) -> Result<String>;

    /// Post a message visible to everyone in the conversation.
    async fn post_message(&self, conversation_id: &str, text: &str) -> Result<()>;

    /// Post a reply only `user_id` can see.
    async fn post_ephemeral(&self, channel_id: &str, user_id: &str, text: &str) -> Result<()>;

    /// Make the bot leave a conversation it opened. Callers treat failure as non-fatal.
    async fn leave_conversation(&self, conversation_id: &str) -> Result<()>;
}
